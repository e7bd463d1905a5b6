//! Tree Weighting - Gradient factors
//!
//! Leaf distance is the number of edges to the farthest descendant leaf.
//! Weight runs from 0 at the root to 1 at every leaf; each inner node closes
//! the remaining gap to 1 by `1 / (leaf_distance + 1)` of its parent's gap.

use crate::geometry::Bounds;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeWeighter;

impl TreeWeighter {
    pub fn new() -> Self {
        Self
    }

    /// Annotate every node with `leaf_distance` and `weight`, and refresh the
    /// tree bounds.
    pub fn compute(&self, tree: &mut Tree) {
        let order: Vec<NodeId> = tree.walk().map(|n| n.id()).collect();

        // reverse BFS visits all children before their parent
        let mut leaf_distance = vec![0u32; tree.node_count()];
        for id in order.iter().rev() {
            let node = tree.node(*id);
            leaf_distance[id.index()] = node
                .children()
                .iter()
                .map(|c| leaf_distance[c.index()] + 1)
                .max()
                .unwrap_or(0);
        }

        let mut weight = vec![0.0f64; tree.node_count()];
        let mut bounds = Bounds::empty();
        for id in &order {
            let node = tree.node(*id);
            bounds.expand(node.position());
            let ld = leaf_distance[id.index()];
            weight[id.index()] = match node.parent() {
                None => 0.0,
                Some(_) if ld == 0 => 1.0,
                Some(p) => {
                    let pw = weight[p.index()];
                    pw + (1.0 - pw) / f64::from(ld + 1)
                }
            };
        }

        for id in &order {
            let node = tree.node_mut(*id);
            node.leaf_distance = Some(leaf_distance[id.index()]);
            node.weight = Some(weight[id.index()]);
        }
        tree.set_bounds(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_chain_weights() {
        let mut tree = Tree::new(Point::default());
        let a = tree.add_child(NodeId::ROOT, Point::new(0.0, 1.0), true).unwrap();
        let b = tree.add_child(a, Point::new(0.0, 2.0), true).unwrap();
        let c = tree.add_child(b, Point::new(0.0, 3.0), true).unwrap();

        TreeWeighter::new().compute(&mut tree);

        assert_eq!(tree.root().leaf_distance(), Some(3));
        assert_eq!(tree.node(a).leaf_distance(), Some(2));
        assert_eq!(tree.node(c).leaf_distance(), Some(0));

        assert_eq!(tree.root().weight(), Some(0.0));
        // 0 + 1/3, then 1/3 + (2/3)/2
        assert!((tree.node(a).weight().unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((tree.node(b).weight().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(tree.node(c).weight(), Some(1.0));
    }

    #[test]
    fn test_leaf_distance_uses_farthest_leaf() {
        // root -> a -> (short leaf, long -> leaf)
        let mut tree = Tree::new(Point::default());
        let a = tree.add_child(NodeId::ROOT, Point::new(0.0, 1.0), true).unwrap();
        let short = tree.add_child(a, Point::new(-1.0, 2.0), true).unwrap();
        let long = tree.add_child(a, Point::new(1.0, 2.0), true).unwrap();
        let tip = tree.add_child(long, Point::new(1.0, 3.0), true).unwrap();

        TreeWeighter::new().compute(&mut tree);

        assert_eq!(tree.node(a).leaf_distance(), Some(2));
        assert_eq!(tree.node(short).leaf_distance(), Some(0));
        assert_eq!(tree.node(short).weight(), Some(1.0));
        assert_eq!(tree.node(long).leaf_distance(), Some(1));
        assert_eq!(tree.node(tip).weight(), Some(1.0));
        assert_eq!(tree.root().leaf_distance(), Some(3));
        assert!(tree.is_weighted());
    }

    #[test]
    fn test_lone_root_keeps_zero_weight() {
        let mut tree = Tree::new(Point::new(4.0, 4.0));
        TreeWeighter::new().compute(&mut tree);
        assert_eq!(tree.root().leaf_distance(), Some(0));
        assert_eq!(tree.root().weight(), Some(0.0));
        assert_eq!(tree.bounds(), Bounds::from_point(Point::new(4.0, 4.0)));
    }
}
