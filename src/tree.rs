//! Tree Backend - Branching output
//!
//! Nodes live in a flat arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. The backend follows branches through cursor handles carried
//! in the interpreter's stack, so returning from a branch never depends on
//! coordinate lookup. A rounded-coordinate index is kept only to detect
//! nodes landing on a point another node already holds.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Bounds, Point};
use crate::turtle::{BackendError, TurtleBackend};

/// Index of a node within its [`Tree`]. Only meaningful for the tree that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) position: Point,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// False for nodes reached by a pen-up move; the edge into them is not drawn.
    pub(crate) pen_down: bool,
    pub(crate) leaf_distance: Option<u32>,
    pub(crate) weight: Option<f64>,
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn pen_down(&self) -> bool {
        self.pen_down
    }

    /// Distance to the farthest descendant leaf. `None` until weighted.
    pub fn leaf_distance(&self) -> Option<u32> {
        self.leaf_distance
    }

    /// Gradient factor in `[0, 1]`. `None` until weighted.
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    bounds: Bounds,
}

impl Tree {
    pub fn new(root: Point) -> Self {
        Self {
            nodes: vec![TreeNode {
                id: NodeId::ROOT,
                position: root,
                parent: None,
                children: vec![],
                pen_down: true,
                leaf_distance: None,
                weight: None,
            }],
            bounds: Bounds::from_point(root),
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    /// # Panics
    /// If `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub(crate) fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Returns `None` once the `u32` id space is exhausted.
    pub fn add_child(&mut self, parent: NodeId, position: Point, pen_down: bool) -> Option<NodeId> {
        let id = NodeId(u32::try_from(self.nodes.len()).ok()?);
        self.nodes.push(TreeNode {
            id,
            position,
            parent: Some(parent),
            children: vec![],
            pen_down,
            leaf_distance: None,
            weight: None,
        });
        self.nodes[parent.index()].children.push(id);
        self.bounds.expand(position);
        Some(id)
    }

    /// Breadth-first from the root; every parent precedes its children.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            queue: VecDeque::from([NodeId::ROOT]),
        }
    }

    /// Every parent→child pair, in breadth-first order of the child.
    pub fn edges(&self) -> impl Iterator<Item = (&TreeNode, &TreeNode)> {
        self.walk()
            .filter_map(move |child| child.parent.map(|p| (self.node(p), child)))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn is_weighted(&self) -> bool {
        self.nodes.iter().all(|n| n.weight.is_some() && n.leaf_distance.is_some())
    }

    /// Number of edges from the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.node(p).parent;
        }
        depth
    }
}

pub struct Walk<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        let node = self.tree.node(id);
        self.queue.extend(node.children.iter().copied());
        Some(node)
    }
}

/// What to do when a new node lands on an integer-rounded coordinate that
/// another node already occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisitPolicy {
    Allow,
    #[default]
    Warn,
    Error,
}

/// Largest node count a [`NodeId`] can address.
pub const MAX_NODES: usize = u32::MAX as usize;

pub struct TreeBackend {
    tree: Tree,
    current: NodeId,
    occupied: HashMap<(i64, i64), NodeId>,
    policy: RevisitPolicy,
    revisits: usize,
    max_nodes: usize,
}

impl TreeBackend {
    pub fn new(origin: Point, policy: RevisitPolicy) -> Self {
        let mut occupied = HashMap::new();
        occupied.insert(origin.rounded(), NodeId::ROOT);
        Self {
            tree: Tree::new(origin),
            current: NodeId::ROOT,
            occupied,
            policy,
            revisits: 0,
            max_nodes: MAX_NODES,
        }
    }

    /// Cap the node count below [`MAX_NODES`].
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes.min(MAX_NODES);
        self
    }

    /// Draws and moves that landed on an already occupied coordinate.
    pub fn revisits(&self) -> usize {
        self.revisits
    }

    pub fn finish(self) -> Tree {
        self.tree
    }

    /// Owner of the coordinate `key`, if any. Fails under [`RevisitPolicy::Error`].
    fn revisit(&mut self, key: (i64, i64)) -> Result<Option<NodeId>, BackendError> {
        let Some(&owner) = self.occupied.get(&key) else {
            return Ok(None);
        };
        if self.policy == RevisitPolicy::Error {
            return Err(BackendError::AmbiguousRevisit { x: key.0, y: key.1 });
        }
        debug!(x = key.0, y = key.1, owner = %owner, "coordinate revisited");
        self.revisits += 1;
        Ok(Some(owner))
    }

    fn attach(&mut self, key: (i64, i64), to: Point, pen_down: bool) -> Result<(), BackendError> {
        let limit = BackendError::NodeLimitExceeded { limit: self.max_nodes as u64 };
        if self.tree.node_count() >= self.max_nodes {
            return Err(limit);
        }
        let id = self.tree.add_child(self.current, to, pen_down).ok_or(limit)?;
        self.occupied.entry(key).or_insert(id);
        self.current = id;
        Ok(())
    }
}

impl TurtleBackend for TreeBackend {
    type Cursor = NodeId;

    fn cursor(&self) -> NodeId {
        self.current
    }

    fn on_move(&mut self, to: Point, restore: Option<NodeId>) -> Result<(), BackendError> {
        match restore {
            Some(id) => {
                self.current = id;
                Ok(())
            }
            // A move onto a held coordinate re-targets the cursor instead of
            // duplicating the node.
            None => {
                let key = to.rounded();
                match self.revisit(key)? {
                    Some(owner) => {
                        self.current = owner;
                        Ok(())
                    }
                    None => self.attach(key, to, false),
                }
            }
        }
    }

    fn on_draw(&mut self, to: Point) -> Result<(), BackendError> {
        let key = to.rounded();
        self.revisit(key)?;
        self.attach(key, to, true)
    }
}
