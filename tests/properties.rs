//! Algebraic properties of expansion, interpretation and weighting.

use proptest::prelude::*;

use lsystem_core::{
    expand, Alphabet, PathBackend, Point, RevisitPolicy, Rules, TreeBackend, TreeWeighter, Turtle,
};

const SYMBOLS: &[char] = &['F', 'f', 'A', 'B', '+', '-', '[', ']'];
const RULE_KEYS: &[char] = &['F', 'A', 'B', 'f'];

fn arb_word(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SYMBOLS), 0..max)
        .prop_map(|cs| cs.into_iter().collect())
}

fn arb_rules() -> impl Strategy<Value = Rules> {
    prop::collection::btree_map(prop::sample::select(RULE_KEYS), arb_word(6), 0..3)
}

/// Drop stray closes and append closes for anything left open.
fn balance(s: &str) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '[' => {
                depth += 1;
                out.push(c);
            }
            ']' if depth == 0 => {}
            ']' => {
                depth -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.extend(std::iter::repeat(']').take(depth));
    out
}

fn arb_angle() -> impl Strategy<Value = f64> {
    prop::sample::select(vec![22.5, 25.7, 30.0, 45.0, 60.0, 90.0])
}

proptest! {
    #[test]
    fn empty_rules_are_identity(axiom in arb_word(20), n in 0u32..6) {
        prop_assert_eq!(expand(&axiom, &Rules::new(), n), axiom);
    }

    #[test]
    fn expansion_is_compositional(axiom in arb_word(5), rules in arb_rules(), n in 0u32..3) {
        let next = expand(&axiom, &rules, n + 1);
        let stepped = expand(&expand(&axiom, &rules, n), &rules, 1);
        prop_assert_eq!(next, stepped);
    }

    #[test]
    fn expansion_never_shrinks_without_empty_bodies(axiom in arb_word(5), rules in arb_rules(), n in 0u32..3) {
        prop_assume!(rules.values().all(|b| !b.is_empty()));
        let a = expand(&axiom, &rules, n).chars().count();
        let b = expand(&axiom, &rules, n + 1).chars().count();
        prop_assert!(b >= a);
    }

    #[test]
    fn balanced_strings_close_every_branch(word in arb_word(60), angle in arb_angle()) {
        let symbols = balance(&word);
        let alphabet = Alphabet::standard();
        let mut backend = PathBackend::new(Point::default());
        let summary = Turtle::new(&alphabet, angle).interpret(&symbols, &mut backend).unwrap();
        prop_assert_eq!(summary.unclosed_branches, 0);
    }

    #[test]
    fn path_lines_equal_draw_symbols(word in arb_word(60), angle in arb_angle()) {
        let symbols = balance(&word);
        let alphabet = Alphabet::standard();
        let mut backend = PathBackend::new(Point::default());
        Turtle::new(&alphabet, angle).interpret(&symbols, &mut backend).unwrap();
        let draws = symbols.chars().filter(|c| matches!(*c, 'F' | 'A' | 'B')).count();
        prop_assert_eq!(backend.finish().line_count(), draws);
    }

    #[test]
    fn tree_is_single_rooted_and_acyclic(word in arb_word(60), angle in arb_angle()) {
        let symbols = balance(&word);
        let alphabet = Alphabet::standard();
        let mut backend = TreeBackend::new(Point::default(), RevisitPolicy::Allow);
        let summary = Turtle::new(&alphabet, angle)
            .with_step_size(3.0)
            .interpret(&symbols, &mut backend)
            .unwrap();
        let tree = backend.finish();

        // every draw adds a node; a move adds one only on a fresh coordinate
        let pen_up: Vec<_> = tree.nodes().iter().filter(|n| !n.pen_down()).collect();
        prop_assert_eq!(tree.node_count(), 1 + summary.draws + pen_up.len());
        prop_assert!(pen_up.len() <= summary.moves);
        for node in &pen_up {
            let key = node.position().rounded();
            prop_assert!(tree.nodes()[..node.id().index()]
                .iter()
                .all(|earlier| earlier.position().rounded() != key));
        }
        prop_assert_eq!(tree.walk().count(), tree.node_count());
        prop_assert!(tree.root().parent().is_none());
        for node in tree.nodes().iter().skip(1) {
            let parent = node.parent().unwrap();
            prop_assert!(parent < node.id());
            prop_assert!(tree.node(parent).children().contains(&node.id()));
        }
    }

    #[test]
    fn weights_are_bounded_and_monotone(word in arb_word(80), angle in arb_angle()) {
        let symbols = balance(&word);
        let alphabet = Alphabet::standard();
        let mut backend = TreeBackend::new(Point::default(), RevisitPolicy::Allow);
        Turtle::new(&alphabet, angle).interpret(&symbols, &mut backend).unwrap();
        let mut tree = backend.finish();
        TreeWeighter::new().compute(&mut tree);

        prop_assert_eq!(tree.root().weight(), Some(0.0));
        for node in tree.nodes() {
            let w = node.weight().unwrap();
            prop_assert!((0.0..=1.0).contains(&w));
            if node.is_leaf() && !node.is_root() {
                prop_assert_eq!(w, 1.0);
                prop_assert_eq!(node.leaf_distance(), Some(0));
            }
        }
        for (parent, child) in tree.edges() {
            prop_assert!(child.weight().unwrap() >= parent.weight().unwrap());
            prop_assert!(parent.leaf_distance().unwrap() >= child.leaf_distance().unwrap() + 1);
        }
    }
}
