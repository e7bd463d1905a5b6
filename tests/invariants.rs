//! Contract Invariant Tests
//!
//! These tests verify the guarantees of the generation pipeline.

use lsystem_core::{
    expand,
    pipeline::{GenerateRequest, GenerationPipeline, PipelineError},
    presets::{GenerationMode, Preset, PresetRegistry},
    turtle::TurtleError,
    validation::ValidationPolicy,
    Command, Grammar, GrammarError, Limits, NodeId, RevisitPolicy, Rules,
};

fn plant_grammar(iterations: u32) -> Grammar {
    Grammar::new("F", 25.7, iterations).with_rule('F', "F[+F]F[-F]F")
}

fn create_pipeline() -> GenerationPipeline {
    let mut registry = PresetRegistry::builtin();
    registry.register(Preset::new("plant-small", "Small Plant", plant_grammar(2)).as_tree(10.0));
    GenerationPipeline::new(registry)
}

#[test]
fn invariant_generate_rejects_invalid_grammar() {
    let pipeline = create_pipeline();
    let request = GenerateRequest::inline(
        "bad",
        Grammar::new("F", 90.0, 2).with_rule('F', "F+Q"),
        GenerationMode::Path,
    );

    let err = pipeline.generate(&request).unwrap_err();
    assert!(err.to_string().contains("Validation failed"));
    assert!(err.to_string().contains("alphabet"));
}

#[test]
fn invariant_invalid_symbol_reports_index_and_char() {
    let pipeline = create_pipeline();
    let mut request = GenerateRequest::inline(
        "bad",
        Grammar::new("FF+Q-F", 90.0, 0),
        GenerationMode::Path,
    );
    request.validation_policy = Some(ValidationPolicy::Log);

    match pipeline.generate(&request).unwrap_err() {
        PipelineError::Turtle(TurtleError::InvalidSymbol { symbol, index }) => {
            assert_eq!(symbol, 'Q');
            assert_eq!(index, 3);
        }
        other => panic!("expected InvalidSymbol, got {other:?}"),
    }
}

#[test]
fn invariant_unbalanced_branch_is_fatal() {
    let pipeline = create_pipeline();
    let mut request = GenerateRequest::inline(
        "unbalanced",
        Grammar::new("F]F", 90.0, 0),
        GenerationMode::Tree,
    );
    request.validation_policy = Some(ValidationPolicy::Log);

    let err = pipeline.generate(&request).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Turtle(TurtleError::UnbalancedBranch { index: 1 })
    ));
}

#[test]
fn invariant_resource_limit_enforced_with_and_without_validation() {
    let pipeline = create_pipeline();
    let limits = Limits { max_iterations: 16, max_symbols: 500 };

    let mut request = GenerateRequest::preset("plant-1");
    request.limits = limits;
    let err = pipeline.generate(&request).unwrap_err();
    assert!(err.to_string().contains("expansion_size"));

    request.validation_policy = Some(ValidationPolicy::Log);
    match pipeline.generate(&request).unwrap_err() {
        PipelineError::Grammar(GrammarError::ResourceLimitExceeded { resource, limit, .. }) => {
            assert_eq!(resource, "symbols");
            assert_eq!(limit, 500);
        }
        other => panic!("expected ResourceLimitExceeded, got {other:?}"),
    }
}

#[test]
fn invariant_dragon_curve_length() {
    let pipeline = create_pipeline();
    let expanded = pipeline.expand(&GenerateRequest::preset("dragon-curve")).unwrap();
    assert_eq!(expanded.len(), 3070);

    let rules: Rules = [('A', "A+B+".to_string()), ('B', "-A-B".to_string())].into();
    assert_eq!(expand("A", &rules, 3).len(), 22);
}

#[test]
fn invariant_path_lines_match_draw_symbols() {
    let pipeline = create_pipeline();
    let out = pipeline.generate(&GenerateRequest::preset("island-and-lakes")).unwrap();
    let expanded = pipeline.expand(&GenerateRequest::preset("island-and-lakes")).unwrap();

    let path = out.geometry.as_path().unwrap();
    let draws = expanded.chars().filter(|c| *c == 'F').count();
    let moves = expanded.chars().filter(|c| *c == 'f').count();
    assert_eq!(path.line_count(), draws);
    assert_eq!(path.segments.len(), 1 + draws + moves);
    assert_eq!(out.stats.turtle.draws, draws);
}

#[test]
fn invariant_plant_tree_structure() {
    let pipeline = create_pipeline();
    let out = pipeline.generate(&GenerateRequest::preset("plant-small")).unwrap();
    let tree = out.geometry.as_tree().unwrap();

    // 5^2 draw symbols
    assert_eq!(tree.node_count(), 26);
    assert_eq!(out.stats.nodes, 26);

    // the first segment forks into a bracket branch and the continuing trunk
    let root = tree.root();
    assert_eq!(root.children().len(), 1);
    let base = tree.node(root.children()[0]);
    assert_eq!(base.children().len(), 2);

    for leaf in tree.leaves() {
        assert_eq!(leaf.leaf_distance(), Some(0));
        assert_eq!(leaf.weight(), Some(1.0));
    }
    for node in tree.nodes().iter().skip(1) {
        let parent = tree.node(node.parent().unwrap());
        assert_eq!(parent.children().iter().filter(|c| **c == node.id()).count(), 1);
    }
    assert_eq!(tree.root().weight(), Some(0.0));
    assert!(tree.is_weighted());
}

#[test]
fn invariant_weights_monotone_from_root() {
    let pipeline = create_pipeline();
    let out = pipeline.generate(&GenerateRequest::preset("plant-3")).unwrap();
    let tree = out.geometry.as_tree().unwrap();

    for (parent, child) in tree.edges() {
        let pw = parent.weight().unwrap();
        let cw = child.weight().unwrap();
        assert!((0.0..=1.0).contains(&pw));
        assert!((0.0..=1.0).contains(&cw));
        assert!(cw >= pw);
        assert!(parent.leaf_distance().unwrap() > child.leaf_distance().unwrap());
    }
    assert!(tree.get(NodeId::ROOT).is_some());
}

#[test]
fn invariant_strict_revisit_policy_surfaces_collisions() {
    let pipeline = create_pipeline();
    let mut request = GenerateRequest::inline(
        "square",
        Grammar::new("F+F+F+F", 90.0, 0),
        GenerationMode::Tree,
    );
    request.step_size = Some(10.0);

    let out = pipeline.generate(&request).unwrap();
    assert_eq!(out.stats.revisits, 1);

    request.revisit_policy = RevisitPolicy::Error;
    let err = pipeline.generate(&request).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Turtle(TurtleError::AmbiguousRevisit { x: 0, y: 0, .. })
    ));
}

#[test]
fn invariant_hashes_stable_across_runs() {
    let pipeline = create_pipeline();
    let request = GenerateRequest::preset("plant-2");

    let a = pipeline.generate(&request).unwrap();
    let b = pipeline.generate(&request).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.grammar_hash, b.grammar_hash);
    assert_eq!(a.run_hash, b.run_hash);
    assert_eq!(a.geometry_hash, b.geometry_hash);
}

#[test]
fn invariant_preset_not_found_error() {
    let pipeline = create_pipeline();
    let result = pipeline.generate(&GenerateRequest::preset("nonexistent"));
    assert!(result.unwrap_err().to_string().contains("Preset not found"));
}

#[test]
fn invariant_validation_result_structure() {
    let pipeline = create_pipeline();
    let request = GenerateRequest::inline(
        "leftover",
        Grammar::new("X", 90.0, 0).with_rule('X', "F"),
        GenerationMode::Path,
    );

    let result = pipeline.validate(&request).unwrap();
    assert!(!result.valid);
    assert!(!result.violations.is_empty());
    for v in &result.violations {
        assert!(!v.rule.is_empty());
        assert!(!v.message.is_empty());
    }
    assert_eq!(result.preset_id, "leftover");
}

#[test]
fn invariant_shipped_presets_generate() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("presets");
    let registry = PresetRegistry::load_from_dir(&dir).unwrap();
    let bush = registry.get("bush").unwrap();
    assert_eq!(bush.grammar.alphabet.command('G'), Some(Command::DrawForward));
    assert_eq!(bush.grammar.alphabet.command('F'), None);

    let pipeline = GenerationPipeline::new(registry);
    let out = pipeline.generate(&GenerateRequest::preset("bush")).unwrap();
    let tree = out.geometry.as_tree().unwrap();
    assert_eq!(tree.node_count(), 1 + out.stats.turtle.draws);
    assert_eq!(out.stats.turtle.unclosed_branches, 0);
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_generate_calls_validate() {
    use lsystem_core::pipeline::{get_validation_call_count, reset_validation_call_count};

    let pipeline = create_pipeline();
    reset_validation_call_count();
    pipeline.generate(&GenerateRequest::preset("koch-island")).unwrap();
    // other tests may run concurrently and bump the shared counter
    assert!(get_validation_call_count() >= 1);
}
