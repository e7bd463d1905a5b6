//! L-system Core - Grammar expansion and turtle geometry
//!
//! # Flow
//! 1. A [`Grammar`] is expanded by parallel rewriting.
//! 2. The expanded string is compiled through an [`Alphabet`] into turtle
//!    commands and interpreted by a [`Turtle`].
//! 3. The turtle drives a backend: [`PathBackend`] for flat strokes,
//!    [`TreeBackend`] for a branching node tree.
//! 4. Trees are annotated by [`TreeWeighter`] for gradient rendering.
//!
//! [`GenerationPipeline`] runs all of it behind validation.

pub mod geometry;
pub mod grammar;
pub mod turtle;
pub mod path;
pub mod tree;
pub mod weight;
pub mod presets;
pub mod validation;
pub mod hashing;
pub mod pipeline;

pub use geometry::{Bounds, Point};
pub use grammar::{expand, expand_bounded, Grammar, GrammarError, Limits, Rules};
pub use turtle::{Alphabet, Command, Turtle, TurtleBackend, TurtleError, TurtleSummary};
pub use path::{PathBackend, PathOutput, PathSegment, SegmentKind};
pub use tree::{NodeId, RevisitPolicy, Tree, TreeBackend, TreeNode};
pub use weight::TreeWeighter;
pub use presets::{GenerationMode, Preset, PresetRegistry};
pub use validation::{ValidationPolicy, ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use hashing::{canonical_json, compute_geometry_hash, compute_grammar_hash};
pub use pipeline::{GenerateRequest, GeneratedStructure, GenerationPipeline, Geometry, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
