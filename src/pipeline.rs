//! Generation Pipeline - Single Entry Point
//!
//! generate MUST call validate internally. No bypass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::geometry::Point;
use crate::grammar::{Grammar, GrammarError, Limits};
use crate::hashing::{compute_geometry_hash, compute_grammar_hash, compute_run_hash};
use crate::path::{PathBackend, PathOutput};
use crate::presets::{GenerationMode, Preset, PresetRegistry};
use crate::tree::{RevisitPolicy, Tree, TreeBackend};
use crate::turtle::{Turtle, TurtleError, TurtleSummary};
use crate::validation::{ValidationPolicy, ValidationResult, Validator};
use crate::weight::TreeWeighter;
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Preset version {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Turtle(#[from] TurtleError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A generation job. Unset fields fall back to the preset's values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub preset_id: String,
    /// Inline grammar; replaces the preset's grammar, or stands alone when
    /// `preset_id` is not registered.
    #[serde(default)]
    pub grammar: Option<Grammar>,
    #[serde(default)]
    pub mode: Option<GenerationMode>,
    #[serde(default)]
    pub step_size: Option<f64>,
    #[serde(default)]
    pub origin: Point,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub revisit_policy: RevisitPolicy,
    #[serde(default)]
    pub validation_policy: Option<ValidationPolicy>,
}

impl GenerateRequest {
    pub fn preset(preset_id: &str) -> Self {
        Self {
            preset_id: preset_id.to_string(),
            grammar: None,
            mode: None,
            step_size: None,
            origin: Point::default(),
            limits: Limits::default(),
            revisit_policy: RevisitPolicy::default(),
            validation_policy: None,
        }
    }

    pub fn inline(label: &str, grammar: Grammar, mode: GenerationMode) -> Self {
        Self {
            grammar: Some(grammar),
            mode: Some(mode),
            ..Self::preset(label)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    Path(PathOutput),
    Tree(Tree),
}

impl Geometry {
    pub fn as_path(&self) -> Option<&PathOutput> {
        match self {
            Geometry::Path(p) => Some(p),
            Geometry::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Geometry::Tree(t) => Some(t),
            Geometry::Path(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationStats {
    pub expanded_length: usize,
    pub turtle: TurtleSummary,
    pub segments: usize,
    pub nodes: usize,
    pub revisits: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedStructure {
    pub id: String,
    pub preset_id: String,
    pub preset_version: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub grammar_hash: String,
    pub run_hash: String,
    pub geometry_hash: String,
    pub validation: ValidationResult,
    pub stats: GenerationStats,
    pub geometry: Geometry,
}

/// A request with preset defaults filled in.
struct Resolved {
    label: String,
    preset_version: String,
    engine_min_version: Option<String>,
    grammar: Grammar,
    mode: GenerationMode,
    step_size: f64,
    validation_policy: ValidationPolicy,
}

/// The generation pipeline - single entry point for all geometry runs
pub struct GenerationPipeline {
    registry: PresetRegistry,
    validator: Validator,
}

impl GenerationPipeline {
    pub fn new(registry: PresetRegistry) -> Self {
        Self {
            registry,
            validator: Validator::new(),
        }
    }

    pub fn list_presets(&self) -> Vec<&Preset> {
        self.registry.list()
    }

    pub fn get_preset(&self, id: &str) -> Option<&Preset> {
        self.registry.get(id)
    }

    /// This is the ONLY validation entry point.
    pub fn validate(&self, request: &GenerateRequest) -> Result<ValidationResult, PipelineError> {
        let resolved = self.resolve(request)?;
        self.validate_resolved(&resolved, request)
    }

    /// Expanded symbol string for a request, within its limits.
    pub fn expand(&self, request: &GenerateRequest) -> Result<String, PipelineError> {
        let resolved = self.resolve(request)?;
        Ok(resolved.grammar.expand_bounded(&request.limits)?)
    }

    /// Generate geometry.
    ///
    /// CRITICAL: This ALWAYS validates first. No bypass possible.
    pub fn generate(&self, request: &GenerateRequest) -> Result<GeneratedStructure, PipelineError> {
        let resolved = self.resolve(request)?;

        let validation = self.validate_resolved(&resolved, request)?;
        if !validation.valid {
            let messages: Vec<_> = validation
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }

        let grammar = &resolved.grammar;
        let expanded = grammar.expand_bounded(&request.limits)?;
        debug!(preset = %resolved.label, symbols = expanded.len(), "expanded grammar");

        let turtle = Turtle::new(&grammar.alphabet, grammar.angle)
            .with_origin(request.origin)
            .with_step_size(resolved.step_size);

        let (geometry, summary, revisits) = match resolved.mode {
            GenerationMode::Path => {
                let mut backend = PathBackend::new(request.origin);
                let summary = turtle.interpret(&expanded, &mut backend)?;
                (Geometry::Path(backend.finish()), summary, 0)
            }
            GenerationMode::Tree => {
                let mut backend = TreeBackend::new(request.origin, request.revisit_policy);
                let summary = turtle.interpret(&expanded, &mut backend)?;
                let revisits = backend.revisits();
                let mut tree = backend.finish();
                TreeWeighter::new().compute(&mut tree);
                (Geometry::Tree(tree), summary, revisits)
            }
        };

        if revisits > 0 && request.revisit_policy == RevisitPolicy::Warn {
            warn!(
                preset = %resolved.label,
                revisits,
                "tree nodes landed on coordinates already occupied by other nodes"
            );
        }

        let stats = GenerationStats {
            expanded_length: expanded.chars().count(),
            turtle: summary,
            segments: geometry.as_path().map_or(0, |p| p.segments.len()),
            nodes: geometry.as_tree().map_or(0, |t| t.node_count()),
            revisits,
        };

        let structure = GeneratedStructure {
            id: Uuid::new_v4().to_string(),
            preset_id: resolved.label.clone(),
            preset_version: resolved.preset_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            grammar_hash: compute_grammar_hash(grammar)?,
            run_hash: compute_run_hash(
                &resolved.label,
                &resolved.preset_version,
                request,
                ENGINE_VERSION,
            )?,
            geometry_hash: compute_geometry_hash(&geometry)?,
            validation,
            stats,
            geometry,
        };

        info!(
            preset = %structure.preset_id,
            symbols = structure.stats.expanded_length,
            segments = structure.stats.segments,
            nodes = structure.stats.nodes,
            "generated structure"
        );

        Ok(structure)
    }

    fn resolve(&self, request: &GenerateRequest) -> Result<Resolved, PipelineError> {
        let preset = self.registry.get(&request.preset_id);
        let grammar = match (&request.grammar, preset) {
            (Some(g), _) => g.clone(),
            (None, Some(p)) => p.grammar.clone(),
            (None, None) => return Err(PipelineError::PresetNotFound(request.preset_id.clone())),
        };

        Ok(Resolved {
            label: request.preset_id.clone(),
            preset_version: preset.map_or_else(|| "inline".to_string(), |p| p.preset_version.clone()),
            engine_min_version: preset.map(|p| p.engine_min_version.clone()),
            grammar,
            mode: request
                .mode
                .or(preset.map(|p| p.mode))
                .unwrap_or_default(),
            step_size: request
                .step_size
                .or(preset.map(|p| p.step_size))
                .unwrap_or(5.0),
            validation_policy: request
                .validation_policy
                .or(preset.map(|p| p.validation_policy))
                .unwrap_or_default(),
        })
    }

    fn validate_resolved(
        &self,
        resolved: &Resolved,
        request: &GenerateRequest,
    ) -> Result<ValidationResult, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        if let Some(min) = &resolved.engine_min_version {
            self.check_engine_version(&resolved.preset_version, min)?;
        }

        Ok(self.validator.validate(
            &resolved.label,
            &resolved.grammar,
            &request.limits,
            resolved.validation_policy,
        ))
    }

    fn check_engine_version(&self, preset_version: &str, min: &str) -> Result<(), PipelineError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|e| PipelineError::InvalidVersion(format!("engine {ENGINE_VERSION}: {e}")))?;
        let min_ver = semver::Version::parse(min)
            .map_err(|e| PipelineError::InvalidVersion(format!("engineMinVersion {min}: {e}")))?;

        if engine_ver < min_ver {
            return Err(PipelineError::EngineVersionMismatch(
                preset_version.to_string(),
                min.to_string(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GenerationPipeline {
    fn default() -> Self {
        Self::new(PresetRegistry::builtin())
    }
}
