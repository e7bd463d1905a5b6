//! Preset System - Named grammar contracts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::grammar::Grammar;
use crate::validation::ValidationPolicy;

pub type PresetId = String;

/// Which backend a preset is meant to be rendered through.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Path,
    Tree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_preset_version")]
    pub preset_version: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    pub grammar: Grammar,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    #[serde(default)]
    pub validation_policy: ValidationPolicy,
}

fn default_preset_version() -> String { "1.0.0".to_string() }
fn default_engine_min_version() -> String { "0.1.0".to_string() }
fn default_step_size() -> f64 { 5.0 }

impl Preset {
    pub fn new(id: &str, name: &str, grammar: Grammar) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            preset_version: default_preset_version(),
            engine_min_version: default_engine_min_version(),
            grammar,
            mode: GenerationMode::default(),
            step_size: default_step_size(),
            validation_policy: ValidationPolicy::default(),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn as_tree(mut self, step_size: f64) -> Self {
        self.mode = GenerationMode::Tree;
        self.step_size = step_size;
        self
    }
}

/// Preset registry - loads and caches presets
pub struct PresetRegistry {
    presets: BTreeMap<PresetId, Preset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self { presets: BTreeMap::new() }
    }

    /// Sample systems from "The Algorithmic Beauty of Plants"
    /// (Prusinkiewicz & Lindenmayer, 1990).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let presets = [
            Preset::new(
                "island-and-lakes",
                "Islands and Lakes",
                Grammar::new("F+F+F+F", 90.0, 2)
                    .with_rule('F', "F+f-FF+F+FF+Ff+FF-f+FF-F-FF-Ff-FFF")
                    .with_rule('f', "ffffff"),
            )
            .describe("Quadratic island with disjoint lakes drawn through pen-up moves"),
            Preset::new(
                "koch-island",
                "Quadratic Koch Island",
                Grammar::new("F-F-F-F", 90.0, 2)
                    .with_rule('F', "F+FF-FF-F-F+F+FF-F-F+F+FF+FF-F"),
            ),
            Preset::new(
                "dragon-curve",
                "Dragon Curve",
                Grammar::new("A", 90.0, 10)
                    .with_rule('A', "A+B+")
                    .with_rule('B', "-A-B"),
            ),
            Preset::new(
                "sierpinski-gasket",
                "Sierpinski Gasket",
                Grammar::new("B", 60.0, 8)
                    .with_rule('A', "B+A+B")
                    .with_rule('B', "A-B-A"),
            ),
            Preset::new(
                "hex-gosper",
                "Hexagonal Gosper Curve",
                Grammar::new("A", 60.0, 4)
                    .with_rule('A', "A+B++B-A--AA-B+")
                    .with_rule('B', "-A+BB++B+A--A-B"),
            ),
            Preset::new(
                "plant-1",
                "Plant 1",
                Grammar::new("F", 25.7, 5).with_rule('F', "F[+F]F[-F]F"),
            )
            .as_tree(2.0),
            Preset::new(
                "plant-2",
                "Plant 2",
                Grammar::new("F", 22.5, 4).with_rule('F', "FF-[-F+F+F]+[+F-F-F]"),
            )
            .as_tree(2.0),
            Preset::new(
                "plant-3",
                "Plant 3",
                Grammar::new("A", 25.7, 7)
                    .with_rule('A', "F[+A][-A]FA")
                    .with_rule('F', "FF"),
            )
            .as_tree(2.0),
        ];
        for preset in presets {
            registry.register(preset);
        }
        registry
    }

    /// Read every `*.json` preset in `dir`. Files that fail to parse are
    /// skipped with a warning. A missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        registry.extend_from_dir(dir)?;
        Ok(registry)
    }

    pub fn extend_from_dir(&mut self, dir: &Path) -> Result<usize, std::io::Error> {
        let mut loaded = 0;
        if !dir.exists() {
            debug!(dir = %dir.display(), "preset directory not found");
            return Ok(loaded);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                let parsed = fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|content| {
                        serde_json::from_str::<Preset>(&content).map_err(|e| e.to_string())
                    });
                match parsed {
                    Ok(preset) => {
                        debug!(id = %preset.id, path = %path.display(), "loaded preset");
                        self.register(preset);
                        loaded += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping preset file"),
                }
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    pub fn list(&self) -> Vec<&Preset> {
        self.presets.values().collect()
    }

    pub fn register(&mut self, preset: Preset) {
        self.presets.insert(preset.id.clone(), preset);
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
