//! L-system CLI - JSON bridge over the generation pipeline
//!
//! Commands: presets, validate, expand, generate
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or generation failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

use lsystem_core::{GenerateRequest, GenerationPipeline, PresetRegistry};

#[derive(Parser)]
#[command(name = "lsystem-cli")]
#[command(about = "L-system CLI - grammar expansion and turtle geometry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra presets directory, merged over the builtin presets
    #[arg(short, long, default_value = "presets")]
    presets_dir: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List available presets
    Presets,

    /// Validate a preset or inline grammar
    Validate {
        /// Preset ID
        #[arg(short = 'i', long)]
        preset: String,

        /// JSON payload (GenerateRequest)
        #[arg(short = 'j', long)]
        payload: Option<String>,
    },

    /// Print the expanded symbol string
    Expand {
        /// Preset ID
        #[arg(short = 'i', long)]
        preset: String,

        /// JSON payload (GenerateRequest)
        #[arg(short = 'j', long)]
        payload: Option<String>,
    },

    /// Generate path or tree geometry
    Generate {
        /// Preset ID
        #[arg(short = 'i', long)]
        preset: String,

        /// JSON payload (GenerateRequest)
        #[arg(short = 'j', long)]
        payload: Option<String>,
    },
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("lsystem_core={level},lsystem_cli={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to serialize output");
            ExitCode::FAILURE
        }
    }
}

fn fail(code: u8, message: String) -> ExitCode {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
    ExitCode::from(code)
}

/// Build a request from an optional JSON payload; the command-line preset
/// always wins over any `preset_id` in the payload.
fn request_for(preset: String, payload: Option<String>) -> Result<GenerateRequest, String> {
    let request = match payload {
        Some(p) => serde_json::from_str::<GenerateRequest>(&p)
            .map_err(|e| format!("Invalid payload: {e}"))?,
        None => GenerateRequest::preset(&preset),
    };
    Ok(GenerateRequest {
        preset_id: preset,
        ..request
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut registry = PresetRegistry::builtin();
    match registry.extend_from_dir(&cli.presets_dir) {
        Ok(n) => debug!(loaded = n, dir = %cli.presets_dir.display(), "presets loaded"),
        Err(e) => return fail(1, format!("Failed to load presets: {e}")),
    }

    let pipeline = GenerationPipeline::new(registry);

    match cli.command {
        Commands::Presets => {
            let presets: Vec<_> = pipeline
                .list_presets()
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "name": p.name,
                        "version": p.preset_version,
                        "mode": p.mode,
                        "iterations": p.grammar.iterations,
                        "predicted_length": p.grammar.predicted_length(),
                    })
                })
                .collect();
            emit(&presets)
        }

        Commands::Validate { preset, payload } => {
            let request = match request_for(preset, payload) {
                Ok(r) => r,
                Err(e) => return fail(1, e),
            };
            match pipeline.validate(&request) {
                Ok(result) => {
                    let code = emit(&result);
                    if result.valid {
                        code
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => fail(1, e.to_string()),
            }
        }

        Commands::Expand { preset, payload } => {
            let request = match request_for(preset, payload) {
                Ok(r) => r,
                Err(e) => return fail(1, e),
            };
            match pipeline.expand(&request) {
                Ok(expanded) => emit(&serde_json::json!({
                    "success": true,
                    "length": expanded.chars().count(),
                    "symbols": expanded,
                })),
                Err(e) => fail(2, e.to_string()),
            }
        }

        Commands::Generate { preset, payload } => {
            let request = match request_for(preset, payload) {
                Ok(r) => r,
                Err(e) => return fail(1, e),
            };
            match pipeline.generate(&request) {
                Ok(structure) => emit(&serde_json::json!({
                    "success": true,
                    "structure": structure,
                })),
                Err(e) => {
                    error!(error = %e, "generation failed");
                    fail(2, e.to_string())
                }
            }
        }
    }
}
