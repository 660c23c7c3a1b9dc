//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SessionBlueprint, SourceConfig, MAX_DELAY_TIME};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    avatar_count: usize,
    render_fps: f64,
    mirrored_avatars: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_invalid(result.config_path).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let mirrored_avatars = blueprint
                .avatars
                .iter()
                .filter(|a| blueprint.engine_for(a).mirroring)
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    avatar_count: blueprint.avatars.len(),
                    render_fps: blueprint.render.fps,
                    mirrored_avatars,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let max_delay_ms = MAX_DELAY_TIME * 1000.0;

    for avatar in &blueprint.avatars {
        let engine = blueprint.engine_for(avatar);
        let SourceConfig::Mock(mock) = &avatar.source;

        if mock.rate_hz > blueprint.render.fps {
            warnings.push(format!(
                "Avatar '{}': source rate {} Hz exceeds render rate {} fps - samples will be skipped",
                avatar.id, mock.rate_hz, blueprint.render.fps
            ));
        }
        if mock.stall_every > 0 && mock.stall_ms >= max_delay_ms {
            warnings.push(format!(
                "Avatar '{}': stalls of {} ms exceed the {:.0} ms playback window - delay will overflow",
                avatar.id, mock.stall_ms, max_delay_ms
            ));
        }
        if mock.mirrored_source && !engine.mirroring {
            warnings.push(format!(
                "Avatar '{}': source sends mirrored frames but mirroring is disabled",
                avatar.id
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Avatars: {}", summary.avatar_count);
            println!("  Render FPS: {}", summary.render_fps);
            println!("  Mirrored avatars: {}", summary.mirrored_avatars);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
