//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{SessionBlueprint, SourceConfig};
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(fps) = args.fps {
        info!(fps, "Overriding render fps from CLI");
        blueprint.render.fps = fps;
    }
    if let Some(capacity) = args.queue_capacity {
        info!(capacity, "Overriding queue capacity from CLI");
        blueprint.render.queue_capacity = capacity;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Invalid configuration after CLI overrides")?;

    info!(
        avatars = blueprint.avatars.len(),
        fps = blueprint.render.fps,
        queue_capacity = blueprint.render.queue_capacity,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_ticks: (args.max_ticks > 0).then_some(args.max_ticks),
        frames_per_source: (args.frames > 0).then_some(args.frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting session...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Session execution failed")?;
            info!(
                ticks = stats.ticks,
                poses_emitted = stats.poses_emitted,
                duration_secs = stats.duration.as_secs_f64(),
                tps = format!("{:.2}", stats.tps()),
                "Session completed successfully"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping session...");
        }
    }

    info!("Mocap player finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Render:");
    println!("  FPS: {}", blueprint.render.fps);
    println!("  Queue capacity: {}", blueprint.render.queue_capacity);
    println!("\nAvatars ({}):", blueprint.avatars.len());
    for avatar in &blueprint.avatars {
        let engine = blueprint.engine_for(avatar);
        let SourceConfig::Mock(mock) = &avatar.source;
        println!(
            "  - {} (mock {} Hz, sink {:?}, mirroring {}, smoothing {})",
            avatar.id, mock.rate_hz, avatar.sink, engine.mirroring, engine.smoothing_factor
        );
    }
    println!();
}
