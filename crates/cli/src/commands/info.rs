//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{bone_table, SessionBlueprint, SinkKind, SourceConfig, BONE_NAMES, MIRROR_PAIRS};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    render: RenderInfo,
    avatars: Vec<AvatarInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bones: Vec<BoneInfo>,
}

#[derive(Serialize)]
struct RenderInfo {
    fps: f64,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct AvatarInfo {
    id: String,
    source_kind: &'static str,
    rate_hz: f64,
    sink: SinkKind,
    mirroring: bool,
    smoothing_factor: f32,
    delay_recovery_rate: f64,
}

#[derive(Serialize)]
struct BoneInfo {
    id: i32,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirror: Option<&'static str>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn mirror_of(name: &str) -> Option<&'static str> {
    MIRROR_PAIRS.iter().find_map(|&(l, r)| match name {
        n if n == l => Some(r),
        n if n == r => Some(l),
        _ => None,
    })
}

fn bone_infos() -> Vec<BoneInfo> {
    let table = bone_table();
    BONE_NAMES
        .iter()
        .map(|&(id, name)| BoneInfo {
            id,
            name,
            role: table.role(name).map(|r| r.as_str()),
            mirror: mirror_of(name),
        })
        .collect()
}

fn build_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let avatars = blueprint
        .avatars
        .iter()
        .map(|a| {
            let engine = blueprint.engine_for(a);
            let SourceConfig::Mock(mock) = &a.source;
            AvatarInfo {
                id: a.id.to_string(),
                source_kind: "mock",
                rate_hz: mock.rate_hz,
                sink: a.sink,
                mirroring: engine.mirroring,
                smoothing_factor: engine.smoothing_factor,
                delay_recovery_rate: engine.delay_recovery_rate,
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        render: RenderInfo {
            fps: blueprint.render.fps,
            queue_capacity: blueprint.render.queue_capacity,
        },
        avatars,
        bones: if args.bones { bone_infos() } else { Vec::new() },
    }
}

fn print_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Mocap Player Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🎬 Render");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ FPS: {}", blueprint.render.fps);
    println!("   └─ Queue capacity: {}", blueprint.render.queue_capacity);

    println!("\n🧍 Avatars ({})", blueprint.avatars.len());
    for (i, avatar) in blueprint.avatars.iter().enumerate() {
        let is_last = i == blueprint.avatars.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let engine = blueprint.engine_for(avatar);
        let SourceConfig::Mock(mock) = &avatar.source;

        println!("   {} {} (sink {:?})", prefix, avatar.id, avatar.sink);
        println!(
            "   {}  ├─ Source: mock {} Hz, jitter {} ms, stall every {} frames",
            child_prefix, mock.rate_hz, mock.jitter_ms, mock.stall_every
        );
        println!(
            "   {}  └─ Engine: mirroring {}, smoothing {}, recovery {}",
            child_prefix, engine.mirroring, engine.smoothing_factor, engine.delay_recovery_rate
        );
    }

    if args.bones {
        let bones = bone_infos();
        println!("\n🦴 Bones ({})", bones.len());
        for (i, bone) in bones.iter().enumerate() {
            let prefix = if i == bones.len() - 1 { "└─" } else { "├─" };
            let role = bone.role.unwrap_or("-");
            match bone.mirror {
                Some(mirror) => println!(
                    "   {} {:>2} {:<12} {:<14} <-> {}",
                    prefix, bone.id, bone.name, role, mirror
                ),
                None => println!("   {} {:>2} {:<12} {}", prefix, bone.id, bone.name, role),
            }
        }
    }

    println!();
}
