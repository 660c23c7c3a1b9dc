//! Config validation
//!
//! Rules:
//! - at least one avatar
//! - avatar ids non-empty and unique
//! - mock source rate_hz > 0, jitter_ms / stall_ms >= 0
//! - range checks declared on the config types (engine, render, overrides)

use std::collections::HashSet;

use contracts::{ContractError, SessionBlueprint, SourceConfig};
use validator::Validate;

/// Validate a SessionBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_avatar_ids(blueprint)?;
    validate_sources(blueprint)?;
    Ok(())
}

/// Derive-based range checks
fn validate_ranges(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    check("session", blueprint)?;
    for avatar in &blueprint.avatars {
        if let Some(engine) = &avatar.engine {
            check(&format!("avatars[{}].engine", avatar.id), engine)?;
        }
    }
    Ok(())
}

fn check(field: &str, value: &impl Validate) -> Result<(), ContractError> {
    value
        .validate()
        .map_err(|e| ContractError::config_validation(field, e.to_string()))
}

fn validate_avatar_ids(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if blueprint.avatars.is_empty() {
        return Err(ContractError::config_validation(
            "avatars",
            "at least one avatar is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, avatar) in blueprint.avatars.iter().enumerate() {
        if avatar.id.is_blank() {
            return Err(ContractError::config_validation(
                format!("avatars[{idx}].id"),
                "avatar id cannot be empty",
            ));
        }
        if !seen.insert(avatar.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("avatars[id={}]", avatar.id),
                "duplicate avatar id",
            ));
        }
    }
    Ok(())
}

fn validate_sources(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for avatar in &blueprint.avatars {
        let SourceConfig::Mock(mock) = &avatar.source;
        let field = |name: &str| format!("avatars[{}].source.{name}", avatar.id);

        if !(mock.rate_hz.is_finite() && mock.rate_hz > 0.0) {
            return Err(ContractError::config_validation(
                field("rate_hz"),
                format!("rate_hz must be > 0, got {}", mock.rate_hz),
            ));
        }
        if mock.jitter_ms < 0.0 {
            return Err(ContractError::config_validation(
                field("jitter_ms"),
                format!("jitter_ms must be >= 0, got {}", mock.jitter_ms),
            ));
        }
        if mock.stall_ms < 0.0 {
            return Err(ContractError::config_validation(
                field("stall_ms"),
                format!("stall_ms must be >= 0, got {}", mock.stall_ms),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        AvatarConfig, ConfigVersion, MockSourceConfig, PoseEngineConfig, RenderConfig, SinkKind,
    };

    fn minimal_blueprint() -> SessionBlueprint {
        SessionBlueprint {
            version: ConfigVersion::V1,
            engine: PoseEngineConfig::default(),
            render: RenderConfig::default(),
            avatars: vec![AvatarConfig {
                id: "performer".into(),
                source: SourceConfig::Mock(MockSourceConfig::default()),
                sink: SinkKind::Log,
                engine: None,
            }],
        }
    }

    fn mock_mut(bp: &mut SessionBlueprint) -> &mut MockSourceConfig {
        let SourceConfig::Mock(mock) = &mut bp.avatars[0].source;
        mock
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_no_avatars() {
        let mut bp = minimal_blueprint();
        bp.avatars.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one avatar"), "got: {err}");
    }

    #[test]
    fn test_duplicate_avatar_id() {
        let mut bp = minimal_blueprint();
        bp.avatars.push(bp.avatars[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate avatar id"), "got: {err}");
    }

    #[test]
    fn test_empty_avatar_id() {
        let mut bp = minimal_blueprint();
        bp.avatars[0].id = " ".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_invalid_rate() {
        let mut bp = minimal_blueprint();
        mock_mut(&mut bp).rate_hz = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("rate_hz must be > 0"), "got: {err}");
    }

    #[test]
    fn test_negative_jitter() {
        let mut bp = minimal_blueprint();
        mock_mut(&mut bp).jitter_ms = -1.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("jitter_ms"), "got: {err}");
    }

    #[test]
    fn test_engine_range_checked() {
        let mut bp = minimal_blueprint();
        bp.engine.delay_recovery_rate = 2.0;
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
        assert!(err.to_string().contains("delay_recovery_rate"), "got: {err}");
    }

    #[test]
    fn test_override_range_checked() {
        let mut bp = minimal_blueprint();
        bp.avatars[0].engine = Some(PoseEngineConfig {
            smoothing_factor: -0.5,
            ..Default::default()
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("avatars[performer].engine"), "got: {err}");
    }

    #[test]
    fn test_render_fps_checked() {
        let mut bp = minimal_blueprint();
        bp.render.fps = 0.0;
        assert!(validate(&bp).is_err());
    }
}
