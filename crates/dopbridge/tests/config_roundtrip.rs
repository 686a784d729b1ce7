//! Solver configuration persistence
//!
//! - JSON and YAML files load back to the saved configuration
//! - Missing fields fall back to defaults
//! - Unreadable files surface as errors, not panics

use std::path::PathBuf;

use dopbridge::{ConfigError, SolverConfig};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("dopbridge-{}-{}", std::process::id(), name))
}

fn tuned() -> SolverConfig {
    SolverConfig {
        radius: 0.05,
        iterations: 5,
        substeps: 2,
        viscosity: 0.3,
        planes_count: 1,
        evict_stale_proxies: true,
        ..Default::default()
    }
}

// ============================================================================
// FILES
// ============================================================================

#[test]
fn test_json_file_roundtrip() {
    let path = temp_path("config.json");
    let config = tuned();

    config.save_json(&path).unwrap();
    let loaded = SolverConfig::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, config);
}

#[test]
fn test_yaml_file_roundtrip() {
    let path = temp_path("config.yaml");
    let config = tuned();

    config.save_yaml(&path).unwrap();
    let loaded = SolverConfig::load_yaml(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = SolverConfig::load_json(&temp_path("does-not-exist.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)), "got {err}");
}

// ============================================================================
// PARTIAL DOCUMENTS
// ============================================================================

#[test]
fn test_partial_json_uses_defaults() {
    let config: SolverConfig = serde_json::from_str(r#"{ "radius": 0.2, "substeps": 3 }"#).unwrap();
    assert_eq!(config.radius, 0.2);
    assert_eq!(config.substeps, 3);
    assert_eq!(config.iterations, SolverConfig::default().iterations);
    assert_eq!(config.max_particles, SolverConfig::default().max_particles);
}

#[test]
fn test_malformed_yaml_is_rejected() {
    let path = temp_path("broken.yaml");
    std::fs::write(&path, "radius: [not, a, number]\n").unwrap();
    let err = SolverConfig::load_yaml(&path).unwrap_err();
    let _ = std::fs::remove_file(&path);

    assert!(matches!(err, ConfigError::Yaml(_)), "got {err}");
}

#[test]
fn test_loaded_config_is_validated_separately() {
    let config: SolverConfig = serde_json::from_str(r#"{ "drag": -2.0 }"#).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange { field: "drag", .. })
    ));
    assert_eq!(config.clamped().drag, 0.0);
}
