//! Demo configuration: built-in defaults or a JSON file from the environment.

use deformation::{DeformationConfig, DeformationError};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "DEFORMATION_CONFIG";

/// Settings that suit the demo scene: a 128 m window at 25 cm per texel.
pub fn demo_config() -> DeformationConfig {
    DeformationConfig {
        resolution: 512,
        capture_extent: 128.0,
        temporal_filter_factor: 8.0,
        accumulation_rate: 2.0,
        accumulation_cap: 1.5,
        decay_rate: 0.05,
        non_uniform_exponent: 1.5,
        ..DeformationConfig::default()
    }
}

/// Load the config named by `path`, or the demo defaults when there is none.
pub fn load_config(path: Option<&str>) -> Result<DeformationConfig, DeformationError> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        return Ok(demo_config());
    };
    let json = std::fs::read_to_string(path).map_err(|e| {
        DeformationError::Configuration(format!("cannot read config file {path}: {e}"))
    })?;
    DeformationConfig::from_json_str(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "deformation_demo_{}_{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_demo_config_is_valid() {
        let config = demo_config();
        assert!(config.validate().is_ok());
        assert!((config.texel_world_size() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_missing_path_uses_demo_defaults() {
        assert_eq!(load_config(None).unwrap(), demo_config());
        assert_eq!(load_config(Some("  ")).unwrap(), demo_config());
    }

    #[test]
    fn test_partial_file_keeps_library_defaults() {
        let path = write_temp("partial", r#"{ "resolution": 256, "decay_rate": 1.5 }"#);
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.resolution, 256);
        assert_eq!(config.decay_rate, 1.5);
        assert_eq!(
            config.capture_extent,
            DeformationConfig::default().capture_extent
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_unreadable_file_is_configuration_error() {
        let err = load_config(Some("/nonexistent/deformation.json")).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("cannot read config file"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let path = write_temp("invalid", r#"{ "resolution": 300 }"#);
        let err = load_config(path.to_str()).unwrap_err();
        assert!(matches!(err, DeformationError::Configuration(_)));
        let _ = std::fs::remove_file(path);
    }
}
