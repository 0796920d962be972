//! Run configuration, stored as `arkabc.config.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::SchemeKind;
use crate::curve::CurveId;
use crate::error::{Result, ZkError};

pub const CONFIG_FILE: &str = "arkabc.config.json";

/// Which curve and scheme a pipeline runs on, and how it is benchmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub curve: CurveId,
    pub scheme: SchemeKind,
    /// Iterations for each benchmark stage. 1 runs each stage once.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Fixed RNG seed for reproducible keys and proofs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_iterations() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            curve: CurveId::Bn254,
            scheme: SchemeKind::Groth16,
            iterations: default_iterations(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ZkError::InvalidConfig(
                "benchmark iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load a JSON config file and validate it with `check`.
pub fn load_json<T, F>(path: &Path, check: F) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce(&T) -> Result<()>,
{
    let contents = std::fs::read_to_string(path).map_err(|e| ZkError::ConfigNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: T = serde_json::from_str(&contents).map_err(|e| ZkError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    check(&value)?;
    Ok(value)
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ZkError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<PipelineConfig> {
    load_json(path, PipelineConfig::validate)
}

pub fn save(config: &PipelineConfig, path: &Path) -> Result<()> {
    config.validate()?;
    save_json(config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = PipelineConfig {
            curve: CurveId::Bls12_377,
            scheme: SchemeKind::Marlin,
            iterations: 10,
            seed: Some(42),
        };
        save(&config, &path).unwrap();
        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn test_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "curve": "BW6-761", "scheme": "groth16" }"#).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.curve, CurveId::Bw6_761);
        assert_eq!(config.iterations, 1);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_config_unknown_curve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "curve": "P-256", "scheme": "groth16" }"#).unwrap();
        assert!(matches!(load(&path), Err(ZkError::ConfigParse { .. })));
    }

    #[test]
    fn test_config_zero_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{ "curve": "BN254", "scheme": "marlin", "iterations": 0 }"#,
        )
        .unwrap();
        assert_eq!(load(&path).unwrap_err().category(), ErrorCategory::Config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = load(Path::new("/tmp/nonexistent_arkabc_config.json"));
        assert!(matches!(result, Err(ZkError::ConfigNotFound { .. })));
    }
}
