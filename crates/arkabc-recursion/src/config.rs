//! Aggregation settings, stored as `arkabc.aggregate.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use arkabc_core::config::{load_json, save_json};
use arkabc_core::{CurveId, Result, ZkError};

use crate::embedding::check_embedding;

pub const AGGREGATE_FILE: &str = "arkabc.aggregate.json";

/// How the child verifying key enters the aggregation circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMaterial {
    /// Allocated as a private witness. One compiled circuit serves any child
    /// key of the right shape, at the cost of more constraints.
    #[default]
    Witness,
    /// Baked in as constants. Smaller circuit, recompiled per child key.
    Constant,
}

impl KeyMaterial {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Witness => "witness",
            Self::Constant => "constant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Curve the leaf proofs are made on (always Groth16).
    pub leaf_curve: CurveId,
    /// Outer curve of each aggregation depth, starting at depth 1. Each
    /// entry must be the whitelisted partner of the one before it.
    pub chain: Vec<CurveId>,
    #[serde(default)]
    pub key_material: KeyMaterial,
    /// Directory holding every `layer_*` artifact.
    pub output_dir: PathBuf,
    /// Fixed RNG seed for reproducible keys and proofs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl AggregationConfig {
    /// Check the whole curve chain before any proving starts.
    pub fn validate(&self) -> Result<()> {
        if self.chain.is_empty() {
            return Err(ZkError::InvalidConfig(
                "aggregation chain needs at least one outer curve".into(),
            ));
        }
        let mut inner = self.leaf_curve;
        for &outer in &self.chain {
            check_embedding(inner, outer)?;
            inner = outer;
        }
        Ok(())
    }

    /// Inner curve of depth `depth`'s children: the leaf curve at depth 0.
    pub fn curve_at(&self, depth: usize) -> Option<CurveId> {
        match depth {
            0 => Some(self.leaf_curve),
            d => self.chain.get(d - 1).copied(),
        }
    }

    /// Deepest level this chain can reach.
    pub fn max_depth(&self) -> usize {
        self.chain.len()
    }
}

pub fn load(path: &Path) -> Result<AggregationConfig> {
    load_json(path, AggregationConfig::validate)
}

pub fn save(config: &AggregationConfig, path: &Path) -> Result<()> {
    config.validate()?;
    save_json(config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkabc_core::ErrorCategory;

    fn mnt_cycle() -> AggregationConfig {
        AggregationConfig {
            leaf_curve: CurveId::Mnt4_298,
            chain: vec![CurveId::Mnt6_298, CurveId::Mnt4_298, CurveId::Mnt6_298],
            key_material: KeyMaterial::Witness,
            output_dir: PathBuf::from("output"),
            seed: Some(1),
        }
    }

    #[test]
    fn test_chain_validation() {
        let config = mnt_cycle();
        config.validate().unwrap();
        assert_eq!(config.max_depth(), 3);
        assert_eq!(config.curve_at(0), Some(CurveId::Mnt4_298));
        assert_eq!(config.curve_at(2), Some(CurveId::Mnt4_298));
        assert_eq!(config.curve_at(4), None);

        let two_chain = AggregationConfig {
            leaf_curve: CurveId::Bls12_377,
            chain: vec![CurveId::Bw6_761, CurveId::Bls12_377],
            ..mnt_cycle()
        };
        let err = two_chain.validate().unwrap_err();
        assert!(matches!(
            err,
            ZkError::UnsupportedEmbedding {
                inner: CurveId::Bw6_761,
                outer: CurveId::Bls12_377
            }
        ));
        assert_eq!(err.category(), ErrorCategory::Config);

        let empty = AggregationConfig {
            chain: vec![],
            ..mnt_cycle()
        };
        assert_eq!(empty.validate().unwrap_err().category(), ErrorCategory::Config);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AGGREGATE_FILE);
        let config = AggregationConfig {
            key_material: KeyMaterial::Constant,
            ..mnt_cycle()
        };
        save(&config, &path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"key_material\": \"constant\""));
        assert!(json.contains("\"MNT6-298\""));
        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn test_config_defaults_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AGGREGATE_FILE);
        std::fs::write(
            &path,
            r#"{ "leaf_curve": "BLS12-377", "chain": ["BW6-761"], "output_dir": "out" }"#,
        )
        .unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.key_material, KeyMaterial::Witness);
        assert_eq!(config.seed, None);

        std::fs::write(
            &path,
            r#"{ "leaf_curve": "BN254", "chain": ["BN254"], "output_dir": "out" }"#,
        )
        .unwrap();
        assert!(matches!(
            load(&path),
            Err(ZkError::SameCurveRecursion { curve: CurveId::Bn254 })
        ));
    }
}
