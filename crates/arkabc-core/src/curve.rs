//! Curve registry.
//!
//! Maps curve names to the pairing engines the pipeline can be instantiated
//! over. The registry is built once by the caller and passed around
//! explicitly; there is no process-wide table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use ark_ec::PairingEngine;
use ark_ff::{BigInteger, FpParameters, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ZkError};

pub use ark_bls12_377::Bls12_377;
pub use ark_bls12_381::Bls12_381;
pub use ark_bn254::Bn254;
pub use ark_bw6_761::BW6_761;
pub use ark_mnt4_298::MNT4_298;
pub use ark_mnt6_298::MNT6_298;

/// Identifier of a supported pairing-friendly curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveId {
    #[serde(rename = "BN254")]
    Bn254,
    #[serde(rename = "BLS12-381")]
    Bls12_381,
    #[serde(rename = "BLS12-377")]
    Bls12_377,
    #[serde(rename = "BW6-761")]
    Bw6_761,
    #[serde(rename = "MNT4-298")]
    Mnt4_298,
    #[serde(rename = "MNT6-298")]
    Mnt6_298,
}

impl CurveId {
    pub const ALL: [CurveId; 6] = [
        CurveId::Bn254,
        CurveId::Bls12_381,
        CurveId::Bls12_377,
        CurveId::Bw6_761,
        CurveId::Mnt4_298,
        CurveId::Mnt6_298,
    ];

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bn254 => "BN254",
            Self::Bls12_381 => "BLS12-381",
            Self::Bls12_377 => "BLS12-377",
            Self::Bw6_761 => "BW6-761",
            Self::Mnt4_298 => "MNT4-298",
            Self::Mnt6_298 => "MNT6-298",
        }
    }

    /// One-byte tag used in artifact headers.
    pub fn tag(self) -> u8 {
        match self {
            Self::Bn254 => 1,
            Self::Bls12_381 => 2,
            Self::Bls12_377 => 3,
            Self::Bw6_761 => 4,
            Self::Mnt4_298 => 5,
            Self::Mnt6_298 => 6,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.tag() == tag)
    }

    fn index(self) -> usize {
        self.tag() as usize - 1
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurveId {
    type Err = ZkError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|id| normalize(id.name()) == wanted)
            .ok_or_else(|| ZkError::UnknownCurve(s.to_string()))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A pairing engine the pipeline can be instantiated over.
pub trait PairingCurve: PairingEngine {
    const ID: CurveId;
}

impl PairingCurve for Bn254 {
    const ID: CurveId = CurveId::Bn254;
}

impl PairingCurve for Bls12_381 {
    const ID: CurveId = CurveId::Bls12_381;
}

impl PairingCurve for Bls12_377 {
    const ID: CurveId = CurveId::Bls12_377;
}

impl PairingCurve for BW6_761 {
    const ID: CurveId = CurveId::Bw6_761;
}

impl PairingCurve for MNT4_298 {
    const ID: CurveId = CurveId::Mnt4_298;
}

impl PairingCurve for MNT6_298 {
    const ID: CurveId = CurveId::Mnt6_298;
}

/// Runs `$body` with `$E` bound to the engine type of a runtime [`CurveId`].
///
/// ```ignore
/// let bits = with_curve!(curve, E => scalar_bits::<E>());
/// ```
#[macro_export]
macro_rules! with_curve {
    ($curve:expr, $E:ident => $body:expr) => {
        match $curve {
            $crate::curve::CurveId::Bn254 => {
                type $E = $crate::curve::Bn254;
                $body
            }
            $crate::curve::CurveId::Bls12_381 => {
                type $E = $crate::curve::Bls12_381;
                $body
            }
            $crate::curve::CurveId::Bls12_377 => {
                type $E = $crate::curve::Bls12_377;
                $body
            }
            $crate::curve::CurveId::Bw6_761 => {
                type $E = $crate::curve::BW6_761;
                $body
            }
            $crate::curve::CurveId::Mnt4_298 => {
                type $E = $crate::curve::MNT4_298;
                $body
            }
            $crate::curve::CurveId::Mnt6_298 => {
                type $E = $crate::curve::MNT6_298;
                $body
            }
        }
    };
}

/// Static facts about one registered curve.
#[derive(Debug, Clone, Serialize)]
pub struct CurveEntry {
    pub id: CurveId,
    pub name: &'static str,
    /// Scalar field modulus in decimal.
    pub scalar_modulus: String,
    pub scalar_bits: u32,
    /// Bits usable for packing data into one scalar field element.
    pub scalar_capacity: u32,
    pub base_bits: u32,
    /// Whether a KZG universal reference string can be built on this curve.
    pub universal_srs: bool,
    /// Whether Groth16 proofs on this curve can be formatted as EVM call data.
    pub evm_calldata: bool,
}

impl CurveEntry {
    pub fn of<E: PairingCurve>() -> Self {
        let modulus = <E::Fr as PrimeField>::Params::MODULUS.to_bytes_le();
        Self {
            id: E::ID,
            name: E::ID.name(),
            scalar_modulus: BigUint::from_bytes_le(&modulus).to_str_radix(10),
            scalar_bits: <E::Fr as PrimeField>::Params::MODULUS_BITS,
            scalar_capacity: <E::Fr as PrimeField>::Params::CAPACITY,
            base_bits: <E::Fq as PrimeField>::Params::MODULUS_BITS,
            universal_srs: true,
            evm_calldata: E::ID == CurveId::Bn254,
        }
    }
}

/// Immutable name → curve table.
#[derive(Debug, Clone)]
pub struct CurveRegistry {
    entries: Vec<CurveEntry>,
    by_name: HashMap<String, CurveId>,
}

impl Default for CurveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveRegistry {
    pub fn new() -> Self {
        let entries: Vec<CurveEntry> = CurveId::ALL
            .into_iter()
            .map(|id| with_curve!(id, E => CurveEntry::of::<E>()))
            .collect();
        let by_name = entries
            .iter()
            .map(|entry| (normalize(entry.name), entry.id))
            .collect();
        Self { entries, by_name }
    }

    /// Resolve a curve by name. Case, dashes and underscores are ignored.
    pub fn lookup(&self, name: &str) -> Result<&CurveEntry> {
        self.by_name
            .get(&normalize(name))
            .map(|id| self.get(*id))
            .ok_or_else(|| ZkError::UnknownCurve(name.to_string()))
    }

    pub fn get(&self, id: CurveId) -> &CurveEntry {
        &self.entries[id.index()]
    }

    pub fn entries(&self) -> impl Iterator<Item = &CurveEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_lookup_every_supported_curve() {
        let registry = CurveRegistry::new();
        for id in CurveId::ALL {
            let entry = registry.lookup(id.name()).unwrap();
            assert_eq!(entry.id, id);
            assert_eq!(registry.get(id).name, id.name());
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_separators() {
        let registry = CurveRegistry::new();
        assert_eq!(registry.lookup("bls12_381").unwrap().id, CurveId::Bls12_381);
        assert_eq!(registry.lookup("bw6761").unwrap().id, CurveId::Bw6_761);
        assert_eq!(registry.lookup("Bn254").unwrap().id, CurveId::Bn254);
    }

    #[test]
    fn test_lookup_unknown_curve() {
        let registry = CurveRegistry::new();
        let err = registry.lookup("secp256k1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.to_string().contains("secp256k1"));
    }

    #[test]
    fn test_bn254_scalar_modulus() {
        let registry = CurveRegistry::new();
        let entry = registry.get(CurveId::Bn254);
        assert_eq!(
            entry.scalar_modulus,
            "21888242871839275222246405745257275088548364400416034343698204186575808495617"
        );
        assert_eq!(entry.scalar_bits, 254);
        assert!(entry.evm_calldata);
        assert!(!registry.get(CurveId::Bls12_381).evm_calldata);
    }

    #[test]
    fn test_embedding_fields_line_up() {
        let registry = CurveRegistry::new();
        // BW6-761 scalar field is the BLS12-377 base field.
        assert_eq!(
            registry.get(CurveId::Bw6_761).scalar_bits,
            registry.get(CurveId::Bls12_377).base_bits
        );
        assert_eq!(
            registry.get(CurveId::Mnt6_298).scalar_bits,
            registry.get(CurveId::Mnt4_298).base_bits
        );
    }

    #[test]
    fn test_tags_roundtrip() {
        for id in CurveId::ALL {
            assert_eq!(CurveId::from_tag(id.tag()), Some(id));
        }
        assert_eq!(CurveId::from_tag(0), None);
        assert_eq!("MNT4-298".parse::<CurveId>().unwrap(), CurveId::Mnt4_298);
    }

    #[test]
    fn test_curve_id_serde_names() {
        let json = serde_json::to_string(&CurveId::Bls12_377).unwrap();
        assert_eq!(json, "\"BLS12-377\"");
        let back: CurveId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CurveId::Bls12_377);
    }
}
