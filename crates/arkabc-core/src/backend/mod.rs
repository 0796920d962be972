//! Proving schemes.
//!
//! A scheme turns a compiled [`R1cs`] into keys, proofs and verdicts. Two
//! strategies are provided:
//!
//! - [`Groth16`]: circuit-specific keys generated directly from the
//!   constraint system.
//! - [`Marlin`]: a universal KZG reference string sized to the constraint
//!   system, from which keys are indexed.

mod groth16;
mod marlin;

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::codec::Artifact;
use crate::curve::PairingCurve;
use crate::error::{Result, ZkError};
use crate::r1cs::R1cs;
use crate::witness::{FullWitness, PublicWitness};

pub use self::groth16::Groth16;
pub use self::marlin::{Marlin, MarlinPc};

/// Runtime tag selecting a proving scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    Groth16,
    Marlin,
}

impl SchemeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Groth16 => "groth16",
            Self::Marlin => "marlin",
        }
    }

    /// Whether setup goes through a universal structured reference string.
    pub fn uses_srs(self) -> bool {
        matches!(self, Self::Marlin)
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchemeKind {
    type Err = ZkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "groth16" => Ok(Self::Groth16),
            "marlin" => Ok(Self::Marlin),
            _ => Err(ZkError::UnknownScheme(s.to_string())),
        }
    }
}

/// A proving system over the pairing engine `E`.
pub trait ProvingScheme<E: PairingCurve>: Send + Sync + 'static {
    const KIND: SchemeKind;

    type ProvingKey: Artifact + Send + Sync + 'static;
    type VerifyingKey: Artifact + Clone + Send + Sync + 'static;
    type Proof: Artifact + Clone + Send + Sync + 'static;

    /// Generate a key pair for `r1cs`.
    fn setup<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        rng: &mut R,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey)>;

    /// Prove that `witness` satisfies `r1cs`.
    fn prove<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        pk: &Self::ProvingKey,
        witness: &FullWitness<E>,
        rng: &mut R,
    ) -> Result<Self::Proof>;

    /// Check `proof` against `public`. `Ok(false)` is a clean rejection;
    /// `Err` means the inputs could not be evaluated at all.
    fn verify(
        vk: &Self::VerifyingKey,
        public: &PublicWitness<E>,
        proof: &Self::Proof,
    ) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_name() {
        assert_eq!("groth16".parse::<SchemeKind>().unwrap(), SchemeKind::Groth16);
        assert_eq!("Marlin".parse::<SchemeKind>().unwrap(), SchemeKind::Marlin);
        assert!("bulletproofs".parse::<SchemeKind>().is_err());
    }

    #[test]
    fn test_scheme_serde() {
        assert_eq!(
            serde_json::to_string(&SchemeKind::Marlin).unwrap(),
            "\"marlin\""
        );
        assert!(SchemeKind::Marlin.uses_srs());
        assert!(!SchemeKind::Groth16.uses_srs());
    }
}
