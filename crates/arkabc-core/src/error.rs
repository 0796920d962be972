//! Unified error types for the arkabc toolkit.

use std::path::PathBuf;

use ark_relations::r1cs::SynthesisError;
use ark_serialize::SerializationError;
use thiserror::Error;

use crate::codec::ArtifactKind;
use crate::curve::CurveId;
use crate::pipeline::Stage;

/// All errors that can occur during arkabc operations.
#[derive(Error, Debug)]
pub enum ZkError {
    // --- Configuration ---

    /// The configuration file was not found.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The curve name is not in the registry.
    #[error("unknown curve: {0} (supported: BN254, BLS12-381, BLS12-377, BW6-761, MNT4-298, MNT6-298)")]
    UnknownCurve(String),

    /// The proving scheme name is not one of: `groth16`, `marlin`.
    #[error("unknown proving scheme: {0} (supported: groth16, marlin)")]
    UnknownScheme(String),

    /// The (inner, outer) curve pair is not on the recursion whitelist.
    #[error("unsupported curve embedding: {inner} proofs cannot be verified inside {outer} circuits")]
    UnsupportedEmbedding { inner: CurveId, outer: CurveId },

    /// Recursion on a single curve. Its verifier would do pairing arithmetic
    /// over a foreign field, and there are no emulated pairing gadgets for that.
    #[error("same-curve recursion is not supported: verifying {curve} proofs inside {curve} circuits needs emulated pairing gadgets")]
    SameCurveRecursion { curve: CurveId },

    /// A parameter outside the accepted range (zero iterations, odd sibling list, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // --- Circuit shape ---

    /// Assigned values or generated witness disagree with the fixed circuit shape.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    // --- Pipeline stages ---

    /// Constraint synthesis failed while compiling the circuit.
    #[error("circuit compilation failed: {0}")]
    Compilation(#[source] SynthesisError),

    /// Key or reference-string generation failed.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The circuit could not be evaluated on the assigned values.
    #[error("witness generation failed: {0}")]
    Witness(#[source] SynthesisError),

    /// The assigned values do not satisfy the relation.
    #[error("relation not satisfied at constraint {0}")]
    Unsatisfied(String),

    /// The backend failed to produce a proof.
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    /// The proof was rejected, or the backend could not evaluate it.
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),

    /// A stage was invoked out of order.
    #[error("cannot {operation}: pipeline is {actual}, expected {expected}")]
    InvalidState {
        operation: &'static str,
        expected: Stage,
        actual: Stage,
    },

    // --- Artifacts ---

    /// A required artifact file does not exist.
    #[error("artifact not found: {0}")]
    MissingArtifact(PathBuf),

    /// The artifact header does not describe the requested curve or kind.
    #[error("artifact header mismatch: {0}")]
    ArtifactHeader(String),

    /// The artifact body could not be encoded or decoded.
    #[error("failed to serialize {kind} artifact")]
    Codec {
        kind: ArtifactKind,
        #[source]
        source: SerializationError,
    },

    /// The base64 text form of an artifact is malformed.
    #[error("invalid base64 artifact: {0}")]
    Base64(#[from] base64::DecodeError),

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy used by callers that react per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Shape,
    Compilation,
    Setup,
    Prove,
    Verify,
    Io,
    Config,
    State,
}

impl ZkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::UnknownCurve(_)
            | Self::UnknownScheme(_)
            | Self::UnsupportedEmbedding { .. }
            | Self::SameCurveRecursion { .. }
            | Self::InvalidConfig(_) => ErrorCategory::Config,
            Self::ShapeMismatch { .. } => ErrorCategory::Shape,
            Self::Compilation(_) => ErrorCategory::Compilation,
            Self::Setup(_) => ErrorCategory::Setup,
            Self::Witness(_) | Self::Unsatisfied(_) | Self::ProofGeneration(_) => {
                ErrorCategory::Prove
            }
            Self::VerificationFailed(_) => ErrorCategory::Verify,
            Self::InvalidState { .. } => ErrorCategory::State,
            Self::MissingArtifact(_)
            | Self::ArtifactHeader(_)
            | Self::Codec { .. }
            | Self::Base64(_)
            | Self::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Alias for `Result<T, ZkError>`.
pub type Result<T> = std::result::Result<T, ZkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_of_config_errors() {
        assert_eq!(
            ZkError::UnknownCurve("secp256k1".into()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            ZkError::UnsupportedEmbedding {
                inner: CurveId::Bls12_381,
                outer: CurveId::Bw6_761,
            }
            .category(),
            ErrorCategory::Config
        );
        let same = ZkError::SameCurveRecursion { curve: CurveId::Bn254 };
        assert_eq!(same.category(), ErrorCategory::Config);
        assert!(same.to_string().contains("BN254 proofs inside BN254"));
    }

    #[test]
    fn test_category_of_stage_errors() {
        assert_eq!(
            ZkError::Unsatisfied("n == p * q".into()).category(),
            ErrorCategory::Prove
        );
        assert_eq!(
            ZkError::VerificationFailed("pairing check".into()).category(),
            ErrorCategory::Verify
        );
        assert_eq!(
            ZkError::MissingArtifact(PathBuf::from("output/layer_0_vk")).category(),
            ErrorCategory::Io
        );
    }

    #[test]
    fn test_invalid_state_message() {
        let err = ZkError::InvalidState {
            operation: "prove",
            expected: Stage::KeysReady,
            actual: Stage::Compiled,
        };
        assert_eq!(
            err.to_string(),
            "cannot prove: pipeline is compiled, expected keys-ready"
        );
    }
}
