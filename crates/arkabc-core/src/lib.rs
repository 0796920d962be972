//! Core library for the arkabc toolkit.
//!
//! Takes an arithmetic circuit through compile, setup, prove and verify on
//! any registered pairing curve, with either a circuit-specific (Groth16) or
//! a universal-SRS (Marlin) proving scheme:
//!
//! - [`curve`]: the curve registry and the [`curve::PairingCurve`] engines.
//! - [`circuit`]: the two-phase circuit contract.
//! - [`pipeline`]: the proof lifecycle state machine and benchmarks.
//! - [`codec`] and [`store`]: header-tagged artifact encoding and files.
//! - [`export`]: decimal call data for EVM verifier contracts.
//!
//! Reference circuits live in `arkabc-circuits`; recursive aggregation in
//! `arkabc-recursion`.

pub mod backend;
pub mod circuit;
pub mod codec;
pub mod config;
pub mod curve;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod r1cs;
pub mod store;
pub mod witness;

pub use backend::{Groth16, Marlin, ProvingScheme, SchemeKind};
pub use circuit::{Circuit, Relation};
pub use curve::{CurveId, CurveRegistry, PairingCurve};
pub use error::{ErrorCategory, Result, ZkError};
pub use pipeline::{Pipeline, ProofPipeline, Stage, Verified};
pub use r1cs::R1cs;
pub use store::ArtifactStore;
pub use witness::{FullWitness, PublicWitness};
