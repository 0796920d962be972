//! Recursive proof aggregation for arkabc.
//!
//! Leaf proofs made with Groth16 on an inner curve are verified pairwise
//! inside circuits over an outer curve whose scalar field is the inner base
//! field. Folding continues along a chain of such pairs (BLS12-377 into
//! BW6-761, or round the MNT4-298/MNT6-298 cycle) until one proof remains.

pub mod circuit;
pub mod composer;
pub mod config;
pub mod embedding;
pub mod level;

pub use circuit::{AggregationCircuit, ChildProof, NodeShape, NodeValues};
pub use composer::{plan_layers, LayerReport, RecursiveComposer, TreeReport};
pub use config::{AggregationConfig, KeyMaterial};
pub use embedding::{
    check_embedding, embed_public_inputs, recombine_public_inputs, Bls12_377InBw6_761,
    CurveEmbedding, Mnt4InMnt6, Mnt6InMnt4, WHITELIST,
};
pub use level::{Level, NodeReport};
