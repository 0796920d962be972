//! One depth of the aggregation tree.
//!
//! Every node at a depth has the same shape, so the depth compiles and sets
//! up once. The result is persisted as `layer_{d}_{ccs,pk,vk}` together with
//! a copy of the child key it was built against (`layer_{d}_child_vk`), and is
//! reloaded on later runs only while that child key is unchanged.

use std::sync::Arc;
use std::time::Instant;

use ark_groth16::{Proof, ProvingKey, VerifyingKey};
use serde::Serialize;
use tracing::{debug, info, instrument};

use arkabc_core::circuit::Circuit;
use arkabc_core::{
    ArtifactStore, Groth16, PairingCurve, Pipeline, PublicWitness, Result, Stage, ZkError, R1cs,
};

use crate::circuit::{AggregationCircuit, ChildProof, NodeShape, NodeValues};
use crate::config::KeyMaterial;
use crate::embedding::CurveEmbedding;

pub fn layer_prefix(depth: usize) -> String {
    format!("layer_{depth}")
}

pub fn proof_name(depth: usize, index: usize) -> String {
    format!("layer_{depth}_proof_{index}")
}

pub fn witness_name(depth: usize, index: usize) -> String {
    format!("layer_{depth}_witness_{index}")
}

/// Whether two stored artifacts hold identical bytes. Unreadable counts as different.
fn same_bytes(store: &ArtifactStore, a: &str, b: &str) -> bool {
    match (std::fs::read(store.path(a)), std::fs::read(store.path(b))) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Outcome of proving one aggregation node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub depth: usize,
    pub left: usize,
    pub right: usize,
    pub public_inputs: usize,
    pub prove_ns: u64,
}

type NodePipeline<P> = Pipeline<<P as CurveEmbedding>::Outer, Groth16, AggregationCircuit<P>>;

/// Compiled circuit and keys for the nodes at `depth`, whose children sit
/// at `depth - 1`.
pub struct Level<P: CurveEmbedding> {
    depth: usize,
    shape: NodeShape<P>,
    child_key: Arc<VerifyingKey<P::Inner>>,
    r1cs: Arc<R1cs<P::Outer>>,
    proving_key: Arc<ProvingKey<P::Outer>>,
    verifying_key: Arc<VerifyingKey<P::Outer>>,
    seed: Option<u64>,
}

impl<P: CurveEmbedding> Level<P> {
    /// Load the layer from `store`, or compile and set it up from the
    /// children's constraint system and key.
    #[instrument(skip_all, fields(depth = depth, inner = %<P::Inner as PairingCurve>::ID, outer = %<P::Outer as PairingCurve>::ID))]
    pub fn prepare(
        store: &ArtifactStore,
        depth: usize,
        key_material: KeyMaterial,
        seed: Option<u64>,
    ) -> Result<Self> {
        if depth == 0 {
            return Err(ZkError::InvalidConfig(
                "depth 0 holds leaves, not aggregation nodes".into(),
            ));
        }
        let child_prefix = layer_prefix(depth - 1);
        let inner = <P::Inner as PairingCurve>::ID;
        let child_r1cs: R1cs<P::Inner> = store.load(inner, &format!("{child_prefix}_ccs"))?;
        let child_key: VerifyingKey<P::Inner> = store.load(inner, &format!("{child_prefix}_vk"))?;
        let shape = NodeShape::for_children(&child_r1cs, key_material, Some(child_key.clone()));

        let prefix = layer_prefix(depth);
        let circuit = AggregationCircuit::fix_shape(&shape)?;
        let built_against = format!("{prefix}_child_vk");
        let cached = ["ccs", "pk", "vk"]
            .iter()
            .all(|suffix| store.exists(&format!("{prefix}_{suffix}")))
            && same_bytes(store, &built_against, &format!("{child_prefix}_vk"));
        let pipeline = if cached {
            debug!(depth, "reusing stored layer keys");
            NodePipeline::<P>::from_store(circuit, store, &prefix)?
        } else {
            let mut pipeline = NodePipeline::<P>::from_circuit(circuit);
            if let Some(seed) = seed {
                pipeline = pipeline.with_seed(seed ^ depth as u64);
            }
            pipeline.compile()?;
            pipeline.setup()?;
            pipeline.save(store, &prefix)?;
            store.save(&built_against, &child_key)?;
            pipeline
        };

        let missing = || ZkError::InvalidState {
            operation: "prepare aggregation layer",
            expected: Stage::KeysReady,
            actual: pipeline.stage(),
        };
        let level = Self {
            depth,
            child_key: Arc::new(child_key),
            r1cs: pipeline.r1cs().cloned().ok_or_else(missing)?,
            proving_key: pipeline.proving_key().cloned().ok_or_else(missing)?,
            verifying_key: pipeline.verifying_key().cloned().ok_or_else(missing)?,
            shape,
            seed,
        };
        info!(
            depth,
            constraints = level.r1cs.num_constraints(),
            public_inputs = level.shape.node_inputs(),
            "aggregation layer ready"
        );
        Ok(level)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn constraint_count(&self) -> usize {
        self.r1cs.num_constraints()
    }

    pub fn verifying_key(&self) -> &Arc<VerifyingKey<P::Outer>> {
        &self.verifying_key
    }

    fn load_child(&self, store: &ArtifactStore, index: usize) -> Result<ChildProof<P::Inner>> {
        let inner = <P::Inner as PairingCurve>::ID;
        let child_depth = self.depth - 1;
        let proof: Proof<P::Inner> = store.load(inner, &proof_name(child_depth, index))?;
        let public: PublicWitness<P::Inner> = store.load(inner, &witness_name(child_depth, index))?;
        Ok(ChildProof { proof, public })
    }

    /// Aggregate children `left` and `right`, verify the node proof and
    /// store it as `layer_{depth}_{proof,witness}_{left}`.
    #[instrument(skip(self, store), fields(depth = self.depth))]
    pub fn prove_node(&self, store: &ArtifactStore, left: usize, right: usize) -> Result<NodeReport> {
        let values = NodeValues {
            verifying_key: self.child_key.as_ref().clone(),
            left: self.load_child(store, left)?,
            right: self.load_child(store, right)?,
        };

        let circuit = AggregationCircuit::fix_shape(&self.shape)?;
        let mut pipeline = NodePipeline::<P>::from_keys(
            circuit,
            Arc::clone(&self.r1cs),
            Arc::clone(&self.proving_key),
            Arc::clone(&self.verifying_key),
        );
        if let Some(seed) = self.seed {
            pipeline = pipeline.with_seed(seed ^ ((self.depth as u64) << 32) ^ left as u64);
        }

        let start = Instant::now();
        pipeline.prove(&values)?;
        let receipt = pipeline.verify()?;
        let elapsed = start.elapsed();

        let proof = pipeline.proof().ok_or(ZkError::InvalidState {
            operation: "store aggregation proof",
            expected: Stage::Proven,
            actual: pipeline.stage(),
        })?;
        store.save(&proof_name(self.depth, left), proof)?;
        if let Some(public) = pipeline.public_witness() {
            store.save(&witness_name(self.depth, left), &public)?;
        }
        info!(left, right, ?elapsed, "aggregation node proved");

        Ok(NodeReport {
            depth: self.depth,
            left,
            right,
            public_inputs: receipt.public_inputs(),
            prove_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
        })
    }
}
