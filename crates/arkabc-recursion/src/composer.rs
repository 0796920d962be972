//! Recursive composer: proves leaves, then folds sibling pairs depth by
//! depth until one root proof remains or the curve chain runs out.
//!
//! ```text
//! depth 2            layer_2_proof_0
//!                   /               \
//! depth 1   layer_1_proof_0    layer_1_proof_2
//!             /       \          /       \
//! depth 0   leaf 0   leaf 1   leaf 2   leaf 3
//! ```
//!
//! A node is named after its left child. Every artifact goes through the
//! [`ArtifactStore`], so a tree can be resumed from a previous run.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ark_groth16::{Proof, VerifyingKey};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use arkabc_core::{
    ArtifactStore, CurveId, Groth16, PairingCurve, Pipeline, ProvingScheme, PublicWitness,
    Relation, Result, Stage, ZkError,
};

use crate::config::AggregationConfig;
use crate::embedding::{with_embedding, CurveEmbedding};
use crate::level::{layer_prefix, proof_name, witness_name, Level, NodeReport};

/// Result of one aggregation depth.
#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub depth: usize,
    pub curve: CurveId,
    pub nodes: Vec<NodeReport>,
}

/// Result of [`RecursiveComposer::build_tree`].
#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub leaves: usize,
    /// Depth of the last layer built; 0 if no aggregation ran.
    pub depth: usize,
    pub curve: CurveId,
    /// Indices of the proofs left at `depth`.
    pub roots: Vec<usize>,
    pub layers: Vec<LayerReport>,
    pub elapsed_ns: u64,
}

impl TreeReport {
    /// Whether the tree folded down to a single proof.
    pub fn is_complete(&self) -> bool {
        self.roots.len() == 1
    }
}

/// Sibling counts of every layer `build_tree` would run for `leaves`
/// leaves, checked before any proving starts.
pub fn plan_layers(leaves: usize, max_depth: usize) -> Result<Vec<usize>> {
    if leaves == 0 {
        return Err(ZkError::InvalidConfig("no leaves to aggregate".into()));
    }
    let mut plan = Vec::new();
    let mut width = leaves;
    while width > 1 && plan.len() < max_depth {
        if width % 2 != 0 {
            return Err(ZkError::InvalidConfig(format!(
                "depth {} would receive {width} siblings; sibling lists must pair up",
                plan.len() + 1
            )));
        }
        plan.push(width);
        width /= 2;
    }
    Ok(plan)
}

/// Builds and persists a binary aggregation tree.
pub struct RecursiveComposer {
    config: AggregationConfig,
    store: ArtifactStore,
    /// `Level<P>` per depth, type-erased because `P` changes with depth.
    levels: HashMap<usize, Arc<dyn Any + Send + Sync>>,
}

impl RecursiveComposer {
    /// Validate the curve chain and open the output directory. Unsupported
    /// embeddings fail here, before any proving.
    pub fn new(config: AggregationConfig) -> Result<Self> {
        config.validate()?;
        let store = ArtifactStore::open(&config.output_dir)?;
        Ok(Self {
            config,
            store,
            levels: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    // --- Leaves ---

    /// Prove one leaf per value set with Groth16 on the leaf curve and store
    /// `layer_0_{ccs,pk,vk}` plus `layer_0_{proof,witness}_{i}`. Leaves are
    /// proved in parallel; `progress` is called as each one finishes.
    #[instrument(skip_all, fields(curve = %E::ID, leaves = values.len()))]
    pub fn prove_leaves<E, C, F>(
        &self,
        shape: &C::Shape,
        values: &[C::Values],
        progress: F,
    ) -> Result<Vec<usize>>
    where
        E: PairingCurve,
        C: Relation<E::Fr>,
        F: Fn(usize) + Send + Sync,
    {
        if E::ID != self.config.leaf_curve {
            return Err(ZkError::InvalidConfig(format!(
                "leaves must be proved on {}, not {}",
                self.config.leaf_curve,
                E::ID
            )));
        }
        plan_layers(values.len(), self.config.max_depth())?;

        let mut setup = Pipeline::<E, Groth16, C>::new(shape)?;
        if let Some(seed) = self.config.seed {
            setup = setup.with_seed(seed);
        }
        setup.compile()?;
        setup.setup()?;
        setup.save(&self.store, &layer_prefix(0))?;

        let missing = || ZkError::InvalidState {
            operation: "prove leaves",
            expected: Stage::KeysReady,
            actual: setup.stage(),
        };
        let r1cs = setup.r1cs().cloned().ok_or_else(missing)?;
        let pk = setup.proving_key().cloned().ok_or_else(missing)?;
        let vk = setup.verifying_key().cloned().ok_or_else(missing)?;
        let circuit = setup.circuit().clone();

        let start = Instant::now();
        values
            .par_iter()
            .enumerate()
            .map(|(index, values)| {
                let mut leaf = Pipeline::<E, Groth16, C>::from_keys(
                    circuit.clone(),
                    Arc::clone(&r1cs),
                    Arc::clone(&pk),
                    Arc::clone(&vk),
                );
                if let Some(seed) = self.config.seed {
                    leaf = leaf.with_seed(seed.wrapping_add(1 + index as u64));
                }
                leaf.prove(values)?;
                leaf.verify()?;
                if let (Some(proof), Some(public)) = (leaf.proof(), leaf.public_witness()) {
                    self.store.save(&proof_name(0, index), proof)?;
                    self.store.save(&witness_name(0, index), &public)?;
                }
                progress(index);
                Ok(index)
            })
            .collect::<Result<Vec<_>>>()
            .map(|leaves| {
                info!(elapsed = ?start.elapsed(), "leaves proved");
                leaves
            })
    }

    // --- Aggregation ---

    /// Aggregate sibling pairs `(siblings[0], siblings[1]), ...` from
    /// `depth - 1` into nodes at `depth`, each named after its left child.
    #[instrument(skip(self, siblings), fields(siblings = siblings.len()))]
    pub fn aggregate_layer(&mut self, depth: usize, siblings: &[usize]) -> Result<LayerReport> {
        if siblings.is_empty() || siblings.len() % 2 != 0 {
            return Err(ZkError::InvalidConfig(format!(
                "depth {depth} needs an even, non-empty sibling list, got {}",
                siblings.len()
            )));
        }
        let (inner, outer) = match (
            depth.checked_sub(1).and_then(|d| self.config.curve_at(d)),
            self.config.curve_at(depth),
        ) {
            (Some(inner), Some(outer)) => (inner, outer),
            _ => {
                return Err(ZkError::InvalidConfig(format!(
                    "depth {depth} is outside the configured chain (1..={})",
                    self.config.max_depth()
                )))
            }
        };
        let nodes = with_embedding!(inner, outer, P => self.aggregate_with::<P>(depth, siblings))?;
        Ok(LayerReport {
            depth,
            curve: outer,
            nodes,
        })
    }

    fn aggregate_with<P: CurveEmbedding>(
        &mut self,
        depth: usize,
        siblings: &[usize],
    ) -> Result<Vec<NodeReport>> {
        let level = self.level::<P>(depth)?;
        let store = &self.store;
        siblings
            .par_chunks(2)
            .map(|pair| level.prove_node(store, pair[0], pair[1]))
            .collect()
    }

    /// Cached layer for `depth`, preparing it on first use.
    fn level<P: CurveEmbedding>(&mut self, depth: usize) -> Result<Arc<Level<P>>> {
        if let Some(cached) = self.levels.get(&depth) {
            match Arc::clone(cached).downcast::<Level<P>>() {
                Ok(level) => return Ok(level),
                Err(_) => warn!(depth, "cached layer has another embedding, rebuilding"),
            }
        }
        let level = Arc::new(Level::<P>::prepare(
            &self.store,
            depth,
            self.config.key_material,
            self.config.seed,
        )?);
        self.levels.insert(depth, level.clone());
        Ok(level)
    }

    /// Fold `leaves` (indices of stored depth-0 proofs) layer by layer.
    /// Stops at a single root or at the end of the curve chain.
    pub fn build_tree(&mut self, leaves: &[usize]) -> Result<TreeReport> {
        let plan = plan_layers(leaves.len(), self.config.max_depth())?;
        let start = Instant::now();

        let mut siblings = leaves.to_vec();
        let mut layers = Vec::with_capacity(plan.len());
        for depth in 1..=plan.len() {
            let layer = self.aggregate_layer(depth, &siblings)?;
            siblings = layer.nodes.iter().map(|node| node.left).collect();
            layers.push(layer);
        }

        let depth = plan.len();
        let report = TreeReport {
            leaves: leaves.len(),
            depth,
            curve: self.config.curve_at(depth).unwrap_or(self.config.leaf_curve),
            roots: siblings,
            layers,
            elapsed_ns: u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX),
        };
        if report.is_complete() {
            info!(depth, "aggregation tree complete");
        } else {
            warn!(
                depth,
                roots = report.roots.len(),
                "curve chain exhausted before a single root"
            );
        }
        Ok(report)
    }

    /// Re-check a stored proof against its layer's verifying key.
    pub fn verify_stored(&self, depth: usize, index: usize) -> Result<()> {
        let curve = self.config.curve_at(depth).ok_or_else(|| {
            ZkError::InvalidConfig(format!("depth {depth} is outside the configured chain"))
        })?;
        arkabc_core::with_curve!(curve, E => verify_with::<E>(&self.store, depth, index))
    }
}

fn verify_with<E: PairingCurve>(store: &ArtifactStore, depth: usize, index: usize) -> Result<()> {
    let vk: VerifyingKey<E> = store.load(E::ID, &format!("{}_vk", layer_prefix(depth)))?;
    let proof: Proof<E> = store.load(E::ID, &proof_name(depth, index))?;
    let public: PublicWitness<E> = store.load(E::ID, &witness_name(depth, index))?;
    if <Groth16 as ProvingScheme<E>>::verify(&vk, &public, &proof)? {
        Ok(())
    } else {
        Err(ZkError::VerificationFailed(format!(
            "stored proof {} does not verify",
            proof_name(depth, index)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkabc_core::ErrorCategory;

    #[test]
    fn test_plan_layers() {
        assert_eq!(plan_layers(4, 3).unwrap(), vec![4, 2]);
        assert_eq!(plan_layers(8, 1).unwrap(), vec![8]);
        assert_eq!(plan_layers(1, 3).unwrap(), Vec::<usize>::new());
        assert_eq!(plan_layers(0, 3).unwrap_err().category(), ErrorCategory::Config);
        assert_eq!(plan_layers(6, 3).unwrap_err().category(), ErrorCategory::Config);
        // The odd layer is beyond the chain, so it is never reached.
        assert_eq!(plan_layers(6, 1).unwrap(), vec![6]);
    }
}
