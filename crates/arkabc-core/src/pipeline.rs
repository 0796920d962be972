//! Proof pipeline.
//!
//! Drives one circuit through `Compile → Setup → Prove → Verify`:
//!
//! ```text
//! Uncompiled --compile--> Compiled --setup--> KeysReady --prove--> Proven --verify--> Verified
//! ```
//!
//! Each stage checks its precondition and refuses to run out of order.
//! Benchmarks rewind to a stage's precondition and rerun it `n` times,
//! recording the mean.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ark_ec::PairingEngine;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::backend::{Groth16, Marlin, ProvingScheme, SchemeKind};
use crate::circuit::{Circuit, Relation};
use crate::codec::{self, Artifact, ArtifactRecord};
use crate::config::PipelineConfig;
use crate::curve::{
    Bls12_377, Bls12_381, Bn254, CurveId, CurveRegistry, PairingCurve, BW6_761, MNT4_298, MNT6_298,
};
use crate::error::{Result, ZkError};
use crate::export::{self, EvmCalldata};
use crate::r1cs::R1cs;
use crate::store::ArtifactStore;
use crate::witness::{FullWitness, PublicWitness};

/// Lifecycle position of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Uncompiled,
    Compiled,
    KeysReady,
    Proven,
    Verified,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uncompiled => "uncompiled",
            Self::Compiled => "compiled",
            Self::KeysReady => "keys-ready",
            Self::Proven => "proven",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Most recent duration of each stage (the mean, after a benchmark).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub compile: Option<Duration>,
    pub setup: Option<Duration>,
    pub prove: Option<Duration>,
    pub verify: Option<Duration>,
}

/// Evidence that a proof was accepted. Only a pipeline can produce one.
#[derive(Debug, Clone)]
pub struct Verified {
    curve: CurveId,
    scheme: SchemeKind,
    public_inputs: usize,
    elapsed: Duration,
}

impl Verified {
    pub fn curve(&self) -> CurveId {
        self.curve
    }

    pub fn scheme(&self) -> SchemeKind {
        self.scheme
    }

    pub fn public_inputs(&self) -> usize {
        self.public_inputs
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Serializable summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub curve: CurveId,
    pub scheme: SchemeKind,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_inputs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prove_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ns: Option<u64>,
}

fn nanos(duration: Option<Duration>) -> Option<u64> {
    duration.map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

/// One circuit on one curve with one proving scheme.
pub struct Pipeline<E, S, C>
where
    E: PairingCurve,
    S: ProvingScheme<E>,
    C: Relation<E::Fr>,
{
    circuit: C,
    assigned: Option<C>,
    stage: Stage,
    r1cs: Option<Arc<R1cs<E>>>,
    proving_key: Option<Arc<S::ProvingKey>>,
    verifying_key: Option<Arc<S::VerifyingKey>>,
    witness: Option<FullWitness<E>>,
    public_override: Option<PublicWitness<E>>,
    proof: Option<S::Proof>,
    timings: StageTimings,
    rng: StdRng,
}

impl<E, S, C> Pipeline<E, S, C>
where
    E: PairingCurve,
    S: ProvingScheme<E>,
    C: Relation<E::Fr>,
{
    /// Fix the circuit shape. An invalid shape fails here, before compilation.
    pub fn new(shape: &C::Shape) -> Result<Self> {
        Ok(Self::from_circuit(C::fix_shape(shape)?))
    }

    /// Start from an already-shaped circuit.
    pub fn from_circuit(circuit: C) -> Self {
        Self {
            circuit,
            assigned: None,
            stage: Stage::Uncompiled,
            r1cs: None,
            proving_key: None,
            verifying_key: None,
            witness: None,
            public_override: None,
            proof: None,
            timings: StageTimings::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Start at `KeysReady` with artifacts produced elsewhere.
    ///
    /// `circuit` must have the shape `r1cs` was compiled from; a mismatch
    /// surfaces as a shape error on the first `prove`.
    pub fn from_keys(
        circuit: C,
        r1cs: Arc<R1cs<E>>,
        proving_key: Arc<S::ProvingKey>,
        verifying_key: Arc<S::VerifyingKey>,
    ) -> Self {
        let mut pipeline = Self::from_circuit(circuit);
        pipeline.r1cs = Some(r1cs);
        pipeline.proving_key = Some(proving_key);
        pipeline.verifying_key = Some(verifying_key);
        pipeline.stage = Stage::KeysReady;
        pipeline
    }

    /// Load `{prefix}_ccs`, `{prefix}_pk` and `{prefix}_vk` and start at
    /// `KeysReady`.
    pub fn from_store(circuit: C, store: &ArtifactStore, prefix: &str) -> Result<Self> {
        let r1cs: R1cs<E> = store.load(E::ID, &format!("{prefix}_ccs"))?;
        let pk: S::ProvingKey = store.load(E::ID, &format!("{prefix}_pk"))?;
        let vk: S::VerifyingKey = store.load(E::ID, &format!("{prefix}_vk"))?;
        Ok(Self::from_keys(circuit, Arc::new(r1cs), Arc::new(pk), Arc::new(vk)))
    }

    /// Seed the pipeline RNG for reproducible keys and proofs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn circuit(&self) -> &C {
        &self.circuit
    }

    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    pub fn r1cs(&self) -> Option<&Arc<R1cs<E>>> {
        self.r1cs.as_ref()
    }

    pub fn proving_key(&self) -> Option<&Arc<S::ProvingKey>> {
        self.proving_key.as_ref()
    }

    pub fn verifying_key(&self) -> Option<&Arc<S::VerifyingKey>> {
        self.verifying_key.as_ref()
    }

    pub fn proof(&self) -> Option<&S::Proof> {
        self.proof.as_ref()
    }

    pub fn full_witness(&self) -> Option<&FullWitness<E>> {
        self.witness.as_ref()
    }

    /// The public witness `verify` will use.
    pub fn public_witness(&self) -> Option<PublicWitness<E>> {
        self.public_override
            .clone()
            .or_else(|| self.witness.as_ref().map(FullWitness::public))
    }

    pub fn constraint_count(&self) -> Option<usize> {
        self.r1cs.as_ref().map(|r1cs| r1cs.num_constraints())
    }

    // --- Stages ---

    /// Compile the shaped circuit into a constraint system.
    #[instrument(skip_all, fields(curve = %E::ID, scheme = %S::KIND))]
    pub fn compile(&mut self) -> Result<()> {
        self.expect_stage("compile", &[Stage::Uncompiled])?;
        self.run_compile()
    }

    /// Generate proving and verifying keys for the compiled constraint system.
    #[instrument(skip_all, fields(curve = %E::ID, scheme = %S::KIND))]
    pub fn setup(&mut self) -> Result<()> {
        self.expect_stage("setup", &[Stage::Compiled])?;
        self.run_setup()
    }

    /// Assign `values` to a copy of the shaped circuit and prove it.
    #[instrument(skip_all, fields(curve = %E::ID, scheme = %S::KIND))]
    pub fn prove(&mut self, values: &C::Values) -> Result<()> {
        self.expect_stage("prove", &[Stage::KeysReady])?;
        let mut assigned = self.circuit.clone();
        assigned.assign(values)?;
        self.assigned = Some(assigned);
        self.run_prove()
    }

    /// Check the proof against the public witness.
    ///
    /// On rejection the pipeline stays `Proven`.
    #[instrument(skip_all, fields(curve = %E::ID, scheme = %S::KIND))]
    pub fn verify(&mut self) -> Result<Verified> {
        self.expect_stage("verify", &[Stage::Proven, Stage::Verified])?;
        self.run_verify()
    }

    /// Replace the public witness used by `verify`.
    pub fn override_public_witness(&mut self, public: PublicWitness<E>) -> Result<()> {
        self.expect_stage(
            "override public witness",
            &[Stage::Proven, Stage::Verified],
        )?;
        self.public_override = Some(public);
        self.stage = Stage::Proven;
        Ok(())
    }

    /// Move back to an earlier stage, dropping everything produced after it.
    pub fn rewind(&mut self, to: Stage) -> Result<()> {
        if to > self.stage {
            return Err(ZkError::InvalidState {
                operation: "rewind",
                expected: to,
                actual: self.stage,
            });
        }
        self.rewind_to(to);
        Ok(())
    }

    // --- Benchmarks ---

    pub fn benchmark_compile(&mut self, iterations: u32) -> Result<Duration> {
        self.benchmark(iterations, Stage::Uncompiled, Self::run_compile, |t| {
            &mut t.compile
        })
    }

    pub fn benchmark_setup(&mut self, iterations: u32) -> Result<Duration> {
        self.require_at_least("benchmark setup", Stage::Compiled)?;
        self.benchmark(iterations, Stage::Compiled, Self::run_setup, |t| &mut t.setup)
    }

    /// Re-prove the last assignment `iterations` times.
    pub fn benchmark_prove(&mut self, iterations: u32) -> Result<Duration> {
        self.require_at_least("benchmark prove", Stage::KeysReady)?;
        if self.assigned.is_none() {
            return Err(ZkError::InvalidState {
                operation: "benchmark prove without an assignment",
                expected: Stage::Proven,
                actual: self.stage,
            });
        }
        self.benchmark(iterations, Stage::KeysReady, Self::run_prove, |t| &mut t.prove)
    }

    pub fn benchmark_verify(&mut self, iterations: u32) -> Result<Duration> {
        self.require_at_least("benchmark verify", Stage::Proven)?;
        self.benchmark(
            iterations,
            Stage::Proven,
            |p| p.run_verify().map(|_| ()),
            |t| &mut t.verify,
        )
    }

    fn benchmark(
        &mut self,
        iterations: u32,
        from: Stage,
        run: fn(&mut Self) -> Result<()>,
        slot: fn(&mut StageTimings) -> &mut Option<Duration>,
    ) -> Result<Duration> {
        if iterations == 0 {
            return Err(ZkError::InvalidConfig(
                "benchmark iterations must be at least 1".into(),
            ));
        }
        let mut total = Duration::ZERO;
        for _ in 0..iterations {
            self.rewind_to(from);
            run(self)?;
            total += slot(&mut self.timings).unwrap_or_default();
        }
        let mean = total / iterations;
        *slot(&mut self.timings) = Some(mean);
        debug!(iterations, ?mean, stage = %from, "benchmark finished");
        Ok(mean)
    }

    // --- Stage bodies ---

    fn run_compile(&mut self) -> Result<()> {
        let start = Instant::now();
        let r1cs = R1cs::<E>::compile(&self.circuit)?;
        let elapsed = start.elapsed();
        info!(constraints = r1cs.num_constraints(), ?elapsed, "circuit compiled");

        self.r1cs = Some(Arc::new(r1cs));
        self.timings.compile = Some(elapsed);
        self.stage = Stage::Compiled;
        Ok(())
    }

    fn run_setup(&mut self) -> Result<()> {
        let r1cs = self.held(self.r1cs.clone(), "setup", Stage::Compiled)?;
        let start = Instant::now();
        let (pk, vk) = S::setup(&r1cs, &mut self.rng)?;
        let elapsed = start.elapsed();
        info!(?elapsed, "keys generated");

        self.proving_key = Some(Arc::new(pk));
        self.verifying_key = Some(Arc::new(vk));
        self.timings.setup = Some(elapsed);
        self.stage = Stage::KeysReady;
        Ok(())
    }

    fn run_prove(&mut self) -> Result<()> {
        let r1cs = self.held(self.r1cs.clone(), "prove", Stage::KeysReady)?;
        let pk = self.held(self.proving_key.clone(), "prove", Stage::KeysReady)?;
        let assigned = self.held(self.assigned.as_ref(), "prove", Stage::KeysReady)?;

        let start = Instant::now();
        let witness = r1cs.generate_witness(assigned)?;
        let proof = S::prove(&r1cs, &pk, &witness, &mut self.rng)?;
        let elapsed = start.elapsed();
        info!(public_inputs = witness.public_inputs().len(), ?elapsed, "proof generated");

        self.witness = Some(witness);
        self.public_override = None;
        self.proof = Some(proof);
        self.timings.prove = Some(elapsed);
        self.stage = Stage::Proven;
        Ok(())
    }

    fn run_verify(&mut self) -> Result<Verified> {
        self.stage = Stage::Proven;
        let vk = self.held(self.verifying_key.as_ref(), "verify", Stage::Proven)?;
        let proof = self.held(self.proof.as_ref(), "verify", Stage::Proven)?;
        let public = self.held(self.public_witness(), "verify", Stage::Proven)?;

        let start = Instant::now();
        let accepted = S::verify(vk, &public, proof)?;
        let elapsed = start.elapsed();
        if !accepted {
            warn!("proof rejected");
            return Err(ZkError::VerificationFailed(
                "proof does not verify against the public witness".into(),
            ));
        }
        info!(?elapsed, "proof verified");

        self.timings.verify = Some(elapsed);
        self.stage = Stage::Verified;
        Ok(Verified {
            curve: E::ID,
            scheme: S::KIND,
            public_inputs: public.len(),
            elapsed,
        })
    }

    // --- State bookkeeping ---

    fn expect_stage(&self, operation: &'static str, allowed: &[Stage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        Err(ZkError::InvalidState {
            operation,
            expected: allowed[0],
            actual: self.stage,
        })
    }

    fn require_at_least(&self, operation: &'static str, stage: Stage) -> Result<()> {
        if self.stage < stage {
            return Err(ZkError::InvalidState {
                operation,
                expected: stage,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn held<T>(&self, value: Option<T>, operation: &'static str, expected: Stage) -> Result<T> {
        value.ok_or(ZkError::InvalidState {
            operation,
            expected,
            actual: self.stage,
        })
    }

    fn rewind_to(&mut self, to: Stage) {
        if to < Stage::Proven {
            self.witness = None;
            self.public_override = None;
            self.proof = None;
        }
        if to < Stage::KeysReady {
            self.proving_key = None;
            self.verifying_key = None;
        }
        if to < Stage::Compiled {
            self.r1cs = None;
        }
        self.stage = to;
    }

    // --- Reporting and persistence ---

    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            curve: E::ID,
            scheme: S::KIND,
            stage: self.stage,
            constraints: self.constraint_count(),
            public_inputs: self.r1cs.as_ref().map(|r1cs| r1cs.num_public_inputs()),
            compile_ns: nanos(self.timings.compile),
            setup_ns: nanos(self.timings.setup),
            prove_ns: nanos(self.timings.prove),
            verify_ns: nanos(self.timings.verify),
        }
    }

    /// Write every artifact currently held as `{prefix}_{ccs,pk,vk,proof,witness}`.
    /// Returns the total number of bytes written.
    pub fn save(&self, store: &ArtifactStore, prefix: &str) -> Result<u64> {
        let mut written = 0;
        if let Some(r1cs) = &self.r1cs {
            written += store.save(&format!("{prefix}_ccs"), r1cs.as_ref())?;
        }
        if let Some(pk) = &self.proving_key {
            written += store.save(&format!("{prefix}_pk"), pk.as_ref())?;
        }
        if let Some(vk) = &self.verifying_key {
            written += store.save(&format!("{prefix}_vk"), vk.as_ref())?;
        }
        if let Some(proof) = &self.proof {
            written += store.save(&format!("{prefix}_proof"), proof)?;
        }
        if let Some(public) = self.public_witness() {
            written += store.save(&format!("{prefix}_witness"), &public)?;
        }
        Ok(written)
    }

    /// Call data for an EVM verifier. BN254 Groth16 only.
    pub fn evm_calldata(&self) -> Result<EvmCalldata> {
        if E::ID != CurveId::Bn254 || S::KIND != SchemeKind::Groth16 {
            return Err(ZkError::InvalidConfig(format!(
                "EVM call data needs a BN254 groth16 proof, this pipeline is {} {}",
                E::ID,
                S::KIND
            )));
        }
        let proof = self.held(self.proof.as_ref(), "format call data", Stage::Proven)?;
        let public = self.held(self.public_witness(), "format call data", Stage::Proven)?;
        // Both types are the BN254 instantiations here; the codec moves them
        // across the generic boundary.
        let proof: ark_groth16::Proof<Bn254> =
            codec::from_bytes(CurveId::Bn254, &codec::to_bytes(proof)?)?;
        let public: PublicWitness<Bn254> =
            codec::from_bytes(CurveId::Bn254, &codec::to_bytes(&public)?)?;
        Ok(export::groth16_bn254(&proof, &public))
    }
}

/// Object-safe view of a [`Pipeline`], for callers that pick the curve and
/// scheme at runtime. `V` is the circuit's value record.
pub trait ProofPipeline<V>: Send {
    fn curve(&self) -> CurveId;
    fn scheme(&self) -> SchemeKind;
    fn stage(&self) -> Stage;

    fn compile(&mut self) -> Result<()>;
    fn setup(&mut self) -> Result<()>;
    fn prove(&mut self, values: &V) -> Result<()>;
    fn verify(&mut self) -> Result<Verified>;

    fn benchmark_compile(&mut self, iterations: u32) -> Result<Duration>;
    fn benchmark_setup(&mut self, iterations: u32) -> Result<Duration>;
    fn benchmark_prove(&mut self, iterations: u32) -> Result<Duration>;
    fn benchmark_verify(&mut self, iterations: u32) -> Result<Duration>;

    fn constraint_count(&self) -> Option<usize>;
    fn public_inputs_decimal(&self) -> Option<Vec<String>>;
    fn proof_record(&self) -> Result<ArtifactRecord>;
    fn evm_calldata(&self) -> Result<EvmCalldata>;
    fn report(&self) -> PipelineReport;
    fn save(&self, store: &ArtifactStore, prefix: &str) -> Result<u64>;
}

impl<E, S, C> ProofPipeline<C::Values> for Pipeline<E, S, C>
where
    E: PairingCurve,
    S: ProvingScheme<E>,
    C: Relation<E::Fr>,
{
    fn curve(&self) -> CurveId {
        E::ID
    }

    fn scheme(&self) -> SchemeKind {
        S::KIND
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn compile(&mut self) -> Result<()> {
        Pipeline::compile(self)
    }

    fn setup(&mut self) -> Result<()> {
        Pipeline::setup(self)
    }

    fn prove(&mut self, values: &C::Values) -> Result<()> {
        Pipeline::prove(self, values)
    }

    fn verify(&mut self) -> Result<Verified> {
        Pipeline::verify(self)
    }

    fn benchmark_compile(&mut self, iterations: u32) -> Result<Duration> {
        Pipeline::benchmark_compile(self, iterations)
    }

    fn benchmark_setup(&mut self, iterations: u32) -> Result<Duration> {
        Pipeline::benchmark_setup(self, iterations)
    }

    fn benchmark_prove(&mut self, iterations: u32) -> Result<Duration> {
        Pipeline::benchmark_prove(self, iterations)
    }

    fn benchmark_verify(&mut self, iterations: u32) -> Result<Duration> {
        Pipeline::benchmark_verify(self, iterations)
    }

    fn constraint_count(&self) -> Option<usize> {
        Pipeline::constraint_count(self)
    }

    fn public_inputs_decimal(&self) -> Option<Vec<String>> {
        self.public_witness()
            .map(|public| export::public_inputs_decimal(&public))
    }

    fn proof_record(&self) -> Result<ArtifactRecord> {
        let proof = self.held(self.proof.as_ref(), "export proof", Stage::Proven)?;
        ArtifactRecord::new(proof)
    }

    fn evm_calldata(&self) -> Result<EvmCalldata> {
        Pipeline::evm_calldata(self)
    }

    fn report(&self) -> PipelineReport {
        Pipeline::report(self)
    }

    fn save(&self, store: &ArtifactStore, prefix: &str) -> Result<u64> {
        Pipeline::save(self, store, prefix)
    }
}

/// A circuit definable over the scalar field of every registered curve.
pub trait PortableCircuit:
    Relation<<Bn254 as PairingEngine>::Fr>
    + Relation<<Bls12_381 as PairingEngine>::Fr>
    + Relation<<Bls12_377 as PairingEngine>::Fr>
    + Relation<<BW6_761 as PairingEngine>::Fr>
    + Relation<<MNT4_298 as PairingEngine>::Fr>
    + Relation<<MNT6_298 as PairingEngine>::Fr>
{
}

impl<C> PortableCircuit for C where
    C: Relation<<Bn254 as PairingEngine>::Fr>
        + Relation<<Bls12_381 as PairingEngine>::Fr>
        + Relation<<Bls12_377 as PairingEngine>::Fr>
        + Relation<<BW6_761 as PairingEngine>::Fr>
        + Relation<<MNT4_298 as PairingEngine>::Fr>
        + Relation<<MNT6_298 as PairingEngine>::Fr>
{
}

fn boxed<E, S, C>(shape: &C::Shape, seed: Option<u64>) -> Result<Box<dyn ProofPipeline<C::Values>>>
where
    E: PairingCurve,
    S: ProvingScheme<E>,
    C: Relation<E::Fr>,
{
    let pipeline = Pipeline::<E, S, C>::new(shape)?;
    Ok(match seed {
        Some(seed) => Box::new(pipeline.with_seed(seed)),
        None => Box::new(pipeline),
    })
}

/// Build a pipeline for a curve and scheme chosen at runtime.
pub fn build_pipeline<C: PortableCircuit>(
    registry: &CurveRegistry,
    curve: &str,
    scheme: &str,
    shape: &C::Shape,
    seed: Option<u64>,
) -> Result<Box<dyn ProofPipeline<C::Values>>> {
    let config = PipelineConfig {
        curve: registry.lookup(curve)?.id,
        scheme: scheme.parse()?,
        iterations: 1,
        seed,
    };
    build_pipeline_from_config::<C>(&config, shape)
}

pub fn build_pipeline_from_config<C: PortableCircuit>(
    config: &PipelineConfig,
    shape: &C::Shape,
) -> Result<Box<dyn ProofPipeline<C::Values>>> {
    config.validate()?;
    match config.scheme {
        SchemeKind::Groth16 => {
            crate::with_curve!(config.curve, E => boxed::<E, Groth16, C>(shape, config.seed))
        }
        SchemeKind::Marlin => {
            crate::with_curve!(config.curve, E => boxed::<E, Marlin, C>(shape, config.seed))
        }
    }
}

/// Write an artifact to `store` only if it is not there yet.
pub fn save_once<A: Artifact>(store: &ArtifactStore, name: &str, artifact: &A) -> Result<u64> {
    if store.exists(name) {
        return Ok(0);
    }
    store.save(name, artifact)
}
