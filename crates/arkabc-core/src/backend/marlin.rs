use std::io::{Read, Write};

use ark_ec::PairingEngine;
use ark_marlin::{IndexProverKey, IndexVerifierKey, Marlin as MarlinSnark, Proof};
use ark_poly::univariate::DensePolynomial;
use ark_poly_commit::marlin_pc::MarlinKZG10;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use blake2::Blake2s;
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use tracing::debug;

use super::{ProvingScheme, SchemeKind};
use crate::codec::{Artifact, ArtifactKind};
use crate::curve::{CurveId, PairingCurve};
use crate::error::{Result, ZkError};
use crate::r1cs::R1cs;
use crate::witness::{FullWitness, PublicWitness};

/// KZG polynomial commitments over `E`.
pub type MarlinPc<E> = MarlinKZG10<E, DensePolynomial<<E as PairingEngine>::Fr>>;

type Snark<E> = MarlinSnark<<E as PairingEngine>::Fr, MarlinPc<E>, Blake2s>;

/// Marlin over a universal KZG reference string.
///
/// Setup first samples a reference string large enough for the constraint
/// system, then derives index keys for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marlin;

/// Dimensions handed to the universal setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrsBound {
    pub constraints: usize,
    pub variables: usize,
    pub non_zero: usize,
}

impl SrsBound {
    /// Bound covering `r1cs` after the indexer pads public inputs to a power
    /// of two and balances the A and B matrices.
    pub fn for_r1cs<E: PairingEngine>(r1cs: &R1cs<E>) -> Self {
        let [a, b, c] = r1cs.num_non_zero();
        let padded_instance = r1cs.num_instance.next_power_of_two();
        Self {
            constraints: r1cs.num_constraints().max(1),
            variables: padded_instance + r1cs.num_witness,
            non_zero: (a + b).max(c).max(1),
        }
    }
}

impl<E: PairingCurve> ProvingScheme<E> for Marlin {
    const KIND: SchemeKind = SchemeKind::Marlin;

    type ProvingKey = IndexProverKey<E::Fr, MarlinPc<E>>;
    type VerifyingKey = IndexVerifierKey<E::Fr, MarlinPc<E>>;
    type Proof = Proof<E::Fr, MarlinPc<E>>;

    fn setup<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        rng: &mut R,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey)> {
        let bound = SrsBound::for_r1cs(r1cs);
        let srs = Snark::<E>::universal_setup(
            bound.constraints,
            bound.variables,
            bound.non_zero,
            rng,
        )
        .map_err(|e| ZkError::Setup(format!("universal setup: {e:?}")))?;
        debug!(
            curve = %E::ID,
            constraints = bound.constraints,
            variables = bound.variables,
            non_zero = bound.non_zero,
            "universal SRS generated"
        );

        Snark::<E>::index(&srs, r1cs.replay(None))
            .map_err(|e| ZkError::Setup(format!("indexing: {e:?}")))
    }

    fn prove<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        pk: &Self::ProvingKey,
        witness: &FullWitness<E>,
        rng: &mut R,
    ) -> Result<Self::Proof> {
        r1cs.check_witness(witness)?;
        Snark::<E>::prove(pk, r1cs.replay(Some(witness)), rng)
            .map_err(|e| ZkError::ProofGeneration(format!("{e:?}")))
    }

    fn verify(
        vk: &Self::VerifyingKey,
        public: &PublicWitness<E>,
        proof: &Self::Proof,
    ) -> Result<bool> {
        // Only the opening-check batching is randomized; the verdict is not.
        let mut rng = StdRng::from_entropy();
        Snark::<E>::verify(vk, public.inputs(), proof, &mut rng)
            .map_err(|e| ZkError::VerificationFailed(format!("{e:?}")))
    }
}

impl<E: PairingCurve> Artifact for IndexProverKey<E::Fr, MarlinPc<E>> {
    const KIND: ArtifactKind = ArtifactKind::MarlinProvingKey;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize_uncompressed(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize_unchecked(reader)
    }
}

impl<E: PairingCurve> Artifact for IndexVerifierKey<E::Fr, MarlinPc<E>> {
    const KIND: ArtifactKind = ArtifactKind::MarlinVerifyingKey;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize(reader)
    }
}

impl<E: PairingCurve> Artifact for Proof<E::Fr, MarlinPc<E>> {
    const KIND: ArtifactKind = ArtifactKind::MarlinProof;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize(reader)
    }
}
