use std::io::{Read, Write};

use ark_groth16::{
    create_random_proof, generate_random_parameters, prepare_verifying_key, verify_proof, Proof,
    ProvingKey, VerifyingKey,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use super::{ProvingScheme, SchemeKind};
use crate::codec::{Artifact, ArtifactKind};
use crate::curve::{CurveId, PairingCurve};
use crate::error::{Result, ZkError};
use crate::r1cs::R1cs;
use crate::witness::{FullWitness, PublicWitness};

/// Groth16 with a circuit-specific setup.
///
/// Proofs are three group elements regardless of circuit size; this is the
/// scheme the recursive composer verifies in-circuit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Groth16;

impl<E: PairingCurve> ProvingScheme<E> for Groth16 {
    const KIND: SchemeKind = SchemeKind::Groth16;

    type ProvingKey = ProvingKey<E>;
    type VerifyingKey = VerifyingKey<E>;
    type Proof = Proof<E>;

    fn setup<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        rng: &mut R,
    ) -> Result<(ProvingKey<E>, VerifyingKey<E>)> {
        let pk = generate_random_parameters::<E, _, _>(r1cs.replay(None), rng)
            .map_err(|e| ZkError::Setup(e.to_string()))?;
        debug!(
            curve = %E::ID,
            a_query = pk.a_query.len(),
            inputs = pk.vk.gamma_abc_g1.len() - 1,
            "groth16 keys generated"
        );
        let vk = pk.vk.clone();
        Ok((pk, vk))
    }

    fn prove<R: RngCore + CryptoRng>(
        r1cs: &R1cs<E>,
        pk: &ProvingKey<E>,
        witness: &FullWitness<E>,
        rng: &mut R,
    ) -> Result<Proof<E>> {
        r1cs.check_witness(witness)?;
        create_random_proof(r1cs.replay(Some(witness)), pk, rng)
            .map_err(|e| ZkError::ProofGeneration(e.to_string()))
    }

    fn verify(vk: &VerifyingKey<E>, public: &PublicWitness<E>, proof: &Proof<E>) -> Result<bool> {
        let expected = vk.gamma_abc_g1.len().saturating_sub(1);
        if public.len() != expected {
            return Err(ZkError::VerificationFailed(format!(
                "verifying key expects {expected} public inputs, got {}",
                public.len()
            )));
        }
        let pvk = prepare_verifying_key(vk);
        verify_proof(&pvk, proof, public.inputs())
            .map_err(|e| ZkError::VerificationFailed(e.to_string()))
    }
}

// Proving keys are large and produced locally, so they skip point compression
// and subgroup checks.
impl<E: PairingCurve> Artifact for ProvingKey<E> {
    const KIND: ArtifactKind = ArtifactKind::Groth16ProvingKey;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize_uncompressed(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize_unchecked(reader)
    }
}

impl<E: PairingCurve> Artifact for VerifyingKey<E> {
    const KIND: ArtifactKind = ArtifactKind::Groth16VerifyingKey;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize(reader)
    }
}

impl<E: PairingCurve> Artifact for Proof<E> {
    const KIND: ArtifactKind = ArtifactKind::Groth16Proof;
    const CURVE: CurveId = E::ID;

    fn write_body<W: Write>(&self, writer: &mut W) -> std::result::Result<(), SerializationError> {
        self.serialize(writer)
    }

    fn read_body<R: Read>(reader: &mut R) -> std::result::Result<Self, SerializationError> {
        Self::deserialize(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::codec;
    use crate::r1cs::tests::MulCircuit;
    use ark_bls12_381::Bls12_381;
    use ark_bn254::{Bn254, Fr};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prepared() -> (R1cs<Bn254>, FullWitness<Bn254>) {
        let r1cs = R1cs::<Bn254>::compile(&MulCircuit::default()).unwrap();
        let mut circuit = MulCircuit::fix_shape(&()).unwrap();
        circuit.assign(&(13, 17, 221)).unwrap();
        let witness = r1cs.generate_witness(&circuit).unwrap();
        (r1cs, witness)
    }

    #[test]
    fn test_prove_and_verify() {
        let mut rng = StdRng::seed_from_u64(7);
        let (r1cs, witness) = prepared();
        let (pk, vk) = Groth16::setup(&r1cs, &mut rng).unwrap();
        let proof = Groth16::prove(&r1cs, &pk, &witness, &mut rng).unwrap();
        assert!(Groth16::verify(&vk, &witness.public(), &proof).unwrap());
    }

    #[test]
    fn test_tampered_public_input_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let (r1cs, witness) = prepared();
        let (pk, vk) = Groth16::setup(&r1cs, &mut rng).unwrap();
        let proof = Groth16::prove(&r1cs, &pk, &witness, &mut rng).unwrap();
        let tampered = PublicWitness::new(vec![Fr::from(222u64)]);
        assert!(!Groth16::verify(&vk, &tampered, &proof).unwrap());
    }

    #[test]
    fn test_wrong_input_count_is_error() {
        let mut rng = StdRng::seed_from_u64(7);
        let (r1cs, witness) = prepared();
        let (pk, vk) = Groth16::setup(&r1cs, &mut rng).unwrap();
        let proof = Groth16::prove(&r1cs, &pk, &witness, &mut rng).unwrap();
        let long = PublicWitness::new(vec![Fr::from(221u64), Fr::from(1u64)]);
        assert!(matches!(
            Groth16::verify(&vk, &long, &proof),
            Err(ZkError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_decoded_keys_and_proof_verify() {
        let mut rng = StdRng::seed_from_u64(11);
        let (r1cs, witness) = prepared();
        let (pk, vk) = Groth16::setup(&r1cs, &mut rng).unwrap();

        let pk_bytes = codec::to_bytes(&pk).unwrap();
        let pk: ProvingKey<Bn254> = codec::from_bytes(CurveId::Bn254, &pk_bytes).unwrap();
        let proof = Groth16::prove(&r1cs, &pk, &witness, &mut rng).unwrap();

        let vk_text = codec::to_base64(&vk).unwrap();
        let proof_text = codec::to_base64(&proof).unwrap();
        let vk: VerifyingKey<Bn254> = codec::from_base64(CurveId::Bn254, &vk_text).unwrap();
        let proof: Proof<Bn254> = codec::from_base64(CurveId::Bn254, &proof_text).unwrap();
        assert!(Groth16::verify(&vk, &witness.public(), &proof).unwrap());
    }

    #[test]
    fn test_verifying_key_curve_is_checked() {
        let mut rng = StdRng::seed_from_u64(3);
        let (r1cs, _) = prepared();
        let (_, vk) = Groth16::setup(&r1cs, &mut rng).unwrap();
        let bytes = codec::to_bytes(&vk).unwrap();
        assert!(codec::from_bytes::<VerifyingKey<Bls12_381>>(CurveId::Bls12_381, &bytes).is_err());
    }

    #[test]
    fn test_prove_rejects_short_witness() {
        let mut rng = StdRng::seed_from_u64(5);
        let (r1cs, _) = prepared();
        let (pk, _) = Groth16::setup(&r1cs, &mut rng).unwrap();
        let short = FullWitness::new(vec![Fr::from(221u64)], vec![Fr::from(13u64)]);
        let err = Groth16::prove(&r1cs, &pk, &short, &mut rng).unwrap_err();
        assert!(matches!(err, ZkError::ShapeMismatch { .. }));
    }
}
