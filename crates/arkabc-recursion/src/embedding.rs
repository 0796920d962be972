//! Curve embeddings: which proofs can be verified inside which circuits.
//!
//! Verifying a Groth16 proof over an inner curve needs its pairing evaluated
//! in-circuit, i.e. over the inner curve's base field. That is only native
//! when the outer curve's scalar field *is* that base field, so the valid
//! (inner, outer) pairs are the two-chain and cycle partners below.

use ark_ec::PairingEngine;
use ark_ff::{BigInteger, Field, FpParameters, PrimeField};
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::pairing::PairingVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

use arkabc_core::curve::{Bls12_377, BW6_761, MNT4_298, MNT6_298};
use arkabc_core::{CurveId, PairingCurve, Result, ZkError};

/// An (inner, outer) pair where inner Groth16 proofs verify in outer circuits.
pub trait CurveEmbedding: Send + Sync + 'static {
    type Inner: PairingCurve;
    type Outer: PairingCurve<Fr = <Self::Inner as PairingEngine>::Fq>;
    /// Pairing gadget for the inner curve, over the outer scalar field.
    type InnerPairing: PairingVar<Self::Inner, <Self::Inner as PairingEngine>::Fq>;
}

/// Scalar field of the inner curve: what child public inputs live in.
pub type InnerFr<P> = <<P as CurveEmbedding>::Inner as PairingEngine>::Fr;

/// Scalar field of the outer curve, equal to the inner base field.
pub type OuterFr<P> = <<P as CurveEmbedding>::Inner as PairingEngine>::Fq;

/// BLS12-377 proofs inside BW6-761 circuits.
#[derive(Debug, Clone, Copy)]
pub struct Bls12_377InBw6_761;

impl CurveEmbedding for Bls12_377InBw6_761 {
    type Inner = Bls12_377;
    type Outer = BW6_761;
    type InnerPairing = ark_bls12_377::constraints::PairingVar;
}

/// MNT4-298 proofs inside MNT6-298 circuits.
#[derive(Debug, Clone, Copy)]
pub struct Mnt4InMnt6;

impl CurveEmbedding for Mnt4InMnt6 {
    type Inner = MNT4_298;
    type Outer = MNT6_298;
    type InnerPairing = ark_mnt4_298::constraints::PairingVar;
}

/// MNT6-298 proofs inside MNT4-298 circuits.
#[derive(Debug, Clone, Copy)]
pub struct Mnt6InMnt4;

impl CurveEmbedding for Mnt6InMnt4 {
    type Inner = MNT6_298;
    type Outer = MNT4_298;
    type InnerPairing = ark_mnt6_298::constraints::PairingVar;
}

/// Every supported (inner, outer) pair.
///
/// Same-curve pairs are absent: they would need non-native pairing gadgets,
/// and [`check_embedding`] reports them as [`ZkError::SameCurveRecursion`].
pub const WHITELIST: [(CurveId, CurveId); 3] = [
    (CurveId::Bls12_377, CurveId::Bw6_761),
    (CurveId::Mnt4_298, CurveId::Mnt6_298),
    (CurveId::Mnt6_298, CurveId::Mnt4_298),
];

pub fn check_embedding(inner: CurveId, outer: CurveId) -> Result<()> {
    if WHITELIST.contains(&(inner, outer)) {
        Ok(())
    } else if inner == outer {
        Err(ZkError::SameCurveRecursion { curve: inner })
    } else {
        Err(ZkError::UnsupportedEmbedding { inner, outer })
    }
}

/// Runs `$body` with `$P` bound to the [`CurveEmbedding`] of a runtime pair.
/// `$body` must evaluate to a `Result`; unlisted pairs short-circuit with
/// the same errors as [`check_embedding`].
macro_rules! with_embedding {
    ($inner:expr, $outer:expr, $P:ident => $body:expr) => {
        match ($inner, $outer) {
            (arkabc_core::CurveId::Bls12_377, arkabc_core::CurveId::Bw6_761) => {
                type $P = $crate::embedding::Bls12_377InBw6_761;
                $body
            }
            (arkabc_core::CurveId::Mnt4_298, arkabc_core::CurveId::Mnt6_298) => {
                type $P = $crate::embedding::Mnt4InMnt6;
                $body
            }
            (arkabc_core::CurveId::Mnt6_298, arkabc_core::CurveId::Mnt4_298) => {
                type $P = $crate::embedding::Mnt6InMnt4;
                $body
            }
            (inner, outer) if inner == outer => {
                Err(arkabc_core::ZkError::SameCurveRecursion { curve: inner })
            }
            (inner, outer) => Err(arkabc_core::ZkError::UnsupportedEmbedding { inner, outer }),
        }
    };
}

pub(crate) use with_embedding;

// --- Public input limbs ---

fn inner_bits<P: CurveEmbedding>() -> usize {
    <InnerFr<P> as PrimeField>::Params::MODULUS_BITS as usize
}

fn limb_bits<P: CurveEmbedding>() -> usize {
    <OuterFr<P> as PrimeField>::Params::CAPACITY as usize
}

/// Outer field elements needed to carry one inner scalar.
pub fn limbs_per_input<P: CurveEmbedding>() -> usize {
    let (bits, capacity) = (inner_bits::<P>(), limb_bits::<P>());
    (bits + capacity - 1) / capacity
}

fn from_bits_le<F: Field>(bits: &[bool]) -> F {
    bits.iter().rev().fold(F::zero(), |acc, &bit| {
        let doubled = acc.double();
        if bit {
            doubled + F::one()
        } else {
            doubled
        }
    })
}

/// Split inner scalars into little-endian outer-field limbs of `CAPACITY`
/// bits each, [`limbs_per_input`] limbs per scalar.
pub fn embed_public_inputs<P: CurveEmbedding>(inputs: &[InnerFr<P>]) -> Vec<OuterFr<P>> {
    let bits = inner_bits::<P>();
    let capacity = limb_bits::<P>();
    let mut limbs = Vec::with_capacity(inputs.len() * limbs_per_input::<P>());
    for input in inputs {
        let mut le = input.into_repr().to_bits_le();
        le.truncate(bits);
        limbs.extend(le.chunks(capacity).map(from_bits_le::<OuterFr<P>>));
    }
    limbs
}

/// Inverse of [`embed_public_inputs`]. `None` if the limb count is off or a
/// limb is wider than its slot.
pub fn recombine_public_inputs<P: CurveEmbedding>(
    limbs: &[OuterFr<P>],
) -> Option<Vec<InnerFr<P>>> {
    let per_input = limbs_per_input::<P>();
    if limbs.len() % per_input != 0 {
        return None;
    }
    let bits = inner_bits::<P>();
    let capacity = limb_bits::<P>();
    let mut inputs = Vec::with_capacity(limbs.len() / per_input);
    for group in limbs.chunks(per_input) {
        let mut le = Vec::with_capacity(bits);
        for limb in group {
            let width = capacity.min(bits - le.len());
            let limb_bits = limb.into_repr().to_bits_le();
            if limb_bits[width..].iter().any(|&bit| bit) {
                return None;
            }
            le.extend_from_slice(&limb_bits[..width]);
        }
        inputs.push(from_bits_le::<InnerFr<P>>(&le));
    }
    Some(inputs)
}

/// In-circuit counterpart of [`recombine_public_inputs`] for one scalar:
/// the scalar's little-endian bits, with every bit above a limb's slot
/// constrained to zero.
pub(crate) fn unpack_limbs<P: CurveEmbedding>(
    limbs: &[FpVar<OuterFr<P>>],
) -> std::result::Result<Vec<Boolean<OuterFr<P>>>, SynthesisError> {
    let bits = inner_bits::<P>();
    let capacity = limb_bits::<P>();
    let mut out = Vec::with_capacity(bits);
    for limb in limbs {
        let width = capacity.min(bits - out.len());
        for (i, bit) in limb.to_bits_le()?.into_iter().enumerate() {
            if i < width {
                out.push(bit);
            } else {
                bit.enforce_equal(&Boolean::FALSE)?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use ark_relations::r1cs::ConstraintSystem;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_whitelist() {
        for (inner, outer) in WHITELIST {
            assert!(check_embedding(inner, outer).is_ok());
        }
        for id in CurveId::ALL {
            assert!(matches!(
                check_embedding(id, id),
                Err(ZkError::SameCurveRecursion { curve }) if curve == id
            ));
        }
        assert!(matches!(
            check_embedding(CurveId::Bw6_761, CurveId::Bls12_377),
            Err(ZkError::UnsupportedEmbedding { .. })
        ));
        assert!(check_embedding(CurveId::Bn254, CurveId::Bls12_381).is_err());
    }

    #[test]
    fn test_macro_dispatch() {
        let limbs = |inner: CurveId, outer: CurveId| with_embedding!(inner, outer, P => Ok(limbs_per_input::<P>()));
        assert_eq!(limbs(CurveId::Bls12_377, CurveId::Bw6_761).unwrap(), 1);
        assert_eq!(limbs(CurveId::Mnt4_298, CurveId::Mnt6_298).unwrap(), 2);
        assert_eq!(limbs(CurveId::Mnt6_298, CurveId::Mnt4_298).unwrap(), 2);
        assert!(matches!(
            limbs(CurveId::Bn254, CurveId::Bn254),
            Err(ZkError::SameCurveRecursion { curve: CurveId::Bn254 })
        ));
        assert!(limbs(CurveId::Bls12_381, CurveId::Bw6_761).is_err());
    }

    fn roundtrip<P: CurveEmbedding>(seed: u64, count: usize) {
        let mut rng = StdRng::seed_from_u64(seed);
        let inputs: Vec<InnerFr<P>> = (0..count).map(|_| InnerFr::<P>::rand(&mut rng)).collect();
        let limbs = embed_public_inputs::<P>(&inputs);
        assert_eq!(limbs.len(), count * limbs_per_input::<P>());
        assert_eq!(recombine_public_inputs::<P>(&limbs), Some(inputs));
    }

    proptest! {
        #[test]
        fn test_limbs_recombine(seed in any::<u64>(), count in 0usize..4) {
            roundtrip::<Bls12_377InBw6_761>(seed, count);
            roundtrip::<Mnt4InMnt6>(seed, count);
            roundtrip::<Mnt6InMnt4>(seed, count);
        }
    }

    #[test]
    fn test_recombine_rejects_bad_limbs() {
        let one = <OuterFr<Mnt4InMnt6> as Field>::one();
        assert!(recombine_public_inputs::<Mnt4InMnt6>(&[one]).is_none());
        // The top limb of an MNT4 scalar only has one bit of room.
        let wide = one.double().double();
        assert!(recombine_public_inputs::<Mnt4InMnt6>(&[one, wide]).is_none());
    }

    #[test]
    fn test_unpack_matches_native_bits() {
        let mut rng = StdRng::seed_from_u64(7);
        let input = InnerFr::<Mnt4InMnt6>::rand(&mut rng);
        let limbs = embed_public_inputs::<Mnt4InMnt6>(&[input]);

        let cs = ConstraintSystem::<OuterFr<Mnt4InMnt6>>::new_ref();
        let vars = Vec::<FpVar<_>>::new_witness(cs.clone(), || Ok(limbs)).unwrap();
        let bits = unpack_limbs::<Mnt4InMnt6>(&vars).unwrap();
        let values: Vec<bool> = bits.iter().map(|b| b.value().unwrap()).collect();

        let mut expected = input.into_repr().to_bits_le();
        expected.truncate(inner_bits::<Mnt4InMnt6>());
        assert_eq!(values, expected);
        assert!(cs.is_satisfied().unwrap());
    }
}
