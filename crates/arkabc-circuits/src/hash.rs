use ark_crypto_primitives::prf::blake2s::constraints::evaluate_blake2s;
use ark_ff::{PrimeField, ToConstraintField};
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use blake2::{Blake2s, Digest};
use serde::{Deserialize, Serialize};

use arkabc_core::circuit::{ensure_len, Circuit, Relation};
use arkabc_core::error::Result;

pub const DIGEST_LEN: usize = 32;

/// Knowledge of a BLAKE2s-256 preimage of a public digest.
///
/// The digest is packed into as few public field elements as the scalar
/// field capacity allows (two on BN254, one on MNT4-298).
#[derive(Debug, Clone)]
pub struct Blake2sCircuit {
    preimage: Vec<Option<u8>>,
    digest: Option<[u8; DIGEST_LEN]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashShape {
    pub preimage_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashValues {
    pub preimage: Vec<u8>,
    pub digest: [u8; DIGEST_LEN],
}

impl HashValues {
    /// Values for `preimage` with its actual digest.
    pub fn of(preimage: &[u8]) -> Self {
        Self {
            preimage: preimage.to_vec(),
            digest: blake2s(preimage),
        }
    }

    pub fn shape(&self) -> HashShape {
        HashShape {
            preimage_len: self.preimage.len(),
        }
    }
}

/// Native BLAKE2s-256, unkeyed.
pub fn blake2s(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Blake2s::digest(data));
    out
}

/// The public inputs a digest occupies over the field `F`.
pub fn digest_inputs<F: PrimeField>(digest: &[u8; DIGEST_LEN]) -> Vec<F> {
    ToConstraintField::<F>::to_field_elements(&digest[..]).unwrap_or_default()
}

impl Circuit for Blake2sCircuit {
    type Shape = HashShape;
    type Values = HashValues;

    fn fix_shape(shape: &HashShape) -> Result<Self> {
        Ok(Self {
            preimage: vec![None; shape.preimage_len],
            digest: None,
        })
    }

    fn assign(&mut self, values: &HashValues) -> Result<()> {
        ensure_len("preimage bytes", self.preimage.len(), values.preimage.len())?;
        self.preimage = values.preimage.iter().copied().map(Some).collect();
        self.digest = Some(values.digest);
        Ok(())
    }
}

impl<F: PrimeField> Relation<F> for Blake2sCircuit {
    fn define(&self, cs: ConstraintSystemRef<F>) -> std::result::Result<(), SynthesisError> {
        // The input allocator packs bytes natively even in setup mode, where
        // the values are ignored; zeros stand in for the unset digest there.
        let digest = match self.digest {
            Some(digest) => digest,
            None if cs.is_in_setup_mode() => [0u8; DIGEST_LEN],
            None => return Err(SynthesisError::AssignmentMissing),
        };
        let expected = UInt8::new_input_vec(ns!(cs, "digest"), &digest)?;
        let preimage = UInt8::new_witness_vec(ns!(cs, "preimage"), self.preimage.as_slice())?;

        let words = evaluate_blake2s(&preimage.to_bits_le()?)?;
        let mut computed = Vec::with_capacity(DIGEST_LEN);
        for word in &words {
            computed.extend(word.to_bytes()?);
        }
        computed.enforce_equal(&expected)
    }
}
