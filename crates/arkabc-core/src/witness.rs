//! Witness values produced by proving.
//!
//! A [`FullWitness`] stays with the prover. Only its [`PublicWitness`] half
//! is stored next to a proof and handed to verifiers.

use ark_ec::PairingEngine;

/// Full assignment of a compiled circuit: public inputs followed by private
/// witness values. The constant `1` variable is implicit and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullWitness<E: PairingEngine> {
    pub(crate) public: Vec<E::Fr>,
    pub(crate) private: Vec<E::Fr>,
}

/// Public inputs only. What a verifier receives alongside a proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicWitness<E: PairingEngine> {
    pub(crate) inputs: Vec<E::Fr>,
}

impl<E: PairingEngine> FullWitness<E> {
    pub fn new(public: Vec<E::Fr>, private: Vec<E::Fr>) -> Self {
        Self { public, private }
    }

    /// Project onto the public inputs. There is no way back.
    pub fn public(&self) -> PublicWitness<E> {
        PublicWitness {
            inputs: self.public.clone(),
        }
    }

    pub fn public_inputs(&self) -> &[E::Fr] {
        &self.public
    }

    pub fn private_values(&self) -> &[E::Fr] {
        &self.private
    }
}

impl<E: PairingEngine> PublicWitness<E> {
    pub fn new(inputs: Vec<E::Fr>) -> Self {
        Self { inputs }
    }

    pub fn inputs(&self) -> &[E::Fr] {
        &self.inputs
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
