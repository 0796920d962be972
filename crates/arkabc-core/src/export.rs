//! Decimal-string formatting of proofs and public inputs for EVM verifier
//! contracts.

use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::witness::PublicWitness;

/// Canonical (non-Montgomery) decimal representation of a field element.
pub fn field_to_decimal<F: PrimeField>(value: &F) -> String {
    BigUint::from_bytes_le(&value.into_repr().to_bytes_le()).to_str_radix(10)
}

pub fn public_inputs_decimal<E: ark_ec::PairingEngine>(public: &PublicWitness<E>) -> Vec<String> {
    public.inputs().iter().map(field_to_decimal).collect()
}

/// Arguments of a Solidity `verifyProof(a, b, c, input)` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmCalldata {
    pub a: [String; 2],
    /// G2 coordinates with the `c1` limb first, as the EIP-197 precompile expects.
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
    pub inputs: Vec<String>,
}

impl EvmCalldata {
    /// All proof elements flattened in call order: `a`, `b`, `c`.
    pub fn proof_elements(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&self.a);
        for pair in &self.b {
            out.extend_from_slice(pair);
        }
        out.extend_from_slice(&self.c);
        out
    }
}

fn g1(point: &G1Affine) -> [String; 2] {
    if point.infinity {
        return ["0".into(), "0".into()];
    }
    [field_to_decimal(&point.x), field_to_decimal(&point.y)]
}

fn g2(point: &G2Affine) -> [[String; 2]; 2] {
    if point.infinity {
        return [["0".into(), "0".into()], ["0".into(), "0".into()]];
    }
    [
        [field_to_decimal(&point.x.c1), field_to_decimal(&point.x.c0)],
        [field_to_decimal(&point.y.c1), field_to_decimal(&point.y.c0)],
    ]
}

/// Format a BN254 Groth16 proof and its public inputs as call data.
pub fn groth16_bn254(proof: &Proof<Bn254>, public: &PublicWitness<Bn254>) -> EvmCalldata {
    EvmCalldata {
        a: g1(&proof.a),
        b: g2(&proof.b),
        c: g1(&proof.c),
        inputs: public_inputs_decimal(public),
    }
}
