//! The aggregation node: a circuit whose relation is "both child Groth16
//! proofs verify".
//!
//! Public inputs are the two children's public inputs, embedded as outer
//! field limbs (left child first). The child proofs are private witnesses;
//! the child verifying key is a witness or a constant per [`KeyMaterial`].

use ark_ec::{AffineCurve, PairingEngine};
use ark_ff::Zero;
use ark_groth16::constraints::{Groth16VerifierGadget, ProofVar, VerifyingKeyVar};
use ark_groth16::{Proof, VerifyingKey};
use ark_crypto_primitives::snark::constraints::{BooleanInputVar, SNARKGadget};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::ns;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use arkabc_core::circuit::{ensure_len, Circuit, Relation};
use arkabc_core::{PublicWitness, Result, ZkError, R1cs};

use crate::config::KeyMaterial;
use crate::embedding::{embed_public_inputs, limbs_per_input, unpack_limbs, CurveEmbedding, OuterFr};

// --- Placeholders ---

/// A verifying key with the child's input count, built from group
/// generators. Only its shape matters: it stands in during compilation.
pub fn placeholder_verifying_key<E: PairingEngine>(child: &R1cs<E>) -> VerifyingKey<E> {
    generator_key(child.num_public_inputs())
}

pub fn placeholder_proof<E: PairingEngine>() -> Proof<E> {
    Proof {
        a: E::G1Affine::prime_subgroup_generator(),
        b: E::G2Affine::prime_subgroup_generator(),
        c: E::G1Affine::prime_subgroup_generator(),
    }
}

/// All-zero public inputs, one per child input.
pub fn placeholder_inputs<E: PairingEngine>(child: &R1cs<E>) -> PublicWitness<E> {
    zero_inputs(child.num_public_inputs())
}

fn generator_key<E: PairingEngine>(inputs: usize) -> VerifyingKey<E> {
    let g1 = E::G1Affine::prime_subgroup_generator();
    let g2 = E::G2Affine::prime_subgroup_generator();
    VerifyingKey {
        alpha_g1: g1,
        beta_g2: g2,
        gamma_g2: g2,
        delta_g2: g2,
        gamma_abc_g1: vec![g1; inputs + 1],
    }
}

fn zero_inputs<E: PairingEngine>(inputs: usize) -> PublicWitness<E> {
    PublicWitness::new(vec![E::Fr::zero(); inputs])
}

// --- Shape and values ---

/// Structural parameters of one aggregation depth.
pub struct NodeShape<P: CurveEmbedding> {
    /// Public inputs of each child proof.
    pub child_inputs: usize,
    pub key_material: KeyMaterial,
    /// The key compiled in under [`KeyMaterial::Constant`]. Ignored otherwise.
    pub child_key: Option<VerifyingKey<P::Inner>>,
}

impl<P: CurveEmbedding> NodeShape<P> {
    /// Shape for children compiled to `child`.
    pub fn for_children(
        child: &R1cs<P::Inner>,
        key_material: KeyMaterial,
        child_key: Option<VerifyingKey<P::Inner>>,
    ) -> Self {
        Self {
            child_inputs: child.num_public_inputs(),
            key_material,
            child_key,
        }
    }

    /// Public inputs of a node with this shape.
    pub fn node_inputs(&self) -> usize {
        2 * self.child_inputs * limbs_per_input::<P>()
    }
}

impl<P: CurveEmbedding> Clone for NodeShape<P> {
    fn clone(&self) -> Self {
        Self {
            child_inputs: self.child_inputs,
            key_material: self.key_material,
            child_key: self.child_key.clone(),
        }
    }
}

/// One child: its proof and the public inputs it was proved against.
#[derive(Debug, Clone)]
pub struct ChildProof<E: PairingEngine> {
    pub proof: Proof<E>,
    pub public: PublicWitness<E>,
}

pub struct NodeValues<P: CurveEmbedding> {
    /// Key both children verify under.
    pub verifying_key: VerifyingKey<P::Inner>,
    pub left: ChildProof<P::Inner>,
    pub right: ChildProof<P::Inner>,
}

/// Public witness of the node that aggregates `left` and `right`.
pub fn node_public_inputs<P: CurveEmbedding>(
    left: &PublicWitness<P::Inner>,
    right: &PublicWitness<P::Inner>,
) -> PublicWitness<P::Outer> {
    let mut limbs = embed_public_inputs::<P>(left.inputs());
    limbs.extend(embed_public_inputs::<P>(right.inputs()));
    PublicWitness::new(limbs)
}

// --- Circuit ---

pub struct AggregationCircuit<P: CurveEmbedding> {
    key_material: KeyMaterial,
    verifying_key: VerifyingKey<P::Inner>,
    children: [ChildProof<P::Inner>; 2],
}

impl<P: CurveEmbedding> Clone for AggregationCircuit<P> {
    fn clone(&self) -> Self {
        Self {
            key_material: self.key_material,
            verifying_key: self.verifying_key.clone(),
            children: self.children.clone(),
        }
    }
}

impl<P: CurveEmbedding> AggregationCircuit<P> {
    fn child_inputs(&self) -> usize {
        self.verifying_key.gamma_abc_g1.len() - 1
    }
}

impl<P: CurveEmbedding> Circuit for AggregationCircuit<P> {
    type Shape = NodeShape<P>;
    type Values = NodeValues<P>;

    fn fix_shape(shape: &NodeShape<P>) -> Result<Self> {
        let verifying_key = match (shape.key_material, &shape.child_key) {
            (KeyMaterial::Witness, _) => generator_key(shape.child_inputs),
            (KeyMaterial::Constant, Some(key)) => {
                ensure_len(
                    "child verifying key inputs",
                    shape.child_inputs + 1,
                    key.gamma_abc_g1.len(),
                )?;
                key.clone()
            }
            (KeyMaterial::Constant, None) => {
                return Err(ZkError::InvalidConfig(
                    "constant key material needs the child verifying key at compile time".into(),
                ))
            }
        };
        let placeholder = ChildProof {
            proof: placeholder_proof(),
            public: zero_inputs(shape.child_inputs),
        };
        Ok(Self {
            key_material: shape.key_material,
            verifying_key,
            children: [placeholder.clone(), placeholder],
        })
    }

    fn assign(&mut self, values: &NodeValues<P>) -> Result<()> {
        let inputs = self.child_inputs();
        ensure_len(
            "child verifying key inputs",
            inputs + 1,
            values.verifying_key.gamma_abc_g1.len(),
        )?;
        ensure_len("left child public inputs", inputs, values.left.public.len())?;
        ensure_len("right child public inputs", inputs, values.right.public.len())?;

        match self.key_material {
            KeyMaterial::Witness => self.verifying_key = values.verifying_key.clone(),
            KeyMaterial::Constant if self.verifying_key != values.verifying_key => {
                return Err(ZkError::InvalidConfig(
                    "child verifying key differs from the one compiled into this circuit".into(),
                ))
            }
            KeyMaterial::Constant => {}
        }
        self.children = [values.left.clone(), values.right.clone()];
        Ok(())
    }
}

impl<P: CurveEmbedding> Relation<OuterFr<P>> for AggregationCircuit<P> {
    fn define(&self, cs: ConstraintSystemRef<OuterFr<P>>) -> std::result::Result<(), SynthesisError> {
        let per_input = limbs_per_input::<P>();

        let mut inputs = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let limbs = embed_public_inputs::<P>(child.public.inputs());
            let vars = Vec::<FpVar<OuterFr<P>>>::new_input(ns!(cs, "child inputs"), || Ok(limbs))?;
            let bits = vars
                .chunks(per_input)
                .map(unpack_limbs::<P>)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            inputs.push(BooleanInputVar::new(bits));
        }

        let vk = match self.key_material {
            KeyMaterial::Witness => VerifyingKeyVar::<P::Inner, P::InnerPairing>::new_witness(
                ns!(cs, "child vk"),
                || Ok(self.verifying_key.clone()),
            )?,
            KeyMaterial::Constant => VerifyingKeyVar::<P::Inner, P::InnerPairing>::new_constant(
                ns!(cs, "child vk"),
                self.verifying_key.clone(),
            )?,
        };

        for (child, input) in self.children.iter().zip(&inputs) {
            let proof = ProofVar::<P::Inner, P::InnerPairing>::new_witness(
                ns!(cs, "child proof"),
                || Ok(child.proof.clone()),
            )?;
            Groth16VerifierGadget::<P::Inner, P::InnerPairing>::verify(&vk, input, &proof)?
                .enforce_equal(&Boolean::TRUE)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{recombine_public_inputs, Bls12_377InBw6_761, InnerFr};
    use arkabc_core::curve::Bls12_377;
    use arkabc_core::ErrorCategory;
    use arkabc_circuits::{ProductCircuit, ProductValues};
    use arkabc_core::{Groth16, Pipeline};

    type P = Bls12_377InBw6_761;

    fn leaf_r1cs() -> R1cs<Bls12_377> {
        R1cs::compile(&ProductCircuit::default()).unwrap()
    }

    #[test]
    fn test_placeholders_follow_child_shape() {
        let child = leaf_r1cs();
        assert_eq!(placeholder_verifying_key(&child).gamma_abc_g1.len(), 2);
        assert_eq!(placeholder_inputs(&child).len(), 1);
        let proof = placeholder_proof::<Bls12_377>();
        assert_eq!(proof.a, proof.c);
    }

    #[test]
    fn test_constant_key_required() {
        let child = leaf_r1cs();
        let shape = NodeShape::<P>::for_children(&child, KeyMaterial::Constant, None);
        let err = AggregationCircuit::fix_shape(&shape).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Config);

        let wrong = NodeShape::<P>::for_children(
            &child,
            KeyMaterial::Constant,
            Some(generator_key(3)),
        );
        let err = AggregationCircuit::fix_shape(&wrong).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Shape);
    }

    #[test]
    fn test_node_inputs() {
        let child = leaf_r1cs();
        let shape = NodeShape::<P>::for_children(&child, KeyMaterial::Witness, None);
        assert_eq!(shape.node_inputs(), 2);

        let left = PublicWitness::<Bls12_377>::new(vec![221u64.into()]);
        let right = PublicWitness::<Bls12_377>::new(vec![323u64.into()]);
        let node = node_public_inputs::<P>(&left, &right);
        assert_eq!(node.len(), 2);
        let back = recombine_public_inputs::<P>(node.inputs()).unwrap();
        let expected: Vec<InnerFr<P>> = vec![221u64.into(), 323u64.into()];
        assert_eq!(back, expected);
    }

    #[test]
    fn test_assign_checks_children() {
        let mut pipeline = Pipeline::<Bls12_377, Groth16, ProductCircuit>::new(&())
            .unwrap()
            .with_seed(11);
        pipeline.compile().unwrap();
        pipeline.setup().unwrap();
        pipeline.prove(&ProductValues::factors(13, 17)).unwrap();
        let child = ChildProof {
            proof: pipeline.proof().unwrap().clone(),
            public: pipeline.public_witness().unwrap(),
        };
        let vk = pipeline.verifying_key().unwrap().as_ref().clone();

        let shape = NodeShape::<P>::for_children(
            pipeline.r1cs().unwrap(),
            KeyMaterial::Constant,
            Some(vk.clone()),
        );
        let mut circuit = AggregationCircuit::fix_shape(&shape).unwrap();

        let short = ChildProof {
            proof: child.proof.clone(),
            public: PublicWitness::new(vec![]),
        };
        let values = NodeValues::<P> {
            verifying_key: vk.clone(),
            left: child.clone(),
            right: short,
        };
        assert_eq!(circuit.assign(&values).unwrap_err().category(), ErrorCategory::Shape);

        let foreign_key = NodeValues::<P> {
            verifying_key: generator_key(1),
            left: child.clone(),
            right: child.clone(),
        };
        assert_eq!(
            circuit.assign(&foreign_key).unwrap_err().category(),
            ErrorCategory::Config
        );

        let values = NodeValues::<P> {
            verifying_key: vk,
            left: child.clone(),
            right: child,
        };
        circuit.assign(&values).unwrap();
    }
}
