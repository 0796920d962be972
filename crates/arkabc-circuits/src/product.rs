use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use serde::{Deserialize, Serialize};

use arkabc_core::circuit::{assigned, Circuit, Relation};
use arkabc_core::error::Result;

/// Knowledge of a non-trivial factorization: `p * q == n` with `p != 1`
/// and `q != 1`. Only `n` is public.
#[derive(Debug, Clone, Default)]
pub struct ProductCircuit {
    p: Option<u64>,
    q: Option<u64>,
    n: Option<u128>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductValues {
    pub p: u64,
    pub q: u64,
    pub n: u128,
}

impl ProductValues {
    /// Values for `n = p * q`.
    pub fn factors(p: u64, q: u64) -> Self {
        Self {
            p,
            q,
            n: u128::from(p) * u128::from(q),
        }
    }
}

impl Circuit for ProductCircuit {
    type Shape = ();
    type Values = ProductValues;

    fn fix_shape(_: &()) -> Result<Self> {
        Ok(Self::default())
    }

    fn assign(&mut self, values: &ProductValues) -> Result<()> {
        self.p = Some(values.p);
        self.q = Some(values.q);
        self.n = Some(values.n);
        Ok(())
    }
}

impl<F: PrimeField> Relation<F> for ProductCircuit {
    fn define(&self, cs: ConstraintSystemRef<F>) -> std::result::Result<(), SynthesisError> {
        let n = FpVar::new_input(cs.clone(), || assigned(&self.n).map(F::from))?;
        let p = FpVar::new_witness(cs.clone(), || assigned(&self.p).map(F::from))?;
        let q = FpVar::new_witness(cs, || assigned(&self.q).map(F::from))?;

        (&p * &q).enforce_equal(&n)?;
        let one = FpVar::one();
        p.enforce_not_equal(&one)?;
        q.enforce_not_equal(&one)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkabc_core::backend::{Groth16, Marlin};
    use arkabc_core::error::{ErrorCategory, ZkError};
    use arkabc_core::pipeline::{Pipeline, Stage};
    use arkabc_core::witness::PublicWitness;
    use ark_bls12_381::Bls12_381;
    use ark_bn254::{Bn254, Fr};

    #[test]
    fn test_factors() {
        let values = ProductValues::factors(13, 17);
        assert_eq!(values.n, 221);
    }

    #[test]
    fn test_product_groth16_bn254() {
        let mut pipeline = Pipeline::<Bn254, Groth16, ProductCircuit>::new(&())
            .unwrap()
            .with_seed(13);
        pipeline.compile().unwrap();
        pipeline.setup().unwrap();
        pipeline.prove(&ProductValues::factors(13, 17)).unwrap();
        pipeline.verify().unwrap();
        assert_eq!(pipeline.stage(), Stage::Verified);

        pipeline
            .override_public_witness(PublicWitness::new(vec![Fr::from(222u64)]))
            .unwrap();
        let err = pipeline.verify().unwrap_err();
        assert!(matches!(err, ZkError::VerificationFailed(_)));
    }

    #[test]
    fn test_product_marlin_bls12_381() {
        let mut pipeline = Pipeline::<Bls12_381, Marlin, ProductCircuit>::new(&())
            .unwrap()
            .with_seed(17);
        pipeline.compile().unwrap();
        pipeline.setup().unwrap();
        pipeline.prove(&ProductValues::factors(13, 17)).unwrap();
        pipeline.verify().unwrap();
    }

    #[test]
    fn test_wrong_product_fails_to_prove() {
        let mut pipeline = Pipeline::<Bn254, Groth16, ProductCircuit>::new(&()).unwrap();
        pipeline.compile().unwrap();
        pipeline.setup().unwrap();
        let values = ProductValues { p: 13, q: 17, n: 222 };
        assert_eq!(
            pipeline.prove(&values).unwrap_err().category(),
            ErrorCategory::Prove
        );
    }

    #[test]
    fn test_trivial_factor_rejected() {
        let mut pipeline = Pipeline::<Bn254, Groth16, ProductCircuit>::new(&()).unwrap();
        pipeline.compile().unwrap();
        pipeline.setup().unwrap();
        let err = pipeline.prove(&ProductValues::factors(1, 221)).unwrap_err();
        assert!(matches!(err, ZkError::Unsatisfied(_)));
    }
}
