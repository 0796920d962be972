use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use arkabc_core::circuit::{assigned, Circuit, Relation};
use arkabc_core::error::{Result, ZkError};

pub const DEFAULT_EXPONENT_BITS: usize = 8;

/// Largest `x^e` that [`ExponentiateValues::of`] computes exactly, in bits.
pub const MAX_RESULT_BITS: u64 = 1 << 16;

/// `x^e == y` for public `x` and `y` and a private exponent of fixed width.
#[derive(Debug, Clone)]
pub struct ExponentiateCircuit {
    x: Option<u64>,
    y: Option<BigUint>,
    /// Most significant bit first.
    bits: Vec<Option<bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentiateShape {
    pub exponent_bits: usize,
}

impl Default for ExponentiateShape {
    fn default() -> Self {
        Self {
            exponent_bits: DEFAULT_EXPONENT_BITS,
        }
    }
}

/// `y` is an unbounded integer, written as a decimal string. The circuit
/// reduces it into the scalar field, so a `y` past the modulus is checked
/// as `x^e mod p`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentiateValues {
    pub x: u64,
    pub e: u64,
    #[serde(with = "decimal")]
    pub y: BigUint,
}

impl ExponentiateValues {
    /// Values for `y = x^e`, or `None` if `x^e` is wider than
    /// [`MAX_RESULT_BITS`].
    pub fn of(x: u64, e: u64) -> Option<Self> {
        let width = u64::from(u64::BITS - x.leading_zeros());
        if width.saturating_mul(e) > MAX_RESULT_BITS {
            return None;
        }
        let y = BigUint::from(x).pow(u32::try_from(e).ok()?);
        Some(Self { x, e, y })
    }
}

mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| de::Error::custom(format!("invalid decimal: {text}")))
    }
}

fn bit_length(value: u64) -> usize {
    (u64::BITS - value.leading_zeros()) as usize
}

impl Circuit for ExponentiateCircuit {
    type Shape = ExponentiateShape;
    type Values = ExponentiateValues;

    fn fix_shape(shape: &ExponentiateShape) -> Result<Self> {
        if shape.exponent_bits == 0 || shape.exponent_bits > u64::BITS as usize {
            return Err(ZkError::InvalidConfig(format!(
                "exponent width must be between 1 and 64 bits, got {}",
                shape.exponent_bits
            )));
        }
        Ok(Self {
            x: None,
            y: None,
            bits: vec![None; shape.exponent_bits],
        })
    }

    fn assign(&mut self, values: &ExponentiateValues) -> Result<()> {
        let width = self.bits.len();
        if bit_length(values.e) > width {
            return Err(ZkError::ShapeMismatch {
                what: "exponent bits".into(),
                expected: width,
                actual: bit_length(values.e),
            });
        }
        self.x = Some(values.x);
        self.y = Some(values.y.clone());
        self.bits = (0..width)
            .rev()
            .map(|i| Some((values.e >> i) & 1 == 1))
            .collect();
        Ok(())
    }
}

impl<F: PrimeField> Relation<F> for ExponentiateCircuit {
    fn define(&self, cs: ConstraintSystemRef<F>) -> std::result::Result<(), SynthesisError> {
        let x = FpVar::new_input(cs.clone(), || assigned(&self.x).map(F::from))?;
        let y = FpVar::new_input(cs.clone(), || assigned(&self.y).map(F::from))?;

        let mut acc = FpVar::one();
        for bit in &self.bits {
            let bit = Boolean::new_witness(cs.clone(), || assigned(bit))?;
            acc = acc.square()?;
            acc = bit.select(&(&acc * &x), &acc)?;
        }
        acc.enforce_equal(&y)
    }
}
