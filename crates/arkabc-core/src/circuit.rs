//! Circuit contract.
//!
//! A circuit is used in two phases. [`Circuit::fix_shape`] produces a
//! placeholder whose structural parameters (vector lengths, bit widths) are
//! final but whose values are unset; that placeholder is what gets compiled.
//! [`Circuit::assign`] then fills concrete values into a copy of it without
//! changing the shape, and the assigned copy drives witness generation.

use ark_ff::PrimeField;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::error::{Result, ZkError};

/// Two-phase circuit specification.
pub trait Circuit: Clone + Send + Sync + 'static {
    /// Structural parameters fixed at compile time.
    type Shape;
    /// Concrete values supplied per proof.
    type Values: Send + Sync;

    /// Build an unassigned circuit with the given shape.
    fn fix_shape(shape: &Self::Shape) -> Result<Self>;

    /// Fill in values. Must fail with a shape error rather than resize.
    fn assign(&mut self, values: &Self::Values) -> Result<()>;
}

/// Constraint definition of a circuit over the scalar field `F`.
///
/// Implementations allocate public inputs before private witnesses in a
/// fixed order; the same order must hold whether or not values are set.
pub trait Relation<F: PrimeField>: Circuit {
    fn define(&self, cs: ConstraintSystemRef<F>) -> std::result::Result<(), SynthesisError>;
}

/// Fail with [`ZkError::ShapeMismatch`] unless `actual == expected`.
pub fn ensure_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ZkError::ShapeMismatch {
            what: what.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Read an optional assigned value inside a witness closure.
pub fn assigned<T: Clone>(value: &Option<T>) -> std::result::Result<T, SynthesisError> {
    value.clone().ok_or(SynthesisError::AssignmentMissing)
}
