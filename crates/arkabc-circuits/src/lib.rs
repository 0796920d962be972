//! Reference circuits for arkabc.
//!
//! Each circuit implements [`arkabc_core::Circuit`] and is generic over the
//! scalar field, so it runs on every registered curve:
//!
//! - [`product`]: a non-trivial factorization of a public product.
//! - [`hash`]: a BLAKE2s-256 preimage of a public digest.
//! - [`exponentiate`]: `x^e == y` with a private fixed-width exponent.

pub mod exponentiate;
pub mod hash;
pub mod product;

pub use exponentiate::{ExponentiateCircuit, ExponentiateShape, ExponentiateValues};
pub use hash::{Blake2sCircuit, HashShape, HashValues};
pub use product::{ProductCircuit, ProductValues};
