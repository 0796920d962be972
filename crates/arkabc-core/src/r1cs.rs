//! Compiled rank-1 constraint systems.
//!
//! Compilation synthesizes a shaped circuit once in setup mode and keeps the
//! resulting matrices. Key generation and proving never see the circuit
//! again: they replay the matrices through [`Replay`], so a constraint system
//! loaded from disk is as good as a freshly compiled one.

use ark_ec::PairingEngine;
use ark_ff::{Field, One, Zero};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, LinearCombination,
    OptimizationGoal, SynthesisError, SynthesisMode, Variable,
};
use tracing::debug;

use crate::circuit::{ensure_len, Relation};
use crate::curve::PairingCurve;
use crate::error::{Result, ZkError};
use crate::witness::FullWitness;

/// Sparse row-major matrix; each entry is `(coefficient, column)`.
pub type Matrix<F> = Vec<Vec<(F, usize)>>;

/// A finalized constraint system.
///
/// Columns are ordered `[1, public inputs.., private witnesses..]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct R1cs<E: PairingEngine> {
    pub(crate) num_instance: usize,
    pub(crate) num_witness: usize,
    pub(crate) a: Matrix<E::Fr>,
    pub(crate) b: Matrix<E::Fr>,
    pub(crate) c: Matrix<E::Fr>,
}

impl<E: PairingCurve> R1cs<E> {
    /// Synthesize `circuit` in setup mode and capture its matrices.
    pub fn compile<C: Relation<E::Fr>>(circuit: &C) -> Result<Self> {
        let cs = ConstraintSystem::<E::Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);
        circuit.define(cs.clone()).map_err(ZkError::Compilation)?;
        cs.finalize();

        let matrices = cs
            .to_matrices()
            .ok_or(ZkError::Compilation(SynthesisError::MissingCS))?;
        debug!(
            constraints = matrices.num_constraints,
            instance = matrices.num_instance_variables,
            witness = matrices.num_witness_variables,
            "constraint system finalized"
        );
        Ok(Self {
            num_instance: matrices.num_instance_variables,
            num_witness: matrices.num_witness_variables,
            a: matrices.a,
            b: matrices.b,
            c: matrices.c,
        })
    }

    /// Evaluate an assigned circuit against this constraint system.
    ///
    /// The circuit must allocate exactly the compiled number of variables and
    /// constraints, and every constraint must hold.
    pub fn generate_witness<C: Relation<E::Fr>>(&self, circuit: &C) -> Result<FullWitness<E>> {
        let cs = ConstraintSystem::<E::Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Prove {
            construct_matrices: false,
        });
        circuit.define(cs.clone()).map_err(ZkError::Witness)?;

        ensure_len("public inputs", self.num_instance, cs.num_instance_variables())?;
        ensure_len("witness variables", self.num_witness, cs.num_witness_variables())?;
        ensure_len("constraints", self.num_constraints(), cs.num_constraints())?;

        let witness = {
            let inner = cs.borrow().ok_or(ZkError::Witness(SynthesisError::MissingCS))?;
            FullWitness::new(
                inner.instance_assignment[1..].to_vec(),
                inner.witness_assignment.clone(),
            )
        };
        // Checked against the compiled rows: those are what the backends prove.
        if let Some(row) = self.first_unsatisfied(&witness)? {
            return Err(ZkError::Unsatisfied(format!("constraint {row}")));
        }
        Ok(witness)
    }
}

impl<E: PairingEngine> R1cs<E> {
    pub fn num_constraints(&self) -> usize {
        self.a.len()
    }

    /// Number of public inputs, not counting the constant `1`.
    pub fn num_public_inputs(&self) -> usize {
        self.num_instance - 1
    }

    pub fn num_witness_variables(&self) -> usize {
        self.num_witness
    }

    /// All columns, including the constant `1`.
    pub fn num_variables(&self) -> usize {
        self.num_instance + self.num_witness
    }

    /// Non-zero entries of A, B and C.
    pub fn num_non_zero(&self) -> [usize; 3] {
        let count = |m: &Matrix<E::Fr>| -> usize { m.iter().map(Vec::len).sum() };
        [count(&self.a), count(&self.b), count(&self.c)]
    }

    pub fn check_witness(&self, witness: &FullWitness<E>) -> Result<()> {
        ensure_len("public inputs", self.num_public_inputs(), witness.public.len())?;
        ensure_len("witness variables", self.num_witness, witness.private.len())
    }

    pub fn is_satisfied_by(&self, witness: &FullWitness<E>) -> bool {
        matches!(self.first_unsatisfied(witness), Ok(None))
    }

    /// Native evaluation of every row; the index of the first one `witness`
    /// violates.
    pub fn first_unsatisfied(&self, witness: &FullWitness<E>) -> Result<Option<usize>> {
        self.check_witness(witness)?;
        let mut columns = Vec::with_capacity(self.num_variables());
        columns.push(E::Fr::one());
        columns.extend_from_slice(&witness.public);
        columns.extend_from_slice(&witness.private);

        let eval = |row: &[(E::Fr, usize)]| {
            row.iter()
                .fold(E::Fr::zero(), |acc, (coeff, col)| acc + *coeff * columns[*col])
        };
        Ok(self
            .a
            .iter()
            .zip(&self.b)
            .zip(&self.c)
            .position(|((a, b), c)| eval(a) * eval(b) != eval(c)))
    }

    /// Synthesizer that re-emits these constraints, with or without values.
    pub(crate) fn replay<'a>(&'a self, witness: Option<&'a FullWitness<E>>) -> Replay<'a, E> {
        Replay { r1cs: self, witness }
    }
}

/// Re-emits a compiled constraint system into a backend's own constraint
/// system.
pub(crate) struct Replay<'a, E: PairingEngine> {
    r1cs: &'a R1cs<E>,
    witness: Option<&'a FullWitness<E>>,
}

impl<'a, E: PairingEngine> ConstraintSynthesizer<E::Fr> for Replay<'a, E> {
    fn generate_constraints(
        self,
        cs: ConstraintSystemRef<E::Fr>,
    ) -> std::result::Result<(), SynthesisError> {
        let witness = self.witness;
        let mut columns = Vec::with_capacity(self.r1cs.num_variables());
        columns.push(Variable::One);
        for i in 0..self.r1cs.num_public_inputs() {
            columns.push(cs.new_input_variable(|| {
                witness
                    .map(|w| w.public[i])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
        }
        for j in 0..self.r1cs.num_witness {
            columns.push(cs.new_witness_variable(|| {
                witness
                    .map(|w| w.private[j])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        for ((a, b), c) in self.r1cs.a.iter().zip(&self.r1cs.b).zip(&self.r1cs.c) {
            cs.enforce_constraint(row(a, &columns), row(b, &columns), row(c, &columns))?;
        }
        Ok(())
    }
}

fn row<F: Field>(entries: &[(F, usize)], columns: &[Variable]) -> LinearCombination<F> {
    LinearCombination(
        entries
            .iter()
            .map(|(coeff, col)| (*coeff, columns[*col]))
            .collect(),
    )
}
