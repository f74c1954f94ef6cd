use thiserror::Error;

use crate::core::identity::LatticeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    #[error("Degenerate basis: determinant {determinant:e} is within tolerance of zero")]
    DegenerateBasis { determinant: f64 },

    #[error("Incompatible lattices: operands belong to lattice {left} and lattice {right}")]
    IncompatibleLattice { left: LatticeId, right: LatticeId },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No integer solution: {0}")]
    NoSolution(String),

    /// Indicates a violated internal invariant of a reduction loop.
    #[error("Reduction did not converge: {0}")]
    ReductionNonconvergence(String),

    #[error("Integer overflow in {0}")]
    Overflow(&'static str),

    #[error("Point is not on the lattice (distance to nearest node {error:e})")]
    NotOnLattice { error: f64 },

    #[error("Lattices are not coincident (relative error {error:e})")]
    NotCoincident { error: f64 },

    #[error("CSL construction failed: {0}")]
    CslConstruction(String),

    #[error("Lattice {0} does not belong to this bicrystal")]
    ForeignLattice(LatticeId),
}

pub type Result<T> = std::result::Result<T, LatticeError>;
