use std::fmt;
use std::marker::PhantomData;

use nalgebra::{SVector, Vector3};

use crate::core::structure::Lattice;
use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{checked_dot, primitive, IntVector, RealMatrix, RealVector, I64_SAFE};
use crate::math::rational::Rational;

// ============================================================================
// SPACES
// ============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Direct {}
    impl Sealed for super::Reciprocal {}
}

/// Marker for the basis integer coordinates refer to.
pub trait Space: sealed::Sealed + Copy + fmt::Debug + PartialEq + 'static {
    /// The space paired with this one by `basis^T reciprocal = I`.
    type Dual: Space<Dual = Self>;
    const NAME: &'static str;

    fn basis<const D: usize>(lattice: &Lattice<D>) -> &RealMatrix<D>;

    /// Real coordinates of a Cartesian point in this space's basis.
    fn coordinates<const D: usize>(lattice: &Lattice<D>, point: &RealVector<D>) -> RealVector<D> {
        Self::Dual::basis(lattice).transpose() * point
    }
}

/// Coordinates in the direct basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direct;

/// Coordinates in the reciprocal basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reciprocal;

impl Space for Direct {
    type Dual = Reciprocal;
    const NAME: &'static str = "direct";

    fn basis<const D: usize>(lattice: &Lattice<D>) -> &RealMatrix<D> {
        lattice.basis()
    }
}

impl Space for Reciprocal {
    type Dual = Direct;
    const NAME: &'static str = "reciprocal";

    fn basis<const D: usize>(lattice: &Lattice<D>) -> &RealMatrix<D> {
        lattice.reciprocal_basis()
    }
}

// ============================================================================
// INTEGER VECTORS
// ============================================================================

/// Integer coordinates bound to the lattice they are expressed in.
///
/// Only operations that keep coordinates integral are exposed. Operands from
/// different lattices are rejected with `IncompatibleLattice`.
pub struct IntegerVector<'a, const D: usize, S: Space> {
    coordinates: IntVector<D>,
    lattice: &'a Lattice<D>,
    space: PhantomData<S>,
}

pub type LatticeVector<'a, const D: usize> = IntegerVector<'a, D, Direct>;
pub type ReciprocalLatticeVector<'a, const D: usize> = IntegerVector<'a, D, Reciprocal>;

impl<'a, const D: usize, S: Space> Clone for IntegerVector<'a, D, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, const D: usize, S: Space> Copy for IntegerVector<'a, D, S> {}

impl<'a, const D: usize, S: Space> PartialEq for IntegerVector<'a, D, S> {
    fn eq(&self, other: &Self) -> bool {
        self.lattice.id() == other.lattice.id() && self.coordinates == other.coordinates
    }
}

impl<'a, const D: usize, S: Space> Eq for IntegerVector<'a, D, S> {}

impl<'a, const D: usize, S: Space> fmt::Debug for IntegerVector<'a, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerVector")
            .field("space", &S::NAME)
            .field("lattice", &self.lattice.id())
            .field("coordinates", &self.coordinates.as_slice())
            .finish()
    }
}

impl<'a, const D: usize, S: Space> fmt::Display for IntegerVector<'a, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if S::NAME == "direct" { ('[', ']') } else { ('(', ')') };
        write!(f, "{open}")?;
        for (i, c) in self.coordinates.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "{close}")
    }
}

fn overflow() -> LatticeError {
    LatticeError::Overflow("lattice vector arithmetic")
}

impl<'a, const D: usize, S: Space> IntegerVector<'a, D, S> {
    pub fn new(coordinates: IntVector<D>, lattice: &'a Lattice<D>) -> Self {
        Self { coordinates, lattice, space: PhantomData }
    }

    pub fn zero(lattice: &'a Lattice<D>) -> Self {
        Self::new(IntVector::<D>::zeros(), lattice)
    }

    pub fn coordinates(&self) -> &IntVector<D> {
        &self.coordinates
    }

    pub fn lattice(&self) -> &'a Lattice<D> {
        self.lattice
    }

    pub fn is_zero(&self) -> bool {
        self.coordinates.iter().all(|c| *c == 0)
    }

    /// Cartesian components, derived on demand.
    pub fn cartesian(&self) -> RealVector<D> {
        S::basis(self.lattice) * self.coordinates.map(|c| c as f64)
    }

    pub fn norm(&self) -> f64 {
        self.cartesian().norm()
    }

    pub(crate) fn ensure_same_lattice(&self, other: &Lattice<D>) -> Result<()> {
        if self.lattice.id() != other.id() {
            return Err(LatticeError::IncompatibleLattice { left: self.lattice.id(), right: other.id() });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.ensure_same_lattice(other.lattice)?;
        let mut out = self.coordinates;
        for i in 0..D {
            out[i] = out[i].checked_add(other.coordinates[i]).ok_or_else(overflow)?;
        }
        Ok(Self::new(out, self.lattice))
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.ensure_same_lattice(other.lattice)?;
        let mut out = self.coordinates;
        for i in 0..D {
            out[i] = out[i].checked_sub(other.coordinates[i]).ok_or_else(overflow)?;
        }
        Ok(Self::new(out, self.lattice))
    }

    pub fn scaled(&self, factor: i64) -> Result<Self> {
        let mut out = self.coordinates;
        for c in out.iter_mut() {
            *c = c.checked_mul(factor).ok_or_else(overflow)?;
        }
        Ok(Self::new(out, self.lattice))
    }

    /// Exact pairing with a vector of the dual space: an integer, because
    /// `basis^T reciprocal = I`.
    pub fn dot(&self, other: &IntegerVector<'_, D, S::Dual>) -> Result<i64> {
        self.ensure_same_lattice(other.lattice())?;
        checked_dot(&self.coordinates, other.coordinates())
    }

    /// Cartesian inner product with a vector of the same space.
    pub fn cartesian_dot(&self, other: &Self) -> Result<f64> {
        self.ensure_same_lattice(other.lattice)?;
        Ok(self.cartesian().dot(&other.cartesian()))
    }

    pub fn checked_neg(&self) -> Result<Self> {
        let mut out = self.coordinates;
        for c in out.iter_mut() {
            *c = c.checked_neg().ok_or_else(overflow)?;
        }
        Ok(Self::new(out, self.lattice))
    }

    /// Primitive representative of this vector's ray.
    pub fn direction(&self) -> Result<PrimitiveDirection<'a, D, S>> {
        PrimitiveDirection::new(*self)
    }
}

impl<'a, S: Space> IntegerVector<'a, 3, S> {
    /// Coordinate cross product, a vector of the dual space normal to both
    /// operands: `(B u) x (B v) = det(B) B^-T (u x v)`.
    pub fn cross(&self, other: &Self) -> Result<IntegerVector<'a, 3, S::Dual>> {
        self.ensure_same_lattice(other.lattice)?;
        let u = self.coordinates.map(|c| c as i128);
        let v = other.coordinates.map(|c| c as i128);
        let w: Vector3<i128> = u.cross(&v);
        let mut out = IntVector::<3>::zeros();
        for i in 0..3 {
            out[i] = i64::try_from(w[i]).map_err(|_| overflow())?;
        }
        Ok(IntegerVector::new(out, self.lattice))
    }
}

impl<'a, const D: usize> IntegerVector<'a, D, Reciprocal> {
    /// Distance between adjacent lattice planes normal to this vector.
    pub fn plane_spacing(&self) -> Result<f64> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(LatticeError::DivisionByZero);
        }
        Ok(1.0 / norm)
    }

    /// Shortest Cartesian vector joining two adjacent planes.
    pub fn interplane_vector(&self) -> Result<RealVector<D>> {
        let r = self.cartesian();
        let n2 = r.norm_squared();
        if n2 == 0.0 {
            return Err(LatticeError::DivisionByZero);
        }
        Ok(r / n2)
    }

    /// Real index `r · p` of the plane through `point`; lattice points lie on
    /// integer indices.
    pub fn plane_index_of_point(&self, point: &RealVector<D>) -> f64 {
        self.cartesian().dot(point)
    }

    pub fn closest_plane_index_of_point(&self, point: &RealVector<D>) -> Result<i64> {
        let index = self.plane_index_of_point(point).round();
        if !index.is_finite() || index.abs() >= I64_SAFE {
            return Err(LatticeError::Overflow("plane index"));
        }
        Ok(index as i64)
    }
}

// ============================================================================
// DIRECTIONS
// ============================================================================

/// A vector whose coordinates have gcd 1.
pub struct PrimitiveDirection<'a, const D: usize, S: Space> {
    vector: IntegerVector<'a, D, S>,
}

pub type LatticeDirection<'a, const D: usize> = PrimitiveDirection<'a, D, Direct>;
pub type ReciprocalLatticeDirection<'a, const D: usize> = PrimitiveDirection<'a, D, Reciprocal>;

impl<'a, const D: usize, S: Space> Clone for PrimitiveDirection<'a, D, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, const D: usize, S: Space> Copy for PrimitiveDirection<'a, D, S> {}

impl<'a, const D: usize, S: Space> PartialEq for PrimitiveDirection<'a, D, S> {
    fn eq(&self, other: &Self) -> bool {
        self.vector == other.vector
    }
}

impl<'a, const D: usize, S: Space> Eq for PrimitiveDirection<'a, D, S> {}

impl<'a, const D: usize, S: Space> fmt::Debug for PrimitiveDirection<'a, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrimitiveDirection").field(&self.vector).finish()
    }
}

impl<'a, const D: usize, S: Space> fmt::Display for PrimitiveDirection<'a, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.vector, f)
    }
}

impl<'a, const D: usize, S: Space> PrimitiveDirection<'a, D, S> {
    /// Divides `vector` by the gcd of its coordinates. The zero vector has no
    /// direction and is rejected.
    pub fn new(vector: IntegerVector<'a, D, S>) -> Result<Self> {
        let (coordinates, _) = primitive(vector.coordinates())
            .ok_or_else(|| LatticeError::InvalidInput("the zero vector has no direction".into()))?;
        Ok(Self { vector: IntegerVector::new(coordinates, vector.lattice()) })
    }

    pub fn from_coordinates(coordinates: IntVector<D>, lattice: &'a Lattice<D>) -> Result<Self> {
        Self::new(IntegerVector::new(coordinates, lattice))
    }

    pub fn vector(&self) -> &IntegerVector<'a, D, S> {
        &self.vector
    }

    pub fn coordinates(&self) -> &IntVector<D> {
        self.vector.coordinates()
    }

    pub fn lattice(&self) -> &'a Lattice<D> {
        self.vector.lattice()
    }

    pub fn cartesian(&self) -> RealVector<D> {
        self.vector.cartesian()
    }

    pub fn reversed(&self) -> Result<Self> {
        Ok(Self { vector: self.vector.checked_neg()? })
    }
}

impl<'a, const D: usize> PrimitiveDirection<'a, D, Reciprocal> {
    /// Spacing of the lattice planes with this normal.
    pub fn plane_spacing(&self) -> Result<f64> {
        self.vector.plane_spacing()
    }
}

/// A primitive direction times a rational length factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RationalDirection<'a, const D: usize, S: Space> {
    pub direction: PrimitiveDirection<'a, D, S>,
    pub scale: Rational,
}

pub type RationalLatticeDirection<'a, const D: usize> = RationalDirection<'a, D, Direct>;
pub type RationalReciprocalLatticeDirection<'a, const D: usize> = RationalDirection<'a, D, Reciprocal>;

impl<'a, const D: usize, S: Space> RationalDirection<'a, D, S> {
    pub fn cartesian(&self) -> RealVector<D> {
        self.direction.cartesian() * self.scale.to_f64()
    }
}

/// Coordinates as a fixed-size vector from a slice of the right length.
pub fn coordinates_from_slice<const D: usize>(values: &[i64]) -> Result<SVector<i64, D>> {
    if values.len() != D {
        return Err(LatticeError::InvalidInput(format!(
            "expected {D} coordinates, got {}",
            values.len()
        )));
    }
    Ok(SVector::<i64, D>::from_column_slice(values))
}
