use log::debug;
use nalgebra::{DMatrix, DVector, Matrix3};

use crate::config::{
    DEFAULT_LLL_DELTA, DEGENERACY_TOLERANCE, DIRECTION_MAX_DENOMINATOR, ROUND_TOLERANCE,
};
use crate::core::identity::{lattice_ids, IdCounter, LatticeId};
use crate::core::vectors::{
    Direct, IntegerVector, LatticeDirection, LatticeVector, PrimitiveDirection, RationalDirection, Reciprocal,
    ReciprocalLatticeDirection, ReciprocalLatticeVector, Space,
};
use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{
    checked_mul, checked_mul_dyn, real_determinant, real_inverse, round_to_integer, IntMatrix, IntVector,
    RealMatrix, RealVector,
};
use crate::math::integer_basis::plane_parallel_integer_basis;
use crate::math::lll::lll_reduce_gram;
use crate::math::rational_approximation::{best_rational_approximation, rational_direction};
use crate::math::rlll::{rlll_reduce, rlll_reduce_square};

// ============================================================================
// LATTICE
// ============================================================================

/// A lattice in `D` dimensions: the integer combinations of the columns of
/// `basis`.
///
/// The reciprocal basis is `basis^-T` (no factor of 2π), so
/// `basis^T * reciprocal = I` and a direct vector paired with a reciprocal
/// vector always gives an integer. The deformation `F` records how the basis
/// was obtained from a reference basis `A` (`basis = F A`).
///
/// Every lattice gets a fresh [`LatticeId`]; lattices are deliberately not
/// `Clone`, and two lattices are equal only if they are the same lattice.
#[derive(Debug)]
pub struct Lattice<const D: usize> {
    id: LatticeId,
    basis: RealMatrix<D>,
    reciprocal: RealMatrix<D>,
    deformation: RealMatrix<D>,
}

impl<const D: usize> PartialEq for Lattice<D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<const D: usize> Eq for Lattice<D> {}

impl<const D: usize> Lattice<D> {
    pub fn new(basis: RealMatrix<D>) -> Result<Self> {
        Self::with_counter(basis, RealMatrix::<D>::identity(), lattice_ids())
    }

    /// Lattice with basis `deformation * reference`.
    pub fn with_deformation(reference: RealMatrix<D>, deformation: RealMatrix<D>) -> Result<Self> {
        Self::with_counter(reference, deformation, lattice_ids())
    }

    /// Like `with_deformation`, drawing the identity from `counter`. Ids
    /// carry the counter's namespace, so they never collide with ids from
    /// other counters.
    pub fn with_counter(reference: RealMatrix<D>, deformation: RealMatrix<D>, counter: &IdCounter) -> Result<Self> {
        if reference.iter().chain(deformation.iter()).any(|v| !v.is_finite()) {
            return Err(LatticeError::InvalidInput("basis has non-finite entries".into()));
        }
        let basis = deformation * reference;
        let determinant = real_determinant(&basis);
        if !determinant.is_finite() || determinant.abs() < DEGENERACY_TOLERANCE {
            return Err(LatticeError::DegenerateBasis { determinant });
        }
        let reciprocal = real_inverse(&basis)
            .ok_or(LatticeError::DegenerateBasis { determinant })?
            .transpose();
        Ok(Self { id: counter.next_id(), basis, reciprocal, deformation })
    }

    pub fn from_columns(columns: &[RealVector<D>; D]) -> Result<Self> {
        Self::new(RealMatrix::<D>::from_columns(columns))
    }

    pub fn id(&self) -> LatticeId {
        self.id
    }

    pub fn basis(&self) -> &RealMatrix<D> {
        &self.basis
    }

    pub fn reciprocal_basis(&self) -> &RealMatrix<D> {
        &self.reciprocal
    }

    pub fn deformation(&self) -> &RealMatrix<D> {
        &self.deformation
    }

    pub fn volume(&self) -> f64 {
        real_determinant(&self.basis).abs()
    }

    pub fn to_cartesian(&self, fractional: &RealVector<D>) -> RealVector<D> {
        self.basis * fractional
    }

    pub fn to_fractional(&self, cartesian: &RealVector<D>) -> RealVector<D> {
        self.reciprocal.transpose() * cartesian
    }

    fn ensure_owns<S: Space>(&self, v: &IntegerVector<'_, D, S>) -> Result<()> {
        v.ensure_same_lattice(self)
    }

    // ------------------------------------------------------------------------
    // vectors and directions
    // ------------------------------------------------------------------------

    pub fn lattice_vector_from_coordinates(&self, coordinates: IntVector<D>) -> LatticeVector<'_, D> {
        IntegerVector::new(coordinates, self)
    }

    pub fn reciprocal_vector_from_coordinates(&self, coordinates: IntVector<D>) -> ReciprocalLatticeVector<'_, D> {
        IntegerVector::new(coordinates, self)
    }

    fn nearest<S: Space>(&self, point: &RealVector<D>) -> Result<(IntegerVector<'_, D, S>, f64)> {
        let real = S::coordinates(self, point);
        let (rounded, error) = round_to_integer(&real)?;
        Ok((IntegerVector::new(rounded, self), error))
    }

    fn exact<S: Space>(&self, point: &RealVector<D>) -> Result<IntegerVector<'_, D, S>> {
        let (v, error) = self.nearest::<S>(point)?;
        if error > ROUND_TOLERANCE {
            return Err(LatticeError::NotOnLattice { error });
        }
        Ok(v)
    }

    /// The lattice vector nearest to `point` in fractional coordinates.
    pub fn lattice_vector(&self, point: &RealVector<D>) -> Result<LatticeVector<'_, D>> {
        Ok(self.nearest::<Direct>(point)?.0)
    }

    /// Like `lattice_vector` but fails with `NotOnLattice` when `point` is not
    /// a lattice point.
    pub fn try_lattice_vector(&self, point: &RealVector<D>) -> Result<LatticeVector<'_, D>> {
        self.exact::<Direct>(point)
    }

    /// Primitive direction of the lattice vector nearest to `point`.
    pub fn lattice_direction(&self, point: &RealVector<D>) -> Result<LatticeDirection<'_, D>> {
        self.lattice_vector(point)?.direction()
    }

    pub fn reciprocal_lattice_vector(&self, point: &RealVector<D>) -> Result<ReciprocalLatticeVector<'_, D>> {
        Ok(self.nearest::<Reciprocal>(point)?.0)
    }

    pub fn try_reciprocal_lattice_vector(&self, point: &RealVector<D>) -> Result<ReciprocalLatticeVector<'_, D>> {
        self.exact::<Reciprocal>(point)
    }

    pub fn reciprocal_lattice_direction(&self, point: &RealVector<D>) -> Result<ReciprocalLatticeDirection<'_, D>> {
        self.reciprocal_lattice_vector(point)?.direction()
    }

    /// Shortest primitive direction parallel to `v`, which need not be a
    /// lattice vector itself.
    ///
    /// Coordinates are taken in an RLLL-reduced basis, where they are well
    /// conditioned, approximated by a rational direction and mapped back.
    pub fn parallel_lattice_direction(&self, v: &RealVector<D>) -> Result<LatticeDirection<'_, D>> {
        self.parallel_direction::<Direct>(v)
    }

    pub fn parallel_reciprocal_lattice_direction(&self, v: &RealVector<D>) -> Result<ReciprocalLatticeDirection<'_, D>> {
        self.parallel_direction::<Reciprocal>(v)
    }

    fn parallel_direction<S: Space>(&self, v: &RealVector<D>) -> Result<PrimitiveDirection<'_, D, S>> {
        let norm = v.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(LatticeError::InvalidInput("direction must be a finite non-zero vector".into()));
        }
        let (reduced, transform) = rlll_reduce_square(S::basis(self), DEFAULT_LLL_DELTA)?;
        let inverse = real_inverse(&reduced).ok_or(LatticeError::DegenerateBasis { determinant: 0.0 })?;
        let in_reduced = rational_direction(&(inverse * v), DIRECTION_MAX_DENOMINATOR)?;
        let coordinates = checked_mul(&transform, &in_reduced)?;
        let direction = PrimitiveDirection::from_coordinates(coordinates, self)?;

        let cartesian = direction.cartesian();
        let cosine = cartesian.dot(v) / (cartesian.norm() * norm);
        let error = 1.0 - cosine;
        if error > ROUND_TOLERANCE {
            return Err(LatticeError::NotOnLattice { error });
        }
        Ok(direction)
    }

    /// `v` written as a rational multiple of a primitive lattice direction.
    pub fn rational_lattice_direction(&self, v: &RealVector<D>, max_denominator: i64) -> Result<RationalDirection<'_, D, Direct>> {
        self.rational_direction::<Direct>(v, max_denominator)
    }

    pub fn rational_reciprocal_lattice_direction(
        &self,
        v: &RealVector<D>,
        max_denominator: i64,
    ) -> Result<RationalDirection<'_, D, Reciprocal>> {
        self.rational_direction::<Reciprocal>(v, max_denominator)
    }

    fn rational_direction<S: Space>(&self, v: &RealVector<D>, max_denominator: i64) -> Result<RationalDirection<'_, D, S>> {
        let direction = self.parallel_direction::<S>(v)?;
        let scale = best_rational_approximation(v.norm() / direction.cartesian().norm(), max_denominator)?;
        let rational = RationalDirection { direction, scale };
        let error = (rational.cartesian() - v).norm() / v.norm();
        if error > ROUND_TOLERANCE {
            return Err(LatticeError::NotOnLattice { error });
        }
        Ok(rational)
    }

    // ------------------------------------------------------------------------
    // adapted bases
    // ------------------------------------------------------------------------

    /// Columns `w_1 .. w_D` (integer coordinates in space `T`) with
    /// `normal · w_1 = 1` and `normal · w_i = 0` otherwise.
    fn paired_basis<T: Space>(&self, normal: &IntVector<D>, use_rlll: bool) -> Result<IntMatrix<D>> {
        let mut w = plane_parallel_integer_basis(normal)?;
        if !use_rlll || D < 2 {
            return Ok(w);
        }
        let cartesian = T::basis(self) * w.map(|c| c as f64);
        let in_plane = DMatrix::from_fn(D, D - 1, |i, j| cartesian[(i, j + 1)]);
        let reduction = rlll_reduce(&in_plane, DEFAULT_LLL_DELTA)?;
        let plane_coords = DMatrix::from_fn(D, D - 1, |i, j| w[(i, j + 1)]);
        let reduced_coords = checked_mul_dyn(&plane_coords, &reduction.transform)?;

        // pull w_1 towards the plane normal
        let p = &reduction.basis;
        let stacking = DVector::from_iterator(D, cartesian.column(0).iter().cloned());
        let normal_eq = p.transpose() * p;
        let rhs = p.transpose() * stacking;
        let shift = normal_eq
            .lu()
            .solve(&rhs)
            .ok_or(LatticeError::DegenerateBasis { determinant: 0.0 })?;

        for j in 0..D - 1 {
            for i in 0..D {
                w[(i, j + 1)] = reduced_coords[(i, j)];
            }
        }
        for j in 0..D - 1 {
            let c = shift[j].round();
            if c.abs() >= 9.0e15 {
                return Err(LatticeError::Overflow("plane-parallel basis"));
            }
            let c = c as i64;
            for i in 0..D {
                let delta = c.checked_mul(w[(i, j + 1)]).ok_or(LatticeError::Overflow("plane-parallel basis"))?;
                w[(i, 0)] = w[(i, 0)].checked_sub(delta).ok_or(LatticeError::Overflow("plane-parallel basis"))?;
            }
        }
        Ok(w)
    }

    /// Lattice basis adapted to the planes normal to `l`: `b_1 · l = 1` and
    /// `b_i · l = 0` for `i > 1`, so `b_2 .. b_D` span one lattice plane and
    /// `b_1` steps to the next.
    pub fn plane_parallel_lattice_basis(
        &self,
        l: &ReciprocalLatticeDirection<'_, D>,
        use_rlll: bool,
    ) -> Result<Vec<LatticeVector<'_, D>>> {
        self.ensure_owns(l.vector())?;
        let w = self.paired_basis::<Direct>(l.coordinates(), use_rlll)?;
        Ok((0..D).map(|j| IntegerVector::new(w.column(j).into_owned(), self)).collect())
    }

    /// Reciprocal basis adapted to `d`: `r_1 · d = 1` and `r_i · d = 0` for
    /// `i > 1`.
    pub fn direction_orthogonal_reciprocal_basis(
        &self,
        d: &LatticeDirection<'_, D>,
        use_rlll: bool,
    ) -> Result<Vec<ReciprocalLatticeVector<'_, D>>> {
        self.ensure_owns(d.vector())?;
        let w = self.paired_basis::<Reciprocal>(d.coordinates(), use_rlll)?;
        Ok((0..D).map(|j| IntegerVector::new(w.column(j).into_owned(), self)).collect())
    }

    /// Spacing of the lattice planes normal to `r`.
    pub fn interplanar_spacing(&self, r: &ReciprocalLatticeDirection<'_, D>) -> Result<f64> {
        self.ensure_owns(r.vector())?;
        r.plane_spacing()
    }

    // ------------------------------------------------------------------------
    // reduction
    // ------------------------------------------------------------------------

    /// A new lattice with an RLLL-reduced basis spanning the same points,
    /// and the unimodular `U` with `reduced = basis * U`.
    pub fn reduced(&self, delta: f64) -> Result<(Lattice<D>, IntMatrix<D>)> {
        let (basis, transform) = rlll_reduce_square(&self.basis, delta)?;
        Ok((Lattice::new(basis)?, transform))
    }

    /// Gram matrix `S^T S` of the basis of space `S`, when it is integral.
    pub fn integer_metric<S: Space>(&self) -> Option<IntMatrix<D>> {
        let b = S::basis(self);
        let metric = b.transpose() * b;
        match round_to_integer(&metric) {
            Ok((m, error)) if error <= ROUND_TOLERANCE => Some(m),
            _ => None,
        }
    }

    /// LLL-reduces a set of linearly independent vectors of this lattice.
    ///
    /// The exact integral algorithm runs when the metric is integral,
    /// otherwise RLLL on the Cartesian vectors; both return vectors of this
    /// lattice spanning the same sublattice.
    pub fn reduce_lattice_vectors<'s, S: Space>(
        &'s self,
        vectors: &[IntegerVector<'_, D, S>],
        delta: f64,
    ) -> Result<Vec<IntegerVector<'s, D, S>>> {
        for v in vectors {
            self.ensure_owns(v)?;
        }
        let n = vectors.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let coords = DMatrix::from_fn(D, n, |i, j| vectors[j].coordinates()[i]);

        let transform = match self.integer_metric::<S>() {
            Some(metric) => {
                let ratio = best_rational_approximation(delta, 1000)?;
                let metric = DMatrix::from_column_slice(D, D, metric.as_slice());
                let gram = checked_mul_dyn(&checked_mul_dyn(&coords.transpose(), &metric)?, &coords)?;
                debug!("reducing {} vectors with the integral LLL", n);
                lll_reduce_gram(&gram, (ratio.numerator(), ratio.denominator()))?.transform
            }
            None => {
                let cartesian = DMatrix::from_fn(D, n, |i, j| vectors[j].cartesian()[i]);
                debug!("reducing {} vectors with RLLL", n);
                rlll_reduce(&cartesian, delta)?.transform
            }
        };
        let reduced = checked_mul_dyn(&coords, &transform)?;
        Ok((0..n)
            .map(|j| IntegerVector::new(IntVector::<D>::from_iterator(reduced.column(j).iter().cloned()), self))
            .collect())
    }
}

// ============================================================================
// 3D CELL PARAMETERS
// ============================================================================

impl Lattice<3> {
    /// Standard setting: `a` along x, `b` in the xy plane. Angles in degrees.
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        let (alpha_r, beta_r, gamma_r) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());
        let (ca, cb, cg) = (alpha_r.cos(), beta_r.cos(), gamma_r.cos());
        let sg = gamma_r.sin();

        let term = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if term <= 0.0 || sg.abs() < DEGENERACY_TOLERANCE {
            return Err(LatticeError::InvalidInput(format!(
                "cell angles ({alpha}, {beta}, {gamma}) do not describe a cell"
            )));
        }
        let matrix = Matrix3::new(
            a, b * cg, c * cb,
            0.0, b * sg, c * (ca - cb * cg) / sg,
            0.0, 0.0, c * term.sqrt() / sg,
        );
        Self::new(matrix)
    }

    /// `(a, b, c, alpha, beta, gamma)` with angles in degrees.
    pub fn to_parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let m = &self.basis;
        let a = m.column(0).norm();
        let b = m.column(1).norm();
        let c = m.column(2).norm();
        let alpha = (m.column(1).dot(&m.column(2)) / (b * c)).acos().to_degrees();
        let beta = (m.column(0).dot(&m.column(2)) / (a * c)).acos().to_degrees();
        let gamma = (m.column(0).dot(&m.column(1)) / (a * b)).acos().to_degrees();
        (a, b, c, alpha, beta, gamma)
    }
}
