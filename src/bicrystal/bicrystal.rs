use std::cmp::Ordering;
use std::fmt;

use log::{debug, info};

use crate::config::{
    DEFAULT_LLL_DELTA, MAP_TOLERANCE, MAX_GB_NORMAL_BOUND, RATIONAL_MATRIX_MAX_DENOMINATOR, ROUND_TOLERANCE,
};
use crate::core::structure::Lattice;
use crate::core::vectors::{
    IntegerVector, LatticeDirection, LatticeVector, PrimitiveDirection, ReciprocalLatticeDirection,
    ReciprocalLatticeVector,
};
use crate::error::{LatticeError, Result};
use crate::math::diophantine::solve_two_variables;
use crate::math::int_matrix::{
    adjugate, checked_mul, determinant, round_to_integer, to_real, unimodular_inverse, IntMatrix, IntVector,
    RealMatrix,
};
use crate::math::integer_math::{gcd, gcd_slice};
use crate::math::rational_matrix::RationalMatrix;
use crate::math::rlll::rlll_reduce_square;
use crate::math::smith::SmithDecomposition;

/// The four lattices a bicrystal relates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiCrystalLattice {
    A,
    B,
    Csl,
    Dscl,
}

impl BiCrystalLattice {
    pub const ALL: [BiCrystalLattice; 4] = [Self::A, Self::B, Self::Csl, Self::Dscl];

    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Csl => 2,
            Self::Dscl => 3,
        }
    }
}

impl fmt::Display for BiCrystalLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::B => "B",
            Self::Csl => "CSL",
            Self::Dscl => "DSCL",
        };
        f.write_str(name)
    }
}

// ============================================================================
// INTEGER CHANGE OF BASIS
// ============================================================================

/// Integer matrix with its adjugate and determinant, so that
/// `matrix^-1 = adjugate / determinant`.
#[derive(Debug, Clone, PartialEq)]
struct IntegerMap<const D: usize> {
    matrix: IntMatrix<D>,
    adjugate: IntMatrix<D>,
    determinant: i64,
}

impl<const D: usize> IntegerMap<D> {
    /// Rounds a real change of basis that must be integral.
    fn from_real(m: &RealMatrix<D>, what: &str) -> Result<Self> {
        let (matrix, error) = round_to_integer(m)?;
        if error > MAP_TOLERANCE {
            return Err(LatticeError::CslConstruction(format!(
                "{what} is not an integer matrix (error {error:e})"
            )));
        }
        let determinant = determinant(&matrix)?;
        if determinant == 0 {
            return Err(LatticeError::CslConstruction(format!("{what} is singular")));
        }
        Ok(Self { adjugate: adjugate(&matrix)?, matrix, determinant })
    }

    /// `matrix^-1 x`, which must be integral.
    fn solve(&self, x: &IntVector<D>) -> Result<IntVector<D>> {
        let scaled = checked_mul(&self.adjugate, x)?;
        let mut out = IntVector::<D>::zeros();
        let overflow = || LatticeError::Overflow("integer change of basis");
        for i in 0..D {
            let remainder = scaled[i].checked_rem(self.determinant).ok_or_else(overflow)?;
            if remainder != 0 {
                let error = (scaled[i] as f64 / self.determinant as f64).fract().abs();
                return Err(LatticeError::NotOnLattice { error });
            }
            out[i] = scaled[i].checked_div(self.determinant).ok_or_else(overflow)?;
        }
        Ok(out)
    }

    /// A positive multiple of `matrix^-1 x`.
    fn solve_ray(&self, x: &IntVector<D>) -> Result<IntVector<D>> {
        let mut scaled = checked_mul(&self.adjugate, x)?;
        if self.determinant < 0 {
            for c in scaled.iter_mut() {
                *c = c.checked_neg().ok_or(LatticeError::Overflow("integer change of basis"))?;
            }
        }
        Ok(scaled)
    }

    fn transposed(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
            adjugate: self.adjugate.transpose(),
            determinant: self.determinant,
        }
    }
}

/// Mean of two real bases that must describe the same lattice.
fn coincident_mean<const D: usize>(x: &RealMatrix<D>, y: &RealMatrix<D>) -> Result<RealMatrix<D>> {
    let error = (x - y).norm() / x.norm().max(y.norm());
    if !error.is_finite() || error > MAP_TOLERANCE {
        return Err(LatticeError::NotCoincident { error });
    }
    Ok((x + y) * 0.5)
}

fn diagonal_inverse<const D: usize>(m: &IntMatrix<D>) -> RealMatrix<D> {
    RealMatrix::<D>::from_diagonal(&m.diagonal().map(|v| 1.0 / v as f64))
}

// ============================================================================
// BICRYSTAL
// ============================================================================

/// Two lattices `A` and `B` with rational transition matrix
/// `T = A^-1 B = P / mu`, their coincidence-site lattice (CSL) and their
/// displacement-shift-complete lattice (DSCL).
///
/// With the Smith decomposition `P = X D Y` (`X = U^-1`, `Y = V^-1`) the
/// bases `A X` and `B V` are parallel column by column:
/// `mu B V = A X D`. Setting `M = diag(d_i / gcd(mu, d_i))` and
/// `N = diag(mu / gcd(mu, d_i))` gives
///
/// * CSL basis `A X M = B V N`
/// * DSCL basis `A X N^-1 = B V M^-1`
///
/// `sigma_A = det M` and `sigma_B = det N` are the volume ratios of the CSL
/// to `A` and to `B`. Everything is computed and checked at construction;
/// queries are pure.
#[derive(Debug)]
pub struct BiCrystal<'a, const D: usize> {
    a: &'a Lattice<D>,
    b: &'a Lattice<D>,
    transition: RationalMatrix<D>,
    smith: SmithDecomposition<D>,
    m: IntMatrix<D>,
    n: IntMatrix<D>,
    sigma_a: i64,
    sigma_b: i64,
    sigma: i64,
    csl: Lattice<D>,
    dscl: Lattice<D>,
    parallel_a: RealMatrix<D>,
    parallel_b: RealMatrix<D>,
    lambda_a: IntMatrix<D>,
    lambda_b: IntMatrix<D>,
    /// `dscl^-1 S` for each lattice `S`, indexed by `BiCrystalLattice`.
    to_dscl: [IntegerMap<D>; 4],
    /// `S^-1 csl` for each lattice `S`.
    csl_in: [IntegerMap<D>; 4],
}

impl<'a, const D: usize> BiCrystal<'a, D> {
    /// Builds the bicrystal of `a` and `b`. With `use_rlll` the CSL and DSCL
    /// bases are RLLL-reduced.
    ///
    /// Fails with `NotCoincident` when `A^-1 B` is not rational with
    /// denominators up to `RATIONAL_MATRIX_MAX_DENOMINATOR`.
    pub fn new(a: &'a Lattice<D>, b: &'a Lattice<D>, use_rlll: bool) -> Result<Self> {
        Self::with_max_denominator(a, b, use_rlll, RATIONAL_MATRIX_MAX_DENOMINATOR)
    }

    pub fn with_max_denominator(
        a: &'a Lattice<D>,
        b: &'a Lattice<D>,
        use_rlll: bool,
        max_denominator: i64,
    ) -> Result<Self> {
        let real_transition = a.reciprocal_basis().transpose() * b.basis();
        let (transition, error) = RationalMatrix::approximate(&real_transition, max_denominator)?;
        if error > ROUND_TOLERANCE {
            return Err(LatticeError::NotCoincident { error });
        }
        let mu = transition.mu();
        let smith = SmithDecomposition::new(transition.integer_matrix())?;
        debug!("transition {} / {}, invariants {}", transition.integer_matrix(), mu, smith.diagonal().transpose());

        let diagonal = smith.diagonal();
        let mut m = IntMatrix::<D>::zeros();
        let mut n = IntMatrix::<D>::zeros();
        for i in 0..D {
            let d = diagonal[i];
            if d == 0 {
                return Err(LatticeError::CslConstruction("transition matrix is singular".into()));
            }
            let g = gcd(mu, d);
            m[(i, i)] = d / g;
            n[(i, i)] = mu / g;
        }
        let sigma_a = determinant(&m)?;
        let sigma_b = determinant(&n)?;
        let sigma = if sigma_a.abs() == sigma_b.abs() { sigma_a.abs() } else { 0 };

        let parallel_a = a.basis() * to_real(smith.matrix_x());
        let parallel_b = b.basis() * to_real(smith.matrix_v());
        let csl_basis = coincident_mean(&(parallel_a * to_real(&m)), &(parallel_b * to_real(&n)))?;
        let dscl_basis = coincident_mean(&(parallel_a * diagonal_inverse(&n)), &(parallel_b * diagonal_inverse(&m)))?;

        let identity = IntMatrix::<D>::identity();
        let (csl_basis, _) = if use_rlll {
            rlll_reduce_square(&csl_basis, DEFAULT_LLL_DELTA)?
        } else {
            (csl_basis, identity)
        };
        let (dscl_basis, w) = if use_rlll {
            rlll_reduce_square(&dscl_basis, DEFAULT_LLL_DELTA)?
        } else {
            (dscl_basis, identity)
        };
        let csl = Lattice::new(csl_basis)?;
        let dscl = Lattice::new(dscl_basis)?;

        // Shift tensors in the unreduced DSCL frame: N x - M y = -1 per axis.
        let mut lambda_a0 = IntMatrix::<D>::zeros();
        let mut lambda_b0 = IntMatrix::<D>::zeros();
        for i in 0..D {
            let solution = solve_two_variables(n[(i, i)], -m[(i, i)], -1)?;
            lambda_a0[(i, i)] = m[(i, i)]
                .checked_mul(solution.y)
                .ok_or(LatticeError::Overflow("shift tensor"))?;
            lambda_b0[(i, i)] = n[(i, i)]
                .checked_mul(-solution.x)
                .ok_or(LatticeError::Overflow("shift tensor"))?;
        }
        let w_inverse = unimodular_inverse(&w)?;
        let lambda_a = checked_mul(&checked_mul(&w_inverse, &lambda_a0)?, &w)?;
        let lambda_b = checked_mul(&checked_mul(&w_inverse, &lambda_b0)?, &w)?;

        let dscl_inverse = dscl.reciprocal_basis().transpose();
        let to_dscl = [
            IntegerMap::from_real(&(dscl_inverse * a.basis()), "A in DSCL coordinates")?,
            IntegerMap::from_real(&(dscl_inverse * b.basis()), "B in DSCL coordinates")?,
            IntegerMap::from_real(&(dscl_inverse * csl.basis()), "CSL in DSCL coordinates")?,
            IntegerMap::from_real(&(dscl_inverse * dscl.basis()), "DSCL in DSCL coordinates")?,
        ];
        let csl_in = [
            IntegerMap::from_real(&(a.reciprocal_basis().transpose() * csl.basis()), "CSL in A coordinates")?,
            IntegerMap::from_real(&(b.reciprocal_basis().transpose() * csl.basis()), "CSL in B coordinates")?,
            IntegerMap::from_real(&(csl.reciprocal_basis().transpose() * csl.basis()), "CSL in CSL coordinates")?,
            IntegerMap::from_real(&(dscl_inverse * csl.basis()), "CSL in DSCL coordinates")?,
        ];

        let bicrystal = Self {
            a,
            b,
            transition,
            smith,
            m,
            n,
            sigma_a,
            sigma_b,
            sigma,
            csl,
            dscl,
            parallel_a,
            parallel_b,
            lambda_a,
            lambda_b,
            to_dscl,
            csl_in,
        };
        bicrystal.verify()?;
        info!(
            "bicrystal {} | {}: sigma_A = {}, sigma_B = {}, sigma = {}",
            a.id(),
            b.id(),
            sigma_a,
            sigma_b,
            sigma
        );
        Ok(bicrystal)
    }

    /// Volume ratios against the integer maps, and the shift tensors against
    /// the lattices they map into.
    fn verify(&self) -> Result<()> {
        let volume_a = self.to_dscl[BiCrystalLattice::A.index()].determinant.abs();
        let volume_b = self.to_dscl[BiCrystalLattice::B.index()].determinant.abs();
        let volume_csl = self.to_dscl[BiCrystalLattice::Csl.index()].determinant.abs();
        let ratio_a = self.csl_in[BiCrystalLattice::A.index()].determinant.abs();
        let ratio_b = self.csl_in[BiCrystalLattice::B.index()].determinant.abs();
        if ratio_a != self.sigma_a.abs() || ratio_b != self.sigma_b.abs() {
            return Err(LatticeError::CslConstruction(format!(
                "CSL index mismatch: {ratio_a} in A, {ratio_b} in B, expected {} and {}",
                self.sigma_a, self.sigma_b
            )));
        }
        if volume_csl != volume_a.saturating_mul(ratio_a) || volume_csl != volume_b.saturating_mul(ratio_b) {
            return Err(LatticeError::CslConstruction("inconsistent DSCL volumes".into()));
        }

        if self.lambda_a + self.lambda_b != IntMatrix::<D>::identity() {
            return Err(LatticeError::CslConstruction("shift tensors do not sum to the identity".into()));
        }
        for j in 0..D {
            let column_a: IntVector<D> = self.lambda_a.column(j).into_owned();
            let column_b: IntVector<D> = self.lambda_b.column(j).into_owned();
            self.to_dscl[BiCrystalLattice::B.index()]
                .solve(&column_a)
                .map_err(|_| LatticeError::CslConstruction("Lambda_A does not map the DSCL into B".into()))?;
            self.to_dscl[BiCrystalLattice::A.index()]
                .solve(&column_b)
                .map_err(|_| LatticeError::CslConstruction("Lambda_B does not map the DSCL into A".into()))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------------

    pub fn a(&self) -> &'a Lattice<D> {
        self.a
    }

    pub fn b(&self) -> &'a Lattice<D> {
        self.b
    }

    pub fn csl(&self) -> &Lattice<D> {
        &self.csl
    }

    pub fn dscl(&self) -> &Lattice<D> {
        &self.dscl
    }

    pub fn lattice(&self, which: BiCrystalLattice) -> &Lattice<D> {
        match which {
            BiCrystalLattice::A => self.a,
            BiCrystalLattice::B => self.b,
            BiCrystalLattice::Csl => &self.csl,
            BiCrystalLattice::Dscl => &self.dscl,
        }
    }

    /// Which of the four lattices `lattice` is. A bicrystal of a lattice
    /// with itself reports `A`.
    pub fn identify(&self, lattice: &Lattice<D>) -> Result<BiCrystalLattice> {
        BiCrystalLattice::ALL
            .into_iter()
            .find(|which| self.lattice(*which).id() == lattice.id())
            .ok_or(LatticeError::ForeignLattice(lattice.id()))
    }

    /// `A^-1 B` as `P / mu`.
    pub fn transition(&self) -> &RationalMatrix<D> {
        &self.transition
    }

    pub fn smith(&self) -> &SmithDecomposition<D> {
        &self.smith
    }

    pub fn matrix_m(&self) -> &IntMatrix<D> {
        &self.m
    }

    pub fn matrix_n(&self) -> &IntMatrix<D> {
        &self.n
    }

    pub fn sigma_a(&self) -> i64 {
        self.sigma_a
    }

    pub fn sigma_b(&self) -> i64 {
        self.sigma_b
    }

    /// Common CSL index, or 0 when `|sigma_A| != |sigma_B|` (A and B of
    /// different volume).
    pub fn sigma(&self) -> i64 {
        self.sigma
    }

    /// `A X`, whose columns are parallel to those of `B V`.
    pub fn parallel_basis_a(&self) -> &RealMatrix<D> {
        &self.parallel_a
    }

    /// `B V`
    pub fn parallel_basis_b(&self) -> &RealMatrix<D> {
        &self.parallel_b
    }

    /// `Lambda_A` in DSCL coordinates: maps DSCL vectors into B, and
    /// `Lambda_A + Lambda_B = I`.
    pub fn shift_tensor_a(&self) -> &IntMatrix<D> {
        &self.lambda_a
    }

    /// `Lambda_B` in DSCL coordinates: maps DSCL vectors into A.
    pub fn shift_tensor_b(&self) -> &IntMatrix<D> {
        &self.lambda_b
    }

    // ------------------------------------------------------------------------
    // conversions
    // ------------------------------------------------------------------------

    /// Expresses a vector of any of the four lattices in `target`. Fails
    /// with `NotOnLattice` when the point is not a `target` lattice point.
    pub fn lattice_vector_in(&self, v: &LatticeVector<'_, D>, target: BiCrystalLattice) -> Result<LatticeVector<'_, D>> {
        let source = self.identify(v.lattice())?;
        let in_dscl = checked_mul(&self.to_dscl[source.index()].matrix, v.coordinates())?;
        let coordinates = self.to_dscl[target.index()].solve(&in_dscl)?;
        Ok(IntegerVector::new(coordinates, self.lattice(target)))
    }

    /// The `target` direction along `d`. Always exists, since every pair of
    /// the four lattices shares a full-rank sublattice.
    pub fn lattice_direction_in(
        &self,
        d: &LatticeDirection<'_, D>,
        target: BiCrystalLattice,
    ) -> Result<LatticeDirection<'_, D>> {
        let source = self.identify(d.lattice())?;
        let in_dscl = checked_mul(&self.to_dscl[source.index()].matrix, d.coordinates())?;
        let ray = self.to_dscl[target.index()].solve_ray(&in_dscl)?;
        PrimitiveDirection::from_coordinates(ray, self.lattice(target))
    }

    pub fn reciprocal_lattice_vector_in(
        &self,
        r: &ReciprocalLatticeVector<'_, D>,
        target: BiCrystalLattice,
    ) -> Result<ReciprocalLatticeVector<'_, D>> {
        let source = self.identify(r.lattice())?;
        let in_csl = checked_mul(&self.csl_in[source.index()].matrix.transpose(), r.coordinates())?;
        let coordinates = self.csl_in[target.index()].transposed().solve(&in_csl)?;
        Ok(IntegerVector::new(coordinates, self.lattice(target)))
    }

    pub fn reciprocal_lattice_direction_in(
        &self,
        r: &ReciprocalLatticeDirection<'_, D>,
        target: BiCrystalLattice,
    ) -> Result<ReciprocalLatticeDirection<'_, D>> {
        let source = self.identify(r.lattice())?;
        let in_csl = checked_mul(&self.csl_in[source.index()].matrix.transpose(), r.coordinates())?;
        let ray = self.csl_in[target.index()].transposed().solve_ray(&in_csl)?;
        PrimitiveDirection::from_coordinates(ray, self.lattice(target))
    }

    /// `Lambda_A d` for a vector `d` of any of the four lattices, as a
    /// vector of B.
    pub fn shift_a(&self, d: &LatticeVector<'_, D>) -> Result<LatticeVector<'_, D>> {
        self.apply_shift(&self.lambda_a, d, BiCrystalLattice::B)
    }

    /// `Lambda_B d`, as a vector of A.
    pub fn shift_b(&self, d: &LatticeVector<'_, D>) -> Result<LatticeVector<'_, D>> {
        self.apply_shift(&self.lambda_b, d, BiCrystalLattice::A)
    }

    fn apply_shift(
        &self,
        lambda: &IntMatrix<D>,
        d: &LatticeVector<'_, D>,
        target: BiCrystalLattice,
    ) -> Result<LatticeVector<'_, D>> {
        let source = self.identify(d.lattice())?;
        let in_dscl = checked_mul(&self.to_dscl[source.index()].matrix, d.coordinates())?;
        let shifted = checked_mul(lambda, &in_dscl)?;
        let coordinates = self.to_dscl[target.index()].solve(&shifted)?;
        Ok(IntegerVector::new(coordinates, self.lattice(target)))
    }

    // ------------------------------------------------------------------------
    // boundary planes
    // ------------------------------------------------------------------------

    /// Candidate boundary-plane normals: primitive CSL reciprocal directions
    /// with Miller indices in `[-bound, bound]`, one per plane family (first
    /// non-zero index positive), densest CSL planes (largest spacing) first.
    ///
    /// Every CSL plane is a lattice plane of both A and B.
    pub fn grain_boundary_normals(&self, bound: i64) -> Result<Vec<ReciprocalLatticeDirection<'_, D>>> {
        if !(1..=MAX_GB_NORMAL_BOUND).contains(&bound) {
            return Err(LatticeError::InvalidInput(format!(
                "normal bound must lie in 1..={MAX_GB_NORMAL_BOUND}, got {bound}"
            )));
        }
        let overflow = || LatticeError::Overflow("normal enumeration");
        let side = bound.checked_mul(2).and_then(|s| s.checked_add(1)).ok_or_else(overflow)?;
        let count = (0..D).try_fold(1i64, |acc, _| acc.checked_mul(side)).ok_or_else(overflow)?;

        let mut normals = Vec::new();
        for k in 0..count {
            let mut rest = k;
            let mut coordinates = IntVector::<D>::zeros();
            for i in 0..D {
                coordinates[i] = rest % side - bound;
                rest /= side;
            }
            let canonical = coordinates.iter().find(|c| **c != 0).is_some_and(|c| *c > 0);
            if !canonical || gcd_slice(coordinates.as_slice()) != 1 {
                continue;
            }
            let direction = PrimitiveDirection::from_coordinates(coordinates, &self.csl)?;
            let spacing = direction.plane_spacing()?;
            normals.push((spacing, direction));
        }
        normals.sort_by(|(s1, d1), (s2, d2)| {
            s2.partial_cmp(s1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| d1.coordinates().as_slice().cmp(d2.coordinates().as_slice()))
        });
        Ok(normals.into_iter().map(|(_, d)| d).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2, Matrix3, Vector2};

    fn sigma5_rotation() -> Matrix2<f64> {
        Matrix2::new(0.6, -0.8, 0.8, 0.6)
    }

    #[test]
    fn integer_map_solves_exactly_or_refuses() {
        let map = IntegerMap::from_real(&Matrix2::new(2.0, 0.0, 0.0, 3.0), "test").unwrap();
        assert_eq!(map.solve(&Vector2::new(4, 9)).unwrap(), Vector2::new(2, 3));
        assert!(matches!(map.solve(&Vector2::new(1, 0)), Err(LatticeError::NotOnLattice { .. })));
        assert_eq!(map.solve_ray(&Vector2::new(1, 0)).unwrap(), Vector2::new(3, 0));
    }

    #[test]
    fn integer_map_reports_overflow_instead_of_panicking() {
        let flip = IntegerMap::from_real(&Matrix2::new(-1.0, 0.0, 0.0, 1.0), "flip").unwrap();
        assert_eq!(flip.determinant, -1);
        assert!(matches!(flip.solve(&Vector2::new(i64::MIN, 0)), Err(LatticeError::Overflow(_))));
        assert!(matches!(flip.solve_ray(&Vector2::new(i64::MIN, 0)), Err(LatticeError::Overflow(_))));
        assert_eq!(flip.solve_ray(&Vector2::new(2, 3)).unwrap(), Vector2::new(-2, 3));
    }

    #[test]
    fn sigma5_square_bicrystal() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), sigma5_rotation()).unwrap();
        let bc = BiCrystal::new(&a, &b, true).unwrap();

        assert_eq!(bc.smith().diagonal(), Vector2::new(1, 25));
        assert_eq!(*bc.matrix_m(), Matrix2::new(1, 0, 0, 5));
        assert_eq!(*bc.matrix_n(), Matrix2::new(5, 0, 0, 1));
        assert_eq!((bc.sigma_a(), bc.sigma_b(), bc.sigma()), (5, 5, 5));
        assert!((bc.csl().volume() - 5.0).abs() < 1e-9);
        assert!((bc.dscl().volume() - 0.2).abs() < 1e-9);
        assert_eq!(bc.shift_tensor_a() + bc.shift_tensor_b(), Matrix2::identity());
    }

    #[test]
    fn identify_tells_the_lattices_apart() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), sigma5_rotation()).unwrap();
        let other = Lattice::new(Matrix2::identity()).unwrap();
        let bc = BiCrystal::new(&a, &b, false).unwrap();
        for which in BiCrystalLattice::ALL {
            assert_eq!(bc.identify(bc.lattice(which)).unwrap(), which);
        }
        assert_eq!(bc.identify(&other), Err(LatticeError::ForeignLattice(other.id())));
    }

    #[test]
    fn irrational_transition_is_not_coincident() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let angle: f64 = 0.1234;
        let rotation = Matrix2::new(angle.cos(), -angle.sin(), angle.sin(), angle.cos());
        let b = Lattice::with_deformation(Matrix2::identity(), rotation).unwrap();
        assert!(matches!(
            BiCrystal::with_max_denominator(&a, &b, false, 50),
            Err(LatticeError::NotCoincident { .. })
        ));
    }

    #[test]
    fn cubic_twist_about_001() {
        let a = Lattice::new(Matrix3::identity()).unwrap();
        let rotation = Matrix3::new(0.6, -0.8, 0.0, 0.8, 0.6, 0.0, 0.0, 0.0, 1.0);
        let b = Lattice::with_deformation(Matrix3::identity(), rotation).unwrap();
        let bc = BiCrystal::new(&a, &b, true).unwrap();
        assert_eq!(bc.smith().diagonal(), nalgebra::Vector3::new(1, 5, 25));
        assert_eq!(bc.sigma(), 5);
    }

    #[test]
    fn normals_are_sorted_by_spacing() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), sigma5_rotation()).unwrap();
        let bc = BiCrystal::new(&a, &b, true).unwrap();
        let normals = bc.grain_boundary_normals(2).unwrap();
        assert!(!normals.is_empty());
        let spacings: Vec<f64> = normals.iter().map(|n| n.plane_spacing().unwrap()).collect();
        assert!(spacings.windows(2).all(|w| w[0] >= w[1]));
        assert!((spacings[0] - 5f64.sqrt()).abs() < 1e-9);
        assert!(bc.grain_boundary_normals(0).is_err());
        assert!(bc.grain_boundary_normals(MAX_GB_NORMAL_BOUND).is_ok());
        assert!(matches!(
            bc.grain_boundary_normals(MAX_GB_NORMAL_BOUND + 1),
            Err(LatticeError::InvalidInput(_))
        ));
        assert!(bc.grain_boundary_normals(i64::MAX).is_err());
    }
}
