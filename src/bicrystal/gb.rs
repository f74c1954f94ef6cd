//! A planar boundary between the two grains of a bicrystal.

use crate::bicrystal::bicrystal::{BiCrystal, BiCrystalLattice};
use crate::config::ROUND_TOLERANCE;
use crate::core::vectors::{LatticeVector, ReciprocalLatticeDirection, ReciprocalLatticeVector};
use crate::error::{LatticeError, Result};
use crate::math::int_matrix::RealVector;

/// `x - round(x / y) * y`, the remainder closest to zero.
fn remainder(x: f64, y: f64) -> f64 {
    x - (x / y).round() * y
}

/// Grain boundary with plane normal `n`, given in A* or B*.
///
/// Grain A lies on the side opposite its outward normal `n_A`; grain B on
/// the side opposite `n_B`, which points the other way (`n_B ∥ -n_A`).
#[derive(Debug)]
pub struct Gb<'g, const D: usize> {
    bicrystal: &'g BiCrystal<'g, D>,
    normal_a: ReciprocalLatticeDirection<'g, D>,
    normal_b: ReciprocalLatticeDirection<'g, D>,
    csl_normal: ReciprocalLatticeDirection<'g, D>,
    csl_spacing: f64,
}

impl<'g, const D: usize> Gb<'g, D> {
    pub fn new(bicrystal: &'g BiCrystal<'g, D>, n: &ReciprocalLatticeDirection<'_, D>) -> Result<Self> {
        let (normal_a, normal_b) = match bicrystal.identify(n.lattice())? {
            BiCrystalLattice::A => (
                bicrystal.reciprocal_lattice_direction_in(n, BiCrystalLattice::A)?,
                bicrystal.reciprocal_lattice_direction_in(&n.reversed()?, BiCrystalLattice::B)?,
            ),
            BiCrystalLattice::B => (
                bicrystal.reciprocal_lattice_direction_in(&n.reversed()?, BiCrystalLattice::A)?,
                bicrystal.reciprocal_lattice_direction_in(n, BiCrystalLattice::B)?,
            ),
            other => {
                return Err(LatticeError::InvalidInput(format!(
                    "boundary normal must belong to A* or B*, not {other}*"
                )))
            }
        };
        let csl_normal = bicrystal.reciprocal_lattice_direction_in(&normal_a, BiCrystalLattice::Csl)?;
        let csl_spacing = csl_normal.plane_spacing()?;
        Ok(Self { bicrystal, normal_a, normal_b, csl_normal, csl_spacing })
    }

    pub fn bicrystal(&self) -> &'g BiCrystal<'g, D> {
        self.bicrystal
    }

    pub fn normal_a(&self) -> &ReciprocalLatticeDirection<'g, D> {
        &self.normal_a
    }

    pub fn normal_b(&self) -> &ReciprocalLatticeDirection<'g, D> {
        &self.normal_b
    }

    /// CSL plane normal along `n_A`.
    pub fn csl_normal(&self) -> &ReciprocalLatticeDirection<'g, D> {
        &self.csl_normal
    }

    /// Period `H` of the boundary structure along its normal.
    pub fn csl_plane_spacing(&self) -> f64 {
        self.csl_spacing
    }

    pub fn unit_normal_a(&self) -> RealVector<D> {
        self.normal_a.cartesian().normalize()
    }

    pub fn unit_normal_b(&self) -> RealVector<D> {
        self.normal_b.cartesian().normalize()
    }

    /// Step height, modulo `H`, of a disconnection with Burgers vector `d`
    /// when grain A advances: `(Lambda_A d) · n_A`.
    pub fn step_height_a(&self, d: &LatticeVector<'_, D>) -> Result<f64> {
        let step = self.bicrystal.shift_a(d)?.cartesian().dot(&self.unit_normal_a());
        Ok(remainder(step, self.csl_spacing))
    }

    /// Step height, modulo `H`, when grain B advances: `(Lambda_B d) · n_B`.
    pub fn step_height_b(&self, d: &LatticeVector<'_, D>) -> Result<f64> {
        let step = self.bicrystal.shift_b(d)?.cartesian().dot(&self.unit_normal_b());
        Ok(remainder(step, self.csl_spacing))
    }

    /// CSL vectors spanning the boundary plane.
    pub fn period_vectors(&self, use_rlll: bool) -> Result<Vec<LatticeVector<'g, D>>> {
        let basis = self.bicrystal.csl().plane_parallel_lattice_basis(&self.csl_normal, use_rlll)?;
        Ok(basis.into_iter().skip(1).collect())
    }
}

impl<'g> Gb<'g, 3> {
    /// Shortest CSL vector in the boundary plane perpendicular to `axis`,
    /// which must lie in the plane.
    pub fn period_vector(&self, axis: &ReciprocalLatticeVector<'_, 3>) -> Result<LatticeVector<'g, 3>> {
        let cartesian = axis.cartesian();
        let projection = self.unit_normal_a().dot(&cartesian);
        if projection.abs() > ROUND_TOLERANCE * cartesian.norm().max(1.0) {
            return Err(LatticeError::InvalidInput("axis does not lie in the boundary plane".into()));
        }
        let axis_a = self.bicrystal.a().parallel_reciprocal_lattice_direction(&cartesian)?;
        let along = axis_a.vector().cross(self.normal_a.vector())?.direction()?;
        let in_csl = self.bicrystal.lattice_direction_in(&along, BiCrystalLattice::Csl)?;
        Ok(*in_csl.vector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::Lattice;
    use nalgebra::{Matrix2, Vector2};

    #[test]
    fn remainder_is_centered() {
        assert!((remainder(0.7, 1.0) + 0.3).abs() < 1e-12);
        assert!((remainder(-0.2, 1.0) + 0.2).abs() < 1e-12);
        assert!(remainder(3.0, 1.5).abs() < 1e-12);
    }

    #[test]
    fn normals_point_opposite_ways() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), Matrix2::new(0.6, -0.8, 0.8, 0.6)).unwrap();
        let bc = BiCrystal::new(&a, &b, true).unwrap();
        let n = ReciprocalLatticeDirection::from_coordinates(Vector2::new(2, 1), &a).unwrap();
        let gb = Gb::new(&bc, &n).unwrap();

        assert_eq!(gb.normal_a().coordinates(), &Vector2::new(2, 1));
        assert!((gb.unit_normal_a() + gb.unit_normal_b()).norm() < 1e-9);
        assert!((gb.csl_plane_spacing() - 5f64.sqrt()).abs() < 1e-9);
        let period = gb.period_vectors(true).unwrap();
        assert_eq!(period.len(), 1);
        assert!(period[0].cartesian().dot(&gb.unit_normal_a()).abs() < 1e-9);
    }

    #[test]
    fn csl_normal_is_rejected() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), Matrix2::new(0.6, -0.8, 0.8, 0.6)).unwrap();
        let bc = BiCrystal::new(&a, &b, true).unwrap();
        let n = ReciprocalLatticeDirection::from_coordinates(Vector2::new(1, 0), bc.csl()).unwrap();
        assert!(matches!(Gb::new(&bc, &n), Err(LatticeError::InvalidInput(_))));
    }
}
