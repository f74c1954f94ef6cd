// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod bicrystal;
pub mod config;
pub mod core;
pub mod error;
pub mod math;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::bicrystal::bicrystal::{BiCrystal, BiCrystalLattice};
pub use crate::bicrystal::coincidence::{
    coincident_deformations_2d, coincident_rotations_2d, coincident_rotations_about_axis, CoincidentLattice,
};
pub use crate::bicrystal::gb::Gb;
pub use crate::config::SearchConfig;
pub use crate::core::identity::{lattice_ids, IdCounter, LatticeId};
pub use crate::core::structure::Lattice;
pub use crate::core::vectors::{
    Direct, IntegerVector, LatticeDirection, LatticeVector, PrimitiveDirection, RationalLatticeDirection,
    RationalReciprocalLatticeDirection, Reciprocal, ReciprocalLatticeDirection, ReciprocalLatticeVector, Space,
};
pub use crate::error::{LatticeError, Result};
pub use crate::math::rational::Rational;
pub use crate::math::smith::SmithDecomposition;

use crate::math::int_matrix::RealMatrix;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Densest boundary-plane candidates listed in the report.
const REPORT_NORMALS: usize = 5;

fn format_columns<const D: usize>(m: &RealMatrix<D>) -> String {
    m.column_iter()
        .map(|c| {
            let entries: Vec<String> = c.iter().map(|v| format!("{v:.6}")).collect();
            format!("[{}]", entries.join(", "))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the bicrystal of `a` and `b` and summarises it: transition
/// matrix, Smith invariants, sigmas, CSL and DSCL bases and the densest
/// boundary-plane candidates.
pub fn bicrystal_report<const D: usize>(a: &Lattice<D>, b: &Lattice<D>, config: &SearchConfig) -> Result<String> {
    config.validate()?;
    let mut report = String::new();

    // 1. COINCIDENCE PHASE
    let bicrystal = BiCrystal::new(a, b, config.use_rlll)?;
    let transition = bicrystal.transition();
    report.push_str(&format!(
        "--- Bicrystal Report ---\n\
         • Lattices:        A {} | B {}\n\
         • Transition:      A^-1 B = P / {}\n",
        a.id(),
        b.id(),
        transition.mu()
    ));

    // 2. SMITH PHASE
    let smith = bicrystal.smith();
    let invariants: Vec<String> = smith.diagonal().iter().map(|d| d.to_string()).collect();
    report.push_str(&format!(
        "• Smith diagonal:  ({})\n\
         • Index of P:      {}\n\
         • Sigma:           {} (A: {}, B: {})\n",
        invariants.join(", "),
        smith.index()?,
        bicrystal.sigma(),
        bicrystal.sigma_a(),
        bicrystal.sigma_b()
    ));

    // 3. LATTICE PHASE
    report.push_str(&format!(
        "• CSL basis:       {}\n\
         • CSL volume:      {:.6}\n\
         • DSCL basis:      {}\n\
         • DSCL volume:     {:.6}\n",
        format_columns(bicrystal.csl().basis()),
        bicrystal.csl().volume(),
        format_columns(bicrystal.dscl().basis()),
        bicrystal.dscl().volume()
    ));

    // 4. BOUNDARY PHASE
    report.push_str("--- Boundary Plane Candidates ---\n");
    for normal in bicrystal.grain_boundary_normals(config.gb_normal_bound)?.iter().take(REPORT_NORMALS) {
        let in_a = bicrystal.reciprocal_lattice_direction_in(normal, BiCrystalLattice::A)?;
        let in_b = bicrystal.reciprocal_lattice_direction_in(normal, BiCrystalLattice::B)?;
        report.push_str(&format!(
            "• CSL {} | A {} | B {} | spacing {:.6}\n",
            normal,
            in_a,
            in_b,
            normal.plane_spacing()?
        ));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix2;

    #[test]
    fn report_lists_sigma_and_candidates() {
        let a = Lattice::new(Matrix2::identity()).unwrap();
        let b = Lattice::with_deformation(Matrix2::identity(), Matrix2::new(0.6, -0.8, 0.8, 0.6)).unwrap();
        let report = bicrystal_report(&a, &b, &SearchConfig::default()).unwrap();
        assert!(report.contains("Smith diagonal:  (1, 25)"));
        assert!(report.contains("Sigma:           5 (A: 5, B: 5)"));
        assert_eq!(report.lines().filter(|l| l.starts_with("• CSL (")).count(), REPORT_NORMALS);
    }
}
