//! Searches for lattices that share a coincidence-site lattice with a given
//! reference lattice.
//!
//! Candidates come from primitive pairs `(p, q)` of the Farey sequence: a
//! lattice vector `q_2 = p b_1 + q b_2` whose length is a rational multiple
//! of `|b_1|` fixes a rotation (or, with strain, a deformation) bringing
//! `b_1` onto `q_2`. Each candidate is then checked by building the
//! bicrystal, which also yields its sigma.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use nalgebra::{Rotation2, Rotation3, Unit, Vector2};

use crate::bicrystal::bicrystal::BiCrystal;
use crate::config::{SearchConfig, ANGLE_KEY_SCALE, COINCIDENCE_EPSILON};
use crate::core::structure::Lattice;
use crate::core::vectors::ReciprocalLatticeDirection;
use crate::error::Result;
use crate::math::int_matrix::{real_determinant, RealMatrix};
use crate::math::rational_approximation::{best_rational_approximation, farey, rational_approximations};

/// A lattice `B = F A` coincident with the reference lattice `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoincidentLattice<const D: usize> {
    pub deformation: RealMatrix<D>,
    /// Rotation angle in radians, for pure rotations.
    pub angle: Option<f64>,
    pub sigma_a: i64,
    pub sigma_b: i64,
    pub sigma: i64,
}

/// Builds the bicrystal of `a` and `F a`; candidates that fail are logged
/// and dropped.
fn verify<const D: usize>(
    a: &Lattice<D>,
    deformation: RealMatrix<D>,
    angle: Option<f64>,
    config: &SearchConfig,
) -> Result<Option<CoincidentLattice<D>>> {
    let b = Lattice::with_deformation(*a.basis(), deformation)?;
    match BiCrystal::with_max_denominator(a, &b, config.use_rlll, config.verification_denominator()) {
        Ok(bicrystal) => Ok(Some(CoincidentLattice {
            deformation,
            angle,
            sigma_a: bicrystal.sigma_a(),
            sigma_b: bicrystal.sigma_b(),
            sigma: bicrystal.sigma(),
        })),
        Err(error) => {
            warn!("rejected candidate (angle {:?}): {}", angle, error);
            Ok(None)
        }
    }
}

/// Whether `ratio` has a rational approximation within `COINCIDENCE_EPSILON`.
fn is_rational(ratio: f64, max_denominator: i64) -> Result<bool> {
    let approximation = best_rational_approximation(ratio, max_denominator)?;
    Ok((ratio - approximation.to_f64()).abs() <= COINCIDENCE_EPSILON)
}

/// Verifies candidate rotations in increasing angle order until
/// `max_configurations` are accepted.
fn collect_rotations<const D: usize>(
    a: &Lattice<D>,
    angles: BTreeMap<i64, f64>,
    rotation: impl Fn(f64) -> RealMatrix<D>,
    config: &SearchConfig,
) -> Result<Vec<CoincidentLattice<D>>> {
    let mut output = Vec::new();
    for theta in angles.into_values() {
        if output.len() == config.max_configurations {
            break;
        }
        if let Some(found) = verify(a, rotation(theta), Some(theta), config)? {
            debug!("coincident rotation {:.6} rad, sigma {}", theta, found.sigma);
            output.push(found);
        }
    }
    info!("{} coincident rotations", output.len());
    Ok(output)
}

/// Rotations of a 2D lattice onto itself up to a coincidence, sorted by
/// signed angle in `(-pi, pi]`.
pub fn coincident_rotations_2d(a: &Lattice<2>, config: &SearchConfig) -> Result<Vec<CoincidentLattice<2>>> {
    config.validate()?;
    let b1 = a.basis().column(0).into_owned();
    let mut angles = BTreeMap::new();
    for (p, q) in farey(config.enumeration_bound, false)? {
        let q2 = a.lattice_vector_from_coordinates(Vector2::new(p, q)).cartesian();
        if q2.norm() < COINCIDENCE_EPSILON || !is_rational(q2.norm() / b1.norm(), config.max_denominator)? {
            continue;
        }
        let theta = (b1.x * q2.y - b1.y * q2.x).atan2(b1.dot(&q2));
        angles.entry((theta * ANGLE_KEY_SCALE).round() as i64).or_insert(theta);
    }
    collect_rotations(a, angles, |theta| Rotation2::new(theta).into_inner(), config)
}

/// Rotations about the normal of the lattice planes `axis` that bring the
/// lattice into coincidence with itself, sorted by signed angle.
pub fn coincident_rotations_about_axis(
    a: &Lattice<3>,
    axis: &ReciprocalLatticeDirection<'_, 3>,
    config: &SearchConfig,
) -> Result<Vec<CoincidentLattice<3>>> {
    config.validate()?;
    let basis = a.plane_parallel_lattice_basis(axis, true)?;
    let b1 = basis[1].cartesian();
    let b2 = basis[2].cartesian();
    let unit = Unit::new_normalize(axis.cartesian());

    let mut angles = BTreeMap::new();
    for (p, q) in farey(config.enumeration_bound, false)? {
        let q2 = b1 * p as f64 + b2 * q as f64;
        if q2.norm() < COINCIDENCE_EPSILON || !is_rational(q2.norm() / b1.norm(), config.max_denominator)? {
            continue;
        }
        let theta = unit.dot(&b1.cross(&q2)).atan2(b1.dot(&q2));
        angles.entry((theta * ANGLE_KEY_SCALE).round() as i64).or_insert(theta);
    }
    collect_rotations(a, angles, |theta| Rotation3::from_axis_angle(&unit, theta).into_inner(), config)
}

/// Deformations `F` with `F a_1 = q_2 / alpha`, `F a_2 = r_2 / beta` for
/// lattice vectors `q_2`, `r_2` and rationals `alpha`, `beta`, keeping the
/// three Green-Lagrange-type strains
///
/// * `s_1 = (|F a_1|^2 - |a_1|^2) / |a_1|^2`
/// * `s_2 = (|F a_2|^2 - |a_2|^2) / |a_2|^2`
/// * `s_3 = (F a_1 · F a_2 - a_1 · a_2) / (|a_1| |a_2|)`
///
/// within `max_strain`. Orientation-reversing candidates are skipped. With
/// `max_strain = 0` this is the rotation search.
pub fn coincident_deformations_2d(a: &Lattice<2>, config: &SearchConfig) -> Result<Vec<CoincidentLattice<2>>> {
    config.validate()?;
    if config.max_strain < COINCIDENCE_EPSILON {
        return coincident_rotations_2d(a, config);
    }
    let a1 = a.basis().column(0).into_owned();
    let a2 = a.basis().column(1).into_owned();
    let a1_star = a.reciprocal_basis().column(0).into_owned();
    let a2_star = a.reciprocal_basis().column(1).into_owned();
    let pairs = farey(config.enumeration_bound, false)?;
    let max_strain = config.max_strain;

    let mut output = Vec::new();
    for &(p1, q1) in &pairs {
        let q2 = a.lattice_vector_from_coordinates(Vector2::new(p1, q1)).cartesian();
        let ratio = q2.norm() / a1.norm();
        for alpha in rational_approximations(ratio, config.max_denominator, ratio * max_strain)? {
            if alpha.is_zero() {
                continue;
            }
            let q2_by_alpha = q2 / alpha.to_f64();
            let s1 = (q2_by_alpha.norm_squared() - a1.norm_squared()) / a1.norm_squared();
            if s1.abs() > max_strain {
                continue;
            }
            for &(p2, q2_index) in &pairs {
                let r2 = a.lattice_vector_from_coordinates(Vector2::new(p2, q2_index)).cartesian();
                let ratio2 = r2.norm() / a2.norm();
                for beta in rational_approximations(ratio2, config.max_denominator, ratio2 * max_strain)? {
                    if beta.is_zero() {
                        continue;
                    }
                    let r2_by_beta = r2 / beta.to_f64();
                    let s2 = (r2_by_beta.norm_squared() - a2.norm_squared()) / a2.norm_squared();
                    let s3 = (q2_by_alpha.dot(&r2_by_beta) - a1.dot(&a2)) / (a1.norm() * a2.norm());
                    if s2.abs() > max_strain || s3.abs() > max_strain {
                        continue;
                    }
                    let deformation = q2_by_alpha * a1_star.transpose() + r2_by_beta * a2_star.transpose();
                    if real_determinant(&deformation) <= COINCIDENCE_EPSILON {
                        continue;
                    }
                    if let Some(found) = verify(a, deformation, None, config)? {
                        debug!("coincident deformation, strains ({:.3e}, {:.3e}, {:.3e})", s1, s2, s3);
                        output.push(found);
                        if output.len() == config.max_configurations {
                            info!("{} coincident deformations (limit reached)", output.len());
                            return Ok(output);
                        }
                    }
                }
            }
        }
    }
    info!("{} coincident deformations", output.len());
    Ok(output)
}
