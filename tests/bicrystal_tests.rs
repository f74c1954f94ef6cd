use bicrystal_lattice::{
    coincident_rotations_2d, BiCrystal, BiCrystalLattice, Gb, IdCounter, Lattice, LatticeError,
    ReciprocalLatticeDirection, SearchConfig,
};
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

fn sigma5_2d() -> Matrix2<f64> {
    Matrix2::new(0.6, -0.8, 0.8, 0.6)
}

fn sigma5_3d() -> Matrix3<f64> {
    Matrix3::new(0.6, -0.8, 0.0, 0.8, 0.6, 0.0, 0.0, 0.0, 1.0)
}

fn off_by_multiple(x: f64, period: f64) -> f64 {
    (x / period - (x / period).round()).abs()
}

#[test]
fn csl_and_dscl_contain_the_right_lattices() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix2::identity(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();

    for j in 0..2 {
        let c = bc.csl().lattice_vector_from_coordinates(Vector2::ith(j, 1));
        let in_a = bc.lattice_vector_in(&c, BiCrystalLattice::A).unwrap();
        let in_b = bc.lattice_vector_in(&c, BiCrystalLattice::B).unwrap();
        assert!((in_a.cartesian() - c.cartesian()).norm() < 1e-9);
        assert!((in_b.cartesian() - c.cartesian()).norm() < 1e-9);

        let v = a.lattice_vector_from_coordinates(Vector2::ith(j, 1));
        let in_dscl = bc.lattice_vector_in(&v, BiCrystalLattice::Dscl).unwrap();
        assert!((in_dscl.cartesian() - v.cartesian()).norm() < 1e-9);
    }

    let unit = a.lattice_vector_from_coordinates(Vector2::new(1, 0));
    assert!(matches!(
        bc.lattice_vector_in(&unit, BiCrystalLattice::Csl),
        Err(LatticeError::NotOnLattice { .. })
    ));
}

#[test]
fn parallel_bases_are_parallel() {
    let a = Lattice::new(Matrix2::new(1.0, 0.3, 0.0, 1.1)).unwrap();
    let b = Lattice::with_deformation(*a.basis(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, false).unwrap();
    let (pa, pb) = (bc.parallel_basis_a(), bc.parallel_basis_b());
    for j in 0..2 {
        let (u, v) = (pa.column(j), pb.column(j));
        let cross = u[0] * v[1] - u[1] * v[0];
        assert!(cross.abs() < 1e-9 * u.norm() * v.norm());
    }
}

#[test]
fn directions_convert_between_frames() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix2::identity(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();

    let d = a.lattice_direction(&Vector2::new(1.0, 0.0)).unwrap();
    for target in BiCrystalLattice::ALL {
        let converted = bc.lattice_direction_in(&d, target).unwrap();
        let (u, v) = (d.cartesian(), converted.cartesian());
        assert!((u.normalize() - v.normalize()).norm() < 1e-9);
    }

    let r = ReciprocalLatticeDirection::from_coordinates(Vector2::new(1, 2), &a).unwrap();
    for target in BiCrystalLattice::ALL {
        let converted = bc.reciprocal_lattice_direction_in(&r, target).unwrap();
        assert!((r.cartesian().normalize() - converted.cartesian().normalize()).norm() < 1e-9);
    }

    // A* is a sublattice of the CSL reciprocal lattice
    let in_csl = bc.reciprocal_lattice_vector_in(r.vector(), BiCrystalLattice::Csl).unwrap();
    assert!((in_csl.cartesian() - r.cartesian()).norm() < 1e-9);
}

#[test]
fn shift_tensors_split_every_dscl_vector() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix2::identity(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();

    assert_eq!(bc.shift_tensor_a() + bc.shift_tensor_b(), Matrix2::identity());
    for coordinates in [Vector2::new(1, 0), Vector2::new(0, 1), Vector2::new(2, -3)] {
        let d = bc.dscl().lattice_vector_from_coordinates(coordinates);
        let into_b = bc.shift_a(&d).unwrap();
        let into_a = bc.shift_b(&d).unwrap();
        assert_eq!(bc.identify(into_b.lattice()).unwrap(), BiCrystalLattice::B);
        assert_eq!(bc.identify(into_a.lattice()).unwrap(), BiCrystalLattice::A);
        assert!((into_a.cartesian() + into_b.cartesian() - d.cartesian()).norm() < 1e-9);
    }
}

#[test]
fn step_heights_differ_by_the_burgers_vector_normal_component() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix2::identity(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();
    let n = ReciprocalLatticeDirection::from_coordinates(Vector2::new(2, 1), &a).unwrap();
    let gb = Gb::new(&bc, &n).unwrap();
    let period = gb.csl_plane_spacing();

    for coordinates in [Vector2::new(1, 0), Vector2::new(0, 1), Vector2::new(1, 1)] {
        let d = bc.dscl().lattice_vector_from_coordinates(coordinates);
        let h_a = gb.step_height_a(&d).unwrap();
        let h_b = gb.step_height_b(&d).unwrap();
        assert!(h_a.abs() <= period / 2.0 + 1e-12);
        let normal_component = d.cartesian().dot(&gb.unit_normal_a());
        assert!(off_by_multiple(h_a - h_b - normal_component, period) < 1e-9);
    }
}

#[test]
fn boundary_normal_may_be_given_in_b() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix2::identity(), sigma5_2d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();
    let n = ReciprocalLatticeDirection::from_coordinates(Vector2::new(1, 0), &b).unwrap();
    let gb = Gb::new(&bc, &n).unwrap();
    assert_eq!(gb.normal_b().coordinates(), &Vector2::new(1, 0));
    assert!((gb.unit_normal_a() + n.cartesian().normalize()).norm() < 1e-9);
}

#[test]
fn lattices_of_different_volume_have_no_common_sigma() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::new(Matrix2::identity() * 2.0).unwrap();
    let bc = BiCrystal::new(&a, &b, false).unwrap();
    assert_eq!((bc.sigma_a(), bc.sigma_b(), bc.sigma()), (4, 1, 0));
    assert!((bc.csl().volume() - 4.0).abs() < 1e-12);
    assert!((bc.dscl().volume() - 1.0).abs() < 1e-12);
}

#[test]
fn cubic_twist_boundary_period() {
    let a = Lattice::new(Matrix3::identity()).unwrap();
    let b = Lattice::with_deformation(Matrix3::identity(), sigma5_3d()).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();
    assert_eq!(bc.sigma(), 5);

    let n = ReciprocalLatticeDirection::from_coordinates(Vector3::new(1, 2, 0), &a).unwrap();
    let gb = Gb::new(&bc, &n).unwrap();
    let axis = a.reciprocal_vector_from_coordinates(Vector3::new(0, 0, 1));
    let period = gb.period_vector(&axis).unwrap();
    let cartesian = period.cartesian();
    assert!(cartesian.norm() > 0.5);
    assert!(cartesian.dot(&gb.unit_normal_a()).abs() < 1e-9);
    assert!(cartesian.z.abs() < 1e-9);

    let tilted = a.reciprocal_vector_from_coordinates(Vector3::new(1, 0, 0));
    assert!(gb.period_vector(&tilted).is_err());
}

#[test]
fn hexagonal_rotations_find_sigma7() {
    let hexagonal = Matrix2::new(1.0, 0.5, 0.0, 3f64.sqrt() / 2.0);
    let a = Lattice::new(hexagonal).unwrap();
    let config = SearchConfig { enumeration_bound: 5, ..SearchConfig::default() };
    let found = coincident_rotations_2d(&a, &config).unwrap();
    assert!(found.iter().any(|c| c.sigma == 7));
    assert!(found.iter().all(|c| c.sigma_a == c.sigma_b));
}

#[test]
fn derived_lattices_keep_distinct_ids_under_a_private_counter() {
    let counter = IdCounter::new();
    let a = Lattice::with_counter(Matrix2::identity(), Matrix2::identity(), &counter).unwrap();
    let b = Lattice::with_counter(Matrix2::identity(), sigma5_2d(), &counter).unwrap();
    let bc = BiCrystal::new(&a, &b, true).unwrap();

    let ids = [a.id(), b.id(), bc.csl().id(), bc.dscl().id()];
    for i in 0..ids.len() {
        for j in i + 1..ids.len() {
            assert_ne!(ids[i], ids[j]);
        }
    }
    assert_eq!(bc.identify(bc.csl()).unwrap(), BiCrystalLattice::Csl);
    assert_eq!(bc.identify(bc.dscl()).unwrap(), BiCrystalLattice::Dscl);

    let in_a = a.lattice_vector_from_coordinates(Vector2::new(1, 0));
    let in_csl = bc.csl().lattice_vector_from_coordinates(Vector2::new(1, 0));
    assert!(matches!(in_a.checked_add(&in_csl), Err(LatticeError::IncompatibleLattice { .. })));

    let back = bc.lattice_vector_in(&in_csl, BiCrystalLattice::A).unwrap();
    assert!((back.cartesian() - in_csl.cartesian()).norm() < 1e-9);
}
