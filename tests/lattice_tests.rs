use bicrystal_lattice::core::identity::IdCounter;
use bicrystal_lattice::{Lattice, LatticeError, ReciprocalLatticeDirection};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

fn triclinic() -> Lattice<3> {
    Lattice::from_parameters(2.9, 3.4, 4.1, 82.0, 97.0, 104.0).unwrap()
}

#[test]
fn direct_and_reciprocal_vectors_pair_to_integers() {
    let lattice = triclinic();
    let v = lattice.lattice_vector_from_coordinates(Vector3::new(2, -1, 3));
    let r = lattice.reciprocal_vector_from_coordinates(Vector3::new(1, 4, -2));
    let exact = v.dot(&r).unwrap();
    assert_eq!(exact, 2 - 4 - 6);
    assert!((v.cartesian().dot(&r.cartesian()) - exact as f64).abs() < 1e-9);
}

#[test]
fn plane_index_of_lattice_points_is_integral() {
    let lattice = triclinic();
    let r = lattice.reciprocal_vector_from_coordinates(Vector3::new(1, 1, 0));
    let point = lattice.lattice_vector_from_coordinates(Vector3::new(3, -5, 7)).cartesian();
    assert_eq!(r.closest_plane_index_of_point(&point).unwrap(), -2);
    assert!((r.plane_index_of_point(&point) + 2.0).abs() < 1e-9);
    let step = r.interplane_vector().unwrap();
    assert!((r.plane_index_of_point(&step) - 1.0).abs() < 1e-9);
}

#[test]
fn cross_product_is_normal_to_both_factors() {
    let lattice = triclinic();
    let u = lattice.lattice_vector_from_coordinates(Vector3::new(1, 0, 1));
    let v = lattice.lattice_vector_from_coordinates(Vector3::new(0, 2, -1));
    let normal = u.cross(&v).unwrap();
    assert_eq!(u.dot(&normal).unwrap(), 0);
    assert_eq!(v.dot(&normal).unwrap(), 0);
    assert!(normal.cartesian().dot(&u.cartesian()).abs() < 1e-9);
}

#[test]
fn plane_parallel_basis_in_five_dimensions() {
    let basis = SMatrix::<f64, 5, 5>::from_fn(|i, j| if i == j { 1.0 + 0.1 * i as f64 } else if j == i + 1 { 0.3 } else { 0.0 });
    let lattice = Lattice::new(basis).unwrap();
    let normal =
        ReciprocalLatticeDirection::from_coordinates(SVector::<i64, 5>::from_row_slice(&[2, -3, 5, 1, 4]), &lattice)
            .unwrap();

    for use_rlll in [false, true] {
        let adapted = lattice.plane_parallel_lattice_basis(&normal, use_rlll).unwrap();
        assert_eq!(adapted.len(), 5);
        assert_eq!(adapted[0].dot(normal.vector()).unwrap(), 1);
        for b in &adapted[1..] {
            assert_eq!(b.dot(normal.vector()).unwrap(), 0);
        }
        let columns = SMatrix::<f64, 5, 5>::from_fn(|i, j| adapted[j].coordinates()[i] as f64);
        assert!((columns.determinant().abs() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn direction_orthogonal_reciprocal_basis() {
    let lattice = triclinic();
    let d = lattice.lattice_direction(&lattice.basis().column(0).into_owned()).unwrap();
    let adapted = lattice.direction_orthogonal_reciprocal_basis(&d, true).unwrap();
    assert_eq!(adapted[0].dot(d.vector()).unwrap(), 1);
    assert_eq!(adapted[1].dot(d.vector()).unwrap(), 0);
    assert_eq!(adapted[2].dot(d.vector()).unwrap(), 0);
}

#[test]
fn interplanar_spacing_of_cubic_planes() {
    let lattice = Lattice::new(Matrix3::identity() * 4.0).unwrap();
    let r = ReciprocalLatticeDirection::from_coordinates(Vector3::new(1, 1, 1), &lattice).unwrap();
    assert!((lattice.interplanar_spacing(&r).unwrap() - 4.0 / 3f64.sqrt()).abs() < 1e-12);

    let other = Lattice::new(Matrix3::identity() * 4.0).unwrap();
    assert!(matches!(other.interplanar_spacing(&r), Err(LatticeError::IncompatibleLattice { .. })));
}

#[test]
fn reduced_lattice_spans_the_same_points() {
    let lattice = Lattice::new(Matrix3::new(1.0, 5.0, 3.0, 0.0, 1.0, 7.0, 0.0, 0.0, 1.0)).unwrap();
    let (reduced, transform) = lattice.reduced(0.75).unwrap();
    let recomputed = lattice.basis() * transform.map(|v| v as f64);
    assert!((recomputed - reduced.basis()).norm() < 1e-9);
    assert!((reduced.volume() - lattice.volume()).abs() < 1e-9);
    assert_ne!(reduced.id(), lattice.id());
}

#[test]
fn injected_counter_gives_deterministic_ids() {
    let counter = IdCounter::new();
    let first = Lattice::with_counter(Matrix3::identity(), Matrix3::identity(), &counter).unwrap();
    let second = Lattice::with_counter(Matrix3::identity(), Matrix3::identity(), &counter).unwrap();
    assert_eq!(first.id().value() + 1, second.id().value());
    assert_eq!(counter.peek().value(), second.id().value() + 1);
}

#[test]
fn deformation_is_recorded() {
    let f = Matrix3::new(1.0, 0.1, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.02);
    let lattice = Lattice::with_deformation(Matrix3::identity(), f).unwrap();
    assert_eq!(lattice.deformation(), &f);
    assert_eq!(lattice.basis(), &f);
}

#[test]
fn negation_and_plane_index_report_overflow() {
    let lattice = Lattice::new(Matrix3::identity()).unwrap();
    let extreme = lattice.lattice_vector_from_coordinates(Vector3::new(i64::MIN, 0, 0));
    assert!(matches!(extreme.checked_neg(), Err(LatticeError::Overflow(_))));
    let v = lattice.lattice_vector_from_coordinates(Vector3::new(2, -3, 0));
    assert_eq!(v.checked_neg().unwrap().coordinates(), &Vector3::new(-2, 3, 0));

    let r = lattice.reciprocal_vector_from_coordinates(Vector3::new(1, 0, 0));
    assert!(matches!(
        r.closest_plane_index_of_point(&Vector3::new(1e20, 0.0, 0.0)),
        Err(LatticeError::Overflow(_))
    ));
    assert!(r.closest_plane_index_of_point(&Vector3::new(f64::NAN, 0.0, 0.0)).is_err());

    let normal = ReciprocalLatticeDirection::from_coordinates(Vector3::new(1, 2, 0), &lattice).unwrap();
    assert_eq!(normal.reversed().unwrap().coordinates(), &Vector3::new(-1, -2, 0));
}
