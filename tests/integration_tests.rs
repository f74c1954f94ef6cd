use bicrystal_lattice::math::lll::lll_reduce_integer;
use bicrystal_lattice::{BiCrystal, BiCrystalLattice, Lattice, LatticeError};
use nalgebra::{DMatrix, Matrix2, Matrix3, Vector2};

#[test]
fn identity_lattice_with_itself_is_its_own_csl() {
    let a = Lattice::new(Matrix2::identity()).expect("identity basis is valid");
    let bicrystal = BiCrystal::new(&a, &a, false).expect("a lattice coincides with itself");

    assert_eq!(bicrystal.sigma(), 1);
    assert_eq!(bicrystal.smith().index().unwrap(), 1);
    assert_eq!(bicrystal.csl().basis(), a.basis());
    assert_eq!(bicrystal.dscl().basis(), a.basis());
    assert_eq!(bicrystal.identify(&a).unwrap(), BiCrystalLattice::A);

    let v = a.lattice_vector_from_coordinates(Vector2::new(3, -2));
    let in_csl = bicrystal.lattice_vector_in(&v, BiCrystalLattice::Csl).unwrap();
    assert_eq!(in_csl.coordinates(), &Vector2::new(3, -2));
}

#[test]
fn reduced_identity_bicrystal_keeps_volume() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let bicrystal = BiCrystal::new(&a, &a, true).unwrap();
    assert!((bicrystal.csl().volume() - 1.0).abs() < 1e-12);
    assert!((bicrystal.dscl().volume() - 1.0).abs() < 1e-12);
}

#[test]
fn lll_on_two_dimensional_basis_meets_hermite_bound() {
    // columns (2, 1) and (1, 1)
    let basis = DMatrix::from_row_slice(2, 2, &[2, 1, 1, 1]);
    let (reduced, transform) = lll_reduce_integer(&basis, (3, 4)).unwrap();

    let det = transform[(0, 0)] * transform[(1, 1)] - transform[(0, 1)] * transform[(1, 0)];
    assert_eq!(det.abs(), 1);
    // shortest vector has length 1; the bound for delta = 3/4 is sqrt(2)
    for j in 0..2 {
        let norm = (reduced.column(j).iter().map(|v| (v * v) as f64).sum::<f64>()).sqrt();
        assert!(norm <= 2f64.sqrt() + 1e-12);
    }
}

#[test]
fn lattice_vectors_reduce_through_the_lattice() {
    let lattice = Lattice::new(Matrix2::identity()).unwrap();
    let vectors = [
        lattice.lattice_vector_from_coordinates(Vector2::new(2, 1)),
        lattice.lattice_vector_from_coordinates(Vector2::new(1, 1)),
    ];
    let reduced = lattice.reduce_lattice_vectors(&vectors, 0.75).unwrap();
    for v in &reduced {
        assert!((v.norm() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn singular_basis_is_degenerate() {
    // columns (1, 1) and (0, 0)
    let result = Lattice::new(Matrix2::new(1.0, 0.0, 1.0, 0.0));
    assert!(matches!(result, Err(LatticeError::DegenerateBasis { .. })));
}

#[test]
fn strongly_sheared_unimodular_basis_is_accepted() {
    for s in [1e4, 3.7e4, 1e5] {
        for t in [0.0, 0.25, 17.0, 123.5] {
            let basis = Matrix3::new(1.0, s + t, 0.7 * s + 0.13, 0.0, 1.0, 0.3 * s + t, 0.0, 0.0, 1.0);
            let lattice = Lattice::new(basis).unwrap();
            assert!((lattice.volume() - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn vectors_of_separately_built_lattices_do_not_mix() {
    let a = Lattice::new(Matrix2::identity()).unwrap();
    let b = Lattice::new(Matrix2::identity()).unwrap();
    assert_ne!(a, b);

    let u = a.lattice_vector_from_coordinates(Vector2::new(1, 0));
    let v = b.lattice_vector_from_coordinates(Vector2::new(0, 1));
    assert_eq!(
        u.checked_add(&v),
        Err(LatticeError::IncompatibleLattice { left: a.id(), right: b.id() })
    );
}
