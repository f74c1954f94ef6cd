use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{unimodular_inverse, IntMatrix, IntVector};
use crate::math::integer_math::{extended_gcd, gcd_slice};

fn narrow(v: i128) -> Result<i64> {
    i64::try_from(v).map_err(|_| LatticeError::Overflow("unimodular completion"))
}

/// Completes a primitive integer vector to a unimodular matrix whose first
/// column is `v`.
///
/// Pairs of entries `(v_0, v_i)` are merged by extended gcd row operations
/// until `v` becomes `e_1`; the inverse operations are accumulated on the
/// right of the identity, so the accumulated matrix maps `e_1` back to `v`.
pub fn complete_unimodular<const D: usize>(v: &IntVector<D>) -> Result<IntMatrix<D>> {
    if gcd_slice(v.as_slice()) != 1 {
        return Err(LatticeError::InvalidInput(format!(
            "vector {:?} is not primitive",
            v.as_slice()
        )));
    }
    let mut current = *v;
    let mut m = IntMatrix::<D>::identity();

    for i in 1..D {
        let (a, b) = (current[0], current[i]);
        if b == 0 {
            continue;
        }
        let (g, p, q) = extended_gcd(a, b);
        let (ag, bg) = (a / g, b / g);
        for r in 0..D {
            let c0 = m[(r, 0)] as i128;
            let ci = m[(r, i)] as i128;
            m[(r, 0)] = narrow(c0 * ag as i128 + ci * bg as i128)?;
            m[(r, i)] = narrow(-c0 * q as i128 + ci * p as i128)?;
        }
        current[0] = g;
        current[i] = 0;
    }

    // After merging, current = g e_1 with g = gcd(v) = 1, unless v lived
    // entirely in the first slot with a negative sign.
    if current[0] < 0 {
        for r in 0..D {
            m[(r, 0)] = -m[(r, 0)];
        }
    }
    Ok(m)
}

/// Integer basis `w_1 .. w_D` adapted to the family of planes with primitive
/// normal `n` (given in reciprocal coordinates).
///
/// `n · w_1 = 1` makes `w_1` the stacking vector between adjacent planes and
/// `n · w_i = 0` for `i > 1` makes the remaining columns span a single plane.
/// The result is unimodular.
pub fn plane_parallel_integer_basis<const D: usize>(n: &IntVector<D>) -> Result<IntMatrix<D>> {
    let u = complete_unimodular(n)?;
    Ok(unimodular_inverse(&u)?.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::int_matrix::determinant;
    use nalgebra::SVector;

    #[test]
    fn completion_keeps_first_column() {
        for v in [
            SVector::<i64, 3>::new(3, 5, 7),
            SVector::<i64, 3>::new(0, 0, -1),
            SVector::<i64, 3>::new(-1, 0, 0),
            SVector::<i64, 3>::new(6, 10, 15),
        ] {
            let m = complete_unimodular(&v).unwrap();
            assert_eq!(m.column(0).into_owned(), v);
            assert_eq!(determinant(&m).unwrap().abs(), 1);
        }
    }

    #[test]
    fn completion_rejects_non_primitive() {
        assert!(complete_unimodular(&SVector::<i64, 2>::new(2, 4)).is_err());
        assert!(complete_unimodular(&SVector::<i64, 2>::zeros()).is_err());
    }

    #[test]
    fn plane_basis_pairs_with_normal() {
        let n = SVector::<i64, 4>::new(2, -3, 5, 1);
        let w = plane_parallel_integer_basis(&n).unwrap();
        assert_eq!(n.dot(&w.column(0)), 1);
        for j in 1..4 {
            assert_eq!(n.dot(&w.column(j)), 0);
        }
    }
}
