//! Exact helpers for small integer matrices and their real counterparts.

use nalgebra::{DMatrix, SMatrix, SVector};

use crate::error::{LatticeError, Result};
use crate::math::integer_math::gcd_slice;

pub type IntMatrix<const D: usize> = SMatrix<i64, D, D>;
pub type IntVector<const D: usize> = SVector<i64, D>;
pub type RealMatrix<const D: usize> = SMatrix<f64, D, D>;
pub type RealVector<const D: usize> = SVector<f64, D>;

/// Largest magnitude that survives a round trip through `i64`.
pub(crate) const I64_SAFE: f64 = 9.0e18;

fn narrow(v: i128, context: &'static str) -> Result<i64> {
    i64::try_from(v).map_err(|_| LatticeError::Overflow(context))
}

/// `sum(x_k * y_k)` in `i128`, narrowed back to `i64`.
fn checked_sum_of_products(pairs: impl Iterator<Item = (i64, i64)>, context: &'static str) -> Result<i64> {
    let mut acc = 0i128;
    for (x, y) in pairs {
        acc = (x as i128)
            .checked_mul(y as i128)
            .and_then(|p| acc.checked_add(p))
            .ok_or(LatticeError::Overflow(context))?;
    }
    narrow(acc, context)
}

/// Fraction-free Gaussian elimination. Every intermediate value is itself a
/// minor of the input, so the result is exact.
fn bareiss(mut a: Vec<Vec<i128>>) -> Result<i128> {
    let n = a.len();
    if n == 0 {
        return Ok(1);
    }
    let mut sign = 1i128;
    let mut previous = 1i128;
    for k in 0..n - 1 {
        if a[k][k] == 0 {
            match (k + 1..n).find(|&r| a[r][k] != 0) {
                Some(r) => {
                    a.swap(k, r);
                    sign = -sign;
                }
                None => return Ok(0),
            }
        }
        for i in k + 1..n {
            for j in k + 1..n {
                let lhs = a[i][j].checked_mul(a[k][k]);
                let rhs = a[i][k].checked_mul(a[k][j]);
                let value = match (lhs, rhs) {
                    (Some(l), Some(r)) => l.checked_sub(r),
                    _ => None,
                }
                .ok_or(LatticeError::Overflow("integer determinant"))?;
                a[i][j] = value / previous;
            }
        }
        previous = a[k][k];
    }
    Ok(sign * a[n - 1][n - 1])
}

fn rows_of<const D: usize>(m: &IntMatrix<D>) -> Vec<Vec<i128>> {
    (0..D).map(|i| (0..D).map(|j| m[(i, j)] as i128).collect()).collect()
}

/// Exact determinant of an integer matrix.
pub fn determinant<const D: usize>(m: &IntMatrix<D>) -> Result<i64> {
    narrow(bareiss(rows_of(m))?, "integer determinant")
}

/// Exact determinant of a runtime-sized square integer matrix.
pub fn determinant_dyn(m: &DMatrix<i64>) -> Result<i64> {
    if m.nrows() != m.ncols() {
        return Err(LatticeError::InvalidInput("determinant of a non-square matrix".into()));
    }
    let n = m.nrows();
    let rows = (0..n).map(|i| (0..n).map(|j| m[(i, j)] as i128).collect()).collect();
    narrow(bareiss(rows)?, "integer determinant")
}

/// Classical adjoint: `m * adjugate(m) = det(m) I`.
pub fn adjugate<const D: usize>(m: &IntMatrix<D>) -> Result<IntMatrix<D>> {
    let mut adj = IntMatrix::<D>::zeros();
    if D == 1 {
        adj[(0, 0)] = 1;
        return Ok(adj);
    }
    let rows = rows_of(m);
    for i in 0..D {
        for j in 0..D {
            let minor: Vec<Vec<i128>> = rows
                .iter()
                .enumerate()
                .filter(|(r, _)| *r != i)
                .map(|(_, row)| {
                    row.iter()
                        .enumerate()
                        .filter(|(c, _)| *c != j)
                        .map(|(_, v)| *v)
                        .collect()
                })
                .collect();
            let cofactor = bareiss(minor)?;
            let signed = if (i + j) % 2 == 0 { cofactor } else { -cofactor };
            adj[(j, i)] = narrow(signed, "adjugate")?;
        }
    }
    Ok(adj)
}

/// Inverse of a matrix with determinant ±1.
pub fn unimodular_inverse<const D: usize>(m: &IntMatrix<D>) -> Result<IntMatrix<D>> {
    let det = determinant(m)?;
    if det.abs() != 1 {
        return Err(LatticeError::InvalidInput(format!(
            "matrix is not unimodular (determinant {det})"
        )));
    }
    Ok(adjugate(m)? * det)
}

pub fn is_unimodular<const D: usize>(m: &IntMatrix<D>) -> bool {
    matches!(determinant(m), Ok(d) if d.abs() == 1)
}

/// `a * b` with every accumulation checked.
pub fn checked_mul<const R: usize, const K: usize, const C: usize>(
    a: &SMatrix<i64, R, K>,
    b: &SMatrix<i64, K, C>,
) -> Result<SMatrix<i64, R, C>> {
    let mut out = SMatrix::<i64, R, C>::zeros();
    for i in 0..R {
        for j in 0..C {
            out[(i, j)] = checked_sum_of_products((0..K).map(|k| (a[(i, k)], b[(k, j)])), "integer matrix product")?;
        }
    }
    Ok(out)
}

/// Runtime-sized counterpart of [`checked_mul`].
pub fn checked_mul_dyn(a: &DMatrix<i64>, b: &DMatrix<i64>) -> Result<DMatrix<i64>> {
    if a.ncols() != b.nrows() {
        return Err(LatticeError::InvalidInput(format!(
            "cannot multiply {}x{} by {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    let mut out = DMatrix::<i64>::zeros(a.nrows(), b.ncols());
    for i in 0..a.nrows() {
        for j in 0..b.ncols() {
            out[(i, j)] =
                checked_sum_of_products((0..a.ncols()).map(|k| (a[(i, k)], b[(k, j)])), "integer matrix product")?;
        }
    }
    Ok(out)
}

/// Integer dot product, accumulated in `i128`.
pub fn checked_dot<const D: usize>(a: &IntVector<D>, b: &IntVector<D>) -> Result<i64> {
    checked_sum_of_products(a.iter().copied().zip(b.iter().copied()), "integer dot product")
}

pub fn to_real<const R: usize, const C: usize>(m: &SMatrix<i64, R, C>) -> SMatrix<f64, R, C> {
    m.map(|v| v as f64)
}

/// Rounds every entry and reports the largest deviation from an integer.
pub fn round_to_integer<const R: usize, const C: usize>(
    m: &SMatrix<f64, R, C>,
) -> Result<(SMatrix<i64, R, C>, f64)> {
    let mut out = SMatrix::<i64, R, C>::zeros();
    let mut max_error = 0.0f64;
    for (i, value) in m.iter().enumerate() {
        if !value.is_finite() || value.abs() >= I64_SAFE {
            return Err(LatticeError::Overflow("rounding to integer"));
        }
        let rounded = value.round();
        max_error = max_error.max((value - rounded).abs());
        out[i] = rounded as i64;
    }
    Ok((out, max_error))
}

/// Determinant of a real square matrix.
pub fn real_determinant<const D: usize>(m: &RealMatrix<D>) -> f64 {
    DMatrix::from_column_slice(D, D, m.as_slice()).determinant()
}

/// Inverse of a real square matrix, `None` when it is singular.
pub fn real_inverse<const D: usize>(m: &RealMatrix<D>) -> Option<RealMatrix<D>> {
    let inverse = DMatrix::from_column_slice(D, D, m.as_slice()).try_inverse()?;
    Some(RealMatrix::<D>::from_column_slice(inverse.as_slice()))
}

/// Divides out the gcd of the entries. Returns the primitive vector and the
/// gcd, or `None` for the zero vector.
pub fn primitive<const D: usize>(v: &IntVector<D>) -> Option<(IntVector<D>, i64)> {
    let g = gcd_slice(v.as_slice());
    if g == 0 {
        return None;
    }
    Some((v / g, g))
}
