use log::debug;
use nalgebra::DMatrix;

use crate::error::{LatticeError, Result};
use crate::math::int_matrix::checked_mul_dyn;

/// Output of an exact reduction: `reduced = basis * transform`.
#[derive(Debug, Clone, PartialEq)]
pub struct LllReduction {
    /// Unimodular change of basis, columns in terms of the input vectors.
    pub transform: DMatrix<i64>,
    /// Gram matrix of the reduced vectors.
    pub gram: DMatrix<i64>,
    pub swaps: usize,
}

/// Lovász parameter `delta = p / q` checked to lie in `(1/4, 1)`.
pub fn validate_delta(delta: (i64, i64)) -> Result<(i128, i128)> {
    let (p, q) = delta;
    if q <= 0 || p <= 0 || 4 * (p as i128) <= q as i128 || p >= q {
        return Err(LatticeError::InvalidInput(format!(
            "LLL parameter {p}/{q} must lie strictly between 1/4 and 1"
        )));
    }
    Ok((p as i128, q as i128))
}

fn overflow() -> LatticeError {
    LatticeError::Overflow("integral LLL")
}

fn mul(a: i128, b: i128) -> Result<i128> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn sub(a: i128, b: i128) -> Result<i128> {
    a.checked_sub(b).ok_or_else(overflow)
}

fn add(a: i128, b: i128) -> Result<i128> {
    a.checked_add(b).ok_or_else(overflow)
}

/// Nearest integer to `a / b` for `b > 0`, halves rounded up.
fn round_div(a: i128, b: i128) -> Result<i128> {
    let num = add(mul(2, a)?, b)?;
    Ok(num.div_euclid(2 * b))
}

/// Integral LLL state. `lambda[k][j] = d_{j+1} mu_{k,j}` and
/// `d[i+1] = det(Gram of the first i+1 vectors)` are integers throughout,
/// with `d[0] = 1`.
struct Integral {
    n: usize,
    gram: Vec<Vec<i128>>,
    transform: Vec<Vec<i128>>,
    lambda: Vec<Vec<i128>>,
    d: Vec<i128>,
}

impl Integral {
    /// `b_k -= q b_l` on the Gram matrix and the transform.
    fn subtract(&mut self, k: usize, l: usize, q: i128) -> Result<()> {
        for row in self.transform.iter_mut() {
            row[k] = sub(row[k], mul(q, row[l])?)?;
        }
        let g_kl = self.gram[k][l];
        let g_ll = self.gram[l][l];
        for i in 0..self.n {
            if i != k {
                let value = sub(self.gram[i][k], mul(q, self.gram[i][l])?)?;
                self.gram[i][k] = value;
                self.gram[k][i] = value;
            }
        }
        // <b_k - q b_l, b_k - q b_l>
        let g_kk = add(sub(self.gram[k][k], mul(2 * q, g_kl)?)?, mul(mul(q, q)?, g_ll)?)?;
        self.gram[k][k] = g_kk;
        Ok(())
    }

    fn swap(&mut self, i: usize, j: usize) {
        for row in self.transform.iter_mut() {
            row.swap(i, j);
        }
        self.gram.swap(i, j);
        for row in self.gram.iter_mut() {
            row.swap(i, j);
        }
    }

    /// Gram-Schmidt data for vector `k` from the inner products.
    fn extend(&mut self, k: usize) -> Result<()> {
        for j in 0..=k {
            let mut u = self.gram[k][j];
            for i in 0..j {
                u = sub(mul(self.d[i + 1], u)?, mul(self.lambda[k][i], self.lambda[j][i])?)? / self.d[i];
            }
            if j < k {
                self.lambda[k][j] = u;
            } else {
                if u == 0 {
                    return Err(LatticeError::InvalidInput("LLL input vectors are linearly dependent".into()));
                }
                self.d[k + 1] = u;
            }
        }
        Ok(())
    }

    /// Size-reduces `b_k` against `b_l`.
    fn reduce(&mut self, k: usize, l: usize) -> Result<()> {
        let dl = self.d[l + 1];
        if mul(2, self.lambda[k][l])?.abs() <= dl {
            return Ok(());
        }
        let q = round_div(self.lambda[k][l], dl)?;
        self.subtract(k, l, q)?;
        self.lambda[k][l] = sub(self.lambda[k][l], mul(q, dl)?)?;
        for i in 0..l {
            self.lambda[k][i] = sub(self.lambda[k][i], mul(q, self.lambda[l][i])?)?;
        }
        Ok(())
    }

    /// Exchanges `b_{k-1}` and `b_k`; `kmax` is the last initialized index.
    fn exchange(&mut self, k: usize, kmax: usize) -> Result<()> {
        self.swap(k, k - 1);
        for j in 0..k - 1 {
            let t = self.lambda[k][j];
            self.lambda[k][j] = self.lambda[k - 1][j];
            self.lambda[k - 1][j] = t;
        }
        let lam = self.lambda[k][k - 1];
        let (d_km2, d_km1, d_k) = (self.d[k - 1], self.d[k], self.d[k + 1]);
        let b = add(mul(d_km2, d_k)?, mul(lam, lam)?)? / d_km1;
        if b >= d_km1 {
            return Err(LatticeError::ReductionNonconvergence(format!(
                "LLL potential did not decrease on swap at {k} ({b} >= {d_km1})"
            )));
        }
        for i in k + 1..=kmax {
            let t = self.lambda[i][k];
            self.lambda[i][k] = sub(mul(d_k, self.lambda[i][k - 1])?, mul(lam, t)?)? / d_km1;
            self.lambda[i][k - 1] = add(mul(b, t)?, mul(lam, self.lambda[i][k])?)? / d_k;
        }
        self.d[k] = b;
        Ok(())
    }
}

/// Exact LLL reduction driven by an integer Gram matrix (Cohen, Alg. 2.6.7).
///
/// All Gram-Schmidt quantities are kept as integers, so the result depends
/// only on the input and `delta`. Every exchange strictly lowers the
/// sub-determinant `d_{k-1}`, which bounds the number of iterations.
pub fn lll_reduce_gram(gram: &DMatrix<i64>, delta: (i64, i64)) -> Result<LllReduction> {
    let (p, q) = validate_delta(delta)?;
    let n = gram.nrows();
    if gram.ncols() != n {
        return Err(LatticeError::InvalidInput("Gram matrix must be square".into()));
    }
    if gram.transpose() != *gram {
        return Err(LatticeError::InvalidInput("Gram matrix must be symmetric".into()));
    }
    let mut state = Integral {
        n,
        gram: (0..n).map(|i| (0..n).map(|j| gram[(i, j)] as i128).collect()).collect(),
        transform: (0..n).map(|i| (0..n).map(|j| i128::from(i == j)).collect()).collect(),
        lambda: vec![vec![0; n]; n],
        d: vec![0; n + 1],
    };
    state.d[0] = 1;

    let mut swaps = 0usize;
    if n > 0 {
        state.extend(0)?;
        let mut k = 1usize;
        let mut kmax = 0usize;
        while k < n {
            if k > kmax {
                kmax = k;
                state.extend(k)?;
            }
            state.reduce(k, k - 1)?;
            let lam = state.lambda[k][k - 1];
            let lhs = mul(q, add(mul(state.d[k + 1], state.d[k - 1])?, mul(lam, lam)?)?)?;
            let rhs = mul(p, mul(state.d[k], state.d[k])?)?;
            if lhs < rhs {
                state.exchange(k, kmax)?;
                swaps += 1;
                if k > 1 {
                    k -= 1;
                }
            } else {
                for l in (0..k - 1).rev() {
                    state.reduce(k, l)?;
                }
                k += 1;
            }
        }
    }
    debug!("integral LLL: {} vectors, {} swaps", n, swaps);

    let narrow = |v: i128| i64::try_from(v).map_err(|_| overflow());
    let mut transform = DMatrix::<i64>::zeros(n, n);
    let mut reduced_gram = DMatrix::<i64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            transform[(i, j)] = narrow(state.transform[i][j])?;
            reduced_gram[(i, j)] = narrow(state.gram[i][j])?;
        }
    }
    Ok(LllReduction { transform, gram: reduced_gram, swaps })
}

/// Exact LLL on integer column vectors under the standard inner product.
/// Returns the reduced vectors and the unimodular transform.
pub fn lll_reduce_integer(basis: &DMatrix<i64>, delta: (i64, i64)) -> Result<(DMatrix<i64>, DMatrix<i64>)> {
    let n = basis.ncols();
    let mut gram = DMatrix::<i64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let acc: i128 = basis
                .column(i)
                .iter()
                .zip(basis.column(j).iter())
                .map(|(a, b)| *a as i128 * *b as i128)
                .sum();
            gram[(i, j)] = i64::try_from(acc).map_err(|_| overflow())?;
        }
    }
    let reduction = lll_reduce_gram(&gram, delta)?;
    let reduced = checked_mul_dyn(basis, &reduction.transform)?;
    Ok((reduced, reduction.transform))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_delta_outside_open_interval() {
        assert!(validate_delta((1, 4)).is_err());
        assert!(validate_delta((1, 1)).is_err());
        assert!(validate_delta((3, 4)).is_ok());
        assert!(validate_delta((99, 100)).is_ok());
    }

    #[test]
    fn two_dimensional_example_reaches_unit_vectors() {
        let basis = DMatrix::from_row_slice(2, 2, &[2, 1, 1, 1]);
        let (reduced, u) = lll_reduce_integer(&basis, (3, 4)).unwrap();
        for j in 0..2 {
            let norm2: i64 = reduced.column(j).iter().map(|v| v * v).sum();
            assert_eq!(norm2, 1);
        }
        assert_eq!(&basis * &u, reduced);
    }

    #[test]
    fn reduced_basis_is_fixed_point() {
        let basis = DMatrix::from_row_slice(3, 3, &[1, -1, 3, 1, 0, 5, 1, 2, 6]);
        let (reduced, _) = lll_reduce_integer(&basis, (3, 4)).unwrap();
        let (again, u) = lll_reduce_integer(&reduced, (3, 4)).unwrap();
        assert_eq!(again, reduced);
        assert_eq!(u, DMatrix::identity(3, 3));
    }

    #[test]
    fn dependent_vectors_are_rejected() {
        let basis = DMatrix::from_row_slice(2, 2, &[1, 2, 1, 2]);
        assert!(lll_reduce_integer(&basis, (3, 4)).is_err());
    }

    #[test]
    fn rectangular_sub_basis() {
        // two vectors in Z^3
        let basis = DMatrix::from_row_slice(3, 2, &[1, 4, 1, 5, 1, 6]);
        let (reduced, u) = lll_reduce_integer(&basis, (3, 4)).unwrap();
        let det = u[(0, 0)] * u[(1, 1)] - u[(0, 1)] * u[(1, 0)];
        assert_eq!(det.abs(), 1);
        let n0: i64 = reduced.column(0).iter().map(|v| v * v).sum();
        assert!(n0 <= 3);
    }
}
