use log::debug;
use nalgebra::DMatrix;

use crate::config::{RLLL_MAX_ITERATIONS, RLLL_MAX_ORDERINGS, ROUND_TOLERANCE};
use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{checked_mul_dyn, determinant_dyn, IntMatrix, RealMatrix};

/// Output of a floating-point reduction: `basis = input * transform`.
#[derive(Debug, Clone, PartialEq)]
pub struct RlllReduction {
    pub basis: DMatrix<f64>,
    /// Unimodular, verified exactly.
    pub transform: DMatrix<i64>,
    /// Companion basis carried along so that `basis^T companion` is preserved.
    pub companion: Option<DMatrix<f64>>,
    pub swaps: usize,
}

/// Gram-Schmidt data: `h[i] = |b*_i|^2`, `mu[(i, j)]` for `j < i`.
struct Reducer {
    b: DMatrix<f64>,
    u: DMatrix<i64>,
    companion: Option<DMatrix<f64>>,
    h: Vec<f64>,
    mu: DMatrix<f64>,
}

impl Reducer {
    fn new(b: DMatrix<f64>, companion: Option<DMatrix<f64>>) -> Result<Self> {
        let n = b.ncols();
        let mut h: Vec<f64> = (0..n).map(|j| b.column(j).norm_squared()).collect();
        let mut mu = DMatrix::<f64>::identity(n, n);
        let scale = h.iter().cloned().fold(0.0, f64::max);
        for j in 0..n {
            if h[j] <= f64::EPSILON * scale {
                return Err(LatticeError::DegenerateBasis { determinant: 0.0 });
            }
            for i in j + 1..n {
                let mut temp = 0.0;
                for k in 0..j {
                    temp += mu[(j, k)] * mu[(i, k)] * h[k];
                }
                mu[(i, j)] = (b.column(i).dot(&b.column(j)) - temp) / h[j];
                h[i] -= mu[(i, j)].powi(2) * h[j];
            }
        }
        Ok(Self { u: DMatrix::identity(n, n), b, companion, h, mu })
    }

    fn size_reduce(&mut self, k: usize, j: usize) -> Result<()> {
        let c = self.mu[(k, j)].round();
        if c == 0.0 {
            return Ok(());
        }
        if !c.is_finite() || c.abs() >= 9.0e15 {
            return Err(LatticeError::Overflow("RLLL size reduction"));
        }
        let ci = c as i64;

        let col_j = self.b.column(j).into_owned();
        let mut col_k = self.b.column_mut(k);
        col_k -= col_j * c;

        for r in 0..self.u.nrows() {
            let delta = ci.checked_mul(self.u[(r, j)]).ok_or(LatticeError::Overflow("RLLL transform"))?;
            self.u[(r, k)] = self.u[(r, k)].checked_sub(delta).ok_or(LatticeError::Overflow("RLLL transform"))?;
        }
        // dual update: c_j += c c_k
        if let Some(companion) = self.companion.as_mut() {
            let comp_k = companion.column(k).into_owned();
            let mut comp_j = companion.column_mut(j);
            comp_j += comp_k * c;
        }
        for l in 0..j {
            self.mu[(k, l)] -= c * self.mu[(j, l)];
        }
        self.mu[(k, j)] -= c;
        Ok(())
    }

    fn swap(&mut self, k: usize) -> Result<()> {
        let n = self.b.ncols();
        self.b.swap_columns(k, k - 1);
        self.u.swap_columns(k, k - 1);
        if let Some(companion) = self.companion.as_mut() {
            companion.swap_columns(k, k - 1);
        }

        let m = self.mu[(k, k - 1)];
        let big_b = self.h[k] + m * m * self.h[k - 1];
        if !(big_b < self.h[k - 1]) {
            return Err(LatticeError::ReductionNonconvergence(format!(
                "RLLL potential did not decrease at {k}"
            )));
        }
        let m_new = m * self.h[k - 1] / big_b;
        self.h[k] = self.h[k - 1] * self.h[k] / big_b;
        self.h[k - 1] = big_b;
        self.mu[(k, k - 1)] = m_new;
        for j in 0..k.saturating_sub(1) {
            let t = self.mu[(k, j)];
            self.mu[(k, j)] = self.mu[(k - 1, j)];
            self.mu[(k - 1, j)] = t;
        }
        for i in k + 1..n {
            let t = self.mu[(i, k)];
            self.mu[(i, k)] = self.mu[(i, k - 1)] - m * t;
            self.mu[(i, k - 1)] = t + m_new * self.mu[(i, k)];
        }
        Ok(())
    }
}

fn validate_delta(delta: f64) -> Result<()> {
    if !(delta > 0.25 && delta < 1.0) {
        return Err(LatticeError::InvalidInput(format!(
            "RLLL parameter {delta} must lie strictly between 1/4 and 1"
        )));
    }
    Ok(())
}

/// Next permutation in lexicographic order; `false` once `order` is the last.
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(i) = (1..order.len()).rev().find(|&i| order[i - 1] < order[i]) else {
        return false;
    };
    let pivot = i - 1;
    let Some(j) = (i..order.len()).rev().find(|&j| order[j] > order[pivot]) else {
        return false;
    };
    order.swap(pivot, j);
    order[i..].reverse();
    true
}

/// One reduction of `basis` with its columns taken in `order` and divided
/// by `scale`. The transform is relative to the original column order.
fn attempt(
    basis: &DMatrix<f64>,
    companion: Option<&DMatrix<f64>>,
    order: &[usize],
    scale: f64,
    delta: f64,
    max_iterations: usize,
) -> Result<RlllReduction> {
    let n = basis.ncols();
    let permuted = DMatrix::from_fn(basis.nrows(), n, |i, j| basis[(i, order[j])] / scale);
    let permuted_companion = companion.map(|c| DMatrix::from_fn(c.nrows(), n, |i, j| c[(i, order[j])]));
    let mut reducer = Reducer::new(permuted, permuted_companion)?;
    let mut k = 1usize;
    let mut swaps = 0usize;
    let mut iterations = 0usize;

    while k < n {
        iterations += 1;
        if iterations > max_iterations {
            return Err(LatticeError::ReductionNonconvergence(format!(
                "RLLL exceeded {max_iterations} iterations"
            )));
        }
        if reducer.mu[(k, k - 1)].abs() > 0.5 {
            reducer.size_reduce(k, k - 1)?;
        }
        let m = reducer.mu[(k, k - 1)];
        if reducer.h[k] < (delta - m * m) * reducer.h[k - 1] {
            reducer.swap(k)?;
            swaps += 1;
            k = 1.max(k - 1);
        } else {
            for j in (0..k - 1).rev() {
                if reducer.mu[(k, j)].abs() > 0.5 {
                    reducer.size_reduce(k, j)?;
                }
            }
            k += 1;
        }
    }

    // The transform is exact: check it is unimodular and reproduces the basis.
    let permutation = DMatrix::from_fn(n, n, |i, j| i64::from(order[j] == i));
    let transform = checked_mul_dyn(&permutation, &reducer.u)?;
    let det = determinant_dyn(&transform)?;
    if det.abs() != 1 {
        return Err(LatticeError::ReductionNonconvergence(format!(
            "RLLL transform has determinant {det}"
        )));
    }
    let recomputed = basis * transform.map(|v| v as f64);
    let error = (&recomputed - &reducer.b * scale).norm() / basis.norm().max(f64::MIN_POSITIVE);
    if error > ROUND_TOLERANCE {
        return Err(LatticeError::ReductionNonconvergence(format!(
            "RLLL basis drifted from input * U (relative error {error:e})"
        )));
    }
    debug!("RLLL: {} vectors, {} swaps, {} iterations", n, swaps, iterations);

    Ok(RlllReduction { basis: recomputed, transform, companion: reducer.companion, swaps })
}

/// Reduces `basis`, retrying over column orders and then over the input
/// rescaled to unit norm when a run drifts or stalls.
fn run_with_limit(
    basis: &DMatrix<f64>,
    companion: Option<&DMatrix<f64>>,
    delta: f64,
    max_iterations: usize,
) -> Result<RlllReduction> {
    validate_delta(delta)?;
    if basis.ncols() > basis.nrows() {
        return Err(LatticeError::InvalidInput(format!(
            "{} vectors cannot be independent in dimension {}",
            basis.ncols(),
            basis.nrows()
        )));
    }
    if basis.iter().any(|v| !v.is_finite()) {
        return Err(LatticeError::InvalidInput("basis has non-finite entries".into()));
    }

    let norm = basis.norm();
    let mut scales = vec![1.0];
    if norm > 0.0 && norm != 1.0 {
        scales.push(norm);
    }
    let mut last_error = None;
    for scale in scales {
        let mut order: Vec<usize> = (0..basis.ncols()).collect();
        for _ in 0..RLLL_MAX_ORDERINGS {
            match attempt(basis, companion, &order, scale, delta, max_iterations) {
                Ok(reduction) => return Ok(reduction),
                Err(error @ (LatticeError::ReductionNonconvergence(_) | LatticeError::Overflow(_))) => {
                    debug!("RLLL retry after order {:?}, scale {:e}: {}", order, scale, error);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
            if !next_permutation(&mut order) {
                break;
            }
        }
    }
    Err(last_error.unwrap_or_else(|| LatticeError::ReductionNonconvergence("RLLL made no attempt".into())))
}

fn run(basis: &DMatrix<f64>, companion: Option<&DMatrix<f64>>, delta: f64) -> Result<RlllReduction> {
    run_with_limit(basis, companion, delta, RLLL_MAX_ITERATIONS)
}

/// Reduces the columns of a real `dim x n` basis (`n <= dim`).
pub fn rlll_reduce(basis: &DMatrix<f64>, delta: f64) -> Result<RlllReduction> {
    run(basis, None, delta)
}

/// Reduces `basis` and applies the contragredient operations to `companion`,
/// so a dual pair `basis^T companion = I` stays dual.
pub fn rlll_reduce_with_companion(
    basis: &DMatrix<f64>,
    companion: &DMatrix<f64>,
    delta: f64,
) -> Result<RlllReduction> {
    if companion.shape() != basis.shape() {
        return Err(LatticeError::InvalidInput("companion basis must have the same shape".into()));
    }
    run(basis, Some(companion), delta)
}

/// Square fixed-size convenience wrapper.
pub fn rlll_reduce_square<const D: usize>(
    basis: &RealMatrix<D>,
    delta: f64,
) -> Result<(RealMatrix<D>, IntMatrix<D>)> {
    let dynamic = DMatrix::from_column_slice(D, D, basis.as_slice());
    let reduction = rlll_reduce(&dynamic, delta)?;
    Ok((
        RealMatrix::<D>::from_column_slice(reduction.basis.as_slice()),
        IntMatrix::<D>::from_column_slice(reduction.transform.as_slice()),
    ))
}
