use crate::config::ROUND_TOLERANCE;
use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{IntMatrix, RealMatrix};
use crate::math::integer_math::{gcd, gcd_slice, lcm};
use crate::math::rational_approximation::best_rational_approximation;

/// A real matrix known to be rational, stored as `integer_matrix / mu` with
/// `mu > 0` and `gcd(entries, mu) = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RationalMatrix<const D: usize> {
    integer_matrix: IntMatrix<D>,
    mu: i64,
}

impl<const D: usize> RationalMatrix<D> {
    /// Approximates every entry of `m` with denominator at most
    /// `max_denominator` and brings them over the lcm of the denominators.
    ///
    /// Fails when the mean entry error exceeds `ROUND_TOLERANCE`, which means
    /// `m` is not rational at that denominator bound.
    pub fn from_real(m: &RealMatrix<D>, max_denominator: i64) -> Result<Self> {
        let (rational, error) = Self::approximate(m, max_denominator)?;
        if error > ROUND_TOLERANCE {
            return Err(LatticeError::InvalidInput(format!(
                "matrix is not rational with denominators up to {max_denominator} (error {error:e})"
            )));
        }
        Ok(rational)
    }

    /// Entry-wise approximation without the acceptance check, together with
    /// the mean entry error.
    pub fn approximate(m: &RealMatrix<D>, max_denominator: i64) -> Result<(Self, f64)> {
        let mut fractions = Vec::with_capacity(D * D);
        let mut mu = 1i64;
        for value in m.iter() {
            let q = best_rational_approximation(*value, max_denominator)?;
            mu = lcm(mu, q.denominator())?;
            fractions.push(q);
        }
        let mut integer_matrix = IntMatrix::<D>::zeros();
        for (k, q) in fractions.iter().enumerate() {
            integer_matrix[k] = q
                .numerator()
                .checked_mul(mu / q.denominator())
                .ok_or(LatticeError::Overflow("rational matrix"))?;
        }
        let approx = integer_matrix.map(|v| v as f64) / mu as f64;
        let error = (approx - m).norm() / (D * D) as f64;
        Ok((Self { integer_matrix, mu }, error))
    }

    /// Entry-wise fractions `numerators[i,j] / denominators[i,j]`.
    pub fn from_fractions(numerators: &IntMatrix<D>, denominators: &IntMatrix<D>) -> Result<Self> {
        if denominators.iter().any(|d| *d == 0) {
            return Err(LatticeError::DivisionByZero);
        }
        let mut reduced_n = *numerators;
        let mut reduced_d = *denominators;
        for k in 0..D * D {
            let g = gcd(numerators[k], denominators[k]);
            let s = denominators[k].signum();
            reduced_n[k] = s * numerators[k] / g;
            reduced_d[k] = s * denominators[k] / g;
        }
        let mut mu = 1i64;
        for d in reduced_d.iter() {
            mu = lcm(mu, *d)?;
        }
        let mut integer_matrix = IntMatrix::<D>::zeros();
        for k in 0..D * D {
            integer_matrix[k] = reduced_n[k]
                .checked_mul(mu / reduced_d[k])
                .ok_or(LatticeError::Overflow("rational matrix"))?;
        }
        Ok(Self { integer_matrix, mu })
    }

    /// `integer_matrix / mu`, reduced to lowest terms.
    pub fn from_scaled(integer_matrix: &IntMatrix<D>, mu: i64) -> Result<Self> {
        if mu == 0 {
            return Err(LatticeError::DivisionByZero);
        }
        let g = gcd(gcd_slice(integer_matrix.as_slice()), mu);
        let s = mu.signum();
        Ok(Self { integer_matrix: integer_matrix * (s) / g, mu: s * mu / g })
    }

    pub fn integer_matrix(&self) -> &IntMatrix<D> {
        &self.integer_matrix
    }

    pub fn mu(&self) -> i64 {
        self.mu
    }

    pub fn as_real(&self) -> RealMatrix<D> {
        self.integer_matrix.map(|v| v as f64) / self.mu as f64
    }

    pub fn is_integral(&self) -> bool {
        self.mu == 1
    }
}
