//! Scalar and slice gcd/lcm over `i64`.
//!
//! Results follow the usual conventions: `gcd` is never negative,
//! `gcd(0, n) = |n|`, `gcd(0, 0) = 0` and `lcm(0, n) = 0`.
//! The magnitude `2^63` is not representable, so `i64::MIN` is outside the
//! domain of every function here.

use crate::error::{LatticeError, Result};

/// Greatest common divisor (Euclidean algorithm), always non-negative.
pub fn gcd(a: i64, b: i64) -> i64 {
    let mut a = a.unsigned_abs();
    let mut b = b.unsigned_abs();
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a as i64
}

/// Pairwise gcd over a slice. The gcd of an empty slice is 0.
pub fn gcd_slice(values: &[i64]) -> i64 {
    let mut g = 0;
    for &v in values {
        g = gcd(g, v);
        if g == 1 {
            break;
        }
    }
    g
}

pub(crate) fn gcd_i128(a: i128, b: i128) -> i128 {
    let mut a = a.abs();
    let mut b = b.abs();
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

/// Least common multiple, non-negative. Fails with `Overflow` when `|a b| / g`
/// does not fit in `i64`.
pub fn lcm(a: i64, b: i64) -> Result<i64> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    let g = gcd(a, b);
    (a / g)
        .checked_mul(b)
        .map(i64::abs)
        .ok_or(LatticeError::Overflow("lcm"))
}

/// Pairwise lcm over a slice. The lcm of an empty slice is 1.
pub fn lcm_slice(values: &[i64]) -> Result<i64> {
    values.iter().try_fold(1, |acc, &v| lcm(acc, v))
}

/// Returns `(g, x, y)` with `a x + b y = g = gcd(a, b)` and `g >= 0`.
///
/// The coefficients satisfy `|x| <= |b| / g` and `|y| <= |a| / g` whenever
/// both inputs are non-zero.
pub fn extended_gcd(a: i64, b: i64) -> (i64, i64, i64) {
    let (mut old_r, mut r) = (a as i128, b as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    let (mut old_t, mut t) = (0i128, 1i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
        (old_t, t) = (t, old_t - q * t);
    }
    if old_r < 0 {
        old_r = -old_r;
        old_s = -old_s;
        old_t = -old_t;
    }
    (old_r as i64, old_s as i64, old_t as i64)
}

/// Remainder in `[0, |m|)`.
pub fn positive_modulo(a: i64, m: i64) -> Result<i64> {
    if m == 0 {
        return Err(LatticeError::DivisionByZero);
    }
    Ok(a.rem_euclid(m))
}

pub fn sgn(a: i64) -> i64 {
    a.signum()
}
