use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

use crate::error::{LatticeError, Result};
use crate::math::integer_math::gcd_i128;

/// A fraction kept in lowest terms with a positive denominator.
///
/// Arithmetic is carried out in `i128` and narrowed back, so every
/// operation either returns the exact reduced result or `Overflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    n: i64,
    d: i64,
}

impl Rational {
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        Self::from_wide(numerator as i128, denominator as i128)
    }

    pub fn from_integer(n: i64) -> Result<Self> {
        Self::new(n, 1)
    }

    pub fn zero() -> Self {
        Self { n: 0, d: 1 }
    }

    pub fn one() -> Self {
        Self { n: 1, d: 1 }
    }

    pub(crate) fn from_wide(n: i128, d: i128) -> Result<Self> {
        if d == 0 {
            return Err(LatticeError::DivisionByZero);
        }
        let g = gcd_i128(n, d).max(1);
        let sign = if d < 0 { -1 } else { 1 };
        let n = sign * n / g;
        let d = sign * d / g;
        let n = i64::try_from(n).map_err(|_| LatticeError::Overflow("rational arithmetic"))?;
        let d = i64::try_from(d).map_err(|_| LatticeError::Overflow("rational arithmetic"))?;
        if n == i64::MIN {
            return Err(LatticeError::Overflow("rational arithmetic"));
        }
        Ok(Self { n, d })
    }

    pub fn numerator(&self) -> i64 {
        self.n
    }

    pub fn denominator(&self) -> i64 {
        self.d
    }

    pub fn is_zero(&self) -> bool {
        self.n == 0
    }

    pub fn is_integer(&self) -> bool {
        self.d == 1
    }

    pub fn to_f64(&self) -> f64 {
        self.n as f64 / self.d as f64
    }

    pub fn abs(&self) -> Self {
        Self { n: self.n.abs(), d: self.d }
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        let (a, b, c, d) = self.wide(other);
        Self::from_wide(a * d + c * b, b * d)
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.checked_add(&-*other)
    }

    pub fn checked_mul(&self, other: &Self) -> Result<Self> {
        let (a, b, c, d) = self.wide(other);
        Self::from_wide(a * c, b * d)
    }

    pub fn checked_div(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(LatticeError::DivisionByZero);
        }
        let (a, b, c, d) = self.wide(other);
        Self::from_wide(a * d, b * c)
    }

    fn wide(&self, other: &Self) -> (i128, i128, i128, i128) {
        (self.n as i128, self.d as i128, other.n as i128, other.d as i128)
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        // i64::MIN is never stored, so negation cannot overflow.
        Rational { n: -self.n, d: self.d }
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, c, d) = self.wide(other);
        (a * d).cmp(&(c * b))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.d == 1 {
            write!(f, "{}", self.n)
        } else {
            write!(f, "{}/{}", self.n, self.d)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d).unwrap()
    }

    #[test]
    fn construction_reduces_and_normalizes_sign() {
        let q = r(6, -8);
        assert_eq!((q.numerator(), q.denominator()), (-3, 4));
        assert_eq!(r(0, -5), Rational::zero());
        assert_eq!(Rational::new(1, 0), Err(LatticeError::DivisionByZero));
    }

    #[test]
    fn arithmetic_stays_in_lowest_terms() {
        assert_eq!(r(1, 6).checked_add(&r(1, 3)).unwrap(), r(1, 2));
        assert_eq!(r(1, 6).checked_sub(&r(1, 6)).unwrap(), Rational::zero());
        assert_eq!(r(2, 3).checked_mul(&r(9, 4)).unwrap(), r(3, 2));
        assert_eq!(r(2, 3).checked_div(&r(-4, 9)).unwrap(), r(-3, 2));
        assert_eq!(r(2, 3).checked_div(&Rational::zero()), Err(LatticeError::DivisionByZero));
    }

    #[test]
    fn overflow_is_reported() {
        let big = r(i64::MAX, 1);
        assert!(matches!(big.checked_add(&big), Err(LatticeError::Overflow(_))));
    }

    #[test]
    fn ordering_and_display() {
        assert!(r(1, 3) < r(1, 2));
        assert!(r(-1, 2) < r(-1, 3));
        assert_eq!(r(-3, 4).to_string(), "-3/4");
        assert_eq!(r(8, 4).to_string(), "2");
    }
}
