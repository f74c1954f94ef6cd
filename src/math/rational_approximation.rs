//! Continued-fraction approximation of reals by fractions with bounded
//! denominators, and Farey/Stern-Brocot enumeration of small fractions.

use nalgebra::SVector;

use crate::error::{LatticeError, Result};
use crate::math::integer_math::{gcd_slice, lcm};
use crate::math::rational::Rational;

/// Largest magnitude whose integer part still fits in `i64`.
const MAX_APPROXIMABLE: f64 = 9.0e18;

/// Best rational approximation of `x` with denominator at most `max_denominator`.
///
/// Walks the convergents `p_n / q_n` of the continued fraction of `x` until the
/// next denominator would exceed the bound, then compares the last convergent
/// with the largest admissible semiconvergent. Ties go to the convergent.
pub fn best_rational_approximation(x: f64, max_denominator: i64) -> Result<Rational> {
    if !x.is_finite() {
        return Err(LatticeError::InvalidInput(format!("cannot approximate non-finite value {x}")));
    }
    if x.abs() >= MAX_APPROXIMABLE {
        return Err(LatticeError::InvalidInput(format!("value {x} is too large to approximate")));
    }
    if max_denominator < 1 {
        return Err(LatticeError::InvalidInput(format!(
            "max_denominator must be at least 1, got {max_denominator}"
        )));
    }

    let target = x.abs();
    let bound = max_denominator as i128;
    let (mut p0, mut q0, mut p1, mut q1) = (0i128, 1i128, 1i128, 0i128);
    let mut r = target;
    let mut exact = false;

    loop {
        let a = r.floor();
        if q1 > 0 && a > ((bound - q0) / q1) as f64 {
            break;
        }
        let a = a as i128;
        (p0, q0, p1, q1) = (p1, q1, p0 + a * p1, q0 + a * q1);
        let frac = r - r.floor();
        if frac == 0.0 {
            exact = true;
            break;
        }
        r = 1.0 / frac;
    }

    let (p, q) = if exact {
        (p1, q1)
    } else {
        let k = (bound - q0) / q1;
        let semi = (p0 + k * p1, q0 + k * q1);
        let error_convergent = (p1 as f64 / q1 as f64 - target).abs();
        let error_semi = (semi.0 as f64 / semi.1 as f64 - target).abs();
        if error_convergent <= error_semi {
            (p1, q1)
        } else {
            semi
        }
    };

    let p = if x < 0.0 { -p } else { p };
    Rational::from_wide(p, q)
}

/// Mediant state of the Stern-Brocot traversal: the current left fraction
/// `n / d` and the right neighbour `upper_n / upper_d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub n: i64,
    pub d: i64,
    pub upper_n: i64,
    pub upper_d: i64,
}

impl Fraction {
    pub fn new(n: i64, d: i64, upper_n: i64, upper_d: i64) -> Self {
        Self { n, d, upper_n, upper_d }
    }

    pub fn mediant(&self) -> (i64, i64) {
        (self.n + self.upper_n, self.d + self.upper_d)
    }
}

fn push_symmetric(output: &mut Vec<(i64, i64)>, n: i64, d: i64) {
    output.push((n, d));
    if n != 0 {
        output.push((-n, d));
    }
    if d != 0 {
        output.push((n, -d));
    }
    if n != 0 && d != 0 {
        output.push((-n, -d));
    }
    output.push((d, n));
    if n != 0 {
        output.push((d, -n));
    }
    if d != 0 {
        output.push((-d, n));
    }
    if n != 0 && d != 0 {
        output.push((-d, -n));
    }
}

/// Coprime pairs `(n, d)` with `0 <= n / d <= 1` and `d <= limit`, ordered as
/// the Stern-Brocot traversal visits them and ending with `(1, 1)`.
///
/// Without `first_quadrant` every pair is expanded by sign changes and by the
/// swap `(d, n)`, giving primitive pairs in all directions of the plane.
/// `(1, 1)` is expanded the same way.
pub fn farey(limit: i64, first_quadrant: bool) -> Result<Vec<(i64, i64)>> {
    if limit < 1 {
        return Err(LatticeError::InvalidInput(format!("farey limit must be at least 1, got {limit}")));
    }
    let mut pending: Vec<Fraction> = Vec::new();
    let mut output = Vec::new();
    let mut state = Fraction::new(0, 1, 1, 1);

    loop {
        let (mediant_n, mediant_d) = state.mediant();
        if mediant_d <= limit {
            pending.push(Fraction::new(mediant_n, mediant_d, state.upper_n, state.upper_d));
            state.upper_n = mediant_n;
            state.upper_d = mediant_d;
        } else {
            if first_quadrant {
                output.push((state.n, state.d));
            } else {
                push_symmetric(&mut output, state.n, state.d);
            }
            match pending.pop() {
                Some(next) => state = next,
                None => break,
            }
        }
    }

    if first_quadrant {
        output.push((1, 1));
    } else {
        output.extend_from_slice(&[(1, 1), (-1, 1), (1, -1), (-1, -1)]);
    }
    Ok(output)
}

/// Every fraction with denominator at most `max_denominator` lying within
/// `tolerance` of `x`, sorted by value.
pub fn rational_approximations(x: f64, max_denominator: i64, tolerance: f64) -> Result<Vec<Rational>> {
    if !x.is_finite() || x.abs() >= MAX_APPROXIMABLE {
        return Err(LatticeError::InvalidInput(format!("cannot approximate {x}")));
    }
    if !(tolerance >= 0.0) {
        return Err(LatticeError::InvalidInput(format!("tolerance must be non-negative, got {tolerance}")));
    }
    let floor = x.floor();
    let offset = floor as i64;
    let fractional = x - floor;

    let mut approximations = Vec::new();
    for (n, d) in farey(max_denominator, false)? {
        if d <= 0 {
            continue;
        }
        if (fractional - n as f64 / d as f64).abs() <= tolerance {
            let shifted = (n as i128) + (offset as i128) * (d as i128);
            approximations.push(Rational::from_wide(shifted, d as i128)?);
        }
    }
    approximations.sort();
    approximations.dedup();
    Ok(approximations)
}

/// Integer vector parallel to the real vector `v`.
///
/// Each component is normalized by the largest magnitude, approximated with
/// denominator at most `max_denominator`, scaled by the lcm of denominators
/// and finally divided by the gcd of the result.
pub fn rational_direction<const D: usize>(v: &SVector<f64, D>, max_denominator: i64) -> Result<SVector<i64, D>> {
    let scale = v.amax();
    if !scale.is_finite() {
        return Err(LatticeError::InvalidInput("direction has non-finite components".into()));
    }
    if scale == 0.0 {
        return Err(LatticeError::InvalidInput("cannot take the direction of a zero vector".into()));
    }
    let mut fractions = Vec::with_capacity(D);
    for value in v.iter() {
        fractions.push(best_rational_approximation(value / scale, max_denominator)?);
    }
    let mut common = 1;
    for q in &fractions {
        common = lcm(common, q.denominator())?;
    }
    let mut out = SVector::<i64, D>::zeros();
    for (i, q) in fractions.iter().enumerate() {
        out[i] = q
            .numerator()
            .checked_mul(common / q.denominator())
            .ok_or(LatticeError::Overflow("rational direction"))?;
    }
    let g = gcd_slice(out.as_slice());
    if g > 1 {
        out /= g;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_error(x: f64, max_den: i64) -> f64 {
        let mut best = f64::INFINITY;
        for q in 1..=max_den {
            let p = (x * q as f64).round();
            for candidate in [p - 1.0, p, p + 1.0] {
                best = best.min((x - candidate / q as f64).abs());
            }
        }
        best
    }

    #[test]
    fn matches_brute_force_for_small_denominators() {
        let samples = [
            std::f64::consts::PI,
            -std::f64::consts::E,
            0.1,
            0.3333,
            1.0 / 7.0,
            2.71,
            -0.999,
            0.5,
            123.456,
        ];
        for &x in &samples {
            for max_den in 1..=30 {
                let q = best_rational_approximation(x, max_den).unwrap();
                assert!(q.denominator() <= max_den);
                let err = (x - q.to_f64()).abs();
                assert!(err <= brute_force_error(x, max_den) + 1e-12, "x={x} max_den={max_den} got {q}");
            }
        }
    }

    #[test]
    fn known_approximations() {
        let pi = best_rational_approximation(std::f64::consts::PI, 1000).unwrap();
        assert_eq!((pi.numerator(), pi.denominator()), (355, 113));
        let third = best_rational_approximation(1.0 / 3.0, 100).unwrap();
        assert_eq!((third.numerator(), third.denominator()), (1, 3));
        assert_eq!(best_rational_approximation(-2.0, 5).unwrap(), Rational::new(-2, 1).unwrap());
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(best_rational_approximation(f64::NAN, 10), Err(LatticeError::InvalidInput(_))));
        assert!(matches!(best_rational_approximation(f64::INFINITY, 10), Err(LatticeError::InvalidInput(_))));
        assert!(matches!(best_rational_approximation(0.5, 0), Err(LatticeError::InvalidInput(_))));
    }

    #[test]
    fn farey_first_quadrant_lists_reduced_fractions() {
        let seq = farey(5, true).unwrap();
        // |F_5| = 11 including 0/1 and 1/1
        assert_eq!(seq.len(), 11);
        assert_eq!(seq.first(), Some(&(0, 1)));
        assert_eq!(seq.last(), Some(&(1, 1)));
        for &(n, d) in &seq {
            assert!(d <= 5 && n <= d);
            assert_eq!(crate::math::integer_math::gcd(n, d), 1);
        }
    }

    #[test]
    fn farey_full_plane_is_symmetric() {
        let seq = farey(3, false).unwrap();
        for &(n, d) in &seq {
            assert!(seq.contains(&(-n, d)));
            assert!(seq.contains(&(d, n)));
        }
    }

    #[test]
    fn approximations_within_tolerance() {
        let list = rational_approximations(2.5, 4, 0.1).unwrap();
        assert!(list.contains(&Rational::new(5, 2).unwrap()));
        for q in &list {
            assert!((q.to_f64() - 2.5).abs() <= 0.1 + 1e-12);
            assert!(q.denominator() <= 4);
        }
    }

    #[test]
    fn direction_is_primitive() {
        let v = SVector::<f64, 3>::new(0.5, -1.0, 1.5);
        assert_eq!(rational_direction(&v, 100).unwrap(), SVector::<i64, 3>::new(1, -2, 3));
    }
}
