//! Linear Diophantine equations over `i64`.

use nalgebra::SVector;

use crate::error::{LatticeError, Result};
use crate::math::integer_math::{extended_gcd, gcd_slice};

/// Solution family of `a x + b y = c`:
/// `(x + step_x t, y - step_y t)` for every integer `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiophantineSolution {
    pub x: i64,
    pub y: i64,
    /// `b / g`
    pub step_x: i64,
    /// `a / g`
    pub step_y: i64,
}

impl DiophantineSolution {
    /// Member `t` of the family.
    pub fn at(&self, t: i64) -> Result<(i64, i64)> {
        let x = self
            .step_x
            .checked_mul(t)
            .and_then(|s| self.x.checked_add(s))
            .ok_or(LatticeError::Overflow("diophantine family"))?;
        let y = self
            .step_y
            .checked_mul(t)
            .and_then(|s| self.y.checked_sub(s))
            .ok_or(LatticeError::Overflow("diophantine family"))?;
        Ok((x, y))
    }
}

fn narrow(v: i128) -> Result<i64> {
    i64::try_from(v).map_err(|_| LatticeError::Overflow("diophantine solve"))
}

/// Solves `a x + b y = c`.
///
/// Fails with `NoSolution` exactly when `gcd(a, b)` does not divide `c`
/// (for `a = b = 0` that means `c != 0`). The particular solution returned has
/// `x` reduced into `[0, |b/g|)` when `b != 0`, which keeps it small.
pub fn solve_two_variables(a: i64, b: i64, c: i64) -> Result<DiophantineSolution> {
    let (g, u, _) = extended_gcd(a, b);
    if g == 0 {
        if c == 0 {
            return Ok(DiophantineSolution { x: 0, y: 0, step_x: 0, step_y: 0 });
        }
        return Err(LatticeError::NoSolution(format!("0 x + 0 y = {c}")));
    }
    if c % g != 0 {
        return Err(LatticeError::NoSolution(format!(
            "gcd({a}, {b}) = {g} does not divide {c}"
        )));
    }
    let (a, b, c, g) = (a as i128, b as i128, c as i128, g as i128);
    let step_x = b / g;
    let step_y = a / g;
    let mut x = u as i128 * (c / g);
    if step_x != 0 {
        x = x.rem_euclid(step_x.abs());
    }
    // Either b divides c - a x, or b = 0 and then a = ±g divides c.
    let y = if b != 0 { (c - a * x) / b } else { 0 };
    let x = if b == 0 { c / a } else { x };

    Ok(DiophantineSolution {
        x: narrow(x)?,
        y: narrow(y)?,
        step_x: narrow(step_x)?,
        step_y: narrow(step_y)?,
    })
}

/// Finds `u` with `a_1 u_1 + ... + a_n u_n = 1`.
///
/// The gcd of the pair `(a_1, a_2)` is folded with `a_3`, and so on, scaling
/// the earlier coefficients by each new Bézout multiplier.
pub fn solve_bezout(a: &[i64]) -> Result<Vec<i64>> {
    if a.is_empty() {
        return Err(LatticeError::InvalidInput("Bezout identity needs at least one coefficient".into()));
    }
    if gcd_slice(a) != 1 {
        return Err(LatticeError::NoSolution(format!("gcd of {a:?} is not 1")));
    }
    let mut u = vec![a[0].signum()];
    let mut g = a[0].abs();
    for &ai in &a[1..] {
        let (next, p, q) = extended_gcd(g, ai);
        for coefficient in u.iter_mut() {
            *coefficient = coefficient
                .checked_mul(p)
                .ok_or(LatticeError::Overflow("Bezout coefficients"))?;
        }
        u.push(q);
        g = next;
    }
    Ok(u)
}

/// Finds `x` with `a_1 x_1 + ... + a_n x_n = c`.
pub fn solve_linear(a: &[i64], c: i64) -> Result<Vec<i64>> {
    let g = gcd_slice(a);
    if g == 0 {
        if c == 0 {
            return Ok(vec![0; a.len()]);
        }
        return Err(LatticeError::NoSolution(format!("all coefficients vanish but c = {c}")));
    }
    if c % g != 0 {
        return Err(LatticeError::NoSolution(format!("gcd {g} of {a:?} does not divide {c}")));
    }
    let reduced: Vec<i64> = a.iter().map(|ai| ai / g).collect();
    let scale = c / g;
    solve_bezout(&reduced)?
        .into_iter()
        .map(|u| u.checked_mul(scale).ok_or(LatticeError::Overflow("linear diophantine")))
        .collect()
}

/// Solves `a_i x_i + b_i y_i = c_i` independently for every component.
pub fn solve_diagonal<const D: usize>(
    a: &SVector<i64, D>,
    b: &SVector<i64, D>,
    c: &SVector<i64, D>,
) -> Result<(SVector<i64, D>, SVector<i64, D>)> {
    let mut x = SVector::<i64, D>::zeros();
    let mut y = SVector::<i64, D>::zeros();
    for i in 0..D {
        let solution = solve_two_variables(a[i], b[i], c[i])?;
        x[i] = solution.x;
        y[i] = solution.y;
    }
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_variable_solution_and_family() {
        let s = solve_two_variables(12, 18, 30).unwrap();
        assert_eq!(12 * s.x + 18 * s.y, 30);
        assert_eq!((s.step_x, s.step_y), (3, 2));
        for t in -3..=3 {
            let (x, y) = s.at(t).unwrap();
            assert_eq!(12 * x + 18 * y, 30);
        }
    }

    #[test]
    fn no_solution_when_gcd_does_not_divide() {
        assert!(matches!(solve_two_variables(4, 6, 5), Err(LatticeError::NoSolution(_))));
        assert!(matches!(solve_two_variables(0, 0, 1), Err(LatticeError::NoSolution(_))));
        assert!(solve_two_variables(0, 0, 0).is_ok());
    }

    #[test]
    fn degenerate_coefficients() {
        let s = solve_two_variables(0, -3, 9).unwrap();
        assert_eq!(-3 * s.y, 9);
        let s = solve_two_variables(-5, 0, 10).unwrap();
        assert_eq!(-5 * s.x, 10);
    }

    #[test]
    fn bezout_in_several_variables() {
        let a = [6, 10, 15, -7, 0];
        let u = solve_bezout(&a).unwrap();
        let sum: i64 = a.iter().zip(&u).map(|(x, y)| x * y).sum();
        assert_eq!(sum, 1);
        assert!(matches!(solve_bezout(&[4, 6]), Err(LatticeError::NoSolution(_))));
    }

    #[test]
    fn linear_and_diagonal() {
        let x = solve_linear(&[4, 6, 10], 8).unwrap();
        assert_eq!(4 * x[0] + 6 * x[1] + 10 * x[2], 8);

        let a = SVector::<i64, 2>::new(5, 1);
        let b = SVector::<i64, 2>::new(-1, -5);
        let c = SVector::<i64, 2>::new(-1, -1);
        let (x, y) = solve_diagonal(&a, &b, &c).unwrap();
        for i in 0..2 {
            assert_eq!(a[i] * x[i] + b[i] * y[i], c[i]);
        }
    }
}
