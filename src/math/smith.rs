//! Smith normal form of square integer matrices.

use log::debug;

use crate::error::{LatticeError, Result};
use crate::math::int_matrix::{checked_mul, IntMatrix, IntVector};
use crate::math::integer_math::extended_gcd;

type Block = [[i64; 2]; 2];

const SWAP: Block = [[0, 1], [1, 0]];

fn overflow() -> LatticeError {
    LatticeError::Overflow("Smith decomposition")
}

fn combine(x: i64, cx: i64, y: i64, cy: i64) -> Result<i64> {
    let v = x as i128 * cx as i128 + y as i128 * cy as i128;
    i64::try_from(v).map_err(|_| overflow())
}

/// `(row_i, row_j) <- l * (row_i, row_j)`
fn mix_rows<const D: usize>(m: &mut IntMatrix<D>, i: usize, j: usize, l: &Block) -> Result<()> {
    for c in 0..D {
        let (mi, mj) = (m[(i, c)], m[(j, c)]);
        m[(i, c)] = combine(mi, l[0][0], mj, l[0][1])?;
        m[(j, c)] = combine(mi, l[1][0], mj, l[1][1])?;
    }
    Ok(())
}

/// `(col_i, col_j) <- (col_i, col_j) * r`
fn mix_cols<const D: usize>(m: &mut IntMatrix<D>, i: usize, j: usize, r: &Block) -> Result<()> {
    for row in 0..D {
        let (mi, mj) = (m[(row, i)], m[(row, j)]);
        m[(row, i)] = combine(mi, r[0][0], mj, r[1][0])?;
        m[(row, j)] = combine(mi, r[0][1], mj, r[1][1])?;
    }
    Ok(())
}

/// Working state. Invariants: `u a0 v = a`, `u x = I`, `v y = I`.
struct Workspace<const D: usize> {
    a: IntMatrix<D>,
    u: IntMatrix<D>,
    v: IntMatrix<D>,
    x: IntMatrix<D>,
    y: IntMatrix<D>,
}

impl<const D: usize> Workspace<D> {
    fn rows(&mut self, i: usize, j: usize, l: &Block, l_inv: &Block) -> Result<()> {
        mix_rows(&mut self.a, i, j, l)?;
        mix_rows(&mut self.u, i, j, l)?;
        mix_cols(&mut self.x, i, j, l_inv)
    }

    fn cols(&mut self, i: usize, j: usize, r: &Block, r_inv: &Block) -> Result<()> {
        mix_cols(&mut self.a, i, j, r)?;
        mix_cols(&mut self.v, i, j, r)?;
        mix_rows(&mut self.y, i, j, r_inv)
    }

    /// `row_i += c row_j`
    fn add_row(&mut self, i: usize, j: usize, c: i64) -> Result<()> {
        let neg = c.checked_neg().ok_or_else(overflow)?;
        self.rows(i, j, &[[1, c], [0, 1]], &[[1, neg], [0, 1]])
    }

    /// `col_j += c col_i`
    fn add_col(&mut self, j: usize, i: usize, c: i64) -> Result<()> {
        let neg = c.checked_neg().ok_or_else(overflow)?;
        self.cols(i, j, &[[1, c], [0, 1]], &[[1, neg], [0, 1]])
    }

    fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        if i == j {
            return Ok(());
        }
        self.rows(i, j, &SWAP, &SWAP)
    }

    fn swap_cols(&mut self, i: usize, j: usize) -> Result<()> {
        if i == j {
            return Ok(());
        }
        self.cols(i, j, &SWAP, &SWAP)
    }

    fn negate_row(&mut self, i: usize) {
        for c in 0..D {
            self.a[(i, c)] = -self.a[(i, c)];
            self.u[(i, c)] = -self.u[(i, c)];
            self.x[(c, i)] = -self.x[(c, i)];
        }
    }

    /// Smallest non-zero magnitude in the trailing block starting at `t`.
    fn pivot(&self, t: usize) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize, u64)> = None;
        for j in t..D {
            for i in t..D {
                let value = self.a[(i, j)].unsigned_abs();
                if value != 0 && best.map_or(true, |(_, _, b)| value < b) {
                    best = Some((i, j, value));
                }
            }
        }
        best.map(|(i, j, _)| (i, j))
    }

    /// Euclidean elimination: diagonalizes without enforcing divisibility.
    fn diagonalize(&mut self) -> Result<()> {
        for t in 0..D {
            loop {
                let Some((pi, pj)) = self.pivot(t) else {
                    return Ok(());
                };
                self.swap_rows(t, pi)?;
                self.swap_cols(t, pj)?;
                let p = self.a[(t, t)];
                for i in t + 1..D {
                    let q = self.a[(i, t)] / p;
                    if q != 0 {
                        self.add_row(i, t, -q)?;
                    }
                }
                for j in t + 1..D {
                    let q = self.a[(t, j)] / p;
                    if q != 0 {
                        self.add_col(j, t, -q)?;
                    }
                }
                let clean = (t + 1..D).all(|k| self.a[(k, t)] == 0 && self.a[(t, k)] == 0);
                if clean {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Replaces `(d_i, d_j)` by `(gcd, lcm)` with one unimodular transform on
    /// each side.
    fn merge(&mut self, i: usize, j: usize) -> Result<()> {
        let (a, b) = (self.a[(i, i)], self.a[(j, j)]);
        let (g, p, q) = extended_gcd(a, b);
        let (ag, bg) = (a / g, b / g);
        let qb = q.checked_mul(bg).ok_or_else(overflow)?;
        let pa = p.checked_mul(ag).ok_or_else(overflow)?;
        self.rows(i, j, &[[p, q], [-bg, ag]], &[[ag, -q], [bg, p]])?;
        self.cols(i, j, &[[1, -qb], [1, pa]], &[[pa, qb], [-1, 1]])?;
        Ok(())
    }

    fn enforce_divisibility(&mut self) -> Result<()> {
        // zeros go last
        for i in 0..D {
            if self.a[(i, i)] == 0 {
                if let Some(j) = (i + 1..D).find(|&j| self.a[(j, j)] != 0) {
                    self.swap_rows(i, j)?;
                    self.swap_cols(i, j)?;
                }
            }
        }
        let mut merges = 0usize;
        for i in 0..D {
            for j in i + 1..D {
                let (a, b) = (self.a[(i, i)], self.a[(j, j)]);
                if a != 0 && b % a != 0 {
                    self.merge(i, j)?;
                    merges += 1;
                }
            }
            if self.a[(i, i)] < 0 {
                self.negate_row(i);
            }
        }
        debug!("Smith decomposition: {} gcd merges", merges);
        Ok(())
    }
}

/// `U A V = D` with `D` diagonal, `d_1 | d_2 | ... | d_n`, `d_i >= 0` and `U`,
/// `V` unimodular. The inverses `X = U^-1` and `Y = V^-1` are tracked
/// alongside, so `A = X D Y`.
///
/// Singular input is accepted; its zero invariants are placed last.
#[derive(Debug, Clone, PartialEq)]
pub struct SmithDecomposition<const D: usize> {
    a: IntMatrix<D>,
    u: IntMatrix<D>,
    d: IntMatrix<D>,
    v: IntMatrix<D>,
    x: IntMatrix<D>,
    y: IntMatrix<D>,
}

impl<const D: usize> SmithDecomposition<D> {
    pub fn new(a: &IntMatrix<D>) -> Result<Self> {
        let mut ws = Workspace {
            a: *a,
            u: IntMatrix::<D>::identity(),
            v: IntMatrix::<D>::identity(),
            x: IntMatrix::<D>::identity(),
            y: IntMatrix::<D>::identity(),
        };
        ws.diagonalize()?;
        ws.enforce_divisibility()?;

        let decomposition = Self { a: *a, u: ws.u, d: ws.a, v: ws.v, x: ws.x, y: ws.y };
        decomposition.verify()?;
        Ok(decomposition)
    }

    fn verify(&self) -> Result<()> {
        let identity = IntMatrix::<D>::identity();
        let uav = checked_mul(&checked_mul(&self.u, &self.a)?, &self.v)?;
        let chain = (1..D).all(|i| {
            let (prev, next) = (self.d[(i - 1, i - 1)], self.d[(i, i)]);
            if prev == 0 { next == 0 } else { next % prev == 0 }
        });
        if uav != self.d
            || !self.d.is_diagonal_exact()
            || !chain
            || checked_mul(&self.u, &self.x)? != identity
            || checked_mul(&self.v, &self.y)? != identity
        {
            return Err(LatticeError::ReductionNonconvergence(
                "Smith decomposition failed its consistency check".into(),
            ));
        }
        Ok(())
    }

    pub fn matrix_a(&self) -> &IntMatrix<D> {
        &self.a
    }

    pub fn matrix_u(&self) -> &IntMatrix<D> {
        &self.u
    }

    pub fn matrix_d(&self) -> &IntMatrix<D> {
        &self.d
    }

    pub fn matrix_v(&self) -> &IntMatrix<D> {
        &self.v
    }

    /// `U^-1`
    pub fn matrix_x(&self) -> &IntMatrix<D> {
        &self.x
    }

    /// `V^-1`
    pub fn matrix_y(&self) -> &IntMatrix<D> {
        &self.y
    }

    pub fn diagonal(&self) -> IntVector<D> {
        self.d.diagonal()
    }

    /// Product of the invariant factors, i.e. `|det A|`.
    pub fn index(&self) -> Result<i64> {
        self.diagonal()
            .iter()
            .try_fold(1i64, |acc, d| acc.checked_mul(*d))
            .ok_or_else(overflow)
    }
}

trait DiagonalCheck {
    fn is_diagonal_exact(&self) -> bool;
}

impl<const D: usize> DiagonalCheck for IntMatrix<D> {
    fn is_diagonal_exact(&self) -> bool {
        (0..D).all(|i| (0..D).all(|j| i == j || self[(i, j)] == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::int_matrix::determinant;
    use nalgebra::{Matrix2, Matrix3, SMatrix};

    fn check<const D: usize>(a: IntMatrix<D>) -> SmithDecomposition<D> {
        let s = SmithDecomposition::new(&a).unwrap();
        assert_eq!(s.matrix_u() * a * s.matrix_v(), *s.matrix_d());
        assert_eq!(determinant(s.matrix_u()).unwrap().abs(), 1);
        assert_eq!(determinant(s.matrix_v()).unwrap().abs(), 1);
        assert_eq!(s.matrix_x() * s.matrix_d() * s.matrix_y(), a);
        s
    }

    #[test]
    fn textbook_example() {
        let s = check(Matrix3::new(2, 4, 4, -6, 6, 12, 10, -4, -16));
        assert_eq!(s.diagonal(), SVector3::new(2, 6, 12));
        assert_eq!(s.index().unwrap(), 144);
    }

    #[test]
    fn diagonal_needing_merge() {
        let s = check(Matrix2::new(4, 0, 0, 6));
        assert_eq!(s.diagonal(), nalgebra::Vector2::new(2, 12));
    }

    #[test]
    fn unimodular_input_gives_identity() {
        let s = check(Matrix3::new(1, 2, 3, 0, 1, 4, 5, 6, 0));
        assert_eq!(*s.matrix_d(), Matrix3::identity());
    }

    #[test]
    fn singular_input_puts_zeros_last() {
        let s = check(Matrix2::new(0, 0, 0, 3));
        assert_eq!(s.diagonal(), nalgebra::Vector2::new(3, 0));
    }

    #[test]
    fn five_dimensional() {
        let a = SMatrix::<i64, 5, 5>::from_row_slice(&[
            3, 1, 0, 2, 5, //
            -1, 4, 2, 0, 1, //
            0, 2, 6, 1, -3, //
            7, 0, 1, 8, 2, //
            1, 1, 1, 1, 9,
        ]);
        let s = check(a);
        let d = s.diagonal();
        assert_ne!(d[0], 0);
        for i in 1..5 {
            assert_eq!(d[i] % d[i - 1], 0);
        }
        assert_eq!(s.index().unwrap(), determinant(&a).unwrap().abs());
    }

    type SVector3 = nalgebra::Vector3<i64>;
}
