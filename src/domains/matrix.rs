/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::bound::Bound;

/*
 * Square matrix of bounds backing the difference-bound and octagon domains.
 * Entry (i, j) bounds v_j - v_i, i.e. the weight of the edge i -> j in the
 * constraint graph. Missing constraints are +oo; diagonal entries are 0 for
 * a consistent matrix.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BoundMatrix {
    dim: usize,
    cells: Vec<Bound>,
}

impl BoundMatrix {
    pub fn new(dim: usize) -> Self {
        let mut cells = vec![Bound::PlusInfinity; dim * dim];
        for i in 0..dim {
            cells[i * dim + i] = Bound::zero();
        }
        Self { dim, cells }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, i: usize, j: usize) -> &Bound {
        &self.cells[i * self.dim + j]
    }

    pub fn set(&mut self, i: usize, j: usize, b: Bound) {
        self.cells[i * self.dim + j] = b;
    }

    /// Lowers entry (i, j) to `b` if that is tighter.
    pub fn tighten(&mut self, i: usize, j: usize, b: Bound) -> bool {
        let cell = &mut self.cells[i * self.dim + j];
        if b < *cell {
            *cell = b;
            true
        } else {
            false
        }
    }

    /// Builds a matrix whose index k stands for `indices[k]` in `self`.
    /// `None` introduces an unconstrained index.
    pub fn select(&self, indices: &[Option<usize>]) -> BoundMatrix {
        let dim = indices.len();
        let mut result = BoundMatrix::new(dim);
        for (i, from_i) in indices.iter().enumerate() {
            for (j, from_j) in indices.iter().enumerate() {
                if let (Some(fi), Some(fj)) = (from_i, from_j) {
                    result.set(i, j, self.get(*fi, *fj).clone());
                }
            }
        }
        result
    }

    /// Pointwise combination of two matrices of the same dimension.
    pub fn zip_with(&self, other: &BoundMatrix, op: impl Fn(&Bound, &Bound) -> Bound) -> BoundMatrix {
        debug_assert_eq!(self.dim, other.dim);
        BoundMatrix {
            dim: self.dim,
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(a, b)| op(a, b))
                .collect(),
        }
    }

    pub fn leq(&self, other: &BoundMatrix) -> bool {
        debug_assert_eq!(self.dim, other.dim);
        self.cells
            .iter()
            .zip(other.cells.iter())
            .all(|(a, b)| a <= b)
    }

    /// All-pairs shortest paths.
    pub fn floyd_warshall(&mut self) {
        let n = self.dim;
        for k in 0..n {
            for i in 0..n {
                let ik = self.get(i, k).clone();
                if ik.is_plus_infinity() {
                    continue;
                }
                for j in 0..n {
                    let kj = self.get(k, j);
                    if kj.is_plus_infinity() {
                        continue;
                    }
                    let through = &ik + kj;
                    self.tighten(i, j, through);
                }
            }
        }
    }

    pub fn has_negative_cycle(&self) -> bool {
        (0..self.dim).any(|i| self.get(i, i).is_negative())
    }

    pub fn reset_diagonal(&mut self) {
        for i in 0..self.dim {
            self.set(i, i, Bound::zero());
        }
    }

    /// Adds `delta` to every finite entry of row i.
    pub fn shift_row(&mut self, i: usize, delta: &Bound) {
        for j in 0..self.dim {
            if i != j && self.get(i, j).is_finite() {
                let shifted = self.get(i, j) + delta;
                self.set(i, j, shifted);
            }
        }
    }

    /// Adds `delta` to every finite entry of column j.
    pub fn shift_column(&mut self, j: usize, delta: &Bound) {
        for i in 0..self.dim {
            if i != j && self.get(i, j).is_finite() {
                let shifted = self.get(i, j) + delta;
                self.set(i, j, shifted);
            }
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        (0..self.dim).all(|i| (0..self.dim).all(|j| i == j || self.get(i, j).is_plus_infinity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floyd_warshall() {
        let mut m = BoundMatrix::new(3);
        m.set(0, 1, Bound::from(2));
        m.set(1, 2, Bound::from(3));
        m.floyd_warshall();
        assert_eq!(m.get(0, 2), &Bound::from(5));
        assert!(!m.has_negative_cycle());

        let once = m.clone();
        m.floyd_warshall();
        assert_eq!(m, once);

        m.set(2, 0, Bound::from(-6));
        m.floyd_warshall();
        assert!(m.has_negative_cycle());
    }

    #[test]
    fn test_select() {
        let mut m = BoundMatrix::new(2);
        m.set(0, 1, Bound::from(4));
        let s = m.select(&[Some(1), None, Some(0)]);
        assert_eq!(s.dim(), 3);
        assert_eq!(s.get(2, 0), &Bound::from(4));
        assert_eq!(s.get(0, 1), &Bound::PlusInfinity);
        assert_eq!(s.get(1, 1), &Bound::zero());
    }
}
