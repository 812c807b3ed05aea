/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::borrow::Cow;
use std::fmt;

use log::trace;

use crate::bound::Bound;
use crate::datatype::AbstractDomain;
use crate::domains::evaluate_interval;
use crate::domains::matrix::BoundMatrix;
use crate::domains::operand_interval;
use crate::domains::refine_with_intervals;
use crate::domains::Interval;
use crate::domains::NumericalDomain;
use crate::error::DomainError;
use crate::error::DomainResult;
use crate::linear::ConstraintKind;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::number::Number;
use crate::variable::Variable;

/*
 * Difference-bound matrices: conjunctions of constraints x - y <= c and
 * +-x <= c.
 *
 * Index 0 of the matrix is a special variable that is always 0, so unary
 * bounds are differences with it; `vars[k]` is index k + 1. Entry (i, j)
 * bounds v_j - v_i. Variables that are not tracked are unconstrained.
 *
 * The matrix is kept closed (shortest-path normal form) by every operation
 * except widening, whose result must not be closed for the iteration to
 * terminate. Closure finding a negative cycle makes the state _|_.
 */
#[derive(Clone, Debug)]
pub struct Dbm {
    bottom: bool,
    closed: bool,
    vars: Vec<Variable>,
    matrix: BoundMatrix,
}

impl Dbm {
    fn index_of(&self, v: Variable) -> Option<usize> {
        self.vars.iter().position(|w| *w == v).map(|k| k + 1)
    }

    fn ensure(&mut self, v: Variable) -> usize {
        if let Some(i) = self.index_of(v) {
            return i;
        }
        let mut indices: Vec<Option<usize>> = (0..self.matrix.dim()).map(Some).collect();
        indices.push(None);
        self.matrix = self.matrix.select(&indices);
        self.vars.push(v);
        self.vars.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    fn normalize(&mut self) {
        if self.bottom || self.closed {
            return;
        }
        self.matrix.floyd_warshall();
        if self.matrix.has_negative_cycle() {
            trace!("dbm closure found a negative cycle");
            self.set_to_bottom();
            return;
        }
        self.closed = true;
    }

    fn normalized(&self) -> Cow<'_, Dbm> {
        if self.bottom || self.closed {
            Cow::Borrowed(self)
        } else {
            let mut closed = self.clone();
            closed.normalize();
            Cow::Owned(closed)
        }
    }

    /// Recomputes the shortest-path closure of the matrix.
    pub fn close(&mut self) {
        self.closed = false;
        self.normalize();
    }

    /// The matrix restricted and reordered to `vars`, plus the zero index.
    fn aligned(&self, vars: &[Variable]) -> BoundMatrix {
        let indices: Vec<Option<usize>> = std::iter::once(Some(0))
            .chain(vars.iter().map(|v| self.index_of(*v)))
            .collect();
        self.matrix.select(&indices)
    }

    /// Adds v_j - v_i <= c and restores closure incrementally, in O(n^2).
    fn add_edge(&mut self, i: usize, j: usize, c: Bound) {
        self.normalize();
        if self.bottom || c >= *self.matrix.get(i, j) {
            return;
        }
        let back = self.matrix.get(j, i);
        if back.is_finite() && (&c + back).is_negative() {
            trace!("dbm edge closes a negative cycle");
            self.set_to_bottom();
            return;
        }
        let n = self.matrix.dim();
        for a in 0..n {
            let ai = self.matrix.get(a, i);
            if ai.is_plus_infinity() {
                continue;
            }
            let through = ai + &c;
            for b in 0..n {
                let jb = self.matrix.get(j, b);
                if jb.is_plus_infinity() {
                    continue;
                }
                let candidate = &through + jb;
                self.matrix.tighten(a, b, candidate);
            }
        }
    }

    /// x = x + k. Closure is preserved.
    fn shift(&mut self, i: usize, k: &Number) {
        self.matrix.shift_column(i, &Bound::Finite(k.clone()));
        self.matrix.shift_row(i, &Bound::Finite(-k));
    }

    fn set_interval(&mut self, x: Variable, itv: &Interval) {
        if itv.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let i = self.ensure(x);
        if itv.ub().is_finite() {
            self.add_edge(0, i, itv.ub().clone());
        }
        if itv.lb().is_finite() {
            self.add_edge(i, 0, -itv.lb());
        }
    }

    /// Splits `s*x - s*y` into (x, y) when both coefficients are unit.
    fn as_difference(e: &LinearExpression) -> Option<(Variable, Variable)> {
        let mut terms = e.terms();
        let (x, a) = terms.next()?;
        let (y, b) = terms.next()?;
        if terms.next().is_some() || !(a + b).is_zero() || !a.abs().is_one() {
            return None;
        }
        if a.is_one() {
            Some((x, y))
        } else {
            Some((y, x))
        }
    }

    fn expression_interval(&self, e: &LinearExpression) -> Interval {
        let closed = self.normalized();
        if closed.bottom {
            return Interval::bottom();
        }
        let base = evaluate_interval(e, |v| closed.to_interval(v));
        if let Some((pos, neg)) = Self::as_difference(e) {
            if let (Some(ip), Some(in_)) = (closed.index_of(pos), closed.index_of(neg)) {
                // pos - neg is in [-m[pos][neg], m[neg][pos]].
                let difference = Interval::new(
                    -closed.matrix.get(ip, in_),
                    closed.matrix.get(in_, ip).clone(),
                );
                let shifted = difference.add(&Interval::singleton(e.constant().clone()));
                return base.meet(shifted);
            }
        }
        base
    }

    fn add_by_intervals(&mut self, e: &LinearExpression, kind: ConstraintKind) {
        let refined = refine_with_intervals(e, kind, |v| self.to_interval(v));
        match refined {
            Some(refined) => {
                for (v, itv) in refined {
                    self.set_interval(v, &itv);
                }
            }
            None => self.set_to_bottom(),
        }
    }

    /// e <= 0
    fn add_inequality(&mut self, e: &LinearExpression) {
        let k = e.constant();
        let terms: Vec<(Variable, &Number)> = e.terms().collect();
        match terms.as_slice() {
            [(x, a)] => {
                let i = self.ensure(*x);
                if a.is_positive() {
                    let ub = (-k).div_floor(a);
                    self.add_edge(0, i, Bound::Finite(ub));
                } else {
                    let lb = (-k).div_ceil(a);
                    self.add_edge(i, 0, Bound::Finite(-lb));
                }
            }
            _ => match Self::as_difference(e) {
                Some((pos, neg)) => {
                    // pos - neg <= -k
                    let ip = self.ensure(pos);
                    let in_ = self.ensure(neg);
                    self.add_edge(in_, ip, Bound::Finite(-k));
                }
                None => self.add_by_intervals(e, ConstraintKind::Inequality),
            },
        }
    }

    /// Lists the non-trivial constraints of the closed matrix.
    pub fn constraints(&self) -> Vec<LinearConstraint> {
        let closed = self.normalized();
        if closed.bottom {
            return vec![LinearConstraint::equal(LinearExpression::from(1), 0)];
        }
        let m = &closed.matrix;
        let mut csts = Vec::new();
        for i in 0..m.dim() {
            for j in 0..m.dim() {
                if let (false, Bound::Finite(c)) = (i == j, m.get(i, j)) {
                    let mut e = LinearExpression::new();
                    if j > 0 {
                        e.add_term(closed.vars[j - 1], Number::one());
                    }
                    if i > 0 {
                        e.add_term(closed.vars[i - 1], -Number::one());
                    }
                    csts.push(LinearConstraint::leq(e, c.clone()));
                }
            }
        }
        csts
    }

    /// Checks the structural invariants of the closed matrix.
    pub fn validate(&self) -> DomainResult<()> {
        let closed = self.normalized();
        if closed.bottom {
            return Ok(());
        }
        if closed.matrix.dim() != closed.vars.len() + 1 {
            return Err(DomainError::inconsistent(format!(
                "dbm has {} variables but a matrix of dimension {}",
                closed.vars.len(),
                closed.matrix.dim()
            )));
        }
        for i in 0..closed.matrix.dim() {
            if !closed.matrix.get(i, i).is_zero() {
                return Err(DomainError::inconsistent(format!(
                    "dbm diagonal entry {} is {}",
                    i,
                    closed.matrix.get(i, i)
                )));
            }
        }
        Ok(())
    }
}

impl AbstractDomain for Dbm {
    fn bottom() -> Self {
        Dbm {
            bottom: true,
            closed: true,
            vars: Vec::new(),
            matrix: BoundMatrix::new(1),
        }
    }

    fn top() -> Self {
        Dbm {
            bottom: false,
            closed: true,
            vars: Vec::new(),
            matrix: BoundMatrix::new(1),
        }
    }

    fn is_bottom(&self) -> bool {
        self.normalized().bottom
    }

    fn is_top(&self) -> bool {
        let closed = self.normalized();
        !closed.bottom && closed.matrix.is_unconstrained()
    }

    fn leq(&self, rhs: &Self) -> bool {
        let lhs = self.normalized();
        if lhs.bottom {
            return true;
        }
        if rhs.is_bottom() {
            return false;
        }
        lhs.aligned(&rhs.vars).leq(&rhs.matrix)
    }

    fn join_with(&mut self, rhs: Self) {
        let mut rhs = rhs;
        rhs.normalize();
        if rhs.bottom {
            return;
        }
        self.normalize();
        if self.bottom {
            *self = rhs;
            return;
        }
        let common: Vec<Variable> = self
            .vars
            .iter()
            .filter(|v| rhs.index_of(**v).is_some())
            .copied()
            .collect();
        let matrix = self
            .aligned(&common)
            .zip_with(&rhs.aligned(&common), |a, b| a.clone().max(b.clone()));
        *self = Dbm {
            bottom: false,
            closed: true,
            vars: common,
            matrix,
        };
    }

    fn meet_with(&mut self, rhs: Self) {
        if self.bottom {
            return;
        }
        if rhs.bottom {
            *self = rhs;
            return;
        }
        let mut vars = self.vars.clone();
        vars.extend(rhs.vars.iter().filter(|v| self.index_of(**v).is_none()));
        let matrix = self
            .aligned(&vars)
            .zip_with(&rhs.aligned(&vars), |a, b| a.clone().min(b.clone()));
        *self = Dbm {
            bottom: false,
            closed: false,
            vars,
            matrix,
        };
        self.normalize();
    }

    /// Entries that grew are dropped. The result is left unclosed.
    fn widen_with(&mut self, rhs: Self) {
        let mut rhs = rhs;
        rhs.normalize();
        if rhs.bottom {
            return;
        }
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        let common: Vec<Variable> = self
            .vars
            .iter()
            .filter(|v| rhs.index_of(**v).is_some())
            .copied()
            .collect();
        let matrix = self
            .aligned(&common)
            .zip_with(&rhs.aligned(&common), |a, b| {
                if b <= a {
                    a.clone()
                } else {
                    Bound::PlusInfinity
                }
            });
        *self = Dbm {
            bottom: false,
            closed: false,
            vars: common,
            matrix,
        };
    }

    /// Only unbounded entries are refined.
    fn narrow_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            return;
        }
        if rhs.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let mut vars = self.vars.clone();
        vars.extend(rhs.vars.iter().filter(|v| self.index_of(**v).is_none()));
        let matrix = self.aligned(&vars).zip_with(&rhs.aligned(&vars), |a, b| {
            if a.is_plus_infinity() {
                b.clone()
            } else {
                a.clone()
            }
        });
        *self = Dbm {
            bottom: false,
            closed: false,
            vars,
            matrix,
        };
        self.normalize();
    }

    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }
}

impl PartialEq for Dbm {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl Eq for Dbm {}

impl NumericalDomain for Dbm {
    fn domain_name(&self) -> &'static str {
        "dbm"
    }

    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        self.normalize();
        if self.bottom {
            return;
        }
        if let Some((y, k)) = e.as_variable_plus_constant() {
            if y == x {
                if let Some(i) = self.index_of(x) {
                    self.shift(i, k);
                }
                return;
            }
            let k = k.clone();
            self.forget(x);
            let ix = self.ensure(x);
            let iy = self.ensure(y);
            self.add_edge(iy, ix, Bound::Finite(k.clone()));
            self.add_edge(ix, iy, Bound::Finite(-k));
            return;
        }
        let itv = self.expression_interval(e);
        self.forget(x);
        self.set_interval(x, &itv);
    }

    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand) {
        if self.is_bottom() {
            return;
        }
        match (op, &z) {
            (Operation::Add, Operand::Const(k)) => self.assign(x, &(y + k.clone())),
            (Operation::Sub, Operand::Const(k)) => self.assign(x, &(y - k.clone())),
            (Operation::Add, Operand::Var(w)) => self.assign(x, &(y + *w)),
            (Operation::Sub, Operand::Var(w)) => self.assign(x, &(y - *w)),
            _ => {
                let rhs = operand_interval(&z, |v| self.to_interval(v));
                let itv = self.to_interval(y).apply(op, &rhs);
                self.forget(x);
                self.set_interval(x, &itv);
            }
        }
    }

    fn add_constraint(&mut self, c: &LinearConstraint) {
        self.normalize();
        if self.bottom {
            return;
        }
        if let Some(holds) = c.constant_truth() {
            if !holds {
                self.set_to_bottom();
            }
            return;
        }
        let e = c.expression();
        match c.kind() {
            ConstraintKind::Inequality => self.add_inequality(e),
            ConstraintKind::Equality => {
                self.add_inequality(e);
                self.add_inequality(&-e.clone());
            }
            ConstraintKind::Disequation => {
                if self.expression_interval(e).as_singleton().map_or(false, Number::is_zero) {
                    self.set_to_bottom();
                } else {
                    self.add_by_intervals(e, ConstraintKind::Disequation);
                }
            }
        }
    }

    fn forget(&mut self, x: Variable) {
        self.normalize();
        if self.bottom {
            return;
        }
        if let Some(i) = self.index_of(x) {
            let indices: Vec<Option<usize>> = (0..self.matrix.dim())
                .filter(|k| *k != i)
                .map(Some)
                .collect();
            self.matrix = self.matrix.select(&indices);
            self.vars.remove(i - 1);
        }
    }

    fn to_interval(&self, x: Variable) -> Interval {
        let closed = self.normalized();
        if closed.bottom {
            return Interval::bottom();
        }
        match closed.index_of(x) {
            Some(i) => Interval::new(-closed.matrix.get(i, 0), closed.matrix.get(0, i).clone()),
            None => Interval::top(),
        }
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "_|_");
        }
        write!(f, "{{")?;
        for (n, c) in self.constraints().iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            let bound = -c.expression().constant();
            let lhs = c.expression().clone() + bound.clone();
            write!(f, "{} <= {}", lhs, bound)?;
        }
        write!(f, "}}")
    }
}
