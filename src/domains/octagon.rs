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

fn bar(i: usize) -> usize {
    i ^ 1
}

/// Matrix index standing for x when `positive`, for -x otherwise.
fn signed_index(slot: usize, positive: bool) -> usize {
    if positive {
        2 * slot
    } else {
        2 * slot + 1
    }
}

/// Splits `+-x +-y` into `((x, x > 0), (y, y > 0))`.
fn as_unit_pair(e: &LinearExpression) -> Option<((Variable, bool), (Variable, bool))> {
    let mut terms = e.terms();
    let (x, a) = terms.next()?;
    let (y, b) = terms.next()?;
    if terms.next().is_some() || !a.abs().is_one() || !b.abs().is_one() {
        return None;
    }
    Some(((x, a.is_positive()), (y, b.is_positive())))
}

/*
 * Octagons: conjunctions of constraints +-x +-y <= c over integers.
 *
 * Every tracked variable x (slot k) owns two matrix indices: 2k stands for
 * +x and 2k+1 for -x. Entry (i, j) bounds v_j - v_i, so a unary bound
 * x <= c is stored as 2x <= 2c in entry (2k+1, 2k). Entries (i, j) and
 * (bar j, bar i) always carry the same constraint.
 *
 * Every operation except widening leaves the matrix tightly closed: the
 * shortest-path closure, with unary bounds rounded down to even values,
 * then strengthened through pairs of unary bounds.
 */
#[derive(Clone, Debug)]
pub struct Octagon {
    bottom: bool,
    closed: bool,
    vars: Vec<Variable>,
    matrix: BoundMatrix,
}

impl Octagon {
    fn slot_of(&self, v: Variable) -> Option<usize> {
        self.vars.iter().position(|w| *w == v)
    }

    fn ensure(&mut self, v: Variable) -> usize {
        if let Some(slot) = self.slot_of(v) {
            return slot;
        }
        let mut indices: Vec<Option<usize>> = (0..self.matrix.dim()).map(Some).collect();
        indices.extend([None, None]);
        self.matrix = self.matrix.select(&indices);
        self.vars.push(v);
        self.vars.len() - 1
    }

    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    fn aligned(&self, vars: &[Variable]) -> BoundMatrix {
        let indices: Vec<Option<usize>> = vars
            .iter()
            .flat_map(|v| match self.slot_of(*v) {
                Some(slot) => [Some(2 * slot), Some(2 * slot + 1)],
                None => [None, None],
            })
            .collect();
        self.matrix.select(&indices)
    }

    fn normalize(&mut self) {
        if self.bottom || self.closed {
            return;
        }
        let n = self.matrix.dim();
        let two = Number::from(2);

        self.matrix.floyd_warshall();
        if self.matrix.has_negative_cycle() {
            trace!("octagon closure found a negative cycle");
            self.set_to_bottom();
            return;
        }

        // Integer tightening: 2x <= c implies 2x <= 2 * floor(c / 2).
        for i in 0..n {
            if let Bound::Finite(c) = self.matrix.get(i, bar(i)) {
                let half = c.div_floor(&two);
                self.matrix.set(i, bar(i), Bound::Finite(&half + &half));
            }
        }
        for i in (0..n).step_by(2) {
            let up = self.matrix.get(i + 1, i);
            let down = self.matrix.get(i, i + 1);
            if up.is_finite() && down.is_finite() && (up + down).is_negative() {
                trace!("octagon has no integer point for {}", self.vars[i / 2]);
                self.set_to_bottom();
                return;
            }
        }

        // Strengthening: v_j - v_i <= (m[i][bar i] + m[bar j][j]) / 2.
        let halves: Vec<Bound> = (0..n)
            .map(|i| self.matrix.get(i, bar(i)).div_floor(&two))
            .collect();
        for i in 0..n {
            if halves[i].is_plus_infinity() {
                continue;
            }
            for j in 0..n {
                if i != j && !halves[bar(j)].is_plus_infinity() {
                    let candidate = &halves[i] + &halves[bar(j)];
                    self.matrix.tighten(i, j, candidate);
                }
            }
        }
        self.closed = true;
    }

    fn normalized(&self) -> Cow<'_, Octagon> {
        if self.bottom || self.closed {
            Cow::Borrowed(self)
        } else {
            let mut closed = self.clone();
            closed.normalize();
            Cow::Owned(closed)
        }
    }

    /// Recomputes the tight closure of the matrix.
    pub fn close(&mut self) {
        self.closed = false;
        self.normalize();
    }

    /// Adds v_b - v_a <= c together with its coherent twin.
    fn add_octagonal(&mut self, a: usize, b: usize, c: Bound) {
        let changed = self.matrix.tighten(a, b, c.clone());
        let changed = self.matrix.tighten(bar(b), bar(a), c) || changed;
        if changed {
            self.closed = false;
        }
    }

    /// (+-x) + (+-y) <= c
    fn add_binary(&mut self, sx: usize, px: bool, sy: usize, py: bool, c: Number) {
        self.add_octagonal(
            bar(signed_index(sy, py)),
            signed_index(sx, px),
            Bound::Finite(c),
        );
    }

    fn add_upper(&mut self, slot: usize, ub: &Number) {
        self.add_octagonal(2 * slot + 1, 2 * slot, Bound::Finite(ub + ub));
    }

    fn add_lower(&mut self, slot: usize, lb: &Number) {
        self.add_octagonal(2 * slot, 2 * slot + 1, Bound::Finite(-(lb + lb)));
    }

    fn set_interval(&mut self, x: Variable, itv: &Interval) {
        if itv.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let slot = self.ensure(x);
        if let Bound::Finite(ub) = itv.ub() {
            self.add_upper(slot, ub);
        }
        if let Bound::Finite(lb) = itv.lb() {
            self.add_lower(slot, lb);
        }
        self.normalize();
    }

    /// x = x + k. Tight closure is preserved.
    fn shift(&mut self, slot: usize, k: &Number) {
        let up = Bound::Finite(k.clone());
        let down = Bound::Finite(-k);
        self.matrix.shift_column(2 * slot, &up);
        self.matrix.shift_column(2 * slot + 1, &down);
        self.matrix.shift_row(2 * slot, &down);
        self.matrix.shift_row(2 * slot + 1, &up);
    }

    /// x = -x, by swapping the two indices of x.
    fn negate(&mut self, slot: usize) {
        let indices: Vec<Option<usize>> = (0..self.matrix.dim())
            .map(|i| {
                if i / 2 == slot {
                    Some(bar(i))
                } else {
                    Some(i)
                }
            })
            .collect();
        self.matrix = self.matrix.select(&indices);
    }

    fn expression_interval(&self, e: &LinearExpression) -> Interval {
        let closed = self.normalized();
        if closed.bottom {
            return Interval::bottom();
        }
        let base = evaluate_interval(e, |v| closed.to_interval(v));
        if let Some(((x, px), (y, py))) = as_unit_pair(e) {
            if let (Some(sx), Some(sy)) = (closed.slot_of(x), closed.slot_of(y)) {
                let a = bar(signed_index(sy, py));
                let b = signed_index(sx, px);
                let sum = Interval::new(-closed.matrix.get(b, a), closed.matrix.get(a, b).clone());
                let shifted = sum.add(&Interval::singleton(e.constant().clone()));
                return base.meet(shifted);
            }
        }
        base
    }

    fn add_by_intervals(&mut self, e: &LinearExpression, kind: ConstraintKind) {
        self.normalize();
        if self.bottom {
            return;
        }
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
                let slot = self.ensure(*x);
                if a.is_positive() {
                    self.add_upper(slot, &(-k).div_floor(a));
                } else {
                    self.add_lower(slot, &(-k).div_ceil(a));
                }
            }
            _ => match as_unit_pair(e) {
                Some(((x, px), (y, py))) => {
                    let sx = self.ensure(x);
                    let sy = self.ensure(y);
                    self.add_binary(sx, px, sy, py, -k);
                }
                None => self.add_by_intervals(e, ConstraintKind::Inequality),
            },
        }
        self.normalize();
    }

    /// Lists the non-trivial constraints of the tightly closed matrix, one
    /// per coherent pair of entries.
    pub fn constraints(&self) -> Vec<LinearConstraint> {
        let closed = self.normalized();
        if closed.bottom {
            return vec![LinearConstraint::equal(LinearExpression::from(1), 0)];
        }
        let m = &closed.matrix;
        let two = Number::from(2);
        let mut csts = Vec::new();
        for i in 0..m.dim() {
            for j in 0..m.dim() {
                if i == j || (i, j) > (bar(j), bar(i)) {
                    continue;
                }
                let c = match m.get(i, j) {
                    Bound::Finite(c) => c,
                    _ => continue,
                };
                let sign = |k: usize| {
                    if k % 2 == 0 {
                        Number::one()
                    } else {
                        -Number::one()
                    }
                };
                let xj = closed.vars[j / 2];
                if j == bar(i) {
                    let e = LinearExpression::term(sign(j), xj);
                    csts.push(LinearConstraint::leq(e, c.div_floor(&two)));
                } else {
                    let mut e = LinearExpression::term(sign(j), xj);
                    e.add_term(closed.vars[i / 2], -sign(i));
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
        let m = &closed.matrix;
        if m.dim() != 2 * closed.vars.len() {
            return Err(DomainError::inconsistent(format!(
                "octagon has {} variables but a matrix of dimension {}",
                closed.vars.len(),
                m.dim()
            )));
        }
        for i in 0..m.dim() {
            if !m.get(i, i).is_zero() {
                return Err(DomainError::inconsistent(format!(
                    "octagon diagonal entry {} is {}",
                    i,
                    m.get(i, i)
                )));
            }
            for j in 0..m.dim() {
                if m.get(i, j) != m.get(bar(j), bar(i)) {
                    return Err(DomainError::inconsistent(format!(
                        "octagon entries ({}, {}) and ({}, {}) are not coherent",
                        i,
                        j,
                        bar(j),
                        bar(i)
                    )));
                }
            }
        }
        Ok(())
    }
}

impl AbstractDomain for Octagon {
    fn bottom() -> Self {
        Octagon {
            bottom: true,
            closed: true,
            vars: Vec::new(),
            matrix: BoundMatrix::new(0),
        }
    }

    fn top() -> Self {
        Octagon {
            bottom: false,
            closed: true,
            vars: Vec::new(),
            matrix: BoundMatrix::new(0),
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
            .filter(|v| rhs.slot_of(**v).is_some())
            .copied()
            .collect();
        let matrix = self
            .aligned(&common)
            .zip_with(&rhs.aligned(&common), |a, b| a.clone().max(b.clone()));
        *self = Octagon {
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
        vars.extend(rhs.vars.iter().filter(|v| self.slot_of(**v).is_none()));
        let matrix = self
            .aligned(&vars)
            .zip_with(&rhs.aligned(&vars), |a, b| a.clone().min(b.clone()));
        *self = Octagon {
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
            .filter(|v| rhs.slot_of(**v).is_some())
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
        *self = Octagon {
            bottom: false,
            closed: false,
            vars: common,
            matrix,
        };
    }

    fn narrow_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            return;
        }
        if rhs.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let mut vars = self.vars.clone();
        vars.extend(rhs.vars.iter().filter(|v| self.slot_of(**v).is_none()));
        let matrix = self.aligned(&vars).zip_with(&rhs.aligned(&vars), |a, b| {
            if a.is_plus_infinity() {
                b.clone()
            } else {
                a.clone()
            }
        });
        *self = Octagon {
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

impl PartialEq for Octagon {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl Eq for Octagon {}

impl NumericalDomain for Octagon {
    fn domain_name(&self) -> &'static str {
        "octagon"
    }

    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        self.normalize();
        if self.bottom {
            return;
        }
        if let Some((y, k)) = e.as_variable_plus_constant() {
            if y == x {
                if let Some(slot) = self.slot_of(x) {
                    self.shift(slot, k);
                }
                return;
            }
            let k = k.clone();
            self.forget(x);
            let sx = self.ensure(x);
            let sy = self.ensure(y);
            self.add_binary(sx, true, sy, false, k.clone());
            self.add_binary(sx, false, sy, true, -k);
            self.normalize();
            return;
        }
        if let Some((y, k)) = e.as_negated_variable_plus_constant() {
            if y == x {
                if let Some(slot) = self.slot_of(x) {
                    self.negate(slot);
                    self.shift(slot, k);
                }
                return;
            }
            let k = k.clone();
            self.forget(x);
            let sx = self.ensure(x);
            let sy = self.ensure(y);
            self.add_binary(sx, true, sy, true, k.clone());
            self.add_binary(sx, false, sy, false, -k);
            self.normalize();
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
            (Operation::Mul, Operand::Const(k)) if k.abs().is_one() => {
                self.assign(x, &LinearExpression::term(k.clone(), y))
            }
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
        if let Some(slot) = self.slot_of(x) {
            let indices: Vec<Option<usize>> = (0..self.matrix.dim())
                .filter(|i| i / 2 != slot)
                .map(Some)
                .collect();
            self.matrix = self.matrix.select(&indices);
            self.vars.remove(slot);
        }
    }

    fn to_interval(&self, x: Variable) -> Interval {
        let closed = self.normalized();
        if closed.bottom {
            return Interval::bottom();
        }
        let two = Number::from(2);
        match closed.slot_of(x) {
            Some(slot) => {
                let ub = closed.matrix.get(2 * slot + 1, 2 * slot).div_floor(&two);
                let lb = -closed.matrix.get(2 * slot, 2 * slot + 1).div_floor(&two);
                Interval::new(lb, ub)
            }
            None => Interval::top(),
        }
    }
}

impl fmt::Display for Octagon {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> (Variable, Variable, Variable) {
        (Variable::new(0), Variable::new(1), Variable::new(2))
    }

    #[test]
    fn test_octagonal_constraints() {
        let (x, y, _) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[
            LinearConstraint::leq(x + y, 4),
            LinearConstraint::leq(x - y, 2),
        ]);
        assert_eq!(oct.to_interval(x), Interval::at_most(3));
        assert!(oct.to_interval(y).is_top());
        assert!(oct.validate().is_ok());
    }

    #[test]
    fn test_integer_tightening() {
        let (x, y, _) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[
            LinearConstraint::leq(x + y, 3),
            LinearConstraint::leq(x - y, 0),
        ]);
        assert_eq!(oct.to_interval(x), Interval::at_most(1));

        let mut oct = Octagon::top();
        oct.add_constraints(&[
            LinearConstraint::equal(x + y, 1),
            LinearConstraint::equal(x - y, 0),
        ]);
        assert!(oct.is_bottom());
    }

    #[test]
    fn test_negative_cycle() {
        let (x, y, _) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[
            LinearConstraint::leq(x - y, -1),
            LinearConstraint::leq(y - x, -1),
        ]);
        assert!(oct.is_bottom());
        assert_eq!(oct.to_string(), "_|_");
    }

    #[test]
    fn test_assign_and_negation() {
        let (x, y, z) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[LinearConstraint::geq(y, 1), LinearConstraint::leq(y, 3)]);

        oct.assign(x, &(-y + 2));
        assert_eq!(oct.to_interval(x), Interval::range(-1, 1));
        assert_eq!(oct.expression_interval(&(x + y)), Interval::singleton(2));

        oct.assign(z, &(y + 1));
        oct.assign(y, &(-y));
        assert_eq!(oct.to_interval(y), Interval::range(-3, -1));
        assert_eq!(oct.expression_interval(&(y + z)), Interval::singleton(1));

        oct.apply(Operation::Add, z, z, 5.into());
        assert_eq!(oct.to_interval(z), Interval::range(7, 9));
        assert!(oct.validate().is_ok());
    }

    #[test]
    fn test_join_and_widening() {
        let (i, n, _) = vars();
        let mut a = Octagon::top();
        a.add_constraint(&LinearConstraint::geq(n, 0));
        a.assign(i, &0.into());
        let mut b = a.clone();
        b.apply(Operation::Add, i, i, 1.into());
        b.add_constraint(&LinearConstraint::leq(i, n));

        let joined = a.clone().join(b);
        assert_eq!(joined.to_interval(i), Interval::range(0, 1));

        let widened = a.widen(joined);
        assert_eq!(widened.to_interval(i), Interval::at_least(0));
        assert!(widened.to_interval(n).leq(&Interval::at_least(0)));
    }

    #[test]
    fn test_closure_idempotence() {
        let (x, y, z) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[
            LinearConstraint::leq(x + y, 5),
            LinearConstraint::leq(y - z, -2),
            LinearConstraint::leq(z, 7),
            LinearConstraint::geq(x, 1),
        ]);
        oct.close();
        let once = oct.constraints();
        oct.close();
        assert_eq!(oct.constraints(), once);
        assert!(oct.validate().is_ok());
    }

    #[test]
    fn test_forget() {
        let (x, y, _) = vars();
        let mut oct = Octagon::top();
        oct.add_constraints(&[LinearConstraint::leq(x, 3), LinearConstraint::equal(y, x + 1)]);
        let forgotten = oct.clone().forgotten(x);
        assert_eq!(forgotten.to_interval(y), Interval::at_most(4));
        assert!(forgotten.to_interval(x).is_top());
        assert!(oct.leq(&forgotten));
    }
}
