/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use log::trace;

use crate::datatype::AbstractDomain;
use crate::datatype::AbstractEnvironment;
use crate::datatype::Environment;
use crate::domains::Congruence;
use crate::domains::Interval;
use crate::domains::IntervalCongruence;
use crate::domains::NumericalDomain;
use crate::linear::ConstraintKind;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::number::Number;
use crate::variable::Variable;

/// Upper bound on the propagation rounds run by `add_constraints`.
pub const MAX_SOLVER_CYCLES: usize = 10;

/// A per-variable abstract value usable in a `SeparateDomain`.
pub trait ScalarValue: AbstractDomain + fmt::Display {
    const NAME: &'static str;

    fn from_number(n: &Number) -> Self;

    fn apply(&self, op: Operation, rhs: &Self) -> Self;

    /// Refines the value of x with `a * x kind residual`.
    fn refine_linear(&mut self, a: &Number, residual: &Self, kind: ConstraintKind);

    fn to_interval(&self) -> Interval;
}

impl ScalarValue for Interval {
    const NAME: &'static str = "interval";

    fn from_number(n: &Number) -> Self {
        Interval::singleton(n.clone())
    }

    fn apply(&self, op: Operation, rhs: &Self) -> Self {
        Interval::apply(self, op, rhs)
    }

    fn refine_linear(&mut self, a: &Number, residual: &Self, kind: ConstraintKind) {
        Interval::refine_linear(self, a, residual, kind)
    }

    fn to_interval(&self) -> Interval {
        self.clone()
    }
}

impl ScalarValue for Congruence {
    const NAME: &'static str = "congruence";

    fn from_number(n: &Number) -> Self {
        Congruence::constant(n.clone())
    }

    fn apply(&self, op: Operation, rhs: &Self) -> Self {
        Congruence::apply(self, op, rhs)
    }

    fn refine_linear(&mut self, a: &Number, residual: &Self, kind: ConstraintKind) {
        Congruence::refine_linear(self, a, residual, kind)
    }

    fn to_interval(&self) -> Interval {
        Congruence::to_interval(self)
    }
}

impl ScalarValue for IntervalCongruence {
    const NAME: &'static str = "interval-congruence";

    fn from_number(n: &Number) -> Self {
        IntervalCongruence::singleton(n.clone())
    }

    fn apply(&self, op: Operation, rhs: &Self) -> Self {
        IntervalCongruence::apply(self, op, rhs)
    }

    fn refine_linear(&mut self, a: &Number, residual: &Self, kind: ConstraintKind) {
        IntervalCongruence::refine_linear(self, a, residual, kind)
    }

    fn to_interval(&self) -> Interval {
        self.interval().clone()
    }
}

/*
 * A non-relational domain: one independent `ScalarValue` per variable, kept
 * in an abstract environment. Linear constraints are solved by propagating
 * each constraint onto each of its variables in turn, until nothing changes
 * or `MAX_SOLVER_CYCLES` rounds have run.
 */
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SeparateDomain<V: ScalarValue> {
    env: Environment<Variable, V>,
}

pub type IntervalDomain = SeparateDomain<Interval>;
pub type CongruenceDomain = SeparateDomain<Congruence>;
pub type IntervalCongruenceDomain = SeparateDomain<IntervalCongruence>;

impl<V: ScalarValue> SeparateDomain<V> {
    pub fn get(&self, x: Variable) -> V {
        self.env.get(&x).into_owned()
    }

    pub fn set(&mut self, x: Variable, value: V) {
        self.env.set(x, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &V)> {
        self.env.iter()
    }

    fn eval(&self, e: &LinearExpression) -> V {
        let mut result = V::from_number(e.constant());
        for (v, c) in e.terms() {
            let term = V::from_number(c).apply(Operation::Mul, &self.get(v));
            result = result.apply(Operation::Add, &term);
        }
        result
    }

    fn operand_value(&self, z: &Operand) -> V {
        match z {
            Operand::Var(v) => self.get(*v),
            Operand::Const(k) => V::from_number(k),
        }
    }

    fn propagate(&mut self, c: &LinearConstraint) {
        if let Some(holds) = c.constant_truth() {
            if !holds {
                self.set_to_bottom();
            }
            return;
        }
        let e = c.expression();
        for (x, a) in e.terms() {
            let mut rest = V::from_number(e.constant());
            for (y, b) in e.terms() {
                if y != x {
                    let term = V::from_number(b).apply(Operation::Mul, &self.get(y));
                    rest = rest.apply(Operation::Add, &term);
                }
            }
            let residual = V::from_number(&Number::zero()).apply(Operation::Sub, &rest);
            let mut value = self.get(x);
            value.refine_linear(a, &residual, c.kind());
            self.set(x, value);
            if self.is_bottom() {
                trace!("{} is infeasible", c);
                return;
            }
        }
    }
}

impl<V: ScalarValue> AbstractDomain for SeparateDomain<V> {
    fn bottom() -> Self {
        Self {
            env: Environment::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            env: Environment::top(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.env.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.env.is_top()
    }

    fn leq(&self, rhs: &Self) -> bool {
        self.env.leq(&rhs.env)
    }

    fn join_with(&mut self, rhs: Self) {
        self.env.join_with(rhs.env);
    }

    fn meet_with(&mut self, rhs: Self) {
        self.env.meet_with(rhs.env);
    }

    fn widen_with(&mut self, rhs: Self) {
        self.env.widen_with(rhs.env);
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.env.narrow_with(rhs.env);
    }
}

impl<V: ScalarValue> NumericalDomain for SeparateDomain<V> {
    fn domain_name(&self) -> &'static str {
        V::NAME
    }

    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        if self.is_bottom() {
            return;
        }
        let value = self.eval(e);
        self.set(x, value);
    }

    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand) {
        if self.is_bottom() {
            return;
        }
        let value = self.get(y).apply(op, &self.operand_value(&z));
        self.set(x, value);
    }

    fn add_constraint(&mut self, c: &LinearConstraint) {
        self.add_constraints(std::slice::from_ref(c));
    }

    fn add_constraints(&mut self, csts: &[LinearConstraint]) {
        for _ in 0..MAX_SOLVER_CYCLES {
            if self.is_bottom() {
                return;
            }
            let before = self.env.clone();
            for c in csts {
                self.propagate(c);
                if self.is_bottom() {
                    return;
                }
            }
            if self.env == before {
                return;
            }
        }
    }

    fn forget(&mut self, x: Variable) {
        self.env.forget(&x);
    }

    fn to_interval(&self, x: Variable) -> Interval {
        self.get(x).to_interval()
    }
}

impl<V: ScalarValue> fmt::Display for SeparateDomain<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.env)
    }
}
