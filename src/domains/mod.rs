/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::bound::Bound;
use crate::datatype::AbstractDomain;
use crate::linear::ConstraintKind;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::number::Number;
use crate::variable::Variable;

mod any_domain;
mod congruence;
mod dbm;
mod interval;
mod interval_congruence;
mod matrix;
mod octagon;
pub mod pointer;
mod relational_congruence;
mod separate;
mod var_packing;

pub use any_domain::*;
pub use congruence::*;
pub use dbm::*;
pub use interval::*;
pub use interval_congruence::*;
pub use octagon::*;
pub use pointer::PointerDomain;
pub use pointer::PointsToDomain;
pub use pointer::PointsToSet;
pub use relational_congruence::*;
pub use separate::*;
pub use var_packing::*;

/*
 * The interface shared by every numerical abstract domain. Analyses written
 * against this trait work unchanged whatever concrete domain backs them.
 *
 * All mutators work in place on the receiver. Once a state is _|_ it stays
 * _|_: every operation on it is a no-op.
 */
pub trait NumericalDomain: AbstractDomain + fmt::Display {
    /// Short human readable name used in diagnostics.
    fn domain_name(&self) -> &'static str;

    /// x = e
    fn assign(&mut self, x: Variable, e: &LinearExpression);

    /// x = y op z
    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand);

    /// Refines the state with a constraint, possibly down to _|_.
    fn add_constraint(&mut self, c: &LinearConstraint);

    fn add_constraints(&mut self, csts: &[LinearConstraint]) {
        for c in csts {
            if self.is_bottom() {
                return;
            }
            self.add_constraint(c);
        }
    }

    /// Projects x out of the state: every constraint involving x is lost.
    fn forget(&mut self, x: Variable);

    /// Interval of the values x can take.
    fn to_interval(&self, x: Variable) -> Interval;

    /// Consuming form of `add_constraint`.
    fn constrain(mut self, c: &LinearConstraint) -> Self
    where
        Self: Sized,
    {
        self.add_constraint(c);
        self
    }

    /// Consuming form of `forget`.
    fn forgotten(mut self, x: Variable) -> Self
    where
        Self: Sized,
    {
        self.forget(x);
        self
    }

    /// Capability probe: `Some` when this domain also tracks pointers.
    fn as_pointer_domain(&self) -> Option<&dyn PointerDomain> {
        None
    }

    fn as_pointer_domain_mut(&mut self) -> Option<&mut dyn PointerDomain> {
        None
    }
}

pub(crate) fn operand_interval(z: &Operand, lookup: impl Fn(Variable) -> Interval) -> Interval {
    match z {
        Operand::Var(v) => lookup(*v),
        Operand::Const(k) => Interval::singleton(k.clone()),
    }
}

/// Interval of a linear expression from the intervals of its variables.
pub(crate) fn evaluate_interval(
    e: &LinearExpression,
    lookup: impl Fn(Variable) -> Interval,
) -> Interval {
    let mut result = Interval::singleton(e.constant().clone());
    for (v, c) in e.terms() {
        result = result.add(&Interval::singleton(c.clone()).mul(&lookup(v)));
        if result.is_bottom() {
            break;
        }
    }
    result
}

/// One pass of interval propagation for the constraint `e kind 0`.
///
/// Returns the refined interval of each variable of `e`, in order, or `None`
/// when the constraint is infeasible. Refinements are computed from the
/// intervals before the pass.
pub(crate) fn refine_with_intervals(
    e: &LinearExpression,
    kind: ConstraintKind,
    lookup: impl Fn(Variable) -> Interval,
) -> Option<Vec<(Variable, Interval)>> {
    let mut refined = Vec::with_capacity(e.num_terms());
    for (x, a) in e.terms() {
        let mut rest = Interval::singleton(e.constant().clone());
        for (y, b) in e.terms() {
            if y != x {
                rest = rest.add(&Interval::singleton(b.clone()).mul(&lookup(y)));
            }
        }
        let residual = rest.neg();
        let mut value = lookup(x);
        value.refine_linear(a, &residual, kind);
        if value.is_bottom() {
            return None;
        }
        refined.push((x, value));
    }
    Some(refined)
}

/// The constraints `lb <= x <= ub` describing an interval.
pub(crate) fn interval_constraints(x: Variable, itv: &Interval) -> Vec<LinearConstraint> {
    let mut csts = Vec::with_capacity(2);
    if let Bound::Finite(lb) = itv.lb() {
        csts.push(LinearConstraint::geq(x, lb.clone()));
    }
    if let Bound::Finite(ub) = itv.ub() {
        csts.push(LinearConstraint::leq(x, ub.clone()));
    }
    csts
}

/// `Some(k)` if z is the constant k.
pub(crate) fn operand_constant(z: &Operand) -> Option<&Number> {
    match z {
        Operand::Const(k) => Some(k),
        Operand::Var(_) => None,
    }
}
