/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::config::DomainKind;
use crate::datatype::AbstractDomain;
use crate::domains::interval_constraints;
use crate::domains::Congruence;
use crate::domains::CongruenceDomain;
use crate::domains::Interval;
use crate::domains::IntervalCongruence;
use crate::domains::NumericalDomain;
use crate::domains::VarPackingDbm;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::variable::Variable;

/*
 * Reduced product of a relational domain with one congruence per variable.
 * Both sides see every operation; afterwards the variables written or
 * constrained by it are reduced through `IntervalCongruence`, so a bound
 * from the relational side can fix a congruence and a congruence can
 * tighten the relational bounds.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationalCongruence<R> {
    relational: R,
    congruences: CongruenceDomain,
}

pub type VarPackingDbmCongruence = RelationalCongruence<VarPackingDbm>;

impl<R: NumericalDomain> RelationalCongruence<R> {
    pub fn relational(&self) -> &R {
        &self.relational
    }

    pub fn congruence(&self, x: Variable) -> Congruence {
        self.congruences.get(x)
    }

    fn reduce_variable(&mut self, x: Variable) {
        if self.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let itv = self.relational.to_interval(x);
        let cong = self.congruences.get(x);
        let reduced = IntervalCongruence::new(itv.clone(), cong.clone());
        if reduced.is_bottom() {
            self.set_to_bottom();
            return;
        }
        if *reduced.congruence() != cong {
            self.congruences.set(x, reduced.congruence().clone());
        }
        if *reduced.interval() != itv {
            self.relational
                .add_constraints(&interval_constraints(x, reduced.interval()));
        }
    }

    fn reduce(&mut self, vars: impl IntoIterator<Item = Variable>) {
        for x in vars {
            self.reduce_variable(x);
            if self.is_bottom() {
                return;
            }
        }
    }

    fn reduce_all(&mut self) {
        let vars: Vec<Variable> = self.congruences.iter().map(|(v, _)| *v).collect();
        self.reduce(vars);
    }
}

impl<R: NumericalDomain> AbstractDomain for RelationalCongruence<R> {
    fn bottom() -> Self {
        Self {
            relational: R::bottom(),
            congruences: CongruenceDomain::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            relational: R::top(),
            congruences: CongruenceDomain::top(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.relational.is_bottom() || self.congruences.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.relational.is_top() && self.congruences.is_top()
    }

    fn leq(&self, rhs: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if rhs.is_bottom() {
            return false;
        }
        self.relational.leq(&rhs.relational) && self.congruences.leq(&rhs.congruences)
    }

    fn join_with(&mut self, rhs: Self) {
        if rhs.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        self.relational.join_with(rhs.relational);
        self.congruences.join_with(rhs.congruences);
        self.reduce_all();
    }

    fn meet_with(&mut self, rhs: Self) {
        self.relational.meet_with(rhs.relational);
        self.congruences.meet_with(rhs.congruences);
        self.reduce_all();
    }

    fn widen_with(&mut self, rhs: Self) {
        if rhs.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        self.relational.widen_with(rhs.relational);
        self.congruences.widen_with(rhs.congruences);
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.relational.narrow_with(rhs.relational);
        self.congruences.narrow_with(rhs.congruences);
        self.reduce_all();
    }

    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }
}

impl<R: NumericalDomain> NumericalDomain for RelationalCongruence<R> {
    fn domain_name(&self) -> &'static str {
        DomainKind::VarPackingDbmCongruence.name()
    }

    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        if self.is_bottom() {
            return;
        }
        self.relational.assign(x, e);
        self.congruences.assign(x, e);
        self.reduce([x]);
    }

    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand) {
        if self.is_bottom() {
            return;
        }
        self.relational.apply(op, x, y, z.clone());
        self.congruences.apply(op, x, y, z);
        self.reduce([x]);
    }

    fn add_constraint(&mut self, c: &LinearConstraint) {
        self.add_constraints(std::slice::from_ref(c));
    }

    fn add_constraints(&mut self, csts: &[LinearConstraint]) {
        if self.is_bottom() {
            return;
        }
        self.relational.add_constraints(csts);
        self.congruences.add_constraints(csts);
        self.reduce(csts.iter().flat_map(|c| c.variables()));
    }

    fn forget(&mut self, x: Variable) {
        self.relational.forget(x);
        self.congruences.forget(x);
    }

    fn to_interval(&self, x: Variable) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        IntervalCongruence::new(self.relational.to_interval(x), self.congruences.get(x))
            .interval()
            .clone()
    }
}

impl<R: NumericalDomain> fmt::Display for RelationalCongruence<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "({}, {})", self.relational, self.congruences)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_after_constraints() {
        let x = Variable::new(0);
        let y = Variable::new(1);
        let mut inv = VarPackingDbmCongruence::top();
        inv.assign(x, &(2 * y));
        assert_eq!(inv.congruence(x), Congruence::new(2, 0));

        inv.add_constraints(&[LinearConstraint::geq(x, 1), LinearConstraint::leq(x, 2)]);
        assert_eq!(inv.to_interval(x), Interval::singleton(2));
        assert_eq!(inv.relational().to_interval(x), Interval::singleton(2));
        assert_eq!(inv.congruence(x), Congruence::constant(2));

        let infeasible = inv.constrain(&LinearConstraint::equal(x, 3));
        assert!(infeasible.is_bottom());
    }

    #[test]
    fn test_relations_and_congruences() {
        let i = Variable::new(0);
        let j = Variable::new(1);
        let mut inv = VarPackingDbmCongruence::top();
        inv.assign(i, &0.into());
        inv.assign(j, &(i + 4));

        let mut next = inv.clone();
        next.apply(Operation::Add, i, i, 2.into());
        next.apply(Operation::Add, j, j, 2.into());

        let joined = inv.join(next);
        assert_eq!(joined.congruence(i), Congruence::new(2, 0));
        assert_eq!(joined.to_interval(i), Interval::range(0, 2));
        assert_eq!(joined.to_interval(j), Interval::range(4, 6));

        let mut odd = joined.clone();
        odd.add_constraint(&LinearConstraint::equal(i, 1));
        assert!(odd.is_bottom());
    }
}
