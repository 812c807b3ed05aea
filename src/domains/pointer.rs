/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Pointer-aware domains and the capability dispatch used by generic code.
//!
//! A domain supports pointer operations when its
//! `NumericalDomain::as_pointer_domain{,_mut}` probes return `Some`. The free
//! functions of this module work on any `NumericalDomain`: on a domain
//! without the capability the mutators do nothing, while the queries fail
//! with `DomainError::Unsupported` rather than return a made-up answer.

use std::fmt;

use log::trace;

use crate::datatype::AbstractDomain;
use crate::datatype::AbstractEnvironment;
use crate::datatype::DiscreteDomain;
use crate::datatype::Environment;
use crate::domains::interval_constraints;
use crate::domains::Interval;
use crate::domains::NumericalDomain;
use crate::error::DomainError;
use crate::error::DomainResult;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::variable::Variable;

/// Set of memory objects a pointer may address. `Top` is an unknown address.
pub type PointsToSet = DiscreteDomain<Variable>;

/// Operations of domains tracking, for each pointer, the objects it may
/// point to and its offset within them.
pub trait PointerDomain {
    /// p = &obj
    fn assign_object(&mut self, p: Variable, obj: Variable);

    /// p = q
    fn assign_pointer(&mut self, p: Variable, q: Variable);

    /// p = q + offset
    fn assign_pointer_offset(&mut self, p: Variable, q: Variable, offset: Operand);

    /// p == q, or p != q when `equality` is false.
    fn assert_pointer(&mut self, equality: bool, p: Variable, q: Variable);

    fn refine_addrs(&mut self, p: Variable, addrs: PointsToSet);

    fn refine_addrs_offset(&mut self, p: Variable, addrs: PointsToSet, offset: Interval);

    fn is_unknown_addr(&self, p: Variable) -> bool;

    fn addrs_set(&self, p: Variable) -> PointsToSet;

    /// The numerical variable holding the offset of p.
    fn offset_var(&self, p: Variable) -> Variable {
        p
    }

    fn forget_pointer(&mut self, p: Variable);
}

pub fn assign_object<D: NumericalDomain + ?Sized>(inv: &mut D, p: Variable, obj: Variable) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.assign_object(p, obj);
    }
}

pub fn assign_pointer<D: NumericalDomain + ?Sized>(inv: &mut D, p: Variable, q: Variable) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.assign_pointer(p, q);
    }
}

pub fn assign_pointer_offset<D: NumericalDomain + ?Sized>(
    inv: &mut D,
    p: Variable,
    q: Variable,
    offset: Operand,
) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.assign_pointer_offset(p, q, offset);
    }
}

pub fn assert_pointer<D: NumericalDomain + ?Sized>(
    inv: &mut D,
    equality: bool,
    p: Variable,
    q: Variable,
) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.assert_pointer(equality, p, q);
    }
}

pub fn refine_addrs<D: NumericalDomain + ?Sized>(inv: &mut D, p: Variable, addrs: PointsToSet) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.refine_addrs(p, addrs);
    }
}

pub fn refine_addrs_offset<D: NumericalDomain + ?Sized>(
    inv: &mut D,
    p: Variable,
    addrs: PointsToSet,
    offset: Interval,
) {
    if let Some(ptr) = inv.as_pointer_domain_mut() {
        ptr.refine_addrs_offset(p, addrs, offset);
    }
}

pub fn is_unknown_addr<D: NumericalDomain + ?Sized>(inv: &D, p: Variable) -> DomainResult<bool> {
    match inv.as_pointer_domain() {
        Some(ptr) => Ok(ptr.is_unknown_addr(p)),
        None => Err(DomainError::unsupported("is_unknown_addr", inv.domain_name())),
    }
}

pub fn addrs_set<D: NumericalDomain + ?Sized>(inv: &D, p: Variable) -> DomainResult<PointsToSet> {
    match inv.as_pointer_domain() {
        Some(ptr) => Ok(ptr.addrs_set(p)),
        None => Err(DomainError::unsupported("addrs_set", inv.domain_name())),
    }
}

pub fn offset_var<D: NumericalDomain + ?Sized>(inv: &D, p: Variable) -> DomainResult<Variable> {
    match inv.as_pointer_domain() {
        Some(ptr) => Ok(ptr.offset_var(p)),
        None => Err(DomainError::unsupported("offset_var", inv.domain_name())),
    }
}

/*
 * A points-to set per pointer, plus a numerical domain holding every
 * pointer's offset under the pointer's own variable. Pointers with no
 * binding may point anywhere.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointsToDomain<D> {
    scalars: D,
    addrs: Environment<Variable, PointsToSet>,
}

impl<D: NumericalDomain> PointsToDomain<D> {
    pub fn scalars(&self) -> &D {
        &self.scalars
    }

    fn settle(&mut self) {
        if self.scalars.is_bottom() || self.addrs.is_bottom() {
            self.set_to_bottom();
        }
    }
}

impl<D: NumericalDomain> AbstractDomain for PointsToDomain<D> {
    fn bottom() -> Self {
        Self {
            scalars: D::bottom(),
            addrs: Environment::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            scalars: D::top(),
            addrs: Environment::top(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.scalars.is_bottom() || self.addrs.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.scalars.is_top() && self.addrs.is_top()
    }

    fn leq(&self, rhs: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if rhs.is_bottom() {
            return false;
        }
        self.scalars.leq(&rhs.scalars) && self.addrs.leq(&rhs.addrs)
    }

    fn join_with(&mut self, rhs: Self) {
        if rhs.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        self.scalars.join_with(rhs.scalars);
        self.addrs.join_with(rhs.addrs);
    }

    fn meet_with(&mut self, rhs: Self) {
        self.scalars.meet_with(rhs.scalars);
        self.addrs.meet_with(rhs.addrs);
        self.settle();
    }

    fn widen_with(&mut self, rhs: Self) {
        if rhs.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        self.scalars.widen_with(rhs.scalars);
        self.addrs.widen_with(rhs.addrs);
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.scalars.narrow_with(rhs.scalars);
        self.addrs.narrow_with(rhs.addrs);
        self.settle();
    }

    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }
}

impl<D: NumericalDomain> NumericalDomain for PointsToDomain<D> {
    fn domain_name(&self) -> &'static str {
        "points-to"
    }

    /// A numerical write to x drops the objects x pointed to.
    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        self.addrs.forget(&x);
        self.scalars.assign(x, e);
        self.settle();
    }

    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand) {
        self.addrs.forget(&x);
        self.scalars.apply(op, x, y, z);
        self.settle();
    }

    fn add_constraint(&mut self, c: &LinearConstraint) {
        self.scalars.add_constraint(c);
        self.settle();
    }

    fn forget(&mut self, x: Variable) {
        self.scalars.forget(x);
        self.addrs.forget(&x);
    }

    fn to_interval(&self, x: Variable) -> Interval {
        self.scalars.to_interval(x)
    }

    fn as_pointer_domain(&self) -> Option<&dyn PointerDomain> {
        Some(self)
    }

    fn as_pointer_domain_mut(&mut self) -> Option<&mut dyn PointerDomain> {
        Some(self)
    }
}

impl<D: NumericalDomain> PointerDomain for PointsToDomain<D> {
    fn assign_object(&mut self, p: Variable, obj: Variable) {
        if self.is_bottom() {
            return;
        }
        self.addrs.set(p, PointsToSet::singleton(obj));
        self.scalars.assign(p, &0.into());
    }

    fn assign_pointer(&mut self, p: Variable, q: Variable) {
        if self.is_bottom() {
            return;
        }
        let addrs = self.addrs.get(&q).into_owned();
        self.addrs.set(p, addrs);
        self.scalars.assign(p, &q.into());
    }

    fn assign_pointer_offset(&mut self, p: Variable, q: Variable, offset: Operand) {
        if self.is_bottom() {
            return;
        }
        let addrs = self.addrs.get(&q).into_owned();
        self.addrs.set(p, addrs);
        self.scalars.apply(Operation::Add, p, q, offset);
        self.settle();
    }

    fn assert_pointer(&mut self, equality: bool, p: Variable, q: Variable) {
        if self.is_bottom() {
            return;
        }
        let p_addrs = self.addrs.get(&p).into_owned();
        let q_addrs = self.addrs.get(&q).into_owned();
        if equality {
            let common = p_addrs.meet(q_addrs);
            self.addrs.set(p, common.clone());
            self.addrs.set(q, common);
            self.scalars.add_constraint(&LinearConstraint::equal(p, q));
        } else {
            let same_object = match (p_addrs.as_singleton(), q_addrs.as_singleton()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if same_object {
                self.scalars.add_constraint(&LinearConstraint::not_equal(p, q));
            }
        }
        if self.scalars.is_bottom() || self.addrs.is_bottom() {
            trace!("pointer assertion on {} and {} is infeasible", p, q);
        }
        self.settle();
    }

    fn refine_addrs(&mut self, p: Variable, addrs: PointsToSet) {
        if self.is_bottom() {
            return;
        }
        self.addrs.update(&p, |current| current.meet_with(addrs));
        self.settle();
    }

    fn refine_addrs_offset(&mut self, p: Variable, addrs: PointsToSet, offset: Interval) {
        if self.is_bottom() {
            return;
        }
        if offset.is_bottom() {
            self.set_to_bottom();
            return;
        }
        self.refine_addrs(p, addrs);
        self.scalars
            .add_constraints(&interval_constraints(self.offset_var(p), &offset));
        self.settle();
    }

    fn is_unknown_addr(&self, p: Variable) -> bool {
        !self.is_bottom() && self.addrs.get(&p).is_top()
    }

    fn addrs_set(&self, p: Variable) -> PointsToSet {
        if self.is_bottom() {
            return PointsToSet::bottom();
        }
        self.addrs.get(&p).into_owned()
    }

    fn forget_pointer(&mut self, p: Variable) {
        self.forget(p);
    }
}

impl<D: NumericalDomain> fmt::Display for PointsToDomain<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "({}, {})", self.addrs, self.scalars)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::IntervalDomain;

    #[test]
    fn test_points_to() {
        let p = Variable::new(0);
        let q = Variable::new(1);
        let a = Variable::new(10);
        let b = Variable::new(11);

        let mut inv = PointsToDomain::<IntervalDomain>::top();
        assert_eq!(is_unknown_addr(&inv, p), Ok(true));

        assign_object(&mut inv, p, a);
        assign_pointer_offset(&mut inv, q, p, 4.into());
        assert_eq!(addrs_set(&inv, q), Ok(PointsToSet::singleton(a)));
        assert_eq!(inv.to_interval(offset_var(&inv, q).unwrap()), Interval::singleton(4));

        let mut other = PointsToDomain::<IntervalDomain>::top();
        assign_object(&mut other, p, b);
        let joined = inv.clone().join(other);
        assert_eq!(
            joined.addrs_set(p),
            [a, b].into_iter().collect::<PointsToSet>()
        );

        let mut refined = joined.clone();
        refine_addrs(&mut refined, p, PointsToSet::singleton(b));
        assert_eq!(refined.addrs_set(p), PointsToSet::singleton(b));

        refine_addrs(&mut refined, p, PointsToSet::singleton(a));
        assert!(refined.is_bottom());
    }

    #[test]
    fn test_assert_pointer() {
        let p = Variable::new(0);
        let q = Variable::new(1);
        let a = Variable::new(10);

        let mut inv = PointsToDomain::<IntervalDomain>::top();
        assign_object(&mut inv, p, a);
        assign_pointer(&mut inv, q, p);
        let mut disequal = inv.clone();
        assert_pointer(&mut disequal, false, p, q);
        assert!(disequal.is_bottom());

        assert_pointer(&mut inv, true, p, q);
        assert!(!inv.is_bottom());

        refine_addrs_offset(&mut inv, q, PointsToSet::top(), Interval::range(1, 8));
        assert!(inv.is_bottom());
    }

    #[test]
    fn test_non_pointer_domain() {
        let p = Variable::new(0);
        let mut inv = IntervalDomain::top();
        assign_object(&mut inv, p, Variable::new(1));
        assign_pointer_offset(&mut inv, p, p, 1.into());
        assert!(inv.is_top());
        assert_eq!(
            addrs_set(&inv, p),
            Err(DomainError::unsupported("addrs_set", "interval"))
        );
        assert!(matches!(
            is_unknown_addr(&inv, p),
            Err(DomainError::Unsupported { .. })
        ));
        assert!(offset_var(&inv, p).is_err());
    }

    #[test]
    fn test_scalar_write_clears_points_to() {
        let p = Variable::new(0);
        let q = Variable::new(1);
        let a = Variable::new(10);

        let mut inv = PointsToDomain::<IntervalDomain>::top();
        assign_object(&mut inv, p, a);
        assign_object(&mut inv, q, a);
        inv.assign(p, &7.into());
        assert!(inv.addrs_set(p).is_top());
        assert_eq!(inv.to_interval(p), Interval::singleton(7));

        inv.apply(Operation::Mul, q, p, 2.into());
        assert!(inv.addrs_set(q).is_top());
        assert_eq!(inv.to_interval(q), Interval::singleton(14));
    }
}
