/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::bound::Bound;
use crate::datatype::AbstractDomain;
use crate::domains::Congruence;
use crate::domains::Interval;
use crate::linear::ConstraintKind;
use crate::linear::Operation;
use crate::number::Number;

/// Number of interval/congruence refinement rounds run after each operation.
/// Two rounds suffice for a singleton interval found in the first round to
/// be propagated back into the congruence.
pub const REDUCTION_ROUNDS: usize = 2;

/*
 * Reduced product of an interval and a congruence describing the same
 * value. After every operation the congruence snaps the interval bounds to
 * the nearest members of the class, and a singleton interval pins the
 * congruence down to a constant.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntervalCongruence {
    interval: Interval,
    congruence: Congruence,
}

impl IntervalCongruence {
    pub fn new(interval: Interval, congruence: Congruence) -> Self {
        let mut value = Self {
            interval,
            congruence,
        };
        value.reduce();
        value
    }

    pub fn singleton(n: impl Into<Number>) -> Self {
        let n = n.into();
        Self::new(Interval::singleton(n.clone()), Congruence::constant(n))
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn congruence(&self) -> &Congruence {
        &self.congruence
    }

    fn reduce(&mut self) {
        for _ in 0..REDUCTION_ROUNDS {
            if self.interval.is_bottom() || self.congruence.is_bottom() {
                self.set_to_bottom();
                return;
            }
            let before = self.clone();

            if let (Some(a), Some(b)) = (self.congruence.modulus(), self.congruence.residue()) {
                if a.is_zero() {
                    self.interval.meet_with(Interval::singleton(b.clone()));
                } else {
                    let lb = match self.interval.lb() {
                        Bound::Finite(l) => Bound::Finite(l + &(b - l).rem_euclid(a)),
                        lb => lb.clone(),
                    };
                    let ub = match self.interval.ub() {
                        Bound::Finite(u) => Bound::Finite(u - &(u - b).rem_euclid(a)),
                        ub => ub.clone(),
                    };
                    self.interval = Interval::new(lb, ub);
                }
            }

            if let Some(n) = self.interval.as_singleton() {
                let n = n.clone();
                self.congruence.meet_with(Congruence::constant(n));
            }

            if self.interval.is_bottom() || self.congruence.is_bottom() {
                self.set_to_bottom();
                return;
            }
            if *self == before {
                return;
            }
        }
    }

    pub fn apply(&self, op: Operation, rhs: &IntervalCongruence) -> IntervalCongruence {
        IntervalCongruence::new(
            self.interval.apply(op, &rhs.interval),
            self.congruence.apply(op, &rhs.congruence),
        )
    }

    pub fn refine_linear(&mut self, a: &Number, residual: &IntervalCongruence, kind: ConstraintKind) {
        self.interval.refine_linear(a, &residual.interval, kind);
        self.congruence.refine_linear(a, &residual.congruence, kind);
        self.reduce();
    }
}

impl AbstractDomain for IntervalCongruence {
    fn bottom() -> Self {
        Self {
            interval: Interval::bottom(),
            congruence: Congruence::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            interval: Interval::top(),
            congruence: Congruence::top(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.interval.is_bottom() || self.congruence.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.interval.is_top() && self.congruence.is_top()
    }

    fn leq(&self, rhs: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if rhs.is_bottom() {
            return false;
        }
        self.interval.leq(&rhs.interval) && self.congruence.leq(&rhs.congruence)
    }

    fn join_with(&mut self, rhs: Self) {
        self.interval.join_with(rhs.interval);
        self.congruence.join_with(rhs.congruence);
        self.reduce();
    }

    fn meet_with(&mut self, rhs: Self) {
        self.interval.meet_with(rhs.interval);
        self.congruence.meet_with(rhs.congruence);
        self.reduce();
    }

    fn widen_with(&mut self, rhs: Self) {
        self.interval.widen_with(rhs.interval);
        self.congruence.widen_with(rhs.congruence);
        self.reduce();
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.interval.narrow_with(rhs.interval);
        self.congruence.narrow_with(rhs.congruence);
        self.reduce();
    }
}

impl fmt::Display for IntervalCongruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "({}, {})", self.interval, self.congruence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction() {
        let v = IntervalCongruence::new(Interval::range(1, 10), Congruence::new(4, 0));
        assert_eq!(v.interval(), &Interval::range(4, 8));

        let v = IntervalCongruence::new(Interval::range(5, 7), Congruence::new(4, 2));
        assert_eq!(v.interval(), &Interval::singleton(6));
        assert_eq!(v.congruence(), &Congruence::constant(6));

        let v = IntervalCongruence::new(Interval::range(5, 7), Congruence::new(8, 0));
        assert!(v.is_bottom());
        assert_eq!(v, IntervalCongruence::bottom());

        let v = IntervalCongruence::new(Interval::at_least(3), Congruence::new(5, 1));
        assert_eq!(v.interval(), &Interval::at_least(6));
    }

    #[test]
    fn test_lattice() {
        let a = IntervalCongruence::singleton(2);
        let b = IntervalCongruence::singleton(8);
        let joined = a.clone().join(b.clone());
        assert_eq!(joined.interval(), &Interval::range(2, 8));
        assert_eq!(joined.congruence(), &Congruence::new(6, 2));
        assert!(a.leq(&joined));
        assert!(b.leq(&joined));
        assert!(a.meet(b).is_bottom());
    }

    #[test]
    fn test_apply() {
        let x = IntervalCongruence::new(Interval::range(0, 10), Congruence::new(2, 0));
        let doubled = x.apply(Operation::Mul, &IntervalCongruence::singleton(2));
        assert_eq!(doubled.interval(), &Interval::range(0, 20));
        assert_eq!(doubled.congruence(), &Congruence::new(4, 0));
    }
}
