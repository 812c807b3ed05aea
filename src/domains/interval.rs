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
use crate::linear::Operation;
use crate::number::Number;

// Left shifts by more than this many bits are treated as unbounded.
const MAX_SHIFT: usize = 4096;

/*
 * An interval [lb, ub] of integers, with lb in Z U {-oo} and ub in
 * Z U {+oo}. Every constructor normalizes empty intervals to the single
 * canonical bottom (+oo, -oo), so structural equality is semantic equality.
 *
 * Arithmetic is sound: for every x in I1 and y in I2, x op y lies in
 * I1.op(I2). Bitwise operations are precise on constants and deliberately
 * coarse on unbounded or mixed-sign operands.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    lb: Bound,
    ub: Bound,
}

impl Interval {
    pub fn new(lb: Bound, ub: Bound) -> Self {
        if lb > ub || lb.is_plus_infinity() || ub.is_minus_infinity() {
            Self::bottom()
        } else {
            Self { lb, ub }
        }
    }

    pub fn singleton(n: impl Into<Number>) -> Self {
        let n = n.into();
        Self {
            lb: Bound::Finite(n.clone()),
            ub: Bound::Finite(n),
        }
    }

    pub fn range(lb: impl Into<Number>, ub: impl Into<Number>) -> Self {
        Self::new(Bound::Finite(lb.into()), Bound::Finite(ub.into()))
    }

    pub fn at_least(lb: impl Into<Number>) -> Self {
        Self::new(Bound::Finite(lb.into()), Bound::PlusInfinity)
    }

    pub fn at_most(ub: impl Into<Number>) -> Self {
        Self::new(Bound::MinusInfinity, Bound::Finite(ub.into()))
    }

    pub fn lb(&self) -> &Bound {
        &self.lb
    }

    pub fn ub(&self) -> &Bound {
        &self.ub
    }

    pub fn as_singleton(&self) -> Option<&Number> {
        match (&self.lb, &self.ub) {
            (Bound::Finite(l), Bound::Finite(u)) if l == u => Some(l),
            _ => None,
        }
    }

    pub fn contains(&self, n: &Number) -> bool {
        let b = Bound::Finite(n.clone());
        self.lb <= b && b <= self.ub
    }

    fn is_zero(&self) -> bool {
        self.as_singleton().map_or(false, Number::is_zero)
    }

    fn is_non_negative(&self) -> bool {
        !self.is_bottom() && !self.lb.is_negative()
    }

    fn is_negative(&self) -> bool {
        !self.is_bottom() && self.ub.is_negative()
    }

    fn hull(bounds: impl IntoIterator<Item = Bound>) -> Interval {
        let mut lb = Bound::PlusInfinity;
        let mut ub = Bound::MinusInfinity;
        for b in bounds {
            if b < lb {
                lb = b.clone();
            }
            if b > ub {
                ub = b;
            }
        }
        Interval::new(lb, ub)
    }

    pub fn neg(&self) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(-&self.ub, -&self.lb)
    }

    pub fn add(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        Interval::new(&self.lb + &rhs.lb, &self.ub + &rhs.ub)
    }

    pub fn sub(&self, rhs: &Interval) -> Interval {
        self.add(&rhs.neg())
    }

    pub fn mul(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        Self::hull([
            &self.lb * &rhs.lb,
            &self.lb * &rhs.ub,
            &self.ub * &rhs.lb,
            &self.ub * &rhs.ub,
        ])
    }

    /// Truncating division.
    pub fn div(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() || rhs.is_zero() {
            return Interval::bottom();
        }
        if rhs.contains(&Number::zero()) {
            return Interval::top();
        }
        Self::hull([
            self.lb.div_trunc(&rhs.lb),
            self.lb.div_trunc(&rhs.ub),
            self.ub.div_trunc(&rhs.lb),
            self.ub.div_trunc(&rhs.ub),
        ])
    }

    /// Signed remainder: |r| < |divisor| and r has the sign of the dividend.
    pub fn srem(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() || rhs.is_zero() {
            return Interval::bottom();
        }
        if let (Some(x), Some(y)) = (self.as_singleton(), rhs.as_singleton()) {
            return Interval::singleton(x.rem_trunc(y));
        }
        let same_sign = Interval::new(
            self.lb.clone().min(Bound::zero()),
            self.ub.clone().max(Bound::zero()),
        );
        match (rhs.lb.number(), rhs.ub.number()) {
            (Some(l), Some(u)) => {
                let m = std::cmp::max(l.abs(), u.abs()) - Number::one();
                same_sign.meet(Interval::range(-&m, m))
            }
            _ => same_sign,
        }
    }

    /// Unsigned remainder. Negative operands are reinterpreted as large
    /// unsigned values, so only the divisor bound survives for them.
    pub fn urem(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() || rhs.is_zero() {
            return Interval::bottom();
        }
        if let (Some(x), Some(y)) = (self.as_singleton(), rhs.as_singleton()) {
            if !x.is_negative() && !y.is_negative() {
                return Interval::singleton(x.rem_trunc(y));
            }
        }
        let divisor_bound = match rhs.ub.number() {
            Some(u) if rhs.is_non_negative() => Interval::range(0, u - Number::one()),
            _ => Interval::at_least(0),
        };
        if self.is_non_negative() {
            divisor_bound.meet(Interval::new(Bound::zero(), self.ub.clone()))
        } else {
            divisor_bound
        }
    }

    /// Largest value representable with as many bits as the upper bound.
    fn bit_mask_bound(ub: &Bound) -> Bound {
        match ub.number() {
            Some(u) => Bound::Finite(Number::pow2(u.bits() as usize) - Number::one()),
            None => Bound::PlusInfinity,
        }
    }

    pub fn and(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if let (Some(x), Some(y)) = (self.as_singleton(), rhs.as_singleton()) {
            return Interval::singleton(x.bit_and(y));
        }
        match (self.is_non_negative(), rhs.is_non_negative()) {
            (true, true) => {
                Interval::new(Bound::zero(), self.ub.clone().min(rhs.ub.clone()))
            }
            (true, false) => Interval::new(Bound::zero(), self.ub.clone()),
            (false, true) => Interval::new(Bound::zero(), rhs.ub.clone()),
            (false, false) if self.is_negative() && rhs.is_negative() => {
                // Clearing bits of a negative number never increases it.
                Interval::new(Bound::MinusInfinity, self.ub.clone().min(rhs.ub.clone()))
            }
            (false, false) => Interval::top(),
        }
    }

    pub fn or(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if let (Some(x), Some(y)) = (self.as_singleton(), rhs.as_singleton()) {
            return Interval::singleton(x.bit_or(y));
        }
        if self.is_non_negative() && rhs.is_non_negative() {
            let ub = Self::bit_mask_bound(&self.ub.clone().max(rhs.ub.clone()));
            return Interval::new(self.lb.clone().max(rhs.lb.clone()), ub);
        }
        if self.is_negative() && rhs.is_negative() {
            // Setting bits of a negative number never decreases it.
            return Interval::new(self.lb.clone().max(rhs.lb.clone()), Bound::finite(-1));
        }
        Interval::top()
    }

    pub fn xor(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if let (Some(x), Some(y)) = (self.as_singleton(), rhs.as_singleton()) {
            return Interval::singleton(x.bit_xor(y));
        }
        if self.is_non_negative() && rhs.is_non_negative() {
            let ub = Self::bit_mask_bound(&self.ub.clone().max(rhs.ub.clone()));
            return Interval::new(Bound::zero(), ub);
        }
        Interval::top()
    }

    /// x << s == x * 2^s. Negative shift amounts are undefined: top.
    pub fn shl(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if !rhs.is_non_negative() {
            return Interval::top();
        }
        let low_shift = rhs
            .lb
            .number()
            .and_then(Number::to_usize)
            .unwrap_or(MAX_SHIFT)
            .min(MAX_SHIFT);
        let high = match rhs.ub.number().and_then(Number::to_usize) {
            Some(s) if s <= MAX_SHIFT => Bound::Finite(Number::pow2(s)),
            _ => Bound::PlusInfinity,
        };
        self.mul(&Interval::new(Bound::Finite(Number::pow2(low_shift)), high))
    }

    fn shr_bound(b: &Bound, shift: &Bound) -> Bound {
        match b {
            Bound::Finite(n) => match shift.number().and_then(Number::to_usize) {
                Some(s) => Bound::Finite(n.shr(s)),
                // Shifted past every significant bit.
                None => Bound::finite(if n.is_negative() { -1 } else { 0 }),
            },
            _ => b.clone(),
        }
    }

    /// Arithmetic shift right, rounding toward -oo.
    pub fn ashr(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if !rhs.is_non_negative() {
            return Interval::top();
        }
        Self::hull([
            Self::shr_bound(&self.lb, &rhs.lb),
            Self::shr_bound(&self.lb, &rhs.ub),
            Self::shr_bound(&self.ub, &rhs.lb),
            Self::shr_bound(&self.ub, &rhs.ub),
        ])
    }

    /// Logical shift right. Agrees with `ashr` on non-negative operands;
    /// negative operands have no bounded unsigned interpretation.
    pub fn lshr(&self, rhs: &Interval) -> Interval {
        if self.is_bottom() || rhs.is_bottom() {
            return Interval::bottom();
        }
        if !rhs.is_non_negative() {
            return Interval::top();
        }
        if self.is_non_negative() {
            self.ashr(rhs)
        } else {
            Interval::at_least(0)
        }
    }

    pub fn apply(&self, op: Operation, rhs: &Interval) -> Interval {
        match op {
            Operation::Add => self.add(rhs),
            Operation::Sub => self.sub(rhs),
            Operation::Mul => self.mul(rhs),
            Operation::Div => self.div(rhs),
            Operation::SRem => self.srem(rhs),
            Operation::URem => self.urem(rhs),
            Operation::And => self.and(rhs),
            Operation::Or => self.or(rhs),
            Operation::Xor => self.xor(rhs),
            Operation::Shl => self.shl(rhs),
            Operation::LShr => self.lshr(rhs),
            Operation::AShr => self.ashr(rhs),
        }
    }

    /// Refines `self`, the interval of x, with `a * x kind residual` where
    /// residual is an interval over-approximating the rest of the constraint.
    pub fn refine_linear(&mut self, a: &Number, residual: &Interval, kind: ConstraintKind) {
        if self.is_bottom() || a.is_zero() {
            return;
        }
        if residual.is_bottom() {
            *self = Interval::bottom();
            return;
        }
        let refinement = match kind {
            ConstraintKind::Inequality => {
                // a * x <= sup(residual)
                if a.is_positive() {
                    Interval::new(Bound::MinusInfinity, residual.ub.div_floor(a))
                } else {
                    Interval::new(residual.ub.div_ceil(a), Bound::PlusInfinity)
                }
            }
            ConstraintKind::Equality => {
                if a.is_positive() {
                    Interval::new(residual.lb.div_ceil(a), residual.ub.div_floor(a))
                } else {
                    Interval::new(residual.ub.div_ceil(a), residual.lb.div_floor(a))
                }
            }
            ConstraintKind::Disequation => {
                let excluded = match residual.as_singleton() {
                    Some(k) if k.rem_trunc(a).is_zero() => k.div_trunc(a),
                    _ => return,
                };
                let excluded = Bound::Finite(excluded);
                let mut lb = self.lb.clone();
                let mut ub = self.ub.clone();
                if lb == excluded {
                    lb = &lb + &Bound::finite(1);
                }
                if ub == excluded {
                    ub = &ub - &Bound::finite(1);
                }
                Interval::new(lb, ub)
            }
        };
        self.meet_with(refinement);
    }
}

impl AbstractDomain for Interval {
    fn bottom() -> Self {
        Interval {
            lb: Bound::PlusInfinity,
            ub: Bound::MinusInfinity,
        }
    }

    fn top() -> Self {
        Interval {
            lb: Bound::MinusInfinity,
            ub: Bound::PlusInfinity,
        }
    }

    fn is_bottom(&self) -> bool {
        self.lb > self.ub
    }

    fn is_top(&self) -> bool {
        self.lb.is_minus_infinity() && self.ub.is_plus_infinity()
    }

    fn leq(&self, rhs: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if rhs.is_bottom() {
            return false;
        }
        rhs.lb <= self.lb && self.ub <= rhs.ub
    }

    fn join_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            *self = rhs;
        } else if !rhs.is_bottom() {
            if rhs.lb < self.lb {
                self.lb = rhs.lb;
            }
            if rhs.ub > self.ub {
                self.ub = rhs.ub;
            }
        }
    }

    fn meet_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            return;
        }
        if rhs.is_bottom() {
            *self = rhs;
            return;
        }
        let lb = std::mem::replace(&mut self.lb, Bound::MinusInfinity).max(rhs.lb);
        let ub = std::mem::replace(&mut self.ub, Bound::PlusInfinity).min(rhs.ub);
        *self = Interval::new(lb, ub);
    }

    /// Bounds that moved are pushed to infinity.
    fn widen_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        if rhs.is_bottom() {
            return;
        }
        if rhs.lb < self.lb {
            self.lb = Bound::MinusInfinity;
        }
        if rhs.ub > self.ub {
            self.ub = Bound::PlusInfinity;
        }
    }

    /// Only infinite bounds are refined.
    fn narrow_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            return;
        }
        if rhs.is_bottom() {
            *self = rhs;
            return;
        }
        let lb = if self.lb.is_minus_infinity() {
            rhs.lb
        } else {
            self.lb.clone()
        };
        let ub = if self.ub.is_plus_infinity() {
            rhs.ub
        } else {
            self.ub.clone()
        };
        *self = Interval::new(lb, ub);
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "[{}, {}]", self.lb, self.ub)
        }
    }
}
