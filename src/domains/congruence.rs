/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::datatype::AbstractDomain;
use crate::domains::Interval;
use crate::linear::ConstraintKind;
use crate::linear::Operation;
use crate::number::Number;

// Left shifts by more than this many bits lose all congruence information.
const MAX_SHIFT: usize = 4096;

/*
 * Granger's congruence lattice: aZ + b = {a*k + b | k in Z}.
 *
 * Values are kept normalized: a >= 0, and 0 <= b < a when a > 0. A modulus
 * of 0 denotes the constant {b}; top is 1Z + 0.
 *
 * Ascending chains are finite (each strict step divides the modulus), so
 * widening is the join and narrowing is the meet.
 */
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Congruence {
    Bottom,
    Value { modulus: Number, residue: Number },
}

impl Congruence {
    pub fn new(modulus: impl Into<Number>, residue: impl Into<Number>) -> Self {
        let modulus = modulus.into().abs();
        let residue = residue.into();
        let residue = if modulus.is_zero() {
            residue
        } else {
            residue.rem_euclid(&modulus)
        };
        Congruence::Value { modulus, residue }
    }

    pub fn constant(n: impl Into<Number>) -> Self {
        Congruence::new(0, n)
    }

    pub fn modulus(&self) -> Option<&Number> {
        match self {
            Congruence::Value { modulus, .. } => Some(modulus),
            Congruence::Bottom => None,
        }
    }

    pub fn residue(&self) -> Option<&Number> {
        match self {
            Congruence::Value { residue, .. } => Some(residue),
            Congruence::Bottom => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Number> {
        match self {
            Congruence::Value { modulus, residue } if modulus.is_zero() => Some(residue),
            _ => None,
        }
    }

    pub fn contains(&self, n: &Number) -> bool {
        match self {
            Congruence::Bottom => false,
            Congruence::Value { modulus, residue } if modulus.is_zero() => n == residue,
            Congruence::Value { modulus, residue } => (n - residue).rem_euclid(modulus).is_zero(),
        }
    }

    fn parts(&self) -> Option<(&Number, &Number)> {
        match self {
            Congruence::Value { modulus, residue } => Some((modulus, residue)),
            Congruence::Bottom => None,
        }
    }

    pub fn add(&self, rhs: &Congruence) -> Congruence {
        match (self.parts(), rhs.parts()) {
            (Some((a1, b1)), Some((a2, b2))) => Congruence::new(a1.gcd(a2), b1 + b2),
            _ => Congruence::Bottom,
        }
    }

    pub fn sub(&self, rhs: &Congruence) -> Congruence {
        match (self.parts(), rhs.parts()) {
            (Some((a1, b1)), Some((a2, b2))) => Congruence::new(a1.gcd(a2), b1 - b2),
            _ => Congruence::Bottom,
        }
    }

    pub fn neg(&self) -> Congruence {
        Congruence::constant(0).sub(self)
    }

    /// (a1Z + b1) * (a2Z + b2) is in gcd(a1*a2, a1*b2, a2*b1)Z + b1*b2.
    pub fn mul(&self, rhs: &Congruence) -> Congruence {
        match (self.parts(), rhs.parts()) {
            (Some((a1, b1)), Some((a2, b2))) => {
                let modulus = (a1 * a2).gcd(&(a1 * b2)).gcd(&(a2 * b1));
                Congruence::new(modulus, b1 * b2)
            }
            _ => Congruence::Bottom,
        }
    }

    /// Truncating division. Exact when the divisor is a constant dividing
    /// both the modulus and the residue.
    pub fn div(&self, rhs: &Congruence) -> Congruence {
        let ((a1, b1), (_, _)) = match (self.parts(), rhs.parts()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Congruence::Bottom,
        };
        match rhs.as_constant() {
            Some(d) if d.is_zero() => Congruence::Bottom,
            Some(d) => {
                if a1.is_zero() {
                    Congruence::constant(b1.div_trunc(d))
                } else if a1.rem_trunc(d).is_zero() && b1.rem_trunc(d).is_zero() {
                    Congruence::new(a1.div_trunc(d), b1.div_trunc(d))
                } else {
                    Congruence::top()
                }
            }
            None => Congruence::top(),
        }
    }

    /// x - q*y is congruent to b1 modulo gcd(a1, a2, b2).
    pub fn srem(&self, rhs: &Congruence) -> Congruence {
        let ((a1, b1), (a2, b2)) = match (self.parts(), rhs.parts()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Congruence::Bottom,
        };
        if let Some(d) = rhs.as_constant() {
            if d.is_zero() {
                return Congruence::Bottom;
            }
            if a1.is_zero() {
                return Congruence::constant(b1.rem_trunc(d));
            }
        }
        Congruence::new(a1.gcd(a2).gcd(b2), b1.clone())
    }

    pub fn urem(&self, rhs: &Congruence) -> Congruence {
        if self.is_bottom() || rhs.is_bottom() {
            return Congruence::Bottom;
        }
        match (self.as_constant(), rhs.as_constant()) {
            (_, Some(d)) if d.is_zero() => Congruence::Bottom,
            (Some(x), Some(d)) if !x.is_negative() && !d.is_negative() => {
                Congruence::constant(x.rem_trunc(d))
            }
            _ => Congruence::top(),
        }
    }

    fn bitwise(&self, rhs: &Congruence, op: impl Fn(&Number, &Number) -> Number) -> Congruence {
        if self.is_bottom() || rhs.is_bottom() {
            return Congruence::Bottom;
        }
        match (self.as_constant(), rhs.as_constant()) {
            (Some(x), Some(y)) => Congruence::constant(op(x, y)),
            _ => Congruence::top(),
        }
    }

    /// x << k == x * 2^k for a constant shift amount k.
    pub fn shl(&self, rhs: &Congruence) -> Congruence {
        if self.is_bottom() || rhs.is_bottom() {
            return Congruence::Bottom;
        }
        match rhs.as_constant() {
            Some(k) if !k.is_negative() => match k.to_usize().filter(|k| *k <= MAX_SHIFT) {
                Some(k) => self.mul(&Congruence::constant(Number::pow2(k))),
                None => Congruence::top(),
            },
            _ => Congruence::top(),
        }
    }

    fn shr(&self, rhs: &Congruence, logical: bool) -> Congruence {
        if self.is_bottom() || rhs.is_bottom() {
            return Congruence::Bottom;
        }
        match (self.as_constant(), rhs.as_constant()) {
            (Some(x), Some(k)) if !k.is_negative() && !(logical && x.is_negative()) => {
                match k.to_usize() {
                    Some(k) => Congruence::constant(x.shr(k)),
                    None => Congruence::top(),
                }
            }
            _ => Congruence::top(),
        }
    }

    pub fn apply(&self, op: Operation, rhs: &Congruence) -> Congruence {
        match op {
            Operation::Add => self.add(rhs),
            Operation::Sub => self.sub(rhs),
            Operation::Mul => self.mul(rhs),
            Operation::Div => self.div(rhs),
            Operation::SRem => self.srem(rhs),
            Operation::URem => self.urem(rhs),
            Operation::And => self.bitwise(rhs, Number::bit_and),
            Operation::Or => self.bitwise(rhs, Number::bit_or),
            Operation::Xor => self.bitwise(rhs, Number::bit_xor),
            Operation::Shl => self.shl(rhs),
            Operation::LShr => self.shr(rhs, true),
            Operation::AShr => self.shr(rhs, false),
        }
    }

    /// Refines `self`, the congruence of x, with `a * x kind residual`.
    pub fn refine_linear(&mut self, a: &Number, residual: &Congruence, kind: ConstraintKind) {
        if self.is_bottom() || a.is_zero() {
            return;
        }
        if residual.is_bottom() {
            *self = Congruence::Bottom;
            return;
        }
        match kind {
            ConstraintKind::Equality => {
                if a.is_one() {
                    self.meet_with(residual.clone());
                } else if (-a).is_one() {
                    self.meet_with(residual.neg());
                } else if let Some(k) = residual.as_constant() {
                    if k.rem_trunc(a).is_zero() {
                        self.meet_with(Congruence::constant(k.div_trunc(a)));
                    } else {
                        *self = Congruence::Bottom;
                    }
                }
            }
            ConstraintKind::Disequation => {
                if let (Some(x), Some(k)) = (self.as_constant(), residual.as_constant()) {
                    if &(a * x) == k {
                        *self = Congruence::Bottom;
                    }
                }
            }
            ConstraintKind::Inequality => {}
        }
    }

    pub fn to_interval(&self) -> Interval {
        match self {
            Congruence::Bottom => Interval::bottom(),
            Congruence::Value { modulus, residue } if modulus.is_zero() => {
                Interval::singleton(residue.clone())
            }
            Congruence::Value { .. } => Interval::top(),
        }
    }
}

impl AbstractDomain for Congruence {
    fn bottom() -> Self {
        Congruence::Bottom
    }

    fn top() -> Self {
        Congruence::new(1, 0)
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Congruence::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Congruence::Value { modulus, .. } if modulus.is_one())
    }

    fn leq(&self, rhs: &Self) -> bool {
        match (self.parts(), rhs.parts()) {
            (None, _) => true,
            (_, None) => false,
            (Some((a1, b1)), Some((a2, b2))) => {
                if a2.is_zero() {
                    a1.is_zero() && b1 == b2
                } else {
                    a1.rem_trunc(a2).is_zero() && (b1 - b2).rem_euclid(a2).is_zero()
                }
            }
        }
    }

    fn join_with(&mut self, rhs: Self) {
        if self.is_bottom() {
            *self = rhs;
            return;
        }
        if let (Some((a1, b1)), Some((a2, b2))) = (self.parts(), rhs.parts()) {
            let modulus = a1.gcd(a2).gcd(&(b1 - b2));
            *self = Congruence::new(modulus, b1.clone());
        }
    }

    /// Chinese remainder theorem; _|_ when the classes are disjoint.
    fn meet_with(&mut self, rhs: Self) {
        let met = match (self.parts(), rhs.parts()) {
            (None, _) => return,
            (_, None) => Congruence::Bottom,
            (Some((a1, b1)), Some((a2, b2))) => {
                if a1.is_zero() {
                    if rhs.contains(b1) {
                        return;
                    }
                    Congruence::Bottom
                } else if a2.is_zero() {
                    if self.contains(b2) {
                        rhs.clone()
                    } else {
                        Congruence::Bottom
                    }
                } else {
                    let (g, p, _) = a1.extended_gcd(a2);
                    let diff = b2 - b1;
                    if !diff.rem_trunc(&g).is_zero() {
                        Congruence::Bottom
                    } else {
                        // x = b1 + a1 * t with a1 * t = b2 - b1 (mod a2).
                        let m = a2.div_trunc(&g);
                        let t = (diff.div_trunc(&g) * p).rem_euclid(&m);
                        let lcm = a1.div_trunc(&g) * a2;
                        Congruence::new(lcm, b1 + &(a1 * &t))
                    }
                }
            }
        };
        *self = met;
    }

    fn widen_with(&mut self, rhs: Self) {
        self.join_with(rhs);
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.meet_with(rhs);
    }
}

impl fmt::Display for Congruence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Congruence::Bottom => write!(f, "_|_"),
            Congruence::Value { modulus, residue } if modulus.is_zero() => {
                write!(f, "{}", residue)
            }
            Congruence::Value { modulus, .. } if modulus.is_one() => write!(f, "Z"),
            Congruence::Value { modulus, residue } if residue.is_zero() => {
                write!(f, "{}Z", modulus)
            }
            Congruence::Value { modulus, residue } => write!(f, "{}Z+{}", modulus, residue),
        }
    }
}
