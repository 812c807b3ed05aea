/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::number::Number;

/*
 * A number extended with -oo and +oo. Used for interval endpoints and for
 * the entries of difference-bound and octagon matrices.
 *
 * The derived ordering relies on the declaration order of the variants:
 * -oo < every finite value < +oo.
 *
 * Arithmetic follows the usual conventions of the extended integers, with
 * 0 * oo = 0. Adding +oo and -oo is undefined and panics; the domains never
 * combine bounds of opposite infinite signs.
 */
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    MinusInfinity,
    Finite(Number),
    PlusInfinity,
}

impl Bound {
    pub fn finite(n: impl Into<Number>) -> Self {
        Bound::Finite(n.into())
    }

    pub fn zero() -> Self {
        Bound::Finite(Number::zero())
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    pub fn is_infinite(&self) -> bool {
        !self.is_finite()
    }

    pub fn is_plus_infinity(&self) -> bool {
        matches!(self, Bound::PlusInfinity)
    }

    pub fn is_minus_infinity(&self) -> bool {
        matches!(self, Bound::MinusInfinity)
    }

    pub fn number(&self) -> Option<&Number> {
        match self {
            Bound::Finite(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Bound::Finite(n) if n.is_zero())
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Bound::MinusInfinity => true,
            Bound::Finite(n) => n.is_negative(),
            Bound::PlusInfinity => false,
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Bound::MinusInfinity => false,
            Bound::Finite(n) => n.is_positive(),
            Bound::PlusInfinity => true,
        }
    }

    fn infinity_with_sign(negative: bool) -> Bound {
        if negative {
            Bound::MinusInfinity
        } else {
            Bound::PlusInfinity
        }
    }

    /// Truncating division. `finite / oo == 0`; dividing by a finite zero
    /// is a caller error.
    pub fn div_trunc(&self, rhs: &Bound) -> Bound {
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => {
                assert!(!b.is_zero(), "division of a bound by zero");
                Bound::Finite(a.div_trunc(b))
            }
            (Bound::Finite(_), _) => Bound::zero(),
            (_, Bound::Finite(b)) => {
                assert!(!b.is_zero(), "division of a bound by zero");
                Bound::infinity_with_sign(self.is_negative() != b.is_negative())
            }
            _ => Bound::infinity_with_sign(self.is_negative() != rhs.is_negative()),
        }
    }

    /// Division by a non-zero constant, rounding toward -oo.
    pub fn div_floor(&self, rhs: &Number) -> Bound {
        match self {
            Bound::Finite(a) => Bound::Finite(a.div_floor(rhs)),
            _ => Bound::infinity_with_sign(self.is_negative() != rhs.is_negative()),
        }
    }

    /// Division by a non-zero constant, rounding toward +oo.
    pub fn div_ceil(&self, rhs: &Number) -> Bound {
        match self {
            Bound::Finite(a) => Bound::Finite(a.div_ceil(rhs)),
            _ => Bound::infinity_with_sign(self.is_negative() != rhs.is_negative()),
        }
    }
}

impl From<Number> for Bound {
    fn from(n: Number) -> Self {
        Bound::Finite(n)
    }
}

impl From<i64> for Bound {
    fn from(n: i64) -> Self {
        Bound::Finite(Number::from(n))
    }
}

impl From<i32> for Bound {
    fn from(n: i32) -> Self {
        Bound::Finite(Number::from(n))
    }
}

impl<'a, 'b> Add<&'b Bound> for &'a Bound {
    type Output = Bound;

    fn add(self, rhs: &'b Bound) -> Bound {
        use Bound::*;
        match (self, rhs) {
            (Finite(a), Finite(b)) => Finite(a + b),
            (PlusInfinity, MinusInfinity) | (MinusInfinity, PlusInfinity) => {
                panic!("undefined addition of +oo and -oo")
            }
            (PlusInfinity, _) | (_, PlusInfinity) => PlusInfinity,
            (MinusInfinity, _) | (_, MinusInfinity) => MinusInfinity,
        }
    }
}

impl<'a, 'b> Sub<&'b Bound> for &'a Bound {
    type Output = Bound;

    fn sub(self, rhs: &'b Bound) -> Bound {
        self + &(-rhs)
    }
}

impl<'a, 'b> Mul<&'b Bound> for &'a Bound {
    type Output = Bound;

    fn mul(self, rhs: &'b Bound) -> Bound {
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a * b),
            _ if self.is_zero() || rhs.is_zero() => Bound::zero(),
            _ => Bound::infinity_with_sign(self.is_negative() != rhs.is_negative()),
        }
    }
}

impl<'a> Neg for &'a Bound {
    type Output = Bound;

    fn neg(self) -> Bound {
        match self {
            Bound::MinusInfinity => Bound::PlusInfinity,
            Bound::Finite(n) => Bound::Finite(-n),
            Bound::PlusInfinity => Bound::MinusInfinity,
        }
    }
}

macro_rules! forward_owned_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Bound> for Bound {
            type Output = Bound;
            fn $method(self, rhs: Bound) -> Bound {
                (&self).$method(&rhs)
            }
        }

        impl<'a> $imp<&'a Bound> for Bound {
            type Output = Bound;
            fn $method(self, rhs: &'a Bound) -> Bound {
                (&self).$method(rhs)
            }
        }
    };
}

forward_owned_binop!(Add, add);
forward_owned_binop!(Sub, sub);
forward_owned_binop!(Mul, mul);

impl Neg for Bound {
    type Output = Bound;

    fn neg(self) -> Bound {
        -&self
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::MinusInfinity => write!(f, "-oo"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PlusInfinity => write!(f, "+oo"),
        }
    }
}
