/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{DomainError, DomainResult};

/*
 * Arbitrary-precision signed integer used for every constant manipulated by
 * the numerical domains. Arithmetic never overflows; conversions to machine
 * integers are checked.
 *
 * The `/` and `%` operators truncate toward zero, the way machine division
 * does. Floor, ceiling and Euclidean variants are available as methods since
 * the domains need each of them when rounding bounds.
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigInt);

impl Number {
    pub fn zero() -> Self {
        Number(BigInt::zero())
    }

    pub fn one() -> Self {
        Number(BigInt::one())
    }

    /// 2^exp.
    pub fn pow2(exp: usize) -> Self {
        Number(BigInt::one() << exp)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Number {
        Number(self.0.abs())
    }

    pub fn div_trunc(&self, rhs: &Number) -> Number {
        Number(&self.0 / &rhs.0)
    }

    /// Remainder of the truncating division. Takes the sign of `self`.
    pub fn rem_trunc(&self, rhs: &Number) -> Number {
        Number(&self.0 % &rhs.0)
    }

    pub fn div_floor(&self, rhs: &Number) -> Number {
        Number(Integer::div_floor(&self.0, &rhs.0))
    }

    pub fn div_ceil(&self, rhs: &Number) -> Number {
        -(-self).div_floor(rhs)
    }

    /// Remainder in `[0, |rhs|)`.
    pub fn rem_euclid(&self, rhs: &Number) -> Number {
        let r = self.rem_trunc(rhs);
        if r.is_negative() {
            r + rhs.abs()
        } else {
            r
        }
    }

    pub fn div_euclid(&self, rhs: &Number) -> Number {
        (self - &self.rem_euclid(rhs)).div_trunc(rhs)
    }

    /// Non-negative greatest common divisor. `gcd(0, 0) == 0`.
    pub fn gcd(&self, rhs: &Number) -> Number {
        Number(self.0.gcd(&rhs.0))
    }

    pub fn lcm(&self, rhs: &Number) -> Number {
        Number(self.0.lcm(&rhs.0))
    }

    /// Returns `(g, s, t)` with `g = gcd(self, rhs) >= 0` and
    /// `self * s + rhs * t == g`.
    pub fn extended_gcd(&self, rhs: &Number) -> (Number, Number, Number) {
        let (mut old_r, mut r) = (self.clone(), rhs.clone());
        let (mut old_s, mut s) = (Number::one(), Number::zero());
        let (mut old_t, mut t) = (Number::zero(), Number::one());
        while !r.is_zero() {
            let q = old_r.div_trunc(&r);
            let next_r = &old_r - &(&q * &r);
            old_r = std::mem::replace(&mut r, next_r);
            let next_s = &old_s - &(&q * &s);
            old_s = std::mem::replace(&mut s, next_s);
            let next_t = &old_t - &(&q * &t);
            old_t = std::mem::replace(&mut t, next_t);
        }
        if old_r.is_negative() {
            (-old_r, -old_s, -old_t)
        } else {
            (old_r, old_s, old_t)
        }
    }

    /// Number of bits needed to represent `|self|`. `bits(0) == 0`.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    pub fn shl(&self, amount: usize) -> Number {
        Number(&self.0 << amount)
    }

    /// Arithmetic shift, rounding toward negative infinity.
    pub fn shr(&self, amount: usize) -> Number {
        Number(&self.0 >> amount)
    }

    pub fn bit_and(&self, rhs: &Number) -> Number {
        Number(&self.0 & &rhs.0)
    }

    pub fn bit_or(&self, rhs: &Number) -> Number {
        Number(&self.0 | &rhs.0)
    }

    pub fn bit_xor(&self, rhs: &Number) -> Number {
        Number(&self.0 ^ &rhs.0)
    }

    pub fn to_i64(&self) -> DomainResult<i64> {
        self.0
            .to_i64()
            .ok_or_else(|| DomainError::overflow(self, "i64"))
    }

    pub fn to_u64(&self) -> DomainResult<u64> {
        self.0
            .to_u64()
            .ok_or_else(|| DomainError::overflow(self, "u64"))
    }

    pub fn to_i32(&self) -> DomainResult<i32> {
        self.0
            .to_i32()
            .ok_or_else(|| DomainError::overflow(self, "i32"))
    }

    /// Shift amounts are only meaningful when they fit in a `usize`.
    pub fn to_usize(&self) -> Option<usize> {
        self.0.to_usize()
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Number> for Number {
            type Output = Number;
            fn $method(self, rhs: Number) -> Number {
                Number(self.0.$method(rhs.0))
            }
        }

        impl<'a> $imp<&'a Number> for Number {
            type Output = Number;
            fn $method(self, rhs: &'a Number) -> Number {
                Number(self.0.$method(&rhs.0))
            }
        }

        impl<'a> $imp<Number> for &'a Number {
            type Output = Number;
            fn $method(self, rhs: Number) -> Number {
                Number((&self.0).$method(rhs.0))
            }
        }

        impl<'a, 'b> $imp<&'b Number> for &'a Number {
            type Output = Number;
            fn $method(self, rhs: &'b Number) -> Number {
                Number((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);
forward_binop!(Rem, rem);

impl Neg for Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number(-self.0)
    }
}

impl<'a> Neg for &'a Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number(-&self.0)
    }
}

impl From<BigInt> for Number {
    fn from(n: BigInt) -> Self {
        Number(n)
    }
}

macro_rules! from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(n: $t) -> Self {
                    Number(BigInt::from(n))
                }
            }
        )*
    };
}

from_primitive!(i32, i64, u32, u64, usize);

impl FromStr for Number {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BigInt>().map(Number)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> Number {
        Number::from(v)
    }

    #[test]
    fn test_division_rounding() {
        assert_eq!(n(-7) / n(2), n(-3));
        assert_eq!(n(-7) % n(2), n(-1));
        assert_eq!(n(-7).div_floor(&n(2)), n(-4));
        assert_eq!(n(-7).div_ceil(&n(2)), n(-3));
        assert_eq!(n(7).div_ceil(&n(2)), n(4));
        assert_eq!(n(-7).rem_euclid(&n(2)), n(1));
        assert_eq!(n(-7).div_euclid(&n(2)), n(-4));
        assert_eq!(n(7).rem_euclid(&n(-3)), n(1));
    }

    #[test]
    fn test_extended_gcd() {
        let (g, s, t) = n(240).extended_gcd(&n(46));
        assert_eq!(g, n(2));
        assert_eq!(n(240) * s + n(46) * t, n(2));

        let (g, s, t) = n(-12).extended_gcd(&n(18));
        assert_eq!(g, n(6));
        assert_eq!(n(-12) * s + n(18) * t, n(6));

        assert_eq!(n(0).gcd(&n(0)), n(0));
        assert_eq!(n(0).gcd(&n(-5)), n(5));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(n(12).bit_and(&n(10)), n(8));
        assert_eq!(n(12).bit_or(&n(10)), n(14));
        assert_eq!(n(12).bit_xor(&n(10)), n(6));
        assert_eq!(n(-1).bit_and(&n(5)), n(5));
        assert_eq!(n(-8).shr(1), n(-4));
        assert_eq!(n(-7).shr(1), n(-4));
        assert_eq!(n(3).shl(4), n(48));
        assert_eq!(n(255).bits(), 8);
        assert_eq!(n(0).bits(), 0);
    }

    #[test]
    fn test_checked_conversions() {
        assert_eq!(n(42).to_i32(), Ok(42));
        assert!(n(-1).to_u64().is_err());
        let big = Number::pow2(70);
        assert_eq!(
            big.to_i64(),
            Err(DomainError::overflow(&big, "i64"))
        );
        assert_eq!("-123".parse::<Number>().ok(), Some(n(-123)));
    }
}
