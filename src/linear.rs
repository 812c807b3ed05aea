/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::number::Number;
use crate::variable::Variable;

/*
 * Linear expressions `c1*x1 + ... + cn*xn + k` over integer coefficients,
 * and the constraints built from them. Terms with a zero coefficient are
 * never stored, so two expressions denoting the same affine function are
 * structurally equal.
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LinearExpression {
    terms: BTreeMap<Variable, Number>,
    constant: Number,
}

impl LinearExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(coefficient: impl Into<Number>, v: Variable) -> Self {
        let mut e = Self::new();
        e.add_term(v, coefficient.into());
        e
    }

    pub fn add_term(&mut self, v: Variable, coefficient: Number) {
        let c = match self.terms.remove(&v) {
            Some(c) => c + coefficient,
            None => coefficient,
        };
        if !c.is_zero() {
            self.terms.insert(v, c);
        }
    }

    pub fn add_constant(&mut self, k: &Number) {
        self.constant = &self.constant + k;
    }

    pub fn terms(&self) -> impl Iterator<Item = (Variable, &Number)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, c))
    }

    pub fn coefficient(&self, v: Variable) -> Number {
        self.terms.get(&v).cloned().unwrap_or_default()
    }

    pub fn constant(&self) -> &Number {
        &self.constant
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.terms.keys().copied().collect()
    }

    pub fn contains(&self, v: Variable) -> bool {
        self.terms.contains_key(&v)
    }

    /// Returns `(x, k)` when the expression is exactly `x + k`.
    pub fn as_variable_plus_constant(&self) -> Option<(Variable, &Number)> {
        self.unit_term(true).map(|v| (v, &self.constant))
    }

    /// Returns `(x, k)` when the expression is exactly `-x + k`.
    pub fn as_negated_variable_plus_constant(&self) -> Option<(Variable, &Number)> {
        self.unit_term(false).map(|v| (v, &self.constant))
    }

    fn unit_term(&self, positive: bool) -> Option<Variable> {
        if self.terms.len() != 1 {
            return None;
        }
        let (v, c) = self.terms.iter().next()?;
        let expected = if positive {
            Number::one()
        } else {
            -Number::one()
        };
        (*c == expected).then_some(*v)
    }

    pub fn scale(&self, k: &Number) -> LinearExpression {
        let mut result = LinearExpression::new();
        if k.is_zero() {
            return result;
        }
        for (v, c) in self.terms.iter() {
            result.terms.insert(*v, c * k);
        }
        result.constant = &self.constant * k;
        result
    }
}

impl From<Variable> for LinearExpression {
    fn from(v: Variable) -> Self {
        LinearExpression::term(1, v)
    }
}

impl From<Number> for LinearExpression {
    fn from(k: Number) -> Self {
        LinearExpression {
            terms: BTreeMap::new(),
            constant: k,
        }
    }
}

impl From<i64> for LinearExpression {
    fn from(k: i64) -> Self {
        LinearExpression::from(Number::from(k))
    }
}

impl From<i32> for LinearExpression {
    fn from(k: i32) -> Self {
        LinearExpression::from(Number::from(k))
    }
}

impl<T: Into<LinearExpression>> Add<T> for LinearExpression {
    type Output = LinearExpression;

    fn add(mut self, rhs: T) -> LinearExpression {
        let rhs = rhs.into();
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.add_constant(&rhs.constant);
        self
    }
}

impl<T: Into<LinearExpression>> Sub<T> for LinearExpression {
    type Output = LinearExpression;

    fn sub(self, rhs: T) -> LinearExpression {
        self + (-rhs.into())
    }
}

impl Neg for LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> LinearExpression {
        self.scale(&-Number::one())
    }
}

impl Mul<i64> for LinearExpression {
    type Output = LinearExpression;

    fn mul(self, k: i64) -> LinearExpression {
        self.scale(&Number::from(k))
    }
}

impl<T: Into<LinearExpression>> Add<T> for Variable {
    type Output = LinearExpression;

    fn add(self, rhs: T) -> LinearExpression {
        LinearExpression::from(self) + rhs
    }
}

impl<T: Into<LinearExpression>> Sub<T> for Variable {
    type Output = LinearExpression;

    fn sub(self, rhs: T) -> LinearExpression {
        LinearExpression::from(self) - rhs
    }
}

impl Neg for Variable {
    type Output = LinearExpression;

    fn neg(self) -> LinearExpression {
        LinearExpression::term(-1, self)
    }
}

impl Mul<Variable> for i64 {
    type Output = LinearExpression;

    fn mul(self, v: Variable) -> LinearExpression {
        LinearExpression::term(self, v)
    }
}

impl Mul<Variable> for Number {
    type Output = LinearExpression;

    fn mul(self, v: Variable) -> LinearExpression {
        LinearExpression::term(self, v)
    }
}

impl fmt::Display for LinearExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, c) in self.terms.iter() {
            let negative = c.is_negative();
            if first {
                if negative {
                    write!(f, "-")?;
                }
            } else if negative {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            let magnitude = c.abs();
            if magnitude.is_one() {
                write!(f, "{}", v)?;
            } else {
                write!(f, "{}*{}", magnitude, v)?;
            }
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant.is_negative() {
            write!(f, " - {}", self.constant.abs())
        } else if self.constant.is_positive() {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `e == 0`
    Equality,
    /// `e <= 0`
    Inequality,
    /// `e != 0`
    Disequation,
}

/// A linear constraint `e op 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinearConstraint {
    expr: LinearExpression,
    kind: ConstraintKind,
}

impl LinearConstraint {
    pub fn new(expr: LinearExpression, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }

    pub fn equal(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintKind::Equality)
    }

    pub fn not_equal(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintKind::Disequation)
    }

    pub fn leq(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(lhs.into() - rhs.into(), ConstraintKind::Inequality)
    }

    pub fn geq(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::leq(rhs, lhs)
    }

    /// Strict inequalities are tightened over the integers: `a < b` is
    /// stored as `a - b + 1 <= 0`.
    pub fn lt(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::new(lhs.into() - rhs.into() + 1, ConstraintKind::Inequality)
    }

    pub fn gt(lhs: impl Into<LinearExpression>, rhs: impl Into<LinearExpression>) -> Self {
        Self::lt(rhs, lhs)
    }

    pub fn expression(&self) -> &LinearExpression {
        &self.expr
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.expr.variables()
    }

    /// Truth value of a constraint without variables, `None` otherwise.
    pub fn constant_truth(&self) -> Option<bool> {
        if !self.expr.is_constant() {
            return None;
        }
        let k = self.expr.constant();
        Some(match self.kind {
            ConstraintKind::Equality => k.is_zero(),
            ConstraintKind::Inequality => !k.is_positive(),
            ConstraintKind::Disequation => !k.is_zero(),
        })
    }

    /// The integer complement of this constraint.
    pub fn negate(&self) -> LinearConstraint {
        match self.kind {
            ConstraintKind::Equality => {
                LinearConstraint::new(self.expr.clone(), ConstraintKind::Disequation)
            }
            ConstraintKind::Disequation => {
                LinearConstraint::new(self.expr.clone(), ConstraintKind::Equality)
            }
            ConstraintKind::Inequality => {
                LinearConstraint::new(-self.expr.clone() + 1, ConstraintKind::Inequality)
            }
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            ConstraintKind::Equality => "=",
            ConstraintKind::Inequality => "<=",
            ConstraintKind::Disequation => "!=",
        };
        write!(f, "{} {} 0", self.expr, op)
    }
}

/// Arithmetic and bitwise operations understood by `NumericalDomain::apply`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    /// Signed division, truncating toward zero.
    Div,
    /// Signed remainder; the result takes the sign of the dividend.
    SRem,
    /// Unsigned remainder.
    URem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "*",
            Operation::Div => "/",
            Operation::SRem => "%s",
            Operation::URem => "%u",
            Operation::And => "&",
            Operation::Or => "|",
            Operation::Xor => "^",
            Operation::Shl => "<<",
            Operation::LShr => ">>l",
            Operation::AShr => ">>a",
        };
        write!(f, "{}", s)
    }
}

/// Right-hand operand of `apply`: a variable or a constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Var(Variable),
    Const(Number),
}

impl From<Variable> for Operand {
    fn from(v: Variable) -> Self {
        Operand::Var(v)
    }
}

impl From<Number> for Operand {
    fn from(k: Number) -> Self {
        Operand::Const(k)
    }
}

impl From<i64> for Operand {
    fn from(k: i64) -> Self {
        Operand::Const(Number::from(k))
    }
}

impl From<i32> for Operand {
    fn from(k: i32) -> Self {
        Operand::Const(Number::from(k))
    }
}

impl From<Operand> for LinearExpression {
    fn from(o: Operand) -> Self {
        match o {
            Operand::Var(v) => LinearExpression::from(v),
            Operand::Const(k) => LinearExpression::from(k),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(v) => write!(f, "{}", v),
            Operand::Const(k) => write!(f, "{}", k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_normalization() {
        let x = Variable::new(0);
        let y = Variable::new(1);
        let e = x + y - x + 3;
        assert_eq!(e, y + 3);
        assert!(!e.contains(x));
        assert_eq!(e.as_variable_plus_constant(), Some((y, &Number::from(3))));
        assert_eq!(
            (-y - 2).as_negated_variable_plus_constant(),
            Some((y, &Number::from(-2)))
        );
        assert_eq!((2 * x + y).as_variable_plus_constant(), None);
        assert_eq!((2 * x - y - 4).to_string(), "2*v0 - v1 - 4");
    }

    #[test]
    fn test_constraints() {
        let x = Variable::new(0);
        let c = LinearConstraint::lt(x, 10);
        assert_eq!(c.expression(), &(x - 9));
        assert_eq!(c.to_string(), "v0 - 9 <= 0");
        assert_eq!(c.negate(), LinearConstraint::geq(x, 10));

        assert_eq!(
            LinearConstraint::leq(LinearExpression::from(3), 4).constant_truth(),
            Some(true)
        );
        assert_eq!(
            LinearConstraint::equal(LinearExpression::from(3), 4).constant_truth(),
            Some(false)
        );
        assert_eq!(LinearConstraint::equal(x, 4).constant_truth(), None);
    }
}
