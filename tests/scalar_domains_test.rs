/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use proptest::prelude::*;
use sparta_numerical::bound::Bound;
use sparta_numerical::datatype::AbstractDomain;
use sparta_numerical::domains::Congruence;
use sparta_numerical::domains::Interval;
use sparta_numerical::domains::IntervalCongruence;
use sparta_numerical::linear::Operation;
use sparta_numerical::number::Number;

/// Any interval over small bounds, possibly unbounded or empty.
fn any_interval() -> impl Strategy<Value = Interval> {
    (
        proptest::option::of(-20i64..20),
        proptest::option::of(-20i64..20),
    )
        .prop_map(|(lb, ub)| {
            Interval::new(
                lb.map_or(Bound::MinusInfinity, Bound::from),
                ub.map_or(Bound::PlusInfinity, Bound::from),
            )
        })
}

/// A finite interval together with one of its members.
fn interval_and_member() -> impl Strategy<Value = (Interval, i64)> {
    (-20i64..20, 0i64..10, 0i64..10)
        .prop_map(|(lb, len, k)| (Interval::range(lb, lb + len), lb + k % (len + 1)))
}

fn any_congruence() -> impl Strategy<Value = Congruence> {
    prop_oneof![
        1 => Just(Congruence::bottom()),
        8 => (0i64..6, -10i64..10).prop_map(|(m, r)| Congruence::new(m, r)),
    ]
}

/// A congruence class together with one of its members.
fn congruence_and_member() -> impl Strategy<Value = (Congruence, i64)> {
    (0i64..6, -10i64..10, -5i64..5).prop_map(|(m, r, k)| (Congruence::new(m, r), r + m * k))
}

fn check_lattice_laws<D: AbstractDomain + std::fmt::Debug>(
    a: &D,
    b: &D,
) -> Result<(), TestCaseError> {
    let join = a.clone().join(b.clone());
    prop_assert!(a.leq(&join), "{:?} <= {:?}", a, join);
    prop_assert!(b.leq(&join), "{:?} <= {:?}", b, join);
    prop_assert!(join.equals(&b.clone().join(a.clone())));

    let meet = a.clone().meet(b.clone());
    prop_assert!(meet.leq(a), "{:?} <= {:?}", meet, a);
    prop_assert!(meet.leq(b), "{:?} <= {:?}", meet, b);

    let widened = a.clone().widen(b.clone());
    prop_assert!(a.leq(&widened));
    prop_assert!(b.leq(&widened));

    if b.leq(a) {
        let narrowed = a.clone().narrow(b.clone());
        prop_assert!(meet.leq(&narrowed));
        prop_assert!(narrowed.leq(a));
    }

    prop_assert!(D::bottom().leq(a));
    prop_assert!(a.leq(&D::top()));
    prop_assert!(a.clone().join(D::bottom()).equals(a));
    prop_assert!(a.clone().meet(D::bottom()).is_bottom());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn interval_lattice_laws(a in any_interval(), b in any_interval()) {
        check_lattice_laws(&a, &b)?;
    }

    #[test]
    fn congruence_lattice_laws(a in any_congruence(), b in any_congruence()) {
        check_lattice_laws(&a, &b)?;
    }

    #[test]
    fn interval_congruence_lattice_laws(
        a in (any_interval(), any_congruence()),
        b in (any_interval(), any_congruence()),
    ) {
        let a = IntervalCongruence::new(a.0, a.1);
        let b = IntervalCongruence::new(b.0, b.1);
        check_lattice_laws(&a, &b)?;
    }

    /// For any n in a and m in b, n op m is in a op b.
    #[test]
    fn interval_arithmetic_soundness(
        (a, n) in interval_and_member(),
        (b, m) in interval_and_member(),
    ) {
        let (n_num, m_num) = (Number::from(n), Number::from(m));
        prop_assert!(a.contains(&n_num));
        prop_assert!(b.contains(&m_num));

        prop_assert!(a.apply(Operation::Add, &b).contains(&Number::from(n + m)));
        prop_assert!(a.apply(Operation::Sub, &b).contains(&Number::from(n - m)));
        prop_assert!(a.apply(Operation::Mul, &b).contains(&Number::from(n * m)));
        if m != 0 {
            let quotient = a.apply(Operation::Div, &b);
            prop_assert!(
                quotient.contains(&Number::from(n / m)),
                "{} / {} not in {} / {} = {}", n, m, a, b, quotient
            );
        }
    }

    #[test]
    fn congruence_arithmetic_soundness(
        (a, n) in congruence_and_member(),
        (b, m) in congruence_and_member(),
    ) {
        prop_assert!(a.contains(&Number::from(n)));
        prop_assert!(b.contains(&Number::from(m)));

        prop_assert!(a.apply(Operation::Add, &b).contains(&Number::from(n + m)));
        prop_assert!(a.apply(Operation::Sub, &b).contains(&Number::from(n - m)));
        prop_assert!(a.apply(Operation::Mul, &b).contains(&Number::from(n * m)));
        if let Some(d) = b.as_constant() {
            if !d.is_zero() {
                prop_assert!(a.apply(Operation::Div, &b).contains(&Number::from(n / m)));
            }
        }
    }

    /// Reduction never drops a value described by both components.
    #[test]
    fn reduction_soundness(
        (itv, n) in interval_and_member(),
        (m, r) in (0i64..6, -10i64..10),
    ) {
        let cong = Congruence::new(m, r);
        let reduced = IntervalCongruence::new(itv.clone(), cong.clone());
        let n = Number::from(n);
        if cong.contains(&n) {
            prop_assert!(reduced.interval().contains(&n));
            prop_assert!(reduced.congruence().contains(&n));
        }
        prop_assert!(reduced.interval().leq(&itv));
        prop_assert!(reduced.congruence().leq(&cong));
    }
}
