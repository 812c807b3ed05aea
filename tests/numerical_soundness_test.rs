/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Randomized soundness checks of every numerical domain against the
//! concrete states of three variables ranging over [-3, 3].

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use sparta_numerical::config::DomainKind;
use sparta_numerical::datatype::AbstractDomain;
use sparta_numerical::domains::AnyDomain;
use sparta_numerical::domains::NumericalDomain;
use sparta_numerical::linear::ConstraintKind;
use sparta_numerical::linear::LinearConstraint;
use sparta_numerical::linear::LinearExpression;
use sparta_numerical::linear::Operand;
use sparta_numerical::linear::Operation;
use sparta_numerical::number::Number;
use sparta_numerical::variable::Variable;

const NUM_VARS: usize = 3;
const RANGE: i64 = 3;
const NUM_SEEDS: u64 = 40;

type Point = [i64; NUM_VARS];

fn var(i: usize) -> Variable {
    Variable::new(i as u32)
}

fn all_points() -> Vec<Point> {
    let mut points = Vec::new();
    for a in -RANGE..=RANGE {
        for b in -RANGE..=RANGE {
            for c in -RANGE..=RANGE {
                points.push([a, b, c]);
            }
        }
    }
    points
}

fn box_constraints() -> Vec<LinearConstraint> {
    (0..NUM_VARS)
        .flat_map(|i| {
            [
                LinearConstraint::geq(var(i), -RANGE),
                LinearConstraint::leq(var(i), RANGE),
            ]
        })
        .collect()
}

fn evaluate(e: &LinearExpression, p: &Point) -> i64 {
    let mut value = e.constant().to_i64().unwrap();
    for (v, c) in e.terms() {
        value += c.to_i64().unwrap() * p[v.id() as usize];
    }
    value
}

fn satisfies(c: &LinearConstraint, p: &Point) -> bool {
    let value = evaluate(c.expression(), p);
    match c.kind() {
        ConstraintKind::Equality => value == 0,
        ConstraintKind::Inequality => value <= 0,
        ConstraintKind::Disequation => value != 0,
    }
}

fn random_constraint(rng: &mut StdRng) -> LinearConstraint {
    let i = rng.gen_range(0..NUM_VARS);
    let j = (i + rng.gen_range(1..NUM_VARS)) % NUM_VARS;
    let c: i64 = rng.gen_range(-RANGE..=RANGE);
    let sign = |rng: &mut StdRng| if rng.gen_bool(0.5) { 1i64 } else { -1i64 };
    match rng.gen_range(0..6) {
        0 => LinearConstraint::leq(LinearExpression::term(sign(rng), var(i)), c),
        1 => LinearConstraint::leq(var(i) - var(j), c),
        2 => {
            let (a, b) = (sign(rng), sign(rng));
            LinearConstraint::leq(
                LinearExpression::term(a, var(i)) + LinearExpression::term(b, var(j)),
                c,
            )
        }
        3 => LinearConstraint::equal(var(i), var(j) + c),
        4 => LinearConstraint::not_equal(var(i), c),
        _ => {
            let a: i64 = rng.gen_range(-3..=3);
            let b: i64 = rng.gen_range(-3..=3);
            LinearConstraint::leq(
                LinearExpression::term(a, var(i)) + LinearExpression::term(b, var(j)),
                c,
            )
        }
    }
}

fn random_state(rng: &mut StdRng) -> Vec<LinearConstraint> {
    let mut constraints = box_constraints();
    for _ in 0..rng.gen_range(1..5) {
        constraints.push(random_constraint(rng));
    }
    constraints
}

fn abstract_state(kind: DomainKind, constraints: &[LinearConstraint]) -> AnyDomain {
    let mut inv = AnyDomain::top_of(kind);
    for c in constraints {
        inv.add_constraint(c);
    }
    inv
}

fn concrete_states(constraints: &[LinearConstraint]) -> Vec<Point> {
    all_points()
        .into_iter()
        .filter(|p| constraints.iter().all(|c| satisfies(c, p)))
        .collect()
}

fn assert_covers(inv: &AnyDomain, points: &[Point], context: &str) {
    if !points.is_empty() {
        assert!(!inv.is_bottom(), "{}: {} should not be _|_", context, inv.kind());
    }
    for p in points {
        for (i, value) in p.iter().enumerate() {
            let itv = inv.to_interval(var(i));
            assert!(
                itv.contains(&Number::from(*value)),
                "{}: {} = {} is missing from {} in {} ({})",
                context,
                var(i),
                value,
                itv,
                inv.kind(),
                inv
            );
        }
    }
}

#[test]
fn test_constraints_are_sound() {
    for seed in 0..NUM_SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let constraints = random_state(&mut rng);
        let points = concrete_states(&constraints);
        for kind in DomainKind::ALL {
            let inv = abstract_state(kind, &constraints);
            assert_covers(&inv, &points, &format!("seed {}", seed));
        }
    }
}

#[test]
fn test_transfer_functions_are_sound() {
    for seed in 0..NUM_SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let constraints = random_state(&mut rng);
        let k: i64 = rng.gen_range(-RANGE..=RANGE);
        let points = concrete_states(&constraints);

        // x0 = x1 + k; x2 = x0 * x1; x1 = x1 - x2
        let images: Vec<Point> = points
            .iter()
            .map(|p| {
                let x0 = p[1] + k;
                let x2 = x0 * p[1];
                [x0, p[1] - x2, x2]
            })
            .collect();

        for kind in DomainKind::ALL {
            let mut inv = abstract_state(kind, &constraints);
            inv.assign(var(0), &(var(1) + k));
            inv.apply(Operation::Mul, var(2), var(0), Operand::Var(var(1)));
            inv.apply(Operation::Sub, var(1), var(1), Operand::Var(var(2)));
            assert_covers(&inv, &images, &format!("seed {}", seed));
        }
    }
}

#[test]
fn test_join_and_widening_are_sound() {
    for seed in 0..NUM_SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let c1 = random_state(&mut rng);
        let c2 = random_state(&mut rng);
        let mut points = concrete_states(&c1);
        points.extend(concrete_states(&c2));

        for kind in DomainKind::ALL {
            let d1 = abstract_state(kind, &c1);
            let d2 = abstract_state(kind, &c2);
            let joined = d1.clone().join(d2.clone());
            assert!(d1.leq(&joined) && d2.leq(&joined), "{} seed {}", kind, seed);
            assert_covers(&joined, &points, &format!("join, seed {}", seed));

            let widened = d1.widen(d2);
            assert_covers(&widened, &points, &format!("widening, seed {}", seed));
        }
    }
}

#[test]
fn test_meet_is_sound() {
    for seed in 0..NUM_SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let c1 = random_state(&mut rng);
        let c2 = random_state(&mut rng);
        let both: Vec<LinearConstraint> = c1.iter().chain(c2.iter()).cloned().collect();
        let points = concrete_states(&both);

        for kind in DomainKind::ALL {
            let met = abstract_state(kind, &c1).meet(abstract_state(kind, &c2));
            assert_covers(&met, &points, &format!("meet, seed {}", seed));
        }
    }
}

/// Widens `init` with each element of `chain` and returns how many steps it
/// took to stop changing, or `None` if it never did.
fn widening_steps(init: AnyDomain, chain: impl Iterator<Item = AnyDomain>) -> Option<usize> {
    let mut inv = init;
    for (step, next) in chain.enumerate() {
        let widened = inv.clone().widen(next);
        if widened.leq(&inv) {
            return Some(step + 1);
        }
        inv = widened;
    }
    None
}

fn bounded_pair(ub: Option<i64>) -> Vec<LinearConstraint> {
    let mut constraints = vec![
        LinearConstraint::leq(var(0) - var(1), 1),
        LinearConstraint::leq(var(1) - var(0), 1),
    ];
    if let Some(ub) = ub {
        constraints.push(LinearConstraint::leq(var(0), ub));
        constraints.push(LinearConstraint::leq(var(1), ub));
    }
    constraints
}

#[test]
fn test_widening_stabilizes_on_growing_bounds() {
    for kind in DomainKind::ALL {
        let mut init = bounded_pair(None);
        init.push(LinearConstraint::leq(var(0), 0));
        let chain = (1..=60).map(|k| abstract_state(kind, &bounded_pair(Some(k))));
        let steps = widening_steps(abstract_state(kind, &init), chain);
        assert!(
            matches!(steps, Some(n) if n <= 4),
            "{}: widening took {:?} steps",
            kind,
            steps
        );
    }
}

#[test]
fn test_widening_stabilizes_on_random_chains() {
    const CHAIN_LENGTH: i64 = 60;

    for seed in 0..NUM_SEEDS {
        for kind in DomainKind::ALL {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ascending = abstract_state(kind, &random_state(&mut rng));
            let init = ascending.clone();
            let chain = (1..=CHAIN_LENGTH).map(|k| {
                let mut constraints: Vec<LinearConstraint> = (0..NUM_VARS)
                    .flat_map(|i| {
                        [
                            LinearConstraint::geq(var(i), -RANGE - k),
                            LinearConstraint::leq(var(i), RANGE + k),
                        ]
                    })
                    .collect();
                for _ in 0..rng.gen_range(1..4) {
                    constraints.push(random_constraint(&mut rng));
                }
                ascending.join_with(abstract_state(kind, &constraints));
                ascending.clone()
            });
            let steps = widening_steps(init, chain);
            assert!(steps.is_some(), "{} seed {}: widening never stabilized", kind, seed);
        }
    }
}
