/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use sparta_numerical::cfg::ControlFlowGraph;
use sparta_numerical::cfg::Statement;
use sparta_numerical::config::FixpointConfig;
use sparta_numerical::datatype::AbstractDomain;
use sparta_numerical::domains::pointer;
use sparta_numerical::domains::Interval;
use sparta_numerical::domains::IntervalDomain;
use sparta_numerical::domains::NumericalDomain;
use sparta_numerical::domains::Octagon;
use sparta_numerical::domains::PointsToDomain;
use sparta_numerical::domains::PointsToSet;
use sparta_numerical::error::DomainError;
use sparta_numerical::graph::Graph;
use sparta_numerical::linear::Operand;
use sparta_numerical::variable::VariableFactory;

/**
 * entry: if (...) {
 * left:    p = &a;
 *        } else {
 * right:   p = &b; p = p + 4;
 *        }
 * exit:  q = p + 2;
 */
fn build_program(vars: &mut VariableFactory) -> ControlFlowGraph {
    let p = vars.intern("p");
    let q = vars.intern("q");
    let a = vars.intern("a");
    let b = vars.intern("b");

    let mut cfg = ControlFlowGraph::new("entry");
    let entry = cfg.entry();
    let left = cfg.add_block("left");
    let right = cfg.add_block("right");
    let exit = cfg.add_block("exit");
    cfg.push(left, Statement::AssignObject(p, a));
    cfg.push(right, Statement::AssignObject(p, b));
    cfg.push(right, Statement::AssignPointer(p, p, Some(Operand::from(4))));
    cfg.push(exit, Statement::AssignPointer(q, p, Some(Operand::from(2))));
    cfg.add_edge(entry, left);
    cfg.add_edge(entry, right);
    cfg.add_edge(left, exit);
    cfg.add_edge(right, exit);
    cfg.set_exit(exit);
    cfg
}

#[test]
fn test_points_to_sets_and_offsets() {
    let mut vars = VariableFactory::new();
    let cfg = build_program(&mut vars);
    let p = vars.get("p").unwrap();
    let q = vars.get("q").unwrap();
    let a = vars.get("a").unwrap();
    let b = vars.get("b").unwrap();

    let analysis = cfg.analyze(
        PointsToDomain::<Octagon>::top(),
        FixpointConfig::default(),
    );
    let state = analysis.get_exit_state_at(cfg.exit());

    let both: PointsToSet = [a, b].into_iter().collect();
    assert_eq!(pointer::addrs_set(&state, p), Ok(both.clone()));
    assert_eq!(pointer::addrs_set(&state, q), Ok(both));
    assert_eq!(pointer::is_unknown_addr(&state, q), Ok(false));
    assert_eq!(pointer::is_unknown_addr(&state, a), Ok(true));

    let offset = pointer::offset_var(&state, q).unwrap();
    assert_eq!(state.to_interval(offset), Interval::range(2, 6));

    // The octagon keeps the distance between p and q.
    let mut refined = state.clone();
    pointer::refine_addrs_offset(&mut refined, p, PointsToSet::singleton(b), Interval::singleton(4));
    assert_eq!(refined.to_interval(q), Interval::singleton(6));
    assert_eq!(pointer::addrs_set(&refined, p), Ok(PointsToSet::singleton(b)));
}

#[test]
fn test_pointer_statements_on_scalar_domains() {
    let mut vars = VariableFactory::new();
    let cfg = build_program(&mut vars);
    let q = vars.get("q").unwrap();

    let analysis = cfg.analyze(IntervalDomain::top(), FixpointConfig::default());
    let state = analysis.get_exit_state_at(cfg.exit());
    assert!(state.is_top());
    assert_eq!(
        pointer::addrs_set(&state, q),
        Err(DomainError::unsupported("addrs_set", "interval"))
    );
    assert_eq!(
        pointer::offset_var(&state, q),
        Err(DomainError::unsupported("offset_var", "interval"))
    );
}
