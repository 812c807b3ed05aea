/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

mod common;

use common::graph::SimpleGraph;
use sparta_numerical::cfg::ControlFlowGraph;
use sparta_numerical::graph::Graph;
use sparta_numerical::graph::SuccessorNodes;

#[test]
fn test_graph_successors() {
    let mut g = SimpleGraph::new(1, 5);
    g.add_edge(1, 2);
    g.add_edge(1, 3);
    g.add_edge(3, 4);
    g.add_edge(2, 5);
    g.add_edge(4, 5);

    let mut succ_nodes = g.get_succ_nodes(1);
    succ_nodes.sort();
    assert_eq!(succ_nodes.into_vec(), vec![2, 3]);

    let mut succ_nodes = g.get_succ_nodes(4);
    succ_nodes.sort();
    assert_eq!(succ_nodes.into_vec(), vec![5]);
    assert_eq!(g.size(), 5);
}

#[test]
fn test_cfg_successors() {
    let mut cfg = ControlFlowGraph::new("entry");
    let entry = cfg.entry();
    let left = cfg.add_block("left");
    let right = cfg.add_block("right");
    let join = cfg.add_block("join");
    cfg.add_edge(entry, left);
    cfg.add_edge(entry, right);
    cfg.add_edge(left, join);
    cfg.add_edge(right, join);
    cfg.set_exit(join);

    assert_eq!(cfg.get_succ_nodes(entry).into_vec(), vec![left, right]);
    assert_eq!(cfg.get_succ_nodes(join).into_vec(), vec![]);
    assert_eq!(cfg.predecessors(join).len(), 2);
    assert_eq!(cfg.exit(), join);
    assert_eq!(cfg.block(left).name(), "left");
}
