/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

mod common;

use common::graph::SimpleGraph;
use sparta_numerical::graph::Graph;
use sparta_numerical::wto::WeakTopologicalOrdering;
use sparta_numerical::wto::WtoComponent;

fn wto_of(g: &SimpleGraph) -> WeakTopologicalOrdering<u32> {
    WeakTopologicalOrdering::new(g.entry(), g)
}

/*
 * This graph and the corresponding weak topological ordering are described
 * on page 4 of Bourdoncle's paper:
 *   F. Bourdoncle. Efficient chaotic iteration strategies with widenings.
 *   In Formal Methods in Programming and Their Applications, pp 128-141.
 * The graph is given as follows:
 *
 *                 +-----------------------+
 *                 |           +-----+     |
 *                 |           |     |     |
 *                 V           V     |     |
 *     1 --> 2 --> 3 --> 4 --> 5 --> 6 --> 7 --> 8
 *           |           |                 ^     ^
 *           |           |                 |     |
 *           |           +-----------------+     |
 *           +-----------------------------------+
 *
 * Bourdoncle's algorithm computes the following weak topological ordering:
 *
 *     1 2 (3 4 (5 6) 7) 8
 */
fn build_paper_graph() -> SimpleGraph {
    let mut g = SimpleGraph::new(1, 8);
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 4);
    g.add_edge(4, 5);
    g.add_edge(5, 6);
    g.add_edge(6, 7);
    g.add_edge(7, 8);
    g.add_edge(2, 8);
    g.add_edge(4, 7);
    g.add_edge(6, 5);
    g.add_edge(7, 3);
    g
}

#[test]
fn test_wto_example_from_paper() {
    let g = build_paper_graph();
    let wto = wto_of(&g);
    assert_eq!(wto.to_string(), "1 2 (3 4 (5 6) 7) 8");

    let components = wto.components();
    assert_eq!(components.len(), 4);
    assert_eq!(components[0], WtoComponent::Vertex(1));
    assert_eq!(components[1], WtoComponent::Vertex(2));
    assert!(components[2].is_cycle());
    assert_eq!(components[2].head(), 3);
    assert_eq!(components[3], WtoComponent::Vertex(8));

    match &components[2] {
        WtoComponent::Cycle { components, .. } => {
            assert_eq!(components.len(), 3);
            assert_eq!(components[0], WtoComponent::Vertex(4));
            assert_eq!(
                components[1],
                WtoComponent::Cycle {
                    head: 5,
                    components: vec![WtoComponent::Vertex(6)],
                }
            );
            assert_eq!(components[2], WtoComponent::Vertex(7));
        }
        WtoComponent::Vertex(_) => panic!("3 should head a cycle"),
    }
}

#[test]
fn test_wto_back_edge_to_outer_head() {
    let mut g = build_paper_graph();
    g.add_edge(8, 3);
    assert_eq!(wto_of(&g).to_string(), "1 2 (3 4 (5 6) 7 8)");
}

#[test]
fn test_wto_example_from_wpo_paper() {
    let mut g = SimpleGraph::new(1, 10);
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 4);
    g.add_edge(4, 3);
    g.add_edge(3, 5);
    g.add_edge(5, 2);
    g.add_edge(2, 6);
    g.add_edge(6, 5);
    g.add_edge(6, 7);
    g.add_edge(7, 8);
    g.add_edge(8, 6);
    g.add_edge(6, 9);
    g.add_edge(9, 8);
    g.add_edge(2, 10);
    assert_eq!(wto_of(&g).to_string(), "1 (2 (6 9 7 8) (3 4) 5) 10");
}

#[test]
fn test_wto_simple_loops() {
    let mut g = SimpleGraph::new(1, 3);
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 1);
    assert_eq!(wto_of(&g).to_string(), "(1 2 3)");

    let mut g = SimpleGraph::new(1, 4);
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 2);
    g.add_edge(2, 4);
    assert_eq!(wto_of(&g).to_string(), "1 (2 3) 4");
}

#[test]
fn test_wto_acyclic() {
    let mut g = SimpleGraph::new(1, 4);
    g.add_edge(1, 2);
    g.add_edge(1, 3);
    g.add_edge(2, 4);
    g.add_edge(3, 4);
    let wto = wto_of(&g);
    assert_eq!(wto.to_string(), "1 3 2 4");
    assert!(wto.iter().all(|c| !c.is_cycle()));
}

#[test]
fn test_wto_single_node() {
    let g = SimpleGraph::new(1, 1);
    let wto = wto_of(&g);
    assert_eq!(wto.components(), &[WtoComponent::Vertex(1)]);
    assert_eq!(g.size(), 1);
}
