/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;

use log::debug;
use log::trace;

use crate::config::FixpointConfig;
use crate::datatype::AbstractDomain;
use crate::graph::Graph;
use crate::wto::WeakTopologicalOrdering;
use crate::wto::WtoComponent;

// Not a base interface for iterators: only the trait a concrete type
// implements to analyze nodes and edges, composed into the fixpoint
// iterator.
pub trait FixpointIteratorTransformer<G: Graph, D: AbstractDomain> {
    /// The *current_state* is updated in place, from the entry state of n
    /// to its exit state.
    fn analyze_node(&self, n: G::NodeId, current_state: &mut D);

    fn analyze_edge(&self, e: G::EdgeId, exit_state_at_src: &D) -> D;
}

/*
 * Bourdoncle's recursive iteration strategy over a weak topological
 * ordering of the graph.
 *
 * Components are analyzed in order. At the head of a cycle the entry state
 * first goes through an increasing sequence (plain joins for the first
 * `widening_delay` iterations, widening afterwards) until the body reaches
 * a post-fixpoint, then through a decreasing sequence of at most
 * `narrowing_iterations` narrowing steps. A node is re-analyzed only when
 * its entry state changed.
 */
pub struct MonotonicFixpointIterator<
    'g,
    G: Graph,
    D: AbstractDomain,
    T: FixpointIteratorTransformer<G, D>,
> {
    graph: &'g G,
    entry_states: HashMap<G::NodeId, D>,
    exit_states: HashMap<G::NodeId, D>,
    transformer: T,
    config: FixpointConfig,
}

impl<'g, G, D, T> MonotonicFixpointIterator<'g, G, D, T>
where
    G: Graph,
    D: AbstractDomain,
    T: FixpointIteratorTransformer<G, D>,
{
    pub fn new(graph: &'g G, transformer: T) -> Self {
        Self {
            graph,
            entry_states: HashMap::with_capacity(graph.size()),
            exit_states: HashMap::with_capacity(graph.size()),
            transformer,
            config: FixpointConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FixpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clear(&mut self) {
        self.entry_states.clear();
        self.exit_states.clear();
    }

    /// Computes the invariants of every node reachable from the entry,
    /// starting from `init` at the entry node.
    pub fn run(&mut self, init: D) {
        self.clear();
        let wto = WeakTopologicalOrdering::new(self.graph.entry(), self.graph);
        for component in wto.components() {
            self.analyze_component(component, &init);
        }
    }

    fn get_state_at_or_bottom(states: &HashMap<G::NodeId, D>, n: G::NodeId) -> D {
        states.get(&n).cloned().unwrap_or_else(D::bottom)
    }

    pub fn get_entry_state_at(&self, n: G::NodeId) -> D {
        Self::get_state_at_or_bottom(&self.entry_states, n)
    }

    pub fn get_exit_state_at(&self, n: G::NodeId) -> D {
        Self::get_state_at_or_bottom(&self.exit_states, n)
    }

    fn compute_entry_state(&self, n: G::NodeId, init: &D) -> D {
        let mut entry_state = if n == self.graph.entry() {
            init.clone()
        } else {
            D::bottom()
        };
        for e in self.graph.predecessors(n) {
            if let Some(exit_state) = self.exit_states.get(&self.graph.source(e)) {
                entry_state.join_with(self.transformer.analyze_edge(e, exit_state));
            }
        }
        entry_state
    }

    /// Records the entry state of n and recomputes its exit state, unless
    /// the entry state is the one n was last analyzed with.
    fn propagate(&mut self, n: G::NodeId, entry_state: D) {
        if let Some(previous) = self.entry_states.get(&n) {
            if previous.leq(&entry_state) && entry_state.leq(previous) {
                trace!("{:?} is unchanged", n);
                return;
            }
        }
        let mut exit_state = entry_state.clone();
        self.transformer.analyze_node(n, &mut exit_state);
        trace!("analyzed {:?}", n);
        self.entry_states.insert(n, entry_state);
        self.exit_states.insert(n, exit_state);
    }

    fn analyze_component(&mut self, component: &WtoComponent<G::NodeId>, init: &D) {
        match component {
            WtoComponent::Vertex(n) => {
                let entry_state = self.compute_entry_state(*n, init);
                self.propagate(*n, entry_state);
            }
            WtoComponent::Cycle { head, components } => {
                self.analyze_cycle(*head, components, init);
            }
        }
    }

    fn analyze_body(
        &mut self,
        head: G::NodeId,
        pre: D,
        components: &[WtoComponent<G::NodeId>],
        init: &D,
    ) {
        self.propagate(head, pre);
        for component in components {
            self.analyze_component(component, init);
        }
    }

    fn analyze_cycle(
        &mut self,
        head: G::NodeId,
        components: &[WtoComponent<G::NodeId>],
        init: &D,
    ) {
        let mut pre = self.compute_entry_state(head, init);
        let mut iteration = 0;

        loop {
            self.analyze_body(head, pre.clone(), components, init);
            let new_pre = self.compute_entry_state(head, init);
            if new_pre.leq(&pre) {
                debug!("{:?} stabilized after {} iterations", head, iteration + 1);
                pre = new_pre;
                break;
            }
            iteration += 1;
            if iteration <= self.config.widening_delay {
                pre.join_with(new_pre);
            } else {
                debug!("widening at {:?}", head);
                pre.widen_with(new_pre);
            }
        }

        for round in 0..self.config.narrowing_iterations {
            self.analyze_body(head, pre.clone(), components, init);
            let new_pre = self.compute_entry_state(head, init);
            if pre.leq(&new_pre) {
                debug!("{:?} has no more refinement after {} narrowings", head, round);
                return;
            }
            debug!("narrowing at {:?}", head);
            pre.narrow_with(new_pre);
        }
    }
}
