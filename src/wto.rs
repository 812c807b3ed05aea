/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

use crate::graph::SuccessorNodes;

/// An element of a weak topological ordering: a single vertex, or a
/// strongly connected component with its head and nested ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WtoComponent<N> {
    Vertex(N),
    Cycle {
        head: N,
        components: Vec<WtoComponent<N>>,
    },
}

impl<N: Copy> WtoComponent<N> {
    /// The vertex itself, or the head of the cycle.
    pub fn head(&self) -> N {
        match self {
            WtoComponent::Vertex(n) => *n,
            WtoComponent::Cycle { head, .. } => *head,
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, WtoComponent::Cycle { .. })
    }
}

/*
 * Bourdoncle's weak topological ordering ("Efficient chaotic iteration
 * strategies with widenings", 1993): a hierarchical ordering of the nodes
 * reachable from the root in which every cycle of the graph goes through
 * the head of some component. Iterating components in order and
 * stabilizing each cycle at its head gives the recursive iteration
 * strategy, with widening applied at heads only.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeakTopologicalOrdering<N> {
    components: Vec<WtoComponent<N>>,
}

impl<N> WeakTopologicalOrdering<N>
where
    N: Copy + Hash + Eq + Debug,
{
    pub fn new<SN>(root: N, successor_nodes: &SN) -> Self
    where
        SN: SuccessorNodes<NodeId = N>,
    {
        let mut builder = WtoBuilder {
            successor_nodes,
            dfn: HashMap::new(),
            stack: Vec::new(),
            num: 0,
        };
        let mut components = Vec::new();
        builder.visit(root, &mut components);
        components.reverse();
        Self { components }
    }

    pub fn components(&self) -> &[WtoComponent<N>] {
        &self.components
    }

    pub fn iter(&self) -> impl Iterator<Item = &WtoComponent<N>> {
        self.components.iter()
    }
}

struct WtoBuilder<'a, N, SN> {
    successor_nodes: &'a SN,
    /// Depth-first number of each node; 0 means not visited yet and
    /// `u32::MAX` means already placed in a component.
    dfn: HashMap<N, u32>,
    stack: Vec<N>,
    num: u32,
}

impl<'a, N, SN> WtoBuilder<'a, N, SN>
where
    N: Copy + Hash + Eq + Debug,
    SN: SuccessorNodes<NodeId = N>,
{
    fn dfn(&self, n: N) -> u32 {
        self.dfn.get(&n).copied().unwrap_or_default()
    }

    /// Returns the smallest depth-first number reachable from v.
    fn visit(&mut self, v: N, partition: &mut Vec<WtoComponent<N>>) -> u32 {
        self.stack.push(v);
        self.num += 1;
        self.dfn.insert(v, self.num);
        let mut head = self.num;
        let mut is_loop = false;

        for w in self.successor_nodes.get_succ_nodes(v) {
            let min = match self.dfn(w) {
                0 => self.visit(w, partition),
                n => n,
            };
            if min <= head {
                head = min;
                is_loop = true;
            }
        }

        if head == self.dfn(v) {
            self.dfn.insert(v, u32::MAX);
            if is_loop {
                while let Some(element) = self.stack.pop() {
                    if element == v {
                        break;
                    }
                    self.dfn.insert(element, 0);
                }
                let component = self.component(v);
                partition.push(component);
            } else {
                self.stack.pop();
                partition.push(WtoComponent::Vertex(v));
            }
        }
        head
    }

    fn component(&mut self, head: N) -> WtoComponent<N> {
        let mut components = Vec::new();
        for w in self.successor_nodes.get_succ_nodes(head) {
            if self.dfn(w) == 0 {
                self.visit(w, &mut components);
            }
        }
        components.reverse();
        WtoComponent::Cycle { head, components }
    }
}

impl<N: fmt::Display> fmt::Display for WtoComponent<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WtoComponent::Vertex(n) => write!(f, "{}", n),
            WtoComponent::Cycle { head, components } => {
                write!(f, "({}", head)?;
                for c in components {
                    write!(f, " {}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl<N: fmt::Display> fmt::Display for WeakTopologicalOrdering<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
