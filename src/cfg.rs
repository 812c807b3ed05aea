/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;
use std::fmt;

use log::trace;
use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use smallvec::SmallVec;

use crate::config::FixpointConfig;
use crate::domains::pointer;
use crate::domains::NumericalDomain;
use crate::error::DomainError;
use crate::error::DomainResult;
use crate::fixpoint_iter::FixpointIteratorTransformer;
use crate::fixpoint_iter::MonotonicFixpointIterator;
use crate::graph::Graph;
use crate::graph::DEFAULT_GRAPH_SUCCS_NUM;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::variable::Variable;

/// A numerical statement of a basic block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// x = e
    Assign(Variable, LinearExpression),
    /// x = y op z
    Apply(Operation, Variable, Variable, Operand),
    /// Keeps only the states satisfying the constraint.
    Assume(LinearConstraint),
    /// x = nondet()
    Forget(Variable),
    /// p = &obj
    AssignObject(Variable, Variable),
    /// p = q, or p = q + offset
    AssignPointer(Variable, Variable, Option<Operand>),
    /// p == q, or p != q when the flag is false
    AssertPointer(bool, Variable, Variable),
}

impl Statement {
    /// Runs the statement on `inv`. Pointer statements are no-ops on domains
    /// without the pointer capability.
    pub fn execute<D: NumericalDomain>(&self, inv: &mut D) {
        match self {
            Statement::Assign(x, e) => inv.assign(*x, e),
            Statement::Apply(op, x, y, z) => inv.apply(*op, *x, *y, z.clone()),
            Statement::Assume(c) => inv.add_constraint(c),
            Statement::Forget(x) => inv.forget(*x),
            Statement::AssignObject(p, obj) => pointer::assign_object(inv, *p, *obj),
            Statement::AssignPointer(p, q, None) => pointer::assign_pointer(inv, *p, *q),
            Statement::AssignPointer(p, q, Some(offset)) => {
                pointer::assign_pointer_offset(inv, *p, *q, offset.clone())
            }
            Statement::AssertPointer(equality, p, q) => {
                pointer::assert_pointer(inv, *equality, *p, *q)
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign(x, e) => write!(f, "{} = {}", x, e),
            Statement::Apply(op, x, y, z) => write!(f, "{} = {} {} {}", x, y, op, z),
            Statement::Assume(c) => write!(f, "assume({})", c),
            Statement::Forget(x) => write!(f, "havoc({})", x),
            Statement::AssignObject(p, obj) => write!(f, "{} = &{}", p, obj),
            Statement::AssignPointer(p, q, None) => write!(f, "{} = {}", p, q),
            Statement::AssignPointer(p, q, Some(offset)) => {
                write!(f, "{} = {} + {}", p, q, offset)
            }
            Statement::AssertPointer(true, p, q) => write!(f, "assert({} == {})", p, q),
            Statement::AssertPointer(false, p, q) => write!(f, "assert({} != {})", p, q),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    name: String,
    statements: Vec<Statement>,
}

impl BasicBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

/*
 * A control-flow graph of named basic blocks holding numerical statements.
 * Each edge carries the guard constraints that hold when it is taken, e.g.
 * the branch condition of a conditional jump.
 */
#[derive(Clone, Debug)]
pub struct ControlFlowGraph {
    graph: DiGraph<BasicBlock, Vec<LinearConstraint>>,
    names: HashMap<String, NodeIndex>,
    entry: NodeIndex,
    exit: NodeIndex,
}

impl ControlFlowGraph {
    /// Creates a graph made of its entry block, which is also the exit block
    /// until `set_exit` is called.
    pub fn new(entry_name: &str) -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(BasicBlock {
            name: entry_name.to_string(),
            statements: Vec::new(),
        });
        Self {
            graph,
            names: HashMap::from([(entry_name.to_string(), entry)]),
            entry,
            exit: entry,
        }
    }

    /// Returns the block with this name, creating it if needed.
    pub fn add_block(&mut self, name: &str) -> NodeIndex {
        if let Some(block) = self.names.get(name) {
            return *block;
        }
        let block = self.graph.add_node(BasicBlock {
            name: name.to_string(),
            statements: Vec::new(),
        });
        self.names.insert(name.to_string(), block);
        block
    }

    pub fn block_by_name(&self, name: &str) -> DomainResult<NodeIndex> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DomainError::unknown_name("basic block", name))
    }

    pub fn block(&self, block: NodeIndex) -> &BasicBlock {
        &self.graph[block]
    }

    pub fn push(&mut self, block: NodeIndex, statement: Statement) {
        self.graph[block].statements.push(statement);
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) -> EdgeIndex {
        self.graph.add_edge(from, to, Vec::new())
    }

    pub fn add_guarded_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        guards: Vec<LinearConstraint>,
    ) -> EdgeIndex {
        self.graph.add_edge(from, to, guards)
    }

    pub fn set_exit(&mut self, block: NodeIndex) {
        self.exit = block;
    }

    pub fn statements(&self, block: NodeIndex) -> &[Statement] {
        &self.graph[block].statements
    }

    pub fn guards(&self, e: EdgeIndex) -> &[LinearConstraint] {
        &self.graph[e]
    }

    /// Runs the fixpoint iteration of this graph over domain D, from `init`
    /// at the entry block.
    pub fn analyze<D: NumericalDomain>(
        &self,
        init: D,
        config: FixpointConfig,
    ) -> MonotonicFixpointIterator<'_, ControlFlowGraph, D, NumericalTransformer<'_>> {
        let mut iterator =
            MonotonicFixpointIterator::new(self, NumericalTransformer::new(self)).with_config(config);
        iterator.run(init);
        iterator
    }
}

impl Graph for ControlFlowGraph {
    type NodeId = NodeIndex;
    type EdgeId = EdgeIndex;

    fn entry(&self) -> NodeIndex {
        self.entry
    }

    fn exit(&self) -> NodeIndex {
        self.exit
    }

    fn predecessors(&self, n: NodeIndex) -> SmallVec<[EdgeIndex; DEFAULT_GRAPH_SUCCS_NUM]> {
        self.graph
            .edges_directed(n, Direction::Incoming)
            .map(|e| e.id())
            .collect()
    }

    fn successors(&self, n: NodeIndex) -> SmallVec<[EdgeIndex; DEFAULT_GRAPH_SUCCS_NUM]> {
        let mut succs: SmallVec<[EdgeIndex; DEFAULT_GRAPH_SUCCS_NUM]> = self
            .graph
            .edges_directed(n, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        // petgraph lists the most recently added edge first.
        succs.reverse();
        succs
    }

    fn source(&self, e: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[e.index()].source()
    }

    fn target(&self, e: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[e.index()].target()
    }

    fn size(&self) -> usize {
        self.graph.node_count()
    }
}

/// Executes basic blocks and edge guards on any numerical domain.
pub struct NumericalTransformer<'a> {
    cfg: &'a ControlFlowGraph,
}

impl<'a> NumericalTransformer<'a> {
    pub fn new(cfg: &'a ControlFlowGraph) -> Self {
        Self { cfg }
    }
}

impl<'a, D: NumericalDomain> FixpointIteratorTransformer<ControlFlowGraph, D>
    for NumericalTransformer<'a>
{
    fn analyze_node(&self, n: NodeIndex, current_state: &mut D) {
        for statement in self.cfg.statements(n) {
            if current_state.is_bottom() {
                return;
            }
            trace!("{}: {}", self.cfg.block(n).name(), statement);
            statement.execute(current_state);
        }
    }

    fn analyze_edge(&self, e: EdgeIndex, exit_state_at_src: &D) -> D {
        let mut state = exit_state_at_src.clone();
        state.add_constraints(self.cfg.guards(e));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::AbstractDomain;
    use crate::domains::Interval;
    use crate::domains::IntervalDomain;
    use crate::variable::VariableFactory;

    #[test]
    fn test_blocks_by_name() {
        let mut cfg = ControlFlowGraph::new("entry");
        let entry = cfg.block_by_name("entry").unwrap();
        let body = cfg.add_block("body");
        assert_eq!(cfg.add_block("body"), body);
        assert_eq!(cfg.block_by_name("body"), Ok(body));
        assert_eq!(
            cfg.block_by_name("exit"),
            Err(DomainError::unknown_name("basic block", "exit"))
        );
        assert_eq!(cfg.entry(), entry);
        assert_eq!(cfg.exit(), entry);

        let e1 = cfg.add_edge(entry, body);
        let e2 = cfg.add_edge(entry, entry);
        assert_eq!(cfg.successors(entry).as_slice(), &[e1, e2]);
        assert_eq!(cfg.predecessors(body).as_slice(), &[e1]);
        assert_eq!(cfg.source(e1), entry);
        assert_eq!(cfg.target(e1), body);
        assert_eq!(cfg.size(), 2);
    }

    #[test]
    fn test_statements() {
        let mut vars = VariableFactory::new();
        let x = vars.intern("x");
        let y = vars.intern("y");
        let p = vars.intern("p");
        let obj = vars.intern("obj");

        let statements = [
            Statement::Assign(x, LinearExpression::from(5)),
            Statement::Apply(Operation::Mul, y, x, Operand::from(3)),
            Statement::Assume(LinearConstraint::leq(y, 12)),
            Statement::AssignObject(p, obj),
        ];
        let mut inv = IntervalDomain::top();
        for statement in &statements {
            statement.execute(&mut inv);
        }
        assert!(inv.is_bottom());

        let mut inv = IntervalDomain::top();
        for statement in &statements[..2] {
            statement.execute(&mut inv);
        }
        assert_eq!(inv.to_interval(y), Interval::singleton(15));
        Statement::Forget(y).execute(&mut inv);
        assert!(inv.to_interval(y).is_top());

        assert_eq!(statements[1].to_string(), "v1 = v0 * 3");
        assert_eq!(statements[3].to_string(), "v2 = &v3");
        assert_eq!(
            Statement::AssertPointer(false, p, obj).to_string(),
            "assert(v2 != v3)"
        );
    }

    #[test]
    fn test_guarded_branches() {
        let mut vars = VariableFactory::new();
        let x = vars.intern("x");

        // if (x <= 0) x = -x; and x stays as is otherwise.
        let mut cfg = ControlFlowGraph::new("entry");
        let entry = cfg.entry();
        let negate = cfg.add_block("negate");
        let exit = cfg.add_block("exit");
        cfg.push(negate, Statement::Assign(x, -x));
        cfg.add_guarded_edge(entry, negate, vec![LinearConstraint::leq(x, 0)]);
        cfg.add_guarded_edge(entry, exit, vec![LinearConstraint::gt(x, 0)]);
        cfg.add_edge(negate, exit);
        cfg.set_exit(exit);

        let mut init = IntervalDomain::top();
        init.add_constraint(&LinearConstraint::geq(x, -4));
        init.add_constraint(&LinearConstraint::leq(x, 7));
        let analysis = cfg.analyze(init, FixpointConfig::default());
        assert_eq!(
            analysis.get_exit_state_at(negate).to_interval(x),
            Interval::range(0, 4)
        );
        assert_eq!(
            analysis.get_entry_state_at(cfg.exit()).to_interval(x),
            Interval::range(0, 7)
        );
    }
}
