/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use disjoint_sets::UnionFind;
use log::trace;

use crate::config::DomainKind;
use crate::datatype::AbstractDomain;
use crate::domains::interval_constraints;
use crate::domains::operand_constant;
use crate::domains::operand_interval;
use crate::domains::Dbm;
use crate::domains::Interval;
use crate::domains::NumericalDomain;
use crate::linear::LinearConstraint;
use crate::linear::LinearExpression;
use crate::linear::Operand;
use crate::linear::Operation;
use crate::variable::Variable;

#[derive(Clone, Debug)]
struct Pack<D> {
    vars: BTreeSet<Variable>,
    domain: D,
}

/*
 * Variable packing: the variables are partitioned into packs and each pack
 * gets its own instance of a relational domain. Two variables are only
 * related if some operation or constraint mentioned them together, in which
 * case their packs have been merged. Variables in no pack are unconstrained.
 *
 * Binary lattice operations first compute the common partition of both
 * operands (the finest partition coarser than both), then combine the
 * per-pack states group by group.
 */
#[derive(Clone, Debug)]
pub struct VarPacking<D> {
    bottom: bool,
    packs: Vec<Pack<D>>,
}

pub type VarPackingDbm = VarPacking<Dbm>;

impl<D: NumericalDomain> VarPacking<D> {
    pub fn num_packs(&self) -> usize {
        self.packs.len()
    }

    /// The variables sharing a pack with x, x included.
    pub fn pack_of(&self, x: Variable) -> Option<&BTreeSet<Variable>> {
        self.packs
            .iter()
            .find(|p| p.vars.contains(&x))
            .map(|p| &p.vars)
    }

    fn pack_index(&self, x: Variable) -> Option<usize> {
        self.packs.iter().position(|p| p.vars.contains(&x))
    }

    /// Merges every pack touching `vars` into a single pack that also
    /// covers `vars`, and returns its index.
    fn merge(&mut self, vars: BTreeSet<Variable>) -> usize {
        let touched: Vec<usize> = self
            .packs
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.vars.is_disjoint(&vars))
            .map(|(i, _)| i)
            .collect();
        if let [i] = touched.as_slice() {
            let i = *i;
            self.packs[i].vars.extend(vars);
            return i;
        }
        let mut merged = Pack {
            vars,
            domain: D::top(),
        };
        for i in touched.into_iter().rev() {
            let pack = self.packs.swap_remove(i);
            merged.vars.extend(pack.vars);
            merged.domain.meet_with(pack.domain);
        }
        self.packs.push(merged);
        self.packs.len() - 1
    }

    /// Propagates _|_ from a pack and drops packs carrying no information.
    fn settle(&mut self) {
        if self.packs.iter().any(|p| p.domain.is_bottom()) {
            self.set_to_bottom();
            return;
        }
        self.packs.retain(|p| !p.vars.is_empty() && !p.domain.is_top());
    }

    /// Meet of the packs of `self` touching `vars`.
    fn project(&self, vars: &BTreeSet<Variable>) -> D {
        let mut result = D::top();
        for pack in self.packs.iter().filter(|p| !p.vars.is_disjoint(vars)) {
            result.meet_with(pack.domain.clone());
        }
        result
    }

    fn combine(self, rhs: Self, op: impl Fn(D, D) -> D) -> Self {
        let lhs_count = self.packs.len();
        let nodes: Vec<Pack<D>> = self.packs.into_iter().chain(rhs.packs).collect();

        let mut sets = UnionFind::<usize>::new(nodes.len());
        let mut owner: BTreeMap<Variable, usize> = BTreeMap::new();
        for (node, pack) in nodes.iter().enumerate() {
            for v in pack.vars.iter() {
                match owner.entry(*v) {
                    Entry::Vacant(entry) => {
                        entry.insert(node);
                    }
                    Entry::Occupied(entry) => {
                        sets.union(*entry.get(), node);
                    }
                }
            }
        }

        // A side contributing a single pack to a group is passed through
        // as is: the left operand of a widening must stay unclosed.
        let mut groups: BTreeMap<usize, (BTreeSet<Variable>, Option<D>, Option<D>)> =
            BTreeMap::new();
        for (node, pack) in nodes.into_iter().enumerate() {
            let group = groups
                .entry(sets.find(node))
                .or_insert_with(|| (BTreeSet::new(), None, None));
            group.0.extend(pack.vars);
            let side = if node < lhs_count {
                &mut group.1
            } else {
                &mut group.2
            };
            match side {
                Some(domain) => domain.meet_with(pack.domain),
                None => *side = Some(pack.domain),
            }
        }

        let mut result = Self {
            bottom: false,
            packs: groups
                .into_values()
                .map(|(vars, lhs, rhs)| Pack {
                    vars,
                    domain: op(lhs.unwrap_or_else(D::top), rhs.unwrap_or_else(D::top)),
                })
                .collect(),
        };
        result.settle();
        result
    }
}

impl<D: NumericalDomain> AbstractDomain for VarPacking<D> {
    fn bottom() -> Self {
        Self {
            bottom: true,
            packs: Vec::new(),
        }
    }

    fn top() -> Self {
        Self {
            bottom: false,
            packs: Vec::new(),
        }
    }

    fn is_bottom(&self) -> bool {
        self.bottom
    }

    fn is_top(&self) -> bool {
        !self.bottom && self.packs.iter().all(|p| p.domain.is_top())
    }

    fn leq(&self, rhs: &Self) -> bool {
        if self.bottom {
            return true;
        }
        if rhs.bottom {
            return false;
        }
        rhs.packs
            .iter()
            .all(|pack| self.project(&pack.vars).leq(&pack.domain))
    }

    fn join_with(&mut self, rhs: Self) {
        if rhs.bottom {
            return;
        }
        if self.bottom {
            *self = rhs;
            return;
        }
        let lhs = std::mem::replace(self, Self::top());
        *self = lhs.combine(rhs, |a, b| a.join(b));
    }

    fn meet_with(&mut self, rhs: Self) {
        if self.bottom {
            return;
        }
        if rhs.bottom {
            self.set_to_bottom();
            return;
        }
        let lhs = std::mem::replace(self, Self::top());
        *self = lhs.combine(rhs, |a, b| a.meet(b));
    }

    fn widen_with(&mut self, rhs: Self) {
        if rhs.bottom {
            return;
        }
        if self.bottom {
            *self = rhs;
            return;
        }
        let lhs = std::mem::replace(self, Self::top());
        *self = lhs.combine(rhs, |a, b| a.widen(b));
    }

    fn narrow_with(&mut self, rhs: Self) {
        if self.bottom {
            return;
        }
        if rhs.bottom {
            self.set_to_bottom();
            return;
        }
        let lhs = std::mem::replace(self, Self::top());
        *self = lhs.combine(rhs, |a, b| a.narrow(b));
    }
}

impl<D: NumericalDomain> PartialEq for VarPacking<D> {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl<D: NumericalDomain> Eq for VarPacking<D> {}

impl<D: NumericalDomain> NumericalDomain for VarPacking<D> {
    fn domain_name(&self) -> &'static str {
        DomainKind::VarPackingDbm.name()
    }

    fn assign(&mut self, x: Variable, e: &LinearExpression) {
        if self.bottom {
            return;
        }
        if !e.contains(x) {
            self.forget(x);
        }
        let mut vars = e.variables();
        vars.insert(x);
        let i = self.merge(vars);
        self.packs[i].domain.assign(x, e);
        self.settle();
    }

    fn apply(&mut self, op: Operation, x: Variable, y: Variable, z: Operand) {
        if self.bottom {
            return;
        }
        let affine = match op {
            Operation::Add | Operation::Sub => true,
            Operation::Mul => operand_constant(&z).is_some(),
            _ => false,
        };
        if affine {
            let mut vars = BTreeSet::from([x, y]);
            if let Operand::Var(w) = &z {
                vars.insert(*w);
            }
            if y != x && z != Operand::Var(x) {
                self.forget(x);
            }
            let i = self.merge(vars);
            self.packs[i].domain.apply(op, x, y, z);
            self.settle();
            return;
        }
        let rhs = operand_interval(&z, |v| self.to_interval(v));
        let itv = self.to_interval(y).apply(op, &rhs);
        trace!("{} = {} {} {} evaluated to {}", x, y, op, z, itv);
        self.forget(x);
        if itv.is_bottom() {
            self.set_to_bottom();
            return;
        }
        let mut domain = D::top();
        domain.add_constraints(&interval_constraints(x, &itv));
        self.packs.push(Pack {
            vars: BTreeSet::from([x]),
            domain,
        });
        self.settle();
    }

    fn add_constraint(&mut self, c: &LinearConstraint) {
        if self.bottom {
            return;
        }
        if let Some(holds) = c.constant_truth() {
            if !holds {
                self.set_to_bottom();
            }
            return;
        }
        let i = self.merge(c.variables());
        self.packs[i].domain.add_constraint(c);
        self.settle();
    }

    fn forget(&mut self, x: Variable) {
        if self.bottom {
            return;
        }
        if let Some(i) = self.pack_index(x) {
            self.packs[i].domain.forget(x);
            self.packs[i].vars.remove(&x);
            self.settle();
        }
    }

    fn to_interval(&self, x: Variable) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        match self.pack_index(x) {
            Some(i) => self.packs[i].domain.to_interval(x),
            None => Interval::top(),
        }
    }
}

impl<D: NumericalDomain> fmt::Display for VarPacking<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bottom {
            return write!(f, "_|_");
        }
        write!(f, "[")?;
        for (n, pack) in self.packs.iter().enumerate() {
            if n > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", pack.domain)?;
        }
        write!(f, "]")
    }
}
