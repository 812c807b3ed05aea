/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::iter::FromIterator;

use im::OrdSet;

use super::abstract_domain::AbstractDomain;

/*
 * Finite sets of elements with an explicit top standing for "any element".
 * The empty set is bottom. Used for points-to sets, where an element is the
 * memory object a pointer may address.
 *
 * Element universes are finite for a given program, so widening is the
 * join.
 */
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum DiscreteDomain<T: Ord + Clone> {
    Top,
    Value(OrdSet<T>),
}

impl<T: Ord + Clone> DiscreteDomain<T> {
    pub fn singleton(e: T) -> Self {
        DiscreteDomain::Value(OrdSet::unit(e))
    }

    pub fn contains(&self, e: &T) -> bool {
        match self {
            DiscreteDomain::Top => true,
            DiscreteDomain::Value(set) => set.contains(e),
        }
    }

    /// Number of elements, `None` for top.
    pub fn len(&self) -> Option<usize> {
        match self {
            DiscreteDomain::Top => None,
            DiscreteDomain::Value(set) => Some(set.len()),
        }
    }

    pub fn add_element(&mut self, e: T) {
        if let DiscreteDomain::Value(set) = self {
            set.insert(e);
        }
    }

    pub fn remove_element(&mut self, e: &T) {
        if let DiscreteDomain::Value(set) = self {
            set.remove(e);
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &'_ T> {
        let set = match self {
            DiscreteDomain::Value(set) => Some(set),
            DiscreteDomain::Top => None,
        };
        set.into_iter().flat_map(|s| s.iter())
    }

    /// The only element of a singleton set.
    pub fn as_singleton(&self) -> Option<&T> {
        match self {
            DiscreteDomain::Value(set) if set.len() == 1 => set.get_min(),
            _ => None,
        }
    }
}

impl<T: Ord + Clone> AbstractDomain for DiscreteDomain<T> {
    fn bottom() -> Self {
        DiscreteDomain::Value(OrdSet::new())
    }

    fn top() -> Self {
        DiscreteDomain::Top
    }

    fn is_bottom(&self) -> bool {
        matches!(self, DiscreteDomain::Value(set) if set.is_empty())
    }

    fn is_top(&self) -> bool {
        matches!(self, DiscreteDomain::Top)
    }

    fn leq(&self, rhs: &Self) -> bool {
        use DiscreteDomain::*;
        match (self, rhs) {
            (_, Top) => true,
            (Top, Value(_)) => false,
            (Value(s), Value(t)) => s.is_subset(t),
        }
    }

    fn join_with(&mut self, rhs: Self) {
        use DiscreteDomain::*;
        match (&mut *self, rhs) {
            (Top, _) => {}
            (Value(_), Top) => *self = Top,
            (Value(s), Value(t)) => {
                let union = std::mem::take(s).union(t);
                *s = union;
            }
        }
    }

    fn meet_with(&mut self, rhs: Self) {
        use DiscreteDomain::*;
        match (&mut *self, rhs) {
            (_, Top) => {}
            (Top, rhs) => *self = rhs,
            (Value(s), Value(t)) => {
                let intersection = std::mem::take(s).intersection(t);
                *s = intersection;
            }
        }
    }

    fn widen_with(&mut self, rhs: Self) {
        self.join_with(rhs);
    }

    fn narrow_with(&mut self, rhs: Self) {
        self.meet_with(rhs);
    }
}

impl<T: Ord + Clone> FromIterator<T> for DiscreteDomain<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        DiscreteDomain::Value(iter.into_iter().collect())
    }
}

impl<T: Ord + Clone + fmt::Display> fmt::Display for DiscreteDomain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscreteDomain::Top => write!(f, "T"),
            DiscreteDomain::Value(set) if set.is_empty() => write!(f, "_|_"),
            DiscreteDomain::Value(set) => {
                write!(f, "{{")?;
                for (i, e) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
        }
    }
}
