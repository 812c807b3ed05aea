/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::borrow::Cow;
use std::fmt;

use im::OrdMap;

use crate::datatype::AbstractDomain;

/*
 * An abstract environment maps program variables to elements of a common
 * abstract domain. A range analysis, for instance, binds variables to
 * intervals:
 *
 *   {x -> [-1, 1], i -> [0, 10], ...}
 *
 * Only non-top bindings are stored; a variable without an explicit binding
 * is implicitly top. If _|_ is bound to any variable, no concrete state is
 * described by the environment, so binding _|_ collapses the whole
 * environment to _|_.
 *
 * Bindings are kept in a persistent ordered map, so copying an environment
 * between program points is cheap and iteration is deterministic.
 */
pub trait AbstractEnvironment<K, D: AbstractDomain>: AbstractDomain {
    type ContainerType;
    fn bindings(&self) -> Option<&Self::ContainerType>;

    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn get(&self, key: &K) -> Cow<'_, D>;
    fn set(&mut self, key: K, domain: D);
    fn update(&mut self, key: &K, op: impl FnOnce(&mut D));
    fn forget(&mut self, key: &K);
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Environment<K: Ord + Clone, D: AbstractDomain> {
    Value(OrdMap<K, D>),
    Bottom,
}

impl<K, D> AbstractEnvironment<K, D> for Environment<K, D>
where
    K: Ord + Clone,
    D: AbstractDomain,
{
    type ContainerType = OrdMap<K, D>;

    fn bindings(&self) -> Option<&OrdMap<K, D>> {
        match self {
            Environment::Value(ref map) => Some(map),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.bindings().map_or(0, |map| map.len())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &K) -> Cow<'_, D> {
        let map = match self {
            Environment::Value(map) => map,
            Environment::Bottom => return Cow::Owned(D::bottom()),
        };

        match map.get(key) {
            Some(domain) => Cow::Borrowed(domain),
            None => Cow::Owned(D::top()),
        }
    }

    fn set(&mut self, key: K, domain: D) {
        if let Environment::Value(map) = self {
            if domain.is_top() {
                map.remove(&key);
            } else if domain.is_bottom() {
                *self = Environment::Bottom;
            } else {
                map.insert(key, domain);
            }
        }
    }

    fn update(&mut self, key: &K, op: impl FnOnce(&mut D)) {
        let mut domain = self.get(key).into_owned();
        if domain.is_bottom() {
            return;
        }
        op(&mut domain);
        self.set(key.clone(), domain);
    }

    fn forget(&mut self, key: &K) {
        if let Environment::Value(map) = self {
            map.remove(key);
        }
    }
}

impl<K, D> AbstractDomain for Environment<K, D>
where
    K: Ord + Clone,
    D: AbstractDomain,
{
    fn bottom() -> Self {
        Environment::Bottom
    }

    fn top() -> Self {
        Environment::Value(OrdMap::new())
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Environment::Bottom)
    }

    fn is_top(&self) -> bool {
        match self {
            Environment::Value(map) => map.is_empty(),
            _ => false,
        }
    }

    fn leq(&self, rhs: &Self) -> bool {
        use Environment::*;
        match (self, rhs) {
            (Bottom, _) => true,
            (_, Bottom) => false,
            (Value(l_map), Value(r_map)) => {
                if l_map.len() < r_map.len() {
                    // Some binding of rhs is implicitly top in lhs.
                    return false;
                }
                r_map.iter().all(|(r_k, r_v)| match l_map.get(r_k) {
                    Some(l_v) => l_v.leq(r_v),
                    None => false,
                })
            }
        }
    }

    fn join_with(&mut self, rhs: Self) {
        Self::join_like_operation(self, rhs, |d1, d2| d1.join_with(d2));
    }

    fn meet_with(&mut self, rhs: Self) {
        Self::meet_like_operation(self, rhs, |d1, d2| d1.meet_with(d2));
    }

    fn widen_with(&mut self, rhs: Self) {
        Self::join_like_operation(self, rhs, |d1, d2| d1.widen_with(d2));
    }

    fn narrow_with(&mut self, rhs: Self) {
        Self::meet_like_operation(self, rhs, |d1, d2| d1.narrow_with(d2));
    }
}

impl<K, D> Environment<K, D>
where
    K: Ord + Clone,
    D: AbstractDomain,
{
    pub fn iter(&self) -> impl Iterator<Item = (&K, &D)> {
        self.bindings().into_iter().flat_map(|map| map.iter())
    }

    fn join_like_operation(lhs: &mut Self, rhs: Self, operation: impl Fn(&mut D, D)) {
        use Environment::*;

        match (&mut *lhs, rhs) {
            (Value(l_map), Value(r_map)) => {
                let mut result = OrdMap::new();
                for (k, l_v) in l_map.iter() {
                    if let Some(r_v) = r_map.get(k) {
                        let mut v = l_v.clone();
                        operation(&mut v, r_v.clone());
                        if !v.is_top() {
                            result.insert(k.clone(), v);
                        }
                    }
                }
                *l_map = result;
            }
            (Bottom, rhs) => *lhs = rhs,
            (_, Bottom) => {}
        }
    }

    fn meet_like_operation(lhs: &mut Self, rhs: Self, operation: impl Fn(&mut D, D)) {
        use Environment::*;

        if lhs.is_bottom() {
            return;
        }

        if rhs.is_bottom() {
            *lhs = rhs;
            return;
        }

        if let (Value(l_map), Value(r_map)) = (&mut *lhs, rhs) {
            for (r_k, r_v) in r_map.into_iter() {
                if let Some(l_v) = l_map.get_mut(&r_k) {
                    operation(l_v, r_v);
                    if l_v.is_bottom() {
                        *lhs = Bottom;
                        return;
                    }
                } else {
                    // Top is the identity of meet-like operations.
                    l_map.insert(r_k, r_v);
                }
            }
        }
    }
}

impl<K, D> fmt::Display for Environment<K, D>
where
    K: Ord + Clone + fmt::Display,
    D: AbstractDomain + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Bottom => write!(f, "_|_"),
            Environment::Value(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} -> {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
