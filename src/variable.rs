/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// An opaque, totally ordered program variable. Variables are cheap to copy;
/// names live in the `VariableFactory` that created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(u32);

impl Variable {
    pub fn new(id: u32) -> Self {
        Variable(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Interns names into variables. Interning the same name twice yields the
/// same variable.
#[derive(Clone, Debug, Default)]
pub struct VariableFactory {
    ids: HashMap<String, Variable>,
    names: Vec<String>,
}

impl VariableFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Variable {
        if let Some(v) = self.ids.get(name) {
            return *v;
        }
        let v = Variable(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), v);
        v
    }

    pub fn get(&self, name: &str) -> DomainResult<Variable> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| DomainError::unknown_name("variable", name))
    }

    pub fn name(&self, v: Variable) -> Option<&str> {
        self.names.get(v.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
