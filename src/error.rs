/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use thiserror::Error;

/// Errors reported by the numerical domains and the analysis front-end.
///
/// Lattice operations never fail: an inconsistent state is represented by
/// bottom. These errors cover the places where a caller asks for something
/// the chosen domain cannot answer, or where external input is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{operation} is not supported by the {domain} domain")]
    Unsupported {
        operation: &'static str,
        domain: &'static str,
    },

    #[error("inconsistent domain state: {0}")]
    Inconsistent(String),

    #[error("unknown {kind} `{name}`")]
    UnknownName { kind: &'static str, name: String },

    #[error("{value} does not fit in {target}")]
    Overflow { value: String, target: &'static str },
}

impl DomainError {
    pub fn unsupported(operation: &'static str, domain: &'static str) -> Self {
        DomainError::Unsupported { operation, domain }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        DomainError::Inconsistent(message.into())
    }

    pub fn unknown_name(kind: &'static str, name: impl Into<String>) -> Self {
        DomainError::UnknownName {
            kind,
            name: name.into(),
        }
    }

    pub fn overflow(value: impl ToString, target: &'static str) -> Self {
        DomainError::Overflow {
            value: value.to_string(),
            target,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
