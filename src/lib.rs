/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

// The DomainUnion derive expands to `sparta_numerical::` paths, which must
// also resolve inside this crate.
extern crate self as sparta_numerical;

pub mod bound;
pub mod cfg;
pub mod config;
pub mod datatype;
pub mod domains;
pub mod error;
pub mod fixpoint_iter;
pub mod graph;
pub mod linear;
pub mod number;
pub mod variable;
pub mod wto;
