/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

mod abstract_domain;
mod abstract_environment;
mod discrete_domain;

pub use abstract_domain::*;
pub use abstract_environment::*;
pub use discrete_domain::*;

extern crate sparta_numerical_proc_macros;
pub use sparta_numerical_proc_macros::DomainUnion;
