/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::str::FromStr;

use crate::domains::AnyDomain;
use crate::error::DomainError;

/// Tuning knobs of the fixpoint iteration at loop heads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixpointConfig {
    /// Number of plain joins at a loop head before widening kicks in.
    pub widening_delay: usize,
    /// Maximum number of narrowing rounds once a loop has stabilized.
    pub narrowing_iterations: usize,
}

impl Default for FixpointConfig {
    fn default() -> Self {
        Self {
            widening_delay: 1,
            narrowing_iterations: 2,
        }
    }
}

impl FixpointConfig {
    pub fn with_widening_delay(mut self, widening_delay: usize) -> Self {
        self.widening_delay = widening_delay;
        self
    }

    pub fn with_narrowing_iterations(mut self, narrowing_iterations: usize) -> Self {
        self.narrowing_iterations = narrowing_iterations;
        self
    }
}

/// The numerical domains an analysis can run with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DomainKind {
    #[default]
    Interval,
    Congruence,
    IntervalCongruence,
    Octagon,
    Dbm,
    VarPackingDbm,
    VarPackingDbmCongruence,
}

impl DomainKind {
    pub const ALL: [DomainKind; 7] = [
        DomainKind::Interval,
        DomainKind::Congruence,
        DomainKind::IntervalCongruence,
        DomainKind::Octagon,
        DomainKind::Dbm,
        DomainKind::VarPackingDbm,
        DomainKind::VarPackingDbmCongruence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DomainKind::Interval => "interval",
            DomainKind::Congruence => "congruence",
            DomainKind::IntervalCongruence => "interval-congruence",
            DomainKind::Octagon => "octagon",
            DomainKind::Dbm => "dbm",
            DomainKind::VarPackingDbm => "var-pack-dbm",
            DomainKind::VarPackingDbmCongruence => "var-pack-dbm-congruence",
        }
    }
}

impl FromStr for DomainKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DomainError::unknown_name("domain", s))
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything needed to set up an analysis run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub domain: DomainKind,
    pub fixpoint: FixpointConfig,
}

impl AnalysisConfig {
    pub fn new(domain: DomainKind) -> Self {
        Self {
            domain,
            fixpoint: FixpointConfig::default(),
        }
    }

    pub fn with_fixpoint(mut self, fixpoint: FixpointConfig) -> Self {
        self.fixpoint = fixpoint;
        self
    }

    /// The state at the entry of the analyzed code: top of the selected
    /// domain.
    pub fn initial_state(&self) -> AnyDomain {
        AnyDomain::top_of(self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::AbstractDomain;
    use crate::domains::NumericalDomain;

    #[test]
    fn test_parse_domain_kind() {
        for kind in DomainKind::ALL {
            assert_eq!(kind.name().parse::<DomainKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(
            "polyhedra".parse::<DomainKind>(),
            Err(DomainError::unknown_name("domain", "polyhedra"))
        );
        assert_eq!(DomainKind::default(), DomainKind::Interval);
    }

    #[test]
    fn test_defaults() {
        let config = FixpointConfig::default();
        assert_eq!(config.widening_delay, 1);
        assert_eq!(config.narrowing_iterations, 2);

        let config = config.with_widening_delay(3).with_narrowing_iterations(0);
        assert_eq!(config.widening_delay, 3);
        assert_eq!(config.narrowing_iterations, 0);
    }

    #[test]
    fn test_initial_state() {
        let config = AnalysisConfig::new("octagon".parse().unwrap());
        let state = config.initial_state();
        assert!(state.is_top());
        assert_eq!(state.kind(), DomainKind::Octagon);
        assert!(AnalysisConfig::default().initial_state().is_top());
    }

    #[test]
    fn test_domain_names_match_kinds() {
        for kind in DomainKind::ALL {
            let state = AnyDomain::top_of(kind);
            assert_eq!(state.domain_name(), kind.name());
            assert_eq!(state.domain_name().parse::<DomainKind>(), Ok(state.kind()));
        }
    }
}
