/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::config::DomainKind;
use crate::datatype::AbstractDomain;
use crate::datatype::DomainUnion;
use crate::domains::CongruenceDomain;
use crate::domains::Dbm;
use crate::domains::IntervalCongruenceDomain;
use crate::domains::IntervalDomain;
use crate::domains::Octagon;
use crate::domains::VarPackingDbm;
use crate::domains::VarPackingDbmCongruence;

/// A numerical domain chosen when the analysis is configured rather than
/// when it is compiled.
#[derive(Clone, Debug, PartialEq, Eq, DomainUnion)]
pub enum AnyDomain {
    Interval(IntervalDomain),
    Congruence(CongruenceDomain),
    IntervalCongruence(IntervalCongruenceDomain),
    Octagon(Octagon),
    Dbm(Dbm),
    VarPackingDbm(VarPackingDbm),
    VarPackingDbmCongruence(VarPackingDbmCongruence),
}

impl AnyDomain {
    pub fn top_of(kind: DomainKind) -> Self {
        match kind {
            DomainKind::Interval => AnyDomain::Interval(AbstractDomain::top()),
            DomainKind::Congruence => AnyDomain::Congruence(AbstractDomain::top()),
            DomainKind::IntervalCongruence => AnyDomain::IntervalCongruence(AbstractDomain::top()),
            DomainKind::Octagon => AnyDomain::Octagon(AbstractDomain::top()),
            DomainKind::Dbm => AnyDomain::Dbm(AbstractDomain::top()),
            DomainKind::VarPackingDbm => AnyDomain::VarPackingDbm(AbstractDomain::top()),
            DomainKind::VarPackingDbmCongruence => {
                AnyDomain::VarPackingDbmCongruence(AbstractDomain::top())
            }
        }
    }

    pub fn bottom_of(kind: DomainKind) -> Self {
        let mut domain = Self::top_of(kind);
        match &mut domain {
            AnyDomain::Interval(d) => d.set_to_bottom(),
            AnyDomain::Congruence(d) => d.set_to_bottom(),
            AnyDomain::IntervalCongruence(d) => d.set_to_bottom(),
            AnyDomain::Octagon(d) => d.set_to_bottom(),
            AnyDomain::Dbm(d) => d.set_to_bottom(),
            AnyDomain::VarPackingDbm(d) => d.set_to_bottom(),
            AnyDomain::VarPackingDbmCongruence(d) => d.set_to_bottom(),
        }
        domain
    }

    pub fn kind(&self) -> DomainKind {
        match self {
            AnyDomain::Interval(_) => DomainKind::Interval,
            AnyDomain::Congruence(_) => DomainKind::Congruence,
            AnyDomain::IntervalCongruence(_) => DomainKind::IntervalCongruence,
            AnyDomain::Octagon(_) => DomainKind::Octagon,
            AnyDomain::Dbm(_) => DomainKind::Dbm,
            AnyDomain::VarPackingDbm(_) => DomainKind::VarPackingDbm,
            AnyDomain::VarPackingDbmCongruence(_) => DomainKind::VarPackingDbmCongruence,
        }
    }
}
