// Removal of unreachable declarations
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Removal of unreachable declarations.
//!
//! Once inlined,
//!   most declarations of a member are referenced by nothing but the
//!   bodies they were copied into.
//! Each accessor of each declaration is a node of a graph,
//!   with an edge for every link that remains in its woven body.
//! Both accessors of an event declaration are a single node,
//!   since an event cannot be emitted with only one of them.
//!
//! The roots of the graph are the final declaration of each accessor
//!   chain,
//!     which become the public member,
//!   together with every declaration marked `[NotDiscardable]`.
//! Nodes not reachable from a root are discarded.
//! Inherited declarations are never nodes;
//!   they are not emitted and so cannot be discarded.
//!
//! Discarding is a pure function of the woven member,
//!   so repeating it yields the same result.

use super::{
    chain::{DeclId, MemberChains, MemberKind},
    inline::WovenMember,
};
use crate::syntax::ast::{AccessorKind, ExprKind};
use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use petgraph::graph::{DiGraph, NodeIndex};

/// A declaration's accessor as a unit of retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit {
    pub decl: DeclId,
    pub kind: AccessorKind,
}

impl Unit {
    fn new(member: &MemberChains, decl: DeclId, kind: AccessorKind) -> Self {
        let kind = match member.kind {
            MemberKind::Event => AccessorKind::Add,
            MemberKind::Method | MemberKind::Property => kind,
        };

        Self { decl, kind }
    }
}

/// Units of a member that survive discarding.
#[derive(Debug, Clone, PartialEq)]
pub struct Retained {
    event: bool,

    /// Every unit,
    ///   indexed as the nodes of the reference graph.
    units: Vec<Unit>,
    live: FixedBitSet,
}

impl Retained {
    /// Whether accessor `kind` of `decl` is retained.
    pub fn contains(&self, decl: DeclId, kind: AccessorKind) -> bool {
        let kind = if self.event { AccessorKind::Add } else { kind };

        self.units
            .iter()
            .position(|u| *u == Unit { decl, kind })
            .map_or(false, |i| self.live.contains(i))
    }

    /// Whether any accessor of `decl` is retained.
    pub fn contains_decl(&self, decl: DeclId) -> bool {
        self.retained().any(|u| u.decl == decl)
    }

    pub fn retained(&self) -> impl Iterator<Item = &Unit> {
        self.live.ones().map(|i| &self.units[i])
    }

    /// Number of units discarded.
    pub fn discarded(&self) -> usize {
        self.units.len() - self.live.count_ones(..)
    }
}

/// Determine which units of `member` are reachable after inlining.
pub fn discard(member: &MemberChains, woven: &WovenMember) -> Retained {
    let mut graph: DiGraph<Unit, ()> = DiGraph::new();
    let mut index: FxHashMap<Unit, NodeIndex> = FxHashMap::default();

    let units = member
        .decl_ids()
        .zip(&member.decls)
        .filter(|(_, decl)| !decl.origin.is_inherited())
        .flat_map(|(id, decl)| {
            decl.kinds()
                .into_iter()
                .map(move |kind| Unit::new(member, id, kind))
        });

    for unit in units {
        index.entry(unit).or_insert_with(|| graph.add_node(unit));
    }

    for (decl, woven_decl) in member.decl_ids().zip(&woven.decls) {
        for (kind, body) in &woven_decl.bodies {
            let Some(&from) = index.get(&Unit::new(member, decl, *kind)) else {
                continue;
            };

            body.walk_exprs(&mut |e| {
                let ExprKind::Link(_) = e.kind else { return };

                let to = woven
                    .resolution
                    .get(e.id)
                    .and_then(|t| index.get(&Unit::new(member, t.decl, t.kind)));

                if let Some(&to) = to {
                    graph.update_edge(from, to, ());
                }
            });
        }
    }

    let finals = member
        .chains
        .iter()
        .map(|chain| Unit::new(member, chain.last(), chain.kind));

    let pinned = member
        .decl_ids()
        .zip(&member.decls)
        .filter(|(_, decl)| decl.flags.not_discardable)
        .flat_map(|(id, decl)| {
            decl.kinds()
                .into_iter()
                .map(move |kind| Unit::new(member, id, kind))
        });

    let mut stack: Vec<NodeIndex> = finals
        .chain(pinned)
        .filter_map(|unit| index.get(&unit).copied())
        .collect();

    let mut live = FixedBitSet::with_capacity(graph.node_count());

    while let Some(next) = stack.pop() {
        if live.put(next.index()) {
            continue;
        }

        stack.extend(
            graph
                .neighbors(next)
                .filter(|n| !live.contains(n.index())),
        );
    }

    let units: Vec<Unit> = graph.node_weights().copied().collect();

    for (i, unit) in units.iter().enumerate() {
        if !live.contains(i) {
            tracing::debug!(
                member = %member.name,
                decl = %unit.decl,
                accessor = %unit.kind,
                "discarded unreachable declaration"
            );
        }
    }

    Retained {
        event: member.kind == MemberKind::Event,
        units,
        live,
    }
}
