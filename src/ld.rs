// Aspect linker
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

//! The linker is responsible for combining the declarations contributed
//!   by aspects into a single declaration per member.
//!
//! Its user-facing binary is [`weaveld`][weaveld].
//!
//! [weaveld]: ../../weaveld
//!
//! Linking a unit proceeds in the following stages,
//!   each its own module:
//!
//!   1. [`layer`] reads the order in which aspect layers apply;
//!   2. [`collect`] gathers the declarations of each member into
//!        override chains ([`chain`]);
//!   3. [`resolve`] binds each link marker to a declaration of its chain;
//!   4. [`inline`] substitutes the bodies of linked declarations where it
//!        is safe to do so;
//!   5. [`discard`] removes declarations that are no longer reachable;
//!        and
//!   6. [`emit`] renders what remains back into the unit.
//!
//! Stages 3 through 6 operate on one member at a time,
//!   so members are linked in parallel on a [`rayon`] pool.
//! The exception is the naming of intermediate declarations,
//!   which must be unique across a class and so happens serially between
//!   stages 5 and 6.
//! Nodes synthesized while linking are likewise renumbered serially as
//!   members are spliced back into the unit,
//!     keeping [`NodeId`]s unique throughout the output.
//! Errors ([`error::LinkError`]) are collected from every member and
//!   returned sorted by span;
//!     a member with errors is emitted as it was declared
//!     (see [`emit::fallback`]).
//!
//! Linking is deterministic:
//!   the same input produces the same output regardless of the number of
//!   threads.

pub mod chain;
pub mod collect;
pub mod discard;
pub mod emit;
pub mod error;
pub mod inline;
pub mod layer;
pub mod resolve;

use crate::syntax::ast::{
    ClassDecl, CompilationUnit, LinkTable, Member, NodeId, NodeIdGen,
    ParsedUnit,
};
use chain::MemberChains;
use collect::{ClassScope, Collected, PlanItem};
use discard::Retained;
use emit::IntermediateNames;
use error::LinkError;
use fxhash::FxHashSet;
use inline::{InlineOptions, WovenMember};
use layer::{LayerOrder, LAYER_ORDER_ATTR};
use parking_lot::Mutex;
use rayon::{prelude::*, ThreadPool};
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime configuration of the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Whether links may be inlined.
    pub inline: bool,

    /// Number of worker threads,
    ///   or `0` to let the pool decide.
    pub threads: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            inline: true,
            threads: 0,
        }
    }
}

/// Request to stop linking early.
///
/// Cancellation is observed only between members:
///   a member already being linked is completed,
///   and every member not yet started is emitted as it was declared.
#[derive(Debug, Default)]
pub struct Cancellation(AtomicBool);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Summary of a linking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Members successfully linked.
    pub linked: usize,

    /// Members emitted as declared because of errors.
    pub failed: usize,

    /// Members emitted as declared because linking was cancelled.
    pub cancelled: usize,

    /// Links replaced by the body of their target.
    pub inlined: usize,

    /// Links that remain calls.
    pub calls: usize,

    /// Declaration accessors removed as unreachable.
    pub discarded: usize,

    /// Intermediate declarations emitted.
    pub intermediates: usize,
}

impl std::ops::AddAssign for LinkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.linked += rhs.linked;
        self.failed += rhs.failed;
        self.cancelled += rhs.cancelled;
        self.inlined += rhs.inlined;
        self.calls += rhs.calls;
        self.discarded += rhs.discarded;
        self.intermediates += rhs.intermediates;
    }
}

/// Result of linking a unit.
#[derive(Debug, Clone)]
pub struct Linked {
    pub unit: CompilationUnit,

    /// Markers of any links that remain in the unit as written,
    ///   such as those of members that could not be linked.
    pub links: LinkTable,

    /// Every error encountered,
    ///   sorted by span.
    pub diagnostics: Vec<LinkError>,
    pub stats: LinkStats,
}

impl Linked {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Link a parsed unit.
pub fn link(parsed: &ParsedUnit, opts: &LinkOptions) -> Linked {
    link_with(parsed, opts, &Cancellation::new())
}

/// Link a parsed unit,
///   stopping early if `cancel` is signaled.
pub fn link_with(
    parsed: &ParsedUnit,
    opts: &LinkOptions,
    cancel: &Cancellation,
) -> Linked {
    let mut diagnostics = Vec::new();

    let order = LayerOrder::from_unit(&parsed.unit).unwrap_or_else(|e| {
        diagnostics.push(e);
        LayerOrder::default()
    });

    let Collected {
        members,
        classes,
        errors,
    } = collect::collect(&parsed.unit, &order);

    diagnostics.extend(errors);

    tracing::debug!(
        layers = order.len(),
        members = members.len(),
        "collected override chains"
    );

    let collector = Mutex::new(diagnostics);

    let job = MemberJob {
        links: &parsed.links,
        next_id: parsed.next_id,
        inline: InlineOptions {
            enabled: opts.inline,
        },
        cancel,
        diagnostics: &collector,
    };

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads)
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "unable to start worker threads; linking sequentially"
            );
            None
        }
    };

    let stages = on_pool(pool.as_ref(), &members, |member| {
        job.weave(member, &classes[member.class].scope)
    });

    // Intermediates of one member must not collide with those of another
    //   member of the same class.
    let mut taken = vec![FxHashSet::default(); classes.len()];

    let staged: Vec<(&MemberChains, Stage, IntermediateNames)> = members
        .iter()
        .zip(stages)
        .map(|(member, stage)| {
            let names = match &stage {
                Stage::Woven { retained, .. } => emit::intermediate_names(
                    member,
                    retained,
                    &classes[member.class].scope,
                    &mut taken[member.class],
                ),
                Stage::Done(_) => IntermediateNames::default(),
            };

            (member, stage, names)
        })
        .collect();

    let outcomes = on_pool(pool.as_ref(), &staged, |(member, stage, names)| {
        job.emit(member, stage, names)
    });

    let mut stats = LinkStats::default();
    outcomes.iter().for_each(|o| stats += o.stats);

    // Each linked member is spliced in exactly once,
    //   at the position of its placement in the plan.
    let mut emitted: Vec<Option<Vec<Member>>> =
        outcomes.into_iter().map(|o| Some(o.members)).collect();

    let mut ids = NodeIdGen::starting_at(parsed.next_id);

    let classes = parsed
        .unit
        .classes
        .iter()
        .zip(&classes)
        .map(|(class, plan)| ClassDecl {
            members: plan
                .items
                .iter()
                .flat_map(|item| match item {
                    PlanItem::Keep(i) => {
                        Vec::from_iter(class.members.get(*i).cloned())
                    }
                    PlanItem::Linked(id) => {
                        let mut members = emitted
                            .get_mut(id.index())
                            .and_then(Option::take)
                            .unwrap_or_default();

                        renumber(&mut members, parsed.next_id, &mut ids);
                        members
                    }
                })
                .collect(),
            ..class.clone()
        })
        .collect();

    let unit = CompilationUnit {
        attrs: parsed
            .unit
            .attrs
            .iter()
            .filter(|attr| attr.name.name != LAYER_ORDER_ATTR)
            .cloned()
            .collect(),
        classes,
    };

    let mut diagnostics = collector.into_inner();
    diagnostics.sort_by_key(LinkError::span);

    tracing::info!(
        linked = stats.linked,
        failed = stats.failed,
        cancelled = stats.cancelled,
        inlined = stats.inlined,
        calls = stats.calls,
        discarded = stats.discarded,
        "linked unit"
    );

    Linked {
        unit,
        links: parsed.links.clone(),
        diagnostics,
        stats,
    }
}

/// Map `f` over `items`,
///   on `pool` if there is one and sequentially otherwise.
///
/// Results are in the order of `items` either way.
fn on_pool<T, R, F>(pool: Option<&ThreadPool>, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    match pool {
        Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        None => items.iter().map(f).collect(),
    }
}

/// Give fresh identities to every node of `members` numbered at or beyond
///   `first`,
///     which are those synthesized while linking.
///
/// Each member allocates from `first` independently,
///   so without this the nodes of different members would share
///   identities.
fn renumber(members: &mut [Member], first: NodeId, ids: &mut NodeIdGen) {
    for member in members {
        member.walk_exprs_mut(&mut |e| {
            if e.id >= first {
                e.id = ids.fresh();
            }
        });
    }
}

/// Linking of a single member.
#[derive(Clone)]
struct MemberOutcome {
    members: Vec<Member>,
    stats: LinkStats,
}

/// A member after weaving,
///   awaiting the naming of its intermediates.
enum Stage {
    Woven {
        woven: WovenMember,
        retained: Retained,
    },

    /// The member could not be woven and is already emitted.
    Done(MemberOutcome),
}

/// State shared by every member of a unit.
struct MemberJob<'a> {
    links: &'a LinkTable,
    next_id: NodeId,
    inline: InlineOptions,
    cancel: &'a Cancellation,
    diagnostics: &'a Mutex<Vec<LinkError>>,
}

impl<'a> MemberJob<'a> {
    fn span(member: &MemberChains) -> tracing::Span {
        tracing::debug_span!(
            "link_member",
            class = %member.class_name,
            member = %member.name,
        )
    }

    fn weave(&self, member: &MemberChains, scope: &ClassScope) -> Stage {
        let span = Self::span(member);
        let _enter = span.enter();

        if self.cancel.is_cancelled() {
            tracing::debug!("cancelled");

            return Stage::Done(MemberOutcome {
                members: emit::fallback(member),
                stats: LinkStats {
                    cancelled: 1,
                    ..Default::default()
                },
            });
        }

        let resolution = match resolve::resolve(member, self.links) {
            Ok(resolution) => resolution,
            Err(errs) => {
                tracing::debug!(errors = errs.len(), "unable to resolve links");
                self.diagnostics.lock().extend(errs);

                return Stage::Done(MemberOutcome {
                    members: emit::fallback(member),
                    stats: LinkStats {
                        failed: 1,
                        ..Default::default()
                    },
                });
            }
        };

        let woven =
            inline::weave(member, scope, resolution, self.next_id, self.inline);
        let retained = discard::discard(member, &woven);

        Stage::Woven { woven, retained }
    }

    fn emit(
        &self,
        member: &MemberChains,
        stage: &Stage,
        names: &IntermediateNames,
    ) -> MemberOutcome {
        let (woven, retained) = match stage {
            Stage::Woven { woven, retained } => (woven, retained),
            Stage::Done(outcome) => return outcome.clone(),
        };

        let span = Self::span(member);
        let _enter = span.enter();

        let members = emit::emit(member, woven, retained, names);

        let stats = LinkStats {
            linked: 1,
            inlined: woven.inlined,
            calls: woven.kept.len(),
            discarded: retained.discarded(),
            intermediates: members.len().saturating_sub(1),
            ..Default::default()
        };

        tracing::debug!(
            inlined = stats.inlined,
            calls = stats.calls,
            discarded = stats.discarded,
            "linked member"
        );

        MemberOutcome { members, stats }
    }
}

#[cfg(test)]
mod test;
