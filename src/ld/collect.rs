// Override chain collection
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

//! Gathering of transformations into override chains.
//!
//! The collector walks every class of a unit,
//!   sorting its members into declarations that aspects leave alone and
//!   those that take part in an override chain.
//! Each of the latter becomes a [`Transformation`] pushed onto the
//!   [`Collector`] under the member it applies to;
//!     [`Collector::finish`] then orders them by [`LayerPos`],
//!     validates them against the member's first declaration,
//!     and produces one [`MemberChains`] per member.
//!
//! Errors are confined to the member they concern.
//! A member that cannot be chained is left exactly as declared.

use super::{
    chain::{
        Chain, ChainDecl, DeclFlags, DeclId, DeclOrigin, MemberChains,
        MemberId, MemberKind,
    },
    error::LinkError,
    layer::{Layer, LayerLookupError, LayerOrder, LayerPos},
};
use crate::{
    span::Span,
    syntax::ast::{
        AccessorKind, Attribute, ClassDecl, CompilationUnit, Expr, ExprKind,
        Member, MemberHeader,
    },
};
use fxhash::{FxHashMap, FxHashSet};

pub const OVERRIDE_ATTR: &str = "Override";
pub const INTRODUCE_ATTR: &str = "Introduce";
pub const NOT_INLINEABLE_ATTR: &str = "NotInlineable";
pub const NOT_DISCARDABLE_ATTR: &str = "NotDiscardable";

/// Whether the attribute of the given name directs the linker rather
///   than the compiled program.
pub fn is_weaving_attr(name: &str) -> bool {
    matches!(
        name,
        OVERRIDE_ATTR | INTRODUCE_ATTR | NOT_INLINEABLE_ATTR | NOT_DISCARDABLE_ATTR
    )
}

/// What an aspect declaration does to its member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Override,
    Introduce,
}

/// A declaration contributed by an aspect layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub role: Role,
    pub layer: Layer,

    /// Location of the layer name,
    ///   for diagnostics.
    pub layer_span: Span,
    pub member: Member,

    /// Index of the declaration within its class,
    ///   if it was declared in source.
    pub index: Option<usize>,
}

/// Identifies a member of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub class: usize,
    pub class_name: String,
    pub name: String,
}

/// Names visible as members within a class,
///   including those inherited from base classes in the unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassScope {
    pub name: String,
    statics: FxHashMap<String, bool>,
}

impl ClassScope {
    fn of(unit: &CompilationUnit, class: &ClassDecl) -> Self {
        let mut statics = FxHashMap::default();

        for decl in class_chain(unit, class) {
            for member in &decl.members {
                statics
                    .entry(member.name().to_string())
                    .or_insert(member.header().modifiers.is_static());
            }
        }

        Self {
            name: class.name.name.clone(),
            statics,
        }
    }

    /// Whether `name` is a member of the class,
    ///   and if so,
    ///   whether it is static.
    pub fn member_is_static(&self, name: &str) -> Option<bool> {
        self.statics.get(name).copied()
    }
}

/// What becomes of each member of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanItem {
    /// Emit the member at this index as declared.
    Keep(usize),

    /// Emit the linked member here.
    Linked(MemberId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPlan {
    pub scope: ClassScope,
    pub items: Vec<PlanItem>,
}

/// Result of collecting a unit.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub members: Vec<MemberChains>,

    /// One plan per class of the unit,
    ///   in unit order.
    pub classes: Vec<ClassPlan>,
    pub errors: Vec<LinkError>,
}

impl Collected {
    pub fn member(&self, id: MemberId) -> &MemberChains {
        &self.members[id.index()]
    }

    pub fn scope(&self, member: &MemberChains) -> &ClassScope {
        &self.classes[member.class].scope
    }
}

/// Declarations gathered for a single member.
#[derive(Debug, Default)]
struct Pending {
    sources: Vec<(usize, Member)>,
    inherited: Option<(String, Member)>,
    layered: Vec<Transformation>,
}

/// Builder of [`MemberChains`].
#[derive(Debug)]
pub struct Collector<'a> {
    order: &'a LayerOrder,
    keys: Vec<MemberKey>,
    pending: FxHashMap<MemberKey, Pending>,
    errors: Vec<LinkError>,
}

impl<'a> Collector<'a> {
    pub fn new(order: &'a LayerOrder) -> Self {
        Self {
            order,
            keys: Vec::new(),
            pending: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    fn entry(&mut self, key: MemberKey) -> &mut Pending {
        if !self.pending.contains_key(&key) {
            self.keys.push(key.clone());
        }

        self.pending.entry(key).or_default()
    }

    /// Record a transformation of the member identified by `key`.
    pub fn push(&mut self, key: MemberKey, t: Transformation) {
        self.entry(key).layered.push(t);
    }

    /// Record a source declaration of the member identified by `key`.
    pub fn push_source(&mut self, key: MemberKey, index: usize, member: Member) {
        self.entry(key).sources.push((index, member));
    }

    /// Record that the member identified by `key` is inherited from the
    ///   base class `class`,
    ///     which declares it as `member`.
    pub fn push_inherited(&mut self, key: MemberKey, class: String, member: Member) {
        self.entry(key).inherited = Some((class, member));
    }

    /// Build chains for every member with at least one transformation.
    ///
    /// Members are returned in the order in which they were first pushed,
    ///   each assigned a [`MemberId`] by that order.
    /// Members that fail validation contribute errors instead of chains.
    pub fn finish(mut self) -> (Vec<MemberChains>, Vec<LinkError>) {
        let mut members = Vec::new();

        for key in std::mem::take(&mut self.keys) {
            let Some(pending) = self.pending.remove(&key) else {
                continue;
            };

            if pending.layered.is_empty() {
                continue;
            }

            let id = MemberId::new(members.len());

            match self.build(id, key, pending) {
                Ok(chains) => members.push(chains),
                Err(mut errs) => self.errors.append(&mut errs),
            }
        }

        (members, self.errors)
    }

    fn build(
        &self,
        id: MemberId,
        key: MemberKey,
        pending: Pending,
    ) -> Result<MemberChains, Vec<LinkError>> {
        let Pending {
            mut sources,
            inherited,
            layered,
        } = pending;

        let member_name = key.name.clone();
        let first_span = layered[0].member.span();

        let mut errs = Vec::new();
        let mut positioned = Vec::with_capacity(layered.len());

        for t in layered {
            match self.order.position(&t.layer) {
                Ok(pos) => positioned.push((pos, t)),
                Err(LayerLookupError::Unknown) => errs
                    .push(LinkError::UnknownLayer(t.layer.to_string(), t.layer_span)),
                Err(LayerLookupError::Ambiguous) => errs.push(
                    LinkError::AmbiguousLayer(t.layer.to_string(), t.layer_span),
                ),
            }
        }

        // Chains are ordered by position regardless of declaration order.
        positioned.sort_by_key(|(pos, _)| *pos);

        for pair in positioned.windows(2) {
            let ((pa, a), (pb, b)) = (&pair[0], &pair[1]);

            if pa == pb {
                errs.push(LinkError::DuplicateLayer {
                    member: member_name.clone(),
                    layer: b.layer.to_string(),
                    first: a.member.span(),
                    second: b.member.span(),
                });
            }
        }

        if sources.len() > 1 {
            errs.push(LinkError::AmbiguousTarget {
                member: member_name.clone(),
                span: first_span,
                decls: sources.iter().map(|(_, m)| m.span()).collect(),
            });
        }

        if !errs.is_empty() {
            return Err(errs);
        }

        let first_intro = positioned
            .iter()
            .position(|(_, t)| t.role == Role::Introduce);

        let mut decls = Vec::with_capacity(positioned.len() + 1);

        match (sources.pop(), inherited, first_intro) {
            (Some((_, existing)), _, Some(i)) => {
                return Err(vec![LinkError::IntroducedMemberExists {
                    member: member_name,
                    span: positioned[i].1.member.span(),
                    existing: existing.span(),
                }])
            }
            (None, Some((_, existing)), Some(i)) => {
                return Err(vec![LinkError::IntroducedMemberExists {
                    member: member_name,
                    span: positioned[i].1.member.span(),
                    existing: existing.span(),
                }])
            }

            (Some((index, member)), _, None) => decls.push(ChainDecl {
                pos: LayerPos::SOURCE,
                origin: DeclOrigin::Source,
                flags: flags_of(member.header()),
                member,
                index: Some(index),
            }),

            (None, Some((class, member)), None) => decls.push(ChainDecl {
                pos: LayerPos::SOURCE,
                origin: DeclOrigin::Inherited { class },
                flags: DeclFlags::default(),
                member,
                index: None,
            }),

            (None, None, Some(i)) => {
                let (pos, t) = positioned.remove(i);

                decls.push(ChainDecl {
                    pos,
                    origin: DeclOrigin::Introduced(t.layer),
                    flags: flags_of(t.member.header()),
                    member: t.member,
                    index: t.index,
                })
            }

            (None, None, None) => {
                return Err(positioned
                    .into_iter()
                    .map(|(_, t)| {
                        LinkError::OverrideWithoutTarget(
                            member_name.clone(),
                            t.member.span(),
                        )
                    })
                    .collect())
            }
        }

        let Some(kind) = MemberKind::of(&decls[0].member) else {
            return Err(vec![LinkError::ShapeMismatch {
                member: member_name,
                span: first_span,
                target: decls[0].span(),
            }]);
        };

        for (pos, t) in positioned {
            let origin = match t.role {
                Role::Override => DeclOrigin::Override(t.layer),
                Role::Introduce => DeclOrigin::Introduced(t.layer),
            };

            let decl = ChainDecl {
                pos,
                origin,
                flags: flags_of(t.member.header()),
                member: t.member,
                index: t.index,
            };

            if let Err(e) = check_shape(&member_name, kind, &decls[0], &decl) {
                errs.push(e);
            }

            decls.push(decl);
        }

        if !errs.is_empty() {
            return Err(errs);
        }

        let chains = decls[0]
            .kinds()
            .into_iter()
            .map(|kind| Chain {
                kind,
                elems: decls
                    .iter()
                    .enumerate()
                    .filter(|(_, decl)| decl.kinds().contains(&kind))
                    .map(|(i, _)| DeclId::new(i))
                    .collect(),
            })
            .collect();

        let placement = decls
            .iter()
            .filter_map(|decl| decl.index)
            .min()
            .unwrap_or_default();

        Ok(MemberChains {
            id,
            class: key.class,
            class_name: key.class_name,
            name: member_name,
            kind,
            decls,
            chains,
            placement,
        })
    }
}

/// Validate that `decl` may follow `first` in a chain.
fn check_shape(
    member: &str,
    kind: MemberKind,
    first: &ChainDecl,
    decl: &ChainDecl,
) -> Result<(), LinkError> {
    let mismatch = || LinkError::ShapeMismatch {
        member: member.into(),
        span: decl.span(),
        target: first.span(),
    };

    if decl.pos <= first.pos {
        return Err(LinkError::OverrideBeforeIntroduction {
            member: member.into(),
            span: decl.span(),
            intro: first.span(),
        });
    }

    if MemberKind::of(&decl.member) != Some(kind) {
        return Err(mismatch());
    }

    match (&first.member, &decl.member) {
        (Member::Method(a), Member::Method(b)) => {
            let same = a.params.len() == b.params.len()
                && a.params.iter().zip(&b.params).all(|(x, y)| x.mode == y.mode);

            if !same {
                return Err(mismatch());
            }
        }

        (_, Member::Event(_)) => {
            let kinds = decl.kinds();

            if !(kinds.contains(&AccessorKind::Add)
                && kinds.contains(&AccessorKind::Remove))
            {
                return Err(LinkError::IncompleteEventOverride(
                    member.into(),
                    decl.span(),
                ));
            }
        }

        _ => (),
    }

    let available = first.kinds();

    match decl.kinds().into_iter().find(|k| !available.contains(k)) {
        Some(kind) => Err(LinkError::MissingAccessor {
            member: member.into(),
            kind,
            span: decl.span(),
        }),
        None => Ok(()),
    }
}

fn flags_of(header: &MemberHeader) -> DeclFlags {
    DeclFlags {
        not_inlineable: header.attr(NOT_INLINEABLE_ATTR).is_some(),
        not_discardable: header.attr(NOT_DISCARDABLE_ATTR).is_some(),
    }
}

/// The class followed by each of its bases within the unit.
///
/// A cyclic hierarchy is followed only until a class repeats.
fn class_chain<'u>(
    unit: &'u CompilationUnit,
    class: &'u ClassDecl,
) -> impl Iterator<Item = &'u ClassDecl> {
    let mut seen = FxHashSet::default();

    std::iter::successors(Some(class), move |c| {
        c.base.as_ref().and_then(|base| unit.class(&base.name))
    })
    .take_while(move |c| seen.insert(c.name.name.as_str()))
}

/// Role of a member declaration,
///   the name of the member it applies to,
///   and its layer.
fn role_of(member: &Member) -> Result<Option<(Role, String, Layer, Span)>, LinkError> {
    let header = member.header();
    let over = header.attr(OVERRIDE_ATTR);
    let intro = header.attr(INTRODUCE_ATTR);

    let layer_at = |attr: &Attribute, n: usize| {
        let arg = attr
            .args
            .get(n)
            .ok_or(LinkError::InvalidWeavingAttribute(attr.span))?;

        match &arg.kind {
            ExprKind::Str(s) => Layer::parse(s)
                .map(|layer| (layer, arg.span))
                .ok_or(LinkError::InvalidLayerName(arg.span)),
            _ => Err(LinkError::InvalidWeavingAttribute(arg.span)),
        }
    };

    match (over, intro) {
        (Some(attr), Some(_)) => Err(LinkError::InvalidWeavingAttribute(attr.span)),
        (Some(attr), None) => {
            let target = attr
                .name_arg(0)
                .filter(|_| attr.args.len() == 2)
                .ok_or(LinkError::InvalidWeavingAttribute(attr.span))?;
            let (layer, span) = layer_at(attr, 1)?;

            Ok(Some((Role::Override, target.into(), layer, span)))
        }
        (None, Some(attr)) if attr.args.len() == 1 => {
            let (layer, span) = layer_at(attr, 0)?;
            Ok(Some((Role::Introduce, member.name().into(), layer, span)))
        }
        (None, Some(attr)) => Err(LinkError::InvalidWeavingAttribute(attr.span)),
        (None, None) => Ok(None),
    }
}

/// Role of each member of a class,
///   as determined by [`role_of`].
type Roles = Vec<Option<(Role, String, Layer, Span)>>;

/// Collect the override chains of every class in `unit`.
pub fn collect(unit: &CompilationUnit, order: &LayerOrder) -> Collected {
    let mut collector = Collector::new(order);
    let mut errors = Vec::new();
    let mut class_roles: Vec<Roles> = Vec::with_capacity(unit.classes.len());

    for (ci, class) in unit.classes.iter().enumerate() {
        let mut roles = Roles::with_capacity(class.members.len());

        for member in &class.members {
            match role_of(member) {
                Ok(Some(_)) if matches!(member, Member::Field(_)) => {
                    errors.push(LinkError::InvalidWeavingAttribute(member.span()));
                    roles.push(None);
                }
                Ok(role) => roles.push(role),
                Err(e) => {
                    errors.push(e);
                    roles.push(None);
                }
            }
        }

        let key = |name: &str| MemberKey {
            class: ci,
            class_name: class.name.name.clone(),
            name: name.into(),
        };

        let targets: Vec<&str> = {
            let mut seen = FxHashSet::default();
            roles
                .iter()
                .flatten()
                .map(|(_, target, _, _)| target.as_str())
                .filter(|target| seen.insert(*target))
                .collect()
        };

        for (i, (member, role)) in class.members.iter().zip(&roles).enumerate() {
            match role {
                Some((role, target, layer, layer_span)) => collector.push(
                    key(target),
                    Transformation {
                        role: *role,
                        layer: layer.clone(),
                        layer_span: *layer_span,
                        member: member.clone(),
                        index: Some(i),
                    },
                ),
                None if targets.contains(&member.name()) => {
                    collector.push_source(key(member.name()), i, member.clone())
                }
                None => (),
            }
        }

        for target in targets {
            let declared = class
                .members
                .iter()
                .zip(&roles)
                .any(|(m, role)| role.is_none() && m.name() == target);

            if declared {
                continue;
            }

            let inherited = class_chain(unit, class).skip(1).find_map(|base| {
                base.members
                    .iter()
                    .find(|m| {
                        m.name() == target
                            && !matches!(role_of(m), Ok(Some((Role::Override, ..))))
                    })
                    .map(|m| (base.name.name.clone(), m.clone()))
            });

            if let Some((base, member)) = inherited {
                collector.push_inherited(key(target), base, member);
            }
        }

        class_roles.push(roles);
    }

    let (members, mut chain_errors) = collector.finish();
    errors.append(&mut chain_errors);

    let classes = unit
        .classes
        .iter()
        .zip(&class_roles)
        .enumerate()
        .map(|(ci, (class, roles))| {
            let items = plan_class(ci, class, roles, &members, &mut errors);

            ClassPlan {
                scope: ClassScope::of(unit, class),
                items,
            }
        })
        .collect();

    Collected {
        members,
        classes,
        errors,
    }
}

/// Decide what becomes of each member of a class.
///
/// A linked member takes the place of its first declaration and
///   consumes all others.
/// Aspect declarations of a member that could not be chained are
///   dropped,
///     except for its first introduction if it has no other declaration;
///     everything else is kept as written.
fn plan_class(
    ci: usize,
    class: &ClassDecl,
    roles: &Roles,
    members: &[MemberChains],
    errors: &mut Vec<LinkError>,
) -> Vec<PlanItem> {
    let ours = || members.iter().filter(move |m| m.class == ci);

    let linked: FxHashMap<usize, MemberId> =
        ours().map(|m| (m.placement, m.id)).collect();

    let claimed: FxHashSet<usize> = ours()
        .flat_map(|m| m.decls.iter().filter_map(|d| d.index))
        .collect();

    let mut kept_intros = FxHashSet::default();
    let mut items = Vec::with_capacity(class.members.len());

    for (i, (member, role)) in class.members.iter().zip(roles).enumerate() {
        if let Some(id) = linked.get(&i) {
            items.push(PlanItem::Linked(*id));
            continue;
        } else if claimed.contains(&i) {
            continue;
        }

        match role {
            Some((Role::Introduce, name, ..)) => {
                let declared = class
                    .members
                    .iter()
                    .zip(roles)
                    .any(|(m, role)| role.is_none() && m.name() == name);

                if !declared && kept_intros.insert(name.as_str()) {
                    items.push(PlanItem::Keep(i));
                }
            }
            Some((Role::Override, ..)) => (),
            None => {
                if let Some(span) = first_link(member) {
                    errors.push(LinkError::LinkOutsideOverride(span));
                }
                items.push(PlanItem::Keep(i));
            }
        }
    }

    items
}

/// Span of the first link within `member`,
///   if any.
fn first_link(member: &Member) -> Option<Span> {
    let mut found = None;
    let mut visit = |e: &Expr| {
        if found.is_none() && matches!(e.kind, ExprKind::Link(_)) {
            found = Some(e.span);
        }
    };

    match member {
        Member::Field(field) => field.init.iter().for_each(|e| e.walk(&mut visit)),
        Member::Method(method) => method.body.walk_exprs(&mut visit),
        Member::Property(prop) => prop
            .accessors
            .iter()
            .for_each(|acc| acc.body.walk_exprs(&mut visit)),
        Member::Event(event) => event
            .accessors
            .iter()
            .for_each(|acc| acc.body.walk_exprs(&mut visit)),
    }

    found
}

#[cfg(test)]
mod test;
