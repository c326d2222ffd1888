// Link marker resolution
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

//! Resolution of link markers to declarations.
//!
//! Every link marker within a member's declarations is resolved to a
//!   [`Target`]:
//!     a declaration of the same member together with the accessor kind
//!     reached through it.
//! The accessor kind is determined by how the marker is used:
//!
//! | Use                 | Accessor                 |
//! |---------------------|--------------------------|
//! | `link(M, k)(args)`  | [`AccessorKind::Invoke`] |
//! | `x = link(P, k)`    | [`AccessorKind::Get`]    |
//! | `link(P, k) = v`    | [`AccessorKind::Set`]    |
//! | `link(E, k) += h`   | [`AccessorKind::Add`]    |
//! | `link(E, k) -= h`   | [`AccessorKind::Remove`] |
//!
//! Given the position `p` of the declaration containing the marker,
//!   the chain `c` of that accessor kind resolves each [`LinkKind`] as
//!   follows:
//!
//!   - [`LinkKind::Original`] is the first element of `c`;
//!   - [`LinkKind::Base`] is the last element of `c` positioned before
//!       `p`,
//!         and is an error if there is none;
//!   - [`LinkKind::Current`] is the last element of `c` positioned at or
//!       before `p`;
//!         and
//!   - [`LinkKind::Final`] is the last element of `c`,
//!       independent of `p`.
//!
//! [`LinkKind::Current`] is therefore the marker's own declaration when
//!   that declaration provides the accessor,
//!     and otherwise whatever declaration is visible at its layer.

use super::{
    chain::{ChainDecl, DeclId, DeclOrigin, MemberChains},
    error::LinkError,
    layer::LayerPos,
};
use crate::{
    span::Span,
    syntax::ast::{
        AccessorKind, AssignOp, Block, Expr, ExprKind, InlineHint, LinkKind,
        LinkTable, NodeId, ParamMode,
    },
};
use fxhash::FxHashMap;

/// Declaration and accessor reached by a link marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub decl: DeclId,
    pub kind: AccessorKind,
    pub link: LinkKind,
    pub hint: InlineHint,
}

/// Resolved link markers of a single member,
///   keyed by the [`NodeId`] of each link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution(FxHashMap<NodeId, Target>);

impl Resolution {
    pub fn get(&self, id: NodeId) -> Option<&Target> {
        self.0.get(&id)
    }

    /// Record the target of a link,
    ///   such as one cloned during inlining.
    pub fn insert(&mut self, id: NodeId, target: Target) {
        self.0.insert(id, target);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How an expression is used by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Call,
    Read,
    Assign(AssignOp),
    Other,
}

impl Usage {
    fn accessor(self) -> Option<AccessorKind> {
        match self {
            Self::Call => Some(AccessorKind::Invoke),
            Self::Read => Some(AccessorKind::Get),
            Self::Assign(AssignOp::Assign) => Some(AccessorKind::Set),
            Self::Assign(AssignOp::Add) => Some(AccessorKind::Add),
            Self::Assign(AssignOp::Sub) => Some(AccessorKind::Remove),
            Self::Other => None,
        }
    }
}

/// Links within `expr` and how each is used.
fn link_uses<'a>(expr: &'a Expr, usage: Usage, out: &mut Vec<(&'a Expr, Usage)>) {
    match &expr.kind {
        ExprKind::Link(_) => out.push((expr, usage)),

        ExprKind::Call(callee, args) => {
            link_uses(callee, Usage::Call, out);

            for arg in args {
                let usage = match arg.mode {
                    ParamMode::Value => Usage::Read,
                    ParamMode::Ref | ParamMode::Out => Usage::Other,
                };
                link_uses(&arg.expr, usage, out);
            }
        }

        ExprKind::Assign(op, lhs, rhs) => {
            link_uses(lhs, Usage::Assign(*op), out);
            link_uses(rhs, Usage::Read, out);
        }

        ExprKind::Member(x, _) | ExprKind::Unary(_, x) | ExprKind::Cast(_, x) => {
            link_uses(x, Usage::Read, out)
        }

        ExprKind::Binary(_, l, r) => {
            link_uses(l, Usage::Read, out);
            link_uses(r, Usage::Read, out);
        }

        ExprKind::Int(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Name(_)
        | ExprKind::This
        | ExprKind::Base => (),
    }
}

/// Links within `block` and how each is used,
///   in source order.
pub(super) fn block_links(block: &Block) -> Vec<(&Expr, Option<AccessorKind>)> {
    let mut out = Vec::new();

    for stmt in &block.stmts {
        stmt.walk(&mut |s| {
            s.own_exprs()
                .into_iter()
                .for_each(|e| link_uses(e, Usage::Read, &mut out))
        });
    }

    out.into_iter().map(|(e, usage)| (e, usage.accessor())).collect()
}

/// Find the declaration reached by a link of kind `link` to accessor
///   `kind`,
///     from a declaration at position `pos`.
pub fn lookup(
    member: &MemberChains,
    pos: LayerPos,
    link: LinkKind,
    kind: AccessorKind,
) -> Option<DeclId> {
    let chain = member.chain(kind)?;
    let pos_of = |id: &&DeclId| member.decl(**id).pos;

    match link {
        LinkKind::Original => Some(chain.first()),
        LinkKind::Base => chain.elems.iter().rev().find(|id| pos_of(id) < pos).copied(),
        LinkKind::Current => {
            chain.elems.iter().rev().find(|id| pos_of(id) <= pos).copied()
        }
        LinkKind::Final => Some(chain.last()),
    }
}

/// Resolve every link marker of `member`.
///
/// All errors are reported;
///   any error is fatal to linking of the member.
pub fn resolve(
    member: &MemberChains,
    links: &LinkTable,
) -> Result<Resolution, Vec<LinkError>> {
    let mut resolution = Resolution::default();
    let mut errs = Vec::new();

    for (decl_id, decl) in member.decl_ids().zip(&member.decls) {
        if decl.origin.is_inherited() {
            continue;
        }

        for kind in decl.kinds() {
            let Some(body) = decl.body(kind) else {
                continue;
            };

            for (expr, usage) in block_links(body) {
                match resolve_one(member, decl, expr, usage, links) {
                    Ok(target) => resolution.insert(expr.id, target),
                    Err(e) => errs.push(e),
                }
            }
        }

        tracing::trace!(
            member = %member.name,
            decl = %decl_id,
            pos = %decl.pos,
            "resolved declaration links"
        );
    }

    if errs.is_empty() {
        Ok(resolution)
    } else {
        Err(errs)
    }
}

fn resolve_one(
    member: &MemberChains,
    decl: &ChainDecl,
    expr: &Expr,
    usage: Option<AccessorKind>,
    links: &LinkTable,
) -> Result<Target, LinkError> {
    let span: Span = expr.span;

    let ExprKind::Link(selector) = &expr.kind else {
        return Err(LinkError::UnsupportedLinkUsage(member.name.clone(), span));
    };

    if decl.origin == DeclOrigin::Source {
        return Err(LinkError::LinkOutsideOverride(span));
    }

    if selector.name != member.name {
        return Err(LinkError::ForeignLinkTarget {
            selector: selector.name.clone(),
            member: member.name.clone(),
            span,
        });
    }

    let marker = links
        .get(expr.id)
        .ok_or_else(|| LinkError::UnsupportedLinkUsage(member.name.clone(), span))?;

    let kind = usage
        .filter(|kind| member.kind.accepts(*kind))
        .ok_or_else(|| LinkError::UnsupportedLinkUsage(member.name.clone(), span))?;

    if member.chain(kind).is_none() {
        return Err(LinkError::MissingAccessorChain {
            member: member.name.clone(),
            kind,
            span,
        });
    }

    let target = lookup(member, decl.pos, marker.kind, kind)
        .ok_or_else(|| LinkError::NoBase(member.name.clone(), span))?;

    Ok(Target {
        decl: target,
        kind,
        link: marker.kind,
        hint: marker.hint,
    })
}
