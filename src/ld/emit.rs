// Emission of linked members
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

//! Emission of linked members.
//!
//! A linked member is emitted as its public declaration followed by any
//!   retained intermediate declarations,
//!     in ascending position.
//!
//! The public declaration takes its header from the member's first
//!   non-inherited declaration,
//!     stripped of weaving attributes,
//!   and each of its accessor bodies from the final declaration of the
//!   respective chain.
//! An accessor whose chain consists only of an inherited declaration
//!   forwards to the base class.
//!
//! Every other retained declaration is emitted as a private intermediate
//!   named for its layer:
//!     `Name_Source` for the source declaration,
//!     and `Name_Aspect` or `Name_Aspect_Sub` for a layer `Aspect:Sub`.
//! A name that collides with a member of the class,
//!   or with an intermediate already named for another member of the
//!   class,
//!   is suffixed with `_2`,
//!   `_3`,
//!   and so on.
//! Intermediates must therefore be named one class at a time
//!   (see [`intermediate_names`])
//!   before members are emitted.
//!
//! Links remaining in emitted bodies are rendered as member accesses:
//!
//! | Target                        | Rendered         |
//! |-------------------------------|------------------|
//! | inherited declaration         | `base.Name`      |
//! | final declaration of accessor | `this.Name`      |
//! | intermediate declaration      | `this.Name_A`    |
//!
//! Static members are accessed through their class rather than `this`.

use super::{
    chain::{
        ChainDecl, DeclId, DeclOrigin, MemberChains, MemberKind, VALUE_PARAM,
    },
    collect::{is_weaving_attr, ClassScope},
    discard::Retained,
    inline::WovenMember,
};
use crate::{
    span::Span,
    syntax::ast::{
        Accessor, AccessorKind, Arg, AssignOp, Attribute, Block, EventDecl,
        Expr, ExprKind, Ident, Member, MemberHeader, MethodDecl, NodeIdGen,
        PropertyDecl, Stmt,
    },
};
use arrayvec::ArrayVec;
use fxhash::{FxHashMap, FxHashSet};

/// Suffix of the intermediate name of a source declaration.
pub const SOURCE_SUFFIX: &str = "Source";

/// Names of the intermediate declarations of a member.
pub type IntermediateNames = FxHashMap<DeclId, String>;

/// Emit the declarations of a successfully linked member.
pub fn emit(
    member: &MemberChains,
    woven: &WovenMember,
    retained: &Retained,
    names: &IntermediateNames,
) -> Vec<Member> {
    let mut emitter = Emitter {
        member,
        woven,
        names,
        ids: woven.ids.clone(),
    };

    let mut out = vec![emitter.public()];

    for (id, decl) in member.decl_ids().zip(&member.decls) {
        if let Some(name) = names.get(&id) {
            let kinds: ArrayVec<AccessorKind, 2> = decl
                .kinds()
                .into_iter()
                .filter(|kind| retained.contains(id, *kind))
                .filter(|kind| !member.is_final(id, *kind))
                .collect();

            tracing::trace!(
                member = %member.name,
                decl = %id,
                name = %name,
                "emitting intermediate declaration"
            );

            out.push(emitter.intermediate(id, decl, name, &kinds));
        }
    }

    out
}

/// Declarations of a member that could not be linked.
///
/// Source declarations are kept as written;
///   a member with no source keeps its first introduction.
pub fn fallback(member: &MemberChains) -> Vec<Member> {
    let sources: Vec<Member> = member
        .decls
        .iter()
        .filter(|decl| decl.origin == DeclOrigin::Source)
        .map(|decl| decl.member.clone())
        .collect();

    if !sources.is_empty() {
        return sources;
    }

    member
        .decls
        .iter()
        .find(|decl| matches!(decl.origin, DeclOrigin::Introduced(_)))
        .map(|decl| vec![decl.member.clone()])
        .unwrap_or_default()
}

/// Base name of the intermediate declaration for `decl`.
fn base_name(member: &MemberChains, decl: &ChainDecl) -> String {
    match decl.origin.layer() {
        Some(layer) => format!("{}_{}", member.name, layer.suffix()),
        None => format!("{}_{SOURCE_SUFFIX}", member.name),
    }
}

/// Choose names for the retained intermediate declarations of `member`.
///
/// A declaration is an intermediate if it is emitted for some accessor
///   for which it is not final.
///
/// `taken` holds the intermediate names already chosen for other members
///   of the same class and is extended with those chosen here.
pub fn intermediate_names(
    member: &MemberChains,
    retained: &Retained,
    scope: &ClassScope,
    taken: &mut FxHashSet<String>,
) -> IntermediateNames {
    let mut names = FxHashMap::default();

    for (id, decl) in member.decl_ids().zip(&member.decls) {
        if decl.origin.is_inherited() {
            continue;
        }

        let intermediate = decl
            .kinds()
            .into_iter()
            .any(|kind| retained.contains(id, kind) && !member.is_final(id, kind));

        if !intermediate {
            continue;
        }

        let base = base_name(member, decl);
        let free = |name: &String| {
            scope.member_is_static(name).is_none() && !taken.contains(name)
        };

        let name = Some(base.clone())
            .into_iter()
            .chain((2..).map(|n| format!("{base}_{n}")))
            .find(free)
            .unwrap_or(base);

        taken.insert(name.clone());
        names.insert(id, name);
    }

    names
}

struct Emitter<'a> {
    member: &'a MemberChains,
    woven: &'a WovenMember,
    names: &'a IntermediateNames,
    ids: NodeIdGen,
}

impl<'a> Emitter<'a> {
    fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr::new(self.ids.fresh(), kind, span)
    }

    fn receiver(&mut self, span: Span) -> Expr {
        let kind = if self.member.is_static() {
            ExprKind::Name(self.member.class_name.clone())
        } else {
            ExprKind::This
        };

        self.expr(kind, span)
    }

    /// Attributes of `header` other than weaving attributes.
    fn attrs(header: &MemberHeader) -> Vec<Attribute> {
        header
            .attrs
            .iter()
            .filter(|attr| !is_weaving_attr(&attr.name.name))
            .cloned()
            .collect()
    }

    fn public(&mut self) -> Member {
        let member = self.member;
        let mut header = member.public_header().clone();

        header.attrs = Self::attrs(&header);
        header.name = Ident::new(member.name.clone(), header.name.span);

        match member.kind {
            MemberKind::Method => {
                let last = member
                    .chain(AccessorKind::Invoke)
                    .map(|chain| chain.last())
                    .unwrap_or(DeclId::new(0));
                let params = member.decl(last).params(AccessorKind::Invoke);
                let body = self.chain_body(AccessorKind::Invoke, header.span);

                Member::Method(MethodDecl {
                    header,
                    params,
                    body,
                })
            }
            MemberKind::Property | MemberKind::Event => {
                let accessors = member
                    .chains
                    .iter()
                    .map(|chain| chain.kind)
                    .map(|kind| Accessor {
                        kind,
                        body: self.chain_body(kind, header.span),
                        span: self.accessor_span(kind, header.span),
                    })
                    .collect();

                match member.kind {
                    MemberKind::Event => {
                        Member::Event(EventDecl { header, accessors })
                    }
                    _ => Member::Property(PropertyDecl { header, accessors }),
                }
            }
        }
    }

    fn accessor_span(&self, kind: AccessorKind, default: Span) -> Span {
        let decl = match self.member.chain(kind) {
            Some(chain) => self.member.decl(chain.last()),
            None => return default,
        };

        match &decl.member {
            Member::Property(PropertyDecl { accessors, .. })
            | Member::Event(EventDecl { accessors, .. }) => accessors
                .iter()
                .find(|acc| acc.kind == kind)
                .map_or(default, |acc| acc.span),
            _ => default,
        }
    }

    /// Body of the public accessor `kind`.
    fn chain_body(&mut self, kind: AccessorKind, span: Span) -> Block {
        let Some(last) = self.member.chain(kind).map(|chain| chain.last()) else {
            return Block::default();
        };

        if self.member.decl(last).origin.is_inherited() {
            return self.forward(last, kind, span);
        }

        self.woven_body(last, kind)
    }

    /// Woven body of an accessor with its links rendered.
    fn woven_body(&mut self, decl: DeclId, kind: AccessorKind) -> Block {
        let mut body = self
            .woven
            .decl(decl)
            .body(kind)
            .cloned()
            .unwrap_or_default();

        body.walk_exprs_mut(&mut |e| self.render_link(e));
        body
    }

    fn render_link(&mut self, e: &mut Expr) {
        let ExprKind::Link(_) = e.kind else {
            return;
        };

        let member = self.member;
        let span = e.span;

        let (recv, name) = match self.woven.resolution.get(e.id) {
            Some(t) if member.decl(t.decl).origin.is_inherited() => {
                (self.expr(ExprKind::Base, span), member.name.clone())
            }
            Some(t) if !member.is_final(t.decl, t.kind) => {
                let name = self
                    .names
                    .get(&t.decl)
                    .cloned()
                    .unwrap_or_else(|| member.name.clone());

                (self.receiver(span), name)
            }
            _ => (self.receiver(span), member.name.clone()),
        };

        e.kind = ExprKind::Member(Box::new(recv), Ident::new(name, span));
    }

    /// Body of an accessor that forwards to the base class.
    fn forward(&mut self, decl: DeclId, kind: AccessorKind, span: Span) -> Block {
        let member = self.member;

        let base = self.expr(ExprKind::Base, span);
        let target = self.expr(
            ExprKind::Member(Box::new(base), Ident::new(member.name.clone(), span)),
            span,
        );

        let stmt = match kind {
            AccessorKind::Get => Stmt::Return(Some(target), span),
            AccessorKind::Set | AccessorKind::Add | AccessorKind::Remove => {
                let op = match kind {
                    AccessorKind::Add => AssignOp::Add,
                    AccessorKind::Remove => AssignOp::Sub,
                    _ => AssignOp::Assign,
                };
                let value = self.expr(ExprKind::Name(VALUE_PARAM.into()), span);

                Stmt::Expr(self.expr(
                    ExprKind::Assign(op, Box::new(target), Box::new(value)),
                    span,
                ))
            }
            AccessorKind::Invoke => {
                let decl = member.decl(decl);
                let params = decl.params(kind);

                let args = params
                    .into_iter()
                    .map(|p| Arg {
                        mode: p.mode,
                        expr: self.expr(ExprKind::Name(p.name.name), span),
                    })
                    .collect();

                let call = self.expr(ExprKind::Call(Box::new(target), args), span);

                if decl.result_type().is_void() {
                    Stmt::Expr(call)
                } else {
                    Stmt::Return(Some(call), span)
                }
            }
        };

        Block::new(vec![stmt])
    }

    fn intermediate(
        &mut self,
        id: DeclId,
        decl: &ChainDecl,
        name: &str,
        kinds: &[AccessorKind],
    ) -> Member {
        let written = decl.header();

        let header = MemberHeader {
            attrs: Self::attrs(written),
            modifiers: self.member.intermediate_modifiers(),
            ty: written.ty.clone(),
            name: Ident::new(name, written.name.span),
            span: written.span,
        };

        match &decl.member {
            Member::Method(method) => Member::Method(MethodDecl {
                header,
                params: method.params.clone(),
                body: self.woven_body(id, AccessorKind::Invoke),
            }),
            Member::Property(PropertyDecl { accessors, .. })
            | Member::Event(EventDecl { accessors, .. }) => {
                let accessors = accessors
                    .iter()
                    .filter(|acc| kinds.contains(&acc.kind))
                    .map(|acc| Accessor {
                        kind: acc.kind,
                        body: self.woven_body(id, acc.kind),
                        span: acc.span,
                    })
                    .collect();

                match self.member.kind {
                    MemberKind::Event => {
                        Member::Event(EventDecl { header, accessors })
                    }
                    _ => Member::Property(PropertyDecl { header, accessors }),
                }
            }
            Member::Field(field) => Member::Field(field.clone()),
        }
    }
}
