// Inlining of linked declarations
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

//! Inlining of linked declarations.
//!
//! Declarations of a member are processed in ascending [`LayerPos`].
//! Within each,
//!   a statement that consists of a single use of a link to a declaration
//!   at a strictly lower position may be replaced by a copy of that
//!   declaration's body as already woven.
//! Since lower positions are processed first,
//!   the final declaration of a chain accumulates every layer beneath it
//!   that could be inlined.
//!
//! Call sites
//! ==========
//! Only statements of the following shapes are candidates,
//!   where `L` is a use of a link:
//!
//! | Shape   | Statement                         |
//! |---------|-----------------------------------|
//! | Discard | `L;`                              |
//! | Init    | `T x = L;`                        |
//! | Assign  | `x = L;`                          |
//! | Return  | `return L;` or `return (T)L;`     |
//!
//! Every other use of a link remains a call.
//!
//! Feasibility
//! ===========
//! A candidate is inlined only if every condition holds;
//!   otherwise the first that fails is reported as [`NotInlined`]:
//!
//!   - inlining is enabled and the link is not marked `noinline`;
//!   - the target is not inherited and is at a strictly lower position;
//!   - the target is not `[NotInlineable]`;
//!   - a result assigned to a name is assigned to a caller local or
//!       parameter;
//!   - each argument is the name of a caller local or parameter,
//!       passed in the mode of its parameter,
//!       and no argument passed by `ref` or `out` is also passed
//!       elsewhere;
//!   - no by-value parameter is written by the target;
//!   - the substitution requires no jump out of a `finally` block;
//!       and
//!   - every free name of the target that a caller name would shadow can
//!       be qualified.
//!
//! Substitution
//! ============
//! The target body is copied through the [`Renamer`],
//!   which keeps it hygienic.
//! Each `return` of the copy is then rewritten for the shape of the call
//!   site:
//!     the returned value is stored or discarded,
//!     and control jumps to a label `__aspect_return_N` placed after the
//!     copy unless the `return` was already the last statement.
//! A body consisting of only `return e;` collapses into the call site
//!   itself,
//!     e.g. `T x = e;`.
//! A void caller whose last statement invokes a void target keeps any
//!   `return;` as it is.

mod hygiene;

pub use hygiene::{declared_names, free_names, Renamer, Unqualifiable};

use super::{
    chain::{ChainDecl, DeclId, MemberChains, MemberId},
    collect::ClassScope,
    resolve::{Resolution, Target},
};
use crate::{
    span::{Span, UNKNOWN_SPAN},
    syntax::ast::{
        AccessorKind, Arg, AssignOp, Block, Catch, Expr, ExprKind, Ident,
        InlineHint, NodeId, NodeIdGen, ParamMode, Stmt, TypeName, DISCARD,
    },
};
use arrayvec::ArrayVec;
use fxhash::{FxHashMap, FxHashSet};
use std::fmt::{self, Display};

/// Prefix of labels marking the end of an inlined body.
pub const RETURN_LABEL_PREFIX: &str = "__aspect_return_";

/// Why a link was left as a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotInlined {
    Disabled,
    NoInlineHint,
    Inherited,
    NotEarlier,
    NotInlineable,
    UnsupportedShape,
    StoreNotLocal,
    ArgumentMismatch,
    ArgumentNotLocal,
    AliasedArgument,
    ParameterWritten,
    JumpInFinally,
    ShadowedFreeName,
}

impl Display for NotInlined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NotInlined::*;

        f.write_str(match self {
            Disabled => "inlining is disabled",
            NoInlineHint => "link is marked noinline",
            Inherited => "target is inherited",
            NotEarlier => "target is not at an earlier layer",
            NotInlineable => "target is marked NotInlineable",
            UnsupportedShape => "link is not a statement of its own",
            StoreNotLocal => "result is stored outside a local or parameter",
            ArgumentMismatch => "arguments do not match parameters",
            ArgumentNotLocal => "argument is not a local or parameter",
            AliasedArgument => "argument is passed by reference more than once",
            ParameterWritten => "target writes a by-value parameter",
            JumpInFinally => "substitution would jump out of finally",
            ShadowedFreeName => "target refers to a shadowed name",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineOptions {
    pub enabled: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Bodies of a declaration after inlining,
///   one per accessor it provides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WovenDecl {
    pub bodies: ArrayVec<(AccessorKind, Block), 2>,
}

impl WovenDecl {
    pub fn body(&self, kind: AccessorKind) -> Option<&Block> {
        self.bodies
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, body)| body)
    }
}

/// A member whose declarations have been woven.
#[derive(Debug, Clone)]
pub struct WovenMember {
    pub id: MemberId,

    /// Parallel to [`MemberChains::decls`].
    pub decls: Vec<WovenDecl>,

    /// Targets of every link remaining in [`Self::decls`].
    pub resolution: Resolution,

    /// Allocator for any further nodes of this member.
    pub ids: NodeIdGen,

    /// Number of links replaced by the body of their target.
    pub inlined: usize,

    /// Links of the declarations as written that remain calls.
    pub kept: Vec<(NodeId, NotInlined)>,
}

impl WovenMember {
    pub fn decl(&self, id: DeclId) -> &WovenDecl {
        &self.decls[id.index()]
    }
}

/// Inline links throughout the declarations of `member`.
///
/// New nodes are allocated starting at `next_id`,
///   which must exceed every [`NodeId`] of the unit.
pub fn weave(
    member: &MemberChains,
    scope: &ClassScope,
    mut resolution: Resolution,
    next_id: NodeId,
    opts: InlineOptions,
) -> WovenMember {
    let mut ids = NodeIdGen::starting_at(next_id);
    let mut decls: Vec<WovenDecl> = Vec::with_capacity(member.decls.len());
    let mut inlined = 0;
    let mut kept = Vec::new();

    for decl in &member.decls {
        if decl.origin.is_inherited() {
            decls.push(WovenDecl::default());
            continue;
        }

        let mut bodies = ArrayVec::new();

        for kind in decl.kinds() {
            let body = decl.body(kind).cloned().unwrap_or_default();
            let params = decl.params(kind);

            let mut used = declared_names(&body);
            used.extend(params.iter().map(|p| p.name.name.clone()));

            let mut weaver = Weaver {
                member,
                scope,
                decl,
                done: &decls,
                res: &mut resolution,
                ids: &mut ids,
                opts,
                caller_void: kind != AccessorKind::Get
                    && (kind != AccessorKind::Invoke || decl.result_type().is_void()),
                used,
                visible: vec![params.iter().map(|p| p.name.name.clone()).collect()],
                next_label: 1,
                inlined: 0,
                kept: vec![],
            };

            let woven = weaver.top(body);
            inlined += weaver.inlined;
            kept.append(&mut weaver.kept);

            bodies.push((kind, woven));
        }

        decls.push(WovenDecl { bodies });
    }

    WovenMember {
        id: member.id,
        decls,
        resolution,
        ids,
        inlined,
        kept,
    }
}

/// Position of a statement within its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Ctx {
    /// Within a `finally` block.
    in_finally: bool,

    /// The last top-level statement of the caller.
    tail: bool,
}

impl Ctx {
    fn nested(self) -> Self {
        Self {
            tail: false,
            ..self
        }
    }
}

/// What a call site does with the result of its link.
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Discard,
    Init { ty: Option<TypeName>, name: Ident },
    Assign { name: Ident },
    Return { cast: Option<TypeName>, span: Span },
}

/// A statement that may be replaced by the body of a link's target.
#[derive(Debug, Clone)]
struct Site {
    shape: Shape,
    link: NodeId,
    args: Vec<Arg>,
}

/// The link used by `e`,
///   and the arguments it passes.
///
/// Assignments through a link are recognized only if `assign`.
fn link_use(e: &Expr, assign: bool) -> Option<(NodeId, Vec<Arg>)> {
    match &e.kind {
        ExprKind::Link(_) => Some((e.id, vec![])),
        ExprKind::Call(callee, args) if matches!(callee.kind, ExprKind::Link(_)) => {
            Some((callee.id, args.clone()))
        }
        ExprKind::Assign(_, lhs, rhs) if assign && matches!(lhs.kind, ExprKind::Link(_)) => {
            Some((
                lhs.id,
                vec![Arg {
                    mode: ParamMode::Value,
                    expr: (**rhs).clone(),
                }],
            ))
        }
        _ => None,
    }
}

fn site_of(stmt: &Stmt) -> Option<Site> {
    let site = |shape, (link, args)| Site { shape, link, args };

    match stmt {
        Stmt::Expr(Expr {
            kind: ExprKind::Assign(AssignOp::Assign, lhs, rhs),
            ..
        }) if lhs.as_name().is_some() => {
            let name = Ident::new(lhs.as_name()?, lhs.span);
            link_use(rhs, false).map(|u| site(Shape::Assign { name }, u))
        }
        Stmt::Expr(e) => link_use(e, true).map(|u| site(Shape::Discard, u)),
        Stmt::Local {
            ty,
            name,
            init: Some(e),
        } => link_use(e, false).map(|u| {
            site(
                Shape::Init {
                    ty: ty.clone(),
                    name: name.clone(),
                },
                u,
            )
        }),
        Stmt::Return(Some(e), span) => match &e.kind {
            ExprKind::Cast(ty, inner) => link_use(inner, false).map(|u| {
                site(
                    Shape::Return {
                        cast: Some(ty.clone()),
                        span: *span,
                    },
                    u,
                )
            }),
            _ => link_use(e, false).map(|u| {
                site(
                    Shape::Return {
                        cast: None,
                        span: *span,
                    },
                    u,
                )
            }),
        },
        _ => None,
    }
}

/// Whether evaluating `e` can have no effect.
fn is_pure(e: &Expr) -> bool {
    matches!(
        e.kind,
        ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Name(_)
            | ExprKind::This
    )
}

struct Weaver<'a> {
    member: &'a MemberChains,
    scope: &'a ClassScope,
    decl: &'a ChainDecl,
    done: &'a [WovenDecl],
    res: &'a mut Resolution,
    ids: &'a mut NodeIdGen,
    opts: InlineOptions,
    caller_void: bool,

    /// Every name declared by the caller,
    ///   including those introduced by inlining.
    used: FxHashSet<String>,

    /// Caller locals and parameters visible at the current statement.
    visible: Vec<FxHashSet<String>>,
    next_label: usize,
    inlined: usize,
    kept: Vec<(NodeId, NotInlined)>,
}

impl<'a> Weaver<'a> {
    fn top(&mut self, body: Block) -> Block {
        self.block(
            body,
            Ctx {
                in_finally: false,
                tail: true,
            },
        )
    }

    fn is_visible(&self, name: &str) -> bool {
        self.visible.iter().any(|scope| scope.contains(name))
    }

    fn declare_visible(&mut self, name: &Ident) {
        if let Some(scope) = self.visible.last_mut() {
            scope.insert(name.name.clone());
        }
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.visible.push(FxHashSet::default());
        let ret = f(self);
        self.visible.pop();
        ret
    }

    fn block(&mut self, block: Block, ctx: Ctx) -> Block {
        self.scoped(|w| {
            let n = block.stmts.len();
            let mut out = Vec::with_capacity(n);

            for (i, stmt) in block.stmts.into_iter().enumerate() {
                let ctx = Ctx {
                    tail: ctx.tail && i + 1 == n,
                    ..ctx
                };

                out.extend(w.stmt(stmt, ctx));
            }

            Block::new(out)
        })
    }

    /// Weave a statement in a position that holds only one statement.
    fn embedded(&mut self, stmt: Stmt, ctx: Ctx) -> Box<Stmt> {
        let mut out = self.scoped(|w| w.stmt(stmt, ctx.nested()));

        Box::new(match out.len() {
            1 => out.remove(0),
            _ => Stmt::Block(Block::new(out)),
        })
    }

    fn stmt(&mut self, stmt: Stmt, ctx: Ctx) -> Vec<Stmt> {
        let site = site_of(&stmt);
        self.note_unsupported(&stmt, site.as_ref().map(|s| s.link));

        if let Some(site) = site {
            match self.inline(&site, ctx) {
                Ok(stmts) => {
                    if let Shape::Init { name, .. } = &site.shape {
                        self.declare_visible(name);
                    }
                    return stmts;
                }
                Err(reason) => self.keep(site.link, reason),
            }
        }

        vec![match stmt {
            Stmt::Block(block) => Stmt::Block(self.block(block, ctx.nested())),
            Stmt::Local { ty, name, init } => {
                self.declare_visible(&name);
                Stmt::Local { ty, name, init }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => Stmt::If {
                cond,
                then: self.embedded(*then, ctx),
                otherwise: otherwise.map(|s| self.embedded(*s, ctx)),
            },
            Stmt::While { cond, body } => Stmt::While {
                cond,
                body: self.embedded(*body, ctx),
            },
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.scoped(|w| {
                if let Some(init) = init.as_deref() {
                    w.note_unsupported(init, None);
                }
                if let Some(Stmt::Local { name, .. }) = init.as_deref() {
                    w.declare_visible(name);
                }

                Stmt::For {
                    init,
                    cond,
                    step,
                    body: w.embedded(*body, ctx),
                }
            }),
            Stmt::Labeled(label, stmt) => {
                Stmt::Labeled(label, self.embedded(*stmt, ctx))
            }
            Stmt::Try {
                body,
                catch,
                finally,
            } => Stmt::Try {
                body: self.block(body, ctx.nested()),
                catch: catch.map(|c| {
                    self.scoped(|w| {
                        c.name.iter().for_each(|n| w.declare_visible(n));

                        Catch {
                            ty: c.ty,
                            name: c.name,
                            body: w.block(c.body, ctx.nested()),
                        }
                    })
                }),
                finally: finally.map(|b| {
                    self.block(
                        b,
                        Ctx {
                            in_finally: true,
                            tail: false,
                        },
                    )
                }),
            },
            other => other,
        }]
    }

    fn keep(&mut self, link: NodeId, reason: NotInlined) {
        tracing::trace!(
            member = %self.member.name,
            caller = %self.decl.pos,
            %link,
            %reason,
            "link not inlined"
        );

        self.kept.push((link, reason));
    }

    /// Record links owned by `stmt` that are not candidates for inlining.
    fn note_unsupported(&mut self, stmt: &Stmt, candidate: Option<NodeId>) {
        let mut found = Vec::new();

        for e in stmt.own_exprs() {
            e.walk(&mut |x| {
                if matches!(x.kind, ExprKind::Link(_)) && Some(x.id) != candidate {
                    found.push(x.id);
                }
            });
        }

        found
            .into_iter()
            .for_each(|id| self.keep(id, NotInlined::UnsupportedShape));
    }

    /// Check whether `site` may be inlined,
    ///   returning its target.
    fn feasible(&self, site: &Site, ctx: Ctx) -> Result<Target, NotInlined> {
        let target = *self
            .res
            .get(site.link)
            .ok_or(NotInlined::UnsupportedShape)?;
        let callee = self.member.decl(target.decl);

        if !self.opts.enabled {
            return Err(NotInlined::Disabled);
        } else if target.hint == InlineHint::NoInline {
            return Err(NotInlined::NoInlineHint);
        } else if callee.origin.is_inherited() {
            return Err(NotInlined::Inherited);
        } else if callee.pos >= self.decl.pos {
            return Err(NotInlined::NotEarlier);
        } else if callee.flags.not_inlineable {
            return Err(NotInlined::NotInlineable);
        }

        // Only caller names are renamed away from the copy,
        //   so any other destination could be captured by a target local.
        if let Shape::Assign { name } = &site.shape {
            if !self.is_visible(&name.name) {
                return Err(NotInlined::StoreNotLocal);
            }
        }

        let params = callee.params(target.kind);

        if params.len() != site.args.len()
            || params.iter().zip(&site.args).any(|(p, a)| p.mode != a.mode)
        {
            return Err(NotInlined::ArgumentMismatch);
        }

        let names = site
            .args
            .iter()
            .map(|a| a.expr.as_name().filter(|n| self.is_visible(n)))
            .collect::<Option<Vec<_>>>()
            .ok_or(NotInlined::ArgumentNotLocal)?;

        for (i, (a, name)) in site.args.iter().zip(&names).enumerate() {
            let aliased = site.args.iter().zip(&names).enumerate().any(|(j, (b, other))| {
                i != j
                    && name == other
                    && (a.mode != ParamMode::Value || b.mode != ParamMode::Value)
            });

            if aliased {
                return Err(NotInlined::AliasedArgument);
            }
        }

        let body = self.body_of(target);

        let by_value: Vec<&str> = params
            .iter()
            .filter(|p| p.mode == ParamMode::Value)
            .map(|p| p.name.name.as_str())
            .collect();

        if writes_any(body, &by_value) {
            return Err(NotInlined::ParameterWritten);
        }

        if ctx.in_finally {
            let exits = Exits::of(body);

            if matches!(site.shape, Shape::Return { .. }) || exits.jumps() {
                return Err(NotInlined::JumpInFinally);
            }
        }

        Ok(target)
    }

    fn body_of(&self, target: Target) -> &'a Block {
        static EMPTY: Block = Block { stmts: Vec::new() };

        self.done
            .get(target.decl.index())
            .and_then(|d| d.body(target.kind))
            .unwrap_or(&EMPTY)
    }

    fn inline(&mut self, site: &Site, ctx: Ctx) -> Result<Vec<Stmt>, NotInlined> {
        let target = self.feasible(site, ctx)?;
        let callee = self.member.decl(target.decl);
        let body = self.body_of(target);

        let params: FxHashMap<String, String> = callee
            .params(target.kind)
            .into_iter()
            .zip(&site.args)
            .filter_map(|(p, a)| Some((p.name.name, a.expr.as_name()?.to_string())))
            .collect();

        let copy = {
            let mut renamer = Renamer::new(
                body,
                params,
                self.scope,
                &mut self.used,
                &mut *self.ids,
                &mut *self.res,
            )
            .map_err(|_| NotInlined::ShadowedFreeName)?;

            renamer.stmts(body)
        };

        // Chosen after renaming so as not to collide with labels of the
        //   copy.
        let (label_n, label) = (self.next_label..)
            .map(|n| (n, format!("{RETURN_LABEL_PREFIX}{n}")))
            .find(|(_, l)| !self.used.contains(l))
            .unwrap_or_default();

        let void_tail = self.caller_void
            && ctx.tail
            && matches!(site.shape, Shape::Discard)
            && (target.kind.takes_value() || callee.result_type().is_void());

        let out = Subst {
            ids: &mut *self.ids,
            label: Ident::new(label.clone(), UNKNOWN_SPAN),
            jumped: false,
        }
        .apply(copy, &site.shape, void_tail, callee.result_type());

        if out.jumped {
            self.used.insert(label);
            self.next_label = label_n + 1;
        }

        tracing::trace!(
            member = %self.member.name,
            caller = %self.decl.pos,
            target = %callee.pos,
            link = %target.link,
            accessor = %target.kind,
            "link inlined"
        );

        self.inlined += 1;
        Ok(out.stmts)
    }
}

/// Whether `block` assigns to,
///   or passes by reference,
///   any of `names`.
fn writes_any(block: &Block, names: &[&str]) -> bool {
    let mut found = false;

    let hit = |e: &Expr| e.as_name().map_or(false, |n| names.contains(&n));

    block.walk_exprs(&mut |e| match &e.kind {
        ExprKind::Assign(_, lhs, _) if hit(lhs) => found = true,
        ExprKind::Call(_, args) => {
            if args.iter().any(|a| a.mode != ParamMode::Value && hit(&a.expr)) {
                found = true;
            }
        }
        _ => (),
    });

    found
}

/// How control leaves a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Exits {
    returns: usize,

    /// The last top-level statement is a `return`.
    tail_return: bool,
}

impl Exits {
    fn of(block: &Block) -> Self {
        let mut returns = 0;

        for stmt in &block.stmts {
            stmt.walk(&mut |s| {
                if let Stmt::Return(..) = s {
                    returns += 1;
                }
            });
        }

        Self {
            returns,
            tail_return: matches!(block.stmts.last(), Some(Stmt::Return(..))),
        }
    }

    /// Whether substitution must introduce a jump.
    fn jumps(self) -> bool {
        self.returns > usize::from(self.tail_return)
    }
}

/// Result of substituting a body at a call site.
struct Substituted {
    stmts: Vec<Stmt>,
    jumped: bool,
}

/// Rewrites the `return`s of a copied body for its call site.
struct Subst<'a> {
    ids: &'a mut NodeIdGen,
    label: Ident,
    jumped: bool,
}

/// What becomes of a `return` within a substituted body.
#[derive(Debug, Clone, Copy)]
enum Exit<'s> {
    /// `return` remains `return`,
    ///   with its value cast if needed.
    Keep(Option<&'s TypeName>),

    /// The value is stored in the named local or discarded,
    ///   and control jumps past the body.
    Jump(Option<&'s Ident>),
}

impl<'a> Subst<'a> {
    fn apply(
        mut self,
        body: Vec<Stmt>,
        shape: &Shape,
        void_tail: bool,
        result_ty: &TypeName,
    ) -> Substituted {
        let single = match body.as_slice() {
            [Stmt::Return(Some(e), _)] => Some(e.clone()),
            _ => None,
        };

        let stmts = match (shape, single) {
            (Shape::Discard, Some(e)) => self.store(None, e),
            (Shape::Init { ty, name }, Some(e)) => vec![Stmt::Local {
                ty: ty.clone(),
                name: name.clone(),
                init: Some(e),
            }],
            (Shape::Assign { name }, Some(e)) => self.store(Some(name), e),
            (Shape::Return { cast, span }, Some(e)) => {
                vec![Stmt::Return(Some(self.cast(cast.as_ref(), e)), *span)]
            }

            (Shape::Return { cast, .. }, None) => {
                self.rewrite(body, Exit::Keep(cast.as_ref()))
            }
            (Shape::Discard, None) if void_tail => {
                let mut stmts = self.rewrite(body, Exit::Keep(None));

                if matches!(stmts.last(), Some(Stmt::Return(None, _))) {
                    stmts.pop();
                }
                stmts
            }
            (Shape::Discard, None) => self.rewrite(body, Exit::Jump(None)),
            (Shape::Init { ty, name }, None) => {
                let mut stmts = vec![Stmt::Local {
                    ty: Some(ty.clone().unwrap_or_else(|| result_ty.clone())),
                    name: name.clone(),
                    init: None,
                }];
                stmts.extend(self.rewrite(body, Exit::Jump(Some(name))));
                stmts
            }
            (Shape::Assign { name }, None) => {
                self.rewrite(body, Exit::Jump(Some(name)))
            }
        };

        let mut stmts = stmts;

        if self.jumped {
            stmts.push(Stmt::Labeled(self.label.clone(), Box::new(Stmt::Empty)));
        }

        Substituted {
            stmts,
            jumped: self.jumped,
        }
    }

    fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr::new(self.ids.fresh(), kind, span)
    }

    fn cast(&mut self, ty: Option<&TypeName>, e: Expr) -> Expr {
        match ty {
            Some(ty) => {
                let span = e.span;
                self.expr(ExprKind::Cast(ty.clone(), Box::new(e)), span)
            }
            None => e,
        }
    }

    /// Store `e` into `dest`,
    ///   or evaluate it for its effects only.
    fn store(&mut self, dest: Option<&Ident>, e: Expr) -> Vec<Stmt> {
        let span = e.span;

        let lhs = match dest {
            Some(name) => ExprKind::Name(name.name.clone()),
            None if is_pure(&e) => return vec![],
            None if matches!(e.kind, ExprKind::Call(..) | ExprKind::Assign(..)) => {
                return vec![Stmt::Expr(e)]
            }
            None => ExprKind::Name(DISCARD.into()),
        };

        let lhs = self.expr(lhs, span);

        vec![Stmt::Expr(self.expr(
            ExprKind::Assign(AssignOp::Assign, Box::new(lhs), Box::new(e)),
            span,
        ))]
    }

    fn rewrite(&mut self, body: Vec<Stmt>, exit: Exit) -> Vec<Stmt> {
        let n = body.len();

        body.into_iter()
            .enumerate()
            .flat_map(|(i, stmt)| self.rewrite_stmt(stmt, exit, i + 1 == n))
            .collect()
    }

    fn rewrite_embedded(&mut self, stmt: Stmt, exit: Exit) -> Box<Stmt> {
        let mut out = self.rewrite_stmt(stmt, exit, false);

        Box::new(match out.len() {
            1 => out.remove(0),
            _ => Stmt::Block(Block::new(out)),
        })
    }

    fn rewrite_block(&mut self, block: Block, exit: Exit) -> Block {
        Block::new(
            block
                .stmts
                .into_iter()
                .flat_map(|s| self.rewrite_stmt(s, exit, false))
                .collect(),
        )
    }

    fn rewrite_stmt(&mut self, stmt: Stmt, exit: Exit, tail: bool) -> Vec<Stmt> {
        match stmt {
            Stmt::Return(e, span) => match exit {
                Exit::Keep(cast) => {
                    vec![Stmt::Return(e.map(|e| self.cast(cast, e)), span)]
                }
                Exit::Jump(dest) => {
                    let mut out = match e {
                        Some(e) => self.store(dest, e),
                        None => vec![],
                    };

                    if !tail {
                        self.jumped = true;
                        out.push(Stmt::Goto(Ident::new(self.label.name.clone(), span)));
                    }

                    out
                }
            },
            Stmt::Block(block) => vec![Stmt::Block(self.rewrite_block(block, exit))],
            Stmt::If {
                cond,
                then,
                otherwise,
            } => vec![Stmt::If {
                cond,
                then: self.rewrite_embedded(*then, exit),
                otherwise: otherwise.map(|s| self.rewrite_embedded(*s, exit)),
            }],
            Stmt::While { cond, body } => vec![Stmt::While {
                cond,
                body: self.rewrite_embedded(*body, exit),
            }],
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => vec![Stmt::For {
                init,
                cond,
                step,
                body: self.rewrite_embedded(*body, exit),
            }],
            Stmt::Labeled(label, stmt) => {
                vec![Stmt::Labeled(label, self.rewrite_embedded(*stmt, exit))]
            }
            Stmt::Try {
                body,
                catch,
                finally,
            } => vec![Stmt::Try {
                body: self.rewrite_block(body, exit),
                catch: catch.map(|c| Catch {
                    body: self.rewrite_block(c.body, exit),
                    ..c
                }),
                finally: finally.map(|b| self.rewrite_block(b, exit)),
            }],
            other => vec![other],
        }
    }
}
