// Name hygiene for inlined bodies
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

//! Name hygiene for inlined bodies.
//!
//! A body copied into a caller must neither capture nor be captured by the
//!   caller's names.
//! The [`Renamer`] produces such a copy:
//!
//!   - locals, catch variables, and labels declared by the copied body that
//!       collide with a name already used by the caller are renamed to
//!       `name_N`,
//!         choosing the smallest `N` that is free;
//!   - parameters are replaced by the caller's arguments;
//!   - free names that a caller local would shadow are qualified with
//!       `this.` or,
//!         for static members,
//!       with the name of the class;
//!         and
//!   - every expression receives a fresh [`NodeId`],
//!       with the targets of copied links recorded under their new
//!       identities.
//!
//! Scopes are tracked with a stack so that a name maps to its renamed form
//!   only where its declaration is visible.

use super::super::{collect::ClassScope, resolve::Resolution};
use crate::syntax::ast::{
    Arg, Block, Catch, Expr, ExprKind, Ident, NodeIdGen, Stmt,
};
use fxhash::{FxHashMap, FxHashSet};

/// Names declared anywhere within `block`:
///   locals,
///   catch variables,
///   and labels.
pub fn declared_names(block: &Block) -> FxHashSet<String> {
    let mut names = FxHashSet::default();

    for stmt in &block.stmts {
        stmt.walk(&mut |s| match s {
            Stmt::Local { name, .. } | Stmt::Labeled(name, _) => {
                names.insert(name.name.clone());
            }
            Stmt::Try {
                catch:
                    Some(Catch {
                        name: Some(name), ..
                    }),
                ..
            } => {
                names.insert(name.name.clone());
            }
            _ => (),
        });
    }

    names
}

/// Labels declared within `block`.
pub fn labels(block: &Block) -> Vec<String> {
    let mut found = Vec::new();

    for stmt in &block.stmts {
        stmt.walk(&mut |s| {
            if let Stmt::Labeled(name, _) = s {
                found.push(name.name.clone());
            }
        });
    }

    found
}

/// Names referenced by `block` that it does not itself declare,
///   excluding `params`.
pub fn free_names(block: &Block, params: &[String]) -> FxHashSet<String> {
    let declared = declared_names(block);
    let mut free = FxHashSet::default();

    block.walk_exprs(&mut |e| {
        if let ExprKind::Name(name) = &e.kind {
            if !declared.contains(name) && !params.contains(name) {
                free.insert(name.clone());
            }
        }
    });

    free
}

/// A free name of an inlined body that cannot be qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unqualifiable(pub String);

/// Copies a body into a caller's namespace.
pub struct Renamer<'a> {
    used: &'a mut FxHashSet<String>,

    /// Names that must not be chosen when renaming,
    ///   beyond those already used by the caller.
    reserved: FxHashSet<String>,
    params: FxHashMap<String, String>,
    scopes: Vec<FxHashMap<String, String>>,
    labels: FxHashMap<String, String>,
    qualify: FxHashMap<String, ExprKind>,
    ids: &'a mut NodeIdGen,
    res: &'a mut Resolution,
}

impl<'a> Renamer<'a> {
    /// Prepare to copy `body` into a caller whose names are `used`.
    ///
    /// `params` maps each parameter of `body` to the caller's argument.
    /// Fails if a free name of `body` would be shadowed by a caller name
    ///   and is not a member of `scope` through which it could be
    ///   qualified.
    pub fn new(
        body: &Block,
        params: FxHashMap<String, String>,
        scope: &ClassScope,
        used: &'a mut FxHashSet<String>,
        ids: &'a mut NodeIdGen,
        res: &'a mut Resolution,
    ) -> Result<Self, Unqualifiable> {
        let param_names: Vec<String> = params.keys().cloned().collect();
        let free = free_names(body, &param_names);

        let mut qualify = FxHashMap::default();

        for name in &free {
            if !used.contains(name) {
                continue;
            }

            let receiver = match scope.member_is_static(name) {
                Some(true) => ExprKind::Name(scope.name.clone()),
                Some(false) => ExprKind::This,
                None => return Err(Unqualifiable(name.clone())),
            };

            qualify.insert(name.clone(), receiver);
        }

        let mut reserved = declared_names(body);
        reserved.extend(free);

        let mut renamer = Self {
            used,
            reserved,
            params,
            scopes: vec![FxHashMap::default()],
            labels: FxHashMap::default(),
            qualify,
            ids,
            res,
        };

        for label in labels(body) {
            let fresh = renamer.claim(&label);
            renamer.labels.insert(label, fresh);
        }

        Ok(renamer)
    }

    /// Choose a name for a declaration of `name`,
    ///   renaming it if the caller already uses it.
    fn claim(&mut self, name: &str) -> String {
        let chosen = if self.used.contains(name) {
            (1..)
                .map(|n| format!("{name}_{n}"))
                .find(|c| !self.used.contains(c) && !self.reserved.contains(c))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };

        self.used.insert(chosen.clone());
        chosen
    }

    fn declare(&mut self, ident: &Ident) -> Ident {
        let chosen = self.claim(&ident.name);

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(ident.name.clone(), chosen.clone());
        }

        Ident::new(chosen, ident.span)
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.params.get(name))
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(FxHashMap::default());
        let ret = f(self);
        self.scopes.pop();
        ret
    }

    /// Copy `block` as a sequence of statements in the current scope.
    pub fn stmts(&mut self, block: &Block) -> Vec<Stmt> {
        block.stmts.iter().map(|s| self.stmt(s)).collect()
    }

    fn block(&mut self, block: &Block) -> Block {
        self.scoped(|r| Block::new(r.stmts(block)))
    }

    fn boxed(&mut self, stmt: &Stmt) -> Box<Stmt> {
        Box::new(self.stmt(stmt))
    }

    fn stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Block(block) => Stmt::Block(self.block(block)),
            Stmt::Local { ty, name, init } => {
                // The initializer cannot see the local being declared.
                let init = init.as_ref().map(|e| self.expr(e));

                Stmt::Local {
                    ty: ty.clone(),
                    name: self.declare(name),
                    init,
                }
            }
            Stmt::Expr(e) => Stmt::Expr(self.expr(e)),
            Stmt::Return(e, span) => {
                Stmt::Return(e.as_ref().map(|e| self.expr(e)), *span)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => Stmt::If {
                cond: self.expr(cond),
                then: self.scoped(|r| r.boxed(then)),
                otherwise: otherwise.as_ref().map(|s| self.scoped(|r| r.boxed(s))),
            },
            Stmt::While { cond, body } => Stmt::While {
                cond: self.expr(cond),
                body: self.scoped(|r| r.boxed(body)),
            },
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.scoped(|r| Stmt::For {
                init: init.as_ref().map(|s| r.boxed(s)),
                cond: cond.as_ref().map(|e| r.expr(e)),
                step: step.iter().map(|e| r.expr(e)).collect(),
                body: r.scoped(|r| r.boxed(body)),
            }),
            Stmt::Break(span) => Stmt::Break(*span),
            Stmt::Continue(span) => Stmt::Continue(*span),
            Stmt::Goto(label) => Stmt::Goto(self.label(label)),
            Stmt::Labeled(label, stmt) => {
                Stmt::Labeled(self.label(label), self.boxed(stmt))
            }
            Stmt::Throw(e) => Stmt::Throw(self.expr(e)),
            Stmt::Try {
                body,
                catch,
                finally,
            } => Stmt::Try {
                body: self.block(body),
                catch: catch.as_ref().map(|c| {
                    self.scoped(|r| Catch {
                        ty: c.ty.clone(),
                        name: c.name.as_ref().map(|n| r.declare(n)),
                        body: r.block(&c.body),
                    })
                }),
                finally: finally.as_ref().map(|b| self.block(b)),
            },
            Stmt::Empty => Stmt::Empty,
        }
    }

    fn label(&self, label: &Ident) -> Ident {
        match self.labels.get(&label.name) {
            Some(name) => Ident::new(name.clone(), label.span),
            None => label.clone(),
        }
    }

    fn fresh(&mut self, kind: ExprKind, from: &Expr) -> Expr {
        let id = self.ids.fresh();

        if let Some(target) = self.res.get(from.id).copied() {
            self.res.insert(id, target);
        }

        Expr::new(id, kind, from.span)
    }

    fn expr(&mut self, e: &Expr) -> Expr {
        let kind = match &e.kind {
            ExprKind::Name(name) => {
                if let Some(renamed) = self.lookup(name) {
                    ExprKind::Name(renamed.clone())
                } else if let Some(receiver) = self.qualify.get(name).cloned() {
                    let recv = self.fresh(receiver, e);
                    ExprKind::Member(Box::new(recv), Ident::new(name.clone(), e.span))
                } else {
                    ExprKind::Name(name.clone())
                }
            }
            ExprKind::Member(target, name) => {
                ExprKind::Member(Box::new(self.expr(target)), name.clone())
            }
            ExprKind::Call(callee, args) => ExprKind::Call(
                Box::new(self.expr(callee)),
                args.iter()
                    .map(|arg| Arg {
                        mode: arg.mode,
                        expr: self.expr(&arg.expr),
                    })
                    .collect(),
            ),
            ExprKind::Unary(op, x) => ExprKind::Unary(*op, Box::new(self.expr(x))),
            ExprKind::Binary(op, l, r) => {
                ExprKind::Binary(*op, Box::new(self.expr(l)), Box::new(self.expr(r)))
            }
            ExprKind::Assign(op, l, r) => {
                ExprKind::Assign(*op, Box::new(self.expr(l)), Box::new(self.expr(r)))
            }
            ExprKind::Cast(ty, x) => ExprKind::Cast(ty.clone(), Box::new(self.expr(x))),
            kind @ (ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::Link(_)) => kind.clone(),
        };

        self.fresh(kind, e)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        span::dummy::DUMMY_CONTEXT,
        syntax::{
            ast::{Member, NodeId},
            parse::parse,
            print::PrintedExpr,
        },
    };

    fn body(src: &str) -> Block {
        let parsed = parse(DUMMY_CONTEXT, &format!("class C {{ void M() {src} }}"))
            .unwrap();

        match parsed.unit.classes.into_iter().next().unwrap().members.remove(0) {
            Member::Method(m) => m.body,
            _ => unreachable!(),
        }
    }

    fn scope() -> ClassScope {
        let parsed = parse(
            DUMMY_CONTEXT,
            "class C { int count; static int total; void M() { } }",
        )
        .unwrap();
        let order = Default::default();

        crate::ld::collect::collect(&parsed.unit, &order)
            .classes
            .remove(0)
            .scope
    }

    fn render(stmts: &[Stmt]) -> String {
        let table = Default::default();

        stmts
            .iter()
            .map(|s| match s {
                Stmt::Expr(e) => format!("{};", PrintedExpr { expr: e, links: &table }),
                Stmt::Local {
                    name,
                    init: Some(e),
                    ..
                } => format!("{name} = {};", PrintedExpr { expr: e, links: &table }),
                Stmt::Labeled(l, _) => format!("{l}:"),
                Stmt::Goto(l) => format!("goto {l};"),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn collects_declared_and_free_names() {
        let b = body(
            "{ int a = x; try { } catch (E e) { } done: for (int i = 0; ; ) { y(); } }",
        );

        let declared = declared_names(&b);
        for n in ["a", "e", "done", "i"] {
            assert!(declared.contains(n), "{n}");
        }

        let free = free_names(&b, &["x".into()]);
        assert_eq!(FxHashSet::from_iter(["y".to_string()]), free);
    }

    #[test]
    fn renames_colliding_locals_and_labels() {
        let b = body("{ int a = p; int b = a; out: a = b; goto out; }");

        let mut used = FxHashSet::from_iter(["a".to_string(), "out".into(), "a_1".into()]);
        let mut ids = NodeIdGen::starting_at(NodeId::new(1000));
        let mut res = Resolution::default();
        let params = FxHashMap::from_iter([("p".to_string(), "arg".to_string())]);

        let mut sut =
            Renamer::new(&b, params, &scope(), &mut used, &mut ids, &mut res).unwrap();
        let out = sut.stmts(&b);

        assert_eq!("a_2 = arg; b = a_2; out_1: goto out_1;", render(&out));
        assert!(used.contains("a_2") && used.contains("b") && used.contains("out_1"));
    }

    #[test]
    fn qualifies_shadowed_free_names() {
        let b = body("{ count = total + 1; }");

        let mut used = FxHashSet::from_iter(["count".to_string(), "total".into()]);
        let mut ids = NodeIdGen::default();
        let mut res = Resolution::default();

        let mut sut = Renamer::new(
            &b,
            FxHashMap::default(),
            &scope(),
            &mut used,
            &mut ids,
            &mut res,
        )
        .unwrap();

        assert_eq!("this.count = C.total + 1;", render(&sut.stmts(&b)));
    }

    #[test]
    fn shadowed_unknown_name_cannot_be_qualified() {
        let b = body("{ Console.WriteLine(1); }");

        let mut used = FxHashSet::from_iter(["Console".to_string()]);
        let mut ids = NodeIdGen::default();
        let mut res = Resolution::default();

        assert!(matches!(
            Renamer::new(
                &b,
                FxHashMap::default(),
                &scope(),
                &mut used,
                &mut ids,
                &mut res
            ),
            Err(Unqualifiable(name)) if name == "Console"
        ));
    }

    #[test]
    fn copies_receive_fresh_ids() {
        let b = body("{ x = y; }");

        let mut used = FxHashSet::default();
        let mut ids = NodeIdGen::starting_at(NodeId::new(500));
        let mut res = Resolution::default();

        let mut sut = Renamer::new(
            &b,
            FxHashMap::default(),
            &scope(),
            &mut used,
            &mut ids,
            &mut res,
        )
        .unwrap();
        let out = sut.stmts(&b);

        let mut seen = Vec::new();
        out[0].walk_exprs(&mut |e| seen.push(e.id.as_u32()));

        assert!(seen.iter().all(|id| *id >= 500), "{seen:?}");
        assert_eq!(3, seen.len());
    }
}
