// Abstract syntax tree
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

//! Abstract syntax of the host language.
//!
//! The tree is deliberately small:
//!   just large enough to carry aspect templates,
//!   the declarations they override,
//!   and the control flow that inlining must preserve.
//!
//! Every [`Expr`] carries a [`NodeId`].
//! Link markers are _not_ part of the tree;
//!   they live in a [`LinkTable`] side table keyed by the [`NodeId`] of the
//!   [`ExprKind::Link`] node that they annotate.

use crate::{global, span::Span};
use arrayvec::ArrayVec;
use fxhash::FxHashMap;
use std::fmt::{self, Display};

/// Name that discards whatever is assigned to it.
pub const DISCARD: &str = "_";

/// Identity of an expression node.
///
/// Identities are unique within a compilation unit as parsed,
///   within a single member's working copy while linking,
///   and among the nodes synthesized for a linked unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(global::NodeIdSize);

assert_eq_size!(NodeId, u32);

impl NodeId {
    pub const fn new(id: global::NodeIdSize) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> global::NodeIdSize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocator of fresh [`NodeId`]s.
#[derive(Debug, Clone)]
pub struct NodeIdGen(global::NodeIdSize);

impl NodeIdGen {
    /// Allocate identifiers beginning at `next`.
    pub fn starting_at(next: NodeId) -> Self {
        Self(next.0)
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.0);
        self.0 = self.0.wrapping_add(1);
        id
    }

    /// The identifier that will be produced by the next call to
    ///   [`Self::fresh`].
    pub fn peek(&self) -> NodeId {
        NodeId(self.0)
    }
}

impl Default for NodeIdGen {
    fn default() -> Self {
        Self(0)
    }
}

/// A name as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new<S: Into<String>>(name: S, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A type as written in source.
///
/// Types are carried through linking verbatim;
///   nothing here type-checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// A single parsed source.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// `[assembly: ...]` attributes.
    pub attrs: Vec<Attribute>,
    pub classes: Vec<ClassDecl>,
}

impl CompilationUnit {
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|class| class.name.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub attrs: Vec<Attribute>,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub base: Option<Ident>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ClassDecl {
    /// Members declared with the given name,
    ///   in source order.
    pub fn members_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Member> + 'a {
        self.members.iter().filter(move |m| m.name() == name)
    }
}

/// `[Name(args...)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl Attribute {
    /// The `n`th argument if it is a string literal.
    pub fn str_arg(&self, n: usize) -> Option<&str> {
        match self.args.get(n).map(|e| &e.kind) {
            Some(ExprKind::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The `n`th argument if it is a simple name.
    pub fn name_arg(&self, n: usize) -> Option<&str> {
        match self.args.get(n).map(|e| &e.kind) {
            Some(ExprKind::Name(s)) => Some(s),
            _ => None,
        }
    }
}

/// Declaration modifiers,
///   kept in source order for faithful printing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modifiers(pub Vec<Modifier>);

impl Modifiers {
    pub fn has(&self, m: Modifier) -> bool {
        self.0.contains(&m)
    }

    pub fn is_static(&self) -> bool {
        self.has(Modifier::Static)
    }

    /// Modifiers for a declaration that is an implementation detail of
    ///   its type:
    ///     private, never virtual, static only if `self` is.
    pub fn privatized(&self) -> Self {
        let mut mods = vec![Modifier::Private];

        if self.is_static() {
            mods.push(Modifier::Static);
        }

        Self(mods)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Virtual,
    Override,
    Abstract,
    Sealed,
    Readonly,
}

impl Modifier {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        use Modifier::*;

        Some(match kw {
            "public" => Public,
            "private" => Private,
            "protected" => Protected,
            "internal" => Internal,
            "static" => Static,
            "virtual" => Virtual,
            "override" => Override,
            "abstract" => Abstract,
            "sealed" => Sealed,
            "readonly" => Readonly,
            _ => return None,
        })
    }
}

impl Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Modifier::*;

        f.write_str(match self {
            Public => "public",
            Private => "private",
            Protected => "protected",
            Internal => "internal",
            Static => "static",
            Virtual => "virtual",
            Override => "override",
            Abstract => "abstract",
            Sealed => "sealed",
            Readonly => "readonly",
        })
    }
}

/// What precedes the body of every member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberHeader {
    pub attrs: Vec<Attribute>,
    pub modifiers: Modifiers,
    pub ty: TypeName,
    pub name: Ident,
    pub span: Span,
}

impl MemberHeader {
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|attr| attr.name.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
    Event(EventDecl),
}

impl Member {
    pub fn header(&self) -> &MemberHeader {
        match self {
            Self::Field(x) => &x.header,
            Self::Method(x) => &x.header,
            Self::Property(x) => &x.header,
            Self::Event(x) => &x.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut MemberHeader {
        match self {
            Self::Field(x) => &mut x.header,
            Self::Method(x) => &mut x.header,
            Self::Property(x) => &mut x.header,
            Self::Event(x) => &mut x.header,
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name.name
    }

    pub fn span(&self) -> Span {
        self.header().span
    }

    /// Visit every expression node of this member,
    ///   including field initializers and accessor bodies.
    pub fn walk_exprs_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        match self {
            Self::Field(x) => x.init.iter_mut().for_each(|e| e.walk_mut(f)),
            Self::Method(x) => x.body.walk_exprs_mut(f),
            Self::Property(PropertyDecl { accessors, .. })
            | Self::Event(EventDecl { accessors, .. }) => accessors
                .iter_mut()
                .for_each(|acc| acc.body.walk_exprs_mut(f)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub header: MemberHeader,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub header: MemberHeader,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub header: MemberHeader,
    pub accessors: ArrayVec<Accessor, 2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub header: MemberHeader,
    pub accessors: ArrayVec<Accessor, 2>,
}

/// Look up the accessor of the given kind.
pub fn accessor(
    accessors: &[Accessor],
    kind: AccessorKind,
) -> Option<&Accessor> {
    accessors.iter().find(|acc| acc.kind == kind)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub kind: AccessorKind,
    pub body: Block,
    pub span: Span,
}

/// The kind of code body that a declaration provides,
///   and therefore the kind of access that reaches it.
///
/// Methods have a single body reached by invocation.
/// Properties and events have up to two accessors each,
///   and each accessor kind has its own override chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessorKind {
    Invoke,
    Get,
    Set,
    Add,
    Remove,
}

impl AccessorKind {
    /// Whether accessors of this kind receive an implicit `value`
    ///   parameter.
    pub fn takes_value(self) -> bool {
        matches!(self, Self::Set | Self::Add | Self::Remove)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::Get => "get",
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "get" => Self::Get,
            "set" => Self::Set,
            "add" => Self::Add,
            "remove" => Self::Remove,
            _ => return None,
        })
    }
}

impl Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How an argument is passed to,
///   or a parameter received by,
///   a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamMode {
    #[default]
    Value,
    Ref,
    Out,
}

impl ParamMode {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Value => None,
            Self::Ref => Some("ref"),
            Self::Out => Some("out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub mode: ParamMode,
    pub ty: TypeName,
    pub name: Ident,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    Local {
        ty: Option<TypeName>,
        name: Ident,
        init: Option<Expr>,
    },
    Expr(Expr),
    Return(Option<Expr>, Span),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Box<Stmt>,
    },
    Break(Span),
    Continue(Span),
    Goto(Ident),
    Labeled(Ident, Box<Stmt>),
    Throw(Expr),
    Try {
        body: Block,
        catch: Option<Catch>,
        finally: Option<Block>,
    },
    Empty,
}

impl Stmt {
    /// Visit this statement and every statement nested within it,
    ///   in source order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Stmt)) {
        f(self);

        match self {
            Self::Block(block) => block.stmts.iter().for_each(|s| s.walk(f)),
            Self::If {
                then, otherwise, ..
            } => {
                then.walk(f);
                otherwise.iter().for_each(|s| s.walk(f));
            }
            Self::While { body, .. } => body.walk(f),
            Self::For { init, body, .. } => {
                init.iter().for_each(|s| s.walk(f));
                body.walk(f);
            }
            Self::Labeled(_, stmt) => stmt.walk(f),
            Self::Try {
                body,
                catch,
                finally,
            } => {
                body.stmts.iter().for_each(|s| s.walk(f));
                catch
                    .iter()
                    .flat_map(|c| &c.body.stmts)
                    .for_each(|s| s.walk(f));
                finally
                    .iter()
                    .flat_map(|b| &b.stmts)
                    .for_each(|s| s.walk(f));
            }
            Self::Local { .. }
            | Self::Expr(_)
            | Self::Return(..)
            | Self::Break(_)
            | Self::Continue(_)
            | Self::Goto(_)
            | Self::Throw(_)
            | Self::Empty => (),
        }
    }

    /// Expressions owned directly by this statement,
    ///   excluding those of nested statements.
    pub fn own_exprs(&self) -> Vec<&Expr> {
        match self {
            Self::Local { init, .. } => init.iter().collect(),
            Self::Expr(e) | Self::Throw(e) => vec![e],
            Self::Return(e, _) => e.iter().collect(),
            Self::If { cond, .. } | Self::While { cond, .. } => vec![cond],
            Self::For { cond, step, .. } => cond.iter().chain(step).collect(),
            Self::Block(_)
            | Self::Break(_)
            | Self::Continue(_)
            | Self::Goto(_)
            | Self::Labeled(..)
            | Self::Try { .. }
            | Self::Empty => vec![],
        }
    }

    /// Visit every expression node within this statement,
    ///   including those of nested statements.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.walk(&mut |stmt| {
            stmt.own_exprs().into_iter().for_each(|e| e.walk(f))
        });
    }

    /// Mutable counterpart of [`Self::walk_exprs`].
    pub fn walk_exprs_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        self.walk_exprs_dyn(f)
    }

    fn walk_exprs_dyn(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        let mut each = |e: &mut Expr| e.walk_mut(&mut |x| f(x));

        match self {
            Self::Block(block) => {
                block.stmts.iter_mut().for_each(|s| s.walk_exprs_dyn(f))
            }
            Self::Local { init, .. } => init.iter_mut().for_each(each),
            Self::Expr(e) | Self::Throw(e) => each(e),
            Self::Return(e, _) => e.iter_mut().for_each(each),
            Self::If {
                cond,
                then,
                otherwise,
            } => {
                each(cond);
                then.walk_exprs_dyn(f);
                otherwise.iter_mut().for_each(|s| s.walk_exprs_dyn(f));
            }
            Self::While { cond, body } => {
                each(cond);
                body.walk_exprs_dyn(f);
            }
            Self::For {
                init,
                cond,
                step,
                body,
            } => {
                init.iter_mut().for_each(|s| s.walk_exprs_dyn(f));
                cond.iter_mut().for_each(|e| e.walk_mut(&mut |x| f(x)));
                step.iter_mut().for_each(|e| e.walk_mut(&mut |x| f(x)));
                body.walk_exprs_dyn(f);
            }
            Self::Labeled(_, stmt) => stmt.walk_exprs_dyn(f),
            Self::Try {
                body,
                catch,
                finally,
            } => {
                let blocks = Some(body)
                    .into_iter()
                    .chain(catch.iter_mut().map(|c| &mut c.body))
                    .chain(finally.iter_mut());

                for block in blocks {
                    block.stmts.iter_mut().for_each(|s| s.walk_exprs_dyn(f));
                }
            }
            Self::Break(_) | Self::Continue(_) | Self::Goto(_) | Self::Empty => {
            }
        }
    }
}

impl Block {
    /// Visit every expression node within this block.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.stmts.iter().for_each(|s| s.walk_exprs(f));
    }

    /// Mutable counterpart of [`Self::walk_exprs`].
    pub fn walk_exprs_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        self.stmts.iter_mut().for_each(|s| s.walk_exprs_mut(f));
    }
}

/// `catch (Type name) { ... }`;
///   both the type and the name are optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub ty: Option<TypeName>,
    pub name: Option<Ident>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind, span: Span) -> Self {
        Self { id, kind, span }
    }

    /// The name if this expression is a simple name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Visit this expression and every sub-expression in evaluation
    ///   order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);

        match &self.kind {
            ExprKind::Member(target, _) => target.walk(f),
            ExprKind::Call(callee, args) => {
                callee.walk(f);
                args.iter().for_each(|arg| arg.expr.walk(f));
            }
            ExprKind::Unary(_, x) | ExprKind::Cast(_, x) => x.walk(f),
            ExprKind::Binary(_, l, r) | ExprKind::Assign(_, l, r) => {
                l.walk(f);
                r.walk(f);
            }
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Name(_)
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::Link(_) => (),
        }
    }

    /// Mutable counterpart of [`Self::walk`].
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        f(self);

        match &mut self.kind {
            ExprKind::Member(target, _) => target.walk_mut(f),
            ExprKind::Call(callee, args) => {
                callee.walk_mut(f);
                args.iter_mut().for_each(|arg| arg.expr.walk_mut(f));
            }
            ExprKind::Unary(_, x) | ExprKind::Cast(_, x) => x.walk_mut(f),
            ExprKind::Binary(_, l, r) | ExprKind::Assign(_, l, r) => {
                l.walk_mut(f);
                r.walk_mut(f);
            }
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Name(_)
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::Link(_) => (),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
    Name(String),
    This,
    Base,
    Member(Box<Expr>, Ident),
    Call(Box<Expr>, Vec<Arg>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
    Cast(TypeName, Box<Expr>),

    /// A symbolic reference to a declaration of the override chain named
    ///   by the selector.
    ///
    /// The [`LinkMarker`] describing which declaration is held in the
    ///   [`LinkTable`] under this node's [`NodeId`].
    Link(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub mode: ParamMode,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;

        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
            Gt => ">",
            Ge => ">=",
            And => "&&",
            Or => "||",
        }
    }

    /// Binding strength;
    ///   higher binds tighter.
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;

        match self {
            Or => 2,
            And => 3,
            Eq | Ne => 4,
            Lt | Le | Gt | Ge => 5,
            Add | Sub => 6,
            Mul | Div | Rem => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
        }
    }
}

/// Which declaration of an override chain a link marker refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// The source declaration as authored,
    ///   before any aspect was applied.
    Original,

    /// The declaration immediately preceding the layer of the marker.
    Base,

    /// The declaration of the marker's own layer
    ///   (`self` in source).
    Current,

    /// The outermost declaration,
    ///   which carries the public name of the member.
    Final,
}

impl LinkKind {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "original" => Self::Original,
            "base" => Self::Base,
            "self" => Self::Current,
            "final" => Self::Final,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Base => "base",
            Self::Current => "self",
            Self::Final => "final",
        }
    }
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Whether the author of a template asked for a link to be inlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InlineHint {
    /// Let the linker decide.
    #[default]
    Unspecified,

    /// Inline if feasible.
    Inline,

    /// The link must remain a real call.
    NoInline,
}

impl InlineHint {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "inline" => Self::Inline,
            "noinline" => Self::NoInline,
            _ => return None,
        })
    }

    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => None,
            Self::Inline => Some("inline"),
            Self::NoInline => Some("noinline"),
        }
    }
}

/// Annotation on an [`ExprKind::Link`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMarker {
    pub kind: LinkKind,
    pub hint: InlineHint,
    pub span: Span,
}

/// Side table of [`LinkMarker`]s keyed by the [`NodeId`] of the
///   [`ExprKind::Link`] node that they annotate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTable(FxHashMap<NodeId, LinkMarker>);

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, marker: LinkMarker) {
        self.0.insert(id, marker);
    }

    pub fn get(&self, id: NodeId) -> Option<&LinkMarker> {
        self.0.get(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of the parser:
///   the tree,
///   its link markers,
///   and the first [`NodeId`] not yet allocated.
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub unit: CompilationUnit,
    pub links: LinkTable,
    pub next_id: NodeId,
}
