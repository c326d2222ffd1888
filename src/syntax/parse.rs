// Parser
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

//! Recursive-descent parser producing a [`ParsedUnit`].
//!
//! The grammar is a small subset of C#:
//!   classes with single inheritance,
//!   fields, methods, properties and events,
//!   and the statements and expressions listed in [`ast`](super::ast).
//!
//! Link markers are recognized here and only here:
//!   `link(Selector, kind[, hint])` produces an [`ExprKind::Link`] node and
//!   records its [`LinkMarker`] in the [`LinkTable`].
//! Nothing downstream ever looks at the spelling `link` again.

use super::{
    ast::*,
    lex::{LexError, Lexer, Punct, Token, TokenKind},
};
use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::{Context, Span},
};
use arrayvec::ArrayVec;
use std::{error::Error, fmt::Display};

/// Parse a complete compilation unit.
pub fn parse(ctx: Context, src: &str) -> Result<ParsedUnit, ParseError> {
    Parser::new(ctx, src)?.parse_unit()
}

pub struct Parser {
    toks: Vec<Token>,
    pos: usize,
    ids: NodeIdGen,
    links: LinkTable,
}

type PResult<T> = Result<T, ParseError>;

/// Join two spans of the same context.
fn join(a: Span, b: Span) -> Span {
    a.merge(b).unwrap_or(a)
}

impl Parser {
    pub fn new(ctx: Context, src: &str) -> PResult<Self> {
        Ok(Self {
            toks: Lexer::new(ctx, src).collect::<Result<_, _>>()?,
            pos: 0,
            ids: NodeIdGen::default(),
            links: LinkTable::new(),
        })
    }

    /// The current token.
    ///
    /// The lexer always yields a final [`TokenKind::Eof`],
    ///   and the parser never advances past it,
    ///   so there is always a current token.
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.toks.len() - 1;
        &self.toks[(self.pos + ahead).min(last)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();

        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }

        tok
    }

    fn prev_span(&self) -> Span {
        self.toks[self.pos.saturating_sub(1)].span
    }

    fn is_punct(&self, p: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(p)
    }

    fn is_punct_at(&self, ahead: usize, p: Punct) -> bool {
        self.peek_at(ahead).kind == TokenKind::Punct(p)
    }

    fn is_kw(&self, kw: &str) -> bool {
        self.is_kw_at(0, kw)
    }

    fn is_kw_at(&self, ahead: usize, kw: &str) -> bool {
        matches!(&self.peek_at(ahead).kind, TokenKind::Ident(s) if s == kw)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        let is = self.is_punct(p);
        if is {
            self.bump();
        }
        is
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        let is = self.is_kw(kw);
        if is {
            self.bump();
        }
        is
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let tok = self.peek();
        ParseError::Unexpected {
            found: tok.kind.clone(),
            expected,
            span: tok.span,
        }
    }

    fn expect_punct(&mut self, p: Punct) -> PResult<Span> {
        if self.is_punct(p) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(p.as_str()))
        }
    }

    fn expect_kw(&mut self, kw: &'static str) -> PResult<Span> {
        if self.is_kw(kw) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(kw))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> PResult<Ident> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.bump().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr::new(self.ids.fresh(), kind, span)
    }

    pub fn parse_unit(mut self) -> PResult<ParsedUnit> {
        let mut attrs = Vec::new();
        let mut classes = Vec::new();

        while self.is_punct(Punct::LBracket)
            && self.is_kw_at(1, "assembly")
            && self.is_punct_at(2, Punct::Colon)
        {
            self.bump();
            self.bump();
            self.bump();
            self.parse_attr_list(&mut attrs)?;
        }

        while self.peek().kind != TokenKind::Eof {
            classes.push(self.parse_class()?);
        }

        Ok(ParsedUnit {
            unit: CompilationUnit { attrs, classes },
            links: self.links,
            next_id: self.ids.peek(),
        })
    }

    /// Parse the remainder of an attribute list after its opening `[`.
    fn parse_attr_list(&mut self, attrs: &mut Vec<Attribute>) -> PResult<()> {
        loop {
            let name = self.expect_ident("attribute name")?;
            let mut args = Vec::new();

            if self.eat_punct(Punct::LParen) {
                if !self.is_punct(Punct::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.eat_punct(Punct::Comma) {
                            break;
                        }
                    }
                }
                self.expect_punct(Punct::RParen)?;
            }

            let span = join(name.span, self.prev_span());
            attrs.push(Attribute { name, args, span });

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }

        self.expect_punct(Punct::RBracket)?;
        Ok(())
    }

    fn parse_attrs(&mut self) -> PResult<Vec<Attribute>> {
        let mut attrs = Vec::new();

        while self.eat_punct(Punct::LBracket) {
            self.parse_attr_list(&mut attrs)?;
        }

        Ok(attrs)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut mods = Vec::new();

        while let TokenKind::Ident(kw) = &self.peek().kind {
            match Modifier::from_keyword(kw) {
                Some(m) => {
                    mods.push(m);
                    self.bump();
                }
                None => break,
            }
        }

        Modifiers(mods)
    }

    fn parse_type(&mut self) -> PResult<TypeName> {
        let mut name = self.expect_ident("type")?.name;

        while self.is_punct(Punct::Dot)
            && matches!(self.peek_at(1).kind, TokenKind::Ident(_))
        {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_ident("type")?.name);
        }

        Ok(TypeName(name))
    }

    fn parse_class(&mut self) -> PResult<ClassDecl> {
        let attrs = self.parse_attrs()?;
        let modifiers = self.parse_modifiers();
        let start = self.expect_kw("class")?;
        let name = self.expect_ident("class name")?;
        let span = join(start, name.span);

        let base = if self.eat_punct(Punct::Colon) {
            Some(self.expect_ident("base class name")?)
        } else {
            None
        };

        self.expect_punct(Punct::LBrace)?;

        let mut members = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            members.push(self.parse_member()?);
        }

        Ok(ClassDecl {
            attrs,
            modifiers,
            name,
            base,
            members,
            span,
        })
    }

    fn parse_member(&mut self) -> PResult<Member> {
        let start = self.peek().span;
        let attrs = self.parse_attrs()?;
        let modifiers = self.parse_modifiers();
        let is_event = self.eat_kw("event");
        let ty = self.parse_type()?;
        let name = self.expect_ident("member name")?;

        let header = MemberHeader {
            attrs,
            modifiers,
            ty,
            span: join(start, name.span),
            name,
        };

        if is_event {
            let accessors = self.parse_accessors(&["add", "remove"])?;
            return Ok(Member::Event(EventDecl { header, accessors }));
        }

        if self.eat_punct(Punct::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(Member::Method(MethodDecl {
                header,
                params,
                body,
            }));
        }

        if self.is_punct(Punct::LBrace) {
            let accessors = self.parse_accessors(&["get", "set"])?;
            return Ok(Member::Property(PropertyDecl { header, accessors }));
        }

        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect_punct(Punct::Semi)?;
        Ok(Member::Field(FieldDecl { header, init }))
    }

    /// Parse the remainder of a parameter list after its opening `(`.
    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();

        if self.eat_punct(Punct::RParen) {
            return Ok(params);
        }

        loop {
            let mode = self.parse_param_mode();
            let ty = self.parse_type()?;
            let name = self.expect_ident("parameter name")?;

            params.push(Param { mode, ty, name });

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }

        self.expect_punct(Punct::RParen)?;
        Ok(params)
    }

    fn parse_param_mode(&mut self) -> ParamMode {
        if self.eat_kw("ref") {
            ParamMode::Ref
        } else if self.eat_kw("out") {
            ParamMode::Out
        } else {
            ParamMode::Value
        }
    }

    fn parse_accessors(
        &mut self,
        allowed: &[&'static str; 2],
    ) -> PResult<ArrayVec<Accessor, 2>> {
        let open = self.expect_punct(Punct::LBrace)?;
        let mut accessors = ArrayVec::<Accessor, 2>::new();

        while !self.eat_punct(Punct::RBrace) {
            let kw = self.expect_ident("accessor")?;

            let kind = allowed
                .iter()
                .find(|&&a| a == kw.name)
                .and_then(|a| AccessorKind::from_keyword(a))
                .ok_or_else(|| {
                    ParseError::UnknownAccessor(kw.name.clone(), kw.span)
                })?;

            if accessor(&accessors, kind).is_some() {
                return Err(ParseError::DuplicateAccessor(kind, kw.span));
            }

            let body = self.parse_block()?;

            // Two distinct kinds fit by construction.
            accessors.push(Accessor {
                kind,
                body,
                span: kw.span,
            });
        }

        if accessors.is_empty() {
            return Err(ParseError::NoAccessors(join(open, self.prev_span())));
        }

        Ok(accessors)
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect_punct(Punct::LBrace)?;

        let mut stmts = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.parse_stmt()?);
        }

        Ok(Block::new(stmts))
    }

    /// Whether the upcoming tokens look like `Type name =` or `Type name;`.
    fn at_local_decl(&self) -> bool {
        if !matches!(self.peek().kind, TokenKind::Ident(_)) {
            return false;
        }

        let mut i = 1;
        while self.is_punct_at(i, Punct::Dot)
            && matches!(self.peek_at(i + 1).kind, TokenKind::Ident(_))
        {
            i += 2;
        }

        matches!(self.peek_at(i).kind, TokenKind::Ident(_))
            && (self.is_punct_at(i + 1, Punct::Assign)
                || self.is_punct_at(i + 1, Punct::Semi))
    }

    fn parse_local(&mut self) -> PResult<Stmt> {
        let ty = if self.eat_kw("var") {
            None
        } else {
            Some(self.parse_type()?)
        };

        let name = self.expect_ident("local name")?;

        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_expr()?)
        } else if ty.is_none() {
            return Err(ParseError::VarWithoutInit(name.span));
        } else {
            None
        };

        Ok(Stmt::Local { ty, name, init })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if self.is_punct(Punct::LBrace) {
            return self.parse_block().map(Stmt::Block);
        }

        if self.eat_punct(Punct::Semi) {
            return Ok(Stmt::Empty);
        }

        if let TokenKind::Ident(kw) = &self.peek().kind {
            match kw.as_str() {
                "return" => {
                    let span = self.bump().span;
                    let value = if self.is_punct(Punct::Semi) {
                        None
                    } else {
                        Some(self.parse_expr()?)
                    };
                    self.expect_punct(Punct::Semi)?;
                    return Ok(Stmt::Return(value, span));
                }

                "if" => {
                    self.bump();
                    let cond = self.parse_paren_expr()?;
                    let then = Box::new(self.parse_stmt()?);
                    let otherwise = if self.eat_kw("else") {
                        Some(Box::new(self.parse_stmt()?))
                    } else {
                        None
                    };
                    return Ok(Stmt::If {
                        cond,
                        then,
                        otherwise,
                    });
                }

                "while" => {
                    self.bump();
                    let cond = self.parse_paren_expr()?;
                    let body = Box::new(self.parse_stmt()?);
                    return Ok(Stmt::While { cond, body });
                }

                "for" => return self.parse_for(),

                "break" => {
                    let span = self.bump().span;
                    self.expect_punct(Punct::Semi)?;
                    return Ok(Stmt::Break(span));
                }

                "continue" => {
                    let span = self.bump().span;
                    self.expect_punct(Punct::Semi)?;
                    return Ok(Stmt::Continue(span));
                }

                "goto" => {
                    self.bump();
                    let label = self.expect_ident("label")?;
                    self.expect_punct(Punct::Semi)?;
                    return Ok(Stmt::Goto(label));
                }

                "throw" => {
                    self.bump();
                    let value = self.parse_expr()?;
                    self.expect_punct(Punct::Semi)?;
                    return Ok(Stmt::Throw(value));
                }

                "try" => return self.parse_try(),

                "var" if matches!(self.peek_at(1).kind, TokenKind::Ident(_)) => {
                    let local = self.parse_local()?;
                    self.expect_punct(Punct::Semi)?;
                    return Ok(local);
                }

                _ => (),
            }
        }

        if matches!(self.peek().kind, TokenKind::Ident(_))
            && self.is_punct_at(1, Punct::Colon)
        {
            let label = self.expect_ident("label")?;
            self.bump();
            let stmt = self.parse_stmt()?;
            return Ok(Stmt::Labeled(label, Box::new(stmt)));
        }

        if self.at_local_decl() {
            let local = self.parse_local()?;
            self.expect_punct(Punct::Semi)?;
            return Ok(local);
        }

        let expr = self.parse_expr()?;
        self.expect_punct(Punct::Semi)?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_paren_expr(&mut self) -> PResult<Expr> {
        self.expect_punct(Punct::LParen)?;
        let expr = self.parse_expr()?;
        self.expect_punct(Punct::RParen)?;
        Ok(expr)
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.expect_kw("for")?;
        self.expect_punct(Punct::LParen)?;

        let init = if self.is_punct(Punct::Semi) {
            None
        } else if self.is_kw("var") || self.at_local_decl() {
            Some(Box::new(self.parse_local()?))
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expr()?)))
        };
        self.expect_punct(Punct::Semi)?;

        let cond = if self.is_punct(Punct::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_punct(Punct::Semi)?;

        let mut step = Vec::new();
        if !self.is_punct(Punct::RParen) {
            loop {
                step.push(self.parse_expr()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;

        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        let start = self.expect_kw("try")?;
        let body = self.parse_block()?;

        let catch = if self.eat_kw("catch") {
            let (ty, name) = if self.eat_punct(Punct::LParen) {
                let ty = self.parse_type()?;
                let name = if self.is_punct(Punct::RParen) {
                    None
                } else {
                    Some(self.expect_ident("exception variable")?)
                };
                self.expect_punct(Punct::RParen)?;
                (Some(ty), name)
            } else {
                (None, None)
            };

            Some(Catch {
                ty,
                name,
                body: self.parse_block()?,
            })
        } else {
            None
        };

        let finally = if self.eat_kw("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(ParseError::TryWithoutHandler(start));
        }

        Ok(Stmt::Try {
            body,
            catch,
            finally,
        })
    }

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_binary(0)?;

        let op = match &self.peek().kind {
            TokenKind::Punct(Punct::Assign) => AssignOp::Assign,
            TokenKind::Punct(Punct::PlusAssign) => AssignOp::Add,
            TokenKind::Punct(Punct::MinusAssign) => AssignOp::Sub,
            _ => return Ok(lhs),
        };

        self.check_assign_target(&lhs)?;
        self.bump();

        let rhs = self.parse_expr()?;
        let span = join(lhs.span, rhs.span);

        Ok(self.mk_expr(
            ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)),
            span,
        ))
    }

    fn check_assign_target(&self, target: &Expr) -> PResult<()> {
        match target.kind {
            ExprKind::Name(_) | ExprKind::Member(..) | ExprKind::Link(_) => {
                Ok(())
            }
            _ => Err(ParseError::InvalidAssignTarget(target.span)),
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        use BinaryOp::*;

        Some(match self.peek().kind {
            TokenKind::Punct(Punct::Plus) => Add,
            TokenKind::Punct(Punct::Minus) => Sub,
            TokenKind::Punct(Punct::Star) => Mul,
            TokenKind::Punct(Punct::Slash) => Div,
            TokenKind::Punct(Punct::Percent) => Rem,
            TokenKind::Punct(Punct::EqEq) => Eq,
            TokenKind::Punct(Punct::Ne) => Ne,
            TokenKind::Punct(Punct::Lt) => Lt,
            TokenKind::Punct(Punct::Le) => Le,
            TokenKind::Punct(Punct::Gt) => Gt,
            TokenKind::Punct(Punct::Ge) => Ge,
            TokenKind::Punct(Punct::AndAnd) => And,
            TokenKind::Punct(Punct::OrOr) => Or,
            _ => return None,
        })
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            let span = join(lhs.span, rhs.span);

            lhs = self.mk_expr(
                ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                span,
            );
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.peek().span;

        let op = if self.eat_punct(Punct::Bang) {
            Some(UnaryOp::Not)
        } else if self.eat_punct(Punct::Minus) {
            Some(UnaryOp::Neg)
        } else {
            None
        };

        if let Some(op) = op {
            let operand = self.parse_unary()?;
            let span = join(start, operand.span);
            return Ok(self.mk_expr(ExprKind::Unary(op, Box::new(operand)), span));
        }

        if self.at_cast() {
            self.bump();
            let ty = self.parse_type()?;
            self.expect_punct(Punct::RParen)?;
            let operand = self.parse_unary()?;
            let span = join(start, operand.span);
            return Ok(self.mk_expr(ExprKind::Cast(ty, Box::new(operand)), span));
        }

        self.parse_postfix()
    }

    /// Whether the upcoming tokens look like `(Type)` followed by
    ///   something that can only begin an operand.
    ///
    /// A parenthesized name followed by an operator such as `-` is
    ///   taken to be a parenthesized expression.
    fn at_cast(&self) -> bool {
        if !self.is_punct(Punct::LParen)
            || !matches!(self.peek_at(1).kind, TokenKind::Ident(_))
        {
            return false;
        }

        let mut i = 2;
        while self.is_punct_at(i, Punct::Dot)
            && matches!(self.peek_at(i + 1).kind, TokenKind::Ident(_))
        {
            i += 2;
        }

        if !self.is_punct_at(i, Punct::RParen) {
            return false;
        }

        matches!(
            self.peek_at(i + 1).kind,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Str(_)
                | TokenKind::Punct(Punct::LParen)
                | TokenKind::Punct(Punct::Bang)
        )
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self.expect_ident("member name")?;
                let span = join(expr.span, name.span);
                expr = self.mk_expr(ExprKind::Member(Box::new(expr), name), span);
            } else if self.eat_punct(Punct::LParen) {
                let args = self.parse_args()?;
                let span = join(expr.span, self.prev_span());
                expr = self.mk_expr(ExprKind::Call(Box::new(expr), args), span);
            } else if self.is_punct(Punct::PlusPlus)
                || self.is_punct(Punct::MinusMinus)
            {
                let op = if self.is_punct(Punct::PlusPlus) {
                    AssignOp::Add
                } else {
                    AssignOp::Sub
                };

                self.check_assign_target(&expr)?;
                let op_span = self.bump().span;
                let one = self.mk_expr(ExprKind::Int(1), op_span);
                let span = join(expr.span, op_span);

                expr = self.mk_expr(
                    ExprKind::Assign(op, Box::new(expr), Box::new(one)),
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse the remainder of an argument list after its opening `(`.
    fn parse_args(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();

        if self.eat_punct(Punct::RParen) {
            return Ok(args);
        }

        loop {
            let mode = self.parse_param_mode();
            let expr = self.parse_expr()?;

            if mode != ParamMode::Value {
                match expr.kind {
                    ExprKind::Name(_) | ExprKind::Member(..) => (),
                    _ => return Err(ParseError::InvalidRefArg(expr.span)),
                }
            }

            args.push(Arg { mode, expr });

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }

        self.expect_punct(Punct::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();

        let kind = match tok.kind {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::Str(s) => ExprKind::Str(s),

            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen)?;
                return Ok(inner);
            }

            TokenKind::Ident(ref kw)
                if kw == "link" && self.is_punct_at(1, Punct::LParen) =>
            {
                return self.parse_link();
            }

            TokenKind::Ident(kw) => match kw.as_str() {
                "true" => ExprKind::Bool(true),
                "false" => ExprKind::Bool(false),
                "null" => ExprKind::Null,
                "this" => ExprKind::This,
                "base" => ExprKind::Base,
                _ => ExprKind::Name(kw),
            },

            _ => return Err(self.unexpected("expression")),
        };

        self.bump();
        Ok(self.mk_expr(kind, tok.span))
    }

    /// `link(Selector, kind[, hint])`
    fn parse_link(&mut self) -> PResult<Expr> {
        let start = self.expect_kw("link")?;
        self.expect_punct(Punct::LParen)?;

        let selector = self.expect_ident("link target")?;
        self.expect_punct(Punct::Comma)?;

        let kind_kw = self.expect_ident("link kind")?;
        let kind = LinkKind::from_keyword(&kind_kw.name).ok_or_else(|| {
            ParseError::UnknownLinkKind(kind_kw.name.clone(), kind_kw.span)
        })?;

        let hint = if self.eat_punct(Punct::Comma) {
            let hint_kw = self.expect_ident("inlining hint")?;
            InlineHint::from_keyword(&hint_kw.name).ok_or_else(|| {
                ParseError::UnknownInlineHint(hint_kw.name.clone(), hint_kw.span)
            })?
        } else {
            InlineHint::Unspecified
        };

        let end = self.expect_punct(Punct::RParen)?;
        let span = join(start, end);

        let expr = self.mk_expr(ExprKind::Link(selector), span);
        self.links.insert(expr.id, LinkMarker { kind, hint, span });

        Ok(expr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Lex(LexError),

    Unexpected {
        found: TokenKind,
        expected: &'static str,
        span: Span,
    },

    UnknownLinkKind(String, Span),
    UnknownInlineHint(String, Span),
    UnknownAccessor(String, Span),
    DuplicateAccessor(AccessorKind, Span),
    NoAccessors(Span),
    InvalidAssignTarget(Span),
    InvalidRefArg(Span),
    VarWithoutInit(Span),
    TryWithoutHandler(Span),
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ParseError::*;

        match self {
            Lex(e) => Display::fmt(e, f),
            Unexpected {
                found, expected, ..
            } => write!(f, "expected {expected}, found {found}"),
            UnknownLinkKind(kw, _) => write!(f, "unknown link kind `{kw}`"),
            UnknownInlineHint(kw, _) => {
                write!(f, "unknown inlining hint `{kw}`")
            }
            UnknownAccessor(kw, _) => write!(f, "unexpected accessor `{kw}`"),
            DuplicateAccessor(kind, _) => {
                write!(f, "duplicate `{kind}` accessor")
            }
            NoAccessors(_) => write!(f, "declaration has no accessors"),
            InvalidAssignTarget(_) => {
                write!(f, "invalid left-hand side of assignment")
            }
            InvalidRefArg(_) => {
                write!(f, "`ref` and `out` arguments must be variables")
            }
            VarWithoutInit(_) => {
                write!(f, "implicitly-typed local must be initialized")
            }
            TryWithoutHandler(_) => {
                write!(f, "`try` requires `catch` or `finally`")
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lex(e) => Some(e),
            _ => None,
        }
    }
}

impl Diagnostic for ParseError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use ParseError::*;

        match self {
            Lex(e) => e.describe(),
            Unexpected { span, .. } => vec![span.mark_error()],
            UnknownLinkKind(_, span) => span
                .error("this kind")
                .with_help("expected one of `original`, `base`, `self`, `final`")
                .into(),
            UnknownInlineHint(_, span) => span
                .error("this hint")
                .with_help("expected `inline` or `noinline`")
                .into(),
            UnknownAccessor(_, span) => span
                .error("this accessor")
                .with_help(
                    "properties have `get` and `set`; \
                        events have `add` and `remove`",
                )
                .into(),
            DuplicateAccessor(_, span)
            | NoAccessors(span)
            | InvalidAssignTarget(span)
            | InvalidRefArg(span)
            | VarWithoutInit(span)
            | TryWithoutHandler(span) => vec![span.mark_error()],
        }
    }
}

#[cfg(test)]
mod test;
