// Source printer
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

//! Deterministic rendering of syntax trees back into source text.
//!
//! Output is Allman-style with four-space indentation and a blank line
//!   between members and between classes.
//! Parentheses are emitted only where operator precedence requires them,
//!   so printing a freshly parsed tree and parsing the result again
//!   yields an equivalent tree.
//!
//! Rendering is a pure function of the tree and its [`LinkTable`];
//!   printing the same tree twice is byte-for-byte identical.

use super::ast::*;
use std::fmt::{self, Display, Formatter};

const INDENT: &str = "    ";

/// Render a compilation unit.
pub fn print_unit(unit: &CompilationUnit, links: &LinkTable) -> String {
    Printed { unit, links }.to_string()
}

/// [`Display`] for a [`CompilationUnit`].
pub struct Printed<'a> {
    pub unit: &'a CompilationUnit,
    pub links: &'a LinkTable,
}

impl<'a> Display for Printed<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let p = P { links: self.links };

        if !self.unit.attrs.is_empty() {
            for attr in &self.unit.attrs {
                write!(f, "[assembly: ")?;
                p.attr_body(f, attr)?;
                write!(f, "]\n")?;
            }

            if !self.unit.classes.is_empty() {
                write!(f, "\n")?;
            }
        }

        for (i, class) in self.unit.classes.iter().enumerate() {
            if i > 0 {
                write!(f, "\n")?;
            }
            p.class(f, class)?;
        }

        Ok(())
    }
}

/// [`Display`] for a single expression,
///   used for logging.
pub struct PrintedExpr<'a> {
    pub expr: &'a Expr,
    pub links: &'a LinkTable,
}

impl<'a> Display for PrintedExpr<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        P { links: self.links }.expr(f, self.expr, PREC_ASSIGN)
    }
}

const PREC_ASSIGN: u8 = 1;
const PREC_UNARY: u8 = 8;
const PREC_POSTFIX: u8 = 9;

fn prec(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Assign(..) => PREC_ASSIGN,
        ExprKind::Binary(op, ..) => op.precedence(),
        ExprKind::Unary(..) | ExprKind::Cast(..) => PREC_UNARY,
        _ => PREC_POSTFIX,
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    (0..depth).try_for_each(|_| f.write_str(INDENT))
}

fn write_str_lit(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;

    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            _ => write!(f, "{c}")?,
        }
    }

    f.write_str("\"")
}

struct P<'a> {
    links: &'a LinkTable,
}

impl<'a> P<'a> {
    fn attr_body(&self, f: &mut Formatter<'_>, attr: &Attribute) -> fmt::Result {
        write!(f, "{}", attr.name)?;

        if !attr.args.is_empty() {
            write!(f, "(")?;
            self.comma_exprs(f, attr.args.iter())?;
            write!(f, ")")?;
        }

        Ok(())
    }

    fn attrs(
        &self,
        f: &mut Formatter<'_>,
        attrs: &[Attribute],
        depth: usize,
    ) -> fmt::Result {
        for attr in attrs {
            indent(f, depth)?;
            write!(f, "[")?;
            self.attr_body(f, attr)?;
            write!(f, "]\n")?;
        }

        Ok(())
    }

    fn modifiers(&self, f: &mut Formatter<'_>, mods: &Modifiers) -> fmt::Result {
        mods.0.iter().try_for_each(|m| write!(f, "{m} "))
    }

    fn class(&self, f: &mut Formatter<'_>, class: &ClassDecl) -> fmt::Result {
        self.attrs(f, &class.attrs, 0)?;
        self.modifiers(f, &class.modifiers)?;
        write!(f, "class {}", class.name)?;

        if let Some(base) = &class.base {
            write!(f, " : {base}")?;
        }

        write!(f, "\n{{\n")?;

        for (i, member) in class.members.iter().enumerate() {
            if i > 0 {
                write!(f, "\n")?;
            }
            self.member(f, member, 1)?;
        }

        write!(f, "}}\n")
    }

    fn header(
        &self,
        f: &mut Formatter<'_>,
        header: &MemberHeader,
        event: bool,
        depth: usize,
    ) -> fmt::Result {
        self.attrs(f, &header.attrs, depth)?;
        indent(f, depth)?;
        self.modifiers(f, &header.modifiers)?;

        if event {
            write!(f, "event ")?;
        }

        write!(f, "{} {}", header.ty, header.name)
    }

    fn member(
        &self,
        f: &mut Formatter<'_>,
        member: &Member,
        depth: usize,
    ) -> fmt::Result {
        match member {
            Member::Field(field) => {
                self.header(f, &field.header, false, depth)?;

                if let Some(init) = &field.init {
                    write!(f, " = ")?;
                    self.expr(f, init, PREC_ASSIGN)?;
                }

                write!(f, ";\n")
            }

            Member::Method(method) => {
                self.header(f, &method.header, false, depth)?;
                write!(f, "(")?;

                for (i, param) in method.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(kw) = param.mode.keyword() {
                        write!(f, "{kw} ")?;
                    }
                    write!(f, "{} {}", param.ty, param.name)?;
                }

                write!(f, ")\n")?;
                self.block(f, &method.body, depth)
            }

            Member::Property(prop) => {
                self.header(f, &prop.header, false, depth)?;
                self.accessors(f, &prop.accessors, depth)
            }

            Member::Event(event) => {
                self.header(f, &event.header, true, depth)?;
                self.accessors(f, &event.accessors, depth)
            }
        }
    }

    fn accessors(
        &self,
        f: &mut Formatter<'_>,
        accessors: &[Accessor],
        depth: usize,
    ) -> fmt::Result {
        write!(f, "\n")?;
        indent(f, depth)?;
        write!(f, "{{\n")?;

        for acc in accessors {
            indent(f, depth + 1)?;
            write!(f, "{}\n", acc.kind)?;
            self.block(f, &acc.body, depth + 1)?;
        }

        indent(f, depth)?;
        write!(f, "}}\n")
    }

    fn block(&self, f: &mut Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
        indent(f, depth)?;
        write!(f, "{{\n")?;

        for stmt in &block.stmts {
            self.stmt(f, stmt, depth + 1)?;
        }

        indent(f, depth)?;
        write!(f, "}}\n")
    }

    /// A statement nested beneath `if`, `while` or `for`.
    ///
    /// Blocks stay at the depth of their owner;
    ///   anything else is indented one level.
    fn nested(&self, f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
        match stmt {
            Stmt::Block(block) => self.block(f, block, depth),
            _ => self.stmt(f, stmt, depth + 1),
        }
    }

    /// A local declaration without indentation or terminator.
    fn local(
        &self,
        f: &mut Formatter<'_>,
        ty: &Option<TypeName>,
        name: &Ident,
        init: &Option<Expr>,
    ) -> fmt::Result {
        match ty {
            Some(ty) => write!(f, "{ty} {name}")?,
            None => write!(f, "var {name}")?,
        }

        if let Some(init) = init {
            write!(f, " = ")?;
            self.expr(f, init, PREC_ASSIGN)?;
        }

        Ok(())
    }

    fn stmt(&self, f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
        match stmt {
            Stmt::Block(block) => return self.block(f, block, depth),
            Stmt::Labeled(label, inner) => {
                indent(f, depth)?;
                write!(f, "{label}:\n")?;
                return self.stmt(f, inner, depth);
            }
            _ => indent(f, depth)?,
        }

        match stmt {
            Stmt::Block(_) | Stmt::Labeled(..) => Ok(()),

            Stmt::Local { ty, name, init } => {
                self.local(f, ty, name, init)?;
                write!(f, ";\n")
            }

            Stmt::Expr(expr) => {
                self.expr(f, expr, PREC_ASSIGN)?;
                write!(f, ";\n")
            }

            Stmt::Return(None, _) => write!(f, "return;\n"),
            Stmt::Return(Some(value), _) => {
                write!(f, "return ")?;
                self.expr(f, value, PREC_ASSIGN)?;
                write!(f, ";\n")
            }

            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                write!(f, "if (")?;
                self.expr(f, cond, PREC_ASSIGN)?;
                write!(f, ")\n")?;

                match (&**then, otherwise) {
                    // Keep a trailing `else` from binding to a nested `if`.
                    (Stmt::If { otherwise: None, .. }, Some(_)) => self.block(
                        f,
                        &Block::new(vec![(**then).clone()]),
                        depth,
                    )?,
                    _ => self.nested(f, then, depth)?,
                }

                if let Some(otherwise) = otherwise {
                    indent(f, depth)?;
                    write!(f, "else\n")?;
                    self.nested(f, otherwise, depth)?;
                }

                Ok(())
            }

            Stmt::While { cond, body } => {
                write!(f, "while (")?;
                self.expr(f, cond, PREC_ASSIGN)?;
                write!(f, ")\n")?;
                self.nested(f, body, depth)
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                write!(f, "for (")?;

                match init.as_deref() {
                    Some(Stmt::Local { ty, name, init }) => {
                        self.local(f, ty, name, init)?
                    }
                    Some(Stmt::Expr(expr)) => self.expr(f, expr, PREC_ASSIGN)?,
                    _ => (),
                }

                write!(f, ";")?;

                if let Some(cond) = cond {
                    write!(f, " ")?;
                    self.expr(f, cond, PREC_ASSIGN)?;
                }

                write!(f, ";")?;

                if !step.is_empty() {
                    write!(f, " ")?;
                    self.comma_exprs(f, step.iter())?;
                }

                write!(f, ")\n")?;
                self.nested(f, body, depth)
            }

            Stmt::Break(_) => write!(f, "break;\n"),
            Stmt::Continue(_) => write!(f, "continue;\n"),
            Stmt::Goto(label) => write!(f, "goto {label};\n"),

            Stmt::Throw(value) => {
                write!(f, "throw ")?;
                self.expr(f, value, PREC_ASSIGN)?;
                write!(f, ";\n")
            }

            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                write!(f, "try\n")?;
                self.block(f, body, depth)?;

                if let Some(catch) = catch {
                    indent(f, depth)?;
                    write!(f, "catch")?;

                    match (&catch.ty, &catch.name) {
                        (Some(ty), Some(name)) => write!(f, " ({ty} {name})")?,
                        (Some(ty), None) => write!(f, " ({ty})")?,
                        _ => (),
                    }

                    write!(f, "\n")?;
                    self.block(f, &catch.body, depth)?;
                }

                if let Some(finally) = finally {
                    indent(f, depth)?;
                    write!(f, "finally\n")?;
                    self.block(f, finally, depth)?;
                }

                Ok(())
            }

            Stmt::Empty => write!(f, ";\n"),
        }
    }

    fn comma_exprs<'e>(
        &self,
        f: &mut Formatter<'_>,
        exprs: impl Iterator<Item = &'e Expr>,
    ) -> fmt::Result {
        for (i, expr) in exprs.enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.expr(f, expr, PREC_ASSIGN)?;
        }

        Ok(())
    }

    /// Render `expr`,
    ///   parenthesized if it binds more loosely than `min`.
    fn expr(&self, f: &mut Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
        let parens = prec(expr) < min;

        if parens {
            write!(f, "(")?;
        }

        match &expr.kind {
            ExprKind::Int(n) => write!(f, "{n}")?,
            ExprKind::Str(s) => write_str_lit(f, s)?,
            ExprKind::Bool(b) => write!(f, "{b}")?,
            ExprKind::Null => write!(f, "null")?,
            ExprKind::Name(name) => write!(f, "{name}")?,
            ExprKind::This => write!(f, "this")?,
            ExprKind::Base => write!(f, "base")?,

            ExprKind::Member(target, name) => {
                self.expr(f, target, PREC_POSTFIX)?;
                write!(f, ".{name}")?;
            }

            ExprKind::Call(callee, args) => {
                self.expr(f, callee, PREC_POSTFIX)?;
                write!(f, "(")?;

                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(kw) = arg.mode.keyword() {
                        write!(f, "{kw} ")?;
                    }
                    self.expr(f, &arg.expr, PREC_ASSIGN)?;
                }

                write!(f, ")")?;
            }

            ExprKind::Unary(op, operand) => {
                write!(
                    f,
                    "{}",
                    match op {
                        UnaryOp::Not => "!",
                        UnaryOp::Neg => "-",
                    }
                )?;
                self.unary_operand(f, operand)?;
            }

            ExprKind::Cast(ty, operand) => {
                write!(f, "({ty})")?;
                self.unary_operand(f, operand)?;
            }

            ExprKind::Binary(op, lhs, rhs) => {
                let p = op.precedence();
                self.expr(f, lhs, p)?;
                write!(f, " {} ", op.symbol())?;
                self.expr(f, rhs, p + 1)?;
            }

            ExprKind::Assign(op, target, value) => {
                self.expr(f, target, PREC_ASSIGN + 1)?;
                write!(f, " {} ", op.symbol())?;
                self.expr(f, value, PREC_ASSIGN)?;
            }

            ExprKind::Link(selector) => match self.links.get(expr.id) {
                Some(marker) => {
                    write!(f, "link({selector}, {}", marker.kind)?;
                    if let Some(hint) = marker.hint.keyword() {
                        write!(f, ", {hint}")?;
                    }
                    write!(f, ")")?;
                }
                None => write!(f, "{selector}")?,
            },
        }

        if parens {
            write!(f, ")")?;
        }

        Ok(())
    }

    /// Operand of a prefix operator or cast.
    ///
    /// A negated operand is parenthesized so that `- -x` does not print
    ///   as a decrement and `(T)-x` is not read back as a subtraction.
    fn unary_operand(&self, f: &mut Formatter<'_>, operand: &Expr) -> fmt::Result {
        match operand.kind {
            ExprKind::Unary(UnaryOp::Neg, _) => self.expr(f, operand, PREC_POSTFIX),
            _ => self.expr(f, operand, PREC_UNARY),
        }
    }
}

#[cfg(test)]
mod test;
