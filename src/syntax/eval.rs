// Evaluator
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

//! Tree-walking evaluator.
//!
//! The evaluator exists to observe behavior:
//!   linking must never change what a program prints,
//!   whether link targets are inlined or remain calls.
//! It therefore models only what fixtures need to produce output.
//!
//! A run instantiates a single object of the requested class,
//!   initializes the fields of that class and all of its bases,
//!   and invokes one parameterless method.
//! Everything written through `Console.Write` and `Console.WriteLine` is
//!   captured and returned as the [`Outcome`].
//!
//! Dispatch follows the usual rules:
//!   unqualified and `this.` access is virtual
//!     (looked up from the runtime class),
//!   while `base.` and type-qualified access begin at the named class.
//! Properties and events are accessed through their accessors.
//! `ref` and `out` arguments are copied in and copied back out.
//!
//! Evaluation is bounded by [`EVAL_FUEL`];
//!   a program that exceeds it fails with [`EvalError::OutOfFuel`].

use super::ast::*;
use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    global::EVAL_FUEL,
    span::Span,
};
use fxhash::FxHashMap;
use std::{error::Error, fmt::Display};

/// Maximum depth of nested invocations.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,

    /// The one object under evaluation.
    Object,

    /// A type name used as the receiver of a static access.
    Class(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Null => Ok(()),
            Self::Object => write!(f, "object"),
            Self::Class(name) => write!(f, "{name}"),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Everything written to the console.
    pub output: String,

    /// Value returned by the entry point.
    pub value: Value,
}

/// Instantiate `class` and invoke its parameterless method `method`.
pub fn run(
    unit: &CompilationUnit,
    class: &str,
    method: &str,
) -> Result<Outcome, EvalError> {
    let runtime = unit
        .class(class)
        .ok_or_else(|| EvalError::UnknownClass(class.into()))?;

    let mut evaluator = Evaluator {
        unit,
        runtime,
        fields: FxHashMap::default(),
        output: String::new(),
        fuel: EVAL_FUEL,
        depth: 0,
    };

    evaluator.init_fields()?;

    let (decl, entry) = evaluator
        .find_method(runtime, method, 0)
        .ok_or_else(|| EvalError::UnknownMethod {
            class: class.into(),
            name: method.into(),
        })?;

    let value = evaluator
        .invoke(decl, &entry.params, &entry.body, vec![], None, entry.header.span)?
        .0;

    Ok(Outcome {
        output: evaluator.output,
        value,
    })
}

enum Flow {
    Normal,
    Break(Span),
    Continue(Span),
    Return(Value),
    Goto(Ident),
}

type EResult<T> = Result<T, EvalError>;

/// Where member lookup begins.
#[derive(Clone, Copy)]
enum Receiver<'u> {
    /// The runtime class of the object.
    Virtual,

    /// A specific class,
    ///   without virtual dispatch.
    From(&'u ClassDecl),
}

struct Frame<'u> {
    /// Class declaring the executing member,
    ///   for `base.` lookup.
    class: &'u ClassDecl,
    scopes: Vec<FxHashMap<String, Value>>,
}

impl<'u> Frame<'u> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }
}

struct Evaluator<'u> {
    unit: &'u CompilationUnit,
    runtime: &'u ClassDecl,
    fields: FxHashMap<String, Value>,
    output: String,
    fuel: u64,
    depth: usize,
}

fn default_for(ty: &TypeName) -> Value {
    match ty.0.as_str() {
        "int" | "long" | "short" | "byte" => Value::Int(0),
        "bool" => Value::Bool(false),
        _ => Value::Null,
    }
}

/// Whether `stmt` carries `label`.
fn has_label(stmt: &Stmt, label: &str) -> bool {
    match stmt {
        Stmt::Labeled(l, inner) => l.name == label || has_label(inner, label),
        _ => false,
    }
}

impl<'u> Evaluator<'u> {
    fn tick(&mut self) -> EResult<()> {
        self.fuel = self.fuel.checked_sub(1).ok_or(EvalError::OutOfFuel)?;
        Ok(())
    }

    fn base_of(&self, class: &'u ClassDecl) -> Option<&'u ClassDecl> {
        class
            .base
            .as_ref()
            .and_then(|base| self.unit.class(&base.name))
    }

    /// `class` followed by each of its bases present in the unit.
    ///
    /// The walk is bounded by the number of classes so that a cyclic
    ///   hierarchy cannot hang the evaluator.
    fn chain(&self, class: &'u ClassDecl) -> impl Iterator<Item = &'u ClassDecl> + '_ {
        std::iter::successors(Some(class), move |c| self.base_of(*c))
            .take(self.unit.classes.len())
    }

    fn find_member(
        &self,
        start: &'u ClassDecl,
        name: &str,
    ) -> Option<(&'u ClassDecl, &'u Member)> {
        self.chain(start).find_map(|class| {
            class
                .members
                .iter()
                .find(|m| m.name() == name)
                .map(|m| (class, m))
        })
    }

    fn find_method(
        &self,
        start: &'u ClassDecl,
        name: &str,
        arity: usize,
    ) -> Option<(&'u ClassDecl, &'u MethodDecl)> {
        self.chain(start).find_map(|class| {
            class.members.iter().find_map(|m| match m {
                Member::Method(method)
                    if method.header.name.name == name
                        && method.params.len() == arity =>
                {
                    Some((class, method))
                }
                _ => None,
            })
        })
    }

    fn start_class(&self, recv: Receiver<'u>) -> &'u ClassDecl {
        match recv {
            Receiver::Virtual => self.runtime,
            Receiver::From(class) => class,
        }
    }

    fn init_fields(&mut self) -> EResult<()> {
        let mut chain: Vec<_> = self.chain(self.runtime).collect();
        chain.reverse();

        for class in chain {
            let mut frame = Frame {
                class,
                scopes: vec![FxHashMap::default()],
            };

            for member in &class.members {
                if let Member::Field(field) = member {
                    let value = match &field.init {
                        Some(init) => self.eval(&mut frame, init)?,
                        None => default_for(&field.header.ty),
                    };

                    self.fields.insert(field.header.name.name.clone(), value);
                }
            }
        }

        Ok(())
    }

    /// Invoke a body with the given parameter values.
    ///
    /// Returns the result of the body along with the final value of each
    ///   parameter,
    ///     for copy-out of `ref` and `out` arguments.
    fn invoke(
        &mut self,
        class: &'u ClassDecl,
        params: &'u [Param],
        body: &'u Block,
        args: Vec<Value>,
        value: Option<Value>,
        span: Span,
    ) -> EResult<(Value, Vec<Value>)> {
        self.tick()?;

        if self.depth >= MAX_DEPTH {
            return Err(EvalError::StackOverflow(span));
        }

        let mut scope = FxHashMap::default();
        for (param, arg) in params.iter().zip(args) {
            scope.insert(param.name.name.clone(), arg);
        }
        if let Some(value) = value {
            scope.insert("value".into(), value);
        }

        let mut frame = Frame {
            class,
            scopes: vec![scope],
        };

        self.depth += 1;
        let flow = self.exec_block(&mut frame, body);
        self.depth -= 1;

        let result = match flow? {
            Flow::Normal => Value::Null,
            Flow::Return(value) => value,
            Flow::Break(span) | Flow::Continue(span) => {
                return Err(EvalError::StrayJump(span))
            }
            Flow::Goto(label) => {
                return Err(EvalError::UnknownLabel(label.name, label.span))
            }
        };

        let outs = params
            .iter()
            .map(|p| frame.scopes[0].get(&p.name.name).cloned().unwrap_or(Value::Null))
            .collect();

        Ok((result, outs))
    }

    fn exec_block(&mut self, frame: &mut Frame<'u>, block: &'u Block) -> EResult<Flow> {
        frame.scopes.push(FxHashMap::default());
        let flow = self.exec_stmts(frame, &block.stmts);
        frame.scopes.pop();
        flow
    }

    fn exec_stmts(&mut self, frame: &mut Frame<'u>, stmts: &'u [Stmt]) -> EResult<Flow> {
        let mut i = 0;

        while let Some(stmt) = stmts.get(i) {
            match self.exec(frame, stmt)? {
                Flow::Normal => i += 1,
                Flow::Goto(label) => {
                    match stmts.iter().position(|s| has_label(s, &label.name)) {
                        Some(target) => i = target,
                        None => return Ok(Flow::Goto(label)),
                    }
                }
                other => return Ok(other),
            }
        }

        Ok(Flow::Normal)
    }

    fn exec(&mut self, frame: &mut Frame<'u>, stmt: &'u Stmt) -> EResult<Flow> {
        self.tick()?;

        match stmt {
            Stmt::Block(block) => self.exec_block(frame, block),

            Stmt::Local { ty, name, init } => {
                let value = match (init, ty) {
                    (Some(init), _) => self.eval(frame, init)?,
                    (None, Some(ty)) => default_for(ty),
                    (None, None) => Value::Null,
                };
                frame.declare(&name.name, value);
                Ok(Flow::Normal)
            }

            Stmt::Expr(expr) => {
                self.eval(frame, expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Return(value, _) => Ok(Flow::Return(match value {
                Some(value) => self.eval(frame, value)?,
                None => Value::Null,
            })),

            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_bool(frame, cond)? {
                    self.exec_scoped(frame, then)
                } else if let Some(otherwise) = otherwise {
                    self.exec_scoped(frame, otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { cond, body } => {
                while self.eval_bool(frame, cond)? {
                    match self.exec_scoped(frame, body)? {
                        Flow::Break(_) => break,
                        Flow::Normal | Flow::Continue(_) => (),
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                frame.scopes.push(FxHashMap::default());
                let flow = self.exec_for(frame, init.as_deref(), cond.as_ref(), step, body);
                frame.scopes.pop();
                flow
            }

            Stmt::Break(span) => Ok(Flow::Break(*span)),
            Stmt::Continue(span) => Ok(Flow::Continue(*span)),
            Stmt::Goto(label) => Ok(Flow::Goto(label.clone())),
            Stmt::Labeled(_, inner) => self.exec(frame, inner),

            Stmt::Throw(value) => Err(EvalError::Thrown(self.eval(frame, value)?)),

            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                let mut result = self.exec_block(frame, body);

                if let (Err(EvalError::Thrown(exception)), Some(catch)) =
                    (&result, catch)
                {
                    let exception = exception.clone();

                    frame.scopes.push(FxHashMap::default());
                    if let Some(name) = &catch.name {
                        frame.declare(&name.name, exception);
                    }
                    result = self.exec_block(frame, &catch.body);
                    frame.scopes.pop();
                }

                match finally {
                    Some(finally) => match self.exec_block(frame, finally)? {
                        Flow::Normal => result,
                        other => Ok(other),
                    },
                    None => result,
                }
            }

            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    /// Execute an embedded statement in its own scope.
    fn exec_scoped(&mut self, frame: &mut Frame<'u>, stmt: &'u Stmt) -> EResult<Flow> {
        frame.scopes.push(FxHashMap::default());
        let flow = self.exec(frame, stmt);
        frame.scopes.pop();
        flow
    }

    fn exec_for(
        &mut self,
        frame: &mut Frame<'u>,
        init: Option<&'u Stmt>,
        cond: Option<&'u Expr>,
        step: &'u [Expr],
        body: &'u Stmt,
    ) -> EResult<Flow> {
        if let Some(init) = init {
            self.exec(frame, init)?;
        }

        loop {
            if let Some(cond) = cond {
                if !self.eval_bool(frame, cond)? {
                    break;
                }
            } else {
                self.tick()?;
            }

            match self.exec_scoped(frame, body)? {
                Flow::Break(_) => break,
                Flow::Normal | Flow::Continue(_) => (),
                other => return Ok(other),
            }

            for expr in step {
                self.eval(frame, expr)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn eval_bool(&mut self, frame: &mut Frame<'u>, expr: &'u Expr) -> EResult<bool> {
        match self.eval(frame, expr)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalError::TypeMismatch("bool", expr.span)),
        }
    }

    fn eval_int(&mut self, frame: &mut Frame<'u>, expr: &'u Expr) -> EResult<i64> {
        match self.eval(frame, expr)? {
            Value::Int(n) => Ok(n),
            _ => Err(EvalError::TypeMismatch("int", expr.span)),
        }
    }

    fn is_class(&self, frame: &Frame<'u>, name: &str) -> bool {
        frame.lookup(name).is_none()
            && !self.fields.contains_key(name)
            && self.unit.class(name).is_some()
    }

    fn receiver(&mut self, frame: &mut Frame<'u>, target: &'u Expr) -> EResult<Receiver<'u>> {
        match &target.kind {
            ExprKind::This => Ok(Receiver::Virtual),
            ExprKind::Base => self
                .base_of(frame.class)
                .map(Receiver::From)
                .ok_or(EvalError::NoBaseClass(target.span)),
            ExprKind::Name(name) if self.is_class(frame, name) => {
                Ok(self.unit.class(name).map(Receiver::From).unwrap_or(Receiver::Virtual))
            }
            _ => match self.eval(frame, target)? {
                Value::Object => Ok(Receiver::Virtual),
                Value::Class(name) => self
                    .unit
                    .class(&name)
                    .map(Receiver::From)
                    .ok_or(EvalError::UnknownName(name, target.span)),
                Value::Null => Err(EvalError::Thrown(Value::Str(
                    "NullReferenceException".into(),
                ))),
                _ => Err(EvalError::TypeMismatch("object", target.span)),
            },
        }
    }

    fn eval(&mut self, frame: &mut Frame<'u>, expr: &'u Expr) -> EResult<Value> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::This => Ok(Value::Object),
            ExprKind::Base => Err(EvalError::Unsupported("bare `base`", expr.span)),

            ExprKind::Name(name) => {
                if let Some(value) = frame.lookup(name) {
                    return Ok(value.clone());
                }
                self.read_member(Receiver::Virtual, name, expr.span)
            }

            ExprKind::Member(target, name) => {
                let recv = self.receiver(frame, target)?;
                self.read_member(recv, &name.name, name.span)
            }

            ExprKind::Call(callee, args) => self.eval_call(frame, callee, args, expr.span),

            ExprKind::Unary(UnaryOp::Not, operand) => {
                Ok(Value::Bool(!self.eval_bool(frame, operand)?))
            }
            ExprKind::Unary(UnaryOp::Neg, operand) => {
                Ok(Value::Int(self.eval_int(frame, operand)?.wrapping_neg()))
            }

            ExprKind::Cast(_, operand) => self.eval(frame, operand),

            ExprKind::Binary(BinaryOp::And, lhs, rhs) => Ok(Value::Bool(
                self.eval_bool(frame, lhs)? && self.eval_bool(frame, rhs)?,
            )),
            ExprKind::Binary(BinaryOp::Or, lhs, rhs) => Ok(Value::Bool(
                self.eval_bool(frame, lhs)? || self.eval_bool(frame, rhs)?,
            )),
            ExprKind::Binary(op, lhs, rhs) => {
                let l = self.eval(frame, lhs)?;
                let r = self.eval(frame, rhs)?;
                binary(*op, l, r, expr.span)
            }

            ExprKind::Assign(op, target, value) => {
                self.eval_assign(frame, *op, target, value, expr.span)
            }

            ExprKind::Link(_) => Err(EvalError::UnresolvedLink(expr.span)),
        }
    }

    fn read_member(&mut self, recv: Receiver<'u>, name: &str, span: Span) -> EResult<Value> {
        let start = self.start_class(recv);

        match self.find_member(start, name) {
            Some((_, Member::Field(_))) => {
                Ok(self.fields.get(name).cloned().unwrap_or(Value::Null))
            }
            Some((class, Member::Property(prop))) => {
                let getter = accessor(&prop.accessors, AccessorKind::Get)
                    .ok_or_else(|| EvalError::NoSuchMember(format!("{name}.get"), span))?;
                Ok(self.invoke(class, &[], &getter.body, vec![], None, span)?.0)
            }
            Some(_) => Err(EvalError::Unsupported("method group", span)),
            None if self.unit.class(name).is_some() => Ok(Value::Class(name.into())),
            None => Err(EvalError::UnknownName(name.into(), span)),
        }
    }

    /// Store into a local, field, or property setter.
    fn write(&mut self, frame: &mut Frame<'u>, target: &'u Expr, value: Value) -> EResult<()> {
        let (recv, name, span) = match &target.kind {
            ExprKind::Name(name) => {
                if let Some(slot) = frame.lookup_mut(name) {
                    *slot = value;
                    return Ok(());
                }
                if name == DISCARD {
                    return Ok(());
                }
                (Receiver::Virtual, name.as_str(), target.span)
            }
            ExprKind::Member(obj, name) => {
                (self.receiver(frame, obj)?, name.name.as_str(), name.span)
            }
            ExprKind::Link(_) => return Err(EvalError::UnresolvedLink(target.span)),
            _ => return Err(EvalError::Unsupported("assignment target", target.span)),
        };

        let start = self.start_class(recv);

        match self.find_member(start, name) {
            Some((_, Member::Field(_))) => {
                self.fields.insert(name.to_string(), value);
                Ok(())
            }
            Some((class, Member::Property(prop))) => {
                let setter = accessor(&prop.accessors, AccessorKind::Set)
                    .ok_or_else(|| EvalError::NoSuchMember(format!("{name}.set"), span))?;
                self.invoke(class, &[], &setter.body, vec![], Some(value), span)?;
                Ok(())
            }
            Some(_) => Err(EvalError::Unsupported("assignment to method", span)),
            None => Err(EvalError::UnknownName(name.into(), span)),
        }
    }

    /// If `target` names an event,
    ///   its declaring class and declaration.
    fn event_target(
        &mut self,
        frame: &mut Frame<'u>,
        target: &'u Expr,
    ) -> EResult<Option<(&'u ClassDecl, &'u EventDecl)>> {
        let (recv, name) = match &target.kind {
            ExprKind::Name(name) if frame.lookup(name).is_none() => {
                (Receiver::Virtual, name.as_str())
            }
            ExprKind::Member(obj, name) => (self.receiver(frame, obj)?, name.name.as_str()),
            _ => return Ok(None),
        };

        let start = self.start_class(recv);

        Ok(match self.find_member(start, name) {
            Some((class, Member::Event(event))) => Some((class, event)),
            _ => None,
        })
    }

    fn eval_assign(
        &mut self,
        frame: &mut Frame<'u>,
        op: AssignOp,
        target: &'u Expr,
        value: &'u Expr,
        span: Span,
    ) -> EResult<Value> {
        if op != AssignOp::Assign {
            if let Some((class, event)) = self.event_target(frame, target)? {
                let kind = match op {
                    AssignOp::Add => AccessorKind::Add,
                    _ => AccessorKind::Remove,
                };

                let acc = accessor(&event.accessors, kind).ok_or_else(|| {
                    EvalError::NoSuchMember(
                        format!("{}.{kind}", event.header.name),
                        span,
                    )
                })?;

                let handler = self.eval(frame, value)?;
                self.invoke(class, &[], &acc.body, vec![], Some(handler), span)?;
                return Ok(Value::Null);
            }
        }

        let rhs = self.eval(frame, value)?;

        let new = match op {
            AssignOp::Assign => rhs,
            AssignOp::Add => binary(BinaryOp::Add, self.eval(frame, target)?, rhs, span)?,
            AssignOp::Sub => binary(BinaryOp::Sub, self.eval(frame, target)?, rhs, span)?,
        };

        self.write(frame, target, new.clone())?;
        Ok(new)
    }

    fn eval_call(
        &mut self,
        frame: &mut Frame<'u>,
        callee: &'u Expr,
        args: &'u [Arg],
        span: Span,
    ) -> EResult<Value> {
        let (recv, name) = match &callee.kind {
            ExprKind::Name(name) => (Receiver::Virtual, name),

            ExprKind::Member(target, name) => {
                if let ExprKind::Name(obj) = &target.kind {
                    if obj == "Console"
                        && frame.lookup(obj).is_none()
                        && !self.fields.contains_key(obj)
                        && self.unit.class(obj).is_none()
                    {
                        return self.console(frame, &name.name, args, span);
                    }
                }

                (self.receiver(frame, target)?, &name.name)
            }

            ExprKind::Link(_) => return Err(EvalError::UnresolvedLink(callee.span)),
            _ => return Err(EvalError::Unsupported("call target", callee.span)),
        };

        let start = self.start_class(recv);
        let (class, method) = self
            .find_method(start, name, args.len())
            .ok_or_else(|| EvalError::NoSuchMember(name.clone(), callee.span))?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match arg.mode {
                ParamMode::Out => Value::Null,
                _ => self.eval(frame, &arg.expr)?,
            });
        }

        let (result, outs) =
            self.invoke(class, &method.params, &method.body, values, None, span)?;

        for (arg, out) in args.iter().zip(outs) {
            if arg.mode != ParamMode::Value {
                self.write(frame, &arg.expr, out)?;
            }
        }

        Ok(result)
    }

    fn console(
        &mut self,
        frame: &mut Frame<'u>,
        method: &str,
        args: &'u [Arg],
        span: Span,
    ) -> EResult<Value> {
        let newline = match method {
            "Write" => false,
            "WriteLine" => true,
            _ => return Err(EvalError::NoSuchMember(format!("Console.{method}"), span)),
        };

        for arg in args {
            let value = self.eval(frame, &arg.expr)?;
            self.output.push_str(&value.to_string());
        }

        if newline {
            self.output.push('\n');
        }

        Ok(Value::Null)
    }
}

fn binary(op: BinaryOp, l: Value, r: Value, span: Span) -> EResult<Value> {
    use BinaryOp::*;

    match (op, l, r) {
        (Add, l @ Value::Str(_), r) | (Add, l, r @ Value::Str(_)) => {
            Ok(Value::Str(format!("{l}{r}")))
        }

        (Eq, l, r) => Ok(Value::Bool(l == r)),
        (Ne, l, r) => Ok(Value::Bool(l != r)),

        (Div | Rem, Value::Int(_), Value::Int(0)) => Err(EvalError::Thrown(
            Value::Str("DivideByZeroException".into()),
        )),

        (op, Value::Int(a), Value::Int(b)) => Ok(match op {
            Add => Value::Int(a.wrapping_add(b)),
            Sub => Value::Int(a.wrapping_sub(b)),
            Mul => Value::Int(a.wrapping_mul(b)),
            Div => Value::Int(a.wrapping_div(b)),
            Rem => Value::Int(a.wrapping_rem(b)),
            Lt => Value::Bool(a < b),
            Le => Value::Bool(a <= b),
            Gt => Value::Bool(a > b),
            Ge => Value::Bool(a >= b),
            Eq | Ne | And | Or => {
                return Err(EvalError::TypeMismatch("bool", span))
            }
        }),

        _ => Err(EvalError::TypeMismatch("int", span)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    UnknownClass(String),
    UnknownMethod { class: String, name: String },
    UnknownName(String, Span),
    NoSuchMember(String, Span),
    NoBaseClass(Span),
    TypeMismatch(&'static str, Span),
    Unsupported(&'static str, Span),
    UnresolvedLink(Span),
    UnknownLabel(String, Span),
    StrayJump(Span),
    StackOverflow(Span),

    /// An exception escaped the entry point.
    Thrown(Value),

    OutOfFuel,
}

impl Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use EvalError::*;

        match self {
            UnknownClass(name) => write!(f, "unknown class `{name}`"),
            UnknownMethod { class, name } => {
                write!(f, "class `{class}` has no parameterless method `{name}`")
            }
            UnknownName(name, _) => write!(f, "unknown name `{name}`"),
            NoSuchMember(name, _) => write!(f, "no member `{name}`"),
            NoBaseClass(_) => write!(f, "`base` used in a class without a base"),
            TypeMismatch(expected, _) => write!(f, "expected a value of type {expected}"),
            Unsupported(what, _) => write!(f, "{what} cannot be evaluated"),
            UnresolvedLink(_) => write!(f, "link marker was never resolved"),
            UnknownLabel(label, _) => write!(f, "no label `{label}` is in scope"),
            StrayJump(_) => write!(f, "`break` or `continue` outside of a loop"),
            StackOverflow(_) => write!(f, "invocation depth exceeded {MAX_DEPTH}"),
            Thrown(value) => write!(f, "uncaught exception: {value}"),
            OutOfFuel => write!(f, "evaluation exceeded {EVAL_FUEL} steps"),
        }
    }
}

impl Error for EvalError {}

impl Diagnostic for EvalError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use EvalError::*;

        match self {
            UnknownClass(_) | UnknownMethod { .. } | Thrown(_) | OutOfFuel => vec![],
            UnknownName(_, span)
            | NoSuchMember(_, span)
            | NoBaseClass(span)
            | TypeMismatch(_, span)
            | Unsupported(_, span)
            | UnknownLabel(_, span)
            | StrayJump(span) => vec![span.mark_error()],
            UnresolvedLink(span) => span
                .error("this marker")
                .with_help("run the linker before evaluating")
                .into(),
            StackOverflow(span) => vec![span.error("while invoking this")],
        }
    }
}

#[cfg(test)]
mod test;
