// Tests for the parser
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

use super::*;
use crate::span::dummy::DUMMY_CONTEXT;

fn sut(src: &str) -> ParsedUnit {
    parse(DUMMY_CONTEXT, src).unwrap()
}

fn only_method(parsed: &ParsedUnit) -> &MethodDecl {
    match &parsed.unit.classes[0].members[0] {
        Member::Method(m) => m,
        other => panic!("expected method, found {other:?}"),
    }
}

#[test]
fn parses_assembly_attributes_and_class() {
    let parsed = sut(
        r#"
        [assembly: LayerOrder("A", "B:Sub")]
        public class Foo : Bar
        {
            private int x = 1;
        }
        "#,
    );

    let attrs = &parsed.unit.attrs;
    assert_eq!(1, attrs.len());
    assert_eq!("LayerOrder", attrs[0].name.name);
    assert_eq!(Some("A"), attrs[0].str_arg(0));
    assert_eq!(Some("B:Sub"), attrs[0].str_arg(1));

    let class = &parsed.unit.classes[0];
    assert_eq!("Foo", class.name.name);
    assert_eq!(Some("Bar"), class.base.as_ref().map(|b| b.name.as_str()));
    assert_eq!(Modifiers(vec![Modifier::Public]), class.modifiers);

    match &class.members[0] {
        Member::Field(f) => {
            assert_eq!("x", f.header.name.name);
            assert_eq!(TypeName::from("int"), f.header.ty);
            assert!(matches!(
                f.init.as_ref().map(|e| &e.kind),
                Some(ExprKind::Int(1))
            ));
        }
        other => panic!("expected field, found {other:?}"),
    }
}

#[test]
fn parses_member_attributes_and_params() {
    let parsed = sut(
        r#"
        class Foo
        {
            [Override(Bar, "A"), NotInlineable]
            public virtual int Bar(int a, ref int b, out string c) { return a; }
        }
        "#,
    );

    let m = only_method(&parsed);

    assert_eq!(2, m.header.attrs.len());
    assert_eq!(Some("Bar"), m.header.attr("Override").and_then(|a| a.name_arg(0)));
    assert_eq!(Some("A"), m.header.attr("Override").and_then(|a| a.str_arg(1)));
    assert!(m.header.attr("NotInlineable").is_some());

    assert_eq!(
        vec![ParamMode::Value, ParamMode::Ref, ParamMode::Out],
        m.params.iter().map(|p| p.mode).collect::<Vec<_>>(),
    );
    assert_eq!(
        Modifiers(vec![Modifier::Public, Modifier::Virtual]),
        m.header.modifiers
    );
}

#[test]
fn parses_properties_and_events() {
    let parsed = sut(
        r#"
        class Foo
        {
            int P { get { return 1; } set { } }
            event Handler E { add { } remove { } }
        }
        "#,
    );

    let class = &parsed.unit.classes[0];

    match &class.members[0] {
        Member::Property(p) => assert_eq!(
            vec![AccessorKind::Get, AccessorKind::Set],
            p.accessors.iter().map(|a| a.kind).collect::<Vec<_>>(),
        ),
        other => panic!("expected property, found {other:?}"),
    }

    match &class.members[1] {
        Member::Event(e) => {
            assert_eq!(TypeName::from("Handler"), e.header.ty);
            assert_eq!(
                vec![AccessorKind::Add, AccessorKind::Remove],
                e.accessors.iter().map(|a| a.kind).collect::<Vec<_>>(),
            );
        }
        other => panic!("expected event, found {other:?}"),
    }
}

#[test]
fn link_markers_go_to_side_table() {
    let parsed = sut(
        r#"
        class Foo
        {
            void Bar() { link(Bar, base, noinline)(); link(Bar, final)(); }
        }
        "#,
    );

    let m = only_method(&parsed);
    let mut markers = Vec::new();

    for stmt in &m.body.stmts {
        let Stmt::Expr(e) = stmt else {
            panic!("expected expression statement")
        };

        e.walk(&mut |x| {
            if let ExprKind::Link(sel) = &x.kind {
                let marker = parsed.links.get(x.id).unwrap();
                markers.push((sel.name.clone(), marker.kind, marker.hint));
            }
        });
    }

    assert_eq!(
        vec![
            ("Bar".to_string(), LinkKind::Base, InlineHint::NoInline),
            ("Bar".to_string(), LinkKind::Final, InlineHint::Unspecified),
        ],
        markers,
    );
    assert_eq!(2, parsed.links.len());
}

#[test]
fn link_is_an_ordinary_name_without_parens() {
    let parsed = sut("class Foo { void Bar() { link = 1; } }");

    assert!(parsed.links.is_empty());
}

#[test]
fn node_ids_are_unique_and_next_id_follows() {
    let parsed = sut("class Foo { int Bar(int a) { return a + 1 * 2; } }");
    let m = only_method(&parsed);

    let mut ids = Vec::new();
    if let Stmt::Return(Some(e), _) = &m.body.stmts[0] {
        e.walk(&mut |x| ids.push(x.id));
    }

    assert_eq!(5, ids.len());

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(5, sorted.len());

    assert!(ids.iter().all(|id| *id < parsed.next_id));
}

#[test]
fn binary_precedence_and_assignment_associativity() {
    let parsed = sut("class Foo { void Bar() { a = b = 1 + 2 * 3 == 7 && c; } }");
    let m = only_method(&parsed);

    let Stmt::Expr(e) = &m.body.stmts[0] else {
        panic!("expected expression statement")
    };

    let ExprKind::Assign(AssignOp::Assign, _, rhs) = &e.kind else {
        panic!("expected assignment")
    };
    let ExprKind::Assign(AssignOp::Assign, _, rhs) = &rhs.kind else {
        panic!("expected nested assignment")
    };
    let ExprKind::Binary(BinaryOp::And, lhs, _) = &rhs.kind else {
        panic!("expected &&")
    };
    let ExprKind::Binary(BinaryOp::Eq, lhs, _) = &lhs.kind else {
        panic!("expected ==")
    };
    let ExprKind::Binary(BinaryOp::Add, _, rhs) = &lhs.kind else {
        panic!("expected +")
    };
    assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
}

#[test]
fn increment_is_compound_assignment() {
    let parsed = sut("class Foo { void Bar() { i++; } }");
    let m = only_method(&parsed);

    let Stmt::Expr(e) = &m.body.stmts[0] else {
        panic!("expected expression statement")
    };

    match &e.kind {
        ExprKind::Assign(AssignOp::Add, target, one) => {
            assert_eq!(Some("i"), target.as_name());
            assert!(matches!(one.kind, ExprKind::Int(1)));
        }
        other => panic!("expected +=, found {other:?}"),
    }
}

#[test]
fn casts_versus_parenthesized_expressions() {
    let parsed = sut("class Foo { void Bar() { x = (int)y; x = (a) - b; } }");
    let m = only_method(&parsed);

    let rhs = |n: usize| match &m.body.stmts[n] {
        Stmt::Expr(Expr {
            kind: ExprKind::Assign(_, _, rhs),
            ..
        }) => rhs.kind.clone(),
        other => panic!("unexpected {other:?}"),
    };

    assert!(matches!(rhs(0), ExprKind::Cast(TypeName(ref t), _) if t == "int"));
    assert!(matches!(rhs(1), ExprKind::Binary(BinaryOp::Sub, _, _)));
}

#[test]
fn parses_statement_forms() {
    let parsed = sut(
        r#"
        class Foo
        {
            void Bar()
            {
                int a;
                var b = 2;
                System.String s = "x";
                if (a < b) return; else { }
                while (true) break;
                for (int i = 0; i < 3; i++, a--) continue;
                for (;;) { }
                goto done;
                done: ;
                try { throw e; } catch (Exception ex) { } finally { }
                try { } catch { }
            }
        }
        "#,
    );

    let stmts = &only_method(&parsed).body.stmts;

    assert!(matches!(&stmts[0], Stmt::Local { ty: Some(_), init: None, .. }));
    assert!(matches!(&stmts[1], Stmt::Local { ty: None, init: Some(_), .. }));
    assert!(matches!(
        &stmts[2],
        Stmt::Local { ty: Some(TypeName(t)), .. } if t == "System.String"
    ));
    assert!(matches!(&stmts[3], Stmt::If { otherwise: Some(_), .. }));
    assert!(matches!(&stmts[4], Stmt::While { .. }));
    assert!(matches!(&stmts[5], Stmt::For { init: Some(_), cond: Some(_), step, .. } if step.len() == 2));
    assert!(matches!(&stmts[6], Stmt::For { init: None, cond: None, .. }));
    assert!(matches!(&stmts[7], Stmt::Goto(l) if l.name == "done"));
    assert!(matches!(&stmts[8], Stmt::Labeled(l, s) if l.name == "done" && **s == Stmt::Empty));
    assert!(matches!(
        &stmts[9],
        Stmt::Try { catch: Some(Catch { name: Some(_), .. }), finally: Some(_), .. }
    ));
    assert!(matches!(
        &stmts[10],
        Stmt::Try { catch: Some(Catch { ty: None, name: None, .. }), finally: None, .. }
    ));
}

#[test]
fn unknown_link_kind_fails() {
    let err = parse(DUMMY_CONTEXT, "class Foo { void Bar() { link(Bar, sideways)(); } }")
        .unwrap_err();

    assert!(matches!(err, ParseError::UnknownLinkKind(ref kw, _) if kw == "sideways"));
}

#[test]
fn unknown_inline_hint_fails() {
    let err = parse(DUMMY_CONTEXT, "class Foo { void Bar() { link(Bar, base, maybe)(); } }")
        .unwrap_err();

    assert!(matches!(err, ParseError::UnknownInlineHint(ref kw, _) if kw == "maybe"));
}

#[test]
fn event_with_property_accessor_fails() {
    let err = parse(DUMMY_CONTEXT, "class Foo { event H E { get { } } }").unwrap_err();

    assert!(matches!(err, ParseError::UnknownAccessor(ref kw, _) if kw == "get"));
}

#[test]
fn duplicate_accessor_fails() {
    let err = parse(DUMMY_CONTEXT, "class Foo { int P { get { } get { } } }").unwrap_err();

    assert!(matches!(err, ParseError::DuplicateAccessor(AccessorKind::Get, _)));
}

#[test]
fn invalid_assignment_target_fails() {
    let err = parse(DUMMY_CONTEXT, "class Foo { void Bar() { 1 = 2; } }").unwrap_err();

    assert!(matches!(err, ParseError::InvalidAssignTarget(_)));
}

#[test]
fn missing_semicolon_reports_found_token() {
    let err = parse(DUMMY_CONTEXT, "class Foo { void Bar() { x = 1 } }").unwrap_err();

    assert_eq!(
        ParseError::Unexpected {
            found: TokenKind::Punct(Punct::RBrace),
            expected: ";",
            span: DUMMY_CONTEXT.span(31, 1),
        },
        err,
    );
    assert_eq!("expected ;, found `}`", err.to_string());
}

#[test]
fn lexer_errors_propagate() {
    let err = parse(DUMMY_CONTEXT, "class Foo { # }").unwrap_err();

    assert!(matches!(err, ParseError::Lex(LexError::UnexpectedChar('#', _))));
}
