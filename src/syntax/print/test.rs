// Tests for the source printer
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
use crate::{span::dummy::DUMMY_CONTEXT, syntax::parse::parse};

fn roundtrip(src: &str) -> String {
    let parsed = parse(DUMMY_CONTEXT, src).unwrap();
    print_unit(&parsed.unit, &parsed.links)
}

#[test]
fn prints_allman_style_unit() {
    let src = r#"[assembly: LayerOrder("A", "B:Sub")] public class Foo : Bar {
        [NotDiscardable] private int x = 1;
        public virtual int Get(int a, ref int b) { if (a < b) return a; else { b = 2; } return b; }
        public int P { get { return x; } set { x = value; } }
        public event Handler E { add { } remove { } }
    }"#;

    assert_eq!(
        r#"[assembly: LayerOrder("A", "B:Sub")]

public class Foo : Bar
{
    [NotDiscardable]
    private int x = 1;

    public virtual int Get(int a, ref int b)
    {
        if (a < b)
            return a;
        else
        {
            b = 2;
        }
        return b;
    }

    public int P
    {
        get
        {
            return x;
        }
        set
        {
            x = value;
        }
    }

    public event Handler E
    {
        add
        {
        }
        remove
        {
        }
    }
}
"#,
        roundtrip(src),
    );
}

#[test]
fn printing_is_stable_across_reparse() {
    let src = r#"class Foo {
        void Bar(out int r) {
            for (var i = 0; i < 10; i++) { continue; }
            try { throw "x\n"; } catch (Exception e) { } finally { r = -(-1); }
            again: while (!done && (a || b)) goto again;
            x = (a + b) * c - (d - e);
            y = (int)(a + b);
            z = (int)(-a);
            link(Bar, base, inline)(out r);
        }
    }"#;

    let first = roundtrip(src);
    let second = roundtrip(&first);

    assert_eq!(first, second);
}

#[test]
fn parenthesizes_only_where_required() {
    let out = roundtrip(
        "class Foo { void Bar() { x = (a + b) * c - (d - e) + (f * g); } }",
    );

    assert!(out.contains("x = (a + b) * c - (d - e) + f * g;\n"), "{out}");
}

#[test]
fn nested_if_keeps_else_binding() {
    let out = roundtrip(
        "class Foo { void Bar() { if (a) { if (b) x(); } else y(); } }",
    );

    let reparsed = roundtrip(&out);
    assert_eq!(out, reparsed);
    assert!(out.contains(
        "        if (a)\n        \
         {\n            \
         if (b)\n                \
         x();\n        \
         }\n        \
         else\n            \
         y();\n"
    ), "{out}");
}

#[test]
fn prints_link_markers_from_table() {
    let out = roundtrip(
        "class Foo { int P { get { return link(P, base); } set { link(P, final, noinline) = value; } } }",
    );

    assert!(out.contains("return link(P, base);"), "{out}");
    assert!(out.contains("link(P, final, noinline) = value;"), "{out}");
}

#[test]
fn link_without_marker_prints_selector() {
    let parsed = parse(DUMMY_CONTEXT, "class Foo { void Bar() { link(Bar, self)(); } }")
        .unwrap();

    let out = print_unit(&parsed.unit, &LinkTable::new());

    assert!(out.contains("        Bar();\n"), "{out}");
}
