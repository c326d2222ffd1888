// Tests for the aspect linker
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
use crate::{
    span::dummy::DUMMY_CONTEXT,
    syntax::{eval, parse::parse, print::print_unit},
};

fn parsed(src: &str) -> ParsedUnit {
    parse(DUMMY_CONTEXT, src).unwrap()
}

fn sut_with(src: &str, opts: LinkOptions) -> Linked {
    link(&parsed(src), &opts)
}

fn sut(src: &str) -> Linked {
    sut_with(src, LinkOptions::default())
}

fn no_inline() -> LinkOptions {
    LinkOptions {
        inline: false,
        ..Default::default()
    }
}

/// Printed unit with whitespace collapsed.
fn printed(linked: &Linked) -> String {
    print_unit(&linked.unit, &linked.links)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn member_names(linked: &Linked, class: &str) -> Vec<String> {
    linked
        .unit
        .class(class)
        .unwrap()
        .members
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

fn output(linked: &Linked) -> String {
    eval::run(&linked.unit, "Program", "Main").unwrap().output
}

/// Linking with and without inlining must produce programs with the same
///   observable behavior.
fn assert_transparent(src: &str, expected: &str) {
    let inlined = sut(src);
    let called = sut_with(src, no_inline());

    assert!(!inlined.has_errors(), "{:?}", inlined.diagnostics);
    assert!(!called.has_errors(), "{:?}", called.diagnostics);

    assert_eq!(expected, output(&inlined));
    assert_eq!(expected, output(&called));
}

const SINGLE_LAYER: &str = r#"
    [assembly: LayerOrder("Trace")]
    class Program
    {
        void Main() { Run(); }

        void Run() { Console.WriteLine("body"); }

        [Override(Run, "Trace")]
        void RunTrace()
        {
            Console.WriteLine("before");
            link(Run, original, inline)();
            Console.WriteLine("after");
        }
    }
"#;

#[test]
fn single_layer_merges_into_one_method() {
    let linked = sut(SINGLE_LAYER);

    assert!(!linked.has_errors(), "{:?}", linked.diagnostics);
    assert_eq!(vec!["Main", "Run"], member_names(&linked, "Program"));

    assert!(printed(&linked).contains(
        r#"void Run() { Console.WriteLine("before"); Console.WriteLine("body"); Console.WriteLine("after"); }"#
    ));

    assert_eq!(
        LinkStats {
            linked: 1,
            inlined: 1,
            discarded: 1,
            ..Default::default()
        },
        linked.stats
    );
}

#[test]
fn single_layer_is_transparent() {
    assert_transparent(SINGLE_LAYER, "before\nbody\nafter\n");
}

#[test]
fn layer_order_attribute_is_removed() {
    let linked = sut(SINGLE_LAYER);

    assert!(linked.unit.attrs.is_empty());
    assert!(!printed(&linked).contains("LayerOrder"));
}

const NOT_INLINEABLE_MIDDLE: &str = r#"
    [assembly: LayerOrder("A", "B", "C")]
    class Program
    {
        static int Count() { return 1; }

        [Override(Count, "A")]
        static int CountA() { int n = link(Count, base)(); return n + 10; }

        [Override(Count, "B"), NotInlineable]
        static int CountB() { int n = link(Count, base)(); return n + 100; }

        [Override(Count, "C")]
        static int CountC() { int n = link(Count, base)(); return n + 1000; }

        void Main() { Console.WriteLine(Count()); }
    }
"#;

#[test]
fn not_inlineable_layer_remains_call_target() {
    let linked = sut(NOT_INLINEABLE_MIDDLE);

    assert!(!linked.has_errors(), "{:?}", linked.diagnostics);
    assert_eq!(
        vec!["Count", "Count_B", "Main"],
        member_names(&linked, "Program")
    );

    let out = printed(&linked);
    assert!(out.contains("Program.Count_B()"), "{out}");
    assert!(out.contains("private static int Count_B()"), "{out}");

    assert_eq!(2, linked.stats.inlined);
    assert_eq!(1, linked.stats.calls);
    assert_eq!(2, linked.stats.discarded);
    assert_eq!(1, linked.stats.intermediates);
}

#[test]
fn not_inlineable_layer_is_transparent() {
    assert_transparent(NOT_INLINEABLE_MIDDLE, "1111\n");
}

const LINK_IN_LOOP: &str = r#"
    [assembly: LayerOrder("Repeat")]
    class Program
    {
        int total;

        void Add() { total = total + 1; }

        [Override(Add, "Repeat")]
        void AddRepeat()
        {
            for (int i = 0; i < 3; i = i + 1)
            {
                link(Add, base)();
            }
        }

        void Main() { Add(); Console.WriteLine(total); }
    }
"#;

#[test]
fn link_in_loop_is_substituted_once() {
    let linked = sut(LINK_IN_LOOP);
    let out = printed(&linked);

    assert!(!linked.has_errors(), "{:?}", linked.diagnostics);
    assert_eq!(1, out.matches("total = total + 1").count(), "{out}");
    assert_eq!(vec!["total", "Add", "Main"], member_names(&linked, "Program"));
}

#[test]
fn link_in_loop_is_transparent() {
    assert_transparent(LINK_IN_LOOP, "3\n");
}

const EVENT_LAYERS: &str = r#"
    [assembly: LayerOrder("Log", "Count")]
    class Program
    {
        event Handler E
        {
            add { Console.WriteLine("add ", value); }
            remove { Console.WriteLine("remove ", value); }
        }

        [Override(E, "Log")]
        event Handler ELog
        {
            add { Console.WriteLine("log add"); link(E, base) += value; }
            remove { Console.WriteLine("log remove"); link(E, base) -= value; }
        }

        [Override(E, "Count")]
        event Handler ECount
        {
            add { link(E, base) += value; link(E, self) -= value; }
            remove { Console.WriteLine("count remove"); link(E, base) -= value; }
        }

        void Main() { E += "h"; }
    }
"#;

#[test]
fn event_layers_resolve_self_by_accessor() {
    let linked = sut(EVENT_LAYERS);
    let out = printed(&linked);

    assert!(!linked.has_errors(), "{:?}", linked.diagnostics);
    assert_eq!(vec!["E", "Main"], member_names(&linked, "Program"));

    // The `self` link in `add` reaches the `remove` accessor of its own
    //   layer,
    //     which is final and so is the public member itself.
    assert!(out.contains("this.E -= value;"), "{out}");
    assert_eq!(1, linked.stats.calls);
    assert_eq!(2, linked.stats.discarded);
}

#[test]
fn event_layers_are_transparent() {
    assert_transparent(
        EVENT_LAYERS,
        "log add\nadd h\ncount remove\nlog remove\nremove h\n",
    );
}

#[test]
fn calls_retain_every_declaration_without_inlining() {
    let linked = sut_with(NOT_INLINEABLE_MIDDLE, no_inline());

    assert_eq!(
        vec!["Count", "Count_Source", "Count_A", "Count_B", "Main"],
        member_names(&linked, "Program")
    );
    assert_eq!(0, linked.stats.inlined);
    assert_eq!(3, linked.stats.calls);
    assert_eq!(0, linked.stats.discarded);
}

#[test]
fn members_without_aspects_are_untouched() {
    let src = r#"
        [assembly: LayerOrder("A")]
        class Program
        {
            int f = 1;
            void Main() { Console.WriteLine(f); }
        }
    "#;

    let linked = sut(src);

    assert_eq!(LinkStats::default(), linked.stats);
    assert_eq!(
        "class Program { int f = 1; void Main() { Console.WriteLine(f); } }",
        printed(&linked)
    );
}

#[test]
fn linking_is_deterministic() {
    let src = [SINGLE_LAYER, NOT_INLINEABLE_MIDDLE, EVENT_LAYERS]
        .iter()
        .map(|s| s.replacen("[assembly:", "//", 1))
        .collect::<Vec<_>>();

    // Each fixture declares the same class;
    //   rename them so that they may share a unit.
    let combined = format!(
        r#"[assembly: LayerOrder("Trace", "A", "B", "C", "Log", "Count")]
        {}
        {}
        {}"#,
        src[0].replace("class Program", "class P1"),
        src[1].replace("class Program", "class P2"),
        src[2].replace("class Program", "class P3"),
    );

    let parsed = parsed(&combined);

    let serial = link(
        &parsed,
        &LinkOptions {
            threads: 1,
            ..Default::default()
        },
    );
    let parallel = link(
        &parsed,
        &LinkOptions {
            threads: 4,
            ..Default::default()
        },
    );
    let again = link(&parsed, &LinkOptions::default());

    assert!(!serial.has_errors(), "{:?}", serial.diagnostics);
    assert_eq!(printed(&serial), printed(&parallel));
    assert_eq!(printed(&serial), printed(&again));
    assert_eq!(serial.stats, parallel.stats);
}

#[test]
fn failed_member_is_emitted_as_declared() {
    let linked = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Program
        {
            [Introduce("A")] void Hello() { link(Hello, base)(); }

            void Run() { Console.WriteLine(0); }
            [Override(Run, "A")] void RunA() { link(Run, base)(); Console.WriteLine(1); }
        }
        "#,
    );

    assert!(matches!(
        linked.diagnostics.as_slice(),
        [LinkError::NoBase(name, _)] if name == "Hello"
    ));

    assert_eq!(1, linked.stats.failed);
    assert_eq!(1, linked.stats.linked);

    let out = printed(&linked);
    assert!(out.contains("link(Hello, base)()"), "{out}");
    assert!(
        out.contains("void Run() { Console.WriteLine(0); Console.WriteLine(1); }"),
        "{out}"
    );
}

#[test]
fn diagnostics_are_sorted_by_span() {
    let linked = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Program
        {
            [Introduce("A")] void Second() { link(Second, base)(); }
            [Introduce("A")] void First() { link(First, base)(); }
            [Override(Missing, "A")] void Gone() { }
        }
        "#,
    );

    assert_eq!(3, linked.diagnostics.len(), "{:?}", linked.diagnostics);
    assert!(linked
        .diagnostics
        .windows(2)
        .all(|pair| pair[0].span() <= pair[1].span()));
}

#[test]
fn cancelled_link_emits_members_as_declared() {
    let parsed = parsed(NOT_INLINEABLE_MIDDLE);
    let cancel = Cancellation::new();

    cancel.cancel();
    assert!(cancel.is_cancelled());

    let linked = link_with(&parsed, &LinkOptions::default(), &cancel);

    assert_eq!(1, linked.stats.cancelled);
    assert_eq!(0, linked.stats.linked);
    assert!(!linked.has_errors());
    assert_eq!(vec!["Count", "Main"], member_names(&linked, "Program"));
}

const STORE_INTO_FIELD: &str = r#"
    [assembly: LayerOrder("A")]
    class Program
    {
        int x;

        int M() { int x = 5; if (x > 3) { return x; } return 0; }

        [Override(M, "A")]
        int MA() { x = link(M, base)(); return x; }

        void Main() { Console.WriteLine(M()); Console.WriteLine(x); }
    }
"#;

#[test]
fn store_into_field_is_transparent() {
    assert_transparent(STORE_INTO_FIELD, "5\n5\n");
}

#[test]
fn store_into_field_remains_call() {
    let linked = sut(STORE_INTO_FIELD);

    assert_eq!(1, linked.stats.calls);
    assert_eq!(
        vec!["x", "M", "M_Source", "Main"],
        member_names(&linked, "Program")
    );
}

const SHARED_INTERMEDIATE_NAME: &str = r#"
    [assembly: LayerOrder("A:B", "B", "C")]
    class Program
    {
        static void Run() { Console.WriteLine("run"); }

        [Override(Run, "A:B"), NotInlineable]
        static void RunAB() { link(Run, base)(); Console.WriteLine("ab"); }

        [Override(Run, "C")]
        static void RunC() { link(Run, base)(); }

        static void Run_A() { Console.WriteLine("run a"); }

        [Override(Run_A, "B"), NotInlineable]
        static void Run_AB() { link(Run_A, base)(); Console.WriteLine("b"); }

        [Override(Run_A, "C")]
        static void Run_AC() { link(Run_A, base)(); }

        void Main() { Run(); Run_A(); }
    }
"#;

#[test]
fn intermediates_of_different_members_do_not_collide() {
    let linked = sut(SHARED_INTERMEDIATE_NAME);

    assert!(!linked.has_errors(), "{:?}", linked.diagnostics);
    assert_eq!(
        vec!["Run", "Run_A_B", "Run_A", "Run_A_B_2", "Main"],
        member_names(&linked, "Program")
    );

    let out = printed(&linked);
    assert!(out.contains("Program.Run_A_B();"), "{out}");
    assert!(out.contains("Program.Run_A_B_2();"), "{out}");
}

#[test]
fn intermediates_of_different_members_are_transparent() {
    assert_transparent(SHARED_INTERMEDIATE_NAME, "run\nab\nrun a\nb\n");
}

#[test]
fn node_ids_are_unique_across_linked_unit() {
    let parsed = parsed(SHARED_INTERMEDIATE_NAME);
    let linked = link(&parsed, &LinkOptions::default());

    let mut ids = vec![];
    for class in &linked.unit.classes {
        for member in &class.members {
            member.clone().walk_exprs_mut(&mut |e| ids.push(e.id));
        }
    }

    let total = ids.len();
    ids.sort();
    ids.dedup();

    assert_eq!(total, ids.len());
    assert!(ids.iter().any(|id| *id >= parsed.next_id));
}
