// Tests for the evaluator
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

fn run_src(src: &str, class: &str, method: &str) -> Result<Outcome, EvalError> {
    let parsed = parse(DUMMY_CONTEXT, src).unwrap();
    run(&parsed.unit, class, method)
}

fn output(src: &str) -> String {
    run_src(src, "Program", "Main").unwrap().output
}

#[test]
fn console_output_and_arithmetic() {
    assert_eq!(
        "7 True\nx=-3\n",
        output(
            r#"
            class Program
            {
                void Main()
                {
                    Console.Write(1 + 2 * 3);
                    Console.WriteLine(" ", 1 < 2);
                    Console.WriteLine("x=" + (4 - 7));
                }
            }
            "#
        ),
    );
}

#[test]
fn fields_initialize_across_class_chain() {
    assert_eq!(
        "1 2 0\n",
        output(
            r#"
            class Base { int a = 1; int c; }
            class Program : Base
            {
                int b = a + 1;
                void Main() { Console.WriteLine(a, " ", b, " ", c); }
            }
            "#
        ),
    );
}

#[test]
fn virtual_and_base_dispatch() {
    assert_eq!(
        "Derived\nBase\nDerived\n",
        output(
            r#"
            class Base
            {
                virtual void Who() { Console.WriteLine("Base"); }
                void CallWho() { Who(); }
            }
            class Program : Base
            {
                override void Who() { Console.WriteLine("Derived"); }
                void Main() { this.Who(); base.Who(); CallWho(); }
            }
            "#
        ),
    );
}

#[test]
fn properties_and_events_use_accessors() {
    assert_eq!(
        "set 5\nget\n5\nadd h\nremove h\n",
        output(
            r#"
            class Program
            {
                int p;
                int P
                {
                    get { Console.WriteLine("get"); return p; }
                    set { Console.WriteLine("set ", value); p = value; }
                }
                event Handler E
                {
                    add { Console.WriteLine("add ", value); }
                    remove { Console.WriteLine("remove ", value); }
                }
                void Main()
                {
                    P = 5;
                    Console.WriteLine(P);
                    E += "h";
                    this.E -= "h";
                }
            }
            "#
        ),
    );
}

#[test]
fn ref_and_out_copy_back() {
    assert_eq!(
        "11 42\n",
        output(
            r#"
            class Program
            {
                void Bump(ref int x, out int y) { x = x + 1; y = 42; }
                void Main()
                {
                    int a = 10;
                    int b;
                    Bump(ref a, out b);
                    Console.WriteLine(a, " ", b);
                }
            }
            "#
        ),
    );
}

#[test]
fn loops_break_continue_and_goto() {
    assert_eq!(
        "0 2 4 done 3\n",
        output(
            r#"
            class Program
            {
                void Main()
                {
                    for (int i = 0; i < 10; i++)
                    {
                        if (i % 2 == 1) continue;
                        if (i > 4) break;
                        Console.Write(i, " ");
                    }
                    int n = 0;
                again:
                    n++;
                    if (n < 3) goto again;
                    Console.WriteLine("done ", n);
                }
            }
            "#
        ),
    );
}

#[test]
fn exceptions_unwind_through_finally() {
    assert_eq!(
        "try finally caught boom\nafter\n",
        output(
            r#"
            class Program
            {
                void Fail() { try { Console.Write("try "); throw "boom"; } finally { Console.Write("finally "); } }
                void Main()
                {
                    try { Fail(); } catch (Exception e) { Console.WriteLine("caught ", e); }
                    Console.WriteLine("after");
                }
            }
            "#
        ),
    );
}

#[test]
fn return_value_is_reported() {
    let outcome = run_src(
        "class Program { int Main() { return 6 * 7; } }",
        "Program",
        "Main",
    )
    .unwrap();

    assert_eq!(Value::Int(42), outcome.value);
}

#[test]
fn uncaught_exception_fails() {
    assert_eq!(
        Err(EvalError::Thrown(Value::Str("DivideByZeroException".into()))),
        run_src("class Program { int Main() { return 1 / 0; } }", "Program", "Main"),
    );
}

#[test]
fn infinite_loop_runs_out_of_fuel() {
    assert_eq!(
        Err(EvalError::OutOfFuel),
        run_src("class Program { void Main() { while (true) { } } }", "Program", "Main"),
    );
}

#[test]
fn unbounded_recursion_overflows() {
    assert!(matches!(
        run_src("class Program { void Main() { Main(); } }", "Program", "Main"),
        Err(EvalError::StackOverflow(_)),
    ));
}

#[test]
fn unresolved_link_cannot_be_evaluated() {
    assert!(matches!(
        run_src("class Program { void Main() { link(Main, base)(); } }", "Program", "Main"),
        Err(EvalError::UnresolvedLink(_)),
    ));
}

#[test]
fn unknown_entry_points_fail() {
    let src = "class Program { void Main(int x) { } }";

    assert_eq!(
        Err(EvalError::UnknownClass("Nope".into())),
        run_src(src, "Nope", "Main"),
    );
    assert_eq!(
        Err(EvalError::UnknownMethod {
            class: "Program".into(),
            name: "Main".into()
        }),
        run_src(src, "Program", "Main"),
    );
}
