// Tests for span resolution
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

fn n(x: u32) -> NonZeroU32 {
    NonZeroU32::new(x).unwrap()
}

#[test]
fn resolves_first_line() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("a.cs", "class Foo\n{\n}\n");
    let mut sut = SourceMapResolver::new(&sources);

    assert_eq!(
        Ok(ResolvedSpan {
            span: ctx.span(6, 3),
            name: "a.cs".into(),
            line: n(1),
            col: Some(Column::Endpoints(n(7), n(9))),
            line_text: "class Foo".into(),
        }),
        sut.resolve(ctx.span(6, 3)),
    );
}

#[test]
fn resolves_later_line_and_strips_cr() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("b.cs", "a\r\n  bc\r\nd");
    let mut sut = SourceMapResolver::new(&sources);

    let resolved = sut.resolve(ctx.span(5, 2)).unwrap();

    assert_eq!(n(2), resolved.line);
    assert_eq!(Some(Column::Endpoints(n(3), n(4))), resolved.col);
    assert_eq!("  bc", resolved.line_text);
}

#[test]
fn zero_length_span_sits_before_column() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("c.cs", "abc");
    let mut sut = SourceMapResolver::new(&sources);

    let resolved = sut.resolve(ctx.span(3, 0)).unwrap();

    assert_eq!(Some(Column::Before(n(4))), resolved.col);
}

#[test]
fn wide_characters_occupy_two_columns() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("d.cs", "\"日本\" x");
    let mut sut = SourceMapResolver::new(&sources);

    // `x` follows a quote, two wide characters, a quote and a space.
    let resolved = sut.resolve(ctx.span(9, 1)).unwrap();

    assert_eq!(Some(Column::Endpoints(n(8), n(8))), resolved.col);
}

#[test]
fn span_inside_character_has_no_column() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("e.cs", "日本");
    let mut sut = SourceMapResolver::new(&sources);

    let resolved = sut.resolve(ctx.span(1, 1)).unwrap();

    assert_eq!(None, resolved.col);
}

#[test]
fn unknown_context_fails() {
    let sources = SourceMap::new();
    let mut sut = SourceMapResolver::new(&sources);

    assert_eq!(
        Err(SpanResolverError::UnknownContext(DUMMY_CONTEXT)),
        sut.resolve(DUMMY_CONTEXT.span(0, 1)),
    );
}

#[test]
fn offset_past_end_fails() {
    let mut sources = SourceMap::new();
    let ctx = sources.add("f.cs", "ab");
    let mut sut = SourceMapResolver::new(&sources);

    assert_eq!(
        Err(SpanResolverError::OutOfRange {
            span: ctx.span(5, 1),
            len: 2
        }),
        sut.resolve(ctx.span(5, 1)),
    );
}
