// Source spans
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

//! Mapping to source input byte intervals.
//!
//! A [`Span`] is a mapping to a byte interval within a source file,
//!   representing primarily where some syntactic entity originated.
//! This underpins the diagnostic system,
//!   giving the user specific information for debugging errors in their
//!   aspects and fixtures.
//!
//! A span contains a [`Context`] representing the source location.
//! A context is a small index into a [`SourceMap`],
//!   _not_ a [`PathBuf`](std::path::PathBuf);
//!     the source map owns the name and text of every loaded source and
//!     is consulted only when rendering diagnostics.
//!
//! ```
//! use weaver::span::{SourceMap, Span};
//!
//! let mut sources = SourceMap::new();
//! let ctx = sources.add("fixture.cs", "class A {}");
//! let span = ctx.span(6, 1);
//!
//! assert_eq!(6, span.offset());
//! assert_eq!(1, span.len());
//! assert_eq!(ctx, span.context());
//! assert_eq!(Some("A"), sources.slice(span));
//! ```
//!
//! A span is ordered as such:
//!
//!   1. Spans group by [`Context`];
//!   2. Spans are then ordered relative to their offset; and
//!   3. Spans are finally ordered by their length.
//!
//! Sorting diagnostics by span therefore yields a stable,
//!   source-ordered report regardless of the order in which parallel
//!   linker workers discovered them.
//!
//! Span is expected to be able to fit within a general-purpose CPU register
//!   on a 64-bit system, and so does not exceed 8 bytes in length.
//! Spans are copied into every expression node,
//!   including every node cloned during inlining,
//!   so their size matters.

use crate::global;
use std::fmt::Display;

/// Size of a [`Span`]'s `offset` field.
pub type SpanOffsetSize = global::SourceFileSize;

/// Size of a [`Span`]'s `len` field.
pub type SpanLenSize = global::FrontendTokenLength;

/// Description of a source location and byte interval for some object.
///
/// If code is generated or otherwise manipulated
///   (as inlining does),
///   the span ought to reference the original location of the code that
///   can be referenced and modified to correct any problems.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Context onto which byte offsets are mapped,
    ///   such as a source file.
    ctx: Context,

    /// Starting 0-indexed byte position, inclusive.
    offset: SpanOffsetSize,

    /// Token length (ending byte offset - `offset`).
    len: SpanLenSize,
}

// If this fails,
//   then you have either modified [`global`] constants or you have
//   modified the fields of [`Span`] itself.
assert_eq_size!(Span, u64);

impl Span {
    /// Create a new span from its constituent parts.
    pub fn new<C: Into<Context>>(
        offset: SpanOffsetSize,
        len: SpanLenSize,
        ctx: C,
    ) -> Self {
        Self {
            ctx: ctx.into(),
            offset,
            len,
        }
    }

    /// Byte offset of the beginning of the span relative to its context.
    pub fn offset(&self) -> SpanOffsetSize {
        self.offset
    }

    /// Length of the span in bytes.
    ///
    /// The interval of the span is `[offset, offset+len]`.
    pub fn len(&self) -> SpanLenSize {
        self.len
    }

    /// Whether the span has a length of zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The context to which the span applies.
    pub fn context(&self) -> Context {
        self.ctx
    }

    /// Byte offset immediately following the span.
    pub fn end(&self) -> usize {
        self.offset as usize + self.len as usize
    }

    /// Merge with another span `b` such that the combined span begins at
    ///   the offset of the earlier of the two spans and extends to the end
    ///   of the later of the two.
    ///
    /// Both spans must have the same [`Context`],
    ///   otherwise the result will be [`None`].
    /// A merged length that cannot be represented by [`SpanLenSize`] is
    ///   saturated,
    ///     since it is more useful to point at the beginning of a long
    ///     construct than at nothing at all.
    pub fn merge<S: Into<Span>>(self, other: S) -> Option<Span> {
        let b = other.into();

        if self.ctx != b.ctx {
            return None;
        }

        if self.offset > b.offset {
            return b.merge(self);
        }

        let end = self.end().max(b.end());
        let len = end - self.offset as usize;

        Some(Self {
            ctx: self.ctx,
            offset: self.offset,
            len: SpanLenSize::try_from(len).unwrap_or(SpanLenSize::MAX),
        })
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} offset {}-{}]", self.ctx, self.offset, self.end())
    }
}

/// A placeholder span indicating that a span is expected but is not yet
///   known.
pub const UNKNOWN_SPAN: Span = UNKNOWN_CONTEXT.span(0, 0);

/// Context for byte offsets (e.g. a source file).
///
/// A context is an index into a [`SourceMap`];
///   it is lifetime-free and [`Copy`]-able with the assumption that it
///   will only need to be resolved to a name in a diagnostic context where
///   the source map is readily available.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct Context(global::SourceCtxSize);

impl Context {
    /// Produce a [`Span`] within the given context.
    #[inline]
    pub const fn span(self, offset: SpanOffsetSize, len: SpanLenSize) -> Span {
        Span {
            ctx: self,
            offset,
            len,
        }
    }

    /// Attempt to produce a [`Span`] of the given length at the given
    ///   offset,
    ///     otherwise fall back to a `(0,0)` (ZZ) span.
    ///
    /// If the offset can be represented but not the length,
    ///   then the length is saturated,
    ///   which still provides useful information.
    #[inline]
    pub fn span_or_zz(self, offset: usize, len: usize) -> Span {
        match SpanOffsetSize::try_from(offset) {
            Ok(offset) => self.span(
                offset,
                SpanLenSize::try_from(len).unwrap_or(SpanLenSize::MAX),
            ),
            Err(_) => self.span(0, 0),
        }
    }

    /// Raw index of this context within its [`SourceMap`].
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A placeholder context indicating that a context is expected but is not
///   yet known.
pub const UNKNOWN_CONTEXT: Context = Context(0);

impl Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            UNKNOWN_CONTEXT => write!(f, "<unknown>"),
            Context(n) => write!(f, "#{n}"),
        }
    }
}

/// Names and text of every source loaded by the linker.
///
/// Index `0` is reserved for [`UNKNOWN_CONTEXT`] and has no text.
#[derive(Debug)]
pub struct SourceMap {
    sources: Vec<(String, String)>,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            sources: vec![("<unknown>".into(), String::new())],
        }
    }

    /// Register a source and produce the [`Context`] that spans into it
    ///   must carry.
    ///
    /// Panics
    /// ======
    /// If more sources are loaded than [`global::SourceCtxSize`] can
    ///   index.
    /// A single linker invocation is not expected to come anywhere close.
    pub fn add<N: Into<String>, T: Into<String>>(
        &mut self,
        name: N,
        text: T,
    ) -> Context {
        let index = global::SourceCtxSize::try_from(self.sources.len())
            .expect("too many sources for global::SourceCtxSize");

        self.sources.push((name.into(), text.into()));
        Context(index)
    }

    /// Name of the source identified by `ctx`.
    pub fn name(&self, ctx: Context) -> Option<&str> {
        self.sources.get(ctx.index()).map(|(name, _)| name.as_str())
    }

    /// Full text of the source identified by `ctx`.
    pub fn text(&self, ctx: Context) -> Option<&str> {
        match ctx {
            UNKNOWN_CONTEXT => None,
            _ => self.sources.get(ctx.index()).map(|(_, text)| text.as_str()),
        }
    }

    /// Source text covered by `span`.
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.text(span.context())
            .and_then(|text| text.get(span.offset() as usize..span.end()))
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spans_order_by_context_then_offset_then_len() {
        let mut sources = SourceMap::new();
        let ctx = sources.add("a", "0123456789abcdef");

        let a = ctx.span(2, 6);
        let b = ctx.span(10, 5);
        let c = ctx.span(10, 4);
        let f = ctx.span(5, 7);

        let mut spans = vec![a, b, c, f];
        spans.sort();

        assert_eq!(spans, vec![a, f, c, b]);
    }

    #[test]
    fn merge_overlapping_and_contained() {
        let ctx = dummy::DUMMY_CONTEXT;

        assert_eq!(Some(ctx.span(2, 8)), ctx.span(2, 3).merge(ctx.span(6, 4)));
        assert_eq!(Some(ctx.span(2, 8)), ctx.span(6, 4).merge(ctx.span(2, 3)));
        assert_eq!(Some(ctx.span(1, 9)), ctx.span(1, 9).merge(ctx.span(3, 2)));
    }

    #[test]
    fn merge_different_contexts_fails() {
        let mut sources = SourceMap::new();
        let a = sources.add("a", "");
        let b = sources.add("b", "");

        assert_eq!(None, a.span(0, 1).merge(b.span(0, 1)));
    }

    #[test]
    fn source_map_slices_text() {
        let mut sources = SourceMap::new();
        let ctx = sources.add("foo.cs", "class Foo {}");

        assert_eq!(Some("foo.cs"), sources.name(ctx));
        assert_eq!(Some("Foo"), sources.slice(ctx.span(6, 3)));
        assert_eq!(None, sources.slice(ctx.span(10, 30)));
        assert_eq!(None, sources.text(UNKNOWN_CONTEXT));
    }

    #[test]
    fn span_or_zz_saturates_length() {
        let ctx = dummy::DUMMY_CONTEXT;

        assert_eq!(ctx.span(4, u16::MAX), ctx.span_or_zz(4, 1 << 20));
    }
}
