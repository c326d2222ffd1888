// Span resolution
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

//! Resolve [`Span`]s into line:column source locations.

use crate::span::{Context, SourceMap, Span};
use memchr::{memchr, memchr_iter, memrchr};
use std::{error::Error, fmt::Display, num::NonZeroU32};
use unicode_width::UnicodeWidthStr;

/// Resolves [`Span`]s into line:column source locations.
///
/// A [`Span`] contains a [`Context`] and raw byte offsets gathered during
///   parsing.
/// These byte offsets can be used to go back to the source text referred
///   to by a [`Context`] to resolve the byte offsets to line and column
///   numbers.
/// This is not done during parsing because this information is only useful
///   in a diagnostic context,
///     which is not the typical happy path of the linker.
pub trait SpanResolver {
    /// Resolve the provided [`Span`] into line:column source locations.
    ///
    /// See [`SpanResolver`] for more information.
    fn resolve(&mut self, span: Span) -> Result<ResolvedSpan, SpanResolverError>;
}

/// A [`Span`] resolved to its source location.
///
/// Since this process seldom occurs
///   (perhaps a handful, not millions of times),
///   we are not constrained by size.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResolvedSpan {
    /// The original [`Span`] whose resolution was requested.
    pub span: Span,

    /// Name of the source containing the span.
    pub name: String,

    /// Line number of the first byte of the span.
    pub line: NonZeroU32,

    /// Columns of the span on its first line,
    ///   if they could be determined.
    ///
    /// This will be [`None`] if the span does not fall on character
    ///   boundaries.
    pub col: Option<Column>,

    /// Text of the first line of the span,
    ///   without its terminating newline.
    pub line_text: String,
}

/// Source column offsets.
///
/// A "column" is somewhat loosely defined as a terminal cell,
///   as computed by [`unicode_width`].
/// Columns are 1-indexed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Column {
    /// A zero-length span sitting before the given column.
    Before(NonZeroU32),

    /// Inclusive first and last columns of the span on its first line.
    Endpoints(NonZeroU32, NonZeroU32),
}

impl Column {
    /// First column of the span.
    pub fn start(&self) -> NonZeroU32 {
        match self {
            Self::Before(col) | Self::Endpoints(col, _) => *col,
        }
    }

    /// Number of terminal cells that the span covers on its first line.
    pub fn width(&self) -> usize {
        match self {
            Self::Before(_) => 1,
            Self::Endpoints(start, end) => {
                (end.get() - start.get()) as usize + 1
            }
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.start(), f)
    }
}

/// Resolve spans against the text held in a [`SourceMap`].
///
/// Every source is loaded into memory before parsing,
///   so resolution never has to go back to the filesystem.
pub struct SourceMapResolver<'a> {
    sources: &'a SourceMap,
}

impl<'a> SourceMapResolver<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }
}

impl<'a> SpanResolver for SourceMapResolver<'a> {
    fn resolve(&mut self, span: Span) -> Result<ResolvedSpan, SpanResolverError> {
        let ctx = span.context();
        let text = self
            .sources
            .text(ctx)
            .ok_or(SpanResolverError::UnknownContext(ctx))?;
        let bytes = text.as_bytes();
        let offset = span.offset() as usize;

        if offset > bytes.len() {
            return Err(SpanResolverError::OutOfRange {
                span,
                len: bytes.len(),
            });
        }

        let line_start = memrchr(b'\n', &bytes[..offset]).map_or(0, |i| i + 1);
        let line_end = memchr(b'\n', &bytes[offset..])
            .map_or(bytes.len(), |i| offset + i);
        let line_count = memchr_iter(b'\n', &bytes[..line_start]).count() + 1;

        let line_text = text
            .get(line_start..line_end)
            .unwrap_or_default()
            .trim_end_matches('\r');

        let col = columns(text, line_start, offset, span.end().min(line_end));

        Ok(ResolvedSpan {
            span,
            name: self.sources.name(ctx).unwrap_or_default().to_string(),
            line: nonzero(line_count),
            col,
            line_text: line_text.to_string(),
        })
    }
}

/// Compute the columns of the byte interval `[start, end)` relative to
///   the line beginning at `line_start`.
fn columns(
    text: &str,
    line_start: usize,
    start: usize,
    end: usize,
) -> Option<Column> {
    let before = text.get(line_start..start)?;
    let first = nonzero(before.width() + 1);

    if end <= start {
        return Some(Column::Before(first));
    }

    let covered = text.get(start..end)?.width();

    Some(Column::Endpoints(
        first,
        nonzero(before.width() + covered.max(1)),
    ))
}

fn nonzero(n: usize) -> NonZeroU32 {
    NonZeroU32::new(u32::try_from(n).unwrap_or(u32::MAX)).unwrap_or(NonZeroU32::MIN)
}

/// An error occurred while attempting to resolve a [`Span`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SpanResolverError {
    /// The span's context was never registered with the source map.
    UnknownContext(Context),

    /// The span begins past the end of its source.
    OutOfRange { span: Span, len: usize },
}

impl Display for SpanResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContext(ctx) => {
                write!(f, "no source is loaded for context {ctx}")
            }
            Self::OutOfRange { span, len } => write!(
                f,
                "span {span} begins beyond the end of its {len}-byte source"
            ),
        }
    }
}

impl Error for SpanResolverError {}

#[cfg(test)]
mod test;
