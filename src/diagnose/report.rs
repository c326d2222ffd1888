// Diagnostic reports
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

//! Rendering of diagnostic information.

// NB: `write!` together with `\n` is preferred to `writeln!` so that there
//   is only a single sequence of characters to search for while tracking
//   down newlines,
//     rather than using both.

use super::{
    resolver::{ResolvedSpan, SpanResolver, SpanResolverError},
    AnnotatedSpan, Diagnostic, Label, Level,
};
use crate::span::Span;
use std::fmt::{self, Display};

pub trait Reporter {
    /// Render diagnostic report.
    ///
    /// The provided [`Report`] implements [`Display`].
    ///
    /// Please be mindful of where this report is being rendered to
    ///   (via [`Display`]).
    /// For example,
    ///   if rendering to standard out,
    ///   it is a good idea to buffer the entire report before flushing to
    ///     stdout,
    ///       otherwise the report may become interleaved with other
    ///       concurrent processes.
    ///
    /// This method _does not return [`Result`]_ and should never fail.
    /// The report absorbs errors during processing and renders those errors
    ///   to the report itself,
    ///     ensuring both that the user is made aware of the problem
    ///     and that we're not inadvertently suppressing the actual
    ///       diagnostic messages that were requested.
    fn render<'d, D: Diagnostic>(&mut self, diagnostic: &'d D)
        -> Report<'d, D>;

    /// Number of reports rendered with a level of [`Level::Error`] or
    ///   worse.
    fn error_count(&self) -> usize;

    /// Whether any rendered report was an error.
    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Render diagnostic report in a highly visual way.
///
/// This report is modeled after Rust's default error reporting,
///   most notable for including sections of source code associated with
///   spans,
///     underlining spans,
///     and including helpful information that walks the user through
///       understanding why the error occurred and how to approach resolving
///       it.
pub struct VisualReporter<R: SpanResolver> {
    resolver: R,
    error_count: usize,
}

impl<R: SpanResolver> VisualReporter<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            error_count: 0,
        }
    }
}

impl<R: SpanResolver> Reporter for VisualReporter<R> {
    fn render<'d, D: Diagnostic>(
        &mut self,
        diagnostic: &'d D,
    ) -> Report<'d, D> {
        let mut report = Report::empty(diagnostic);

        report.extend(diagnostic.describe().into_iter().map(
            |AnnotatedSpan(span, level, olabel)| {
                let slabel = olabel.map(|label| SpanLabel(level, label));

                match self.resolver.resolve(span) {
                    Ok(rspan) => Section::resolved(rspan, level, slabel),
                    Err(e) => Section::unresolved(span, level, slabel, e),
                }
            },
        ));

        if report.level <= Level::Error {
            self.error_count += 1;
        }

        report
    }

    fn error_count(&self) -> usize {
        self.error_count
    }
}

#[derive(Debug)]
pub struct Report<'d, D: Diagnostic> {
    diagnostic: &'d D,
    secs: Vec<Section<'d>>,
    level: Level,
}

impl<'d, D: Diagnostic> Report<'d, D> {
    fn empty(diagnostic: &'d D) -> Self {
        Self {
            diagnostic,
            secs: Vec::new(),
            level: diagnostic.level(),
        }
    }

    /// Severity of the report as a whole.
    ///
    /// This is the most severe of the diagnostic's own level and the
    ///   levels of each of its sections.
    pub fn level(&self) -> Level {
        self.level
    }
}

impl<'d, D: Diagnostic> Extend<Section<'d>> for Report<'d, D> {
    fn extend<T: IntoIterator<Item = Section<'d>>>(&mut self, secs: T) {
        for sec in secs {
            self.level = self.level.min(sec.level);

            // Add the section if it cannot be squashed into the previous.
            let remain = sec.maybe_squash_into(self.secs.last_mut());
            self.secs.extend(remain);
        }
    }
}

impl<'d, D: Diagnostic> Display for Report<'d, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n", self.level, self.diagnostic)?;
        self.secs.iter().try_for_each(|sec| sec.fmt(f))
    }
}

/// A section of a [`Report`] describing a [`Span`].
///
/// Adjacent sections describing the same [`Span`] ought to be squashed
///   (see [`Section::maybe_squash_into`]),
///   but not non-adjacent ones,
///     since reports ought to be able to produce narratives that may
///       revisit previous spans in an attempt to describe what occurred and
///       how to correct it.
#[derive(Debug, PartialEq, Eq)]
struct Section<'d> {
    heading: SpanHeading,
    excerpt: Option<Excerpt>,
    labels: Vec<SpanLabel<'d>>,
    level: Level,
    span: Span,
}

impl<'d> Section<'d> {
    fn resolved(
        rspan: ResolvedSpan,
        level: Level,
        olabel: Option<SpanLabel<'d>>,
    ) -> Self {
        let mut labels = Vec::new();

        if rspan.col.is_none() {
            labels.push(SpanLabel(
                Level::Help,
                "unable to calculate columns because the span does not \
                    fall on character boundaries"
                    .into(),
            ));
        }

        labels.extend(olabel);

        Section {
            heading: SpanHeading::Resolved {
                name: rspan.name.clone(),
                line: rspan.line.get(),
                col: rspan.col.map(|col| col.start().get()),
            },
            excerpt: rspan.col.map(|col| Excerpt {
                line: rspan.line.get(),
                text: rspan.line_text.clone(),
                indent: col.start().get() as usize - 1,
                width: col.width(),
            }),
            labels,
            level,
            span: rspan.span,
        }
    }

    /// We should never mask an error with our own;
    ///   the diagnostic system is supposed to _help_ the user in diagnosing
    ///   problems,
    ///     not hinder them by masking it.
    fn unresolved(
        span: Span,
        level: Level,
        olabel: Option<SpanLabel<'d>>,
        e: SpanResolverError,
    ) -> Self {
        let mut labels = vec![SpanLabel(
            Level::Help,
            format!(
                "an error occurred while trying to look up \
                    information about this span: {e}"
            )
            .into(),
        )];

        labels.extend(olabel);

        Section {
            heading: SpanHeading::Unresolved(span),
            excerpt: None,
            labels,
            level,
            span,
        }
    }

    /// Squash self into the provided [`Section`] if they represent the same
    ///   [`Span`],
    ///     otherwise do nothing.
    ///
    /// If squashed,
    ///   [`None`] is returned.
    /// Otherwise [`Some`] is returned with `self`.
    /// This return value can be used with [`Extend`] to extend a vector of
    ///   sections with the value after this operation.
    ///
    /// The term "squash" is borrowed from `git rebase`.
    fn maybe_squash_into(
        self,
        extend: Option<&mut Section<'d>>,
    ) -> Option<Self> {
        match extend {
            Some(extend_sec) if self.span == extend_sec.span => {
                // TODO: This duplicates system labels when both spans
                //   failed to resolve.
                extend_sec.labels.extend(self.labels);
                extend_sec.level = extend_sec.level.min(self.level);
                None
            }

            _ => Some(self),
        }
    }
}

impl<'d> Display for Section<'d> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {heading}\n", heading = self.heading)?;

        if let Some(excerpt) = &self.excerpt {
            excerpt.fmt(f)?;
        }

        for label in self.labels.iter() {
            write!(f, "{label}\n")?;
        }

        Ok(())
    }
}

/// Heading describing the context of a (hopefully resolved) span.
///
/// The ideal header contains the context along with the line, and column
///   numbers,
///     visually distinguishable from surrounding lines to allow the user to
///     quickly skip between reports.
#[derive(Debug, PartialEq, Eq)]
enum SpanHeading {
    Resolved {
        name: String,
        line: u32,
        col: Option<u32>,
    },

    /// This is not ideal,
    ///   but provides reasonable fallback information in a situation where
    ///   the diagnostic system fails.
    Unresolved(Span),
}

impl Display for SpanHeading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                name,
                line,
                col: Some(col),
            } => write!(f, "--> {name}:{line}:{col}"),
            Self::Resolved {
                name,
                line,
                col: None,
            } => write!(f, "--> {name}:{line}"),
            Self::Unresolved(span) => write!(
                f,
                "--> {} offset {}--{}",
                span.context(),
                span.offset(),
                span.end(),
            ),
        }
    }
}

/// The first source line of a span with the span underlined.
#[derive(Debug, PartialEq, Eq)]
struct Excerpt {
    line: u32,
    text: String,
    indent: usize,
    width: usize,
}

impl Display for Excerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = self.line.to_string();
        let gutter = " ".repeat(num.len());

        write!(f, "   {gutter} |\n")?;
        write!(f, "   {num} | {}\n", self.text)?;
        write!(
            f,
            "   {gutter} | {}{}\n",
            " ".repeat(self.indent),
            "^".repeat(self.width),
        )
    }
}

/// A label describing a span.
#[derive(Debug, PartialEq, Eq)]
struct SpanLabel<'d>(Level, Label<'d>);

impl<'d> Display for SpanLabel<'d> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(level, label) = self;
        write!(f, "      {level}: {label}")
    }
}
