// Linker errors
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

//! Errors raised while linking.
//!
//! No linking error is fatal to the unit as a whole.
//! Structural and resolution errors abort linking of the affected member
//!   only;
//!     that member is then emitted as it was declared
//!     and all other members are linked normally.

use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::Span,
    syntax::ast::AccessorKind,
};
use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A `LayerOrder` entry is not a valid layer name.
    InvalidLayerName(Span),

    /// The layer order has more entries than positions can represent.
    TooManyLayers(Span, usize),

    /// A weaving attribute has malformed arguments,
    ///   or attributes were combined in a way that has no meaning.
    InvalidWeavingAttribute(Span),

    /// A declaration names a layer absent from the layer order.
    UnknownLayer(String, Span),

    /// A declaration names a layer listed more than once in the layer
    ///   order.
    AmbiguousLayer(String, Span),

    /// Two declarations of one member claim the same layer.
    DuplicateLayer {
        member: String,
        layer: String,
        first: Span,
        second: Span,
    },

    /// An override names a member that is neither declared,
    ///   inherited,
    ///   nor introduced.
    OverrideWithoutTarget(String, Span),

    /// An override names a member with more than one source declaration.
    AmbiguousTarget {
        member: String,
        span: Span,
        decls: Vec<Span>,
    },

    /// A member is introduced by an aspect but is already declared.
    IntroducedMemberExists {
        member: String,
        span: Span,
        existing: Span,
    },

    /// An override applies at a layer preceding the member's
    ///   introduction.
    OverrideBeforeIntroduction {
        member: String,
        span: Span,
        intro: Span,
    },

    /// An override differs in kind or signature from the member it
    ///   overrides.
    ShapeMismatch {
        member: String,
        span: Span,
        target: Span,
    },

    /// An override provides an accessor that the overridden member lacks.
    MissingAccessor {
        member: String,
        kind: AccessorKind,
        span: Span,
    },

    /// An event override does not provide both `add` and `remove`.
    IncompleteEventOverride(String, Span),

    /// A link marker appears in a declaration that is not part of an
    ///   override chain.
    LinkOutsideOverride(Span),

    /// A link marker names a member other than the one whose chain it
    ///   appears in.
    ForeignLinkTarget {
        selector: String,
        member: String,
        span: Span,
    },

    /// A link marker is used in a way that reaches no accessor of its
    ///   member.
    UnsupportedLinkUsage(String, Span),

    /// A link marker reaches an accessor kind that its member does not
    ///   have.
    MissingAccessorChain {
        member: String,
        kind: AccessorKind,
        span: Span,
    },

    /// A `base` link in the first declaration of a chain.
    NoBase(String, Span),
}

impl LinkError {
    /// Primary span of the error,
    ///   used to order diagnostics deterministically.
    pub fn span(&self) -> Span {
        use LinkError::*;

        match self {
            InvalidLayerName(span)
            | TooManyLayers(span, _)
            | InvalidWeavingAttribute(span)
            | UnknownLayer(_, span)
            | AmbiguousLayer(_, span)
            | DuplicateLayer { second: span, .. }
            | OverrideWithoutTarget(_, span)
            | AmbiguousTarget { span, .. }
            | IntroducedMemberExists { span, .. }
            | OverrideBeforeIntroduction { span, .. }
            | ShapeMismatch { span, .. }
            | MissingAccessor { span, .. }
            | IncompleteEventOverride(_, span)
            | LinkOutsideOverride(span)
            | ForeignLinkTarget { span, .. }
            | UnsupportedLinkUsage(_, span)
            | MissingAccessorChain { span, .. }
            | NoBase(_, span) => *span,
        }
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LinkError::*;

        match self {
            InvalidLayerName(_) => write!(f, "invalid layer name"),
            TooManyLayers(_, n) => {
                write!(f, "layer order has too many layers ({n})")
            }
            InvalidWeavingAttribute(_) => {
                write!(f, "invalid weaving attribute")
            }
            UnknownLayer(layer, _) => write!(f, "unknown layer `{layer}`"),
            AmbiguousLayer(layer, _) => {
                write!(f, "layer `{layer}` appears more than once in the layer order")
            }
            DuplicateLayer { member, layer, .. } => write!(
                f,
                "layer `{layer}` declares `{member}` more than once"
            ),
            OverrideWithoutTarget(member, _) => {
                write!(f, "override of undeclared member `{member}`")
            }
            AmbiguousTarget { member, .. } => {
                write!(f, "override of ambiguous member `{member}`")
            }
            IntroducedMemberExists { member, .. } => {
                write!(f, "introduced member `{member}` is already declared")
            }
            OverrideBeforeIntroduction { member, .. } => write!(
                f,
                "override of `{member}` precedes its introduction"
            ),
            ShapeMismatch { member, .. } => {
                write!(f, "override does not match the declaration of `{member}`")
            }
            MissingAccessor { member, kind, .. } => {
                write!(f, "`{member}` has no `{kind}` accessor to override")
            }
            IncompleteEventOverride(member, _) => write!(
                f,
                "override of event `{member}` must provide both `add` and `remove`"
            ),
            LinkOutsideOverride(_) => {
                write!(f, "link outside of an override")
            }
            ForeignLinkTarget {
                selector, member, ..
            } => write!(
                f,
                "link to `{selector}` within a declaration of `{member}`"
            ),
            UnsupportedLinkUsage(member, _) => {
                write!(f, "unsupported use of a link to `{member}`")
            }
            MissingAccessorChain { member, kind, .. } => {
                write!(f, "link reaches missing `{kind}` accessor of `{member}`")
            }
            NoBase(member, _) => {
                write!(f, "`{member}` has no declaration preceding this layer")
            }
        }
    }
}

impl Error for LinkError {}

impl Diagnostic for LinkError {
    fn describe(&self) -> Vec<AnnotatedSpan<'_>> {
        use LinkError::*;

        match self {
            InvalidLayerName(span) => span
                .error("expected a string of the form \"Aspect\" or \"Aspect:Sub\"")
                .into(),
            TooManyLayers(span, _) => vec![span.mark_error()],
            InvalidWeavingAttribute(span) => span
                .error("this attribute")
                .with_help(
                    "expected [Override(Member, \"Layer\")] or \
                     [Introduce(\"Layer\")], but not both",
                )
                .into(),
            UnknownLayer(_, span) => span
                .error("this layer")
                .with_help("add the layer to [assembly: LayerOrder(...)]")
                .into(),
            AmbiguousLayer(_, span) => span
                .error("this layer")
                .with_help("each layer may appear in the layer order only once")
                .into(),
            DuplicateLayer { first, second, .. } => vec![
                first.note("first declared here"),
                second.error("declared again here"),
            ],
            OverrideWithoutTarget(_, span) => vec![span.mark_error()],
            AmbiguousTarget { span, decls, .. } => {
                let mut desc = vec![span.error("this override")];
                desc.extend(decls.iter().map(|decl| decl.note("candidate")));
                desc
            }
            IntroducedMemberExists { span, existing, .. } => vec![
                existing.note("declared here"),
                span.error("introduced here"),
            ],
            OverrideBeforeIntroduction { span, intro, .. } => vec![
                intro.note("introduced here"),
                span.error("this override"),
            ],
            ShapeMismatch { span, target, .. } => vec![
                target.note("overridden declaration"),
                span.error("this override"),
            ],
            MissingAccessor { span, .. } => vec![span.mark_error()],
            IncompleteEventOverride(_, span) => vec![span.mark_error()],
            LinkOutsideOverride(span) => span
                .error("this link")
                .with_help(
                    "links may appear only within declarations marked \
                     [Override] or [Introduce]",
                )
                .into(),
            ForeignLinkTarget { span, .. } => span
                .error("this link")
                .with_help("a link may only refer to the member being declared")
                .into(),
            UnsupportedLinkUsage(_, span) => span
                .error("this link")
                .with_help(
                    "invoke a method link, read or assign a property link, \
                     or use += and -= with an event link",
                )
                .into(),
            MissingAccessorChain { span, .. } => vec![span.mark_error()],
            NoBase(_, span) => span
                .error("this link")
                .with_help("use `original`, `self`, or `final` instead")
                .into(),
        }
    }
}
