// Override chains
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

//! Override chains.
//!
//! Every member touched by an aspect is described by a [`MemberChains`]:
//!   an arena of the member's declarations ordered by [`LayerPos`],
//!   and one [`Chain`] per accessor kind referencing that arena.
//!
//! ```text
//!                  pos 0       pos 1         pos 2
//!   decls:       [ Source,    Log,          Cache:Read ]
//!   Get chain:   [ #0,        #1,           #2         ]
//!   Set chain:   [ #0,        #1                       ]
//! ```
//!
//! Element 0 of each chain is the member's first declaration:
//!   its source declaration if it has one,
//!   otherwise an opaque [`DeclOrigin::Inherited`] declaration standing
//!     for a member of a base class,
//!   otherwise its first introduction.
//! The last element of each chain is the _final_ declaration of that
//!   accessor,
//!     which carries the member's public name once linked.

use super::layer::{Layer, LayerPos};
use crate::{
    global,
    span::Span,
    syntax::ast::{
        accessor, AccessorKind, Block, Ident, Member, MemberHeader, Modifiers,
        Param, ParamMode, TypeName,
    },
};
use arrayvec::ArrayVec;
use std::fmt::{self, Display};

/// Index of a declaration within [`MemberChains::decls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(u16);

impl DeclId {
    pub(super) fn new(index: usize) -> Self {
        Self(index as u16)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// Index of a member within the members collected from a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(global::MemberIdSize);

impl MemberId {
    pub(super) fn new(index: usize) -> Self {
        Self(index as global::MemberIdSize)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of member being linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Property,
    Event,
}

impl MemberKind {
    pub fn of(member: &Member) -> Option<Self> {
        match member {
            Member::Field(_) => None,
            Member::Method(_) => Some(Self::Method),
            Member::Property(_) => Some(Self::Property),
            Member::Event(_) => Some(Self::Event),
        }
    }

    /// Whether links used as `kind` can reach a member of this kind.
    pub fn accepts(self, kind: AccessorKind) -> bool {
        use AccessorKind::*;

        match self {
            Self::Method => kind == Invoke,
            Self::Property => matches!(kind, Get | Set),
            Self::Event => matches!(kind, Add | Remove),
        }
    }
}

impl Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method => write!(f, "method"),
            Self::Property => write!(f, "property"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// Where a declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclOrigin {
    /// Declared in the class without weaving attributes.
    Source,

    /// Declared by a base class.
    ///
    /// Such a declaration is opaque:
    ///   it is never inlined or emitted,
    ///   and links to it are rendered as `base.Member`.
    Inherited { class: String },

    /// Introduced by an aspect with `[Introduce]`.
    Introduced(Layer),

    /// Declared by an aspect with `[Override]`.
    Override(Layer),
}

impl DeclOrigin {
    pub fn layer(&self) -> Option<&Layer> {
        match self {
            Self::Introduced(layer) | Self::Override(layer) => Some(layer),
            Self::Source | Self::Inherited { .. } => None,
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, Self::Inherited { .. })
    }
}

/// Linker directives attached to a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeclFlags {
    /// `[NotInlineable]`
    pub not_inlineable: bool,

    /// `[NotDiscardable]`
    pub not_discardable: bool,
}

/// A single declaration of a member.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDecl {
    pub pos: LayerPos,
    pub origin: DeclOrigin,
    pub flags: DeclFlags,

    /// The declaration as written,
    ///   or the base class's declaration if inherited.
    pub member: Member,

    /// Index of the declaration within its class,
    ///   or [`None`] if inherited.
    pub index: Option<usize>,
}

impl ChainDecl {
    pub fn header(&self) -> &MemberHeader {
        self.member.header()
    }

    pub fn span(&self) -> Span {
        self.member.span()
    }

    pub fn is_static(&self) -> bool {
        self.header().modifiers.is_static()
    }

    /// Parameters received by the body of the given accessor.
    ///
    /// Accessors that take a value receive it by value through the
    ///   implicit `value` parameter.
    pub fn params(&self, kind: AccessorKind) -> Vec<Param> {
        match (&self.member, kind) {
            (Member::Method(method), _) => method.params.clone(),
            (_, kind) if kind.takes_value() => vec![Param {
                mode: ParamMode::Value,
                ty: self.header().ty.clone(),
                name: Ident::new(VALUE_PARAM, self.span()),
            }],
            _ => vec![],
        }
    }

    /// Body of the given accessor.
    pub fn body(&self, kind: AccessorKind) -> Option<&Block> {
        match &self.member {
            Member::Method(method) if kind == AccessorKind::Invoke => {
                Some(&method.body)
            }
            Member::Property(prop) => {
                accessor(&prop.accessors, kind).map(|acc| &acc.body)
            }
            Member::Event(event) => {
                accessor(&event.accessors, kind).map(|acc| &acc.body)
            }
            _ => None,
        }
    }

    /// Accessor kinds that this declaration provides,
    ///   in declaration order.
    pub fn kinds(&self) -> ArrayVec<AccessorKind, 2> {
        match &self.member {
            Member::Method(_) => [AccessorKind::Invoke].into_iter().collect(),
            Member::Property(prop) => {
                prop.accessors.iter().map(|acc| acc.kind).collect()
            }
            Member::Event(event) => {
                event.accessors.iter().map(|acc| acc.kind).collect()
            }
            Member::Field(_) => ArrayVec::new(),
        }
    }

    /// Type of value produced by reading or invoking this declaration.
    pub fn result_type(&self) -> &TypeName {
        &self.header().ty
    }
}

/// Name of the implicit parameter of `set`, `add`, and `remove`.
pub const VALUE_PARAM: &str = "value";

/// Declarations providing one accessor kind,
///   ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub kind: AccessorKind,
    pub elems: Vec<DeclId>,
}

impl Chain {
    /// The final declaration of this chain.
    pub fn last(&self) -> DeclId {
        // Chains are constructed with at least element 0.
        self.elems[self.elems.len() - 1]
    }

    pub fn first(&self) -> DeclId {
        self.elems[0]
    }
}

/// All declarations of a single member of a class,
///   and the override chains through them.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberChains {
    pub id: MemberId,

    /// Index of the owning class within the unit.
    pub class: usize,
    pub class_name: String,

    /// Public name of the member.
    pub name: String,
    pub kind: MemberKind,

    /// Declarations ordered by position.
    pub decls: Vec<ChainDecl>,

    /// One chain per accessor kind of element 0.
    pub chains: ArrayVec<Chain, 2>,

    /// Index within the class of the first declaration of this member
    ///   to appear in source,
    ///     which determines where the linked member is placed.
    pub placement: usize,
}

impl MemberChains {
    pub fn decl(&self, id: DeclId) -> &ChainDecl {
        &self.decls[id.index()]
    }

    pub fn decl_ids(&self) -> impl Iterator<Item = DeclId> {
        (0..self.decls.len()).map(DeclId::new)
    }

    pub fn chain(&self, kind: AccessorKind) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.kind == kind)
    }

    /// The member's first declaration.
    pub fn first(&self) -> &ChainDecl {
        &self.decls[0]
    }

    /// Whether `decl` is the final declaration of the `kind` chain.
    pub fn is_final(&self, decl: DeclId, kind: AccessorKind) -> bool {
        self.chain(kind).map_or(false, |chain| chain.last() == decl)
    }

    /// Header from which the linked public member is derived:
    ///   that of the first non-inherited declaration.
    pub fn public_header(&self) -> &MemberHeader {
        self.decls
            .iter()
            .find(|decl| !decl.origin.is_inherited())
            .unwrap_or(&self.decls[0])
            .header()
    }

    /// Whether accesses to this member are made through its type rather
    ///   than an instance.
    pub fn is_static(&self) -> bool {
        self.public_header().modifiers.is_static()
    }

    /// Modifiers of retained intermediate declarations.
    pub fn intermediate_modifiers(&self) -> Modifiers {
        self.public_header().modifiers.privatized()
    }
}
