// Source language front-end
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

//! Source language front-end.
//!
//! Aspects are authored as ordinary classes whose members carry
//!   attributes describing what they override,
//!   and whose bodies refer to other declarations of the same member
//!   through link markers.
//! This module provides just enough of a language to express that:
//!
//!   - [`ast`] defines the tree and the [`LinkTable`](ast::LinkTable) side
//!       table of link markers;
//!   - [`lex`] and [`parse`] produce a [`ParsedUnit`](ast::ParsedUnit)
//!       from source text;
//!   - [`print`] renders a tree back into source text deterministically;
//!       and
//!   - [`eval`] executes a tree so that the observable behavior of linked
//!       output can be compared against its input.
//!
//! Layering conventions
//! ====================
//! The order in which aspects apply is given by a single assembly
//!   attribute,
//!     innermost layer first:
//!
//! ```text
//! [assembly: LayerOrder("Logging", "Caching:Read")]
//! ```
//!
//! A layer is named `aspect` or `aspect:sublayer`.
//! Members then declare their role:
//!
//!   - `[Override(Member, "Layer")]` overrides `Member` at `Layer`;
//!   - `[Introduce("Layer")]` introduces a member with no source
//!       declaration;
//!   - `[NotInlineable]` forbids inlining the declaration into callers;
//!       and
//!   - `[NotDiscardable]` retains the declaration even if nothing
//!       refers to it.
//!
//! Within an override,
//!   `link(Member, original|base|self|final[, inline|noinline])` refers to
//!   another declaration of the same member.
//! How it is used determines which accessor it reaches:
//!   `link(M, base)(x)` invokes,
//!   `link(P, base)` reads,
//!   `link(P, base) = v` writes,
//!   and `link(E, base) += h` and `-= h` add and remove handlers.

pub mod ast;
pub mod eval;
pub mod lex;
pub mod parse;
pub mod print;
