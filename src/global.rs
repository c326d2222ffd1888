// Global configuration
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

//! System-wide static configuration.
//!
//! This module provides a system-wide configuration.
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities or maintenance issues as requirements
//!   change.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature and risk.

/// A size capable of representing every source file loaded into a single
///   linker invocation.
pub type SourceCtxSize = u16;

/// A size capable of representing the byte length of any source file.
pub type SourceFileSize = u32;

/// A size capable of representing the byte length of a single token or
///   syntactic construct that a diagnostic may wish to point at.
///
/// Longer constructs are truncated to this length;
///   a diagnostic only needs to locate the beginning of an entity.
pub type FrontendTokenLength = u16;

/// A size capable of representing every expression node of a
///   compilation unit,
///     including nodes cloned while inlining.
pub type NodeIdSize = u32;

/// A size capable of representing every aspect layer applied to a
///   compilation unit,
///     plus one for the source declaration.
pub type LayerPosSize = u16;

/// A size capable of representing every logical member of a compilation
///   unit.
pub type MemberIdSize = u32;

/// Maximum number of evaluation steps taken by the evaluator before
///   giving up.
///
/// This exists to ensure that tests and `weaveld --eval` terminate even
///   when given a program that does not.
pub const EVAL_FUEL: u64 = 1_000_000;
