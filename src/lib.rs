// Aspect weaving linker
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

//! Aspect weaving linker.
//!
//! Aspects contribute declarations to the members of a class,
//!   each at a named layer,
//!   and each able to refer to the declarations beneath it through link
//!   markers.
//! The linker ([`ld`]) combines those declarations into ordinary members,
//!   inlining what it can.
//!
//! The [`syntax`] module provides the small C#-like language in which
//!   units are written,
//!     along with an evaluator used to verify that linking preserves
//!     behavior.

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

pub mod global;

#[macro_use]
extern crate static_assertions;

pub mod diagnose;
pub mod ld;
pub mod span;
pub mod syntax;
