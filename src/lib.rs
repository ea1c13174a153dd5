// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # codesurgeon
//!
//! Declarative patching of compiled .NET modules.
//!
//! A patch describes, as a tree of [`modification`]s, which types, fields, methods, properties and
//! events must exist, must not exist, or may be created inside one or more target modules. The
//! [`resolver`] reconciles that description against the real module contents exactly once per
//! session, and the [`transform`] layer rewrites method bodies moved from a patch module into a
//! target so that every embedded reference keeps pointing at the right definition.
//!
//! ## Architecture
//!
//! - [`metadata`] - In-memory object graph of a module: definitions, signatures, references, tokens
//! - [`assembly`] - CIL instructions, operands and the opcode table used for offset recomputation
//! - [`modification`] - The declarative modification tree with existence policies
//! - [`resolver`] - The memoized search context turning modifications into definitions
//! - [`importer`] - Signature import and the patch declaration surface
//! - [`transform`] - Token transformation and method body transplantation
//! - [`patch`] - Patches, the installer and its configuration
//! - [`io`] - Module and stream sources used to load and persist modules
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codesurgeon::prelude::*;
//! use std::sync::Arc;
//!
//! let source = Arc::new(MemoryModuleSource::new());
//! let patch = StandardPatch::new("RenameWidget");
//! let module = patch.module("Target", ModificationKind::FailIfMissing, false)?;
//! let ty = module.declare_type("N", "C", ModificationKind::FailIfMissing, false)?;
//! ty.set_attributes(TypeAttributes::PUBLIC);
//!
//! let mut installer = PatchInstaller::new(source);
//! installer.add(patch);
//! installer.install()?;
//! # Ok::<(), codesurgeon::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Errors raised while a patch is applied are wrapped in
//! [`Error::Patch`] with the patch name; symbol-level errors carry the symbol kind and full name.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

pub mod assembly;
pub mod importer;
pub mod io;
pub mod metadata;
pub mod modification;
pub mod patch;
pub mod prelude;
pub mod resolver;
pub mod transform;

pub use error::Error;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use patch::{InstallReport, InstallerConfig, Patch, PatchInstaller, StandardPatch};
pub use resolver::{ResolutionSession, Resolve, SearchContext};
