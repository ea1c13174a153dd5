//! Turning a compiled patch module into a modification tree.
//!
//! A patch can be written as an ordinary module: its types and members mirror the target, and a
//! [`PatchManifest`] states for each of them whether it is a dependency, a mixin that replaces a
//! body, an injected addition or a generated helper. [`PatchImporter`] walks the module and
//! builds the corresponding [`crate::patch::StandardPatch`]; the [`SignatureImporter`] rewrites
//! every reference to a patch definition into a reference to its modification, and the
//! [`ModuleTokenTransformer`] does the same for transplanted bodies.
//!
//! # Key Components
//!
//! - [`SignatureImporter`] - Binds patch definitions to modifications and imports signatures
//! - [`PatchManifest`], [`Declaration`], [`Intent`] - The declaration surface
//! - [`PatchImporter`] - Builds a patch from a module and its manifest
//! - [`ModuleTokenTransformer`] - Maps operands of patch bodies into the target

mod manifest;
mod patch;
mod signature;
mod transformer;

pub use manifest::{Declaration, Intent, PatchManifest};
pub use patch::PatchImporter;
pub use signature::{Continuation, SignatureImporter};
pub use transformer::ModuleTokenTransformer;
