//! Patches and their installation.
//!
//! A [`Patch`] is a named set of module modifications. [`StandardPatch`] is the general
//! implementation, built by hand or by [`crate::importer::PatchImporter`]. The
//! [`PatchInstaller`] applies patches through one resolution session and persists the modules
//! they changed.
//!
//! # Key Components
//!
//! - [`Patch`] - A named set of module modifications
//! - [`StandardPatch`] - Patch with get-or-create module requirements
//! - [`PatchInstaller`] - Applies patches and saves the touched modules
//! - [`InstallerConfig`] - Parallelism, verification and persistence settings
//! - [`InstallReport`] - What an installation did

pub mod config;
mod installer;
mod standard;

pub use config::InstallerConfig;
pub use installer::{InstallReport, PatchInstaller};
pub use standard::StandardPatch;

use crate::modification::ModuleModificationRc;

/// A named set of module modifications.
pub trait Patch: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// The modules the patch requires, with everything declared inside them
    fn modules(&self) -> Vec<ModuleModificationRc>;
}
