//! Installer configuration
//!
//! Controls how the installer applies patches and whether it persists the result.

/// Suffix used for hidden methods holding replaced bodies
pub const DEFAULT_HIDDEN_METHOD_SUFFIX: &str = "<Base>$";

/// Configuration for [`crate::PatchInstaller`]
///
/// Every run resolves each patch in registration order. Within a patch, types are always
/// resolved sequentially; members can be resolved on the rayon thread pool, since the resolution
/// session serializes check-then-create per modification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallerConfig {
    /// Resolve the members of each type in parallel
    pub parallel: bool,

    /// Resolve read-only modifications first, before anything is written
    /// A patch whose dependencies are missing then fails without touching any module
    pub verify_dependencies: bool,

    /// Save every module touched by a writable modification after all patches succeeded
    pub persist: bool,

    /// Suffix for hidden methods; the full name is `{method}{suffix}{index}`
    pub hidden_method_suffix: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            verify_dependencies: true,
            persist: true,
            hidden_method_suffix: DEFAULT_HIDDEN_METHOD_SUFFIX.to_string(),
        }
    }
}

impl InstallerConfig {
    /// Resolves everything on the calling thread
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Resolves members through rayon
    #[must_use]
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Self::default()
        }
    }

    /// Applies every patch to the loaded modules but saves nothing
    ///
    /// Useful to check that a set of patches installs cleanly.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            persist: false,
            ..Self::default()
        }
    }

    /// Uses `suffix` for hidden methods
    #[must_use]
    pub fn with_hidden_method_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.hidden_method_suffix = suffix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = InstallerConfig::default();
        assert!(!default.parallel);
        assert!(default.verify_dependencies);
        assert!(default.persist);
        assert_eq!(default.hidden_method_suffix, "<Base>$");

        assert_eq!(InstallerConfig::sequential(), default);
        assert!(InstallerConfig::parallel().parallel);
        assert!(!InstallerConfig::dry_run().persist);
        assert_eq!(
            InstallerConfig::default()
                .with_hidden_method_suffix("$orig")
                .hidden_method_suffix,
            "$orig"
        );
    }
}
