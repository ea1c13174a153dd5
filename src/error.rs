use thiserror::Error;

use crate::modification::SymbolKind;

/// Builds one of the symbol-level [`Error`] variants.
///
/// ```rust, ignore
/// return Err(symbol_error!(NotFound, SymbolKind::Type, modification.full_name()));
/// return Err(symbol_error!(Conflict, SymbolKind::Field, name, "kind {} was requested", kind));
/// ```
macro_rules! symbol_error {
    ($variant:ident, $kind:expr, $name:expr) => {
        crate::Error::$variant {
            kind: $kind,
            name: $name.to_string(),
        }
    };

    ($variant:ident, $kind:expr, $name:expr, $($arg:tt)*) => {
        crate::Error::$variant {
            kind: $kind,
            name: $name.to_string(),
            message: format!($($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Symbol Errors
/// - [`Error::Conflict`] - Two registrations of the same symbol with incompatible policy
/// - [`Error::NotFound`] - A `FailIfMissing` target is absent
/// - [`Error::AlreadyExists`] - A `FailIfPresent` target is present
/// - [`Error::IncompatibleSignature`] - An existing definition differs from the declared shape
/// - [`Error::ReadOnlyViolation`] - A required write targets a read-only symbol or module
/// - [`Error::CyclicResolution`] - A modification depends on its own resolution
///
/// ## Transplantation Errors
/// - [`Error::UnresolvedToken`] - A transplanted operand cannot be mapped
/// - [`Error::InvalidSignature`] - A signature has a shape that cannot be imported
///
/// ## Installation Errors
/// - [`Error::Patch`] - Any of the above, attributed to the patch that raised it
/// - [`Error::ModuleNotFound`] - A module source cannot produce the requested module
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust,no_run
/// use codesurgeon::{Error, PatchInstaller};
/// # fn run(installer: &PatchInstaller) {
/// match installer.install() {
///     Ok(report) => println!("saved {:?}", report.saved_modules),
///     Err(Error::Patch { patch, source }) => eprintln!("patch {patch} failed: {source}"),
///     Err(e) => eprintln!("install failed: {e}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The same symbol was registered twice with an incompatible kind or read-only flag.
    #[error("conflicting {kind} {name}: {message}")]
    Conflict {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
        /// What did not match
        message: String,
    },

    /// A symbol declared with `FailIfMissing` could not be found.
    #[error("could not find a definition for {kind} {name}")]
    NotFound {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
    },

    /// A symbol declared with `FailIfPresent` already exists.
    #[error("a definition for {kind} {name} already exists")]
    AlreadyExists {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
    },

    /// The existing definition has a signature or shape that is not compatible with the
    /// declaration.
    #[error("{kind} {name}: {message}")]
    IncompatibleSignature {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
        /// Which part of the shape differs
        message: String,
    },

    /// A required write targets a read-only symbol or module.
    #[error("failed to install {kind} {name}: symbol is read-only but a modification is required")]
    ReadOnlyViolation {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
    },

    /// A modification was requested again while it was still being resolved on the same thread.
    #[error("cyclic resolution of {kind} {name}")]
    CyclicResolution {
        /// The kind of symbol
        kind: SymbolKind,
        /// Full name of the symbol
        name: String,
    },

    /// An operand of a transplanted method body cannot be mapped into the target.
    #[error("unresolved token - {0}")]
    UnresolvedToken(String),

    /// A signature has a shape that cannot be imported or resolved.
    #[error("invalid signature - {0}")]
    InvalidSignature(String),

    /// The module source has no module with the given name.
    #[error("cannot open module {0}")]
    ModuleNotFound(String),

    /// An error raised while applying a patch, attributed to that patch.
    #[error("failed to install {patch}")]
    Patch {
        /// Name of the failing patch
        patch: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Filesystem I/O errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock target
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns the innermost error, skipping over [`Error::Patch`] wrappers.
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Error::Patch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the symbol kind and full name the error is about, if any.
    #[must_use]
    pub fn symbol(&self) -> Option<(SymbolKind, &str)> {
        match self.root() {
            Error::Conflict { kind, name, .. }
            | Error::NotFound { kind, name }
            | Error::AlreadyExists { kind, name }
            | Error::IncompatibleSignature { kind, name, .. }
            | Error::ReadOnlyViolation { kind, name }
            | Error::CyclicResolution { kind, name } => Some((*kind, name.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_wrapper_keeps_symbol() {
        let inner = symbol_error!(NotFound, SymbolKind::Method, "N.C::Nop");
        let err = Error::Patch {
            patch: "Greeting".to_string(),
            source: Box::new(inner),
        };

        assert_eq!(err.to_string(), "failed to install Greeting");
        assert_eq!(err.symbol(), Some((SymbolKind::Method, "N.C::Nop")));
        assert!(matches!(err.root(), Error::NotFound { .. }));
    }

    #[test]
    fn message_variants() {
        let err = symbol_error!(
            Conflict,
            SymbolKind::Field,
            "N.C::value",
            "kind {} was requested",
            "FailIfPresent"
        );
        assert_eq!(
            err.to_string(),
            "conflicting field N.C::value: kind FailIfPresent was requested"
        );

        let err = symbol_error!(ReadOnlyViolation, SymbolKind::Type, "N.C");
        assert!(err.to_string().starts_with("failed to install type N.C"));
    }
}
