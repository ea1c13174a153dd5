//! Resolution of modifications into definitions.
//!
//! A [`SearchContext`] turns every node of a modification tree into exactly one definition of a
//! loaded module. [`ResolutionSession`] is the implementation used by the installer: it loads
//! modules on demand, memoizes every resolved modification for the lifetime of the session, and
//! serializes check-then-create per modification so concurrent callers observe the same
//! definition.
//!
//! Declarative references and signatures become concrete ones through [`Resolve`].
//!
//! # Key Components
//!
//! - [`SearchContext`] - Module lookup and modification resolution
//! - [`ResolutionSession`] - The memoized, per-install implementation
//! - [`Resolve`] - Maps references and signatures through a context
//! - [`merge`] - Attribute reconciliation rules
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use codesurgeon::prelude::*;
//!
//! let target = ModuleDef::new("Target");
//! target.add_type(TypeDef::new("N", "C", TypeAttributes::PUBLIC));
//! let source = Arc::new(MemoryModuleSource::new());
//! source.insert(target);
//!
//! let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
//! let ty = module.declare_type("N", "C", ModificationKind::FailIfMissing, true)?;
//!
//! let session = ResolutionSession::new(source);
//! let first = session.resolve_type(&ty)?;
//! let second = session.resolve_type(&ty)?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok::<(), codesurgeon::Error>(())
//! ```

pub mod merge;
mod references;
mod session;
mod symbols;

pub use references::Resolve;
pub use session::ResolutionSession;

use crate::{
    metadata::{
        members::{EventDefRc, FieldDefRc, PropertyDefRc},
        method::MethodDefRc,
        module::ModuleDefRc,
        typesystem::TypeDefRc,
        Definition,
    },
    modification::{
        AnyModification, EventModificationRc, FieldModificationRc, MethodModificationRc,
        Modification, ModuleModificationRc, PropertyModificationRc, TypeModificationRc,
    },
    Error, Result,
};

/// Looks up modules and resolves modifications into definitions.
pub trait SearchContext: Send + Sync {
    /// Returns the module with the given name, loading it on first use.
    ///
    /// # Errors
    /// [`Error::ModuleNotFound`] if no such module exists.
    fn module(&self, name: &str) -> Result<ModuleDefRc>;

    /// Resolves a modification into its definition.
    ///
    /// # Errors
    /// Any symbol-level error raised while applying the existence policy or reconciling the
    /// definition.
    fn resolve(&self, modification: &AnyModification) -> Result<Definition>;

    /// Resolves a module modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_module(&self, modification: &ModuleModificationRc) -> Result<ModuleDefRc> {
        match self.resolve(&AnyModification::Module(modification.clone()))? {
            Definition::Module(module) => Ok(module),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }

    /// Resolves a type modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_type(&self, modification: &TypeModificationRc) -> Result<TypeDefRc> {
        match self.resolve(&AnyModification::Type(modification.clone()))? {
            Definition::Type(ty) => Ok(ty),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }

    /// Resolves a field modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_field(&self, modification: &FieldModificationRc) -> Result<FieldDefRc> {
        match self.resolve(&AnyModification::Field(modification.clone()))? {
            Definition::Field(field) => Ok(field),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }

    /// Resolves a method modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_method(&self, modification: &MethodModificationRc) -> Result<MethodDefRc> {
        match self.resolve(&AnyModification::Method(modification.clone()))? {
            Definition::Method(method) => Ok(method),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }

    /// Resolves a property modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_property(&self, modification: &PropertyModificationRc) -> Result<PropertyDefRc> {
        match self.resolve(&AnyModification::Property(modification.clone()))? {
            Definition::Property(property) => Ok(property),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }

    /// Resolves an event modification
    ///
    /// # Errors
    /// See [`SearchContext::resolve`].
    fn resolve_event(&self, modification: &EventModificationRc) -> Result<EventDefRc> {
        match self.resolve(&AnyModification::Event(modification.clone()))? {
            Definition::Event(event) => Ok(event),
            other => Err(mismatch(modification.as_ref(), &other)),
        }
    }
}

fn mismatch(modification: &dyn Modification, definition: &Definition) -> Error {
    Error::Error(format!(
        "{} {} resolved to a {}",
        modification.symbol_kind(),
        modification.full_name(),
        definition.kind()
    ))
}
