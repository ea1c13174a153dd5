use std::sync::{Arc, RwLock};

use crate::{
    modification::{
        get_or_insert, impl_modification, Header, Modification, ModificationKind, SymbolKind,
        TypeModification, TypeModificationRc,
    },
    Result,
};

/// Reference to a `ModuleModification`
pub type ModuleModificationRc = Arc<ModuleModification>;

/// A module a patch requires, with the top-level types it declares.
pub struct ModuleModification {
    header: Header,
    /// Module name, as understood by the module source
    pub name: String,
    types: RwLock<Vec<TypeModificationRc>>,
}

impl ModuleModification {
    /// Creates a module modification
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ModificationKind, read_only: bool) -> ModuleModificationRc {
        Arc::new(ModuleModification {
            header: Header::new(kind, read_only),
            name: name.into(),
            types: RwLock::new(Vec::new()),
        })
    }

    /// The module name
    pub fn full_name(&self) -> String {
        self.name.clone()
    }

    /// Declares a top-level type, or returns the existing declaration.
    ///
    /// Types declared inside a read-only module are read-only regardless of `read_only`.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the type was declared before with a different kind or
    /// read-only flag.
    pub fn declare_type(
        self: &Arc<Self>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        kind: ModificationKind,
        read_only: bool,
    ) -> Result<TypeModificationRc> {
        let namespace = namespace.into();
        let name = name.into();
        let read_only = read_only || self.read_only();

        let ty = get_or_insert(
            &self.types,
            kind,
            |t| t.namespace.as_deref() == Some(namespace.as_str()) && t.name == name,
            || TypeModification::top_level(self, namespace.clone(), name.clone(), kind, read_only),
        )?;

        if ty.read_only() != read_only {
            return Err(symbol_error!(
                Conflict,
                SymbolKind::Type,
                ty.full_name(),
                "existing type is {} but {} was requested",
                access_mode(ty.read_only()),
                access_mode(read_only)
            ));
        }
        Ok(ty)
    }

    /// Declared top-level types
    pub fn types(&self) -> Vec<TypeModificationRc> {
        snapshot!(self.types)
    }

    /// Finds a declared top-level type
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<TypeModificationRc> {
        read_lock!(self.types)
            .iter()
            .find(|t| t.namespace.as_deref() == Some(namespace) && t.name == name)
            .cloned()
    }
}

impl_modification!(ModuleModification, SymbolKind::Module);

pub(crate) fn access_mode(read_only: bool) -> &'static str {
    if read_only {
        "read-only"
    } else {
        "writable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn declare_type_returns_existing() {
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let a = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();
        let b = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(module.types().len(), 1);
        assert!(Arc::ptr_eq(&a.module().unwrap(), &module));
    }

    #[test]
    fn conflicting_declarations() {
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();

        let err = module
            .declare_type("N", "C", ModificationKind::CreateIfMissing, false)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        let err = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .unwrap_err();
        assert!(err.to_string().contains("writable but read-only was requested"));
    }

    #[test]
    fn read_only_module_makes_types_read_only() {
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();
        assert!(ty.read_only());
        assert!(module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .is_ok());
    }
}
