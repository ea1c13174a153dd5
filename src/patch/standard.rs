use std::sync::RwLock;

use crate::{
    modification::{
        access_mode, Modification, ModificationKind, ModuleModification, ModuleModificationRc,
        SymbolKind,
    },
    patch::Patch,
    Result,
};

/// A patch assembled by hand or by the importer.
pub struct StandardPatch {
    name: String,
    modules: RwLock<Vec<ModuleModificationRc>>,
}

impl StandardPatch {
    /// Creates an empty patch
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        StandardPatch {
            name: name.into(),
            modules: RwLock::new(Vec::new()),
        }
    }

    /// Requires a module, or returns the existing requirement.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the module was required before with a different kind or
    /// read-only flag.
    pub fn module(
        &self,
        name: impl Into<String>,
        kind: ModificationKind,
        read_only: bool,
    ) -> Result<ModuleModificationRc> {
        let name = name.into();
        let mut modules = write_lock!(self.modules);

        if let Some(existing) = modules.iter().find(|m| m.name == name) {
            if existing.kind() != kind {
                return Err(symbol_error!(
                    Conflict,
                    SymbolKind::Module,
                    name,
                    "existing module {} has kind {} but kind {} was requested",
                    name,
                    existing.kind(),
                    kind
                ));
            }
            if existing.read_only() != read_only {
                return Err(symbol_error!(
                    Conflict,
                    SymbolKind::Module,
                    name,
                    "existing module {} is {} but {} was requested",
                    name,
                    access_mode(existing.read_only()),
                    access_mode(read_only)
                ));
            }
            return Ok(existing.clone());
        }

        let module = ModuleModification::new(name, kind, read_only);
        modules.push(module.clone());
        Ok(module)
    }
}

impl Patch for StandardPatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn modules(&self) -> Vec<ModuleModificationRc> {
        snapshot!(self.modules)
    }
}

impl std::fmt::Debug for StandardPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardPatch")
            .field("name", &self.name)
            .field("modules", &self.modules())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Error;

    #[test]
    fn modules_are_registered_once() {
        let patch = StandardPatch::new("Greeting");
        let a = patch
            .module("Target", ModificationKind::FailIfMissing, false)
            .unwrap();
        let b = patch
            .module("Target", ModificationKind::FailIfMissing, false)
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(patch.modules().len(), 1);
        assert_eq!(patch.name(), "Greeting");
    }

    #[test]
    fn conflicting_requirements() {
        let patch = StandardPatch::new("Greeting");
        patch
            .module("Target", ModificationKind::FailIfMissing, false)
            .unwrap();

        let err = patch
            .module("Target", ModificationKind::CreateIfMissing, false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflicting module Target: existing module Target has kind FailIfMissing but kind \
             CreateIfMissing was requested"
        );

        let err = patch
            .module("Target", ModificationKind::FailIfMissing, true)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(err
            .to_string()
            .ends_with("existing module Target is writable but read-only was requested"));
    }
}
