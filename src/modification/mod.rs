//! The declarative modification tree.
//!
//! A patch describes the state it needs as a tree of modifications: modules contain types, types
//! contain nested types and members. Each node carries an existence policy
//! ([`ModificationKind`]) and a read-only flag. Nodes are created through get-or-create accessors
//! that reject a second registration of the same symbol with a different policy.
//!
//! Modifications are resolved into definitions by a [`crate::resolver::ResolutionSession`]; they
//! never touch a module themselves.
//!
//! # Key Components
//!
//! - [`ModuleModification`] - A module and its top-level types
//! - [`TypeModification`] - A type with its nested types and members
//! - [`FieldModification`], [`MethodModification`], [`PropertyModification`],
//!   [`EventModification`] - Members
//! - [`Modification`] - Shared behavior: identity, policy, existence checks
//!
//! # Examples
//!
//! ```rust
//! use codesurgeon::modification::{ModificationKind, ModuleModification};
//! use codesurgeon::metadata::signatures::{MethodSignature, Primitive};
//!
//! let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
//! let ty = module.declare_type("N", "C", ModificationKind::FailIfMissing, false)?;
//! let nop = ty.method(
//!     "Nop",
//!     MethodSignature::new_static(Primitive::Void.into(), vec![]),
//!     ModificationKind::FailIfMissing,
//! )?;
//!
//! assert_eq!(nop.full_name(), "void N.C::Nop()");
//! assert!(ty.method(
//!     "Nop",
//!     MethodSignature::new_static(Primitive::Void.into(), vec![]),
//!     ModificationKind::FailIfPresent,
//! ).is_err());
//! # Ok::<(), codesurgeon::Error>(())
//! ```

mod members;
mod module;
mod types;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};

use strum::Display;

pub use members::{
    EventModification, EventModificationRc, FieldModification, FieldModificationRc,
    MethodModification, MethodModificationRc, PropertyModification, PropertyModificationRc,
    TransplantBody,
};
pub(crate) use module::access_mode;
pub use module::{ModuleModification, ModuleModificationRc};
pub use types::{TypeModification, TypeModificationRc};

use crate::Result;

/// Existence policy of a modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModificationKind {
    /// The symbol must not exist yet; it is created
    FailIfPresent,
    /// The symbol must already exist
    FailIfMissing,
    /// The symbol is created when absent
    CreateIfMissing,
}

/// The kind of symbol a modification or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolKind {
    /// A module
    Module,
    /// A type
    Type,
    /// A field
    Field,
    /// A method
    Method,
    /// A property
    Property,
    /// An event
    Event,
}

/// Process-wide identity of a modification, used as memoization key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModificationId(u64);

impl ModificationId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ModificationId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Identity, policy and read-only flag shared by every modification.
#[derive(Debug)]
pub(crate) struct Header {
    id: ModificationId,
    kind: ModificationKind,
    read_only: bool,
}

impl Header {
    pub(crate) fn new(kind: ModificationKind, read_only: bool) -> Self {
        Header {
            id: ModificationId::next(),
            kind,
            read_only,
        }
    }
}

/// Behavior shared by every node of the modification tree.
pub trait Modification: Send + Sync {
    /// Session-independent identity
    fn id(&self) -> ModificationId;

    /// Existence policy
    fn kind(&self) -> ModificationKind;

    /// Returns `true` if the symbol must not be written to
    fn read_only(&self) -> bool;

    /// The kind of symbol
    fn symbol_kind(&self) -> SymbolKind;

    /// Full name, used in errors and logs
    fn full_name(&self) -> String;

    /// Applies the existence policy to the lookup result.
    ///
    /// Returns `true` if a definition has to be created.
    ///
    /// # Errors
    /// [`crate::Error::AlreadyExists`] for `FailIfPresent` symbols that were found,
    /// [`crate::Error::NotFound`] for `FailIfMissing` symbols that were not.
    fn check_existence(&self, found: bool) -> Result<bool> {
        match self.kind() {
            ModificationKind::FailIfPresent if found => Err(symbol_error!(
                AlreadyExists,
                self.symbol_kind(),
                self.full_name()
            )),
            ModificationKind::FailIfPresent => Ok(true),
            ModificationKind::FailIfMissing if !found => {
                Err(symbol_error!(NotFound, self.symbol_kind(), self.full_name()))
            }
            ModificationKind::FailIfMissing => Ok(false),
            ModificationKind::CreateIfMissing => Ok(!found),
        }
    }

    /// Must be called before any write to the resolved definition.
    ///
    /// # Errors
    /// [`crate::Error::ReadOnlyViolation`] if the modification is read-only.
    fn begin_modify(&self) -> Result<()> {
        if self.read_only() {
            return Err(symbol_error!(
                ReadOnlyViolation,
                self.symbol_kind(),
                self.full_name()
            ));
        }
        Ok(())
    }
}

macro_rules! impl_modification {
    ($ty:ty, $symbol:expr) => {
        impl crate::modification::Modification for $ty {
            fn id(&self) -> crate::modification::ModificationId {
                self.header.id
            }

            fn kind(&self) -> crate::modification::ModificationKind {
                self.header.kind
            }

            fn read_only(&self) -> bool {
                self.header.read_only
            }

            fn symbol_kind(&self) -> crate::modification::SymbolKind {
                $symbol
            }

            fn full_name(&self) -> String {
                <$ty>::full_name(self)
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("name", &<$ty>::full_name(self))
                    .field("kind", &self.header.kind)
                    .field("read_only", &self.header.read_only)
                    .finish_non_exhaustive()
            }
        }
    };
}
pub(crate) use impl_modification;

/// Any node of the modification tree.
#[derive(Clone)]
pub enum AnyModification {
    /// A module
    Module(ModuleModificationRc),
    /// A type
    Type(TypeModificationRc),
    /// A field
    Field(FieldModificationRc),
    /// A method
    Method(MethodModificationRc),
    /// A property
    Property(PropertyModificationRc),
    /// An event
    Event(EventModificationRc),
}

impl AnyModification {
    /// The node as a trait object
    #[must_use]
    pub fn as_dyn(&self) -> &dyn Modification {
        match self {
            AnyModification::Module(m) => m.as_ref(),
            AnyModification::Type(m) => m.as_ref(),
            AnyModification::Field(m) => m.as_ref(),
            AnyModification::Method(m) => m.as_ref(),
            AnyModification::Property(m) => m.as_ref(),
            AnyModification::Event(m) => m.as_ref(),
        }
    }

    /// Collects `root` and every node below it, parents before children
    #[must_use]
    pub fn walk(root: &ModuleModificationRc) -> Vec<AnyModification> {
        let mut result = vec![AnyModification::Module(root.clone())];
        let mut stack: Vec<TypeModificationRc> = root.types();
        stack.reverse();

        while let Some(ty) = stack.pop() {
            result.push(AnyModification::Type(ty.clone()));
            result.extend(ty.fields().into_iter().map(AnyModification::Field));
            result.extend(ty.methods().into_iter().map(AnyModification::Method));
            result.extend(ty.properties().into_iter().map(AnyModification::Property));
            result.extend(ty.events().into_iter().map(AnyModification::Event));

            let mut nested = ty.nested_types();
            nested.reverse();
            stack.extend(nested);
        }
        result
    }
}

impl std::fmt::Debug for AnyModification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.as_dyn();
        write!(f, "{} {} ({})", node.symbol_kind(), node.full_name(), node.kind())
    }
}

/// Returns the entry of `list` matching `matches`, or inserts the result of `create`.
///
/// An existing entry registered with a different kind is a conflict.
pub(crate) fn get_or_insert<T, M, C>(
    list: &RwLock<Vec<Arc<T>>>,
    kind: ModificationKind,
    matches: M,
    create: C,
) -> Result<Arc<T>>
where
    T: Modification,
    M: Fn(&T) -> bool,
    C: FnOnce() -> Arc<T>,
{
    let mut entries = write_lock!(list);
    if let Some(existing) = entries.iter().find(|entry| matches(entry)) {
        if existing.kind() != kind {
            return Err(symbol_error!(
                Conflict,
                existing.symbol_kind(),
                existing.full_name(),
                "existing symbol has kind {} but kind {} was requested",
                existing.kind(),
                kind
            ));
        }
        return Ok(existing.clone());
    }

    let created = create();
    entries.push(created.clone());
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn existence_policy() {
        let module = ModuleModification::new("M", ModificationKind::FailIfMissing, false);
        let present = module
            .declare_type("N", "A", ModificationKind::FailIfPresent, false)
            .unwrap();
        let missing = module
            .declare_type("N", "B", ModificationKind::FailIfMissing, false)
            .unwrap();
        let create = module
            .declare_type("N", "C", ModificationKind::CreateIfMissing, false)
            .unwrap();

        assert!(matches!(
            present.check_existence(true),
            Err(Error::AlreadyExists { .. })
        ));
        assert!(present.check_existence(false).unwrap());
        assert!(matches!(
            missing.check_existence(false),
            Err(Error::NotFound { .. })
        ));
        assert!(!missing.check_existence(true).unwrap());
        assert!(create.check_existence(false).unwrap());
        assert!(!create.check_existence(true).unwrap());
    }

    #[test]
    fn read_only_refuses_writes() {
        let module = ModuleModification::new("M", ModificationKind::FailIfMissing, true);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap();

        assert!(ty.read_only());
        let err = ty.begin_modify().unwrap_err();
        assert_eq!(err.symbol(), Some((SymbolKind::Type, "N.C")));
    }

    #[test]
    fn ids_are_unique() {
        let a = ModuleModification::new("A", ModificationKind::FailIfMissing, false);
        let b = ModuleModification::new("B", ModificationKind::FailIfMissing, false);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn walk_visits_parents_first() {
        let module = ModuleModification::new("M", ModificationKind::FailIfMissing, false);
        let outer = module
            .declare_type("N", "Outer", ModificationKind::FailIfMissing, false)
            .unwrap();
        let inner = outer
            .nested_type("Inner", ModificationKind::CreateIfMissing)
            .unwrap();
        inner
            .field(
                "value",
                crate::metadata::signatures::FieldSignature::new(
                    crate::metadata::signatures::Primitive::I4.into(),
                ),
                ModificationKind::CreateIfMissing,
            )
            .unwrap();

        let names: Vec<String> = AnyModification::walk(&module)
            .iter()
            .map(|m| m.as_dyn().full_name())
            .collect();
        assert_eq!(
            names,
            vec!["M", "N.Outer", "N.Outer/Inner", "N.Outer/Inner::value"]
        );
    }
}
