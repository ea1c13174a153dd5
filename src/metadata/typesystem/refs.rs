//! References to types, fields and methods.
//!
//! A reference either points at a definition in a loaded module, names a symbol in a module the
//! engine does not track, or points at a modification that will only become a definition once a
//! resolution session resolves it. Definitions and modifications are held weakly so the
//! reference graph never keeps the owning module alive or forms cycles.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        members::FieldDef,
        method::MethodDef,
        signatures::{FieldSignature, MethodSignature, TypeSignature},
        typesystem::TypeDef,
    },
    modification::{FieldModification, MethodModification, TypeModification},
};

/// A weak reference to a shared object, compared by identity.
pub struct WeakRef<T> {
    weak_ref: Weak<T>,
}

impl<T> WeakRef<T> {
    /// Creates a weak reference to `strong`
    #[must_use]
    pub fn new(strong: &Arc<T>) -> Self {
        WeakRef {
            weak_ref: Arc::downgrade(strong),
        }
    }

    /// Get a strong reference, if the target is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.weak_ref.upgrade()
    }

    /// Returns `true` if the target is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// Returns `true` if both references point at the same object
    #[must_use]
    pub fn ptr_eq(&self, other: &WeakRef<T>) -> bool {
        Weak::ptr_eq(&self.weak_ref, &other.weak_ref)
    }

    /// Returns `true` if this reference points at `strong`
    #[must_use]
    pub fn points_to(&self, strong: &Arc<T>) -> bool {
        std::ptr::eq(self.weak_ref.as_ptr(), Arc::as_ptr(strong))
    }
}

impl<T> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        WeakRef {
            weak_ref: self.weak_ref.clone(),
        }
    }
}

/// A type in a module that is referenced but not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalType {
    /// Module or assembly the type lives in
    pub scope: String,
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Enclosing type of a nested type
    pub declaring_type: Option<Arc<ExternalType>>,
}

impl ExternalType {
    /// A top-level external type
    #[must_use]
    pub fn new(
        scope: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ExternalType {
            scope: scope.into(),
            namespace: namespace.into(),
            name: name.into(),
            declaring_type: None,
        }
    }

    /// A type nested inside `declaring_type`
    #[must_use]
    pub fn nested(declaring_type: Arc<ExternalType>, name: impl Into<String>) -> Self {
        ExternalType {
            scope: declaring_type.scope.clone(),
            namespace: String::new(),
            name: name.into(),
            declaring_type: Some(declaring_type),
        }
    }

    /// `Namespace.Name`, or `Outer/Inner` for nested types
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.declaring_type {
            Some(declaring) => format!("{}/{}", declaring.full_name(), self.name),
            None => join_name(&self.namespace, &self.name),
        }
    }
}

pub(crate) fn join_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

const DROPPED: &str = "<dropped>";

/// A reference to a type.
#[derive(Clone)]
pub enum TypeRef {
    /// A definition in a loaded module
    Def(WeakRef<TypeDef>),
    /// A type in a module that is not tracked
    External(Arc<ExternalType>),
    /// A type modification, resolved by the session
    Tracked(WeakRef<TypeModification>),
    /// A constructed type (generic instantiation, array, ...)
    Spec(Arc<TypeSignature>),
}

impl TypeRef {
    /// References a definition
    #[must_use]
    pub fn from_def(def: &Arc<TypeDef>) -> Self {
        TypeRef::Def(WeakRef::new(def))
    }

    /// References a type modification
    #[must_use]
    pub fn tracked(modification: &Arc<TypeModification>) -> Self {
        TypeRef::Tracked(WeakRef::new(modification))
    }

    /// References a top-level type in an untracked module
    #[must_use]
    pub fn external(
        scope: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        TypeRef::External(Arc::new(ExternalType::new(scope, namespace, name)))
    }

    /// References a constructed type
    #[must_use]
    pub fn spec(signature: TypeSignature) -> Self {
        TypeRef::Spec(Arc::new(signature))
    }

    /// The referenced definition, for [`TypeRef::Def`]
    #[must_use]
    pub fn definition(&self) -> Option<Arc<TypeDef>> {
        match self {
            TypeRef::Def(def) => def.upgrade(),
            _ => None,
        }
    }

    /// Full name of the referenced type
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            TypeRef::Def(def) => def
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |def| def.full_name()),
            TypeRef::External(external) => external.full_name(),
            TypeRef::Tracked(modification) => modification
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |m| m.full_name()),
            TypeRef::Spec(signature) => signature.to_string(),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            TypeRef::Def(_) => "Def",
            TypeRef::External(_) => "External",
            TypeRef::Tracked(_) => "Tracked",
            TypeRef::Spec(_) => "Spec",
        };
        write!(f, "TypeRef::{variant}({})", self.full_name())
    }
}

/// A field in a module that is referenced but not tracked.
#[derive(Debug, Clone)]
pub struct ExternalField {
    /// The declaring type
    pub declaring_type: TypeRef,
    /// Field name
    pub name: String,
    /// Field signature
    pub signature: FieldSignature,
}

/// A method in a module that is referenced but not tracked.
#[derive(Debug, Clone)]
pub struct ExternalMethod {
    /// The declaring type
    pub declaring_type: TypeRef,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: MethodSignature,
}

/// An instantiation of a generic method.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// The generic method
    pub method: MethodRef,
    /// Type arguments
    pub args: Vec<TypeSignature>,
}

/// A reference to a field.
#[derive(Clone)]
pub enum FieldRef {
    /// A definition in a loaded module
    Def(WeakRef<FieldDef>),
    /// A field in a module that is not tracked
    External(Arc<ExternalField>),
    /// A field modification, resolved by the session
    Tracked(WeakRef<FieldModification>),
}

impl FieldRef {
    /// References a definition
    #[must_use]
    pub fn from_def(def: &Arc<FieldDef>) -> Self {
        FieldRef::Def(WeakRef::new(def))
    }

    /// References a field modification
    #[must_use]
    pub fn tracked(modification: &Arc<FieldModification>) -> Self {
        FieldRef::Tracked(WeakRef::new(modification))
    }

    /// References a field of an untracked type
    #[must_use]
    pub fn external(
        declaring_type: TypeRef,
        name: impl Into<String>,
        signature: FieldSignature,
    ) -> Self {
        FieldRef::External(Arc::new(ExternalField {
            declaring_type,
            name: name.into(),
            signature,
        }))
    }

    /// The referenced definition, for [`FieldRef::Def`]
    #[must_use]
    pub fn definition(&self) -> Option<Arc<FieldDef>> {
        match self {
            FieldRef::Def(def) => def.upgrade(),
            _ => None,
        }
    }

    /// Full name of the referenced field
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            FieldRef::Def(def) => def
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |def| def.full_name()),
            FieldRef::External(external) => {
                format!("{}::{}", external.declaring_type.full_name(), external.name)
            }
            FieldRef::Tracked(modification) => modification
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |m| m.full_name()),
        }
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            FieldRef::Def(_) => "Def",
            FieldRef::External(_) => "External",
            FieldRef::Tracked(_) => "Tracked",
        };
        write!(f, "FieldRef::{variant}({})", self.full_name())
    }
}

/// A reference to a method.
#[derive(Clone)]
pub enum MethodRef {
    /// A definition in a loaded module
    Def(WeakRef<MethodDef>),
    /// A method in a module that is not tracked
    External(Arc<ExternalMethod>),
    /// A method modification, resolved by the session
    Tracked(WeakRef<MethodModification>),
    /// A generic method instantiation
    Spec(Arc<MethodSpec>),
}

impl MethodRef {
    /// References a definition
    #[must_use]
    pub fn from_def(def: &Arc<MethodDef>) -> Self {
        MethodRef::Def(WeakRef::new(def))
    }

    /// References a method modification
    #[must_use]
    pub fn tracked(modification: &Arc<MethodModification>) -> Self {
        MethodRef::Tracked(WeakRef::new(modification))
    }

    /// References a method of an untracked type
    #[must_use]
    pub fn external(
        declaring_type: TypeRef,
        name: impl Into<String>,
        signature: MethodSignature,
    ) -> Self {
        MethodRef::External(Arc::new(ExternalMethod {
            declaring_type,
            name: name.into(),
            signature,
        }))
    }

    /// The referenced definition, for [`MethodRef::Def`]
    #[must_use]
    pub fn definition(&self) -> Option<Arc<MethodDef>> {
        match self {
            MethodRef::Def(def) => def.upgrade(),
            _ => None,
        }
    }

    /// Full name of the referenced method
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            MethodRef::Def(def) => def
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |def| def.full_name()),
            MethodRef::External(external) => external
                .signature
                .format_member(&external.declaring_type.full_name(), &external.name),
            MethodRef::Tracked(modification) => modification
                .upgrade()
                .map_or_else(|| DROPPED.to_string(), |m| m.full_name()),
            MethodRef::Spec(spec) => {
                let args: Vec<String> = spec.args.iter().map(ToString::to_string).collect();
                format!("{}<{}>", spec.method.full_name(), args.join(", "))
            }
        }
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            MethodRef::Def(_) => "Def",
            MethodRef::External(_) => "External",
            MethodRef::Tracked(_) => "Tracked",
            MethodRef::Spec(_) => "Spec",
        };
        write!(f, "MethodRef::{variant}({})", self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::attributes::TypeAttributes;

    #[test]
    fn external_names() {
        let outer = Arc::new(ExternalType::new("System.Runtime", "System", "Environment"));
        let inner = ExternalType::nested(outer.clone(), "SpecialFolder");

        assert_eq!(outer.full_name(), "System.Environment");
        assert_eq!(inner.full_name(), "System.Environment/SpecialFolder");
        assert_eq!(inner.scope, "System.Runtime");
        assert_eq!(join_name("", "Program"), "Program");
    }

    #[test]
    fn weak_refs_compare_by_identity() {
        let a = Arc::new(TypeDef::new("N", "C", TypeAttributes::empty()));
        let b = Arc::new(TypeDef::new("N", "C", TypeAttributes::empty()));

        assert_eq!(TypeRef::from_def(&a), TypeRef::from_def(&a));
        assert_ne!(TypeRef::from_def(&a), TypeRef::from_def(&b));

        let weak = WeakRef::new(&a);
        assert!(weak.points_to(&a));
        drop(a);
        assert!(!weak.is_valid());
        assert_eq!(TypeRef::Def(weak).full_name(), "<dropped>");
    }

    #[test]
    fn member_names() {
        let console = TypeRef::external("System.Console", "System", "Console");
        let write_line = MethodRef::external(
            console,
            "WriteLine",
            MethodSignature::new_static(
                crate::metadata::signatures::Primitive::Void.into(),
                vec![crate::metadata::signatures::Primitive::String.into()],
            ),
        );
        assert_eq!(write_line.full_name(), "void System.Console::WriteLine(string)");
    }
}
