use std::sync::{Arc, RwLock, Weak};

use crate::{
    metadata::{
        attributes::TypeAttributes,
        signatures::{FieldSignature, MethodSignature, PropertySignature, SigComparer},
        typesystem::{join_name, GenericParameter, TypeRef},
    },
    modification::{
        get_or_insert, impl_modification, EventModification, EventModificationRc,
        FieldModification, FieldModificationRc, Header, MethodModification, MethodModificationRc,
        Modification, ModificationKind, ModuleModification, ModuleModificationRc,
        PropertyModification, PropertyModificationRc, SymbolKind,
    },
    Result,
};

/// Reference to a `TypeModification`
pub type TypeModificationRc = Arc<TypeModification>;

enum Parent {
    Module(Weak<ModuleModification>),
    Declaring(Weak<TypeModification>),
}

/// A type a patch requires, with its nested types and members.
///
/// Top-level types carry a namespace (possibly empty); nested types have none and are identified
/// by their declaring type and name.
pub struct TypeModification {
    header: Header,
    /// Namespace, `None` for nested types
    pub namespace: Option<String>,
    /// Simple name
    pub name: String,
    parent: Parent,
    attributes: RwLock<Option<TypeAttributes>>,
    base_type: RwLock<Option<TypeRef>>,
    interfaces: RwLock<Vec<TypeRef>>,
    generic_params: RwLock<Option<Vec<GenericParameter>>>,
    nested_types: RwLock<Vec<TypeModificationRc>>,
    fields: RwLock<Vec<FieldModificationRc>>,
    methods: RwLock<Vec<MethodModificationRc>>,
    properties: RwLock<Vec<PropertyModificationRc>>,
    events: RwLock<Vec<EventModificationRc>>,
}

impl TypeModification {
    fn new(
        namespace: Option<String>,
        name: String,
        parent: Parent,
        kind: ModificationKind,
        read_only: bool,
    ) -> TypeModificationRc {
        Arc::new(TypeModification {
            header: Header::new(kind, read_only),
            namespace,
            name,
            parent,
            attributes: RwLock::new(None),
            base_type: RwLock::new(None),
            interfaces: RwLock::new(Vec::new()),
            generic_params: RwLock::new(None),
            nested_types: RwLock::new(Vec::new()),
            fields: RwLock::new(Vec::new()),
            methods: RwLock::new(Vec::new()),
            properties: RwLock::new(Vec::new()),
            events: RwLock::new(Vec::new()),
        })
    }

    pub(crate) fn top_level(
        module: &ModuleModificationRc,
        namespace: String,
        name: String,
        kind: ModificationKind,
        read_only: bool,
    ) -> TypeModificationRc {
        Self::new(
            Some(namespace),
            name,
            Parent::Module(Arc::downgrade(module)),
            kind,
            read_only,
        )
    }

    /// The module declaring this type, following declaring types of nested types
    pub fn module(&self) -> Option<ModuleModificationRc> {
        match &self.parent {
            Parent::Module(module) => module.upgrade(),
            Parent::Declaring(declaring) => declaring.upgrade().and_then(|d| d.module()),
        }
    }

    /// The enclosing type of a nested type
    pub fn declaring_type(&self) -> Option<TypeModificationRc> {
        match &self.parent {
            Parent::Declaring(declaring) => declaring.upgrade(),
            Parent::Module(_) => None,
        }
    }

    /// Returns `true` for nested types
    pub fn is_nested(&self) -> bool {
        self.namespace.is_none()
    }

    /// `Namespace.Name`, or `Outer/Inner` for nested types
    pub fn full_name(&self) -> String {
        match (&self.namespace, self.declaring_type()) {
            (Some(namespace), _) => join_name(namespace, &self.name),
            (None, Some(declaring)) => format!("{}/{}", declaring.full_name(), self.name),
            (None, None) => self.name.clone(),
        }
    }

    /// Declared flags, `None` if the existing flags are accepted as they are
    pub fn attributes(&self) -> Option<TypeAttributes> {
        *read_lock!(self.attributes)
    }

    /// Declares the flags
    pub fn set_attributes(&self, attributes: TypeAttributes) {
        *write_lock!(self.attributes) = Some(attributes);
    }

    /// Declared base type
    pub fn base_type(&self) -> Option<TypeRef> {
        read_lock!(self.base_type).clone()
    }

    /// Declares the base type
    pub fn set_base_type(&self, base_type: Option<TypeRef>) {
        *write_lock!(self.base_type) = base_type;
    }

    /// Declared interfaces
    pub fn interfaces(&self) -> Vec<TypeRef> {
        snapshot!(self.interfaces)
    }

    /// Declares an implemented interface; duplicates are ignored
    pub fn add_interface(&self, interface: TypeRef) {
        let mut interfaces = write_lock!(self.interfaces);
        if !interfaces
            .iter()
            .any(|existing| SigComparer::STRICT.type_refs_equal(existing, &interface))
        {
            interfaces.push(interface);
        }
    }

    /// Declared generic parameters, `None` if the declaration does not care
    pub fn generic_params(&self) -> Option<Vec<GenericParameter>> {
        read_lock!(self.generic_params).clone()
    }

    /// Declares the generic parameters
    pub fn set_generic_params(&self, params: Vec<GenericParameter>) {
        *write_lock!(self.generic_params) = Some(params);
    }

    /// Declares a nested type, or returns the existing declaration.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the type was declared before with a different kind.
    pub fn nested_type(
        self: &Arc<Self>,
        name: impl Into<String>,
        kind: ModificationKind,
    ) -> Result<TypeModificationRc> {
        let name = name.into();
        get_or_insert(
            &self.nested_types,
            kind,
            |t| t.name == name,
            || {
                Self::new(
                    None,
                    name.clone(),
                    Parent::Declaring(Arc::downgrade(self)),
                    kind,
                    self.read_only(),
                )
            },
        )
    }

    /// Declares a field, or returns the existing declaration.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the field was declared before with a different kind.
    pub fn field(
        self: &Arc<Self>,
        name: impl Into<String>,
        signature: FieldSignature,
        kind: ModificationKind,
    ) -> Result<FieldModificationRc> {
        let name = name.into();
        get_or_insert(
            &self.fields,
            kind,
            |f| f.name == name,
            || FieldModification::new(self, name.clone(), signature, kind, self.read_only()),
        )
    }

    /// Declares a method, or returns the existing declaration of the same overload.
    ///
    /// Overloads are identified by name and by parameter types; the return type does not take
    /// part.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the method was declared before with a different kind.
    pub fn method(
        self: &Arc<Self>,
        name: impl Into<String>,
        signature: MethodSignature,
        kind: ModificationKind,
    ) -> Result<MethodModificationRc> {
        let name = name.into();
        let comparer = SigComparer::overload();
        get_or_insert(
            &self.methods,
            kind,
            |m| m.name == name && comparer.method_sigs_equal(&m.signature, &signature),
            || MethodModification::new(self, name.clone(), signature.clone(), kind, self.read_only()),
        )
    }

    /// Declares a property, or returns the existing declaration.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the property was declared before with a different kind.
    pub fn property(
        self: &Arc<Self>,
        name: impl Into<String>,
        signature: PropertySignature,
        kind: ModificationKind,
    ) -> Result<PropertyModificationRc> {
        let name = name.into();
        get_or_insert(
            &self.properties,
            kind,
            |p| p.name == name,
            || PropertyModification::new(self, name.clone(), signature, kind, self.read_only()),
        )
    }

    /// Declares an event, or returns the existing declaration.
    ///
    /// # Errors
    /// [`crate::Error::Conflict`] if the event was declared before with a different kind.
    pub fn event(
        self: &Arc<Self>,
        name: impl Into<String>,
        event_type: TypeRef,
        kind: ModificationKind,
    ) -> Result<EventModificationRc> {
        let name = name.into();
        get_or_insert(
            &self.events,
            kind,
            |e| e.name == name,
            || EventModification::new(self, name.clone(), event_type, kind, self.read_only()),
        )
    }

    /// Declared nested types
    pub fn nested_types(&self) -> Vec<TypeModificationRc> {
        snapshot!(self.nested_types)
    }

    /// Declared fields
    pub fn fields(&self) -> Vec<FieldModificationRc> {
        snapshot!(self.fields)
    }

    /// Declared methods
    pub fn methods(&self) -> Vec<MethodModificationRc> {
        snapshot!(self.methods)
    }

    /// Declared properties
    pub fn properties(&self) -> Vec<PropertyModificationRc> {
        snapshot!(self.properties)
    }

    /// Declared events
    pub fn events(&self) -> Vec<EventModificationRc> {
        snapshot!(self.events)
    }
}

impl_modification!(TypeModification, SymbolKind::Type);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::signatures::{Primitive, TypeSignature},
        Error,
    };

    fn declared() -> TypeModificationRc {
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        module
            .declare_type("N", "C", ModificationKind::FailIfMissing, false)
            .unwrap()
    }

    #[test]
    fn methods_are_keyed_by_overload() {
        let ty = declared();
        let by_string = ty
            .method(
                "Run",
                MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::String.into()]),
                ModificationKind::FailIfMissing,
            )
            .unwrap();
        let by_int = ty
            .method(
                "Run",
                MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::I4.into()]),
                ModificationKind::CreateIfMissing,
            )
            .unwrap();
        let same_params = ty
            .method(
                "Run",
                MethodSignature::new_static(Primitive::I4.into(), vec![Primitive::String.into()]),
                ModificationKind::FailIfMissing,
            )
            .unwrap();

        assert!(!Arc::ptr_eq(&by_string, &by_int));
        assert!(Arc::ptr_eq(&by_string, &same_params));
        assert_eq!(ty.methods().len(), 2);
    }

    #[test]
    fn member_kind_conflicts() {
        let ty = declared();
        let sig = FieldSignature::new(Primitive::I4.into());
        ty.field("value", sig.clone(), ModificationKind::CreateIfMissing)
            .unwrap();

        let err = ty
            .field("value", sig, ModificationKind::FailIfPresent)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { kind: SymbolKind::Field, .. }));
        assert!(err
            .to_string()
            .contains("kind CreateIfMissing but kind FailIfPresent"));
    }

    #[test]
    fn nested_types_inherit_read_only() {
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let outer = module
            .declare_type("N", "Outer", ModificationKind::FailIfMissing, true)
            .unwrap();
        let inner = outer
            .nested_type("Inner", ModificationKind::FailIfMissing)
            .unwrap();
        let field = inner
            .field(
                "value",
                FieldSignature::new(TypeSignature::class(TypeRef::tracked(&outer))),
                ModificationKind::FailIfMissing,
            )
            .unwrap();

        assert!(inner.is_nested());
        assert!(inner.read_only());
        assert!(field.read_only());
        assert_eq!(inner.full_name(), "N.Outer/Inner");
        assert!(Arc::ptr_eq(&inner.module().unwrap(), &module));
        assert!(Arc::ptr_eq(&inner.declaring_type().unwrap(), &outer));
    }

    #[test]
    fn interfaces_are_deduplicated() {
        let ty = declared();
        ty.add_interface(TypeRef::external("System.Runtime", "System", "IDisposable"));
        ty.add_interface(TypeRef::external("System.Runtime", "System", "IDisposable"));
        assert_eq!(ty.interfaces().len(), 1);
    }
}
