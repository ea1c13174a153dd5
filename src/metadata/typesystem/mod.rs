//! Type definitions and references.
//!
//! A [`TypeDef`] is a type that lives in a loaded [`crate::metadata::module::ModuleDef`]. It
//! owns its nested types and members through append-only [`DefList`]s and links back to its
//! module and declaring type weakly. References to types ([`TypeRef`]), fields ([`FieldRef`]) and
//! methods ([`MethodRef`]) are defined in this module as well, since they tie definitions,
//! external symbols and tracked modifications together.
//!
//! # Key Components
//!
//! - [`TypeDef`] - A type definition with its members
//! - [`TypeRef`], [`FieldRef`], [`MethodRef`] - References used by signatures and operands
//! - [`GenericParameter`] - A generic parameter of a type
//! - [`WeakRef`] - Identity-comparable weak link

mod generics;
mod refs;

use std::sync::{Arc, OnceLock, RwLock, Weak};

pub use generics::GenericParameter;
pub(crate) use refs::join_name;
pub use refs::{
    ExternalField, ExternalMethod, ExternalType, FieldRef, MethodRef, MethodSpec, TypeRef, WeakRef,
};

use crate::metadata::{
    attributes::{AttributeCell, TypeAttributes},
    deflist::DefList,
    members::{EventDef, EventDefRc, FieldDef, FieldDefRc, PropertyDef, PropertyDefRc},
    method::{MethodDef, MethodDefRc},
    module::{ModuleDef, ModuleDefRc},
    token::{TableId, Token},
    Definition,
};

/// Reference to a `TypeDef`
pub type TypeDefRc = Arc<TypeDef>;

/// A type defined in a module.
pub struct TypeDef {
    token: OnceLock<Token>,
    /// Namespace, empty for nested types and the global type
    pub namespace: String,
    /// Simple name
    pub name: String,
    flags: AttributeCell<TypeAttributes>,
    base_type: RwLock<Option<TypeRef>>,
    interfaces: RwLock<Vec<TypeRef>>,
    generic_params: RwLock<Vec<GenericParameter>>,
    module: OnceLock<Weak<ModuleDef>>,
    declaring_type: OnceLock<Weak<TypeDef>>,
    /// Types nested inside this one
    pub nested_types: DefList<TypeDef>,
    /// Fields
    pub fields: DefList<FieldDef>,
    /// Methods
    pub methods: DefList<MethodDef>,
    /// Properties
    pub properties: DefList<PropertyDef>,
    /// Events
    pub events: DefList<EventDef>,
}

impl TypeDef {
    /// Creates a detached type definition
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, flags: TypeAttributes) -> Self {
        TypeDef {
            token: OnceLock::new(),
            namespace: namespace.into(),
            name: name.into(),
            flags: AttributeCell::new(flags),
            base_type: RwLock::new(None),
            interfaces: RwLock::new(Vec::new()),
            generic_params: RwLock::new(Vec::new()),
            module: OnceLock::new(),
            declaring_type: OnceLock::new(),
            nested_types: DefList::new(),
            fields: DefList::new(),
            methods: DefList::new(),
            properties: DefList::new(),
            events: DefList::new(),
        }
    }

    /// Metadata token, null until the type is attached to a module
    pub fn token(&self) -> Token {
        self.token.get().copied().unwrap_or_default()
    }

    /// Current flags
    pub fn attributes(&self) -> TypeAttributes {
        self.flags.get()
    }

    /// Replaces the flags
    pub fn set_attributes(&self, flags: TypeAttributes) {
        self.flags.set(flags);
    }

    /// The base type, if any
    pub fn base_type(&self) -> Option<TypeRef> {
        read_lock!(self.base_type).clone()
    }

    /// Replaces the base type
    pub fn set_base_type(&self, base_type: Option<TypeRef>) {
        *write_lock!(self.base_type) = base_type;
    }

    /// Implemented interfaces
    pub fn interfaces(&self) -> Vec<TypeRef> {
        snapshot!(self.interfaces)
    }

    /// Adds an implemented interface
    pub fn add_interface(&self, interface: TypeRef) {
        write_lock!(self.interfaces).push(interface);
    }

    /// Generic parameters
    pub fn generic_params(&self) -> Vec<GenericParameter> {
        snapshot!(self.generic_params)
    }

    /// Replaces the generic parameters
    pub fn set_generic_params(&self, params: Vec<GenericParameter>) {
        *write_lock!(self.generic_params) = params;
    }

    /// The owning module
    pub fn module(&self) -> Option<ModuleDefRc> {
        self.module.get().and_then(Weak::upgrade)
    }

    /// The enclosing type of a nested type
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        self.declaring_type.get().and_then(Weak::upgrade)
    }

    /// Returns `true` for nested types
    pub fn is_nested(&self) -> bool {
        self.declaring_type.get().is_some()
    }

    /// `Namespace.Name`, or `Outer/Inner` for nested types
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(declaring) => format!("{}/{}", declaring.full_name(), self.name),
            None => join_name(&self.namespace, &self.name),
        }
    }

    /// Finds a nested type by name
    pub fn find_nested_type(&self, name: &str) -> Option<TypeDefRc> {
        self.nested_types.find(|t| t.name == name)
    }

    /// Finds a field by name
    pub fn find_field(&self, name: &str) -> Option<FieldDefRc> {
        self.fields.find(|f| f.name == name)
    }

    /// Finds the methods with the given name
    pub fn find_methods(&self, name: &str) -> Vec<MethodDefRc> {
        self.methods
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Finds a property by name
    pub fn find_property(&self, name: &str) -> Option<PropertyDefRc> {
        self.properties.find(|p| p.name == name)
    }

    /// Finds an event by name
    pub fn find_event(&self, name: &str) -> Option<EventDefRc> {
        self.events.find(|e| e.name == name)
    }

    /// Attaches `nested` as a nested type of `self`
    pub fn add_nested_type(self: &Arc<Self>, nested: TypeDef) -> TypeDefRc {
        let nested = Arc::new(nested);
        self.adopt_nested_type(&nested);
        self.nested_types.push(nested)
    }

    /// Attaches `field` to `self`
    pub fn add_field(self: &Arc<Self>, field: FieldDef) -> FieldDefRc {
        let field = Arc::new(field);
        self.adopt_field(&field);
        self.fields.push(field)
    }

    /// Attaches `method` to `self`
    pub fn add_method(self: &Arc<Self>, method: MethodDef) -> MethodDefRc {
        let method = Arc::new(method);
        self.adopt_method(&method);
        self.methods.push(method)
    }

    /// Attaches `property` to `self`
    pub fn add_property(self: &Arc<Self>, property: PropertyDef) -> PropertyDefRc {
        let property = Arc::new(property);
        self.adopt_property(&property);
        self.properties.push(property)
    }

    /// Attaches `event` to `self`
    pub fn add_event(self: &Arc<Self>, event: EventDef) -> EventDefRc {
        let event = Arc::new(event);
        self.adopt_event(&event);
        self.events.push(event)
    }

    /// Links `nested` to `self` and assigns its tokens, without inserting it into
    /// [`TypeDef::nested_types`].
    pub fn adopt_nested_type(self: &Arc<Self>, nested: &TypeDefRc) {
        let _ = nested.declaring_type.set(Arc::downgrade(self));
        if let Some(module) = self.module() {
            module.adopt_type(nested);
        }
    }

    /// Links `field` to `self` and assigns its token, without inserting it into
    /// [`TypeDef::fields`].
    pub fn adopt_field(self: &Arc<Self>, field: &FieldDefRc) {
        field.attach(self);
        if let Some(module) = self.module() {
            field.assign_token(module.register(TableId::Field, Definition::Field(field.clone())));
        }
    }

    /// Links `method` to `self` and assigns its token, without inserting it into
    /// [`TypeDef::methods`].
    pub fn adopt_method(self: &Arc<Self>, method: &MethodDefRc) {
        method.attach(self);
        if let Some(module) = self.module() {
            method.assign_token(
                module.register(TableId::MethodDef, Definition::Method(method.clone())),
            );
        }
    }

    /// Links `property` to `self` and assigns its token, without inserting it into
    /// [`TypeDef::properties`].
    pub fn adopt_property(self: &Arc<Self>, property: &PropertyDefRc) {
        property.attach(self);
        if let Some(module) = self.module() {
            property.assign_token(
                module.register(TableId::Property, Definition::Property(property.clone())),
            );
        }
    }

    /// Links `event` to `self` and assigns its token, without inserting it into
    /// [`TypeDef::events`].
    pub fn adopt_event(self: &Arc<Self>, event: &EventDefRc) {
        event.attach(self);
        if let Some(module) = self.module() {
            event.assign_token(module.register(TableId::Event, Definition::Event(event.clone())));
        }
    }

    pub(crate) fn attach_module(&self, module: &ModuleDefRc, token: Token) {
        let _ = self.module.set(Arc::downgrade(module));
        let _ = self.token.set(token);
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("token", &self.token())
            .field("name", &self.full_name())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_module;

    #[test]
    fn nested_names() {
        let outer = Arc::new(TypeDef::new("N", "Outer", TypeAttributes::PUBLIC));
        let inner = outer.add_nested_type(TypeDef::new("", "Inner", TypeAttributes::NESTED_PUBLIC));

        assert!(inner.is_nested());
        assert_eq!(inner.full_name(), "N.Outer/Inner");
        assert!(outer.find_nested_type("Inner").is_some());
    }

    #[test]
    fn members_get_tokens_from_module() {
        let module = sample_module();
        let ty = module.find_type("N", "C").unwrap();
        let nop = ty.find_methods("Nop").pop().unwrap();

        assert_eq!(ty.token().table(), TableId::TypeDef as u8);
        assert_eq!(nop.token().table(), TableId::MethodDef as u8);
        assert!(matches!(module.lookup(nop.token()), Some(Definition::Method(_))));
        assert!(Arc::ptr_eq(&nop.declaring_type().unwrap(), &ty));
    }

    #[test]
    fn detached_members_have_null_tokens() {
        let ty = Arc::new(TypeDef::new("N", "Loose", TypeAttributes::empty()));
        let field = ty.add_field(FieldDef::new(
            "value",
            crate::metadata::attributes::FieldAttributes::PUBLIC,
            crate::metadata::signatures::FieldSignature::new(
                crate::metadata::signatures::Primitive::I4.into(),
            ),
        ));
        assert!(field.token().is_null());
        assert_eq!(field.full_name(), "N.Loose::value");
    }
}
