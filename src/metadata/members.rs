//! Fields, properties and events.
//!
//! Properties and events do not carry code themselves; they link accessor methods of their
//! declaring type by role through an [`Accessors`] list.

use std::sync::{Arc, OnceLock, RwLock, Weak};

use strum::Display;

use crate::metadata::{
    attributes::{
        AttributeCell, EventAttributes, FieldAttributes, MethodSemanticsAttributes,
        PropertyAttributes,
    },
    method::{MethodDef, MethodDefRc},
    signatures::{FieldSignature, PropertySignature},
    token::Token,
    typesystem::{TypeDef, TypeDefRc, TypeRef, WeakRef},
};

/// Reference to a `FieldDef`
pub type FieldDefRc = Arc<FieldDef>;
/// Reference to a `PropertyDef`
pub type PropertyDefRc = Arc<PropertyDef>;
/// Reference to an `EventDef`
pub type EventDefRc = Arc<EventDef>;

/// Back-link and token shared by every member kind.
struct MemberLink {
    token: OnceLock<Token>,
    declaring_type: OnceLock<Weak<TypeDef>>,
}

impl MemberLink {
    fn new() -> Self {
        MemberLink {
            token: OnceLock::new(),
            declaring_type: OnceLock::new(),
        }
    }

    fn token(&self) -> Token {
        self.token.get().copied().unwrap_or_default()
    }

    fn declaring_type(&self) -> Option<TypeDefRc> {
        self.declaring_type.get().and_then(Weak::upgrade)
    }

    fn qualify(&self, name: &str) -> String {
        match self.declaring_type() {
            Some(declaring) => format!("{}::{name}", declaring.full_name()),
            None => name.to_string(),
        }
    }
}

/// A field defined by a type.
pub struct FieldDef {
    link: MemberLink,
    /// Field name
    pub name: String,
    flags: AttributeCell<FieldAttributes>,
    /// Field signature
    pub signature: FieldSignature,
}

impl FieldDef {
    /// Creates a detached field
    #[must_use]
    pub fn new(name: impl Into<String>, flags: FieldAttributes, signature: FieldSignature) -> Self {
        FieldDef {
            link: MemberLink::new(),
            name: name.into(),
            flags: AttributeCell::new(flags),
            signature,
        }
    }

    /// Metadata token
    pub fn token(&self) -> Token {
        self.link.token()
    }

    /// Current flags
    pub fn attributes(&self) -> FieldAttributes {
        self.flags.get()
    }

    /// Replaces the flags
    pub fn set_attributes(&self, flags: FieldAttributes) {
        self.flags.set(flags);
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        self.link.declaring_type()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        self.link.qualify(&self.name)
    }

    pub(crate) fn attach(&self, declaring_type: &TypeDefRc) {
        let _ = self.link.declaring_type.set(Arc::downgrade(declaring_type));
    }

    pub(crate) fn assign_token(&self, token: Token) {
        let _ = self.link.token.set(token);
    }
}

/// The role an accessor method plays for its property or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AccessorRole {
    /// Property getter
    Getter,
    /// Property setter
    Setter,
    /// Event `add`
    Adder,
    /// Event `remove`
    Remover,
    /// Event raise method
    Invoker,
    /// Any other associated method
    Other,
}

impl AccessorRole {
    /// The `MethodSemantics` flag for this role
    #[must_use]
    pub fn semantics(self) -> MethodSemanticsAttributes {
        match self {
            AccessorRole::Getter => MethodSemanticsAttributes::GETTER,
            AccessorRole::Setter => MethodSemanticsAttributes::SETTER,
            AccessorRole::Adder => MethodSemanticsAttributes::ADD_ON,
            AccessorRole::Remover => MethodSemanticsAttributes::REMOVE_ON,
            AccessorRole::Invoker => MethodSemanticsAttributes::FIRE,
            AccessorRole::Other => MethodSemanticsAttributes::OTHER,
        }
    }
}

/// Accessor methods of a property or event, by role.
#[derive(Default)]
pub struct Accessors {
    entries: RwLock<Vec<(AccessorRole, WeakRef<MethodDef>)>>,
}

impl Accessors {
    /// Live accessors with the given role
    pub fn get(&self, role: AccessorRole) -> Vec<MethodDefRc> {
        read_lock!(self.entries)
            .iter()
            .filter(|(r, _)| *r == role)
            .filter_map(|(_, method)| method.upgrade())
            .collect()
    }

    /// Every live accessor with its role
    pub fn all(&self) -> Vec<(AccessorRole, MethodDefRc)> {
        read_lock!(self.entries)
            .iter()
            .filter_map(|(role, method)| method.upgrade().map(|m| (*role, m)))
            .collect()
    }

    /// Returns `true` if `method` is linked with `role`
    pub fn contains(&self, role: AccessorRole, method: &MethodDefRc) -> bool {
        read_lock!(self.entries)
            .iter()
            .any(|(r, m)| *r == role && m.points_to(method))
    }

    /// Links `method` with `role`; returns `false` if it already was
    pub fn link(&self, role: AccessorRole, method: &MethodDefRc) -> bool {
        let mut entries = write_lock!(self.entries);
        if entries
            .iter()
            .any(|(r, m)| *r == role && m.points_to(method))
        {
            return false;
        }
        entries.push((role, WeakRef::new(method)));
        true
    }
}

/// A property defined by a type.
pub struct PropertyDef {
    link: MemberLink,
    /// Property name
    pub name: String,
    flags: AttributeCell<PropertyAttributes>,
    /// Property signature
    pub signature: PropertySignature,
    /// Getter, setter and other accessors
    pub accessors: Accessors,
}

impl PropertyDef {
    /// Creates a detached property
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        flags: PropertyAttributes,
        signature: PropertySignature,
    ) -> Self {
        PropertyDef {
            link: MemberLink::new(),
            name: name.into(),
            flags: AttributeCell::new(flags),
            signature,
            accessors: Accessors::default(),
        }
    }

    /// Metadata token
    pub fn token(&self) -> Token {
        self.link.token()
    }

    /// Current flags
    pub fn attributes(&self) -> PropertyAttributes {
        self.flags.get()
    }

    /// Replaces the flags
    pub fn set_attributes(&self, flags: PropertyAttributes) {
        self.flags.set(flags);
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        self.link.declaring_type()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        self.link.qualify(&self.name)
    }

    pub(crate) fn attach(&self, declaring_type: &TypeDefRc) {
        let _ = self.link.declaring_type.set(Arc::downgrade(declaring_type));
    }

    pub(crate) fn assign_token(&self, token: Token) {
        let _ = self.link.token.set(token);
    }
}

/// An event defined by a type.
pub struct EventDef {
    link: MemberLink,
    /// Event name
    pub name: String,
    flags: AttributeCell<EventAttributes>,
    /// The delegate type of the event
    pub event_type: TypeRef,
    /// Add, remove, raise and other accessors
    pub accessors: Accessors,
}

impl EventDef {
    /// Creates a detached event
    #[must_use]
    pub fn new(name: impl Into<String>, flags: EventAttributes, event_type: TypeRef) -> Self {
        EventDef {
            link: MemberLink::new(),
            name: name.into(),
            flags: AttributeCell::new(flags),
            event_type,
            accessors: Accessors::default(),
        }
    }

    /// Metadata token
    pub fn token(&self) -> Token {
        self.link.token()
    }

    /// Current flags
    pub fn attributes(&self) -> EventAttributes {
        self.flags.get()
    }

    /// Replaces the flags
    pub fn set_attributes(&self, flags: EventAttributes) {
        self.flags.set(flags);
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        self.link.declaring_type()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        self.link.qualify(&self.name)
    }

    pub(crate) fn attach(&self, declaring_type: &TypeDefRc) {
        let _ = self.link.declaring_type.set(Arc::downgrade(declaring_type));
    }

    pub(crate) fn assign_token(&self, token: Token) {
        let _ = self.link.token.set(token);
    }
}
