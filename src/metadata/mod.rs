//! In-memory object graph of a .NET module.
//!
//! This is the graph the resolver searches and patches apply their writes to: modules own
//! types, types own nested types and members, members reference other symbols through
//! [`typesystem::TypeRef`], [`typesystem::FieldRef`] and [`typesystem::MethodRef`].
//!
//! # Key Components
//!
//! - [`module`] - [`module::ModuleDef`], the root of a loaded module
//! - [`typesystem`] - Type definitions and references
//! - [`members`] - Fields, properties and events
//! - [`method`] - Methods, bodies and exception handlers
//! - [`signatures`] - Signature trees and structural comparison
//! - [`attributes`] - Flag sets and accessibility levels
//! - [`token`] - Metadata tokens
//!
//! # Examples
//!
//! ```rust
//! use codesurgeon::metadata::{
//!     attributes::{MethodAttributes, TypeAttributes},
//!     method::MethodDef,
//!     module::ModuleDef,
//!     signatures::{MethodSignature, Primitive},
//!     typesystem::TypeDef,
//! };
//!
//! let module = ModuleDef::new("Target");
//! let ty = module.add_type(TypeDef::new("N", "C", TypeAttributes::PUBLIC));
//! let nop = ty.add_method(MethodDef::new(
//!     "Nop",
//!     MethodAttributes::PUBLIC | MethodAttributes::STATIC,
//!     MethodSignature::new_static(Primitive::Void.into(), vec![]),
//! ));
//!
//! assert_eq!(nop.full_name(), "void N.C::Nop()");
//! assert!(module.lookup(nop.token()).is_some());
//! ```

pub mod attributes;
pub mod deflist;
pub mod members;
pub mod method;
pub mod module;
pub mod signatures;
pub mod token;
pub mod typesystem;

use crate::{
    metadata::{
        members::{EventDefRc, FieldDefRc, PropertyDefRc},
        method::MethodDefRc,
        module::ModuleDefRc,
        token::Token,
        typesystem::TypeDefRc,
    },
    modification::SymbolKind,
};

/// Any definition a modification can resolve to.
#[derive(Clone)]
pub enum Definition {
    /// A module
    Module(ModuleDefRc),
    /// A type
    Type(TypeDefRc),
    /// A field
    Field(FieldDefRc),
    /// A method
    Method(MethodDefRc),
    /// A property
    Property(PropertyDefRc),
    /// An event
    Event(EventDefRc),
}

impl Definition {
    /// The symbol kind of this definition
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match self {
            Definition::Module(_) => SymbolKind::Module,
            Definition::Type(_) => SymbolKind::Type,
            Definition::Field(_) => SymbolKind::Field,
            Definition::Method(_) => SymbolKind::Method,
            Definition::Property(_) => SymbolKind::Property,
            Definition::Event(_) => SymbolKind::Event,
        }
    }

    /// Metadata token; modules have none
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            Definition::Module(_) => Token::default(),
            Definition::Type(ty) => ty.token(),
            Definition::Field(field) => field.token(),
            Definition::Method(method) => method.token(),
            Definition::Property(property) => property.token(),
            Definition::Event(event) => event.token(),
        }
    }

    /// Full name of the definition
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            Definition::Module(module) => module.name.clone(),
            Definition::Type(ty) => ty.full_name(),
            Definition::Field(field) => field.full_name(),
            Definition::Method(method) => method.full_name(),
            Definition::Property(property) => property.full_name(),
            Definition::Event(event) => event.full_name(),
        }
    }

    /// The module, for module definitions
    #[must_use]
    pub fn as_module(&self) -> Option<&ModuleDefRc> {
        match self {
            Definition::Module(module) => Some(module),
            _ => None,
        }
    }

    /// The type, for type definitions
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeDefRc> {
        match self {
            Definition::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// The field, for field definitions
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldDefRc> {
        match self {
            Definition::Field(field) => Some(field),
            _ => None,
        }
    }

    /// The method, for method definitions
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodDefRc> {
        match self {
            Definition::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The property, for property definitions
    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyDefRc> {
        match self {
            Definition::Property(property) => Some(property),
            _ => None,
        }
    }

    /// The event, for event definitions
    #[must_use]
    pub fn as_event(&self) -> Option<&EventDefRc> {
        match self {
            Definition::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Returns `true` if both values are the same definition
    #[must_use]
    pub fn ptr_eq(&self, other: &Definition) -> bool {
        use std::sync::Arc;

        match (self, other) {
            (Definition::Module(a), Definition::Module(b)) => Arc::ptr_eq(a, b),
            (Definition::Type(a), Definition::Type(b)) => Arc::ptr_eq(a, b),
            (Definition::Field(a), Definition::Field(b)) => Arc::ptr_eq(a, b),
            (Definition::Method(a), Definition::Method(b)) => Arc::ptr_eq(a, b),
            (Definition::Property(a), Definition::Property(b)) => Arc::ptr_eq(a, b),
            (Definition::Event(a), Definition::Event(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.full_name())
    }
}
