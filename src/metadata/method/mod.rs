//! Method definitions, bodies and exception handlers.
//!
//! # Key Components
//!
//! - [`MethodDef`] - A method with signature, flags, overrides and an optional body
//! - [`MethodBody`] - Locals, instructions and exception handlers
//! - [`ExceptionHandler`] - A protected region with its handler
//! - [`MethodOverride`] - An explicit interface implementation

mod body;
mod exceptions;

use std::sync::{Arc, OnceLock, RwLock, Weak};

pub use body::MethodBody;
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};

use crate::metadata::{
    attributes::{AttributeCell, MethodAttributes},
    signatures::MethodSignature,
    token::Token,
    typesystem::{MethodRef, TypeDef, TypeDefRc},
};

/// Reference to a `MethodDef`
pub type MethodDefRc = Arc<MethodDef>;

/// An explicit implementation of an interface method (a `MethodImpl` row).
#[derive(Debug, Clone)]
pub struct MethodOverride {
    /// The implementing method
    pub body: MethodRef,
    /// The interface method being implemented
    pub declaration: MethodRef,
}

/// A method defined by a type.
pub struct MethodDef {
    token: OnceLock<Token>,
    /// Method name
    pub name: String,
    flags: AttributeCell<MethodAttributes>,
    /// Method signature
    pub signature: MethodSignature,
    overrides: RwLock<Vec<MethodOverride>>,
    body: RwLock<Option<Arc<MethodBody>>>,
    declaring_type: OnceLock<Weak<TypeDef>>,
}

impl MethodDef {
    /// Creates a detached method without body
    #[must_use]
    pub fn new(name: impl Into<String>, flags: MethodAttributes, signature: MethodSignature) -> Self {
        MethodDef {
            token: OnceLock::new(),
            name: name.into(),
            flags: AttributeCell::new(flags),
            signature,
            overrides: RwLock::new(Vec::new()),
            body: RwLock::new(None),
            declaring_type: OnceLock::new(),
        }
    }

    /// Sets the initial body
    #[must_use]
    pub fn with_body(self, body: MethodBody) -> Self {
        *write_lock!(self.body) = Some(Arc::new(body));
        self
    }

    /// Metadata token
    pub fn token(&self) -> Token {
        self.token.get().copied().unwrap_or_default()
    }

    /// Current flags
    pub fn attributes(&self) -> MethodAttributes {
        self.flags.get()
    }

    /// Replaces the flags
    pub fn set_attributes(&self, flags: MethodAttributes) {
        self.flags.set(flags);
    }

    /// Returns `true` for static methods
    pub fn is_static(&self) -> bool {
        self.attributes().contains(MethodAttributes::STATIC)
    }

    /// The current body
    pub fn body(&self) -> Option<Arc<MethodBody>> {
        read_lock!(self.body).clone()
    }

    /// Replaces the body, returning the previous one
    pub fn set_body(&self, body: Option<Arc<MethodBody>>) -> Option<Arc<MethodBody>> {
        std::mem::replace(&mut *write_lock!(self.body), body)
    }

    /// Explicit interface implementations
    pub fn overrides(&self) -> Vec<MethodOverride> {
        snapshot!(self.overrides)
    }

    /// Adds an explicit interface implementation
    pub fn add_override(&self, method_override: MethodOverride) {
        write_lock!(self.overrides).push(method_override);
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        self.declaring_type.get().and_then(Weak::upgrade)
    }

    /// `ret Type::name(params)`
    pub fn full_name(&self) -> String {
        let declaring = self
            .declaring_type()
            .map(|t| t.full_name())
            .unwrap_or_default();
        self.signature.format_member(&declaring, &self.name)
    }

    pub(crate) fn attach(&self, declaring_type: &TypeDefRc) {
        let _ = self.declaring_type.set(Arc::downgrade(declaring_type));
    }

    pub(crate) fn assign_token(&self, token: Token) {
        let _ = self.token.set(token);
    }
}

impl std::fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDef")
            .field("token", &self.token())
            .field("name", &self.full_name())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
