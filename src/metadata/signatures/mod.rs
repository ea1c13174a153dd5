//! Signature model: structural descriptions of types, fields, methods, properties and locals.
//!
//! # Key Components
//!
//! - [`TypeSignature`] - Tagged union of every leaf and wrapper kind
//! - [`MethodSignature`], [`FieldSignature`], [`PropertySignature`], [`LocalVariable`]
//! - [`SigComparer`] - Structural equality with optional relaxations
//!
//! # Examples
//!
//! ```rust
//! use codesurgeon::metadata::signatures::{MethodSignature, Primitive, SigComparer, TypeSignature};
//!
//! let a = MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::String.into()]);
//! let b = MethodSignature::new_static(Primitive::I4.into(), vec![Primitive::String.into()]);
//!
//! assert_ne!(a, b);
//! assert!(SigComparer::overload().method_sigs_equal(&a, &b));
//! ```

mod compare;
mod types;

pub use compare::{CompareOptions, SigComparer};
pub use types::{
    ArrayShape, CallingConvention, FieldSignature, GenericOwner, GenericParamKind,
    GenericParamSig, LocalVariable, MethodSignature, Primitive, PropertySignature, TypeSignature,
};
