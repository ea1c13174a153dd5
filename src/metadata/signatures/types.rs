//! Signature trees for types, fields, methods, properties and locals.
//!
//! A [`TypeSignature`] is an exhaustively matched tagged union: leaf variants reference a type
//! (a class or value type, a primitive, a generic variable, a function pointer, a generic
//! instantiation) and wrapper variants decorate exactly one inner signature (pointer, by-ref,
//! arrays, custom modifiers, pinned, module binding).
//!
//! Equality on every signature type is structural and strict, see
//! [`crate::metadata::signatures::SigComparer`] for the relaxed modes used by overload lookup.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use bitflags::bitflags;
use strum::Display;

use crate::metadata::typesystem::{MethodRef, TypeRef};

/// Built-in types that have their own element type in the signature encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Primitive {
    /// `System.Void`
    #[strum(serialize = "void")]
    Void,
    /// `System.Boolean`
    #[strum(serialize = "bool")]
    Boolean,
    /// `System.Char`
    #[strum(serialize = "char")]
    Char,
    /// `System.SByte`
    #[strum(serialize = "int8")]
    I1,
    /// `System.Byte`
    #[strum(serialize = "uint8")]
    U1,
    /// `System.Int16`
    #[strum(serialize = "int16")]
    I2,
    /// `System.UInt16`
    #[strum(serialize = "uint16")]
    U2,
    /// `System.Int32`
    #[strum(serialize = "int32")]
    I4,
    /// `System.UInt32`
    #[strum(serialize = "uint32")]
    U4,
    /// `System.Int64`
    #[strum(serialize = "int64")]
    I8,
    /// `System.UInt64`
    #[strum(serialize = "uint64")]
    U8,
    /// `System.Single`
    #[strum(serialize = "float32")]
    R4,
    /// `System.Double`
    #[strum(serialize = "float64")]
    R8,
    /// `System.String`
    #[strum(serialize = "string")]
    String,
    /// `System.TypedReference`
    #[strum(serialize = "typedref")]
    TypedByRef,
    /// `System.IntPtr`
    #[strum(serialize = "native int")]
    I,
    /// `System.UIntPtr`
    #[strum(serialize = "native uint")]
    U,
    /// `System.Object`
    #[strum(serialize = "object")]
    Object,
}

impl Primitive {
    /// The ECMA-335 element type byte of this primitive
    #[must_use]
    pub fn element_type(self) -> u8 {
        match self {
            Primitive::Void => 0x01,
            Primitive::Boolean => 0x02,
            Primitive::Char => 0x03,
            Primitive::I1 => 0x04,
            Primitive::U1 => 0x05,
            Primitive::I2 => 0x06,
            Primitive::U2 => 0x07,
            Primitive::I4 => 0x08,
            Primitive::U4 => 0x09,
            Primitive::I8 => 0x0A,
            Primitive::U8 => 0x0B,
            Primitive::R4 => 0x0C,
            Primitive::R8 => 0x0D,
            Primitive::String => 0x0E,
            Primitive::TypedByRef => 0x16,
            Primitive::I => 0x18,
            Primitive::U => 0x19,
            Primitive::Object => 0x1C,
        }
    }
}

/// Which generic parameter list a generic variable indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericParamKind {
    /// `!n`, a parameter of the declaring type
    Type,
    /// `!!n`, a parameter of the method
    Method,
}

/// The definition owning a generic variable.
///
/// Owners are informational, they never take part in equality. A [`GenericOwner::Deferred`]
/// slot is filled in once the owning method has been imported, see
/// [`crate::importer::SignatureImporter`].
#[derive(Debug, Clone, Default)]
pub enum GenericOwner {
    /// Owner not tracked
    #[default]
    Unbound,
    /// Owned by a type
    Type(TypeRef),
    /// Owned by a method
    Method(MethodRef),
    /// Owned by a method that has not been imported yet
    Deferred(Arc<OnceLock<MethodRef>>),
}

impl GenericOwner {
    /// Returns the owning method for method owners, including filled deferred slots.
    #[must_use]
    pub fn method(&self) -> Option<MethodRef> {
        match self {
            GenericOwner::Method(method) => Some(method.clone()),
            GenericOwner::Deferred(slot) => slot.get().cloned(),
            _ => None,
        }
    }

    /// Returns `true` if this is a deferred slot that has not been filled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, GenericOwner::Deferred(slot) if slot.get().is_none())
    }
}

/// A generic type or method variable.
#[derive(Debug, Clone)]
pub struct GenericParamSig {
    /// Type or method variable
    pub kind: GenericParamKind,
    /// Position in the owner's generic parameter list
    pub index: u32,
    /// The owning definition
    pub owner: GenericOwner,
}

/// Shape of a general (possibly multi-dimensional) array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArrayShape {
    /// Number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions
    pub lower_bounds: Vec<i32>,
}

/// A type as it appears inside a signature.
#[derive(Debug, Clone, Default)]
pub enum TypeSignature {
    /// Placeholder for a shape that could not be represented
    #[default]
    Unknown,
    /// A built-in primitive
    Primitive(Primitive),
    /// A reference type (`class T`)
    Class(TypeRef),
    /// A value type (`valuetype T`)
    ValueType(TypeRef),
    /// A generic type or method variable
    GenericParam(GenericParamSig),
    /// A function pointer
    FnPtr(Box<MethodSignature>),
    /// An instantiated generic type
    GenericInst {
        /// The generic type definition, a `Class` or `ValueType`
        generic: Box<TypeSignature>,
        /// Type arguments
        args: Vec<TypeSignature>,
    },
    /// Marks the start of the variable arguments of a vararg call site
    Sentinel,
    /// Unmanaged pointer
    Ptr(Box<TypeSignature>),
    /// Managed pointer
    ByRef(Box<TypeSignature>),
    /// Single-dimensional, zero-based array
    SzArray(Box<TypeSignature>),
    /// General array
    Array {
        /// Element type
        element: Box<TypeSignature>,
        /// Rank and bounds
        shape: ArrayShape,
    },
    /// Required custom modifier
    ModReqd {
        /// The modifier type
        modifier: TypeRef,
        /// The modified type
        inner: Box<TypeSignature>,
    },
    /// Optional custom modifier
    ModOpt {
        /// The modifier type
        modifier: TypeRef,
        /// The modified type
        inner: Box<TypeSignature>,
    },
    /// A pinned local
    Pinned(Box<TypeSignature>),
    /// A type bound to a module by index
    Module {
        /// Module index
        index: u32,
        /// The bound type
        inner: Box<TypeSignature>,
    },
}

impl TypeSignature {
    /// `class T`
    #[must_use]
    pub fn class(type_ref: TypeRef) -> Self {
        TypeSignature::Class(type_ref)
    }

    /// `valuetype T`
    #[must_use]
    pub fn value_type(type_ref: TypeRef) -> Self {
        TypeSignature::ValueType(type_ref)
    }

    /// `!index` without owner
    #[must_use]
    pub fn type_var(index: u32) -> Self {
        TypeSignature::GenericParam(GenericParamSig {
            kind: GenericParamKind::Type,
            index,
            owner: GenericOwner::Unbound,
        })
    }

    /// `!!index` owned by `owner`
    #[must_use]
    pub fn method_var(index: u32, owner: GenericOwner) -> Self {
        TypeSignature::GenericParam(GenericParamSig {
            kind: GenericParamKind::Method,
            index,
            owner,
        })
    }

    /// Wraps `self` in an unmanaged pointer
    #[must_use]
    pub fn ptr(self) -> Self {
        TypeSignature::Ptr(Box::new(self))
    }

    /// Wraps `self` in a managed pointer
    #[must_use]
    pub fn by_ref(self) -> Self {
        TypeSignature::ByRef(Box::new(self))
    }

    /// Wraps `self` in a zero-based vector
    #[must_use]
    pub fn sz_array(self) -> Self {
        TypeSignature::SzArray(Box::new(self))
    }

    /// Wraps `self` in a general array
    #[must_use]
    pub fn array(self, shape: ArrayShape) -> Self {
        TypeSignature::Array {
            element: Box::new(self),
            shape,
        }
    }

    /// Returns `true` for signatures that reference a type directly rather than wrapping another
    /// signature.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            TypeSignature::Unknown
                | TypeSignature::Primitive(_)
                | TypeSignature::Class(_)
                | TypeSignature::ValueType(_)
                | TypeSignature::GenericParam(_)
                | TypeSignature::FnPtr(_)
                | TypeSignature::GenericInst { .. }
                | TypeSignature::Sentinel
        )
    }

    /// The wrapped signature of a wrapper variant
    #[must_use]
    pub fn inner(&self) -> Option<&TypeSignature> {
        match self {
            TypeSignature::Ptr(inner)
            | TypeSignature::ByRef(inner)
            | TypeSignature::SzArray(inner)
            | TypeSignature::Pinned(inner)
            | TypeSignature::Array { element: inner, .. }
            | TypeSignature::ModReqd { inner, .. }
            | TypeSignature::ModOpt { inner, .. }
            | TypeSignature::Module { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl From<Primitive> for TypeSignature {
    fn from(primitive: Primitive) -> Self {
        TypeSignature::Primitive(primitive)
    }
}

bitflags! {
    /// Calling convention byte of a method signature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallingConvention: u8 {
        /// Managed default convention
        const DEFAULT = 0x00;
        /// Unmanaged cdecl
        const C = 0x01;
        /// Unmanaged stdcall
        const STDCALL = 0x02;
        /// Unmanaged thiscall
        const THISCALL = 0x03;
        /// Unmanaged fastcall
        const FASTCALL = 0x04;
        /// Managed variable arguments
        const VARARG = 0x05;
        /// Mask for the convention kind
        const KIND_MASK = 0x0F;
        /// The method has generic parameters
        const GENERIC = 0x10;
        /// The method has an implicit `this`
        const HAS_THIS = 0x20;
        /// `this` is passed explicitly as the first parameter
        const EXPLICIT_THIS = 0x40;
    }
}

/// Signature of a method, a call site or a function pointer.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Calling convention flags
    pub calling_convention: CallingConvention,
    /// Number of generic parameters
    pub generic_param_count: u32,
    /// Return type
    pub return_type: TypeSignature,
    /// Fixed parameters
    pub params: Vec<TypeSignature>,
    /// Parameters after the vararg sentinel
    pub params_after_sentinel: Vec<TypeSignature>,
}

impl MethodSignature {
    /// A non-generic static method
    #[must_use]
    pub fn new_static(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        MethodSignature {
            calling_convention: CallingConvention::DEFAULT,
            generic_param_count: 0,
            return_type,
            params,
            params_after_sentinel: Vec::new(),
        }
    }

    /// A non-generic instance method
    #[must_use]
    pub fn new_instance(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        MethodSignature {
            calling_convention: CallingConvention::HAS_THIS,
            ..MethodSignature::new_static(return_type, params)
        }
    }

    /// Marks the signature generic with `count` parameters
    #[must_use]
    pub fn with_generic_params(mut self, count: u32) -> Self {
        self.calling_convention |= CallingConvention::GENERIC;
        self.generic_param_count = count;
        self
    }

    /// Returns `true` if the method takes an implicit `this`
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.calling_convention.contains(CallingConvention::HAS_THIS)
    }

    /// Formats a member with this signature, e.g. `void N.C::Nop()`
    #[must_use]
    pub fn format_member(&self, declaring_type: &str, name: &str) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        let mut result = format!("{} {declaring_type}::{name}", self.return_type);
        if self.generic_param_count > 0 {
            result.push_str(&format!("<{}>", self.generic_param_count));
        }
        result.push('(');
        result.push_str(&params.join(", "));
        if !self.params_after_sentinel.is_empty() {
            let tail: Vec<String> = self
                .params_after_sentinel
                .iter()
                .map(ToString::to_string)
                .collect();
            result.push_str(", ..., ");
            result.push_str(&tail.join(", "));
        }
        result.push(')');
        result
    }
}

/// Signature of a field.
#[derive(Debug, Clone)]
pub struct FieldSignature {
    /// The field type
    pub field_type: TypeSignature,
}

impl FieldSignature {
    /// Creates a field signature of type `field_type`
    #[must_use]
    pub fn new(field_type: TypeSignature) -> Self {
        FieldSignature { field_type }
    }
}

/// Signature of a property.
#[derive(Debug, Clone)]
pub struct PropertySignature {
    /// Instance property
    pub has_this: bool,
    /// The property type
    pub property_type: TypeSignature,
    /// Indexer parameters
    pub params: Vec<TypeSignature>,
}

/// A local variable of a method body.
#[derive(Debug, Clone)]
pub struct LocalVariable {
    /// Declared type, including `Pinned`/`ByRef` wrappers
    pub signature: TypeSignature,
}

impl LocalVariable {
    /// Creates a local of type `signature`
    #[must_use]
    pub fn new(signature: TypeSignature) -> Self {
        LocalVariable { signature }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeSignature]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Unknown => write!(f, "<unknown>"),
            TypeSignature::Primitive(primitive) => write!(f, "{primitive}"),
            TypeSignature::Class(type_ref) => write!(f, "class {}", type_ref.full_name()),
            TypeSignature::ValueType(type_ref) => {
                write!(f, "valuetype {}", type_ref.full_name())
            }
            TypeSignature::GenericParam(param) => match param.kind {
                GenericParamKind::Type => write!(f, "!{}", param.index),
                GenericParamKind::Method => write!(f, "!!{}", param.index),
            },
            TypeSignature::FnPtr(method) => write!(f, "method {method}"),
            TypeSignature::GenericInst { generic, args } => {
                write!(f, "{generic}<")?;
                write_list(f, args)?;
                write!(f, ">")
            }
            TypeSignature::Sentinel => write!(f, "..."),
            TypeSignature::Ptr(inner) => write!(f, "{inner}*"),
            TypeSignature::ByRef(inner) => write!(f, "{inner}&"),
            TypeSignature::SzArray(inner) => write!(f, "{inner}[]"),
            TypeSignature::Array { element, shape } => {
                write!(f, "{element}[")?;
                for _ in 1..shape.rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            TypeSignature::ModReqd { modifier, inner } => {
                write!(f, "{inner} modreq({})", modifier.full_name())
            }
            TypeSignature::ModOpt { modifier, inner } => {
                write!(f, "{inner} modopt({})", modifier.full_name())
            }
            TypeSignature::Pinned(inner) => write!(f, "{inner} pinned"),
            TypeSignature::Module { index, inner } => write!(f, "[{index}]{inner}"),
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_this() {
            write!(f, "instance ")?;
        }
        write!(f, "{}", self.return_type)?;
        if self.generic_param_count > 0 {
            write!(f, "<{}>", self.generic_param_count)?;
        }
        write!(f, "(")?;
        write_list(f, &self.params)?;
        if !self.params_after_sentinel.is_empty() {
            write!(f, ", ..., ")?;
            write_list(f, &self.params_after_sentinel)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_type)
    }
}

impl fmt::Display for PropertySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_this {
            write!(f, "instance ")?;
        }
        write!(f, "{}", self.property_type)?;
        if !self.params.is_empty() {
            write!(f, "[")?;
            write_list(f, &self.params)?;
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::typesystem::ExternalType;

    fn list_of_string() -> TypeSignature {
        TypeSignature::GenericInst {
            generic: Box::new(TypeSignature::class(TypeRef::External(Arc::new(
                ExternalType::new("System.Runtime", "System.Collections.Generic", "List`1"),
            )))),
            args: vec![Primitive::String.into()],
        }
    }

    #[test]
    fn display_wrappers() {
        let sig = TypeSignature::from(Primitive::I4).ptr().sz_array();
        assert_eq!(sig.to_string(), "int32*[]");

        let sig = TypeSignature::from(Primitive::U1).array(ArrayShape {
            rank: 3,
            sizes: vec![],
            lower_bounds: vec![],
        });
        assert_eq!(sig.to_string(), "uint8[,,]");

        assert_eq!(
            list_of_string().to_string(),
            "class System.Collections.Generic.List`1<string>"
        );
    }

    #[test]
    fn display_method() {
        let sig = MethodSignature::new_instance(
            Primitive::Void.into(),
            vec![Primitive::String.into(), TypeSignature::type_var(0)],
        );
        assert_eq!(sig.to_string(), "instance void(string, !0)");

        let sig =
            MethodSignature::new_static(TypeSignature::method_var(0, GenericOwner::Unbound), vec![])
                .with_generic_params(1);
        assert_eq!(sig.to_string(), "!!0<1>()");
    }

    #[test]
    fn leaves_and_wrappers() {
        assert!(list_of_string().is_leaf());
        assert!(TypeSignature::Sentinel.is_leaf());

        let wrapped = TypeSignature::from(Primitive::I4).by_ref();
        assert!(!wrapped.is_leaf());
        assert!(matches!(
            wrapped.inner(),
            Some(TypeSignature::Primitive(Primitive::I4))
        ));
    }

    #[test]
    fn deferred_owner_is_pending_until_filled() {
        let slot = Arc::new(OnceLock::new());
        let owner = GenericOwner::Deferred(slot.clone());
        assert!(owner.is_pending());
        assert!(owner.method().is_none());
    }
}
