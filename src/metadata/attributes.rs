//! Attribute flag sets for definitions, accessibility levels and the atomic cell holding them.
//!
//! The bit layouts follow ECMA-335 §II.23.1. Every flag set that can be reconciled by the resolver
//! implements [`MemberAttributes`], which names its accessibility mask and the reserved bits the
//! host format keeps for its own bookkeeping.

use std::{
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU32, Ordering},
};

use bitflags::bitflags;
use strum::Display;

bitflags! {
    /// Flags of a type definition (`TypeAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Mask for the visibility bits
        const VISIBILITY_MASK = 0x0000_0007;
        /// Top-level type not visible outside its assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Top-level public type
        const PUBLIC = 0x0000_0001;
        /// Nested public type
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested private type
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested type visible to derived types
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested type visible inside the assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested type visible to derived types inside the assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested type visible to derived types or inside the assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Sequential field layout
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Explicit field layout
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// The type is an interface
        const INTERFACE = 0x0000_0020;
        /// The type is abstract
        const ABSTRACT = 0x0000_0080;
        /// The type cannot be derived from
        const SEALED = 0x0000_0100;
        /// The name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// The type is imported
        const IMPORT = 0x0000_1000;
        /// The type is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// The type has security metadata
        const HAS_SECURITY = 0x0004_0000;
        /// Static fields may be initialized lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

bitflags! {
    /// Flags of a field definition (`FieldAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u32 {
        /// Mask for the accessibility bits
        const FIELD_ACCESS_MASK = 0x0007;
        /// Not referenceable, only usable inside its own scope
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by subtypes inside the assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible inside the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible by subtypes
        const FAMILY = 0x0004;
        /// Accessible by subtypes or inside the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible to everyone
        const PUBLIC = 0x0006;
        /// Defined on the type rather than per instance
        const STATIC = 0x0010;
        /// Assignable only in the constructor
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Not serialized when the type is remoted
        const NOT_SERIALIZED = 0x0080;
        /// The field has an RVA
        const HAS_FIELD_RVA = 0x0100;
        /// The name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// The field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// The field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

bitflags! {
    /// Flags of a method definition (`MethodAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u32 {
        /// Mask for the accessibility bits
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Not referenceable, only usable inside its own scope
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by subtypes inside the assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible inside the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible by subtypes
        const FAMILY = 0x0004;
        /// Accessible by subtypes or inside the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible to everyone
        const PUBLIC = 0x0006;
        /// Exported as unmanaged entry point
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on the type rather than per instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual dispatch
        const VIRTUAL = 0x0040;
        /// Hidden by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Overridable only if accessible
        const STRICT = 0x0200;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// The name is special
        const SPECIAL_NAME = 0x0800;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// The method has security metadata
        const HAS_SECURITY = 0x4000;
        /// The method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// Flags of a property definition (`PropertyAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAttributes: u32 {
        /// The name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// The property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// Flags of an event definition (`EventAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventAttributes: u32 {
        /// The name is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// Flags of a generic parameter (`GenericParamAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GenericParamAttributes: u32 {
        /// Mask for the variance bits
        const VARIANCE_MASK = 0x0003;
        /// Covariant
        const COVARIANT = 0x0001;
        /// Contravariant
        const CONTRAVARIANT = 0x0002;
        /// Mask for the special constraint bits
        const SPECIAL_CONSTRAINT_MASK = 0x001C;
        /// Must be a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Must be a non-nullable value type
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Must have a default constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

bitflags! {
    /// `MethodSemantics` flags linking accessor methods to properties and events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodSemanticsAttributes: u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other accessor of a property or event
        const OTHER = 0x0004;
        /// Event `add` accessor
        const ADD_ON = 0x0008;
        /// Event `remove` accessor
        const REMOVE_ON = 0x0010;
        /// Event raise accessor
        const FIRE = 0x0020;
    }
}

/// Accessibility of a symbol, independent of the symbol kind's bit encoding.
///
/// The levels form the partial order
/// `Private ⊆ FamilyAndAssembly ⊆ {Assembly, Family} ⊆ FamilyOrAssembly ⊆ Public`, with
/// `CompilerControlled` below everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AccessLevel {
    /// Only referenceable inside its own scope
    CompilerControlled,
    /// Visible to the declaring type only
    Private,
    /// Visible to derived types inside the assembly
    FamilyAndAssembly,
    /// Visible inside the assembly
    Assembly,
    /// Visible to derived types
    Family,
    /// Visible to derived types or inside the assembly
    FamilyOrAssembly,
    /// Visible to everyone
    Public,
}

impl AccessLevel {
    /// Returns `true` if a symbol with this accessibility satisfies a declaration that requires
    /// at least `required`.
    #[must_use]
    pub fn dominates(self, required: AccessLevel) -> bool {
        use AccessLevel::{
            Assembly, CompilerControlled, Family, FamilyAndAssembly, FamilyOrAssembly, Private,
            Public,
        };

        match required {
            CompilerControlled | Private => true,
            FamilyAndAssembly => matches!(
                self,
                FamilyAndAssembly | Assembly | Family | FamilyOrAssembly | Public
            ),
            Assembly => matches!(self, Assembly | FamilyOrAssembly | Public),
            Family => matches!(self, Family | FamilyOrAssembly | Public),
            FamilyOrAssembly => matches!(self, FamilyOrAssembly | Public),
            Public => self == Public,
        }
    }

    fn from_member_bits(bits: u32) -> AccessLevel {
        match bits & 0x7 {
            1 => AccessLevel::Private,
            2 => AccessLevel::FamilyAndAssembly,
            3 => AccessLevel::Assembly,
            4 => AccessLevel::Family,
            5 => AccessLevel::FamilyOrAssembly,
            6 => AccessLevel::Public,
            _ => AccessLevel::CompilerControlled,
        }
    }
}

/// A flag set the resolver knows how to reconcile.
pub trait MemberAttributes: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Bits that encode accessibility; `0` if the symbol kind has none.
    const ACCESS_MASK: u32;
    /// Bits reserved by the host format, always carried over from the existing definition.
    const PRESERVED: u32;

    /// Raw bit value.
    fn raw(self) -> u32;

    /// Builds a flag set from raw bits, keeping unknown bits.
    fn from_raw(bits: u32) -> Self;

    /// The accessibility encoded in these flags. `nested` only matters for types.
    fn access_level(self, nested: bool) -> AccessLevel;
}

impl MemberAttributes for TypeAttributes {
    const ACCESS_MASK: u32 = TypeAttributes::VISIBILITY_MASK.bits();
    const PRESERVED: u32 =
        TypeAttributes::RT_SPECIAL_NAME.bits() | TypeAttributes::HAS_SECURITY.bits();

    fn raw(self) -> u32 {
        self.bits()
    }

    fn from_raw(bits: u32) -> Self {
        TypeAttributes::from_bits_retain(bits)
    }

    fn access_level(self, nested: bool) -> AccessLevel {
        let visibility = self.bits() & Self::ACCESS_MASK;
        if !nested {
            return if visibility == TypeAttributes::PUBLIC.bits() {
                AccessLevel::Public
            } else {
                AccessLevel::Assembly
            };
        }

        match visibility {
            2 => AccessLevel::Public,
            4 => AccessLevel::Family,
            5 => AccessLevel::Assembly,
            6 => AccessLevel::FamilyAndAssembly,
            7 => AccessLevel::FamilyOrAssembly,
            _ => AccessLevel::Private,
        }
    }
}

impl MemberAttributes for FieldAttributes {
    const ACCESS_MASK: u32 = FieldAttributes::FIELD_ACCESS_MASK.bits();
    const PRESERVED: u32 = FieldAttributes::HAS_FIELD_RVA.bits()
        | FieldAttributes::RT_SPECIAL_NAME.bits()
        | FieldAttributes::HAS_FIELD_MARSHAL.bits()
        | FieldAttributes::HAS_DEFAULT.bits();

    fn raw(self) -> u32 {
        self.bits()
    }

    fn from_raw(bits: u32) -> Self {
        FieldAttributes::from_bits_retain(bits)
    }

    fn access_level(self, _nested: bool) -> AccessLevel {
        AccessLevel::from_member_bits(self.bits())
    }
}

impl MemberAttributes for MethodAttributes {
    const ACCESS_MASK: u32 = MethodAttributes::MEMBER_ACCESS_MASK.bits();
    const PRESERVED: u32 = MethodAttributes::RT_SPECIAL_NAME.bits()
        | MethodAttributes::HAS_SECURITY.bits()
        | MethodAttributes::REQUIRE_SEC_OBJECT.bits();

    fn raw(self) -> u32 {
        self.bits()
    }

    fn from_raw(bits: u32) -> Self {
        MethodAttributes::from_bits_retain(bits)
    }

    fn access_level(self, _nested: bool) -> AccessLevel {
        AccessLevel::from_member_bits(self.bits())
    }
}

impl MemberAttributes for PropertyAttributes {
    const ACCESS_MASK: u32 = 0;
    const PRESERVED: u32 =
        PropertyAttributes::RT_SPECIAL_NAME.bits() | PropertyAttributes::HAS_DEFAULT.bits();

    fn raw(self) -> u32 {
        self.bits()
    }

    fn from_raw(bits: u32) -> Self {
        PropertyAttributes::from_bits_retain(bits)
    }

    fn access_level(self, _nested: bool) -> AccessLevel {
        AccessLevel::Public
    }
}

impl MemberAttributes for EventAttributes {
    const ACCESS_MASK: u32 = 0;
    const PRESERVED: u32 = EventAttributes::RT_SPECIAL_NAME.bits();

    fn raw(self) -> u32 {
        self.bits()
    }

    fn from_raw(bits: u32) -> Self {
        EventAttributes::from_bits_retain(bits)
    }

    fn access_level(self, _nested: bool) -> AccessLevel {
        AccessLevel::Public
    }
}

/// A flag set that can be read and replaced through a shared reference.
pub struct AttributeCell<F: MemberAttributes> {
    bits: AtomicU32,
    _flags: PhantomData<fn() -> F>,
}

impl<F: MemberAttributes> AttributeCell<F> {
    /// Creates a cell holding `flags`
    #[must_use]
    pub fn new(flags: F) -> Self {
        AttributeCell {
            bits: AtomicU32::new(flags.raw()),
            _flags: PhantomData,
        }
    }

    /// Current flags
    pub fn get(&self) -> F {
        F::from_raw(self.bits.load(Ordering::Acquire))
    }

    /// Replaces the flags
    pub fn set(&self, flags: F) {
        self.bits.store(flags.raw(), Ordering::Release);
    }
}

impl<F: MemberAttributes> fmt::Debug for AttributeCell<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance_follows_the_partial_order() {
        use AccessLevel::*;

        assert!(CompilerControlled.dominates(Private));
        assert!(Private.dominates(Private));
        assert!(!Private.dominates(FamilyAndAssembly));
        assert!(Assembly.dominates(FamilyAndAssembly));
        assert!(Family.dominates(FamilyAndAssembly));
        assert!(!Assembly.dominates(Family));
        assert!(!Family.dominates(Assembly));
        assert!(FamilyOrAssembly.dominates(Assembly));
        assert!(FamilyOrAssembly.dominates(Family));
        assert!(!FamilyOrAssembly.dominates(Public));
        assert!(Public.dominates(FamilyOrAssembly));
        assert!(Public.dominates(Public));
    }

    #[test]
    fn type_visibility_depends_on_nesting() {
        assert_eq!(
            TypeAttributes::PUBLIC.access_level(false),
            AccessLevel::Public
        );
        assert_eq!(
            TypeAttributes::NOT_PUBLIC.access_level(false),
            AccessLevel::Assembly
        );
        assert_eq!(
            TypeAttributes::NESTED_PRIVATE.access_level(true),
            AccessLevel::Private
        );
        assert_eq!(
            TypeAttributes::NESTED_FAM_AND_ASSEM.access_level(true),
            AccessLevel::FamilyAndAssembly
        );
        assert_eq!(
            TypeAttributes::NESTED_PUBLIC.access_level(true),
            AccessLevel::Public
        );
    }

    #[test]
    fn member_access_levels() {
        assert_eq!(
            MethodAttributes::COMPILER_CONTROLLED.access_level(false),
            AccessLevel::CompilerControlled
        );
        assert_eq!(
            (MethodAttributes::FAMILY | MethodAttributes::STATIC).access_level(false),
            AccessLevel::Family
        );
        assert_eq!(
            FieldAttributes::PUBLIC.access_level(false),
            AccessLevel::Public
        );
    }

    #[test]
    fn cell_keeps_unknown_bits() {
        let cell = AttributeCell::new(MethodAttributes::PUBLIC);
        cell.set(MethodAttributes::from_raw(0x0001_0006));
        assert_eq!(cell.get().raw(), 0x0001_0006);
    }
}
