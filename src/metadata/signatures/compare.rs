//! Structural comparison of signatures and type references.
//!
//! [`SigComparer`] compares signature trees node by node. With no options set it is strict:
//! leaves must reference the same definition, the same tracked modification, or an external type
//! with the same scope and name. The option flags relax this for overload lookup and for checking
//! declared shapes against existing definitions.

use bitflags::bitflags;

use crate::metadata::{
    attributes::MethodAttributes,
    signatures::{
        FieldSignature, GenericParamSig, LocalVariable, MethodSignature, PropertySignature,
        TypeSignature,
    },
    typesystem::{FieldRef, MethodRef, TypeRef},
};

bitflags! {
    /// Relaxations applied by a [`SigComparer`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompareOptions: u32 {
        /// Compare type references by full name only, ignoring which module they live in
        const DONT_COMPARE_TYPE_SCOPE = 0x01;
        /// Skip `modreq`/`modopt` wrappers
        const IGNORE_MODIFIERS = 0x02;
        /// Leave the return type out of method signature comparison
        const DONT_COMPARE_RETURN_TYPE = 0x04;
        /// Compiler-controlled methods take part in lookups
        const PRIVATE_SCOPE_IS_COMPARABLE = 0x08;
    }
}

impl CompareOptions {
    /// Options used to identify method overloads
    pub const OVERLOAD: CompareOptions = CompareOptions::DONT_COMPARE_TYPE_SCOPE
        .union(CompareOptions::IGNORE_MODIFIERS)
        .union(CompareOptions::DONT_COMPARE_RETURN_TYPE)
        .union(CompareOptions::PRIVATE_SCOPE_IS_COMPARABLE);

    /// Options used to check a declared shape against an existing definition
    pub const DECLARED: CompareOptions = CompareOptions::DONT_COMPARE_TYPE_SCOPE;
}

/// Structural comparer over signature trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigComparer {
    options: CompareOptions,
}

impl SigComparer {
    /// Strict comparison
    pub const STRICT: SigComparer = SigComparer {
        options: CompareOptions::empty(),
    };

    /// Creates a comparer with the given relaxations
    #[must_use]
    pub fn new(options: CompareOptions) -> Self {
        SigComparer { options }
    }

    /// Comparer identifying method overloads
    #[must_use]
    pub fn overload() -> Self {
        SigComparer::new(CompareOptions::OVERLOAD)
    }

    /// Comparer checking declarations against existing definitions
    #[must_use]
    pub fn declared() -> Self {
        SigComparer::new(CompareOptions::DECLARED)
    }

    /// The active relaxations
    #[must_use]
    pub fn options(&self) -> CompareOptions {
        self.options
    }

    /// Returns `true` if a method with these attributes takes part in lookups.
    #[must_use]
    pub fn is_comparable(&self, attributes: MethodAttributes) -> bool {
        self.options
            .contains(CompareOptions::PRIVATE_SCOPE_IS_COMPARABLE)
            || attributes.bits() & MethodAttributes::MEMBER_ACCESS_MASK.bits()
                != MethodAttributes::COMPILER_CONTROLLED.bits()
    }

    /// Compares two type references.
    #[must_use]
    pub fn type_refs_equal(&self, left: &TypeRef, right: &TypeRef) -> bool {
        if let (TypeRef::Spec(left), TypeRef::Spec(right)) = (left, right) {
            return self.types_equal(left, right);
        }

        if self
            .options
            .contains(CompareOptions::DONT_COMPARE_TYPE_SCOPE)
        {
            return !matches!(left, TypeRef::Spec(_))
                && !matches!(right, TypeRef::Spec(_))
                && left.full_name() == right.full_name();
        }

        match (left, right) {
            (TypeRef::Def(left), TypeRef::Def(right)) => left.ptr_eq(right),
            (TypeRef::Tracked(left), TypeRef::Tracked(right)) => left.ptr_eq(right),
            (TypeRef::External(left), TypeRef::External(right)) => left.as_ref() == right.as_ref(),
            _ => false,
        }
    }

    /// Compares two type signatures.
    #[must_use]
    pub fn types_equal(&self, left: &TypeSignature, right: &TypeSignature) -> bool {
        let left = self.strip(left);
        let right = self.strip(right);

        match (left, right) {
            (TypeSignature::Unknown, _) | (_, TypeSignature::Unknown) => false,
            (TypeSignature::Sentinel, TypeSignature::Sentinel) => true,
            (TypeSignature::Primitive(left), TypeSignature::Primitive(right)) => left == right,
            (TypeSignature::Class(left), TypeSignature::Class(right))
            | (TypeSignature::ValueType(left), TypeSignature::ValueType(right)) => {
                self.type_refs_equal(left, right)
            }
            (TypeSignature::GenericParam(left), TypeSignature::GenericParam(right)) => {
                Self::generic_params_equal(left, right)
            }
            (TypeSignature::FnPtr(left), TypeSignature::FnPtr(right)) => {
                self.method_sigs_equal(left, right)
            }
            (
                TypeSignature::GenericInst {
                    generic: left_generic,
                    args: left_args,
                },
                TypeSignature::GenericInst {
                    generic: right_generic,
                    args: right_args,
                },
            ) => {
                self.types_equal(left_generic, right_generic)
                    && self.lists_equal(left_args, right_args)
            }
            (TypeSignature::Ptr(left), TypeSignature::Ptr(right))
            | (TypeSignature::ByRef(left), TypeSignature::ByRef(right))
            | (TypeSignature::SzArray(left), TypeSignature::SzArray(right))
            | (TypeSignature::Pinned(left), TypeSignature::Pinned(right)) => {
                self.types_equal(left, right)
            }
            (
                TypeSignature::Array {
                    element: left_element,
                    shape: left_shape,
                },
                TypeSignature::Array {
                    element: right_element,
                    shape: right_shape,
                },
            ) => left_shape == right_shape && self.types_equal(left_element, right_element),
            (
                TypeSignature::ModReqd {
                    modifier: left_modifier,
                    inner: left_inner,
                },
                TypeSignature::ModReqd {
                    modifier: right_modifier,
                    inner: right_inner,
                },
            )
            | (
                TypeSignature::ModOpt {
                    modifier: left_modifier,
                    inner: left_inner,
                },
                TypeSignature::ModOpt {
                    modifier: right_modifier,
                    inner: right_inner,
                },
            ) => {
                self.type_refs_equal(left_modifier, right_modifier)
                    && self.types_equal(left_inner, right_inner)
            }
            (
                TypeSignature::Module {
                    index: left_index,
                    inner: left_inner,
                },
                TypeSignature::Module {
                    index: right_index,
                    inner: right_inner,
                },
            ) => left_index == right_index && self.types_equal(left_inner, right_inner),
            _ => false,
        }
    }

    /// Compares two method signatures.
    #[must_use]
    pub fn method_sigs_equal(&self, left: &MethodSignature, right: &MethodSignature) -> bool {
        left.calling_convention == right.calling_convention
            && left.generic_param_count == right.generic_param_count
            && (self
                .options
                .contains(CompareOptions::DONT_COMPARE_RETURN_TYPE)
                || self.types_equal(&left.return_type, &right.return_type))
            && self.lists_equal(&left.params, &right.params)
            && self.lists_equal(&left.params_after_sentinel, &right.params_after_sentinel)
    }

    /// Compares two field signatures.
    #[must_use]
    pub fn field_sigs_equal(&self, left: &FieldSignature, right: &FieldSignature) -> bool {
        self.types_equal(&left.field_type, &right.field_type)
    }

    /// Compares two property signatures.
    #[must_use]
    pub fn property_sigs_equal(&self, left: &PropertySignature, right: &PropertySignature) -> bool {
        left.has_this == right.has_this
            && self.types_equal(&left.property_type, &right.property_type)
            && self.lists_equal(&left.params, &right.params)
    }

    /// Compares two local variable lists.
    #[must_use]
    pub fn locals_equal(&self, left: &[LocalVariable], right: &[LocalVariable]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(left, right)| self.types_equal(&left.signature, &right.signature))
    }

    /// Compares two field references.
    #[must_use]
    pub fn field_refs_equal(&self, left: &FieldRef, right: &FieldRef) -> bool {
        match (left, right) {
            (FieldRef::Def(left), FieldRef::Def(right)) => left.ptr_eq(right),
            (FieldRef::Tracked(left), FieldRef::Tracked(right)) => left.ptr_eq(right),
            (FieldRef::External(left), FieldRef::External(right)) => {
                left.name == right.name
                    && self.type_refs_equal(&left.declaring_type, &right.declaring_type)
                    && self.field_sigs_equal(&left.signature, &right.signature)
            }
            _ => false,
        }
    }

    /// Compares two method references.
    #[must_use]
    pub fn method_refs_equal(&self, left: &MethodRef, right: &MethodRef) -> bool {
        match (left, right) {
            (MethodRef::Def(left), MethodRef::Def(right)) => left.ptr_eq(right),
            (MethodRef::Tracked(left), MethodRef::Tracked(right)) => left.ptr_eq(right),
            (MethodRef::External(left), MethodRef::External(right)) => {
                left.name == right.name
                    && self.type_refs_equal(&left.declaring_type, &right.declaring_type)
                    && self.method_sigs_equal(&left.signature, &right.signature)
            }
            (MethodRef::Spec(left), MethodRef::Spec(right)) => {
                self.method_refs_equal(&left.method, &right.method)
                    && self.lists_equal(&left.args, &right.args)
            }
            _ => false,
        }
    }

    fn generic_params_equal(left: &GenericParamSig, right: &GenericParamSig) -> bool {
        left.kind == right.kind && left.index == right.index
    }

    fn lists_equal(&self, left: &[TypeSignature], right: &[TypeSignature]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(left, right)| self.types_equal(left, right))
    }

    fn strip<'a>(&self, mut signature: &'a TypeSignature) -> &'a TypeSignature {
        if !self.options.contains(CompareOptions::IGNORE_MODIFIERS) {
            return signature;
        }

        while let TypeSignature::ModReqd { inner, .. } | TypeSignature::ModOpt { inner, .. } =
            signature
        {
            signature = inner.as_ref();
        }
        signature
    }
}

impl PartialEq for TypeSignature {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.types_equal(self, other)
    }
}

impl PartialEq for MethodSignature {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.method_sigs_equal(self, other)
    }
}

impl PartialEq for FieldSignature {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.field_sigs_equal(self, other)
    }
}

impl PartialEq for PropertySignature {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.property_sigs_equal(self, other)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.type_refs_equal(self, other)
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.field_refs_equal(self, other)
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        SigComparer::STRICT.method_refs_equal(self, other)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::{
        signatures::{ArrayShape, GenericOwner, Primitive},
        typesystem::ExternalType,
    };

    fn external(scope: &str, namespace: &str, name: &str) -> TypeRef {
        TypeRef::External(Arc::new(ExternalType::new(scope, namespace, name)))
    }

    fn nested_sig() -> TypeSignature {
        TypeSignature::class(external("Target", "N", "C"))
            .sz_array()
            .ptr()
            .array(ArrayShape {
                rank: 2,
                sizes: vec![4],
                lower_bounds: vec![0],
            })
    }

    #[test]
    fn independent_trees_with_same_leaves_are_equal() {
        assert_eq!(nested_sig(), nested_sig());

        let modified = |modifier: &str| TypeSignature::ModReqd {
            modifier: external("System.Runtime", "System.Runtime.CompilerServices", modifier),
            inner: Box::new(nested_sig()),
        };
        assert_eq!(modified("IsVolatile"), modified("IsVolatile"));
    }

    #[test]
    fn changing_any_part_breaks_equality() {
        let other_leaf = TypeSignature::class(external("Target", "N", "D"))
            .sz_array()
            .ptr()
            .array(ArrayShape {
                rank: 2,
                sizes: vec![4],
                lower_bounds: vec![0],
            });
        assert_ne!(nested_sig(), other_leaf);

        let other_rank = TypeSignature::class(external("Target", "N", "C"))
            .sz_array()
            .ptr()
            .array(ArrayShape {
                rank: 3,
                sizes: vec![4],
                lower_bounds: vec![0],
            });
        assert_ne!(nested_sig(), other_rank);

        let deeper = TypeSignature::class(external("Target", "N", "C"))
            .sz_array()
            .ptr()
            .ptr()
            .array(ArrayShape {
                rank: 2,
                sizes: vec![4],
                lower_bounds: vec![0],
            });
        assert_ne!(nested_sig(), deeper);

        let modified = |modifier: &str| TypeSignature::ModOpt {
            modifier: external("System.Runtime", "System.Runtime.CompilerServices", modifier),
            inner: Box::new(Primitive::I4.into()),
        };
        assert_ne!(modified("IsVolatile"), modified("IsConst"));
    }

    #[test]
    fn scope_only_matters_in_strict_mode() {
        let left = TypeSignature::class(external("mscorlib", "System", "Object"));
        let right = TypeSignature::class(external("System.Runtime", "System", "Object"));

        assert_ne!(left, right);
        assert!(SigComparer::declared().types_equal(&left, &right));
    }

    #[test]
    fn overloads_ignore_return_type_and_modifiers() {
        let plain = MethodSignature::new_instance(Primitive::Void.into(), vec![Primitive::I4.into()]);
        let other = MethodSignature::new_instance(
            Primitive::I4.into(),
            vec![TypeSignature::ModOpt {
                modifier: external("System.Runtime", "System.Runtime.CompilerServices", "IsLong"),
                inner: Box::new(Primitive::I4.into()),
            }],
        );

        assert_ne!(plain, other);
        assert!(SigComparer::overload().method_sigs_equal(&plain, &other));
        assert!(!SigComparer::declared().method_sigs_equal(&plain, &other));

        let static_sig = MethodSignature::new_static(Primitive::Void.into(), vec![Primitive::I4.into()]);
        assert!(!SigComparer::overload().method_sigs_equal(&plain, &static_sig));
    }

    #[test]
    fn generic_variables_compare_by_kind_and_index() {
        let owned = TypeSignature::method_var(1, GenericOwner::Unbound);
        let other_owner = TypeSignature::method_var(
            1,
            GenericOwner::Type(external("Target", "N", "C")),
        );
        assert_eq!(owned, other_owner);
        assert_ne!(owned, TypeSignature::type_var(1));
        assert_ne!(owned, TypeSignature::method_var(0, GenericOwner::Unbound));
    }

    #[test]
    fn compiler_controlled_methods_are_opt_in() {
        assert!(!SigComparer::declared().is_comparable(MethodAttributes::COMPILER_CONTROLLED));
        assert!(SigComparer::overload().is_comparable(MethodAttributes::COMPILER_CONTROLLED));
        assert!(SigComparer::declared().is_comparable(MethodAttributes::PRIVATE));
    }

    #[test]
    fn unknown_shapes_never_match() {
        let unknown = TypeSignature::Unknown;
        assert!(!SigComparer::STRICT.types_equal(&unknown, &unknown));
        assert!(!SigComparer::overload().types_equal(&unknown, &TypeSignature::Unknown));
        assert!(!SigComparer::STRICT.types_equal(&unknown, &Primitive::I4.into()));

        let malformed = MethodSignature::new_static(Primitive::Void.into(), vec![unknown.clone()]);
        assert!(!SigComparer::overload().method_sigs_equal(&malformed, &malformed.clone()));
        assert_ne!(unknown.clone().sz_array(), unknown.sz_array());
    }
}
