use std::sync::Arc;

use crate::{
    metadata::{
        method::MethodOverride,
        signatures::{
            FieldSignature, GenericParamKind, LocalVariable, MethodSignature, PropertySignature,
            TypeSignature,
        },
        typesystem::{
            ExternalField, ExternalMethod, FieldRef, GenericParameter, MethodRef, MethodSpec,
            TypeRef,
        },
    },
    resolver::SearchContext,
    Error, Result,
};

/// Maps a declarative value onto concrete definitions through a [`SearchContext`].
///
/// References to tracked modifications become references to the definitions they resolve to;
/// everything else is rebuilt with the same shape.
pub trait Resolve {
    /// The resolved value
    type Output;

    /// Resolves `self` against `context`.
    ///
    /// # Errors
    /// Any error raised while resolving a tracked modification, [`Error::UnresolvedToken`] for
    /// references whose target no longer exists and [`Error::InvalidSignature`] for signature
    /// shapes that cannot be resolved.
    fn resolve(&self, context: &dyn SearchContext) -> Result<Self::Output>;
}

fn dropped(what: &str) -> Error {
    Error::UnresolvedToken(format!("referenced {what} no longer exists"))
}

impl Resolve for TypeRef {
    type Output = TypeRef;

    fn resolve(&self, context: &dyn SearchContext) -> Result<TypeRef> {
        match self {
            TypeRef::Tracked(modification) => {
                let modification = modification.upgrade().ok_or_else(|| dropped("type"))?;
                Ok(TypeRef::from_def(&context.resolve_type(&modification)?))
            }
            TypeRef::Spec(signature) => Ok(TypeRef::spec(signature.resolve(context)?)),
            TypeRef::Def(_) | TypeRef::External(_) => Ok(self.clone()),
        }
    }
}

impl Resolve for FieldRef {
    type Output = FieldRef;

    fn resolve(&self, context: &dyn SearchContext) -> Result<FieldRef> {
        match self {
            FieldRef::Tracked(modification) => {
                let modification = modification.upgrade().ok_or_else(|| dropped("field"))?;
                Ok(FieldRef::from_def(&context.resolve_field(&modification)?))
            }
            FieldRef::External(external) => Ok(FieldRef::External(Arc::new(ExternalField {
                declaring_type: external.declaring_type.resolve(context)?,
                name: external.name.clone(),
                signature: external.signature.resolve(context)?,
            }))),
            FieldRef::Def(_) => Ok(self.clone()),
        }
    }
}

impl Resolve for MethodRef {
    type Output = MethodRef;

    fn resolve(&self, context: &dyn SearchContext) -> Result<MethodRef> {
        match self {
            MethodRef::Tracked(modification) => {
                let modification = modification.upgrade().ok_or_else(|| dropped("method"))?;
                Ok(MethodRef::from_def(&context.resolve_method(&modification)?))
            }
            MethodRef::External(external) => Ok(MethodRef::External(Arc::new(ExternalMethod {
                declaring_type: external.declaring_type.resolve(context)?,
                name: external.name.clone(),
                signature: external.signature.resolve(context)?,
            }))),
            MethodRef::Spec(spec) => Ok(MethodRef::Spec(Arc::new(MethodSpec {
                method: spec.method.resolve(context)?,
                args: resolve_list(&spec.args, context)?,
            }))),
            MethodRef::Def(_) => Ok(self.clone()),
        }
    }
}

fn resolve_list(items: &[TypeSignature], context: &dyn SearchContext) -> Result<Vec<TypeSignature>> {
    items.iter().map(|item| item.resolve(context)).collect()
}

impl Resolve for TypeSignature {
    type Output = TypeSignature;

    fn resolve(&self, context: &dyn SearchContext) -> Result<TypeSignature> {
        Ok(match self {
            TypeSignature::Unknown => {
                return Err(Error::InvalidSignature(
                    "cannot resolve a signature of unknown shape".to_string(),
                ))
            }
            TypeSignature::Primitive(_) | TypeSignature::Sentinel => self.clone(),
            TypeSignature::Class(type_ref) => TypeSignature::Class(type_ref.resolve(context)?),
            TypeSignature::ValueType(type_ref) => {
                TypeSignature::ValueType(type_ref.resolve(context)?)
            }
            TypeSignature::GenericParam(param) => {
                if param.owner.is_pending() {
                    let prefix = match param.kind {
                        GenericParamKind::Type => "!",
                        GenericParamKind::Method => "!!",
                    };
                    return Err(Error::InvalidSignature(format!(
                        "generic variable {prefix}{} was never bound to its method",
                        param.index
                    )));
                }
                self.clone()
            }
            TypeSignature::FnPtr(method) => TypeSignature::FnPtr(Box::new(method.resolve(context)?)),
            TypeSignature::GenericInst { generic, args } => TypeSignature::GenericInst {
                generic: Box::new(generic.resolve(context)?),
                args: resolve_list(args, context)?,
            },
            TypeSignature::Ptr(inner) => TypeSignature::Ptr(Box::new(inner.resolve(context)?)),
            TypeSignature::ByRef(inner) => TypeSignature::ByRef(Box::new(inner.resolve(context)?)),
            TypeSignature::SzArray(inner) => {
                TypeSignature::SzArray(Box::new(inner.resolve(context)?))
            }
            TypeSignature::Pinned(inner) => {
                TypeSignature::Pinned(Box::new(inner.resolve(context)?))
            }
            TypeSignature::Array { element, shape } => TypeSignature::Array {
                element: Box::new(element.resolve(context)?),
                shape: shape.clone(),
            },
            TypeSignature::ModReqd { modifier, inner } => TypeSignature::ModReqd {
                modifier: modifier.resolve(context)?,
                inner: Box::new(inner.resolve(context)?),
            },
            TypeSignature::ModOpt { modifier, inner } => TypeSignature::ModOpt {
                modifier: modifier.resolve(context)?,
                inner: Box::new(inner.resolve(context)?),
            },
            TypeSignature::Module { index, inner } => TypeSignature::Module {
                index: *index,
                inner: Box::new(inner.resolve(context)?),
            },
        })
    }
}

impl Resolve for MethodSignature {
    type Output = MethodSignature;

    fn resolve(&self, context: &dyn SearchContext) -> Result<MethodSignature> {
        Ok(MethodSignature {
            calling_convention: self.calling_convention,
            generic_param_count: self.generic_param_count,
            return_type: self.return_type.resolve(context)?,
            params: resolve_list(&self.params, context)?,
            params_after_sentinel: resolve_list(&self.params_after_sentinel, context)?,
        })
    }
}

impl Resolve for FieldSignature {
    type Output = FieldSignature;

    fn resolve(&self, context: &dyn SearchContext) -> Result<FieldSignature> {
        Ok(FieldSignature::new(self.field_type.resolve(context)?))
    }
}

impl Resolve for PropertySignature {
    type Output = PropertySignature;

    fn resolve(&self, context: &dyn SearchContext) -> Result<PropertySignature> {
        Ok(PropertySignature {
            has_this: self.has_this,
            property_type: self.property_type.resolve(context)?,
            params: resolve_list(&self.params, context)?,
        })
    }
}

impl Resolve for LocalVariable {
    type Output = LocalVariable;

    fn resolve(&self, context: &dyn SearchContext) -> Result<LocalVariable> {
        Ok(LocalVariable::new(self.signature.resolve(context)?))
    }
}

impl Resolve for GenericParameter {
    type Output = GenericParameter;

    fn resolve(&self, context: &dyn SearchContext) -> Result<GenericParameter> {
        Ok(GenericParameter {
            number: self.number,
            attributes: self.attributes,
            name: self.name.clone(),
            constraints: self
                .constraints
                .iter()
                .map(|constraint| constraint.resolve(context))
                .collect::<Result<_>>()?,
        })
    }
}

impl Resolve for MethodOverride {
    type Output = MethodOverride;

    fn resolve(&self, context: &dyn SearchContext) -> Result<MethodOverride> {
        Ok(MethodOverride {
            body: self.body.resolve(context)?,
            declaration: self.declaration.resolve(context)?,
        })
    }
}
