use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock},
};

use dashmap::DashMap;

use crate::{
    metadata::{
        method::MethodOverride,
        module::ModuleDefRc,
        signatures::{
            FieldSignature, GenericOwner, GenericParamSig, LocalVariable, MethodSignature,
            PropertySignature, TypeSignature,
        },
        token::Token,
        typesystem::{
            ExternalField, ExternalMethod, FieldRef, GenericParameter, MethodRef, MethodSpec,
            TypeRef,
        },
    },
    modification::{
        FieldModificationRc, MethodModificationRc, TypeModificationRc,
    },
    Error, Result,
};

/// Work queued until a method modification exists.
pub type Continuation = Box<dyn FnOnce(&MethodModificationRc) + Send>;

/// Translates references and signatures of a patch module into the modification tree.
///
/// Definitions of the patch module are bound to the modifications declared for them. Importing a
/// reference to a bound definition yields a tracked reference to its modification, references
/// outside the patch module pass through unchanged, and references to patch definitions that
/// were never declared are rejected.
///
/// Method generic variables can be met before their owning method has a modification (the
/// method's own signature is imported before the method is declared). Such variables receive a
/// deferred owner that is filled once [`SignatureImporter::bind_method`] runs for the owner.
///
/// Bindings are held weakly; the patch owns the modification tree.
pub struct SignatureImporter {
    scope: ModuleDefRc,
    types: DashMap<Token, TypeRef>,
    fields: DashMap<Token, FieldRef>,
    methods: DashMap<Token, MethodRef>,
    pending: Mutex<HashMap<Token, Vec<Continuation>>>,
    deferred: Mutex<HashMap<Token, Arc<OnceLock<MethodRef>>>>,
}

impl SignatureImporter {
    /// Creates an importer for definitions of `scope`
    #[must_use]
    pub fn new(scope: ModuleDefRc) -> Self {
        SignatureImporter {
            scope,
            types: DashMap::new(),
            fields: DashMap::new(),
            methods: DashMap::new(),
            pending: Mutex::new(HashMap::new()),
            deferred: Mutex::new(HashMap::new()),
        }
    }

    /// The patch module
    pub fn scope(&self) -> &ModuleDefRc {
        &self.scope
    }

    /// Binds the patch type with `token` to `modification`
    pub fn bind_type(&self, token: Token, modification: &TypeModificationRc) {
        self.types.insert(token, TypeRef::tracked(modification));
    }

    /// Binds the patch field with `token` to `modification`
    pub fn bind_field(&self, token: Token, modification: &FieldModificationRc) {
        self.fields.insert(token, FieldRef::tracked(modification));
    }

    /// Binds the patch method with `token` to `modification`.
    ///
    /// Continuations registered for the method run now, in registration order, and are dropped.
    pub fn bind_method(&self, token: Token, modification: &MethodModificationRc) {
        self.methods.insert(token, MethodRef::tracked(modification));

        let queued = lock!(self.pending).remove(&token).unwrap_or_default();
        if !queued.is_empty() {
            log::trace!(
                "replaying {} continuations for {}",
                queued.len(),
                modification.full_name()
            );
        }
        for continuation in queued {
            continuation(modification);
        }
    }

    /// Runs `continuation` once the method with `token` is bound, or immediately if it already is
    pub fn defer(&self, token: Token, continuation: Continuation) {
        let mut pending = lock!(self.pending);
        let bound = self
            .methods
            .get(&token)
            .and_then(|entry| match entry.value() {
                MethodRef::Tracked(weak) => weak.upgrade(),
                _ => None,
            });

        match bound {
            Some(modification) => {
                drop(pending);
                continuation(&modification);
            }
            None => pending.entry(token).or_default().push(continuation),
        }
    }

    /// Number of methods with queued continuations
    pub fn pending_count(&self) -> usize {
        lock!(self.pending).len()
    }

    /// The modification bound to a patch type
    pub fn bound_type(&self, token: Token) -> Option<TypeRef> {
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// The modification bound to a patch method
    pub fn bound_method(&self, token: Token) -> Option<MethodRef> {
        self.methods.get(&token).map(|entry| entry.value().clone())
    }

    fn in_scope(&self, module: Option<ModuleDefRc>) -> bool {
        module.is_some_and(|module| Arc::ptr_eq(&module, &self.scope))
    }

    fn undeclared(full_name: &str) -> Error {
        Error::UnresolvedToken(format!(
            "{full_name} is defined by the patch but declares no intent"
        ))
    }

    /// Imports a type reference
    ///
    /// # Errors
    /// [`Error::UnresolvedToken`] for undeclared patch types, [`Error::InvalidSignature`] for
    /// constructed types of unknown shape.
    pub fn import_type(&self, type_ref: &TypeRef) -> Result<TypeRef> {
        match type_ref {
            TypeRef::Def(def) => {
                let Some(def) = def.upgrade() else {
                    return Ok(type_ref.clone());
                };
                if !self.in_scope(def.module()) {
                    return Ok(type_ref.clone());
                }
                self.bound_type(def.token())
                    .ok_or_else(|| Self::undeclared(&def.full_name()))
            }
            TypeRef::Spec(signature) => Ok(TypeRef::spec(self.import_signature(signature)?)),
            TypeRef::External(_) | TypeRef::Tracked(_) => Ok(type_ref.clone()),
        }
    }

    /// Imports a field reference
    ///
    /// # Errors
    /// See [`SignatureImporter::import_type`].
    pub fn import_field(&self, field: &FieldRef) -> Result<FieldRef> {
        match field {
            FieldRef::Def(def) => {
                let Some(def) = def.upgrade() else {
                    return Ok(field.clone());
                };
                if !self.in_scope(def.declaring_type().and_then(|t| t.module())) {
                    return Ok(field.clone());
                }
                self.fields
                    .get(&def.token())
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| Self::undeclared(&def.full_name()))
            }
            FieldRef::External(external) => Ok(FieldRef::External(Arc::new(ExternalField {
                declaring_type: self.import_type(&external.declaring_type)?,
                name: external.name.clone(),
                signature: self.import_field_signature(&external.signature)?,
            }))),
            FieldRef::Tracked(_) => Ok(field.clone()),
        }
    }

    /// Imports a method reference
    ///
    /// # Errors
    /// See [`SignatureImporter::import_type`].
    pub fn import_method(&self, method: &MethodRef) -> Result<MethodRef> {
        match method {
            MethodRef::Def(def) => {
                let Some(def) = def.upgrade() else {
                    return Ok(method.clone());
                };
                if !self.in_scope(def.declaring_type().and_then(|t| t.module())) {
                    return Ok(method.clone());
                }
                self.bound_method(def.token())
                    .ok_or_else(|| Self::undeclared(&def.full_name()))
            }
            MethodRef::External(external) => Ok(MethodRef::External(Arc::new(ExternalMethod {
                declaring_type: self.import_type(&external.declaring_type)?,
                name: external.name.clone(),
                signature: self.import_method_signature(&external.signature)?,
            }))),
            MethodRef::Spec(spec) => Ok(MethodRef::Spec(Arc::new(MethodSpec {
                method: self.import_method(&spec.method)?,
                args: self.import_list(&spec.args)?,
            }))),
            MethodRef::Tracked(_) => Ok(method.clone()),
        }
    }

    fn import_list(&self, items: &[TypeSignature]) -> Result<Vec<TypeSignature>> {
        items
            .iter()
            .map(|item| self.import_signature(item))
            .collect()
    }

    fn import_owner(&self, owner: &GenericOwner) -> Result<GenericOwner> {
        Ok(match owner {
            GenericOwner::Type(type_ref) => GenericOwner::Type(self.import_type(type_ref)?),
            GenericOwner::Method(MethodRef::Def(def)) => {
                let Some(def) = def.upgrade() else {
                    return Ok(owner.clone());
                };
                if !self.in_scope(def.declaring_type().and_then(|t| t.module())) {
                    return Ok(owner.clone());
                }

                let token = def.token();
                if let Some(bound) = self.bound_method(token) {
                    return Ok(GenericOwner::Method(bound));
                }

                let slot = lock!(self.deferred)
                    .entry(token)
                    .or_insert_with(|| {
                        let slot = Arc::new(OnceLock::new());
                        let target = slot.clone();
                        self.defer_with(token, move |method| {
                            let _ = target.set(MethodRef::tracked(method));
                        });
                        slot
                    })
                    .clone();
                GenericOwner::Deferred(slot)
            }
            GenericOwner::Method(method) => GenericOwner::Method(self.import_method(method)?),
            GenericOwner::Unbound | GenericOwner::Deferred(_) => owner.clone(),
        })
    }

    fn defer_with(
        &self,
        token: Token,
        continuation: impl FnOnce(&MethodModificationRc) + Send + 'static,
    ) {
        self.defer(token, Box::new(continuation));
    }

    /// Imports a type signature, rebuilding every wrapper with the same shape
    ///
    /// # Errors
    /// [`Error::InvalidSignature`] for [`TypeSignature::Unknown`], see
    /// [`SignatureImporter::import_type`] for the leaves.
    pub fn import_signature(&self, signature: &TypeSignature) -> Result<TypeSignature> {
        Ok(match signature {
            TypeSignature::Unknown => {
                return Err(Error::InvalidSignature(
                    "cannot import a signature of unknown shape".to_string(),
                ))
            }
            TypeSignature::Primitive(_) | TypeSignature::Sentinel => signature.clone(),
            TypeSignature::Class(type_ref) => TypeSignature::Class(self.import_type(type_ref)?),
            TypeSignature::ValueType(type_ref) => {
                TypeSignature::ValueType(self.import_type(type_ref)?)
            }
            TypeSignature::GenericParam(param) => TypeSignature::GenericParam(GenericParamSig {
                kind: param.kind,
                index: param.index,
                owner: self.import_owner(&param.owner)?,
            }),
            TypeSignature::FnPtr(method) => {
                TypeSignature::FnPtr(Box::new(self.import_method_signature(method)?))
            }
            TypeSignature::GenericInst { generic, args } => TypeSignature::GenericInst {
                generic: Box::new(self.import_signature(generic)?),
                args: self.import_list(args)?,
            },
            TypeSignature::Ptr(inner) => TypeSignature::Ptr(Box::new(self.import_signature(inner)?)),
            TypeSignature::ByRef(inner) => {
                TypeSignature::ByRef(Box::new(self.import_signature(inner)?))
            }
            TypeSignature::SzArray(inner) => {
                TypeSignature::SzArray(Box::new(self.import_signature(inner)?))
            }
            TypeSignature::Pinned(inner) => {
                TypeSignature::Pinned(Box::new(self.import_signature(inner)?))
            }
            TypeSignature::Array { element, shape } => TypeSignature::Array {
                element: Box::new(self.import_signature(element)?),
                shape: shape.clone(),
            },
            TypeSignature::ModReqd { modifier, inner } => TypeSignature::ModReqd {
                modifier: self.import_type(modifier)?,
                inner: Box::new(self.import_signature(inner)?),
            },
            TypeSignature::ModOpt { modifier, inner } => TypeSignature::ModOpt {
                modifier: self.import_type(modifier)?,
                inner: Box::new(self.import_signature(inner)?),
            },
            TypeSignature::Module { index, inner } => TypeSignature::Module {
                index: *index,
                inner: Box::new(self.import_signature(inner)?),
            },
        })
    }

    /// Imports a method, call site or function pointer signature
    ///
    /// # Errors
    /// See [`SignatureImporter::import_signature`].
    pub fn import_method_signature(&self, signature: &MethodSignature) -> Result<MethodSignature> {
        Ok(MethodSignature {
            calling_convention: signature.calling_convention,
            generic_param_count: signature.generic_param_count,
            return_type: self.import_signature(&signature.return_type)?,
            params: self.import_list(&signature.params)?,
            params_after_sentinel: self.import_list(&signature.params_after_sentinel)?,
        })
    }

    /// Imports a field signature
    ///
    /// # Errors
    /// See [`SignatureImporter::import_signature`].
    pub fn import_field_signature(&self, signature: &FieldSignature) -> Result<FieldSignature> {
        Ok(FieldSignature::new(self.import_signature(&signature.field_type)?))
    }

    /// Imports a property signature
    ///
    /// # Errors
    /// See [`SignatureImporter::import_signature`].
    pub fn import_property_signature(
        &self,
        signature: &PropertySignature,
    ) -> Result<PropertySignature> {
        Ok(PropertySignature {
            has_this: signature.has_this,
            property_type: self.import_signature(&signature.property_type)?,
            params: self.import_list(&signature.params)?,
        })
    }

    /// Imports the type of a local variable
    ///
    /// # Errors
    /// See [`SignatureImporter::import_signature`].
    pub fn import_local(&self, local: &LocalVariable) -> Result<LocalVariable> {
        Ok(LocalVariable::new(self.import_signature(&local.signature)?))
    }

    /// Imports a generic parameter and its constraints
    ///
    /// # Errors
    /// See [`SignatureImporter::import_type`].
    pub fn import_generic_param(&self, param: &GenericParameter) -> Result<GenericParameter> {
        Ok(GenericParameter {
            number: param.number,
            attributes: param.attributes,
            name: param.name.clone(),
            constraints: param
                .constraints
                .iter()
                .map(|constraint| self.import_type(constraint))
                .collect::<Result<_>>()?,
        })
    }

    /// Imports both sides of an interface implementation
    ///
    /// # Errors
    /// See [`SignatureImporter::import_method`].
    pub fn import_override(&self, method_override: &MethodOverride) -> Result<MethodOverride> {
        Ok(MethodOverride {
            body: self.import_method(&method_override.body)?,
            declaration: self.import_method(&method_override.declaration)?,
        })
    }
}

impl std::fmt::Debug for SignatureImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureImporter")
            .field("scope", &self.scope.name)
            .field("types", &self.types.len())
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}
