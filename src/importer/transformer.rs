use std::{collections::HashSet, sync::Arc};

use crate::{
    importer::SignatureImporter,
    metadata::{
        signatures::{MethodSignature, TypeSignature},
        token::Token,
        typesystem::{FieldRef, MethodRef, MethodSpec, TypeRef},
        Definition,
    },
    resolver::Resolve,
    transform::{TokenTransformer, TransformContext},
    Result,
};

/// Maps operands of a patch module body into the target.
///
/// References to patch definitions are first imported into the modification tree and then
/// resolved through the session. Calls to a base dependency of the patch are redirected to the
/// hidden method holding the original body.
pub struct ModuleTokenTransformer {
    importer: Arc<SignatureImporter>,
    base_dependencies: HashSet<Token>,
}

impl ModuleTokenTransformer {
    /// Creates a transformer importing through `importer`
    #[must_use]
    pub fn new(importer: Arc<SignatureImporter>, base_dependencies: HashSet<Token>) -> Self {
        ModuleTokenTransformer {
            importer,
            base_dependencies,
        }
    }

    fn is_base_dependency(&self, method: &MethodRef) -> bool {
        method.definition().is_some_and(|def| {
            self.base_dependencies.contains(&def.token())
                && def
                    .declaring_type()
                    .and_then(|ty| ty.module())
                    .is_some_and(|module| Arc::ptr_eq(&module, self.importer.scope()))
        })
    }
}

impl TokenTransformer for ModuleTokenTransformer {
    fn transform_type(&self, type_ref: &TypeRef, cx: &TransformContext<'_>) -> Result<TypeRef> {
        self.importer.import_type(type_ref)?.resolve(cx.search())
    }

    fn transform_signature(
        &self,
        signature: &TypeSignature,
        cx: &TransformContext<'_>,
    ) -> Result<TypeSignature> {
        self.importer
            .import_signature(signature)?
            .resolve(cx.search())
    }

    fn transform_call_site(
        &self,
        signature: &MethodSignature,
        cx: &TransformContext<'_>,
    ) -> Result<MethodSignature> {
        self.importer
            .import_method_signature(signature)?
            .resolve(cx.search())
    }

    fn transform_field(&self, field: &FieldRef, cx: &TransformContext<'_>) -> Result<FieldRef> {
        self.importer.import_field(field)?.resolve(cx.search())
    }

    fn transform_method(&self, method: &MethodRef, cx: &TransformContext<'_>) -> Result<MethodRef> {
        match method {
            MethodRef::Spec(spec) if self.is_base_dependency(&spec.method) => {
                Ok(MethodRef::Spec(Arc::new(MethodSpec {
                    method: MethodRef::from_def(&cx.base_method()?),
                    args: spec
                        .args
                        .iter()
                        .map(|arg| self.transform_signature(arg, cx))
                        .collect::<Result<_>>()?,
                })))
            }
            _ if self.is_base_dependency(method) => Ok(MethodRef::from_def(&cx.base_method()?)),
            _ => self.importer.import_method(method)?.resolve(cx.search()),
        }
    }

    fn lookup(&self, token: Token) -> Option<Definition> {
        self.importer.scope().lookup(token)
    }
}

impl std::fmt::Debug for ModuleTokenTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleTokenTransformer")
            .field("importer", &self.importer)
            .field("base_dependencies", &self.base_dependencies.len())
            .finish()
    }
}
