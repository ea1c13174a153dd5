//! Mapping of method bodies from a patch into a target module.
//!
//! A transplanted body references types, fields and methods as the patch sees them. Before it is
//! attached to its target method, every operand runs through a [`TokenTransformer`], which maps
//! it onto the definitions the [`SearchContext`] resolves. Calls to the method being replaced
//! ("base dependencies") are redirected to a hidden method that keeps the original body, so a
//! patch can run the original code and then add its own.
//!
//! # Key Components
//!
//! - [`TokenTransformer`] - Per-operand mapping, one method per reference kind
//! - [`DefaultTokenTransformer`] - Resolves tracked references, redirects base dependencies
//! - [`TransformContext`] - The method being rewritten and its lazily created hidden base method
//! - [`import_body`], [`transplant`] - Body rewriting and attachment

mod body;

use std::sync::{Arc, OnceLock};

pub use body::{import_body, transplant};

use crate::{
    assembly::Operand,
    metadata::{
        attributes::MethodAttributes,
        method::{MethodBody, MethodDef, MethodDefRc},
        module::ModuleDefRc,
        signatures::{MethodSignature, SigComparer, TypeSignature},
        token::Token,
        typesystem::{FieldRef, MethodRef, MethodSpec, TypeRef},
        Definition,
    },
    resolver::{Resolve, SearchContext},
    Error, Result,
};

/// Maps the operands of a transplanted body into the target.
///
/// Every method has a default that resolves the reference through the context's search context;
/// implementors override the kinds they need to treat differently.
pub trait TokenTransformer: Send + Sync {
    /// Maps a type operand (`box`, `newarr`, `castclass`, catch types, ...)
    ///
    /// # Errors
    /// Any resolution error.
    fn transform_type(&self, type_ref: &TypeRef, cx: &TransformContext<'_>) -> Result<TypeRef> {
        type_ref.resolve(cx.search())
    }

    /// Maps the type of a local variable
    ///
    /// # Errors
    /// Any resolution error.
    fn transform_signature(
        &self,
        signature: &TypeSignature,
        cx: &TransformContext<'_>,
    ) -> Result<TypeSignature> {
        signature.resolve(cx.search())
    }

    /// Maps the stand-alone signature of a `calli`
    ///
    /// # Errors
    /// Any resolution error.
    fn transform_call_site(
        &self,
        signature: &MethodSignature,
        cx: &TransformContext<'_>,
    ) -> Result<MethodSignature> {
        signature.resolve(cx.search())
    }

    /// Maps a field operand
    ///
    /// # Errors
    /// Any resolution error.
    fn transform_field(&self, field: &FieldRef, cx: &TransformContext<'_>) -> Result<FieldRef> {
        field.resolve(cx.search())
    }

    /// Maps a method operand
    ///
    /// # Errors
    /// Any resolution error.
    fn transform_method(&self, method: &MethodRef, cx: &TransformContext<'_>) -> Result<MethodRef> {
        method.resolve(cx.search())
    }

    /// The definition a raw token operand stands for, if the transformer knows its scope
    fn lookup(&self, _token: Token) -> Option<Definition> {
        None
    }

    /// Maps a raw token whose kind is only known after lookup (`ldtoken`).
    ///
    /// The token is looked up first, then dispatched by the kind of definition it names.
    ///
    /// # Errors
    /// [`Error::UnresolvedToken`] if the token names nothing this transformer can map.
    fn transform_token(&self, token: Token, cx: &TransformContext<'_>) -> Result<Operand> {
        match self.lookup(token) {
            Some(Definition::Type(ty)) => Ok(Operand::Type(
                self.transform_type(&TypeRef::from_def(&ty), cx)?,
            )),
            Some(Definition::Field(field)) => Ok(Operand::Field(
                self.transform_field(&FieldRef::from_def(&field), cx)?,
            )),
            Some(Definition::Method(method)) => Ok(Operand::Method(
                self.transform_method(&MethodRef::from_def(&method), cx)?,
            )),
            Some(other) => Err(Error::UnresolvedToken(format!(
                "token {token} names {} {}, which is not a valid operand",
                other.kind(),
                other.full_name()
            ))),
            None => Err(Error::UnresolvedToken(format!(
                "token {token} does not name a type, field or method"
            ))),
        }
    }
}

/// Resolves every reference through the search context.
///
/// Calls to one of the registered base dependencies are redirected to the hidden method holding
/// the original body of the method being rewritten. Raw tokens are looked up in `token_scope`.
#[derive(Debug, Clone, Default)]
pub struct DefaultTokenTransformer {
    base_dependencies: Vec<MethodRef>,
    token_scope: Option<ModuleDefRc>,
}

impl DefaultTokenTransformer {
    /// Creates a transformer without base dependencies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `method` as standing for the original body of the rewritten method
    #[must_use]
    pub fn with_base_dependency(mut self, method: MethodRef) -> Self {
        self.base_dependencies.push(method);
        self
    }

    /// Looks raw tokens up in `module`
    #[must_use]
    pub fn with_token_scope(mut self, module: ModuleDefRc) -> Self {
        self.token_scope = Some(module);
        self
    }

    fn is_base_dependency(&self, method: &MethodRef) -> bool {
        self.base_dependencies
            .iter()
            .any(|base| SigComparer::STRICT.method_refs_equal(base, method))
    }
}

impl TokenTransformer for DefaultTokenTransformer {
    fn transform_method(&self, method: &MethodRef, cx: &TransformContext<'_>) -> Result<MethodRef> {
        if let MethodRef::Spec(spec) = method {
            if self.is_base_dependency(&spec.method) {
                return Ok(MethodRef::Spec(Arc::new(MethodSpec {
                    method: MethodRef::from_def(&cx.base_method()?),
                    args: spec
                        .args
                        .iter()
                        .map(|arg| self.transform_signature(arg, cx))
                        .collect::<Result<_>>()?,
                })));
            }
        } else if self.is_base_dependency(method) {
            return Ok(MethodRef::from_def(&cx.base_method()?));
        }

        method.resolve(cx.search())
    }

    fn lookup(&self, token: Token) -> Option<Definition> {
        self.token_scope
            .as_ref()
            .and_then(|module| module.lookup(token))
    }
}

/// The method a body is being imported into.
pub struct TransformContext<'a> {
    search: &'a dyn SearchContext,
    method: MethodDefRc,
    original_body: Option<Arc<MethodBody>>,
    hidden_suffix: &'a str,
    hidden: OnceLock<MethodDefRc>,
}

impl<'a> TransformContext<'a> {
    /// Creates a context for rewriting `method`.
    ///
    /// The current body of `method` is captured as the original body.
    #[must_use]
    pub fn new(search: &'a dyn SearchContext, method: MethodDefRc, hidden_suffix: &'a str) -> Self {
        let original_body = method.body();
        TransformContext {
            search,
            method,
            original_body,
            hidden_suffix,
            hidden: OnceLock::new(),
        }
    }

    /// The search context references resolve through
    pub fn search(&self) -> &'a dyn SearchContext {
        self.search
    }

    /// The method being rewritten
    pub fn method(&self) -> &MethodDefRc {
        &self.method
    }

    /// The hidden base method, if one was synthesized
    pub fn hidden_method(&self) -> Option<&MethodDefRc> {
        self.hidden.get()
    }

    /// Returns the hidden method holding the original body, creating it on first use.
    ///
    /// The method is added to the declaring type under the first unused name of the form
    /// `{name}{suffix}{n}`, counting from 0. It is compiler-controlled, static if the rewritten
    /// method is, and has the same signature.
    ///
    /// # Errors
    /// [`Error::UnresolvedToken`] if the rewritten method is not attached to a type.
    pub fn base_method(&self) -> Result<MethodDefRc> {
        if let Some(hidden) = self.hidden.get() {
            return Ok(hidden.clone());
        }

        let declaring = self.method.declaring_type().ok_or_else(|| {
            Error::UnresolvedToken(format!(
                "{} is not attached to a type",
                self.method.full_name()
            ))
        })?;

        let base_name = format!("{}{}", self.method.name, self.hidden_suffix);
        let flags = MethodAttributes::COMPILER_CONTROLLED
            | (self.method.attributes() & MethodAttributes::STATIC);

        let hidden = declaring.methods.insert_with(|methods| {
            let name = (0u64..)
                .map(|index| format!("{base_name}{index}"))
                .find(|candidate| !methods.iter().any(|m| m.name == *candidate))
                .ok_or_else(|| Error::Error(format!("no unused method name for {base_name}")))?;

            let hidden = Arc::new(MethodDef::new(name, flags, self.method.signature.clone()));
            declaring.adopt_method(&hidden);
            Ok(hidden)
        })?;
        hidden.set_body(self.original_body.clone());

        log::debug!(
            "synthesized {} with the original body of {}",
            hidden.full_name(),
            self.method.full_name()
        );
        let _ = self.hidden.set(hidden.clone());
        Ok(hidden)
    }

    pub(crate) fn into_hidden(self) -> Option<MethodDefRc> {
        self.hidden.into_inner()
    }
}

impl std::fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("method", &self.method.full_name())
            .field("hidden", &self.hidden.get().map(|m| m.name.clone()))
            .finish_non_exhaustive()
    }
}
