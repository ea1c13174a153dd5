use std::{collections::HashMap, sync::Arc};

use crate::{
    importer::{
        manifest::split_name, Intent, ModuleTokenTransformer, PatchManifest, SignatureImporter,
    },
    metadata::{
        members::{EventDefRc, FieldDefRc, PropertyDefRc},
        method::MethodDefRc,
        module::ModuleDefRc,
        token::Token,
        typesystem::TypeDefRc,
    },
    modification::{
        EventModificationRc, FieldModificationRc, MethodModificationRc, ModificationKind,
        ModuleModificationRc, PropertyModificationRc, TransplantBody, TypeModificationRc,
    },
    patch::StandardPatch,
    transform::TokenTransformer,
    Error, Result,
};

struct Imported<D, M> {
    def: D,
    intent: Intent,
    modification: M,
}

/// Builds a [`StandardPatch`] from a patch module and its manifest.
///
/// The import runs in three passes so that every reference a declaration can contain is
/// already bound when it is imported:
///
/// 1. Types, depth first with an explicit stack, nested types after their declaring type
/// 2. Fields, methods, properties and events with their imported signatures
/// 3. Attributes, interfaces, generic parameters, overrides, accessors and bodies
///
/// # Examples
///
/// ```rust
/// use codesurgeon::importer::{Declaration, Intent, PatchImporter, PatchManifest};
/// use codesurgeon::metadata::{attributes::TypeAttributes, module::ModuleDef, typesystem::TypeDef};
/// use codesurgeon::Patch;
///
/// let module = ModuleDef::new("Patch");
/// let ty = module.add_type(TypeDef::new("P", "ProgramPatch", TypeAttributes::PUBLIC));
/// let manifest = PatchManifest::new()
///     .require("Target", false)
///     .declare(ty.token(), Declaration::new(Intent::Mixin).named("N.Program"));
///
/// let patch = PatchImporter::import(&module, &manifest)?;
/// assert_eq!(patch.name(), "Patch");
/// let target = &patch.modules()[0];
/// assert!(target.find_type("N", "Program").is_some());
/// # Ok::<(), codesurgeon::Error>(())
/// ```
pub struct PatchImporter<'a> {
    module: &'a ModuleDefRc,
    manifest: &'a PatchManifest,
    signatures: Arc<SignatureImporter>,
    transformer: Arc<dyn TokenTransformer>,
    patch: StandardPatch,
    targets: HashMap<String, ModuleModificationRc>,
    types: Vec<Imported<TypeDefRc, TypeModificationRc>>,
    type_index: HashMap<Token, TypeModificationRc>,
    fields: Vec<Imported<FieldDefRc, FieldModificationRc>>,
    methods: Vec<Imported<MethodDefRc, MethodModificationRc>>,
    method_index: HashMap<Token, MethodModificationRc>,
    properties: Vec<Imported<PropertyDefRc, PropertyModificationRc>>,
    events: Vec<Imported<EventDefRc, EventModificationRc>>,
}

impl<'a> PatchImporter<'a> {
    /// Imports `module` as declared by `manifest`.
    ///
    /// # Errors
    /// [`Error::Conflict`] for contradicting declarations, [`Error::UnresolvedToken`] for
    /// declarations referencing undeclared patch definitions, [`Error::Error`] for types whose
    /// target module is unknown.
    pub fn import(module: &'a ModuleDefRc, manifest: &'a PatchManifest) -> Result<StandardPatch> {
        let signatures = Arc::new(SignatureImporter::new(module.clone()));
        let transformer: Arc<dyn TokenTransformer> = Arc::new(ModuleTokenTransformer::new(
            signatures.clone(),
            manifest.base_dependencies().clone(),
        ));
        let name = manifest.name.clone().unwrap_or_else(|| module.name.clone());

        let mut importer = PatchImporter {
            module,
            manifest,
            signatures,
            transformer,
            patch: StandardPatch::new(name),
            targets: HashMap::new(),
            types: Vec::new(),
            type_index: HashMap::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            method_index: HashMap::new(),
            properties: Vec::new(),
            events: Vec::new(),
        };

        for (name, read_only) in &manifest.required {
            let target = importer
                .patch
                .module(name.clone(), ModificationKind::FailIfMissing, *read_only)?;
            importer.targets.insert(name.clone(), target);
        }

        importer.declare_types()?;
        importer.declare_members()?;
        importer.populate()?;

        log::debug!(
            "imported {} types and {} methods from {}",
            importer.types.len(),
            importer.methods.len(),
            module.name
        );
        Ok(importer.patch)
    }

    fn intent(&self, token: Token, declaring: Option<Intent>) -> Option<Intent> {
        self.manifest
            .declaration(token)
            .map(|declaration| declaration.intent)
            .or_else(|| (declaring == Some(Intent::Generated)).then_some(Intent::Generated))
    }

    fn target_name(&self, token: Token, own_name: &str) -> String {
        self.manifest
            .declaration(token)
            .and_then(|declaration| declaration.target_name.clone())
            .unwrap_or_else(|| own_name.to_string())
    }

    fn target_module(&self, def: &TypeDefRc) -> Result<ModuleModificationRc> {
        let declared = self
            .manifest
            .declaration(def.token())
            .and_then(|declaration| declaration.target_module.as_deref());

        let name = match declared {
            Some(name) => name,
            None if self.manifest.required.len() == 1 => self.manifest.required[0].0.as_str(),
            None => {
                return Err(Error::Error(format!(
                    "{} does not name its target module",
                    def.full_name()
                )))
            }
        };

        self.targets.get(name).cloned().ok_or_else(|| {
            Error::Error(format!(
                "{} targets module {name}, which the patch does not require",
                def.full_name()
            ))
        })
    }

    fn declare_types(&mut self) -> Result<()> {
        let mut stack: Vec<(TypeDefRc, Option<Intent>)> =
            self.module.types.iter().map(|ty| (ty.clone(), None)).collect();
        stack.reverse();

        while let Some((def, declaring)) = stack.pop() {
            let intent = self.intent(def.token(), declaring);
            if let Some(intent) = intent {
                let modification = self.declare_type(&def, intent)?;
                self.signatures.bind_type(def.token(), &modification);
                self.type_index.insert(def.token(), modification.clone());
                self.types.push(Imported {
                    def: def.clone(),
                    intent,
                    modification,
                });
            }

            let nested: Vec<TypeDefRc> = def.nested_types.iter().cloned().collect();
            stack.extend(nested.into_iter().rev().map(|ty| (ty, intent)));
        }
        Ok(())
    }

    fn declare_type(&self, def: &TypeDefRc, intent: Intent) -> Result<TypeModificationRc> {
        match def.declaring_type() {
            Some(declaring) => {
                let parent = self.type_index.get(&declaring.token()).ok_or_else(|| {
                    Error::UnresolvedToken(format!(
                        "{} declares {} but declares no intent itself",
                        declaring.full_name(),
                        def.name
                    ))
                })?;
                parent.nested_type(self.target_name(def.token(), &def.name), intent.kind())
            }
            None => {
                let full_name = self.target_name(def.token(), &def.full_name());
                let (namespace, name) = split_name(&full_name);
                self.target_module(def)?
                    .declare_type(namespace, name, intent.kind(), false)
            }
        }
    }

    fn declare_members(&mut self) -> Result<()> {
        let types: Vec<(TypeDefRc, Intent, TypeModificationRc)> = self
            .types
            .iter()
            .map(|t| (t.def.clone(), t.intent, t.modification.clone()))
            .collect();

        for (def, declaring, ty) in types {
            for field in def.fields.iter() {
                let Some(intent) = self.intent(field.token(), Some(declaring)) else {
                    continue;
                };
                let signature = self.signatures.import_field_signature(&field.signature)?;
                let modification = ty.field(
                    self.target_name(field.token(), &field.name),
                    signature,
                    intent.kind(),
                )?;
                self.signatures.bind_field(field.token(), &modification);
                self.fields.push(Imported {
                    def: field.clone(),
                    intent,
                    modification,
                });
            }

            for method in def.methods.iter() {
                let Some(intent) = self.intent(method.token(), Some(declaring)) else {
                    continue;
                };
                let signature = self.signatures.import_method_signature(&method.signature)?;
                let modification = ty.method(
                    self.target_name(method.token(), &method.name),
                    signature,
                    intent.kind(),
                )?;
                self.signatures.bind_method(method.token(), &modification);
                self.method_index.insert(method.token(), modification.clone());
                self.methods.push(Imported {
                    def: method.clone(),
                    intent,
                    modification,
                });
            }

            for property in def.properties.iter() {
                let Some(intent) = self.intent(property.token(), Some(declaring)) else {
                    continue;
                };
                let signature = self
                    .signatures
                    .import_property_signature(&property.signature)?;
                let modification = ty.property(
                    self.target_name(property.token(), &property.name),
                    signature,
                    intent.kind(),
                )?;
                self.properties.push(Imported {
                    def: property.clone(),
                    intent,
                    modification,
                });
            }

            for event in def.events.iter() {
                let Some(intent) = self.intent(event.token(), Some(declaring)) else {
                    continue;
                };
                let event_type = self.signatures.import_type(&event.event_type)?;
                let modification = ty.event(
                    self.target_name(event.token(), &event.name),
                    event_type,
                    intent.kind(),
                )?;
                self.events.push(Imported {
                    def: event.clone(),
                    intent,
                    modification,
                });
            }
        }
        Ok(())
    }

    fn populate(&self) -> Result<()> {
        for ty in &self.types {
            ty.modification.set_attributes(ty.def.attributes());
            for interface in ty.def.interfaces() {
                ty.modification
                    .add_interface(self.signatures.import_type(&interface)?);
            }
            let params = ty.def.generic_params();
            if !params.is_empty() {
                ty.modification.set_generic_params(
                    params
                        .iter()
                        .map(|param| self.signatures.import_generic_param(param))
                        .collect::<Result<_>>()?,
                );
            }
        }

        for field in &self.fields {
            field.modification.set_attributes(field.def.attributes());
        }

        for method in &self.methods {
            method.modification.set_attributes(method.def.attributes());
            for method_override in method.def.overrides() {
                method
                    .modification
                    .add_override(self.signatures.import_override(&method_override)?);
            }
            if let (true, Some(body)) = (method.intent.transplants_body(), method.def.body()) {
                method
                    .modification
                    .set_body(TransplantBody::new(body, self.transformer.clone()));
            }
        }

        for property in &self.properties {
            property.modification.set_attributes(property.def.attributes());
            for (role, accessor) in property.def.accessors.all() {
                if let Some(declared) = self.method_index.get(&accessor.token()) {
                    property.modification.add_accessor(role, declared.clone());
                }
            }
        }

        for event in &self.events {
            event.modification.set_attributes(event.def.attributes());
            for (role, accessor) in event.def.accessors.all() {
                if let Some(declared) = self.method_index.get(&accessor.token()) {
                    event.modification.add_accessor(role, declared.clone());
                }
            }
        }
        Ok(())
    }
}
