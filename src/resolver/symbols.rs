//! Per-kind lookup, creation and reconciliation of definitions.
//!
//! [`locate`] finds or creates the definition of a modification under its already resolved
//! parent and applies the existence policy. [`reconcile`] then brings an existing definition in
//! line with the declaration. While reconciling, the session hands the located definition back to
//! nested requests from the same thread, so a declaration may refer to itself (an override naming
//! its own method, a base type naming the type) without recursing.

use std::sync::Arc;

use crate::{
    metadata::{
        attributes::{
            EventAttributes, FieldAttributes, MemberAttributes, MethodAttributes,
            PropertyAttributes, TypeAttributes,
        },
        deflist::DefList,
        members::{EventDef, EventDefRc, FieldDef, FieldDefRc, PropertyDef, PropertyDefRc},
        method::{MethodDef, MethodDefRc},
        module::ModuleDef,
        signatures::SigComparer,
        typesystem::{TypeDef, TypeDefRc},
        Definition,
    },
    modification::{
        AnyModification, EventModificationRc, FieldModificationRc, MethodModificationRc,
        Modification, ModificationKind, ModuleModificationRc, PropertyModificationRc,
        TypeModificationRc,
    },
    resolver::{merge::merge_attributes, ResolutionSession, Resolve, SearchContext},
    Error, Result,
};

pub(crate) fn locate(
    session: &ResolutionSession,
    modification: &AnyModification,
) -> Result<(Definition, bool)> {
    match modification {
        AnyModification::Module(m) => locate_module(session, m),
        AnyModification::Type(m) => {
            locate_type(session, m).map(|(ty, created)| (Definition::Type(ty), created))
        }
        AnyModification::Field(m) => {
            locate_field(session, m).map(|(field, created)| (Definition::Field(field), created))
        }
        AnyModification::Method(m) => locate_method(session, m)
            .map(|(method, created)| (Definition::Method(method), created)),
        AnyModification::Property(m) => locate_property(session, m)
            .map(|(property, created)| (Definition::Property(property), created)),
        AnyModification::Event(m) => {
            locate_event(session, m).map(|(event, created)| (Definition::Event(event), created))
        }
    }
}

pub(crate) fn reconcile(
    session: &ResolutionSession,
    modification: &AnyModification,
    definition: &Definition,
    created: bool,
) -> Result<()> {
    match (modification, definition) {
        (AnyModification::Type(m), Definition::Type(ty)) => reconcile_type(session, m, ty, created),
        (AnyModification::Field(m), Definition::Field(field)) => {
            reconcile_field(session, m, field, created)
        }
        (AnyModification::Method(m), Definition::Method(method)) => {
            reconcile_method(session, m, method, created)
        }
        (AnyModification::Property(m), Definition::Property(property)) => {
            reconcile_property(session, m, property, created)
        }
        (AnyModification::Event(m), Definition::Event(event)) => {
            reconcile_event(session, m, event, created)
        }
        _ => Ok(()),
    }
}

fn detached(node: &dyn Modification) -> Error {
    Error::UnresolvedToken(format!(
        "{} {} is detached from its declaring scope",
        node.symbol_kind(),
        node.full_name()
    ))
}

fn incompatible(node: &dyn Modification, message: &str) -> Error {
    symbol_error!(
        IncompatibleSignature,
        node.symbol_kind(),
        node.full_name(),
        "{}",
        message
    )
}

/// Applies the existence policy to `list` and creates the definition if needed.
fn find_or_create<T, P, C>(
    node: &dyn Modification,
    list: &DefList<T>,
    mut matches: P,
    create: C,
) -> Result<(Arc<T>, bool)>
where
    P: FnMut(&T) -> bool,
    C: FnOnce() -> Result<Arc<T>>,
{
    let existing = list.find(&mut matches);
    if !node.check_existence(existing.is_some())? {
        if let Some(existing) = existing {
            return Ok((existing, false));
        }
    }

    node.begin_modify()?;
    let (definition, created) = list.find_or_insert(matches, create)?;
    if !created && node.kind() == ModificationKind::FailIfPresent {
        return Err(symbol_error!(
            AlreadyExists,
            node.symbol_kind(),
            node.full_name()
        ));
    }

    if created {
        log::debug!("created {} {}", node.symbol_kind(), node.full_name());
    }
    Ok((definition, created))
}

/// Rewrites the flags of an existing definition if the declaration requires it.
fn reconcile_attributes<F, A>(
    node: &dyn Modification,
    existing: F,
    declared: Option<F>,
    nested: bool,
    apply: A,
) -> Result<()>
where
    F: MemberAttributes,
    A: FnOnce(F),
{
    let Some(declared) = declared else {
        return Ok(());
    };

    let merged = merge_attributes(existing, declared, nested, node.kind());
    if merged == existing {
        return Ok(());
    }

    node.begin_modify()?;
    log::debug!(
        "{} {}: attributes {:?} -> {:?}",
        node.symbol_kind(),
        node.full_name(),
        existing,
        merged
    );
    apply(merged);
    Ok(())
}

fn locate_module(
    session: &ResolutionSession,
    m: &ModuleModificationRc,
) -> Result<(Definition, bool)> {
    let existing = session.try_module(&m.name)?;
    let create = m.check_existence(existing.is_some())?;
    if let (Some(module), false) = (&existing, create) {
        return Ok((Definition::Module(module.clone()), false));
    }

    m.begin_modify()?;
    let (module, created) = session.add_module(ModuleDef::new(m.name.clone()));
    if !created && m.kind() == ModificationKind::FailIfPresent {
        return Err(symbol_error!(AlreadyExists, m.symbol_kind(), m.name));
    }

    if created {
        log::debug!("created module {}", m.name);
    }
    Ok((Definition::Module(module), created))
}

fn locate_type(
    session: &ResolutionSession,
    m: &TypeModificationRc,
) -> Result<(TypeDefRc, bool)> {
    let name = m.name.clone();

    if let Some(declaring) = m.declaring_type() {
        let declaring = session.resolve_type(&declaring)?;
        let flags = m.attributes().unwrap_or(TypeAttributes::NESTED_PRIVATE);
        return find_or_create(
            m.as_ref(),
            &declaring.nested_types,
            |t| t.name == name,
            || {
                let ty = Arc::new(TypeDef::new("", name.clone(), flags));
                declaring.adopt_nested_type(&ty);
                Ok(ty)
            },
        );
    }

    let module = m.module().ok_or_else(|| detached(m.as_ref()))?;
    let module = session.resolve_module(&module)?;
    let namespace = m.namespace.clone().unwrap_or_default();
    let flags = m.attributes().unwrap_or(TypeAttributes::empty());
    find_or_create(
        m.as_ref(),
        &module.types,
        |t| t.namespace == namespace && t.name == name,
        || {
            let ty = Arc::new(TypeDef::new(namespace.clone(), name.clone(), flags));
            module.adopt_type(&ty);
            Ok(ty)
        },
    )
}

fn reconcile_type(
    session: &ResolutionSession,
    m: &TypeModificationRc,
    ty: &TypeDefRc,
    created: bool,
) -> Result<()> {
    let comparer = SigComparer::declared();

    if !created {
        reconcile_attributes(
            m.as_ref(),
            ty.attributes(),
            m.attributes(),
            ty.is_nested(),
            |flags| ty.set_attributes(flags),
        )?;
    }

    if let Some(declared) = m.base_type() {
        let declared = declared.resolve(session)?;
        match ty.base_type() {
            Some(existing) if comparer.type_refs_equal(&existing, &declared) => {}
            _ if created => ty.set_base_type(Some(declared)),
            _ => {
                return Err(incompatible(
                    m.as_ref(),
                    "existing type has an incompatible base type",
                ))
            }
        }
    }

    for interface in m.interfaces() {
        let interface = interface.resolve(session)?;
        if ty
            .interfaces()
            .iter()
            .any(|existing| comparer.type_refs_equal(existing, &interface))
        {
            continue;
        }

        m.begin_modify()?;
        log::debug!("{}: added interface {}", ty.full_name(), interface.full_name());
        ty.add_interface(interface);
    }

    if let Some(params) = m.generic_params() {
        let params = params
            .iter()
            .map(|param| param.resolve(session))
            .collect::<Result<Vec<_>>>()?;

        if created {
            ty.set_generic_params(params);
        } else if ty.generic_params().len() != params.len() {
            return Err(incompatible(
                m.as_ref(),
                &format!(
                    "existing type has {} generic parameters but {} were declared",
                    ty.generic_params().len(),
                    params.len()
                ),
            ));
        }
    }

    Ok(())
}

fn locate_field(
    session: &ResolutionSession,
    m: &FieldModificationRc,
) -> Result<(FieldDefRc, bool)> {
    let declaring = m.declaring_type().ok_or_else(|| detached(m.as_ref()))?;
    let ty = session.resolve_type(&declaring)?;

    let signature = m.signature.resolve(session)?;
    let flags = m.attributes().unwrap_or(FieldAttributes::PRIVATE);
    find_or_create(
        m.as_ref(),
        &ty.fields,
        |f| f.name == m.name,
        || {
            let field = Arc::new(FieldDef::new(m.name.clone(), flags, signature));
            ty.adopt_field(&field);
            Ok(field)
        },
    )
}

fn reconcile_field(
    session: &ResolutionSession,
    m: &FieldModificationRc,
    field: &FieldDefRc,
    created: bool,
) -> Result<()> {
    if created {
        return Ok(());
    }

    let declared = m.signature.resolve(session)?;
    if !SigComparer::declared().field_sigs_equal(&field.signature, &declared) {
        return Err(incompatible(
            m.as_ref(),
            "existing field has an incompatible signature",
        ));
    }

    reconcile_attributes(
        m.as_ref(),
        field.attributes(),
        m.attributes(),
        false,
        |flags| field.set_attributes(flags),
    )
}

fn locate_method(
    session: &ResolutionSession,
    m: &MethodModificationRc,
) -> Result<(MethodDefRc, bool)> {
    let declaring = m.declaring_type().ok_or_else(|| detached(m.as_ref()))?;
    let ty = session.resolve_type(&declaring)?;

    let signature = m.signature.resolve(session)?;
    let comparer = SigComparer::overload();
    let flags = m.attributes().unwrap_or_else(|| {
        if signature.has_this() {
            MethodAttributes::PRIVATE | MethodAttributes::HIDE_BY_SIG
        } else {
            MethodAttributes::PRIVATE | MethodAttributes::HIDE_BY_SIG | MethodAttributes::STATIC
        }
    });

    find_or_create(
        m.as_ref(),
        &ty.methods,
        |existing| {
            existing.name == m.name
                && comparer.is_comparable(existing.attributes())
                && comparer.method_sigs_equal(&existing.signature, &signature)
        },
        || {
            let method = Arc::new(MethodDef::new(m.name.clone(), flags, signature.clone()));
            ty.adopt_method(&method);
            Ok(method)
        },
    )
}

fn reconcile_method(
    session: &ResolutionSession,
    m: &MethodModificationRc,
    method: &MethodDefRc,
    created: bool,
) -> Result<()> {
    if !created {
        let declared = m.signature.resolve(session)?;
        if !SigComparer::declared().types_equal(&method.signature.return_type, &declared.return_type)
        {
            return Err(incompatible(
                m.as_ref(),
                "existing method has an incompatible return type",
            ));
        }

        reconcile_attributes(
            m.as_ref(),
            method.attributes(),
            m.attributes(),
            false,
            |flags| method.set_attributes(flags),
        )?;
    }

    for declared in m.overrides() {
        let declared = declared.resolve(session)?;
        let present = method.overrides().iter().any(|existing| {
            SigComparer::STRICT.method_refs_equal(&existing.body, &declared.body)
                && SigComparer::STRICT.method_refs_equal(&existing.declaration, &declared.declaration)
        });
        if present {
            continue;
        }

        m.begin_modify()?;
        log::debug!(
            "{}: added override of {}",
            method.full_name(),
            declared.declaration.full_name()
        );
        method.add_override(declared);
    }

    Ok(())
}

fn locate_property(
    session: &ResolutionSession,
    m: &PropertyModificationRc,
) -> Result<(PropertyDefRc, bool)> {
    let declaring = m.declaring_type().ok_or_else(|| detached(m.as_ref()))?;
    let ty = session.resolve_type(&declaring)?;

    let signature = m.signature.resolve(session)?;
    let flags = m.attributes().unwrap_or(PropertyAttributes::empty());
    find_or_create(
        m.as_ref(),
        &ty.properties,
        |p| p.name == m.name,
        || {
            let property = Arc::new(PropertyDef::new(m.name.clone(), flags, signature));
            ty.adopt_property(&property);
            Ok(property)
        },
    )
}

fn reconcile_property(
    session: &ResolutionSession,
    m: &PropertyModificationRc,
    property: &PropertyDefRc,
    created: bool,
) -> Result<()> {
    if !created {
        let declared = m.signature.resolve(session)?;
        if !SigComparer::declared().property_sigs_equal(&property.signature, &declared) {
            return Err(incompatible(
                m.as_ref(),
                "existing property has an incompatible signature",
            ));
        }

        reconcile_attributes(
            m.as_ref(),
            property.attributes(),
            m.attributes(),
            false,
            |flags| property.set_attributes(flags),
        )?;
    }

    for (role, accessor) in m.accessors() {
        let method = session.resolve_method(&accessor)?;
        if property.accessors.contains(role, &method) {
            continue;
        }

        m.begin_modify()?;
        log::debug!("{}: linked {role} {}", property.full_name(), method.full_name());
        property.accessors.link(role, &method);
    }

    Ok(())
}

fn locate_event(
    session: &ResolutionSession,
    m: &EventModificationRc,
) -> Result<(EventDefRc, bool)> {
    let declaring = m.declaring_type().ok_or_else(|| detached(m.as_ref()))?;
    let ty = session.resolve_type(&declaring)?;

    let event_type = m.event_type.resolve(session)?;
    let flags = m.attributes().unwrap_or(EventAttributes::empty());
    find_or_create(
        m.as_ref(),
        &ty.events,
        |e| e.name == m.name,
        || {
            let event = Arc::new(EventDef::new(m.name.clone(), flags, event_type));
            ty.adopt_event(&event);
            Ok(event)
        },
    )
}

fn reconcile_event(
    session: &ResolutionSession,
    m: &EventModificationRc,
    event: &EventDefRc,
    created: bool,
) -> Result<()> {
    if !created {
        let declared = m.event_type.resolve(session)?;
        if !SigComparer::declared().type_refs_equal(&event.event_type, &declared) {
            return Err(incompatible(
                m.as_ref(),
                "existing event has an incompatible type",
            ));
        }

        reconcile_attributes(
            m.as_ref(),
            event.attributes(),
            m.attributes(),
            false,
            |flags| event.set_attributes(flags),
        )?;
    }

    for (role, accessor) in m.accessors() {
        let method = session.resolve_method(&accessor)?;
        if event.accessors.contains(role, &method) {
            continue;
        }

        m.begin_modify()?;
        log::debug!("{}: linked {role} {}", event.full_name(), method.full_name());
        event.accessors.link(role, &method);
    }

    Ok(())
}
