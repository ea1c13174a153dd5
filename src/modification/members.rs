use std::sync::{Arc, RwLock, Weak};

use crate::{
    metadata::{
        attributes::{EventAttributes, FieldAttributes, MethodAttributes, PropertyAttributes},
        members::AccessorRole,
        method::{MethodBody, MethodOverride},
        signatures::{FieldSignature, MethodSignature, PropertySignature},
        typesystem::TypeRef,
    },
    modification::{
        impl_modification, Header, ModificationKind, SymbolKind, TypeModification,
        TypeModificationRc,
    },
    transform::TokenTransformer,
};

/// Reference to a `FieldModification`
pub type FieldModificationRc = Arc<FieldModification>;
/// Reference to a `MethodModification`
pub type MethodModificationRc = Arc<MethodModification>;
/// Reference to a `PropertyModification`
pub type PropertyModificationRc = Arc<PropertyModification>;
/// Reference to an `EventModification`
pub type EventModificationRc = Arc<EventModification>;

fn qualify(declaring_type: &Weak<TypeModification>, name: &str) -> String {
    match declaring_type.upgrade() {
        Some(declaring) => format!("{}::{name}", declaring.full_name()),
        None => name.to_string(),
    }
}

/// A field a patch requires.
pub struct FieldModification {
    header: Header,
    /// Field name
    pub name: String,
    /// Declared signature
    pub signature: FieldSignature,
    attributes: RwLock<Option<FieldAttributes>>,
    declaring_type: Weak<TypeModification>,
}

impl FieldModification {
    pub(crate) fn new(
        declaring_type: &TypeModificationRc,
        name: String,
        signature: FieldSignature,
        kind: ModificationKind,
        read_only: bool,
    ) -> FieldModificationRc {
        Arc::new(FieldModification {
            header: Header::new(kind, read_only),
            name,
            signature,
            attributes: RwLock::new(None),
            declaring_type: Arc::downgrade(declaring_type),
        })
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeModificationRc> {
        self.declaring_type.upgrade()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        qualify(&self.declaring_type, &self.name)
    }

    /// Declared flags
    pub fn attributes(&self) -> Option<FieldAttributes> {
        *read_lock!(self.attributes)
    }

    /// Declares the flags
    pub fn set_attributes(&self, attributes: FieldAttributes) {
        *write_lock!(self.attributes) = Some(attributes);
    }
}

impl_modification!(FieldModification, SymbolKind::Field);

/// A method body to move into the target, with the transformer that maps its operands.
#[derive(Clone)]
pub struct TransplantBody {
    /// The body as it exists in the patch
    pub body: Arc<MethodBody>,
    /// Maps the operands of `body` into the target
    pub transformer: Arc<dyn TokenTransformer>,
}

impl TransplantBody {
    /// Creates a transplant of `body` using `transformer`
    #[must_use]
    pub fn new(body: Arc<MethodBody>, transformer: Arc<dyn TokenTransformer>) -> Self {
        TransplantBody { body, transformer }
    }
}

impl std::fmt::Debug for TransplantBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransplantBody")
            .field("instructions", &self.body.instructions.len())
            .finish_non_exhaustive()
    }
}

/// A method a patch requires, optionally with a body to transplant.
pub struct MethodModification {
    header: Header,
    /// Method name
    pub name: String,
    /// Declared signature
    pub signature: MethodSignature,
    attributes: RwLock<Option<MethodAttributes>>,
    overrides: RwLock<Vec<MethodOverride>>,
    body: RwLock<Option<TransplantBody>>,
    declaring_type: Weak<TypeModification>,
}

impl MethodModification {
    pub(crate) fn new(
        declaring_type: &TypeModificationRc,
        name: String,
        signature: MethodSignature,
        kind: ModificationKind,
        read_only: bool,
    ) -> MethodModificationRc {
        Arc::new(MethodModification {
            header: Header::new(kind, read_only),
            name,
            signature,
            attributes: RwLock::new(None),
            overrides: RwLock::new(Vec::new()),
            body: RwLock::new(None),
            declaring_type: Arc::downgrade(declaring_type),
        })
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeModificationRc> {
        self.declaring_type.upgrade()
    }

    /// `ret Type::name(params)`
    pub fn full_name(&self) -> String {
        let declaring = self
            .declaring_type
            .upgrade()
            .map(|t| t.full_name())
            .unwrap_or_default();
        self.signature.format_member(&declaring, &self.name)
    }

    /// Declared flags
    pub fn attributes(&self) -> Option<MethodAttributes> {
        *read_lock!(self.attributes)
    }

    /// Declares the flags
    pub fn set_attributes(&self, attributes: MethodAttributes) {
        *write_lock!(self.attributes) = Some(attributes);
    }

    /// Declared interface implementations
    pub fn overrides(&self) -> Vec<MethodOverride> {
        snapshot!(self.overrides)
    }

    /// Declares that this method implements an interface method
    pub fn add_override(&self, method_override: MethodOverride) {
        write_lock!(self.overrides).push(method_override);
    }

    /// The body to transplant, if any
    pub fn body(&self) -> Option<TransplantBody> {
        read_lock!(self.body).clone()
    }

    /// Sets the body to transplant into the target method
    pub fn set_body(&self, body: TransplantBody) {
        *write_lock!(self.body) = Some(body);
    }
}

impl_modification!(MethodModification, SymbolKind::Method);

/// Accessor methods declared for a property or event.
#[derive(Default)]
struct DeclaredAccessors {
    entries: RwLock<Vec<(AccessorRole, MethodModificationRc)>>,
}

impl DeclaredAccessors {
    fn add(&self, role: AccessorRole, method: MethodModificationRc) {
        let mut entries = write_lock!(self.entries);
        if !entries
            .iter()
            .any(|(r, m)| *r == role && Arc::ptr_eq(m, &method))
        {
            entries.push((role, method));
        }
    }

    fn all(&self) -> Vec<(AccessorRole, MethodModificationRc)> {
        snapshot!(self.entries)
    }
}

/// A property a patch requires.
pub struct PropertyModification {
    header: Header,
    /// Property name
    pub name: String,
    /// Declared signature
    pub signature: PropertySignature,
    attributes: RwLock<Option<PropertyAttributes>>,
    accessors: DeclaredAccessors,
    declaring_type: Weak<TypeModification>,
}

impl PropertyModification {
    pub(crate) fn new(
        declaring_type: &TypeModificationRc,
        name: String,
        signature: PropertySignature,
        kind: ModificationKind,
        read_only: bool,
    ) -> PropertyModificationRc {
        Arc::new(PropertyModification {
            header: Header::new(kind, read_only),
            name,
            signature,
            attributes: RwLock::new(None),
            accessors: DeclaredAccessors::default(),
            declaring_type: Arc::downgrade(declaring_type),
        })
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeModificationRc> {
        self.declaring_type.upgrade()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        qualify(&self.declaring_type, &self.name)
    }

    /// Declared flags
    pub fn attributes(&self) -> Option<PropertyAttributes> {
        *read_lock!(self.attributes)
    }

    /// Declares the flags
    pub fn set_attributes(&self, attributes: PropertyAttributes) {
        *write_lock!(self.attributes) = Some(attributes);
    }

    /// Declares an accessor (`Getter`, `Setter` or `Other`)
    pub fn add_accessor(&self, role: AccessorRole, method: MethodModificationRc) {
        self.accessors.add(role, method);
    }

    /// Declared accessors
    pub fn accessors(&self) -> Vec<(AccessorRole, MethodModificationRc)> {
        self.accessors.all()
    }
}

impl_modification!(PropertyModification, SymbolKind::Property);

/// An event a patch requires.
pub struct EventModification {
    header: Header,
    /// Event name
    pub name: String,
    /// Declared delegate type
    pub event_type: TypeRef,
    attributes: RwLock<Option<EventAttributes>>,
    accessors: DeclaredAccessors,
    declaring_type: Weak<TypeModification>,
}

impl EventModification {
    pub(crate) fn new(
        declaring_type: &TypeModificationRc,
        name: String,
        event_type: TypeRef,
        kind: ModificationKind,
        read_only: bool,
    ) -> EventModificationRc {
        Arc::new(EventModification {
            header: Header::new(kind, read_only),
            name,
            event_type,
            attributes: RwLock::new(None),
            accessors: DeclaredAccessors::default(),
            declaring_type: Arc::downgrade(declaring_type),
        })
    }

    /// The declaring type
    pub fn declaring_type(&self) -> Option<TypeModificationRc> {
        self.declaring_type.upgrade()
    }

    /// `Type::name`
    pub fn full_name(&self) -> String {
        qualify(&self.declaring_type, &self.name)
    }

    /// Declared flags
    pub fn attributes(&self) -> Option<EventAttributes> {
        *read_lock!(self.attributes)
    }

    /// Declares the flags
    pub fn set_attributes(&self, attributes: EventAttributes) {
        *write_lock!(self.attributes) = Some(attributes);
    }

    /// Declares an accessor (`Adder`, `Remover`, `Invoker` or `Other`)
    pub fn add_accessor(&self, role: AccessorRole, method: MethodModificationRc) {
        self.accessors.add(role, method);
    }

    /// Declared accessors
    pub fn accessors(&self) -> Vec<(AccessorRole, MethodModificationRc)> {
        self.accessors.all()
    }
}

impl_modification!(EventModification, SymbolKind::Event);
