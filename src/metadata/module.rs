//! Modules: the root of a loaded object graph.
//!
//! A [`ModuleDef`] owns its top-level types and keeps a token map from every attached definition
//! back to the definition, so raw tokens found in instruction streams can be resolved.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::metadata::{
    deflist::DefList,
    token::{TableId, Token},
    typesystem::{TypeDef, TypeDefRc},
    Definition,
};

/// Reference to a `ModuleDef`
pub type ModuleDefRc = Arc<ModuleDef>;

/// A loaded module.
pub struct ModuleDef {
    /// Module name, as used by module sources
    pub name: String,
    /// Top-level types
    pub types: DefList<TypeDef>,
    rows: DashMap<TableId, u32>,
    tokens: SkipMap<Token, Definition>,
}

impl ModuleDef {
    /// Creates an empty module
    #[must_use]
    pub fn new(name: impl Into<String>) -> ModuleDefRc {
        Arc::new(ModuleDef {
            name: name.into(),
            types: DefList::new(),
            rows: DashMap::new(),
            tokens: SkipMap::new(),
        })
    }

    /// Attaches `ty` as a top-level type
    pub fn add_type(self: &Arc<Self>, ty: TypeDef) -> TypeDefRc {
        let ty = Arc::new(ty);
        self.adopt_type(&ty);
        self.types.push(ty)
    }

    /// Links `ty` and everything it already owns to this module and assigns tokens, without
    /// inserting it into [`ModuleDef::types`].
    pub fn adopt_type(self: &Arc<Self>, ty: &TypeDefRc) {
        let token = self.register(TableId::TypeDef, Definition::Type(ty.clone()));
        ty.attach_module(self, token);

        for field in ty.fields.iter() {
            field.assign_token(self.register(TableId::Field, Definition::Field(field.clone())));
        }
        for method in ty.methods.iter() {
            method.assign_token(
                self.register(TableId::MethodDef, Definition::Method(method.clone())),
            );
        }
        for property in ty.properties.iter() {
            property.assign_token(
                self.register(TableId::Property, Definition::Property(property.clone())),
            );
        }
        for event in ty.events.iter() {
            event.assign_token(self.register(TableId::Event, Definition::Event(event.clone())));
        }
        for nested in ty.nested_types.iter() {
            self.adopt_type(nested);
        }
    }

    /// Finds a top-level type
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<TypeDefRc> {
        self.types
            .find(|t| t.namespace == namespace && t.name == name)
    }

    /// Every type of the module, nested types after their declaring type
    pub fn all_types(&self) -> Vec<TypeDefRc> {
        let mut result = Vec::new();
        let mut stack: Vec<TypeDefRc> = self.types.iter().cloned().collect();
        stack.reverse();
        while let Some(ty) = stack.pop() {
            let mut nested: Vec<TypeDefRc> = ty.nested_types.iter().cloned().collect();
            nested.reverse();
            stack.extend(nested);
            result.push(ty);
        }
        result
    }

    /// The definition a token was assigned to
    pub fn lookup(&self, token: Token) -> Option<Definition> {
        self.tokens.get(&token).map(|entry| entry.value().clone())
    }

    /// Number of definitions with tokens
    pub fn definition_count(&self) -> usize {
        self.tokens.len()
    }

    /// Allocates the next row of `table`
    pub fn allocate(&self, table: TableId) -> Token {
        let mut row = self.rows.entry(table).or_insert(0);
        *row += 1;
        Token::from_parts(table, *row)
    }

    pub(crate) fn register(&self, table: TableId, definition: Definition) -> Token {
        let token = self.allocate(table);
        self.tokens.insert(token, definition);
        token
    }
}

impl std::fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}
