use std::collections::{HashMap, HashSet};

use strum::Display;

use crate::{metadata::token::Token, modification::ModificationKind};

/// What a patch definition means for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Intent {
    /// Must exist in the target; only referenced
    Dependency,
    /// Must exist in the target; its body is replaced
    Mixin,
    /// Must not exist in the target; it is added
    Inject,
    /// Added when absent, normalized otherwise (compiler generated helpers)
    Generated,
}

impl Intent {
    /// The existence policy this intent maps to
    #[must_use]
    pub fn kind(self) -> ModificationKind {
        match self {
            Intent::Dependency | Intent::Mixin => ModificationKind::FailIfMissing,
            Intent::Inject => ModificationKind::FailIfPresent,
            Intent::Generated => ModificationKind::CreateIfMissing,
        }
    }

    /// Returns `true` if method bodies declared with this intent are transplanted
    #[must_use]
    pub fn transplants_body(self) -> bool {
        !matches!(self, Intent::Dependency)
    }
}

/// The intent of one patch definition and where it lands in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Intent
    pub intent: Intent,
    /// Name in the target; the patch definition's own name when `None`. Top-level types use
    /// `Namespace.Name`
    pub target_name: Option<String>,
    /// Target module of a top-level type
    pub target_module: Option<String>,
}

impl Declaration {
    /// Declares `intent` under the definition's own name
    #[must_use]
    pub fn new(intent: Intent) -> Self {
        Declaration {
            intent,
            target_name: None,
            target_module: None,
        }
    }

    /// Targets `name` instead of the definition's own name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    /// Places a top-level type in `module`
    #[must_use]
    pub fn from_module(mut self, module: impl Into<String>) -> Self {
        self.target_module = Some(module.into());
        self
    }
}

/// Describes how the definitions of a patch module map onto target modules.
///
/// Declarations are keyed by the token of the patch definition. Definitions without a
/// declaration are not imported, except members of a [`Intent::Generated`] type, which inherit
/// the type's intent.
#[derive(Debug, Clone, Default)]
pub struct PatchManifest {
    /// Patch name; the patch module's name when `None`
    pub name: Option<String>,
    /// Modules the patch needs, with their read-only flag
    pub required: Vec<(String, bool)>,
    declarations: HashMap<Token, Declaration>,
    base_dependencies: HashSet<Token>,
}

impl PatchManifest {
    /// Creates an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the patch
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Requires `module`
    #[must_use]
    pub fn require(mut self, module: impl Into<String>, read_only: bool) -> Self {
        self.required.push((module.into(), read_only));
        self
    }

    /// Declares the patch definition with `token`
    #[must_use]
    pub fn declare(mut self, token: Token, declaration: Declaration) -> Self {
        self.declarations.insert(token, declaration);
        self
    }

    /// Marks the patch method with `token` as standing for the original body of the method being
    /// replaced
    #[must_use]
    pub fn base_dependency(mut self, token: Token) -> Self {
        self.base_dependencies.insert(token);
        self
    }

    /// The declaration of a patch definition
    #[must_use]
    pub fn declaration(&self, token: Token) -> Option<&Declaration> {
        self.declarations.get(&token)
    }

    /// Returns `true` if the patch method with `token` is a base dependency
    #[must_use]
    pub fn is_base_dependency(&self, token: Token) -> bool {
        self.base_dependencies.contains(&token)
    }

    /// Tokens of all base dependencies
    #[must_use]
    pub fn base_dependencies(&self) -> &HashSet<Token> {
        &self.base_dependencies
    }
}

/// Splits `Namespace.Name` at the last `.`
pub(crate) fn split_name(full_name: &str) -> (&str, &str) {
    match full_name.rfind('.') {
        Some(index) => (&full_name[..index], &full_name[index + 1..]),
        None => ("", full_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_map_to_policies() {
        assert_eq!(Intent::Dependency.kind(), ModificationKind::FailIfMissing);
        assert_eq!(Intent::Mixin.kind(), ModificationKind::FailIfMissing);
        assert_eq!(Intent::Inject.kind(), ModificationKind::FailIfPresent);
        assert_eq!(Intent::Generated.kind(), ModificationKind::CreateIfMissing);
        assert!(!Intent::Dependency.transplants_body());
        assert!(Intent::Mixin.transplants_body());
    }

    #[test]
    fn names_split_at_the_last_dot() {
        assert_eq!(split_name("A.B.C"), ("A.B", "C"));
        assert_eq!(split_name("Program"), ("", "Program"));
        assert_eq!(split_name(".Leading"), ("", "Leading"));
    }

    #[test]
    fn manifest_builder() {
        let token = Token::new(0x0200_0002);
        let manifest = PatchManifest::new()
            .named("Greeting")
            .require("Target", false)
            .declare(
                token,
                Declaration::new(Intent::Mixin)
                    .named("N.C")
                    .from_module("Target"),
            )
            .base_dependency(Token::new(0x0600_0001));

        assert_eq!(manifest.required, vec![("Target".to_string(), false)]);
        let declaration = manifest.declaration(token).unwrap();
        assert_eq!(declaration.target_name.as_deref(), Some("N.C"));
        assert!(manifest.is_base_dependency(Token::new(0x0600_0001)));
        assert!(manifest.declaration(Token::new(0x0200_0003)).is_none());
    }
}
