//! # codesurgeon Prelude
//!
//! This module re-exports the types needed to describe, import and install patches. Import it to
//! get quick access to the common surface without spelling out every module path.
//!
//! ```rust
//! use codesurgeon::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all codesurgeon operations
pub use crate::Error;

/// The result type used throughout codesurgeon
pub use crate::Result;

// ================================================================================================
// Definition Model
// ================================================================================================

/// Modules and tokens
pub use crate::metadata::{
    module::{ModuleDef, ModuleDefRc},
    token::{TableId, Token},
    Definition,
};

/// Types, members and references
pub use crate::metadata::{
    members::{AccessorRole, EventDef, FieldDef, PropertyDef},
    method::{ExceptionHandler, MethodBody, MethodDef, MethodOverride},
    typesystem::{FieldRef, GenericParameter, MethodRef, TypeDef, TypeRef},
};

/// Attribute flag sets
pub use crate::metadata::attributes::{
    EventAttributes, FieldAttributes, MethodAttributes, PropertyAttributes, TypeAttributes,
};

/// Signatures
pub use crate::metadata::signatures::{
    FieldSignature, MethodSignature, Primitive, PropertySignature, SigComparer, TypeSignature,
};

/// Instructions
pub use crate::assembly::{opcodes, Instruction, Operand};

// ================================================================================================
// Modifications and Resolution
// ================================================================================================

/// The modification tree
pub use crate::modification::{
    AnyModification, Modification, ModificationKind, ModuleModification, SymbolKind,
    TransplantBody, TypeModification,
};

/// Resolution
pub use crate::resolver::{ResolutionSession, Resolve, SearchContext};

/// Body transplantation
pub use crate::transform::{DefaultTokenTransformer, TokenTransformer, TransformContext};

// ================================================================================================
// Patches and Installation
// ================================================================================================

/// Patches and the installer
pub use crate::patch::{InstallReport, InstallerConfig, Patch, PatchInstaller, StandardPatch};

/// Importing patches from modules
pub use crate::importer::{Declaration, Intent, PatchImporter, PatchManifest};

/// Module and stream sources
pub use crate::io::{
    FileStreamSource, MemoryModuleSource, MemoryStreamSource, ModuleCodec, ModuleSource,
    ReadOnlyStreamSource, StreamModuleSource, StreamSource, WritableStreamSource,
};
