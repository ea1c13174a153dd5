//! Where modules come from and where they go.
//!
//! The installer never touches files itself. It loads and saves modules through a
//! [`ModuleSource`]; [`StreamModuleSource`] adapts any [`StreamSource`] of named byte streams
//! and a [`ModuleCodec`] that turns bytes into a module graph and back.
//!
//! # Key Components
//!
//! - [`ModuleSource`] - Load and save modules by name
//! - [`MemoryModuleSource`] - Modules kept in memory, with save counters
//! - [`StreamModuleSource`] - Modules decoded from and encoded to named streams
//! - [`StreamSource`] - Named readable and writable byte streams
//! - [`FileStreamSource`], [`MemoryStreamSource`] - Stream roots
//! - [`ReadOnlyStreamSource`], [`WritableStreamSource`] - Compositions of roots
//!
//! # Examples
//!
//! ```rust
//! use std::io::{Read, Write};
//! use codesurgeon::io::{MemoryStreamSource, ReadOnlyStreamSource, StreamSource};
//! use std::sync::Arc;
//!
//! let root = Arc::new(MemoryStreamSource::new());
//! root.insert("Target", b"bytes".to_vec());
//!
//! let streams = ReadOnlyStreamSource::new(vec![root.clone()]);
//! let mut content = Vec::new();
//! streams.open_read("Target")?.unwrap().read_to_end(&mut content)?;
//! assert_eq!(content, b"bytes");
//! assert!(streams.open_write("Target")?.is_none());
//! # Ok::<(), codesurgeon::Error>(())
//! ```

mod memory;
mod streams;

use std::io::{Read, Write};

pub use memory::{MemoryModuleSource, MemoryStreamSource};
pub use streams::{FileStreamSource, ReadOnlyStreamSource, StreamModuleSource, WritableStreamSource};

use crate::{
    metadata::module::{ModuleDef, ModuleDefRc},
    Result,
};

/// Loads modules by name and persists them.
pub trait ModuleSource: Send + Sync {
    /// Loads the module with the given name.
    ///
    /// # Errors
    /// [`crate::Error::ModuleNotFound`] if the source has no such module, any decoding or I/O
    /// error otherwise.
    fn load(&self, name: &str) -> Result<ModuleDefRc>;

    /// Persists `module` under its name.
    ///
    /// # Errors
    /// [`crate::Error::ReadOnlyViolation`] if the source refuses writes, any encoding or I/O error
    /// otherwise.
    fn save(&self, module: &ModuleDefRc) -> Result<()>;
}

/// A readable stream handed out by a [`StreamSource`]
pub type ReadStream = Box<dyn Read + Send>;
/// A writable stream handed out by a [`StreamSource`]
pub type WriteStream = Box<dyn Write + Send>;

/// Opens named byte streams.
pub trait StreamSource: Send + Sync {
    /// Opens `name` for reading; `None` if this source has no such stream.
    ///
    /// # Errors
    /// I/O errors other than absence, and invalid names.
    fn open_read(&self, name: &str) -> Result<Option<ReadStream>>;

    /// Opens `name` for writing, replacing its content; `None` if this source refuses the write.
    ///
    /// # Errors
    /// I/O errors and invalid names.
    fn open_write(&self, name: &str) -> Result<Option<WriteStream>>;
}

/// Converts between bytes and module graphs.
pub trait ModuleCodec: Send + Sync {
    /// Decodes the module `name` from `reader`.
    ///
    /// # Errors
    /// Malformed input or I/O errors.
    fn decode(&self, name: &str, reader: &mut dyn Read) -> Result<ModuleDefRc>;

    /// Encodes `module` into `writer`.
    ///
    /// # Errors
    /// I/O errors, or definitions the format cannot represent.
    fn encode(&self, module: &ModuleDef, writer: &mut dyn Write) -> Result<()>;
}
