use std::{
    io::{Cursor, Write},
    sync::Arc,
};

use dashmap::DashMap;

use crate::{
    io::{ModuleSource, ReadStream, StreamSource, WriteStream},
    metadata::module::ModuleDefRc,
    Error, Result,
};

/// Modules held in memory.
///
/// Loading returns the inserted module itself, so changes made by an install are visible to the
/// caller without saving. Saves are counted per module name.
#[derive(Debug, Default)]
pub struct MemoryModuleSource {
    modules: DashMap<String, ModuleDefRc>,
    saves: DashMap<String, usize>,
}

impl MemoryModuleSource {
    /// Creates an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module`, replacing and returning any module with the same name
    pub fn insert(&self, module: ModuleDefRc) -> Option<ModuleDefRc> {
        self.modules.insert(module.name.clone(), module)
    }

    /// The module with the given name
    pub fn get(&self, name: &str) -> Option<ModuleDefRc> {
        self.modules.get(name).map(|entry| entry.value().clone())
    }

    /// How often the module with the given name was saved
    pub fn save_count(&self, name: &str) -> usize {
        self.saves.get(name).map_or(0, |count| *count)
    }

    /// Total number of saves
    pub fn total_saves(&self) -> usize {
        self.saves.iter().map(|entry| *entry.value()).sum()
    }
}

impl ModuleSource for MemoryModuleSource {
    fn load(&self, name: &str) -> Result<ModuleDefRc> {
        self.get(name)
            .ok_or_else(|| Error::ModuleNotFound(name.to_string()))
    }

    fn save(&self, module: &ModuleDefRc) -> Result<()> {
        self.modules.insert(module.name.clone(), module.clone());
        *self.saves.entry(module.name.clone()).or_insert(0) += 1;
        Ok(())
    }
}

/// Named byte buffers held in memory.
///
/// A written stream replaces the buffer when the writer is dropped.
#[derive(Debug, Default)]
pub struct MemoryStreamSource {
    buffers: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStreamSource {
    /// Creates an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `name`
    pub fn insert(&self, name: impl Into<String>, data: Vec<u8>) {
        self.buffers.insert(name.into(), data);
    }

    /// A copy of the buffer stored under `name`
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.buffers.get(name).map(|entry| entry.value().clone())
    }

    /// Returns `true` if a buffer is stored under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }
}

impl StreamSource for MemoryStreamSource {
    fn open_read(&self, name: &str) -> Result<Option<ReadStream>> {
        Ok(self
            .get(name)
            .map(|data| Box::new(Cursor::new(data)) as ReadStream))
    }

    fn open_write(&self, name: &str) -> Result<Option<WriteStream>> {
        Ok(Some(Box::new(MemoryWriter {
            name: name.to_string(),
            data: Vec::new(),
            buffers: self.buffers.clone(),
        })))
    }
}

struct MemoryWriter {
    name: String,
    data: Vec<u8>,
    buffers: Arc<DashMap<String, Vec<u8>>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffers.insert(self.name.clone(), self.data.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.buffers
            .insert(std::mem::take(&mut self.name), std::mem::take(&mut self.data));
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::test::sample_module;

    #[test]
    fn module_source_counts_saves() {
        let source = MemoryModuleSource::new();
        let module = sample_module();
        source.insert(module.clone());

        assert!(Arc::ptr_eq(&source.load("Target").unwrap(), &module));
        assert!(matches!(source.load("Other"), Err(Error::ModuleNotFound(_))));

        source.save(&module).unwrap();
        source.save(&module).unwrap();
        assert_eq!(source.save_count("Target"), 2);
        assert_eq!(source.save_count("Other"), 0);
        assert_eq!(source.total_saves(), 2);
    }

    #[test]
    fn writes_replace_buffers_on_drop() {
        let source = MemoryStreamSource::new();
        source.insert("a", b"old".to_vec());

        {
            let mut writer = source.open_write("a").unwrap().unwrap();
            writer.write_all(b"new content").unwrap();
        }

        let mut content = String::new();
        source
            .open_read("a")
            .unwrap()
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "new content");
        assert!(source.open_read("b").unwrap().is_none());
    }
}
