use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    io::{ModuleCodec, ModuleSource, ReadStream, StreamSource, WriteStream},
    metadata::module::ModuleDefRc,
    modification::SymbolKind,
    Error, Result,
};

/// Loads and saves modules through named streams and a codec.
pub struct StreamModuleSource<C: ModuleCodec> {
    streams: Arc<dyn StreamSource>,
    codec: C,
}

impl<C: ModuleCodec> StreamModuleSource<C> {
    /// Creates a source reading and writing through `streams`
    pub fn new(streams: Arc<dyn StreamSource>, codec: C) -> Self {
        StreamModuleSource { streams, codec }
    }

    /// The stream source
    pub fn streams(&self) -> &Arc<dyn StreamSource> {
        &self.streams
    }
}

impl<C: ModuleCodec> ModuleSource for StreamModuleSource<C> {
    fn load(&self, name: &str) -> Result<ModuleDefRc> {
        let mut stream = self
            .streams
            .open_read(name)?
            .ok_or_else(|| Error::ModuleNotFound(name.to_string()))?;
        self.codec.decode(name, &mut stream)
    }

    fn save(&self, module: &ModuleDefRc) -> Result<()> {
        let mut encoded = Vec::new();
        self.codec.encode(module, &mut encoded)?;

        let mut stream = self
            .streams
            .open_write(&module.name)?
            .ok_or_else(|| symbol_error!(ReadOnlyViolation, SymbolKind::Module, module.name))?;
        stream.write_all(&encoded)?;
        stream.flush()?;
        Ok(())
    }
}

impl<C: ModuleCodec> std::fmt::Debug for StreamModuleSource<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamModuleSource").finish_non_exhaustive()
    }
}

/// Streams stored as files `{root}/{name}.{extension}`.
#[derive(Debug, Clone)]
pub struct FileStreamSource {
    root: PathBuf,
    extension: String,
}

impl FileStreamSource {
    /// Files with the `dll` extension below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStreamSource {
            root: root.into(),
            extension: "dll".to_string(),
        }
    }

    /// Uses `extension` instead of `dll`; an empty extension uses the bare name
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file backing the stream `name`.
    ///
    /// # Errors
    /// Names that are empty, contain path separators or refer to a parent directory.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(Error::Error(format!("invalid stream name {name:?}")));
        }

        let mut path = self.root.join(name);
        if !self.extension.is_empty() {
            path.as_mut_os_string().push(format!(".{}", self.extension));
        }
        Ok(path)
    }
}

impl StreamSource for FileStreamSource {
    fn open_read(&self, name: &str) -> Result<Option<ReadStream>> {
        let path = self.path(name)?;
        match File::open(&path) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn open_write(&self, name: &str) -> Result<Option<WriteStream>> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.root)?;
        Ok(Some(Box::new(BufWriter::new(File::create(path)?))))
    }
}

fn first_readable(roots: &[Arc<dyn StreamSource>], name: &str) -> Result<Option<ReadStream>> {
    for root in roots {
        if let Some(stream) = root.open_read(name)? {
            return Ok(Some(stream));
        }
    }
    Ok(None)
}

/// Reads from the first of several roots that has a stream; never writes to them.
///
/// Writes are refused, or, with a sink, redirected into an in-memory buffer that is discarded
/// with the sink.
pub struct ReadOnlyStreamSource {
    roots: Vec<Arc<dyn StreamSource>>,
    sink: Option<Arc<dyn StreamSource>>,
}

impl ReadOnlyStreamSource {
    /// Reads from `roots` in order and refuses writes
    #[must_use]
    pub fn new(roots: Vec<Arc<dyn StreamSource>>) -> Self {
        ReadOnlyStreamSource { roots, sink: None }
    }

    /// Redirects writes to `sink` instead of refusing them
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn StreamSource>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl StreamSource for ReadOnlyStreamSource {
    fn open_read(&self, name: &str) -> Result<Option<ReadStream>> {
        first_readable(&self.roots, name)
    }

    fn open_write(&self, name: &str) -> Result<Option<WriteStream>> {
        match &self.sink {
            Some(sink) => {
                log::warn!("write to {name} redirected to a memory sink");
                sink.open_write(name)
            }
            None => {
                log::warn!("write to {name} refused by a read-only stream source");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ReadOnlyStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyStreamSource")
            .field("roots", &self.roots.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Reads from several roots and writes to one.
pub struct WritableStreamSource {
    roots: Vec<Arc<dyn StreamSource>>,
    output: Arc<dyn StreamSource>,
}

impl WritableStreamSource {
    /// Reads from `roots` in order and writes to `output`
    #[must_use]
    pub fn new(roots: Vec<Arc<dyn StreamSource>>, output: Arc<dyn StreamSource>) -> Self {
        WritableStreamSource { roots, output }
    }
}

impl StreamSource for WritableStreamSource {
    fn open_read(&self, name: &str) -> Result<Option<ReadStream>> {
        first_readable(&self.roots, name)
    }

    fn open_write(&self, name: &str) -> Result<Option<WriteStream>> {
        self.output.open_write(name)
    }
}

impl std::fmt::Debug for WritableStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableStreamSource")
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, Read};

    use super::*;
    use crate::{
        io::MemoryStreamSource,
        metadata::{
            attributes::TypeAttributes,
            module::{ModuleDef, ModuleDefRc},
            typesystem::TypeDef,
        },
    };

    /// One top-level type per line, `Namespace Name`
    struct TypeListCodec;

    impl ModuleCodec for TypeListCodec {
        fn decode(&self, name: &str, reader: &mut dyn std::io::Read) -> Result<ModuleDefRc> {
            let module = ModuleDef::new(name);
            for line in std::io::BufReader::new(reader).lines() {
                let line = line?;
                let (namespace, name) = line.split_once(' ').unwrap_or(("", line.as_str()));
                module.add_type(TypeDef::new(namespace, name, TypeAttributes::PUBLIC));
            }
            Ok(module)
        }

        fn encode(&self, module: &ModuleDef, writer: &mut dyn Write) -> Result<()> {
            for ty in module.types.iter() {
                writeln!(writer, "{} {}", ty.namespace, ty.name)?;
            }
            Ok(())
        }
    }

    #[test]
    fn file_names_are_validated() {
        let source = FileStreamSource::new("/tmp/modules");
        assert_eq!(
            source.path("Target").unwrap(),
            PathBuf::from("/tmp/modules/Target.dll")
        );
        assert_eq!(
            source.clone().with_extension("").path("Target").unwrap(),
            PathBuf::from("/tmp/modules/Target")
        );
        assert!(source.path("../Target").is_err());
        assert!(source.path("a\\b").is_err());
        assert!(source.path("").is_err());
    }

    #[test]
    fn files_round_trip_through_the_codec() {
        let dir = tempfile::tempdir().unwrap();
        let files: Arc<dyn StreamSource> = Arc::new(FileStreamSource::new(dir.path()));
        std::fs::write(dir.path().join("Target.dll"), "N C\n").unwrap();

        let source = StreamModuleSource::new(files.clone(), TypeListCodec);
        let module = source.load("Target").unwrap();
        module.add_type(TypeDef::new("N", "Added", TypeAttributes::PUBLIC));
        source.save(&module).unwrap();

        let saved = std::fs::read_to_string(dir.path().join("Target.dll")).unwrap();
        assert_eq!(saved, "N C\nN Added\n");
        assert!(matches!(
            source.load("Missing"),
            Err(Error::ModuleNotFound(name)) if name == "Missing"
        ));
    }

    /// Decodes like [`TypeListCodec`] but cannot encode
    struct DecodeOnlyCodec;

    impl ModuleCodec for DecodeOnlyCodec {
        fn decode(&self, name: &str, reader: &mut dyn std::io::Read) -> Result<ModuleDefRc> {
            TypeListCodec.decode(name, reader)
        }

        fn encode(&self, _module: &ModuleDef, writer: &mut dyn Write) -> Result<()> {
            writer.write_all(b"partial")?;
            Err(Error::Error("cannot encode".to_string()))
        }
    }

    #[test]
    fn failed_encoding_leaves_the_stored_module_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let files: Arc<dyn StreamSource> = Arc::new(FileStreamSource::new(dir.path()));
        std::fs::write(dir.path().join("Target.dll"), "N C\n").unwrap();

        let source = StreamModuleSource::new(files, DecodeOnlyCodec);
        let module = source.load("Target").unwrap();
        assert!(source.save(&module).is_err());

        let stored = std::fs::read_to_string(dir.path().join("Target.dll")).unwrap();
        assert_eq!(stored, "N C\n");
    }

    #[test]
    fn read_only_sources_refuse_or_redirect() {
        let first = Arc::new(MemoryStreamSource::new());
        let second = Arc::new(MemoryStreamSource::new());
        second.insert("Target", b"N C\n".to_vec());
        first.insert("Other", b"".to_vec());

        let refusing = Arc::new(ReadOnlyStreamSource::new(vec![first.clone(), second.clone()]));
        let source = StreamModuleSource::new(refusing, TypeListCodec);
        let module = source.load("Target").unwrap();
        assert!(module.find_type("N", "C").is_some());
        assert!(matches!(
            source.save(&module),
            Err(Error::ReadOnlyViolation { kind: SymbolKind::Module, .. })
        ));

        let sink = Arc::new(MemoryStreamSource::new());
        let redirecting =
            Arc::new(ReadOnlyStreamSource::new(vec![second.clone()]).with_sink(sink.clone()));
        let source = StreamModuleSource::new(redirecting, TypeListCodec);
        source.save(&module).unwrap();
        assert_eq!(sink.get("Target").unwrap(), b"N C\n");
        assert_eq!(second.get("Target").unwrap(), b"N C\n");
    }

    #[test]
    fn writable_sources_write_to_their_output() {
        let input = Arc::new(MemoryStreamSource::new());
        input.insert("Target", b"N C\n".to_vec());
        let output = Arc::new(MemoryStreamSource::new());

        let streams = WritableStreamSource::new(vec![input.clone()], output.clone());
        let mut content = Vec::new();
        streams
            .open_read("Target")
            .unwrap()
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"N C\n");

        streams
            .open_write("Target")
            .unwrap()
            .unwrap()
            .write_all(b"changed")
            .unwrap();
        assert_eq!(output.get("Target").unwrap(), b"changed");
        assert_eq!(input.get("Target").unwrap(), b"N C\n");
    }
}
