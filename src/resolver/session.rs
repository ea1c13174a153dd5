use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::{self, ThreadId},
};

use dashmap::DashMap;

use crate::{
    io::ModuleSource,
    metadata::{module::ModuleDefRc, Definition},
    modification::{AnyModification, ModificationId},
    resolver::{symbols, SearchContext},
    Error, Result,
};

/// A resolution in progress on `owner`; `located` is set once the definition was found or
/// created and is still being reconciled.
struct InFlight {
    owner: ThreadId,
    located: Option<Definition>,
}

/// The resolution state of one install run.
///
/// Modules are loaded through the [`ModuleSource`] on first use and kept for the lifetime of the
/// session. Every modification resolves at most once; later requests return the memoized
/// definition. A definition is memoized only after it was reconciled, so a failed resolution
/// fails again when repeated. Resolutions of distinct modifications proceed concurrently,
/// identical ones are serialized on a per-modification lock held until reconciliation is done.
pub struct ResolutionSession {
    source: Arc<dyn ModuleSource>,
    modules: DashMap<String, ModuleDefRc>,
    resolved: DashMap<ModificationId, Definition>,
    in_flight: DashMap<ModificationId, InFlight>,
    key_locks: DashMap<ModificationId, Arc<Mutex<()>>>,
    memo_hits: AtomicUsize,
}

impl ResolutionSession {
    /// Creates an empty session over `source`
    #[must_use]
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        ResolutionSession {
            source,
            modules: DashMap::new(),
            resolved: DashMap::new(),
            in_flight: DashMap::new(),
            key_locks: DashMap::new(),
            memo_hits: AtomicUsize::new(0),
        }
    }

    /// The module source backing this session
    pub fn source(&self) -> &Arc<dyn ModuleSource> {
        &self.source
    }

    /// Number of modifications resolved so far
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Number of requests answered from the memo table
    pub fn memo_hits(&self) -> usize {
        self.memo_hits.load(Ordering::Relaxed)
    }

    /// Returns the module if it is loaded or can be loaded, `None` if the source has no such
    /// module.
    pub(crate) fn try_module(&self, name: &str) -> Result<Option<ModuleDefRc>> {
        if let Some(module) = self.modules.get(name) {
            return Ok(Some(module.clone()));
        }

        match self.source.load(name) {
            Ok(module) => {
                let module = self
                    .modules
                    .entry(name.to_string())
                    .or_insert(module)
                    .clone();
                Ok(Some(module))
            }
            Err(Error::ModuleNotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Registers a module created during this session.
    ///
    /// Returns the module already registered under that name, if another caller won the race.
    pub(crate) fn add_module(&self, module: ModuleDefRc) -> (ModuleDefRc, bool) {
        let mut created = false;
        let entry = self
            .modules
            .entry(module.name.clone())
            .or_insert_with(|| {
                created = true;
                module
            })
            .clone();
        (entry, created)
    }

    fn memoized(&self, id: ModificationId) -> Option<Definition> {
        self.resolved.get(&id).map(|entry| entry.value().clone())
    }
}

impl SearchContext for ResolutionSession {
    fn module(&self, name: &str) -> Result<ModuleDefRc> {
        self.try_module(name)?
            .ok_or_else(|| Error::ModuleNotFound(name.to_string()))
    }

    fn resolve(&self, modification: &AnyModification) -> Result<Definition> {
        let node = modification.as_dyn();
        let id = node.id();

        if let Some(definition) = self.memoized(id) {
            self.memo_hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("memo hit for {} {}", node.symbol_kind(), node.full_name());
            return Ok(definition);
        }

        let current = thread::current().id();
        let reentered = self
            .in_flight
            .get(&id)
            .filter(|entry| entry.owner == current)
            .map(|entry| entry.located.clone());
        match reentered {
            Some(Some(definition)) => return Ok(definition),
            Some(None) => {
                return Err(symbol_error!(
                    CyclicResolution,
                    node.symbol_kind(),
                    node.full_name()
                ))
            }
            None => {}
        }

        let key_lock = self.key_locks.entry(id).or_default().clone();
        let _guard = key_lock.lock().map_err(|_| Error::LockError)?;
        if let Some(definition) = self.memoized(id) {
            self.memo_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(definition);
        }

        self.in_flight.insert(
            id,
            InFlight {
                owner: current,
                located: None,
            },
        );
        let result = symbols::locate(self, modification).and_then(|(definition, created)| {
            self.in_flight.insert(
                id,
                InFlight {
                    owner: current,
                    located: Some(definition.clone()),
                },
            );
            symbols::reconcile(self, modification, &definition, created).map(|()| definition)
        });
        self.in_flight.remove(&id);

        let definition = result?;
        self.resolved.insert(id, definition.clone());
        Ok(definition)
    }
}

impl std::fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("modules", &self.modules.len())
            .field("resolved", &self.resolved.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::MemoryModuleSource,
        metadata::{
            attributes::MethodAttributes,
            signatures::{MethodSignature, Primitive},
        },
        modification::{ModificationKind, ModuleModification},
        test::sample_module,
    };

    fn session() -> ResolutionSession {
        let source = Arc::new(MemoryModuleSource::new());
        source.insert(sample_module());
        ResolutionSession::new(source)
    }

    #[test]
    fn same_modification_resolves_to_same_definition() {
        let session = session();
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .unwrap();
        let nop = ty
            .method(
                "Nop",
                MethodSignature::new_static(Primitive::Void.into(), vec![]),
                ModificationKind::FailIfMissing,
            )
            .unwrap();

        let first = session.resolve_method(&nop).unwrap();
        let second = session.resolve_method(&nop).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(session.memo_hits() >= 1);
        assert_eq!(session.resolved_count(), 3);
    }

    #[test]
    fn failed_reconciliation_is_not_memoized() {
        let session = session();
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, true);
        let ty = module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .unwrap();
        let nop = ty
            .method(
                "Nop",
                MethodSignature::new_static(Primitive::Void.into(), vec![]),
                ModificationKind::CreateIfMissing,
            )
            .unwrap();
        nop.set_attributes(MethodAttributes::PRIVATE | MethodAttributes::STATIC);

        for _ in 0..2 {
            assert!(matches!(
                session.resolve_method(&nop),
                Err(Error::ReadOnlyViolation { .. })
            ));
        }
        assert_eq!(session.resolved_count(), 2);

        let target = session.module("Target").unwrap();
        let existing = &target.find_type("N", "C").unwrap().find_methods("Nop")[0];
        assert_eq!(
            existing.attributes() & MethodAttributes::MEMBER_ACCESS_MASK,
            MethodAttributes::PUBLIC
        );
    }

    #[test]
    fn missing_module() {
        let session = session();
        assert!(matches!(
            session.module("Elsewhere"),
            Err(Error::ModuleNotFound(_))
        ));
        assert!(session.module("Target").is_ok());
        assert!(Arc::ptr_eq(
            &session.module("Target").unwrap(),
            &session.module("Target").unwrap()
        ));
    }

    #[test]
    fn concurrent_resolution_creates_once() {
        let session = session();
        let module = ModuleModification::new("Target", ModificationKind::FailIfMissing, false);
        let ty = module
            .declare_type("N", "Generated", ModificationKind::CreateIfMissing, false)
            .unwrap();

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| session.resolve_type(&ty).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        let target = session.module("Target").unwrap();
        assert_eq!(
            target
                .types
                .iter()
                .filter(|t| t.name == "Generated")
                .count(),
            1
        );
    }
}
