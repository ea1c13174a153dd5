use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use rayon::prelude::*;

use crate::{
    io::ModuleSource,
    metadata::module::ModuleDefRc,
    modification::{AnyModification, Modification},
    patch::{InstallerConfig, Patch},
    resolver::{ResolutionSession, SearchContext},
    transform::transplant,
    Error, Result,
};

/// Summary of a successful installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Installed patches, in installation order
    pub patches: Vec<String>,
    /// Saved modules, in name order; empty for dry runs
    pub saved_modules: Vec<String>,
    /// Number of modifications resolved
    pub resolved: usize,
    /// Full names of the hidden methods created for replaced bodies
    pub hidden_methods: Vec<String>,
}

/// Applies patches to the modules of a [`ModuleSource`].
///
/// All patches share one [`ResolutionSession`]. Each patch is applied in three phases:
///
/// 1. Read-only modifications are resolved, so missing dependencies fail before any write
/// 2. Every modification is resolved, creating and reconciling definitions
/// 3. Method bodies are transplanted
///
/// Errors are wrapped in [`Error::Patch`] and abort the run. Modules are saved once, after every
/// patch succeeded.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use codesurgeon::prelude::*;
///
/// let source = Arc::new(MemoryModuleSource::new());
/// let patch = StandardPatch::new("Check");
/// patch.module("Target", ModificationKind::FailIfMissing, true)?;
///
/// let mut installer = PatchInstaller::new(source).with_config(InstallerConfig::dry_run());
/// installer.add(patch);
/// let report = installer.install()?;
/// assert!(report.saved_modules.is_empty());
/// # Ok::<(), codesurgeon::Error>(())
/// ```
pub struct PatchInstaller {
    source: Arc<dyn ModuleSource>,
    config: InstallerConfig,
    patches: Vec<Box<dyn Patch>>,
}

impl PatchInstaller {
    /// Creates an installer with the default configuration
    #[must_use]
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        PatchInstaller {
            source,
            config: InstallerConfig::default(),
            patches: Vec::new(),
        }
    }

    /// Replaces the configuration
    #[must_use]
    pub fn with_config(mut self, config: InstallerConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Registers a patch; patches are installed in registration order
    pub fn add(&mut self, patch: impl Patch + 'static) {
        self.patches.push(Box::new(patch));
    }

    /// Number of registered patches
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Installs every registered patch.
    ///
    /// # Errors
    /// [`Error::Patch`] wrapping the first failure of a patch, or the error of a failed save.
    pub fn install(&self) -> Result<InstallReport> {
        let session = ResolutionSession::new(self.source.clone());
        let touched: SkipMap<String, ModuleDefRc> = SkipMap::new();
        let mut report = InstallReport::default();

        for patch in &self.patches {
            let hidden = self
                .install_patch(&session, patch.as_ref(), &touched)
                .map_err(|error| Error::Patch {
                    patch: patch.name().to_string(),
                    source: Box::new(error),
                })?;

            log::info!("installed patch {}", patch.name());
            report.patches.push(patch.name().to_string());
            report.hidden_methods.extend(hidden);
        }

        if self.config.persist {
            for entry in touched.iter() {
                self.source.save(entry.value())?;
                log::info!("saved module {}", entry.key());
                report.saved_modules.push(entry.key().clone());
            }
        }

        report.resolved = session.resolved_count();
        Ok(report)
    }

    fn install_patch(
        &self,
        session: &ResolutionSession,
        patch: &dyn Patch,
        touched: &SkipMap<String, ModuleDefRc>,
    ) -> Result<Vec<String>> {
        let modules = patch.modules();
        let nodes: Vec<AnyModification> =
            modules.iter().flat_map(AnyModification::walk).collect();

        if self.config.verify_dependencies {
            for node in nodes.iter().filter(|node| node.as_dyn().read_only()) {
                session.resolve(node)?;
            }
        }

        let (members, containers): (Vec<_>, Vec<_>) = nodes.iter().partition(|node| {
            !matches!(node, AnyModification::Module(_) | AnyModification::Type(_))
        });
        for node in containers {
            session.resolve(node)?;
        }
        if self.config.parallel {
            members
                .par_iter()
                .try_for_each(|node| session.resolve(node).map(|_| ()))?;
        } else {
            for node in members {
                session.resolve(node)?;
            }
        }

        let mut hidden = Vec::new();
        for node in &nodes {
            if let AnyModification::Method(method) = node {
                if let Some(base) = transplant(session, method, &self.config.hidden_method_suffix)? {
                    hidden.push(base.full_name());
                }
            }
        }

        for module in modules.iter().filter(|module| !module.read_only()) {
            let resolved = session.resolve_module(module)?;
            touched.get_or_insert(module.name.clone(), resolved);
        }
        Ok(hidden)
    }
}

impl std::fmt::Debug for PatchInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.patches.iter().map(|patch| patch.name()).collect();
        f.debug_struct("PatchInstaller")
            .field("config", &self.config)
            .field("patches", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        io::MemoryModuleSource,
        metadata::{
            attributes::{FieldAttributes, TypeAttributes},
            signatures::{FieldSignature, Primitive},
        },
        modification::{ModificationKind, SymbolKind},
        patch::StandardPatch,
        test::sample_module,
    };

    fn source() -> Arc<MemoryModuleSource> {
        let source = Arc::new(MemoryModuleSource::new());
        source.insert(sample_module());
        source
    }

    #[test]
    fn writable_modules_are_saved_once() {
        let source = source();
        let mut installer = PatchInstaller::new(source.clone());

        for name in ["First", "Second"] {
            let patch = StandardPatch::new(name);
            let module = patch
                .module("Target", ModificationKind::FailIfMissing, false)
                .unwrap();
            let ty = module
                .declare_type("N", "C", ModificationKind::FailIfMissing, false)
                .unwrap();
            ty.field(
                format!("added{name}"),
                FieldSignature::new(Primitive::I4.into()),
                ModificationKind::FailIfPresent,
            )
            .unwrap()
            .set_attributes(FieldAttributes::PUBLIC);
            installer.add(patch);
        }

        let report = installer.install().unwrap();
        assert_eq!(report.patches, vec!["First", "Second"]);
        assert_eq!(report.saved_modules, vec!["Target"]);
        assert_eq!(source.save_count("Target"), 1);

        let ty = source.get("Target").unwrap().find_type("N", "C").unwrap();
        assert!(ty.find_field("addedFirst").is_some());
        assert_eq!(
            ty.find_field("addedSecond").unwrap().attributes(),
            FieldAttributes::PUBLIC
        );
    }

    #[test]
    fn read_only_patches_save_nothing() {
        let source = source();
        let patch = StandardPatch::new("Check");
        let module = patch
            .module("Target", ModificationKind::FailIfMissing, true)
            .unwrap();
        module
            .declare_type("N", "C", ModificationKind::FailIfMissing, true)
            .unwrap();

        let mut installer = PatchInstaller::new(source.clone());
        installer.add(patch);
        let report = installer.install().unwrap();

        assert!(report.saved_modules.is_empty());
        assert_eq!(report.resolved, 2);
        assert_eq!(source.total_saves(), 0);
    }

    #[test]
    fn failures_are_attributed_and_nothing_is_saved() {
        let source = source();
        let mut installer = PatchInstaller::new(source.clone());

        let good = StandardPatch::new("Good");
        good.module("Target", ModificationKind::FailIfMissing, false)
            .unwrap()
            .declare_type("N", "Added", ModificationKind::FailIfPresent, false)
            .unwrap()
            .set_attributes(TypeAttributes::PUBLIC);
        installer.add(good);

        let bad = StandardPatch::new("Bad");
        bad.module("Target", ModificationKind::FailIfMissing, false)
            .unwrap()
            .declare_type("N", "Missing", ModificationKind::FailIfMissing, false)
            .unwrap();
        installer.add(bad);

        let err = installer.install().unwrap_err();
        assert!(matches!(&err, Error::Patch { patch, .. } if patch == "Bad"));
        assert_eq!(err.symbol(), Some((SymbolKind::Type, "N.Missing")));
        assert_eq!(source.total_saves(), 0);
    }

    #[test]
    fn missing_dependencies_fail_before_writes() {
        let target = sample_module();
        let source = Arc::new(MemoryModuleSource::new());
        source.insert(target.clone());

        let patch = StandardPatch::new("Partial");
        let module = patch
            .module("Target", ModificationKind::FailIfMissing, false)
            .unwrap();
        module
            .declare_type("N", "Added", ModificationKind::FailIfPresent, false)
            .unwrap();
        module
            .declare_type("N", "Missing", ModificationKind::FailIfMissing, true)
            .unwrap();

        let mut installer = PatchInstaller::new(source);
        installer.add(patch);
        assert!(installer.install().is_err());
        assert!(target.find_type("N", "Added").is_none());
    }

    #[test]
    fn dry_runs_and_parallel_runs() {
        for config in [InstallerConfig::dry_run(), InstallerConfig::parallel()] {
            let source = source();
            let patch = StandardPatch::new("Fields");
            let ty = patch
                .module("Target", ModificationKind::FailIfMissing, false)
                .unwrap()
                .declare_type("N", "C", ModificationKind::FailIfMissing, false)
                .unwrap();
            for index in 0..16 {
                ty.field(
                    format!("f{index}"),
                    FieldSignature::new(Primitive::I4.into()),
                    ModificationKind::CreateIfMissing,
                )
                .unwrap();
            }

            let persist = config.persist;
            let mut installer = PatchInstaller::new(source.clone()).with_config(config);
            installer.add(patch);
            let report = installer.install().unwrap();

            let created = source.get("Target").unwrap().find_type("N", "C").unwrap();
            assert_eq!(created.fields.len(), 16);
            assert_eq!(source.save_count("Target"), usize::from(persist));
            assert_eq!(report.resolved, 18);
        }
    }
}
