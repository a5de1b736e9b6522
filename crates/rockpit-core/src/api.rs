use crate::flags::OperationFlags;
use crate::fulfill::Fulfillment;
use crate::overlay::{OverlayGuard, OverlayWindow};
use crate::project::ProjectContext;
use crate::redirect::{LogSink, OutputRedirect, TracingSink};
use crate::CoreError;
use rockpit_engine::{
    BuildOptions, EngineError, InstalledRock, ListOptions, PackageEngine, PurgeOptions,
    RemoveOptions, SearchResult,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::info;

/// True iff `remote` is strictly newer than `local`.
pub use rockpit_schema::compare_versions;

/// Project-scoped front end to a package engine.
///
/// Every operation resolves the project (once per `Rocks`), points the
/// engine at `<project>/rocks` for the duration of the call, and sends the
/// engine's output to the log sink. The engine's configuration and output
/// sinks are restored before the operation returns, whatever its outcome.
pub struct Rocks {
    engine: Box<dyn PackageEngine>,
    project_dir: PathBuf,
    context: OnceLock<ProjectContext>,
    window: OverlayWindow,
    log: Arc<dyn LogSink>,
}

impl Rocks {
    pub fn new(engine: Box<dyn PackageEngine>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            project_dir: project_dir.into(),
            context: OnceLock::new(),
            window: OverlayWindow::new(),
            log: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    pub fn engine(&self) -> &dyn PackageEngine {
        self.engine.as_ref()
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// The resolved project. Resolution happens on first use and is cached;
    /// a failed resolution is not cached.
    pub fn context(&self) -> Result<&ProjectContext, CoreError> {
        if let Some(context) = self.context.get() {
            return Ok(context);
        }
        let resolved = ProjectContext::resolve(&self.project_dir)?;
        Ok(self.context.get_or_init(|| resolved))
    }

    fn run_in_window<T>(
        &self,
        flags: &OperationFlags,
        op: impl FnOnce(&dyn PackageEngine, &ProjectContext) -> Result<T, EngineError>,
    ) -> Result<T, CoreError> {
        let project = self.context()?;
        project.ensure_tree()?;
        let engine = self.engine.as_ref();
        let _overlay = OverlayGuard::enter(engine, &self.window, project, flags);
        let _redirect = OutputRedirect::wrap(engine, Arc::clone(&self.log));
        Ok(op(engine, project)?)
    }

    pub fn list(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
        flags: &OperationFlags,
    ) -> Result<Vec<InstalledRock>, CoreError> {
        let options = ListOptions {
            outdated: flags.outdated,
            porcelain: flags.porcelain,
        };
        self.run_in_window(flags, |engine, _| engine.list(pattern, version, options))
    }

    pub fn search(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
        flags: &OperationFlags,
    ) -> Result<Vec<SearchResult>, CoreError> {
        self.run_in_window(flags, |engine, _| engine.search(pattern, version))
    }

    /// Install `name` into the project tree. `version` of `None` means the
    /// newest available.
    pub fn install(
        &self,
        name: &str,
        version: Option<&str>,
        flags: &OperationFlags,
    ) -> Result<Vec<InstalledRock>, CoreError> {
        info!("install {name} {}", version.unwrap_or("(latest)"));
        self.run_in_window(flags, |engine, _| engine.install(name, version))
    }

    /// Remove `name` from the project tree; `None` removes every version.
    pub fn remove(
        &self,
        name: &str,
        version: Option<&str>,
        flags: &OperationFlags,
    ) -> Result<Vec<InstalledRock>, CoreError> {
        info!("remove {name} {}", version.unwrap_or("(all)"));
        let options = RemoveOptions { force: flags.force };
        self.run_in_window(flags, |engine, _| engine.remove(name, version, options))
    }

    pub fn build(
        &self,
        name: &str,
        version: Option<&str>,
        flags: &OperationFlags,
    ) -> Result<Vec<InstalledRock>, CoreError> {
        info!("build {name} only_deps={}", flags.only_deps);
        let options = BuildOptions {
            only_deps: flags.only_deps,
        };
        self.run_in_window(flags, |engine, _| engine.build(name, version, options))
    }

    /// Remove installed rocks from the project tree. Shared trees are never
    /// touched, whatever `use_local` says.
    pub fn purge(&self, flags: &OperationFlags) -> Result<Vec<InstalledRock>, CoreError> {
        let flags = OperationFlags {
            use_local: false,
            ..flags.clone()
        };
        let options = PurgeOptions {
            only_deps: flags.only_deps,
            force: flags.force,
        };
        info!("purge only_deps={} force={}", options.only_deps, options.force);
        self.run_in_window(&flags, |engine, project| {
            engine.purge(project.tree(), options)
        })
    }

    /// Install everything the project's `[dependencies]` table lists.
    pub fn deps(&self, flags: &OperationFlags) -> Result<Vec<InstalledRock>, CoreError> {
        let project = self.context()?;
        let plan = Fulfillment::parse(project.name(), &project.config().dependencies.rocks)?;
        info!("deps: {} rocks for '{}'", plan.dependencies().len(), project.name());
        self.run_in_window(flags, |engine, _| plan.run(engine))
    }
}
