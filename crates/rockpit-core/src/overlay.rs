use crate::flags::OperationFlags;
use crate::project::ProjectContext;
use rockpit_engine::{EngineConfig, PackageEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Tracks whether an overlay window is open on an engine. At most one may
/// be open at a time; opening a second is a programming error and panics.
#[derive(Debug, Default)]
pub struct OverlayWindow {
    open: AtomicBool,
}

impl OverlayWindow {
    pub const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open(&self) {
        assert!(
            !self.open.swap(true, Ordering::SeqCst),
            "contract violation: nested overlay window (an operation is already in flight on this engine)"
        );
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Apply `from` / `only_from` to `defaults`. `from` is checked first; when
/// it is set `only_from` has no effect.
pub fn effective_repositories(defaults: &[String], flags: &OperationFlags) -> Vec<String> {
    if let Some(from) = &flags.from {
        let mut repositories = vec![from.clone()];
        repositories.extend(defaults.iter().filter(|r| *r != from).cloned());
        repositories
    } else if let Some(only) = &flags.only_from {
        vec![only.clone()]
    } else {
        defaults.to_vec()
    }
}

/// Project extras, then runtime-implied repositories, then whatever the
/// engine had. First occurrence wins.
fn default_repositories(saved: &EngineConfig, project: &ProjectContext) -> Vec<String> {
    let mut repositories: Vec<String> = Vec::new();
    for repo in project
        .config()
        .repositories
        .extra
        .iter()
        .chain(&project.version().repositories)
        .chain(&saved.rocks_servers)
    {
        if !repositories.contains(repo) {
            repositories.push(repo.clone());
        }
    }
    repositories
}

/// The configuration the engine runs with inside an overlay window.
pub fn overlay_config(
    saved: &EngineConfig,
    project: &ProjectContext,
    flags: &OperationFlags,
) -> EngineConfig {
    let mut config = saved.clone();
    config.lua_abi.clone_from(&project.version().lua_abi);
    config.use_tree(project.tree());
    if flags.use_local {
        for tree in &saved.rocks_trees {
            if !config.rocks_trees.contains(tree) {
                config.rocks_trees.push(tree.clone());
            }
        }
    }
    config.rocks_servers = effective_repositories(&default_repositories(saved, project), flags);
    config.rocks_provided.extend(
        project
            .version()
            .provided
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    config
}

/// An open overlay window.
///
/// Entering stashes the engine's configuration, installs the project
/// overlay, and drops cached repository metadata. Dropping the guard puts
/// the stashed configuration back verbatim, on every exit path including
/// unwinding.
pub struct OverlayGuard<'a> {
    engine: &'a dyn PackageEngine,
    window: &'a OverlayWindow,
    saved: EngineConfig,
}

impl<'a> OverlayGuard<'a> {
    pub fn enter(
        engine: &'a dyn PackageEngine,
        window: &'a OverlayWindow,
        project: &ProjectContext,
        flags: &OperationFlags,
    ) -> Self {
        let saved = engine.config();
        let overlaid = overlay_config(&saved, project, flags);
        debug!(
            "overlay: tree {} servers {:?}",
            overlaid.root_dir.display(),
            overlaid.rocks_servers
        );
        window.open();
        // From here on the guard owns the window and closes it on unwind.
        let guard = Self {
            engine,
            window,
            saved,
        };
        engine.set_config(overlaid);
        engine.clear_manifest_cache();
        guard
    }

    /// The configuration that will be restored.
    pub fn saved(&self) -> &EngineConfig {
        &self.saved
    }
}

impl Drop for OverlayGuard<'_> {
    fn drop(&mut self) {
        self.engine.set_config(self.saved.clone());
        self.window.close();
        debug!("overlay: restored tree {}", self.saved.root_dir.display());
    }
}
