use crate::config::EngineConfig;
use crate::output::OutputSinks;
use crate::EngineError;
use rockpit_schema::{DependencySpec, RockName};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledRock {
    pub name: RockName,
    pub version: String,
    pub tree: PathBuf,
    /// False when the rock was only pulled in to satisfy another rock.
    pub explicit: bool,
    /// Newest version available remotely, filled in by outdated listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub name: RockName,
    pub version: String,
    pub repository: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only rocks with a newer version in some repository.
    pub outdated: bool,
    /// Machine-readable output on the engine's print channel.
    pub porcelain: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove even when other installed rocks depend on the target.
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Install the rock's dependencies but not the rock itself.
    pub only_deps: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOptions {
    /// Only remove rocks installed as dependencies.
    pub only_deps: bool,
    pub force: bool,
}

/// How `fulfill_dependencies` judges success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepsMode {
    /// Every dependency must end up satisfied.
    #[default]
    All,
    /// Satisfying any one dependency is enough.
    Any,
}

/// A rockspec that exists only to carry a dependency list, e.g. a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousRockspec {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<DependencySpec>,
}

impl AnonymousRockspec {
    pub fn new(name: impl Into<String>, dependencies: Vec<DependencySpec>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            dependencies,
        }
    }
}

/// A package engine with process-wide configuration and output channels.
///
/// Every operation reads the configuration current at the time of the call;
/// callers wanting different trees or repositories must change it with
/// [`set_config`](PackageEngine::set_config) and put it back afterwards.
pub trait PackageEngine: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> EngineConfig;

    fn set_config(&self, config: EngineConfig);

    /// Replace both output sinks, returning the previous ones.
    fn swap_output(&self, sinks: OutputSinks) -> OutputSinks;

    /// Forget any cached repository metadata.
    fn clear_manifest_cache(&self);

    /// Resolve `name` (newest version when `version` is `None`) and install
    /// it with its dependencies. Returns every rock newly installed.
    fn install(&self, name: &str, version: Option<&str>)
        -> Result<Vec<InstalledRock>, EngineError>;

    /// Remove `name` from the install tree; `None` removes every version.
    fn remove(
        &self,
        name: &str,
        version: Option<&str>,
        options: RemoveOptions,
    ) -> Result<Vec<InstalledRock>, EngineError>;

    fn build(
        &self,
        name: &str,
        version: Option<&str>,
        options: BuildOptions,
    ) -> Result<Vec<InstalledRock>, EngineError>;

    fn list(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
        options: ListOptions,
    ) -> Result<Vec<InstalledRock>, EngineError>;

    fn search(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
    ) -> Result<Vec<SearchResult>, EngineError>;

    /// Remove installed rocks from `tree`. Purging an empty tree succeeds.
    fn purge(&self, tree: &Path, options: PurgeOptions)
        -> Result<Vec<InstalledRock>, EngineError>;

    fn fulfill_dependencies(
        &self,
        rockspec: &AnonymousRockspec,
        mode: DepsMode,
    ) -> Result<Vec<InstalledRock>, EngineError>;
}

pub fn select_engine(
    name: &str,
    config: EngineConfig,
) -> Result<Box<dyn PackageEngine>, EngineError> {
    match name {
        "local" => Ok(Box::new(crate::local::LocalEngine::new(config))),
        other => Err(EngineError::UnknownEngine(other.to_owned())),
    }
}
