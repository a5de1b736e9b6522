//! An in-memory engine that records how it was driven.

use crate::redirect::LogSink;
use rockpit_engine::{
    AnonymousRockspec, BuildOptions, DepsMode, EngineConfig, EngineError, InstalledRock,
    ListOptions, OutputSinks, PackageEngine, PurgeOptions, RemoveOptions, SearchResult,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    /// The next `set_config` panics; afterwards the engine succeeds.
    PanicOnNextReconfigure,
}

/// One recorded operation: its name, the config in force, and the argument
/// that matters for assertions (rock name, purge tree, rockspec name).
#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub config: EngineConfig,
    pub arg: String,
    pub detail: String,
}

struct State {
    config: Mutex<EngineConfig>,
    output: Mutex<OutputSinks>,
    calls: Mutex<Vec<Call>>,
    behavior: Mutex<Behavior>,
    cache_clears: AtomicUsize,
}

/// Clones share state, so a test can keep a handle after boxing one into
/// a `Rocks`.
#[derive(Clone)]
pub struct RecordingEngine {
    state: Arc<State>,
}

impl RecordingEngine {
    pub fn new(servers: &[&str]) -> Self {
        Self {
            state: Arc::new(State {
                config: Mutex::new(EngineConfig::new(
                    shared_tree(),
                    servers.iter().map(|s| (*s).to_owned()).collect(),
                )),
                output: Mutex::new(OutputSinks::silent()),
                calls: Mutex::new(Vec::new()),
                behavior: Mutex::new(Behavior::Succeed),
                cache_clears: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.state.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn cache_clears(&self) -> usize {
        self.state.cache_clears.load(Ordering::SeqCst)
    }

    /// Write one message to each of the engine's current channels.
    pub fn emit(&self, out: &str, err: &str) {
        let sinks = self.state.output.lock().unwrap().clone();
        sinks.print(out);
        sinks.warn(err);
    }

    fn record(&self, op: &'static str, arg: &str, detail: String) -> Result<(), EngineError> {
        let config = self.config();
        self.state.calls.lock().unwrap().push(Call {
            op,
            config,
            arg: arg.to_owned(),
            detail,
        });
        self.emit(&format!("{op} {arg}"), &format!("{op} warning"));
        let behavior = *self.state.behavior.lock().unwrap();
        match behavior {
            Behavior::Succeed | Behavior::PanicOnNextReconfigure => Ok(()),
            Behavior::Fail => Err(EngineError::NoCandidate(arg.to_owned())),
            Behavior::Panic => panic!("engine exploded during {op}"),
        }
    }

    fn rock(&self, name: &str) -> InstalledRock {
        InstalledRock {
            name: name.into(),
            version: "1.0-1".to_owned(),
            tree: self.config().root_dir,
            explicit: true,
            latest: None,
        }
    }
}

impl PackageEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn config(&self) -> EngineConfig {
        self.state.config.lock().unwrap().clone()
    }

    fn set_config(&self, config: EngineConfig) {
        {
            let mut behavior = self.state.behavior.lock().unwrap();
            if *behavior == Behavior::PanicOnNextReconfigure {
                *behavior = Behavior::Succeed;
                drop(behavior);
                panic!("engine refused the new configuration");
            }
        }
        *self.state.config.lock().unwrap() = config;
    }

    fn swap_output(&self, sinks: OutputSinks) -> OutputSinks {
        std::mem::replace(&mut *self.state.output.lock().unwrap(), sinks)
    }

    fn clear_manifest_cache(&self) {
        self.state.cache_clears.fetch_add(1, Ordering::SeqCst);
    }

    fn install(&self, name: &str, version: Option<&str>) -> Result<Vec<InstalledRock>, EngineError> {
        self.record("install", name, version.unwrap_or_default().to_owned())?;
        Ok(vec![self.rock(name)])
    }

    fn remove(
        &self,
        name: &str,
        _version: Option<&str>,
        options: RemoveOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        self.record("remove", name, format!("force={}", options.force))?;
        Ok(vec![self.rock(name)])
    }

    fn build(
        &self,
        name: &str,
        _version: Option<&str>,
        options: BuildOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        self.record("build", name, format!("only_deps={}", options.only_deps))?;
        Ok(vec![self.rock(name)])
    }

    fn list(
        &self,
        pattern: Option<&str>,
        _version: Option<&str>,
        options: ListOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        self.record(
            "list",
            pattern.unwrap_or_default(),
            format!("outdated={} porcelain={}", options.outdated, options.porcelain),
        )?;
        Ok(Vec::new())
    }

    fn search(
        &self,
        pattern: Option<&str>,
        _version: Option<&str>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        self.record("search", pattern.unwrap_or_default(), String::new())?;
        Ok(Vec::new())
    }

    fn purge(&self, tree: &Path, options: PurgeOptions) -> Result<Vec<InstalledRock>, EngineError> {
        self.record(
            "purge",
            &tree.to_string_lossy(),
            format!("only_deps={} force={}", options.only_deps, options.force),
        )?;
        Ok(Vec::new())
    }

    fn fulfill_dependencies(
        &self,
        rockspec: &AnonymousRockspec,
        mode: DepsMode,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let deps = rockspec
            .dependencies
            .iter()
            .map(|d| d.name.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.record("fulfill", &rockspec.name, format!("{mode:?} {deps}"))?;
        Ok(rockspec
            .dependencies
            .iter()
            .map(|d| self.rock(d.name.as_str()))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

/// A log sink that keeps every message it receives.
#[derive(Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLog {
    fn info(&self, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((Level::Info, message.to_owned()));
    }

    fn warn(&self, message: &str) {
        self.entries
            .lock()
            .unwrap()
            .push((Level::Warn, message.to_owned()));
    }
}

pub fn shared_tree() -> PathBuf {
    PathBuf::from("/shared/tree")
}
