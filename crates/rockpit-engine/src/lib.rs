//! The package engine rockpit drives.
//!
//! This crate implements the engine boundary: the `PackageEngine` trait with
//! its process-wide `EngineConfig` and swappable output sinks, the option and
//! record types exchanged across it, the rock tree layout, and `LocalEngine`,
//! an engine that resolves rocks from directory repositories.

pub mod config;
pub mod engine;
pub mod local;
pub mod output;
pub mod repository;
pub mod tree;

pub use config::EngineConfig;
pub use engine::{
    select_engine, AnonymousRockspec, BuildOptions, DepsMode, InstalledRock, ListOptions,
    PackageEngine, PurgeOptions, RemoveOptions, SearchResult,
};
pub use local::LocalEngine;
pub use output::{OutputSinks, Sink};
pub use tree::TreeLayout;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine '{0}' is not available")]
    UnknownEngine(String),
    #[error("invalid metadata in {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },
    #[error("no repository provides a rock matching '{0}'")]
    NoCandidate(String),
    #[error("could not satisfy dependencies of '{rock}': {}", failures.join("; "))]
    Unsatisfied { rock: String, failures: Vec<String> },
    #[error("rock '{0}' is not installed")]
    NotInstalled(String),
    #[error("cannot remove '{name}': needed by {}", dependents.join(", "))]
    HasDependents {
        name: String,
        dependents: Vec<String>,
    },
    #[error("build of '{name}' failed: {reason}")]
    BuildFailed { name: String, reason: String },
    #[error(transparent)]
    Parse(#[from] rockpit_schema::ParseError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
}
