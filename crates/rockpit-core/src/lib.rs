//! Project-scoped orchestration of the package engine.
//!
//! This crate ties together project configuration and the engine boundary
//! into `Rocks`, the API behind every rockpit command. Each operation resolves
//! the project once, opens an overlay window that points the engine's global
//! configuration at the project tree, routes engine output into the log for
//! the duration of the call, and restores both on the way out, whether the
//! operation succeeded, failed, or panicked.

pub mod api;
pub mod flags;
pub mod fulfill;
pub mod overlay;
pub mod project;
pub mod redirect;

#[cfg(test)]
mod testing;

pub use api::{compare_versions, Rocks};
pub use flags::OperationFlags;
pub use fulfill::{fulfill, Fulfillment};
pub use overlay::{effective_repositories, overlay_config, OverlayGuard, OverlayWindow};
pub use project::{normalize_path, ProjectContext, TREE_DIR};
pub use redirect::{LogSink, OutputRedirect, TracingSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] rockpit_schema::ConfigError),
    #[error("specifier error: {0}")]
    Parse(#[from] rockpit_schema::ParseError),
    #[error(transparent)]
    Engine(#[from] rockpit_engine::EngineError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
