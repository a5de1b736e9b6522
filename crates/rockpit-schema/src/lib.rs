//! Project configuration, runtime version resolution, and dependency
//! specifiers for rockpit.
//!
//! This crate defines the schema layer: TOML project configuration parsing
//! (`ProjectConfig`), the known-runtime table and the defaults each runtime
//! implies (`VersionInfo`), dependency specifier parsing (`DependencySpec`),
//! and rock version ordering (`RockVersion`, `compare_versions`).

pub mod dependency;
pub mod project;
pub mod runtime;
pub mod types;
pub mod version;

pub use dependency::{Constraint, DependencySpec, Operator, ParseError};
pub use project::{
    load_project_config, parse_project_file, parse_project_str, ConfigError, DependenciesSection,
    ProjectConfig, ProjectSection, RepositoriesSection, PROJECT_CONFIG_FILE,
};
pub use runtime::{known_runtimes, resolve_version, VersionInfo, DEFAULT_LUA_ABI};
pub use types::{RockName, RuntimeVersion};
pub use version::{compare_versions, RockVersion};
