use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the project configuration, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "rockpit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read project configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse project configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unknown runtime version '{0}'")]
    UnknownRuntime(String),
    #[error("project.name must not be empty")]
    EmptyProjectName,
    #[error("repositories.extra entries must not be empty")]
    EmptyRepository,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub dependencies: DependenciesSection,
    #[serde(default)]
    pub repositories: RepositoriesSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
    /// Target runtime version; must appear in the known-runtime table.
    #[serde(default)]
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DependenciesSection {
    /// Dependency specifiers, e.g. `"inspect >= 3.1"`. Parsed lazily by `deps`.
    #[serde(default)]
    pub rocks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepositoriesSection {
    /// Searched before the runtime's implied repositories and the engine defaults.
    #[serde(default)]
    pub extra: Vec<String>,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.project.name {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyProjectName);
            }
        }
        if self.repositories.extra.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::EmptyRepository);
        }
        Ok(())
    }
}

pub fn parse_project_str(input: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_project_file(path: impl AsRef<Path>) -> Result<ProjectConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_project_str(&content)
}

/// Load the configuration at `path`, treating a missing file as the default
/// (empty) configuration.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    if path.exists() {
        parse_project_file(path)
    } else {
        Ok(ProjectConfig::default())
    }
}
