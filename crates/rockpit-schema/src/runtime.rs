//! Target runtime resolution.
//!
//! A project names the runtime version it targets. Each known version maps to
//! the Lua ABI its modules are installed for, the extra repositories carrying
//! rocks built for it, and the virtual rocks the runtime itself provides.

use crate::project::{load_project_config, ConfigError, ProjectConfig};
use crate::types::RuntimeVersion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Lua ABI used when no runtime is configured.
pub const DEFAULT_LUA_ABI: &str = "5.1";

/// Virtual rock name under which the runtime itself is provided.
const RUNTIME_ROCK: &str = "love";

struct KnownRuntime {
    version: &'static str,
    lua_abi: &'static str,
    repositories: &'static [&'static str],
}

const LOVE_09_REPOS: &[&str] = &["https://luarocks.org/m/love-0.9"];
const LOVE_010_REPOS: &[&str] = &["https://luarocks.org/m/love-0.10"];

const fn known(
    version: &'static str,
    lua_abi: &'static str,
    repositories: &'static [&'static str],
) -> KnownRuntime {
    KnownRuntime {
        version,
        lua_abi,
        repositories,
    }
}

const KNOWN_RUNTIMES: &[KnownRuntime] = &[
    known("0.9.0", "5.1", LOVE_09_REPOS),
    known("0.9.1", "5.1", LOVE_09_REPOS),
    known("0.9.2", "5.1", LOVE_09_REPOS),
    known("0.10.0", "5.1", LOVE_010_REPOS),
    known("0.10.1", "5.1", LOVE_010_REPOS),
    known("0.10.2", "5.1", LOVE_010_REPOS),
    known("11.0", "5.1", &[]),
    known("11.1", "5.1", &[]),
    known("11.2", "5.1", &[]),
    known("11.3", "5.1", &[]),
    known("11.4", "5.1", &[]),
    known("11.5", "5.1", &[]),
];

/// Versions accepted in `project.runtime`, oldest first.
pub fn known_runtimes() -> impl Iterator<Item = &'static str> {
    KNOWN_RUNTIMES.iter().map(|r| r.version)
}

/// Defaults implied by a project's target runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub runtime: Option<RuntimeVersion>,
    pub lua_abi: String,
    /// Repositories searched after the project's own extras.
    pub repositories: Vec<String>,
    /// Rocks treated as installed, name to version (`love = "11.4-1"`).
    pub provided: BTreeMap<String, String>,
}

impl VersionInfo {
    pub fn for_runtime(runtime: Option<&str>) -> Result<Self, ConfigError> {
        let Some(requested) = runtime else {
            return Ok(Self {
                runtime: None,
                lua_abi: DEFAULT_LUA_ABI.to_owned(),
                repositories: Vec::new(),
                provided: lua_provided(DEFAULT_LUA_ABI),
            });
        };

        let requested = requested.trim();
        let known = KNOWN_RUNTIMES
            .iter()
            .find(|r| r.version == requested)
            .ok_or_else(|| ConfigError::UnknownRuntime(requested.to_owned()))?;

        let mut provided = lua_provided(known.lua_abi);
        provided.insert(RUNTIME_ROCK.to_owned(), format!("{}-1", known.version));

        Ok(Self {
            runtime: Some(RuntimeVersion::new(known.version)),
            lua_abi: known.lua_abi.to_owned(),
            repositories: known.repositories.iter().map(|r| (*r).to_owned()).collect(),
            provided,
        })
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self, ConfigError> {
        Self::for_runtime(config.project.runtime.as_deref())
    }
}

fn lua_provided(abi: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("lua".to_owned(), format!("{abi}-1"))])
}

/// Read the project configuration at `path` (absent means defaults) and
/// derive its runtime defaults.
pub fn resolve_version(path: &Path) -> Result<VersionInfo, ConfigError> {
    let config = load_project_config(path)?;
    VersionInfo::from_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PROJECT_CONFIG_FILE;

    #[test]
    fn no_runtime_uses_default_abi() {
        let info = VersionInfo::for_runtime(None).unwrap();
        assert!(info.runtime.is_none());
        assert_eq!(info.lua_abi, DEFAULT_LUA_ABI);
        assert!(info.repositories.is_empty());
        assert_eq!(info.provided.get("lua").map(String::as_str), Some("5.1-1"));
        assert!(!info.provided.contains_key("love"));
    }

    #[test]
    fn old_runtime_implies_compat_repository() {
        let info = VersionInfo::for_runtime(Some("0.10.2")).unwrap();
        assert_eq!(info.repositories, vec!["https://luarocks.org/m/love-0.10"]);
        assert_eq!(info.provided.get("love").map(String::as_str), Some("0.10.2-1"));
    }

    #[test]
    fn current_runtime_has_no_extra_repository() {
        let info = VersionInfo::for_runtime(Some("11.4")).unwrap();
        assert_eq!(info.runtime.as_ref().unwrap(), "11.4");
        assert!(info.repositories.is_empty());
    }

    #[test]
    fn unknown_runtime_names_the_value() {
        let err = VersionInfo::for_runtime(Some("12.7")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRuntime(ref v) if v == "12.7"));
        assert!(err.to_string().contains("12.7"));
    }

    #[test]
    fn resolve_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "[project]\nruntime = \"0.9.2\"\n").unwrap();
        let info = resolve_version(&path).unwrap();
        assert_eq!(info.repositories, vec!["https://luarocks.org/m/love-0.9"]);
    }

    #[test]
    fn resolve_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = resolve_version(&dir.path().join(PROJECT_CONFIG_FILE)).unwrap();
        assert_eq!(info, VersionInfo::for_runtime(None).unwrap());
    }

    #[test]
    fn resolve_rejects_malformed_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&path, "[project]\nruntime = \"eleven\"\n").unwrap();
        assert!(matches!(
            resolve_version(&path),
            Err(ConfigError::UnknownRuntime(_))
        ));
    }

    #[test]
    fn known_runtimes_are_listed_in_order() {
        let all: Vec<_> = known_runtimes().collect();
        assert_eq!(all.first(), Some(&"0.9.0"));
        assert_eq!(all.last(), Some(&"11.5"));
    }
}
