//! Directory repositories.
//!
//! A repository is a directory laid out as `<name>/<version>/rock.toml`, with
//! the module sources the rockspec names stored next to it. `file://` URLs
//! are accepted; `http(s)://` repositories cannot be read by this engine and
//! scan as unreachable.

use crate::EngineError;
use rockpit_schema::{DependencySpec, ParseError, RockVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ROCKSPEC_FILE: &str = "rock.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Rockspec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Module name (`inspect`, `lume.util`) to source file relative to the
    /// rockspec directory.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Rockspec {
    pub fn parse_dependencies(&self) -> Result<Vec<DependencySpec>, ParseError> {
        self.dependencies
            .iter()
            .map(|d| DependencySpec::parse(d))
            .collect()
    }
}

/// One installable rock version found in a repository.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub spec: Rockspec,
    pub version: RockVersion,
    pub dependencies: Vec<DependencySpec>,
    pub dir: PathBuf,
    pub repository: String,
}

/// Filesystem location of a repository, or `None` for remote ones.
pub fn local_path(repository: &str) -> Option<PathBuf> {
    if repository.starts_with("http://") || repository.starts_with("https://") {
        return None;
    }
    let path = repository.strip_prefix("file://").unwrap_or(repository);
    Some(PathBuf::from(path))
}

/// Result of reading one repository.
#[derive(Debug, Default)]
pub struct Scan {
    pub candidates: Vec<Candidate>,
    /// Rockspecs that could not be read. They are left out of
    /// `candidates`.
    pub rejected: Vec<EngineError>,
}

/// Read every rockspec in `repository`. `Ok(None)` means the repository
/// cannot be reached (remote, or no such directory).
pub fn scan(repository: &str) -> Result<Option<Scan>, EngineError> {
    let Some(root) = local_path(repository) else {
        return Ok(None);
    };
    if !root.is_dir() {
        return Ok(None);
    }

    let mut found = Scan::default();
    for name_entry in std::fs::read_dir(&root)? {
        let name_entry = name_entry?;
        if !name_entry.file_type()?.is_dir() {
            continue;
        }
        for version_entry in std::fs::read_dir(name_entry.path())? {
            let dir = version_entry?.path();
            let spec_path = dir.join(ROCKSPEC_FILE);
            if !spec_path.is_file() {
                continue;
            }
            match read_candidate(&spec_path, &dir, repository) {
                Ok(candidate) => found.candidates.push(candidate),
                Err(e) => found.rejected.push(e),
            }
        }
    }
    found.candidates.sort_by(|a, b| {
        a.spec
            .name
            .cmp(&b.spec.name)
            .then_with(|| b.version.cmp(&a.version))
    });
    Ok(Some(found))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// `lume`, `lume.util`: dot-separated segments of `[A-Za-z0-9_-]`.
fn valid_module_name(module: &str) -> bool {
    module.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    })
}

fn valid_source(source: &str) -> bool {
    let path = Path::new(source);
    !source.is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

fn check_layout(spec: &Rockspec, dir: &Path) -> Result<(), String> {
    let named = DependencySpec::parse(&spec.name).ok();
    if !named.is_some_and(|d| d.constraints.is_empty() && d.name.as_str() == spec.name) {
        return Err(format!("invalid rock name '{}'", spec.name));
    }
    if dir.parent().and_then(file_name) != Some(spec.name.as_str()) {
        return Err(format!(
            "rock '{}' is not stored under a directory of that name",
            spec.name
        ));
    }
    if file_name(dir) != Some(spec.version.as_str()) {
        return Err(format!(
            "version '{}' is not stored under a directory of that name",
            spec.version
        ));
    }
    for (module, source) in &spec.modules {
        if !valid_module_name(module) {
            return Err(format!("invalid module name '{module}'"));
        }
        if !valid_source(source) {
            return Err(format!(
                "module '{module}' source '{source}' is outside the rock directory"
            ));
        }
    }
    Ok(())
}

fn read_candidate(spec_path: &Path, dir: &Path, repository: &str) -> Result<Candidate, EngineError> {
    let metadata_error = |message: String| EngineError::Metadata {
        path: spec_path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(spec_path)?;
    let spec: Rockspec = toml::from_str(&content).map_err(|e| metadata_error(e.to_string()))?;
    check_layout(&spec, dir).map_err(metadata_error)?;
    let version = RockVersion::parse(&spec.version).map_err(|e| metadata_error(e.to_string()))?;
    let dependencies = spec
        .parse_dependencies()
        .map_err(|e| metadata_error(e.to_string()))?;
    Ok(Candidate {
        spec,
        version,
        dependencies,
        dir: dir.to_path_buf(),
        repository: repository.to_owned(),
    })
}
