use crate::CoreError;
use rockpit_engine::TreeLayout;
use rockpit_schema::{load_project_config, ProjectConfig, VersionInfo, PROJECT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project-local tree directory, relative to the project root.
pub const TREE_DIR: &str = "rocks";

/// A resolved project: where it lives, where its rocks go, and what its
/// configuration implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    root: PathBuf,
    tree: PathBuf,
    name: String,
    config: ProjectConfig,
    version: VersionInfo,
}

impl ProjectContext {
    /// Resolve the project rooted at `dir`. A missing `rockpit.toml` means
    /// defaults; an invalid one fails with a configuration error.
    pub fn resolve(dir: &Path) -> Result<Self, CoreError> {
        let root = normalize_path(dir)?;
        let config = load_project_config(&root.join(PROJECT_CONFIG_FILE))?;
        let version = VersionInfo::from_config(&config)?;
        let name = config
            .project
            .name
            .clone()
            .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "project".to_owned());
        let tree = root.join(TREE_DIR);
        debug!("resolved project '{name}' at {}", root.display());
        Ok(Self {
            root,
            tree,
            name,
            config,
            version,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The project-local tree, always `<root>/rocks`.
    pub fn tree(&self) -> &Path {
        &self.tree
    }

    /// Where pure Lua modules land, for pointing a runtime's search path at.
    pub fn module_dir(&self) -> PathBuf {
        TreeLayout::new(&self.tree).lua_dir(&self.version.lua_abi)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn ensure_tree(&self) -> Result<(), CoreError> {
        if !self.tree.is_dir() {
            std::fs::create_dir_all(&self.tree)?;
        }
        Ok(())
    }
}

/// Expand a leading `~/` and make `path` absolute against the current
/// directory. Does not touch the filesystem beyond reading the cwd.
pub fn normalize_path(path: &Path) -> Result<PathBuf, CoreError> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };
    Ok(clean(&absolute))
}

// Drops `.` components and folds `..` lexically.
fn clean(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_config_uses_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("mygame");
        std::fs::create_dir(&project).unwrap();

        let ctx = ProjectContext::resolve(&project).unwrap();
        assert_eq!(ctx.name(), "mygame");
        assert_eq!(ctx.tree(), project.join("rocks"));
        assert!(ctx.version().runtime.is_none());
        assert_eq!(ctx.module_dir(), project.join("rocks/share/lua/5.1"));
    }

    #[test]
    fn resolve_reads_name_and_runtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[project]\nname = \"space\"\nruntime = \"0.10.2\"\n",
        )
        .unwrap();
        let ctx = ProjectContext::resolve(dir.path()).unwrap();
        assert_eq!(ctx.name(), "space");
        assert_eq!(ctx.version().repositories.len(), 1);
    }

    #[test]
    fn resolve_rejects_unknown_runtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[project]\nruntime = \"99\"\n",
        )
        .unwrap();
        let err = ProjectContext::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn ensure_tree_creates_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::resolve(dir.path()).unwrap();
        assert!(!ctx.tree().exists());
        ctx.ensure_tree().unwrap();
        ctx.ensure_tree().unwrap();
        assert!(ctx.tree().is_dir());
    }

    #[test]
    fn normalize_folds_dots() {
        let p = normalize_path(Path::new("/a/./b/../c")).unwrap();
        assert_eq!(p, Path::new("/a/c"));
    }

    #[test]
    fn normalize_makes_relative_absolute() {
        let p = normalize_path(Path::new("some/project")).unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("some/project"));
    }
}
