use crate::tree::TreeLayout;
use crate::EngineError;
use rockpit_schema::DEFAULT_LUA_ABI;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_SERVER: &str = "https://luarocks.org";

/// Process-wide engine configuration.
///
/// The engine owns one of these and reads it on every operation. The first
/// entry of `rocks_trees` is where installs land; later entries are only
/// consulted when checking whether a dependency is already present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub root_dir: PathBuf,
    pub rocks_trees: Vec<PathBuf>,
    pub deploy_lua_dir: PathBuf,
    pub deploy_lib_dir: PathBuf,
    pub deploy_bin_dir: PathBuf,
    /// Repositories in priority order.
    pub rocks_servers: Vec<String>,
    /// Rocks treated as installed without a tree entry.
    pub rocks_provided: BTreeMap<String, String>,
    pub lua_abi: String,
}

/// On-disk user settings, `engine.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct EngineSettings {
    #[serde(default)]
    servers: Option<Vec<String>>,
    #[serde(default)]
    user_tree: Option<PathBuf>,
}

impl EngineConfig {
    /// A configuration installing into `tree` and searching `servers`.
    pub fn new(tree: impl Into<PathBuf>, servers: Vec<String>) -> Self {
        let mut config = Self {
            root_dir: PathBuf::new(),
            rocks_trees: Vec::new(),
            deploy_lua_dir: PathBuf::new(),
            deploy_lib_dir: PathBuf::new(),
            deploy_bin_dir: PathBuf::new(),
            rocks_servers: servers,
            rocks_provided: BTreeMap::from([("lua".to_owned(), format!("{DEFAULT_LUA_ABI}-1"))]),
            lua_abi: DEFAULT_LUA_ABI.to_owned(),
        };
        config.use_tree(&tree.into());
        config
    }

    /// Point the install target (root and deploy directories) at `tree`,
    /// making it the only tree.
    pub fn use_tree(&mut self, tree: &Path) {
        let layout = TreeLayout::new(tree);
        self.root_dir = tree.to_path_buf();
        self.rocks_trees = vec![tree.to_path_buf()];
        self.deploy_lua_dir = layout.lua_dir(&self.lua_abi);
        self.deploy_lib_dir = layout.lib_dir(&self.lua_abi);
        self.deploy_bin_dir = layout.bin_dir();
    }

    /// The tree installs land in.
    pub fn install_tree(&self) -> TreeLayout {
        TreeLayout::new(&self.root_dir)
    }

    /// Load user settings from the default location, falling back to
    /// built-in defaults when the file is absent. `ROCKPIT_SERVERS`
    /// (comma separated) overrides the server list.
    pub fn load_default() -> Result<Self, EngineError> {
        let home = home_dir()?;
        let settings_path = config_dir(&home).join("rockpit").join("engine.toml");
        let mut config = Self::load(&settings_path, &home)?;
        if let Ok(servers) = std::env::var("ROCKPIT_SERVERS") {
            config.rocks_servers = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
        Ok(config)
    }

    pub fn load(path: &Path, home: &Path) -> Result<Self, EngineError> {
        let settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<EngineSettings>(&content).map_err(|e| EngineError::Metadata {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            EngineSettings::default()
        };

        let user_tree = settings
            .user_tree
            .map_or_else(|| home.join(".luarocks"), |t| expand_home(&t, home));
        let servers = settings
            .servers
            .unwrap_or_else(|| vec![DEFAULT_SERVER.to_owned()]);
        Ok(Self::new(user_tree, servers))
    }
}

fn home_dir() -> Result<PathBuf, EngineError> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| EngineError::Config("HOME not set".to_owned()))
}

fn config_dir(home: &Path) -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .unwrap_or_else(|| home.join(".config"))
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_points_every_path_at_tree() {
        let config = EngineConfig::new("/home/u/.luarocks", vec!["a".to_owned()]);
        assert_eq!(config.root_dir, Path::new("/home/u/.luarocks"));
        assert_eq!(config.rocks_trees, vec![PathBuf::from("/home/u/.luarocks")]);
        assert_eq!(
            config.deploy_lua_dir,
            Path::new("/home/u/.luarocks/share/lua/5.1")
        );
        assert_eq!(config.deploy_bin_dir, Path::new("/home/u/.luarocks/bin"));
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("engine.toml"), dir.path()).unwrap();
        assert_eq!(config.rocks_servers, vec![DEFAULT_SERVER.to_owned()]);
        assert_eq!(config.root_dir, dir.path().join(".luarocks"));
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "servers = [\"/srv/rocks\", \"https://mirror\"]\nuser_tree = \"~/trees/shared\"\n",
        )
        .unwrap();
        let config = EngineConfig::load(&path, dir.path()).unwrap();
        assert_eq!(config.rocks_servers, vec!["/srv/rocks", "https://mirror"]);
        assert_eq!(config.root_dir, dir.path().join("trees/shared"));
    }

    #[test]
    fn malformed_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "servers = 3\n").unwrap();
        assert!(matches!(
            EngineConfig::load(&path, dir.path()),
            Err(EngineError::Metadata { .. })
        ));
    }
}
