use std::path::{Path, PathBuf};

/// File recording one installed rock inside its version directory.
pub const ROCK_MANIFEST: &str = "rock_manifest.toml";

/// Directory layout of a rock tree.
///
/// Installed rock metadata lives under `lib/rocks/<name>/<version>/`, pure
/// Lua modules under `share/lua/<abi>/`, native modules under `lib/lua/<abi>/`,
/// and scripts under `bin/`. Nothing is created until an install needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLayout {
    root: PathBuf,
}

impl TreeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn rocks_dir(&self) -> PathBuf {
        self.root.join("lib").join("rocks")
    }

    #[inline]
    pub fn rock_dir(&self, name: &str) -> PathBuf {
        self.rocks_dir().join(name)
    }

    #[inline]
    pub fn rock_version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.rock_dir(name).join(version)
    }

    #[inline]
    pub fn rock_manifest(&self, name: &str, version: &str) -> PathBuf {
        self.rock_version_dir(name, version).join(ROCK_MANIFEST)
    }

    #[inline]
    pub fn lua_root(&self) -> PathBuf {
        self.root.join("share").join("lua")
    }

    #[inline]
    pub fn lua_dir(&self, abi: &str) -> PathBuf {
        self.lua_root().join(abi)
    }

    #[inline]
    pub fn lib_dir(&self, abi: &str) -> PathBuf {
        self.root.join("lib").join("lua").join(abi)
    }

    #[inline]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Every `(name, version)` pair with a manifest in this tree, sorted.
    pub fn installed_entries(&self) -> std::io::Result<Vec<(String, String)>> {
        let rocks_dir = self.rocks_dir();
        let mut entries = Vec::new();
        if !rocks_dir.is_dir() {
            return Ok(entries);
        }
        for name_entry in std::fs::read_dir(&rocks_dir)? {
            let name_entry = name_entry?;
            if !name_entry.file_type()?.is_dir() {
                continue;
            }
            let name = name_entry.file_name().to_string_lossy().into_owned();
            for version_entry in std::fs::read_dir(name_entry.path())? {
                let version_entry = version_entry?;
                if version_entry.path().join(ROCK_MANIFEST).is_file() {
                    let version = version_entry.file_name().to_string_lossy().into_owned();
                    entries.push((name.clone(), version));
                }
            }
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_rooted() {
        let layout = TreeLayout::new("/project/rocks");
        assert_eq!(layout.rocks_dir(), Path::new("/project/rocks/lib/rocks"));
        assert_eq!(
            layout.rock_manifest("inspect", "3.1.3-0"),
            Path::new("/project/rocks/lib/rocks/inspect/3.1.3-0/rock_manifest.toml")
        );
        assert_eq!(layout.lua_dir("5.1"), Path::new("/project/rocks/share/lua/5.1"));
        assert_eq!(layout.lib_dir("5.1"), Path::new("/project/rocks/lib/lua/5.1"));
        assert_eq!(layout.bin_dir(), Path::new("/project/rocks/bin"));
    }

    #[test]
    fn installed_entries_of_missing_tree_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = TreeLayout::new(dir.path().join("absent"));
        assert!(layout.installed_entries().unwrap().is_empty());
    }

    #[test]
    fn installed_entries_skip_dirs_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let layout = TreeLayout::new(dir.path());
        std::fs::create_dir_all(layout.rock_version_dir("lume", "2.3.0-1")).unwrap();
        std::fs::write(layout.rock_manifest("lume", "2.3.0-1"), "").unwrap();
        std::fs::create_dir_all(layout.rock_version_dir("half", "1.0-1")).unwrap();

        let entries = layout.installed_entries().unwrap();
        assert_eq!(entries, vec![("lume".to_owned(), "2.3.0-1".to_owned())]);
    }
}
