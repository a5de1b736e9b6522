use crate::config::EngineConfig;
use crate::engine::{
    AnonymousRockspec, BuildOptions, DepsMode, InstalledRock, ListOptions, PackageEngine,
    PurgeOptions, RemoveOptions, SearchResult,
};
use crate::output::OutputSinks;
use crate::repository::{self, Candidate};
use crate::tree::TreeLayout;
use crate::EngineError;
use rockpit_schema::{compare_versions, DependencySpec, RockName, RockVersion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const NATIVE_EXTENSIONS: &[&str] = &["so", "dll", "dylib"];

/// Record written into a tree for each installed rock.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstalledManifest {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
    /// Deployed files, relative to the tree root.
    #[serde(default)]
    files: Vec<PathBuf>,
    explicit: bool,
    repository: String,
    installed_at: String,
}

impl InstalledManifest {
    fn to_rock(&self, tree: &Path) -> InstalledRock {
        InstalledRock {
            name: RockName::new(&self.name),
            version: self.version.clone(),
            tree: tree.to_path_buf(),
            explicit: self.explicit,
            latest: None,
        }
    }

    fn dependency_specs(&self) -> impl Iterator<Item = DependencySpec> + '_ {
        self.dependencies
            .iter()
            .filter_map(|d| DependencySpec::parse(d).ok())
    }
}

type RepositoryIndex = Option<Arc<Vec<Candidate>>>;

/// Engine resolving rocks from directory repositories.
///
/// Repository indexes are cached per repository string until
/// [`clear_manifest_cache`](PackageEngine::clear_manifest_cache).
pub struct LocalEngine {
    config: Mutex<EngineConfig>,
    output: Mutex<OutputSinks>,
    manifests: Mutex<HashMap<String, RepositoryIndex>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn requested(name: &str, version: Option<&str>) -> Result<DependencySpec, EngineError> {
    let spec = match version {
        Some(v) => format!("{name} == {v}"),
        None => name.to_owned(),
    };
    Ok(DependencySpec::parse(&spec)?)
}

fn read_manifest(path: &Path) -> Result<InstalledManifest, EngineError> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| EngineError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn write_manifest(path: &Path, manifest: &InstalledManifest) -> Result<(), EngineError> {
    let content = toml::to_string_pretty(manifest).map_err(|e| EngineError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content)?;
    Ok(())
}

fn installed_in(layout: &TreeLayout) -> Result<Vec<InstalledManifest>, EngineError> {
    layout
        .installed_entries()?
        .into_iter()
        .map(|(name, version)| read_manifest(&layout.rock_manifest(&name, &version)))
        .collect()
}

/// Delete a rock's files and manifest. Files also listed by a rock in
/// `kept` stay on disk.
fn remove_installed(
    layout: &TreeLayout,
    manifest: &InstalledManifest,
    kept: &[InstalledManifest],
) -> Result<(), EngineError> {
    for file in &manifest.files {
        if kept.iter().any(|other| other.files.contains(file)) {
            debug!("keeping {}, still owned by another rock", file.display());
            continue;
        }
        let path = layout.root().join(file);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    let version_dir = layout.rock_version_dir(&manifest.name, &manifest.version);
    if version_dir.exists() {
        std::fs::remove_dir_all(&version_dir)?;
    }
    let rock_dir = layout.rock_dir(&manifest.name);
    if rock_dir.is_dir() && std::fs::read_dir(&rock_dir)?.next().is_none() {
        std::fs::remove_dir(&rock_dir)?;
    }
    Ok(())
}

fn satisfied_by(dep: &DependencySpec, installed: &[&InstalledManifest], config: &EngineConfig) -> bool {
    config
        .rocks_provided
        .get(dep.name.as_str())
        .is_some_and(|v| dep.matches_str(v))
        || installed
            .iter()
            .any(|m| m.name == dep.name.as_str() && dep.matches_str(&m.version))
}

impl LocalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Mutex::new(config),
            output: Mutex::new(OutputSinks::stdio()),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    fn output(&self) -> OutputSinks {
        guard(&self.output).clone()
    }

    fn index(&self, repo: &str, out: &OutputSinks) -> Result<RepositoryIndex, EngineError> {
        if let Some(cached) = guard(&self.manifests).get(repo) {
            return Ok(cached.clone());
        }
        let scanned = match repository::scan(repo)? {
            Some(found) => {
                for rejected in &found.rejected {
                    out.warn(&format!("Warning: skipping rockspec in {repo}: {rejected}"));
                }
                debug!("indexed {} rocks from {repo}", found.candidates.len());
                Some(Arc::new(found.candidates))
            }
            None => {
                out.warn(&format!("Warning: repository {repo} is not reachable, skipping"));
                None
            }
        };
        guard(&self.manifests).insert(repo.to_owned(), scanned.clone());
        Ok(scanned)
    }

    /// Candidates for `name` in repository order, newest first within each.
    fn candidates(
        &self,
        config: &EngineConfig,
        out: &OutputSinks,
        name: &str,
    ) -> Result<Vec<Candidate>, EngineError> {
        let mut found = Vec::new();
        for repo in &config.rocks_servers {
            if let Some(index) = self.index(repo, out)? {
                found.extend(index.iter().filter(|c| c.spec.name == name).cloned());
            }
        }
        Ok(found)
    }

    /// Newest candidate matching `dep`. Equal versions resolve to the
    /// first-listed repository.
    fn best(
        &self,
        config: &EngineConfig,
        out: &OutputSinks,
        dep: &DependencySpec,
    ) -> Result<Option<Candidate>, EngineError> {
        let mut best: Option<Candidate> = None;
        for candidate in self.candidates(config, out, &dep.name)? {
            if !dep.matches(&candidate.version) {
                continue;
            }
            if best.as_ref().map_or(true, |b| candidate.version > b.version) {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    fn is_satisfied(&self, config: &EngineConfig, dep: &DependencySpec) -> Result<bool, EngineError> {
        let mut installed = Vec::new();
        for tree in &config.rocks_trees {
            installed.extend(installed_in(&TreeLayout::new(tree))?);
        }
        let refs: Vec<&InstalledManifest> = installed.iter().collect();
        Ok(satisfied_by(dep, &refs, config))
    }

    fn install_dependencies(
        &self,
        config: &EngineConfig,
        out: &OutputSinks,
        rock: &str,
        dependencies: &[DependencySpec],
        explicit: bool,
        stack: &mut Vec<String>,
        installed: &mut Vec<InstalledRock>,
    ) -> Result<(), EngineError> {
        let mut failures = Vec::new();
        for dep in dependencies {
            if self.is_satisfied(config, dep)? {
                continue;
            }
            match self.best(config, out, dep)? {
                None => failures.push(format!("no rock matches '{dep}'")),
                Some(candidate) => {
                    if let Err(e) =
                        self.install_candidate(config, out, &candidate, explicit, stack, installed)
                    {
                        failures.push(e.to_string());
                    }
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Unsatisfied {
                rock: rock.to_owned(),
                failures,
            })
        }
    }

    fn install_candidate(
        &self,
        config: &EngineConfig,
        out: &OutputSinks,
        candidate: &Candidate,
        explicit: bool,
        stack: &mut Vec<String>,
        installed: &mut Vec<InstalledRock>,
    ) -> Result<(), EngineError> {
        if stack.contains(&candidate.spec.name) {
            return Ok(());
        }
        stack.push(candidate.spec.name.clone());
        let result = self
            .install_dependencies(
                config,
                out,
                &candidate.spec.name,
                &candidate.dependencies,
                false,
                stack,
                installed,
            )
            .and_then(|()| deploy(config, out, candidate, explicit));
        stack.pop();
        if let Some(rock) = result? {
            installed.push(rock);
        }
        Ok(())
    }

    fn install_resolved(
        &self,
        config: &EngineConfig,
        out: &OutputSinks,
        candidate: &Candidate,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let mut installed = Vec::new();
        self.install_candidate(config, out, candidate, true, &mut Vec::new(), &mut installed)?;
        Ok(installed)
    }
}

/// Copy a candidate's modules into the install tree and record it. Returns
/// `None` when that exact version is already present.
fn deploy(
    config: &EngineConfig,
    out: &OutputSinks,
    candidate: &Candidate,
    explicit: bool,
) -> Result<Option<InstalledRock>, EngineError> {
    let layout = config.install_tree();
    let name = &candidate.spec.name;
    let version = &candidate.spec.version;
    let manifest_path = layout.rock_manifest(name, version);

    if manifest_path.is_file() {
        let mut existing = read_manifest(&manifest_path)?;
        if explicit && !existing.explicit {
            existing.explicit = true;
            write_manifest(&manifest_path, &existing)?;
        }
        out.print(&format!("{name} {version} is already installed"));
        return Ok(None);
    }

    out.print(&format!("Installing {name} {version} from {}", candidate.repository));
    let mut files = Vec::new();
    for (module, source) in &candidate.spec.modules {
        let source_path = candidate.dir.join(source);
        let extension = Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("lua");
        let base = if NATIVE_EXTENSIONS.contains(&extension) {
            &config.deploy_lib_dir
        } else {
            &config.deploy_lua_dir
        };
        let mut dest = base.join(module.replace('.', "/"));
        dest.set_extension(extension);
        if !dest.starts_with(base) {
            return Err(EngineError::BuildFailed {
                name: name.clone(),
                reason: format!("module '{module}' would be installed outside {}", base.display()),
            });
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source_path, &dest)?;
        files.push(
            dest.strip_prefix(layout.root())
                .map_or_else(|_| dest.clone(), Path::to_path_buf),
        );
    }

    let manifest = InstalledManifest {
        name: name.clone(),
        version: version.clone(),
        dependencies: candidate.spec.dependencies.clone(),
        files,
        explicit,
        repository: candidate.repository.clone(),
        installed_at: chrono::Utc::now().to_rfc3339(),
    };
    std::fs::create_dir_all(layout.rock_version_dir(name, version))?;
    write_manifest(&manifest_path, &manifest)?;
    out.print(&format!(
        "{name} {version} is now installed in {}",
        layout.root().display()
    ));
    Ok(Some(manifest.to_rock(layout.root())))
}

impl PackageEngine for LocalEngine {
    fn name(&self) -> &'static str {
        "local"
    }

    fn config(&self) -> EngineConfig {
        guard(&self.config).clone()
    }

    fn set_config(&self, config: EngineConfig) {
        *guard(&self.config) = config;
    }

    fn swap_output(&self, sinks: OutputSinks) -> OutputSinks {
        std::mem::replace(&mut *guard(&self.output), sinks)
    }

    fn clear_manifest_cache(&self) {
        guard(&self.manifests).clear();
    }

    fn install(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let config = self.config();
        let out = self.output();
        let spec = requested(name, version)?;
        let candidate = self
            .best(&config, &out, &spec)?
            .ok_or_else(|| EngineError::NoCandidate(spec.to_string()))?;
        self.install_resolved(&config, &out, &candidate)
    }

    fn remove(
        &self,
        name: &str,
        version: Option<&str>,
        options: RemoveOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let config = self.config();
        let out = self.output();
        let layout = config.install_tree();
        let spec = requested(name, version)?;

        let (targets, remaining): (Vec<_>, Vec<_>) = installed_in(&layout)?
            .into_iter()
            .partition(|m| m.name == spec.name.as_str() && spec.matches_str(&m.version));
        if targets.is_empty() {
            return Err(EngineError::NotInstalled(spec.to_string()));
        }

        let remaining_refs: Vec<&InstalledManifest> = remaining.iter().collect();
        let dependents: Vec<String> = remaining
            .iter()
            .filter(|m| {
                m.dependency_specs().any(|dep| {
                    dep.name == spec.name && !satisfied_by(&dep, &remaining_refs, &config)
                })
            })
            .map(|m| format!("{} {}", m.name, m.version))
            .collect();
        if !dependents.is_empty() {
            if !options.force {
                return Err(EngineError::HasDependents {
                    name: spec.name.into_inner(),
                    dependents,
                });
            }
            out.warn(&format!(
                "Warning: forcing removal of {name}, still needed by {}",
                dependents.join(", ")
            ));
        }

        let mut removed = Vec::new();
        for manifest in &targets {
            out.print(&format!("Removing {} {}", manifest.name, manifest.version));
            remove_installed(&layout, manifest, &remaining)?;
            removed.push(manifest.to_rock(layout.root()));
        }
        Ok(removed)
    }

    fn build(
        &self,
        name: &str,
        version: Option<&str>,
        options: BuildOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let config = self.config();
        let out = self.output();
        let spec = requested(name, version)?;
        let candidate = self
            .best(&config, &out, &spec)?
            .ok_or_else(|| EngineError::NoCandidate(spec.to_string()))?;

        if options.only_deps {
            let mut installed = Vec::new();
            self.install_dependencies(
                &config,
                &out,
                &candidate.spec.name,
                &candidate.dependencies,
                false,
                &mut vec![candidate.spec.name.clone()],
                &mut installed,
            )?;
            out.print(&format!(
                "Dependencies for {} {} installed",
                candidate.spec.name, candidate.spec.version
            ));
            return Ok(installed);
        }

        if let Some(missing) = candidate
            .spec
            .modules
            .values()
            .find(|source| !candidate.dir.join(source).is_file())
        {
            return Err(EngineError::BuildFailed {
                name: candidate.spec.name.clone(),
                reason: format!("missing source file '{missing}'"),
            });
        }
        out.print(&format!(
            "Building {} {}",
            candidate.spec.name, candidate.spec.version
        ));
        self.install_resolved(&config, &out, &candidate)
    }

    fn list(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
        options: ListOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let config = self.config();
        let out = self.output();
        let wanted_version = version.map(RockVersion::parse).transpose()?;

        let mut rocks = Vec::new();
        for tree in &config.rocks_trees {
            for manifest in installed_in(&TreeLayout::new(tree))? {
                if pattern.is_some_and(|p| !manifest.name.contains(p)) {
                    continue;
                }
                if let Some(wanted) = &wanted_version {
                    if RockVersion::parse(&manifest.version).ok().as_ref() != Some(wanted) {
                        continue;
                    }
                }
                let mut rock = manifest.to_rock(tree);
                if options.outdated {
                    let newest = self.best(&config, &out, &requested(&manifest.name, None)?)?;
                    match newest {
                        Some(c) if compare_versions(&manifest.version, &c.spec.version) => {
                            rock.latest = Some(c.spec.version);
                        }
                        _ => continue,
                    }
                }
                rocks.push(rock);
            }
        }

        if options.porcelain {
            for rock in &rocks {
                let status = rock.latest.as_deref().unwrap_or("installed");
                out.print(&format!(
                    "{}\t{}\t{status}\t{}",
                    rock.name,
                    rock.version,
                    rock.tree.display()
                ));
            }
        } else {
            let title = if options.outdated {
                "Outdated rocks:"
            } else {
                "Installed rocks:"
            };
            out.print(title);
            for rock in &rocks {
                match &rock.latest {
                    Some(latest) => out.print(&format!("   {} {} < {latest}", rock.name, rock.version)),
                    None => out.print(&format!(
                        "   {} {} (installed) - {}",
                        rock.name,
                        rock.version,
                        rock.tree.display()
                    )),
                }
            }
        }
        Ok(rocks)
    }

    fn search(
        &self,
        pattern: Option<&str>,
        version: Option<&str>,
    ) -> Result<Vec<SearchResult>, EngineError> {
        let config = self.config();
        let out = self.output();
        let wanted_version = version.map(RockVersion::parse).transpose()?;

        let mut results: Vec<(RockVersion, SearchResult)> = Vec::new();
        for repo in &config.rocks_servers {
            let Some(index) = self.index(repo, &out)? else {
                continue;
            };
            for candidate in index.iter() {
                if pattern.is_some_and(|p| !candidate.spec.name.contains(p)) {
                    continue;
                }
                if wanted_version.as_ref().is_some_and(|w| *w != candidate.version) {
                    continue;
                }
                results.push((
                    candidate.version.clone(),
                    SearchResult {
                        name: RockName::new(&candidate.spec.name),
                        version: candidate.spec.version.clone(),
                        repository: repo.clone(),
                    },
                ));
            }
        }
        results.sort_by(|(va, a), (vb, b)| a.name.cmp(&b.name).then_with(|| vb.cmp(va)));

        for (_, result) in &results {
            out.print(&format!(
                "{} {} ({})",
                result.name, result.version, result.repository
            ));
        }
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }

    fn purge(
        &self,
        tree: &Path,
        options: PurgeOptions,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let out = self.output();
        let layout = TreeLayout::new(tree);
        let mut remaining = installed_in(&layout)?;
        let mut selected = Vec::new();

        if options.only_deps {
            loop {
                let needed: Vec<DependencySpec> = remaining
                    .iter()
                    .flat_map(InstalledManifest::dependency_specs)
                    .collect();
                let (drop, keep): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|m| {
                    !m.explicit
                        && (options.force || !needed.iter().any(|d| d.name == m.name.as_str()))
                });
                remaining = keep;
                if drop.is_empty() {
                    break;
                }
                selected.extend(drop);
            }
        } else {
            selected = std::mem::take(&mut remaining);
        }

        let mut removed = Vec::new();
        for manifest in &selected {
            remove_installed(&layout, manifest, &remaining)?;
            removed.push(manifest.to_rock(tree));
        }

        if !options.only_deps {
            for dir in [
                layout.rocks_dir(),
                layout.lua_root(),
                layout.root().join("lib").join("lua"),
                layout.bin_dir(),
            ] {
                if dir.exists() {
                    std::fs::remove_dir_all(&dir)?;
                }
            }
        }

        out.print(&format!(
            "Purged {} rocks from {}",
            removed.len(),
            tree.display()
        ));
        Ok(removed)
    }

    fn fulfill_dependencies(
        &self,
        rockspec: &AnonymousRockspec,
        mode: DepsMode,
    ) -> Result<Vec<InstalledRock>, EngineError> {
        let config = self.config();
        let out = self.output();
        let mut installed = Vec::new();

        match mode {
            DepsMode::All => {
                self.install_dependencies(
                    &config,
                    &out,
                    &rockspec.name,
                    &rockspec.dependencies,
                    true,
                    &mut Vec::new(),
                    &mut installed,
                )?;
            }
            DepsMode::Any => {
                if rockspec.dependencies.is_empty() {
                    return Ok(installed);
                }
                let mut failures = Vec::new();
                for dep in &rockspec.dependencies {
                    let single = std::slice::from_ref(dep);
                    match self.install_dependencies(
                        &config,
                        &out,
                        &rockspec.name,
                        single,
                        true,
                        &mut Vec::new(),
                        &mut installed,
                    ) {
                        Ok(()) => return Ok(installed),
                        Err(e) => failures.push(e.to_string()),
                    }
                }
                return Err(EngineError::Unsatisfied {
                    rock: rockspec.name.clone(),
                    failures,
                });
            }
        }
        Ok(installed)
    }
}
