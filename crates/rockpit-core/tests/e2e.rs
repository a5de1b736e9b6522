//! End-to-end tests driving `Rocks` over the real `LocalEngine` with
//! directory repositories in a temp dir.

use rockpit_core::{CoreError, OperationFlags, Rocks};
use rockpit_engine::{EngineConfig, EngineError, LocalEngine, OutputSinks, PackageEngine};
use std::fs;
use std::path::{Path, PathBuf};

struct Workspace {
    _dir: tempfile::TempDir,
    repo: PathBuf,
    shared: PathBuf,
    project: PathBuf,
}

fn write_rock(repo: &Path, name: &str, version: &str, deps: &[&str]) {
    let dir = repo.join(name).join(version);
    fs::create_dir_all(&dir).unwrap();
    let deps = deps
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(
        dir.join("rock.toml"),
        format!(
            "name = \"{name}\"\nversion = \"{version}\"\ndependencies = [{deps}]\n\n[modules]\n{name} = \"{name}.lua\"\n"
        ),
    )
    .unwrap();
    fs::write(dir.join(format!("{name}.lua")), format!("return '{name} {version}'\n")).unwrap();
}

fn workspace(project_config: &str) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    let shared = dir.path().join("shared");
    let project = dir.path().join("game");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("rockpit.toml"), project_config).unwrap();

    write_rock(&repo, "inspect", "3.1.3-0", &["lua >= 5.1"]);
    write_rock(&repo, "lume", "2.3.0-1", &[]);
    write_rock(&repo, "classic", "1.0-1", &["lume >= 2.0"]);

    Workspace {
        _dir: dir,
        repo,
        shared,
        project,
    }
}

fn rocks(ws: &Workspace) -> Rocks {
    let config = EngineConfig::new(&ws.shared, vec![ws.repo.to_string_lossy().into_owned()]);
    let engine = LocalEngine::new(config);
    engine.swap_output(OutputSinks::silent());
    Rocks::new(Box::new(engine), &ws.project)
}

fn module(ws: &Workspace, name: &str) -> PathBuf {
    ws.project
        .join("rocks/share/lua/5.1")
        .join(format!("{name}.lua"))
}

#[test]
fn install_lands_in_project_tree() {
    let ws = workspace("");
    let rocks = rocks(&ws);

    let installed = rocks
        .install("inspect", None, &OperationFlags::default())
        .unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].version, "3.1.3-0");
    assert!(module(&ws, "inspect").is_file());
    assert!(!ws.shared.exists(), "shared tree must stay untouched");
}

#[test]
fn purge_empties_project_tree_and_is_idempotent() {
    let ws = workspace("");
    let rocks = rocks(&ws);
    rocks
        .install("classic", None, &OperationFlags::default())
        .unwrap();
    assert!(module(&ws, "lume").is_file());

    let purged = rocks.purge(&OperationFlags::default()).unwrap();
    assert_eq!(purged.len(), 2);
    assert!(!module(&ws, "inspect").exists());
    assert!(!module(&ws, "lume").exists());

    let again = rocks.purge(&OperationFlags::default()).unwrap();
    assert!(again.is_empty());
}

#[test]
fn purge_only_deps_keeps_explicit_rocks() {
    let ws = workspace("");
    let rocks = rocks(&ws);
    rocks
        .install("classic", None, &OperationFlags::default())
        .unwrap();

    let flags = OperationFlags::default().with_only_deps(true).with_force(true);
    let purged = rocks.purge(&flags).unwrap();
    assert_eq!(purged.len(), 1);
    assert_eq!(purged[0].name, "lume");
    assert!(module(&ws, "classic").is_file());
}

#[test]
fn engine_config_survives_failures_and_successes() {
    let ws = workspace("[repositories]\nextra = [\"/nowhere/at/all\"]\n");
    let rocks = rocks(&ws);
    let before = rocks.engine().config();

    let err = rocks
        .install("missing", None, &OperationFlags::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::Engine(EngineError::NoCandidate(_))));
    assert_eq!(rocks.engine().config(), before);

    rocks
        .install(
            "lume",
            Some("2.3.0-1"),
            &OperationFlags::default().only_from_repository(ws.repo.to_string_lossy()),
        )
        .unwrap();
    assert_eq!(rocks.engine().config(), before);

    rocks.list(None, None, &OperationFlags::default()).unwrap();
    assert_eq!(rocks.engine().config(), before);
}

#[test]
fn deps_installs_everything_the_project_lists() {
    let ws = workspace(
        "[project]\nname = \"game\"\n[dependencies]\nrocks = [\"inspect >= 3.0\", \"classic\"]\n",
    );
    let rocks = rocks(&ws);

    let installed = rocks.deps(&OperationFlags::default()).unwrap();
    let mut names: Vec<_> = installed.iter().map(|r| r.name.to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["classic", "inspect", "lume"]);
    assert!(module(&ws, "classic").is_file());
}

#[test]
fn deps_reports_unsatisfiable_constraint() {
    let ws = workspace("[dependencies]\nrocks = [\"lume >= 9.0\"]\n");
    let rocks = rocks(&ws);
    let err = rocks.deps(&OperationFlags::default()).unwrap_err();
    assert!(matches!(err, CoreError::Engine(EngineError::Unsatisfied { .. })));
}

#[test]
fn list_and_remove_see_only_the_project_tree() {
    let ws = workspace("");
    let rocks = rocks(&ws);
    rocks
        .install("lume", None, &OperationFlags::default())
        .unwrap();

    let listed = rocks.list(None, None, &OperationFlags::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].tree, ws.project.join("rocks"));

    rocks
        .remove("lume", None, &OperationFlags::default())
        .unwrap();
    assert!(!module(&ws, "lume").exists());
    assert!(rocks
        .list(None, None, &OperationFlags::default())
        .unwrap()
        .is_empty());
}

#[test]
fn search_uses_from_repository_first() {
    let ws = workspace("");
    let other = ws.project.parent().unwrap().join("other");
    write_rock(&other, "lume", "2.3.0-1", &[]);
    let rocks = rocks(&ws);

    let flags = OperationFlags::default().from_repository(other.to_string_lossy());
    let found = rocks.search(Some("lume"), None, &flags).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].repository, other.to_string_lossy());

    let installed = rocks.install("lume", None, &flags).unwrap();
    assert_eq!(installed.len(), 1);
}
