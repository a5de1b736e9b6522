pub mod build;
pub mod completions;
pub mod deps;
pub mod install;
pub mod list;
pub mod purge;
pub mod remove;
pub mod search;

use indicatif::{ProgressBar, ProgressStyle};
use rockpit_core::CoreError;
use rockpit_engine::InstalledRock;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `op` under a spinner unless JSON output was requested.
pub fn with_spinner<T>(
    json: bool,
    msg: &str,
    ok: &str,
    fail: &str,
    op: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, String> {
    let pb = if json { None } else { Some(spinner(msg)) };
    match op() {
        Ok(value) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, ok);
            }
            Ok(value)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, fail);
            }
            Err(e.to_string())
        }
    }
}

pub fn status_of(rock: &InstalledRock) -> &'static str {
    if rock.latest.is_some() {
        "outdated"
    } else if rock.explicit {
        "installed"
    } else {
        "dependency"
    }
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "installed" => Style::new().green().apply_to(status).to_string(),
        "dependency" => Style::new().dim().apply_to(status).to_string(),
        "outdated" => Style::new().yellow().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}

/// Human-readable summary of rocks an operation touched.
pub fn print_rocks(verb: &str, rocks: &[InstalledRock], empty: &str) {
    if rocks.is_empty() {
        println!("{empty}");
        return;
    }
    for rock in rocks {
        println!("{verb} {} {}", rock.name, rock.version);
    }
}
