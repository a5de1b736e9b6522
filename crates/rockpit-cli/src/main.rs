mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use rockpit_core::{OperationFlags, Rocks};
use rockpit_engine::{select_engine, EngineConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "rockpit",
    version,
    about = "Project-local Lua rock trees, driven through the package engine"
)]
struct Cli {
    /// Project directory; rocks are installed into <project>/rocks.
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Package engine to drive.
    #[arg(long, default_value = "local", global = true)]
    engine: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output, including engine messages.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Repository and tree selection shared by resolving commands.
#[derive(Debug, Default, Args)]
struct SourceArgs {
    /// Check this repository before the configured ones.
    #[arg(long, value_name = "REPO")]
    from: Option<String>,
    /// Use only this repository. Ignored when --from is given.
    #[arg(long, value_name = "REPO")]
    only_from: Option<String>,
    /// Also treat rocks in the shared user tree as installed.
    #[arg(long, default_value_t = false)]
    local: bool,
}

impl SourceArgs {
    fn flags(self) -> OperationFlags {
        OperationFlags {
            from: self.from,
            only_from: self.only_from,
            use_local: self.local,
            ..OperationFlags::default()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List rocks installed in the project tree.
    List {
        /// Only rocks whose name contains this text.
        pattern: Option<String>,
        /// Only this version.
        version: Option<String>,
        /// Only rocks with a newer version available.
        #[arg(long, default_value_t = false)]
        outdated: bool,
        /// Tab-separated output for scripts.
        #[arg(long, default_value_t = false)]
        porcelain: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Search the configured repositories.
    Search {
        /// Only rocks whose name contains this text.
        pattern: Option<String>,
        /// Only this version.
        version: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Install a rock and its dependencies into the project tree.
    Install {
        name: String,
        /// Exact version; newest when omitted.
        version: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Remove a rock from the project tree.
    Remove {
        name: String,
        /// Version to remove; every installed version when omitted.
        version: Option<String>,
        /// Remove even if other rocks depend on it.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Build a rock from its sources and install it.
    Build {
        name: String,
        version: Option<String>,
        /// Install the rock's dependencies only.
        #[arg(long, default_value_t = false)]
        only_deps: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Remove every rock from the project tree.
    Purge {
        /// Only rocks that were installed as dependencies.
        #[arg(long, default_value_t = false)]
        only_deps: bool,
        /// With --only-deps, also remove dependencies still in use.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Install the dependencies listed in rockpit.toml.
    Deps {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ROCKPIT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        command => open(&cli.project, &cli.engine).and_then(|rocks| dispatch(&rocks, command, json)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("configuration error:")
                || msg.starts_with("specifier error:")
            {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn open(project: &Path, engine: &str) -> Result<Rocks, String> {
    let config = EngineConfig::load_default().map_err(|e| format!("configuration error: {e}"))?;
    let engine = select_engine(engine, config).map_err(|e| e.to_string())?;
    Ok(Rocks::new(engine, project))
}

fn dispatch(rocks: &Rocks, command: Commands, json: bool) -> Result<u8, String> {
    match command {
        Commands::List {
            pattern,
            version,
            outdated,
            porcelain,
            source,
        } => {
            let flags = OperationFlags {
                outdated,
                porcelain,
                ..source.flags()
            };
            commands::list::run(rocks, pattern.as_deref(), version.as_deref(), &flags, json)
        }
        Commands::Search {
            pattern,
            version,
            source,
        } => commands::search::run(
            rocks,
            pattern.as_deref(),
            version.as_deref(),
            &source.flags(),
            json,
        ),
        Commands::Install {
            name,
            version,
            source,
        } => commands::install::run(rocks, &name, version.as_deref(), &source.flags(), json),
        Commands::Remove {
            name,
            version,
            force,
        } => {
            let flags = OperationFlags::default().with_force(force);
            commands::remove::run(rocks, &name, version.as_deref(), &flags, json)
        }
        Commands::Build {
            name,
            version,
            only_deps,
            source,
        } => {
            let flags = source.flags().with_only_deps(only_deps);
            commands::build::run(rocks, &name, version.as_deref(), &flags, json)
        }
        Commands::Purge { only_deps, force } => {
            let flags = OperationFlags::default()
                .with_only_deps(only_deps)
                .with_force(force);
            commands::purge::run(rocks, &flags, json)
        }
        Commands::Deps { source } => commands::deps::run(rocks, &source.flags(), json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    }
}
