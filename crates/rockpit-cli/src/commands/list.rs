use super::{colorize_status, json_pretty, status_of, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(
    rocks: &Rocks,
    pattern: Option<&str>,
    version: Option<&str>,
    flags: &OperationFlags,
    json: bool,
) -> Result<u8, String> {
    let installed = rocks
        .list(pattern, version, flags)
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&installed)?);
    } else if flags.porcelain {
        for rock in &installed {
            println!(
                "{}\t{}\t{}\t{}",
                rock.name,
                rock.version,
                rock.latest.as_deref().unwrap_or(status_of(rock)),
                rock.tree.display()
            );
        }
    } else if installed.is_empty() {
        if flags.outdated {
            println!("all rocks are up to date");
        } else {
            println!("no rocks installed");
        }
    } else {
        println!("{:<24} {:<14} {:<12} LATEST", "NAME", "VERSION", "STATUS");
        for rock in &installed {
            println!(
                "{:<24} {:<14} {:<12} {}",
                rock.name,
                rock.version,
                colorize_status(status_of(rock)),
                rock.latest.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
