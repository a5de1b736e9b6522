use super::{json_pretty, print_rocks, with_spinner, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(
    rocks: &Rocks,
    name: &str,
    version: Option<&str>,
    flags: &OperationFlags,
    json: bool,
) -> Result<u8, String> {
    let installed = with_spinner(
        json,
        &format!("installing {name}..."),
        &format!("{name} installed"),
        &format!("installing {name} failed"),
        || rocks.install(name, version, flags),
    )?;
    if json {
        println!("{}", json_pretty(&installed)?);
    } else {
        print_rocks("installed", &installed, &format!("{name} is already installed"));
    }
    Ok(EXIT_SUCCESS)
}
