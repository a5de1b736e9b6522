use super::{json_pretty, print_rocks, with_spinner, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(
    rocks: &Rocks,
    name: &str,
    version: Option<&str>,
    flags: &OperationFlags,
    json: bool,
) -> Result<u8, String> {
    let what = if flags.only_deps {
        format!("dependencies of {name}")
    } else {
        name.to_owned()
    };
    let installed = with_spinner(
        json,
        &format!("building {what}..."),
        &format!("{what} built"),
        &format!("building {what} failed"),
        || rocks.build(name, version, flags),
    )?;
    if json {
        println!("{}", json_pretty(&installed)?);
    } else {
        print_rocks("installed", &installed, "nothing to install");
    }
    Ok(EXIT_SUCCESS)
}
