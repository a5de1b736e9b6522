use super::{json_pretty, print_rocks, with_spinner, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(rocks: &Rocks, flags: &OperationFlags, json: bool) -> Result<u8, String> {
    let project = rocks.context().map_err(|e| e.to_string())?.name().to_owned();
    let installed = with_spinner(
        json,
        &format!("installing dependencies of {project}..."),
        "dependencies satisfied",
        "dependencies not satisfied",
        || rocks.deps(flags),
    )?;
    if json {
        println!("{}", json_pretty(&installed)?);
    } else {
        print_rocks("installed", &installed, "all dependencies already satisfied");
    }
    Ok(EXIT_SUCCESS)
}
