use super::{json_pretty, print_rocks, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(
    rocks: &Rocks,
    name: &str,
    version: Option<&str>,
    flags: &OperationFlags,
    json: bool,
) -> Result<u8, String> {
    let removed = rocks
        .remove(name, version, flags)
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&removed)?);
    } else {
        print_rocks("removed", &removed, "nothing removed");
    }
    Ok(EXIT_SUCCESS)
}
