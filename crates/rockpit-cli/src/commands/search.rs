use super::{json_pretty, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(
    rocks: &Rocks,
    pattern: Option<&str>,
    version: Option<&str>,
    flags: &OperationFlags,
    json: bool,
) -> Result<u8, String> {
    let found = rocks
        .search(pattern, version, flags)
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&found)?);
    } else if found.is_empty() {
        println!("no rocks found");
    } else {
        for result in &found {
            println!("{} {} ({})", result.name, result.version, result.repository);
        }
    }
    Ok(EXIT_SUCCESS)
}
