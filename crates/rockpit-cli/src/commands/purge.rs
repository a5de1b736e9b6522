use super::{json_pretty, with_spinner, EXIT_SUCCESS};
use rockpit_core::{OperationFlags, Rocks};

pub fn run(rocks: &Rocks, flags: &OperationFlags, json: bool) -> Result<u8, String> {
    let tree = rocks
        .context()
        .map_err(|e| e.to_string())?
        .tree()
        .to_path_buf();
    let removed = with_spinner(
        json,
        "purging project tree...",
        "project tree purged",
        "purge failed",
        || rocks.purge(flags),
    )?;
    if json {
        let payload = serde_json::json!({
            "tree": tree,
            "purged": removed.len(),
            "rocks": removed,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("purged {} rocks from {}", removed.len(), tree.display());
    }
    Ok(EXIT_SUCCESS)
}
