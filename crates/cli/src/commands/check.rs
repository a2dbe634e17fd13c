use crate::commands::{load_catalog, prepare, CommandResult};

/// Runs one full load through the configured plan and reports which source
/// won. The loaded catalog is discarded.
pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("check") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    match runtime.block_on(load_catalog("check", &config)) {
        Ok((outcome, _)) => CommandResult::success(
            "check",
            format!(
                "catalog load succeeded: {} products from {}",
                outcome.product_count,
                outcome.source.as_str()
            ),
        ),
        Err(result) => result,
    }
}
