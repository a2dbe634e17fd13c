use std::path::Path;

use prodcat_core::loader::write_catalog_file;

use crate::commands::{load_catalog, prepare, CommandResult};

pub fn run(output: &Path) -> CommandResult {
    let (config, runtime) = match prepare("export") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    runtime.block_on(async {
        let (outcome, catalog) = match load_catalog("export", &config).await {
            Ok(loaded) => loaded,
            Err(result) => return result,
        };

        match write_catalog_file(output, &catalog).await {
            Ok(()) => CommandResult::success(
                "export",
                format!(
                    "exported {} products from {} to {}",
                    outcome.product_count,
                    outcome.source.as_str(),
                    output.display()
                ),
            ),
            Err(error) => CommandResult::failure(
                "export",
                "export_write",
                format!("failed to write {}: {error}", output.display()),
                5,
            ),
        }
    })
}
