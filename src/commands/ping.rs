//! Ping command handler: report which backend answered.

use anyhow::Result;
use tracing::debug;

use crate::ProcessExit;
use crate::app::config_runtime;
use crate::cli::ZoteroArgs;

pub async fn run_ping_command(zotero: &ZoteroArgs) -> Result<ProcessExit> {
    let loaded = config_runtime::load_settings()?;
    let settings = config_runtime::apply_cli_overrides(loaded.settings, zotero, None);
    let source = config_runtime::build_source(&settings, zotero)?;

    match source.check_liveness().await {
        Ok(signal) => {
            println!("Zotero is reachable via {signal}");
            Ok(ProcessExit::Success)
        }
        Err(error) => {
            debug!(error = %error, "Liveness check failed");
            println!("Zotero is not reachable");
            eprintln!("{error}");
            Ok(ProcessExit::Failure)
        }
    }
}
