//! `tessera config`.

use tessera_config::ResolvedConfig;

use crate::OutputFormat;
use crate::commands::print_json;

/// Print the effective configuration.
pub(crate) fn show(resolved: &ResolvedConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&resolved.config)?,
        OutputFormat::Pretty => {
            let rendered = resolved
                .show()
                .map_err(|_| anyhow::anyhow!("failed to render configuration"))?;
            print!("{rendered}");
        },
    }
    Ok(())
}
