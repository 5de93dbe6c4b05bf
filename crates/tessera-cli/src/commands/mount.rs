//! `tessera mount`.

use serde_json::{Value, json};
use tessera_core::CapabilityId;
use tessera_host::{Host, MountOptions, MountOutcome};
use tracing::debug;

use crate::OutputFormat;
use crate::commands::print_json;
use crate::theme::Theme;

/// Mount `capability` once, print the rendered view or the failure, then
/// unmount.
pub(crate) async fn run(
    host: &Host,
    capability: CapabilityId,
    initial_data: Option<Value>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mount = host.mount_component();
    let mut options = MountOptions::new().with_on_close(move || {
        debug!(%capability, "Module requested close");
    });
    if let Some(data) = initial_data {
        options = options.with_initial_data(data);
    }

    let outcome = mount.mount(capability, options).await;
    let view = mount.view();
    let state = host.state().get();
    mount.unmount();

    match format {
        OutputFormat::Json => {
            let error = match &outcome {
                MountOutcome::Failed(e) => Some(e.to_string()),
                _ => None,
            };
            print_json(&json!({
                "capability": capability,
                "ready": outcome.is_ready(),
                "error": error,
                "view": view,
                "state": &*state,
            }))?;
        },
        OutputFormat::Pretty => match &outcome {
            MountOutcome::Ready => {
                println!(
                    "{}",
                    Theme::success(&format!("Mounted capability {capability}"))
                );
                println!("{}", Theme::separator());
                if let Some(view) = &view {
                    print!("{}", view.outline());
                } else {
                    println!("{}", Theme::dimmed("(empty view)"));
                }
                if !state.is_empty() {
                    println!("{}", Theme::separator());
                    println!("{}", Theme::info("Shared state"));
                    println!("{}", serde_json::to_string_pretty(&*state)?);
                }
            },
            // Reported by the caller.
            MountOutcome::Failed(_) => {},
            MountOutcome::Superseded | MountOutcome::Unmounted => {
                println!("{}", Theme::warning("Mount was interrupted"));
            },
        },
    }

    outcome
        .into_result()
        .map_err(|e| anyhow::anyhow!("failed to mount capability {capability}: {e}"))
}
