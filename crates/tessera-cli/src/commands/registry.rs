//! `tessera registry`.

use tessera_host::{Host, RegistrySource};

use crate::OutputFormat;
use crate::commands::print_json;
use crate::theme::Theme;

/// Fetch the registry and print every entry with its source.
pub(crate) async fn show(host: &Host, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = host.registry().fetch().await;

    if format == OutputFormat::Json {
        return print_json(&*snapshot);
    }

    println!("{}", Theme::header("Capability registry"));
    println!("{}", Theme::separator());
    match snapshot.source {
        RegistrySource::Fallback => println!(
            "{}",
            Theme::warning("Execution boundary unavailable; showing built-in tabs")
        ),
        source => println!("{}", Theme::info(&format!("Source: {source}"))),
    }
    println!();

    if snapshot.entries.is_empty() {
        println!("{}", Theme::dimmed("No capabilities registered."));
        return Ok(());
    }

    println!(
        "  {:>6}  {:<24} {:<12} {:^3} {:^3}",
        "ID", "NAME", "CATEGORY", "UI", "TAB"
    );
    for entry in &snapshot.entries {
        println!(
            "  {:>6}  {:<24} {:<12} {:^3} {:^3}",
            entry.identifier.to_string(),
            entry.name,
            entry.category,
            Theme::flag(entry.has_ui),
            Theme::flag(entry.is_tab),
        );
        if !entry.description.is_empty() {
            println!("          {}", Theme::dimmed(&entry.description));
        }
    }
    println!();
    println!(
        "{}",
        Theme::dimmed(&format!("{} capabilities", snapshot.entries.len()))
    );
    Ok(())
}
