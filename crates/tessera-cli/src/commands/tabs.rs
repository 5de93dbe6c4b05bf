//! `tessera tabs`.

use tessera_host::{Host, TabDescriptor};

use crate::OutputFormat;
use crate::commands::print_json;
use crate::theme::Theme;

/// Print core tabs followed by the tabs discovered in the registry.
pub(crate) async fn show(host: &Host, format: OutputFormat) -> anyhow::Result<()> {
    let mut strip = host.tab_strip();
    for tab in host.tabs().discovered_tabs().await {
        strip.open(tab);
    }

    if format == OutputFormat::Json {
        let tabs: Vec<_> = strip.tabs().collect();
        return print_json(&tabs);
    }

    println!("{}", Theme::header("Tabs"));
    println!("{}", Theme::separator());
    for tab in strip.tabs() {
        print_tab(tab);
    }
    Ok(())
}

fn print_tab(tab: &TabDescriptor) {
    let kind = if tab.is_core { "core" } else { "discovered" };
    println!(
        "  {:<20} {:<24} {:<12} {}",
        tab.id,
        tab.label,
        tab.icon,
        Theme::dimmed(&format!("{kind}, capability {}", tab.capability)),
    );
}
