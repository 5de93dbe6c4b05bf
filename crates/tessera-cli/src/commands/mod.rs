//! Subcommand implementations.

pub(crate) mod config;
pub(crate) mod mount;
pub(crate) mod registry;
pub(crate) mod tabs;

use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
