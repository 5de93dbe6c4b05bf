//! Test harness helpers.

use std::path::Path;

use serde::Serialize;
use tempfile::TempDir;
use tessera_core::RegistryEntry;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct RegistryFile<'a> {
    capability: &'a [RegistryEntry],
}

/// Create a module directory as served by `DirectoryBridge`.
///
/// `modules` pairs a file stem (folder name or numeric id) with Lua source.
///
/// # Panics
///
/// Panics if the directory or any file cannot be written.
#[must_use]
pub fn module_dir(entries: &[RegistryEntry], modules: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    write_module_dir(dir.path(), entries, modules);
    dir
}

/// Write a registry file and module sources below `root`.
///
/// # Panics
///
/// Panics if any file cannot be written.
pub fn write_module_dir(root: &Path, entries: &[RegistryEntry], modules: &[(&str, &str)]) {
    let registry = toml::to_string(&RegistryFile {
        capability: entries,
    })
    .expect("Failed to serialize registry");
    std::fs::write(root.join("registry.toml"), registry).expect("Failed to write registry");

    let module_root = root.join("modules");
    std::fs::create_dir_all(&module_root).expect("Failed to create modules directory");
    for (stem, source) in modules {
        std::fs::write(module_root.join(format!("{stem}.lua")), source)
            .expect("Failed to write module");
    }
}

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_registry;

    #[test]
    fn test_module_dir_layout() {
        let dir = module_dir(&sample_registry(), &[("charts", "return {}")]);
        assert!(dir.path().join("registry.toml").exists());
        assert!(dir.path().join("modules/charts.lua").exists());

        let text = std::fs::read_to_string(dir.path().join("registry.toml")).unwrap();
        assert!(text.contains("[[capability]]"));
        assert!(text.contains("hasUI = true"));
    }
}
