//! Layered merging of raw TOML trees.

use std::path::PathBuf;

/// Where a configuration layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// `~/.tessera/config.toml` or `$TESSERA_HOME/config.toml`.
    User(PathBuf),
    /// `{workspace}/.tessera/config.toml`.
    Workspace(PathBuf),
    /// A file named on the command line.
    Explicit(PathBuf),
    /// `TESSERA_*` environment variables.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User(path) => write!(f, "user ({})", path.display()),
            Self::Workspace(path) => write!(f, "workspace ({})", path.display()),
            Self::Explicit(path) => write!(f, "explicit ({})", path.display()),
            Self::Environment => write!(f, "environment"),
        }
    }
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per key.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Set a dotted `path` in `root`, creating intermediate tables.
///
/// Non-table values along the way are replaced by tables.
pub(crate) fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments = path.split('.').peekable();
    let mut cursor = root;
    while let Some(segment) = segments.next() {
        if !cursor.is_table() {
            *cursor = toml::Value::Table(toml::map::Map::new());
        }
        let toml::Value::Table(table) = cursor else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        cursor = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_tables_merge_per_key() {
        let mut base = parse("[logging]\nlevel = \"info\"\nformat = \"compact\"\n");
        deep_merge(&mut base, &parse("[logging]\nlevel = \"debug\"\n"));
        assert_eq!(base["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(base["logging"]["format"].as_str(), Some("compact"));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[[core_tabs]]\nid = \"a\"\n[[core_tabs]]\nid = \"b\"\n");
        deep_merge(&mut base, &parse("[[core_tabs]]\nid = \"c\"\n"));
        let tabs = base["core_tabs"].as_array().unwrap();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0]["id"].as_str(), Some("c"));
    }

    #[test]
    fn test_new_keys_are_added() {
        let mut base = parse("[host]\nsystem_capability = 0\n");
        deep_merge(&mut base, &parse("[bridge]\ndirectory = \"/srv\"\n"));
        assert_eq!(base["bridge"]["directory"].as_str(), Some("/srv"));
        assert_eq!(base["host"]["system_capability"].as_integer(), Some(0));
    }

    #[test]
    fn test_set_path_creates_tables() {
        let mut root = parse("");
        set_path(&mut root, "bridge.directory", toml::Value::String("/m".into()));
        assert_eq!(root["bridge"]["directory"].as_str(), Some("/m"));

        set_path(&mut root, "bridge.directory", toml::Value::String("/n".into()));
        assert_eq!(root["bridge"]["directory"].as_str(), Some("/n"));
    }
}
