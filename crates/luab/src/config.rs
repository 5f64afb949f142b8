//! Registration settings
//!
//! Loaded from TOML by the CLI; library users construct it directly.
//!
//! ```toml
//! namespace = "bsd"
//! global = true
//! preload = true
//! modules = ["core", "unistd", "sys.stat"]
//! hook_interval = 1000
//! ```

use crate::error::{LuabError, LuabResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

fn default_namespace() -> String {
    "bsd".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hook_interval() -> u32 {
    1000
}

/// How `register_bsd_module` installs the bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuabConfig {
    /// Name of the root table and of the `require` module
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Set the root table as a global
    #[serde(default = "default_true")]
    pub global: bool,

    /// Install a `package.preload` loader
    #[serde(default = "default_true")]
    pub preload: bool,

    /// Sub-namespaces to install (`core`, `fcntl`, `sys.stat`, ...); empty
    /// installs everything
    #[serde(default)]
    pub modules: Vec<String>,

    /// Instructions between checks for a pending signal callback
    #[serde(default = "default_hook_interval")]
    pub hook_interval: u32,
}

impl Default for LuabConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            global: true,
            preload: true,
            modules: Vec::new(),
            hook_interval: default_hook_interval(),
        }
    }
}

impl LuabConfig {
    pub fn from_toml_str(s: &str) -> LuabResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| LuabError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> LuabResult<Self> {
        let path = path.as_ref();
        debug!("Loading luab config from {}", path.display());
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> LuabResult<()> {
        if self.namespace.is_empty() {
            return Err(LuabError::config("namespace must not be empty"));
        }
        if self.hook_interval == 0 {
            return Err(LuabError::config("hook_interval must be positive"));
        }
        Ok(())
    }

    /// Whether the sub-namespace `name` is selected.
    ///
    /// Selecting a parent (`sys`) selects its children (`sys.stat`).
    pub fn wants(&self, name: &str) -> bool {
        self.modules.is_empty()
            || self.modules.iter().any(|m| {
                name == m
                    || name
                        .strip_prefix(m.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = LuabConfig::from_toml_str("").unwrap();
        assert_eq!(config, LuabConfig::default());
        assert_eq!(config.namespace, "bsd");
        assert_eq!(config.hook_interval, 1000);
    }

    #[test]
    fn test_partial_override() {
        let config = LuabConfig::from_toml_str(
            r#"
            global = false
            modules = ["sys", "unistd"]
            "#,
        )
        .unwrap();
        assert!(!config.global);
        assert!(config.preload);
        assert!(config.wants("sys.stat"));
        assert!(config.wants("unistd"));
        assert!(!config.wants("fcntl"));
        assert!(!config.wants("system"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(LuabConfig::from_toml_str("hook_interval = 0").is_err());
        assert!(LuabConfig::from_toml_str(r#"namespace = """#).is_err());
        assert!(LuabConfig::from_toml_str("global = 3").is_err());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = \"posix\"").unwrap();
        let config = LuabConfig::load(file.path()).unwrap();
        assert_eq!(config.namespace, "posix");
        assert!(LuabConfig::load("/nonexistent/luab.toml").is_err());
    }
}
