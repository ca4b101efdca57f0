//! Project configuration, persisted as TOML at `<root>/epigate.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gate::GatePolicy;
use crate::holon::DEFAULT_CONTEXT;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Gating configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Name of the FPF directory under the project root.
    #[serde(default = "default_fpf_dir")]
    pub fpf_dir: String,
    /// Which phase-gate table is in force.
    #[serde(default)]
    pub gate_policy: GatePolicy,
    /// Context whose L2 count gates `decide`.
    #[serde(default = "default_context_id")]
    pub context_id: String,
    /// Namespace stripped from incoming tool names (e.g. `"quint_"`).
    #[serde(default)]
    pub tool_prefix: Option<String>,
    /// Open the structured store. Without it, store-only checks degrade.
    #[serde(default = "default_use_store")]
    pub use_store: bool,
}

fn default_fpf_dir() -> String {
    ".fpf".into()
}
fn default_context_id() -> String {
    DEFAULT_CONTEXT.into()
}
fn default_use_store() -> bool {
    true
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fpf_dir: default_fpf_dir(),
            gate_policy: GatePolicy::default(),
            context_id: default_context_id(),
            tool_prefix: None,
            use_store: default_use_store(),
        }
    }
}

impl GateConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
