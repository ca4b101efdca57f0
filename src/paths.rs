//! On-disk layout of a project's knowledge base.
//!
//! ```text
//! <root>/
//!   epigate.toml            config (optional)
//!   <fpf_dir>/              default `.fpf`
//!     knowledge/L0/<id>.md
//!     knowledge/L1/<id>.md
//!     knowledge/L2/<id>.md
//!     knowledge/invalid/<id>.md
//!     decisions/
//!     state.json            current phase
//!     holons.redb           structured store
//! ```

use std::path::{Component, Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::holon::Layer;
use crate::store::durable::STORE_FILE_NAME;

/// Errors from path preparation.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(epigate::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Default config file name at the project root.
pub const CONFIG_FILE_NAME: &str = "epigate.toml";

/// Resolved directories and files of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Project root.
    pub root: PathBuf,
    /// `root/<fpf_dir>/`
    pub fpf_dir: PathBuf,
    /// `fpf_dir/knowledge/`, one subdirectory per layer
    pub knowledge_dir: PathBuf,
    /// `fpf_dir/decisions/`
    pub decisions_dir: PathBuf,
    /// `fpf_dir/state.json`
    pub state_file: PathBuf,
    /// `fpf_dir/holons.redb`
    pub store_file: PathBuf,
}

impl ProjectPaths {
    /// Derive the layout for `root` with the given FPF directory name.
    pub fn new(root: impl Into<PathBuf>, fpf_dir_name: &str) -> Self {
        let root = root.into();
        let fpf_dir = root.join(fpf_dir_name);
        Self {
            knowledge_dir: fpf_dir.join("knowledge"),
            decisions_dir: fpf_dir.join("decisions"),
            state_file: fpf_dir.join("state.json"),
            store_file: fpf_dir.join(STORE_FILE_NAME),
            fpf_dir,
            root,
        }
    }

    /// Directory holding the records of one layer.
    pub fn tier_dir(&self, layer: Layer) -> PathBuf {
        self.knowledge_dir.join(layer.as_str())
    }

    /// Path of the record for `id` at `layer`.
    ///
    /// Only meaningful when [`is_holon_id`] accepts `id`; anything else may
    /// point outside the tier directory.
    pub fn holon_file(&self, layer: Layer, id: &str) -> PathBuf {
        self.tier_dir(layer).join(format!("{id}.md"))
    }

    /// Default config file for this root.
    pub fn config_file(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Create every tier directory plus `decisions/`. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        let tiers = Layer::TIER_ORDER.map(|layer| self.tier_dir(layer));
        for dir in tiers.iter().chain([&self.decisions_dir]) {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Whether the FPF directory exists.
    pub fn exists(&self) -> bool {
        self.fpf_dir.is_dir()
    }
}

/// Whether `id` names a file inside a tier directory: one normal path
/// component, no separators of either platform.
pub fn is_holon_id(id: &str) -> bool {
    if id.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_from_root() {
        let paths = ProjectPaths::new("/work/proj", ".fpf");
        assert_eq!(paths.fpf_dir, PathBuf::from("/work/proj/.fpf"));
        assert_eq!(
            paths.tier_dir(Layer::L1),
            PathBuf::from("/work/proj/.fpf/knowledge/L1")
        );
        assert_eq!(
            paths.holon_file(Layer::Invalid, "h7"),
            PathBuf::from("/work/proj/.fpf/knowledge/invalid/h7.md")
        );
        assert_eq!(paths.state_file, PathBuf::from("/work/proj/.fpf/state.json"));
        assert_eq!(paths.store_file, PathBuf::from("/work/proj/.fpf/holons.redb"));
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), ".fpf");
        assert!(!paths.exists());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        for layer in Layer::TIER_ORDER {
            assert!(paths.tier_dir(layer).is_dir());
        }
        assert!(paths.decisions_dir.is_dir());
    }

    #[test]
    fn holon_ids_are_single_components() {
        assert!(is_holon_id("h1"));
        assert!(is_holon_id("cache-v2.draft"));
        for bad in ["", ".", "..", "../L2/h1", "L2/h1", "..\\L2\\h1", "/etc/passwd"] {
            assert!(!is_holon_id(bad), "{bad:?} accepted");
        }
    }
}
