//! Layer lookup: "which lifecycle layer is holon X in right now?"
//!
//! Two sources can answer: the tier directories on disk (human-readable,
//! directly editable) and the structured store (queryable). Each implements
//! [`LayerSource`]; [`LayerResolver`] asks them in order and the first answer
//! wins, so the filesystem is authoritative when both know a holon.

use std::sync::Arc;

use crate::error::LayerLookupError;
use crate::holon::Layer;
use crate::paths::{ProjectPaths, is_holon_id};
use crate::store::HolonStore;

/// Something that may know a holon's current layer.
pub trait LayerSource: Send + Sync {
    /// Current layer of `id`, or `None` when this source has no record.
    fn layer_of(&self, id: &str) -> Option<Layer>;
}

/// Filesystem tiers: `knowledge/<layer>/<id>.md`.
///
/// Only existence is ever checked, never content.
#[derive(Debug, Clone)]
pub struct KnowledgeTiers {
    paths: ProjectPaths,
}

impl KnowledgeTiers {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Whether a record for `id` exists in `layer`'s directory.
    ///
    /// An id that is not a plain file name is never present.
    pub fn contains(&self, layer: Layer, id: &str) -> bool {
        is_holon_id(id) && self.paths.holon_file(layer, id).is_file()
    }
}

impl LayerSource for KnowledgeTiers {
    fn layer_of(&self, id: &str) -> Option<Layer> {
        Layer::TIER_ORDER
            .into_iter()
            .find(|layer| self.contains(*layer, id))
    }
}

/// Adapts a [`HolonStore`] into a [`LayerSource`].
///
/// Store failures of any kind read as "no record".
#[derive(Clone)]
pub struct StoreLayers {
    store: Arc<dyn HolonStore>,
}

impl StoreLayers {
    pub fn new(store: Arc<dyn HolonStore>) -> Self {
        Self { store }
    }
}

impl LayerSource for StoreLayers {
    fn layer_of(&self, id: &str) -> Option<Layer> {
        self.store.get_holon(id).ok().map(|record| record.layer)
    }
}

impl std::fmt::Debug for StoreLayers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLayers").finish()
    }
}

/// Ordered fallback over several [`LayerSource`]s.
#[derive(Default)]
pub struct LayerResolver {
    sources: Vec<Box<dyn LayerSource>>,
}

impl LayerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; earlier sources take precedence.
    pub fn with_source(mut self, source: impl LayerSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Filesystem tiers first, then the store when one is configured.
    pub fn standard(tiers: KnowledgeTiers, store: Option<Arc<dyn HolonStore>>) -> Self {
        let resolver = Self::new().with_source(tiers);
        match store {
            Some(store) => resolver.with_source(StoreLayers::new(store)),
            None => resolver,
        }
    }

    /// Resolve `id` against every source in order.
    pub fn resolve(&self, id: &str) -> Result<Layer, LayerLookupError> {
        self.sources
            .iter()
            .find_map(|source| source.layer_of(id))
            .ok_or_else(|| LayerLookupError::NotFound { id: id.into() })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for LayerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerResolver")
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holon::{Category, HolonRecord};
    use crate::store::MemHolonStore;
    use tempfile::TempDir;

    fn tiers(dir: &TempDir) -> KnowledgeTiers {
        let paths = ProjectPaths::new(dir.path(), ".fpf");
        paths.ensure_dirs().unwrap();
        KnowledgeTiers::new(paths)
    }

    fn touch(tiers: &KnowledgeTiers, layer: Layer, id: &str) {
        std::fs::write(tiers.paths().holon_file(layer, id), "content").unwrap();
    }

    #[test]
    fn filesystem_probes_tiers_in_order() {
        let dir = TempDir::new().unwrap();
        let tiers = tiers(&dir);
        touch(&tiers, Layer::L1, "h1");
        touch(&tiers, Layer::L2, "h1");
        touch(&tiers, Layer::Invalid, "bad");

        assert_eq!(tiers.layer_of("h1"), Some(Layer::L1));
        assert_eq!(tiers.layer_of("bad"), Some(Layer::Invalid));
        assert_eq!(tiers.layer_of("ghost"), None);
    }

    #[test]
    fn filesystem_wins_over_store() {
        let dir = TempDir::new().unwrap();
        let tiers = tiers(&dir);
        touch(&tiers, Layer::L2, "h1");

        let store = Arc::new(MemHolonStore::new());
        store.put(HolonRecord::hypothesis("h1", Category::System, "T", "C"));
        store.put(
            HolonRecord::hypothesis("only-db", Category::System, "T", "C").with_layer(Layer::L1),
        );

        let store: Arc<dyn HolonStore> = store;
        let resolver = LayerResolver::standard(tiers, Some(store));
        assert_eq!(resolver.resolve("h1"), Ok(Layer::L2));
        assert_eq!(resolver.resolve("only-db"), Ok(Layer::L1));
        assert_eq!(
            resolver.resolve("ghost"),
            Err(LayerLookupError::NotFound { id: "ghost".into() })
        );
    }

    #[test]
    fn resolver_without_store_uses_filesystem_only() {
        let dir = TempDir::new().unwrap();
        let resolver = LayerResolver::standard(tiers(&dir), None);
        assert_eq!(resolver.len(), 1);
        assert!(resolver.resolve("anything").is_err());
    }

    #[test]
    fn traversal_ids_never_resolve_through_tiers() {
        let dir = TempDir::new().unwrap();
        let tiers = tiers(&dir);
        touch(&tiers, Layer::L2, "h1");

        // From inside L0, "../L2/h1" would land on the L2 record.
        assert!(!tiers.contains(Layer::L0, "../L2/h1"));
        assert_eq!(tiers.layer_of("../L2/h1"), None);
        assert_eq!(tiers.layer_of("h1"), Some(Layer::L2));
    }
}
