//! Structured holon storage.
//!
//! The gating engine reads through [`HolonStore`] only. Two backends exist:
//!
//! - [`MemHolonStore`] — concurrent in-memory map (DashMap), lost on exit
//! - [`DurableHolonStore`] — ACID-durable records in redb
//!
//! Both answer the same two questions: "what is holon X?" and "how many
//! holons sit at each layer?".

pub mod durable;
pub mod mem;

pub use durable::DurableHolonStore;
pub use mem::MemHolonStore;

use crate::error::StoreError;
use crate::holon::{HolonRecord, Layer, LayerCount};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read capability the gating engine consumes.
pub trait HolonStore: Send + Sync {
    /// Fetch a holon record. Missing ids yield [`StoreError::NotFound`].
    fn get_holon(&self, id: &str) -> StoreResult<HolonRecord>;

    /// Per-layer holon counts within one context. Layers with no holons are omitted.
    fn count_holons_by_layer(&self, context_id: &str) -> StoreResult<Vec<LayerCount>>;
}

/// Tally records into per-layer counts, in tier order.
pub(crate) fn tally<'a>(
    records: impl IntoIterator<Item = &'a HolonRecord>,
    context_id: &str,
) -> Vec<LayerCount> {
    let mut counts = [0u64; 4];
    for record in records {
        if record.context_id == context_id {
            let slot = Layer::TIER_ORDER
                .iter()
                .position(|l| *l == record.layer)
                .unwrap_or_default();
            counts[slot] += 1;
        }
    }
    Layer::TIER_ORDER
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(layer, count)| LayerCount { layer, count })
        .collect()
}
