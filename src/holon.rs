//! Holons: the atomic units of knowledge tracked through the lifecycle.
//!
//! A holon's [`Layer`] is never set freely. It is inferred from whichever
//! lifecycle location (tier directory or store record) currently holds it.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::validity::valid_until_from;

/// Confidence tier of a holon.
///
/// L0 = proposed, L1 = verified (deductive check), L2 = tested (inductive
/// check). `Invalid` is the terminal state for holons that failed audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    L0,
    L1,
    L2,
    #[serde(rename = "invalid")]
    Invalid,
}

impl Layer {
    /// Order in which tier directories are probed.
    pub const TIER_ORDER: [Layer; 4] = [Layer::L0, Layer::L1, Layer::L2, Layer::Invalid];

    /// Directory and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::Invalid => "invalid",
        }
    }

    /// Whether moving from `self` to `next` respects L0 → L1 → L2 monotonicity.
    ///
    /// Staying in place is allowed (L2 refresh). `Invalid` is reachable from
    /// anywhere and is terminal.
    pub fn can_advance_to(self, next: Layer) -> bool {
        match (self, next) {
            (Self::Invalid, other) => other == Self::Invalid,
            (_, Self::Invalid) => true,
            (from, to) => from.rank() <= to.rank(),
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::L0 => 0,
            Self::L1 => 1,
            Self::L2 => 2,
            Self::Invalid => 3,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::TIER_ORDER
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layer \"{s}\" (expected L0, L1, L2 or invalid)"))
    }
}

/// Whether a holon is a proposal or a finalized outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolonKind {
    Hypothesis,
    Decision,
}

/// Technical hypothesis vs. knowledge claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Episteme,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Episteme => "episteme",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "episteme" => Ok(Self::Episteme),
            _ => Err(()),
        }
    }
}

/// Outcome of a verify or test step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Refine,
}

impl FromStr for Verdict {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "REFINE" => Ok(Self::Refine),
            _ => Err(()),
        }
    }
}

/// A holon as the structured store records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolonRecord {
    pub id: String,
    pub kind: HolonKind,
    pub category: Category,
    pub layer: Layer,
    pub title: String,
    pub content: String,
    /// Free-form scope tag supplied at proposal time.
    pub scope: String,
    /// Knowledge-base context the holon belongs to (`"default"` unless set).
    pub context_id: String,
    /// `YYYY-MM-DD` expiry of the latest test evidence, if tested.
    pub valid_until: Option<String>,
}

impl HolonRecord {
    /// A freshly proposed L0 hypothesis in the default context.
    pub fn hypothesis(
        id: impl Into<String>,
        category: Category,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: HolonKind::Hypothesis,
            category,
            layer: Layer::L0,
            title: title.into(),
            content: content.into(),
            scope: String::new(),
            context_id: DEFAULT_CONTEXT.into(),
            valid_until: None,
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    /// Move to `next` if that respects [`Layer::can_advance_to`].
    ///
    /// Arriving at (or refreshing) L2 stamps `valid_until` for evidence of
    /// `test_type` gathered on `tested_on`. Returns false and leaves the
    /// record untouched when the move would regress.
    pub fn advance(&mut self, next: Layer, tested_on: NaiveDate, test_type: &str) -> bool {
        if !self.layer.can_advance_to(next) {
            return false;
        }
        self.layer = next;
        if next == Layer::L2 {
            self.valid_until = Some(valid_until_from(tested_on, test_type));
        }
        true
    }
}

/// Context every holon lands in unless told otherwise.
pub const DEFAULT_CONTEXT: &str = "default";

/// A finalized outcome referencing the winning holon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub winner_id: String,
    pub title: String,
    pub context: String,
    pub decision: String,
    pub rationale: String,
    pub consequences: String,
}

/// Number of holons at one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCount {
    pub layer: Layer,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_names_round_trip_through_from_str() {
        for layer in Layer::TIER_ORDER {
            assert_eq!(layer.as_str().parse::<Layer>().unwrap(), layer);
        }
        assert!("L3".parse::<Layer>().is_err());
    }

    #[test]
    fn layer_monotonicity() {
        assert!(Layer::L0.can_advance_to(Layer::L1));
        assert!(Layer::L1.can_advance_to(Layer::L2));
        assert!(Layer::L2.can_advance_to(Layer::L2));
        assert!(!Layer::L2.can_advance_to(Layer::L1));
        assert!(!Layer::L1.can_advance_to(Layer::L0));
        assert!(Layer::L2.can_advance_to(Layer::Invalid));
        assert!(!Layer::Invalid.can_advance_to(Layer::L2));
    }

    #[test]
    fn advance_to_l2_stamps_validity() {
        let tested_on = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut record = HolonRecord::hypothesis("h1", Category::System, "T", "C");

        assert!(record.advance(Layer::L1, tested_on, "external"));
        assert_eq!(record.valid_until, None);

        assert!(record.advance(Layer::L2, tested_on, "external"));
        assert_eq!(record.valid_until.as_deref(), Some("2025-03-02"));

        // Refresh with internal evidence extends the window.
        assert!(record.advance(Layer::L2, tested_on, "internal"));
        assert_eq!(record.valid_until.as_deref(), Some("2025-04-01"));

        assert!(!record.advance(Layer::L0, tested_on, ""));
        assert_eq!(record.layer, Layer::L2);
    }

    #[test]
    fn verdict_and_category_are_case_sensitive() {
        assert_eq!("PASS".parse::<Verdict>(), Ok(Verdict::Pass));
        assert!("pass".parse::<Verdict>().is_err());
        assert_eq!("episteme".parse::<Category>(), Ok(Category::Episteme));
        assert!("System".parse::<Category>().is_err());
    }

    #[test]
    fn invalid_layer_serializes_lowercase() {
        let json = serde_json::to_string(&Layer::Invalid).unwrap();
        assert_eq!(json, "\"invalid\"");
    }
}
