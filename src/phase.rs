//! Epistemic phases of the reasoning cycle.
//!
//! The cycle runs Idle → Abduction → Deduction → Induction → Audit → Decision,
//! with Operation as the post-decision steady state. Phases are ordered along
//! that path; the ordering is informational only and never enforced here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// A stage of the overall reasoning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Idle,
    Abduction,
    Deduction,
    Induction,
    Audit,
    Decision,
    Operation,
}

impl Phase {
    /// All phases in canonical order.
    pub const ALL: [Phase; 7] = [
        Phase::Idle,
        Phase::Abduction,
        Phase::Deduction,
        Phase::Induction,
        Phase::Audit,
        Phase::Decision,
        Phase::Operation,
    ];

    /// Wire name of this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Abduction => "ABDUCTION",
            Self::Deduction => "DEDUCTION",
            Self::Induction => "INDUCTION",
            Self::Audit => "AUDIT",
            Self::Decision => "DECISION",
            Self::Operation => "OPERATION",
        }
    }

    /// The next phase along the canonical path, `None` for Operation.
    pub fn successor(self) -> Option<Phase> {
        match self {
            Self::Idle => Some(Self::Abduction),
            Self::Abduction => Some(Self::Deduction),
            Self::Deduction => Some(Self::Induction),
            Self::Induction => Some(Self::Audit),
            Self::Audit => Some(Self::Decision),
            Self::Decision => Some(Self::Operation),
            Self::Operation => None,
        }
    }

    /// Whether `other` directly follows or precedes this phase.
    pub fn is_adjacent(self, other: Phase) -> bool {
        self.successor() == Some(other) || other.successor() == Some(self)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StateError::UnknownPhase {
                value: s.to_string(),
            })
    }
}

/// Format a phase set the way diagnostics print it: `[IDLE ABDUCTION]`.
pub fn format_phases(phases: &[Phase]) -> String {
    let names: Vec<&str> = phases.iter().map(|p| p.as_str()).collect();
    format!("[{}]", names.join(" "))
}
