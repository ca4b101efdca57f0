//! Phase-gate table: which phases each tool may run in.
//!
//! Only the propose → verify → test → audit → decide core is gated under the
//! default [`GatePolicy::Minimal`]. Everything else relies on the semantic
//! preconditions alone. Tools without an entry are unrestricted.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::tool::ToolKind;

const PROPOSE_PHASES: &[Phase] = &[
    Phase::Idle,
    Phase::Abduction,
    Phase::Deduction,
    Phase::Induction,
];
const VERIFY_PHASES: &[Phase] = &[Phase::Abduction, Phase::Deduction];
const TEST_PHASES: &[Phase] = &[Phase::Deduction, Phase::Induction];
const AUDIT_PHASES: &[Phase] = &[Phase::Induction, Phase::Audit];
const DECIDE_PHASES: &[Phase] = &[Phase::Audit, Phase::Decision];
const IDLE_ONLY: &[Phase] = &[Phase::Idle];

/// Which gate table is in force.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Gate only the five lifecycle tools.
    #[default]
    Minimal,
    /// Additionally restrict initialization tools to Idle.
    Strict,
}

/// Read-only tool → allowed-phases table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseGate {
    policy: GatePolicy,
}

impl PhaseGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Phases in which `tool` may run, or `None` when it is unrestricted.
    pub fn allowed_phases(&self, tool: ToolKind) -> Option<&'static [Phase]> {
        match tool {
            ToolKind::Propose => Some(PROPOSE_PHASES),
            ToolKind::Verify => Some(VERIFY_PHASES),
            ToolKind::Test => Some(TEST_PHASES),
            ToolKind::Audit => Some(AUDIT_PHASES),
            ToolKind::Decide => Some(DECIDE_PHASES),
            ToolKind::Init | ToolKind::RecordContext if self.policy == GatePolicy::Strict => {
                Some(IDLE_ONLY)
            }
            _ => None,
        }
    }

    /// Same as [`allowed_phases`](Self::allowed_phases) for a raw tool name.
    pub fn allowed_phases_for(&self, name: &str) -> Option<&'static [Phase]> {
        ToolKind::from_name(name).and_then(|kind| self.allowed_phases(kind))
    }

    /// Whether `tool` may run in `current`.
    pub fn is_allowed(&self, tool: ToolKind, current: Phase) -> bool {
        self.allowed_phases(tool)
            .is_none_or(|allowed| allowed.contains(&current))
    }

    /// Same as [`is_allowed`](Self::is_allowed) for a raw tool name.
    pub fn is_allowed_for(&self, name: &str, current: Phase) -> bool {
        ToolKind::from_name(name).is_none_or(|kind| self.is_allowed(kind, current))
    }
}
