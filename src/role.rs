//! Roles: the human-meaningful label behind each tool.
//!
//! Roles carry no enforcement power. They only feed expectation strings in
//! diagnostics ("Abductor or Deductor").

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::tool::ToolKind;

/// Who is expected to call a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Initializer,
    Abductor,
    Deductor,
    Inductor,
    Auditor,
    Decider,
    Observer,
    Maintainer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializer => "Initializer",
            Self::Abductor => "Abductor",
            Self::Deductor => "Deductor",
            Self::Inductor => "Inductor",
            Self::Auditor => "Auditor",
            Self::Decider => "Decider",
            Self::Observer => "Observer",
            Self::Maintainer => "Maintainer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToolKind {
    /// Static tool → role mapping.
    pub fn role(self) -> Role {
        match self {
            Self::Init | Self::RecordContext => Role::Initializer,
            Self::Propose => Role::Abductor,
            Self::Verify => Role::Deductor,
            Self::Test => Role::Inductor,
            Self::Audit => Role::Auditor,
            Self::Decide => Role::Decider,
            Self::Reset | Self::CheckDecay | Self::Actualize => Role::Maintainer,
            Self::Status | Self::CalculateR | Self::AuditTree | Self::Query | Self::Search => {
                Role::Observer
            }
        }
    }
}

/// Role for a tool name. Unknown tools are read-only Observers.
pub fn role_for_tool(name: &str) -> Role {
    ToolKind::from_name(name).map_or(Role::Observer, ToolKind::role)
}

/// Human-readable description of the roles expected to act in a phase.
pub fn expected_role(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Initializer or Abductor",
        Phase::Abduction => "Abductor or Deductor",
        Phase::Deduction => "Deductor or Inductor",
        Phase::Induction => "Inductor or Auditor",
        Phase::Audit => "Auditor or Decider",
        Phase::Decision | Phase::Operation => "Decider",
    }
}
