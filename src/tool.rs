//! Tool vocabulary and argument translation.
//!
//! Agents send a tool name plus a flat string map. [`ToolArgs`] is that map;
//! [`ToolCall::from_args`] turns it into one typed struct per tool so the
//! precondition engine never does stringly-typed lookups. An absent key reads
//! as the empty string, never as an error.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::holon::{Category, Verdict};

/// Every tool the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Init,
    RecordContext,
    Propose,
    Verify,
    Test,
    Audit,
    Decide,
    Reset,
    CheckDecay,
    Actualize,
    Status,
    CalculateR,
    AuditTree,
    Query,
    Search,
}

impl ToolKind {
    pub const ALL: [ToolKind; 15] = [
        ToolKind::Init,
        ToolKind::RecordContext,
        ToolKind::Propose,
        ToolKind::Verify,
        ToolKind::Test,
        ToolKind::Audit,
        ToolKind::Decide,
        ToolKind::Reset,
        ToolKind::CheckDecay,
        ToolKind::Actualize,
        ToolKind::Status,
        ToolKind::CalculateR,
        ToolKind::AuditTree,
        ToolKind::Query,
        ToolKind::Search,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::RecordContext => "record_context",
            Self::Propose => "propose",
            Self::Verify => "verify",
            Self::Test => "test",
            Self::Audit => "audit",
            Self::Decide => "decide",
            Self::Reset => "reset",
            Self::CheckDecay => "check_decay",
            Self::Actualize => "actualize",
            Self::Status => "status",
            Self::CalculateR => "calculate_r",
            Self::AuditTree => "audit_tree",
            Self::Query => "query",
            Self::Search => "search",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat key/value payload of a tool call, as received from the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs {
    params: HashMap<String, String>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Parameter value, or `""` when absent.
    pub fn get(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }

    fn owned(&self, name: &str) -> String {
        self.get(name).to_string()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<HashMap<String, String>> for ToolArgs {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ToolArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A value that must belong to a closed set, kept raw when it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checked<T> {
    Valid(T),
    Invalid(String),
}

impl<T: std::str::FromStr> Checked<T> {
    fn parse(raw: &str) -> Self {
        raw.parse()
            .map_or_else(|_| Checked::Invalid(raw.to_string()), Checked::Valid)
    }
}

impl<T> Checked<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Checked::Valid(v) => Some(v),
            Checked::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContextArgs {
    pub vocabulary: String,
    pub invariants: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeArgs {
    pub title: String,
    pub content: String,
    pub kind: Checked<Category>,
    pub scope: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyArgs {
    pub hypothesis_id: String,
    pub checks_json: String,
    pub verdict: Checked<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArgs {
    pub hypothesis_id: String,
    pub test_type: String,
    pub result: String,
    pub verdict: Checked<Verdict>,
}

impl TestArgs {
    /// Expiry of the evidence this test produces when run on `tested_on`.
    pub fn valid_until(&self, tested_on: chrono::NaiveDate) -> String {
        crate::validity::valid_until_from(tested_on, &self.test_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditArgs {
    pub hypothesis_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecideArgs {
    pub record: crate::holon::DecisionRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolonRefArgs {
    pub holon_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    pub query: String,
    pub layer_filter: String,
    pub scope: String,
}

/// A tool call after boundary translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Init,
    RecordContext(RecordContextArgs),
    Propose(ProposeArgs),
    Verify(VerifyArgs),
    Test(TestArgs),
    Audit(AuditArgs),
    Decide(DecideArgs),
    CalculateR(HolonRefArgs),
    AuditTree(HolonRefArgs),
    Search(SearchArgs),
    /// Any tool without semantic rules: maintenance, status, unknown names.
    Unrestricted { name: String },
}

impl ToolCall {
    /// Translate a raw tool name and argument bag.
    pub fn from_args(name: &str, args: &ToolArgs) -> Self {
        let Some(kind) = ToolKind::from_name(name) else {
            return ToolCall::Unrestricted {
                name: name.to_string(),
            };
        };
        match kind {
            ToolKind::Init => ToolCall::Init,
            ToolKind::RecordContext => ToolCall::RecordContext(RecordContextArgs {
                vocabulary: args.owned("vocabulary"),
                invariants: args.owned("invariants"),
            }),
            ToolKind::Propose => ToolCall::Propose(ProposeArgs {
                title: args.owned("title"),
                content: args.owned("content"),
                kind: Checked::parse(args.get("kind")),
                scope: args.owned("scope"),
                rationale: args.owned("rationale"),
            }),
            ToolKind::Verify => ToolCall::Verify(VerifyArgs {
                hypothesis_id: args.owned("hypothesis_id"),
                checks_json: args.owned("checks_json"),
                verdict: Checked::parse(args.get("verdict")),
            }),
            ToolKind::Test => ToolCall::Test(TestArgs {
                hypothesis_id: args.owned("hypothesis_id"),
                test_type: args.owned("test_type"),
                result: args.owned("result"),
                verdict: Checked::parse(args.get("verdict")),
            }),
            ToolKind::Audit => ToolCall::Audit(AuditArgs {
                hypothesis_id: args.owned("hypothesis_id"),
            }),
            ToolKind::Decide => ToolCall::Decide(DecideArgs {
                record: crate::holon::DecisionRecord {
                    winner_id: args.owned("winner_id"),
                    title: args.owned("title"),
                    context: args.owned("context"),
                    decision: args.owned("decision"),
                    rationale: args.owned("rationale"),
                    consequences: args.owned("consequences"),
                },
            }),
            ToolKind::CalculateR => ToolCall::CalculateR(HolonRefArgs {
                holon_id: args.owned("holon_id"),
            }),
            ToolKind::AuditTree => ToolCall::AuditTree(HolonRefArgs {
                holon_id: args.owned("holon_id"),
            }),
            ToolKind::Search => ToolCall::Search(SearchArgs {
                query: args.owned("query"),
                layer_filter: args.owned("layer_filter"),
                scope: args.owned("scope"),
            }),
            ToolKind::Reset
            | ToolKind::CheckDecay
            | ToolKind::Actualize
            | ToolKind::Status
            | ToolKind::Query => ToolCall::Unrestricted {
                name: kind.name().to_string(),
            },
        }
    }

    /// The known tool behind this call, if any.
    pub fn kind(&self) -> Option<ToolKind> {
        match self {
            ToolCall::Init => Some(ToolKind::Init),
            ToolCall::RecordContext(_) => Some(ToolKind::RecordContext),
            ToolCall::Propose(_) => Some(ToolKind::Propose),
            ToolCall::Verify(_) => Some(ToolKind::Verify),
            ToolCall::Test(_) => Some(ToolKind::Test),
            ToolCall::Audit(_) => Some(ToolKind::Audit),
            ToolCall::Decide(_) => Some(ToolKind::Decide),
            ToolCall::CalculateR(_) => Some(ToolKind::CalculateR),
            ToolCall::AuditTree(_) => Some(ToolKind::AuditTree),
            ToolCall::Search(_) => Some(ToolKind::Search),
            ToolCall::Unrestricted { name } => ToolKind::from_name(name),
        }
    }
}
