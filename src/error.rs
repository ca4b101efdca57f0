//! Rich diagnostic error types for the gating engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so the invoking agent
//! knows exactly what was rejected and what to do next.

use miette::Diagnostic;
use thiserror::Error;

use crate::paths::PathError;

/// Top-level error type for the gating engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Layer(#[from] LayerLookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("no handler registered for tool \"{name}\"")]
    #[diagnostic(
        code(epigate::dispatch::handler_not_found),
        help("Register a handler for this tool with `Dispatcher::register()` before dispatching it.")
    )]
    HandlerNotFound { name: String },

    #[error("tool \"{tool}\" failed: {message}")]
    #[diagnostic(
        code(epigate::dispatch::tool_failed),
        help("The precondition check passed but the tool's effect failed. Check the inner cause.")
    )]
    ToolFailed { tool: String, message: String },
}

// ---------------------------------------------------------------------------
// Precondition failures
// ---------------------------------------------------------------------------

/// A rejected tool call.
///
/// Every rejection path, phase gate or semantic, produces exactly one of these.
/// The three fields are surfaced to the invoking agent verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Precondition failed for {tool}: {condition}. Suggestion: {suggestion}")]
#[diagnostic(code(epigate::precondition), help("{suggestion}"))]
pub struct PreconditionError {
    /// Tool that was rejected.
    pub tool: String,
    /// What did not hold.
    pub condition: String,
    /// The next step that would make the call legal.
    pub suggestion: String,
}

impl PreconditionError {
    pub fn new(
        tool: impl Into<String>,
        condition: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            condition: condition.into(),
            suggestion: suggestion.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(epigate::store::io),
        help(
            "A filesystem operation failed. Check that the project directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(epigate::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             If the file is corrupt, move it aside and run `epigate init` again."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(epigate::store::serde),
        help(
            "Failed to serialize or deserialize a holon record. \
             The stored format may come from an incompatible version."
        )
    )]
    Serialization { message: String },

    #[error("holon not found: {id}")]
    #[diagnostic(
        code(epigate::store::not_found),
        help("No record with this identifier exists in the store. Verify the identifier.")
    )]
    NotFound { id: String },
}

// ---------------------------------------------------------------------------
// Layer lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LayerLookupError {
    #[error("holon {id} not found")]
    #[diagnostic(
        code(epigate::layer::not_found),
        help(
            "The holon is neither in a knowledge tier directory nor in the store. \
             Propose it first or check the identifier."
        )
    )]
    NotFound { id: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(epigate::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(epigate::config::parse),
        help("Check the TOML syntax. Valid gate policies are \"minimal\" and \"strict\".")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(epigate::config::write),
        help("Ensure you have write permissions to the project directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Phase state errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    #[error("failed to read phase state: {path}")]
    #[diagnostic(
        code(epigate::state::read),
        help("The phase state file exists but could not be read. Check its permissions.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse phase state: {path}: {message}")]
    #[diagnostic(
        code(epigate::state::parse),
        help("The state file must be JSON like {{\"phase\": \"IDLE\"}}. Reset it with `epigate phase set IDLE`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write phase state: {path}")]
    #[diagnostic(
        code(epigate::state::write),
        help("Ensure the project directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown phase: \"{value}\"")]
    #[diagnostic(
        code(epigate::state::unknown_phase),
        help("Valid phases are IDLE, ABDUCTION, DEDUCTION, INDUCTION, AUDIT, DECISION, OPERATION.")
    )]
    UnknownPhase { value: String },
}

/// Convenience alias for functions returning gating results.
pub type GateResult<T> = std::result::Result<T, GateError>;
