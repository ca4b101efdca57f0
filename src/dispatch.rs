//! Tool dispatch: precondition check first, effect second.
//!
//! Handlers implement [`ToolHandler`] and are registered in a [`Dispatcher`].
//! A handler only ever runs after [`PreconditionEngine::check_preconditions`]
//! has permitted the call, and it receives the typed [`ToolCall`] rather than
//! the raw argument bag.

use std::collections::HashMap;

use crate::error::{GateError, GateResult};
use crate::phase::Phase;
use crate::precondition::{Permit, PreconditionEngine};
use crate::tool::{ToolArgs, ToolCall, ToolKind};

/// Output of a tool's effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Human-readable result summary.
    pub result: String,
}

impl ToolOutcome {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// The effect behind a tool name.
pub trait ToolHandler: Send + Sync {
    /// Canonical tool name this handler serves.
    fn name(&self) -> &str;

    /// Perform the effect. Preconditions already hold.
    fn execute(&self, call: &ToolCall) -> GateResult<ToolOutcome>;
}

/// Phase the cycle enters once a tool's effect has succeeded.
pub fn entered_phase(kind: ToolKind) -> Option<Phase> {
    match kind {
        ToolKind::Propose => Some(Phase::Abduction),
        ToolKind::Verify => Some(Phase::Deduction),
        ToolKind::Test => Some(Phase::Induction),
        ToolKind::Audit => Some(Phase::Audit),
        ToolKind::Decide => Some(Phase::Decision),
        _ => None,
    }
}

/// Gated registry of tool handlers.
pub struct Dispatcher {
    engine: PreconditionEngine,
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl Dispatcher {
    pub fn new(engine: PreconditionEngine) -> Self {
        Self {
            engine,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. A handler with the same name is replaced.
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn engine(&self) -> &PreconditionEngine {
        &self.engine
    }

    /// Run only the precondition check.
    pub fn check_preconditions(&self, tool: &str, args: &ToolArgs) -> GateResult<Permit> {
        Ok(self.engine.check_preconditions(tool, args)?)
    }

    /// Check, then execute, then record the entered phase.
    ///
    /// A rejected call never reaches its handler; the precondition error is
    /// returned verbatim.
    pub fn dispatch(&self, tool: &str, args: &ToolArgs) -> GateResult<ToolOutcome> {
        let permit = self.engine.check_preconditions(tool, args).map_err(|e| {
            tracing::warn!(
                tool,
                condition = %e.condition,
                suggestion = %e.suggestion,
                "tool call rejected"
            );
            e
        })?;

        let handler_name = permit
            .call
            .kind()
            .map_or(tool, |kind| kind.name());
        let handler = self
            .handlers
            .get(handler_name)
            .ok_or_else(|| GateError::HandlerNotFound {
                name: handler_name.to_string(),
            })?;

        let outcome = handler.execute(&permit.call).inspect_err(|e| {
            tracing::warn!(tool, error = %e, "tool effect failed, phase unchanged");
        })?;

        if !permit.refresh {
            if let Some(next) = permit.call.kind().and_then(entered_phase) {
                self.engine.phase_source().record_phase(next)?;
                tracing::info!(tool, phase = %next, "phase recorded");
            }
        }
        Ok(outcome)
    }

    /// Names of all registered handlers.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("engine", &self.engine)
            .field("handlers", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::PreconditionError;
    use crate::holon::Layer;
    use crate::paths::ProjectPaths;
    use crate::state::FixedPhase;
    use tempfile::TempDir;

    struct CountingTool {
        name: &'static str,
        runs: Arc<AtomicUsize>,
    }

    impl ToolHandler for CountingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn execute(&self, _call: &ToolCall) -> GateResult<ToolOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(ToolOutcome::ok(format!("{} ran", self.name)))
        }
    }

    struct FailingTool;

    impl ToolHandler for FailingTool {
        fn name(&self) -> &str {
            "verify"
        }

        fn execute(&self, _call: &ToolCall) -> GateResult<ToolOutcome> {
            Err(GateError::ToolFailed {
                tool: "verify".into(),
                message: "could not move holon to L1".into(),
            })
        }
    }

    fn setup(phase: Phase) -> (TempDir, Dispatcher, Arc<AtomicUsize>) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path(), ".fpf");
        paths.ensure_dirs().unwrap();
        let engine = PreconditionEngine::new(paths, Arc::new(FixedPhase::new(phase)));
        let mut dispatcher = Dispatcher::new(engine);
        let runs = Arc::new(AtomicUsize::new(0));
        for name in ["propose", "test", "status"] {
            dispatcher.register(Box::new(CountingTool {
                name,
                runs: runs.clone(),
            }));
        }
        (dir, dispatcher, runs)
    }

    fn proposal() -> ToolArgs {
        ToolArgs::new()
            .with("title", "T")
            .with("content", "C")
            .with("kind", "system")
    }

    #[test]
    fn rejected_call_never_runs_handler() {
        let (_dir, dispatcher, runs) = setup(Phase::Audit);
        let err = dispatcher.dispatch("propose", &proposal()).unwrap_err();
        assert!(matches!(
            err,
            GateError::Precondition(PreconditionError { ref condition, .. })
                if condition == "current phase is AUDIT"
        ));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.engine().current_phase().unwrap(), Phase::Audit);
    }

    #[test]
    fn permitted_call_runs_and_records_phase() {
        let (_dir, dispatcher, runs) = setup(Phase::Idle);
        let outcome = dispatcher.dispatch("propose", &proposal()).unwrap();
        assert_eq!(outcome.result, "propose ran");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.engine().current_phase().unwrap(), Phase::Abduction);
    }

    #[test]
    fn refresh_keeps_phase() {
        let (_dir, dispatcher, runs) = setup(Phase::Decision);
        let paths = dispatcher.engine().paths().clone();
        std::fs::write(paths.holon_file(Layer::L2, "done"), "x").unwrap();

        let args = ToolArgs::new()
            .with("hypothesis_id", "done")
            .with("verdict", "PASS");
        dispatcher.dispatch("test", &args).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.engine().current_phase().unwrap(), Phase::Decision);
    }

    #[test]
    fn ungated_tool_leaves_phase_alone() {
        let (_dir, dispatcher, _runs) = setup(Phase::Induction);
        dispatcher.dispatch("status", &ToolArgs::new()).unwrap();
        assert_eq!(dispatcher.engine().current_phase().unwrap(), Phase::Induction);
    }

    #[test]
    fn missing_handler_is_reported() {
        let (_dir, dispatcher, _runs) = setup(Phase::Idle);
        let err = dispatcher.dispatch("init", &ToolArgs::new()).unwrap_err();
        assert!(matches!(err, GateError::HandlerNotFound { ref name } if name == "init"));
    }

    #[test]
    fn list_is_sorted() {
        let (_dir, dispatcher, _runs) = setup(Phase::Idle);
        assert_eq!(dispatcher.list(), vec!["propose", "status", "test"]);
        assert_eq!(dispatcher.len(), 3);
    }

    #[test]
    fn failed_effect_records_no_phase() {
        let (_dir, mut dispatcher, _runs) = setup(Phase::Abduction);
        dispatcher.register(Box::new(FailingTool));
        let paths = dispatcher.engine().paths().clone();
        std::fs::write(paths.holon_file(Layer::L0, "h1"), "x").unwrap();

        let args = ToolArgs::new()
            .with("hypothesis_id", "h1")
            .with("verdict", "PASS");
        let err = dispatcher.dispatch("verify", &args).unwrap_err();
        assert!(matches!(
            err,
            GateError::ToolFailed { ref tool, .. } if tool == "verify"
        ));
        assert_eq!(dispatcher.engine().current_phase().unwrap(), Phase::Abduction);
    }
}
