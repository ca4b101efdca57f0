//! The precondition engine: the single gate every tool call passes through.
//!
//! [`PreconditionEngine::check_preconditions`] is a pure function of its
//! inputs and the current persisted state (tier directories, store, phase).
//! Nothing is cached between calls. The first violated rule is returned;
//! violations are never accumulated.
//!
//! Order of evaluation:
//!
//! 1. `test` on a holon already at L2 skips the phase gate (evidence refresh).
//! 2. Phase gate from [`PhaseGate`]. A phase that cannot be read rejects
//!    every gated tool.
//! 3. Tool-specific semantic rules. Unknown tools pass.

use std::path::Path;
use std::sync::Arc;

use crate::config::GateConfig;
use crate::error::{GateResult, LayerLookupError, PreconditionError, StateError};
use crate::gate::{GatePolicy, PhaseGate};
use crate::holon::{DEFAULT_CONTEXT, Layer};
use crate::knowledge::{KnowledgeTiers, LayerResolver};
use crate::paths::ProjectPaths;
use crate::phase::{Phase, format_phases};
use crate::role::expected_role;
use crate::state::{PhaseSource, PhaseStateFile};
use crate::store::{DurableHolonStore, HolonStore};
use crate::tool::{
    AuditArgs, Checked, DecideArgs, HolonRefArgs, ProposeArgs, RecordContextArgs, SearchArgs,
    TestArgs, ToolArgs, ToolCall, VerifyArgs,
};

type Check = Result<(), PreconditionError>;

/// A permitted tool call, translated into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub call: ToolCall,
    /// The call re-tests a holon already at L2.
    pub refresh: bool,
}

/// Phase gating plus per-tool semantic validation.
pub struct PreconditionEngine {
    tiers: KnowledgeTiers,
    store: Option<Arc<dyn HolonStore>>,
    resolver: LayerResolver,
    phase: Arc<dyn PhaseSource>,
    gate: PhaseGate,
    context_id: String,
    tool_prefix: Option<String>,
}

impl PreconditionEngine {
    /// Engine over `paths` with no store and the minimal gate table.
    pub fn new(paths: ProjectPaths, phase: Arc<dyn PhaseSource>) -> Self {
        let tiers = KnowledgeTiers::new(paths);
        Self {
            resolver: LayerResolver::standard(tiers.clone(), None),
            tiers,
            store: None,
            phase,
            gate: PhaseGate::default(),
            context_id: DEFAULT_CONTEXT.into(),
            tool_prefix: None,
        }
    }

    /// Attach a structured store; it becomes the fallback layer source.
    pub fn with_store(mut self, store: Arc<dyn HolonStore>) -> Self {
        self.resolver = LayerResolver::standard(self.tiers.clone(), Some(store.clone()));
        self.store = Some(store);
        self
    }

    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.gate = PhaseGate::new(policy);
        self
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    pub fn with_tool_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tool_prefix = Some(prefix.into());
        self
    }

    /// Build an engine for the project at `root` as `config` describes it:
    /// phase from the state file, redb store when enabled.
    pub fn from_config(root: &Path, config: &GateConfig) -> GateResult<Self> {
        let paths = ProjectPaths::new(root, &config.fpf_dir);
        let phase = Arc::new(PhaseStateFile::new(paths.state_file.clone()));
        let store_file = paths.store_file.clone();
        let mut engine = Self::new(paths, phase)
            .with_policy(config.gate_policy)
            .with_context(config.context_id.clone());
        if let Some(prefix) = &config.tool_prefix {
            engine = engine.with_tool_prefix(prefix.clone());
        }
        if config.use_store {
            let store = DurableHolonStore::open(&store_file)?;
            engine = engine.with_store(Arc::new(store));
        }
        Ok(engine)
    }

    pub fn paths(&self) -> &ProjectPaths {
        self.tiers.paths()
    }

    pub fn gate(&self) -> PhaseGate {
        self.gate
    }

    pub fn phase_source(&self) -> &Arc<dyn PhaseSource> {
        &self.phase
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn current_phase(&self) -> Result<Phase, StateError> {
        self.phase.current_phase()
    }

    /// Current layer of a holon: tier directories first, then the store.
    pub fn resolve_layer(&self, id: &str) -> Result<Layer, LayerLookupError> {
        self.resolver.resolve(id)
    }

    /// Decide whether `tool` may run with `args` right now.
    ///
    /// `tool` is reported in diagnostics exactly as received; the configured
    /// namespace prefix is stripped only for lookup.
    pub fn check_preconditions(
        &self,
        tool: &str,
        args: &ToolArgs,
    ) -> Result<Permit, PreconditionError> {
        let canonical = self
            .tool_prefix
            .as_deref()
            .and_then(|prefix| tool.strip_prefix(prefix))
            .unwrap_or(tool);
        let call = ToolCall::from_args(canonical, args);
        let refresh = matches!(&call, ToolCall::Test(t) if self.is_l2_refresh(t));

        let outcome = if refresh {
            tracing::debug!(tool, "L2 refresh, skipping phase gate");
            self.check_semantics(tool, &call)
        } else {
            self.check_phase_gate(tool, &call)
                .and_then(|()| self.check_semantics(tool, &call))
        };

        match outcome {
            Ok(()) => Ok(Permit { call, refresh }),
            Err(e) => {
                tracing::debug!(tool, condition = %e.condition, "precondition failed");
                Err(e)
            }
        }
    }

    fn is_l2_refresh(&self, args: &TestArgs) -> bool {
        !args.hypothesis_id.is_empty()
            && self.resolver.resolve(&args.hypothesis_id) == Ok(Layer::L2)
    }

    fn check_phase_gate(&self, tool: &str, call: &ToolCall) -> Check {
        let Some(kind) = call.kind() else {
            return Ok(());
        };
        let Some(allowed) = self.gate.allowed_phases(kind) else {
            return Ok(());
        };
        let current = self.phase.current_phase().map_err(|e| {
            PreconditionError::new(
                tool,
                "phase state unreadable",
                format!("{e}. Reset it with `epigate phase set <PHASE>`"),
            )
        })?;
        if allowed.contains(&current) {
            return Ok(());
        }
        Err(PreconditionError::new(
            tool,
            format!("current phase is {current}"),
            format!(
                "Allowed phases: {}. {current} expects {}, but this tool acts as {}",
                format_phases(allowed),
                expected_role(current),
                kind.role(),
            ),
        ))
    }

    fn check_semantics(&self, tool: &str, call: &ToolCall) -> Check {
        match call {
            ToolCall::Init => Ok(()),
            ToolCall::RecordContext(args) => check_record_context(tool, args),
            ToolCall::Propose(args) => check_propose(tool, args),
            ToolCall::Verify(args) => self.check_verify(tool, args),
            ToolCall::Test(args) => self.check_test(tool, args),
            ToolCall::Audit(args) => self.check_audit(tool, args),
            ToolCall::Decide(args) => self.check_decide(tool, args),
            ToolCall::CalculateR(args) => self.check_calculate_r(tool, args),
            ToolCall::AuditTree(args) => self.check_audit_tree(tool, args),
            ToolCall::Search(args) => check_search(tool, args),
            ToolCall::Unrestricted { .. } => Ok(()),
        }
    }

    fn check_verify(&self, tool: &str, args: &VerifyArgs) -> Check {
        let id = &args.hypothesis_id;
        require(tool, id, "hypothesis_id", "Specify which hypothesis to verify")?;

        // Verify only ever acts on L0 material, so probe that tier directly.
        if !self.tiers.contains(Layer::L0, id) {
            return Err(PreconditionError::new(
                tool,
                format!("hypothesis '{id}' not found in L0"),
                "Run `propose` first to create a hypothesis, or check the hypothesis ID",
            ));
        }
        check_verdict(tool, &args.verdict, "Specify the verification outcome")
    }

    fn check_test(&self, tool: &str, args: &TestArgs) -> Check {
        let id = &args.hypothesis_id;
        require(tool, id, "hypothesis_id", "Specify which hypothesis to test")?;

        let still_in_l0 = || {
            PreconditionError::new(
                tool,
                format!("hypothesis '{id}' is still in L0"),
                "Run `verify` first to promote the hypothesis to L1 before testing",
            )
        };
        if self.tiers.contains(Layer::L0, id) {
            return Err(still_in_l0());
        }

        let on_disk = self.tiers.contains(Layer::L1, id) || self.tiers.contains(Layer::L2, id);
        if !on_disk {
            match self.store.as_ref().and_then(|s| s.get_holon(id).ok()) {
                Some(record) if matches!(record.layer, Layer::L1 | Layer::L2) => {}
                Some(record) if record.layer == Layer::L0 => return Err(still_in_l0()),
                _ => {
                    return Err(PreconditionError::new(
                        tool,
                        format!("hypothesis '{id}' not found in L1 or L2"),
                        "Ensure the hypothesis exists and has been verified (L0 -> L1) first. \
                         L2 hypotheses can also be tested to refresh evidence",
                    ));
                }
            }
        }
        check_verdict(tool, &args.verdict, "Specify the test outcome")
    }

    fn check_audit(&self, tool: &str, args: &AuditArgs) -> Check {
        let id = &args.hypothesis_id;
        require(tool, id, "hypothesis_id", "Specify which hypothesis to audit")?;

        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = store.get_holon(id).map_err(|_| {
            PreconditionError::new(
                tool,
                format!("hypothesis '{id}' not found"),
                "Ensure the hypothesis exists in the store",
            )
        })?;
        if record.layer != Layer::L2 {
            return Err(PreconditionError::new(
                tool,
                format!("hypothesis '{id}' is in {}, not L2", record.layer),
                "Only L2 (validated) hypotheses can be audited for a final decision",
            ));
        }
        Ok(())
    }

    fn check_decide(&self, tool: &str, args: &DecideArgs) -> Check {
        let record = &args.record;
        require(tool, &record.winner_id, "winner_id", "Specify the winning hypothesis ID")?;
        require(tool, &record.title, "title", "Provide a title for the decision record")?;

        // Without a store there is nothing to count; do not block.
        let Some(store) = &self.store else {
            return Ok(());
        };
        let l2_count = store
            .count_holons_by_layer(&self.context_id)
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.layer == Layer::L2)
            .map_or(0, |c| c.count);
        if l2_count == 0 {
            return Err(PreconditionError::new(
                tool,
                "no L2 hypotheses found",
                "Complete the cycle first: propose (L0) -> verify (L1) -> test (L2), then decide",
            ));
        }
        Ok(())
    }

    fn check_calculate_r(&self, tool: &str, args: &HolonRefArgs) -> Check {
        let store = self.require_store(tool)?;
        let id = &args.holon_id;
        require(tool, id, "holon_id", "Specify which holon to calculate reliability for")?;
        if store.get_holon(id).is_err() {
            return Err(PreconditionError::new(
                tool,
                format!("holon '{id}' not found"),
                "Ensure the holon exists in the store",
            ));
        }
        Ok(())
    }

    fn check_audit_tree(&self, tool: &str, args: &HolonRefArgs) -> Check {
        self.require_store(tool)?;
        require(
            tool,
            &args.holon_id,
            "holon_id",
            "Specify which holon to visualize the audit tree for",
        )
    }

    fn require_store(&self, tool: &str) -> Result<&Arc<dyn HolonStore>, PreconditionError> {
        self.store.as_ref().ok_or_else(|| {
            PreconditionError::new(
                tool,
                "database not initialized",
                "Run `init` to initialize the project first",
            )
        })
    }
}

impl std::fmt::Debug for PreconditionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreconditionEngine")
            .field("fpf_dir", &self.tiers.paths().fpf_dir)
            .field("store", &self.store.is_some())
            .field("gate", &self.gate)
            .field("context_id", &self.context_id)
            .finish()
    }
}

fn require(tool: &str, value: &str, field: &str, suggestion: &str) -> Check {
    if value.is_empty() {
        return Err(PreconditionError::new(
            tool,
            format!("{field} is required"),
            suggestion,
        ));
    }
    Ok(())
}

fn check_verdict<T>(tool: &str, verdict: &Checked<T>, suggestion: &str) -> Check {
    match verdict {
        Checked::Valid(_) => Ok(()),
        Checked::Invalid(_) => Err(PreconditionError::new(
            tool,
            "verdict must be PASS, FAIL, or REFINE",
            suggestion,
        )),
    }
}

fn check_record_context(tool: &str, args: &RecordContextArgs) -> Check {
    require(tool, &args.vocabulary, "vocabulary", "Provide key terms and their definitions")?;
    require(tool, &args.invariants, "invariants", "Provide system rules and constraints")
}

fn check_propose(tool: &str, args: &ProposeArgs) -> Check {
    require(tool, &args.title, "title", "Provide a descriptive title for the hypothesis")?;
    require(tool, &args.content, "content", "Describe the hypothesis in detail")?;
    if let Checked::Invalid(_) = args.kind {
        return Err(PreconditionError::new(
            tool,
            "kind must be 'system' or 'episteme'",
            "Use 'system' for technical hypotheses, 'episteme' for knowledge claims",
        ));
    }
    Ok(())
}

fn check_search(tool: &str, args: &SearchArgs) -> Check {
    if args.query.trim().is_empty() {
        return Err(PreconditionError::new(
            tool,
            "query is required",
            "Provide search terms, e.g. a component name or a concept",
        ));
    }
    Ok(())
}
