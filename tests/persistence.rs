//! Persistence tests: redb-backed holons and the phase state file survive
//! reopening, and a dispatcher built from config records phase transitions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use epistemic_gate::config::GateConfig;
use epistemic_gate::dispatch::{Dispatcher, ToolHandler, ToolOutcome};
use epistemic_gate::error::{GateError, GateResult};
use epistemic_gate::holon::{Category, HolonRecord, Layer};
use epistemic_gate::paths::ProjectPaths;
use epistemic_gate::phase::Phase;
use epistemic_gate::precondition::PreconditionEngine;
use epistemic_gate::state::{PhaseSource, PhaseStateFile};
use epistemic_gate::store::{DurableHolonStore, HolonStore};
use epistemic_gate::tool::{ToolArgs, ToolCall};

fn args(pairs: &[(&str, &str)]) -> ToolArgs {
    pairs.iter().copied().collect()
}

#[test]
fn holons_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path(), ".fpf");

    {
        let store = DurableHolonStore::open(&paths.store_file).unwrap();
        store
            .put_holon(&HolonRecord::hypothesis("a", Category::System, "A", "a"))
            .unwrap();
        store
            .put_holon(
                &HolonRecord::hypothesis("b", Category::Episteme, "B", "b").with_layer(Layer::L2),
            )
            .unwrap();
        store.set_layer("a", Layer::L1).unwrap();
    }

    {
        let store = DurableHolonStore::open(&paths.store_file).unwrap();
        assert_eq!(store.get_holon("a").unwrap().layer, Layer::L1);
        assert_eq!(store.get_holon("b").unwrap().category, Category::Episteme);
        let counts = store.count_holons_by_layer("default").unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.iter().all(|c| c.count == 1));
    }
}

#[test]
fn validity_stamp_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path(), ".fpf");
    let tested_on = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    {
        let store = DurableHolonStore::open(&paths.store_file).unwrap();
        let mut record =
            HolonRecord::hypothesis("h1", Category::System, "T", "C").with_layer(Layer::L1);
        assert!(record.advance(Layer::L2, tested_on, "external"));
        store.put_holon(&record).unwrap();
    }

    let store = DurableHolonStore::open(&paths.store_file).unwrap();
    let record = store.get_holon("h1").unwrap();
    assert_eq!(record.layer, Layer::L2);
    assert_eq!(record.valid_until.as_deref(), Some("2025-07-31"));
}

#[test]
fn engine_from_config_reads_redb_and_state() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = GateConfig::default();
    let paths = ProjectPaths::new(dir.path(), &config.fpf_dir);
    paths.ensure_dirs().unwrap();
    PhaseStateFile::new(paths.state_file.clone())
        .record_phase(Phase::Audit)
        .unwrap();

    {
        let store = DurableHolonStore::open(&paths.store_file).unwrap();
        store
            .put_holon(
                &HolonRecord::hypothesis("w", Category::System, "W", "w").with_layer(Layer::L2),
            )
            .unwrap();
    }

    let engine = PreconditionEngine::from_config(dir.path(), &config).unwrap();
    assert!(engine.has_store());
    assert_eq!(engine.current_phase().unwrap(), Phase::Audit);
    assert_eq!(engine.resolve_layer("w").unwrap(), Layer::L2);
    engine
        .check_preconditions("audit", &args(&[("hypothesis_id", "w")]))
        .unwrap();
    engine
        .check_preconditions("decide", &args(&[("winner_id", "w"), ("title", "Ship w")]))
        .unwrap();
}

#[test]
fn store_in_other_context_does_not_unlock_decide() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = GateConfig {
        context_id: "payments".into(),
        ..Default::default()
    };
    let paths = ProjectPaths::new(dir.path(), &config.fpf_dir);
    PhaseStateFile::new(paths.state_file.clone())
        .record_phase(Phase::Decision)
        .unwrap();
    {
        let store = DurableHolonStore::open(&paths.store_file).unwrap();
        store
            .put_holon(
                &HolonRecord::hypothesis("w", Category::System, "W", "w").with_layer(Layer::L2),
            )
            .unwrap();
    }

    let engine = PreconditionEngine::from_config(dir.path(), &config).unwrap();
    let err = engine
        .check_preconditions("decide", &args(&[("winner_id", "w"), ("title", "t")]))
        .unwrap_err();
    assert_eq!(err.condition, "no L2 hypotheses found");
}

#[test]
fn config_round_trip_drives_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = ProjectPaths::config_file(dir.path());
    let config = GateConfig {
        fpf_dir: "kb".into(),
        use_store: false,
        ..Default::default()
    };
    config.save(&config_path).unwrap();

    let loaded = GateConfig::load_or_default(&config_path).unwrap();
    assert_eq!(loaded, config);
    let engine = PreconditionEngine::from_config(dir.path(), &loaded).unwrap();
    assert!(!engine.has_store());
    assert!(engine.paths().fpf_dir.ends_with("kb"));
}

// ── Dispatcher over persisted state ────────────────────────────────────

struct Recorder {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

impl ToolHandler for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, call: &ToolCall) -> GateResult<ToolOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutcome::ok(format!("{:?}", call.kind())))
    }
}

#[test]
fn dispatcher_persists_phase_transitions() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = GateConfig {
        tool_prefix: Some("quint_".into()),
        ..Default::default()
    };
    let engine = PreconditionEngine::from_config(dir.path(), &config).unwrap();
    let paths = engine.paths().clone();
    paths.ensure_dirs().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = Dispatcher::new(engine);
    for name in ["propose", "verify", "test"] {
        dispatcher.register(Box::new(Recorder {
            name,
            calls: calls.clone(),
        }));
    }

    dispatcher
        .dispatch(
            "quint_propose",
            &args(&[("title", "T"), ("content", "C"), ("kind", "episteme")]),
        )
        .unwrap();
    std::fs::write(paths.holon_file(Layer::L0, "h1"), "x").unwrap();

    // The phase lives on disk, so a fresh reader sees the transition.
    let state = PhaseStateFile::new(paths.state_file.clone());
    assert_eq!(state.current_phase().unwrap(), Phase::Abduction);

    // Out-of-order test is rejected and leaves the phase alone.
    let err = dispatcher
        .dispatch("quint_test", &args(&[("hypothesis_id", "h1"), ("verdict", "PASS")]))
        .unwrap_err();
    assert!(matches!(
        err,
        GateError::Precondition(ref e) if e.condition == "current phase is ABDUCTION"
    ));
    assert_eq!(state.current_phase().unwrap(), Phase::Abduction);

    dispatcher
        .dispatch("quint_verify", &args(&[("hypothesis_id", "h1"), ("verdict", "PASS")]))
        .unwrap();
    assert_eq!(state.current_phase().unwrap(), Phase::Deduction);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
