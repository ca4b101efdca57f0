//! Where the current phase comes from.
//!
//! The engine never caches the phase. It asks its [`PhaseSource`] on every
//! check, so a phase recorded by another call is seen immediately. A source
//! that cannot say which phase it is in reports an error; it never guesses.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::phase::Phase;

/// Supplies (and optionally records) the current phase.
pub trait PhaseSource: Send + Sync {
    /// Current phase of the reasoning cycle.
    fn current_phase(&self) -> Result<Phase, StateError>;

    /// Record a new phase. Sources that cannot persist ignore the call.
    fn record_phase(&self, _phase: Phase) -> Result<(), StateError> {
        Ok(())
    }
}

/// A phase held in memory; used when embedding the engine and in tests.
#[derive(Debug)]
pub struct FixedPhase(RwLock<Phase>);

impl FixedPhase {
    pub fn new(phase: Phase) -> Self {
        Self(RwLock::new(phase))
    }
}

impl PhaseSource for FixedPhase {
    fn current_phase(&self) -> Result<Phase, StateError> {
        Ok(self.0.read().map(|p| *p).unwrap_or_else(|poisoned| *poisoned.into_inner()))
    }

    fn record_phase(&self, phase: Phase) -> Result<(), StateError> {
        match self.0.write() {
            Ok(mut guard) => *guard = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
        Ok(())
    }
}

/// On-disk shape of the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: Phase,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self { phase: Phase::Idle }
    }
}

/// Phase persisted as JSON in `<fpf>/state.json`.
#[derive(Debug, Clone)]
pub struct PhaseStateFile {
    path: PathBuf,
}

impl PhaseStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state. A missing file means Idle.
    pub fn load(&self) -> Result<PhaseState, StateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PhaseState::default());
            }
            Err(e) => {
                return Err(StateError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&content).map_err(|e| StateError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write the state, creating the parent directory if needed.
    pub fn save(&self, state: PhaseState) -> Result<(), StateError> {
        let content =
            serde_json::to_string_pretty(&state).map_err(|e| StateError::Parse {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(&self.path, content).map_err(|e| StateError::Write {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

impl PhaseSource for PhaseStateFile {
    fn current_phase(&self) -> Result<Phase, StateError> {
        self.load().map(|state| state.phase).inspect_err(|e| {
            tracing::warn!(error = %e, "unreadable phase state");
        })
    }

    fn record_phase(&self, phase: Phase) -> Result<(), StateError> {
        self.save(PhaseState { phase })
    }
}

impl PhaseSource for Phase {
    fn current_phase(&self) -> Result<Phase, StateError> {
        Ok(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_idle() {
        let dir = TempDir::new().unwrap();
        let state = PhaseStateFile::new(dir.path().join("state.json"));
        assert_eq!(state.current_phase().unwrap(), Phase::Idle);
    }

    #[test]
    fn record_then_read_back() {
        let dir = TempDir::new().unwrap();
        let state = PhaseStateFile::new(dir.path().join("nested/state.json"));
        state.record_phase(Phase::Induction).unwrap();
        assert_eq!(state.current_phase().unwrap(), Phase::Induction);

        let raw = std::fs::read_to_string(state.path()).unwrap();
        assert!(raw.contains("INDUCTION"));
    }

    #[test]
    fn truncated_file_is_an_error_not_idle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let state = PhaseStateFile::new(&path);
        state.record_phase(Phase::Decision).unwrap();
        std::fs::write(&path, "{\"phase\": \"DECIS").unwrap();
        assert!(matches!(state.load(), Err(StateError::Parse { .. })));
        assert!(matches!(state.current_phase(), Err(StateError::Parse { .. })));
    }

    #[test]
    fn unknown_phase_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"phase\": \"REVIEW\"}").unwrap();
        assert!(PhaseStateFile::new(&path).current_phase().is_err());
    }

    #[test]
    fn fixed_phase_records_in_memory() {
        let fixed = FixedPhase::new(Phase::Abduction);
        assert_eq!(fixed.current_phase().unwrap(), Phase::Abduction);
        fixed.record_phase(Phase::Deduction).unwrap();
        assert_eq!(fixed.current_phase().unwrap(), Phase::Deduction);
    }
}
