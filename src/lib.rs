// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # epistemic-gate
//!
//! Phase gating and lifecycle validation for knowledge bases that an AI
//! agent advances through discrete tools.
//!
//! ## Architecture
//!
//! - **Phase model** (`phase`, `role`): the reasoning cycle and who acts in it
//! - **Phase-gate table** (`gate`): tool → allowed phases
//! - **Layer accessor** (`knowledge`, `store`): tier directories, then the store
//! - **Precondition engine** (`precondition`): the single enforcement surface
//! - **Dispatcher** (`dispatch`): check first, effect second
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use epistemic_gate::paths::ProjectPaths;
//! use epistemic_gate::phase::Phase;
//! use epistemic_gate::precondition::PreconditionEngine;
//! use epistemic_gate::state::FixedPhase;
//! use epistemic_gate::tool::ToolArgs;
//!
//! let paths = ProjectPaths::new(".", ".fpf");
//! let engine = PreconditionEngine::new(paths, Arc::new(FixedPhase::new(Phase::Idle)));
//! let args = ToolArgs::new()
//!     .with("title", "Cache reads")
//!     .with("content", "An LRU in front of the store halves p99 latency")
//!     .with("kind", "system");
//! engine.check_preconditions("propose", &args).unwrap();
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod holon;
pub mod knowledge;
pub mod paths;
pub mod phase;
pub mod precondition;
pub mod role;
pub mod state;
pub mod store;
pub mod tool;
pub mod validity;
