//! # parley-session
//!
//! Maps every interview question to exactly one persisted record.
//!
//! - [`SessionStateTracker`]: per-sequence lifecycle
//!   (`question_generated -> completed`) with an idempotent
//!   `create_question_record` that checks the record store before writing
//! - [`SessionSignalBus`]: latest-write-wins broadcast of the active session
//!   id, used by a restarted window to pick the session back up

#![deny(unsafe_code)]

pub mod errors;
pub mod signal;
pub mod tracker;
pub mod types;

pub use errors::{Result, SessionError};
pub use signal::{SessionSignal, SessionSignalBus};
pub use tracker::SessionStateTracker;
pub use types::{QuestionTurn, SessionState};
