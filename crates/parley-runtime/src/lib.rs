//! # parley-runtime
//!
//! Drives an interview on top of the engine components.
//!
//! - **Collaborators**: record store, semantic store and LLM, wired over HTTP
//!   from settings or in memory for offline use
//! - **`InterviewRuntime`**: prompt → LLM → question record, then answer →
//!   record update → context round, until `finish`

#![deny(unsafe_code)]

pub mod collaborators;
pub mod errors;
pub mod runtime;

pub use collaborators::Collaborators;
pub use errors::{Result, RuntimeError};
pub use runtime::{GeneratedQuestion, InterviewRuntime, InterviewSummary};
