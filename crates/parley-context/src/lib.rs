//! # parley-context
//!
//! Decides what the LLM sees on every interview turn.
//!
//! The [`ContextWindowManager`] keeps the rolling state of one session and
//! builds the message list for the next question:
//!
//! 1. one system message with the job description, the resume (full text on
//!    the first turn, summaries afterwards) and the running summary
//! 2. the last `window_size` rounds verbatim, oldest first
//! 3. the current question
//!
//! Rounds that leave the window are compressed by the [`Summarizer`] every
//! `summary_interval` rounds. Summarization failures never abort a turn.

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod manager;
pub mod summarizer;
pub mod types;

pub use errors::{ContextError, Result};
pub use manager::ContextWindowManager;
pub use summarizer::{Summarizer, serialize_rounds};
pub use types::{ContextConfig, ContextState, ConversationRound};
