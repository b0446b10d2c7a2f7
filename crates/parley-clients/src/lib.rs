//! # parley-clients
//!
//! Concrete implementations of the collaborator contracts defined in
//! `parley-core`.
//!
//! - **HTTP**: [`HttpRecordStore`], [`HttpSemanticStore`], [`HttpLlmClient`]
//!   built on `reqwest`, sharing one [`HttpEndpoint`] helper for auth,
//!   timeouts and status mapping
//! - **Resilience**: [`RetryingLlmClient`] wraps any [`LlmClient`] with
//!   exponential backoff and jitter
//! - **In-memory**: [`InMemoryRecordStore`] and [`InMemorySemanticStore`] for
//!   offline runs and tests
//! - **Mock**: [`MockLlmClient`] returns scripted responses and records every
//!   request
//!
//! [`LlmClient`]: parley_core::LlmClient

#![deny(unsafe_code)]

pub mod http;
pub mod in_memory;
pub mod llm;
pub mod mock;
pub mod record_store;
pub mod retry;
pub mod semantic_store;

pub use http::HttpEndpoint;
pub use in_memory::{InMemoryRecordStore, InMemorySemanticStore};
pub use llm::HttpLlmClient;
pub use mock::{MockLlmClient, MockResponse};
pub use record_store::HttpRecordStore;
pub use retry::{RetryConfig, RetryingLlmClient};
pub use semantic_store::HttpSemanticStore;
