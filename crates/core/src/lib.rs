//! `cognee-core`: the coordination layer over pluggable storage, embedding,
//! and rate-limited LLM backends. See each module for the component it
//! implements:
//!
//! - [`rate_limit`] — C1 rate limiter
//! - [`retry`] — C2 retry/backoff
//! - [`tokenizer`] — C3 tokenizer
//! - [`embeddings`] — C4 embedding engine
//! - [`llm`] — C5 LLM gateway
//! - [`vector`] — C6 vector store
//! - [`cache`] — C7 cache/lock coordinator
//! - [`session`] — C8 session manager
//! - [`retriever`] — C9 retriever core
//! - [`usage_log`] — C11 usage logger
//! - [`graph`] — C12 graph collaborator (ambient)
//!
//! C10 (error taxonomy + config) lives in `cognee-common`, re-exported here
//! for convenience.

pub mod cache;
pub mod embeddings;
pub mod graph;
pub mod llm;
pub mod rate_limit;
pub mod retriever;
pub mod retry;
pub mod session;
pub mod tokenizer;
pub mod usage_log;
pub mod vector;

pub use cognee_common::{config, error::CogneeError, error::Result, model};
