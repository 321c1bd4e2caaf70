//! dify-gateway adapts a simplified chat/completion/workflow API onto
//! Dify-style conversational-AI backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the platform registry, the SSE decoder, and the chat and
//!   workflow adapters that translate logical requests into upstream calls.
//! - [`api`] defines the upstream wire payloads (request bodies, blocking
//!   envelopes, conversation history records).
//! - [`cli`] provides a thin interactive terminal front-end that consumes
//!   the adapter API.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`) and
//! routes through [`crate::cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
