//! HTTP translation gateway.
//!
//! Resolves source/target languages from partial caller input (detecting
//! the source when needed), selects a lazily loaded model, and runs the
//! translation on a bounded worker pool.

pub mod backend;
pub mod config;
pub mod detect;
pub mod error;
pub mod handler;
pub mod invoker;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod server;
