//! pivotrello-core library.
//!
//! Reconciles an ordered Pivotal Tracker backlog into a Trello board. The
//! remote systems are reached only through the traits in [`remote`]; the
//! binary crate supplies HTTP implementations and [`memory::MemoryBoard`]
//! stands in for Trello in tests and dry runs.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums ([`error::SyncError`],
//!   [`error::RemoteError`], [`order::OrderError`]); `anyhow::Result` only
//!   at the config-loading edge.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod cache;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod identity;
pub mod mapping;
pub mod members;
pub mod memory;
pub mod model;
pub mod order;
pub mod remote;
pub mod retry;
pub mod untouched;
pub mod wipe;
