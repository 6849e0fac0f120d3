//! Process shell for the status ingestion edge.
//!
//! Wires configuration, the AMQP publisher and the HTTP router together and
//! serves them on TCP or a Unix socket. The binary in `main.rs` is a thin
//! wrapper around these pieces.

#![forbid(unsafe_code)]

pub mod config;
pub mod listener;

pub use config::{Config, ConfigError, ListenAddr, redact_url};
