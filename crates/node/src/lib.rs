//! IOU Node - Local network, journal and CLI orchestration
//!
//! Every party runs in-process over one in-memory network; the journal on
//! disk is what survives between runs.

pub mod commands;
pub mod config;
pub mod context;
pub mod keys;

pub use config::NodeConfig;
pub use context::{AppContext, AuditFailure, AuditReport, CommandError};
