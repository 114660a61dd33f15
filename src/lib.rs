// Ruxi Inspect Gate - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fs_ops;
pub mod guard;
pub mod mcp;
pub mod probe;

pub use dispatch::{Dispatcher, ToolId};
pub use error::ToolError;
pub use guard::PathGuard;

use std::sync::Arc;

/// Wire a dispatcher from startup config: guard on the sandbox root,
/// real subprocesses for the probes. Invalid roots are refused.
pub fn dispatcher_from_config(config: &config::GateConfig) -> anyhow::Result<Dispatcher> {
    config.validate()?;
    Ok(Dispatcher::new(
        PathGuard::new(config.sandbox_root.clone()),
        Arc::new(probe::SystemCommandRunner::new(config.command_timeout_secs)),
    ))
}
