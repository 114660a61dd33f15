// Ruxi Inspect Gate - Tool Errors
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every failure a tool can produce. Display text IS the wire format:
// callers see only strings, and match on the leading marker.

use thiserror::Error;

/// Marker carried by every path-guard rejection
pub const SECURITY_MARKER: &str = "Security Error:";
/// Marker carried by every other failure
pub const ERROR_MARKER: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Security Error: access to path '{0}' is denied.")]
    SecurityDenied(String),

    #[error("Error: path '{0}' was not found.")]
    NotFound(String),

    #[error("Error: directory '{0}' does not exist or is invalid.")]
    InvalidPath(String),

    #[error("Error: {0}")]
    Io(String),

    #[error("Error: command '{0}' was not found.")]
    CommandNotFound(String),

    #[error("Error running command: {0}")]
    CommandFailed(String),

    #[error("Error: could not parse output of '{command}': {detail}")]
    ParseError { command: String, detail: String },

    #[error("Error: missing required argument '{0}'")]
    MissingArgument(String),

    #[error("Error: unknown tool '{0}'")]
    UnknownTool(String),
}

impl ToolError {
    /// Short kind label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::SecurityDenied(_) => "SecurityDenied",
            ToolError::NotFound(_) => "NotFound",
            ToolError::InvalidPath(_) => "InvalidPath",
            ToolError::Io(_) => "IOError",
            ToolError::CommandNotFound(_) => "CommandNotFound",
            ToolError::CommandFailed(_) => "CommandFailed",
            ToolError::ParseError { .. } => "ParseError",
            ToolError::MissingArgument(_) => "MissingArgument",
            ToolError::UnknownTool(_) => "UnknownTool",
        }
    }
}

/// True when a rendered tool response carries a failure marker.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(SECURITY_MARKER) || text.starts_with(ERROR_MARKER)
}

// ============================================================================
// TESTS
// ============================================================================
