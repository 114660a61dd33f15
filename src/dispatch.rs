// Ruxi Inspect Gate - Tool Registry & Dispatcher
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Maps a tool name + JSON arguments to exactly one operation.
// invoke() ALWAYS returns a String: success payload or marker-prefixed error.
// Nothing past this boundary sees a ToolError.

use crate::error::ToolError;
use crate::fs_ops;
use crate::guard::PathGuard;
use crate::probe::{self, CommandRunner};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The closed set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    ReadFile,
    ListDirectory,
    FileMetadata,
    MemoryStatus,
    ListProcesses,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::ReadFile,
        ToolId::ListDirectory,
        ToolId::FileMetadata,
        ToolId::MemoryStatus,
        ToolId::ListProcesses,
    ];

    /// Canonical wire name
    pub fn name(&self) -> &'static str {
        match self {
            ToolId::ReadFile => "read_file",
            ToolId::ListDirectory => "list_directory",
            ToolId::FileMetadata => "get_file_metadata",
            ToolId::MemoryStatus => "get_memory_status",
            ToolId::ListProcesses => "list_processes",
        }
    }

    /// Path argument name followed by accepted aliases. Empty for system tools.
    pub fn path_args(&self) -> &'static [&'static str] {
        match self {
            ToolId::ReadFile => &["path", "file_path"],
            ToolId::ListDirectory => &["dir_path", "path"],
            ToolId::FileMetadata => &["file_path", "path"],
            ToolId::MemoryStatus | ToolId::ListProcesses => &[],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolId::ReadFile => "Read and return the full text content of a file inside the sandbox root.",
            ToolId::ListDirectory => "List every file and sub-directory directly inside a directory in the sandbox root.",
            ToolId::FileMetadata => "Return metadata (type, size, modification time, permissions) for a file or directory in the sandbox root.",
            ToolId::MemoryStatus => "Return current RAM status (total, available, used) in megabytes and the usage percentage.",
            ToolId::ListProcesses => "List the first 15 processes running on the host (user, PID, CPU, memory). Raw `ps aux` output.",
        }
    }

    fn path_description(&self) -> &'static str {
        match self {
            ToolId::ReadFile => "Absolute path to the file to read",
            ToolId::ListDirectory => "Absolute path to the directory to list",
            _ => "Absolute path to the file or directory to inspect",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolId {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read_file" | "get_file_content" => Ok(ToolId::ReadFile),
            "list_directory" => Ok(ToolId::ListDirectory),
            "get_file_metadata" | "file_metadata" => Ok(ToolId::FileMetadata),
            "get_memory_status" | "memory_status" => Ok(ToolId::MemoryStatus),
            "list_processes" => Ok(ToolId::ListProcesses),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

/// MCP tool definition helper
fn tool_def(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

/// Pull the first string-valued argument among `names`.
fn string_arg<'a>(args: &'a Value, names: &[&str]) -> Result<&'a str, ToolError> {
    names
        .iter()
        .find_map(|n| args.get(*n).and_then(|v| v.as_str()))
        .ok_or_else(|| ToolError::MissingArgument(names[0].to_string()))
}

/// Summarize tool params for logging (truncate large values)
pub fn param_summary(tool: ToolId, args: &Value) -> String {
    let names = tool.path_args();
    if names.is_empty() {
        return "(no params)".to_string();
    }
    match string_arg(args, names) {
        Ok(p) if p.chars().count() > 200 => {
            let head: String = p.chars().take(200).collect();
            format!("{}={}…", names[0], head)
        }
        Ok(p) => format!("{}={}", names[0], p),
        Err(_) => format!("{}=?", names[0]),
    }
}

/// Registry of the five tools bound to one sandbox and one command runner
#[derive(Clone)]
pub struct Dispatcher {
    guard: PathGuard,
    runner: Arc<dyn CommandRunner>,
}

impl Dispatcher {
    pub fn new(guard: PathGuard, runner: Arc<dyn CommandRunner>) -> Self {
        Self { guard, runner }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Look up a tool by wire name. Unknown names never reach an operation.
    pub fn resolve(&self, name: &str) -> Result<ToolId, ToolError> {
        name.parse()
    }

    /// MCP definitions for every registered tool
    pub fn definitions(&self) -> Vec<Value> {
        ToolId::ALL
            .iter()
            .map(|tool| {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                if let Some(arg) = tool.path_args().first() {
                    properties.insert(
                        arg.to_string(),
                        json!({"type": "string", "description": tool.path_description()}),
                    );
                    required.push(*arg);
                }
                tool_def(tool.name(), tool.description(), Value::Object(properties), required)
            })
            .collect()
    }

    /// Run a resolved tool, keeping the structured error
    pub fn execute(&self, tool: ToolId, args: &Value) -> Result<String, ToolError> {
        match tool {
            ToolId::ReadFile => {
                let path = string_arg(args, tool.path_args())?;
                fs_ops::read_file(&self.guard, path)
            }
            ToolId::ListDirectory => {
                let path = string_arg(args, tool.path_args())?;
                fs_ops::list_directory(&self.guard, path).map(|names| names.join("\n"))
            }
            ToolId::FileMetadata => {
                let path = string_arg(args, tool.path_args())?;
                fs_ops::file_metadata(&self.guard, path).map(|meta| meta.render())
            }
            ToolId::MemoryStatus => {
                probe::run_memory_probe(self.runner.as_ref()).map(|report| report.render())
            }
            ToolId::ListProcesses => probe::run_process_probe(self.runner.as_ref()),
        }
    }

    /// Boundary entry point: name + args in, one string out. Never fails.
    pub fn invoke(&self, name: &str, args: &Value) -> String {
        self.invoke_with_status(name, args).0
    }

    /// Like `invoke`, plus whether the operation failed.
    /// The flag comes from the operation's Result, never from the text.
    pub fn invoke_with_status(&self, name: &str, args: &Value) -> (String, bool) {
        let tool = match self.resolve(name) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("FAIL {} | {}", name, e);
                return (e.to_string(), true);
            }
        };

        log::info!("CALL {} | {}", tool, param_summary(tool, args));

        match self.execute(tool, args) {
            Ok(text) => (text, false),
            Err(e) => {
                let text = e.to_string();
                let snippet: String = text.chars().take(200).collect();
                log::warn!("FAIL {} [{}] | {}", tool, e.kind(), snippet);
                (text, true)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
