// Ruxi Inspect Gate - MCP Server (JSON-RPC 2.0 over stdio)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// ALL tool calls route through the Dispatcher.
// Exposes: read_file, list_directory, get_file_metadata,
//          get_memory_status, list_processes
//
// stdout is JSON-RPC only. Logging goes to stderr via env_logger.
// Each tools/call runs on its own thread; responses are written whole
// under one output lock.

use crate::dispatch::Dispatcher;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "ruxi-gate";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// JSON-RPC error codes
const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Write one JSON-RPC message as a single line
fn write_message(out: &mut dyn Write, msg: &Value) {
    let line = match serde_json::to_string(msg) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to encode response: {}", e);
            return;
        }
    };
    let _ = out.write_all(line.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Write one message under the shared output lock
fn send<W: Write>(output: &Mutex<W>, msg: &Value) {
    let mut out = output.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    write_message(&mut *out, msg);
}

/// JSON-RPC success envelope
pub fn response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// JSON-RPC error envelope
pub fn error_response(id: &Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Wrap a dispatcher string as an MCP tools/call result.
/// `is_error` comes from the operation, not from the text.
pub fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

/// What to do with one incoming line
pub enum Reply {
    /// Answer now
    Now(Value),
    /// Run a tool call off the reader thread
    ToolCall { id: Value, name: String, args: Value },
    /// Notification or unparseable input
    Nothing,
}

/// Decide how to answer one JSON-RPC line. No I/O, no tool execution.
pub fn handle_line(line: &str, dispatcher: &Dispatcher) -> Reply {
    let line = line.trim();
    if line.is_empty() {
        return Reply::Nothing;
    }

    let msg: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("JSON parse error: {}", e);
            return Reply::Now(error_response(&Value::Null, PARSE_ERROR, &format!("Parse error: {}", e)));
        }
    };

    let method = msg["method"].as_str().unwrap_or("");
    let id = msg["id"].clone();
    let params = &msg["params"];

    log::debug!("Received: {}", method);

    match method {
        "initialize" => Reply::Now(response(&id, json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            }
        }))),

        "notifications/initialized" => Reply::Nothing,

        "tools/list" => Reply::Now(response(&id, json!({ "tools": dispatcher.definitions() }))),

        "tools/call" => {
            let name = params["name"].as_str().unwrap_or("");
            if id.is_null() {
                // Notifications get no response, so there is nobody to run it for
                log::warn!("ignoring tools/call without id: {}", name);
                return Reply::Nothing;
            }
            if let Err(e) = dispatcher.resolve(name) {
                log::warn!("FAIL {} | {}", name, e);
                return Reply::Now(error_response(&id, INVALID_PARAMS, &e.to_string()));
            }
            let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            Reply::ToolCall { id, name: name.to_string(), args }
        }

        "ping" => Reply::Now(response(&id, json!({}))),

        _ => {
            if id.is_null() {
                Reply::Nothing
            } else {
                Reply::Now(error_response(&id, METHOD_NOT_FOUND, &format!("Unknown method: {}", method)))
            }
        }
    }
}

/// Serve MCP on stdin/stdout until stdin closes
pub fn run(dispatcher: Dispatcher) {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);
    log::info!("Sandbox root: {}", dispatcher.guard().root());

    let stdin = io::stdin();
    serve(Arc::new(dispatcher), stdin.lock(), Arc::new(Mutex::new(io::stdout())));

    log::info!("stdin closed, {} shutting down", SERVER_NAME);
}

/// Read JSON-RPC lines from `input` until EOF, answering on `output`.
/// Each tools/call runs on its own thread; all of them are joined before return.
pub fn serve<R, W>(dispatcher: Arc<Dispatcher>, input: R, output: Arc<Mutex<W>>)
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let mut workers = Vec::new();

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("stdin read error: {}", e);
                continue;
            }
        };

        match handle_line(&line, &dispatcher) {
            Reply::Now(msg) => send(&output, &msg),
            Reply::Nothing => {}
            Reply::ToolCall { id, name, args } => {
                let dispatcher = Arc::clone(&dispatcher);
                let output = Arc::clone(&output);
                workers.push(thread::spawn(move || {
                    let (text, is_error) = dispatcher.invoke_with_status(&name, &args);
                    send(&output, &response(&id, tool_result(text, is_error)));
                }));
                workers.retain(|w| !w.is_finished());
            }
        }
    }

    // Drain in-flight calls so their responses are not lost on EOF
    for worker in workers {
        let _ = worker.join();
    }
}

// ============================================================================
// TESTS
// ============================================================================
