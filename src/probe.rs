// Ruxi Inspect Gate - System Probes
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// get_memory_status and list_processes.
// Host state comes from external commands (`free -m`, `ps aux`).
// Spawning sits behind CommandRunner so parsing is testable without a host.
// No path ever reaches this module.

use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Command;
use std::time::{Duration, Instant};

pub const MEMORY_PROGRAM: &str = "free";
pub const MEMORY_ARGS: &[&str] = &["-m"];

pub const PROCESS_SHELL: &str = "sh";
pub const PROCESS_PIPELINE: &str = "ps aux | head -n 16";
/// Header line + 15 processes
pub const PROCESS_LINE_LIMIT: usize = 16;

// Exit codes from coreutils `timeout` (plain and --signal=KILL)
const TIMEOUT_EXIT_CODES: &[i32] = &[124, 137];
// `timeout` exits 127 when it cannot exec the wrapped program
const WRAPPED_NOT_FOUND_CODE: i32 = 127;

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { success: true, code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self { success: false, code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }
}

/// Runs one external program to completion
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ToolError>;
}

/// Spawns real subprocesses, optionally under coreutils `timeout`
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    timeout_secs: Option<u64>,
}

impl SystemCommandRunner {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self { timeout_secs }
    }

    /// Spawn and wait. The flag says whether `timeout` actually wrapped the program.
    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<(std::process::Output, bool)> {
        match self.timeout_secs {
            Some(secs) => Command::new("timeout")
                .arg("--signal=KILL")
                .arg(format!("{}s", secs))
                .arg(program)
                .args(args)
                .output()
                .map(|out| (out, true))
                .or_else(|_| {
                    // timeout binary not found — fall back to direct execution
                    Command::new(program).args(args).output().map(|out| (out, false))
                }),
            None => Command::new(program).args(args).output().map(|out| (out, false)),
        }
    }
}

/// Decide whether an exit from a `timeout`-wrapped program was caused by the
/// wrapper rather than the program itself. The wrapped program may exit with
/// 124/127/137 on its own, so the code alone is not enough: a timeout also
/// needs the deadline to have passed, and a failed exec needs `timeout:` on stderr.
pub fn wrapper_failure(
    program: &str,
    code: Option<i32>,
    stderr: &str,
    elapsed: Duration,
    timeout_secs: u64,
) -> Option<ToolError> {
    let code = code?;
    if code == WRAPPED_NOT_FOUND_CODE && stderr.trim_start().starts_with("timeout:") {
        return Some(ToolError::CommandNotFound(program.to_string()));
    }
    if TIMEOUT_EXIT_CODES.contains(&code) && elapsed >= Duration::from_secs(timeout_secs) {
        return Some(ToolError::CommandFailed(format!("command timed out after {}s", timeout_secs)));
    }
    None
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ToolError> {
        let started = Instant::now();
        let (output, wrapped) = self.spawn(program, args).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ToolError::CommandNotFound(program.to_string()),
            _ => ToolError::Io(format!("failed to run {}: {}", program, e)),
        })?;

        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if let (true, Some(secs)) = (wrapped, self.timeout_secs) {
            if let Some(err) = wrapper_failure(program, code, &stderr, started.elapsed(), secs) {
                return Err(err);
            }
        }

        Ok(CommandOutput {
            success: output.status.success(),
            code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }
}

// ============================================================================
// MEMORY
// ============================================================================

/// Parsed `free -m` memory line, values in MB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub total_mb: u64,
    pub used_mb: u64,
    pub available_mb: u64,
}

impl MemoryReport {
    /// `used/total*100` to one decimal, or "0%" when total is zero
    pub fn used_percent(&self) -> String {
        if self.total_mb == 0 {
            return "0%".to_string();
        }
        format!("{:.1}%", self.used_mb as f64 / self.total_mb as f64 * 100.0)
    }

    pub fn render(&self) -> String {
        format!(
            "Memorie RAM Status: OK\n  Total RAM: {} MB\n  RAM Disponibila: {} MB\n  RAM Utilizata: {} MB ({})",
            self.total_mb,
            self.available_mb,
            self.used_mb,
            self.used_percent(),
        )
    }
}

fn memory_command() -> String {
    format!("{} {}", MEMORY_PROGRAM, MEMORY_ARGS.join(" "))
}

fn parse_error(detail: impl Into<String>) -> ToolError {
    ToolError::ParseError { command: memory_command(), detail: detail.into() }
}

/// Column indices in the `Mem:` row
const TOTAL_FIELD: usize = 1;
const USED_FIELD: usize = 2;
const AVAILABLE_FIELD: usize = 6;

/// Parse `free -m` stdout. Second line holds the Mem: row.
pub fn parse_memory_output(stdout: &str) -> Result<MemoryReport, ToolError> {
    let lines: Vec<&str> = stdout.trim().split('\n').collect();
    if lines.len() < 2 {
        return Err(parse_error(format!("expected at least 2 lines, got {}", lines.len())));
    }

    let fields: Vec<&str> = lines[1].split_whitespace().collect();
    let field = |idx: usize, name: &str| -> Result<u64, ToolError> {
        let raw = fields
            .get(idx)
            .ok_or_else(|| parse_error(format!("missing {} column (index {})", name, idx)))?;
        raw.parse::<u64>()
            .map_err(|_| parse_error(format!("{} column is not a number: {}", name, raw)))
    };

    Ok(MemoryReport {
        total_mb: field(TOTAL_FIELD, "total")?,
        used_mb: field(USED_FIELD, "used")?,
        available_mb: field(AVAILABLE_FIELD, "available")?,
    })
}

/// Run `free -m` and parse it
pub fn run_memory_probe(runner: &dyn CommandRunner) -> Result<MemoryReport, ToolError> {
    let output = runner.run(MEMORY_PROGRAM, MEMORY_ARGS)?;
    if !output.success {
        return Err(ToolError::CommandFailed(output.stderr.trim().to_string()));
    }
    parse_memory_output(&output.stdout)
}

// ============================================================================
// PROCESSES
// ============================================================================

/// Keep at most `limit` lines, untouched otherwise
pub fn limit_lines(text: &str, limit: usize) -> String {
    text.lines().take(limit).collect::<Vec<_>>().join("\n")
}

/// Run `ps aux | head -n 16`, returned verbatim (trimmed)
pub fn run_process_probe(runner: &dyn CommandRunner) -> Result<String, ToolError> {
    let output = runner.run(PROCESS_SHELL, &["-c", PROCESS_PIPELINE])?;
    if !output.success {
        return Err(ToolError::CommandFailed(output.stderr.trim().to_string()));
    }
    let trimmed = output.stdout.trim();
    // Pipeline status is head's, so a missing or failing ps still "succeeds".
    // Nothing on stdout plus something on stderr means ps never ran.
    if trimmed.is_empty() && !output.stderr.trim().is_empty() {
        return Err(ToolError::CommandFailed(output.stderr.trim().to_string()));
    }
    if trimmed.lines().count() > PROCESS_LINE_LIMIT {
        return Ok(limit_lines(trimmed, PROCESS_LINE_LIMIT));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Canned runner: returns a fixed result and records what it was asked to run
    pub(crate) struct FakeRunner {
        result: Result<CommandOutput, ToolError>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub fn ok(stdout: &str) -> Self {
            Self { result: Ok(CommandOutput::success(stdout)), calls: Mutex::new(Vec::new()) }
        }

        pub fn with(result: Result<CommandOutput, ToolError>) -> Self {
            Self { result, calls: Mutex::new(Vec::new()) }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ToolError> {
            self.calls.lock().unwrap().push(format!("{} {}", program, args.join(" ")));
            self.result.clone()
        }
    }

    const FREE_OUTPUT: &str = "\
               total        used        free      shared  buff/cache   available
Mem:           15842        6120        2301         512        7420        8911
Swap:           2047           0        2047
";

    #[test]
    fn parses_real_free_layout() {
        let report = parse_memory_output(FREE_OUTPUT).unwrap();
        assert_eq!(report, MemoryReport { total_mb: 15842, used_mb: 6120, available_mb: 8911 });
    }

    #[test]
    fn mocked_free_renders_report() {
        let runner = FakeRunner::ok("header\nMem: 1000 400 50 10 90 500\n");
        let report = run_memory_probe(&runner).unwrap();
        assert_eq!(report.total_mb, 1000);
        assert_eq!(report.used_mb, 400);
        assert_eq!(report.available_mb, 500);
        assert_eq!(report.used_percent(), "40.0%");
        assert_eq!(
            report.render(),
            "Memorie RAM Status: OK\n  Total RAM: 1000 MB\n  RAM Disponibila: 500 MB\n  RAM Utilizata: 400 MB (40.0%)"
        );
        assert_eq!(runner.calls.lock().unwrap().as_slice(), ["free -m"]);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let report = MemoryReport { total_mb: 0, used_mb: 0, available_mb: 0 };
        assert_eq!(report.used_percent(), "0%");
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        let report = MemoryReport { total_mb: 3, used_mb: 1, available_mb: 2 };
        assert_eq!(report.used_percent(), "33.3%");
    }

    #[test]
    fn single_line_is_parse_error() {
        let err = parse_memory_output("total used free\n").unwrap_err();
        assert!(matches!(err, ToolError::ParseError { .. }));
        assert!(err.to_string().starts_with("Error: could not parse output of 'free -m'"));
    }

    #[test]
    fn empty_output_is_parse_error() {
        assert!(matches!(parse_memory_output(""), Err(ToolError::ParseError { .. })));
    }

    #[test]
    fn short_row_is_parse_error() {
        let err = parse_memory_output("h\nMem: 1000 400\n").unwrap_err();
        assert!(err.to_string().contains("available"));
    }

    #[test]
    fn non_numeric_column_is_parse_error() {
        let err = parse_memory_output("h\nMem: lots 400 1 2 3 500\n").unwrap_err();
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn missing_free_is_command_not_found() {
        let runner = FakeRunner::with(Err(ToolError::CommandNotFound("free".into())));
        assert_eq!(run_memory_probe(&runner).unwrap_err(), ToolError::CommandNotFound("free".into()));
    }

    #[test]
    fn process_listing_runs_pipeline() {
        let runner = FakeRunner::ok("USER PID\nroot 1\n");
        assert_eq!(run_process_probe(&runner).unwrap(), "USER PID\nroot 1");
        assert_eq!(runner.calls.lock().unwrap().as_slice(), ["sh -c ps aux | head -n 16"]);
    }

    #[test]
    fn process_listing_caps_at_sixteen_lines() {
        let mut text = String::from("USER       PID %CPU %MEM COMMAND\n");
        for i in 0..40 {
            text.push_str(&format!("root     {:>5}  0.0  0.1 worker-{}\n", i, i));
        }
        let runner = FakeRunner::ok(&text);
        let out = run_process_probe(&runner).unwrap();
        assert_eq!(out.lines().count(), PROCESS_LINE_LIMIT);
        assert!(out.starts_with("USER       PID"));
    }

    #[test]
    fn process_listing_keeps_alignment() {
        let text = "  USER   PID\n  root     1   \n";
        let runner = FakeRunner::ok(text);
        assert_eq!(run_process_probe(&runner).unwrap(), "USER   PID\n  root     1");
    }

    #[test]
    fn failing_ps_is_command_failed_with_stderr() {
        let runner = FakeRunner::with(Ok(CommandOutput::failure(1, "ps: permission denied\n")));
        assert_eq!(
            run_process_probe(&runner).unwrap_err(),
            ToolError::CommandFailed("ps: permission denied".into())
        );
    }

    #[test]
    fn pipeline_with_silent_ps_failure_is_command_failed() {
        let runner = FakeRunner::with(Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: "sh: 1: ps: not found\n".into(),
        }));
        assert_eq!(
            run_process_probe(&runner).unwrap_err(),
            ToolError::CommandFailed("sh: 1: ps: not found".into())
        );
    }

    #[test]
    fn empty_listing_without_stderr_is_empty_success() {
        let runner = FakeRunner::ok("");
        assert_eq!(run_process_probe(&runner).unwrap(), "");
    }

    #[test]
    fn wrapper_exec_failure_needs_timeout_stderr() {
        let secs = 5;
        let quick = Duration::from_millis(10);
        assert_eq!(
            wrapper_failure("free", Some(127), "timeout: failed to run command 'free': No such file or directory\n", quick, secs),
            Some(ToolError::CommandNotFound("free".into()))
        );
        // the program itself exited 127
        assert_eq!(wrapper_failure("free", Some(127), "free: bad flag\n", quick, secs), None);
    }

    #[test]
    fn wrapper_timeout_needs_the_deadline_to_pass() {
        let secs = 2;
        assert_eq!(
            wrapper_failure("sh", Some(124), "", Duration::from_secs(2), secs),
            Some(ToolError::CommandFailed("command timed out after 2s".into()))
        );
        assert_eq!(
            wrapper_failure("sh", Some(137), "", Duration::from_millis(2500), secs),
            Some(ToolError::CommandFailed("command timed out after 2s".into()))
        );
        // fast exits with the same codes belong to the program
        assert_eq!(wrapper_failure("sh", Some(124), "", Duration::from_millis(5), secs), None);
        assert_eq!(wrapper_failure("sh", Some(137), "", Duration::from_millis(5), secs), None);
        assert_eq!(wrapper_failure("sh", Some(0), "", Duration::from_secs(9), secs), None);
        assert_eq!(wrapper_failure("sh", None, "", Duration::from_secs(9), secs), None);
    }

    #[test]
    fn system_runner_reports_missing_binary() {
        let runner = SystemCommandRunner::new(None);
        let err = runner.run("definitely-not-a-real-binary-ruxi", &[]).unwrap_err();
        assert_eq!(err, ToolError::CommandNotFound("definitely-not-a-real-binary-ruxi".into()));
    }
}
