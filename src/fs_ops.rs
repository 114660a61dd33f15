// Ruxi Inspect Gate - Filesystem Tools
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// read_file, list_directory, get_file_metadata.
// Every entry point checks the PathGuard BEFORE any filesystem call.
// Read-only: nothing here opens a file for writing.

use crate::error::ToolError;
use crate::guard::PathGuard;
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::SystemTime;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of filesystem object behind a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    File,
    Directory,
    Other,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::File => "file",
            ObjectType::Directory => "directory",
            ObjectType::Other => "other",
        }
    }
}

/// Metadata record returned by get_file_metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub object_type: ObjectType,
    pub size_bytes: u64,
    pub last_modified: String,
    /// Inode change time on Unix, not birth time.
    pub created_time: String,
    pub permissions_octal: String,
}

impl FileMetadata {
    /// Fixed text block sent over the wire
    pub fn render(&self) -> String {
        format!(
            "path: {}\ntype: {}\nsize_bytes: {}\nlast_modified: {}\ncreated_time: {}\npermissions_octal: {}",
            self.path,
            self.object_type.as_str(),
            self.size_bytes,
            self.last_modified,
            self.created_time,
            self.permissions_octal,
        )
    }
}

fn guard_check(guard: &PathGuard, path: &str) -> Result<(), ToolError> {
    if guard.is_allowed(path) {
        Ok(())
    } else {
        log::warn!("BLOCKED path outside sandbox {}: {}", guard.root(), path);
        Err(ToolError::SecurityDenied(path.to_string()))
    }
}

fn map_io(path: &str, e: io::Error) -> ToolError {
    match e.kind() {
        io::ErrorKind::NotFound => ToolError::NotFound(path.to_string()),
        _ => ToolError::Io(e.to_string()),
    }
}

/// Read a whole file as UTF-8 text
pub fn read_file(guard: &PathGuard, path: &str) -> Result<String, ToolError> {
    guard_check(guard, path)?;
    std::fs::read_to_string(path).map_err(|e| map_io(path, e))
}

/// Immediate children of a directory, in host order
pub fn list_directory(guard: &PathGuard, path: &str) -> Result<Vec<String>, ToolError> {
    guard_check(guard, path)?;

    if !Path::new(path).is_dir() {
        return Err(ToolError::InvalidPath(path.to_string()));
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| ToolError::Io(e.to_string()))? {
        let entry = entry.map_err(|e| ToolError::Io(e.to_string()))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

/// Stat a path (symlinks followed)
pub fn file_metadata(guard: &PathGuard, path: &str) -> Result<FileMetadata, ToolError> {
    guard_check(guard, path)?;

    let meta = std::fs::metadata(path).map_err(|e| map_io(path, e))?;

    let object_type = if meta.is_file() {
        ObjectType::File
    } else if meta.is_dir() {
        ObjectType::Directory
    } else {
        ObjectType::Other
    };

    let modified = meta.modified().map_err(|e| ToolError::Io(e.to_string()))?;

    Ok(FileMetadata {
        path: path.to_string(),
        object_type,
        size_bytes: meta.len(),
        last_modified: format_system_time(modified),
        created_time: change_time(&meta),
        permissions_octal: permissions_octal(mode_bits(&meta)),
    })
}

/// Last 4 octal digits of a mode, zero-padded.
pub fn permissions_octal(mode: u32) -> String {
    let full = format!("{:04o}", mode);
    full[full.len() - 4..].to_string()
}

/// Format a Unix timestamp in local time
pub fn format_timestamp(secs: i64) -> String {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn format_system_time(t: SystemTime) -> String {
    let dt: DateTime<Local> = t.into();
    dt.format(TIME_FORMAT).to_string()
}

#[cfg(unix)]
fn change_time(meta: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format_timestamp(meta.ctime())
}

#[cfg(not(unix))]
fn change_time(meta: &std::fs::Metadata) -> String {
    meta.created()
        .or_else(|_| meta.modified())
        .map(format_system_time)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(unix)]
fn mode_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode_bits(meta: &std::fs::Metadata) -> u32 {
    let base = if meta.is_dir() { 0o40777 } else { 0o100666 };
    if meta.permissions().readonly() { base & !0o222 } else { base }
}

// ============================================================================
// TESTS
// ============================================================================
