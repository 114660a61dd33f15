// Ruxi Inspect Gate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI and MCP stdio server. All tool calls route through the Dispatcher.
// Usage:
//   ruxi-gate serve                          # Run MCP server (stdio)
//   ruxi-gate call <tool> [json-args]        # One-shot tool call
//   ruxi-gate tools                          # Print tool definitions
//   ruxi-gate check <path>                   # Path guard verdict
//   ruxi-gate config                         # Print effective config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ruxi_gate::{config::GateConfig, dispatcher_from_config, mcp};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ruxi-gate")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "Ruxi Inspect Gate - sandboxed read-only inspection tools over MCP")]
struct Cli {
    /// JSON config file (defaults used when absent)
    #[arg(short, long, default_value = "ruxi-gate.json")]
    config: PathBuf,

    /// Sandbox root override
    #[arg(short, long, env = "RUXI_ROOT")]
    root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// One-shot tool call — prints the tool's text result
    Call {
        /// Tool name (read_file, list_directory, get_file_metadata, ...)
        tool: String,

        /// Arguments as JSON object string
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Print MCP tool definitions
    Tools,

    /// Check a path against the sandbox guard
    Check {
        /// Path to check
        path: String,
    },

    /// Print effective configuration
    Config,
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();

    let mut config = GateConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(root) = &cli.root {
        config = config.with_root(root.clone());
    }

    config.validate()
        .with_context(|| format!("Invalid sandbox configuration (config {:?})", cli.config))?;

    // Root is fixed from here on
    let dispatcher = dispatcher_from_config(&config)?;

    match &cli.command {
        Commands::Serve => {
            mcp::run(dispatcher);
        }

        Commands::Call { tool, args } => {
            let args: serde_json::Value = serde_json::from_str(args)
                .with_context(|| format!("Invalid args JSON: {}", args))?;

            let (text, failed) = dispatcher.invoke_with_status(tool, &args);
            println!("{}", text);

            if failed {
                std::process::exit(1);
            }
        }

        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&dispatcher.definitions())?);
        }

        Commands::Check { path } => {
            let guard = dispatcher.guard();
            if guard.is_allowed(path) {
                println!("ALLOWED: {} (root {})", path, guard.root());
            } else {
                println!("DENIED: {} (root {})", path, guard.root());
                std::process::exit(1);
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
