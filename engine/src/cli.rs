//! CLI interface for Gavel
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for running a judging session.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gavel live judging coordinator
///
/// Runs timed presentation rounds, relays judge scores in real time and
/// guarantees every assigned judge ends each round with exactly one score.
#[derive(Parser, Debug)]
#[command(name = "gavel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the session server until Ctrl-C or SIGTERM
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show recorded scores, newest first
    Scores {
        /// Number of scores to show (default: 20)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Follow a running session as a director
    Watch {
        /// WebSocket URL of the session server
        #[arg(long, default_value = "ws://127.0.0.1:4000/ws")]
        url: String,
    },
}
