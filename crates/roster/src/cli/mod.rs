//! Command-line interface for roster.
//!
//! This module provides the CLI structure for the `roster` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, DeleteCommand, ExportCommand, ListCommand, LoginCommand,
    SearchCommand, SortColumnArg, SortCommand, ThemeCommand, UpdateCommand, WhoamiCommand,
};

/// roster - Keep a small roster of student records
///
/// Add, edit, search, sort and export student records stored in a local
/// database. Sign in with an email address first; addresses containing
/// "admin" may export.
#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with an email address
    Login(LoginCommand),

    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami(WhoamiCommand),

    /// Add a student
    Add(AddCommand),

    /// Change an existing student
    Update(UpdateCommand),

    /// Delete a student
    Delete(DeleteCommand),

    /// List students one page at a time
    List(ListCommand),

    /// Search students
    Search(SearchCommand),

    /// Sort the roster (the order is saved)
    Sort(SortCommand),

    /// Export the roster as CSV (admin only)
    Export(ExportCommand),

    /// Show the grade distribution chart
    Chart,

    /// Toggle dark mode
    Theme(ThemeCommand),

    /// Start an interactive session
    Shell,

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
