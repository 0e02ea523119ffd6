//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{FieldPatch, StudentRecord};
use crate::roster::{SortColumn, SortDirection};

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Email address to sign in as
    pub email: String,
}

/// Whoami command arguments.
#[derive(Debug, Args)]
pub struct WhoamiCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Student id, e.g. ST-001
    #[arg(long)]
    pub id: String,

    /// Full name
    #[arg(long)]
    pub name: String,

    /// Age in years (5-25)
    #[arg(long, allow_negative_numbers = true)]
    pub age: i32,

    /// Grade label
    #[arg(long)]
    pub grade: String,

    /// Email address
    #[arg(long)]
    pub email: String,
}

impl AddCommand {
    /// The record described by these arguments.
    #[must_use]
    pub fn to_record(&self) -> StudentRecord {
        StudentRecord::new(
            self.id.clone(),
            self.name.clone(),
            self.age,
            self.grade.clone(),
            self.email.clone(),
        )
    }
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Id of the student to update
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New age
    #[arg(long, allow_negative_numbers = true)]
    pub age: Option<i32>,

    /// New grade label
    #[arg(long)]
    pub grade: Option<String>,

    /// New email address
    #[arg(long)]
    pub email: Option<String>,
}

impl UpdateCommand {
    /// The field changes requested by these arguments.
    #[must_use]
    pub fn patch(&self) -> FieldPatch {
        FieldPatch {
            name: self.name.clone(),
            age: self.age,
            grade: self.grade.clone(),
            email: self.email.clone(),
        }
    }
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the student to delete
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Page to show (1-based)
    #[arg(short, long, default_value = "1")]
    pub page: usize,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for in id, name, age, grade or email
    pub term: String,

    /// Page of results to show (1-based)
    #[arg(short, long, default_value = "1")]
    pub page: usize,
}

/// Sort command arguments.
#[derive(Debug, Args)]
pub struct SortCommand {
    /// Column to sort by
    #[arg(value_enum)]
    pub column: SortColumnArg,

    /// Sort largest first
    #[arg(short, long)]
    pub desc: bool,
}

impl SortCommand {
    /// The requested direction.
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// File to write (defaults to the configured export file name)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Theme command arguments.
#[derive(Debug, Args)]
pub struct ThemeCommand {
    /// Show the current theme instead of toggling it
    #[arg(short, long)]
    pub show: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Sortable column argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortColumnArg {
    /// Student id
    Id,
    /// Name
    Name,
    /// Age (numeric)
    Age,
    /// Grade label
    Grade,
    /// Email address
    Email,
}

impl From<SortColumnArg> for SortColumn {
    fn from(arg: SortColumnArg) -> Self {
        match arg {
            SortColumnArg::Id => Self::Id,
            SortColumnArg::Name => Self::Name,
            SortColumnArg::Age => Self::Age,
            SortColumnArg::Grade => Self::Grade,
            SortColumnArg::Email => Self::Email,
        }
    }
}
