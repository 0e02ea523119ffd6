//! `roster` - Keep a small roster of student records
//!
//! This library provides the record model, the roster controller with
//! search, sort and pagination, a sign-in gate, CSV export, and a
//! key/value persistence layer backed by `SQLite`. Presentation is reached
//! through the [`View`] and [`ChartWidget`] traits so the same core drives
//! the terminal front end and the tests.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod record;
pub mod roster;
pub mod session;
pub mod shell;
pub mod storage;
pub mod view;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use logging::init_logging;
pub use record::{FieldPatch, StudentFields, StudentRecord};
pub use roster::{RosterManager, SortColumn, SortDirection};
pub use session::{Role, Session, SessionGuard};
pub use shell::Shell;
pub use storage::{MemoryStore, PersistenceStore, Scope, Storage};
pub use view::{ChartWidget, TerminalChart, TerminalView, View};
