//! Interactive command shell.
//!
//! Reads one command per line and runs it against an [`App`]. Input
//! mistakes are reported and the loop carries on; only store and file
//! system failures end the session. Words may be wrapped in `"` or `'` so
//! names with spaces stay a single argument.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::app::App;
use crate::error::{Error, Result};
use crate::record::{FieldPatch, StudentRecord};
use crate::roster::{SortColumn, SortDirection};
use crate::storage::PersistenceStore;
use crate::view::{ChartWidget, View};

const PROMPT: &str = "roster> ";

/// Name, usage line and summary of every shell command.
const COMMANDS: &[(&str, &str, &str)] = &[
    ("login", "login EMAIL", "Sign in"),
    ("logout", "logout", "Sign out"),
    ("whoami", "whoami", "Show who is signed in"),
    ("add", "add ID NAME AGE GRADE EMAIL", "Add a student"),
    ("edit", "edit ID", "Load a student into the edit form"),
    ("save", "save [FIELD=VALUE ...]", "Save the edit form (name, age, grade, email)"),
    ("cancel", "cancel", "Close the edit form"),
    ("delete", "delete ID", "Delete a student"),
    ("search", "search [TERM]", "Filter the table, or clear the filter"),
    ("sort", "sort COLUMN [asc|desc]", "Sort the roster and save the order"),
    ("page", "page N", "Go to page N"),
    ("next", "next", "Next page"),
    ("prev", "prev", "Previous page"),
    ("list", "list", "Redraw the current page"),
    ("export", "export [FILE]", "Write the roster as CSV (admin only)"),
    ("chart", "chart", "Show students per grade"),
    ("theme", "theme", "Toggle dark mode"),
    ("help", "help", "Show this help"),
    ("quit", "quit", "Leave the shell"),
];

/// A line that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quoted word was never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,

    /// The first word is not a command.
    #[error("unknown command '{0}' (type 'help' for a list)")]
    UnknownCommand(String),

    /// A known command with the wrong arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Age is not a whole number.
    #[error("age must be a whole number, got '{0}'")]
    InvalidAge(String),

    /// Page is not a positive number.
    #[error("page must be a positive number, got '{0}'")]
    InvalidPage(String),

    /// Not a sortable column.
    #[error("unknown column '{0}' (id, name, age, grade, email)")]
    UnknownColumn(String),

    /// Not asc or desc.
    #[error("unknown direction '{0}' (asc, desc)")]
    UnknownDirection(String),

    /// Not an editable field.
    #[error("unknown field '{0}' (name, age, grade, email)")]
    UnknownField(String),
}

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Sign in.
    Login(String),
    /// Sign out.
    Logout,
    /// Show the signed-in identity.
    Whoami,
    /// Add a record.
    Add(StudentRecord),
    /// Load a record into the edit form.
    Edit(String),
    /// Save the edit form with the given changes.
    Save(FieldPatch),
    /// Close the edit form.
    Cancel,
    /// Delete a record.
    Delete(String),
    /// Filter the table. An empty term clears the filter.
    Search(String),
    /// Sort the roster.
    Sort(SortColumn, SortDirection),
    /// Go to a page.
    Page(usize),
    /// Next page.
    Next,
    /// Previous page.
    Prev,
    /// Redraw the current page.
    List,
    /// Write CSV, to the given file or the configured one.
    Export(Option<PathBuf>),
    /// Show the grade chart.
    Chart,
    /// Toggle dark mode.
    Theme,
    /// Print the command list.
    Help,
    /// Leave the shell.
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing what is wrong with the line.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, ParseError> {
        let words = split_words(line)?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };
        let name = name.to_lowercase();

        let command = match (name.as_str(), args) {
            ("login", [email]) => Self::Login(email.clone()),
            ("logout", []) => Self::Logout,
            ("whoami", []) => Self::Whoami,
            ("add", [id, student, age, grade, email]) => Self::Add(StudentRecord::new(
                id.clone(),
                student.clone(),
                parse_age(age)?,
                grade.clone(),
                email.clone(),
            )),
            ("edit", [id]) => Self::Edit(id.clone()),
            ("save", pairs) => Self::Save(parse_patch(pairs)?),
            ("cancel", []) => Self::Cancel,
            ("delete", [id]) => Self::Delete(id.clone()),
            ("search", terms) => Self::Search(terms.join(" ")),
            ("sort", [column]) => Self::Sort(parse_column(column)?, SortDirection::Asc),
            ("sort", [column, direction]) => {
                Self::Sort(parse_column(column)?, parse_direction(direction)?)
            }
            ("page", [page]) => Self::Page(parse_page(page)?),
            ("next", []) => Self::Next,
            ("prev", []) => Self::Prev,
            ("list", []) => Self::List,
            ("export", []) => Self::Export(None),
            ("export", [file]) => Self::Export(Some(PathBuf::from(file))),
            ("chart", []) => Self::Chart,
            ("theme", []) => Self::Theme,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            (other, _) => {
                return Err(match usage(other) {
                    Some(line) => ParseError::Usage(line),
                    None => ParseError::UnknownCommand(other.to_string()),
                })
            }
        };
        Ok(Some(command))
    }
}

/// Split a line into words, honoring single and double quotes.
///
/// # Errors
///
/// Returns [`ParseError::UnterminatedQuote`] if a quote is left open.
pub fn split_words(line: &str) -> std::result::Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => word.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            None => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

fn usage(command: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(name, _, _)| *name == command)
        .map(|(_, usage, _)| *usage)
}

fn parse_age(text: &str) -> std::result::Result<i32, ParseError> {
    text.parse()
        .map_err(|_| ParseError::InvalidAge(text.to_string()))
}

fn parse_page(text: &str) -> std::result::Result<usize, ParseError> {
    match text.parse::<usize>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(ParseError::InvalidPage(text.to_string())),
    }
}

fn parse_column(text: &str) -> std::result::Result<SortColumn, ParseError> {
    match text.to_lowercase().as_str() {
        "id" => Ok(SortColumn::Id),
        "name" => Ok(SortColumn::Name),
        "age" => Ok(SortColumn::Age),
        "grade" => Ok(SortColumn::Grade),
        "email" => Ok(SortColumn::Email),
        _ => Err(ParseError::UnknownColumn(text.to_string())),
    }
}

fn parse_direction(text: &str) -> std::result::Result<SortDirection, ParseError> {
    match text.to_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        _ => Err(ParseError::UnknownDirection(text.to_string())),
    }
}

fn parse_patch(pairs: &[String]) -> std::result::Result<FieldPatch, ParseError> {
    let mut patch = FieldPatch::default();
    for pair in pairs {
        let Some((field, value)) = pair.split_once('=') else {
            return Err(ParseError::Usage("save [FIELD=VALUE ...]"));
        };
        match field.to_lowercase().as_str() {
            "name" => patch.name = Some(value.to_string()),
            "age" => patch.age = Some(parse_age(value)?),
            "grade" => patch.grade = Some(value.to_string()),
            "email" => patch.email = Some(value.to_string()),
            _ => return Err(ParseError::UnknownField(field.to_string())),
        }
    }
    Ok(patch)
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Line-oriented front end over an [`App`].
#[derive(Debug)]
pub struct Shell {
    export_file: PathBuf,
}

impl Shell {
    /// A shell whose bare `export` writes to `export_file`.
    #[must_use]
    pub fn new(export_file: impl Into<PathBuf>) -> Self {
        Self {
            export_file: export_file.into(),
        }
    }

    /// Where a bare `export` writes.
    #[must_use]
    pub fn export_file(&self) -> &Path {
        &self.export_file
    }

    /// Read and run commands until `quit` or end of input.
    ///
    /// Messages go to `out`; screens and tables go through the app's view.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails or `out` cannot be written.
    pub fn run<S, V, C, R, W>(&self, app: &mut App<S, V, C>, mut input: R, out: &mut W) -> Result<()>
    where
        S: PersistenceStore,
        V: View,
        C: ChartWidget,
        R: BufRead,
        W: Write,
    {
        let mut line = String::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }

            let command = match ShellCommand::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "error: {e}")?;
                    continue;
                }
            };
            debug!("Shell command: {:?}", command);

            match self.execute(app, command, &mut input, out) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) if e.is_user_error() => writeln!(out, "error: {e}")?,
                Err(e) => return Err(e),
            }
        }
        info!("Shell closed");
        Ok(())
    }

    fn execute<S, V, C, R, W>(
        &self,
        app: &mut App<S, V, C>,
        command: ShellCommand,
        input: &mut R,
        out: &mut W,
    ) -> Result<Flow>
    where
        S: PersistenceStore,
        V: View,
        C: ChartWidget,
        R: BufRead,
        W: Write,
    {
        match command {
            ShellCommand::Login(email) => app.login(&email)?,
            ShellCommand::Logout => app.logout()?,
            ShellCommand::Whoami => match app.session() {
                Some(session) => {
                    writeln!(out, "Signed in as {} ({})", session.email, session.role)?;
                }
                None => writeln!(out, "Not signed in")?,
            },
            ShellCommand::Add(record) => {
                let id = record.id.clone();
                app.add(record)?;
                writeln!(out, "Added {id}")?;
            }
            ShellCommand::Edit(id) => {
                let record = app.edit(&id)?;
                writeln!(out, "Editing {}. Use 'save FIELD=VALUE ...' or 'cancel'.", record.id)?;
            }
            ShellCommand::Save(patch) => {
                let roster = app.roster();
                let current = roster
                    .editing()
                    .and_then(|id| roster.find(id))
                    .ok_or(Error::NoRecordUnderEdit)?;
                let id = current.id.clone();
                let fields = patch.apply(current.fields());
                app.save(fields)?;
                writeln!(out, "Saved {id}")?;
            }
            ShellCommand::Cancel => app.cancel(),
            ShellCommand::Delete(id) => {
                if confirm(input, out, &format!("Delete {id}?"))? {
                    if app.delete(&id)? {
                        writeln!(out, "Deleted {id}")?;
                    } else {
                        writeln!(out, "No student with id {id}")?;
                    }
                }
            }
            ShellCommand::Search(term) => {
                let matches = app.search(&term)?;
                if !term.is_empty() {
                    writeln!(out, "{matches} matching")?;
                }
            }
            ShellCommand::Sort(column, direction) => app.sort(column, direction)?,
            ShellCommand::Page(page) => app.change_page(page)?,
            ShellCommand::Next => app.next_page()?,
            ShellCommand::Prev => app.prev_page()?,
            ShellCommand::List => app.change_page(app.roster().current_page())?,
            ShellCommand::Export(file) => {
                let csv = app.export()?;
                let path = file.unwrap_or_else(|| self.export_file.clone());
                std::fs::write(&path, csv)?;
                writeln!(
                    out,
                    "Exported {} students to {}",
                    app.roster().records().len(),
                    path.display()
                )?;
            }
            ShellCommand::Chart => app.show_chart()?,
            ShellCommand::Theme => {
                let dark = app.toggle_theme()?;
                writeln!(out, "Theme: {}", if dark { "dark" } else { "light" })?;
            }
            ShellCommand::Help => print_help(out)?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_help<W: Write>(out: &mut W) -> Result<()> {
    let width = COMMANDS
        .iter()
        .map(|(_, usage, _)| usage.len())
        .max()
        .unwrap_or(0);
    writeln!(out, "Commands:")?;
    for (_, usage, summary) in COMMANDS {
        writeln!(out, "  {usage:<width$}  {summary}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_roster, MemoryStore};
    use crate::view::{TerminalChart, TerminalView};

    type TestApp = App<MemoryStore, TerminalView<Vec<u8>>, TerminalChart<Vec<u8>>>;

    fn app() -> TestApp {
        let mut app = App::new(
            MemoryStore::new(),
            TerminalView::new(Vec::new()),
            TerminalChart::new(Vec::new(), 20),
        )
        .unwrap();
        app.start().unwrap();
        app
    }

    fn run(app: &mut TestApp, script: &str) -> String {
        let mut out = Vec::new();
        Shell::new("students.csv")
            .run(app, script.as_bytes(), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("add ST-001 \"Ann Lee\" 10 5 ann@x.com").unwrap(),
            vec!["add", "ST-001", "Ann Lee", "10", "5", "ann@x.com"]
        );
        assert_eq!(split_words("  a   b  ").unwrap(), vec!["a", "b"]);
        assert_eq!(split_words("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_split_words_quotes() {
        assert_eq!(split_words("say \"O'Brien\"").unwrap(), vec!["say", "O'Brien"]);
        assert_eq!(split_words("x ''").unwrap(), vec!["x", ""]);
        assert_eq!(split_words("name='Ann Lee'").unwrap(), vec!["name=Ann Lee"]);
        assert_eq!(split_words("a \"b"), Err(ParseError::UnterminatedQuote));
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(ShellCommand::parse("   \n"), Ok(None));
    }

    #[test]
    fn test_parse_add() {
        let command = ShellCommand::parse("ADD ST-001 'Ann Lee' 10 5 ann@x.com").unwrap();
        assert_eq!(
            command,
            Some(ShellCommand::Add(StudentRecord::new(
                "ST-001", "Ann Lee", 10, "5", "ann@x.com"
            )))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ShellCommand::parse("add ST-001 Ann"),
            Err(ParseError::Usage("add ID NAME AGE GRADE EMAIL"))
        );
        assert_eq!(
            ShellCommand::parse("add ST-001 Ann ten 5 a@b.c"),
            Err(ParseError::InvalidAge("ten".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("page 0"),
            Err(ParseError::InvalidPage("0".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("sort height"),
            Err(ParseError::UnknownColumn("height".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("sort age up"),
            Err(ParseError::UnknownDirection("up".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("frobnicate"),
            Err(ParseError::UnknownCommand("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_parse_save_patch() {
        let command = ShellCommand::parse("save grade=6 \"name=Ann Marie\" age=11").unwrap();
        assert_eq!(
            command,
            Some(ShellCommand::Save(FieldPatch {
                name: Some("Ann Marie".to_string()),
                age: Some(11),
                grade: Some("6".to_string()),
                email: None,
            }))
        );
        assert_eq!(
            ShellCommand::parse("save height=2"),
            Err(ParseError::UnknownField("height".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("save grade"),
            Err(ParseError::Usage("save [FIELD=VALUE ...]"))
        );
    }

    #[test]
    fn test_parse_search_joins_terms() {
        assert_eq!(
            ShellCommand::parse("search ann lee").unwrap(),
            Some(ShellCommand::Search("ann lee".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("search").unwrap(),
            Some(ShellCommand::Search(String::new()))
        );
    }

    #[test]
    fn test_parse_sort_direction() {
        assert_eq!(
            ShellCommand::parse("sort Name desc").unwrap(),
            Some(ShellCommand::Sort(SortColumn::Name, SortDirection::Desc))
        );
        assert_eq!(
            ShellCommand::parse("sort age").unwrap(),
            Some(ShellCommand::Sort(SortColumn::Age, SortDirection::Asc))
        );
    }

    #[test]
    fn test_every_command_has_usage() {
        for (name, usage_line, _) in COMMANDS {
            assert!(usage_line.starts_with(name), "{name}");
        }
    }

    #[test]
    fn test_session_add_edit_save() {
        let mut app = app();
        let output = run(
            &mut app,
            "login ann@x.org\n\
             add ST-001 \"Ann Lee\" 10 5 ann@x.org\n\
             edit ST-001\n\
             save grade=6 age=11\n\
             quit\n\
             add ST-002 Bob 12 7 bob@x.org\n",
        );

        assert!(output.contains("Added ST-001"));
        assert!(output.contains("Saved ST-001"));
        let record = app.roster().find("ST-001").unwrap();
        assert_eq!(record.grade, "6");
        assert_eq!(record.age, 11);
        assert!(app.roster().find("ST-002").is_none());
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let mut app = app();
        let output = run(
            &mut app,
            "add ST-001 Ann 10 5 ann@x.org\n\
             login ann@x.org\n\
             add bad Ann 10 5 ann@x.org\n\
             bogus\n\
             save grade=1\n\
             add ST-001 Ann 10 5 ann@x.org\n",
        );

        assert!(output.contains("error: not signed in"));
        assert!(output.contains("error: ID must be in format ST-### (e.g., ST-001)"));
        assert!(output.contains("error: unknown command 'bogus'"));
        assert!(output.contains("Added ST-001"));
        assert_eq!(load_roster(app.roster().store()).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_asks_for_confirmation() {
        let mut app = app();
        run(&mut app, "login ann@x.org\nadd ST-001 Ann 10 5 ann@x.org\n");

        let output = run(&mut app, "delete ST-001\nn\n");
        assert!(output.contains("Delete ST-001? [y/N]"));
        assert!(app.roster().find("ST-001").is_some());

        let output = run(&mut app, "delete ST-001\ny\n");
        assert!(output.contains("Deleted ST-001"));
        assert!(app.roster().find("ST-001").is_none());
    }

    #[test]
    fn test_export_requires_admin() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.csv");
        let script = format!(
            "login ann@x.org\nadd ST-001 Ann 10 5 ann@x.org\nexport {}\n",
            file.display()
        );

        let mut app = app();
        let output = run(&mut app, &script);
        assert!(output.contains("error: export is only available to admin users"));
        assert!(!file.exists());
    }

    #[test]
    fn test_admin_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.csv");
        let script = format!(
            "login admin@x.org\nadd ST-001 \"Ann Lee\" 10 5 ann@x.org\nexport \"{}\"\n",
            file.display()
        );

        let mut app = app();
        let output = run(&mut app, &script);
        assert!(output.contains("Exported 1 students to"));
        let csv = std::fs::read_to_string(&file).unwrap();
        assert_eq!(
            csv,
            "ID,Name,Age,Grade,Email\n\"ST-001\",\"Ann Lee\",10,\"5\",\"ann@x.org\"\n"
        );
    }

    #[test]
    fn test_whoami_and_theme() {
        let mut app = app();
        let output = run(&mut app, "whoami\nlogin boss.admin@x.org\nwhoami\ntheme\n");
        assert!(output.contains("Not signed in"));
        assert!(output.contains("Signed in as boss.admin@x.org (admin)"));
        assert!(output.contains("Theme: dark"));
        assert!(app.is_dark());
    }

    #[test]
    fn test_help_lists_commands() {
        let mut app = app();
        let output = run(&mut app, "help\n");
        for (_, usage_line, _) in COMMANDS {
            assert!(output.contains(usage_line), "{usage_line}");
        }
    }
}
