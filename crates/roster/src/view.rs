//! Presentation collaborators.
//!
//! The core never formats output itself. It calls a [`View`] to show
//! records and screens, and a [`ChartWidget`] to redraw the grade chart.
//! Both are full rebuilds: every call replaces what was shown before.
//!
//! [`TerminalView`] and [`TerminalChart`] render to any [`Write`]r.

use std::io::{self, Write};

use comfy_table::presets::{ASCII_FULL, UTF8_FULL};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use tracing::warn;

use crate::record::StudentRecord;

/// Longest bar the terminal chart draws, in cells.
pub const MAX_CHART_WIDTH: usize = 200;

/// Title of the grade chart.
pub const CHART_TITLE: &str = "Number of Students";

/// What the core asks of a presentation layer.
pub trait View {
    /// Show one page of records.
    fn render_rows(&mut self, records: &[StudentRecord]);

    /// Show the pagination controls.
    fn render_pagination(&mut self, current_page: usize, total_pages: usize);

    /// Load a record into the edit form, or clear it back to add mode.
    fn render_edit_form(&mut self, record: Option<&StudentRecord>);

    /// Switch to the main screen.
    fn show_main_screen(&mut self, greeting: &str, export_visible: bool);

    /// Switch to the login screen.
    fn show_login_screen(&mut self);

    /// Apply the light or dark theme.
    fn set_theme(&mut self, dark: bool);
}

/// A bar chart of counts per label.
pub trait ChartWidget {
    /// Redraw the chart. `counts[i]` belongs to `labels[i]`.
    fn update(&mut self, labels: &[String], counts: &[usize]);
}

/// Renders screens and tables as text.
#[derive(Debug)]
pub struct TerminalView<W> {
    out: W,
    dark: bool,
    form_open: bool,
}

impl TerminalView<io::Stdout> {
    /// A view writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    /// A view writing to `out`, starting in the light theme.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            dark: false,
            form_open: false,
        }
    }

    /// Whether the dark theme is active.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// Consume the view and return its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!("Failed to write view output: {}", e);
        }
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        if self.dark {
            table.load_preset(UTF8_FULL);
        } else {
            table.load_preset(ASCII_FULL);
        }
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn header_cell(&self, text: &str) -> Cell {
        let cell = Cell::new(text).add_attribute(Attribute::Bold);
        if self.dark {
            cell.fg(Color::Cyan)
        } else {
            cell
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render_rows(&mut self, records: &[StudentRecord]) {
        let mut table = self.table();
        table.set_header(
            ["ID", "Name", "Age", "Grade", "Email"]
                .iter()
                .map(|h| self.header_cell(h))
                .collect::<Vec<_>>(),
        );
        if records.is_empty() {
            table.add_row(vec![Cell::new("No students found")]);
        }
        for record in records {
            table.add_row(vec![
                Cell::new(&record.id),
                Cell::new(&record.name),
                Cell::new(record.age).set_alignment(CellAlignment::Right),
                Cell::new(&record.grade),
                Cell::new(&record.email),
            ]);
        }
        self.emit(&table.to_string());
    }

    fn render_pagination(&mut self, current_page: usize, total_pages: usize) {
        let prev = if current_page > 1 { "< prev" } else { "      " };
        let next = if current_page < total_pages { "next >" } else { "" };
        let line = format!("{prev}  Page {current_page} of {total_pages}  {next}");
        self.emit(line.trim_end());
    }

    fn render_edit_form(&mut self, record: Option<&StudentRecord>) {
        match record {
            Some(record) => {
                self.form_open = true;
                self.emit(&format!("Editing {}", record.id));
                self.emit(&format!("  name:  {}", record.name));
                self.emit(&format!("  age:   {}", record.age));
                self.emit(&format!("  grade: {}", record.grade));
                self.emit(&format!("  email: {}", record.email));
            }
            None if self.form_open => {
                self.form_open = false;
                self.emit("Edit form closed.");
            }
            None => {}
        }
    }

    fn show_main_screen(&mut self, greeting: &str, export_visible: bool) {
        self.emit(greeting);
        if export_visible {
            self.emit("Export to CSV is available.");
        }
    }

    fn show_login_screen(&mut self) {
        self.form_open = false;
        self.emit("Not signed in. Sign in with an email address to continue.");
    }

    fn set_theme(&mut self, dark: bool) {
        self.dark = dark;
    }
}

/// Draws horizontal text bars.
#[derive(Debug)]
pub struct TerminalChart<W> {
    out: W,
    width: usize,
}

impl TerminalChart<io::Stdout> {
    /// A chart writing to standard output.
    #[must_use]
    pub fn stdout(width: usize) -> Self {
        Self::new(io::stdout(), width)
    }
}

impl<W: Write> TerminalChart<W> {
    /// A chart writing to `out` whose longest bar is `width` cells,
    /// clamped to `1..=MAX_CHART_WIDTH`.
    #[must_use]
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.clamp(1, MAX_CHART_WIDTH),
        }
    }

    /// Consume the chart and return its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, labels: &[String], counts: &[usize]) -> io::Result<()> {
        writeln!(self.out, "{CHART_TITLE}")?;
        if labels.is_empty() {
            return writeln!(self.out, "  (no students)");
        }
        let names: Vec<&str> = labels
            .iter()
            .map(|l| if l.is_empty() { "(none)" } else { l.as_str() })
            .collect();
        let label_width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        let max = wide(counts.iter().copied().max().unwrap_or(0).max(1));
        for (name, count) in names.iter().zip(counts) {
            let bar = (wide(*count) * wide(self.width)).div_ceil(max);
            let bar = usize::try_from(bar).map_or(self.width, |b| b.min(self.width));
            writeln!(
                self.out,
                "  {name:<label_width$} | {} {count}",
                "#".repeat(bar)
            )?;
        }
        Ok(())
    }
}

/// Widen for bar arithmetic; a `usize` count times a capped width fits.
fn wide(n: usize) -> u128 {
    u128::try_from(n).unwrap_or(u128::MAX)
}

impl<W: Write> ChartWidget for TerminalChart<W> {
    fn update(&mut self, labels: &[String], counts: &[usize]) {
        if let Err(e) = self.draw(labels, counts) {
            warn!("Failed to draw chart: {}", e);
        }
    }
}
