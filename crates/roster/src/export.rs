//! CSV export of the roster.
//!
//! Text columns are always double-quoted and age is written bare, so a
//! grade such as `5` stays text when the file is opened in a spreadsheet.

use std::fmt::Write as _;

use crate::record::StudentRecord;

/// Default name of the exported file.
pub const DEFAULT_FILE_NAME: &str = "students.csv";

/// Header line of the export.
pub const HEADER: &str = "ID,Name,Age,Grade,Email";

/// Render records as CSV with `\n` line endings.
#[must_use]
pub fn to_csv(records: &[StudentRecord]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + records.len() * 64);
    out.push_str(HEADER);
    out.push('\n');
    for record in records {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            quote(&record.id),
            quote(&record.name),
            record.age,
            quote(&record.grade),
            quote(&record.email),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
