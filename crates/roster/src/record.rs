//! Student record types and format validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest accepted age, inclusive.
pub const MIN_AGE: i32 = 5;

/// Highest accepted age, inclusive.
pub const MAX_AGE: i32 = 25;

/// Shortest accepted name, in characters.
pub const MIN_NAME_LEN: usize = 2;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ST-[0-9]{3}$").expect("id pattern is a valid regex"));

/// A single student.
///
/// Records are value objects: an update replaces the whole record at its
/// position in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Unique key, `ST-` followed by three digits.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i32,
    /// Free-form grade label.
    pub grade: String,
    /// Contact email.
    pub email: String,
}

/// The replaceable part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFields {
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i32,
    /// Free-form grade label.
    pub grade: String,
    /// Contact email.
    pub email: String,
}

/// Partial replacement values for an edit. Unset fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    /// New name.
    pub name: Option<String>,
    /// New age.
    pub age: Option<i32>,
    /// New grade label.
    pub grade: Option<String>,
    /// New email.
    pub email: Option<String>,
}

impl FieldPatch {
    /// Overlay the set values on `current`.
    #[must_use]
    pub fn apply(self, current: StudentFields) -> StudentFields {
        StudentFields {
            name: self.name.unwrap_or(current.name),
            age: self.age.unwrap_or(current.age),
            grade: self.grade.unwrap_or(current.grade),
            email: self.email.unwrap_or(current.email),
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.grade.is_none() && self.email.is_none()
    }
}

impl StudentRecord {
    /// Create a record from its parts.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        age: i32,
        grade: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            grade: grade.into(),
            email: email.into(),
        }
    }

    /// Build a record from an id and replacement fields.
    #[must_use]
    pub fn with_fields(id: impl Into<String>, fields: StudentFields) -> Self {
        Self {
            id: id.into(),
            name: fields.name,
            age: fields.age,
            grade: fields.grade,
            email: fields.email,
        }
    }

    /// The replaceable fields of this record.
    #[must_use]
    pub fn fields(&self) -> StudentFields {
        StudentFields {
            name: self.name.clone(),
            age: self.age,
            grade: self.grade.clone(),
            email: self.email.clone(),
        }
    }

    /// Check the format rules, reporting the first one that fails.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_id(&self.id) {
            return Err(ValidationError::BadIdFormat);
        }
        if self.name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort);
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ValidationError::AgeOutOfRange);
        }
        if !self.email.contains('@') || !self.email.contains('.') {
            return Err(ValidationError::BadEmailFormat);
        }
        Ok(())
    }

    /// Case-insensitive substring match across the searchable columns.
    ///
    /// `needle` must already be lowercased. Age is matched on its decimal
    /// form.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.id.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.grade.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self.age.to_string().contains(needle)
    }
}

/// Check whether `id` has the `ST-###` shape.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}
