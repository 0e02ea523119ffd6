//! The roster controller.
//!
//! [`RosterManager`] owns the ordered list of records and the interaction
//! state around it: the active search filter, the current page, and the
//! record loaded into the edit form. Every mutation validates first, then
//! writes the whole roster back to the store, so a failed operation never
//! leaves a partial change behind.

use std::cmp::Ordering;

use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::export;
use crate::record::{StudentFields, StudentRecord};
use crate::storage::{self, PersistenceStore};

/// Rows shown per page.
pub const RECORDS_PER_PAGE: usize = 5;

/// Column a roster can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    /// Student id.
    Id,
    /// Student name.
    Name,
    /// Age, compared numerically.
    Age,
    /// Grade label.
    Grade,
    /// Email address.
    Email,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl std::fmt::Display for SortColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Name => write!(f, "name"),
            Self::Age => write!(f, "age"),
            Self::Grade => write!(f, "grade"),
            Self::Email => write!(f, "email"),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Return the records on `page` (1-based) for the given page size.
///
/// Pages past the end, and page 0, are empty.
#[must_use]
pub fn paginate(records: &[StudentRecord], page: usize, page_size: usize) -> &[StudentRecord] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= records.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(records.len());
    &records[start..end]
}

/// Number of pages needed for `len` records, never less than one.
#[must_use]
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// Count records per grade label, in first-seen order.
#[must_use]
pub fn grade_distribution(records: &[StudentRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|(grade, _)| *grade == record.grade) {
            Some((_, count)) => *count += 1,
            None => counts.push((record.grade.clone(), 1)),
        }
    }
    counts
}

/// Owns the roster and its interaction state.
#[derive(Debug)]
pub struct RosterManager<S> {
    store: S,
    records: Vec<StudentRecord>,
    filter: Option<String>,
    current_page: usize,
    editing: Option<String>,
}

impl<S: PersistenceStore> RosterManager<S> {
    /// Load the roster from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored roster cannot be read or decoded.
    pub fn load(store: S) -> Result<Self> {
        let records = storage::load_roster(&store)?;
        info!("Loaded roster with {} records", records.len());
        Ok(Self {
            store,
            records,
            filter: None,
            current_page: 1,
            editing: None,
        })
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The backing store, for collaborators that persist their own keys.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The full roster in stored order.
    #[must_use]
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Look up a record by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Id of the record in the edit form, or `None` in add mode.
    #[must_use]
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// The active search term, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// The current 1-based page.
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Records matching the active search, or the whole roster.
    #[must_use]
    pub fn visible_records(&self) -> Vec<StudentRecord> {
        match &self.filter {
            Some(term) => self
                .records
                .iter()
                .filter(|r| r.matches(term))
                .cloned()
                .collect(),
            None => self.records.clone(),
        }
    }

    /// Number of pages of visible records.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        page_count(self.visible_records().len(), RECORDS_PER_PAGE)
    }

    /// The visible records on the current page.
    #[must_use]
    pub fn page_records(&self) -> Vec<StudentRecord> {
        paginate(&self.visible_records(), self.current_page, RECORDS_PER_PAGE).to_vec()
    }

    /// Add a record and move to the last page so it is visible.
    ///
    /// Clears the search filter. Edit mode is left as it is.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`Error::DuplicateId`], or a storage
    /// error. The roster is unchanged on error.
    pub fn create(&mut self, record: StudentRecord) -> Result<()> {
        record.validate()?;
        if self.find(&record.id).is_some() {
            return Err(Error::duplicate_id(record.id));
        }

        let id = record.id.clone();
        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }

        self.filter = None;
        self.current_page = page_count(self.records.len(), RECORDS_PER_PAGE);
        info!("Added student {}", id);
        Ok(())
    }

    /// Replace the fields of an existing record, keeping its position.
    ///
    /// Clears the search filter and leaves edit mode.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`Error::NotFound`], or a storage error.
    /// The roster is unchanged on error.
    pub fn update(&mut self, id: &str, fields: StudentFields) -> Result<()> {
        let replacement = StudentRecord::with_fields(id, fields);
        replacement.validate()?;
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found(id))?;

        let previous = std::mem::replace(&mut self.records[index], replacement);
        if let Err(e) = self.persist() {
            self.records[index] = previous;
            return Err(e);
        }

        self.filter = None;
        self.editing = None;
        self.clamp_page();
        info!("Updated student {}", id);
        Ok(())
    }

    /// Remove a record. Returns `false` if no record had that id.
    ///
    /// Clears the search filter, keeps the current page in range, and
    /// leaves edit mode if the removed record was being edited.
    ///
    /// # Errors
    ///
    /// Returns a storage error; the roster is unchanged on error.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            debug!("Delete of unknown student {} ignored", id);
            return Ok(false);
        };

        let removed = self.records.remove(index);
        if let Err(e) = self.persist() {
            self.records.insert(index, removed);
            return Err(e);
        }

        self.filter = None;
        self.clamp_page();
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        info!("Deleted student {}", id);
        Ok(true)
    }

    /// Filter the visible records and go back to page 1.
    ///
    /// A blank term clears the filter. Returns the matching records.
    pub fn search(&mut self, term: &str) -> Vec<StudentRecord> {
        self.current_page = 1;
        if term.trim().is_empty() {
            self.filter = None;
        } else {
            self.filter = Some(term.to_lowercase());
        }
        let visible = self.visible_records();
        debug!("Search matched {} of {} records", visible.len(), self.records.len());
        visible
    }

    /// Sort the stored roster. The new order is persisted.
    ///
    /// The sort is stable: records that compare equal keep their relative
    /// order. Clears the search filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collation`] if no collator is available, or a
    /// storage error. The roster order is unchanged on error.
    pub fn sort(&mut self, column: SortColumn, direction: SortDirection) -> Result<()> {
        let collator = string_collator()?;
        let previous = self.records.clone();
        self.records.sort_by(|a, b| {
            let ordering = compare_by(&collator, a, b, column);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        if let Err(e) = self.persist() {
            self.records = previous;
            return Err(e);
        }

        self.filter = None;
        self.clamp_page();
        info!("Sorted roster by {} {}", column, direction);
        Ok(())
    }

    /// Load a record into the edit form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has that id.
    pub fn begin_edit(&mut self, id: &str) -> Result<&StudentRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found(id))?;
        self.editing = Some(id.to_string());
        debug!("Editing student {}", id);
        Ok(&self.records[index])
    }

    /// Leave edit mode without saving.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Move to `page`, clamped into the valid range.
    pub fn change_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.total_pages());
    }

    /// The whole roster as a CSV document.
    #[must_use]
    pub fn export_csv(&self) -> String {
        export::to_csv(&self.records)
    }

    fn persist(&mut self) -> Result<()> {
        storage::save_roster(&mut self.store, &self.records)
    }

    fn clamp_page(&mut self) {
        self.current_page = self.current_page.clamp(1, self.total_pages());
    }
}

fn compare_by(
    collator: &CollatorBorrowed<'_>,
    a: &StudentRecord,
    b: &StudentRecord,
    column: SortColumn,
) -> Ordering {
    match column {
        SortColumn::Id => collator.compare(&a.id, &b.id),
        SortColumn::Name => collator.compare(&a.name, &b.name),
        SortColumn::Age => a.age.cmp(&b.age),
        SortColumn::Grade => collator.compare(&a.grade, &b.grade),
        SortColumn::Email => collator.compare(&a.email, &b.email),
    }
}

/// Root-locale collator at tertiary strength: base letters first, then
/// accents, then case.
fn string_collator() -> Result<CollatorBorrowed<'static>> {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Tertiary);
    Collator::try_new(CollatorPreferences::default(), options).map_err(|e| Error::Collation {
        message: e.to_string(),
    })
}
