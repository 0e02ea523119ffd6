//! Application state.
//!
//! [`App`] wires the roster and the sign-in gate to a store, a view and a
//! chart handed in by the caller. It is the only place that talks to the
//! presentation layer, and it always persists before it redraws.

use tracing::info;

use crate::error::{Error, Result};
use crate::record::{StudentFields, StudentRecord};
use crate::roster::{grade_distribution, RosterManager, SortColumn, SortDirection};
use crate::session::{Session, SessionGuard};
use crate::storage::{self, PersistenceStore};
use crate::view::{ChartWidget, View};

/// The running application.
#[derive(Debug)]
pub struct App<S, V, C> {
    roster: RosterManager<S>,
    session: SessionGuard,
    view: V,
    chart: C,
    dark: bool,
}

impl<S, V, C> App<S, V, C>
where
    S: PersistenceStore,
    V: View,
    C: ChartWidget,
{
    /// Load the roster from `store` and attach the collaborators.
    ///
    /// Nothing is rendered until [`App::start`] or [`App::resume`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stored roster cannot be read.
    pub fn new(store: S, view: V, chart: C) -> Result<Self> {
        Ok(Self {
            roster: RosterManager::load(store)?,
            session: SessionGuard::new(),
            view,
            chart,
            dark: false,
        })
    }

    /// Startup sequence: apply the saved theme, restore any live session,
    /// and show the matching screen.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the theme or session cannot be read.
    pub fn start(&mut self) -> Result<()> {
        self.apply_saved_theme()?;
        let restored = self
            .session
            .restore(self.roster.store_mut())?
            .map(|s| (format!("Welcome back, {}!", s.name), s.can_export()));
        match restored {
            Some((greeting, export_visible)) => {
                self.view.show_main_screen(&greeting, export_visible);
            }
            None => self.view.show_login_screen(),
        }
        Ok(())
    }

    /// Like [`App::start`] but without switching screens, for callers that
    /// run a single command.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the theme or session cannot be read.
    pub fn resume(&mut self) -> Result<()> {
        self.apply_saved_theme()?;
        self.session.restore(self.roster.store_mut())?;
        Ok(())
    }

    /// The roster controller.
    #[must_use]
    pub fn roster(&self) -> &RosterManager<S> {
        &self.roster
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.current()
    }

    /// The attached view.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The attached chart.
    #[must_use]
    pub fn chart(&self) -> &C {
        &self.chart
    }

    /// Whether the dark theme is active.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// Sign in and show the main screen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyEmail`] for a blank email, or a storage error.
    pub fn login(&mut self, email: &str) -> Result<()> {
        let session = self.session.login(self.roster.store_mut(), email)?;
        let greeting = format!("Welcome, {}!", session.name);
        let export_visible = session.can_export();
        self.view.show_main_screen(&greeting, export_visible);
        Ok(())
    }

    /// Sign out and reset to the initial screen.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be removed.
    pub fn logout(&mut self) -> Result<()> {
        self.session.logout(self.roster.store_mut())?;
        self.roster.cancel_edit();
        self.roster.search("");
        self.view.render_edit_form(None);
        self.view.show_login_screen();
        Ok(())
    }

    /// Redraw rows, pagination and chart from the current state.
    pub fn refresh(&mut self) {
        let rows = self.roster.page_records();
        self.view.render_rows(&rows);
        self.view
            .render_pagination(self.roster.current_page(), self.roster.total_pages());
        self.draw_chart();
    }

    /// Redraw only the grade chart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`].
    pub fn show_chart(&mut self) -> Result<()> {
        self.require_session()?;
        self.draw_chart();
        Ok(())
    }

    /// Add a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`], a validation error,
    /// [`Error::DuplicateId`], or a storage error.
    pub fn add(&mut self, record: StudentRecord) -> Result<()> {
        self.require_session()?;
        self.roster.create(record)?;
        self.refresh();
        Ok(())
    }

    /// Load a record into the edit form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] or [`Error::NotFound`].
    pub fn edit(&mut self, id: &str) -> Result<StudentRecord> {
        self.require_session()?;
        let record = self.roster.begin_edit(id)?.clone();
        self.view.render_edit_form(Some(&record));
        Ok(record)
    }

    /// Save the record in the edit form with new field values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`], [`Error::NoRecordUnderEdit`], a
    /// validation error, [`Error::NotFound`], or a storage error.
    pub fn save(&mut self, fields: StudentFields) -> Result<()> {
        self.require_session()?;
        let id = self
            .roster
            .editing()
            .ok_or(Error::NoRecordUnderEdit)?
            .to_string();
        self.roster.update(&id, fields)?;
        self.view.render_edit_form(None);
        self.refresh();
        Ok(())
    }

    /// Leave edit mode without saving.
    pub fn cancel(&mut self) {
        self.roster.cancel_edit();
        self.view.render_edit_form(None);
    }

    /// Delete a record. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] or a storage error.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        self.require_session()?;
        let was_editing = self.roster.editing().is_some();
        let removed = self.roster.delete(id)?;
        if was_editing && self.roster.editing().is_none() {
            self.view.render_edit_form(None);
        }
        self.refresh();
        Ok(removed)
    }

    /// Filter the table. Returns the number of matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`].
    pub fn search(&mut self, term: &str) -> Result<usize> {
        self.require_session()?;
        let matches = self.roster.search(term).len();
        self.refresh();
        Ok(matches)
    }

    /// Sort the stored roster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] or a storage error.
    pub fn sort(&mut self, column: SortColumn, direction: SortDirection) -> Result<()> {
        self.require_session()?;
        self.roster.sort(column, direction)?;
        self.refresh();
        Ok(())
    }

    /// Go to a page of the visible records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`].
    pub fn change_page(&mut self, page: usize) -> Result<()> {
        self.require_session()?;
        self.roster.change_page(page);
        self.refresh();
        Ok(())
    }

    /// Go to the next page, staying on the last one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`].
    pub fn next_page(&mut self) -> Result<()> {
        self.change_page(self.roster.current_page().saturating_add(1))
    }

    /// Go to the previous page, staying on the first one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`].
    pub fn prev_page(&mut self) -> Result<()> {
        self.change_page(self.roster.current_page().saturating_sub(1))
    }

    /// The roster as CSV, for admins only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSignedIn`] or [`Error::ExportNotPermitted`].
    pub fn export(&self) -> Result<String> {
        let session = self.require_session()?;
        if !session.can_export() {
            return Err(Error::ExportNotPermitted);
        }
        info!("Exporting {} students", self.roster.records().len());
        Ok(self.roster.export_csv())
    }

    /// Flip between light and dark theme. Returns the new setting.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the flag cannot be saved.
    pub fn toggle_theme(&mut self) -> Result<bool> {
        let dark = !self.dark;
        storage::save_dark_mode(self.roster.store_mut(), dark)?;
        self.dark = dark;
        self.view.set_theme(dark);
        Ok(dark)
    }

    fn draw_chart(&mut self) {
        let (labels, counts): (Vec<String>, Vec<usize>) =
            grade_distribution(self.roster.records()).into_iter().unzip();
        self.chart.update(&labels, &counts);
    }

    fn apply_saved_theme(&mut self) -> Result<()> {
        self.dark = storage::load_dark_mode(self.roster.store())?;
        self.view.set_theme(self.dark);
        Ok(())
    }

    fn require_session(&self) -> Result<&Session> {
        self.session.current().ok_or(Error::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_roster, MemoryStore, Scope, DARK_MODE_KEY};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Rows(Vec<String>),
        Pagination(usize, usize),
        Form(Option<String>),
        Main(String, bool),
        Login,
        Theme(bool),
    }

    #[derive(Debug, Default)]
    struct RecordingView {
        events: Vec<Event>,
    }

    impl View for RecordingView {
        fn render_rows(&mut self, records: &[StudentRecord]) {
            self.events
                .push(Event::Rows(records.iter().map(|r| r.id.clone()).collect()));
        }

        fn render_pagination(&mut self, current_page: usize, total_pages: usize) {
            self.events.push(Event::Pagination(current_page, total_pages));
        }

        fn render_edit_form(&mut self, record: Option<&StudentRecord>) {
            self.events.push(Event::Form(record.map(|r| r.id.clone())));
        }

        fn show_main_screen(&mut self, greeting: &str, export_visible: bool) {
            self.events
                .push(Event::Main(greeting.to_string(), export_visible));
        }

        fn show_login_screen(&mut self) {
            self.events.push(Event::Login);
        }

        fn set_theme(&mut self, dark: bool) {
            self.events.push(Event::Theme(dark));
        }
    }

    #[derive(Debug, Default)]
    struct RecordingChart {
        last: Option<(Vec<String>, Vec<usize>)>,
    }

    impl ChartWidget for RecordingChart {
        fn update(&mut self, labels: &[String], counts: &[usize]) {
            self.last = Some((labels.to_vec(), counts.to_vec()));
        }
    }

    type TestApp = App<MemoryStore, RecordingView, RecordingChart>;

    fn app() -> TestApp {
        App::new(
            MemoryStore::new(),
            RecordingView::default(),
            RecordingChart::default(),
        )
        .unwrap()
    }

    fn signed_in(email: &str) -> TestApp {
        let mut app = app();
        app.start().unwrap();
        app.login(email).unwrap();
        app
    }

    fn record(n: usize, grade: &str) -> StudentRecord {
        StudentRecord::new(
            format!("ST-{n:03}"),
            format!("Student {n}"),
            10,
            grade,
            format!("s{n}@x.org"),
        )
    }

    fn last_event(app: &TestApp) -> Option<&Event> {
        app.view().events.last()
    }

    #[test]
    fn test_start_without_session_shows_login() {
        let mut app = app();
        app.start().unwrap();
        assert_eq!(app.view().events, vec![Event::Theme(false), Event::Login]);
    }

    #[test]
    fn test_start_restores_session_with_welcome_back() {
        let mut store = MemoryStore::new();
        store.set(Scope::Durable, DARK_MODE_KEY, "true").unwrap();
        SessionGuard::new().login(&mut store, "boss.admin@x.org").unwrap();

        let mut app = App::new(store, RecordingView::default(), RecordingChart::default()).unwrap();
        app.start().unwrap();

        assert!(app.is_dark());
        assert_eq!(
            app.view().events,
            vec![
                Event::Theme(true),
                Event::Main("Welcome back, boss.admin!".to_string(), true)
            ]
        );
    }

    #[test]
    fn test_resume_does_not_switch_screens() {
        let mut store = MemoryStore::new();
        SessionGuard::new().login(&mut store, "ann@x.org").unwrap();

        let mut app = App::new(store, RecordingView::default(), RecordingChart::default()).unwrap();
        app.resume().unwrap();

        assert_eq!(app.session().map(|s| s.name.as_str()), Some("ann"));
        assert_eq!(app.view().events, vec![Event::Theme(false)]);
    }

    #[test]
    fn test_login_greeting_and_export_visibility() {
        let app = signed_in("ann@x.org");
        assert_eq!(
            last_event(&app),
            Some(&Event::Main("Welcome, ann!".to_string(), false))
        );

        let app = signed_in("admin@x.org");
        assert_eq!(
            last_event(&app),
            Some(&Event::Main("Welcome, admin!".to_string(), true))
        );
    }

    #[test]
    fn test_empty_login_rejected() {
        let mut app = app();
        assert!(matches!(app.login("  "), Err(Error::EmptyEmail)));
        assert!(app.session().is_none());
    }

    #[test]
    fn test_roster_operations_require_session() {
        let mut app = app();
        assert!(matches!(app.add(record(1, "A")), Err(Error::NotSignedIn)));
        assert!(matches!(app.search("x"), Err(Error::NotSignedIn)));
        assert!(matches!(app.delete("ST-001"), Err(Error::NotSignedIn)));
        assert!(matches!(app.export(), Err(Error::NotSignedIn)));
        assert!(load_roster(app.roster().store()).unwrap().is_empty());
    }

    #[test]
    fn test_add_refreshes_after_persisting() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();

        let events = &app.view().events;
        assert_eq!(
            &events[events.len() - 2..],
            &[
                Event::Rows(vec!["ST-001".to_string()]),
                Event::Pagination(1, 1)
            ]
        );
        assert_eq!(
            app.chart().last,
            Some((vec!["A".to_string()], vec![1]))
        );
        assert_eq!(load_roster(app.roster().store()).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_add_does_not_refresh() {
        let mut app = signed_in("ann@x.org");
        let before = app.view().events.len();
        assert!(app.add(StudentRecord::new("bad", "A", 1, "", "")).is_err());
        assert_eq!(app.view().events.len(), before);
        assert!(app.chart().last.is_none());
    }

    #[test]
    fn test_edit_save_cycle() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();

        let loaded = app.edit("ST-001").unwrap();
        assert_eq!(last_event(&app), Some(&Event::Form(Some("ST-001".to_string()))));

        let mut fields = loaded.fields();
        fields.grade = "B".to_string();
        app.save(fields).unwrap();

        assert_eq!(app.roster().editing(), None);
        assert_eq!(app.roster().find("ST-001").unwrap().grade, "B");
        assert!(app.view().events.contains(&Event::Form(None)));
        assert_eq!(app.chart().last, Some((vec!["B".to_string()], vec![1])));
    }

    #[test]
    fn test_save_in_add_mode() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        let fields = record(1, "C").fields();
        assert!(matches!(app.save(fields), Err(Error::NoRecordUnderEdit)));
    }

    #[test]
    fn test_cancel_clears_form() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        app.edit("ST-001").unwrap();
        app.cancel();
        assert_eq!(app.roster().editing(), None);
        assert_eq!(last_event(&app), Some(&Event::Form(None)));
    }

    #[test]
    fn test_delete_record_under_edit_clears_form() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        app.edit("ST-001").unwrap();

        assert!(app.delete("ST-001").unwrap());
        assert!(app.view().events.contains(&Event::Form(None)));
        assert_eq!(app.roster().editing(), None);
        assert_eq!(app.chart().last, Some((vec![], vec![])));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut app = signed_in("ann@x.org");
        assert!(!app.delete("ST-404").unwrap());
    }

    #[test]
    fn test_search_and_paging() {
        let mut app = signed_in("ann@x.org");
        for n in 1..=12 {
            app.add(record(n, if n % 2 == 0 { "A" } else { "B" })).unwrap();
        }
        assert_eq!(app.roster().current_page(), 3);

        app.prev_page().unwrap();
        assert_eq!(last_event(&app), Some(&Event::Pagination(2, 3)));
        app.next_page().unwrap();
        app.next_page().unwrap();
        assert_eq!(last_event(&app), Some(&Event::Pagination(3, 3)));

        assert_eq!(app.search("ST-01").unwrap(), 3);
        assert_eq!(last_event(&app), Some(&Event::Pagination(1, 1)));

        assert_eq!(app.chart().last, Some((
            vec!["B".to_string(), "A".to_string()],
            vec![6, 6]
        )));
    }

    #[test]
    fn test_sort_persists() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        app.add(record(2, "A")).unwrap();
        app.sort(SortColumn::Id, SortDirection::Desc).unwrap();

        let stored = load_roster(app.roster().store()).unwrap();
        assert_eq!(stored[0].id, "ST-002");
    }

    #[test]
    fn test_export_admin_only() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        assert!(matches!(app.export(), Err(Error::ExportNotPermitted)));

        let mut app = signed_in("admin@x.org");
        app.add(record(1, "A")).unwrap();
        let csv = app.export().unwrap();
        assert!(csv.starts_with("ID,Name,Age,Grade,Email\n"));
        assert!(csv.contains("\"ST-001\",\"Student 1\",10,\"A\",\"s1@x.org\""));
    }

    #[test]
    fn test_logout_resets_state() {
        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        app.edit("ST-001").unwrap();
        app.search("zz").unwrap();

        app.logout().unwrap();

        assert!(app.session().is_none());
        assert_eq!(app.roster().editing(), None);
        assert_eq!(app.roster().filter(), None);
        assert_eq!(last_event(&app), Some(&Event::Login));
        assert!(app.roster().store().get(Scope::Session, "currentUser").unwrap().is_none());
    }

    #[test]
    fn test_show_chart() {
        let mut app = app();
        assert!(matches!(app.show_chart(), Err(Error::NotSignedIn)));

        let mut app = signed_in("ann@x.org");
        app.add(record(1, "A")).unwrap();
        app.add(record(2, "B")).unwrap();
        app.add(record(3, "A")).unwrap();
        let before = app.view().events.len();
        app.show_chart().unwrap();
        assert_eq!(app.view().events.len(), before);
        assert_eq!(
            app.chart().last,
            Some((vec!["A".to_string(), "B".to_string()], vec![2, 1]))
        );
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut app = app();
        app.start().unwrap();

        assert!(app.toggle_theme().unwrap());
        assert_eq!(
            app.roster().store().get(Scope::Durable, DARK_MODE_KEY).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(last_event(&app), Some(&Event::Theme(true)));

        assert!(!app.toggle_theme().unwrap());
        assert_eq!(
            app.roster().store().get(Scope::Durable, DARK_MODE_KEY).unwrap().as_deref(),
            Some("false")
        );
    }
}
