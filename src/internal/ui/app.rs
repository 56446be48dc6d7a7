use anyhow::Result;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

use crate::config::AppConfig;
use crate::internal::coverage::{CoverageAggregator, CoverageSeries};
use crate::internal::models::{Metrics, SnapshotDocument};
use crate::internal::notification::Notification;
use crate::internal::report::{ReportRow, step_rows};
use crate::internal::search::{SearchQuery, SearchType};
use crate::internal::snapshots::SnapshotIndex;
use crate::internal::state::{KeyPathStore, SubscriptionId, paths};
use crate::utils::theme_loader::{TuiTheme, load_theme_file, next_primary_color};

use ratatui::Frame;
use ratatui::widgets::{ListState, TableState};
use serde_json::Value;
use strum::Display;

/// Application view modes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Display)]
pub enum ViewMode {
    Home,
    Snapshot,
    Analysis,
    Settings,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Home,
        ViewMode::Snapshot,
        ViewMode::Analysis,
        ViewMode::Settings,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Home => 0,
            Self::Snapshot => 1,
            Self::Analysis => 2,
            Self::Settings => 3,
        }
    }
}

/// Pane receiving navigation keys.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Focus {
    Projects,
    Dates,
    Content,
}

impl Focus {
    fn next(&self) -> Self {
        match self {
            Self::Projects => Self::Dates,
            Self::Dates => Self::Content,
            Self::Content => Self::Projects,
        }
    }
}

/// Input modes for the UI.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    Search,
}

/// Actions/messages sent through the app action channel.
#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    NavigateUp,
    NavigateDown,
    Enter,
    ToggleFocus,
    SwitchView(ViewMode),
    /// One of the `snapshots.current_*` paths was written.
    SelectionChanged,
    /// Something under `theme` was written.
    ThemeChanged,
    CoverageLoaded {
        /// Rescan count of the index the series was computed from.
        generation: u64,
        project: String,
        suite: Option<String>,
        series: CoverageSeries,
    },
    CycleSuite,
    CyclePrimaryColor,
    Rescan,
    ClearNotification,
    Error(String),
}

/// (project, suite) a coverage series was computed for.
type CoverageKey = (String, Option<String>);

/// Main application state.
pub struct App {
    pub running: bool,
    pub app_version: String,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub config: AppConfig,
    pub store: Rc<KeyPathStore>,
    pub index: Arc<SnapshotIndex>,
    pub project_list_state: ListState,
    pub date_list_state: ListState,
    pub document: Option<SnapshotDocument>,
    pub metrics: Metrics,
    loaded_selection: Option<(String, String, String)>,
    pub report_rows: Vec<ReportRow>,
    pub table_state: TableState,
    pub search_query: SearchQuery,
    pub temp_search_input: String,
    pub search_type: SearchType,
    pub chart_suite: Option<String>,
    pub coverage: Option<CoverageSeries>,
    coverage_for: Option<CoverageKey>,
    coverage_pending: Option<CoverageKey>,
    index_generation: u64,
    pub theme: TuiTheme,
    pub notification: Option<Notification>,
    pub action_tx: UnboundedSender<Action>,
    pub action_rx: UnboundedReceiver<Action>,
    subscriptions: Vec<(&'static str, SubscriptionId)>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::load())
    }

    #[tracing::instrument(skip(config), fields(snapshot_root = %config.snapshot_root))]
    pub fn with_config(config: AppConfig) -> Self {
        let start = std::time::Instant::now();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let store = Rc::new(KeyPathStore::new());

        let mut subscriptions = Vec::new();
        for path in [
            paths::CURRENT_PROJECT,
            paths::CURRENT_DATE,
            paths::CURRENT_SNAPSHOT,
        ] {
            let tx = action_tx.clone();
            let id = store.subscribe(path, move |_| {
                let _ = tx.send(Action::SelectionChanged);
            });
            subscriptions.push((path, id));
        }
        let tx = action_tx.clone();
        let id = store.subscribe(paths::THEME, move |_| {
            let _ = tx.send(Action::ThemeChanged);
        });
        subscriptions.push((paths::THEME, id));

        let mut notification = None;
        if !Path::new(&config.snapshot_root).is_dir() {
            notification = Some(Notification::missing_root(&config.snapshot_root));
        }
        let index = SnapshotIndex::load(&config.snapshot_root, &store);

        if let Some(theme_path) = &config.theme_file {
            match load_theme_file(Path::new(theme_path)) {
                Ok(mut entries) => {
                    // keep defaults for colours the file leaves out
                    if let (Some(Value::Object(current)), Some(Value::Object(loaded))) =
                        (store.get(paths::THEME), entries.get_mut(paths::THEME))
                    {
                        for (key, value) in current {
                            loaded.entry(key).or_insert(value);
                        }
                    }
                    store.set_many(entries);
                }
                Err(e) => {
                    tracing::error!("Failed to load theme {}: {:#}", theme_path, e);
                    notification = Some(Notification::error(format!(
                        "Failed to load theme {theme_path}"
                    )));
                }
            }
        }

        let theme = TuiTheme::from_store(&store);
        let chart_suite = config.default_suite.clone();

        tracing::info!(elapsed = ?start.elapsed(), "App initialized");

        Self {
            running: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            view_mode: ViewMode::Home,
            input_mode: InputMode::Normal,
            focus: Focus::Projects,
            config,
            store,
            index: Arc::new(index),
            project_list_state: ListState::default(),
            date_list_state: ListState::default(),
            document: None,
            metrics: Metrics::default(),
            loaded_selection: None,
            report_rows: Vec::new(),
            table_state: TableState::default(),
            search_query: SearchQuery::default(),
            temp_search_input: String::new(),
            search_type: SearchType::Literal,
            chart_suite,
            coverage: None,
            coverage_for: None,
            coverage_pending: None,
            index_generation: 0,
            theme,
            notification,
            action_tx,
            action_rx,
            subscriptions,
        }
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::info(message));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::error(message));
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    pub fn projects(&self) -> Vec<String> {
        self.store.get_string_list(paths::ALL_PROJECTS)
    }

    pub fn project_dates(&self) -> Vec<String> {
        self.store.get_string_list(paths::CURRENT_PROJECT_DATES)
    }

    pub fn current_project(&self) -> Option<String> {
        self.store.get_str(paths::CURRENT_PROJECT)
    }

    pub fn current_date(&self) -> Option<String> {
        self.store.get_str(paths::CURRENT_DATE)
    }

    pub fn current_snapshot(&self) -> Option<String> {
        self.store.get_str(paths::CURRENT_SNAPSHOT)
    }

    pub fn coverage_loading(&self) -> bool {
        self.coverage_pending.is_some()
    }

    pub async fn run(&mut self, mut tui: crate::tui::Tui) -> Result<()> {
        let mut event_interval = tokio::time::interval(std::time::Duration::from_millis(16));

        loop {
            // Auto-dismiss expired notifications
            if let Some(notification) = &self.notification
                && notification.should_dismiss()
            {
                self.clear_notification();
            }

            tui.draw(|f| self.ui(f))?;

            tokio::select! {
                _ = event_interval.tick() => {
                    if event::poll(std::time::Duration::from_millis(0))?
                        && let Event::Key(key) = event::read()?
                            && key.kind == KeyEventKind::Press {
                                self.handle_key_event(key);
                                self.drain_actions();
                            }
                }
                Some(action) = self.action_rx.recv() => {
                    self.handle_action(action);
                }
            }

            if !self.running {
                break;
            }
        }
        Ok(())
    }

    /// Handle every action already queued, including those queued meanwhile.
    pub fn drain_actions(&mut self) {
        while let Ok(action) = self.action_rx.try_recv() {
            self.handle_action(action);
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Search => self.handle_search_input(key),
            InputMode::Normal => self.handle_normal_input(key),
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.temp_search_input.clear();
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.search_query =
                    SearchQuery::new(std::mem::take(&mut self.temp_search_input), self.search_type);
                if let Some(err) = self.search_query.regex_error.clone() {
                    self.notify_error(err);
                }
                self.rebuild_report();
            }
            KeyCode::Tab => {
                self.search_type = self.search_type.toggle();
            }
            KeyCode::Backspace => {
                self.temp_search_input.pop();
            }
            KeyCode::Char(c) => {
                self.temp_search_input.push(c);
            }
            _ => {}
        }
    }

    fn handle_normal_input(&mut self, key: KeyEvent) {
        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::NavigateUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::NavigateDown),
            KeyCode::Enter => Some(Action::Enter),
            KeyCode::Tab => Some(Action::ToggleFocus),
            KeyCode::Char('1') => Some(Action::SwitchView(ViewMode::Home)),
            KeyCode::Char('2') => Some(Action::SwitchView(ViewMode::Snapshot)),
            KeyCode::Char('3') => Some(Action::SwitchView(ViewMode::Analysis)),
            KeyCode::Char('4') => Some(Action::SwitchView(ViewMode::Settings)),
            KeyCode::Char('s') => Some(Action::CycleSuite),
            KeyCode::Char('c') => Some(Action::CyclePrimaryColor),
            KeyCode::Char('r') => Some(Action::Rescan),
            KeyCode::Char('/') if self.view_mode == ViewMode::Snapshot => {
                self.input_mode = InputMode::Search;
                self.temp_search_input = self.search_query.query.clone();
                None
            }
            KeyCode::Esc if !self.search_query.is_empty() => {
                self.search_query = SearchQuery::default();
                self.rebuild_report();
                None
            }
            KeyCode::Esc => Some(Action::ClearNotification),
            _ => None,
        };

        if let Some(action) = action {
            let _ = self.action_tx.send(action);
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::NavigateUp => self.navigate(false),
            Action::NavigateDown => self.navigate(true),
            Action::Enter => self.activate_focused(),
            Action::ToggleFocus => self.focus = self.focus.next(),
            Action::SwitchView(view) => {
                self.view_mode = view;
                self.ensure_coverage();
            }
            Action::SelectionChanged => self.refresh_selection(),
            Action::ThemeChanged => {
                self.theme = TuiTheme::from_store(&self.store);
                tracing::debug!(theme = ?self.theme, "Theme updated");
            }
            Action::CoverageLoaded {
                generation,
                project,
                suite,
                series,
            } => {
                if generation != self.index_generation {
                    tracing::debug!(project = %project, generation, "Dropping series from a replaced index");
                    return;
                }
                let key = (project, suite);
                if self.coverage_pending.as_ref() == Some(&key) {
                    self.coverage_pending = None;
                }
                if self.desired_coverage().as_ref() == Some(&key) {
                    self.coverage = Some(series);
                    self.coverage_for = Some(key);
                }
                self.ensure_coverage();
            }
            Action::CycleSuite => {
                self.chart_suite = self.next_chart_suite();
                self.notify_info(format!("Chart suite: {}", self.chart_suite_label()));
                self.ensure_coverage();
            }
            Action::CyclePrimaryColor => {
                let current = self.store.get_str(paths::PRIMARY_COLOR);
                let next = next_primary_color(current.as_deref());
                self.store.set(paths::PRIMARY_COLOR, next);
                self.notify_info(format!("Primary color set to {next}"));
            }
            Action::Rescan => self.rescan(),
            Action::ClearNotification => self.clear_notification(),
            Action::Error(message) => {
                tracing::error!("{}", message);
                self.notify_error(message);
            }
        }
    }

    fn navigate(&mut self, forward: bool) {
        match self.focus {
            Focus::Projects => {
                let len = self.projects().len();
                step_list(&mut self.project_list_state, len, forward);
            }
            Focus::Dates => {
                let len = self.project_dates().len();
                step_list(&mut self.date_list_state, len, forward);
            }
            Focus::Content if self.view_mode == ViewMode::Snapshot => {
                let len = self.report_rows.len();
                match (self.table_state.selected(), forward) {
                    _ if len == 0 => self.table_state.select(None),
                    (None, _) => self.table_state.select(Some(0)),
                    (Some(i), true) => self.table_state.select(Some((i + 1).min(len - 1))),
                    (Some(i), false) => self.table_state.select(Some(i.saturating_sub(1))),
                }
            }
            Focus::Content => {}
        }
    }

    fn activate_focused(&mut self) {
        match self.focus {
            Focus::Projects => {
                let projects = self.projects();
                if let Some(project) = self
                    .project_list_state
                    .selected()
                    .and_then(|i| projects.get(i))
                {
                    self.index.select_project(&self.store, project, None);
                }
            }
            Focus::Dates => {
                let dates = self.project_dates();
                if let (Some(project), Some(date)) = (
                    self.current_project(),
                    self.date_list_state.selected().and_then(|i| dates.get(i)),
                ) {
                    self.index.select_project(&self.store, &project, Some(date));
                }
            }
            Focus::Content => {}
        }
    }

    /// Re-read the selection from the store and reload the snapshot when the
    /// (project, date, file) triple changed.
    fn refresh_selection(&mut self) {
        let project = self.current_project();
        let date = self.current_date();
        let snapshot = self.current_snapshot();

        let projects = self.projects();
        let dates = self.project_dates();
        self.project_list_state
            .select(project.as_ref().and_then(|p| projects.iter().position(|x| x == p)));
        self.date_list_state
            .select(date.as_ref().and_then(|d| dates.iter().position(|x| x == d)));

        self.ensure_coverage();

        let selection = match (project, date, snapshot) {
            (Some(p), Some(d), Some(s)) => Some((p, d, s)),
            _ => None,
        };
        if selection == self.loaded_selection {
            return;
        }
        self.loaded_selection = selection.clone();

        self.document = match selection {
            Some((project, date, file)) => match self.index.read_snapshot(&project, &date, &file) {
                Ok(document) => Some(document),
                Err(e) => {
                    tracing::error!("Failed to load snapshot: {:#}", e);
                    self.notification = Some(Notification::snapshot_failed(&file));
                    None
                }
            },
            None => None,
        };
        self.metrics = self
            .document
            .as_ref()
            .map(|d| d.metrics.clone())
            .unwrap_or_default();
        self.rebuild_report();
    }

    fn rebuild_report(&mut self) {
        self.report_rows = match &self.document {
            Some(document) => step_rows(document, &self.search_query),
            None => Vec::new(),
        };
        self.table_state.select(None);
    }

    fn desired_coverage(&self) -> Option<CoverageKey> {
        self.current_project()
            .map(|project| (project, self.chart_suite.clone()))
    }

    /// Start computing the chart series when the analysis view needs one that
    /// is neither loaded nor in flight.
    fn ensure_coverage(&mut self) {
        if self.view_mode != ViewMode::Analysis {
            return;
        }
        let Some(key) = self.desired_coverage() else {
            self.coverage = None;
            self.coverage_for = None;
            return;
        };
        if self.coverage_for.as_ref() == Some(&key) {
            return;
        }
        // never show another project's series while this one loads
        self.coverage = None;
        self.coverage_for = None;
        if self.coverage_pending.as_ref() == Some(&key) {
            return;
        }

        self.coverage_pending = Some(key.clone());
        let index = Arc::clone(&self.index);
        let tx = self.action_tx.clone();
        let days = self.config.coverage_days;
        let generation = self.index_generation;
        let (project, suite) = key;
        tokio::task::spawn_blocking(move || {
            let series = CoverageAggregator::new(&index).coverage_over_time(
                &project,
                suite.as_deref(),
                days,
            );
            let _ = tx.send(Action::CoverageLoaded {
                generation,
                project,
                suite,
                series,
            });
        });
    }

    fn next_chart_suite(&self) -> Option<String> {
        let mut options: Vec<Option<String>> = vec![None];
        if let Some(document) = &self.document {
            for name in document.suite_names() {
                if !options.contains(&Some(name.clone())) {
                    options.push(Some(name));
                }
            }
        }
        let position = options.iter().position(|o| *o == self.chart_suite);
        match position {
            Some(i) => options[(i + 1) % options.len()].clone(),
            None => None,
        }
    }

    pub fn chart_suite_label(&self) -> String {
        self.chart_suite
            .clone()
            .unwrap_or_else(|| "all suites".to_string())
    }

    /// Rebuild the index from disk and re-apply the current selection.
    ///
    /// Series still being computed from the old index are discarded. A
    /// selection without a date (an unknown date was requested, or the project
    /// had no snapshots) resolves to the project's latest date, so snapshots
    /// written since the last scan become visible.
    fn rescan(&mut self) {
        let index = SnapshotIndex::load(&self.config.snapshot_root, &self.store);
        let (projects, dates) = (index.projects().len(), index.dates().len());
        self.index = Arc::new(index);
        self.index_generation += 1;
        self.loaded_selection = None;
        self.coverage_for = None;
        self.coverage_pending = None;
        self.coverage = None;

        match self.current_project() {
            Some(project) => {
                let date = self.current_date();
                self.index
                    .select_project(&self.store, &project, date.as_deref());
            }
            None => {
                let _ = self.action_tx.send(Action::SelectionChanged);
            }
        }
        self.notification = Some(Notification::rescanned(projects, dates));
    }

    pub fn ui(&mut self, f: &mut Frame) {
        super::view::draw(self, f);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for (path, id) in self.subscriptions.drain(..) {
            self.store.unsubscribe(path, id);
        }
    }
}

fn step_list(state: &mut ListState, len: usize, forward: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match (state.selected(), forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    };
    state.select(Some(next));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::datetime::{format_snapshot_date, today};
    use crossterm::event::KeyModifiers;
    use std::fs;

    const PASSING: &str = r#"{
        "metrics": {"passedCaseCount": 4, "failedCaseCount": 1, "coveragePercentage": 87.5,
                    "projectStatus": "passed", "suiteCount": 2},
        "testSuites": [
            {"testSuiteName": "DEV", "testCases": [{"testCaseName": "login", "testSteps": [
                {"testStepName": "ok", "resource": "/login", "method": "POST", "statusCode": "passed"},
                {"testStepName": "bad password", "resource": "/login", "method": "POST", "statusCode": "failed"}
            ]}]},
            {"testSuiteName": "SAT", "testCases": []}
        ]
    }"#;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in [
            ("2024-01-01/Alpha/001.json", PASSING),
            ("2024-01-02/Alpha/001.json", r#"{"metrics": {"coveragePercentage": 50.0}}"#),
            ("2024-01-02/Alpha/002.json", PASSING),
            ("2024-01-02/Beta/001.json", "{broken"),
        ] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn app_for(dir: &tempfile::TempDir) -> App {
        App::with_config(AppConfig {
            snapshot_root: dir.path().display().to_string(),
            ..Default::default()
        })
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
        app.drain_actions();
    }

    #[test]
    fn test_startup_publishes_index() {
        let dir = fixture();
        let app = app_for(&dir);
        assert_eq!(app.projects(), vec!["Alpha", "Beta"]);
        assert!(app.notification.is_none());
        assert!(app.document.is_none());
    }

    #[test]
    fn test_missing_root_warns() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::with_config(AppConfig {
            snapshot_root: dir.path().join("nope").display().to_string(),
            ..Default::default()
        });
        assert!(app.projects().is_empty());
        assert!(app.notification.is_some());
    }

    #[test]
    fn test_selecting_project_loads_latest_snapshot() {
        let dir = fixture();
        let mut app = app_for(&dir);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.current_project().as_deref(), Some("Alpha"));
        assert_eq!(app.current_date().as_deref(), Some("2024-01-02"));
        assert_eq!(app.current_snapshot().as_deref(), Some("002.json"));
        assert_eq!(app.metrics.coverage_percentage, Some(87.5));
        assert_eq!(app.date_list_state.selected(), Some(1));
        assert!(!app.report_rows.is_empty());
    }

    #[test]
    fn test_selecting_date_switches_document() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", Some("2024-01-01"));
        app.drain_actions();
        assert_eq!(app.current_snapshot().as_deref(), Some("001.json"));

        app.focus = Focus::Dates;
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.current_date().as_deref(), Some("2024-01-02"));
        assert_eq!(app.metrics.coverage_percentage, Some(87.5));
    }

    #[test]
    fn test_broken_snapshot_notifies_error() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Beta", None);
        app.drain_actions();

        assert!(app.document.is_none());
        assert_eq!(app.metrics, Metrics::default());
        assert!(app.notification.is_some());
    }

    #[test]
    fn test_search_filters_report_rows() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", None);
        app.drain_actions();
        let all_rows = app.report_rows.len();

        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('/'));
        for c in "password".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.report_rows.len(), 2);
        assert!(app.report_rows.len() < all_rows);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.report_rows.len(), all_rows);
    }

    #[test]
    fn test_primary_color_cycle_updates_theme() {
        let dir = fixture();
        let mut app = app_for(&dir);
        let before = app.theme.clone();

        press(&mut app, KeyCode::Char('c'));

        assert_eq!(
            app.store.get_str(paths::PRIMARY_COLOR).as_deref(),
            Some("#28a745")
        );
        assert_ne!(app.theme, before);
    }

    #[test]
    fn test_chart_suite_cycles_through_document_suites() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", None);
        app.drain_actions();

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.chart_suite.as_deref(), Some("DEV"));
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.chart_suite.as_deref(), Some("SAT"));
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.chart_suite, None);
    }

    #[test]
    fn test_drop_removes_subscriptions() {
        let dir = fixture();
        let app = app_for(&dir);
        let store = Rc::clone(&app.store);
        assert_eq!(store.subscriber_count(paths::CURRENT_PROJECT), 1);
        drop(app);
        assert_eq!(store.subscriber_count(paths::CURRENT_PROJECT), 0);
        assert_eq!(store.subscriber_count(paths::THEME), 0);
    }

    #[tokio::test]
    async fn test_analysis_view_loads_coverage() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", None);
        app.drain_actions();

        press(&mut app, KeyCode::Char('3'));
        assert!(app.coverage_loading());

        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        assert!(!app.coverage_loading());
        let series = app.coverage.as_ref().unwrap();
        assert_eq!(series.len(), 30);
    }

    async fn finish_coverage(app: &mut App) {
        while app.coverage_loading() {
            let action = app.action_rx.recv().await.unwrap();
            app.handle_action(action);
        }
    }

    #[tokio::test]
    async fn test_rescan_discards_series_from_old_index() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", None);
        app.drain_actions();
        press(&mut app, KeyCode::Char('3'));
        assert!(app.coverage_loading());

        let today = format_snapshot_date(today());
        let path = dir.path().join(format!("{today}/Alpha/001.json"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, r#"{"metrics": {"coveragePercentage": 77.0}}"#).unwrap();

        press(&mut app, KeyCode::Char('r'));
        assert!(app.index.has_date(&today));

        finish_coverage(&mut app).await;
        let series = app.coverage.as_ref().unwrap();
        assert_eq!(series.get(&today), Some(77.0));
    }

    #[tokio::test]
    async fn test_switching_project_hides_previous_series() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", None);
        app.drain_actions();
        press(&mut app, KeyCode::Char('3'));
        finish_coverage(&mut app).await;
        assert!(app.coverage.is_some());

        app.index.select_project(&app.store, "Beta", None);
        app.drain_actions();
        assert!(app.coverage.is_none());
        assert!(app.coverage_loading());

        finish_coverage(&mut app).await;
        assert_eq!(app.coverage.as_ref().map(|s| s.len()), Some(30));
    }

    #[test]
    fn test_rescan_resolves_cleared_date_to_latest() {
        let dir = fixture();
        let mut app = app_for(&dir);
        app.index.select_project(&app.store, "Alpha", Some("1999-01-01"));
        app.drain_actions();
        assert_eq!(app.current_date(), None);
        assert!(app.document.is_none());

        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.current_project().as_deref(), Some("Alpha"));
        assert_eq!(app.current_date().as_deref(), Some("2024-01-02"));
        assert_eq!(app.current_snapshot().as_deref(), Some("002.json"));
        assert!(app.document.is_some());
    }

    #[test]
    fn test_step_list_wraps() {
        let mut state = ListState::default();
        step_list(&mut state, 3, false);
        assert_eq!(state.selected(), Some(0));
        step_list(&mut state, 3, false);
        assert_eq!(state.selected(), Some(2));
        step_list(&mut state, 3, true);
        assert_eq!(state.selected(), Some(0));
        step_list(&mut state, 0, true);
        assert_eq!(state.selected(), None);
    }
}
