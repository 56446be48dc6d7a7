use std::fs;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{Terminal, backend::TestBackend};
use tui_snapshot_dash::config::AppConfig;
use tui_snapshot_dash::internal::ui::app::App;

fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

fn app_with_snapshot() -> (tempfile::TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2024-01-01/Payments/001.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"{"metrics": {"passedCaseCount": 12, "coveragePercentage": 87.5, "projectStatus": "passed"},
            "testSuites": [{"testSuiteName": "DEV", "testCases": [{"testCaseName": "Refund",
              "testSteps": [{"testStepName": "full refund", "resource": "/refunds", "method": "POST", "statusCode": "passed"}]}]}]}"#,
    )
    .unwrap();

    let app = App::with_config(AppConfig {
        snapshot_root: dir.path().display().to_string(),
        ..Default::default()
    });
    (dir, app)
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    app.drain_actions();
}

#[test]
fn test_home_without_selection() {
    let (_dir, mut app) = app_with_snapshot();
    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();

    terminal.draw(|f| app.ui(f)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("Select A Project"));
    assert!(text.contains("Payments"));
}

#[test]
fn test_home_shows_metrics_after_selection() {
    let (_dir, mut app) = app_with_snapshot();
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Enter);

    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal.draw(|f| app.ui(f)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("Monday, January 01, 2024"));
    assert!(text.contains("PASSED"));
    assert!(text.contains("87.5%"));
    assert!(text.contains("Passed Cases"));
}

#[test]
fn test_snapshot_table_lists_steps() {
    let (_dir, mut app) = app_with_snapshot();
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char('2'));

    let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
    terminal.draw(|f| app.ui(f)).unwrap();

    let text = buffer_text(&terminal);
    assert!(text.contains("Functionality"));
    assert!(text.contains("/refunds"));
    assert!(text.contains("full refund"));
}

#[test]
fn test_settings_and_small_terminal_do_not_panic() {
    let (_dir, mut app) = app_with_snapshot();
    press(&mut app, KeyCode::Char('4'));

    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal.draw(|f| app.ui(f)).unwrap();
    assert!(buffer_text(&terminal).contains("#007bff"));

    let mut tiny = Terminal::new(TestBackend::new(10, 4)).unwrap();
    tiny.draw(|f| app.ui(f)).unwrap();
}
