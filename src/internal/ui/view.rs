use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, List, ListItem, Padding,
        Paragraph, Row, Table, Tabs, Wrap,
    },
};

use super::app::{App, Focus, InputMode, ViewMode};
use crate::internal::models::{Metrics, count_label};
use crate::internal::notification::NotificationType;
use crate::internal::report::{COLUMNS, ReportRow};
use crate::internal::state::paths;
use crate::utils::datetime::format_long_date;
use crate::utils::theme_loader::parse_color;

const SIDEBAR_WIDTH: u16 = 28;

#[tracing::instrument(skip(app, f))]
pub fn draw(app: &mut App, f: &mut Frame) {
    // Logged at the end when performance metrics are enabled in debug builds.
    let start = std::time::Instant::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_top_bar(app, f, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(chunks[1]);

    render_sidebar(app, f, body[0]);

    let view_start = std::time::Instant::now();
    match app.view_mode {
        ViewMode::Home => render_home(app, f, body[1]),
        ViewMode::Snapshot => render_snapshot(app, f, body[1]),
        ViewMode::Analysis => render_analysis(app, f, body[1]),
        ViewMode::Settings => render_settings(app, f, body[1]),
    }
    if app.config.logging.enable_performance_metrics && cfg!(debug_assertions) {
        tracing::debug!(elapsed = ?view_start.elapsed(), view = %app.view_mode, "render.view");
    }

    render_status_bar(app, f, chunks[2]);

    if app.input_mode == InputMode::Search {
        render_search_overlay(app, f);
    }

    if app.notification.is_some() {
        render_notification(app, f);
    }

    if app.config.logging.enable_performance_metrics && cfg!(debug_assertions) {
        tracing::debug!(elapsed = ?start.elapsed(), "render.draw");
    }
}

fn focus_block(app: &App, title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        app.theme.primary
    } else {
        app.theme.border
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(app.theme.background))
}

fn render_top_bar(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);

    let title = Paragraph::new(format!(" Snapshot Dashboard v{}", app.app_version)).style(
        Style::default()
            .fg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(title, chunks[0]);

    let titles: Vec<String> = ViewMode::ALL
        .iter()
        .enumerate()
        .map(|(i, mode)| format!("{} {}", i + 1, mode))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.view_mode.index())
        .style(Style::default().fg(app.theme.foreground))
        .highlight_style(
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, chunks[1]);
}

fn render_sidebar(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let current_project = app.current_project();
    let projects = app.projects();
    let block = focus_block(
        app,
        format!(" Projects ({}) ", projects.len()),
        app.focus == Focus::Projects,
    );
    let list = selection_list(app, projects, current_project.as_deref(), block);
    f.render_stateful_widget(list, chunks[0], &mut app.project_list_state);

    let current_date = app.current_date();
    let dates = app.project_dates();
    let title = match &current_project {
        Some(_) => format!(" Dates ({}) ", dates.len()),
        None => " Dates ".to_string(),
    };
    let block = focus_block(app, title, app.focus == Focus::Dates);
    if dates.is_empty() {
        let hint = match current_project {
            Some(_) => "No snapshots",
            None => "Select a project",
        };
        let p = Paragraph::new(hint)
            .style(Style::default().fg(app.theme.muted))
            .block(block);
        f.render_widget(p, chunks[1]);
    } else {
        let list = selection_list(app, dates, current_date.as_deref(), block);
        f.render_stateful_widget(list, chunks[1], &mut app.date_list_state);
    }
}

/// List with the active entry marked and the cursor highlighted.
fn selection_list(
    app: &App,
    entries: Vec<String>,
    active: Option<&str>,
    block: Block<'static>,
) -> List<'static> {
    let items: Vec<ListItem> = entries
        .into_iter()
        .map(|entry| {
            let is_active = active == Some(entry.as_str());
            let (marker, style) = if is_active {
                (
                    "● ",
                    Style::default()
                        .fg(app.theme.primary)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(app.theme.foreground))
            };
            ListItem::new(Line::from(vec![Span::raw(marker), Span::styled(entry, style)]))
        })
        .collect();

    List::new(items).block(block).highlight_style(
        Style::default()
            .add_modifier(Modifier::REVERSED)
            .fg(app.theme.primary),
    )
}

fn metric_tiles(metrics: &Metrics) -> [(&'static str, String); 8] {
    [
        ("Passed Cases", count_label(metrics.passed_case_count)),
        ("Failed Cases", count_label(metrics.failed_case_count)),
        ("Passed Steps", count_label(metrics.passed_step_count)),
        ("Failed Steps", count_label(metrics.failed_step_count)),
        ("Coverage", metrics.coverage_detail()),
        ("Suites", count_label(metrics.suite_count)),
        ("Cases", count_label(metrics.case_count)),
        ("Steps", count_label(metrics.step_count)),
    ]
}

fn render_home(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let header = render_header_lines(app);
    let p = Paragraph::new(header).block(
        focus_block(app, " Overview ".to_string(), false).padding(Padding::horizontal(1)),
    );
    f.render_widget(p, chunks[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4); 4])
        .split(chunks[1]);

    let tiles = metric_tiles(&app.metrics);
    for (row_area, pair) in rows.iter().zip(tiles.chunks(2)) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row_area);
        for (col_area, (label, value)) in cols.iter().zip(pair) {
            let tile = Paragraph::new(vec![
                Line::from(Span::styled(
                    value.clone(),
                    Style::default()
                        .fg(app.theme.primary)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(*label, Style::default().fg(app.theme.muted))),
            ])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(tile, *col_area);
        }
    }
}

fn render_header_lines(app: &App) -> Vec<Line<'static>> {
    let Some(project) = app.current_project() else {
        return vec![
            Line::from(Span::styled(
                "Select A Project",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Pick a project in the sidebar and press Enter",
                Style::default().fg(app.theme.muted),
            )),
        ];
    };

    let date = app
        .current_date()
        .map(|d| format_long_date(&d))
        .unwrap_or_else(|| "No snapshots".to_string());

    let (status, status_color) = match app.metrics.is_passing() {
        Some(true) => ("PASSED", app.theme.passed),
        Some(false) => ("FAILED", app.theme.failed),
        None => ("UNKNOWN", app.theme.muted),
    };

    vec![
        Line::from(vec![
            Span::styled(
                project,
                Style::default()
                    .fg(app.theme.foreground)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                app.metrics.coverage_compact(),
                Style::default().fg(app.theme.primary),
            ),
        ]),
        Line::from(Span::styled(date, Style::default().fg(app.theme.muted))),
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(
                status,
                Style::default()
                    .fg(status_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            app.current_snapshot().unwrap_or_default(),
            Style::default().fg(app.theme.muted),
        )),
    ]
}

fn status_cell(label: &str, app: &App) -> Cell<'static> {
    let color = match label {
        "YES" => app.theme.passed,
        "NO" => app.theme.failed,
        _ => app.theme.muted,
    };
    Cell::from(label.to_string()).style(Style::default().fg(color))
}

fn render_snapshot(app: &mut App, f: &mut Frame, area: Rect) {
    let filter = if app.search_query.is_empty() {
        String::new()
    } else {
        format!(
            " | Filter: {} [{}]",
            app.search_query.query,
            app.search_query.search_type.as_str()
        )
    };
    let title = match app.current_snapshot() {
        Some(file) => format!(" Snapshot {file}{filter} "),
        None => " Snapshot ".to_string(),
    };
    let block = focus_block(app, title, app.focus == Focus::Content);

    if app.document.is_none() {
        let p = Paragraph::new("No snapshot loaded")
            .style(Style::default().fg(app.theme.muted))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c))).style(
        Style::default()
            .fg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .report_rows
        .iter()
        .map(|row| match row {
            ReportRow::SuiteHeader(name) => Row::new(vec![Cell::from(name.clone())]).style(
                Style::default()
                    .fg(app.theme.background)
                    .bg(app.theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            ReportRow::Step(step) => {
                let [id, dev, sat, rest @ ..] = step.cells();
                let mut cells = vec![
                    Cell::from(id),
                    status_cell(&dev, app),
                    status_cell(&sat, app),
                ];
                cells.extend(rest.into_iter().map(Cell::from));
                Row::new(cells).style(Style::default().fg(app.theme.foreground))
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Min(14),
        Constraint::Length(7),
        Constraint::Min(14),
        Constraint::Min(12),
        Constraint::Min(8),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_analysis(app: &App, f: &mut Frame, area: Rect) {
    let suite = app.chart_suite_label();

    let message = match (&app.current_project(), &app.coverage) {
        (None, _) => Some("No data available\nPlease select a project".to_string()),
        (Some(_), _) if app.coverage_loading() && app.coverage.is_none() => {
            Some("Loading coverage...".to_string())
        }
        (Some(_), None) => Some("No data available".to_string()),
        (Some(_), Some(series)) if series.plotted().is_empty() => Some(format!(
            "No coverage recorded in the last {} days ({suite})",
            series.len()
        )),
        _ => None,
    };

    if let Some(message) = message {
        let p = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted))
            .wrap(Wrap { trim: true })
            .block(focus_block(app, " Coverage ".to_string(), false));
        f.render_widget(p, area);
        return;
    }

    let Some(series) = &app.coverage else {
        return;
    };
    let plotted = series.plotted();
    let points: Vec<(f64, f64)> = plotted
        .iter()
        .enumerate()
        .map(|(i, (_, value))| (i as f64, *value))
        .collect();

    let x_max = plotted.len().saturating_sub(1).max(1) as f64;
    let short = |date: &str| date.get(5..).unwrap_or(date).to_string();
    let mut x_labels = vec![short(&plotted[0].0)];
    if plotted.len() > 2 {
        x_labels.push(short(&plotted[plotted.len() / 2].0));
    }
    if plotted.len() > 1 {
        x_labels.push(short(&plotted[plotted.len() - 1].0));
    }

    let title = format!(
        " Coverage {} to {} ({suite}) ",
        plotted[0].0,
        plotted[plotted.len() - 1].0
    );

    let dataset = Dataset::default()
        .name(suite.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(app.theme.primary))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(focus_block(app, title, app.focus == Focus::Content))
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(app.theme.muted))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Coverage %")
                .style(Style::default().fg(app.theme.muted))
                .bounds([0.0, 100.0])
                .labels(["0", "50", "100"]),
        );
    f.render_widget(chart, area);
}

fn render_settings(app: &App, f: &mut Frame, area: Rect) {
    let swatch = |label: &'static str, path: &str| {
        let value = app.store.get_str(path).unwrap_or_else(|| "unset".to_string());
        let color = parse_color(&value).unwrap_or(Color::Reset);
        Line::from(vec![
            Span::raw(format!("{label:<18}")),
            Span::styled("  ", Style::default().bg(color)),
            Span::raw(format!(" {value}")),
        ])
    };

    let lines = vec![
        Line::from(Span::styled(
            "Theme",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        swatch("Primary color", paths::PRIMARY_COLOR),
        swatch("Background color", paths::BACKGROUND_COLOR),
        swatch("Text color", paths::TEXT_COLOR),
        Line::from(Span::styled(
            "Press c to change the primary color",
            Style::default().fg(app.theme.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Data",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{:<18}{}", "Snapshot root", app.index.root().display())),
        Line::from(format!("{:<18}{} days", "Coverage window", app.config.coverage_days)),
        Line::from(format!("{:<18}{}", "Chart suite", app.chart_suite_label())),
        Line::from(format!(
            "{:<18}{} projects, {} dates",
            "Indexed",
            app.index.projects().len(),
            app.index.dates().len()
        )),
    ];

    let p = Paragraph::new(lines)
        .style(Style::default().fg(app.theme.foreground))
        .block(focus_block(app, " Settings ".to_string(), false).padding(Padding::uniform(1)));
    f.render_widget(p, area);
}

fn render_status_bar(app: &App, f: &mut Frame, area: Rect) {
    let status = match (app.input_mode, app.view_mode) {
        (InputMode::Search, _) => {
            "Search: Type | Tab: Literal/Regex | Enter: Apply | Esc: Cancel".to_string()
        }
        (InputMode::Normal, ViewMode::Snapshot) => {
            let clear = if app.search_query.is_empty() {
                ""
            } else {
                " | Esc: Clear filter"
            };
            format!(
                "Tab: Focus | j/k: Nav | Enter: Select | /: Filter{clear} | 1-4: View | r: Rescan | q: Quit"
            )
        }
        (InputMode::Normal, ViewMode::Analysis) => {
            "Tab: Focus | j/k: Nav | Enter: Select | s: Suite | 1-4: View | r: Rescan | q: Quit"
                .to_string()
        }
        (InputMode::Normal, ViewMode::Settings) => {
            "c: Primary color | 1-4: View | r: Rescan | q: Quit".to_string()
        }
        (InputMode::Normal, ViewMode::Home) => {
            "Tab: Focus | j/k: Nav | Enter: Select | 1-4: View | r: Rescan | q: Quit".to_string()
        }
    };

    let p = Paragraph::new(status)
        .block(Block::default().padding(Padding::horizontal(1)))
        .style(Style::default().fg(app.theme.background).bg(app.theme.primary));
    f.render_widget(p, area);
}

fn render_notification(app: &App, f: &mut Frame) {
    let Some(notification) = &app.notification else {
        return;
    };
    let area = f.area();

    let popup_width = (notification.message.chars().count() as u16 + 4).min(area.width.saturating_sub(4));
    let popup_height = 3;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    let (bg_color, title) = match notification.notification_type {
        NotificationType::Info => (Color::Blue, "Info"),
        NotificationType::Warning => (Color::Yellow, "Warning"),
        NotificationType::Error => (Color::Red, "Error"),
    };

    let popup = Paragraph::new(notification.message.as_str())
        .style(
            Style::default()
                .bg(bg_color)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(title),
        )
        .alignment(Alignment::Center);

    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn render_search_overlay(app: &App, f: &mut Frame) {
    let area = f.area();
    let search_width = 60.min(area.width.saturating_sub(4));
    let search_height = 4;
    let search_x = (area.width.saturating_sub(search_width)) / 2;
    let search_y = (area.height.saturating_sub(search_height)) / 2;
    let search_area = Rect::new(search_x, search_y, search_width, search_height);

    let mut lines = vec![Line::from(Span::styled(
        format!("{}█", app.temp_search_input),
        Style::default().fg(app.theme.foreground),
    ))];
    if let Some(error) = &app.search_query.regex_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(app.theme.failed),
        )));
    }

    let search_box = Paragraph::new(lines)
        .style(Style::default().bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.primary))
                .title(format!(" Filter steps | {} ", app.search_type.as_str())),
        );

    f.render_widget(Clear, search_area);
    f.render_widget(search_box, search_area);
}
