//! Flattening of a snapshot into the rows of the step table.

use super::models::{SnapshotDocument, TestStep};
use super::search::SearchQuery;

pub const COLUMNS: [&str; 10] = [
    "ID",
    "DEV Coverage",
    "SAT Coverage",
    "API",
    "Functionality",
    "Method",
    "Scenario",
    "Data Methods",
    "Notes",
    "Description",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub id: usize,
    pub dev_coverage: String,
    pub sat_coverage: String,
    pub api: String,
    pub functionality: String,
    pub method: String,
    pub scenario: String,
    pub data_methods: String,
    pub notes: String,
    pub description: String,
}

impl StepRow {
    pub fn cells(&self) -> [String; 10] {
        [
            self.id.to_string(),
            self.dev_coverage.clone(),
            self.sat_coverage.clone(),
            self.api.clone(),
            self.functionality.clone(),
            self.method.clone(),
            self.scenario.clone(),
            self.data_methods.clone(),
            self.notes.clone(),
            self.description.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRow {
    SuiteHeader(String),
    Step(StepRow),
}

/// Table label for a step: `DISABLED`, `YES`, `NO` or empty.
pub fn step_status(step: &TestStep) -> &'static str {
    if step.disabled {
        return "DISABLED";
    }
    match step.status_code.as_deref() {
        Some(code) if code.eq_ignore_ascii_case("passed") => "YES",
        Some(code) if code.eq_ignore_ascii_case("failed") => "NO",
        _ => "",
    }
}

fn data_methods(step: &TestStep) -> String {
    [
        (step.data_prep.is_some(), "Data Prep"),
        (step.data_validation.is_some(), "Data Validation"),
        (step.data_cleanup.is_some(), "Data Cleanup"),
    ]
    .into_iter()
    .filter_map(|(present, label)| present.then_some(label))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Rows for `document`, filtered by `query`.
///
/// Step ids count every step in document order, shown or not. When the query
/// is non-empty, suites left without matching steps lose their header row.
pub fn step_rows(document: &SnapshotDocument, query: &SearchQuery) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    let mut step_id = 1;

    for suite in &document.test_suites {
        let suite_name = suite.test_suite_name.to_uppercase();
        let is_dev = suite_name == "DEV";
        let is_sat = suite_name == "SAT";
        let mut suite_rows = Vec::new();

        for case in &suite.test_cases {
            for step in &case.test_steps {
                let status = step_status(step);
                let row = StepRow {
                    id: step_id,
                    dev_coverage: if is_dev { status } else { "" }.to_string(),
                    sat_coverage: if is_sat { status } else { "" }.to_string(),
                    api: step.resource.clone(),
                    functionality: case.test_case_name.clone(),
                    method: step.method.clone(),
                    scenario: step.test_step_name.clone(),
                    data_methods: data_methods(step),
                    notes: step.notes.clone().unwrap_or_default(),
                    description: step.description.clone().unwrap_or_default(),
                };
                step_id += 1;

                if query.is_empty() || row.cells().iter().any(|cell| query.matches(cell)) {
                    suite_rows.push(ReportRow::Step(row));
                }
            }
        }

        if query.is_empty() || !suite_rows.is_empty() {
            rows.push(ReportRow::SuiteHeader(suite_name));
            rows.append(&mut suite_rows);
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "testSuites": [
            {"testSuiteName": "dev", "testCases": [
                {"testCaseName": "Create user", "testSteps": [
                    {"testStepName": "happy path", "resource": "/users", "method": "POST",
                     "statusCode": "Passed", "dataPrep": {}, "dataCleanup": null},
                    {"testStepName": "duplicate", "resource": "/users", "method": "POST",
                     "statusCode": "failed", "notes": "flaky"}
                ]}
            ]},
            {"testSuiteName": "SAT", "testCases": [
                {"testCaseName": "List orders", "testSteps": [
                    {"testStepName": "paged", "resource": "/orders", "method": "GET",
                     "statusCode": "passed", "disabled": true, "dataValidation": [1]}
                ]}
            ]}
        ]
    }"#;

    fn render(rows: &[ReportRow]) -> String {
        rows.iter()
            .map(|row| match row {
                ReportRow::SuiteHeader(name) => format!("== {name}"),
                ReportRow::Step(step) => step.cells().join("|"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_rows_without_filter() {
        let doc = SnapshotDocument::from_json(SNAPSHOT).unwrap();
        let rows = step_rows(&doc, &SearchQuery::default());
        insta::assert_snapshot!(render(&rows), @r"
        == DEV
        1|YES||/users|Create user|POST|happy path|Data Prep||
        2|NO||/users|Create user|POST|duplicate||flaky|
        == SAT
        3||DISABLED|/orders|List orders|GET|paged|Data Validation||
        ");
    }

    #[test]
    fn test_filter_keeps_ids_and_drops_empty_suites() {
        let doc = SnapshotDocument::from_json(SNAPSHOT).unwrap();
        let rows = step_rows(&doc, &SearchQuery::literal("FLAKY"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ReportRow::SuiteHeader("DEV".to_string()));
        match &rows[1] {
            ReportRow::Step(step) => assert_eq!(step.id, 2),
            other => panic!("unexpected row {other:?}"),
        }
    }

    #[test]
    fn test_empty_suite_keeps_header_without_filter() {
        let doc = SnapshotDocument::from_json(r#"{"testSuites": [{"testSuiteName": "Smoke"}]}"#)
            .unwrap();
        assert_eq!(
            step_rows(&doc, &SearchQuery::default()),
            vec![ReportRow::SuiteHeader("SMOKE".to_string())]
        );
        assert!(step_rows(&doc, &SearchQuery::literal("x")).is_empty());
    }
}
