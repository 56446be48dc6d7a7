use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Headline numbers copied from a snapshot's `metrics` object.
///
/// Every field is optional: a missing or mistyped field is "not available"
/// rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub passed_case_count: Option<u64>,
    pub failed_case_count: Option<u64>,
    pub passed_step_count: Option<u64>,
    pub failed_step_count: Option<u64>,
    pub coverage_percentage: Option<f64>,
    pub project_status: Option<String>,
    pub suite_count: Option<u64>,
    pub case_count: Option<u64>,
    pub step_count: Option<u64>,
}

impl Metrics {
    /// Coverage rounded to a whole percent, for compact headers ("88%").
    pub fn coverage_compact(&self) -> String {
        match self.coverage_percentage {
            Some(pct) => format!("{}%", pct.round()),
            None => "N/A".to_string(),
        }
    }

    /// Coverage with one decimal, for the metrics grid ("87.5%").
    pub fn coverage_detail(&self) -> String {
        match self.coverage_percentage {
            Some(pct) => format!("{pct:.1}%"),
            None => "N/A".to_string(),
        }
    }

    pub fn is_passing(&self) -> Option<bool> {
        self.project_status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("passed"))
    }
}

/// Render an optional count, "N/A" when missing.
pub fn count_label(count: Option<u64>) -> String {
    count.map_or_else(|| "N/A".to_string(), |c| c.to_string())
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TestSuite {
    pub test_suite_name: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TestCase {
    pub test_case_name: String,
    pub disabled: bool,
    pub test_steps: Vec<TestStep>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TestStep {
    pub test_step_name: String,
    pub resource: String,
    pub method: String,
    pub status_code: Option<String>,
    pub disabled: bool,
    pub data_prep: Option<Value>,
    pub data_validation: Option<Value>,
    pub data_cleanup: Option<Value>,
    pub notes: Option<String>,
    pub description: Option<String>,
}

/// A parsed snapshot report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotDocument {
    pub metrics: Metrics,
    pub test_suites: Vec<TestSuite>,
}

impl SnapshotDocument {
    /// Build from raw JSON. Metrics are extracted field by field; the suites
    /// array must match the schema (missing keys default, wrong types fail).
    pub fn from_value(value: &Value) -> Result<Self> {
        let metrics = crate::internal::coverage::compute_metrics(value);
        let test_suites = match value.get("testSuites") {
            Some(suites) => Vec::<TestSuite>::deserialize(suites)
                .context("Failed to parse testSuites")?,
            None => Vec::new(),
        };
        Ok(Self {
            metrics,
            test_suites,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Failed to parse snapshot JSON")?;
        Self::from_value(&value)
    }

    pub fn suite_names(&self) -> Vec<String> {
        self.test_suites
            .iter()
            .map(|s| s.test_suite_name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_defaults_missing_keys() {
        let doc = SnapshotDocument::from_json(
            r#"{"testSuites": [{"testSuiteName": "DEV", "testCases": [{"testSteps": [{}]}]}]}"#,
        )
        .unwrap();
        assert_eq!(doc.metrics, Metrics::default());
        let step = &doc.test_suites[0].test_cases[0].test_steps[0];
        assert!(!step.disabled);
        assert_eq!(step.status_code, None);
        assert_eq!(doc.suite_names(), vec!["DEV"]);
    }

    #[test]
    fn test_document_rejects_mistyped_suites() {
        assert!(SnapshotDocument::from_json(r#"{"testSuites": "nope"}"#).is_err());
        assert!(SnapshotDocument::from_json("{not json").is_err());
    }

    #[test]
    fn test_coverage_labels() {
        let metrics = Metrics {
            coverage_percentage: Some(87.5),
            ..Default::default()
        };
        assert_eq!(metrics.coverage_compact(), "88%");
        assert_eq!(metrics.coverage_detail(), "87.5%");
        assert_eq!(Metrics::default().coverage_compact(), "N/A");
        assert_eq!(count_label(None), "N/A");
        assert_eq!(count_label(Some(4)), "4");
    }
}
