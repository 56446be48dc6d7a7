//! Metrics and coverage derived from snapshot documents.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

use jiff::civil::Date;

use super::models::{Metrics, SnapshotDocument, TestSuite};
use super::snapshots::SnapshotIndex;
use crate::utils::datetime::{date_axis, format_snapshot_date, today};

/// Copy the `metrics` object of a raw snapshot. Missing or mistyped fields
/// stay `None`.
pub fn compute_metrics(document: &Value) -> Metrics {
    let Some(metrics) = document.get("metrics") else {
        return Metrics::default();
    };
    let count = |key: &str| metrics.get(key).and_then(Value::as_u64);

    Metrics {
        passed_case_count: count("passedCaseCount"),
        failed_case_count: count("failedCaseCount"),
        passed_step_count: count("passedStepCount"),
        failed_step_count: count("failedStepCount"),
        coverage_percentage: metrics.get("coveragePercentage").and_then(Value::as_f64),
        project_status: metrics
            .get("projectStatus")
            .and_then(Value::as_str)
            .map(str::to_string),
        suite_count: count("suiteCount"),
        case_count: count("caseCount"),
        step_count: count("stepCount"),
    }
}

/// Share of enabled steps whose `statusCode` is `"passed"`, in percent with
/// two decimals.
///
/// A step is disabled by its own flag or by its test case's flag. A suite
/// without enabled steps scores `0.0`.
pub fn coverage_percentage(suite: &TestSuite) -> f64 {
    let (enabled, passed) = suite
        .test_cases
        .iter()
        .filter(|case| !case.disabled)
        .flat_map(|case| case.test_steps.iter())
        .filter(|step| !step.disabled)
        .fold((0u64, 0u64), |(enabled, passed), step| {
            let ok = step.status_code.as_deref() == Some("passed");
            (enabled + 1, passed + u64::from(ok))
        });

    match enabled {
        0 => 0.0,
        n => round2(passed as f64 / n as f64 * 100.0),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First suite whose name equals `name` exactly.
pub fn find_test_suite<'a>(document: &'a SnapshotDocument, name: &str) -> Option<&'a TestSuite> {
    document
        .test_suites
        .iter()
        .find(|suite| suite.test_suite_name == name)
}

/// Coverage per day over a fixed, contiguous date axis.
///
/// Days without a usable value (no snapshot, unreadable file, suite or
/// metric missing) hold `None`, which keeps them apart from a genuine `0.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverageSeries {
    points: BTreeMap<String, Option<f64>>,
}

impl CoverageSeries {
    fn with_axis(axis: &[Date]) -> Self {
        Self {
            points: axis
                .iter()
                .map(|d| (format_snapshot_date(*d), None))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<String> {
        self.points.keys().cloned().collect()
    }

    pub fn get(&self, date: &str) -> Option<f64> {
        self.points.get(date).copied().flatten()
    }

    /// Every day of the axis, with days lacking data reported as `0.0`.
    pub fn filled(&self) -> BTreeMap<String, f64> {
        self.points
            .iter()
            .map(|(date, value)| (date.clone(), value.unwrap_or(0.0)))
            .collect()
    }

    /// Days that carry a value, oldest first.
    pub fn plotted(&self) -> Vec<(String, f64)> {
        self.points
            .iter()
            .filter_map(|(date, value)| value.map(|v| (date.clone(), v)))
            .collect()
    }
}

/// Builds coverage time series from the snapshot index.
pub struct CoverageAggregator<'a> {
    index: &'a SnapshotIndex,
}

impl<'a> CoverageAggregator<'a> {
    pub fn new(index: &'a SnapshotIndex) -> Self {
        Self { index }
    }

    /// Series for the `days` days ending today.
    pub fn coverage_over_time(&self, project: &str, suite: Option<&str>, days: usize) -> CoverageSeries {
        self.coverage_over_time_until(project, suite, days, today())
    }

    /// Series for the `days` days ending on `end`.
    ///
    /// With `suite` each day's latest snapshot is scored with
    /// [`coverage_percentage`]; without it the snapshot's own
    /// `metrics.coveragePercentage` is used. A failure on one day is logged
    /// and leaves only that day empty.
    #[tracing::instrument(skip(self))]
    pub fn coverage_over_time_until(
        &self,
        project: &str,
        suite: Option<&str>,
        days: usize,
        end: Date,
    ) -> CoverageSeries {
        let start = Instant::now();
        let axis = date_axis(end, days);
        let mut series = CoverageSeries::with_axis(&axis);

        for (date, value) in series.points.iter_mut() {
            if !self.index.has_date(date) {
                continue;
            }
            let Some(file) = self.index.latest_snapshot_for_date(project, date) else {
                continue;
            };
            match self.snapshot_coverage(project, date, &file, suite) {
                Ok(coverage) => *value = coverage,
                Err(e) => {
                    tracing::warn!(project, date = %date, file = %file, "Skipping snapshot: {:#}", e);
                }
            }
        }

        tracing::debug!(
            points = series.plotted().len(),
            elapsed = ?start.elapsed(),
            "Computed coverage series"
        );
        series
    }

    fn snapshot_coverage(
        &self,
        project: &str,
        date: &str,
        file: &str,
        suite: Option<&str>,
    ) -> Result<Option<f64>> {
        let document = self.index.read_snapshot(project, date, file)?;
        match suite {
            Some(name) => {
                let found = find_test_suite(&document, name);
                if found.is_none() {
                    tracing::debug!(project, date, suite = name, "Suite not present in snapshot");
                }
                Ok(found.map(coverage_percentage))
            }
            None => document
                .metrics
                .coverage_percentage
                .map(Some)
                .context("metrics.coveragePercentage missing"),
        }
    }
}
