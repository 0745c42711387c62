//! Report assembly
//!
//! Runs a list of metric definitions against one table and collects the
//! results in declaration order.

use crate::error::ComputeError;
use crate::metric::MetricDefinition;
use crate::types::{MetricResult, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the assembler reacts to a failing metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Stop at the first failure
    #[default]
    FailFast,
    /// Record the failure against the metric and keep going
    BestEffort,
}

/// Ordered collection of metric outcomes for one table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    entries: Vec<(String, Result<MetricResult, ComputeError>)>,
}

impl Report {
    /// Outcome of a metric by name
    pub fn get(&self, name: &str) -> Option<&Result<MetricResult, ComputeError>> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }

    /// Successful result of a metric by name
    pub fn result(&self, name: &str) -> Option<&MetricResult> {
        self.get(name).and_then(|outcome| outcome.as_ref().ok())
    }

    pub fn entries(&self) -> &[(String, Result<MetricResult, ComputeError>)] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every metric succeeded
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, outcome)| outcome.is_ok())
    }

    /// Failed metrics with their errors
    pub fn errors(&self) -> impl Iterator<Item = (&str, &ComputeError)> {
        self.entries
            .iter()
            .filter_map(|(name, outcome)| outcome.as_ref().err().map(|e| (name.as_str(), e)))
    }
}

/// Evaluates metric definitions into a [`Report`]
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(
        table: &Table,
        definitions: &[MetricDefinition],
        mode: EvaluationMode,
    ) -> Result<Report, ComputeError> {
        let mut names = HashSet::new();
        for definition in definitions {
            if !names.insert(definition.name.as_str()) {
                return Err(ComputeError::DuplicateMetric(definition.name.clone()));
            }
        }

        let mut entries = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let outcome = definition.evaluate(table);
            match (&outcome, mode) {
                (Ok(result), _) => {
                    tracing::debug!(metric = %definition.name, shape = result.shape(), "evaluated metric");
                }
                (Err(e), EvaluationMode::FailFast) => {
                    return Err(ComputeError::Metric {
                        metric: definition.name.clone(),
                        source: Box::new(e.clone()),
                    });
                }
                (Err(e), EvaluationMode::BestEffort) => {
                    tracing::warn!(metric = %definition.name, error = %e, "metric failed");
                }
            }
            entries.push((definition.name.clone(), outcome));
        }

        let report = Report { entries };
        tracing::info!(
            metrics = report.len(),
            failed = report.errors().count(),
            "assembled report"
        );
        Ok(report)
    }
}
