//! Offline drift/performance reporting: predict over a current dataset
//! (and optionally a reference dataset) and summarize regression error and
//! per-column drift between the two.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api_models::{PredictionId, PredictionRequest};
use crate::frame::TabularFrame;
use crate::model::Model;

/// Per-column drift score above this counts the column as drifted.
const COLUMN_DRIFT_THRESHOLD: f64 = 0.2;
/// Share of drifted columns above which the whole dataset counts as drifted.
const DATASET_DRIFT_SHARE: f64 = 0.5;

/// A labelled dataset in the same column-array layout as the request
/// schema, minus identifiers, plus the `price` target.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    pub airline: Vec<String>,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub total_stops: Vec<i64>,
    pub date: Vec<u32>,
    pub month: Vec<u32>,
    pub year: Vec<i32>,
    pub dep_hours: Vec<u32>,
    pub dep_min: Vec<u32>,
    pub arrival_hours: Vec<u32>,
    pub arrival_min: Vec<u32>,
    pub duration_hours: Vec<i64>,
    pub duration_min: Vec<i64>,
    pub price: Vec<f64>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse dataset at {}", path.display()))
    }

    /// Reuses the serving-path adapter, so the same equal-length rule
    /// applies to dataset columns (including `price`).
    fn to_frame(&self) -> Result<TabularFrame> {
        let request = PredictionRequest {
            prediction_id: (0..self.price.len())
                .map(|i| PredictionId::Int(i as i64))
                .collect(),
            airline: self.airline.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
            total_stops: self.total_stops.clone(),
            date: self.date.clone(),
            month: self.month.clone(),
            year: self.year.clone(),
            dep_hours: self.dep_hours.clone(),
            dep_min: self.dep_min.clone(),
            arrival_hours: self.arrival_hours.clone(),
            arrival_min: self.arrival_min.clone(),
            duration_hours: self.duration_hours.clone(),
            duration_min: self.duration_min.clone(),
        };
        Ok(TabularFrame::from_request(&request)?)
    }

    fn total_duration_minutes(&self) -> Vec<f64> {
        self.duration_hours
            .iter()
            .zip(&self.duration_min)
            .map(|(h, m)| (h * 60 + m) as f64)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionMetrics {
    pub rows: usize,
    pub rmse: f64,
    pub mean_error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDrift {
    pub column: String,
    pub score: f64,
    pub drifted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftSummary {
    pub columns: Vec<ColumnDrift>,
    pub drifted_share: f64,
    pub dataset_drifted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringReport {
    pub model_uri: String,
    pub current: RegressionMetrics,
    pub reference: Option<RegressionMetrics>,
    pub drift: Option<DriftSummary>,
}

/// Predicts over the dataset(s) and assembles the report. Drift is only
/// computed when a reference dataset is given; otherwise the report is a
/// performance report for the current data alone.
pub fn build_report(
    model: &Model,
    current: &Dataset,
    reference: Option<&Dataset>,
) -> Result<MonitoringReport> {
    let current_metrics = regression_metrics(model, current)?;
    let reference_metrics = reference
        .map(|dataset| regression_metrics(model, dataset))
        .transpose()?;
    let drift = reference.map(|dataset| drift_summary(dataset, current));

    Ok(MonitoringReport {
        model_uri: model.uri().to_string(),
        current: current_metrics,
        reference: reference_metrics,
        drift,
    })
}

pub fn write_report(report: &MonitoringReport, out_path: &Path) -> Result<()> {
    let file = std::fs::File::create(out_path)
        .with_context(|| format!("failed to create report at {}", out_path.display()))?;
    serde_json::to_writer_pretty(file, report).context("failed to serialize report")?;
    Ok(())
}

fn regression_metrics(model: &Model, dataset: &Dataset) -> Result<RegressionMetrics> {
    let frame = dataset.to_frame()?;
    let predicted = model.predict(&frame)?;

    let rows = predicted.len();
    if rows == 0 {
        return Ok(RegressionMetrics {
            rows,
            rmse: 0.0,
            mean_error: 0.0,
        });
    }

    let errors: Vec<f64> = predicted
        .iter()
        .zip(&dataset.price)
        .map(|(pred, actual)| pred - actual)
        .collect();
    let mean_error = errors.iter().sum::<f64>() / rows as f64;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / rows as f64).sqrt();

    Ok(RegressionMetrics {
        rows,
        rmse,
        mean_error,
    })
}

fn drift_summary(reference: &Dataset, current: &Dataset) -> DriftSummary {
    let columns = vec![
        categorical_drift("airline", &reference.airline, &current.airline),
        categorical_drift("source", &reference.source, &current.source),
        categorical_drift("destination", &reference.destination, &current.destination),
        numeric_drift(
            "total_stops",
            &to_f64(&reference.total_stops),
            &to_f64(&current.total_stops),
        ),
        numeric_drift(
            "total_duration_minutes",
            &reference.total_duration_minutes(),
            &current.total_duration_minutes(),
        ),
        numeric_drift("price", &reference.price, &current.price),
    ];

    let drifted = columns.iter().filter(|c| c.drifted).count();
    let drifted_share = drifted as f64 / columns.len() as f64;
    DriftSummary {
        columns,
        drifted_share,
        dataset_drifted: drifted_share >= DATASET_DRIFT_SHARE,
    }
}

fn to_f64(values: &[i64]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

/// Standardized mean difference between the two samples.
fn numeric_drift(column: &str, reference: &[f64], current: &[f64]) -> ColumnDrift {
    let score = match (moments(reference), moments(current)) {
        (Some((ref_mean, ref_var)), Some((cur_mean, cur_var))) => {
            let pooled_std = ((ref_var + cur_var) / 2.0).sqrt();
            if pooled_std == 0.0 {
                if ref_mean == cur_mean {
                    0.0
                } else {
                    1.0
                }
            } else {
                (cur_mean - ref_mean).abs() / pooled_std
            }
        }
        _ => 0.0,
    };
    ColumnDrift {
        column: column.to_string(),
        score,
        drifted: score > COLUMN_DRIFT_THRESHOLD,
    }
}

fn moments(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some((mean, var))
}

/// Total variation distance between the category frequency tables.
fn categorical_drift(column: &str, reference: &[String], current: &[String]) -> ColumnDrift {
    let score = match (frequencies(reference), frequencies(current)) {
        (Some(ref_freq), Some(cur_freq)) => {
            let mut categories: Vec<&String> = ref_freq.keys().chain(cur_freq.keys()).collect();
            categories.sort();
            categories.dedup();
            0.5 * categories
                .iter()
                .map(|cat| {
                    let p = ref_freq.get(*cat).copied().unwrap_or(0.0);
                    let q = cur_freq.get(*cat).copied().unwrap_or(0.0);
                    (p - q).abs()
                })
                .sum::<f64>()
        }
        _ => 0.0,
    };
    ColumnDrift {
        column: column.to_string(),
        score,
        drifted: score > COLUMN_DRIFT_THRESHOLD,
    }
}

fn frequencies(values: &[String]) -> Option<std::collections::HashMap<String, f64>> {
    if values.is_empty() {
        return None;
    }
    let mut counts: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    for value in values {
        *counts.entry(value.clone()).or_insert(0.0) += 1.0;
    }
    let n = values.len() as f64;
    for count in counts.values_mut() {
        *count /= n;
    }
    Some(counts)
}
