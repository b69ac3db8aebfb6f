//! Wire types for the prediction API.

use serde::{Deserialize, Serialize};

/// Caller-supplied row identifier. Opaque; only echoed back so the caller
/// can correlate predictions to request rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionId {
    Str(String),
    Int(i64),
}

/// Batch prediction request: parallel arrays, one entry per row.
/// All arrays must have the same length; that is checked when the
/// tabular frame is assembled, not here.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    pub prediction_id: Vec<PredictionId>,
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
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePrediction {
    pub ride_duration: f64,
    pub ride_id: PredictionId,
}

/// One prediction paired with the model identity it came from.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub model: &'static str,
    pub version: String,
    pub prediction: PricePrediction,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionResult>,
}
