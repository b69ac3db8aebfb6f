//! Turns a validated request into the row-aligned table the model consumes.

use thiserror::Error;

use crate::api_models::PredictionRequest;

/// Raised when the request's parallel arrays disagree on length.
#[derive(Debug, Error, PartialEq)]
#[error("Incorrect input data. All data arrays must be of same length.")]
pub struct ShapeError;

/// One model-ready row. The caller-supplied identifier is not a feature
/// and never appears here.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRecord {
    pub airline: String,
    pub source: String,
    pub destination: String,
    pub total_stops: i64,
    pub date: u32,
    pub month: u32,
    pub year: i32,
    pub dep_hours: u32,
    pub dep_min: u32,
    pub arrival_hours: u32,
    pub arrival_min: u32,
    pub duration_hours: i64,
    pub duration_min: i64,
}

/// In-memory table: one `FlightRecord` per request row, in request order.
///
/// Row order is the correlation key back to `prediction_id`; predictions are
/// paired positionally, so nothing downstream may reorder rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularFrame {
    pub rows: Vec<FlightRecord>,
}

impl TabularFrame {
    /// Builds the frame, checking that all arrays (identifier included)
    /// have the same length. Zero rows is a valid frame.
    pub fn from_request(req: &PredictionRequest) -> Result<Self, ShapeError> {
        let n = req.prediction_id.len();
        let lengths = [
            req.airline.len(),
            req.source.len(),
            req.destination.len(),
            req.total_stops.len(),
            req.date.len(),
            req.month.len(),
            req.year.len(),
            req.dep_hours.len(),
            req.dep_min.len(),
            req.arrival_hours.len(),
            req.arrival_min.len(),
            req.duration_hours.len(),
            req.duration_min.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(ShapeError);
        }

        let rows = (0..n)
            .map(|i| FlightRecord {
                airline: req.airline[i].clone(),
                source: req.source[i].clone(),
                destination: req.destination[i].clone(),
                total_stops: req.total_stops[i],
                date: req.date[i],
                month: req.month[i],
                year: req.year[i],
                dep_hours: req.dep_hours[i],
                dep_min: req.dep_min[i],
                arrival_hours: req.arrival_hours[i],
                arrival_min: req.arrival_min[i],
                duration_hours: req.duration_hours[i],
                duration_min: req.duration_min[i],
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
