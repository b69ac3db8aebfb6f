//! Model gateway: loads the trained pipeline artifact at startup and applies
//! it to tabular frames.
//!
//! The artifact is the serialized form of a vectorizer + linear-regression
//! pipeline: an intercept plus a map from feature names to weights.
//! Categorical features are one-hot entries named `"<feature>=<value>"`;
//! numeric features are named directly and multiplied by their value.
//! Categories the artifact has never seen contribute nothing.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::frame::{FlightRecord, TabularFrame};

/// Fixed model name reported in every prediction.
pub const MODEL_NAME: &str = "flight-price-prediction";

/// Regression family the artifact was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    LinearRegression,
    Lasso,
    Ridge,
}

/// Hyperparameters recorded in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default)]
    pub alpha: Option<f64>,
    pub fit_intercept: bool,
    #[serde(default)]
    pub max_iter: Option<u64>,
}

impl ModelKind {
    /// Default hyperparameter set per family, used when the artifact does
    /// not record its own.
    pub fn default_params(self) -> ModelParams {
        match self {
            ModelKind::LinearRegression => ModelParams {
                alpha: None,
                fit_intercept: true,
                max_iter: None,
            },
            ModelKind::Lasso => ModelParams {
                alpha: Some(0.1),
                fit_intercept: true,
                max_iter: Some(10_000),
            },
            ModelKind::Ridge => ModelParams {
                alpha: Some(0.1),
                fit_intercept: true,
                max_iter: None,
            },
        }
    }
}

/// On-disk form of the trained pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ModelKind,
    #[serde(default)]
    pub params: Option<ModelParams>,
    pub intercept: f64,
    pub coefficients: HashMap<String, f64>,
}

/// Loaded model pipeline. Immutable after `load`; safe to share across
/// in-flight requests behind an `Arc`.
#[derive(Debug)]
pub struct Model {
    artifact: Artifact,
    uri: String,
}

impl Model {
    /// Loads the artifact from `uri` (a filesystem path or `file://` URI).
    /// Runs one probe row through the full pipeline so a broken artifact
    /// fails here, at startup, instead of on the first request.
    pub fn load(uri: &str) -> Result<Self> {
        let path = resolve_uri(uri)?;
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read model artifact at {}", path.display()))?;
        let artifact: Artifact =
            serde_json::from_str(&raw).context("failed to parse model artifact")?;
        let model = Self::from_artifact(artifact, uri)?;

        model
            .predict_row(&probe_record())
            .context("model warmup predict failed")?;
        tracing::info!(
            uri,
            coefficients = model.artifact.coefficients.len(),
            "loaded model"
        );
        Ok(model)
    }

    /// Wraps an already-deserialized artifact. `uri` is echoed back as the
    /// model version in responses.
    pub fn from_artifact(artifact: Artifact, uri: &str) -> Result<Self> {
        if artifact.coefficients.is_empty() {
            bail!("model artifact has no coefficients");
        }
        Ok(Self {
            artifact,
            uri: uri.to_string(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> ModelKind {
        self.artifact.kind
    }

    /// Predicts one price per frame row. Output order and length match the
    /// frame's rows exactly; an empty frame yields an empty vector.
    pub fn predict(&self, frame: &TabularFrame) -> Result<Vec<f64>> {
        frame.rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn predict_row(&self, row: &FlightRecord) -> Result<f64> {
        let features = engineer_features(row)?;
        let coefs = &self.artifact.coefficients;

        let mut price = self.artifact.intercept;
        for name in &features.one_hot {
            price += coefs.get(name).copied().unwrap_or(0.0);
        }
        for (name, value) in &features.numeric {
            price += coefs.get(*name).copied().unwrap_or(0.0) * value;
        }
        Ok(price)
    }
}

fn resolve_uri(uri: &str) -> Result<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = uri.split_once("://") {
        bail!("unsupported model URI scheme {scheme:?}: expected a file path or file:// URI");
    }
    Ok(PathBuf::from(uri))
}

/// The pipeline's internal feature view of one row.
struct EngineeredRow {
    one_hot: Vec<String>,
    numeric: [(&'static str, f64); 2],
}

fn engineer_features(row: &FlightRecord) -> Result<EngineeredRow> {
    let date = NaiveDate::from_ymd_opt(row.year, row.month, row.date).with_context(|| {
        format!(
            "invalid flight date: year={} month={} date={}",
            row.year, row.month, row.date
        )
    })?;
    // chrono's Weekday displays as the same Mon..Sun abbreviations the
    // training side used.
    let weekday = format!("weekday={}", date.format("%a"));

    let trip_id = format!(
        "tripid={}_{}",
        strip_blanks(&row.source),
        strip_blanks(&row.destination)
    );
    let airline = format!("airline={}", row.airline);
    let dep_rounded = format!(
        "departure_hour_rounded={}",
        round_to_full_hour(row.dep_hours, row.dep_min)
    );
    let arr_rounded = format!(
        "arrival_hour_rounded={}",
        round_to_full_hour(row.arrival_hours, row.arrival_min)
    );

    let total_duration_minutes = (row.duration_hours * 60 + row.duration_min) as f64;

    Ok(EngineeredRow {
        one_hot: vec![airline, weekday, trip_id, dep_rounded, arr_rounded],
        numeric: [
            ("total_stops", row.total_stops as f64),
            ("total_duration_minutes", total_duration_minutes),
        ],
    })
}

fn strip_blanks(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Nearest full hour: 30 minutes or more rounds up, 23:44 wraps to 0.
fn round_to_full_hour(hours: u32, minutes: u32) -> u32 {
    (hours + u32::from(minutes >= 30)) % 24
}

fn probe_record() -> FlightRecord {
    FlightRecord {
        airline: "IndiGo".into(),
        source: "Banglore".into(),
        destination: "New Delhi".into(),
        total_stops: 1,
        date: 1,
        month: 1,
        year: 2024,
        dep_hours: 10,
        dep_min: 0,
        arrival_hours: 12,
        arrival_min: 30,
        duration_hours: 2,
        duration_min: 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toy_artifact() -> Artifact {
        let coefficients = HashMap::from([
            ("airline=IndiGo".to_string(), 100.0),
            ("weekday=Wed".to_string(), 10.0),
            ("tripid=Banglore_NewDelhi".to_string(), 50.0),
            ("departure_hour_rounded=23".to_string(), 5.0),
            ("arrival_hour_rounded=15".to_string(), 3.0),
            ("total_stops".to_string(), 200.0),
            ("total_duration_minutes".to_string(), 2.0),
        ]);
        Artifact {
            kind: ModelKind::Ridge,
            params: Some(ModelKind::Ridge.default_params()),
            intercept: 1000.0,
            coefficients,
        }
    }

    fn record() -> FlightRecord {
        FlightRecord {
            airline: "IndiGo".into(),
            source: "Banglore".into(),
            destination: "New Delhi".into(),
            total_stops: 1,
            // 2024-07-24 is a Wednesday
            date: 24,
            month: 7,
            year: 2024,
            dep_hours: 22,
            dep_min: 44,
            arrival_hours: 14,
            arrival_min: 40,
            duration_hours: 2,
            duration_min: 45,
        }
    }

    #[test]
    fn rounds_times_to_nearest_full_hour() {
        assert_eq!(round_to_full_hour(5, 44), 6);
        assert_eq!(round_to_full_hour(23, 13), 23);
        assert_eq!(round_to_full_hour(23, 44), 0);
        assert_eq!(round_to_full_hour(10, 30), 11);
        assert_eq!(round_to_full_hour(0, 0), 0);
    }

    #[test]
    fn engineers_expected_features() {
        let features = engineer_features(&record()).unwrap();
        assert_eq!(
            features.one_hot,
            vec![
                "airline=IndiGo",
                "weekday=Wed",
                "tripid=Banglore_NewDelhi",
                "departure_hour_rounded=23",
                "arrival_hour_rounded=15",
            ]
        );
        assert_eq!(features.numeric[0], ("total_stops", 1.0));
        assert_eq!(features.numeric[1], ("total_duration_minutes", 165.0));
    }

    #[test]
    fn trip_id_strips_blanks_from_both_ends_of_the_route() {
        let mut row = record();
        row.source = "New York".into();
        row.destination = "Los Angeles".into();
        let features = engineer_features(&row).unwrap();
        assert!(features
            .one_hot
            .contains(&"tripid=NewYork_LosAngeles".to_string()));
    }

    #[test]
    fn invalid_calendar_date_is_a_pipeline_error() {
        let mut row = record();
        row.month = 13;
        assert!(engineer_features(&row).is_err());
    }

    #[test]
    fn predicts_linear_combination_of_matched_weights() {
        let model = Model::from_artifact(toy_artifact(), "memory://toy").unwrap();
        let frame = TabularFrame {
            rows: vec![record()],
        };
        let preds = model.predict(&frame).unwrap();
        // 1000 + 100 + 10 + 50 + 5 + 3 + 1*200 + 165*2
        assert_eq!(preds, vec![1698.0]);
    }

    #[test]
    fn unseen_categories_contribute_nothing() {
        let model = Model::from_artifact(toy_artifact(), "memory://toy").unwrap();
        let mut row = record();
        row.airline = "SpiceJet".into();
        let frame = TabularFrame { rows: vec![row] };
        let preds = model.predict(&frame).unwrap();
        assert_eq!(preds, vec![1598.0]);
    }

    #[test]
    fn prediction_count_matches_row_count() {
        let model = Model::from_artifact(toy_artifact(), "memory://toy").unwrap();
        let frame = TabularFrame {
            rows: vec![record(); 5],
        };
        assert_eq!(model.predict(&frame).unwrap().len(), 5);
        assert!(model.predict(&TabularFrame::default()).unwrap().is_empty());
    }

    #[test]
    fn loads_artifact_from_path_and_file_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&toy_artifact()).unwrap().as_bytes())
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let model = Model::load(&path).unwrap();
        assert_eq!(model.uri(), path);
        assert_eq!(model.kind(), ModelKind::Ridge);

        let uri = format!("file://{path}");
        let model = Model::load(&uri).unwrap();
        assert_eq!(model.uri(), uri);
    }

    #[test]
    fn unsupported_scheme_is_a_load_error() {
        let err = Model::load("s3://bucket/model.json").unwrap_err();
        assert!(err.to_string().contains("unsupported model URI scheme"));
    }

    #[test]
    fn missing_artifact_is_a_load_error() {
        assert!(Model::load("/nonexistent/model.json").is_err());
    }

    #[test]
    fn empty_coefficient_table_is_rejected() {
        let artifact = Artifact {
            kind: ModelKind::LinearRegression,
            params: None,
            intercept: 0.0,
            coefficients: HashMap::new(),
        };
        assert!(Model::from_artifact(artifact, "memory://empty").is_err());
    }

    #[test]
    fn kind_registry_returns_training_defaults() {
        let lasso = ModelKind::Lasso.default_params();
        assert_eq!(lasso.alpha, Some(0.1));
        assert_eq!(lasso.max_iter, Some(10_000));
        let linear = ModelKind::LinearRegression.default_params();
        assert_eq!(linear.alpha, None);
        assert!(linear.fit_intercept);
    }
}
