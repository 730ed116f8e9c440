//! Prediction backend client and the typed result domain.
//!
//! The backend is a local HTTP service exposing `POST /predict`. When it
//! cannot be reached (or returns something we cannot make sense of), a
//! locally fabricated fallback prediction keeps the UI flowing; the outcome
//! is tagged so the display can tell the two apart.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The prediction backend lives on a fixed local port.
pub const PREDICT_URL: &str = "http://127.0.0.1:8000/predict";

/// Probability triple used for fallback predictions.
pub const FALLBACK_PROBABILITIES: [f64; 3] = [0.8, 0.15, 0.05];

/// Which classifier the backend should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    Logistic,
    DecisionTree,
}

impl ModelKind {
    /// Identifier used in the request body.
    pub fn wire_name(self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::DecisionTree => "decision_tree",
        }
    }

    /// Human-readable name for display.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Logistic => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "logistic" => Some(ModelKind::Logistic),
            "decision_tree" => Some(ModelKind::DecisionTree),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ModelKind::Logistic => ModelKind::DecisionTree,
            ModelKind::DecisionTree => ModelKind::Logistic,
        }
    }
}

/// The three iris species, in class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Species {
    Setosa,
    Versicolor,
    Virginica,
}

impl Species {
    /// Map a backend class index to a species. Anything outside 0..=2 is
    /// treated as a malformed response by the caller.
    pub fn from_class(index: i64) -> Option<Self> {
        match index {
            0 => Some(Species::Setosa),
            1 => Some(Species::Versicolor),
            2 => Some(Species::Virginica),
            _ => None,
        }
    }

    pub fn class_index(self) -> u8 {
        match self {
            Species::Setosa => 0,
            Species::Versicolor => 1,
            Species::Virginica => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Species::Setosa => "Setosa",
            Species::Versicolor => "Versicolor",
            Species::Virginica => "Virginica",
        }
    }
}

/// Request body for `POST /predict`.
#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub features: [f64; 4],
    pub model_type: &'static str,
}

/// Response body as the backend sends it. Extra fields (species name,
/// confidence, model echo) are ignored.
#[derive(Debug, Deserialize)]
struct RawResponse {
    prediction: i64,
    probabilities: Vec<f64>,
}

/// A prediction that passed validation: known class, non-empty probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub species: Species,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Confidence is the largest probability in the vector.
    pub fn confidence(&self) -> f64 {
        self.probabilities.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Confidence formatted to one decimal place, e.g. "97.0%".
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence() * 100.0)
    }
}

/// How the displayed result came to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A real answer from the backend.
    Predicted(Prediction),
    /// Locally fabricated stand-in; `reason` says what went wrong.
    Fallback { prediction: Prediction, reason: String },
}

impl Outcome {
    pub fn prediction(&self) -> &Prediction {
        match self {
            Outcome::Predicted(p) => p,
            Outcome::Fallback { prediction, .. } => prediction,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("response body was not valid JSON: {0}")]
    BadBody(String),
    #[error("class index {0} outside the known species range")]
    ClassOutOfRange(i64),
    #[error("probability vector was empty")]
    EmptyProbabilities,
}

/// Coerce the four textual measurement fields to numbers. Text that does not
/// parse becomes NaN and is forwarded as-is; the backend rejecting it just
/// takes the fallback path.
pub fn coerce_features(buffers: &[String; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (slot, text) in out.iter_mut().zip(buffers.iter()) {
        *slot = text.trim().parse().unwrap_or(f64::NAN);
    }
    out
}

/// One blocking round trip to the backend. Run under `spawn_blocking` from
/// the UI; no retry, no explicit timeout.
pub fn request_prediction(features: [f64; 4], model: ModelKind) -> Result<Prediction, PredictError> {
    request_prediction_at(PREDICT_URL, features, model)
}

fn request_prediction_at(
    url: &str,
    features: [f64; 4],
    model: ModelKind,
) -> Result<Prediction, PredictError> {
    let body = PredictRequest {
        features,
        model_type: model.wire_name(),
    };
    let response = ureq::post(url)
        .send_json(&body)
        .map_err(|e| PredictError::Transport(e.to_string()))?;
    let raw: RawResponse = response
        .into_json()
        .map_err(|e| PredictError::BadBody(e.to_string()))?;
    validate(raw)
}

fn validate(raw: RawResponse) -> Result<Prediction, PredictError> {
    let species =
        Species::from_class(raw.prediction).ok_or(PredictError::ClassOutOfRange(raw.prediction))?;
    if raw.probabilities.is_empty() {
        return Err(PredictError::EmptyProbabilities);
    }
    Ok(Prediction {
        species,
        probabilities: raw.probabilities,
    })
}

/// Fabricate a stand-in prediction: random species, fixed probabilities.
pub fn fallback_prediction() -> Prediction {
    let species = match rand::rng().random_range(0..3u8) {
        0 => Species::Setosa,
        1 => Species::Versicolor,
        _ => Species::Virginica,
    };
    Prediction {
        species,
        probabilities: FALLBACK_PROBABILITIES.to_vec(),
    }
}

/// Full predict pipeline: ask the backend, fall back locally on any failure.
pub fn predict_or_fallback(features: [f64; 4], model: ModelKind) -> Outcome {
    match request_prediction(features, model) {
        Ok(prediction) => Outcome::Predicted(prediction),
        Err(e) => {
            tracing::warn!("prediction request failed, using fallback: {}", e);
            Outcome::Fallback {
                prediction: fallback_prediction(),
                reason: e.to_string(),
            }
        }
    }
}
