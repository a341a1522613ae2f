use anyhow::Context;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};

use crate::error::ReconcileError;
use crate::http_client::http_client_with_timeout;
use crate::model::{GameRequest, Prediction, YardSplit, number_from_value};

const CLIENT_HEADER: &str = "X-Client";
const CLIENT_NAME: &str = "collegesportspredictions-rs";

/// Source of model predictions. Implementations must not mutate anything the
/// reconciler reads.
pub trait Predictor: Send + Sync {
    fn predict(&self, request: &GameRequest) -> Result<Prediction, ReconcileError>;
}

impl<T: Predictor + ?Sized> Predictor for Box<T> {
    fn predict(&self, request: &GameRequest) -> Result<Prediction, ReconcileError> {
        (**self).predict(request)
    }
}

pub struct HttpPredictor {
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpPredictor {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        }
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    /// `Ok(true)` when the engine answers its health endpoint with a 2xx,
    /// `Ok(false)` for any other status.
    pub fn health_check(&self) -> anyhow::Result<bool> {
        let client = http_client_with_timeout(self.timeout_secs)?;
        let url = format!("{}/health", self.base_url);
        let resp = client
            .get(&url)
            .header(CLIENT_HEADER, CLIENT_NAME)
            .send()
            .with_context(|| format!("health check request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "engine health check returned non-success");
        }
        Ok(status.is_success())
    }
}

impl Predictor for HttpPredictor {
    fn predict(&self, request: &GameRequest) -> Result<Prediction, ReconcileError> {
        let client = http_client_with_timeout(self.timeout_secs)
            .map_err(|err| ReconcileError::unavailable(err.to_string()))?;

        let body = json!({
            "season": request.season,
            "homeTeam": request.home_team,
            "awayTeam": request.away_team,
        });
        let mut req = client
            .post(self.predict_url())
            .header(CONTENT_TYPE, "application/json")
            .header(CLIENT_HEADER, CLIENT_NAME)
            .json(&body);
        if let Some(key) = self.api_key.as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = req
            .send()
            .map_err(|err| ReconcileError::unavailable(format!("request failed: {err}")))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|err| ReconcileError::unavailable(format!("failed reading body: {err}")))?;
        tracing::debug!(status, season = request.season, "predictor responded");
        prediction_from_response(status, &text)
    }
}

pub fn prediction_from_response(status: u16, body: &str) -> Result<Prediction, ReconcileError> {
    if !(200..300).contains(&status) {
        return Err(ReconcileError::unavailable(format!(
            "HTTP {status}: {}",
            body.trim()
        )));
    }
    parse_prediction_json(body)
}

pub fn parse_prediction_json(raw: &str) -> Result<Prediction, ReconcileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ReconcileError::unavailable("empty predictor response"));
    }
    let root: Value = serde_json::from_str(trimmed)
        .map_err(|err| ReconcileError::unavailable(format!("invalid predictor json: {err}")))?;

    let predicted = root.get("predicted").unwrap_or(&Value::Null);
    let home_points = pick_number(predicted, &["homePoints"])
        .ok_or_else(|| ReconcileError::unavailable("missing predicted.homePoints"))?;
    let away_points = pick_number(predicted, &["awayPoints"])
        .ok_or_else(|| ReconcileError::unavailable("missing predicted.awayPoints"))?;
    let confidence = pick_number(predicted, &["confidence"]);

    let yards = root.get("yards").unwrap_or(&Value::Null);
    Ok(Prediction {
        home_points,
        away_points,
        confidence,
        home_yards: parse_yards(yards.get("home")),
        away_yards: parse_yards(yards.get("away")),
    })
}

fn parse_yards(value: Option<&Value>) -> YardSplit {
    let Some(value) = value else {
        return YardSplit::default();
    };
    YardSplit {
        rushing: pick_number(value, &["rushing", "rush"]),
        passing: pick_number(value, &["passing", "pass"]),
        total: pick_number(value, &["total"]),
    }
    .with_total()
}

fn pick_number(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(num) = value.get(*key).and_then(number_from_value) {
            return Some(num);
        }
    }
    None
}
