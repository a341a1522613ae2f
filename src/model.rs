use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRequest {
    pub season: i32,
    pub home_team: String,
    pub away_team: String,
}

impl GameRequest {
    pub fn new(
        season: i32,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Result<Self, ReconcileError> {
        let home_team = home_team.into();
        let away_team = away_team.into();
        if home_team.trim().is_empty() {
            return Err(ReconcileError::InvalidRequest("home team is empty".to_string()));
        }
        if away_team.trim().is_empty() {
            return Err(ReconcileError::InvalidRequest("away team is empty".to_string()));
        }
        Ok(Self {
            season,
            home_team,
            away_team,
        })
    }

    pub fn matchup(&self) -> Matchup {
        Matchup {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub home_team: String,
    pub away_team: String,
}

/// One side's yardage. Any component may be missing; `total` is derived when
/// the source leaves it out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YardSplit {
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rushing: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub passing: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl YardSplit {
    pub fn new(rushing: Option<f64>, passing: Option<f64>) -> Self {
        Self {
            rushing,
            passing,
            total: None,
        }
    }

    pub fn resolved_total(&self) -> Option<f64> {
        if let Some(total) = self.total.filter(|v| v.is_finite()) {
            return Some(total);
        }
        match (finite(self.rushing), finite(self.passing)) {
            (Some(r), Some(p)) => Some(r + p),
            _ => None,
        }
    }

    /// Same split with `total` filled in from the components when possible.
    pub fn with_total(self) -> Self {
        Self {
            total: self.resolved_total(),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub home_points: f64,
    pub away_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub home_yards: YardSplit,
    #[serde(default)]
    pub away_yards: YardSplit,
}

/// Real outcome of a finished game, already in the request's orientation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_points: Option<f64>,
    #[serde(default)]
    pub home_yards: YardSplit,
    #[serde(default)]
    pub away_yards: YardSplit,
}

impl ActualLine {
    pub fn has_score(&self) -> bool {
        finite(self.home_points).is_some() && finite(self.away_points).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActual {
    #[serde(default, deserialize_with = "lenient_number")]
    pub home_pts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub away_pts: Option<f64>,
    #[serde(default)]
    pub home_yds: YardSplit,
    #[serde(default)]
    pub away_yds: YardSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub neutral_site: bool,
    #[serde(default, rename = "final", deserialize_with = "lenient_bool")]
    pub is_final: bool,
    #[serde(default)]
    pub actual: Option<RecordActual>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSchedule {
    #[serde(default)]
    pub games: Vec<ScheduleRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStatus {
    Unscheduled,
    ScheduledPending,
    ScheduledFinal,
    Unknown,
}

impl ScheduleStatus {
    pub fn label(self) -> &'static str {
        match self {
            ScheduleStatus::Unscheduled => "unscheduled",
            ScheduleStatus::ScheduledPending => "scheduled-pending",
            ScheduleStatus::ScheduledFinal => "scheduled-final",
            ScheduleStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    pub neutral_site: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YardDeltas {
    pub rushing: Option<f64>,
    pub passing: Option<f64>,
    pub total: Option<f64>,
}

/// `actual - predicted` per field; `None` where either side was missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deltas {
    pub home_points: Option<f64>,
    pub away_points: Option<f64>,
    pub margin: Option<f64>,
    pub home_yards: YardDeltas,
    pub away_yards: YardDeltas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub matchup: Matchup,
    pub predicted: Prediction,
    pub schedule_status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<GameInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<ActualLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deltas: Option<Deltas>,
}

pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Numbers or numeric strings become `Some`; anything else is treated as missing.
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

// `null` and unrecognised values read as false so one odd record cannot sink
// the whole season.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}
