use std::env;
use std::path::PathBuf;

use chrono::Datelike;

pub const DEFAULT_PREDICT_API_BASE: &str =
    "https://3k8m39q58c.execute-api.us-east-1.amazonaws.com/dev";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorMode {
    Http,
    Demo,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub predict_api_base: String,
    pub predict_api_key: Option<String>,
    pub schedule_base_url: Option<String>,
    pub schedule_dir: Option<PathBuf>,
    pub predictor_mode: PredictorMode,
    pub request_timeout_secs: u64,
    pub default_season: i32,
}

impl Config {
    /// Loads `.env.local` then `.env` (first value wins) and reads the process env.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).and_then(|v| non_empty(&v));

        let predict_api_base = get("PREDICT_API_BASE")
            .unwrap_or_else(|| DEFAULT_PREDICT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let predictor_mode = match get("PREDICTOR_MODE").map(|v| v.to_lowercase()).as_deref() {
            Some("demo") | Some("fake") => PredictorMode::Demo,
            _ => PredictorMode::Http,
        };
        let request_timeout_secs = get("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(1);
        let default_season = get("DEFAULT_SEASON")
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or_else(current_season);

        Self {
            predict_api_base,
            predict_api_key: get("PREDICT_API_KEY"),
            schedule_base_url: get("SCHEDULE_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string()),
            schedule_dir: get("SCHEDULE_DIR").map(PathBuf::from),
            predictor_mode,
            request_timeout_secs,
            default_season,
        }
    }
}

// College seasons start in late summer; before August the previous season is
// still the one people ask about.
fn current_season() -> i32 {
    let today = chrono::Local::now().date_naive();
    if today.month() >= 8 {
        today.year()
    } else {
        today.year() - 1
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
