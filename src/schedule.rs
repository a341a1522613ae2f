use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ScheduleError;
use crate::http_cache::{HttpCache, HttpStatusError};
use crate::http_client::http_client_with_timeout;
use crate::model::{GameRequest, ScheduleRecord, SeasonSchedule};

/// Read-only per-season schedule lookup.
pub trait ScheduleSource: Send + Sync {
    fn load_season(&self, season: i32) -> Result<SeasonSchedule, ScheduleError>;
}

impl<T: ScheduleSource + ?Sized> ScheduleSource for Box<T> {
    fn load_season(&self, season: i32) -> Result<SeasonSchedule, ScheduleError> {
        (**self).load_season(season)
    }
}

/// Static `{base}/{season}.json` resources, fetched through the on-disk HTTP cache.
pub struct HttpScheduleSource {
    base_url: String,
    timeout_secs: u64,
    cache: Option<Arc<HttpCache>>,
}

impl HttpScheduleSource {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
            cache: None,
        }
    }

    /// Uses `cache` instead of the process-wide one.
    pub fn with_cache(mut self, cache: Arc<HttpCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn season_url(&self, season: i32) -> String {
        format!("{}/{season}.json", self.base_url)
    }
}

impl ScheduleSource for HttpScheduleSource {
    fn load_season(&self, season: i32) -> Result<SeasonSchedule, ScheduleError> {
        let client = http_client_with_timeout(self.timeout_secs)
            .map_err(|err| ScheduleError::Unreachable(err.to_string()))?;
        let url = self.season_url(season);
        let cache = self.cache.as_deref().unwrap_or(HttpCache::global());
        match cache.fetch_text(client, &url, &[]) {
            Ok(body) => parse_schedule_json(&body),
            Err(err) => match err.downcast_ref::<HttpStatusError>() {
                Some(status) if status.status == 404 => Err(ScheduleError::NotFound(season)),
                _ => Err(ScheduleError::Unreachable(format!("{err:#}"))),
            },
        }
    }
}

/// `{dir}/{season}.json` on the local filesystem.
pub struct FileScheduleSource {
    dir: PathBuf,
}

impl FileScheduleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScheduleSource for FileScheduleSource {
    fn load_season(&self, season: i32) -> Result<SeasonSchedule, ScheduleError> {
        let path = self.dir.join(format!("{season}.json"));
        let raw = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ScheduleError::NotFound(season),
            _ => ScheduleError::Unreachable(format!("{}: {err}", path.display())),
        })?;
        parse_schedule_json(&raw)
    }
}

/// Used when no schedule location is configured at all.
pub struct NoSchedule;

impl ScheduleSource for NoSchedule {
    fn load_season(&self, _season: i32) -> Result<SeasonSchedule, ScheduleError> {
        Err(ScheduleError::Unreachable("no schedule source configured".to_string()))
    }
}

pub fn parse_schedule_json(raw: &str) -> Result<SeasonSchedule, ScheduleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ScheduleError::Malformed("empty document".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|err| ScheduleError::Malformed(err.to_string()))
}

#[derive(Debug, Clone, Copy)]
pub struct MatchedGame<'a> {
    pub record: &'a ScheduleRecord,
    /// Record's home team is the request's home team.
    pub same_orientation: bool,
}

/// First record whose team pair equals the request's, in either order.
pub fn find_game<'a>(
    schedule: &'a SeasonSchedule,
    request: &GameRequest,
) -> Option<MatchedGame<'a>> {
    let home = team_key(&request.home_team);
    let away = team_key(&request.away_team);

    schedule.games.iter().find_map(|record| {
        let rec_home = team_key(&record.home_team);
        let rec_away = team_key(&record.away_team);
        if rec_home == home && rec_away == away {
            Some(MatchedGame {
                record,
                same_orientation: true,
            })
        } else if rec_home == away && rec_away == home {
            Some(MatchedGame {
                record,
                same_orientation: false,
            })
        } else {
            None
        }
    })
}

fn team_key(name: &str) -> String {
    name.trim().to_lowercase()
}
