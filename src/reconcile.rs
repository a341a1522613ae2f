use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Config, PredictorMode};
use crate::error::{ReconcileError, ScheduleError};
use crate::fake_predictor::FakePredictor;
use crate::model::{
    ActualLine, Deltas, GameInfo, GameRequest, Prediction, ReconciliationResult, ScheduleRecord,
    ScheduleStatus, SeasonSchedule, YardDeltas, YardSplit, finite,
};
use crate::predictor::{HttpPredictor, Predictor};
use crate::schedule::{
    FileScheduleSource, HttpScheduleSource, NoSchedule, ScheduleSource, find_game,
};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct PredictionReconciler<P, S> {
    predictor: P,
    schedule: S,
}

pub type DynReconciler = PredictionReconciler<Box<dyn Predictor>, Box<dyn ScheduleSource>>;

/// Wires the collaborators named by the config. A schedule dir wins over a URL.
pub fn reconciler_from_config(cfg: &Config) -> DynReconciler {
    let predictor: Box<dyn Predictor> = match cfg.predictor_mode {
        PredictorMode::Demo => Box::new(FakePredictor),
        PredictorMode::Http => Box::new(HttpPredictor::new(
            cfg.predict_api_base.clone(),
            cfg.predict_api_key.clone(),
            cfg.request_timeout_secs,
        )),
    };
    let schedule: Box<dyn ScheduleSource> = match (&cfg.schedule_dir, &cfg.schedule_base_url) {
        (Some(dir), _) => Box::new(FileScheduleSource::new(dir.clone())),
        (None, Some(url)) => Box::new(HttpScheduleSource::new(url.clone(), cfg.request_timeout_secs)),
        (None, None) => Box::new(NoSchedule),
    };
    PredictionReconciler::new(predictor, schedule)
}

impl<P: Predictor, S: ScheduleSource> PredictionReconciler<P, S> {
    pub fn new(predictor: P, schedule: S) -> Self {
        Self {
            predictor,
            schedule,
        }
    }

    pub fn reconcile(&self, request: &GameRequest) -> Result<ReconciliationResult, ReconcileError> {
        self.reconcile_with_cancel(request, &CancelToken::new())
    }

    /// Both external reads run concurrently. A token tripped while they are
    /// outstanding turns the outcome into `Cancelled`, whatever they returned.
    pub fn reconcile_with_cancel(
        &self,
        request: &GameRequest,
        cancel: &CancelToken,
    ) -> Result<ReconciliationResult, ReconcileError> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let (prediction, schedule) = rayon::join(
            || self.predictor.predict(request),
            || self.schedule.load_season(request.season),
        );

        if cancel.is_cancelled() {
            tracing::debug!(season = request.season, "reconcile cancelled, dropping result");
            return Err(ReconcileError::Cancelled);
        }

        let prediction = prediction.inspect_err(|err| {
            tracing::warn!(error = %err, home = %request.home_team, away = %request.away_team, "no prediction");
        })?;
        Ok(assemble(request, prediction, schedule))
    }
}

/// Pure merge of a prediction with whatever the schedule lookup produced.
pub fn assemble(
    request: &GameRequest,
    predicted: Prediction,
    schedule: Result<SeasonSchedule, ScheduleError>,
) -> ReconciliationResult {
    let predicted = Prediction {
        home_yards: predicted.home_yards.with_total(),
        away_yards: predicted.away_yards.with_total(),
        ..predicted
    };

    let mut result = ReconciliationResult {
        matchup: request.matchup(),
        predicted,
        schedule_status: ScheduleStatus::Unknown,
        game: None,
        actual: None,
        deltas: None,
    };

    let schedule = match schedule {
        Ok(schedule) => schedule,
        Err(err) => {
            tracing::warn!(season = request.season, error = %err, "schedule unavailable");
            return result;
        }
    };

    let Some(matched) = find_game(&schedule, request) else {
        tracing::debug!(season = request.season, "no scheduled game for matchup");
        result.schedule_status = ScheduleStatus::Unscheduled;
        return result;
    };

    let record = matched.record;
    result.game = Some(GameInfo {
        date: record.date.clone(),
        venue: record.venue.clone(),
        neutral_site: record.neutral_site,
    });

    match normalize_actual(record, matched.same_orientation) {
        Some(actual) => {
            result.deltas = Some(compute_deltas(&result.predicted, &actual));
            result.actual = Some(actual);
            result.schedule_status = ScheduleStatus::ScheduledFinal;
        }
        None => result.schedule_status = ScheduleStatus::ScheduledPending,
    }
    tracing::debug!(
        status = result.schedule_status.label(),
        same_orientation = matched.same_orientation,
        "matched scheduled game"
    );
    result
}

/// Actuals of a final game mapped into the request's home/away slots.
pub fn normalize_actual(record: &ScheduleRecord, same_orientation: bool) -> Option<ActualLine> {
    if !record.is_final {
        return None;
    }
    let actual = record.actual.as_ref()?;

    let (home_points, away_points, home_yds, away_yds) = if same_orientation {
        (actual.home_pts, actual.away_pts, actual.home_yds, actual.away_yds)
    } else {
        (actual.away_pts, actual.home_pts, actual.away_yds, actual.home_yds)
    };

    Some(ActualLine {
        home_points: finite(home_points),
        away_points: finite(away_points),
        home_yards: summed(home_yds),
        away_yards: summed(away_yds),
    })
}

// Actual totals are always rushing + passing; a feed-supplied total is ignored.
fn summed(yards: YardSplit) -> YardSplit {
    YardSplit::new(finite(yards.rushing), finite(yards.passing)).with_total()
}

/// Hand-entered review actuals. They fill the comparison only while the
/// schedule has no final result; returns false when they were ignored.
pub fn apply_entered_actuals(result: &mut ReconciliationResult, entered: &ActualLine) -> bool {
    if result.schedule_status == ScheduleStatus::ScheduledFinal {
        return false;
    }
    let actual = ActualLine {
        home_points: finite(entered.home_points),
        away_points: finite(entered.away_points),
        home_yards: summed(entered.home_yards),
        away_yards: summed(entered.away_yards),
    };
    result.deltas = Some(compute_deltas(&result.predicted, &actual));
    result.actual = Some(actual);
    true
}

pub fn compute_deltas(predicted: &Prediction, actual: &ActualLine) -> Deltas {
    let p_home = Some(predicted.home_points);
    let p_away = Some(predicted.away_points);

    let margin = match (
        finite(actual.home_points),
        finite(actual.away_points),
        finite(p_home),
        finite(p_away),
    ) {
        (Some(ah), Some(aa), Some(ph), Some(pa)) => Some((ah - aa) - (ph - pa)),
        _ => None,
    };

    Deltas {
        home_points: diff(actual.home_points, p_home),
        away_points: diff(actual.away_points, p_away),
        margin,
        home_yards: yard_deltas(&predicted.home_yards, &actual.home_yards),
        away_yards: yard_deltas(&predicted.away_yards, &actual.away_yards),
    }
}

fn yard_deltas(predicted: &YardSplit, actual: &YardSplit) -> YardDeltas {
    YardDeltas {
        rushing: diff(actual.rushing, predicted.rushing),
        passing: diff(actual.passing, predicted.passing),
        total: diff(actual.resolved_total(), predicted.resolved_total()),
    }
}

fn diff(actual: Option<f64>, predicted: Option<f64>) -> Option<f64> {
    Some(finite(actual)? - finite(predicted)?)
}

#[cfg(test)]
mod tests {
    use super::{apply_entered_actuals, diff};
    use crate::model::{ActualLine, Matchup, Prediction, ReconciliationResult, ScheduleStatus, YardSplit};

    fn pending() -> ReconciliationResult {
        ReconciliationResult {
            matchup: Matchup {
                home_team: "LSU".to_string(),
                away_team: "UCLA".to_string(),
            },
            predicted: Prediction {
                home_points: 24.0,
                away_points: 31.0,
                confidence: None,
                home_yards: YardSplit::new(Some(150.0), Some(220.0)).with_total(),
                away_yards: YardSplit::new(Some(120.0), Some(260.0)).with_total(),
            },
            schedule_status: ScheduleStatus::ScheduledPending,
            game: None,
            actual: None,
            deltas: None,
        }
    }

    #[test]
    fn diff_requires_both_finite() {
        assert_eq!(diff(Some(10.0), Some(4.0)), Some(6.0));
        assert_eq!(diff(None, Some(4.0)), None);
        assert_eq!(diff(Some(f64::NAN), Some(4.0)), None);
        assert_eq!(diff(Some(1.0), Some(f64::INFINITY)), None);
    }

    #[test]
    fn entered_totals_need_both_components() {
        let mut result = pending();
        let entered = ActualLine {
            home_points: Some(27.0),
            away_points: Some(20.0),
            home_yards: YardSplit::new(Some(160.0), None),
            away_yards: YardSplit::new(Some(100.0), Some(250.0)),
        };
        assert!(apply_entered_actuals(&mut result, &entered));

        let actual = result.actual.as_ref().unwrap();
        assert_eq!(actual.home_yards.total, None);
        assert_eq!(actual.away_yards.total, Some(350.0));

        let deltas = result.deltas.unwrap();
        assert_eq!(deltas.margin, Some(14.0));
        assert_eq!(deltas.home_yards.rushing, Some(10.0));
        assert_eq!(deltas.home_yards.total, None);
        assert_eq!(deltas.away_yards.total, Some(-30.0));
        assert_eq!(result.schedule_status, ScheduleStatus::ScheduledPending);
    }

    #[test]
    fn entered_actuals_never_override_final() {
        let mut result = pending();
        result.schedule_status = ScheduleStatus::ScheduledFinal;
        let entered = ActualLine {
            home_points: Some(1.0),
            away_points: Some(2.0),
            ..ActualLine::default()
        };
        assert!(!apply_entered_actuals(&mut result, &entered));
        assert!(result.actual.is_none());
    }
}
