use std::fs;
use std::path::PathBuf;

use cfb_predictions::error::{ReconcileError, ScheduleError};
use cfb_predictions::model::GameRequest;
use cfb_predictions::predictor::{parse_prediction_json, prediction_from_response};
use cfb_predictions::schedule::{FileScheduleSource, ScheduleSource, find_game, parse_schedule_json};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixtures_dir().join(name)).expect("fixture file should be readable")
}

#[test]
fn parses_predictor_fixture() {
    let prediction =
        parse_prediction_json(&read_fixture("predict_response.json")).expect("fixture should parse");
    assert_eq!(prediction.home_points, 24.4);
    assert_eq!(prediction.away_points, 31.2);
    assert_eq!(prediction.confidence, Some(63.75));
    assert_eq!(prediction.home_yards.rushing, Some(142.0));
    assert_eq!(prediction.home_yards.total, Some(373.0));
    // numeric strings are coerced, explicit totals are kept
    assert_eq!(prediction.away_yards.rushing, Some(118.0));
    assert_eq!(prediction.away_yards.total, Some(394.0));
}

#[test]
fn missing_away_points_is_unavailable() {
    let err = parse_prediction_json(&read_fixture("predict_missing_points.json"))
        .expect_err("awayPoints is required");
    assert_eq!(
        err,
        ReconcileError::PredictionUnavailable("missing predicted.awayPoints".to_string())
    );
}

#[test]
fn non_numeric_points_are_unavailable() {
    let raw = r#"{"predicted":{"homePoints":"soon","awayPoints":21}}"#;
    assert!(matches!(
        parse_prediction_json(raw),
        Err(ReconcileError::PredictionUnavailable(_))
    ));
}

#[test]
fn yards_are_optional_in_prediction() {
    let raw = r#"{"predicted":{"homePoints":17,"awayPoints":14}}"#;
    let prediction = parse_prediction_json(raw).expect("scores alone are enough");
    assert_eq!(prediction.confidence, None);
    assert_eq!(prediction.home_yards.total, None);
}

#[test]
fn non_success_status_is_unavailable() {
    let body = read_fixture("predict_response.json");
    assert!(prediction_from_response(200, &body).is_ok());
    assert!(prediction_from_response(404, &body).is_err());
    assert!(prediction_from_response(503, "").is_err());
}

#[test]
fn null_and_garbage_responses_are_unavailable() {
    assert!(parse_prediction_json("null").is_err());
    assert!(parse_prediction_json("<html>gateway timeout</html>").is_err());
}

#[test]
fn schedule_fixture_parses_records() {
    let schedule = parse_schedule_json(&read_fixture("schedule_2025.json")).expect("valid");
    assert_eq!(schedule.games.len(), 4);
    let first = &schedule.games[0];
    assert!(first.is_final);
    assert_eq!(first.actual.as_ref().and_then(|a| a.home_pts), Some(20.0));
    assert!(schedule.games[3].neutral_site);
    assert!(schedule.games[2].actual.is_none());
}

#[test]
fn non_numeric_actual_field_is_treated_as_missing() {
    let raw = r#"{"games":[{"homeTeam":"A","awayTeam":"B","final":true,
        "actual":{"homePts":"--","awayPts":10,"homeYds":{"rushing":null,"passing":"200"}}}]}"#;
    let schedule = parse_schedule_json(raw).expect("lenient numbers");
    let actual = schedule.games[0].actual.as_ref().unwrap();
    assert_eq!(actual.home_pts, None);
    assert_eq!(actual.away_pts, Some(10.0));
    assert_eq!(actual.home_yds.rushing, None);
    assert_eq!(actual.home_yds.passing, Some(200.0));
}

#[test]
fn empty_schedule_document_is_malformed() {
    assert!(matches!(parse_schedule_json("  "), Err(ScheduleError::Malformed(_))));
    assert!(matches!(parse_schedule_json("[1,2"), Err(ScheduleError::Malformed(_))));
}

#[test]
fn find_game_reports_orientation() {
    let schedule = parse_schedule_json(&read_fixture("schedule_2025.json")).unwrap();

    let same = GameRequest::new(2025, "UCLA", "LSU").unwrap();
    let matched = find_game(&schedule, &same).expect("scheduled");
    assert!(matched.same_orientation);

    let flipped = GameRequest::new(2025, "LSU", "UCLA").unwrap();
    let matched = find_game(&schedule, &flipped).expect("scheduled");
    assert!(!matched.same_orientation);
    assert_eq!(matched.record.home_team, "UCLA");
}

#[test]
fn file_source_maps_missing_season_to_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::copy(
        fixtures_dir().join("schedule_2025.json"),
        dir.path().join("2025.json"),
    )
    .expect("copy fixture");

    let source = FileScheduleSource::new(dir.path());
    assert_eq!(source.load_season(2025).expect("present").games.len(), 4);
    assert_eq!(source.load_season(2019), Err(ScheduleError::NotFound(2019)));
}
