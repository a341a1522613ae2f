use cfb_predictions::error::ScheduleError;
use cfb_predictions::model::{GameRequest, Prediction, YardSplit};
use cfb_predictions::reconcile::assemble;
use cfb_predictions::review::{MISSING, PENDING, headline, review_rows, shown_actual};
use cfb_predictions::review_export::{default_export_path, export_review};
use cfb_predictions::schedule::parse_schedule_json;

const SCHEDULE: &str = r#"{"games":[{"homeTeam":"Texas","awayTeam":"Ohio State","final":true,
    "actual":{"homePts":28,"awayPts":24,"homeYds":{"rushing":130},
              "awayYds":{"rushing":101,"passing":188}}}]}"#;

fn prediction() -> Prediction {
    Prediction {
        home_points: 24.0,
        away_points: 31.0,
        confidence: Some(58.25),
        home_yards: YardSplit::new(Some(150.0), Some(220.0)),
        away_yards: YardSplit::new(Some(1120.0), Some(260.0)),
    }
}

#[test]
fn final_game_rows_show_actuals_and_signed_deltas() {
    let req = GameRequest::new(2025, "Texas", "Ohio State").unwrap();
    let result = assemble(&req, prediction(), parse_schedule_json(SCHEDULE));
    let rows = review_rows(&result);

    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].label, "Score");
    assert_eq!(rows[0].predicted, "24-31");
    assert_eq!(rows[0].actual, "28-24");
    assert_eq!(rows[0].delta, "+11");

    let home_pass = rows.iter().find(|r| r.label == "Texas pass yds").unwrap();
    assert_eq!(home_pass.actual, MISSING);
    assert_eq!(home_pass.delta, MISSING);

    let home_rush = rows.iter().find(|r| r.label == "Texas rush yds").unwrap();
    assert_eq!(home_rush.delta, "-20");

    let away_total = rows.iter().find(|r| r.label == "Ohio State total yds").unwrap();
    assert_eq!(away_total.predicted, "1,380");
    assert_eq!(away_total.actual, "289");
    assert_eq!(away_total.delta, "-1,091");
}

#[test]
fn pending_rows_show_tbd() {
    let req = GameRequest::new(2025, "Texas", "Ohio State").unwrap();
    let result = assemble(&req, prediction(), Err(ScheduleError::NotFound(2025)));
    for row in review_rows(&result) {
        assert_eq!(row.actual, PENDING);
        assert_eq!(row.delta, MISSING);
    }
}

#[test]
fn yards_without_score_stay_pending_with_no_deltas() {
    let raw = r#"{"games":[{"homeTeam":"Texas","awayTeam":"Ohio State","final":true,
        "actual":{"homeYds":{"rushing":130,"passing":200},
                  "awayYds":{"rushing":101,"passing":188}}}]}"#;
    let req = GameRequest::new(2025, "Texas", "Ohio State").unwrap();
    let result = assemble(&req, prediction(), parse_schedule_json(raw));
    assert!(result.deltas.is_some());
    assert!(shown_actual(&result).is_none());

    for row in review_rows(&result) {
        assert_eq!(row.actual, PENDING, "{}", row.label);
        assert_eq!(row.delta, MISSING, "{}", row.label);
    }
}

#[test]
fn headline_favors_higher_projection() {
    let req = GameRequest::new(2025, "Texas", "Ohio State").unwrap();
    let result = assemble(&req, prediction(), Err(ScheduleError::NotFound(2025)));
    let head = headline(&result);
    assert_eq!(head.favored, "Ohio State");
    assert_eq!(head.margin, 7);
    assert_eq!(head.confidence, Some(58.25));
}

#[test]
fn export_writes_workbook() {
    let req = GameRequest::new(2025, "Texas A&M", "Ohio State").unwrap();
    let result = assemble(&req, prediction(), parse_schedule_json(SCHEDULE));
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(default_export_path(&req));
    assert!(path.ends_with("review_2025_ohio_state_at_texas_a_m.xlsx"));

    let report = export_review(&path, &result).expect("export should succeed");
    assert!(path.exists());
    assert!(report.review_rows >= 7);
    assert!(report.raw_lines > 1);
}
