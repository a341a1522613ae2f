use std::path::PathBuf;

use anyhow::{Context, Result};

use cfb_predictions::config::{Config, PredictorMode};
use cfb_predictions::model::{ActualLine, GameRequest, YardSplit};
use cfb_predictions::predictor::HttpPredictor;
use cfb_predictions::reconcile::{apply_entered_actuals, reconciler_from_config};
use cfb_predictions::review::{self, ReviewRow};
use cfb_predictions::review_export;

// One-shot reconciliation for scripts:
//   reconcile --season 2025 --home LSU --away UCLA [--json] [--demo]
//             [--schedule-dir DIR] [--export PATH] [--health]
//             [--actual-home-pts N] [--actual-away-pts N]
//             [--actual-home-rush N] [--actual-home-pass N]
//             [--actual-away-rush N] [--actual-away-pass N]
fn main() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    init_tracing(has_flag(&args, "--verbose"))?;

    let mut cfg = Config::from_env();
    if has_flag(&args, "--demo") {
        cfg.predictor_mode = PredictorMode::Demo;
    }
    if let Some(dir) = flag_value(&args, "--schedule-dir") {
        cfg.schedule_dir = Some(PathBuf::from(dir));
    }

    if has_flag(&args, "--health") {
        let predictor = HttpPredictor::new(
            cfg.predict_api_base.clone(),
            cfg.predict_api_key.clone(),
            cfg.request_timeout_secs,
        );
        match predictor.health_check() {
            Ok(true) => println!("{}: ok", cfg.predict_api_base),
            Ok(false) => println!("{}: unavailable", cfg.predict_api_base),
            Err(err) => println!("{}: unavailable ({err:#})", cfg.predict_api_base),
        }
        return Ok(());
    }

    let season = match flag_value(&args, "--season") {
        Some(raw) => raw
            .parse::<i32>()
            .with_context(|| format!("invalid --season '{raw}'"))?,
        None => cfg.default_season,
    };
    let home = flag_value(&args, "--home").context("missing --home TEAM")?;
    let away = flag_value(&args, "--away").context("missing --away TEAM")?;
    let request = GameRequest::new(season, home, away)?;

    let entered = entered_actuals(&args)?;

    let reconciler = reconciler_from_config(&cfg);
    let mut result = reconciler.reconcile(&request)?;
    if let Some(entered) = entered.as_ref() {
        if !apply_entered_actuals(&mut result, entered) {
            eprintln!("schedule already has final actuals; entered values ignored");
        }
    }

    if has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let head = review::headline(&result);
        println!("{}", review::projected_score_line(&result));
        match head.confidence {
            Some(conf) => println!(
                "Favored: {} by {} | Confidence: {conf:.1}",
                head.favored, head.margin
            ),
            None => println!("Favored: {} by {}", head.favored, head.margin),
        }
        println!("Schedule: {}", result.schedule_status.label());
        println!();
        print_rows(&review::review_rows(&result));
    }

    if let Some(path) = flag_value(&args, "--export") {
        let report = review_export::export_review(&PathBuf::from(path), &result)?;
        eprintln!("exported {} rows to {}", report.review_rows, report.path.display());
    }

    Ok(())
}

fn entered_actuals(args: &[String]) -> Result<Option<ActualLine>> {
    let number = |name: &str| -> Result<Option<f64>> {
        flag_value(args, name)
            .map(|raw| {
                raw.parse::<f64>()
                    .with_context(|| format!("invalid {name} '{raw}'"))
            })
            .transpose()
    };
    let home_points = number("--actual-home-pts")?;
    let away_points = number("--actual-away-pts")?;
    let home_rush = number("--actual-home-rush")?;
    let home_pass = number("--actual-home-pass")?;
    let away_rush = number("--actual-away-rush")?;
    let away_pass = number("--actual-away-pass")?;

    let any = [home_points, away_points, home_rush, home_pass, away_rush, away_pass]
        .iter()
        .any(Option::is_some);
    if !any {
        return Ok(None);
    }
    Ok(Some(ActualLine {
        home_points,
        away_points,
        home_yards: YardSplit::new(home_rush, home_pass),
        away_yards: YardSplit::new(away_rush, away_pass),
    }))
}

fn print_rows(rows: &[ReviewRow]) {
    let width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0).max(5);
    println!(
        "{:<width$}  {:>10}  {:>10}  {:>8}",
        "", "Predicted", "Actual", "Delta"
    );
    for row in rows {
        println!(
            "{:<width$}  {:>10}  {:>10}  {:>8}",
            row.label, row.predicted, row.actual, row.delta
        );
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("CFB_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
