use crate::model::{ActualLine, ReconciliationResult, YardDeltas, YardSplit, finite};

pub const MISSING: &str = "--";
pub const PENDING: &str = "TBD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub label: String,
    pub predicted: String,
    pub actual: String,
    pub delta: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub favored: String,
    pub margin: i64,
    pub confidence: Option<f64>,
}

/// Favored side is home on a predicted tie.
pub fn headline(result: &ReconciliationResult) -> Headline {
    let p = &result.predicted;
    let favored = if p.home_points >= p.away_points {
        result.matchup.home_team.clone()
    } else {
        result.matchup.away_team.clone()
    };
    Headline {
        favored,
        margin: (p.home_points - p.away_points).round().abs() as i64,
        confidence: finite(p.confidence),
    }
}

pub fn projected_score_line(result: &ReconciliationResult) -> String {
    format!(
        "{} {} - {} {}",
        result.matchup.home_team,
        fmt_value(Some(result.predicted.home_points)),
        fmt_value(Some(result.predicted.away_points)),
        result.matchup.away_team
    )
}

/// Actuals worth showing: both scores must be known, otherwise the whole
/// actual column (and every delta) stays pending.
pub fn shown_actual(result: &ReconciliationResult) -> Option<&ActualLine> {
    result.actual.as_ref().filter(|a| a.has_score())
}

/// Predicted / actual / delta table: score first, then yards per side.
pub fn review_rows(result: &ReconciliationResult) -> Vec<ReviewRow> {
    let p = &result.predicted;
    let actual = shown_actual(result);
    let deltas = actual.and(result.deltas.as_ref());

    let mut rows = Vec::with_capacity(7);
    rows.push(ReviewRow {
        label: "Score".to_string(),
        predicted: format!(
            "{}-{}",
            fmt_value(Some(p.home_points)),
            fmt_value(Some(p.away_points))
        ),
        actual: match actual {
            Some(a) => format!("{}-{}", fmt_value(a.home_points), fmt_value(a.away_points)),
            None => PENDING.to_string(),
        },
        delta: match (actual, deltas) {
            (Some(_), Some(d)) => fmt_delta(d.margin),
            _ => MISSING.to_string(),
        },
    });

    let sides = [
        (
            &result.matchup.home_team,
            &p.home_yards,
            actual.map(|a| a.home_yards),
            deltas.map(|d| d.home_yards),
        ),
        (
            &result.matchup.away_team,
            &p.away_yards,
            actual.map(|a| a.away_yards),
            deltas.map(|d| d.away_yards),
        ),
    ];
    for (team, predicted, actual, delta) in sides {
        rows.extend(yard_rows(team, predicted, actual.as_ref(), delta));
    }
    rows
}

fn yard_rows(
    team: &str,
    predicted: &YardSplit,
    actual: Option<&YardSplit>,
    delta: Option<YardDeltas>,
) -> Vec<ReviewRow> {
    let actual_cell = |pick: fn(&YardSplit) -> Option<f64>| match actual {
        Some(a) => fmt_value(pick(a)),
        None => PENDING.to_string(),
    };
    vec![
        ReviewRow {
            label: format!("{team} total yds"),
            predicted: fmt_value(predicted.resolved_total()),
            actual: actual_cell(|y: &YardSplit| y.resolved_total()),
            delta: fmt_delta(delta.and_then(|d| d.total)),
        },
        ReviewRow {
            label: format!("{team} rush yds"),
            predicted: fmt_value(predicted.rushing),
            actual: actual_cell(|y: &YardSplit| y.rushing),
            delta: fmt_delta(delta.and_then(|d| d.rushing)),
        },
        ReviewRow {
            label: format!("{team} pass yds"),
            predicted: fmt_value(predicted.passing),
            actual: actual_cell(|y: &YardSplit| y.passing),
            delta: fmt_delta(delta.and_then(|d| d.passing)),
        },
    ]
}

/// Rounded with thousands separators, `--` when missing.
pub fn fmt_value(value: Option<f64>) -> String {
    let Some(v) = finite(value) else {
        return MISSING.to_string();
    };
    let rounded = v.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn fmt_delta(value: Option<f64>) -> String {
    match finite(value) {
        Some(v) if v.round() > 0.0 => format!("+{}", fmt_value(Some(v))),
        Some(v) => fmt_value(Some(v)),
        None => MISSING.to_string(),
    }
}
