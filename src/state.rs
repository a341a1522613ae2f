use std::collections::VecDeque;

use crate::error::ReconcileError;
use crate::model::{ActualLine, GameRequest, ReconciliationResult, ScheduleStatus, YardSplit};
use crate::reconcile::apply_entered_actuals;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Season,
    Home,
    Away,
    HomePoints,
    AwayPoints,
    HomeRush,
    HomePass,
    AwayRush,
    AwayPass,
}

const FIELD_ORDER: [FormField; 9] = [
    FormField::Season,
    FormField::Home,
    FormField::Away,
    FormField::HomePoints,
    FormField::AwayPoints,
    FormField::HomeRush,
    FormField::HomePass,
    FormField::AwayRush,
    FormField::AwayPass,
];

impl FormField {
    fn position(self) -> usize {
        FIELD_ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        FIELD_ORDER[(self.position() + 1) % FIELD_ORDER.len()]
    }

    pub fn prev(self) -> Self {
        FIELD_ORDER[(self.position() + FIELD_ORDER.len() - 1) % FIELD_ORDER.len()]
    }

    /// Fields of the optional "actuals for review" row.
    pub fn is_actual(self) -> bool {
        !matches!(self, FormField::Season | FormField::Home | FormField::Away)
    }
}

/// Raw text of the optional review actuals. Blank means not entered.
#[derive(Debug, Clone, Default)]
pub struct ActualInputs {
    pub home_points: String,
    pub away_points: String,
    pub home_rush: String,
    pub home_pass: String,
    pub away_rush: String,
    pub away_pass: String,
}

impl ActualInputs {
    /// `None` when every field is blank; unparsable fields count as missing.
    pub fn to_actual(&self) -> Option<ActualLine> {
        let fields = [
            &self.home_points,
            &self.away_points,
            &self.home_rush,
            &self.home_pass,
            &self.away_rush,
            &self.away_pass,
        ];
        if fields.iter().all(|f| f.trim().is_empty()) {
            return None;
        }
        Some(ActualLine {
            home_points: parse_entry(&self.home_points),
            away_points: parse_entry(&self.away_points),
            home_yards: YardSplit::new(parse_entry(&self.home_rush), parse_entry(&self.home_pass)),
            away_yards: YardSplit::new(parse_entry(&self.away_rush), parse_entry(&self.away_pass)),
        })
    }
}

fn parse_entry(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Reconcile { generation: u64, request: GameRequest },
    Cancel { generation: u64 },
}

#[derive(Debug, Clone)]
pub enum Delta {
    Reconciled {
        generation: u64,
        result: Box<ReconciliationResult>,
    },
    Failed {
        generation: u64,
        error: ReconcileError,
    },
    Log(String),
}

#[derive(Debug)]
pub struct AppState {
    pub season_input: String,
    pub home_input: String,
    pub away_input: String,
    pub actual_inputs: ActualInputs,
    pub focus: FormField,
    pub in_flight: Option<u64>,
    next_generation: u64,
    pub last_request: Option<GameRequest>,
    pub result: Option<ReconciliationResult>,
    pub error: Option<String>,
    pub show_raw: bool,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(default_season: i32) -> Self {
        Self {
            season_input: default_season.to_string(),
            home_input: "LSU".to_string(),
            away_input: "UCLA".to_string(),
            actual_inputs: ActualInputs::default(),
            focus: FormField::Season,
            in_flight: None,
            next_generation: 1,
            last_request: None,
            result: None,
            error: None,
            show_raw: false,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn focused_input(&mut self) -> &mut String {
        match self.focus {
            FormField::Season => &mut self.season_input,
            FormField::Home => &mut self.home_input,
            FormField::Away => &mut self.away_input,
            FormField::HomePoints => &mut self.actual_inputs.home_points,
            FormField::AwayPoints => &mut self.actual_inputs.away_points,
            FormField::HomeRush => &mut self.actual_inputs.home_rush,
            FormField::HomePass => &mut self.actual_inputs.home_pass,
            FormField::AwayRush => &mut self.actual_inputs.away_rush,
            FormField::AwayPass => &mut self.actual_inputs.away_pass,
        }
    }

    pub fn input_char(&mut self, ch: char) {
        let accepted = match self.focus {
            FormField::Season => ch.is_ascii_digit(),
            field if field.is_actual() => ch.is_ascii_digit() || ch == '.' || ch == '-',
            _ => true,
        };
        if accepted {
            self.focused_input().push(ch);
        }
    }

    /// True when the shown comparison comes from hand-entered actuals.
    pub fn uses_entered_actuals(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| r.schedule_status != ScheduleStatus::ScheduledFinal)
            && self.actual_inputs.to_actual().is_some()
    }

    /// Result as reviewed: schedule actuals when final, otherwise whatever
    /// was typed into the actuals row.
    pub fn reviewed_result(&self) -> Option<ReconciliationResult> {
        let mut result = self.result.clone()?;
        if let Some(entered) = self.actual_inputs.to_actual() {
            apply_entered_actuals(&mut result, &entered);
        }
        Some(result)
    }

    pub fn backspace(&mut self) {
        self.focused_input().pop();
    }

    pub fn build_request(&self) -> Result<GameRequest, String> {
        let season = self
            .season_input
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("season '{}' is not a year", self.season_input.trim()))?;
        GameRequest::new(season, self.home_input.trim(), self.away_input.trim())
            .map_err(|err| err.to_string())
    }

    /// Starts a new request generation. Whatever was in flight is superseded
    /// and its generation is returned so the worker can be told to drop it.
    pub fn begin_request(&mut self) -> Result<(u64, GameRequest, Option<u64>), String> {
        let request = self.build_request()?;
        let superseded = self.in_flight.take();
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight = Some(generation);
        self.last_request = Some(request.clone());
        self.result = None;
        self.error = None;
        Ok((generation, request, superseded))
    }

    pub fn cancel_in_flight(&mut self) -> Option<u64> {
        let generation = self.in_flight.take()?;
        self.push_log("[INFO] Request cancelled");
        Some(generation)
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Reconciled { generation, result } => {
            if state.in_flight != Some(generation) {
                return;
            }
            state.in_flight = None;
            state.push_log(format!(
                "[INFO] {} vs {}: {}",
                result.matchup.home_team,
                result.matchup.away_team,
                result.schedule_status.label()
            ));
            state.error = None;
            state.result = Some(*result);
        }
        Delta::Failed { generation, error } => {
            if state.in_flight != Some(generation) {
                return;
            }
            state.in_flight = None;
            if error == ReconcileError::Cancelled {
                return;
            }
            state.push_log(format!("[WARN] {error}"));
            state.result = None;
            state.error = Some(error.to_string());
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
