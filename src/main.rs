use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use cfb_predictions::config::{Config, PredictorMode};
use cfb_predictions::reconcile::reconciler_from_config;
use cfb_predictions::review::{self, MISSING};
use cfb_predictions::review_export;
use cfb_predictions::state::{self, AppState, FormField, ProviderCommand, apply_delta};
use cfb_predictions::worker::spawn_reconcile_worker;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    api_label: String,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<ProviderCommand>, cfg: &Config) -> Self {
        let api_label = match cfg.predictor_mode {
            PredictorMode::Demo => "demo predictor".to_string(),
            PredictorMode::Http => format!("{}/predict", cfg.predict_api_base),
        };
        Self {
            state: AppState::new(cfg.default_season),
            should_quit: false,
            cmd_tx,
            api_label,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::F(10) => self.should_quit = true,
            KeyCode::F(1) => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::F(2) => self.state.show_raw = !self.state.show_raw,
            KeyCode::F(3) => self.export_result(),
            KeyCode::Tab | KeyCode::Down => self.state.focus = self.state.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.state.focus = self.state.focus.prev(),
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Enter => self.submit(),
            KeyCode::Esc => self.cancel(),
            KeyCode::Char(ch) => self.state.input_char(ch),
            _ => {}
        }
    }

    fn submit(&mut self) {
        let (generation, request, superseded) = match self.state.begin_request() {
            Ok(started) => started,
            Err(err) => {
                self.state.error = Some(err.clone());
                self.state.push_log(format!("[WARN] {err}"));
                return;
            }
        };
        if let Some(old) = superseded {
            let _ = self.cmd_tx.send(ProviderCommand::Cancel { generation: old });
        }
        if self
            .cmd_tx
            .send(ProviderCommand::Reconcile {
                generation,
                request,
            })
            .is_err()
        {
            self.state.in_flight = None;
            self.state.push_log("[WARN] Prediction worker unavailable");
        }
    }

    fn cancel(&mut self) {
        if let Some(generation) = self.state.cancel_in_flight() {
            let _ = self.cmd_tx.send(ProviderCommand::Cancel { generation });
        }
    }

    fn export_result(&mut self) {
        let outcome = match (self.state.reviewed_result(), &self.state.last_request) {
            (Some(result), Some(request)) => {
                let path = review_export::default_export_path(request);
                Some(review_export::export_review(&path, &result))
            }
            _ => None,
        };
        let Some(outcome) = outcome else {
            self.state.push_log("[INFO] Nothing to export yet");
            return;
        };
        match outcome {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} rows to {}",
                report.review_rows,
                report.path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn main() -> io::Result<()> {
    let cfg = Config::from_env();
    let reconciler = Arc::new(reconciler_from_config(&cfg));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_reconcile_worker(reconciler, tx, cmd_rx);

    let mut app = App::new(cmd_tx, &cfg);
    app.state.push_log(format!("[INFO] Predictor: {}", app.api_label));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(format!(
        "COLLEGE FOOTBALL PREDICTIONS | API: {}",
        app.api_label
    ))
    .style(Style::default().add_modifier(Modifier::BOLD))
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_form(frame, chunks[1], &app.state);

    if app.state.show_raw {
        render_raw(frame, chunks[2], &app.state);
    } else {
        render_review(frame, chunks[2], &app.state);
    }

    render_logs(frame, chunks[3], &app.state);

    let footer = Paragraph::new(
        "Tab/↑/↓ Field | Enter Predict | Esc Cancel | F2 Raw JSON | F3 Export | F1 Help | F10 Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[4]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Min(14),
        ])
        .split(rows[0]);

    let fields = [
        (FormField::Season, "Season", &state.season_input),
        (FormField::Home, "Home Team", &state.home_input),
        (FormField::Away, "Away Team", &state.away_input),
    ];
    for (idx, (field, title, value)) in fields.into_iter().enumerate() {
        render_input(frame, cols[idx], state, field, title, value);
    }

    let status = if state.is_loading() {
        Paragraph::new("Predicting...").style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new("Enter: Predict").style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(status.block(Block::default().borders(Borders::ALL)), cols[3]);

    let actual_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 6); 6])
        .split(rows[1]);
    let inputs = &state.actual_inputs;
    let actual_fields = [
        (FormField::HomePoints, "Act Home Pts", &inputs.home_points),
        (FormField::AwayPoints, "Act Away Pts", &inputs.away_points),
        (FormField::HomeRush, "Home Rush", &inputs.home_rush),
        (FormField::HomePass, "Home Pass", &inputs.home_pass),
        (FormField::AwayRush, "Away Rush", &inputs.away_rush),
        (FormField::AwayPass, "Away Pass", &inputs.away_pass),
    ];
    for (idx, (field, title, value)) in actual_fields.into_iter().enumerate() {
        render_input(frame, actual_cols[idx], state, field, title, value);
    }
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    field: FormField,
    title: &str,
    value: &str,
) {
    let focused = state.focus == field;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else if field.is_actual() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let text = if focused {
        format!("{value}_")
    } else {
        value.to_string()
    };
    let input = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    frame.render_widget(input, area);
}

fn render_review(frame: &mut Frame, area: Rect, state: &AppState) {
    if let Some(err) = state.error.as_deref() {
        let msg = Paragraph::new(format!("Error: {err}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("No prediction"));
        frame.render_widget(msg, area);
        return;
    }
    let Some(result) = state.reviewed_result() else {
        let empty = Paragraph::new("Enter a matchup and press Enter")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let result = &result;
    let head = review::headline(result);
    let mut summary = format!("Favored: {} by {}", head.favored, head.margin);
    if let Some(conf) = head.confidence {
        summary.push_str(&format!(" | Confidence: {conf:.1}"));
    }
    let game_line = match result.game.as_ref() {
        Some(game) => format!(
            "{} | {}{} | {}",
            game.date.as_deref().unwrap_or(MISSING),
            game.venue.as_deref().unwrap_or(MISSING),
            if game.neutral_site { " (neutral)" } else { "" },
            result.schedule_status.label()
        ),
        None => result.schedule_status.label().to_string(),
    };
    let card = Paragraph::new(format!(
        "{}\n{summary}\n{game_line}",
        review::projected_score_line(result)
    ))
    .block(Block::default().borders(Borders::ALL).title("Projected Score"));
    frame.render_widget(card, sections[0]);

    let actual_header = match review::shown_actual(result) {
        Some(_) if state.uses_entered_actuals() => "Actual (entered)",
        Some(_) => "Actual",
        None => review::PENDING,
    };
    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Predicted"),
        Cell::from(actual_header),
        Cell::from("Δ (Act - Pred)"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = review::review_rows(result).into_iter().map(|row| {
        let delta_style = if row.delta.starts_with('+') {
            Style::default().fg(Color::Green)
        } else if row.delta.starts_with('-') && row.delta != MISSING {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Row::new(vec![
            Cell::from(row.label),
            Cell::from(row.predicted),
            Cell::from(row.actual),
            Cell::from(row.delta).style(delta_style),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Predicted vs Actual"));
    frame.render_widget(table, sections[1]);
}

fn render_raw(frame: &mut Frame, area: Rect, state: &AppState) {
    let text = state
        .result
        .as_ref()
        .and_then(|r| serde_json::to_string_pretty(r).ok())
        .unwrap_or_else(|| "No result".to_string());
    let raw = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Raw JSON"));
    frame.render_widget(raw, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.logs.len().saturating_sub(visible);
    let lines = state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let logs = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Log"));
    frame.render_widget(logs, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(60);
    let height = area.height.min(13);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    let text = "Tab / Shift-Tab  move between fields\n\
                Act fields       optional actuals for review\n\
                Enter            predict the matchup\n\
                Esc              cancel the pending request\n\
                F2               toggle raw JSON\n\
                F3               export review to .xlsx\n\
                F1               close help\n\
                F10 / Ctrl-C     quit";
    frame.render_widget(Clear, popup);
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, popup);
}
