use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};
use tracing_subscriber::EnvFilter;

use fc_predictor::api::{HttpApi, PredictorApi};
use fc_predictor::config::Config;
use fc_predictor::controller::PredictionController;
use fc_predictor::predictions::date_label;
use fc_predictor::provider::spawn_provider;
use fc_predictor::state::{
    AppState, MatchRecord, Probabilities, Screen, StateEvent, TeamSlot, WorkflowPhase,
};
use fc_predictor::votes::{FileVoteStorage, MemoryVoteStorage, Vote, VoteStorage, VoteStore};

struct App {
    controller: PredictionController,
    events: mpsc::Receiver<StateEvent>,
    votes: VoteStore,
    should_quit: bool,
    help_overlay: bool,
    dirty: bool,
}

impl App {
    fn new(mut controller: PredictionController, votes: VoteStore) -> Self {
        let events = controller.subscribe();
        Self {
            controller,
            events,
            votes,
            should_quit: false,
            help_overlay: false,
            dirty: true,
        }
    }

    fn state(&self) -> &AppState {
        self.controller.state()
    }

    /// Drains controller events; true when anything changed since the last draw.
    fn take_dirty(&mut self) -> bool {
        let changed = self.events.try_iter().count() > 0;
        std::mem::replace(&mut self.dirty, false) || changed
    }

    fn on_key(&mut self, key: KeyEvent) {
        self.dirty = true;
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        let screen = self.state().screen;
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(1) => self.help_overlay = !self.help_overlay,
            KeyCode::F(2) => self.toggle_screen(),
            _ => match screen {
                Screen::Predictor => self.on_predictor_key(key),
                Screen::Upcoming => self.on_upcoming_key(key),
            },
        }
        self.controller.settle_focus();
    }

    fn toggle_screen(&mut self) {
        let next = match self.state().screen {
            Screen::Predictor => Screen::Upcoming,
            Screen::Upcoming => Screen::Predictor,
        };
        self.controller.set_screen(next);
    }

    fn on_predictor_key(&mut self, key: KeyEvent) {
        let slot = self.state().focus;
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.controller.focus(slot.other()),
            KeyCode::Down => self.controller.move_highlight(slot, true),
            KeyCode::Up => self.controller.move_highlight(slot, false),
            KeyCode::Backspace => self.controller.delete_char(slot),
            KeyCode::Enter => {
                if self.controller.select_suggestion(slot) {
                    return;
                }
                if self.state().can_predict() {
                    // Rejections are already recorded on the state for display.
                    let _ = self.controller.predict();
                }
            }
            KeyCode::Char(ch) => self.controller.type_char(slot, ch),
            _ => {}
        }
    }

    fn on_upcoming_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.controller.move_listing_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.controller.move_listing_selection(false),
            KeyCode::Char('r') => self.controller.refresh_prediction_list(),
            KeyCode::Char('h') => self.vote(Vote::Home),
            KeyCode::Char('a') => self.vote(Vote::Away),
            _ => {}
        }
    }

    fn vote(&mut self, vote: Vote) {
        let Some(id) = self.state().selected_listing().and_then(|p| p.id) else {
            self.controller.log("[INFO] Selected match has no id to vote on");
            return;
        };
        if self.votes.record_vote(id, vote) {
            self.controller
                .log(format!("[INFO] Vote {} recorded for match {id}", vote.code()));
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = Config::from_env();
    init_tracing(&config);

    let api: Arc<dyn PredictorApi> = match HttpApi::new(&config.api_base, config.http_timeout) {
        Ok(api) => Arc::new(api),
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(());
        }
    };
    let storage: Box<dyn VoteStorage> = match &config.data_dir {
        Some(dir) => Box::new(FileVoteStorage::new(dir)),
        None => Box::new(MemoryVoteStorage::default()),
    };
    let votes = VoteStore::load(storage);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(api, tx, cmd_rx, config.workers);

    let mut controller = PredictionController::new(Some(cmd_tx), rx);
    controller.focus(TeamSlot::Home);
    controller.load_teams();
    let mut app = App::new(controller, votes);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn init_tracing(config: &Config) {
    // The terminal owns stdout/stderr, so diagnostics only go to a file.
    let Some(path) = &config.log_file else {
        return;
    };
    let Ok(file) = File::create(path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        app.controller.pump();

        if app.take_dirty() {
            terminal.draw(|f| ui(f, app))?;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Resize(..) => app.dirty = true,
                _ => {}
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
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let title = match app.state().screen {
        Screen::Predictor => "MATCH PREDICTOR",
        Screen::Upcoming => "UPCOMING PREDICTIONS",
    };
    let header = Paragraph::new(format!(" {title}"))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state().screen {
        Screen::Predictor => render_predictor(frame, chunks[1], app.state()),
        Screen::Upcoming => render_upcoming(frame, chunks[1], app),
    }

    let footer = Paragraph::new(footer_text(app.state()))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn footer_text(state: &AppState) -> String {
    let keys = match state.screen {
        Screen::Predictor => "Tab Switch team | ↑/↓ Suggestions | Enter Select/Predict | F2 Upcoming | F1 Help | Esc Quit",
        Screen::Upcoming => "j/k Move | h/a Vote | r Refresh | F2 Predictor | F1 Help | Esc Quit",
    };
    match state.logs.back() {
        Some(last) => format!("{keys}   {last}"),
        None => keys.to_string(),
    }
}

fn render_predictor(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    if let Some(err) = &state.error {
        let banner = Paragraph::new(err.to_string()).style(Style::default().fg(Color::Red));
        frame.render_widget(banner, rows[0]);
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(10),
            Constraint::Percentage(45),
        ])
        .split(rows[1]);
    render_team_input(frame, cols[0], state, TeamSlot::Home);
    frame.render_widget(
        Paragraph::new("\n  VS").style(Style::default().add_modifier(Modifier::BOLD)),
        cols[1],
    );
    render_team_input(frame, cols[2], state, TeamSlot::Away);

    let button = if state.is_predicting() {
        "[ Predicting... ]"
    } else if state.can_predict() {
        "[ Enter: Predict ]"
    } else {
        "[ Predict unavailable ]"
    };
    frame.render_widget(Paragraph::new(button), rows[2]);

    render_result(frame, rows[3], state);

    // Dropdown is drawn last so it sits above the result area.
    let suggestion_col = match state.focus {
        TeamSlot::Home => cols[0],
        TeamSlot::Away => cols[2],
    };
    render_suggestions(frame, suggestion_col, rows[3], state);
}

fn render_team_input(frame: &mut Frame, area: Rect, state: &AppState, slot: TeamSlot) {
    let input = state.input(slot);
    let label = match slot {
        TeamSlot::Home => "Home Team",
        TeamSlot::Away => "Away Team",
    };
    let border = if input.is_focused() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let logo = state.logos.logo(slot);
    let logo_line = if logo.is_empty() { String::new() } else { format!("logo: {logo}") };
    let text = format!("{}\n{}", input.value(), logo_line);
    let widget = Paragraph::new(text).block(
        Block::default()
            .title(label)
            .borders(Borders::ALL)
            .border_style(border),
    );
    frame.render_widget(widget, area);
}

fn render_suggestions(frame: &mut Frame, column: Rect, below: Rect, state: &AppState) {
    let input = state.input(state.focus);
    let suggestions = input.visible_suggestions();
    if suggestions.is_empty() || below.height < 3 {
        return;
    }
    let height = (suggestions.len() as u16 + 2).min(below.height).min(10);
    let area = Rect {
        x: column.x,
        y: below.y,
        width: column.width,
        height,
    };
    let visible = height.saturating_sub(2) as usize;
    let (start, end) = visible_range(input.highlighted(), suggestions.len(), visible);
    let lines: Vec<Line> = (start..end)
        .map(|idx| {
            let style = if idx == input.highlighted() {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(Span::styled(suggestions[idx].clone(), style))
        })
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_result(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(prediction) = &state.prediction else {
        return;
    };
    let home = state.request.as_ref().map(|r| r.home_team.as_str()).unwrap_or("Home");
    let away = state.request.as_ref().map(|r| r.away_team.as_str()).unwrap_or("Away");

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(1)])
        .split(area);
    let card_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);

    let mut card = vec![prediction.outcome.label().to_string()];
    if let Some(logo) = state.winner_logo() {
        card.push(format!("winner logo: {logo}"));
    }
    if let Some(score) = &prediction.score {
        card.push(format!("Predicted Score: {score}"));
    }
    if let Some(probs) = &prediction.probabilities {
        let [h, d, a] = probs.percent_labels();
        card.push(format!("{home}: {h}  Draw: {d}  {away}: {a}"));
    }
    frame.render_widget(
        Paragraph::new(card.join("\n"))
            .block(Block::default().title("Prediction").borders(Borders::ALL)),
        card_cols[0],
    );
    if let Some(probs) = &prediction.probabilities {
        frame.render_widget(win_bar_chart(probs), card_cols[1]);
    }

    let details_text = match (state.phase, &state.details) {
        (WorkflowPhase::AwaitingDetails, _) => "Loading match details...".to_string(),
        (_, Some(details)) => [
            records_text("Head-to-Head", &details.head_to_head),
            records_text(&format!("{home} - Recent Form"), &details.home_form),
            records_text(&format!("{away} - Recent Form"), &details.away_form),
        ]
        .join("\n"),
        _ => String::new(),
    };
    if !details_text.is_empty() {
        frame.render_widget(
            Paragraph::new(details_text)
                .block(Block::default().title("Match Details").borders(Borders::ALL)),
            rows[1],
        );
    }
}

fn records_text(title: &str, records: &[MatchRecord]) -> String {
    let mut lines = vec![title.to_string()];
    if records.is_empty() {
        lines.push("  no matches".to_string());
    }
    for rec in records {
        lines.push(format!(
            "  {:<10}  {:<22} {:>2} - {:<2} {}",
            date_label(&rec.date),
            rec.home_team,
            rec.home_goals,
            rec.away_goals,
            rec.away_team
        ));
    }
    lines.join("\n")
}

fn win_bar_chart(probs: &Probabilities) -> BarChart<'static> {
    let bar = |label: &'static str, p: f64, color: Color| {
        Bar::default()
            .label(label.into())
            .value((p * 100.0).round().max(0.0) as u64)
            .style(Style::default().fg(color))
    };
    let bars = [
        bar("H", probs.home_win, Color::Green),
        bar("D", probs.draw, Color::Yellow),
        bar("A", probs.away_win, Color::Red),
    ];
    BarChart::default()
        .block(Block::default().borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(100)
}

fn render_upcoming(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    if state.listing_loading && state.listing.is_empty() {
        frame.render_widget(Paragraph::new("Loading..."), area);
        return;
    }
    if let Some(err) = &state.listing_error {
        frame.render_widget(
            Paragraph::new(format!("Error: {err}")).style(Style::default().fg(Color::Red)),
            area,
        );
        return;
    }
    if state.listing.is_empty() {
        frame.render_widget(
            Paragraph::new("No predictions available").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    const ROW_HEIGHT: u16 = 2;
    let visible = (area.height / ROW_HEIGHT).max(1) as usize;
    let (start, end) = visible_range(state.listing_selected, state.listing.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let p = &state.listing[idx];
        let row_area = Rect {
            x: area.x,
            y: area.y + (i as u16) * ROW_HEIGHT,
            width: area.width,
            height: ROW_HEIGHT.min(area.height.saturating_sub(i as u16 * ROW_HEIGHT)),
        };
        let style = if idx == state.listing_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let (home, away) = p.teams().unwrap_or((p.match_label.as_str(), ""));
        let vote = p
            .id
            .and_then(|id| app.votes.get_vote(id))
            .map(|v| format!("  [voted {}]", v.code()))
            .unwrap_or_default();
        let line1 = format!(
            "{}  {}",
            p.competition.as_deref().unwrap_or("N/A"),
            p.utc_date.as_deref().map(date_label).unwrap_or_else(|| "Unknown date".to_string())
        );
        let line2 = format!(
            "{home} {} {away}  {} ({}){vote}",
            p.score.as_deref().unwrap_or("-"),
            p.outcome.label(),
            p.confidence
        );
        frame.render_widget(Paragraph::new(format!("{line1}\n{line2}")).style(style), row_area);
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Match Predictor - Help",
        "",
        "Global:",
        "  F1           Toggle help",
        "  F2           Predictor / Upcoming",
        "  Esc          Quit",
        "",
        "Predictor:",
        "  Tab          Switch home/away field",
        "  ↑/↓          Move through suggestions",
        "  Enter        Pick suggestion, else predict",
        "",
        "Upcoming:",
        "  j/k or ↑/↓   Move",
        "  h / a        Vote home / away",
        "  r            Refresh",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
