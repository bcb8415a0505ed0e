use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info};

use crate::state::{
    AppState, Delta, PredictError, PredictionRequest, ProviderCommand, Screen, StateEvent,
    TeamSlot, WorkflowPhase, apply_delta,
};

/// Drives the predict -> details chain and the per-slot logo lookups.
///
/// Commands go out over `cmd_tx`; worker reports come back over `delta_rx`
/// and are folded in by [`PredictionController::pump`]. Every mutation is
/// announced to subscribers as a [`StateEvent`].
pub struct PredictionController {
    state: AppState,
    cmd_tx: Option<Sender<ProviderCommand>>,
    delta_rx: Receiver<Delta>,
    listeners: Vec<Sender<StateEvent>>,
}

impl PredictionController {
    pub fn new(cmd_tx: Option<Sender<ProviderCommand>>, delta_rx: Receiver<Delta>) -> Self {
        Self {
            state: AppState::new(),
            cmd_tx,
            delta_rx,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe(&mut self) -> Receiver<StateEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, event: StateEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn send(&mut self, cmd: ProviderCommand) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Provider unavailable");
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider request failed");
            return false;
        }
        true
    }

    pub fn load_teams(&mut self) {
        if !self.send(ProviderCommand::FetchTeams) {
            self.state.error = Some(PredictError::TeamsUnavailable);
            self.emit(StateEvent::TeamsFailed);
        }
    }

    pub fn refresh_prediction_list(&mut self) {
        if self.send(ProviderCommand::FetchPredictionList) {
            self.state.listing_loading = true;
            self.emit(StateEvent::ListingChanged);
        }
    }

    /// Keystroke in a team field.
    pub fn type_char(&mut self, slot: TeamSlot, ch: char) {
        let AppState {
            teams,
            home_input,
            away_input,
            ..
        } = &mut self.state;
        match slot {
            TeamSlot::Home => home_input.push_char(ch, teams),
            TeamSlot::Away => away_input.push_char(ch, teams),
        }
        self.team_changed(slot);
    }

    pub fn delete_char(&mut self, slot: TeamSlot) {
        let AppState {
            teams,
            home_input,
            away_input,
            ..
        } = &mut self.state;
        match slot {
            TeamSlot::Home => home_input.pop_char(teams),
            TeamSlot::Away => away_input.pop_char(teams),
        }
        self.team_changed(slot);
    }

    /// Replaces the whole field text, as a paste would.
    pub fn set_text(&mut self, slot: TeamSlot, text: &str) {
        if self.state.team(slot) == text {
            return;
        }
        let AppState {
            teams,
            home_input,
            away_input,
            ..
        } = &mut self.state;
        match slot {
            TeamSlot::Home => home_input.on_change(text, teams),
            TeamSlot::Away => away_input.on_change(text, teams),
        }
        self.team_changed(slot);
    }

    pub fn select_suggestion(&mut self, slot: TeamSlot) -> bool {
        let before = self.state.team(slot).to_string();
        let Some(chosen) = self.state.input_mut(slot).select_highlighted() else {
            return false;
        };
        if chosen != before {
            self.team_changed(slot);
        }
        true
    }

    pub fn focus(&mut self, slot: TeamSlot) {
        let other = slot.other();
        self.state.input_mut(other).blur();
        self.state.input_mut(slot).focus();
        self.state.focus = slot;
        self.emit(StateEvent::FocusChanged(slot));
    }

    /// Applies pending blurs; call once the current input event is handled.
    pub fn settle_focus(&mut self) {
        for slot in [TeamSlot::Home, TeamSlot::Away] {
            if self.state.input_mut(slot).commit_blur() {
                self.emit(StateEvent::FocusChanged(slot));
            }
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        if self.state.screen == screen {
            return;
        }
        self.state.screen = screen;
        self.emit(StateEvent::ScreenChanged(screen));
        if screen == Screen::Upcoming
            && self.state.listing.is_empty()
            && !self.state.listing_loading
        {
            self.refresh_prediction_list();
        }
    }

    /// Moves the dropdown highlight in `slot` by one row.
    pub fn move_highlight(&mut self, slot: TeamSlot, down: bool) {
        let input = self.state.input_mut(slot);
        if down {
            input.highlight_next();
        } else {
            input.highlight_prev();
        }
        self.emit(StateEvent::HighlightChanged(slot));
    }

    pub fn move_listing_selection(&mut self, down: bool) {
        let before = self.state.listing_selected;
        if down {
            self.state.select_listing_next();
        } else {
            self.state.select_listing_prev();
        }
        if self.state.listing_selected != before {
            self.emit(StateEvent::ListingChanged);
        }
    }

    pub fn log(&mut self, msg: impl Into<String>) {
        self.state.push_log(msg);
        self.emit(StateEvent::Logged);
    }

    fn team_changed(&mut self, slot: TeamSlot) {
        self.emit(StateEvent::TeamChanged(slot));
        let team = self.state.team(slot).to_string();
        match self.state.logos.request(slot, &team) {
            Some(cmd) => {
                if !self.send(cmd) {
                    self.state.logos.clear(slot);
                    self.emit(StateEvent::LogoChanged(slot));
                }
            }
            None => self.emit(StateEvent::LogoChanged(slot)),
        }
    }

    /// Predicts for the teams currently in the two fields.
    pub fn predict(&mut self) -> Result<u64, PredictError> {
        let home = self.state.team(TeamSlot::Home).to_string();
        let away = self.state.team(TeamSlot::Away).to_string();
        self.predict_teams(&home, &away)
    }

    /// Validates locally, then starts a new round. Invalid input leaves the
    /// phase and any shown result untouched and sends nothing.
    pub fn predict_teams(&mut self, home: &str, away: &str) -> Result<u64, PredictError> {
        let request = match PredictionRequest::validated(home, away) {
            Ok(request) => request,
            Err(err) => {
                self.state.error = Some(err.clone());
                self.emit(StateEvent::Rejected(err.clone()));
                return Err(err);
            }
        };

        let from = self.state.phase;
        let generation = self.state.begin_prediction(request.clone());
        info!(generation, home = %request.home_team, away = %request.away_team, "prediction requested");
        self.emit(StateEvent::Phase {
            from,
            to: WorkflowPhase::AwaitingPrediction,
        });

        if !self.send(ProviderCommand::Predict {
            generation,
            request,
        }) {
            let failed = Delta::PredictionSettled {
                generation,
                result: Err("provider unavailable".to_string()),
            };
            if let Some(event) = apply_delta(&mut self.state, failed) {
                self.emit(event);
            }
        }
        Ok(generation)
    }

    /// Folds in every report that has arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(delta) = self.delta_rx.try_recv() {
            if let Some(event) = apply_delta(&mut self.state, delta) {
                debug!(?event, "state changed");
                self.emit(event);
                applied += 1;
            }
        }
        applied
    }
}
