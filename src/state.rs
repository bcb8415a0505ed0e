use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::autocomplete::AutocompleteInput;
use crate::logo::TeamLogoResolver;
use crate::predictions::PredictionListing;

const LOG_CAPACITY: usize = 200;

pub const LABEL_HOME_WIN: &str = "Victoire à domicile";
pub const LABEL_AWAY_WIN: &str = "Victoire à l'extérieur";
pub const LABEL_DRAW: &str = "Match nul";

/// User-visible failures. Everything else degrades silently into the log ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    #[error("Please select both teams.")]
    MissingTeam,
    #[error("Please select two different teams.")]
    SameTeams,
    #[error("Prediction failed. Please try again.")]
    PredictionService,
    #[error("Could not load team list. Is the backend running?")]
    TeamsUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamSlot {
    Home,
    Away,
}

impl TeamSlot {
    pub fn other(self) -> Self {
        match self {
            TeamSlot::Home => TeamSlot::Away,
            TeamSlot::Away => TeamSlot::Home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
}

impl PredictionRequest {
    /// Builds a request only when both names are present and distinct.
    pub fn validated(home: &str, away: &str) -> Result<Self, PredictError> {
        if home.trim().is_empty() || away.trim().is_empty() {
            return Err(PredictError::MissingTeam);
        }
        if home == away {
            return Err(PredictError::SameTeams);
        }
        Ok(Self {
            home_team: home.to_string(),
            away_team: away.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
    /// Label the client has no mapping for; shown verbatim.
    Other(String),
}

impl Outcome {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            LABEL_HOME_WIN => Outcome::HomeWin,
            LABEL_AWAY_WIN => Outcome::AwayWin,
            LABEL_DRAW => Outcome::Draw,
            other => Outcome::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Outcome::HomeWin => LABEL_HOME_WIN,
            Outcome::AwayWin => LABEL_AWAY_WIN,
            Outcome::Draw => LABEL_DRAW,
            Outcome::Other(label) => label,
        }
    }

    pub fn winner(&self) -> Option<TeamSlot> {
        match self {
            Outcome::HomeWin => Some(TeamSlot::Home),
            Outcome::AwayWin => Some(TeamSlot::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl Probabilities {
    pub fn is_normalized(&self) -> bool {
        let parts = [self.home_win, self.draw, self.away_win];
        parts.iter().all(|p| p.is_finite() && *p >= 0.0)
            && (parts.iter().sum::<f64>() - 1.0).abs() <= 0.02
    }

    /// Display strings for home / draw / away, e.g. `["55%", "25%", "20%"]`.
    pub fn percent_labels(&self) -> [String; 3] {
        [
            percent_label(self.home_win),
            percent_label(self.draw),
            percent_label(self.away_win),
        ]
    }
}

pub fn percent_label(p: f64) -> String {
    format!("{}%", (p * 100.0).round() as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub outcome: Outcome,
    pub score: Option<String>,
    pub probabilities: Option<Probabilities>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u16,
    pub away_goals: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchDetails {
    pub head_to_head: Vec<MatchRecord>,
    pub home_form: Vec<MatchRecord>,
    pub away_form: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    AwaitingPrediction,
    AwaitingDetails,
    DetailsReady,
    DetailsFailed,
    PredictionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Predictor,
    Upcoming,
}

/// Emitted after every state mutation; presentation layers subscribe to these.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    Phase {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },
    Rejected(PredictError),
    TeamsLoaded(usize),
    TeamsFailed,
    TeamChanged(TeamSlot),
    LogoChanged(TeamSlot),
    FocusChanged(TeamSlot),
    HighlightChanged(TeamSlot),
    ScreenChanged(Screen),
    ListingChanged,
    Logged,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub teams: Vec<String>,
    pub teams_loaded: bool,
    pub home_input: AutocompleteInput,
    pub away_input: AutocompleteInput,
    pub focus: TeamSlot,
    pub logos: TeamLogoResolver,
    pub phase: WorkflowPhase,
    pub predict_generation: u64,
    pub request: Option<PredictionRequest>,
    pub prediction: Option<PredictionResult>,
    pub details: Option<MatchDetails>,
    pub error: Option<PredictError>,
    pub listing: Vec<PredictionListing>,
    pub listing_loading: bool,
    pub listing_error: Option<String>,
    pub listing_selected: usize,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Predictor,
            teams: Vec::new(),
            teams_loaded: false,
            home_input: AutocompleteInput::default(),
            away_input: AutocompleteInput::default(),
            focus: TeamSlot::Home,
            logos: TeamLogoResolver::default(),
            phase: WorkflowPhase::Idle,
            predict_generation: 0,
            request: None,
            prediction: None,
            details: None,
            error: None,
            listing: Vec::with_capacity(10),
            listing_loading: false,
            listing_error: None,
            listing_selected: 0,
            logs: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    pub fn input(&self, slot: TeamSlot) -> &AutocompleteInput {
        match slot {
            TeamSlot::Home => &self.home_input,
            TeamSlot::Away => &self.away_input,
        }
    }

    pub fn input_mut(&mut self, slot: TeamSlot) -> &mut AutocompleteInput {
        match slot {
            TeamSlot::Home => &mut self.home_input,
            TeamSlot::Away => &mut self.away_input,
        }
    }

    pub fn team(&self, slot: TeamSlot) -> &str {
        self.input(slot).value()
    }

    pub fn is_predicting(&self) -> bool {
        self.phase == WorkflowPhase::AwaitingPrediction
    }

    pub fn details_loading(&self) -> bool {
        self.phase == WorkflowPhase::AwaitingDetails
    }

    pub fn can_predict(&self) -> bool {
        !self.is_predicting() && !self.teams.is_empty()
    }

    /// Logo of the predicted winner, if the outcome names one and it resolved.
    pub fn winner_logo(&self) -> Option<&str> {
        let slot = self.prediction.as_ref()?.outcome.winner()?;
        let logo = self.logos.logo(slot);
        (!logo.is_empty()).then_some(logo)
    }

    /// Starts a new prediction round: bumps the generation and drops any
    /// result or details from earlier rounds together.
    pub fn begin_prediction(&mut self, request: PredictionRequest) -> u64 {
        self.predict_generation += 1;
        self.request = Some(request);
        self.prediction = None;
        self.details = None;
        self.error = None;
        self.phase = WorkflowPhase::AwaitingPrediction;
        self.predict_generation
    }

    pub fn clamp_listing_selection(&mut self) {
        if self.listing.is_empty() {
            self.listing_selected = 0;
        } else if self.listing_selected >= self.listing.len() {
            self.listing_selected = self.listing.len() - 1;
        }
    }

    pub fn select_listing_next(&mut self) {
        if self.listing.is_empty() {
            return;
        }
        self.listing_selected = (self.listing_selected + 1).min(self.listing.len() - 1);
    }

    pub fn select_listing_prev(&mut self) {
        self.listing_selected = self.listing_selected.saturating_sub(1);
    }

    pub fn selected_listing(&self) -> Option<&PredictionListing> {
        self.listing.get(self.listing_selected)
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        if self.logs.len() >= LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(msg.into());
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetTeams(Vec<String>),
    TeamsFailed(String),
    PredictionSettled {
        generation: u64,
        result: Result<PredictionResult, String>,
    },
    DetailsSettled {
        generation: u64,
        result: Result<MatchDetails, String>,
    },
    LogoSettled {
        slot: TeamSlot,
        generation: u64,
        logo_url: Option<String>,
    },
    SetPredictionList(Vec<PredictionListing>),
    PredictionListFailed(String),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    FetchTeams,
    Predict {
        generation: u64,
        request: PredictionRequest,
    },
    ResolveLogo {
        slot: TeamSlot,
        generation: u64,
        team: String,
    },
    FetchPredictionList,
}

/// Applies a worker report. Returns `None` when the report belongs to a
/// superseded generation and was discarded.
pub fn apply_delta(state: &mut AppState, delta: Delta) -> Option<StateEvent> {
    match delta {
        Delta::SetTeams(teams) => {
            let count = teams.len();
            state.teams = teams;
            state.teams_loaded = true;
            if state.error == Some(PredictError::TeamsUnavailable) {
                state.error = None;
            }
            state.push_log(format!("[INFO] Loaded {count} teams"));
            Some(StateEvent::TeamsLoaded(count))
        }
        Delta::TeamsFailed(err) => {
            warn!(error = %err, "team list unavailable");
            state.push_log(format!("[WARN] Team list error: {err}"));
            state.error = Some(PredictError::TeamsUnavailable);
            Some(StateEvent::TeamsFailed)
        }
        Delta::PredictionSettled { generation, result } => {
            if generation != state.predict_generation
                || state.phase != WorkflowPhase::AwaitingPrediction
            {
                debug!(generation, current = state.predict_generation, "stale prediction dropped");
                return None;
            }
            let from = state.phase;
            match result {
                Ok(prediction) => {
                    if let Some(probs) = prediction.probabilities
                        && !probs.is_normalized()
                    {
                        state.push_log(format!(
                            "[WARN] Probabilities do not sum to 1: {:.3}/{:.3}/{:.3}",
                            probs.home_win, probs.draw, probs.away_win
                        ));
                    }
                    state.prediction = Some(prediction);
                    state.phase = WorkflowPhase::AwaitingDetails;
                }
                Err(err) => {
                    warn!(error = %err, "prediction request failed");
                    state.push_log(format!("[WARN] Prediction error: {err}"));
                    state.prediction = None;
                    state.details = None;
                    state.error = Some(PredictError::PredictionService);
                    state.phase = WorkflowPhase::PredictionFailed;
                }
            }
            Some(StateEvent::Phase {
                from,
                to: state.phase,
            })
        }
        Delta::DetailsSettled { generation, result } => {
            if generation != state.predict_generation
                || state.phase != WorkflowPhase::AwaitingDetails
            {
                debug!(generation, current = state.predict_generation, "stale details dropped");
                return None;
            }
            let from = state.phase;
            match result {
                Ok(details) => {
                    state.details = Some(details);
                    state.phase = WorkflowPhase::DetailsReady;
                }
                Err(err) => {
                    // Diagnostics only; the prediction card stays as it is.
                    warn!(error = %err, "match details request failed");
                    state.push_log(format!("[WARN] Match details error: {err}"));
                    state.phase = WorkflowPhase::DetailsFailed;
                }
            }
            Some(StateEvent::Phase {
                from,
                to: state.phase,
            })
        }
        Delta::LogoSettled {
            slot,
            generation,
            logo_url,
        } => {
            if !state.logos.settle(slot, generation, logo_url) {
                debug!(?slot, generation, "stale logo dropped");
                return None;
            }
            Some(StateEvent::LogoChanged(slot))
        }
        Delta::SetPredictionList(listing) => {
            state.listing = listing;
            state.listing_loading = false;
            state.listing_error = None;
            state.clamp_listing_selection();
            Some(StateEvent::ListingChanged)
        }
        Delta::PredictionListFailed(err) => {
            warn!(error = %err, "prediction list unavailable");
            state.push_log(format!("[WARN] Prediction list error: {err}"));
            state.listing_loading = false;
            state.listing_error = Some(err);
            Some(StateEvent::ListingChanged)
        }
        Delta::Log(msg) => {
            state.push_log(msg);
            Some(StateEvent::Logged)
        }
    }
}
