use fc_predictor::state::{
    AppState, Delta, MatchDetails, Outcome, PredictError, PredictionRequest, PredictionResult,
    Probabilities, StateEvent, TeamSlot, WorkflowPhase, apply_delta,
};

fn request() -> PredictionRequest {
    PredictionRequest::validated("Arsenal", "Chelsea").expect("valid request")
}

fn result() -> PredictionResult {
    PredictionResult {
        outcome: Outcome::HomeWin,
        score: None,
        probabilities: None,
    }
}

#[test]
fn details_before_prediction_are_ignored() {
    let mut state = AppState::new();
    let generation = state.begin_prediction(request());

    let event = apply_delta(
        &mut state,
        Delta::DetailsSettled {
            generation,
            result: Ok(MatchDetails::default()),
        },
    );

    assert!(event.is_none());
    assert_eq!(state.phase, WorkflowPhase::AwaitingPrediction);
    assert!(state.details.is_none());
}

#[test]
fn prediction_for_old_generation_is_ignored() {
    let mut state = AppState::new();
    let old = state.begin_prediction(request());
    let current = state.begin_prediction(request());
    assert_eq!(current, old + 1);

    let event = apply_delta(
        &mut state,
        Delta::PredictionSettled {
            generation: old,
            result: Ok(result()),
        },
    );
    assert!(event.is_none());
    assert!(state.prediction.is_none());
    assert_eq!(state.phase, WorkflowPhase::AwaitingPrediction);
}

#[test]
fn settled_prediction_moves_straight_to_awaiting_details() {
    let mut state = AppState::new();
    let generation = state.begin_prediction(request());

    let event = apply_delta(
        &mut state,
        Delta::PredictionSettled {
            generation,
            result: Ok(result()),
        },
    );

    assert_eq!(
        event,
        Some(StateEvent::Phase {
            from: WorkflowPhase::AwaitingPrediction,
            to: WorkflowPhase::AwaitingDetails,
        })
    );
    assert!(state.details_loading());
    assert!(!state.is_predicting());
    assert!(state.prediction.is_some());
}

#[test]
fn skewed_probabilities_are_logged_but_kept() {
    let mut state = AppState::new();
    let generation = state.begin_prediction(request());
    let mut skewed = result();
    skewed.probabilities = Some(Probabilities {
        home_win: 0.9,
        draw: 0.5,
        away_win: 0.1,
    });

    apply_delta(
        &mut state,
        Delta::PredictionSettled {
            generation,
            result: Ok(skewed),
        },
    );

    assert!(state.prediction.as_ref().is_some_and(|p| p.probabilities.is_some()));
    assert!(state.logs.iter().any(|l| l.contains("do not sum to 1")));
}

#[test]
fn team_list_arrival_clears_team_list_error() {
    let mut state = AppState::new();
    apply_delta(&mut state, Delta::TeamsFailed("refused".to_string()));
    assert_eq!(state.error, Some(PredictError::TeamsUnavailable));

    let event = apply_delta(&mut state, Delta::SetTeams(vec!["Arsenal".to_string()]));
    assert_eq!(event, Some(StateEvent::TeamsLoaded(1)));
    assert!(state.error.is_none());
    assert!(state.teams_loaded);
}

#[test]
fn logo_for_unknown_generation_is_ignored() {
    let mut state = AppState::new();
    let event = apply_delta(
        &mut state,
        Delta::LogoSettled {
            slot: TeamSlot::Home,
            generation: 5,
            logo_url: Some("x.png".to_string()),
        },
    );
    assert!(event.is_none());
    assert_eq!(state.logos.logo(TeamSlot::Home), "");
}

#[test]
fn listing_failure_is_kept_apart_from_prediction_errors() {
    let mut state = AppState::new();
    state.listing_loading = true;
    apply_delta(&mut state, Delta::PredictionListFailed("http 502".to_string()));
    assert!(!state.listing_loading);
    assert_eq!(state.listing_error.as_deref(), Some("http 502"));
    assert!(state.error.is_none());
}
