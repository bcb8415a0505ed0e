use std::fs;
use std::path::PathBuf;

use fc_predictor::api::{
    parse_match_details_json, parse_prediction_json, parse_team_logo_json, parse_teams_json,
};
use fc_predictor::predictions::parse_predictions_json;
use fc_predictor::state::Outcome;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_teams_fixture_skipping_non_strings() {
    let teams = parse_teams_json(&read_fixture("teams.json")).expect("fixture should parse");
    assert_eq!(teams, vec!["Arsenal", "Chelsea", "Arsenal B", "Werder Bremen"]);
}

#[test]
fn teams_without_list_is_an_error() {
    assert!(parse_teams_json(r#"{"error": "down"}"#).is_err());
    assert!(parse_teams_json("<html>").is_err());
}

#[test]
fn parses_prediction_fixture() {
    let result = parse_prediction_json(&read_fixture("predict.json")).expect("fixture should parse");
    assert_eq!(result.outcome, Outcome::HomeWin);
    assert_eq!(result.score.as_deref(), Some("2-1"));
    let probs = result.probabilities.expect("probabilities present");
    assert_eq!(probs.percent_labels(), ["55%", "25%", "20%"]);
}

#[test]
fn prediction_optional_fields_may_be_absent() {
    let result = parse_prediction_json(r#"{"prediction": "Match nul", "score": "", "probabilities": null}"#)
        .expect("minimal body should parse");
    assert_eq!(result.outcome, Outcome::Draw);
    assert!(result.score.is_none());
    assert!(result.probabilities.is_none());
    assert!(parse_prediction_json(r#"{"score": "1-0"}"#).is_err());
}

#[test]
fn incomplete_probabilities_are_dropped_not_fatal() {
    let raw = r#"{"prediction": "Victoire à domicile", "score": "1-0", "probabilities": {"home_win": 0.6, "draw": null}}"#;
    let result = parse_prediction_json(raw).expect("prediction still parses");
    assert_eq!(result.outcome, Outcome::HomeWin);
    assert_eq!(result.score.as_deref(), Some("1-0"));
    assert!(result.probabilities.is_none());
}

#[test]
fn parses_match_details_fixture() {
    let details =
        parse_match_details_json(&read_fixture("match_details.json")).expect("fixture should parse");
    assert_eq!(details.head_to_head.len(), 2);
    assert_eq!(details.head_to_head[1].home_goals, 1);
    assert_eq!(details.head_to_head[1].away_goals, 3);
    // The third form entry has no away team and is dropped.
    assert_eq!(details.home_form.len(), 2);
    assert_eq!(details.home_form[0].away_team, "Fulham");
    assert!(details.away_form.is_empty());
}

#[test]
fn match_details_null_is_empty() {
    let details = parse_match_details_json("null").expect("null should parse");
    assert!(details.head_to_head.is_empty());
    assert!(details.home_form.is_empty());
}

#[test]
fn logo_absent_or_blank_means_none() {
    assert_eq!(
        parse_team_logo_json(r#"{"logoUrl": "https://cdn/ars.png"}"#).expect("parses"),
        Some("https://cdn/ars.png".to_string())
    );
    assert_eq!(parse_team_logo_json(r#"{"logoUrl": ""}"#).expect("parses"), None);
    assert_eq!(parse_team_logo_json("{}").expect("parses"), None);
}

#[test]
fn parses_predictions_listing_fixture() {
    let rows = parse_predictions_json(&read_fixture("predictions.json")).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, Some(401638));
    assert_eq!(rows[0].teams(), Some(("Werder Bremen", "Borussia Dortmund")));
    assert_eq!(rows[0].outcome, Outcome::AwayWin);
    assert_eq!(rows[0].competition.as_deref(), Some("German Bundesliga"));
    assert_eq!(rows[1].id, Some(401639));
    assert_eq!(rows[1].score.as_deref(), Some("1-1"));
    assert!(rows[1].competition.is_none());
}

#[test]
fn predictions_error_body_is_a_failure() {
    assert!(parse_predictions_json(r#"{"error": "Modèle ou cache non chargé."}"#).is_err());
    assert!(parse_predictions_json("{}").expect("empty object").is_empty());
}
