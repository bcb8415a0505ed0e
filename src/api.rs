use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use tracing::warn;

use crate::http_client::http_client;
use crate::predictions::{PredictionListing, non_empty_str, parse_predictions_json};
use crate::state::{MatchDetails, MatchRecord, Outcome, PredictionRequest, PredictionResult, Probabilities};

/// Remote services the client depends on.
pub trait PredictorApi: Send + Sync {
    fn teams(&self) -> Result<Vec<String>>;
    /// `Ok(None)` when the service knows no logo for the team.
    fn team_logo(&self, team: &str) -> Result<Option<String>>;
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;
    fn match_details(&self, request: &PredictionRequest) -> Result<MatchDetails>;
    fn predictions(&self) -> Result<Vec<PredictionListing>>;
}

pub struct HttpApi {
    client: &'static Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)?;
        let base = Url::parse(base.trim_end_matches('/'))
            .with_context(|| format!("invalid api base url: {base}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api base url cannot carry paths: {base}"));
        }
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn fetch(&self, req: RequestBuilder) -> Result<String> {
        let resp = req
            .header(USER_AGENT, "fc_predictor")
            .header(ACCEPT, "application/json")
            .send()
            .context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, body));
        }
        Ok(body)
    }
}

impl PredictorApi for HttpApi {
    fn teams(&self) -> Result<Vec<String>> {
        let body = self.fetch(self.client.get(self.endpoint(&["teams"])))?;
        parse_teams_json(&body)
    }

    fn team_logo(&self, team: &str) -> Result<Option<String>> {
        let body = self.fetch(self.client.get(self.endpoint(&["team-logo", team])))?;
        parse_team_logo_json(&body)
    }

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let body = self.fetch(self.client.post(self.endpoint(&["predict"])).json(request))?;
        parse_prediction_json(&body)
    }

    fn match_details(&self, request: &PredictionRequest) -> Result<MatchDetails> {
        let body = self.fetch(self.client.post(self.endpoint(&["match-details"])).json(request))?;
        parse_match_details_json(&body)
    }

    fn predictions(&self) -> Result<Vec<PredictionListing>> {
        let body = self.fetch(self.client.get(self.endpoint(&["predictions"])))?;
        parse_predictions_json(&body)
    }
}

pub fn parse_teams_json(raw: &str) -> Result<Vec<String>> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid teams json")?;
    let teams = root
        .get("teams")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("teams list missing"))?;
    Ok(teams
        .iter()
        .filter_map(|t| t.as_str())
        .map(str::to_string)
        .collect())
}

pub fn parse_team_logo_json(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid team logo json")?;
    Ok(non_empty_str(root.get("logoUrl")))
}

pub fn parse_prediction_json(raw: &str) -> Result<PredictionResult> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid prediction json")?;
    let label = root
        .get("prediction")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("prediction label missing"))?;
    let probabilities = root
        .get("probabilities")
        .filter(|v| !v.is_null())
        .and_then(|v| match serde_json::from_value::<Probabilities>(v.clone()) {
            Ok(p) => Some(p),
            Err(err) => {
                warn!(error = %err, "ignoring malformed probabilities");
                None
            }
        });
    Ok(PredictionResult {
        outcome: Outcome::from_label(label),
        score: non_empty_str(root.get("score")),
        probabilities,
    })
}

pub fn parse_match_details_json(raw: &str) -> Result<MatchDetails> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(MatchDetails::default());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid match details json")?;
    Ok(MatchDetails {
        head_to_head: parse_records(root.get("head_to_head")),
        home_form: parse_records(root.get("home_team_form")),
        away_form: parse_records(root.get("away_team_form")),
    })
}

fn parse_records(value: Option<&Value>) -> Vec<MatchRecord> {
    let Some(items) = value.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items.iter().filter_map(parse_record).collect()
}

fn parse_record(item: &Value) -> Option<MatchRecord> {
    Some(MatchRecord {
        date: item.get("date").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        home_team: item.get("home_team")?.as_str()?.to_string(),
        away_team: item.get("away_team")?.as_str()?.to_string(),
        home_goals: goals(item.get("home_goals"))?,
        away_goals: goals(item.get("away_goals"))?,
    })
}

/// Goal counts sometimes come through as floats (`2.0`).
fn goals(value: Option<&Value>) -> Option<u16> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return u16::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u16::MAX) {
        Some(f as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_team_names() {
        let api = HttpApi::new("http://localhost:8000/api/", Duration::from_secs(5))
            .expect("client builds");
        let url = api.endpoint(&["team-logo", "Paris SG/B"]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/team-logo/Paris%20SG%2FB");
        assert_eq!(api.endpoint(&["teams"]).as_str(), "http://localhost:8000/api/teams");
    }

    #[test]
    fn float_goals_are_accepted() {
        let rec = parse_record(&serde_json::json!({
            "date": "2023-01-01",
            "home_team": "A",
            "away_team": "B",
            "home_goals": 2.0,
            "away_goals": 1
        }))
        .expect("record parses");
        assert_eq!((rec.home_goals, rec.away_goals), (2, 1));
        assert!(goals(Some(&serde_json::json!(1.5))).is_none());
    }
}
