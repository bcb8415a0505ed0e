use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::state::Outcome;

const MATCH_LABEL_DELIMITER: &str = " vs ";

/// One row of the upcoming-predictions list.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionListing {
    pub id: Option<u64>,
    pub match_label: String,
    pub outcome: Outcome,
    pub confidence: String,
    pub score: Option<String>,
    pub competition: Option<String>,
    pub utc_date: Option<String>,
}

impl PredictionListing {
    pub fn teams(&self) -> Option<(&str, &str)> {
        split_match_label(&self.match_label)
    }
}

/// Splits `"Home vs Away"` on the first delimiter. A team name that itself
/// contains " vs " cannot be recovered this way.
pub fn split_match_label(label: &str) -> Option<(&str, &str)> {
    let (home, away) = label.split_once(MATCH_LABEL_DELIMITER)?;
    let (home, away) = (home.trim(), away.trim());
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

pub fn parse_predictions_json(raw: &str) -> Result<Vec<PredictionListing>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid predictions json")?;
    if let Some(err) = root.get("error").and_then(|v| v.as_str()) {
        return Err(anyhow!("service error: {err}"));
    }
    let Some(items) = root.get("predictions").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };
    Ok(items.iter().filter_map(parse_listing).collect())
}

fn parse_listing(item: &Value) -> Option<PredictionListing> {
    let match_label = item.get("match")?.as_str()?.to_string();
    let outcome = Outcome::from_label(item.get("prediction").and_then(|v| v.as_str()).unwrap_or(""));
    Some(PredictionListing {
        id: item.get("id").and_then(value_as_u64),
        match_label,
        outcome,
        confidence: item
            .get("confidence")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        score: non_empty_str(item.get("score")),
        competition: item
            .get("competition")
            .and_then(|c| non_empty_str(c.get("name"))),
        utc_date: non_empty_str(item.get("utcDate")),
    })
}

/// Ids arrive either as JSON numbers or as decimal strings.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `YYYY-MM-DD` for anything that parses as a timestamp or date, else the
/// raw text.
pub fn date_label(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%MZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.to_string();
    }
    raw.to_string()
}
