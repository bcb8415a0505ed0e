use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const VOTES_KEY: &str = "football_votes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "A")]
    Away,
}

impl Vote {
    pub fn code(self) -> &'static str {
        match self {
            Vote::Home => "H",
            Vote::Away => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(Vote::Home),
            "A" => Some(Vote::Away),
            _ => None,
        }
    }
}

/// Durable key/value backend for small string records.
pub trait VoteStorage: Send {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per record under `dir`.
#[derive(Debug, Clone)]
pub struct FileVoteStorage {
    dir: PathBuf,
}

impl FileVoteStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl VoteStorage for FileVoteStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        Ok(Some(raw))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.path_for(key);
        write_atomic(&path, value)
    }
}

fn write_atomic(path: &Path, value: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, value).context("write vote record")?;
    fs::rename(&tmp, path).context("swap vote record")?;
    Ok(())
}

/// Session-only storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryVoteStorage {
    entries: HashMap<String, String>,
}

impl MemoryVoteStorage {
    pub fn with_record(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self { entries }
    }
}

impl VoteStorage for MemoryVoteStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Votes per match id. The in-memory map is authoritative; storage is a
/// write-through mirror of the whole map.
pub struct VoteStore {
    votes: BTreeMap<u64, Vote>,
    storage: Box<dyn VoteStorage>,
    // Set while the last write-through failed; the next vote retries it.
    dirty: bool,
}

impl VoteStore {
    /// Never fails: unreadable or malformed records start an empty map.
    pub fn load(storage: Box<dyn VoteStorage>) -> Self {
        let votes = match storage.read(VOTES_KEY) {
            Ok(Some(raw)) => parse_votes(&raw).unwrap_or_else(|| {
                warn!("vote record is malformed, starting empty");
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "vote record unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self {
            votes,
            storage,
            dirty: false,
        }
    }

    /// Returns true when the map changed. Write failures are logged only;
    /// a repeated vote after a failed write retries the mirror.
    pub fn record_vote(&mut self, match_id: u64, vote: Vote) -> bool {
        let changed = self.votes.insert(match_id, vote) != Some(vote);
        if !changed && !self.dirty {
            return false;
        }
        match self.persist() {
            Ok(()) => self.dirty = false,
            Err(err) => {
                self.dirty = true;
                warn!(match_id, error = %format!("{err:#}"), "vote not persisted");
            }
        }
        changed
    }

    pub fn get_vote(&self, match_id: u64) -> Option<Vote> {
        self.votes.get(&match_id).copied()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.votes).context("serialize votes")?;
        self.storage.write(VOTES_KEY, &json)
    }
}

/// Parses `{"<id>": "H"|"A", ...}`. Entries with a non-numeric id or an
/// unknown code are skipped; anything that is not a JSON object is `None`.
pub fn parse_votes(raw: &str) -> Option<BTreeMap<u64, Vote>> {
    let root: Value = serde_json::from_str(raw.trim()).ok()?;
    let map = root.as_object()?;
    let votes = map
        .iter()
        .filter_map(|(id, code)| {
            let id = id.trim().parse::<u64>().ok()?;
            let vote = Vote::from_code(code.as_str()?)?;
            Some((id, vote))
        })
        .collect();
    Some(votes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_bad_entries() {
        let votes = parse_votes(r#"{"12":"H","x":"A","13":"D","14":"A"}"#).expect("object");
        assert_eq!(votes.len(), 2);
        assert_eq!(votes.get(&12), Some(&Vote::Home));
        assert_eq!(votes.get(&14), Some(&Vote::Away));
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(parse_votes("{not json").is_none());
        assert!(parse_votes("[1,2]").is_none());
        assert!(parse_votes("null").is_none());
    }

    #[test]
    fn vote_codes_serialize_as_letters() {
        assert_eq!(serde_json::to_string(&Vote::Home).expect("json"), "\"H\"");
        assert_eq!(Vote::from_code("A"), Some(Vote::Away));
    }
}
