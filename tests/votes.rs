use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use fc_predictor::votes::{
    FileVoteStorage, MemoryVoteStorage, VOTES_KEY, Vote, VoteStorage, VoteStore,
};

/// Storage that can be told to fail and records every write.
#[derive(Clone, Default)]
struct FlakyStorage {
    record: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<usize>>,
    fail_reads: bool,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStorage {
    fn failing_writes() -> Self {
        let storage = Self::default();
        storage.set_write_failure(true);
        storage
    }

    fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn durable(&self) -> Option<String> {
        self.record.lock().expect("record lock").clone()
    }
}

impl VoteStorage for FlakyStorage {
    fn read(&self, _key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(anyhow!("storage offline"));
        }
        Ok(self.record.lock().expect("record lock").clone())
    }

    fn write(&mut self, _key: &str, value: &str) -> Result<()> {
        *self.writes.lock().expect("writes lock") += 1;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("quota exceeded"));
        }
        *self.record.lock().expect("record lock") = Some(value.to_string());
        Ok(())
    }
}

#[test]
fn repeated_vote_is_idempotent_and_later_vote_overwrites() {
    let storage = FlakyStorage::default();
    let mut store = VoteStore::load(Box::new(storage.clone()));

    assert!(store.record_vote(7, Vote::Home));
    assert!(!store.record_vote(7, Vote::Home));
    assert_eq!(store.get_vote(7), Some(Vote::Home));
    assert_eq!(*storage.writes.lock().expect("writes lock"), 1);

    assert!(store.record_vote(7, Vote::Away));
    assert_eq!(store.get_vote(7), Some(Vote::Away));
    assert_eq!(store.len(), 1);
}

#[test]
fn every_write_mirrors_the_whole_map() {
    let storage = FlakyStorage::default();
    let mut store = VoteStore::load(Box::new(storage.clone()));
    store.record_vote(3, Vote::Home);
    store.record_vote(11, Vote::Away);

    let raw = storage.durable().expect("written");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed, serde_json::json!({"3": "H", "11": "A"}));
}

#[test]
fn malformed_record_loads_empty() {
    let storage = MemoryVoteStorage::with_record(VOTES_KEY, "{not json");
    let store = VoteStore::load(Box::new(storage));
    assert!(store.is_empty());
    assert_eq!(store.get_vote(1), None);
}

#[test]
fn unreadable_storage_loads_empty() {
    let storage = FlakyStorage {
        fail_reads: true,
        ..FlakyStorage::default()
    };
    let store = VoteStore::load(Box::new(storage));
    assert!(store.is_empty());
}

#[test]
fn write_failure_keeps_session_state() {
    let storage = FlakyStorage::failing_writes();
    let mut store = VoteStore::load(Box::new(storage.clone()));
    assert!(store.record_vote(5, Vote::Away));
    assert_eq!(store.get_vote(5), Some(Vote::Away));
    assert!(storage.durable().is_none());
}

#[test]
fn repeating_a_vote_after_a_failed_write_catches_storage_up() {
    let storage = FlakyStorage::failing_writes();
    let mut store = VoteStore::load(Box::new(storage.clone()));
    assert!(store.record_vote(5, Vote::Home));
    assert!(storage.durable().is_none());

    storage.set_write_failure(false);
    assert!(!store.record_vote(5, Vote::Home));
    assert_eq!(*storage.writes.lock().expect("writes lock"), 2);

    let reloaded = VoteStore::load(Box::new(storage.clone()));
    assert_eq!(reloaded.get_vote(5), Some(Vote::Home));

    // Back in sync, so the next repeat is a no-op again.
    assert!(!store.record_vote(5, Vote::Home));
    assert_eq!(*storage.writes.lock().expect("writes lock"), 2);
}

#[test]
fn file_storage_survives_reload() {
    let dir = tempfile::tempdir().expect("temp dir");
    let data_dir = dir.path().join("nested");
    {
        let mut store = VoteStore::load(Box::new(FileVoteStorage::new(&data_dir)));
        store.record_vote(42, Vote::Home);
        store.record_vote(43, Vote::Away);
    }
    let storage = FileVoteStorage::new(&data_dir);
    assert!(storage.path_for(VOTES_KEY).ends_with("football_votes.json"));
    let store = VoteStore::load(Box::new(storage));
    assert_eq!(store.get_vote(42), Some(Vote::Home));
    assert_eq!(store.get_vote(43), Some(Vote::Away));
}

#[test]
fn file_storage_reads_existing_record_written_elsewhere() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("football_votes.json"), r#"{"9": "A", "10": "H"}"#)
        .expect("seed record");
    let store = VoteStore::load(Box::new(FileVoteStorage::new(dir.path())));
    assert_eq!(store.get_vote(9), Some(Vote::Away));
    assert_eq!(store.get_vote(10), Some(Vote::Home));
}
