//! Device-local persistence: a string key-value store plus the JSON layouts
//! kept in it.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::GameState;

/// Submissions that failed every attempt, one entry per match.
pub const PENDING_SUBMISSIONS_KEY: &str = "pendingSubmissions";
/// Submissions waiting for connectivity, oldest first.
pub const SUBMISSION_QUEUE_KEY: &str = "scoreSubmissionQueue";
/// Live game state saved when the device goes offline mid-match.
pub const OFFLINE_GAME_STATE_KEY: &str = "offlineGameState";

/// String storage supplied by the host (`localStorage` in the browser).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: String) {
        (**self).put(key, value)
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Reads a JSON array stored under `key`. A missing key is an empty list.
pub fn load_list<T, S>(store: &S, key: &str) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key) {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Writes `items` as a JSON array. An empty list removes the key.
pub fn save_list<T, S>(store: &mut S, key: &str, items: &[T]) -> Result<(), StorageError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    if items.is_empty() {
        store.remove(key);
        return Ok(());
    }
    store.put(key, serde_json::to_string(items)?);
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    crc32: u32,
    state: String,
}

pub fn save_game_state<S>(store: &mut S, state: &GameState) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let body = serde_json::to_string(state)?;
    let snapshot = Snapshot {
        crc32: crc32fast::hash(body.as_bytes()),
        state: body,
    };
    store.put(OFFLINE_GAME_STATE_KEY, serde_json::to_string(&snapshot)?);
    Ok(())
}

/// Loads the offline snapshot, if any. The entry is left in place.
pub fn restore_game_state<S>(store: &S) -> Result<Option<GameState>, StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let Some(json) = store.get(OFFLINE_GAME_STATE_KEY) else {
        return Ok(None);
    };
    let snapshot: Snapshot = serde_json::from_str(&json)?;
    let actual = crc32fast::hash(snapshot.state.as_bytes());
    if actual != snapshot.crc32 {
        return Err(StorageError::ChecksumMismatch {
            expected: snapshot.crc32,
            actual,
        });
    }
    Ok(Some(serde_json::from_str(&snapshot.state)?))
}

pub fn clear_game_state<S>(store: &mut S)
where
    S: KeyValueStore + ?Sized,
{
    store.remove(OFFLINE_GAME_STATE_KEY);
}
