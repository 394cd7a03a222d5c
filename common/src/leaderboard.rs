//! Score persistence against a sorted-set style store.
//!
//! Entries are keyed by player id; the display name travels with the entry
//! so that a rename updates the row instead of orphaning it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigContentProvider, ConfigSerializer, YamlConfigSerializer};
use crate::protocol::LeaderboardEntry;
use crate::{log, PlayerId};

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub member: String,
    pub name: String,
    pub score: u32,
}

pub trait LeaderboardStore: Send + Sync {
    /// Inserts or replaces `record.member` under `key`.
    fn upsert(&self, key: &str, record: LeaderboardRecord) -> Result<(), String>;
    fn remove(&self, key: &str, member: &str) -> Result<(), String>;
    /// Highest scores first.
    fn top(&self, key: &str, count: usize) -> Result<Vec<LeaderboardRecord>, String>;
    /// Pushes buffered writes to durable storage. May block.
    fn flush(&self) -> Result<(), String> {
        Ok(())
    }
}

type SortedSets = HashMap<String, HashMap<String, LeaderboardRecord>>;

fn ranked(set: Option<&HashMap<String, LeaderboardRecord>>, count: usize) -> Vec<LeaderboardRecord> {
    let mut records: Vec<LeaderboardRecord> = set.map(|s| s.values().cloned().collect()).unwrap_or_default();
    records.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    records.truncate(count);
    records
}

#[derive(Default)]
pub struct MemoryLeaderboardStore {
    sets: Mutex<SortedSets>,
}

impl MemoryLeaderboardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for MemoryLeaderboardStore {
    fn upsert(&self, key: &str, record: LeaderboardRecord) -> Result<(), String> {
        let mut sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        sets.entry(key.to_string()).or_default().insert(record.member.clone(), record);
        Ok(())
    }

    fn remove(&self, key: &str, member: &str) -> Result<(), String> {
        let mut sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        if let Some(set) = sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    fn top(&self, key: &str, count: usize) -> Result<Vec<LeaderboardRecord>, String> {
        let sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        Ok(ranked(sets.get(key), count))
    }
}

/// Sorted sets held in memory and written to a YAML document on `flush`.
/// Writes only mark the store dirty, so scoring never touches the disk.
pub struct YamlFileLeaderboardStore<P: ConfigContentProvider> {
    provider: P,
    sets: Mutex<SortedSets>,
    dirty: AtomicBool,
    // held across snapshot and write so flushes land in order
    write_lock: Mutex<()>,
}

impl<P: ConfigContentProvider> YamlFileLeaderboardStore<P> {
    pub fn open(provider: P) -> Result<Self, String> {
        let mut sets = SortedSets::new();
        if let Some(content) = provider.get_config_content()? {
            let document: BTreeMap<String, Vec<LeaderboardRecord>> =
                YamlConfigSerializer.deserialize(&content)?;
            for (key, records) in document {
                let set = sets.entry(key).or_default();
                for record in records {
                    set.insert(record.member.clone(), record);
                }
            }
        }
        Ok(Self {
            provider,
            sets: Mutex::new(sets),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Result<String, String> {
        let sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        let document: BTreeMap<String, Vec<LeaderboardRecord>> = sets
            .iter()
            .map(|(key, set)| (key.clone(), ranked(Some(set), set.len())))
            .collect();
        self.dirty.store(false, Ordering::Release);
        YamlConfigSerializer.serialize(&document)
    }
}

impl<P: ConfigContentProvider + Send + Sync> LeaderboardStore for YamlFileLeaderboardStore<P> {
    fn upsert(&self, key: &str, record: LeaderboardRecord) -> Result<(), String> {
        let mut sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        sets.entry(key.to_string()).or_default().insert(record.member.clone(), record);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn remove(&self, key: &str, member: &str) -> Result<(), String> {
        let mut sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        let removed = sets.get_mut(key).and_then(|set| set.remove(member)).is_some();
        if removed {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn top(&self, key: &str, count: usize) -> Result<Vec<LeaderboardRecord>, String> {
        let sets = self.sets.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        Ok(ranked(sets.get(key), count))
    }

    fn flush(&self) -> Result<(), String> {
        let _write = self.write_lock.lock().map_err(|e| format!("Leaderboard lock poisoned: {}", e))?;
        if !self.is_dirty() {
            return Ok(());
        }
        let content = self.snapshot()?;
        if let Err(e) = self.provider.set_config_content(&content) {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }
}

/// The game's view of the store: one key, and failures logged instead of
/// propagated.
#[derive(Clone)]
pub struct LeaderboardGateway {
    store: Arc<dyn LeaderboardStore>,
    key: String,
}

impl LeaderboardGateway {
    pub fn new(store: Arc<dyn LeaderboardStore>, key: String) -> Self {
        Self { store, key }
    }

    pub fn record_score(&self, player_id: &PlayerId, name: &str, score: u32) {
        if name.trim().is_empty() {
            return;
        }
        let record = LeaderboardRecord {
            member: player_id.to_string(),
            name: name.to_string(),
            score,
        };
        if let Err(e) = self.store.upsert(&self.key, record) {
            log!("Failed to record score for {} ({}): {}", name, player_id, e);
        }
    }

    pub fn remove_score(&self, player_id: &PlayerId) {
        if let Err(e) = self.store.remove(&self.key, player_id.as_str()) {
            log!("Failed to remove score for {}: {}", player_id, e);
        }
    }

    pub fn flush(&self) {
        if let Err(e) = self.store.flush() {
            log!("Failed to flush leaderboard '{}': {}", self.key, e);
        }
    }

    pub fn top_n(&self, count: usize) -> Vec<LeaderboardEntry> {
        match self.store.top(&self.key, count) {
            Ok(records) => records
                .into_iter()
                .map(|r| LeaderboardEntry {
                    name: r.name,
                    score: r.score,
                })
                .collect(),
            Err(e) => {
                log!("Failed to fetch leaderboard '{}': {}", self.key, e);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for LeaderboardGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaderboardGateway").field("key", &self.key).finish()
    }
}
