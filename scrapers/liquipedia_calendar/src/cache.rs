use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::types::EventRecord;

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<EventRecord>,
    expires_at: i64,
}

/// Extracted records per source URL, valid for a fixed TTL.
///
/// Expired entries are never evicted; they read as absent and get overwritten by the next `put`.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    ttl_secs: i64,
}

impl ResultCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl_secs,
        }
    }

    pub fn get(&self, url: &str, now: i64) -> Option<Vec<EventRecord>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(url)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.records.clone())
    }

    pub fn put(&self, url: &str, records: Vec<EventRecord>, now: i64) {
        let entry = CacheEntry {
            records,
            expires_at: now + self.ttl_secs,
        };
        self.entries.lock().unwrap().insert(url.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Opponent, WinnerSide};

    fn record(uid: &str) -> EventRecord {
        EventRecord {
            uid: uid.to_string(),
            start_timestamp: 0,
            left: Opponent::default(),
            right: Opponent::default(),
            competition: String::new(),
            competition_url: None,
            descriptor: None,
            descriptor_more_info: None,
            winner_side: WinnerSide::Undecided,
            summary: String::new(),
            description: String::new(),
            is_missing_teams: true,
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResultCache::new(299);
        cache.put("https://liquipedia.net/a", vec![record("x")], 1000);
        let hit = cache.get("https://liquipedia.net/a", 1298).unwrap();
        assert_eq!(hit[0].uid, "x");
        assert!(cache.get("https://liquipedia.net/b", 1000).is_none());
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let cache = ResultCache::new(299);
        cache.put("u", vec![record("x")], 1000);
        assert!(cache.get("u", 1299).is_none());
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = ResultCache::new(60);
        cache.put("u", vec![record("old")], 0);
        cache.put("u", vec![record("new")], 10);
        assert_eq!(cache.get("u", 20).unwrap()[0].uid, "new");
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ResultCache::new(60);
        let handle = cache.clone();
        handle.put("u", Vec::new(), 0);
        assert!(cache.get("u", 0).is_some());
    }
}
