use std::collections::HashSet;

use crate::types::EventRecord;

/// Keeps the first record per uid, preserving order.
pub fn dedupe(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.uid.clone()))
        .collect()
}
