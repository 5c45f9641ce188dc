use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{EventRecord, PLACEHOLDER, PLACEHOLDER_FULL_NAME, SOURCE_PLACEHOLDER};

pub const UID_NAMESPACE: &str = "@liquipedia-calendar";

static NOT_UID_SAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-]").unwrap());

/// Strips every character outside `[A-Za-z0-9-]`.
pub fn sanitize(value: &str) -> String {
    NOT_UID_SAFE.replace_all(value, "").into_owned()
}

/// Deterministic in (competition, timestamp, opponent 1, opponent 2).
pub fn make_uid(competition: &str, timestamp: i64, opponent1: Option<&str>, opponent2: Option<&str>) -> String {
    format!(
        "{}/{}/{}/{}{}",
        sanitize(competition),
        timestamp,
        opponent1.unwrap_or_default(),
        opponent2.unwrap_or_default(),
        UID_NAMESPACE
    )
}

pub fn normalize_name(name: String) -> String {
    if name == SOURCE_PLACEHOLDER {
        PLACEHOLDER.to_string()
    } else {
        name
    }
}

pub fn normalize_full_name(name: String) -> String {
    if name == SOURCE_PLACEHOLDER {
        PLACEHOLDER_FULL_NAME.to_string()
    } else {
        name
    }
}

/// Makes a site-relative link absolute. Links to pages that do not exist yet are dropped.
pub fn absolutize(url: &str, base: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.contains("redlink=1") {
        return None;
    }
    if url.starts_with("//") {
        Some(format!("https:{}", url))
    } else if url.starts_with('/') {
        Some(format!("{}{}", base, url))
    } else {
        Some(url.to_string())
    }
}

/// Highest-resolution candidate among `src` and the entries of `srcset`.
pub fn best_logo(src: Option<&str>, srcset: Option<&str>, base: &str) -> Option<String> {
    let mut candidates: Vec<&str> = src.into_iter().collect();
    if let Some(srcset) = srcset {
        candidates.extend(
            srcset
                .split(", ")
                .filter_map(|entry| entry.split_whitespace().next()),
        );
    }
    let best = candidates.into_iter().filter(|c| !c.is_empty()).last()?;
    absolutize(best, base)
}

/// One-line summary. The descriptor is only advertised while the match is upcoming.
pub fn make_summary(
    opponent1: Option<&str>,
    opponent2: Option<&str>,
    descriptor: Option<&str>,
    competition: &str,
    timestamp: i64,
    now: i64,
) -> String {
    let mut summary = String::new();
    if let (Some(a), Some(b)) = (opponent1, opponent2) {
        summary.push_str(&format!("{} vs {} ", a, b));
    }
    if let Some(descriptor) = descriptor.filter(|d| !d.is_empty()) {
        if timestamp > now {
            summary.push_str(&format!("({}) ", descriptor));
        }
    }
    if !competition.is_empty() {
        summary.push_str(&format!("[{}]", competition));
    }
    summary.trim_end().to_string()
}

/// Summary of an already extracted record as it should read at `now`.
pub fn summary_at(record: &EventRecord, now: i64) -> String {
    make_summary(
        record.left.name.as_deref(),
        record.right.name.as_deref(),
        record.descriptor.as_deref(),
        &record.competition,
        record.start_timestamp,
        now,
    )
}

pub fn make_description(
    opponent1: Option<&str>,
    opponent2: Option<&str>,
    descriptor: Option<&str>,
    descriptor_more_info: Option<&str>,
    competition: &str,
) -> String {
    let mut description = String::new();
    if let (Some(a), Some(b)) = (opponent1, opponent2) {
        description.push_str(&format!("{} vs {} ", a, b));
    }
    if let Some(descriptor) = descriptor.filter(|d| !d.is_empty()) {
        let detail = descriptor_more_info.filter(|d| !d.is_empty()).unwrap_or(descriptor);
        description.push_str(&format!("({}) ", detail));
    }
    if !competition.is_empty() {
        description.push_str(&format!("[{}]", competition));
    }
    description.trim_end().to_string()
}
