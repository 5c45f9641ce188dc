//! Decoding of `/matches.ics` query parameters into fetch jobs.
//!
//! One request can carry several jobs: unprefixed parameters form one job, and
//! `0_url`, `1_url`, ... start further ones whose other parameters share the prefix.

use std::collections::HashMap;

use crate::error::{CalendarError, Result};
use crate::types::{FetchJob, FetchOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Ics,
    Json,
}

impl OutputFormat {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        match params.get("output_format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Ics,
        }
    }
}

fn present(params: &HashMap<String, String>, key: &str) -> bool {
    params.get(key).is_some_and(|v| !v.is_empty())
}

pub fn list_prefixes(params: &HashMap<String, String>) -> Vec<String> {
    let mut prefixes = Vec::new();
    if present(params, "url") {
        prefixes.push(String::new());
    }
    // Some callers number jobs from 0, others from 1.
    if present(params, "0_url") {
        prefixes.push("0_".to_string());
    }
    let mut index = 1;
    while present(params, &format!("{}_url", index)) {
        prefixes.push(format!("{}_", index));
        index += 1;
    }
    prefixes
}

/// Reads the url and options stored under `prefix`.
pub fn options_from_query(
    params: &HashMap<String, String>,
    prefix: &str,
) -> Result<(Option<String>, FetchOptions)> {
    let get = |name: &str| {
        params
            .get(&format!("{}{}", prefix, name))
            .filter(|v| !v.is_empty())
            .cloned()
    };
    let flag = |name: &str| get(name).as_deref() == Some("true");

    let past_match_allow_seconds = match get("past_match_allow_seconds") {
        Some(raw) => Some(
            raw.trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs >= 0)
                .ok_or_else(|| {
                    CalendarError::InvalidRequest(format!(
                        "{}past_match_allow_seconds must be a non-negative number of seconds, got '{}'",
                        prefix, raw
                    ))
                })?,
        ),
        None => None,
    };

    let options = FetchOptions {
        competition_regex: get("competition_regex"),
        teams_regex: get("teams_regex"),
        teams_regex_use_fullnames: flag("teams_regex_use_fullnames"),
        condition_is_or: flag("condition_is_or"),
        match_both_teams: flag("match_both_teams"),
        ignore_tbd: flag("ignore_tbd"),
        past_match_allow_seconds,
        expect_missing_teams: flag("expect_missing_teams"),
        allow_missing_teams: flag("allow_missing_teams"),
        verbose: flag("verbose"),
    };
    Ok((get("url"), options))
}

/// Rejects a missing URL or one outside the allowed site before anything is fetched.
pub fn validate(url: Option<&str>, allowed_prefix: &str) -> Result<String> {
    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CalendarError::InvalidRequest("Missing url query param".to_string()))?;
    if !url.starts_with(allowed_prefix) {
        return Err(CalendarError::InvalidRequest(format!(
            "Use a URL starting with {}",
            allowed_prefix
        )));
    }
    Ok(url.to_string())
}

pub fn jobs_from_query(params: &HashMap<String, String>, allowed_prefix: &str) -> Result<Vec<FetchJob>> {
    let prefixes = list_prefixes(params);
    if prefixes.is_empty() {
        return Err(CalendarError::InvalidRequest("Missing url query param".to_string()));
    }
    prefixes
        .iter()
        .map(|prefix| {
            let (url, options) = options_from_query(params, prefix)?;
            let url = validate(url.as_deref(), allowed_prefix)?;
            Ok(FetchJob::new(url, options))
        })
        .collect()
}
