use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use crate::error::{CalendarError, Result};
use crate::types::{EventRecord, FetchOptions};

/// A named rejection predicate. `accepts` returning false rejects the record.
pub struct Rule {
    pub name: &'static str,
    pub accepts: fn(&FilterEngine, &EventRecord) -> bool,
}

/// Every rule is independent; order only decides which name gets reported.
pub const RULES: [Rule; 4] = [
    Rule {
        name: "recency",
        accepts: FilterEngine::is_recent,
    },
    Rule {
        name: "presence",
        accepts: FilterEngine::has_opponents,
    },
    Rule {
        name: "placeholder",
        accepts: FilterEngine::is_decided,
    },
    Rule {
        name: "regex",
        accepts: FilterEngine::matches_patterns,
    },
];

pub struct FilterEngine {
    options: FetchOptions,
    competition: Option<Regex>,
    teams: Option<Regex>,
    now: i64,
}

impl FilterEngine {
    /// Compiles the option patterns. A pattern that does not compile is the caller's mistake.
    pub fn new(options: &FetchOptions, now: i64) -> Result<Self> {
        Ok(Self {
            competition: compile("competition_regex", options.competition_pattern())?,
            teams: compile("teams_regex", options.teams_pattern())?,
            options: options.clone(),
            now,
        })
    }

    /// Name of the first rule rejecting `record`, if any.
    pub fn rejection(&self, record: &EventRecord) -> Option<&'static str> {
        RULES
            .iter()
            .find(|rule| !(rule.accepts)(self, record))
            .map(|rule| rule.name)
    }

    pub fn accepts(&self, record: &EventRecord) -> bool {
        self.rejection(record).is_none()
    }

    pub fn apply(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        records
            .into_iter()
            .filter(|record| match self.rejection(record) {
                None => true,
                Some(rule) => {
                    if self.options.verbose {
                        info!(uid = %record.uid, rule, "Rejected match");
                    } else {
                        debug!(uid = %record.uid, rule, "Rejected match");
                    }
                    false
                }
            })
            .collect()
    }

    fn is_recent(&self, record: &EventRecord) -> bool {
        record.start_timestamp >= self.now.saturating_sub(self.options.stale_window_secs())
    }

    fn has_opponents(&self, record: &EventRecord) -> bool {
        self.options.skips_presence_check()
            || (record.left.name.is_some() && record.right.name.is_some())
    }

    fn is_decided(&self, record: &EventRecord) -> bool {
        !(self.options.ignore_tbd && record.left.is_placeholder() && record.right.is_placeholder())
    }

    fn matches_patterns(&self, record: &EventRecord) -> bool {
        let competition_ok = self.competition_matches(record);
        let teams_ok = self.options.expect_missing_teams || self.teams_match(record);
        if self.options.condition_is_or {
            competition_ok || teams_ok
        } else {
            competition_ok && teams_ok
        }
    }

    pub fn competition_matches(&self, record: &EventRecord) -> bool {
        self.competition
            .as_ref()
            .map_or(true, |re| re.is_match(&record.competition))
    }

    /// Either opponent matching suffices unless both are required.
    pub fn teams_match(&self, record: &EventRecord) -> bool {
        let Some(re) = &self.teams else {
            return true;
        };
        let use_full = self.options.teams_regex_use_fullnames;
        let left_ok = record.left.filter_name(use_full).is_some_and(|n| re.is_match(n));
        let right_ok = record.right.filter_name(use_full).is_some_and(|n| re.is_match(n));

        if self.options.match_both_teams {
            left_ok && right_ok
        } else {
            left_ok || right_ok
        }
    }
}

fn compile(field: &str, pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| CalendarError::InvalidRequest(format!("Invalid {}: {}", field, e)))
}
