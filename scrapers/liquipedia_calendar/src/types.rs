use serde::{Deserialize, Serialize};

/// Normalised stand-in for an opponent that is not decided yet.
pub const PLACEHOLDER: &str = "???";
pub const PLACEHOLDER_FULL_NAME: &str = "??? (to be determined)";
/// Literal the source pages use for undecided opponents.
pub const SOURCE_PLACEHOLDER: &str = "TBD";

pub const DEFAULT_STALE_WINDOW_SECS: i64 = 2 * 3600;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opponent {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub url: Option<String>,
    pub logo: Option<String>,
}

impl Opponent {
    /// Name used by the team filter: canonical name when asked for and present, display name otherwise.
    pub fn filter_name(&self, use_full_name: bool) -> Option<&str> {
        if use_full_name {
            if let Some(full) = self.full_name.as_deref() {
                return Some(full);
            }
        }
        self.name.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.full_name.as_deref().or(self.name.as_deref())
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.as_deref() == Some(PLACEHOLDER)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerSide {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[default]
    #[serde(rename = "")]
    Undecided,
}

impl WinnerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinnerSide::Left => "left",
            WinnerSide::Right => "right",
            WinnerSide::Undecided => "",
        }
    }
}

/// One scheduled match, built fresh per fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub uid: String,
    pub start_timestamp: i64,
    pub left: Opponent,
    pub right: Opponent,
    pub competition: String,
    pub competition_url: Option<String>,
    pub descriptor: Option<String>,
    pub descriptor_more_info: Option<String>,
    pub winner_side: WinnerSide,
    pub summary: String,
    pub description: String,
    pub is_missing_teams: bool,
}

/// Per-request configuration. Every field defaults to "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub competition_regex: Option<String>,
    pub teams_regex: Option<String>,
    pub teams_regex_use_fullnames: bool,
    pub condition_is_or: bool,
    pub match_both_teams: bool,
    pub ignore_tbd: bool,
    pub past_match_allow_seconds: Option<i64>,
    pub expect_missing_teams: bool,
    pub allow_missing_teams: bool,
    pub verbose: bool,
}

impl FetchOptions {
    /// Options used when extracting records that will be cached and filtered later.
    pub fn permissive() -> Self {
        Self {
            expect_missing_teams: true,
            ..Self::default()
        }
    }

    /// Zero counts as unset, like any other absent value.
    pub fn stale_window_secs(&self) -> i64 {
        match self.past_match_allow_seconds {
            Some(secs) if secs != 0 => secs,
            _ => DEFAULT_STALE_WINDOW_SECS,
        }
    }

    pub fn competition_pattern(&self) -> &str {
        self.competition_regex.as_deref().unwrap_or("")
    }

    pub fn teams_pattern(&self) -> &str {
        self.teams_regex.as_deref().unwrap_or("")
    }

    /// Presence of both opponents is not required.
    pub fn skips_presence_check(&self) -> bool {
        self.expect_missing_teams || self.allow_missing_teams
    }
}

/// One source URL with the options to apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchJob {
    pub url: String,
    #[serde(default)]
    pub options: FetchOptions,
}

impl FetchJob {
    pub fn new(url: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }
}
