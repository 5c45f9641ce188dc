use crate::types::{FetchJob, FetchOptions};

const ROCKET_LEAGUE_MATCHES: &str = "https://liquipedia.net/rocketleague/Liquipedia:Matches";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetMember {
    Query(FetchJob),
    Preset(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub members: Vec<PresetMember>,
}

fn rocket_league(options: FetchOptions) -> PresetMember {
    PresetMember::Query(FetchJob::new(ROCKET_LEAGUE_MATCHES, options))
}

fn competition(pattern: &str) -> FetchOptions {
    FetchOptions {
        competition_regex: Some(pattern.to_string()),
        ..Default::default()
    }
}

/// Built-in named calendars.
pub fn builtin() -> Vec<Preset> {
    vec![
        Preset {
            name: "rocketbets",
            members: vec![rocket_league(FetchOptions {
                past_match_allow_seconds: Some(30 * 24 * 3600),
                ..competition("RLCS")
            })],
        },
        Preset {
            name: "rlcs",
            members: vec![rocket_league(competition("RLCS"))],
        },
        Preset {
            name: "rlcs-worlds",
            members: vec![rocket_league(competition("RLCS.*Worlds"))],
        },
        Preset {
            name: "rlcs-major",
            members: vec![rocket_league(competition("RLCS.*Major"))],
        },
        Preset {
            name: "rlcs-fifae",
            members: vec![rocket_league(competition("FIFA"))],
        },
        Preset {
            name: "rlcs-match-s-tier",
            members: vec![rocket_league(FetchOptions {
                teams_regex: Some("^(KC|VIT|FUR|FLCN|M8|NRG|TWIS|TS)$".to_string()),
                match_both_teams: true,
                ..Default::default()
            })],
        },
        Preset {
            name: "rlcs-enjoyer",
            members: vec![
                PresetMember::Preset("rlcs-major"),
                PresetMember::Preset("rlcs-worlds"),
                PresetMember::Preset("rlcs-fifae"),
                PresetMember::Preset("rlcs-match-s-tier"),
            ],
        },
        Preset {
            name: "rocket-league",
            members: vec![PresetMember::Preset("rlcs")],
        },
    ]
}

pub fn preset(name: &str) -> Option<Preset> {
    builtin().into_iter().find(|p| p.name == name)
}

pub fn names() -> Vec<&'static str> {
    builtin().iter().map(|p| p.name).collect()
}
