use tracing::debug;

use crate::config::LINK_BASE;
use crate::types::FetchOptions;

/// Options a game forces on every request targeting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcedOptions {
    pub expect_missing_teams: bool,
    pub allow_missing_teams: bool,
}

impl EnforcedOptions {
    const NONE: Self = Self {
        expect_missing_teams: false,
        allow_missing_teams: false,
    };
    const EXPECT_MISSING: Self = Self {
        expect_missing_teams: true,
        allow_missing_teams: false,
    };
    const ALLOW_MISSING: Self = Self {
        expect_missing_teams: false,
        allow_missing_teams: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub enforced: EnforcedOptions,
}

impl GameDescriptor {
    /// Canonical match listing page.
    pub fn url(&self) -> String {
        format!("{}/{}/Liquipedia:Matches", LINK_BASE, self.id)
    }

    /// Prefix shared by every page of this game's wiki.
    pub fn base_url(&self) -> String {
        format!("{}/{}/", LINK_BASE, self.id)
    }
}

const fn game(id: &'static str, name: &'static str, enforced: EnforcedOptions) -> GameDescriptor {
    GameDescriptor { id, name, enforced }
}

pub static SUPPORTED_GAMES: &[GameDescriptor] = &[
    game("rocketleague", "Rocket League", EnforcedOptions::NONE),
    game("counterstrike", "Counter-Strike", EnforcedOptions::NONE),
    game("dota2", "Dota 2", EnforcedOptions::NONE),
    game("leagueoflegends", "League of Legends", EnforcedOptions::NONE),
    game("valorant", "VALORANT", EnforcedOptions::NONE),
    game("overwatch", "Overwatch", EnforcedOptions::NONE),
    game("starcraft2", "StarCraft II", EnforcedOptions::NONE),
    game("rainbowsix", "Rainbow Six", EnforcedOptions::NONE),
    game("fighters", "Fighting Games", EnforcedOptions::NONE),
    game("smash", "Smash Bros", EnforcedOptions::NONE),
    game("hearthstone", "Hearthstone", EnforcedOptions::NONE),
    game("apexlegends", "Apex Legends", EnforcedOptions::EXPECT_MISSING),
    game("pubg", "PUBG", EnforcedOptions::EXPECT_MISSING),
    game("pubgmobile", "PUBG Mobile", EnforcedOptions::EXPECT_MISSING),
    game("simracing", "Sim Racing", EnforcedOptions::EXPECT_MISSING),
    game("trackmania", "Trackmania", EnforcedOptions::ALLOW_MISSING),
    game("autochess", "Auto Chess", EnforcedOptions::ALLOW_MISSING),
    game("naraka", "Naraka: Bladepoint", EnforcedOptions::ALLOW_MISSING),
    game("tft", "Teamfight Tactics", EnforcedOptions::ALLOW_MISSING),
    game("underlords", "Dota Underlords", EnforcedOptions::ALLOW_MISSING),
];

pub fn find_by_url(url: &str) -> Option<&'static GameDescriptor> {
    SUPPORTED_GAMES.iter().find(|g| url.starts_with(&g.base_url()))
}

/// The requested URL first, then its game's listing page when that is a different page.
pub fn url_candidates(url: &str) -> Vec<String> {
    let mut candidates = vec![url.to_string()];
    if let Some(game) = find_by_url(url) {
        let canonical = game.url();
        if canonical != url {
            candidates.push(canonical);
        }
    }
    candidates
}

/// Applies the overrides of the game owning `url`; overrides win over caller values.
pub fn enforce(url: &str, mut options: FetchOptions) -> FetchOptions {
    if let Some(game) = find_by_url(url) {
        if game.enforced != EnforcedOptions::NONE {
            debug!(game = game.name, enforced = ?game.enforced, "Applying game overrides");
        }
        if game.enforced.expect_missing_teams {
            options.expect_missing_teams = true;
        }
        if game.enforced.allow_missing_teams {
            options.allow_missing_teams = true;
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_candidates_adds_listing_page() {
        let candidates = url_candidates("https://liquipedia.net/rocketleague/RLCS/2025");
        assert_eq!(
            candidates,
            vec![
                "https://liquipedia.net/rocketleague/RLCS/2025".to_string(),
                "https://liquipedia.net/rocketleague/Liquipedia:Matches".to_string(),
            ]
        );
    }

    #[test]
    fn test_url_candidates_for_listing_page_itself() {
        let url = "https://liquipedia.net/dota2/Liquipedia:Matches";
        assert_eq!(url_candidates(url), vec![url.to_string()]);
    }

    #[test]
    fn test_url_candidates_unknown_game() {
        let url = "https://liquipedia.net/unknowngame/Liquipedia:Matches";
        assert_eq!(url_candidates(url).len(), 1);
    }

    #[test]
    fn test_prefix_does_not_match_longer_ids() {
        // "pubg" must not claim pubgmobile pages.
        let game = find_by_url("https://liquipedia.net/pubgmobile/Liquipedia:Matches").unwrap();
        assert_eq!(game.id, "pubgmobile");
    }

    #[test]
    fn test_enforced_overrides() {
        let options = enforce("https://liquipedia.net/pubg/Liquipedia:Matches", FetchOptions::default());
        assert!(options.expect_missing_teams);

        let options = enforce("https://liquipedia.net/tft/Liquipedia:Matches", FetchOptions::default());
        assert!(options.allow_missing_teams);
        assert!(!options.expect_missing_teams);

        let options = enforce("https://liquipedia.net/rocketleague/Liquipedia:Matches", FetchOptions::default());
        assert_eq!(options, FetchOptions::default());
    }
}
