use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::normalize::{absolutize, best_logo, make_description, make_summary, make_uid};
use crate::selectors::{first_match, text_excluding};
use crate::types::{EventRecord, FetchOptions, Opponent, WinnerSide};

/// Ordered locator lists for every field of a match fragment.
///
/// Appending a locator to a chain is how a new page template gets supported.
pub mod chains {
    use once_cell::sync::Lazy;

    use crate::normalize::{normalize_full_name, normalize_name};
    use crate::selectors::{Locator, LocatorChain};

    pub static TIMESTAMP: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "timestamp",
            vec![
                Locator::attr(".timer-object", "data-timestamp"),
                Locator::attr("[data-timestamp]", "data-timestamp"),
            ],
        )
    });

    pub static OPPONENT_LEFT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "opponent_left",
            vec![
                Locator::text(".team-left span.team-template-text").then(name),
                Locator::text(".team-left a").then(name),
                Locator::text(".match-info-header > div:nth-child(1)").then(name),
            ],
        )
    });

    pub static OPPONENT_RIGHT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "opponent_right",
            vec![
                Locator::text(".team-right span.team-template-text").then(name),
                Locator::text(".team-right a").then(name),
                Locator::text(".match-info-header > div:nth-child(3)").then(name),
            ],
        )
    });

    pub static FULL_NAME_LEFT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "full_name_left",
            vec![
                Locator::attr(".team-left span[data-highlightingclass]", "data-highlightingclass")
                    .then(full_name),
                Locator::attr(".team-left .team-template-text a[title]", "title").then(full_name),
            ],
        )
    });

    pub static FULL_NAME_RIGHT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "full_name_right",
            vec![
                Locator::attr(".team-right span[data-highlightingclass]", "data-highlightingclass")
                    .then(full_name),
                Locator::attr(".team-right .team-template-text a[title]", "title").then(full_name),
            ],
        )
    });

    pub static URL_LEFT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "url_left",
            vec![
                Locator::attr(".team-left .team-template-darkmode a[href]", "href"),
                Locator::attr(".team-left .team-template-text a[href]", "href"),
            ],
        )
    });

    pub static URL_RIGHT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "url_right",
            vec![
                Locator::attr(".team-right .team-template-darkmode a[href]", "href"),
                Locator::attr(".team-right .team-template-text a[href]", "href"),
            ],
        )
    });

    /// Matches the logo `img`; `src` and `srcset` are both read from the winning node.
    pub static LOGO_LEFT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "logo_left",
            vec![
                Locator::attr(".team-left .team-template-darkmode img", "src"),
                Locator::attr(".team-left .team-template-image-icon img", "src"),
            ],
        )
    });

    pub static LOGO_RIGHT: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "logo_right",
            vec![
                Locator::attr(".team-right .team-template-darkmode img", "src"),
                Locator::attr(".team-right .team-template-image-icon img", "src"),
            ],
        )
    });

    /// Used only when the fragment has no `.match-filler`.
    pub static COMPETITION: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "competition",
            vec![
                Locator::text(".match-tournament"),
                Locator::text(".match-info-tournament"),
            ],
        )
    });

    pub static COMPETITION_URL: Lazy<LocatorChain> = Lazy::new(|| {
        LocatorChain::new(
            "competition_url",
            vec![
                Locator::attr(".match-filler a[href]", "href"),
                Locator::attr(".match-tournament a[href]", "href"),
                Locator::attr(".match-info-tournament a[href]", "href"),
            ],
        )
    });

    fn name(value: String) -> Option<String> {
        Some(normalize_name(value))
    }

    fn full_name(value: String) -> Option<String> {
        Some(normalize_full_name(value))
    }
}

/// Candidate containers for one match, tried in order against the whole document.
static FRAGMENTS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".wikitable", ".match", ".match-info"]
        .iter()
        .map(|css| Selector::parse(css).unwrap())
        .collect()
});

static FILLER: Lazy<Selector> = Lazy::new(|| Selector::parse(".match-filler").unwrap());
static COUNTDOWN: Lazy<Selector> = Lazy::new(|| Selector::parse(".match-countdown").unwrap());
static VERSUS: Lazy<Selector> = Lazy::new(|| Selector::parse(".versus").unwrap());
static VERSUS_ABBR: Lazy<Selector> = Lazy::new(|| Selector::parse(".versus abbr").unwrap());
static HEADER_LEFT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".match-info-header > div:nth-child(1)").unwrap());
static HEADER_RIGHT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".match-info-header > div:nth-child(3)").unwrap());
static SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+:[0-9]+").unwrap());

const HEADER_WINNER_CLASS: &str = "match-info-header-winner";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FragmentError {
    #[error("fragment has no start timestamp")]
    MissingTimestamp,
    #[error("invalid start timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Why a fragment produced no record without being malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    MissingOpponent,
    Placeholders,
}

pub struct MatchParser {
    link_base: String,
}

impl MatchParser {
    pub fn new(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
        }
    }

    /// Parses every match fragment of a listing page. Broken fragments are logged and skipped.
    pub fn parse_document(&self, document: &Html, options: &FetchOptions, now: i64) -> Vec<EventRecord> {
        let Some(fragments) = first_match(document.root_element(), &FRAGMENTS) else {
            debug!("No match fragments found");
            return Vec::new();
        };

        let mut records = Vec::new();
        for (index, fragment) in fragments.into_iter().enumerate() {
            match self.parse(fragment, options, now) {
                Ok(Ok(record)) => records.push(record),
                Ok(Err(discard)) => {
                    if options.verbose {
                        info!(index, ?discard, "Discarded match fragment");
                    } else {
                        debug!(index, ?discard, "Discarded match fragment");
                    }
                }
                Err(e) => warn!("Skipping match fragment {}: {}", index, e),
            }
        }
        records
    }

    /// Extracts one record from one fragment.
    ///
    /// The outer error means the fragment is malformed; the inner one means it is
    /// well-formed but rejected by the presence or placeholder options.
    pub fn parse(
        &self,
        fragment: ElementRef<'_>,
        options: &FetchOptions,
        now: i64,
    ) -> Result<Result<EventRecord, Discard>, FragmentError> {
        let raw_timestamp = chains::TIMESTAMP
            .extract(fragment)
            .ok_or(FragmentError::MissingTimestamp)?;
        let start_timestamp = raw_timestamp
            .parse::<i64>()
            .ok()
            .filter(|ts| DateTime::<Utc>::from_timestamp(*ts, 0).is_some())
            .ok_or_else(|| FragmentError::InvalidTimestamp(raw_timestamp.clone()))?;

        let left = self.opponent(fragment, Side::Left);
        let right = self.opponent(fragment, Side::Right);

        if !options.skips_presence_check() && (left.name.is_none() || right.name.is_none()) {
            return Ok(Err(Discard::MissingOpponent));
        }
        if options.ignore_tbd && left.is_placeholder() && right.is_placeholder() {
            return Ok(Err(Discard::Placeholders));
        }

        let competition = competition(fragment);
        let competition_url = chains::COMPETITION_URL
            .extract(fragment)
            .and_then(|href| absolutize(&href, &self.link_base));
        let (descriptor, descriptor_more_info) = descriptor(fragment);
        let winner_side = winner_side(fragment);

        let summary = make_summary(
            left.name.as_deref(),
            right.name.as_deref(),
            descriptor.as_deref(),
            &competition,
            start_timestamp,
            now,
        );
        let description = make_description(
            left.display_name(),
            right.display_name(),
            descriptor.as_deref(),
            descriptor_more_info.as_deref(),
            &competition,
        );
        let uid = make_uid(
            &competition,
            start_timestamp,
            left.name.as_deref(),
            right.name.as_deref(),
        );
        let is_missing_teams = left.name.is_none() || right.name.is_none();

        Ok(Ok(EventRecord {
            uid,
            start_timestamp,
            left,
            right,
            competition,
            competition_url,
            descriptor,
            descriptor_more_info,
            winner_side,
            summary,
            description,
            is_missing_teams,
        }))
    }

    fn opponent(&self, fragment: ElementRef<'_>, side: Side) -> Opponent {
        let (name, full_name, url, logo) = match side {
            Side::Left => (
                &chains::OPPONENT_LEFT,
                &chains::FULL_NAME_LEFT,
                &chains::URL_LEFT,
                &chains::LOGO_LEFT,
            ),
            Side::Right => (
                &chains::OPPONENT_RIGHT,
                &chains::FULL_NAME_RIGHT,
                &chains::URL_RIGHT,
                &chains::LOGO_RIGHT,
            ),
        };

        let logo = logo.first_match(fragment).and_then(|(_, nodes)| {
            let img = nodes.first()?.value();
            best_logo(img.attr("src"), img.attr("srcset"), &self.link_base)
        });

        Opponent {
            name: name.extract(fragment),
            full_name: full_name.extract(fragment),
            url: url
                .extract(fragment)
                .and_then(|href| absolutize(&href, &self.link_base)),
            logo,
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Filler text with the countdown stripped, else the first tournament container.
fn competition(fragment: ElementRef<'_>) -> String {
    let fillers: Vec<_> = fragment.select(&FILLER).collect();
    if !fillers.is_empty() {
        return fillers
            .into_iter()
            .map(|filler| text_excluding(filler, &COUNTDOWN))
            .collect::<String>()
            .trim()
            .to_string();
    }
    chains::COMPETITION.extract(fragment).unwrap_or_default()
}

/// A score in the versus cell is the descriptor; otherwise the abbreviation supplies both parts.
fn descriptor(fragment: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let versus: String = fragment
        .select(&VERSUS)
        .map(|v| v.text().collect::<String>())
        .collect();
    let versus = versus.trim();
    if SCORE.is_match(versus) {
        return (Some(versus.to_string()), None);
    }

    let abbrs: Vec<_> = fragment.select(&VERSUS_ABBR).collect();
    let Some(first) = abbrs.first() else {
        return (None, None);
    };
    let title = first
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let text: String = abbrs.iter().map(|a| a.text().collect::<String>()).collect();
    let short = non_empty(text)
        .or_else(|| non_empty(first.inner_html()))
        .or_else(|| title.clone());
    (short, title)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Winner classes on the fragment, falling back to the winner class on the header cells.
fn winner_side(fragment: ElementRef<'_>) -> WinnerSide {
    let classes: Vec<&str> = fragment.value().classes().collect();
    if classes.contains(&"winner-right") {
        return WinnerSide::Right;
    }
    if classes.contains(&"winner-left") {
        return WinnerSide::Left;
    }

    let header_won = |selector: &Selector| {
        fragment
            .select(selector)
            .next()
            .map(|cell| cell.value().classes().any(|c| c == HEADER_WINNER_CLASS))
            .unwrap_or(false)
    };
    if header_won(&HEADER_RIGHT) {
        WinnerSide::Right
    } else if header_won(&HEADER_LEFT) {
        WinnerSide::Left
    } else {
        WinnerSide::Undecided
    }
}
