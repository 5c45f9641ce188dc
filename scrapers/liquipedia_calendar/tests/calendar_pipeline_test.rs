use std::collections::{BTreeSet, HashMap};

use pretty_assertions::assert_eq;

use liquipedia_calendar::{
    calendar,
    config::LINK_BASE,
    error::{CalendarError, Result},
    loader::{HtmlFetcher, MarkupLoader},
    metrics::MetricsCollector,
    parser::MatchParser,
    types::{FetchJob, FetchOptions},
    CalendarService,
};

const ROCKET_LEAGUE_MATCHES: &str = "https://liquipedia.net/rocketleague/Liquipedia:Matches";
const DOTA_MATCHES: &str = "https://liquipedia.net/dota2/Liquipedia:Matches";
const NOW: i64 = 1_700_000_000;

/// Serves fixture pages by URL; anything else is a 404.
struct FixtureFetcher {
    pages: HashMap<&'static str, &'static str>,
}

impl FixtureFetcher {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(ROCKET_LEAGUE_MATCHES, include_str!("fixtures/rocketleague_matches.html"));
        pages.insert(DOTA_MATCHES, include_str!("fixtures/fallback_matches.html"));
        Self { pages }
    }
}

impl HtmlFetcher for FixtureFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .map(|page| page.to_string())
            .ok_or_else(|| CalendarError::HttpStatus {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }
}

fn service() -> CalendarService<FixtureFetcher> {
    let loader = MarkupLoader::new(
        FixtureFetcher::new(),
        MatchParser::new(LINK_BASE),
        MetricsCollector::new(),
    );
    CalendarService::new(loader, "https://liquipedia.net/")
}

fn uids(ics: &str) -> BTreeSet<String> {
    calendar::decode(ics)
        .unwrap()
        .into_iter()
        .map(|block| block.uid)
        .collect()
}

#[test_log::test(tokio::test)]
async fn test_stale_match_is_dropped() {
    let events = service()
        .fetch_events_at(ROCKET_LEAGUE_MATCHES, &FetchOptions::default(), NOW)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.summary, "Foo vs Bar [Example Cup]");
    assert_eq!(event.uid, "ExampleCup/4102444800/Foo/Bar@liquipedia-calendar");
    assert_eq!(event.left.full_name.as_deref(), Some("Foo Club"));
    assert_eq!(
        event.left.url.as_deref(),
        Some("https://liquipedia.net/rocketleague/Foo_Club")
    );
    assert_eq!(
        event.left.logo.as_deref(),
        Some("https://liquipedia.net/commons/images/foo-200.png")
    );
    assert_eq!(event.right.url, None);
    assert_eq!(
        event.competition_url.as_deref(),
        Some("https://liquipedia.net/rocketleague/Example_Cup")
    );
}

#[tokio::test]
async fn test_finished_match_keeps_score_out_of_summary() {
    let options = FetchOptions {
        past_match_allow_seconds: Some(i64::MAX / 4),
        competition_regex: Some("old cup".to_string()),
        ..Default::default()
    };
    let events = service().fetch_events_at(ROCKET_LEAGUE_MATCHES, &options, NOW).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].descriptor.as_deref(), Some("2:4"));
    assert_eq!(events[0].summary, "Alpha vs Beta [Old Cup]");
    assert_eq!(events[0].description, "Alpha Esports vs Beta Gaming (2:4) [Old Cup]");
}

#[tokio::test]
async fn test_secondary_locator_supplies_opponents() {
    let options = FetchOptions {
        ignore_tbd: true,
        ..Default::default()
    };
    let events = service().fetch_events_at(DOTA_MATCHES, &options, NOW).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].left.name.as_deref(), Some("Team A"));
    assert_eq!(events[0].right.name.as_deref(), Some("Team B"));
    assert_eq!(events[0].summary, "Team A vs Team B (Bo3) [Fallback Cup]");
    assert_eq!(events[0].description, "Team A vs Team B (Best of 3) [Fallback Cup]");
}

#[tokio::test]
async fn test_placeholders_are_kept_unless_ignored() {
    let events = service()
        .fetch_events_at(DOTA_MATCHES, &FetchOptions::default(), NOW)
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].summary, "??? vs ??? [Fallback Cup]");
}

#[tokio::test]
async fn test_falls_back_to_listing_page() {
    let service = service();
    let events = service
        .fetch_events_at("https://liquipedia.net/rocketleague/RLCS/2099", &FetchOptions::default(), NOW)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].competition, "Example Cup");
}

#[tokio::test]
async fn test_unknown_page_without_listing_fails() {
    let err = service()
        .fetch_events_at("https://liquipedia.net/nosuchgame/Matches", &FetchOptions::default(), NOW)
        .await
        .unwrap_err();

    assert!(matches!(err, CalendarError::FetchFailed { attempts: 1, .. }));
}

#[tokio::test]
async fn test_invalid_regex_is_rejected_before_fetching() {
    let options = FetchOptions {
        teams_regex: Some("(".to_string()),
        ..Default::default()
    };
    let err = service()
        .fetch_events_at(ROCKET_LEAGUE_MATCHES, &options, NOW)
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test]
async fn test_fetch_many_ignores_job_order() {
    let service = service();
    let rocket = FetchJob::new(ROCKET_LEAGUE_MATCHES, FetchOptions::default());
    let dota = FetchJob::new(
        DOTA_MATCHES,
        FetchOptions {
            teams_regex: Some("^Team".to_string()),
            ..Default::default()
        },
    );

    let forward = service.fetch_many(&[rocket.clone(), dota.clone()]).await.unwrap();
    let backward = service.fetch_many(&[dota, rocket]).await.unwrap();

    let forward: BTreeSet<_> = forward.into_iter().map(|e| e.uid).collect();
    let backward: BTreeSet<_> = backward.into_iter().map(|e| e.uid).collect();
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 2);
}

#[tokio::test]
async fn test_calendar_round_trip() {
    let service = service();
    let events = service
        .fetch_events_at(DOTA_MATCHES, &FetchOptions::default(), NOW)
        .await
        .unwrap();
    let ics = service.build_calendar(&events);

    assert!(ics.starts_with("BEGIN:VCALENDAR"));
    assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    let expected: BTreeSet<_> = events.iter().map(|e| e.uid.clone()).collect();
    assert_eq!(uids(&ics), expected);
}

#[tokio::test]
async fn test_merge_keeps_one_event_per_uid() {
    let service = service();
    let rocket = service
        .fetch_events_at(ROCKET_LEAGUE_MATCHES, &FetchOptions::default(), NOW)
        .await
        .unwrap();
    let dota = service
        .fetch_events_at(DOTA_MATCHES, &FetchOptions::default(), NOW)
        .await
        .unwrap();

    let a = service.build_calendar(&rocket);
    let b = service.build_calendar(&dota);

    let same = service.merge_calendars(&a, &a).unwrap();
    assert_eq!(calendar::decode(&same).unwrap().len(), 1);

    let left = service
        .merge_calendars(&service.merge_calendars(&a, &b).unwrap(), &a)
        .unwrap();
    let right = service
        .merge_calendars(&a, &service.merge_calendars(&b, &a).unwrap())
        .unwrap();
    assert_eq!(uids(&left), uids(&right));
    assert_eq!(uids(&left).len(), 3);
}

#[tokio::test]
async fn test_preset_without_matching_competition_is_empty() {
    let ics = service().preset_calendar("rlcs").await.unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR"));
    assert!(uids(&ics).is_empty());
}
