use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::ResultCache;
use crate::calendar;
use crate::config::CalendarConfig;
use crate::dedupe::dedupe;
use crate::error::{CalendarError, Result};
use crate::filter::FilterEngine;
use crate::games;
use crate::loader::{HtmlFetcher, MarkupLoader, PooledFetcher};
use crate::metrics::MetricsCollector;
use crate::normalize;
use crate::parser::MatchParser;
use crate::pool::ConnectionPool;
use crate::presets::{self, PresetMember};
use crate::query;
use crate::types::{EventRecord, FetchJob, FetchOptions};

/// Fetch, filter, dedupe and encode, behind one object shared by the CLI and the HTTP surface.
pub struct CalendarService<F: HtmlFetcher> {
    loader: MarkupLoader<F>,
    allowed_url_prefix: String,
}

impl<F: HtmlFetcher> CalendarService<F> {
    pub fn new(loader: MarkupLoader<F>, allowed_url_prefix: impl Into<String>) -> Self {
        Self {
            loader,
            allowed_url_prefix: allowed_url_prefix.into(),
        }
    }

    pub async fn fetch_events(&self, url: &str, options: &FetchOptions) -> Result<Vec<EventRecord>> {
        self.fetch_events_at(url, options, Utc::now().timestamp()).await
    }

    /// Tries the requested URL, then its game's listing page. Zero matches is not an error.
    pub async fn fetch_events_at(&self, url: &str, options: &FetchOptions, now: i64) -> Result<Vec<EventRecord>> {
        let url = query::validate(Some(url), &self.allowed_url_prefix)?;
        let options = games::enforce(&url, options.clone());
        let engine = FilterEngine::new(&options, now)?;

        let candidates = games::url_candidates(&url);
        let mut loaded = None;
        for candidate in &candidates {
            match self.loader.load_records(candidate, now).await {
                Ok(records) => {
                    loaded = Some(records);
                    break;
                }
                Err(e) => warn!("Could not load matches from {}: {}", candidate, e),
            }
        }
        let records = loaded.ok_or_else(|| CalendarError::FetchFailed {
            url: url.clone(),
            attempts: candidates.len(),
        })?;

        let mut events = dedupe(engine.apply(records));
        for event in &mut events {
            event.summary = normalize::summary_at(event, now);
        }
        if options.verbose {
            info!(?options, "{} match(es) returned from {}", events.len(), url);
        } else {
            info!("{} match(es) returned from {}", events.len(), url);
        }
        Ok(events)
    }

    /// Runs every job concurrently. The result follows job order, not completion order.
    pub async fn fetch_many(&self, jobs: &[FetchJob]) -> Result<Vec<EventRecord>> {
        let results = join_all(
            jobs.iter()
                .map(|job| self.fetch_events(&job.url, &job.options)),
        )
        .await;

        let mut events = Vec::new();
        for result in results {
            events.extend(result?);
        }
        Ok(dedupe(events))
    }

    pub fn build_calendar(&self, records: &[EventRecord]) -> String {
        calendar::encode(records)
    }

    pub fn merge_calendars(&self, first: &str, second: &str) -> Result<String> {
        calendar::merge(first, second)
    }

    /// Merged calendar of every member of a preset. Failing members are logged and left out.
    pub async fn preset_calendar(&self, name: &str) -> Result<String> {
        if presets::preset(name).is_none() {
            return Err(CalendarError::UnknownPreset(name.to_string()));
        }

        let mut visited = HashSet::new();
        let jobs = flatten_preset(name, &mut visited);

        let mut ics = String::new();
        for job in jobs {
            match self.fetch_events(&job.url, &job.options).await {
                Ok(events) => ics = self.merge_calendars(&ics, &self.build_calendar(&events))?,
                Err(e) => error!("Error while fetching preset {} member {}: {}", name, job.url, e),
            }
        }
        if ics.is_empty() {
            ics = calendar::encode(&[]);
        }
        Ok(ics)
    }
}

impl CalendarService<PooledFetcher> {
    /// Pooled, rate-limited and cached service as used by the binary.
    pub fn from_config(config: &CalendarConfig, metrics: MetricsCollector) -> Self {
        let pool = ConnectionPool::new(
            config.http.clone(),
            config.proxies.clone(),
            &config.rate_limits,
            metrics.clone(),
        );
        let loader = MarkupLoader::new(
            PooledFetcher::new(Arc::new(pool)),
            MatchParser::new(config.link_base.as_str()),
            metrics,
        )
        .with_cache(ResultCache::new(config.cache.ttl_secs));
        Self::new(loader, config.allowed_url_prefix.as_str())
    }
}

/// Expands nested preset references depth-first. Each preset is expanded at most once.
fn flatten_preset(name: &str, visited: &mut HashSet<String>) -> Vec<FetchJob> {
    if !visited.insert(name.to_string()) {
        return Vec::new();
    }
    let Some(preset) = presets::preset(name) else {
        error!("Preset {} references unknown preset", name);
        return Vec::new();
    };

    let mut jobs = Vec::new();
    for member in preset.members {
        match member {
            PresetMember::Query(job) => jobs.push(job),
            PresetMember::Preset(reference) => jobs.extend(flatten_preset(reference, visited)),
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LINK_BASE;

    const START: i64 = 1_700_000_000;
    const PAGE: &str = r#"<html><body>
        <table class="wikitable"><tr><td class="team-left"><a>KC</a></td>
          <td class="versus"><abbr title="Best of 5">Bo5</abbr></td>
          <td class="team-right"><a>VIT</a></td></tr>
          <tr><td class="match-filler"><span class="timer-object" data-timestamp="1700000000"></span>RLCS Major</td></tr></table>
    </body></html>"#;

    struct StaticFetcher;

    impl HtmlFetcher for StaticFetcher {
        async fn fetch_html(&self, _url: &str) -> Result<String> {
            Ok(PAGE.to_string())
        }
    }

    #[tokio::test]
    async fn test_cached_summary_follows_match_start() {
        let metrics = MetricsCollector::new();
        let loader = MarkupLoader::new(StaticFetcher, MatchParser::new(LINK_BASE), metrics.clone())
            .with_cache(ResultCache::new(299));
        let service = CalendarService::new(loader, "https://liquipedia.net/");
        let url = "https://liquipedia.net/rocketleague/Liquipedia:Matches";

        let upcoming = service
            .fetch_events_at(url, &FetchOptions::default(), START - 60)
            .await
            .unwrap();
        assert_eq!(upcoming[0].summary, "KC vs VIT (Bo5) [RLCS Major]");

        let started = service
            .fetch_events_at(url, &FetchOptions::default(), START + 60)
            .await
            .unwrap();
        assert_eq!(metrics.get_metrics().cache_hits, 1);
        assert_eq!(started[0].summary, "KC vs VIT [RLCS Major]");
        assert_eq!(started[0].description, upcoming[0].description);
    }

    #[test]
    fn test_flatten_nested_preset() {
        let mut visited = HashSet::new();
        let jobs = flatten_preset("rlcs-enjoyer", &mut visited);
        let patterns: Vec<_> = jobs
            .iter()
            .map(|j| {
                j.options
                    .competition_regex
                    .clone()
                    .or(j.options.teams_regex.clone())
                    .unwrap_or_default()
            })
            .collect();
        assert_eq!(
            patterns,
            vec![
                "RLCS.*Major".to_string(),
                "RLCS.*Worlds".to_string(),
                "FIFA".to_string(),
                "^(KC|VIT|FUR|FLCN|M8|NRG|TWIS|TS)$".to_string(),
            ]
        );
    }

    #[test]
    fn test_flatten_alias() {
        let jobs = flatten_preset("rocket-league", &mut HashSet::new());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].options.competition_regex.as_deref(), Some("RLCS"));
    }

    #[test]
    fn test_flatten_visits_each_preset_once() {
        let mut visited = HashSet::new();
        visited.insert("rlcs-major".to_string());
        let jobs = flatten_preset("rlcs-enjoyer", &mut visited);
        assert_eq!(jobs.len(), 3);
    }
}
