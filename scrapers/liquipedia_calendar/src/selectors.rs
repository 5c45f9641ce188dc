//! Ordered fallback locators.
//!
//! Page templates differ per game, so one logical field can live under several
//! different selectors. A [`LocatorChain`] lists them in priority order and the
//! first locator that matches anything wins; later locators are never tried.

use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

use crate::error::{CalendarError, Result};

/// What to read from the nodes a locator matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// Concatenated text of every matched node.
    Text,
    /// Attribute of the first matched node.
    Attr(&'static str),
}

/// Applied to the trimmed raw value; `None` means the field is absent.
pub type PostProcess = fn(String) -> Option<String>;

pub struct Locator {
    css: &'static str,
    selector: Selector,
    read: Read,
    post: Option<PostProcess>,
}

impl Locator {
    pub fn try_new(css: &'static str, read: Read) -> Result<Self> {
        let selector = Selector::parse(css)
            .map_err(|e| CalendarError::InvalidRequest(format!("bad selector '{}': {}", css, e)))?;
        Ok(Self {
            css,
            selector,
            read,
            post: None,
        })
    }

    /// Locator over a selector literal. Panics on malformed CSS.
    pub fn text(css: &'static str) -> Self {
        Self::try_new(css, Read::Text).unwrap()
    }

    pub fn attr(css: &'static str, name: &'static str) -> Self {
        Self::try_new(css, Read::Attr(name)).unwrap()
    }

    pub fn then(mut self, post: PostProcess) -> Self {
        self.post = Some(post);
        self
    }

    pub fn select<'a>(&self, context: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        context.select(&self.selector).collect()
    }

    fn read(&self, nodes: &[ElementRef<'_>]) -> Option<String> {
        let raw = match self.read {
            Read::Text => nodes.iter().map(|n| n.text().collect::<String>()).collect::<String>(),
            Read::Attr(name) => nodes.first()?.value().attr(name)?.to_string(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match self.post {
            Some(post) => post(trimmed.to_string()),
            None => Some(trimmed.to_string()),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("css", &self.css)
            .field("read", &self.read)
            .field("post", &self.post.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct LocatorChain {
    field: &'static str,
    locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(field: &'static str, locators: Vec<Locator>) -> Self {
        Self { field, locators }
    }

    /// Index of the winning locator and its matched nodes.
    pub fn first_match<'a>(&self, context: ElementRef<'a>) -> Option<(usize, Vec<ElementRef<'a>>)> {
        self.locators.iter().enumerate().find_map(|(i, locator)| {
            let nodes = locator.select(context);
            (!nodes.is_empty()).then_some((i, nodes))
        })
    }

    /// Value of the field, or `None` when no locator matched or the match was empty.
    pub fn extract(&self, context: ElementRef<'_>) -> Option<String> {
        let (index, nodes) = self.first_match(context)?;
        let locator = &self.locators[index];
        trace!(field = self.field, index, css = locator.css, "Locator matched");
        locator.read(&nodes)
    }
}

/// Result of the first selector yielding at least one node.
pub fn first_match<'a>(context: ElementRef<'a>, selectors: &[Selector]) -> Option<Vec<ElementRef<'a>>> {
    selectors.iter().find_map(|selector| {
        let nodes: Vec<_> = context.select(selector).collect();
        (!nodes.is_empty()).then_some(nodes)
    })
}

/// Trimmed text of `element`, skipping everything inside descendants matching `exclude`.
pub fn text_excluding(element: ElementRef<'_>, exclude: &Selector) -> String {
    let excluded: HashSet<_> = element
        .select(exclude)
        .flat_map(|e| e.descendants().map(|n| n.id()))
        .collect();

    element
        .descendants()
        .filter(|n| !excluded.contains(&n.id()))
        .filter_map(|n| n.value().as_text().map(|t| (**t).to_owned()))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn opponent_chain() -> LocatorChain {
        LocatorChain::new(
            "opponent1",
            vec![
                Locator::text(".team-left span.team-template-text"),
                Locator::text(".team-left a"),
                Locator::text(".match-info-header > div:nth-child(1)"),
            ],
        )
    }

    #[test]
    fn test_primary_locator_wins() {
        let html = Html::parse_fragment(
            r#"<div><div class="team-left"><span class="team-template-text">Primary</span><a>Link</a></div></div>"#,
        );
        let chain = opponent_chain();
        let (index, _) = chain.first_match(html.root_element()).unwrap();
        assert_eq!(index, 0);
        assert_eq!(chain.extract(html.root_element()), Some("Primary".to_string()));
    }

    #[test]
    fn test_falls_back_to_secondary_locator() {
        let html = Html::parse_fragment(
            r#"<div><div class="team-left"><a href="/x"> Team A </a></div></div>"#,
        );
        let chain = opponent_chain();
        assert_eq!(chain.extract(html.root_element()), Some("Team A".to_string()));
        assert_eq!(chain.first_match(html.root_element()).unwrap().0, 1);
    }

    #[test]
    fn test_no_match_is_absent() {
        let html = Html::parse_fragment(r#"<div><span>nothing here</span></div>"#);
        let chain = opponent_chain();
        assert!(chain.first_match(html.root_element()).is_none());
        assert_eq!(chain.extract(html.root_element()), None);
    }

    #[test]
    fn test_later_locator_not_consulted_once_one_matches() {
        // The primary locator matches an empty span; the link must not be used.
        let html = Html::parse_fragment(
            r#"<div><div class="team-left"><span class="team-template-text">  </span><a>Link</a></div></div>"#,
        );
        let chain = opponent_chain();
        assert_eq!(chain.extract(html.root_element()), None);
    }

    #[test]
    fn test_attr_read_and_post_process() {
        let html = Html::parse_fragment(r#"<div><a class="l" href="/rocketleague/KC">KC</a></div>"#);
        let chain = LocatorChain::new(
            "url",
            vec![Locator::attr("a.l[href]", "href").then(|v| Some(format!("https://liquipedia.net{}", v)))],
        );
        assert_eq!(
            chain.extract(html.root_element()),
            Some("https://liquipedia.net/rocketleague/KC".to_string())
        );
    }

    #[test]
    fn test_text_excluding() {
        let html = Html::parse_fragment(
            r#"<div class="match-filler"><span class="match-countdown">in 2 hours</span><a>Example Cup</a></div>"#,
        );
        let exclude = Selector::parse(".match-countdown").unwrap();
        let filler = html
            .select(&Selector::parse(".match-filler").unwrap())
            .next()
            .unwrap();
        assert_eq!(text_excluding(filler, &exclude), "Example Cup");
    }

    #[test]
    fn test_free_first_match_order() {
        let html = Html::parse_fragment(r#"<div><p class="match">a</p><p class="match">b</p></div>"#);
        let selectors = [
            Selector::parse(".wikitable").unwrap(),
            Selector::parse(".match").unwrap(),
            Selector::parse(".match-info").unwrap(),
        ];
        let nodes = first_match(html.root_element(), &selectors).unwrap();
        assert_eq!(nodes.len(), 2);
    }
}
