pub mod cache;
pub mod calendar;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod games;
pub mod loader;
pub mod metrics;
pub mod normalize;
pub mod parser;
pub mod pool;
pub mod presets;
pub mod query;
pub mod selectors;
pub mod service;
pub mod types;
pub mod web;

#[cfg(test)]
mod test_support;

pub use error::{CalendarError, Result};
pub use service::CalendarService;
pub use types::{EventRecord, FetchJob, FetchOptions, Opponent, WinnerSide};
