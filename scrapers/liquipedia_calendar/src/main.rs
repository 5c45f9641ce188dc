use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::{fs, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use liquipedia_calendar::{
    config::CalendarConfig,
    metrics::MetricsCollector,
    presets,
    types::{FetchJob, FetchOptions},
    web::{self, AppState},
    CalendarService,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP calendar service
    Serve,
    /// Fetch one match page and print the filtered matches
    Fetch(FetchArgs),
    /// Merge two calendar files, keeping the first event for each UID
    Merge {
        first: PathBuf,
        second: PathBuf,
    },
    /// Print the calendar of a named preset
    Preset {
        /// Preset name, or "list" to show every preset
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Ics,
    Json,
}

#[derive(Debug, Args)]
struct FetchArgs {
    /// Liquipedia match listing URL
    #[arg(short, long)]
    url: String,

    #[arg(long)]
    competition_regex: Option<String>,

    #[arg(long)]
    teams_regex: Option<String>,

    /// Accept when either regex matches instead of both
    #[arg(long)]
    condition_is_or: bool,

    /// Require both opponents to match the team regex
    #[arg(long)]
    match_both_teams: bool,

    /// Drop matches with an undecided opponent
    #[arg(long)]
    ignore_tbd: bool,

    #[arg(long)]
    teams_regex_use_fullnames: bool,

    /// How long a started match stays listed, in seconds
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    past_match_allow_seconds: Option<i64>,

    #[arg(long)]
    expect_missing_teams: bool,

    #[arg(long)]
    allow_missing_teams: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, value_enum, default_value = "ics")]
    format: Format,
}

impl FetchArgs {
    fn options(&self) -> FetchOptions {
        FetchOptions {
            competition_regex: self.competition_regex.clone(),
            teams_regex: self.teams_regex.clone(),
            teams_regex_use_fullnames: self.teams_regex_use_fullnames,
            condition_is_or: self.condition_is_or,
            match_both_teams: self.match_both_teams,
            ignore_tbd: self.ignore_tbd,
            past_match_allow_seconds: self.past_match_allow_seconds,
            expect_missing_teams: self.expect_missing_teams,
            allow_missing_teams: self.allow_missing_teams,
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = CalendarConfig::from_env();
    let metrics = MetricsCollector::new();

    match cli.command {
        Commands::Serve => {
            let service = CalendarService::from_config(&config, metrics.clone());
            let state = AppState {
                service: Arc::new(service),
                metrics,
                allowed_url_prefix: config.allowed_url_prefix.clone(),
                home_url: config.server.home_url.clone(),
            };
            web::serve(state, &config.server).await?;
        }
        Commands::Fetch(args) => {
            let service = CalendarService::from_config(&config, metrics);
            let job = FetchJob::new(args.url.as_str(), args.options());
            let events = service.fetch_many(std::slice::from_ref(&job)).await?;
            match args.format {
                Format::Ics => print!("{}", service.build_calendar(&events)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&events)?),
            }
        }
        Commands::Merge { first, second } => {
            let first = fs::read_to_string(&first).with_context(|| format!("reading {}", first.display()))?;
            let second = fs::read_to_string(&second).with_context(|| format!("reading {}", second.display()))?;
            let service = CalendarService::from_config(&config, metrics);
            print!("{}", service.merge_calendars(&first, &second)?);
        }
        Commands::Preset { name } if name == "list" => {
            for name in presets::names() {
                println!("{}", name);
            }
        }
        Commands::Preset { name } => {
            let service = CalendarService::from_config(&config, metrics.clone());
            print!("{}", service.preset_calendar(&name).await?);
            info!(?name, requests = metrics.get_metrics().total_requests, "Preset calendar built");
        }
    }

    Ok(())
}
