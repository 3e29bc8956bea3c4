//! `herald` CLI — announce upcoming calendar events on Mastodon.
//!
//! ## Usage
//!
//! ```sh
//! # Post tomorrow's events (offsets default to the `days_ahead` setting)
//! herald days --post
//!
//! # Print today's and the day after tomorrow's events as JSON
//! herald days --offsets 0,2
//!
//! # What's next?
//! herald next
//!
//! # List the coming 30 days with next-occurrence estimates
//! herald list --days 30
//!
//! # Post a single listed occurrence again, by key
//! herald repost 'meetup@example.org@2024-07-04T18:00:00Z'
//!
//! # Work from a saved jCal export instead of the CalDAV server
//! herald --calendar-file calendar.json --now 2024-06-10T10:00:00Z list
//!
//! # Estimate the next occurrence of a rule
//! herald preview --rule 'FREQ=MONTHLY;BYDAY=TH;BYSETPOS=1' --start 2024-01-04T18:00:00Z
//! ```

mod caldav;
mod config;
mod mastodon;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use herald_engine::runner;
use herald_engine::{
    post_batch, preview_next, AnnounceOptions, DayOffsets, Occurrence, OccurrenceKey, PostPolicy,
    RuleFailurePolicy,
};
use tracing_subscriber::EnvFilter;

use crate::caldav::{CalDavExport, FileProvider, Source};
use crate::config::Settings;
use crate::mastodon::MastodonClient;

/// Upper bound for `--days`, about ten years.
const MAX_LIST_DAYS: i64 = 3660;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Announce upcoming CalDAV events on Mastodon"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./herald.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Read components from a jCal export file instead of the CalDAV server
    #[arg(long, global = true)]
    calendar_file: Option<String>,

    /// Evaluate as if it were this RFC 3339 instant
    #[arg(long, global = true)]
    now: Option<String>,

    /// IANA timezone for day boundaries and announcement times
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// What to do with a component whose recurrence rule is unusable (skip, abort)
    #[arg(long, global = true)]
    on_rule_error: Option<RuleFailurePolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Events in the next 360 hours
    Upcoming {
        /// Post every selected event
        #[arg(long)]
        post: bool,
        /// What a failed post does to the rest of the batch (abort, continue)
        #[arg(long)]
        on_post_error: Option<PostPolicy>,
    },
    /// Events on specific days, counted from today
    Days {
        /// Comma-separated day offsets, 0 = today (at most four, each 0-15)
        #[arg(long)]
        offsets: Option<String>,
        /// Post every selected event
        #[arg(long)]
        post: bool,
        /// What a failed post does to the rest of the batch (abort, continue)
        #[arg(long)]
        on_post_error: Option<PostPolicy>,
    },
    /// The next event within 14 days
    Next,
    /// Events in the coming days, with next-occurrence estimates
    List {
        /// Days ahead to list (1-3660)
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=MAX_LIST_DAYS))]
        days: u32,
    },
    /// Post one listed occurrence, identified by its key
    Repost {
        /// Occurrence key as printed by `list`
        key: String,
        /// Range to search, as for `list`
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=MAX_LIST_DAYS))]
        days: u32,
    },
    /// Estimate the next occurrence of a WEEKLY or MONTHLY/BYSETPOS rule
    Preview {
        #[arg(long)]
        rule: String,
        /// Start of the original event (RFC 3339)
        #[arg(long)]
        start: String,
    },
}

/// Everything a command needs, resolved from settings and flags.
struct RunContext {
    settings: Settings,
    now: DateTime<Utc>,
    tz: Tz,
    rule_policy: RuleFailurePolicy,
    calendar_file: Option<String>,
}

impl RunContext {
    fn source(&self) -> Result<Source> {
        if let Some(path) = &self.calendar_file {
            return Ok(Source::File(FileProvider::new(path.clone())));
        }
        let caldav = &self.settings.caldav;
        let Some(url) = caldav.url.clone() else {
            bail!("No calendar configured: set caldav.url (HERALD_CALDAV__URL) or pass --calendar-file");
        };
        Ok(Source::CalDav(CalDavExport::new(
            url,
            caldav.username.clone(),
            caldav.password.clone(),
        )))
    }

    fn target(&self) -> Result<MastodonClient> {
        let mastodon = &self.settings.mastodon;
        match (&mastodon.base_url, &mastodon.token) {
            (Some(base_url), Some(token)) => Ok(MastodonClient::new(base_url.clone(), token.clone())),
            _ => bail!(
                "Posting needs mastodon.base_url and mastodon.token (HERALD_MASTODON__BASE_URL, HERALD_MASTODON__TOKEN)"
            ),
        }
    }

    fn announce_options(&self, policy: Option<PostPolicy>) -> AnnounceOptions {
        AnnounceOptions {
            tz: self.tz,
            visibility: self.settings.mastodon.visibility,
            media_id: self.settings.mastodon.media_id.clone(),
            policy: policy.unwrap_or(self.settings.on_post_error),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&settings.log_level);

    let now = match cli.now.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };
    let tz_name = cli.timezone.as_deref().unwrap_or(&settings.timezone);
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown timezone: '{}'", tz_name))?;

    let ctx = RunContext {
        rule_policy: cli.on_rule_error.unwrap_or(settings.on_rule_error),
        calendar_file: cli.calendar_file,
        settings,
        now,
        tz,
    };
    tracing::debug!(now = %ctx.now, tz = %ctx.tz, policy = %ctx.rule_policy, "starting");

    match cli.command {
        Commands::Upcoming {
            post,
            on_post_error,
        } => {
            let occurrences = runner::upcoming(&ctx.source()?, ctx.now, ctx.rule_policy)
                .await
                .context("Failed to select upcoming events")?;
            emit(&ctx, occurrences, post, on_post_error).await?;
        }
        Commands::Days {
            offsets,
            post,
            on_post_error,
        } => {
            let offsets = DayOffsets::normalize(offsets.as_deref().unwrap_or(&ctx.settings.days_ahead));
            tracing::info!(offsets = ?offsets.as_slice(), "day-targeted selection");
            let occurrences =
                runner::day_targeted(&ctx.source()?, ctx.now, &offsets, ctx.tz, ctx.rule_policy)
                    .await
                    .context("Failed to select events for the requested days")?;
            emit(&ctx, occurrences, post, on_post_error).await?;
        }
        Commands::Next => {
            let next = runner::next_event(&ctx.source()?, ctx.now, ctx.rule_policy)
                .await
                .context("Failed to find the next event")?;
            match next {
                Some(occurrence) => println!(
                    "{}\t{}\t{}",
                    occurrence.start_instant.with_timezone(&ctx.tz).to_rfc3339(),
                    occurrence.summary,
                    occurrence.key()
                ),
                None => println!("No event in the next 14 days"),
            }
        }
        Commands::List { days } => {
            let listed = runner::list_range(&ctx.source()?, ctx.now, days, ctx.tz, ctx.rule_policy)
                .await
                .context("Failed to list events")?;
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
        Commands::Repost { key, days } => {
            let key: OccurrenceKey = key.parse()?;
            let found = runner::find_listed(&ctx.source()?, ctx.now, days, &key, ctx.rule_policy)
                .await
                .context("Failed to look up the occurrence")?;
            let Some(occurrence) = found else {
                bail!("No occurrence {} in the next {} days", key, days);
            };
            emit(&ctx, vec![occurrence], true, None).await?;
        }
        Commands::Preview { rule, start } => {
            let start = parse_instant(&start)?;
            match preview_next(&rule, start, ctx.now, ctx.tz) {
                Some(next) => println!("{}", next.with_timezone(&ctx.tz).to_rfc3339()),
                None => println!("none"),
            }
        }
    }

    Ok(())
}

/// Print the selection as JSON, or post it and print the report.
async fn emit(
    ctx: &RunContext,
    occurrences: Vec<Occurrence>,
    post: bool,
    policy: Option<PostPolicy>,
) -> Result<()> {
    if !post {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
        return Ok(());
    }

    let target = ctx.target()?;
    let report = post_batch(&target, &occurrences, &ctx.announce_options(policy)).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_complete() {
        bail!("Posting incomplete: {}", report);
    }
    tracing::info!(posted = report.posted(), "batch done");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid RFC 3339 instant: {}", raw))?
        .with_timezone(&Utc))
}
