//! Settings for the `herald` binary.
//!
//! Sources, later ones winning: built-in defaults, an optional TOML file
//! (`herald.toml` unless `--config` names another), then `HERALD_*`
//! environment variables. A `.env` file is loaded into the environment first.
//! Nested keys use a double underscore, e.g. `HERALD_CALDAV__URL`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use herald_engine::{PostPolicy, RuleFailurePolicy, Visibility};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "herald.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub caldav: CalDavSettings,
    #[serde(default)]
    pub mastodon: MastodonSettings,
    /// IANA zone for day boundaries and announcement times.
    pub timezone: String,
    /// Raw day-offset list for day-targeted runs, e.g. `"0,1"`.
    pub days_ahead: String,
    pub log_level: String,
    pub on_rule_error: RuleFailurePolicy,
    pub on_post_error: PostPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalDavSettings {
    /// Calendar collection URL; export query parameters are appended.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MastodonSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Already-uploaded media to attach to every post.
    pub media_id: Option<String>,
}

impl Settings {
    /// ## Errors
    /// Fails if an explicitly named file is missing or any value does not
    /// deserialize.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("timezone", "UTC")?
            .set_default("days_ahead", "1")?
            .set_default("log_level", "info")?
            .set_default("on_rule_error", "skip")?
            .set_default("on_post_error", "abort")?
            .add_source(file)
            .add_source(
                Environment::with_prefix("HERALD")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")
    }
}
