//! Sequential posting of a batch of occurrences with a per-item report.
//!
//! Posts go out one at a time in list order. Nothing is retried and nothing
//! already posted is rolled back.

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::format::format_announcement;
use crate::occurrence::{Occurrence, OccurrenceKey};
use crate::provider::{Announcement, AnnouncementTarget, Visibility};

/// What a failed post does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostPolicy {
    /// Stop at the first failure; later items are not attempted.
    #[default]
    Abort,
    /// Attempt every item regardless of earlier failures.
    Continue,
}

impl FromStr for PostPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(format!("unknown post policy '{}' (abort, continue)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PostOutcome {
    Posted,
    Failed(String),
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub key: OccurrenceKey,
    pub outcome: PostOutcome,
}

/// One record per input occurrence, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub records: Vec<PostRecord>,
}

impl BatchReport {
    pub fn posted(&self) -> usize {
        self.count(|o| matches!(o, PostOutcome::Posted))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PostOutcome::Failed(_)))
    }

    pub fn not_attempted(&self) -> usize {
        self.count(|o| matches!(o, PostOutcome::NotAttempted))
    }

    /// True when every item was posted.
    pub fn is_complete(&self) -> bool {
        self.posted() == self.records.len()
    }

    fn count(&self, pred: impl Fn(&PostOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posted, {} failed, {} not attempted",
            self.posted(),
            self.failed(),
            self.not_attempted()
        )
    }
}

/// How announcements are rendered and what happens on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceOptions {
    pub tz: Tz,
    pub visibility: Visibility,
    pub media_id: Option<String>,
    pub policy: PostPolicy,
}

impl Default for AnnounceOptions {
    fn default() -> Self {
        Self {
            tz: chrono_tz::UTC,
            visibility: Visibility::default(),
            media_id: None,
            policy: PostPolicy::default(),
        }
    }
}

/// Post every occurrence in order, awaiting each post before the next.
pub async fn post_batch<T: AnnouncementTarget>(
    target: &T,
    occurrences: &[Occurrence],
    options: &AnnounceOptions,
) -> BatchReport {
    let mut records = Vec::with_capacity(occurrences.len());
    let mut halted = false;

    for occurrence in occurrences {
        let key = occurrence.key();
        if halted {
            records.push(PostRecord {
                key,
                outcome: PostOutcome::NotAttempted,
            });
            continue;
        }

        let announcement = Announcement {
            text: format_announcement(occurrence, options.tz),
            media_id: options.media_id.clone(),
            visibility: options.visibility,
        };

        let outcome = match target.post(&announcement).await {
            Ok(()) => {
                tracing::info!(key = %key, "posted announcement");
                PostOutcome::Posted
            }
            Err(err) => {
                tracing::error!(key = %key, error = %err, "announcement failed");
                halted = options.policy == PostPolicy::Abort;
                PostOutcome::Failed(err.to_string())
            }
        };
        records.push(PostRecord { key, outcome });
    }

    BatchReport { records }
}
