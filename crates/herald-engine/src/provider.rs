//! Collaborator contracts: where components come from and where
//! announcements go.
//!
//! Implementations live outside the engine (HTTP clients, files, test fakes).

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::component::CalendarComponent;
use crate::error::Result;
use crate::window::FetchRange;

/// Source of raw calendar components for a date range.
pub trait CalendarProvider {
    /// Components whose occurrences may fall in `range`. Recurring components
    /// are returned unexpanded.
    ///
    /// # Errors
    /// `HeraldError::Fetch` with the provider's status and body on a non-success
    /// response.
    fn fetch(&self, range: &FetchRange) -> impl Future<Output = Result<Vec<CalendarComponent>>>;
}

/// Destination for formatted announcements.
pub trait AnnouncementTarget {
    /// # Errors
    /// `HeraldError::Post` with the response body when the post is rejected.
    fn post(&self, announcement: &Announcement) -> impl Future<Output = Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            "direct" => Ok(Self::Direct),
            other => Err(format!(
                "unknown visibility '{}' (public, unlisted, private, direct)",
                other
            )),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        })
    }
}

/// A status ready to post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub text: String,
    /// Reference to media already uploaded to the target.
    pub media_id: Option<String>,
    pub visibility: Visibility,
}
