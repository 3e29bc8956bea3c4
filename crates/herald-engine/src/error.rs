//! Error types for herald-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Invalid RRULE for {uid}: {reason}")]
    InvalidRule { uid: String, reason: String },

    #[error("Invalid timezone for {uid}: {tzid}")]
    InvalidTimezone { uid: String, tzid: String },

    #[error("Invalid calendar component: {0}")]
    InvalidComponent(String),

    #[error("Window out of range: {0}")]
    InvalidWindow(String),

    #[error("Calendar fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Announcement rejected with status {status}: {body}")]
    Post { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl HeraldError {
    /// The uid of the component this error is scoped to, if any.
    pub fn uid(&self) -> Option<&str> {
        match self {
            HeraldError::InvalidRule { uid, .. } | HeraldError::InvalidTimezone { uid, .. } => {
                Some(uid)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
