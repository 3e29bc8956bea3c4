//! Calendar providers: the CalDAV export endpoint and a local jCal file.

use herald_engine::error::Result;
use herald_engine::{parse_jcal, CalendarComponent, CalendarProvider, FetchRange, HeraldError};

/// Fetches a calendar collection through its `?export` endpoint as jCal.
pub struct CalDavExport {
    client: reqwest::Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl CalDavExport {
    pub fn new(url: String, username: Option<String>, password: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            username,
            password,
        }
    }

    fn export_url(&self, range: &FetchRange) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}export&accept=jcal&expand={}&start={}&end={}",
            self.url,
            separator,
            u8::from(range.expand),
            range.start_epoch(),
            range.end_epoch()
        )
    }
}

impl CalendarProvider for CalDavExport {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<CalendarComponent>> {
        let mut request = self.client.get(self.export_url(range));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| HeraldError::Transport(format!("calendar request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HeraldError::Transport(format!("calendar body unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(HeraldError::Fetch {
                status: status.as_u16(),
                body,
            });
        }
        parse_jcal(&body)
    }
}

/// Serves a jCal export saved on disk. The range is ignored; selection
/// filters by window anyway.
pub struct FileProvider {
    path: String,
}

impl FileProvider {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl CalendarProvider for FileProvider {
    async fn fetch(&self, _range: &FetchRange) -> Result<Vec<CalendarComponent>> {
        let body = std::fs::read_to_string(&self.path)
            .map_err(|e| HeraldError::Transport(format!("cannot read {}: {}", self.path, e)))?;
        parse_jcal(&body)
    }
}

/// The provider chosen at startup.
pub enum Source {
    CalDav(CalDavExport),
    File(FileProvider),
}

impl CalendarProvider for Source {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<CalendarComponent>> {
        match self {
            Source::CalDav(provider) => provider.fetch(range).await,
            Source::File(provider) => provider.fetch(range).await,
        }
    }
}
