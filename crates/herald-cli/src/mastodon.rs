//! Mastodon status posting.

use herald_engine::error::Result;
use herald_engine::{Announcement, AnnouncementTarget, HeraldError, Visibility};
use serde::Serialize;

pub struct MastodonClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    visibility: Visibility,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    media_ids: Vec<&'a str>,
}

impl MastodonClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn statuses_url(&self) -> String {
        format!("{}/api/v1/statuses", self.base_url.trim_end_matches('/'))
    }
}

impl AnnouncementTarget for MastodonClient {
    async fn post(&self, announcement: &Announcement) -> Result<()> {
        let body = StatusRequest {
            status: &announcement.text,
            visibility: announcement.visibility,
            media_ids: announcement.media_id.as_deref().into_iter().collect(),
        };

        let response = self
            .client
            .post(self.statuses_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HeraldError::Transport(format!("status request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| HeraldError::Transport(format!("status body unreadable: {}", e)))?;
            return Err(HeraldError::Post {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn statuses_url_tolerates_trailing_slash() {
        let client = MastodonClient::new("https://social.example/".to_string(), "t".to_string());
        assert_eq!(client.statuses_url(), "https://social.example/api/v1/statuses");
    }

    #[test]
    fn status_body_omits_empty_media() {
        let body = StatusRequest {
            status: "hello",
            visibility: Visibility::Unlisted,
            media_ids: vec![],
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"status":"hello","visibility":"unlisted"}"#
        );
    }

    #[tokio::test]
    async fn truncated_error_body_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"}") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\npartial")
                .unwrap();
        });

        let client = MastodonClient::new(format!("http://{}", addr), "t".to_string());
        let announcement = Announcement {
            text: "hello".to_string(),
            media_id: None,
            visibility: Visibility::Public,
        };
        let err = client.post(&announcement).await.unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, HeraldError::Transport(ref reason) if reason.contains("body unreadable")));
    }
}
