use async_trait::async_trait;
use cinema_core::session::{Session, SessionError, SessionProvider};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Session Provider backed by the cinema service's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpSessionProvider {
    base_url: String,
    http_client: Client,
}

impl HttpSessionProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn session_url(&self, session_id: i64) -> String {
        format!("{}/sessions/{}", self.base_url, session_id)
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn get_session(&self, session_id: i64) -> Result<Session, SessionError> {
        let url = self.session_url(session_id);
        debug!("Fetching session {} from {}", session_id, url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!("Session provider request failed: {}", e);
            SessionError::Upstream(e.to_string())
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SessionError::NotFound(session_id)),
            status if status.is_success() => response
                .json::<Session>()
                .await
                .map_err(|e| SessionError::Upstream(format!("malformed session payload: {}", e))),
            status => {
                warn!("Session provider answered {} for session {}", status, session_id);
                Err(SessionError::Upstream(format!("unexpected status {}", status)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_url_trims_trailing_slash() {
        let provider = HttpSessionProvider::new("http://cinema:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.session_url(10), "http://cinema:8081/sessions/10");
    }

    #[test]
    fn test_session_payload_shape() {
        let payload = r#"{
            "id": 10,
            "movie_id": 3,
            "hall_id": 2,
            "start_time": "2030-01-01T18:00:00Z",
            "end_time": "2030-01-01T20:00:00Z",
            "status": "scheduled"
        }"#;

        let session: Session = serde_json::from_str(payload).unwrap();
        assert_eq!(session.id, 10);
        assert_eq!(session.status.as_deref(), Some("scheduled"));
        assert!(!session.has_started(chrono::Utc::now()));
    }
}
