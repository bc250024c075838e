//! HTTP delivery of finished result sets to a webhook.

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use threatscan_core::Verdict;
use tracing::info;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
}

/// Where a job's results go once it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// POST to the configured webhook URL.
    Webhook,
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // `vantiq` is the name older clients send for the same webhook.
            "webhook" | "vantiq" => Ok(Self::Webhook),
            other => Err(format!("unknown delivery channel: {other}")),
        }
    }
}

#[derive(Serialize)]
struct Delivery<'a> {
    id: &'a str,
    source_id: &'a str,
    delivered_at: String,
    result: &'a [Verdict],
}

/// Posts result sets to a webhook as JSON.
pub struct ResultPusher {
    client: reqwest::Client,
    url: String,
}

impl ResultPusher {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push the verdicts of job `id`. Returns the HTTP status on success.
    pub async fn push(
        &self,
        id: &str,
        source_id: &str,
        verdicts: &[Verdict],
    ) -> Result<u16, PushError> {
        let body = Delivery {
            id,
            source_id,
            delivered_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            result: verdicts,
        };

        info!(url = %self.url, id, count = verdicts.len(), "pushing results");
        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PushError::Server {
                status: status.as_u16(),
                body,
            });
        }

        info!(id, status = status.as_u16(), "push complete");
        Ok(status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verdict() -> Verdict {
        Verdict::ok(
            "moderate".into(),
            " explicit wording".into(),
            "threat_level moderate threat_level_justification explicit wording".into(),
            "window text".into(),
        )
    }

    #[test]
    fn channel_parses_aliases() {
        assert_eq!("webhook".parse::<Channel>(), Ok(Channel::Webhook));
        assert_eq!("Vantiq".parse::<Channel>(), Ok(Channel::Webhook));
        assert!("email".parse::<Channel>().is_err());
    }

    #[tokio::test]
    async fn push_posts_id_and_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({
                "id": "job-1",
                "source_id": "raw/a.txt",
                "result": [{"threat_level": "moderate", "status": "ok", "text": "window text"}]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let pusher = ResultPusher::new(format!("{}/hook", server.uri()));
        let status = pusher.push("job-1", "raw/a.txt", &[verdict()]).await.unwrap();
        assert_eq!(status, 202);
    }

    #[tokio::test]
    async fn push_reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let pusher = ResultPusher::new(server.uri());
        match pusher.push("job-2", "a.txt", &[]).await {
            Err(PushError::Server { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "down");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }
}
