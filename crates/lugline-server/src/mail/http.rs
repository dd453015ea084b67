// SPDX-License-Identifier: Apache-2.0

//! reqwest transport for the hosted mail provider.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{Email, MailError, Mailer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: attempt 1 waits one base interval, attempt 2 two, and so on.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    base: String,
    api_key: String,
    from: String,
    retry: RetryPolicy,
}

impl HttpMailer {
    pub fn new(base: &str, api_key: &str, from: &str) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let url = format!("{}/messages", self.base);
        let body = json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
            "text": strip_tags(&email.html),
        });
        let mut last_err = None;
        for attempt in 1..=self.retry.max_attempts {
            let outcome = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::debug!(status, attempt, to = %email.to, "mail provider rejected message");
                    last_err = Some(MailError::Status(status));
                }
                Err(err) => {
                    tracing::debug!(error = %err, attempt, to = %email.to, "mail request failed");
                    last_err = Some(MailError::Transport(err));
                }
            }
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
        }
        Err(last_err.unwrap_or(MailError::Exhausted))
    }
}

/// Plain-text alternative body: the HTML with tags removed.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn strips_tags_and_keeps_text() {
        let html = "<h2>Delivery Update</h2><p>Your items are <strong>in transit</strong>.</p>";
        assert_eq!(
            strip_tags(html),
            "Delivery UpdateYour items are in transit."
        );
    }

    #[test]
    fn backoff_grows_linearly() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(200));
        assert_eq!(retry.backoff(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn posts_message_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("authorization", "Bearer mail-key"))
            .and(body_partial_json(serde_json::json!({
                "to": "rider@example.com",
                "subject": "Delivery Completed - Lugline",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&server.uri(), "mail-key", "\"Lugline\" <no-reply@lugline.example>")
            .unwrap();
        let outcome = mailer
            .send(Email {
                to: "rider@example.com".to_string(),
                subject: "Delivery Completed - Lugline".to_string(),
                html: "<p>done</p>".to_string(),
            })
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn retries_until_provider_accepts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&server.uri(), "mail-key", "from@lugline.example")
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 3,
                base_backoff_ms: 1,
            });
        let outcome = mailer
            .send(Email {
                to: "rider@example.com".to_string(),
                subject: "s".to_string(),
                html: "<p>b</p>".to_string(),
            })
            .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&server.uri(), "mail-key", "from@lugline.example")
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 2,
                base_backoff_ms: 1,
            });
        let outcome = mailer
            .send(Email {
                to: "rider@example.com".to_string(),
                subject: "s".to_string(),
                html: "<p>b</p>".to_string(),
            })
            .await;
        match outcome {
            Err(MailError::Status(status)) => assert_eq!(status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
