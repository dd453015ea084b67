// SPDX-License-Identifier: Apache-2.0

//! Outbound email over a hosted HTTP provider.
//!
//! Everything goes through the [`Mailer`] trait so handlers and jobs never
//! know which transport is behind it. Failures are logged by the caller and
//! never fail the request that triggered the mail.

pub mod http;
pub mod templates;

pub use http::HttpMailer;

use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::telemetry::JobMetrics;

/// One outbound message. The sender address belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider returned status {0}")]
    Status(u16),
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail retries exhausted")]
    Exhausted,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Sends and swallows the error; the triggering operation must not fail on a
/// mail outage.
pub async fn send_best_effort(mailer: &dyn Mailer, metrics: &JobMetrics, email: Email) {
    let to = email.to.clone();
    let subject = email.subject.clone();
    match mailer.send(email).await {
        Ok(()) => {
            metrics.mail_sent.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            metrics.mail_failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %err, to = %to, subject = %subject, "outbound email failed");
        }
    }
}

/// Stands in when no provider is configured; logs and drops the message.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::debug!(to = %email.to, subject = %email.subject, "mail disabled, dropping message");
        Ok(())
    }
}

/// Records every message instead of sending. Test double.
#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|email| email.subject).collect()
    }
}
