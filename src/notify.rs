//! Email alert delivery via SMTP.
//!
//! The notifier is deliberately optional: with no credentials or no
//! recipients the service runs with alerting disabled rather than failing,
//! and every would-be send is logged as skipped.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::models::Reading;
use crate::thresholds::AlertEvent;

// ---

/// Error type for alert delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, ...).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A sender or recipient address could not be parsed.
    #[error("alert address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("alert build error: {0}")]
    Build(String),
}

/// SMTP relay settings; present only when both credentials are configured.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    // ---
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Sends alert mail to the configured recipient set.
#[derive(Debug, Clone)]
pub struct Notifier {
    // ---
    smtp: Option<SmtpSettings>,
    recipients: Vec<String>,
}

impl Notifier {
    // ---
    pub fn new(smtp: Option<SmtpSettings>, recipients: Vec<String>) -> Self {
        Notifier { smtp, recipients }
    }

    /// True when a send would actually go out on the wire.
    pub fn is_enabled(&self) -> bool {
        self.smtp.is_some() && !self.recipients.is_empty()
    }

    /// Deliver one alert message.
    ///
    /// Returns `Ok(false)` when alerting is disabled and the message was
    /// deliberately dropped; `Ok(true)` on confirmed handoff to the relay.
    pub async fn notify(&self, subject: &str, body: &str) -> Result<bool, NotifyError> {
        // ---
        let Some(smtp) = &self.smtp else {
            tracing::info!(subject, "email not configured, skipping alert");
            return Ok(false);
        };
        if self.recipients.is_empty() {
            tracing::info!(subject, "no alert recipients configured, skipping alert");
            return Ok(false);
        }

        let mut builder = Message::builder()
            .from(smtp.user.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.parse()?);
        }
        let email = builder
            .body(body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
            .build();

        mailer.send(email).await?;
        tracing::info!(subject, recipients = self.recipients.len(), "alert email sent");
        Ok(true)
    }
}

// ---

/// Compose the subject and body for one alert event.
///
/// The subject follows the fixed `ALERT - <PARAMETER> out of range` pattern;
/// the body carries the timestamp, parameter, value, and the full reading.
pub fn alert_message(event: &AlertEvent, reading: &Reading) -> (String, String) {
    // ---
    let subject = format!("ALERT - {} out of range", event.parameter.to_uppercase());
    let body = format!(
        "Time: {}\nParameter: {}\nValue: {}\nFull reading: {}",
        event.at.to_rfc3339(),
        event.parameter,
        event.value,
        serde_json::to_string(reading).unwrap_or_else(|_| "{}".to_string()),
    );

    (subject, body)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::parse_line;
    use chrono::Utc;

    #[tokio::test]
    async fn unconfigured_notifier_skips_without_error() {
        // ---
        let notifier = Notifier::new(None, vec!["ops@example.com".to_string()]);

        assert!(!notifier.is_enabled());
        assert_eq!(notifier.notify("subject", "body").await.unwrap(), false);
    }

    #[tokio::test]
    async fn empty_recipient_list_disables_alerting() {
        // ---
        let smtp = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "monitor@example.com".to_string(),
            password: "secret".to_string(),
        };
        let notifier = Notifier::new(Some(smtp), Vec::new());

        assert!(!notifier.is_enabled());
        assert_eq!(notifier.notify("subject", "body").await.unwrap(), false);
    }

    #[test]
    fn subject_follows_alert_pattern() {
        // ---
        let reading = parse_line(r#"{"pH":5.0}"#).unwrap();
        let event = AlertEvent {
            parameter: "pH",
            value: 5.0,
            at: Utc::now(),
        };

        let (subject, body) = alert_message(&event, &reading);

        assert_eq!(subject, "ALERT - PH out of range");
        assert!(body.contains("Parameter: pH"));
        assert!(body.contains("Value: 5"));
        assert!(body.contains(r#""pH":5.0"#));
    }
}
