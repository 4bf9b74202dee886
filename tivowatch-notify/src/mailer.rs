//! Mail-relay seam.
//!
//! [`Mailer`] is the narrow interface to the relay; [`SmtpMailer`] is the
//! production implementation over lettre's blocking SMTP transport. Tests
//! substitute a recording fake — nothing in the pipeline depends on a real
//! relay being reachable.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use tivowatch_core::{MailConfig, Run};

use crate::message::compose;

/// Errors from building or delivering a message.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A fully addressed message, ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

/// Narrow delivery interface; implementations must be shareable across the
/// blocking-send boundary.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    Sent,
    /// No recipient configured, or the run's outcome warrants no report.
    Suppressed,
    /// The relay rejected or was unreachable; logged, never escalated.
    DeliveryFailed,
}

/// Compose and deliver the outcome report for a terminal run.
///
/// Never errors: notification is an opt-in side channel and its failure
/// must not reclassify the run or crash the orchestrator.
pub fn notify(run: &Run, mail: &MailConfig, mailer: &dyn Mailer) -> SendResult {
    let Some(recipient) = mail.to.as_deref() else {
        tracing::info!("no recipient configured, notification suppressed");
        return SendResult::Suppressed;
    };

    let Some(notification) = compose(run) else {
        return SendResult::Suppressed;
    };

    let message = OutgoingMessage {
        from: mail.from.clone(),
        to: recipient.to_string(),
        subject: notification.subject,
        body_html: notification.body_html,
    };

    match mailer.send(&message) {
        Ok(()) => {
            tracing::info!(to = %message.to, subject = %message.subject, "notification sent");
            SendResult::Sent
        }
        Err(err) => {
            tracing::error!(to = %message.to, error = %err, "notification delivery failed");
            SendResult::DeliveryFailed
        }
    }
}

/// Production mailer over the configured SMTP relay.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(message.from.parse()?)
            .to(message.to.parse()?)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.body_html.clone())?;

        let mut builder = SmtpTransport::builder_dangerous(&self.config.relay_host)
            .port(self.config.relay_port);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        builder.build().send(&email)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tivowatch_core::{DeviceAddr, RunOutcome};

    /// Records every message instead of delivering it.
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl Mailer for RecordingMailer {
        fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Address(
                    "not an address".parse::<lettre::Address>().unwrap_err(),
                ));
            }
            self.sent.lock().expect("lock").push(message.clone());
            Ok(())
        }
    }

    fn run_with_outcome(outcome: RunOutcome) -> Run {
        let mut run = Run::begin(PathBuf::from("/watch"), DeviceAddr::from("10.0.0.9"));
        run.outcome = outcome;
        run
    }

    fn mail_to(recipient: Option<&str>) -> MailConfig {
        MailConfig {
            to: recipient.map(str::to_string),
            ..MailConfig::default()
        }
    }

    #[test]
    fn missing_recipient_suppresses_for_every_outcome() {
        let mailer = RecordingMailer::new(false);
        let mail = mail_to(None);
        for outcome in [
            RunOutcome::Success,
            RunOutcome::Failure,
            RunOutcome::NoFiles,
            RunOutcome::AlreadyRunning,
        ] {
            let result = notify(&run_with_outcome(outcome), &mail, &mailer);
            assert_eq!(result, SendResult::Suppressed, "outcome {outcome}");
        }
        assert!(mailer.sent.lock().expect("lock").is_empty());
    }

    #[test]
    fn success_run_sends_to_configured_recipient() {
        let mailer = RecordingMailer::new(false);
        let mail = mail_to(Some("ops@example.net"));

        let result = notify(&run_with_outcome(RunOutcome::Success), &mail, &mailer);
        assert_eq!(result, SendResult::Sent);

        let sent = mailer.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@example.net");
        assert_eq!(sent[0].from, MailConfig::default().from);
        assert!(sent[0].subject.contains("sent to TiVo"));
    }

    #[test]
    fn skipped_run_is_suppressed_even_with_recipient() {
        let mailer = RecordingMailer::new(false);
        let mail = mail_to(Some("ops@example.net"));

        let result = notify(&run_with_outcome(RunOutcome::NoFiles), &mail, &mailer);
        assert_eq!(result, SendResult::Suppressed);
        assert!(mailer.sent.lock().expect("lock").is_empty());
    }

    #[test]
    fn relay_failure_is_delivery_failed_not_a_crash() {
        let mailer = RecordingMailer::new(true);
        let mail = mail_to(Some("ops@example.net"));

        let result = notify(&run_with_outcome(RunOutcome::Success), &mail, &mailer);
        assert_eq!(result, SendResult::DeliveryFailed);
    }
}
