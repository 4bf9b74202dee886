//! Outcome notification for tivowatch.
//!
//! [`message`] composes the read-only [`Notification`] from a terminal run;
//! [`mailer`] carries it to the mail relay. Delivery is strictly isolated
//! from the run outcome: a relay failure is logged and reported as
//! [`SendResult::DeliveryFailed`], never escalated.

pub mod mailer;
pub mod message;

pub use mailer::{notify, MailError, Mailer, OutgoingMessage, SendResult, SmtpMailer};
pub use message::{compose, FileStatus, Notification};
