use async_trait::async_trait;
use thiserror::Error;
use time::{Date, Time};

#[derive(Debug, Error)]
#[allow(unused)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(String),

    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Booked,
    Modified,
    Cancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booked => "booked",
            NotificationKind::Modified => "modified",
            NotificationKind::Cancelled => "cancelled",
        }
    }
}

/// Previous booking details, included in "modified" notifications.
#[derive(Debug, Clone)]
pub struct PreviousBooking {
    pub date: Date,
    pub time: Time,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct TechNotification {
    pub to: String,
    pub kind: NotificationKind,
    pub date: Date,
    pub time: Time,
    pub service_name: String,
    pub service_duration_minutes: i32,
    pub previous: Option<PreviousBooking>,
}

#[derive(Debug, Clone)]
pub struct ClientNotification {
    pub to: String,
    pub client_name: String,
    pub kind: NotificationKind,
    pub date: Date,
    pub time: Time,
    pub service_name: String,
    pub service_duration_minutes: i32,
    pub previous: Option<PreviousBooking>,
}

/// Outbound email capability. State transitions never roll back on delivery
/// failure; callers log the error and move on.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends the confirmation link holding the raw (never persisted) token.
    async fn send_confirmation_link(&self, to: &str, token: &str) -> Result<(), EmailError>;

    /// Sends the final "you're booked" notice after a confirmation resolves.
    async fn send_final_confirmation(
        &self,
        to: &str,
        date: Date,
        time: Time,
    ) -> Result<(), EmailError>;

    async fn send_tech_notification(&self, email: &TechNotification) -> Result<(), EmailError>;

    async fn send_client_notification(&self, email: &ClientNotification) -> Result<(), EmailError>;
}

/// Writes outbound mail to the log instead of a wire. Stands in for the SMTP
/// transport in development and tests; production delivery plugs in behind
/// the same trait.
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_confirmation_link(&self, to: &str, token: &str) -> Result<(), EmailError> {
        tracing::info!(
            to,
            token_preview = &token[..8.min(token.len())],
            "confirmation link email"
        );
        Ok(())
    }

    async fn send_final_confirmation(
        &self,
        to: &str,
        date: Date,
        time: Time,
    ) -> Result<(), EmailError> {
        tracing::info!(to, %date, %time, "final confirmation email");
        Ok(())
    }

    async fn send_tech_notification(&self, email: &TechNotification) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            kind = email.kind.as_str(),
            date = %email.date,
            time = %email.time,
            service = %email.service_name,
            "technician notification email"
        );
        if let Some(prev) = &email.previous {
            tracing::info!(
                old_date = %prev.date,
                old_time = %prev.time,
                old_service = %prev.service_name,
                "rescheduled from"
            );
        }
        Ok(())
    }

    async fn send_client_notification(&self, email: &ClientNotification) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            client = %email.client_name,
            kind = email.kind.as_str(),
            date = %email.date,
            time = %email.time,
            service = %email.service_name,
            "client notification email"
        );
        Ok(())
    }
}
