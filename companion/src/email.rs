use async_trait::async_trait;
use chrono::NaiveDateTime;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info};

use crate::config::EmailConfig;
use crate::errors::{CompanionError, CompanionResult};

/// Outbound plain-text mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> CompanionResult<()>;
}

/// Subject and body of one outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

impl EmailContent {
    pub fn appointment_confirmation(at: NaiveDateTime) -> Self {
        Self {
            subject: "ElderlyApp Appointment Confirmation".to_string(),
            body: format!(
                "Hello,\n\nThank you for scheduling an appointment.\n\n\
                 Appointment Details:\nDate: {}\nTime: {}.\n\n\
                 Best regards,\nThe ElderlyApp Team.",
                at.format("%B %d, %Y"),
                at.format("%I:%M %p"),
            ),
        }
    }

    pub fn medicine_reminder(medicine_name: &str, at: NaiveDateTime) -> Self {
        Self {
            subject: "Medicine Reminder".to_string(),
            body: format!(
                "Hello,\n\nThis is a reminder to take your medicine: {}.\n\n\
                 Reminder Details:\nDate: {}\nTime: {}.\n\n\
                 Best regards,\nThe ElderlyApp Team.",
                medicine_name,
                at.format("%B %d, %Y"),
                at.format("%I:%M %p"),
            ),
        }
    }
}

/// SMTP over STARTTLS to a fixed relay with one sender account
///
/// Credentials are checked on every send, so a missing password surfaces
/// as a failed send rather than at construction.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn build_message(&self, to: &str, subject: &str, body: &str) -> CompanionResult<Message> {
        let from: Mailbox = self.config.from_email.trim().parse()?;
        let to: Mailbox = to.trim().parse()?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> CompanionResult<()> {
        let result = async {
            let (from_email, password) = self.config.credentials()?;
            let message = self.build_message(to, subject, body)?;

            let transport =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                    .port(self.config.smtp_port)
                    .credentials(Credentials::new(from_email, password))
                    .build();

            debug!(
                "Sending '{}' to {} via {}:{}",
                subject, to, self.config.smtp_host, self.config.smtp_port
            );
            transport.send(message).await?;
            Ok::<(), CompanionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("Email sent successfully to {}", to);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email. Error: {}", e);
                Err(e)
            }
        }
    }
}
