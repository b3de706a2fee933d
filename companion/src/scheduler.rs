//! The two submission workflows: validate, call out, report a message

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::email::{EmailContent, Mailer};
use crate::errors::{CompanionError, CompanionResult};
use crate::forms::{AppointmentForm, AppointmentRequest, ReminderForm, ReminderRequest};
use crate::google_calendar::{CalendarClient, CreatedEvent, NewEvent};

pub const APPOINTMENT_SUCCESS: &str =
    "Appointment scheduled successfully, and an invite has been sent!";

/// Event fields and options for appointments
#[derive(Debug, Clone)]
pub struct AppointmentSettings {
    pub title: String,
    pub description: String,
    pub duration: Duration,
    pub send_confirmation_email: bool,
}

impl Default for AppointmentSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AppointmentSettings {
    fn from(config: &Config) -> Self {
        Self {
            title: config.appointments.title.clone(),
            description: config.appointments.description.clone(),
            duration: config.appointment_duration(),
            send_confirmation_email: config.appointments.send_confirmation_email,
        }
    }
}

pub struct AppointmentScheduler {
    calendar: Arc<dyn CalendarClient>,
    mailer: Option<Arc<dyn Mailer>>,
    settings: AppointmentSettings,
}

impl AppointmentScheduler {
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        mailer: Option<Arc<dyn Mailer>>,
        settings: AppointmentSettings,
    ) -> Self {
        Self {
            calendar,
            mailer,
            settings,
        }
    }

    /// Handle one submission of the appointment screen
    pub async fn submit(&self, form: &AppointmentForm) -> String {
        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                debug!("Appointment form rejected: {}", e);
                return e.to_string();
            }
        };

        match self.schedule(&request).await {
            Ok(_) => APPOINTMENT_SUCCESS.to_string(),
            Err(e) => format!("Failed to schedule the appointment. Error: {}", e),
        }
    }

    pub fn event_for(&self, request: &AppointmentRequest) -> NewEvent {
        NewEvent {
            title: self.settings.title.clone(),
            description: self.settings.description.clone(),
            start: request.start(),
            end: request.end(self.settings.duration),
            attendees: vec![request.user_email.clone()],
            notify_email: request.user_email.clone(),
        }
    }

    /// Insert the event, then send our own confirmation if enabled
    pub async fn schedule(&self, request: &AppointmentRequest) -> CompanionResult<CreatedEvent> {
        let event = self.event_for(request);
        info!("Scheduling appointment at {} for {}", event.start, event.notify_email);

        let created = self.calendar.create_event(&event).await.map_err(|e| {
            warn!("Error creating event: {}", e);
            e
        })?;

        if self.settings.send_confirmation_email {
            let mailer = self.mailer.as_ref().ok_or_else(|| {
                CompanionError::config("Confirmation email enabled but no mail transport is configured")
            })?;
            let content = EmailContent::appointment_confirmation(event.start);
            info!("Sending confirmation email to {}", event.notify_email);
            mailer
                .send(&event.notify_email, &content.subject, &content.body)
                .await?;
        }

        Ok(created)
    }
}

pub struct ReminderScheduler {
    mailer: Arc<dyn Mailer>,
}

impl ReminderScheduler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Handle one submission of the reminder screen
    pub async fn submit(&self, form: &ReminderForm) -> String {
        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                debug!("Reminder form rejected: {}", e);
                return e.to_string();
            }
        };

        match self.remind(&request).await {
            Ok(()) => format!(
                "Reminder for {} set for {}, and an email has been sent!",
                request.medicine_name,
                request.at().format("%B %d, %Y %I:%M %p")
            ),
            Err(e) => format!("Failed to set the reminder. Error: {}", e),
        }
    }

    pub async fn remind(&self, request: &ReminderRequest) -> CompanionResult<()> {
        let content = EmailContent::medicine_reminder(&request.medicine_name, request.at());
        info!(
            "Sending reminder for {} at {} to {}",
            request.medicine_name,
            request.at(),
            request.user_email
        );
        self.mailer
            .send(&request.user_email, &content.subject, &content.body)
            .await
    }
}
