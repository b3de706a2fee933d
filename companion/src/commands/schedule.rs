use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

use elderly_companion::email::{Mailer, SmtpMailer};
use elderly_companion::forms::{AppointmentForm, ReminderForm};
use elderly_companion::google_calendar::{CalendarClient, GoogleCalendarService};
use elderly_companion::scheduler::{AppointmentScheduler, AppointmentSettings, ReminderScheduler};
use super::{Command, CommandContext};

/// Command behind the appointment screen
pub struct AppointmentCommand {
    pub email: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

/// Command behind the medicine reminder screen
pub struct ReminderCommand {
    pub medicine: Option<String>,
    pub email: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

#[async_trait]
impl Command for AppointmentCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        let calendar: Arc<dyn CalendarClient> = Arc::new(
            GoogleCalendarService::new(&context.config)
                .context("Failed to create Google Calendar client")?,
        );
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(context.config.email.clone()));

        let scheduler = AppointmentScheduler::new(
            calendar,
            Some(mailer),
            AppointmentSettings::from(context.config.as_ref()),
        );

        let form = AppointmentForm {
            user_email: self.email.take().unwrap_or_default(),
            date: self.date,
            time: self.time,
        };

        println!("{}", scheduler.submit(&form).await);
        Ok(())
    }
}

#[async_trait]
impl Command for ReminderCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        let scheduler =
            ReminderScheduler::new(Arc::new(SmtpMailer::new(context.config.email.clone())));

        let form = ReminderForm {
            medicine_name: self.medicine.take().unwrap_or_default(),
            date: self.date,
            time: self.time,
            user_email: self.email.take().unwrap_or_default(),
        };

        println!("{}", scheduler.submit(&form).await);
        Ok(())
    }
}
