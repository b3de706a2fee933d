use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use elderly_companion::google_calendar::{CalendarClient, GoogleCalendarService};
use super::{Command, CommandContext};

/// Command to list the next events on the configured calendar
pub struct UpcomingCommand;

#[async_trait]
impl Command for UpcomingCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        info!("Fetching upcoming events...");

        let calendar = GoogleCalendarService::new(&context.config)
            .context("Failed to create Google Calendar client")?;

        let events = calendar.list_upcoming_events().await;

        if events.is_empty() {
            println!("📅 No upcoming events");
            return Ok(());
        }

        println!("📅 Upcoming events:");
        for event in &events {
            let title = event.summary.as_deref().unwrap_or("(no title)");
            println!("  • {} - {}", event.start, title);
            if context.debug {
                println!("      id: {}", event.id);
                if !event.attendees.is_empty() {
                    println!("      attendees: {}", event.attendees.join(", "));
                }
            }
        }

        Ok(())
    }
}
