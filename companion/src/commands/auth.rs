use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{self, Write};
use tracing::info;

use elderly_companion::google_calendar::GoogleCalendarService;
use super::{Command, CommandContext};

/// Command to run the Google Calendar consent flow and fill the token cache
pub struct AuthGoogleCommand;

#[async_trait]
impl Command for AuthGoogleCommand {
    async fn execute(&mut self, context: &CommandContext) -> Result<()> {
        info!("Setting up Google Calendar authentication...");

        let secret_path = context.config.client_secret_path();
        if !secret_path.exists() {
            println!("❌ Google Calendar client secret not found at {}", secret_path.display());
            println!("Please download OAuth2 credentials for this app:");
            println!("  1. Go to https://console.developers.google.com/");
            println!("  2. Create a new project or select existing one");
            println!("  3. Enable Google Calendar API");
            println!("  4. Create OAuth2 credentials (Desktop application)");
            println!("  5. Save the JSON file as {}", secret_path.display());
            println!("     or point google_calendar.client_secret_path at it in {}", config_hint());
            return Ok(());
        }

        let calendar = GoogleCalendarService::new(&context.config)
            .context("Failed to create Google Calendar client")?;

        if calendar.is_authenticated().await {
            println!("✅ Already authenticated with Google Calendar");
            println!("   Token cache: {}", calendar.token_file_path().display());
            return Ok(());
        }

        println!("🔐 Google Calendar authentication required");

        let (auth_url, _csrf_token) = calendar
            .get_auth_url()
            .await
            .context("Failed to build authentication URL")?;

        println!("\n📋 Follow these steps:");
        println!("1. Open this URL in your browser:");
        println!("   {}", auth_url);
        println!("\n2. Grant access to your Google Calendar");
        println!("3. Copy the authorization code from the redirect URL");
        println!("4. Paste it here when prompted");

        print!("\n🔑 Enter authorization code: ");
        io::stdout().flush()?;

        let mut auth_code = String::new();
        io::stdin().read_line(&mut auth_code)?;
        let auth_code = auth_code.trim();

        if auth_code.is_empty() {
            println!("❌ No authorization code provided");
            return Ok(());
        }

        println!("🔄 Exchanging authorization code for access token...");
        match calendar.authenticate_with_code(auth_code).await {
            Ok(()) => {
                println!("✅ Google Calendar authentication successful!");
                println!("   Token cached at {}", calendar.token_file_path().display());
            }
            Err(e) => {
                println!("❌ Authentication failed: {}", e);
            }
        }

        Ok(())
    }
}

fn config_hint() -> String {
    elderly_companion::Config::get_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "the config file".to_string())
}
