use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::{CompanionError, CompanionResult};

/// Environment variable holding the SMTP app password
pub const PASSWORD_ENV: &str = "GMAIL_APP_PASSWORD";
/// Environment variable overriding the sender address
pub const FROM_EMAIL_ENV: &str = "ELDERLY_COMPANION_FROM_EMAIL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub google_calendar: GoogleCalendarConfig,
    pub email: EmailConfig,
    pub appointments: AppointmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Directory relative paths resolve against; defaults to the executable's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleCalendarConfig {
    pub application_name: String,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub calendar_id: String,
    /// IANA zone every event is pinned to, regardless of the user's locale
    pub time_zone: String,
    pub send_updates: SendUpdates,
    pub api_base_url: String,
    pub redirect_uri: String,
    pub request_timeout_seconds: u64,
}

/// Who the calendar provider notifies when an event is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendUpdates {
    All,
    ExternalOnly,
    None,
}

impl SendUpdates {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendUpdates::All => "all",
            SendUpdates::ExternalOnly => "externalOnly",
            SendUpdates::None => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_email: String,
    /// Prefer GMAIL_APP_PASSWORD over storing this in the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentConfig {
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    /// Send our own confirmation mail on top of the provider's invite
    pub send_confirmation_email: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_dir: None,
        }
    }
}

impl Default for GoogleCalendarConfig {
    fn default() -> Self {
        Self {
            application_name: "ElderlyApp".to_string(),
            client_secret_path: PathBuf::from("Resources").join("client_secret.json"),
            token_path: PathBuf::from("token.json"),
            calendar_id: "primary".to_string(),
            time_zone: "UTC".to_string(),
            send_updates: SendUpdates::All,
            api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            from_email: "elderlyapp4@gmail.com".to_string(),
            from_password: None,
        }
    }
}

impl Default for AppointmentConfig {
    fn default() -> Self {
        Self {
            title: "ElderlyApp Appointment".to_string(),
            description: "Your scheduled appointment.".to_string(),
            duration_minutes: 60,
            send_confirmation_email: false,
        }
    }
}

impl Config {
    /// Load the config from the standard location, creating it with defaults if missing
    pub async fn load() -> Result<Config> {
        let config_path = Self::get_config_path()?;

        let config = if config_path.exists() {
            Self::load_from(&config_path).await?
        } else {
            info!("Config file not found, creating default configuration");
            let mut default_config = Config::default();
            default_config.save_to(&config_path).await?;
            default_config.apply_env_overrides(|key| std::env::var(key).ok());
            default_config
        };

        Ok(config)
    }

    /// Load the config from an explicit path; the file must exist
    pub async fn load_from(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply environment overrides; `lookup` is std::env::var outside of tests
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using SMTP password from {}", PASSWORD_ENV);
            self.email.from_password = Some(password);
        }

        if let Some(from_email) = lookup(FROM_EMAIL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Using sender address from {}", FROM_EMAIL_ENV);
            self.email.from_email = from_email;
        }
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, content)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("elderly-companion");

        Ok(config_dir.join("config.toml"))
    }

    /// Directory that bundled resources and the token cache live under
    pub fn base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.general.base_dir {
            return dir.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_path(&self.google_calendar.client_secret_path)
    }

    pub fn token_path(&self) -> PathBuf {
        self.resolve_path(&self.google_calendar.token_path)
    }

    /// Get timezone as parsed Tz object, falling back to UTC if invalid
    pub fn get_timezone(&self) -> chrono_tz::Tz {
        self.google_calendar
            .time_zone
            .parse::<chrono_tz::Tz>()
            .unwrap_or_else(|_| {
                warn!(
                    "Invalid time zone '{}' in configuration, using UTC",
                    self.google_calendar.time_zone
                );
                chrono_tz::UTC
            })
    }

    pub fn appointment_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.appointments.duration_minutes))
    }
}

impl EmailConfig {
    /// Sender address and password, or a configuration error when no password is set
    pub fn credentials(&self) -> CompanionResult<(String, String)> {
        if self.from_email.trim().is_empty() {
            return Err(CompanionError::config("No sender address configured (email.from_email)"));
        }

        match &self.from_password {
            Some(password) if !password.trim().is_empty() => {
                Ok((self.from_email.clone(), password.clone()))
            }
            _ => Err(CompanionError::config(format!(
                "No SMTP credential configured for {}; set {} or email.from_password",
                self.from_email, PASSWORD_ENV
            ))),
        }
    }
}
