use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{Config, GoogleCalendarConfig};
use crate::errors::{CompanionError, CompanionResult};
use crate::http_utils::{
    handle_google_api_response, handle_oauth2_response_with_text, parse_json_response,
};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const UPCOMING_LIMIT: usize = 20;

/// An event to insert into the user's calendar
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub attendees: Vec<String>,
    /// Address our own confirmation mail goes to, if one is sent
    pub notify_email: String,
}

/// What the provider hands back after an insert
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventStart {
    At(DateTime<FixedOffset>),
    AllDay(NaiveDate),
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStart::At(at) => write!(f, "{}", at.format("%B %d, %Y %I:%M %p")),
            EventStart::AllDay(date) => write!(f, "{} (all day)", date.format("%B %d, %Y")),
        }
    }
}

/// An upcoming event as listed by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: EventStart,
    pub attendees: Vec<String>,
}

/// The calendar integration seen by the form handlers
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Insert one event and ask the provider to notify its attendees
    async fn create_event(&self, event: &NewEvent) -> CompanionResult<CreatedEvent>;

    /// Upcoming events, failing if the provider cannot be reached
    async fn fetch_upcoming_events(&self) -> CompanionResult<Vec<CalendarEvent>>;

    /// Upcoming events for display; provider failures yield an empty list
    async fn list_upcoming_events(&self) -> Vec<CalendarEvent> {
        match self.fetch_upcoming_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Error fetching events: {}", e);
                Vec::new()
            }
        }
    }
}

/// OAuth2 client bundle as downloaded from the Google developer console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    items: Option<Vec<GoogleEvent>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<GoogleEventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<GoogleEventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<GoogleEventAttendee>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GoogleEventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GoogleEventAttendee {
    email: Option<String>,
}

/// Google Calendar v3 over plain REST calls
///
/// Every operation authenticates from disk: the client secret file is read,
/// the cached token loaded and refreshed when close to expiry. Nothing is
/// kept between calls.
pub struct GoogleCalendarService {
    config: GoogleCalendarConfig,
    client_secret_path: PathBuf,
    token_file_path: PathBuf,
    time_zone: chrono_tz::Tz,
    http_client: reqwest::Client,
}

impl GoogleCalendarService {
    pub fn new(config: &Config) -> CompanionResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.google_calendar.application_name.clone())
            .timeout(std::time::Duration::from_secs(
                config.google_calendar.request_timeout_seconds,
            ))
            .build()?;

        Ok(Self {
            config: config.google_calendar.clone(),
            client_secret_path: config.client_secret_path(),
            token_file_path: config.token_path(),
            time_zone: config.get_timezone(),
            http_client,
        })
    }

    pub fn token_file_path(&self) -> &Path {
        &self.token_file_path
    }

    /// Check if we have a cached token that is still usable
    pub async fn is_authenticated(&self) -> bool {
        match self.load_stored_token().await {
            Ok(token) => match token.expires_at {
                Some(expires_at) => Utc::now() < expires_at || token.refresh_token.is_some(),
                None => true,
            },
            Err(_) => false,
        }
    }

    /// Get OAuth2 authorization URL for initial consent
    pub async fn get_auth_url(&self) -> CompanionResult<(String, CsrfToken)> {
        let secrets = self.load_client_secrets().await?;
        let client = self
            .oauth_client(&secrets)?
            .set_redirect_uri(self.redirect_url(&secrets)?);

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(CALENDAR_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        Ok((auth_url.to_string(), csrf_token))
    }

    /// Exchange authorization code for access token and write the token cache
    pub async fn authenticate_with_code(&self, auth_code: &str) -> CompanionResult<()> {
        let secrets = self.load_client_secrets().await?;
        let token_response = self.exchange_code_manually(&secrets, auth_code).await?;

        let stored_token = StoredToken {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: token_response
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
            scopes: vec![CALENDAR_SCOPE.to_string()],
        };

        self.store_token(&stored_token).await?;

        info!("Google Calendar authentication successful");
        Ok(())
    }

    /// Full authentication sequence, returning a bearer token
    async fn authenticate(&self) -> CompanionResult<String> {
        let secrets = self.load_client_secrets().await?;
        let token = self.load_stored_token().await?;

        if let Some(expires_at) = token.expires_at {
            if Utc::now() + Duration::minutes(5) >= expires_at {
                debug!("Access token expired, refreshing...");
                let refreshed = self.refresh_token(&secrets, &token).await?;
                return Ok(refreshed.access_token);
            }
        }

        Ok(token.access_token)
    }

    async fn refresh_token(
        &self,
        secrets: &ClientSecrets,
        current_token: &StoredToken,
    ) -> CompanionResult<StoredToken> {
        let refresh_token = current_token.refresh_token.as_ref().ok_or_else(|| {
            CompanionError::authentication(
                "Google Calendar",
                "Access token expired and no refresh token is available; run `elderly-companion auth-google`",
            )
        })?;

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .send_request(self.http_client.post(&secrets.token_uri).form(&params))
            .await?;
        let response_text = handle_oauth2_response_with_text(response).await?;

        let token_response: GoogleTokenResponse =
            serde_json::from_str(&response_text).map_err(|e| CompanionError::Parsing {
                format: "OAuth2 refresh response".to_string(),
                message: e.to_string(),
            })?;

        let new_token = StoredToken {
            access_token: token_response.access_token,
            refresh_token: token_response
                .refresh_token
                .or_else(|| Some(refresh_token.clone())),
            expires_at: token_response
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
            scopes: current_token.scopes.clone(),
        };

        self.store_token(&new_token).await?;
        info!("Google Calendar token refreshed successfully");
        Ok(new_token)
    }

    fn oauth_client(&self, secrets: &ClientSecrets) -> CompanionResult<BasicClient> {
        let auth_url = AuthUrl::new(secrets.auth_uri.clone())
            .map_err(|e| CompanionError::config(format!("Invalid auth_uri: {}", e)))?;
        let token_url = TokenUrl::new(secrets.token_uri.clone())
            .map_err(|e| CompanionError::config(format!("Invalid token_uri: {}", e)))?;

        Ok(BasicClient::new(
            ClientId::new(secrets.client_id.clone()),
            Some(ClientSecret::new(secrets.client_secret.clone())),
            auth_url,
            Some(token_url),
        ))
    }

    fn redirect_url(&self, secrets: &ClientSecrets) -> CompanionResult<RedirectUrl> {
        let redirect = secrets
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| self.config.redirect_uri.clone());

        RedirectUrl::new(redirect)
            .map_err(|e| CompanionError::config(format!("Invalid redirect URI: {}", e)))
    }

    async fn exchange_code_manually(
        &self,
        secrets: &ClientSecrets,
        auth_code: &str,
    ) -> CompanionResult<GoogleTokenResponse> {
        debug!("Exchanging authorization code of length {}", auth_code.len());
        let redirect = self.redirect_url(secrets)?;

        let params = [
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", auth_code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect.as_str()),
        ];

        let response = self
            .send_request(self.http_client.post(&secrets.token_uri).form(&params))
            .await?;

        let response_text = handle_oauth2_response_with_text(response).await?;

        let token_response: GoogleTokenResponse =
            serde_json::from_str(&response_text).map_err(|e| CompanionError::Parsing {
                format: "OAuth2 token response".to_string(),
                message: e.to_string(),
            })?;

        debug!("Token exchange successful, received access token");
        Ok(token_response)
    }

    async fn send_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> CompanionResult<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| CompanionError::from_request(e, self.config.request_timeout_seconds))
    }

    async fn load_client_secrets(&self) -> CompanionResult<ClientSecrets> {
        if !self.client_secret_path.exists() {
            return Err(CompanionError::file_not_found(
                "client secret file",
                &self.client_secret_path,
            ));
        }

        let content = fs::read_to_string(&self.client_secret_path).await?;
        let file: ClientSecretFile = serde_json::from_str(&content)?;

        file.installed.or(file.web).ok_or_else(|| {
            CompanionError::config(format!(
                "Client secret file {} has neither an \"installed\" nor a \"web\" section",
                self.client_secret_path.display()
            ))
        })
    }

    async fn store_token(&self, token: &StoredToken) -> CompanionResult<()> {
        if let Some(parent) = self.token_file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let token_json = serde_json::to_string_pretty(token)?;
        fs::write(&self.token_file_path, token_json).await?;
        debug!("Stored Google Calendar token to {:?}", self.token_file_path);
        Ok(())
    }

    async fn load_stored_token(&self) -> CompanionResult<StoredToken> {
        let token_data = fs::read_to_string(&self.token_file_path)
            .await
            .map_err(|_| {
                CompanionError::authentication(
                    "Google Calendar",
                    format!(
                        "No cached token at {}; run `elderly-companion auth-google` first",
                        self.token_file_path.display()
                    ),
                )
            })?;
        let token: StoredToken = serde_json::from_str(&token_data)?;
        Ok(token)
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.calendar_id)
        )
    }

    fn event_time(&self, at: NaiveDateTime) -> GoogleEventDateTime {
        GoogleEventDateTime {
            date_time: Some(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            date: None,
            time_zone: Some(self.time_zone.name().to_string()),
        }
    }

    fn convert_google_event(&self, gcal_event: GoogleEvent) -> CompanionResult<CalendarEvent> {
        let start = gcal_event
            .start
            .as_ref()
            .ok_or_else(|| CompanionError::api("Google Calendar", "Event has no start time"))?;

        let start = if let Some(datetime_str) = &start.date_time {
            EventStart::At(DateTime::parse_from_rfc3339(datetime_str).map_err(|e| {
                CompanionError::Parsing {
                    format: "event start".to_string(),
                    message: e.to_string(),
                }
            })?)
        } else if let Some(date_str) = &start.date {
            EventStart::AllDay(NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                CompanionError::Parsing {
                    format: "event date".to_string(),
                    message: e.to_string(),
                }
            })?)
        } else {
            return Err(CompanionError::api("Google Calendar", "Event has no start time"));
        };

        let attendees = gcal_event
            .attendees
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.email)
            .collect();

        Ok(CalendarEvent {
            id: gcal_event.id.unwrap_or_default(),
            summary: gcal_event.summary,
            description: gcal_event.description,
            start,
            attendees,
        })
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarService {
    async fn create_event(&self, event: &NewEvent) -> CompanionResult<CreatedEvent> {
        let access_token = self.authenticate().await?;

        let body = GoogleEvent {
            summary: Some(event.title.clone()),
            description: Some(event.description.clone()),
            start: Some(self.event_time(event.start)),
            end: Some(self.event_time(event.end)),
            attendees: Some(
                event
                    .attendees
                    .iter()
                    .map(|email| GoogleEventAttendee {
                        email: Some(email.clone()),
                    })
                    .collect(),
            ),
            ..GoogleEvent::default()
        };

        debug!(
            "Inserting event into calendar {} ({} attendees)",
            self.config.calendar_id,
            event.attendees.len()
        );

        let response = self
            .send_request(
                self.http_client
                    .post(self.events_url())
                    .bearer_auth(&access_token)
                    .query(&[("sendUpdates", self.config.send_updates.as_str())])
                    .json(&body),
            )
            .await?;

        let response = handle_google_api_response(response).await?;
        let created: GoogleEvent =
            parse_json_response(response, "Google Calendar insert response").await?;

        let created = CreatedEvent {
            id: created.id.unwrap_or_default(),
            html_link: created.html_link,
            status: created.status,
        };

        info!(
            "Event created successfully: {} {}",
            created.id,
            created.html_link.as_deref().unwrap_or("")
        );
        Ok(created)
    }

    async fn fetch_upcoming_events(&self) -> CompanionResult<Vec<CalendarEvent>> {
        let access_token = self.authenticate().await?;
        let time_min = Utc::now().to_rfc3339();
        let max_results = UPCOMING_LIMIT.to_string();

        let request = self
            .http_client
            .get(self.events_url())
            .bearer_auth(&access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("showDeleted", "false"),
                ("singleEvents", "true"),
                ("maxResults", max_results.as_str()),
                ("orderBy", "startTime"),
            ]);
        let response = self.send_request(request).await?;

        let response = handle_google_api_response(response).await?;
        let events_response: GoogleEventsResponse =
            parse_json_response(response, "Google Calendar events response").await?;

        let mut events = Vec::new();
        for gcal_event in events_response.items.unwrap_or_default() {
            match self.convert_google_event(gcal_event) {
                Ok(event) => events.push(event),
                Err(e) => debug!("Skipping event: {}", e),
            }
        }

        info!("Fetched {} upcoming events", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::TempDir;

    const ACCESS_TOKEN: &str = "test-access-token";

    fn write_secret(dir: &Path, token_uri: &str) {
        let resources = dir.join("Resources");
        std::fs::create_dir_all(&resources).unwrap();
        let secret = json!({
            "installed": {
                "client_id": "client-id.apps.googleusercontent.com",
                "client_secret": "shh",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": token_uri,
                "redirect_uris": ["http://localhost"]
            }
        });
        std::fs::write(resources.join("client_secret.json"), secret.to_string()).unwrap();
    }

    fn write_token(dir: &Path, expires_at: DateTime<Utc>, refresh: Option<&str>) {
        let token = StoredToken {
            access_token: ACCESS_TOKEN.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Some(expires_at),
            scopes: vec![CALENDAR_SCOPE.to_string()],
        };
        std::fs::write(dir.join("token.json"), serde_json::to_string(&token).unwrap()).unwrap();
    }

    fn service_for(dir: &TempDir, api_base_url: &str) -> GoogleCalendarService {
        let mut config = Config::default();
        config.general.base_dir = Some(dir.path().to_path_buf());
        config.google_calendar.api_base_url = api_base_url.to_string();
        GoogleCalendarService::new(&config).unwrap()
    }

    fn ready_service(server: &mockito::Server) -> (TempDir, GoogleCalendarService) {
        let dir = tempfile::tempdir().unwrap();
        write_secret(dir.path(), &format!("{}/token", server.url()));
        write_token(dir.path(), Utc::now() + Duration::hours(1), Some("refresh"));
        let service = service_for(&dir, &server.url());
        (dir, service)
    }

    fn appointment() -> NewEvent {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        NewEvent {
            title: "ElderlyApp Appointment".to_string(),
            description: "Your scheduled appointment.".to_string(),
            start,
            end: start + Duration::hours(1),
            attendees: vec!["a@b.com".to_string()],
            notify_email: "a@b.com".to_string(),
        }
    }

    #[tokio::test]
    async fn create_event_inserts_with_fixed_zone_and_notifies_attendees() {
        let mut server = mockito::Server::new_async().await;
        let (_dir, service) = ready_service(&server);

        let mock = server
            .mock("POST", "/calendars/primary/events")
            .match_query(Matcher::UrlEncoded("sendUpdates".into(), "all".into()))
            .match_header("authorization", "Bearer test-access-token")
            .match_body(Matcher::PartialJson(json!({
                "summary": "ElderlyApp Appointment",
                "description": "Your scheduled appointment.",
                "start": { "dateTime": "2024-06-01T09:00:00", "timeZone": "UTC" },
                "end": { "dateTime": "2024-06-01T10:00:00", "timeZone": "UTC" },
                "attendees": [{ "email": "a@b.com" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "evt_123", "status": "confirmed", "htmlLink": "https://calendar.google.com/event?eid=evt_123"}"#)
            .create_async()
            .await;

        let created = service.create_event(&appointment()).await.unwrap();
        mock.assert_async().await;

        assert_eq!(created.id, "evt_123");
        assert_eq!(created.status.as_deref(), Some("confirmed"));
        assert!(created.html_link.unwrap().contains("evt_123"));
    }

    #[tokio::test]
    async fn create_event_propagates_provider_failure() {
        let mut server = mockito::Server::new_async().await;
        let (_dir, service) = ready_service(&server);

        let _mock = server
            .mock("POST", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("backend exploded")
            .create_async()
            .await;

        let err = service.create_event(&appointment()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Api { .. }));
        assert!(err.to_string().contains("backend exploded"));
    }

    #[tokio::test]
    async fn unauthorized_is_an_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let (_dir, service) = ready_service(&server);

        let _mock = server
            .mock("POST", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid Credentials"}}"#)
            .create_async()
            .await;

        let err = service.create_event(&appointment()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Authentication { .. }));
    }

    #[tokio::test]
    async fn listing_requests_next_twenty_single_events() {
        let mut server = mockito::Server::new_async().await;
        let (_dir, service) = ready_service(&server);

        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("maxResults".into(), "20".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                Matcher::UrlEncoded("showDeleted".into(), "false".into()),
                Matcher::Regex("timeMin=".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [
                        {
                            "id": "evt_1",
                            "summary": "Doctor",
                            "start": { "dateTime": "2024-06-01T09:00:00Z" },
                            "attendees": [{ "email": "a@b.com" }]
                        },
                        {
                            "id": "evt_2",
                            "summary": "Birthday",
                            "start": { "date": "2024-06-03" }
                        },
                        {
                            "id": "evt_3",
                            "summary": "Broken"
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let events = service.list_upcoming_events().await;
        mock.assert_async().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary.as_deref(), Some("Doctor"));
        assert_eq!(events[0].attendees, vec!["a@b.com".to_string()]);
        assert_eq!(
            events[1].start,
            EventStart::AllDay(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
        );
    }

    #[tokio::test]
    async fn listing_swallows_provider_failure_while_fetch_propagates() {
        let mut server = mockito::Server::new_async().await;
        let (_dir, service) = ready_service(&server);

        let _mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        assert!(service.list_upcoming_events().await.is_empty());
        assert!(service.fetch_upcoming_events().await.is_err());
    }

    #[tokio::test]
    async fn missing_secret_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        write_token(dir.path(), Utc::now() + Duration::hours(1), None);
        let service = service_for(&dir, "http://127.0.0.1:9");

        let err = service.create_event(&appointment()).await.unwrap_err();
        let expected = dir.path().join("Resources").join("client_secret.json");
        assert_eq!(
            err.to_string(),
            format!("The client secret file was not found at: {}", expected.display())
        );

        assert!(service.list_upcoming_events().await.is_empty());
    }

    #[tokio::test]
    async fn secret_file_without_client_section_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("Resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(
            resources.join("client_secret.json"),
            json!({ "other": { "client_id": "x" } }).to_string(),
        )
        .unwrap();
        write_token(dir.path(), Utc::now() + Duration::hours(1), None);
        let service = service_for(&dir, "http://127.0.0.1:9");

        let err = service.create_event(&appointment()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Config { .. }));
        assert!(err.to_string().contains("neither an \"installed\" nor a \"web\" section"));
    }

    #[tokio::test]
    async fn timeout_reports_the_configured_limit() {
        // Connections complete in the backlog but nothing ever answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let api_base_url = format!("http://{}", listener.local_addr().unwrap());

        let dir = tempfile::tempdir().unwrap();
        write_secret(dir.path(), &format!("{}/token", api_base_url));
        write_token(dir.path(), Utc::now() + Duration::hours(1), None);

        let mut config = Config::default();
        config.general.base_dir = Some(dir.path().to_path_buf());
        config.google_calendar.api_base_url = api_base_url;
        config.google_calendar.request_timeout_seconds = 1;
        let service = GoogleCalendarService::new(&config).unwrap();

        let err = service.create_event(&appointment()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Timeout { timeout_seconds: 1, .. }));
        assert_eq!(err.to_string(), "Timeout error: HTTP request timed out after 1s");
    }

    #[tokio::test]
    async fn missing_token_cache_requires_consent() {
        let dir = tempfile::tempdir().unwrap();
        write_secret(dir.path(), "http://127.0.0.1:9/token");
        let service = service_for(&dir, "http://127.0.0.1:9");

        assert!(!service.is_authenticated().await);
        let err = service.create_event(&appointment()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Authentication { .. }));
        assert!(err.to_string().contains("auth-google"));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_cached() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        write_secret(dir.path(), &format!("{}/token", server.url()));
        write_token(dir.path(), Utc::now() - Duration::minutes(1), Some("refresh-me"));
        let service = service_for(&dir, &server.url());

        let token_mock = server
            .mock("POST", "/token")
            .match_header("user-agent", "ElderlyApp")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("grant_type=refresh_token".into()),
                Matcher::Regex("refresh_token=refresh-me".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh-token", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let events_mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer fresh-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let events = service.fetch_upcoming_events().await.unwrap();
        token_mock.assert_async().await;
        events_mock.assert_async().await;
        assert!(events.is_empty());

        let cached: StoredToken =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("token.json")).unwrap())
                .unwrap();
        assert_eq!(cached.access_token, "fresh-token");
        assert_eq!(cached.refresh_token.as_deref(), Some("refresh-me"));
    }

    #[tokio::test]
    async fn code_exchange_writes_token_cache() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        write_secret(dir.path(), &format!("{}/token", server.url()));
        let service = service_for(&dir, &server.url());

        let _mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("grant_type=authorization_code".into()),
                Matcher::Regex("code=4%2Fabc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "new", "refresh_token": "keep", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        service.authenticate_with_code("4/abc").await.unwrap();
        assert!(service.is_authenticated().await);

        let (url, _csrf) = service.get_auth_url().await.unwrap();
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("client_id=client-id.apps.googleusercontent.com"));
    }

    #[test]
    fn event_times_use_configured_zone() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.base_dir = Some(dir.path().to_path_buf());
        config.google_calendar.time_zone = "Europe/Dublin".to_string();
        let service = GoogleCalendarService::new(&config).unwrap();

        let at = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let time = service.event_time(at);
        assert_eq!(time.date_time.as_deref(), Some("2024-06-01T09:00:00"));
        assert_eq!(time.time_zone.as_deref(), Some("Europe/Dublin"));
    }
}
