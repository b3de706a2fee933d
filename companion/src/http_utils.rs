//! HTTP helpers shared by the calendar client and the OAuth2 token calls

use reqwest::Response;
use tracing::warn;

use crate::errors::{CompanionError, CompanionResult};

/// Handle Google API response errors with consistent logging and error formatting
pub async fn handle_google_api_response(response: Response) -> CompanionResult<Response> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        warn!("Google Calendar API error: {} - {}", status, error_text);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CompanionError::authentication(
                "Google Calendar",
                format!("{} - {}", status, error_text),
            ));
        }
        return Err(CompanionError::api(
            "Google Calendar",
            format!("{} - {}", status, error_text),
        ));
    }
    Ok(response)
}

/// Handle OAuth2 token endpoint errors and return the body text
pub async fn handle_oauth2_response_with_text(response: Response) -> CompanionResult<String> {
    let status = response.status();
    let response_text = response.text().await?;

    if !status.is_success() {
        return Err(CompanionError::authentication(
            "Google OAuth2",
            format!("{} - {}", status, response_text),
        ));
    }

    Ok(response_text)
}

/// Parse JSON response with consistent error handling
pub async fn parse_json_response<T>(response: Response, context: &str) -> CompanionResult<T>
where
    T: serde::de::DeserializeOwned,
{
    response.json().await.map_err(|e| CompanionError::Parsing {
        format: context.to_string(),
        message: e.to_string(),
    })
}
