// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Account endpoints
//
// Login, registration lookup and profile updates. The backend answers each
// with a loose JSON object whose flag field decides the outcome.

use crate::remote::is_truthy;
use crate::session::SessionStore;
use crate::types::{AppError, ClientSettings, Id, Session};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a login attempt that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(Session),
    /// The number is not registered; the user should sign up
    UnknownUser,
}

/// Whether a mobile number already has a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Available,
    /// Already registered under this business or person name
    Registered { name: String },
}

/// Result of a profile update that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    /// Saved remotely; carries the refreshed session that was stored locally
    Saved(Session),
    /// The backend refused the change, with its message
    Refused(String),
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    mobileno: &'a str,
}

#[derive(Deserialize)]
struct UserRecord {
    id: Id,
    #[serde(default)]
    mobileno: Option<String>,
}

/// Business name when present, otherwise the person's name
fn display_name_of(record: &Value) -> Option<String> {
    ["businessname", "person"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

/// Check a mobile number the way the signup form does: ten digits, starting with 6-9
pub fn validate_mobile(mobile: &str) -> Result<&str, AppError> {
    let mobile = mobile.trim();
    if !mobile.starts_with(['6', '7', '8', '9']) {
        return Err(AppError::InvalidInput(
            "Mobile number must start with 6, 7, 8, or 9".to_string(),
        ));
    }
    if mobile.len() != 10 || !mobile.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(
            "Mobile number must be 10 digits".to_string(),
        ));
    }
    Ok(mobile)
}

/// Client for the phonebook's account endpoints
pub struct AuthClient {
    http_client: Client,
    auth_url: String,
    profile_url: String,
    signup_url: String,
    passcode: String,
}

impl AuthClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, AppError> {
        Ok(Self {
            http_client: settings.http_client()?,
            auth_url: settings.auth_url.clone(),
            profile_url: settings.profile_url.clone(),
            signup_url: settings.signup_url.clone(),
            passcode: settings.passcode.clone(),
        })
    }

    /// Log in with a registered mobile number
    pub async fn login(&self, mobile: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let mobile = mobile.trim();
        if mobile.is_empty() {
            return Err(AppError::InvalidInput(
                "Please enter your registered mobile number".to_string(),
            ));
        }
        if password != self.passcode {
            return Err(AppError::InvalidCredentials);
        }

        let body: Value = self
            .http_client
            .post(&self.auth_url)
            .json(&LoginRequest { mobileno: mobile })
            .send()
            .await?
            .json()
            .await?;

        if !is_truthy(body.get("valid")) {
            tracing::info!("Login refused for {}: number not registered", mobile);
            return Ok(LoginOutcome::UnknownUser);
        }

        let record: UserRecord = serde_json::from_value(body.clone())
            .map_err(|e| AppError::ResponseFormat(format!("Invalid user record: {}", e)))?;

        let display_name = display_name_of(&body).unwrap_or_default();

        tracing::info!("Login accepted for user {}", record.id);
        Ok(LoginOutcome::Authenticated(Session {
            user_id: record.id,
            display_name,
            mobileno: record.mobileno.unwrap_or_else(|| mobile.to_string()),
            logged_in_at: Utc::now(),
            profile: body,
        }))
    }

    /// Ask whether a number is already registered, before signing up
    pub async fn check_registration(&self, mobile: &str) -> Result<Registration, AppError> {
        let mobile = validate_mobile(mobile)?;

        let body: Value = self
            .http_client
            .post(&self.signup_url)
            .json(&LoginRequest { mobileno: mobile })
            .send()
            .await?
            .json()
            .await?;

        if is_truthy(body.get("registered")) {
            let name = display_name_of(&body).unwrap_or_else(|| "Unknown".to_string());
            tracing::info!("{} is already registered under {}", mobile, name);
            Ok(Registration::Registered { name })
        } else {
            Ok(Registration::Available)
        }
    }

    /// Send changed profile fields for the signed-in user.
    ///
    /// The whole record (stored profile overlaid with `changes`) is posted.
    /// On success the merged record becomes the stored session's profile.
    pub async fn update_profile(
        &self,
        sessions: &SessionStore,
        changes: Map<String, Value>,
    ) -> Result<ProfileUpdate, AppError> {
        let session = sessions.current().ok_or(AppError::NotLoggedIn)?;

        let mut record = match &session.profile {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        record.extend(changes);
        record.insert(
            "id".to_string(),
            serde_json::to_value(&session.user_id)
                .map_err(|e| AppError::Serialization(e.to_string()))?,
        );
        let record = Value::Object(record);

        let body: Value = self
            .http_client
            .post(&self.profile_url)
            .json(&record)
            .send()
            .await?
            .json()
            .await?;

        if !is_truthy(body.get("success")) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Failed to save changes.")
                .to_string();
            tracing::warn!("Profile update refused: {}", message);
            return Ok(ProfileUpdate::Refused(message));
        }

        let updated = Session {
            display_name: display_name_of(&record).unwrap_or(session.display_name),
            mobileno: record
                .get("mobileno")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(session.mobileno),
            profile: record,
            ..session
        };
        sessions.sign_in(updated.clone())?;

        tracing::info!("Profile updated for user {}", updated.user_id);
        Ok(ProfileUpdate::Saved(updated))
    }
}
