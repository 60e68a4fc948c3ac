// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend record identifier.
///
/// The phonebook backend is not consistent about whether ids travel as JSON
/// numbers or strings, so the original form is kept and written back as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Text(String),
}

impl Id {
    /// Compare two ids by value, ignoring whether they arrived as numbers or strings
    pub fn matches(&self, other: &Id) -> bool {
        match (self, other) {
            (Id::Int(a), Id::Int(b)) => a == b,
            (Id::Text(a), Id::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Int(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Int(n.into())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>().map(Id::Int).unwrap_or_else(|_| Id::Text(s.to_string())))
    }
}

/// A single favorite contact inside a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteMember {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub mobileno: String,
}

/// A named collection of favorite contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteGroup {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub members: Vec<FavoriteMember>,
}

impl FavoriteGroup {
    /// Find a member of this group by id
    pub fn member(&self, id: &Id) -> Option<&FavoriteMember> {
        self.members.iter().find(|m| m.id.matches(id))
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Id,
    /// Business name, or the person's name for individual listings
    pub display_name: String,
    #[serde(default)]
    pub mobileno: String,
    pub logged_in_at: DateTime<Utc>,
    /// Raw user record as returned by the auth endpoint
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl Session {
    pub fn new(user_id: impl Into<Id>, display_name: impl Into<String>, mobileno: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            mobileno: mobileno.into(),
            logged_in_at: Utc::now(),
            profile: serde_json::Value::Null,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Base URL of the favorites endpoints (no trailing slash)
    pub favorites_base_url: String,
    /// Mobile-number login endpoint
    pub auth_url: String,
    /// Profile update endpoint
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
    /// Registration endpoint, also answers "is this number registered"
    #[serde(default = "default_signup_url")]
    pub signup_url: String,
    /// Shared passcode checked before contacting the auth endpoint
    #[serde(default = "default_passcode")]
    pub passcode: String,
    /// Optional connect timeout. None means requests may wait indefinitely.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

fn default_passcode() -> String {
    "signpost".to_string()
}

fn default_profile_url() -> String {
    "https://signpostphonebook.in/try_update_profile_for_new_database.php".to_string()
}

fn default_signup_url() -> String {
    "https://signpostphonebook.in/client_insert_data_for_new_database.php".to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            favorites_base_url: "http://signpostphonebook.in/favorites".to_string(),
            auth_url: "https://signpostphonebook.in/test_auth_for_new_database.php".to_string(),
            profile_url: default_profile_url(),
            signup_url: default_signup_url(),
            passcode: default_passcode(),
            connect_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    /// Build the shared HTTP client described by these settings
    pub fn http_client(&self) -> Result<reqwest::Client, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(std::time::Duration::from_secs(secs));
        }
        builder
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Error types for the client
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    ResponseFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::ResponseFormat(err.to_string())
        } else if err.is_connect() {
            AppError::Transport(format!("Cannot connect: {}", err))
        } else if err.is_timeout() {
            AppError::Transport(format!("Request timed out: {}", err))
        } else {
            AppError::Transport(format!("Request failed: {}", err))
        }
    }
}
