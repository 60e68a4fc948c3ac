// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Session persistence
//
// The signed-in user is kept in a local JSON file so the app starts logged in.
// Consumers observe the current session through a watch channel.

use crate::settings::config_dir;
use crate::types::{AppError, Id, Session};
use std::fs;
use std::path::PathBuf;
use tokio::sync::watch;

/// Owns the current session and publishes changes to subscribers
pub struct SessionStore {
    current: watch::Sender<Option<Session>>,
    file_path: PathBuf,
}

impl SessionStore {
    /// Create a session store backed by the default config directory
    pub fn new() -> Result<Self, AppError> {
        Ok(Self::with_path(config_dir()?.join("session.json")))
    }

    /// Create a session store backed by an explicit file.
    ///
    /// A missing or unreadable file means nobody is logged in.
    pub fn with_path(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();

        let session = if file_path.exists() {
            match fs::read_to_string(&file_path)
                .map_err(AppError::from)
                .and_then(|content| {
                    serde_json::from_str::<Session>(&content)
                        .map_err(|e| AppError::Serialization(e.to_string()))
                }) {
                Ok(session) => {
                    tracing::info!("Restored session for user {}", session.user_id);
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!("Failed to restore session, starting logged out: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let (current, _) = watch::channel(session);
        Self { current, file_path }
    }

    /// The signed-in session, if any
    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// The signed-in user's id, if any
    pub fn user_id(&self) -> Option<Id> {
        self.current.borrow().as_ref().map(|s| s.user_id.clone())
    }

    /// Read-only view of the session for other components
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    /// Persist a new session and publish it
    pub fn sign_in(&self, session: Session) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(&session)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize session: {}", e)))?;

        fs::write(&self.file_path, content)
            .map_err(|e| AppError::FileIo(format!("Failed to write session: {}", e)))?;

        tracing::info!("Signed in as {} ({})", session.display_name, session.user_id);
        self.current.send_replace(Some(session));
        Ok(())
    }

    /// Forget the saved session and publish the logged-out state
    pub fn sign_out(&self) -> Result<(), AppError> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path)
                .map_err(|e| AppError::FileIo(format!("Failed to remove session: {}", e)))?;
        }

        tracing::info!("Signed out");
        self.current.send_replace(None);
        Ok(())
    }
}
