// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Shared client logic
//
// This crate provides:
// - ClientSettings and AppError types
// - SettingsStore for persistent settings
// - SessionStore for the persisted login session
// - AuthClient for login, registration lookup and profile updates
// - FavoritesService / HttpFavoritesService for the remote favorites backend
// - FavoritesStore, the synchronized snapshot of favorite groups
//
// Frontend-specific code lives in separate crates.

pub mod auth;
pub mod favorites;
pub mod remote;
pub mod session;
pub mod settings;
pub mod types;

// Re-export commonly used items
pub use auth::{validate_mobile, AuthClient, LoginOutcome, ProfileUpdate, Registration};
pub use favorites::{AddGroupStatus, FavoritesStore, SyncState};
pub use remote::{FavoritesService, HttpFavoritesService};
pub use session::SessionStore;
pub use settings::SettingsStore;
pub use types::{AppError, ClientSettings, FavoriteGroup, FavoriteMember, Id, Session};
