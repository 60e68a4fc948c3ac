// SPDX-License-Identifier: AGPL-3.0
// Phonebook CLI - command implementations

use anyhow::{bail, Result};
use phonebook_core::{
    AddGroupStatus, AppError, AuthClient, ClientSettings, FavoriteGroup, FavoritesStore,
    HttpFavoritesService, LoginOutcome, ProfileUpdate, Registration, SessionStore,
};
use serde_json::{Map, Value};
use std::sync::Arc;

pub async fn login(
    settings: &ClientSettings,
    sessions: &SessionStore,
    mobile: &str,
    password: &str,
) -> Result<()> {
    let client = AuthClient::new(settings)?;

    match client.login(mobile, password).await? {
        LoginOutcome::Authenticated(session) => {
            println!("Logged in as {}", session.display_name);
            sessions.sign_in(session)?;
        }
        LoginOutcome::UnknownUser => {
            bail!("{} is not registered. Please sign up first.", mobile.trim())
        }
    }
    Ok(())
}

pub fn whoami(sessions: &SessionStore) {
    match sessions.current() {
        Some(session) => println!(
            "{} (id {}, mobile {})",
            session.display_name, session.user_id, session.mobileno
        ),
        None => println!("Not logged in"),
    }
}

pub async fn check_number(settings: &ClientSettings, mobile: &str) -> Result<()> {
    let client = AuthClient::new(settings)?;

    match client.check_registration(mobile).await? {
        Registration::Registered { name } => println!("Already registered under: {}", name),
        Registration::Available => println!("{} is not registered yet.", mobile.trim()),
    }
    Ok(())
}

pub async fn update_profile(
    settings: &ClientSettings,
    sessions: &SessionStore,
    fields: Vec<(String, String)>,
) -> Result<()> {
    let client = AuthClient::new(settings)?;
    let changes: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    match client.update_profile(sessions, changes).await? {
        ProfileUpdate::Saved(session) => println!("Profile saved for {}", session.display_name),
        ProfileUpdate::Refused(message) => bail!("{}", message),
    }
    Ok(())
}

/// Build a favorites store for the signed-in user
pub fn favorites_store(settings: &ClientSettings, sessions: &SessionStore) -> Result<FavoritesStore> {
    if sessions.user_id().is_none() {
        return Err(AppError::NotLoggedIn.into());
    }

    let service = Arc::new(HttpFavoritesService::new(settings)?);
    Ok(FavoritesStore::new(service, sessions.subscribe()))
}

pub async fn add_group(store: &FavoritesStore, sessions: &SessionStore, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Group name cannot be empty.");
    }
    let user_id = sessions.user_id().ok_or(AppError::NotLoggedIn)?;

    if store.add_group(name, &user_id).await? == AddGroupStatus::Rejected {
        bail!("The server did not create group {:?}", name);
    }
    Ok(())
}

pub fn print_groups(groups: &[FavoriteGroup]) {
    if groups.is_empty() {
        println!("No favorite groups yet.");
        return;
    }

    for group in groups {
        println!("[{}] {}", group.id, group.name);
        for member in &group.members {
            println!("    [{}] {}  {}", member.id, member.name, member.mobileno);
        }
    }
}
