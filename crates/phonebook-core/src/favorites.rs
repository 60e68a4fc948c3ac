// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Favorites synchronization
//
// Favorite groups live on the remote service. The store keeps the last
// successfully fetched list and rebuilds it after every mutation; it never
// patches the list locally.

use crate::remote::FavoritesService;
use crate::types::{AppError, FavoriteGroup, Id, Session};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Whether the snapshot reflects every operation issued so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No operation in flight; the snapshot is the result of the last completed load
    Settled,
    /// A request or reload is in flight or queued
    Stale,
}

/// Outcome of `FavoritesStore::add_group` when the request itself went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddGroupStatus {
    Added,
    /// The service answered without `success`; nothing was reloaded
    Rejected,
}

/// Decrements the in-flight counter when an operation finishes or is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Operation<'a> {
    _queue: MutexGuard<'a, ()>,
    _in_flight: InFlight<'a>,
}

/// Client-side mirror of the signed-in user's favorite groups
pub struct FavoritesStore {
    service: Arc<dyn FavoritesService>,
    session: watch::Receiver<Option<Session>>,
    groups: watch::Sender<Vec<FavoriteGroup>>,
    in_flight: AtomicUsize,
    /// FIFO queue: one operation (request plus reload) at a time
    queue: Mutex<()>,
}

impl FavoritesStore {
    pub fn new(service: Arc<dyn FavoritesService>, session: watch::Receiver<Option<Session>>) -> Self {
        let (groups, _) = watch::channel(Vec::new());
        Self {
            service,
            session,
            groups,
            in_flight: AtomicUsize::new(0),
            queue: Mutex::new(()),
        }
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> Vec<FavoriteGroup> {
        self.groups.borrow().clone()
    }

    /// Receiver notified every time the snapshot is replaced
    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteGroup>> {
        self.groups.subscribe()
    }

    /// Look up a group in the current snapshot
    pub fn group(&self, id: &Id) -> Option<FavoriteGroup> {
        self.groups.borrow().iter().find(|g| g.id.matches(id)).cloned()
    }

    pub fn sync_state(&self) -> SyncState {
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            SyncState::Settled
        } else {
            SyncState::Stale
        }
    }

    fn current_user(&self) -> Option<Id> {
        self.session.borrow().as_ref().map(|s| s.user_id.clone())
    }

    async fn begin(&self) -> Operation<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = InFlight(&self.in_flight);
        let queue = self.queue.lock().await;
        Operation {
            _queue: queue,
            _in_flight: in_flight,
        }
    }

    /// Fetch the full group list for the session user and replace the snapshot.
    ///
    /// Does nothing when nobody is logged in. On any error the previous
    /// snapshot stays in place and the call can simply be repeated.
    pub async fn load(&self) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.reload().await
    }

    async fn reload(&self) -> Result<(), AppError> {
        let Some(user_id) = self.current_user() else {
            tracing::debug!("No session user, skipping favorites load");
            return Ok(());
        };

        let payload = self.service.list_groups(&user_id).await.map_err(|e| {
            tracing::warn!("Failed to load favorites: {}", e);
            e
        })?;

        let groups = decode_groups(payload).map_err(|e| {
            tracing::warn!("Ignoring favorites response: {}", e);
            e
        })?;

        tracing::info!("Loaded {} favorite groups for user {}", groups.len(), user_id);
        self.groups.send_replace(groups);
        Ok(())
    }

    /// Reload after a mutation the service already accepted.
    ///
    /// The change has happened remotely, so a failed reload only leaves the
    /// previous snapshot in place; it does not fail the mutation.
    async fn reload_after_mutation(&self) {
        if let Err(e) = self.reload().await {
            tracing::warn!("Mutation applied but favorites reload failed, keeping last snapshot: {}", e);
        }
    }

    /// Drop the snapshot, e.g. after logout
    pub async fn clear(&self) {
        let _op = self.begin().await;
        self.groups.send_replace(Vec::new());
    }

    /// Create a group; reloads only if the service reports success
    pub async fn add_group(&self, name: &str, user_id: &Id) -> Result<AddGroupStatus, AppError> {
        let _op = self.begin().await;

        if !self.service.create_group(user_id, name).await? {
            tracing::warn!("Favorites service did not create group {:?}", name);
            return Ok(AddGroupStatus::Rejected);
        }

        self.reload_after_mutation().await;
        Ok(AddGroupStatus::Added)
    }

    pub async fn edit_group(&self, group_id: &Id, new_name: &str) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.service.rename_group(group_id, new_name).await?;
        self.reload_after_mutation().await;
        Ok(())
    }

    /// Delete a group. Unknown ids are fine; the reload just won't show them.
    pub async fn delete_group(&self, group_id: &Id) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.service.delete_group(group_id).await?;
        self.reload_after_mutation().await;
        Ok(())
    }

    pub async fn add_member(&self, group_id: &Id, name: &str, mobile: &str) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.service.add_member(group_id, name, mobile).await?;
        self.reload_after_mutation().await;
        Ok(())
    }

    /// Add the same contact to several groups, one group at a time in the given
    /// order. Every group costs its own reload. Stops at the first group whose
    /// add request fails.
    pub async fn add_member_to_groups(
        &self,
        group_ids: &[Id],
        name: &str,
        mobile: &str,
    ) -> Result<(), AppError> {
        for group_id in group_ids {
            self.add_member(group_id, name, mobile).await?;
        }
        Ok(())
    }

    pub async fn edit_member(&self, member_id: &Id, name: &str, mobile: &str) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.service.edit_member(member_id, name, mobile).await?;
        self.reload_after_mutation().await;
        Ok(())
    }

    pub async fn delete_member(&self, member_id: &Id) -> Result<(), AppError> {
        let _op = self.begin().await;
        self.service.delete_member(member_id).await?;
        self.reload_after_mutation().await;
        Ok(())
    }

    /// Keep the snapshot in step with the session.
    ///
    /// Loads once for the current user, again whenever the user id changes,
    /// and clears the snapshot on logout. The task exits when the session
    /// provider goes away or the store has been dropped.
    pub fn spawn_session_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        let mut session = self.session.clone();

        tokio::spawn(async move {
            let mut last_user: Option<Id> = None;

            loop {
                let user = session.borrow_and_update().as_ref().map(|s| s.user_id.clone());

                if !same_user(&user, &last_user) {
                    let Some(store) = store.upgrade() else {
                        break;
                    };

                    match &user {
                        Some(user_id) => {
                            tracing::info!("Session user is now {}, loading favorites", user_id);
                            if let Err(e) = store.load().await {
                                tracing::error!("Favorites load after session change failed: {}", e);
                            }
                        }
                        None => store.clear().await,
                    }
                    last_user = user;
                }

                if session.changed().await.is_err() {
                    break;
                }
            }

            tracing::debug!("Session sync stopped");
        })
    }
}

fn same_user(a: &Option<Id>, b: &Option<Id>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.matches(b),
        (None, None) => true,
        _ => false,
    }
}

fn decode_groups(payload: Value) -> Result<Vec<FavoriteGroup>, AppError> {
    match payload {
        Value::Array(_) => serde_json::from_value(payload)
            .map_err(|e| AppError::ResponseFormat(format!("Malformed favorite group: {}", e))),
        other => Err(AppError::ResponseFormat(format!(
            "Expected a list of groups, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
