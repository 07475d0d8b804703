//! Cross-screen application state.
//!
//! Shared chrome (header badges, breadcrumb title, search echo) reads these
//! slices; each slice is written by exactly one owner through [`Action`]s.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use backoffice_events::{EventBus, RealtimeMessage, Subscription, UserEvent, user_channel};
use backoffice_core::UserId;

use crate::notify::Notifier;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSlice {
    pub query_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditCountSlice {
    pub counts: BTreeMap<String, u64>,
}

impl EditCountSlice {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSlice {
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The active list's current query string (owned by the list screen).
    SetSearchQuery(String),
    /// Pending edit count for an entity (owned by list screens + user channel).
    SetEditCount { entity: String, count: u64 },
    /// Title of the profile page being viewed (owned by profile screens).
    SetProfileTitle(Option<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStore {
    search: SearchSlice,
    edits: EditCountSlice,
    profile: ProfileSlice,
}

impl AppStore {
    pub fn search(&self) -> &SearchSlice {
        &self.search
    }

    pub fn edits(&self) -> &EditCountSlice {
        &self.edits
    }

    pub fn profile(&self) -> &ProfileSlice {
        &self.profile
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::SetSearchQuery(query_string) => self.search.query_string = query_string,
            Action::SetEditCount { entity, count } => {
                self.edits.counts.insert(entity, count);
            }
            Action::SetProfileTitle(title) => self.profile.page_title = title,
        }
    }
}

/// Shared handle to the [`AppStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreHandle(Arc<Mutex<AppStore>>);

impl StoreHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, action: Action) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(action);
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> AppStore {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Feeds a user's private channel into the store and the notifier.
///
/// Holds the channel subscription; dropping the listener unsubscribes.
#[derive(Debug)]
pub struct UserChannelListener {
    store: StoreHandle,
    subscription: Subscription<RealtimeMessage>,
}

impl UserChannelListener {
    pub fn attach<B>(bus: &B, user_id: UserId, store: StoreHandle) -> Self
    where
        B: EventBus<RealtimeMessage> + ?Sized,
    {
        Self {
            store,
            subscription: bus.subscribe(&user_channel(user_id)),
        }
    }

    /// Handle everything delivered so far. Returns how many events applied.
    pub fn pump(&self, notifier: &mut Notifier) -> usize {
        let mut applied = 0;
        for message in self.subscription.drain() {
            if !message.is(UserEvent::EVENT) {
                continue;
            }
            match message.decode::<UserEvent>() {
                Ok(UserEvent::EditCountChanged { entity, count }) => {
                    self.store.dispatch(Action::SetEditCount { entity, count });
                    applied += 1;
                }
                Ok(UserEvent::NotificationReceived { title, body }) => {
                    match body {
                        Some(body) => notifier.info(format!("{title}: {body}")),
                        None => notifier.info(title),
                    }
                    applied += 1;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring undecodable user event");
                }
            }
        }
        applied
    }
}
