//! # Session
//!
//! A [`Session`] is the handle a presentation layer holds after signing in.
//! It carries no permissions of its own: every command hands it to
//! [`App::authorize`](crate::App::authorize), which checks it against the
//! [`SessionRegistry`] and resolves an [`Actor`] from the current user and
//! role rows. Role edits, user deletion and sign-out therefore take effect
//! on the very next command.
//!
//! ```text
//! login ──► SessionRegistry.insert(id → user_id) ──► Session { id, user_id }
//!
//! command(&session)
//!     │
//!     ├── registry has id → user_id? ── no ──► SESSION_EXPIRED
//!     ├── user row still exists?     ── no ──► SESSION_EXPIRED (drop sessions)
//!     ├── role grants capability?    ── no ──► PERMISSION_DENIED
//!     ▼
//!   Actor { username, role, permissions }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use invpro_core::{Capability, CoreError, PermissionSet, Role, Section, User};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppResult;

/// Proof of a sign-in. Only [`login`](crate::commands::auth::login) mints
/// one that the registry accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: Uuid,
    user_id: i64,
    username: String,
    started_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn start(user: &User) -> Self {
        Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            username: user.username.clone(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// The signed-in user as of the current command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role_id: i64,
    pub role_name: String,
    pub permissions: PermissionSet,
}

impl Actor {
    pub fn new(user: &User, role: &Role) -> Self {
        Actor {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role_id: role.id,
            role_name: role.name.clone(),
            permissions: role.permissions.clone(),
        }
    }

    /// Checks one capability without failing.
    pub fn can(&self, section: Section, capability: Capability) -> bool {
        self.permissions.has(section, capability)
    }

    /// Fails with `PermissionDenied` unless the role grants the capability.
    pub fn require(&self, section: Section, capability: Capability) -> AppResult<()> {
        if self.can(section, capability) {
            return Ok(());
        }

        warn!(
            username = %self.username,
            section = %section,
            capability = %capability,
            "Permission denied"
        );
        Err(CoreError::PermissionDenied {
            section,
            capability,
        }
        .into())
    }

    /// Sections the user may open.
    pub fn visible_sections(&self) -> Vec<Section> {
        self.permissions.visible_sections()
    }
}

/// Live sessions by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, i64>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, i64>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, session: &Session) {
        self.lock().insert(session.id, session.user_id);
    }

    /// Ends one session. Returns false if it was not live.
    pub fn remove(&self, session_id: Uuid) -> bool {
        self.lock().remove(&session_id).is_some()
    }

    /// Ends every session of a user and returns how many there were.
    pub fn remove_user(&self, user_id: i64) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, owner| *owner != user_id);
        before - sessions.len()
    }

    /// True if the session was issued by this registry and is still live.
    pub fn is_live(&self, session: &Session) -> bool {
        self.lock().get(&session.id) == Some(&session.user_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
