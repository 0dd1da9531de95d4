//! Sign-in state.
//!
//! ```text
//! Unauthenticated ──sign_in──▶ Authenticating ──▶ Syncing ──ok──▶ Synced
//!        ▲                                          │
//!        │                                          └─err──▶ Stale
//!        └──────────────── sign_out (store kept) ◀──────────────┘
//! ```
//!
//! Only the owner id and access token are persisted, under `<ns>-session`,
//! so the next process starts signed in without a refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{namespaced_key, StorageBackend};

const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub owner_id: String,
    pub access_token: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    /// Full refresh in flight
    Syncing,
    /// Normal dual-write operation
    Synced,
    /// Signed in but the last refresh failed; writes still go remote
    Stale,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::Syncing | SessionState::Synced | SessionState::Stale
        )
    }
}

/// Read the persisted session, treating unreadable data as signed out
pub fn load_session<B: StorageBackend>(backend: &B, namespace: &str) -> Option<Session> {
    let key = namespaced_key(namespace, SESSION_KEY);
    let raw = match backend.read(&key) {
        Ok(raw) => raw?,
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "unreadable session, signing out");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "corrupt session, signing out");
            None
        }
    }
}

pub fn save_session<B: StorageBackend>(
    backend: &B,
    namespace: &str,
    session: &Session,
) -> Result<()> {
    let json = serde_json::to_string(session)?;
    backend.write(&namespaced_key(namespace, SESSION_KEY), &json)
}

pub fn clear_session<B: StorageBackend>(backend: &B, namespace: &str) -> Result<()> {
    backend.delete(&namespaced_key(namespace, SESSION_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    #[test]
    fn session_round_trips_and_clears() {
        let backend = MemoryBackend::new();
        let session = Session {
            owner_id: "user-1".to_string(),
            access_token: "jwt".to_string(),
            signed_in_at: Utc::now(),
        };
        save_session(&backend, "taskflow", &session).unwrap();
        assert_eq!(load_session(&backend, "taskflow"), Some(session));

        clear_session(&backend, "taskflow").unwrap();
        assert_eq!(load_session(&backend, "taskflow"), None);
    }

    #[test]
    fn corrupt_session_reads_as_signed_out() {
        let backend = MemoryBackend::new();
        backend.insert_raw("taskflow-session", "][");
        assert_eq!(load_session(&backend, "taskflow"), None);
    }
}
