//! Conversation sessions and the store that owns them.
//!
//! Each session holds its own [`DatasetRegistry`], a free-form preference
//! map (remembered date column, last chart spec, ...) and the conversation
//! history. Sessions share nothing; the store hands out one
//! `Arc<Mutex<Session>>` per id so calls on the same session are serialized
//! while different sessions proceed independently.
//!
//! # Thread Safety
//!
//! The id → session map sits behind a `parking_lot::RwLock`; lookups take the
//! read lock, creation and removal take the write lock.

use crate::registry::DatasetRegistry;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Preference key for the user's preferred date column.
pub const PREF_DATE_COLUMN: &str = "date_col";

/// Preference key for the most recent chart spec.
pub const PREF_LAST_CHART: &str = "last_chart";

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// State for one conversation.
#[derive(Debug)]
pub struct Session {
    pub registry: DatasetRegistry,
    prefs: HashMap<String, Value>,
    history: Vec<ChatTurn>,
    created_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            registry: DatasetRegistry::new(),
            prefs: HashMap::new(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Store a preference, replacing any previous value.
    pub fn remember(&mut self, key: impl Into<String>, value: Value) {
        self.prefs.insert(key.into(), value);
    }

    pub fn recall(&self, key: &str) -> Option<&Value> {
        self.prefs.get(key).filter(|v| !v.is_null())
    }

    /// Remove a preference and return what it held.
    pub fn forget(&mut self, key: &str) -> Option<Value> {
        self.prefs.remove(key).filter(|v| !v.is_null())
    }

    /// The remembered date column, if the user named one.
    pub fn date_column(&self) -> Option<&str> {
        self.recall(PREF_DATE_COLUMN).and_then(Value::as_str)
    }

    pub fn record(&mut self, role: ChatRole, content: impl Into<String>) {
        self.history.push(ChatTurn {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// All live sessions, keyed by id.
///
/// Sessions live until [`SessionStore::destroy`] or the end of the process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session under a fresh UUID v4 and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .insert(id.clone(), Arc::new(Mutex::new(Session::new())));
        info!("Created session {}", id);
        id
    }

    /// Make sure a session exists and return its id.
    ///
    /// With `None` (or a blank id) a new session is created.
    pub fn ensure(&self, session_id: Option<&str>) -> String {
        match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                self.get_or_create(id);
                id.to_string()
            }
            None => self.create(),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    /// The session for `session_id`, created empty on first reference.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.get(session_id) {
            return handle;
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating session {} on first reference", session_id);
                Arc::new(Mutex::new(Session::new()))
            })
            .clone()
    }

    /// Replace the session with a fresh one, dropping its tables and history.
    pub fn reset(&self, session_id: &str) -> SessionHandle {
        let handle = Arc::new(Mutex::new(Session::new()));
        self.sessions
            .write()
            .insert(session_id.to_string(), handle.clone());
        info!("Reset session {}", session_id);
        handle
    }

    /// Remove a session. Returns whether it existed.
    pub fn destroy(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            info!("Destroyed session {}", session_id);
        }
        removed
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ids of all live sessions, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

static_assertions::assert_impl_all!(Session: Send);
static_assertions::assert_impl_all!(SessionStore: Send, Sync);
