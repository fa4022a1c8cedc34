use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id};

/// Opaque session key mapped to a user. An absent key means logged out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub user: Id,
}

pub type SessionDoc = Doc<Session>;

pub struct SessionConcept {
    sessions: DocCollection<Session>,
}

impl SessionConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            sessions: store.collection("sessions"),
        }
    }

    /// Begin a session for a user and return its opaque key.
    pub async fn start(&self, user: Id) -> AppResult<SessionDoc> {
        let key = Uuid::new_v4().to_string();
        let id = self.sessions.create_one(Session { key, user }).await?;
        self.sessions
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} does not exist!", id)))
    }

    /// Resolve a session key to the logged-in user.
    pub async fn get_user(&self, key: Option<&str>) -> AppResult<Id> {
        let key = key.ok_or(AppError::Unauthenticated)?;
        let session = self
            .sessions
            .read_one(Filter::new().eq("key", key))
            .await?
            .ok_or(AppError::Unauthenticated)?;
        Ok(session.fields.user)
    }

    /// Fails when the key still maps to an active session.
    pub async fn is_logged_out(&self, key: Option<&str>) -> AppResult<()> {
        if let Some(key) = key {
            if self
                .sessions
                .read_one(Filter::new().eq("key", key))
                .await?
                .is_some()
            {
                return Err(AppError::NotAllowed("Must be logged out!".to_string()));
            }
        }
        Ok(())
    }

    /// End a session. Ending an already-absent session is a no-op.
    pub async fn end(&self, key: Option<&str>) -> AppResult<()> {
        if let Some(key) = key {
            self.sessions
                .delete_one(Filter::new().eq("key", key))
                .await?;
        }
        Ok(())
    }

    /// End every session belonging to a user (used when the user is deleted).
    pub async fn end_all(&self, user: Id) -> AppResult<()> {
        while self
            .sessions
            .delete_one(Filter::new().eq("user", user))
            .await?
        {}
        Ok(())
    }
}
