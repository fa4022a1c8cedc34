use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("valid username pattern"));

/// Placeholder shown where a referenced user no longer exists.
pub const DELETED_USER: &str = "DELETED_USER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// bcrypt hash, never the raw credential.
    pub password: String,
}

pub type UserDoc = Doc<User>;

pub struct UserConcept {
    users: DocCollection<User>,
}

impl UserConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            users: store.collection("users"),
        }
    }

    /// Create a user. Username is unique and immutable after creation.
    pub async fn create(&self, username: &str, password: &str) -> AppResult<UserDoc> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::BadValues(
                "Username and password must be non-empty!".to_string(),
            ));
        }
        if !USERNAME_RE.is_match(username) {
            return Err(AppError::BadValues(
                "Username must be 3-30 characters of letters, digits or underscores!".to_string(),
            ));
        }
        if self
            .users
            .read_one(Filter::new().eq("username", username))
            .await?
            .is_some()
        {
            return Err(AppError::UserAlreadyExists {
                username: username.to_string(),
            });
        }

        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::from)?;
        let id = self
            .users
            .create_one(User {
                username: username.to_string(),
                password: hash,
            })
            .await?;
        self.get_by_id(id).await
    }

    pub async fn get_by_id(&self, id: Id) -> AppResult<UserDoc> {
        self.users
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist!", id)))
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<UserDoc> {
        self.users
            .read_one(Filter::new().eq("username", username))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist!", username)))
    }

    pub async fn get_users(&self) -> AppResult<Vec<UserDoc>> {
        self.users
            .read_many(Filter::new(), ReadOptions::sort("created", SortOrder::Asc))
            .await
    }

    /// Batch id-to-username resolution. Ids with no backing user resolve to
    /// [`DELETED_USER`] instead of failing, so stale references stay renderable.
    pub async fn ids_to_usernames(&self, ids: &[Id]) -> AppResult<Vec<String>> {
        let users = self.users.read_many(Filter::new(), ReadOptions::default()).await?;
        let by_id: HashMap<Id, &str> = users
            .iter()
            .map(|u| (u.id, u.fields.username.as_str()))
            .collect();
        Ok(ids
            .iter()
            .map(|id| by_id.get(id).map_or(DELETED_USER, |name| name).to_string())
            .collect())
    }

    /// Credential compare yields a user. Wrong username and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<UserDoc> {
        let user = self
            .users
            .read_one(Filter::new().eq("username", username))
            .await?
            .ok_or_else(|| {
                AppError::NotAllowed("Username or password is incorrect!".to_string())
            })?;
        let valid = bcrypt::verify(password, &user.fields.password).map_err(anyhow::Error::from)?;
        if !valid {
            return Err(AppError::NotAllowed(
                "Username or password is incorrect!".to_string(),
            ));
        }
        Ok(user)
    }

    /// Update a user. Only the credential is mutable; the username is fixed at
    /// creation.
    pub async fn update(&self, id: Id, update: &Map<String, Value>) -> AppResult<()> {
        self.sanitize_update(update)?;
        self.get_by_id(id).await?;

        let mut changes = Map::new();
        if let Some(password) = update.get("password").and_then(Value::as_str) {
            let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(anyhow::Error::from)?;
            changes.insert("password".to_string(), Value::String(hash));
        }
        self.users.update_one(Filter::by_id(id), &changes).await
    }

    pub async fn delete(&self, id: Id) -> AppResult<()> {
        self.users.delete_one(Filter::by_id(id)).await?;
        Ok(())
    }

    fn sanitize_update(&self, update: &Map<String, Value>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::EmptyUpdate { entity: "User" });
        }
        const ALLOWED: &[&str] = &["password"];
        for (key, value) in update {
            if !ALLOWED.contains(&key.as_str()) {
                return Err(AppError::FieldNotAllowed { field: key.clone() });
            }
            if key == "password" && value.as_str().map_or(true, str::is_empty) {
                return Err(AppError::BadValues("Password must be non-empty!".to_string()));
            }
        }
        Ok(())
    }
}
