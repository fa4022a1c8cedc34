// Response shaping and deferred error formatting. This is the only place
// where raw ids inside entities and errors get resolved to display names;
// concepts stay oblivious to each other and raise errors carrying ids only.

use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::concepts::user::DELETED_USER;
use crate::concepts::{
    CommentDoc, EventDoc, FriendRequestDoc, PostDoc, TrailDoc, UserConcept, UserDoc,
};
use crate::error::{AppError, AppResult, ErrorCode};

/// Async formatter for one concrete error shape. Receives the error instance
/// and the User concept for id-to-name resolution.
pub type FormatterFn = for<'a> fn(&'a AppError, &'a UserConcept) -> BoxFuture<'a, AppResult<String>>;

/// Mapping from error code to formatter, built once at startup. Errors with
/// no registered formatter fall back to their raw rendering (template filled
/// with ids).
pub struct FormatterRegistry {
    users: Arc<UserConcept>,
    formatters: HashMap<ErrorCode, FormatterFn>,
}

impl FormatterRegistry {
    pub fn new(users: Arc<UserConcept>) -> Self {
        let mut registry = Self {
            users,
            formatters: HashMap::new(),
        };
        registry.register(ErrorCode::PostAuthorNotMatch, format_post_author);
        registry.register(ErrorCode::FriendRequestAlreadyExists, format_user_pair);
        registry.register(ErrorCode::FriendRequestNotFound, format_user_pair);
        registry.register(ErrorCode::AlreadyFriends, format_user_pair);
        registry.register(ErrorCode::FriendNotFound, format_user_pair);
        registry
    }

    pub fn register(&mut self, code: ErrorCode, formatter: FormatterFn) {
        self.formatters.insert(code, formatter);
    }

    /// Final user-facing message for an error. Formatting failures (e.g. the
    /// lookup itself hitting the store) degrade to the raw rendering rather
    /// than masking the original error.
    pub async fn format(&self, err: &AppError) -> String {
        match self.formatters.get(&err.code()) {
            Some(formatter) => formatter(err, &self.users)
                .await
                .unwrap_or_else(|_| err.to_string()),
            None => err.to_string(),
        }
    }
}

fn format_post_author<'a>(
    err: &'a AppError,
    users: &'a UserConcept,
) -> BoxFuture<'a, AppResult<String>> {
    Box::pin(async move {
        if let AppError::PostAuthorNotMatch { author, post } = err {
            let names = users.ids_to_usernames(&[*author]).await?;
            return Ok(err.format_with(&[names[0].clone(), post.to_string()]));
        }
        Ok(err.to_string())
    })
}

/// Shared formatter for every error carrying a pair of user ids.
fn format_user_pair<'a>(
    err: &'a AppError,
    users: &'a UserConcept,
) -> BoxFuture<'a, AppResult<String>> {
    Box::pin(async move {
        let pair = match err {
            AppError::FriendRequestAlreadyExists { from, to }
            | AppError::FriendRequestNotFound { from, to } => Some((*from, *to)),
            AppError::AlreadyFriends { user1, user2 }
            | AppError::FriendNotFound { user1, user2 } => Some((*user1, *user2)),
            _ => None,
        };
        match pair {
            Some((a, b)) => {
                let names = users.ids_to_usernames(&[a, b]).await?;
                Ok(err.format_with(&names))
            }
            None => Ok(err.to_string()),
        }
    })
}

/// Converts documents into the JSON shape the frontend expects, resolving
/// author/owner ids into usernames.
pub struct Responses {
    users: Arc<UserConcept>,
}

impl Responses {
    pub fn new(users: Arc<UserConcept>) -> Self {
        Self { users }
    }

    /// A user without its credential hash.
    pub fn user(&self, user: &UserDoc) -> Value {
        json!({
            "_id": user.id,
            "username": user.fields.username,
            "created": user.created,
            "updated": user.updated,
        })
    }

    pub fn users(&self, users: &[UserDoc]) -> Vec<Value> {
        users.iter().map(|u| self.user(u)).collect()
    }

    pub async fn post(&self, post: &PostDoc) -> AppResult<Value> {
        Ok(self.posts(std::slice::from_ref(post)).await?.pop().unwrap_or(Value::Null))
    }

    pub async fn posts(&self, posts: &[PostDoc]) -> AppResult<Vec<Value>> {
        let ids: Vec<_> = posts.iter().map(|p| p.fields.author).collect();
        let authors = self.users.ids_to_usernames(&ids).await?;
        posts
            .iter()
            .zip(authors)
            .map(|(post, author)| {
                let mut value = serde_json::to_value(post).map_err(anyhow::Error::from)?;
                value["author"] = Value::String(author);
                Ok(value)
            })
            .collect()
    }

    pub async fn comment(&self, comment: &CommentDoc) -> AppResult<Value> {
        Ok(self
            .comments(std::slice::from_ref(comment))
            .await?
            .pop()
            .unwrap_or(Value::Null))
    }

    pub async fn comments(&self, comments: &[CommentDoc]) -> AppResult<Vec<Value>> {
        let ids: Vec<_> = comments.iter().map(|c| c.fields.author).collect();
        let authors = self.users.ids_to_usernames(&ids).await?;
        comments
            .iter()
            .zip(authors)
            .map(|(comment, author)| {
                let mut value = serde_json::to_value(comment).map_err(anyhow::Error::from)?;
                value["author"] = Value::String(author);
                Ok(value)
            })
            .collect()
    }

    pub async fn event(&self, event: &EventDoc) -> AppResult<Value> {
        Ok(self
            .events(std::slice::from_ref(event))
            .await?
            .pop()
            .unwrap_or(Value::Null))
    }

    pub async fn events(&self, events: &[EventDoc]) -> AppResult<Vec<Value>> {
        let ids: Vec<_> = events.iter().map(|e| e.fields.owner).collect();
        let owners = self.users.ids_to_usernames(&ids).await?;
        events
            .iter()
            .zip(owners)
            .map(|(event, owner)| {
                let mut value = serde_json::to_value(event).map_err(anyhow::Error::from)?;
                value["owner"] = Value::String(owner);
                Ok(value)
            })
            .collect()
    }

    /// Template trails have no author and shape with `author: null`.
    pub async fn trail(&self, trail: &TrailDoc) -> AppResult<Value> {
        Ok(self
            .trails(std::slice::from_ref(trail))
            .await?
            .pop()
            .unwrap_or(Value::Null))
    }

    pub async fn trails(&self, trails: &[TrailDoc]) -> AppResult<Vec<Value>> {
        let authored: Vec<_> = trails.iter().filter_map(|t| t.fields.author).collect();
        let names = self.users.ids_to_usernames(&authored).await?;
        let by_id: HashMap<_, _> = authored.into_iter().zip(names).collect();
        trails
            .iter()
            .map(|trail| {
                let mut value = serde_json::to_value(trail).map_err(anyhow::Error::from)?;
                value["author"] = match trail.fields.author {
                    Some(id) => Value::String(
                        by_id.get(&id).cloned().unwrap_or_else(|| DELETED_USER.to_string()),
                    ),
                    None => Value::Null,
                };
                Ok(value)
            })
            .collect()
    }

    pub async fn friend_requests(&self, requests: &[FriendRequestDoc]) -> AppResult<Vec<Value>> {
        let mut ids: Vec<_> = requests.iter().map(|r| r.fields.from).collect();
        ids.extend(requests.iter().map(|r| r.fields.to));
        let names = self.users.ids_to_usernames(&ids).await?;
        requests
            .iter()
            .enumerate()
            .map(|(i, request)| {
                let mut value = serde_json::to_value(request).map_err(anyhow::Error::from)?;
                value["from"] = Value::String(names[i].clone());
                value["to"] = Value::String(names[i + requests.len()].clone());
                Ok(value)
            })
            .collect()
    }
}
