use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::store::Id;

/// Base error kinds. Every concrete error maps to exactly one kind, and the
/// kind alone decides the HTTP status class at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client sent invalid or missing data.
    BadValues,
    /// A referenced id has no corresponding entity.
    NotFound,
    /// Authorization or business-rule violation.
    NotAllowed,
    /// Store or infrastructure failure, never surfaced verbatim.
    Internal,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::BadValues => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotAllowed => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Stable keys for the formatter registry, one per concrete error shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Database,
    BadValues,
    NotFound,
    NotAllowed,
    MissingField,
    FieldNotAllowed,
    EmptyUpdate,
    Unauthenticated,
    UserAlreadyExists,
    PostAuthorNotMatch,
    CommentAuthorNotMatch,
    TrailAuthorNotMatch,
    EventOwnerNotMatch,
    AlreadyRegistered,
    AlreadyUnregistered,
    NotRegistered,
    PinnedTrailLimitMet,
    FriendRequestAlreadyExists,
    FriendRequestNotFound,
    AlreadyFriends,
    FriendNotFound,
}

/// Closed error taxonomy for the whole application.
///
/// Concrete variants carry the raw offending ids, not display names: concepts
/// raise these without ever consulting another concept. Resolving ids to
/// usernames happens later, in the formatter registry at the response
/// boundary.
#[derive(Debug)]
pub enum AppError {
    Database(anyhow::Error),
    BadValues(String),
    NotFound(String),
    NotAllowed(String),
    MissingField { entity: &'static str, field: &'static str },
    FieldNotAllowed { field: String },
    EmptyUpdate { entity: &'static str },
    Unauthenticated,
    UserAlreadyExists { username: String },
    PostAuthorNotMatch { author: Id, post: Id },
    CommentAuthorNotMatch { user: Id, comment: Id },
    TrailAuthorNotMatch { user: Id, trail: Id },
    EventOwnerNotMatch { user: Id, event: Id },
    AlreadyRegistered { user: Id, event: Id },
    AlreadyUnregistered { user: Id, event: Id },
    NotRegistered { user: Id, event: Id },
    PinnedTrailLimitMet { user: Id },
    FriendRequestAlreadyExists { from: Id, to: Id },
    FriendRequestNotFound { from: Id, to: Id },
    AlreadyFriends { user1: Id, user2: Id },
    FriendNotFound { user1: Id, user2: Id },
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(_) => ErrorKind::Internal,
            AppError::BadValues(_)
            | AppError::MissingField { .. }
            | AppError::EmptyUpdate { .. } => ErrorKind::BadValues,
            AppError::NotFound(_)
            | AppError::FriendRequestNotFound { .. }
            | AppError::FriendNotFound { .. } => ErrorKind::NotFound,
            AppError::NotAllowed(_)
            | AppError::FieldNotAllowed { .. }
            | AppError::Unauthenticated
            | AppError::UserAlreadyExists { .. }
            | AppError::PostAuthorNotMatch { .. }
            | AppError::CommentAuthorNotMatch { .. }
            | AppError::TrailAuthorNotMatch { .. }
            | AppError::EventOwnerNotMatch { .. }
            | AppError::AlreadyRegistered { .. }
            | AppError::AlreadyUnregistered { .. }
            | AppError::NotRegistered { .. }
            | AppError::PinnedTrailLimitMet { .. }
            | AppError::FriendRequestAlreadyExists { .. }
            | AppError::AlreadyFriends { .. } => ErrorKind::NotAllowed,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::Database,
            AppError::BadValues(_) => ErrorCode::BadValues,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::NotAllowed(_) => ErrorCode::NotAllowed,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::FieldNotAllowed { .. } => ErrorCode::FieldNotAllowed,
            AppError::EmptyUpdate { .. } => ErrorCode::EmptyUpdate,
            AppError::Unauthenticated => ErrorCode::Unauthenticated,
            AppError::UserAlreadyExists { .. } => ErrorCode::UserAlreadyExists,
            AppError::PostAuthorNotMatch { .. } => ErrorCode::PostAuthorNotMatch,
            AppError::CommentAuthorNotMatch { .. } => ErrorCode::CommentAuthorNotMatch,
            AppError::TrailAuthorNotMatch { .. } => ErrorCode::TrailAuthorNotMatch,
            AppError::EventOwnerNotMatch { .. } => ErrorCode::EventOwnerNotMatch,
            AppError::AlreadyRegistered { .. } => ErrorCode::AlreadyRegistered,
            AppError::AlreadyUnregistered { .. } => ErrorCode::AlreadyUnregistered,
            AppError::NotRegistered { .. } => ErrorCode::NotRegistered,
            AppError::PinnedTrailLimitMet { .. } => ErrorCode::PinnedTrailLimitMet,
            AppError::FriendRequestAlreadyExists { .. } => ErrorCode::FriendRequestAlreadyExists,
            AppError::FriendRequestNotFound { .. } => ErrorCode::FriendRequestNotFound,
            AppError::AlreadyFriends { .. } => ErrorCode::AlreadyFriends,
            AppError::FriendNotFound { .. } => ErrorCode::FriendNotFound,
        }
    }

    /// Message template with positional placeholders.
    pub fn template(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Internal server error",
            AppError::BadValues(_) | AppError::NotFound(_) | AppError::NotAllowed(_) => "{0}",
            AppError::MissingField { .. } => "Missing a required {1} field for {0}!",
            AppError::FieldNotAllowed { .. } => "Cannot update '{0}' field!",
            AppError::EmptyUpdate { .. } => "No update provided to {0}!",
            AppError::Unauthenticated => "Must be logged in!",
            AppError::UserAlreadyExists { .. } => "User with username {0} already exists!",
            AppError::PostAuthorNotMatch { .. } => "{0} is not the author of post {1}!",
            AppError::CommentAuthorNotMatch { .. } => "{0} is not the author of comment {1}!",
            AppError::TrailAuthorNotMatch { .. } => "{0} is not the author of trail {1}!",
            AppError::EventOwnerNotMatch { .. } => "{0} is not the owner of event {1}!",
            AppError::AlreadyRegistered { .. } => "{0} is already registered for event {1}!",
            AppError::AlreadyUnregistered { .. } => "{0} is already unregistered for event {1}!",
            AppError::NotRegistered { .. } => "{0} is not registered for event {1}!",
            AppError::PinnedTrailLimitMet { .. } => "Max number of pins met!",
            AppError::FriendRequestAlreadyExists { .. } => {
                "Friend request between {0} and {1} already exists!"
            }
            AppError::FriendRequestNotFound { .. } => {
                "Friend request between {0} and {1} does not exist!"
            }
            AppError::AlreadyFriends { .. } => "{0} and {1} are already friends!",
            AppError::FriendNotFound { .. } => "{0} and {1} are not friends!",
        }
    }

    /// Raw placeholder values, in positional order.
    pub fn args(&self) -> Vec<String> {
        match self {
            AppError::Database(_) | AppError::Unauthenticated => vec![],
            AppError::BadValues(msg) | AppError::NotFound(msg) | AppError::NotAllowed(msg) => {
                vec![msg.clone()]
            }
            AppError::MissingField { entity, field } => {
                vec![entity.to_string(), field.to_string()]
            }
            AppError::FieldNotAllowed { field } => vec![field.clone()],
            AppError::EmptyUpdate { entity } => vec![entity.to_string()],
            AppError::UserAlreadyExists { username } => vec![username.clone()],
            AppError::PostAuthorNotMatch { author, post } => {
                vec![author.to_string(), post.to_string()]
            }
            AppError::CommentAuthorNotMatch { user, comment } => {
                vec![user.to_string(), comment.to_string()]
            }
            AppError::TrailAuthorNotMatch { user, trail } => {
                vec![user.to_string(), trail.to_string()]
            }
            AppError::EventOwnerNotMatch { user, event } => {
                vec![user.to_string(), event.to_string()]
            }
            AppError::AlreadyRegistered { user, event }
            | AppError::AlreadyUnregistered { user, event }
            | AppError::NotRegistered { user, event } => {
                vec![user.to_string(), event.to_string()]
            }
            AppError::PinnedTrailLimitMet { user } => vec![user.to_string()],
            AppError::FriendRequestAlreadyExists { from, to }
            | AppError::FriendRequestNotFound { from, to } => {
                vec![from.to_string(), to.to_string()]
            }
            AppError::AlreadyFriends { user1, user2 }
            | AppError::FriendNotFound { user1, user2 } => {
                vec![user1.to_string(), user2.to_string()]
            }
        }
    }

    /// Render the template with the given resolved placeholder values.
    /// Callers pass display names where they managed to resolve ids.
    pub fn format_with(&self, resolved: &[String]) -> String {
        let mut msg = self.template().to_string();
        for (i, value) in resolved.iter().enumerate() {
            msg = msg.replace(&format!("{{{}}}", i), value);
        }
        msg
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fallback rendering: the template filled with raw ids.
        write!(f, "{}", self.format_with(&self.args()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.kind().status();
        let message = match &self {
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
