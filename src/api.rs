// HTTP surface: an explicit route table mapping (verb, path) to handlers.
// Handlers resolve the session cookie to a user id, delegate to the
// synchronization layer, and shape replies through `Responses`. Errors render
// through the formatter registry into `{error, status}`.

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::app_state::AppState;
use crate::concepts::TrailStop;
use crate::error::{AppResult, ErrorKind};
use crate::store::Id;
use crate::sync::NewEvent;

pub const SESSION_COOKIE: &str = "session_key";

/// Boundary error: status class derived from the error kind plus the
/// registry-formatted message.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));
        (self.status, body).into_response()
    }
}

pub type ApiResult = Result<Json<Value>, ApiError>;

async fn respond(state: &AppState, result: AppResult<Value>) -> ApiResult {
    match result {
        Ok(value) => Ok(Json(value)),
        Err(err) => {
            if err.kind() == ErrorKind::Internal {
                tracing::error!("internal error: {:?}", err);
            }
            let status = err.kind().status();
            let message = state.registry.format(&err).await;
            Err(ApiError { status, message })
        }
    }
}

fn session_key(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// The application's full route table, built once at startup.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/session", get(get_session_user))
        .route("/login", post(log_in))
        .route("/logout", post(log_out))
        // Users
        .route("/users", get(get_users).post(create_user).patch(update_user).delete(delete_user))
        .route("/users/{username}", get(get_user))
        // Posts
        .route("/posts", get(get_posts).post(create_post))
        .route("/posts/{id}", patch(update_post).delete(delete_post))
        // Friends
        .route("/friends", get(get_friends))
        .route("/friends/{friend}", delete(remove_friend))
        .route("/friend/requests", get(get_friend_requests))
        .route("/friend/requests/{to}", post(send_friend_request).delete(remove_friend_request))
        .route("/friend/accept/{from}", put(accept_friend_request))
        .route("/friend/reject/{from}", put(reject_friend_request))
        // Events
        .route("/events", get(get_events).post(create_event))
        .route("/events/{id}", patch(update_event).delete(delete_event))
        .route("/events/register/{id}", patch(register_event))
        .route("/events/unregister/{id}", patch(unregister_event))
        .route("/events/{id}/post", patch(post_to_event))
        .route("/events/{id}/delete_post/{post_id}", patch(delete_post_from_event))
        // Comments
        .route("/comments", get(get_comments).post(create_comment))
        .route("/comments/{id}", patch(update_comment).delete(delete_comment))
        // Trails
        .route("/trails", get(get_trails).post(create_trail))
        .route("/trails/{id}", patch(update_trail).delete(delete_trail))
        .route("/trails/{id}/destinations", patch(add_destination))
        .route("/trails/{id}/pin", patch(pin_trail).delete(unpin_trail))
        .with_state(state)
}

// --- Sessions and users ---

async fn get_session_user(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let doc = state.app.users.get_by_id(user).await?;
        Ok(state.responses.user(&doc))
    }
    .await;
    respond(&state, result).await
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Credentials>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        state
            .app
            .sessions
            .is_logged_out(session_key(&headers).as_deref())
            .await?;
        let user = state.app.users.create(&body.username, &body.password).await?;
        Ok(json!({"msg": "User created successfully!", "user": state.responses.user(&user)}))
    }
    .await;
    respond(&state, result).await
}

async fn get_users(State(state): State<AppState>) -> ApiResult {
    let result: AppResult<Value> = async {
        let users = state.app.users.get_users().await?;
        Ok(Value::Array(state.responses.users(&users)))
    }
    .await;
    respond(&state, result).await
}

async fn get_user(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.users.get_by_username(&username).await?;
        Ok(state.responses.user(&user))
    }
    .await;
    respond(&state, result).await
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Map<String, Value>>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.users.update(user, &update).await?;
        Ok(json!({"msg": "User updated successfully!"}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_user(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let result: AppResult<Value> = async {
        let key = session_key(&headers);
        let user = state.app.sessions.get_user(key.as_deref()).await?;
        state.app.delete_user(user).await?;
        Ok(json!({"msg": "User deleted!"}))
    }
    .await;
    respond(&state, result).await
}

async fn log_in(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    match state.app.login(&body.username, &body.password).await {
        Ok(session) => {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, session.fields.key
            );
            ([(SET_COOKIE, cookie)], Json(json!({"msg": "Logged in!"}))).into_response()
        }
        Err(err) => match respond(&state, Err(err)).await {
            Ok(ok) => ok.into_response(),
            Err(api_err) => api_err.into_response(),
        },
    }
}

async fn log_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let result: AppResult<Value> = async {
        state.app.sessions.end(session_key(&headers).as_deref()).await?;
        Ok(json!({"msg": "Logged out!"}))
    }
    .await;
    let expired = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
    match respond(&state, result).await {
        Ok(ok) => ([(SET_COOKIE, expired)], ok).into_response(),
        Err(err) => err.into_response(),
    }
}

// --- Posts ---

#[derive(Deserialize)]
struct AuthorQuery {
    author: Option<String>,
}

async fn get_posts(State(state): State<AppState>, Query(query): Query<AuthorQuery>) -> ApiResult {
    let result: AppResult<Value> = async {
        let posts = state.app.get_posts_by(query.author.as_deref()).await?;
        Ok(Value::Array(state.responses.posts(&posts).await?))
    }
    .await;
    respond(&state, result).await
}

#[derive(Deserialize)]
struct CreatePost {
    content: String,
    event: Option<Id>,
    media: Option<String>,
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePost>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let post = state
            .app
            .posts
            .create(user, &body.content, body.event, body.media)
            .await?;
        Ok(json!({"msg": "Post successfully created!", "post": state.responses.post(&post).await?}))
    }
    .await;
    respond(&state, result).await
}

async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(update): Json<Map<String, Value>>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.update_post(user, id, &update).await?;
        Ok(json!({"msg": "Post successfully updated!"}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.delete_post(user, id).await?;
        Ok(json!({"msg": "Post deleted successfully!"}))
    }
    .await;
    respond(&state, result).await
}

// --- Friends ---

async fn get_friends(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let names = state.app.get_friend_usernames(user).await?;
        Ok(json!(names))
    }
    .await;
    respond(&state, result).await
}

async fn remove_friend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(friend): Path<String>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.remove_friend(user, &friend).await?;
        Ok(json!({"msg": "Friend removed!"}))
    }
    .await;
    respond(&state, result).await
}

async fn get_friend_requests(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let requests = state.app.friends.get_requests(user).await?;
        Ok(Value::Array(state.responses.friend_requests(&requests).await?))
    }
    .await;
    respond(&state, result).await
}

async fn send_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(to): Path<String>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.send_friend_request(user, &to).await?;
        Ok(json!({"msg": "Friend request sent!"}))
    }
    .await;
    respond(&state, result).await
}

async fn remove_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(to): Path<String>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.remove_friend_request(user, &to).await?;
        Ok(json!({"msg": "Friend request removed!"}))
    }
    .await;
    respond(&state, result).await
}

async fn accept_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(from): Path<String>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.accept_friend_request(user, &from).await?;
        Ok(json!({"msg": "Friend request accepted!"}))
    }
    .await;
    respond(&state, result).await
}

async fn reject_friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(from): Path<String>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.reject_friend_request(user, &from).await?;
        Ok(json!({"msg": "Friend request rejected!"}))
    }
    .await;
    respond(&state, result).await
}

// --- Events ---

#[derive(Deserialize)]
struct OwnerQuery {
    owner: Option<String>,
}

async fn get_events(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> ApiResult {
    let result: AppResult<Value> = async {
        let events = state.app.get_events_by(query.owner.as_deref()).await?;
        Ok(Value::Array(state.responses.events(&events).await?))
    }
    .await;
    respond(&state, result).await
}

async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewEvent>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let event = state.app.create_event(user, body).await?;
        Ok(json!({"msg": "Event successfully created!", "event": state.responses.event(&event).await?}))
    }
    .await;
    respond(&state, result).await
}

async fn update_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(update): Json<Map<String, Value>>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.update_event(user, id, &update).await?;
        Ok(json!({"msg": "Event successfully updated!"}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.delete_event(user, id).await?;
        Ok(json!({"msg": "Event deleted successfully!"}))
    }
    .await;
    respond(&state, result).await
}

async fn register_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let trail = state.app.register_for_event(user, id).await?;
        Ok(json!({
            "msg": "Registered for event!",
            "trail": state.responses.trail(&trail).await?
        }))
    }
    .await;
    respond(&state, result).await
}

async fn unregister_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.unregister_from_event(user, id).await?;
        Ok(json!({"msg": "Unregistered from event!"}))
    }
    .await;
    respond(&state, result).await
}

#[derive(Deserialize)]
struct PostToEvent {
    content: String,
    media: Option<String>,
}

async fn post_to_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(body): Json<PostToEvent>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let created = state
            .app
            .post_to_event(user, id, &body.content, body.media)
            .await?;
        Ok(json!({"msg": "Posted to event!", "post": state.responses.post(&created).await?}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_post_from_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, post_id)): Path<(Id, Id)>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.delete_post_from_event(user, id, post_id).await?;
        Ok(json!({"msg": "Post removed from event!"}))
    }
    .await;
    respond(&state, result).await
}

// --- Comments ---

#[derive(Deserialize)]
struct TargetQuery {
    target: Option<Id>,
}

async fn get_comments(State(state): State<AppState>, Query(query): Query<TargetQuery>) -> ApiResult {
    let result: AppResult<Value> = async {
        let comments = state.app.get_comments_on(query.target).await?;
        Ok(Value::Array(state.responses.comments(&comments).await?))
    }
    .await;
    respond(&state, result).await
}

#[derive(Deserialize)]
struct CreateComment {
    content: String,
    target: Id,
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateComment>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let comment = state.app.create_comment(user, &body.content, body.target).await?;
        Ok(json!({
            "msg": "Comment successfully created!",
            "comment": state.responses.comment(&comment).await?
        }))
    }
    .await;
    respond(&state, result).await
}

async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(update): Json<Map<String, Value>>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.update_comment(user, id, &update).await?;
        Ok(json!({"msg": "Comment successfully updated!"}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.delete_comment(user, id).await?;
        Ok(json!({"msg": "Comment deleted successfully!"}))
    }
    .await;
    respond(&state, result).await
}

// --- Trails ---

async fn get_trails(State(state): State<AppState>, Query(query): Query<AuthorQuery>) -> ApiResult {
    let result: AppResult<Value> = async {
        let trails = state.app.get_trails_by(query.author.as_deref()).await?;
        Ok(Value::Array(state.responses.trails(&trails).await?))
    }
    .await;
    respond(&state, result).await
}

#[derive(Deserialize)]
struct CreateTrail {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    locations: Vec<TrailStop>,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    distance: f64,
}

async fn create_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTrail>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        let trail = state
            .app
            .trails
            .create(
                Some(user),
                &body.name,
                &body.description,
                body.locations,
                body.duration,
                body.distance,
            )
            .await?;
        Ok(json!({"msg": "Trail successfully created!", "trail": state.responses.trail(&trail).await?}))
    }
    .await;
    respond(&state, result).await
}

async fn update_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(update): Json<Map<String, Value>>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.update_trail(user, id, &update).await?;
        Ok(json!({"msg": "Trail successfully updated!"}))
    }
    .await;
    respond(&state, result).await
}

async fn delete_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.delete_trail(user, id).await?;
        Ok(json!({"msg": "Trail deleted successfully!"}))
    }
    .await;
    respond(&state, result).await
}

async fn add_destination(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
    Json(stop): Json<TrailStop>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.add_destination(user, id, stop).await?;
        Ok(json!({"msg": "Destination added!"}))
    }
    .await;
    respond(&state, result).await
}

async fn pin_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.pin_trail(user, id).await?;
        Ok(json!({"msg": "Trail pinned!"}))
    }
    .await;
    respond(&state, result).await
}

async fn unpin_trail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Id>,
) -> ApiResult {
    let result: AppResult<Value> = async {
        let user = state.app.sessions.get_user(session_key(&headers).as_deref()).await?;
        state.app.unpin_trail(user, id).await?;
        Ok(json!({"msg": "Trail unpinned!"}))
    }
    .await;
    respond(&state, result).await
}
