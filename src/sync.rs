// Synchronization layer. Each workflow is a fixed sequence of concept calls
// realizing one cross-entity business rule. Workflows are not transactional:
// the first failure aborts the remaining steps and propagates unchanged, and
// no compensating actions are taken. The documented partial-failure cases are
// called out on the individual workflows.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::concepts::{
    CommentConcept, CommentDoc, Event, EventConcept, EventDate, EventDoc, EventTags, EventTime,
    FriendConcept, FriendRequestDoc, PostConcept, PostDoc, SessionConcept, SessionDoc,
    TrailConcept, TrailDoc, TrailStop, UserConcept, UserDoc,
};
use crate::error::AppResult;
use crate::store::{DocStore, Filter, Id};

/// Parameters for the create-event workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: EventDate,
    pub time: EventTime,
    #[serde(default)]
    pub tags: EventTags,
    #[serde(default)]
    pub checklist: Map<String, Value>,
    pub trail: Id,
}

/// The application: every concept behind one orchestration facade. Concepts
/// are injected at construction and shared with the response-shaping layer;
/// they never see each other.
pub struct App {
    pub users: Arc<UserConcept>,
    pub sessions: Arc<SessionConcept>,
    pub posts: Arc<PostConcept>,
    pub comments: Arc<CommentConcept>,
    pub events: Arc<EventConcept>,
    pub trails: Arc<TrailConcept>,
    pub friends: Arc<FriendConcept>,
}

impl App {
    pub fn new(store: &DocStore) -> Self {
        Self {
            users: Arc::new(UserConcept::new(store)),
            sessions: Arc::new(SessionConcept::new(store)),
            posts: Arc::new(PostConcept::new(store)),
            comments: Arc::new(CommentConcept::new(store)),
            events: Arc::new(EventConcept::new(store)),
            trails: Arc::new(TrailConcept::new(store)),
            friends: Arc::new(FriendConcept::new(store)),
        }
    }

    // --- Users and sessions ---

    pub async fn login(&self, username: &str, password: &str) -> AppResult<SessionDoc> {
        let user = self.users.authenticate(username, password).await?;
        self.sessions.start(user.id).await
    }

    /// Delete a user: their sessions end first so the deleted account cannot
    /// keep acting, then the user document goes.
    pub async fn delete_user(&self, user: Id) -> AppResult<()> {
        self.sessions.end_all(user).await?;
        self.users.delete(user).await
    }

    // --- Posts ---

    pub async fn update_post(
        &self,
        caller: Id,
        post: Id,
        update: &Map<String, Value>,
    ) -> AppResult<()> {
        self.posts.is_author(caller, post).await?;
        self.posts.update(post, update).await
    }

    /// Delete a post, then every comment targeting it. A failure between the
    /// two steps orphans the remaining comments (documented partial failure).
    pub async fn delete_post(&self, caller: Id, post: Id) -> AppResult<()> {
        self.posts.is_author(caller, post).await?;
        self.posts.delete(post).await?;
        let removed = self.comments.delete_by_target(post).await?;
        tracing::debug!(post, removed, "cascaded comment deletion for post");
        Ok(())
    }

    // --- Comments ---

    /// Comment existence-checks its target post here: the Comment concept
    /// cannot depend on Post, so the guard is a synchronization concern.
    pub async fn create_comment(
        &self,
        author: Id,
        content: &str,
        target: Id,
    ) -> AppResult<CommentDoc> {
        self.posts.post_exists(target).await?;
        self.comments.create(author, content, target).await
    }

    pub async fn update_comment(
        &self,
        caller: Id,
        comment: Id,
        update: &Map<String, Value>,
    ) -> AppResult<()> {
        self.comments.is_author(caller, comment).await?;
        self.comments.update(comment, update).await
    }

    pub async fn delete_comment(&self, caller: Id, comment: Id) -> AppResult<()> {
        self.comments.is_author(caller, comment).await?;
        self.comments.delete(comment).await
    }

    // --- Events ---

    /// Create an event, register its owner, and clone the template trail for
    /// them. The template must exist before anything is written. If a later
    /// step fails the event stays behind without its owner registration or
    /// trail copy (documented partial failure).
    pub async fn create_event(&self, owner: Id, params: NewEvent) -> AppResult<EventDoc> {
        let template = self.trails.get(params.trail).await?;

        let event = self
            .events
            .create(Event {
                owner,
                name: params.name.clone(),
                description: params.description,
                date: params.date,
                time: params.time,
                attendees: Vec::new(),
                tags: params.tags,
                checklist: params.checklist,
                posts: Vec::new(),
                trail: params.trail,
            })
            .await?;

        self.events.register(event.id, owner).await?;
        self.trails
            .create(
                Some(owner),
                &params.name,
                &template.fields.description,
                template.fields.locations.clone(),
                template.fields.duration,
                template.fields.distance,
            )
            .await?;

        self.events.get_event(event.id).await
    }

    pub async fn update_event(
        &self,
        caller: Id,
        event: Id,
        update: &Map<String, Value>,
    ) -> AppResult<()> {
        self.events.is_owner(caller, event).await?;
        self.events.update(event, update).await
    }

    /// Cascading delete: comments of each event post first, then the posts,
    /// then the event itself. The order avoids dangling comment targets; a
    /// failure part-way leaves the remaining posts/comments in place
    /// (documented partial failure, no rollback).
    pub async fn delete_event(&self, caller: Id, event: Id) -> AppResult<()> {
        self.events.is_owner(caller, event).await?;
        let doc = self.events.get_event(event).await?;
        for post in &doc.fields.posts {
            self.comments.delete_by_target(*post).await?;
            self.posts.delete(*post).await?;
        }
        self.events.delete(event).await?;
        tracing::info!(event, posts = doc.fields.posts.len(), "deleted event with cascade");
        Ok(())
    }

    /// Register for an event and clone its template trail as a personal copy.
    /// The template is fetched before the registration mutates anything, so a
    /// missing template leaves no partial registration. Once registered, a
    /// failing clone leaves the user registered without their trail
    /// (documented partial failure).
    pub async fn register_for_event(&self, user: Id, event: Id) -> AppResult<TrailDoc> {
        let doc = self.events.get_event(event).await?;
        let template = self.trails.get(doc.fields.trail).await?;

        self.events.register(event, user).await?;
        self.trails
            .create(
                Some(user),
                &doc.fields.name,
                &template.fields.description,
                template.fields.locations.clone(),
                template.fields.duration,
                template.fields.distance,
            )
            .await
    }

    pub async fn unregister_from_event(&self, user: Id, event: Id) -> AppResult<()> {
        self.events.unregister(event, user).await
    }

    /// Post to an event: only registered attendees may, and the new post is
    /// linked into the event's ordered post list.
    pub async fn post_to_event(
        &self,
        user: Id,
        event: Id,
        content: &str,
        media: Option<String>,
    ) -> AppResult<PostDoc> {
        self.events.is_registered(user, event).await?;
        let post = self.posts.create(user, content, Some(event), media).await?;
        self.events.add_post(event, post.id).await?;
        Ok(post)
    }

    /// Unlink a post from an event. The post itself stays; only the author of
    /// the post may remove the link.
    pub async fn delete_post_from_event(&self, user: Id, event: Id, post: Id) -> AppResult<()> {
        self.posts.is_author(user, post).await?;
        self.events.delete_post(event, post).await
    }

    // --- Trails ---

    pub async fn update_trail(
        &self,
        caller: Id,
        trail: Id,
        update: &Map<String, Value>,
    ) -> AppResult<()> {
        self.trails.is_author(caller, trail).await?;
        self.trails.update(trail, update).await
    }

    pub async fn add_destination(&self, caller: Id, trail: Id, stop: TrailStop) -> AppResult<()> {
        self.trails.is_author(caller, trail).await?;
        self.trails.add_location(trail, stop).await
    }

    pub async fn delete_trail(&self, caller: Id, trail: Id) -> AppResult<()> {
        self.trails.is_author(caller, trail).await?;
        self.trails.delete(trail).await
    }

    /// Pin a trail: author check, then quota check, then the pinned flag goes
    /// through the trail's normal allow-listed update. The quota check and
    /// the update are separate reads/writes; concurrent pins can race past
    /// the limit (documented, accepted).
    pub async fn pin_trail(&self, caller: Id, trail: Id) -> AppResult<()> {
        self.trails.is_author(caller, trail).await?;
        self.trails.check_available_pin(caller).await?;
        let mut update = Map::new();
        update.insert("pinned".to_string(), json!(true));
        self.trails.update(trail, &update).await
    }

    pub async fn unpin_trail(&self, caller: Id, trail: Id) -> AppResult<()> {
        self.trails.is_author(caller, trail).await?;
        let mut update = Map::new();
        update.insert("pinned".to_string(), json!(false));
        self.trails.update(trail, &update).await
    }

    // --- Friends ---
    // The HTTP surface speaks usernames; the workflows resolve them to ids
    // before invoking the Friend concept, which only knows opaque ids.

    pub async fn send_friend_request(&self, user: Id, to: &str) -> AppResult<FriendRequestDoc> {
        let to = self.users.get_by_username(to).await?.id;
        self.friends.send_request(user, to).await
    }

    pub async fn remove_friend_request(&self, user: Id, to: &str) -> AppResult<()> {
        let to = self.users.get_by_username(to).await?.id;
        self.friends.remove_request(user, to).await
    }

    pub async fn accept_friend_request(&self, user: Id, from: &str) -> AppResult<()> {
        let from = self.users.get_by_username(from).await?.id;
        self.friends.accept_request(from, user).await
    }

    pub async fn reject_friend_request(&self, user: Id, from: &str) -> AppResult<()> {
        let from = self.users.get_by_username(from).await?.id;
        self.friends.reject_request(from, user).await
    }

    pub async fn remove_friend(&self, user: Id, friend: &str) -> AppResult<()> {
        let friend = self.users.get_by_username(friend).await?.id;
        self.friends.remove_friend(user, friend).await
    }

    pub async fn get_friend_usernames(&self, user: Id) -> AppResult<Vec<String>> {
        let friends = self.friends.get_friends(user).await?;
        self.users.ids_to_usernames(&friends).await
    }

    // --- Filtered reads used by the HTTP surface ---

    pub async fn get_posts_by(&self, author: Option<&str>) -> AppResult<Vec<PostDoc>> {
        match author {
            Some(author) => {
                let id = self.users.get_by_username(author).await?.id;
                self.posts.get_by_author(id).await
            }
            None => self.posts.get_posts(Filter::new()).await,
        }
    }

    pub async fn get_events_by(&self, owner: Option<&str>) -> AppResult<Vec<EventDoc>> {
        match owner {
            Some(owner) => {
                let id = self.users.get_by_username(owner).await?.id;
                self.events.get_by_owner(id).await
            }
            None => self.events.get_events(Filter::new()).await,
        }
    }

    pub async fn get_trails_by(&self, author: Option<&str>) -> AppResult<Vec<TrailDoc>> {
        match author {
            Some(author) => {
                let id = self.users.get_by_username(author).await?.id;
                self.trails.get_by_author(id).await
            }
            None => self.trails.get_trails(Filter::new()).await,
        }
    }

    pub async fn get_comments_on(&self, target: Option<Id>) -> AppResult<Vec<CommentDoc>> {
        match target {
            Some(target) => self.comments.get_by_target(target).await,
            None => self.comments.get_comments(Filter::new()).await,
        }
    }

    /// Convenience for tests and seeding: create a user directly.
    pub async fn create_user(&self, username: &str, password: &str) -> AppResult<UserDoc> {
        self.users.create(username, password).await
    }
}
