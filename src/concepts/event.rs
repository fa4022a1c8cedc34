use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDate {
    pub month: String,
    pub date: String,
    pub year: String,
}

impl EventDate {
    fn is_empty(&self) -> bool {
        self.month.is_empty() || self.date.is_empty() || self.year.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTime {
    pub hour: String,
    pub minute: String,
    pub am: bool,
}

impl EventTime {
    fn is_empty(&self) -> bool {
        self.hour.is_empty() || self.minute.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTags {
    pub terrain: Vec<String>,
    pub activity: Vec<String>,
    pub other: Vec<String>,
    pub difficulty: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub owner: Id,
    pub name: String,
    pub description: String,
    pub date: EventDate,
    pub time: EventTime,
    /// Registered users. The owner is registered by the create-event workflow
    /// and may never unregister.
    pub attendees: Vec<Id>,
    pub tags: EventTags,
    /// Item name to quantity, e.g. "water bottle" -> 2.
    pub checklist: Map<String, Value>,
    /// Posts made to this event, in insertion order.
    pub posts: Vec<Id>,
    /// Template trail participants clone when they register.
    pub trail: Id,
}

pub type EventDoc = Doc<Event>;

pub struct EventConcept {
    events: DocCollection<Event>,
}

impl EventConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            events: store.collection("events"),
        }
    }

    pub async fn create(&self, event: Event) -> AppResult<EventDoc> {
        if event.name.is_empty() {
            return Err(AppError::MissingField {
                entity: "Event",
                field: "name",
            });
        }
        if event.date.is_empty() {
            return Err(AppError::MissingField {
                entity: "Event",
                field: "date",
            });
        }
        if event.time.is_empty() {
            return Err(AppError::MissingField {
                entity: "Event",
                field: "time",
            });
        }

        let id = self.events.create_one(event).await?;
        self.get_event(id).await
    }

    pub async fn get_event(&self, id: Id) -> AppResult<EventDoc> {
        self.events
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} does not exist!", id)))
    }

    pub async fn get_events(&self, filter: Filter) -> AppResult<Vec<EventDoc>> {
        self.events
            .read_many(filter, ReadOptions::sort("updated", SortOrder::Desc))
            .await
    }

    pub async fn get_by_owner(&self, owner: Id) -> AppResult<Vec<EventDoc>> {
        self.get_events(Filter::new().eq("owner", owner)).await
    }

    /// Events a user is registered for, via attendee membership.
    pub async fn get_registered_events(&self, user: Id) -> AppResult<Vec<EventDoc>> {
        self.get_events(Filter::new().contains("attendees", user))
            .await
    }

    pub async fn get_attendees(&self, id: Id) -> AppResult<Vec<Id>> {
        Ok(self.get_event(id).await?.fields.attendees)
    }

    pub async fn update(&self, id: Id, update: &Map<String, Value>) -> AppResult<()> {
        self.sanitize_update(update)?;
        self.events.update_one(Filter::by_id(id), update).await
    }

    pub async fn delete(&self, id: Id) -> AppResult<()> {
        self.events.delete_one(Filter::by_id(id)).await?;
        Ok(())
    }

    /// Register a user as an attendee. Registering twice is not allowed.
    pub async fn register(&self, id: Id, user: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        if event.fields.attendees.contains(&user) {
            return Err(AppError::AlreadyRegistered { user, event: id });
        }
        let mut attendees = event.fields.attendees;
        attendees.push(user);
        let mut update = Map::new();
        update.insert("attendees".to_string(), json!(attendees));
        self.update(id, &update).await
    }

    /// Unregister an attendee. The owner may never leave their own event, and
    /// unregistering a user who is not registered fails.
    pub async fn unregister(&self, id: Id, user: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        if user == event.fields.owner {
            return Err(AppError::NotAllowed(
                "Owner can't unregister from their own event!".to_string(),
            ));
        }
        if !event.fields.attendees.contains(&user) {
            return Err(AppError::AlreadyUnregistered { user, event: id });
        }
        let attendees: Vec<Id> = event
            .fields
            .attendees
            .into_iter()
            .filter(|a| *a != user)
            .collect();
        let mut update = Map::new();
        update.insert("attendees".to_string(), json!(attendees));
        self.update(id, &update).await
    }

    pub async fn is_owner(&self, user: Id, id: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        if event.fields.owner != user {
            return Err(AppError::EventOwnerNotMatch { user, event: id });
        }
        Ok(())
    }

    pub async fn is_registered(&self, user: Id, id: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        if !event.fields.attendees.contains(&user) {
            return Err(AppError::NotRegistered { user, event: id });
        }
        Ok(())
    }

    /// Append a post reference. The posts list keeps insertion order and is
    /// only reachable through this pair of operations, not the public update.
    pub async fn add_post(&self, id: Id, post: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        let mut posts = event.fields.posts;
        posts.push(post);
        let mut update = Map::new();
        update.insert("posts".to_string(), json!(posts));
        self.events.update_one(Filter::by_id(id), &update).await
    }

    pub async fn delete_post(&self, id: Id, post: Id) -> AppResult<()> {
        let event = self.get_event(id).await?;
        if !event.fields.posts.contains(&post) {
            return Err(AppError::NotFound(
                "Could not find post in event!".to_string(),
            ));
        }
        let posts: Vec<Id> = event
            .fields
            .posts
            .into_iter()
            .filter(|p| *p != post)
            .collect();
        let mut update = Map::new();
        update.insert("posts".to_string(), json!(posts));
        self.events.update_one(Filter::by_id(id), &update).await
    }

    fn sanitize_update(&self, update: &Map<String, Value>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::EmptyUpdate { entity: "Event" });
        }
        // Owner and posts cannot be rewritten through the generic update.
        const ALLOWED: &[&str] = &[
            "name",
            "description",
            "date",
            "time",
            "attendees",
            "tags",
            "checklist",
            "trail",
        ];
        for (key, value) in update {
            if !ALLOWED.contains(&key.as_str()) {
                return Err(AppError::FieldNotAllowed { field: key.clone() });
            }
            if key == "name" && value.as_str().map_or(false, str::is_empty) {
                return Err(AppError::MissingField {
                    entity: "Event",
                    field: "name",
                });
            }
        }
        Ok(())
    }
}
