use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

/// An author may keep at most this many trails pinned.
pub const PIN_LIMIT: usize = 5;

/// One stop along a trail, optionally annotated with a post made there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrailStop {
    pub lat: f64,
    pub lng: f64,
    pub post: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trail {
    /// Event-template trails are author-less; personal trails carry their
    /// owner.
    pub author: Option<Id>,
    pub name: String,
    pub description: String,
    /// Ordered list of stops; order is meaningful and preserved.
    pub locations: Vec<TrailStop>,
    pub pinned: bool,
    /// Estimated duration in hours.
    pub duration: f64,
    /// Distance in kilometers.
    pub distance: f64,
}

pub type TrailDoc = Doc<Trail>;

pub struct TrailConcept {
    trails: DocCollection<Trail>,
}

impl TrailConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            trails: store.collection("trails"),
        }
    }

    pub async fn create(
        &self,
        author: Option<Id>,
        name: &str,
        description: &str,
        locations: Vec<TrailStop>,
        duration: f64,
        distance: f64,
    ) -> AppResult<TrailDoc> {
        if name.is_empty() {
            return Err(AppError::MissingField {
                entity: "Trail",
                field: "name",
            });
        }
        if description.is_empty() {
            return Err(AppError::MissingField {
                entity: "Trail",
                field: "description",
            });
        }

        let id = self
            .trails
            .create_one(Trail {
                author,
                name: name.to_string(),
                description: description.to_string(),
                locations,
                pinned: false,
                duration,
                distance,
            })
            .await?;
        self.get(id).await
    }

    pub async fn get(&self, id: Id) -> AppResult<TrailDoc> {
        self.trails
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trail {} does not exist!", id)))
    }

    pub async fn get_trails(&self, filter: Filter) -> AppResult<Vec<TrailDoc>> {
        self.trails
            .read_many(filter, ReadOptions::sort("updated", SortOrder::Desc))
            .await
    }

    pub async fn get_by_author(&self, author: Id) -> AppResult<Vec<TrailDoc>> {
        self.get_trails(Filter::new().eq("author", author)).await
    }

    pub async fn update(&self, id: Id, update: &Map<String, Value>) -> AppResult<()> {
        self.sanitize_update(update)?;
        self.trails.update_one(Filter::by_id(id), update).await
    }

    /// Append a stop to the trail's ordered location list.
    pub async fn add_location(&self, id: Id, stop: TrailStop) -> AppResult<()> {
        let trail = self.get(id).await?;
        let mut locations = trail.fields.locations;
        locations.push(stop);
        let mut update = Map::new();
        update.insert("locations".to_string(), json!(locations));
        self.trails.update_one(Filter::by_id(id), &update).await
    }

    pub async fn delete(&self, id: Id) -> AppResult<()> {
        self.trails.delete_one(Filter::by_id(id)).await?;
        Ok(())
    }

    /// An author-less template trail has no author, so this fails for it too.
    pub async fn is_author(&self, user: Id, id: Id) -> AppResult<()> {
        let trail = self.get(id).await?;
        if trail.fields.author != Some(user) {
            return Err(AppError::TrailAuthorNotMatch { user, trail: id });
        }
        Ok(())
    }

    pub async fn trail_exists(&self, id: Id) -> AppResult<()> {
        self.get(id).await.map(|_| ())
    }

    /// Fails once the author already has [`PIN_LIMIT`] pinned trails. The
    /// count and the subsequent pin are separate store operations; concurrent
    /// pins can race past the limit (documented weak-consistency property).
    pub async fn check_available_pin(&self, user: Id) -> AppResult<()> {
        let pinned = self
            .trails
            .count(Filter::new().eq("author", user).eq("pinned", true))
            .await?;
        if pinned >= PIN_LIMIT {
            return Err(AppError::PinnedTrailLimitMet { user });
        }
        Ok(())
    }

    fn sanitize_update(&self, update: &Map<String, Value>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::EmptyUpdate { entity: "Trail" });
        }
        // The author cannot be rewritten.
        const ALLOWED: &[&str] = &[
            "name",
            "description",
            "locations",
            "pinned",
            "duration",
            "distance",
        ];
        for (key, value) in update {
            if !ALLOWED.contains(&key.as_str()) {
                return Err(AppError::FieldNotAllowed { field: key.clone() });
            }
            if key == "name" && value.as_str().map_or(true, str::is_empty) {
                return Err(AppError::MissingField {
                    entity: "Trail",
                    field: "name",
                });
            }
            if key == "description" && value.as_str().map_or(true, str::is_empty) {
                return Err(AppError::MissingField {
                    entity: "Trail",
                    field: "description",
                });
            }
        }
        Ok(())
    }
}
