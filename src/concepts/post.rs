use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub author: Id,
    pub content: String,
    /// Event this post was made for, if any.
    pub event: Option<Id>,
    /// Reference to an uploaded media asset.
    pub media: Option<String>,
}

pub type PostDoc = Doc<Post>;

pub struct PostConcept {
    posts: DocCollection<Post>,
}

impl PostConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            posts: store.collection("posts"),
        }
    }

    pub async fn create(
        &self,
        author: Id,
        content: &str,
        event: Option<Id>,
        media: Option<String>,
    ) -> AppResult<PostDoc> {
        if content.is_empty() {
            return Err(AppError::BadValues(
                "Can not create post with empty content!".to_string(),
            ));
        }
        let id = self
            .posts
            .create_one(Post {
                author,
                content: content.to_string(),
                event,
                media,
            })
            .await?;
        self.get_by_id(id).await
    }

    pub async fn get_posts(&self, filter: Filter) -> AppResult<Vec<PostDoc>> {
        self.posts
            .read_many(filter, ReadOptions::sort("updated", SortOrder::Desc))
            .await
    }

    pub async fn get_by_id(&self, id: Id) -> AppResult<PostDoc> {
        self.posts
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} does not exist!", id)))
    }

    pub async fn get_by_author(&self, author: Id) -> AppResult<Vec<PostDoc>> {
        self.get_posts(Filter::new().eq("author", author)).await
    }

    pub async fn update(&self, id: Id, update: &Map<String, Value>) -> AppResult<()> {
        self.sanitize_update(update)?;
        self.posts.update_one(Filter::by_id(id), update).await
    }

    pub async fn delete(&self, id: Id) -> AppResult<()> {
        self.posts.delete_one(Filter::by_id(id)).await?;
        Ok(())
    }

    /// Capability check: fails rather than returning a boolean so callers can
    /// propagate directly.
    pub async fn is_author(&self, user: Id, id: Id) -> AppResult<()> {
        let post = self.get_by_id(id).await?;
        if post.fields.author != user {
            return Err(AppError::PostAuthorNotMatch {
                author: user,
                post: id,
            });
        }
        Ok(())
    }

    pub async fn post_exists(&self, id: Id) -> AppResult<()> {
        self.get_by_id(id).await.map(|_| ())
    }

    fn sanitize_update(&self, update: &Map<String, Value>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::EmptyUpdate { entity: "Post" });
        }
        // The author is immutable through this path.
        const ALLOWED: &[&str] = &["content", "media"];
        for (key, value) in update {
            if !ALLOWED.contains(&key.as_str()) {
                return Err(AppError::FieldNotAllowed { field: key.clone() });
            }
            if key == "content" && value.as_str().map_or(true, str::is_empty) {
                return Err(AppError::BadValues(
                    "Can not create post with empty content!".to_string(),
                ));
            }
        }
        Ok(())
    }
}
