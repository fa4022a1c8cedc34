use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author: Id,
    pub content: String,
    /// Entity the comment targets, usually a post. Immutable.
    pub target: Id,
}

pub type CommentDoc = Doc<Comment>;

pub struct CommentConcept {
    comments: DocCollection<Comment>,
}

impl CommentConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            comments: store.collection("comments"),
        }
    }

    pub async fn create(&self, author: Id, content: &str, target: Id) -> AppResult<CommentDoc> {
        if content.is_empty() {
            return Err(AppError::BadValues(
                "Can not create comment with empty content!".to_string(),
            ));
        }
        let id = self
            .comments
            .create_one(Comment {
                author,
                content: content.to_string(),
                target,
            })
            .await?;
        self.get_by_id(id).await
    }

    /// Comments in creation order, oldest first.
    pub async fn get_comments(&self, filter: Filter) -> AppResult<Vec<CommentDoc>> {
        self.comments
            .read_many(filter, ReadOptions::sort("created", SortOrder::Asc))
            .await
    }

    pub async fn get_by_id(&self, id: Id) -> AppResult<CommentDoc> {
        self.comments
            .read_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} does not exist!", id)))
    }

    pub async fn get_by_target(&self, target: Id) -> AppResult<Vec<CommentDoc>> {
        self.get_comments(Filter::new().eq("target", target)).await
    }

    pub async fn update(&self, id: Id, update: &Map<String, Value>) -> AppResult<()> {
        self.sanitize_update(update)?;
        self.comments.update_one(Filter::by_id(id), update).await
    }

    pub async fn delete(&self, id: Id) -> AppResult<()> {
        self.comments.delete_one(Filter::by_id(id)).await?;
        Ok(())
    }

    /// Remove every comment targeting the given entity. Returns how many were
    /// deleted. Each deletion is its own store operation; a failure part-way
    /// leaves the earlier deletions in place.
    pub async fn delete_by_target(&self, target: Id) -> AppResult<usize> {
        let comments = self.get_by_target(target).await?;
        for comment in &comments {
            self.comments.delete_one(Filter::by_id(comment.id)).await?;
        }
        Ok(comments.len())
    }

    pub async fn is_author(&self, user: Id, id: Id) -> AppResult<()> {
        let comment = self.get_by_id(id).await?;
        if comment.fields.author != user {
            return Err(AppError::CommentAuthorNotMatch { user, comment: id });
        }
        Ok(())
    }

    fn sanitize_update(&self, update: &Map<String, Value>) -> AppResult<()> {
        if update.is_empty() {
            return Err(AppError::EmptyUpdate { entity: "Comment" });
        }
        // Neither the author nor the target may change.
        const ALLOWED: &[&str] = &["content"];
        for (key, value) in update {
            if !ALLOWED.contains(&key.as_str()) {
                return Err(AppError::FieldNotAllowed { field: key.clone() });
            }
            if key == "content" && value.as_str().map_or(true, str::is_empty) {
                return Err(AppError::BadValues(
                    "Can not create comment with empty content!".to_string(),
                ));
            }
        }
        Ok(())
    }
}
