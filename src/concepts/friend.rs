use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::{Doc, DocCollection, DocStore, Filter, Id, ReadOptions, SortOrder};

/// Life cycle of a friend request. Pending requests resolve to accepted or
/// rejected exactly once; resolved requests are kept as history and a fresh
/// request between the same pair is allowed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub from: Id,
    pub to: Id,
    pub status: RequestStatus,
}

pub type FriendRequestDoc = Doc<FriendRequest>;

/// Symmetric friendship edge, stored once in either orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub user1: Id,
    pub user2: Id,
}

pub struct FriendConcept {
    requests: DocCollection<FriendRequest>,
    friends: DocCollection<Friendship>,
}

impl FriendConcept {
    pub fn new(store: &DocStore) -> Self {
        Self {
            requests: store.collection("friend_requests"),
            friends: store.collection("friends"),
        }
    }

    /// Requests sent or received by a user, any status.
    pub async fn get_requests(&self, user: Id) -> AppResult<Vec<FriendRequestDoc>> {
        let mut sent = self
            .requests
            .read_many(
                Filter::new().eq("from", user),
                ReadOptions::sort("created", SortOrder::Asc),
            )
            .await?;
        let received = self
            .requests
            .read_many(
                Filter::new().eq("to", user),
                ReadOptions::sort("created", SortOrder::Asc),
            )
            .await?;
        sent.extend(received);
        Ok(sent)
    }

    pub async fn send_request(&self, from: Id, to: Id) -> AppResult<FriendRequestDoc> {
        self.can_send_request(from, to).await?;
        let id = self
            .requests
            .create_one(FriendRequest {
                from,
                to,
                status: RequestStatus::Pending,
            })
            .await?;
        self.requests
            .read_by_id(id)
            .await?
            .ok_or(AppError::FriendRequestNotFound { from, to })
    }

    /// Withdraw a pending request sent by `from`.
    pub async fn remove_request(&self, from: Id, to: Id) -> AppResult<()> {
        let removed = self
            .requests
            .delete_one(
                Filter::new()
                    .eq("from", from)
                    .eq("to", to)
                    .eq("status", "pending"),
            )
            .await?;
        if !removed {
            return Err(AppError::FriendRequestNotFound { from, to });
        }
        Ok(())
    }

    /// Accept a pending request from `from` to `to`, making the two users
    /// mutual friends.
    pub async fn accept_request(&self, from: Id, to: Id) -> AppResult<()> {
        self.remove_pending_request(from, to).await?;
        self.requests
            .create_one(FriendRequest {
                from,
                to,
                status: RequestStatus::Accepted,
            })
            .await?;
        self.add_friend(from, to).await?;
        Ok(())
    }

    pub async fn reject_request(&self, from: Id, to: Id) -> AppResult<()> {
        self.remove_pending_request(from, to).await?;
        self.requests
            .create_one(FriendRequest {
                from,
                to,
                status: RequestStatus::Rejected,
            })
            .await?;
        Ok(())
    }

    /// Remove the symmetric edge, whichever orientation it is stored in.
    pub async fn remove_friend(&self, user: Id, friend: Id) -> AppResult<()> {
        let removed = self
            .friends
            .delete_one(Filter::new().eq("user1", user).eq("user2", friend))
            .await?
            || self
                .friends
                .delete_one(Filter::new().eq("user1", friend).eq("user2", user))
                .await?;
        if !removed {
            return Err(AppError::FriendNotFound {
                user1: user,
                user2: friend,
            });
        }
        Ok(())
    }

    pub async fn get_friends(&self, user: Id) -> AppResult<Vec<Id>> {
        let mut friends: Vec<Id> = self
            .friends
            .read_many(Filter::new().eq("user1", user), ReadOptions::default())
            .await?
            .into_iter()
            .map(|f| f.fields.user2)
            .collect();
        friends.extend(
            self.friends
                .read_many(Filter::new().eq("user2", user), ReadOptions::default())
                .await?
                .into_iter()
                .map(|f| f.fields.user1),
        );
        Ok(friends)
    }

    async fn add_friend(&self, user1: Id, user2: Id) -> AppResult<()> {
        self.friends.create_one(Friendship { user1, user2 }).await?;
        Ok(())
    }

    async fn is_not_friends(&self, user1: Id, user2: Id) -> AppResult<()> {
        let edge = match self
            .friends
            .read_one(Filter::new().eq("user1", user1).eq("user2", user2))
            .await?
        {
            Some(edge) => Some(edge),
            None => {
                self.friends
                    .read_one(Filter::new().eq("user1", user2).eq("user2", user1))
                    .await?
            }
        };
        if edge.is_some() {
            return Err(AppError::AlreadyFriends { user1, user2 });
        }
        Ok(())
    }

    async fn pending_request(&self, from: Id, to: Id) -> AppResult<Option<FriendRequestDoc>> {
        match self
            .requests
            .read_one(
                Filter::new()
                    .eq("from", from)
                    .eq("to", to)
                    .eq("status", "pending"),
            )
            .await?
        {
            Some(request) => Ok(Some(request)),
            None => {
                self.requests
                    .read_one(
                        Filter::new()
                            .eq("from", to)
                            .eq("to", from)
                            .eq("status", "pending"),
                    )
                    .await
            }
        }
    }

    async fn remove_pending_request(&self, from: Id, to: Id) -> AppResult<()> {
        let removed = self
            .requests
            .delete_one(
                Filter::new()
                    .eq("from", from)
                    .eq("to", to)
                    .eq("status", "pending"),
            )
            .await?;
        if !removed {
            return Err(AppError::FriendRequestNotFound { from, to });
        }
        Ok(())
    }

    async fn can_send_request(&self, from: Id, to: Id) -> AppResult<()> {
        if from == to {
            return Err(AppError::NotAllowed(
                "Users cannot friend themselves!".to_string(),
            ));
        }
        self.is_not_friends(from, to).await?;
        if self.pending_request(from, to).await?.is_some() {
            return Err(AppError::FriendRequestAlreadyExists { from, to });
        }
        Ok(())
    }
}
