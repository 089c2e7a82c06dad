use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    comment::{path::MaterializedPath, Comment, CommentFilter, NewComment, PostRef, UserRef},
    error::{Error, Result},
};

use super::{CommentRepository, PostLookup, UserLookup};

#[derive(Default)]
struct State {
    comments: HashMap<Uuid, Comment>,
    posts: HashMap<Uuid, PostRef>,
    users: HashMap<Uuid, UserRef>,
    last_created_at: Option<NaiveDateTime>,
}

impl State {
    /// Microsecond precision like a Postgres timestamp, and strictly
    /// increasing so that siblings never tie.
    fn next_created_at(&mut self) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let mut created_at = now.with_nanosecond(now.nanosecond() / 1000 * 1000).unwrap_or(now);
        if let Some(last) = self.last_created_at {
            if created_at <= last {
                created_at = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(created_at);
        created_at
    }
}

/// An in-process store. Every write holds the lock for its whole duration,
/// which makes writes serializable.
#[derive(Default)]
pub struct MemoryCommentStore {
    state: RwLock<State>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_post(&self, post: PostRef) {
        self.state.write().await.posts.insert(post.id, post);
    }

    pub async fn insert_user(&self, user: UserRef) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// All stored comments, in no particular order.
    pub async fn comments(&self) -> Vec<Comment> {
        self.state.read().await.comments.values().cloned().collect()
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter(|id| !state.comments.contains_key(*id))
            .copied()
            .collect())
    }

    #[tracing::instrument(skip(self, comment))]
    async fn create(&self, comment: NewComment, parent_id: Option<Uuid>) -> Result<Comment> {
        let mut state = self.state.write().await;

        let parent_path = match parent_id {
            Some(parent_id) => Some(
                state
                    .comments
                    .get(&parent_id)
                    .map(|p| p.path.clone())
                    .ok_or_else(|| Error::not_found("parent comment", parent_id))?,
            ),
            None => None,
        };

        let id = Uuid::new_v4();
        let path = MaterializedPath::encode(parent_path.as_ref(), id)?;
        let created = Comment {
            id,
            body: comment.body,
            category: comment.category,
            target_id: comment.target_id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            path,
            parent_id,
            created_at: state.next_created_at(),
        };

        state.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn find_roots(&self, filter: &CommentFilter) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut roots: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.is_root() && filter.matches(c))
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(roots)
    }

    async fn find_descendants(&self, root_path: &MaterializedPath) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut descendants: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.path.is_descendant_of(root_path))
            .cloned()
            .collect();
        descendants.sort_by(|a, b| a.path.cmp(&b.path).then(a.created_at.cmp(&b.created_at)));
        Ok(descendants)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_cascade(&self, ids: &[Uuid]) -> Result<()> {
        let mut state = self.state.write().await;

        let missing: Vec<Uuid> = ids
            .iter()
            .filter(|id| !state.comments.contains_key(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(Error::NotFound {
                entity: "comment",
                ids: missing,
            });
        }

        for id in ids {
            let segment = id.to_string();
            state
                .comments
                .retain(|_, c| !c.path.contains_segment(&segment));
        }

        Ok(())
    }
}

#[async_trait]
impl PostLookup for MemoryCommentStore {
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }
}

#[async_trait]
impl UserLookup for MemoryCommentStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRef>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}
