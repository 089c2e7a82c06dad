//! Persistence boundary of the comment engine.
//!
//! Writes are transactional: a reply's parent is re-read inside the same
//! transaction that inserts the reply, and a cascade delete checks all of its
//! targets before removing anything. Reads are plain queries and may observe
//! a write that is still in flight.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    comment::{path::MaterializedPath, Comment, CommentFilter, NewComment, PostRef, UserRef},
    error::Result,
};

pub use memory::MemoryCommentStore;
pub use postgres::PgCommentStore;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>>;

    /// The subset of `ids` that does not exist, in the order given.
    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Inserts a comment, under `parent_id` if given. Fails with
    /// `NotFound` if the parent is gone by the time the row is written.
    async fn create(&self, comment: NewComment, parent_id: Option<Uuid>) -> Result<Comment>;

    /// Comments without a parent matching every predicate in `filter`,
    /// oldest first.
    async fn find_roots(&self, filter: &CommentFilter) -> Result<Vec<Comment>>;

    /// Every comment strictly below `root_path`, ordered by path and then by
    /// creation time.
    async fn find_descendants(&self, root_path: &MaterializedPath) -> Result<Vec<Comment>>;

    /// Deletes each comment with its whole subtree, all or nothing. Fails
    /// with `NotFound` listing every missing id before deleting anything.
    async fn delete_cascade(&self, ids: &[Uuid]) -> Result<()>;
}

#[async_trait]
pub trait PostLookup: Send + Sync {
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>>;
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRef>>;
}
