use async_trait::async_trait;
use diesel::{pg::Pg, prelude::*};
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection,
};
use uuid::Uuid;

use crate::{
    comment::{
        path::{MaterializedPath, SEPARATOR},
        Comment, CommentFilter, NewComment, PostRef, UserRef,
    },
    error::{Error, Result, StorageError},
    models::{
        comment::{ContentComment, NewContentComment},
        post::ContentPost,
        user::User,
    },
    schema::{content_comments, content_posts, users},
};

use super::{CommentRepository, PostLookup, UserLookup};

pub type DbPool = Pool<AsyncPgConnection>;

const SCHEMA: &str = include_str!("../../migrations/2024-05-01-000000_create_comments/up.sql");

pub fn build_pool(database_url: &str, max_size: usize) -> Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| StorageError::Pool(e.to_string()).into())
}

fn into_comments(rows: Vec<ContentComment>) -> Result<Vec<Comment>> {
    rows.into_iter().map(Comment::try_from).collect()
}

/// `LIKE` pattern matching every path strictly below `path`. Path segments
/// never contain `%` or `_`.
fn below(path: &str) -> String {
    format!("{path}{SEPARATOR}%")
}

/// The parent's path, read under a share lock so the parent can't be
/// deleted until the inserting transaction ends.
#[diesel::dsl::auto_type]
fn parent_path_for_share(parent_id: Uuid) -> _ {
    content_comments::table
        .find(parent_id)
        .select(content_comments::path)
        .for_share()
}

fn roots_query(filter: &CommentFilter) -> content_comments::BoxedQuery<'static, Pg> {
    let mut query = content_comments::table
        .filter(content_comments::parent_id.is_null())
        .order((content_comments::created_at.asc(), content_comments::id.asc()))
        .into_boxed();

    if let Some(post_id) = filter.post_id {
        query = query.filter(content_comments::post_id.eq(post_id));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(content_comments::user_id.eq(user_id));
    }
    if let Some(category) = filter.category {
        query = query.filter(content_comments::category.eq(category.as_str()));
    }
    if let Some(target_id) = filter.target_id {
        query = query.filter(content_comments::target_id.eq(target_id));
    }

    query
}

#[diesel::dsl::auto_type]
fn descendants_query(pattern: String) -> _ {
    content_comments::table
        .filter(content_comments::path.like(pattern))
        .order((content_comments::path.asc(), content_comments::created_at.asc()))
}

/// Locks every target row for the rest of the delete transaction.
#[diesel::dsl::auto_type]
fn delete_targets_for_update(ids: Vec<Uuid>) -> _ {
    content_comments::table
        .filter(content_comments::id.eq_any(ids))
        .select((content_comments::id, content_comments::path))
        .for_update()
}

#[diesel::dsl::auto_type]
fn subtree(id: Uuid, pattern: String) -> _ {
    content_comments::table.filter(
        content_comments::id
            .eq(id)
            .or(content_comments::path.like(pattern)),
    )
}

/// Comment store backed by the `content_comments` table.
///
/// The parent foreign key cascades on delete, so even a reply committed
/// between a delete's row locks and its statement cannot be left behind.
#[derive(Clone)]
pub struct PgCommentStore {
    pool: DbPool,
}

impl PgCommentStore {
    pub fn new(pool: DbPool) -> Self {
        PgCommentStore { pool }
    }

    pub fn connect(database_url: &str, max_size: usize) -> Result<Self> {
        Ok(PgCommentStore::new(build_pool(database_url, max_size)?))
    }

    /// Creates the tables and indexes if they don't exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        tracing::info!("Comment schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PgCommentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let mut conn = self.pool.get().await?;

        content_comments::table
            .find(id)
            .select(ContentComment::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Comment::try_from)
            .transpose()
    }

    async fn find_missing(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let mut conn = self.pool.get().await?;

        let found: Vec<Uuid> = content_comments::table
            .filter(content_comments::id.eq_any(ids.to_vec()))
            .select(content_comments::id)
            .load(&mut conn)
            .await?;

        Ok(ids.iter().filter(|id| !found.contains(id)).copied().collect())
    }

    #[tracing::instrument(skip(self, comment))]
    async fn create(&self, comment: NewComment, parent_id: Option<Uuid>) -> Result<Comment> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, Error, _>(|conn| {
            Box::pin(async move {
                let parent_path = match parent_id {
                    Some(parent_id) => {
                        let path = parent_path_for_share(parent_id)
                            .first::<String>(conn)
                            .await
                            .optional()?
                            .ok_or_else(|| Error::not_found("parent comment", parent_id))?;
                        Some(MaterializedPath::parse(&path)?)
                    }
                    None => None,
                };

                let id = Uuid::new_v4();
                let path = MaterializedPath::encode(parent_path.as_ref(), id)?;

                let row = diesel::insert_into(content_comments::table)
                    .values(&NewContentComment {
                        id,
                        body: &comment.body,
                        category: comment.category.as_str(),
                        target_id: comment.target_id,
                        post_id: comment.post_id,
                        user_id: comment.user_id,
                        path: path.as_str(),
                        parent_id,
                    })
                    .returning(ContentComment::as_returning())
                    .get_result(conn)
                    .await?;

                Comment::try_from(row)
            })
        })
        .await
    }

    async fn find_roots(&self, filter: &CommentFilter) -> Result<Vec<Comment>> {
        let mut conn = self.pool.get().await?;

        let rows = roots_query(filter)
            .select(ContentComment::as_select())
            .load(&mut conn)
            .await?;

        into_comments(rows)
    }

    async fn find_descendants(&self, root_path: &MaterializedPath) -> Result<Vec<Comment>> {
        let mut conn = self.pool.get().await?;

        let rows = descendants_query(below(root_path.as_str()))
            .select(ContentComment::as_select())
            .load(&mut conn)
            .await?;

        into_comments(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_cascade(&self, ids: &[Uuid]) -> Result<()> {
        let ids = ids.to_vec();
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, Error, _>(|conn| {
            Box::pin(async move {
                let targets: Vec<(Uuid, String)> = delete_targets_for_update(ids.clone())
                    .load(conn)
                    .await?;

                let missing: Vec<Uuid> = ids
                    .iter()
                    .filter(|id| !targets.iter().any(|(found, _)| found == *id))
                    .copied()
                    .collect();
                if !missing.is_empty() {
                    return Err(Error::NotFound {
                        entity: "comment",
                        ids: missing,
                    });
                }

                for (id, path) in targets {
                    let deleted = diesel::delete(subtree(id, below(&path)))
                        .execute(conn)
                        .await?;
                    tracing::debug!(%id, deleted, "Deleted comment subtree");
                }

                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl PostLookup for PgCommentStore {
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRef>> {
        let mut conn = self.pool.get().await?;

        Ok(content_posts::table
            .find(id)
            .select(ContentPost::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(PostRef::from))
    }
}

#[async_trait]
impl UserLookup for PgCommentStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRef>> {
        let mut conn = self.pool.get().await?;

        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(UserRef::from))
    }
}
