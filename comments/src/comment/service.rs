use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::CommentConfig,
    error::{Error, Result},
    pagination::{paginate, PageRequest, Paginated},
    store::{CommentRepository, PostLookup, UserLookup},
};

use super::{
    builder::TreeBuilder, flatten::flatten, Category, CommentFilter, CommentTree, CommentView,
    FlatComment, NewComment,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub body: String,
    pub category: Category,
    pub target_id: Uuid,
    pub post_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl CreateComment {
    fn validate(&mut self, max_body_len: usize) -> Result<()> {
        self.body = self.body.trim().to_string();
        if self.body.is_empty() {
            return Err(Error::validation("No content provided"));
        }

        if self.body.chars().count() > max_body_len {
            return Err(Error::validation(format!(
                "Content too long (max {max_body_len} characters)"
            )));
        }

        match (self.category, self.post_id) {
            (Category::Post, None) => Err(Error::validation(
                "A comment on an article needs the article's post id",
            )),
            (Category::Post, Some(post_id)) if post_id != self.target_id => Err(
                Error::validation("The target of an article comment must be the article itself"),
            ),
            (Category::Post, Some(_)) => Ok(()),
            (category, Some(_)) => Err(Error::validation(format!(
                "Only article comments can reference a post, this one is a {category} comment"
            ))),
            (_, None) => Ok(()),
        }
    }
}

/// Entry point for everything a request layer does with comments.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostLookup>,
    users: Arc<dyn UserLookup>,
    config: CommentConfig,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostLookup>,
        users: Arc<dyn UserLookup>,
        config: CommentConfig,
    ) -> Self {
        CommentService {
            comments,
            posts,
            users,
            config,
        }
    }

    /// For stores that also know about posts and users.
    pub fn with_store<S>(store: Arc<S>, config: CommentConfig) -> Self
    where
        S: CommentRepository + PostLookup + UserLookup + 'static,
    {
        CommentService::new(store.clone(), store.clone(), store, config)
    }

    #[tracing::instrument(
        skip(self, input),
        fields(category = %input.category, target_id = %input.target_id, parent_id = ?input.parent_id)
    )]
    pub async fn create(&self, mut input: CreateComment, user_id: Uuid) -> Result<CommentView> {
        input.validate(self.config.max_body_len)?;

        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id))?;

        // check if the parent comment actually belongs to the same target
        if let Some(parent_id) = input.parent_id {
            let parent = self
                .comments
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| Error::not_found("parent comment", parent_id))?;

            if parent.category != input.category || parent.target_id != input.target_id {
                return Err(Error::validation(
                    "You're replying to a comment that does not belong to this content",
                ));
            }
        }

        let post = match (input.category, input.post_id) {
            (Category::Post, Some(post_id)) => Some(
                self.posts
                    .find_post(post_id)
                    .await?
                    .ok_or_else(|| Error::not_found("post", post_id))?,
            ),
            _ => None,
        };

        let comment = self
            .comments
            .create(
                NewComment {
                    body: input.body,
                    category: input.category,
                    target_id: input.target_id,
                    post_id: post.as_ref().map(|p| p.id),
                    user_id: user.id,
                },
                input.parent_id,
            )
            .await?;

        tracing::info!(id = %comment.id, path = %comment.path, "Created comment");

        Ok(CommentView {
            comment,
            user,
            post,
        })
    }

    pub async fn find_one(&self, id: Uuid) -> Result<CommentView> {
        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("comment", id))?;

        let user = self
            .users
            .find_user(comment.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", comment.user_id))?;

        let post = match comment.post_id {
            Some(post_id) => self.posts.find_post(post_id).await?,
            None => None,
        };

        Ok(CommentView {
            comment,
            user,
            post,
        })
    }

    /// One tree per matching root, in root order. Replies are included in
    /// full, whatever their own category or target.
    #[tracing::instrument(skip(self))]
    pub async fn find_trees(&self, filter: &CommentFilter) -> Result<Vec<CommentTree>> {
        let builder = TreeBuilder::new().skip_orphans(self.config.skip_orphans);
        let roots = self.comments.find_roots(filter).await?;

        let mut trees = Vec::with_capacity(roots.len());
        for root in roots {
            let descendants = self.comments.find_descendants(&root.path).await?;
            let tree = builder.build(root, descendants).inspect_err(|e| {
                tracing::error!(error = %e, "Could not build comment tree");
            })?;
            trees.push(tree);
        }

        Ok(trees)
    }

    /// Every matching tree flattened in pre-order and concatenated in root
    /// order, then sliced. The total is recounted on every call.
    #[tracing::instrument(skip(self))]
    pub async fn paginate(
        &self,
        filter: &CommentFilter,
        page: PageRequest,
    ) -> Result<Paginated<FlatComment>> {
        page.validate(self.config.max_page_size)?;

        let trees = self.find_trees(filter).await?;
        paginate(flatten(&trees), page)
    }

    /// Deletes the comments and all of their replies. Nothing is deleted
    /// unless every id exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut unique: Vec<Uuid> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        if unique.is_empty() {
            return Ok(());
        }

        let missing = self.comments.find_missing(&unique).await?;
        if !missing.is_empty() {
            return Err(Error::NotFound {
                entity: "comment",
                ids: missing,
            });
        }

        self.comments.delete_cascade(&unique).await?;
        tracing::info!(count = unique.len(), "Deleted comments with their replies");

        Ok(())
    }
}
