pub mod builder;
pub mod flatten;
pub mod path;
pub mod service;

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

use self::path::MaterializedPath;

/// What kind of content a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Post,
    Manga,
    Novel,
    Chapter,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Post => "post",
            Category::Manga => "manga",
            Category::Novel => "novel",
            Category::Chapter => "chapter",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Category::Post),
            "manga" => Ok(Category::Manga),
            "novel" => Ok(Category::Novel),
            "chapter" => Ok(Category::Chapter),
            _ => Err(Error::validation(format!(
                "Comment category must be one of post, manga, novel or chapter, got `{s}`"
            ))),
        }
    }
}

/// A stored comment. The parent is only referenced by id, children are
/// derived from descendant rows when a tree is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
    pub category: Category,
    pub target_id: Uuid,
    /// Only set when `category` is [`Category::Post`].
    pub post_id: Option<Uuid>,
    pub user_id: Uuid,
    pub path: MaterializedPath,
    pub parent_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A validated comment about to be stored. The store assigns the id, the
/// path and the creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub body: String,
    pub category: Category,
    pub target_id: Uuid,
    pub post_id: Option<Uuid>,
    pub user_id: Uuid,
}

/// Equality predicates for selecting root comments. Every field that is set
/// must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub category: Option<Category>,
    pub target_id: Option<Uuid>,
}

impl CommentFilter {
    pub fn for_target(category: Category, target_id: Uuid) -> Self {
        CommentFilter {
            category: Some(category),
            target_id: Some(target_id),
            ..Default::default()
        }
    }

    pub fn for_post(post_id: Uuid) -> Self {
        CommentFilter {
            post_id: Some(post_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        self.post_id.is_none_or(|id| comment.post_id == Some(id))
            && self.user_id.is_none_or(|id| comment.user_id == id)
            && self.category.is_none_or(|c| comment.category == c)
            && self.target_id.is_none_or(|id| comment.target_id == id)
    }
}

// The model that is returned for tree reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentTree {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<CommentTree>,
}

impl CommentTree {
    pub fn leaf(comment: Comment) -> Self {
        CommentTree {
            comment,
            children: vec![],
        }
    }

    /// Number of comments in this tree, the root included.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

// The model that is returned for paginated reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
}

/// A comment together with the user who wrote it and, for article comments,
/// the article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserRef,
    pub post: Option<PostRef>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for c in [
            Category::Post,
            Category::Manga,
            Category::Novel,
            Category::Chapter,
        ] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!(matches!(
            "comic".parse::<Category>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Category::Manga).unwrap(),
            "\"manga\""
        );
    }
}
