use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::comment::PostRef;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::content_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContentPost {
    pub id: Uuid,
    pub title: String,
    pub created_at: NaiveDateTime,
}

impl From<ContentPost> for PostRef {
    fn from(post: ContentPost) -> Self {
        PostRef {
            id: post.id,
            title: post.title,
        }
    }
}
