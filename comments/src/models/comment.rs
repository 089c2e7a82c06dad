use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    comment::{path::MaterializedPath, Category, Comment},
    error::Error,
};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::content_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContentComment {
    pub id: Uuid,
    pub body: String,
    pub category: String,
    pub target_id: Uuid,
    pub post_id: Option<Uuid>,
    pub user_id: Uuid,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::content_comments)]
pub struct NewContentComment<'a> {
    pub id: Uuid,
    pub body: &'a str,
    pub category: &'a str,
    pub target_id: Uuid,
    pub post_id: Option<Uuid>,
    pub user_id: Uuid,
    pub path: &'a str,
    pub parent_id: Option<Uuid>,
}

impl TryFrom<ContentComment> for Comment {
    type Error = Error;

    /// A row that can't be read back is corrupt storage, not a bad request.
    fn try_from(row: ContentComment) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            Error::Inconsistency(format!("stored comment {} is corrupt: {e}", row.id))
        };

        let category = row.category.parse::<Category>().map_err(|e| corrupt(&e))?;
        let path = MaterializedPath::parse(&row.path).map_err(|e| corrupt(&e))?;

        Ok(Comment {
            id: row.id,
            body: row.body,
            category,
            target_id: row.target_id,
            post_id: row.post_id,
            user_id: row.user_id,
            path,
            parent_id: row.parent_id,
            created_at: row.created_at,
        })
    }
}
