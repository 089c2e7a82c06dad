use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::comment::UserRef;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: NaiveDateTime,
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        UserRef {
            id: user.id,
            username: user.username,
        }
    }
}
