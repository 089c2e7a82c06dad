pub mod comment;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod schema;
pub mod store;
pub mod telemetry;

pub use comment::{
    path::MaterializedPath,
    service::{CommentService, CreateComment},
    Category, Comment, CommentFilter, CommentTree, CommentView, FlatComment,
};
pub use error::{Error, Result};
pub use pagination::{PageRequest, Paginated};
