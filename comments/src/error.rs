use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::comment::path::PathError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Could not check out a database connection: {0}")]
    Pool(String),
}

impl Serialize for StorageError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A referenced parent, post, user or comment does not exist.
    #[error("{entity} not found: {}", display_ids(.ids))]
    NotFound { entity: &'static str, ids: Vec<Uuid> },

    #[error("{0}")]
    Validation(String),

    /// The stored rows do not form a tree, e.g. an orphan or a repeated id.
    #[error("Inconsistent comment tree: {0}")]
    Inconsistency(String),

    #[error("{error}")]
    Storage {
        error: StorageError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
}

fn display_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Error::NotFound {
            entity,
            ids: vec![id],
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERR",
            Error::Inconsistency(_) => "INCONSISTENCY",
            Error::Storage { .. } => "DATABASE_ERR",
        }
    }

    /// Client-facing errors can be shown as-is, the rest are the server's
    /// problem and get logged when reported.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::Validation(_))
    }

    /// Turn the error into something a request layer can serialize.
    pub fn report(&self) -> ErrorResponse {
        if !self.is_client_error() {
            tracing::error!(error = %self, code = self.code(), "Comment engine failure");
        }

        match self {
            Error::NotFound { ids, .. } => ErrorResponse {
                code: self.code().into(),
                msg: Some(self.to_string()),
                ids: Some(ids.clone()),
                #[cfg(debug_assertions)]
                debug_info: None,
            },
            Error::Validation(msg) => ErrorResponse {
                code: self.code().into(),
                msg: Some(msg.clone()),
                ids: None,
                #[cfg(debug_assertions)]
                debug_info: None,
            },
            Error::Inconsistency(_) => ErrorResponse {
                code: self.code().into(),
                msg: Some("Comment tree is inconsistent".into()),
                ids: None,
                #[cfg(debug_assertions)]
                debug_info: Some(HashMap::from([(
                    "error",
                    Value::String(self.to_string()),
                )])),
            },
            Error::Storage {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                #[cfg(debug_assertions)]
                {
                    let mut debug_info = HashMap::new();
                    if let Some(backtrace) = backtrace {
                        debug_info.insert(
                            "backtrace",
                            serde_json::to_value(filter_backtrace(backtrace))
                                .unwrap_or(Value::Null),
                        );
                    }
                    debug_info.insert(
                        "error",
                        serde_json::to_value(error).unwrap_or(Value::Null),
                    );
                    ErrorResponse {
                        code: self.code().into(),
                        msg: Some("Database error".into()),
                        ids: None,
                        debug_info: Some(debug_info),
                    }
                }
                #[cfg(not(debug_assertions))]
                {
                    let _ = error;
                    ErrorResponse {
                        code: "SERVER_ERR".into(),
                        msg: Some("Internal server error".into()),
                        ids: None,
                    }
                }
            }
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<Uuid>>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<HashMap<&'static str, Value>>,
}

impl From<StorageError> for Error {
    fn from(error: StorageError) -> Self {
        Error::Storage {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        StorageError::Database(e).into()
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for Error {
    fn from(e: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        StorageError::Pool(e.to_string()).into()
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Validation(e.to_string())
    }
}

#[cfg(debug_assertions)]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg(debug_assertions)]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename().map(|f| f.to_owned()),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_not_found_lists_every_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let e = Error::NotFound {
            entity: "comment",
            ids: vec![a, b],
        };

        assert_eq!(e.code(), "NOT_FOUND");
        assert!(e.is_client_error());
        assert_eq!(e.to_string(), format!("comment not found: {a}, {b}"));

        let report = e.report();
        assert_eq!(report.ids, Some(vec![a, b]));
    }

    #[test]
    fn test_path_error_is_a_validation_error() {
        let e: Error = PathError::Empty.into();
        assert!(matches!(e, Error::Validation(_)));
    }

    #[test]
    fn test_storage_error_report_hides_details_from_msg() {
        let e: Error = diesel::result::Error::NotFound.into();
        assert!(!e.is_client_error());

        let report = serde_json::to_value(e.report()).unwrap();
        assert_eq!(report["code"], "DATABASE_ERR");
        assert_eq!(report["msg"], "Database error");
    }
}
