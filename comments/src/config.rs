use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

/// Settings of the comment engine itself, independent of where comments
/// are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentConfig {
    pub max_body_len: usize,
    pub max_page_size: usize,
    /// Build trees around rows whose parent vanished instead of failing.
    pub skip_orphans: bool,
}

impl Default for CommentConfig {
    fn default() -> Self {
        CommentConfig {
            max_body_len: 5000,
            max_page_size: 100,
            skip_orphans: false,
        }
    }
}

pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub pool_size: usize,
    pub run_migrations: bool,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> Result<String, String> {
    match var(key) {
        Ok(Some(val)) => Ok(val),
        Ok(None) => Err(format!("Environment variable `{key}` is required")),
        Err(e) => Err(format!(
            "Environment variable `{key}` is required, but could not retrieve: {e}"
        )),
    }
}

/// Falls back to `default` when the variable is missing or can't be parsed.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(val)) => val.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value `{val}` for environment variable `{key}`, using default");
            default
        }),
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{e}, using default");
            default
        }
    }
}

fn flag_var(key: &str) -> bool {
    match var(key) {
        Ok(Some(val)) => matches!(val.trim(), "1" | "true" | "yes"),
        _ => false,
    }
}

impl CommentConfig {
    pub fn new_from_env() -> Self {
        let defaults = CommentConfig::default();
        CommentConfig {
            max_body_len: parsed_var("COMMENT_MAX_BODY_LEN", defaults.max_body_len),
            max_page_size: parsed_var("COMMENT_MAX_PAGE_SIZE", defaults.max_page_size),
            skip_orphans: flag_var("COMMENT_SKIP_ORPHANS"),
        }
    }
}

impl Env {
    pub fn from_env() -> Self {
        match var("ENVIRONMENT") {
            Ok(Some(env)) => match env.as_str() {
                "dev" => Env::Dev,
                "staging" => Env::Staging,
                "production" => Env::Production,
                _ => Env::Dev,
            },
            _ => Env::Dev,
        }
    }
}

/// Production logs are JSON unless `LOG_FORMAT` says otherwise.
fn json_logs(env: Env, log_format: Option<&str>) -> bool {
    match log_format {
        Some(format) => format.trim() == "json",
        None => env == Env::Production,
    }
}

/// Read on its own so the subscriber exists before the rest of the config
/// is parsed and can warn about it.
pub fn json_logs_from_env() -> bool {
    json_logs(Env::from_env(), var("LOG_FORMAT").ok().flatten().as_deref())
}

impl ServerConfig {
    pub fn new_from_env() -> Result<Self, String> {
        Ok(ServerConfig {
            env: Env::from_env(),
            database_url: required_var("DATABASE_URL")?,
            pool_size: parsed_var("DATABASE_POOL_SIZE", 10),
            run_migrations: flag_var("RUN_MIGRATIONS"),
        })
    }
}
