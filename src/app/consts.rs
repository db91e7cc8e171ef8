use lazy_static::lazy_static;
use std::path::PathBuf;

/// Documents carrying this tag are readable by every user.
pub const PUBLIC_TAG: &str = ":public";

/// Control character that delimits serialized tag lists. Never part of a tag name.
pub const TAG_SEPARATOR: char = '\u{1F}';

pub const DEFAULT_COOKIE_NAME: &str = "stags-token";
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 8082;
pub const DEFAULT_AUTH_SERVER: &str = "http://localhost:8080/";
pub const DEFAULT_POOL_SIZE: usize = 8;

lazy_static! {
    // logging constants
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        std::env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        std::env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref GIT_COMMIT_HASH: String =
        std::env::var(format!("{}_GIT_INFO", PROJECT_NAME.clone()))
            .unwrap_or_else(|_| String::from("Unknown"));
    pub static ref LOG_ENV: String = format!("{}_LOG_LEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME").to_lowercase());
}
