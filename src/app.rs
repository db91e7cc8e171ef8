pub mod auth;
pub mod consts;
pub mod database;
pub mod errors;
pub mod query;
pub mod server;
pub mod session;
pub mod tag_cache;
pub mod tags;
pub mod types;
