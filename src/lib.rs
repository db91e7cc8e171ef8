// The primary purpose of this file will be to expose the modules for the main.rs
// and integration tests.
pub mod app;
pub mod cli;
pub mod config;
pub mod utils;
