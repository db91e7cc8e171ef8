pub mod document_store;
pub mod memory_store;
pub mod pg_store;
pub mod schema;
pub mod types;

pub use document_store::DocumentStore;
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
