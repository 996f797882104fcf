//! PostgreSQL adapters.

mod tool_store;

pub use tool_store::PostgresToolStore;
