//! Tool Store Adapters.
//!
//! - `InMemoryToolStore` - process-local catalog and audit trail
//! - `ToolCatalog` - YAML seed file loader

mod in_memory;
mod yaml_catalog;

pub use in_memory::InMemoryToolStore;
pub use yaml_catalog::ToolCatalog;
