//! Tool catalog domain.
//!
//! - `definition` - tool metadata, backend spec and running statistics
//! - `category` - discovery namespaces
//! - `execution_record` - append-only audit entries
//! - `outcome` - normalized success/failure result
//! - `retriever` - the bootstrap meta-tool

mod category;
mod definition;
mod errors;
mod execution_record;
mod filter;
mod outcome;
mod retriever;

pub use category::{sort_categories, ToolCategory};
pub use definition::{ExecutionBackend, ToolDefinition, ToolStats, WebhookMethod};
pub use errors::{ExecutionStatus, ToolError};
pub use execution_record::ToolExecutionRecord;
pub use filter::ToolFilter;
pub use outcome::ToolOutcome;
pub use retriever::{bootstrap_tool_schema, RetrieverArgs, INTENT_CATEGORIES, TOOL_RETRIEVER_NAME};
