//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and validation errors
//! that form the vocabulary of the LifePal domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConversationId, ExecutionId, PrincipalId, ToolId};
pub use timestamp::Timestamp;
