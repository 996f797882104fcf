//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, validation errors)
//! - `tools` - Tool catalog, execution outcomes and the audit trail
//! - `conversation` - Messages, history invariants, pruning and prompts
//! - `principal` - The identity tools execute on behalf of

pub mod conversation;
pub mod foundation;
pub mod principal;
pub mod tools;

pub use principal::Principal;
