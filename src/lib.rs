//! LifePal - Tool-Augmented Conversation Orchestrator
//!
//! Drives a chat model through a bounded tool-calling loop. The model starts
//! with a single `tool_retriever` tool and discovers the rest of the catalog
//! on demand; tools run as local scripts, remote functions or webhooks, and
//! every execution is audited.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
