//! # CodiCode Core
//!
//! Domain types, traits, and error definitions for the CodiCode autonomous
//! coding agent. This crate has **no framework dependencies**: it defines the
//! domain model that the gateway, tool and agent crates implement against.
//!
//! ## Seams
//!
//! - [`Gateway`] — the language-model backend, blocking or streaming
//! - [`Tool`] / [`ToolRegistry`] — named capabilities and their dispatcher
//! - [`ToolCallParser`] — extraction of a structured call from model text
//!
//! Implementations live in their respective crates, so every seam can be
//! replaced with a scripted stand-in under test.

pub mod agent;
pub mod error;
pub mod gateway;
pub mod message;
pub mod protocol;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentRunState, RunCounters, RunOutcome, RunStatus};
pub use error::{Error, Result};
pub use gateway::{FinishReason, Gateway, GatewayRequest, GatewayResponse, SamplingParams};
pub use message::{Conversation, ConversationId, Message, Role};
pub use protocol::{ParsedToolCall, TaggedJsonParser, ToolCallParser};
pub use tool::{Tool, ToolAuditEntry, ToolCall, ToolDescriptor, ToolRegistry, ToolResult};
