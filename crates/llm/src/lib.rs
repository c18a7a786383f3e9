//! Provider-agnostic streaming chat client.
//!
//! Three concerns, three modules: [`message`] is the shared data model,
//! [`chunk`] is the streaming-reassembly algorithm, [`error`] is the
//! provider error taxonomy, and [`provider`] wires all three to an actual
//! HTTP backend.

pub mod chunk;
pub mod error;
pub mod message;
pub mod provider;

pub use chunk::{Chunk, RawDelta, RawToolCallDelta, StreamReassembler};
pub use error::{LlmError, LlmErrorKind};
pub use message::{ChatMessage, ChatRole, ToolCall, ToolCallFunction};
pub use provider::{execute_shell_tool, LlmProvider};
