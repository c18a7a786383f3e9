//! Conversation Driver, tool dispatch, inline-flag resolvers, and the
//! top-level error taxonomy.

pub mod cliflags;
pub mod dispatch;
pub mod driver;
pub mod error;

pub use cliflags::{extract_inline_overrides, reconstruct_invocation, FlagError, InlineOverrides};
pub use dispatch::{dispatch_tool_call, DispatchOutcome};
pub use driver::{ConversationDriver, EndReason, TurnSink};
pub use error::WhaiError;
