//! Agent driver for ctxpack
//!
//! Quick-answer, exploration, and deep-research modes over the hybrid
//! search index and the resource-scoped tools, with buffered and streaming
//! entry points and an asynchronous research runner.

pub mod chat;
pub mod driver;
pub mod error;
pub mod events;
pub mod mock;
pub mod prompts;
pub mod research;
pub mod source;
pub mod stream;
pub mod tools;

pub use chat::{
    ChatEvent, ChatEventStream, ChatModel, ChatOutcome, ChatRequest, ChatUsage, ToolDefinition,
    ToolHandler,
};
pub use driver::{
    AgentDriver, AgentMode, AgentRunFailure, AgentRunOutcome, QuickAnswer, StepRecord,
    StreamEndHook,
};
pub use error::{AgentError, AgentResult};
pub use events::{PING_INTERVAL_SECS, StreamEvent};
pub use mock::{ScriptStep, ScriptedChatModel};
pub use research::ResearchRunner;
pub use source::{SourceRef, SourceSet};
pub use tools::{SearchDefaults, ToolContext, build_toolset, truncate_preview};
