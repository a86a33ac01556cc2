//! Agent Core: orchestration layer for mcp-chat.
//!
//! Submodules:
//! - `conversation`: Append-only transcript and its wire rendering
//! - `orchestrator`: The per-query model/tool loop
//! - `session`: Server connections, registry population, ordered teardown
//! - `types`: Loop configuration and progress events
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod session;
pub mod types;

// Re-exports for convenience
pub use conversation::{ConversationState, ConversationTurn};
pub use errors::AgentError;
pub use orchestrator::OrchestrationLoop;
pub use session::{ServerFailure, SessionManager};
pub use types::{AgentEvent, EventObserver, LoopConfig};
