//! The agent loop for CodiCode.
//!
//! The agent follows a **Plan → Act → Observe** cycle:
//!
//! 1. **Seed** the conversation with the task
//! 2. **Ask the gateway** for the next reply (tool descriptors attached)
//! 3. **Classify** the reply: a completion phrase ends the run
//! 4. **If a tool call** is embedded: dispatch it, feed the result back,
//!    loop to step 2
//! 5. **Otherwise** the reply is the result
//!
//! Every run is bounded by a [`Budget`] of steps and tool errors.

pub mod budget;
pub mod completion;
pub mod orchestrator;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use budget::{Budget, BudgetVerdict};
pub use completion::{CompletionClassifier, PhraseClassifier};
pub use orchestrator::{AgentOrchestrator, format_tool_results};
pub use stream_event::AgentStreamEvent;
