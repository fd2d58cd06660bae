//! The agent loop: plan, act, observe, repeat.
//!
//! One [`AgentOrchestrator`] drives one run at a time. Each iteration:
//!
//! 1. **Budget check** — abort on too many tool errors, then on the step limit
//! 2. **Gateway call** — the reply is appended as an assistant message
//! 3. **Strict completion** — a final phrase ends the run with the reply
//! 4. **No tool call** — the loose tier decides between `Completed` and
//!    `Replied`; either way the run ends
//! 5. **Dispatch** — the call's result is appended as a user message and the
//!    loop continues
//!
//! Blocking and streaming gateways go through the same loop; streaming only
//! changes how the reply text is collected.

use std::sync::Arc;

use codicode_core::{
    AgentRunState, Gateway, GatewayRequest, Message, ParsedToolCall, RunCounters, RunOutcome,
    RunStatus, SamplingParams, TaggedJsonParser, ToolCall, ToolCallParser, ToolRegistry,
    ToolResult,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::budget::{Budget, BudgetVerdict};
use crate::completion::{CompletionClassifier, PhraseClassifier};
use crate::stream_event::AgentStreamEvent;

/// Drives runs against a gateway and a tool registry.
pub struct AgentOrchestrator {
    gateway: Arc<dyn Gateway>,
    registry: Arc<ToolRegistry>,
    parser: Box<dyn ToolCallParser>,
    classifier: Box<dyn CompletionClassifier>,
    budget: Budget,
    sampling: SamplingParams,
    streaming: bool,
    events: Option<mpsc::UnboundedSender<AgentStreamEvent>>,
    state: AgentRunState,
}

impl AgentOrchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            gateway,
            registry,
            parser: Box::new(TaggedJsonParser),
            classifier: Box::new(PhraseClassifier::default()),
            budget: Budget::default(),
            sampling: SamplingParams::default(),
            streaming: false,
            events: None,
            state: AgentRunState::default(),
        }
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Collect replies fragment by fragment instead of in one piece.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_parser(mut self, parser: Box<dyn ToolCallParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn CompletionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Send run events to `events`. A closed receiver is ignored.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<AgentStreamEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run `task` to a terminal status.
    ///
    /// Any previous run's state is discarded first. Taking `&mut self` keeps
    /// a single run in flight per orchestrator.
    pub async fn execute(&mut self, task: &str) -> RunOutcome {
        self.state.start(task);
        info!(
            conversation_id = %self.state.conversation.id,
            max_steps = self.budget.max_steps,
            max_tool_errors = self.budget.max_tool_errors,
            streaming = self.streaming,
            "Starting run"
        );
        if self.streaming && !self.gateway.supports_streaming() {
            warn!(
                gateway = %self.gateway.name(),
                "Streaming requested but the gateway has no native streaming; using blocking replies"
            );
        }

        let tools = self.registry.descriptors();

        let (status, result) = loop {
            match self.budget.check(&self.state.counters()) {
                BudgetVerdict::Continue => {}
                BudgetVerdict::TooManyErrors => {
                    warn!(errors = self.state.tool_error_count, "Aborting run: too many tool errors");
                    break (
                        RunStatus::AbortedErrors,
                        self.budget.errors_message(self.state.tool_error_count),
                    );
                }
                BudgetVerdict::StepLimitReached => {
                    warn!(steps = self.state.step_count, "Run hit the step limit");
                    break (RunStatus::AbortedStepLimit, self.budget.step_limit_message());
                }
            }

            self.state.step_count += 1;
            let step = self.state.step_count;
            debug!(step, max_steps = self.budget.max_steps, "Agent loop iteration");
            self.emit(AgentStreamEvent::StepStarted {
                step,
                max_steps: self.budget.max_steps,
            });

            let request = GatewayRequest {
                messages: self.state.conversation.snapshot(),
                tools: tools.clone(),
                sampling: self.sampling,
            };
            let content = self.query_gateway(request).await;
            self.state.conversation.append(Message::assistant(content.clone()));

            if self.classifier.is_final(&content) {
                info!(step, "Completion phrase found");
                break (RunStatus::Completed, content);
            }

            let call = match self.parser.parse(&content) {
                ParsedToolCall::Call(call) => call,
                ParsedToolCall::None => break self.conclude_without_call(content),
                ParsedToolCall::Malformed { reason } => {
                    warn!(step, reason = %reason, "Ignoring malformed tool call");
                    self.emit(AgentStreamEvent::ProtocolWarning { reason });
                    break self.conclude_without_call(content);
                }
            };

            let result = self.dispatch(&call).await;
            self.state
                .conversation
                .append(Message::user(format_tool_results(&call.name, &result)));
        };

        self.state.finish(status);
        info!(
            status = %status,
            steps = self.state.step_count,
            tool_errors = self.state.tool_error_count,
            "Run finished"
        );
        self.emit(AgentStreamEvent::Done {
            status,
            step_count: self.state.step_count,
            tool_error_count: self.state.tool_error_count,
        });

        RunOutcome {
            status,
            result,
            step_count: self.state.step_count,
            tool_error_count: self.state.tool_error_count,
        }
    }

    /// Collect one reply, emitting it as chunk events along the way.
    async fn query_gateway(&self, request: GatewayRequest) -> String {
        if self.streaming && self.gateway.supports_streaming() {
            let mut fragments = self.gateway.generate_stream(request).await;
            let mut content = String::new();
            while let Some(fragment) = fragments.recv().await {
                self.emit(AgentStreamEvent::Chunk {
                    content: fragment.clone(),
                });
                content.push_str(&fragment);
            }
            content
        } else {
            let response = self.gateway.generate(request).await;
            if response.is_error() {
                warn!(gateway = %self.gateway.name(), content = %response.content, "Gateway reported an error");
            }
            if let Some(usage) = &response.usage {
                debug!(total_tokens = usage.total_tokens, "Gateway usage");
            }
            self.emit(AgentStreamEvent::Chunk {
                content: response.content.clone(),
            });
            response.content
        }
    }

    /// The reply holds no actionable call, so the run ends here.
    fn conclude_without_call(&self, content: String) -> (RunStatus, String) {
        if self.classifier.looks_conclusive(&content) {
            (RunStatus::Completed, content)
        } else {
            (RunStatus::Replied, content)
        }
    }

    async fn dispatch(&mut self, call: &ToolCall) -> ToolResult {
        info!(tool = %call.name, id = %call.id, "Executing tool");
        self.emit(AgentStreamEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let result = self.registry.dispatch(call).await;
        if !result.success {
            self.state.tool_error_count += 1;
            warn!(
                tool = %call.name,
                error = %result.error_text(),
                errors = self.state.tool_error_count,
                "Tool failed"
            );
        }

        self.emit(AgentStreamEvent::ToolResult {
            id: call.id.clone(),
            name: call.name.clone(),
            success: result.success,
            output: if result.success {
                result.data_text()
            } else {
                result.error_text().to_string()
            },
        });
        result
    }

    fn emit(&self, event: AgentStreamEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    pub fn step_count(&self) -> u32 {
        self.state.step_count
    }

    pub fn tool_error_count(&self) -> u32 {
        self.state.tool_error_count
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    pub fn counters(&self) -> RunCounters {
        self.state.counters()
    }

    /// Snapshot of the current run's conversation.
    pub fn history(&self) -> Vec<Message> {
        self.state.conversation.snapshot()
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Forget the current run.
    pub fn reset(&mut self) {
        self.state.reset();
        debug!("Orchestrator reset");
    }
}

/// The user message that feeds a tool result back to the model.
pub fn format_tool_results(tool_name: &str, result: &ToolResult) -> String {
    let line = if result.success {
        format!("  Success: {}", result.data_text())
    } else {
        format!("  Error: {}", result.error_text())
    };
    format!("Tool execution results:\n\n{tool_name}:\n{line}\n")
}
