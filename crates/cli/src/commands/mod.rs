//! Subcommand implementations.

pub mod agent;
pub mod config_cmd;
pub mod doctor;
pub mod run;
pub mod tools;

use std::io::Write;
use std::sync::Arc;

use codicode_agent::{AgentOrchestrator, AgentStreamEvent, Budget};
use codicode_config::AppConfig;
use tokio::sync::mpsc;

/// Wire up gateway, tools and loop settings from the config.
pub fn build_orchestrator(
    config: &AppConfig,
) -> Result<(AgentOrchestrator, mpsc::UnboundedReceiver<AgentStreamEvent>), Box<dyn std::error::Error>>
{
    let gateway = codicode_providers::build_from_config(&config.llm)?;
    let registry = Arc::new(codicode_tools::default_registry(&config.tools)?);
    let (tx, rx) = mpsc::unbounded_channel();

    let orchestrator = AgentOrchestrator::new(gateway, registry)
        .with_budget(Budget::from(&config.agent))
        .with_sampling(config.llm.sampling())
        .with_streaming(config.agent.stream)
        .with_events(tx);

    Ok((orchestrator, rx))
}

/// Render run events until the run reports `Done`.
pub async fn print_events(rx: &mut mpsc::UnboundedReceiver<AgentStreamEvent>, streaming: bool) {
    let mut mid_line = false;
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::StepStarted { step, max_steps } => {
                end_line(&mut mid_line);
                println!("  ── Step {step}/{max_steps} ──");
            }
            AgentStreamEvent::Chunk { content } => {
                if streaming {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                    mid_line = !content.ends_with('\n');
                } else {
                    for line in content.lines() {
                        println!("  Assistant > {line}");
                    }
                }
            }
            AgentStreamEvent::ToolCall { name, arguments, .. } => {
                end_line(&mut mid_line);
                let args = serde_json::Value::Object(arguments);
                println!("  🔧 {name} {args}");
            }
            AgentStreamEvent::ToolResult {
                success, output, ..
            } => {
                let mark = if success { "✅" } else { "❌" };
                let first = output.lines().next().unwrap_or("");
                println!("  {mark} {first}");
            }
            AgentStreamEvent::ProtocolWarning { reason } => {
                end_line(&mut mid_line);
                println!("  ⚠️  Ignored tool call: {reason}");
            }
            AgentStreamEvent::Done { .. } => {
                end_line(&mut mid_line);
                break;
            }
        }
    }
}

fn end_line(mid_line: &mut bool) {
    if *mid_line {
        println!();
        *mid_line = false;
    }
}
