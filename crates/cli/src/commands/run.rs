//! `codicode run` — Execute a single task.

use codicode_config::AppConfig;
use codicode_core::RunStatus;

use super::{build_orchestrator, print_events};

pub async fn run(config: &AppConfig, task: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut agent, mut rx) = build_orchestrator(config)?;

    println!();
    println!("  Model:  {} @ {}", config.llm.model, config.llm.base_url);
    println!("  Task:   {task}");
    println!();

    let (outcome, ()) = tokio::join!(
        agent.execute(task),
        print_events(&mut rx, config.agent.stream)
    );

    println!();
    println!(
        "  Status: {} ({} steps, {} tool errors)",
        outcome.status, outcome.step_count, outcome.tool_error_count
    );
    println!();
    println!("{}", outcome.result);

    match outcome.status {
        RunStatus::Completed | RunStatus::Replied => Ok(()),
        status => Err(format!("Run ended with status {status}").into()),
    }
}
