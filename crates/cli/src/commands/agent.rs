//! `codicode agent` — Interactive mode, one task per line.

use std::io::Write;

use codicode_config::AppConfig;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use super::{build_orchestrator, print_events};

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (mut agent, mut rx) = build_orchestrator(config)?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        CodiCode Agent — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.llm.provider);
    println!("  Model:     {}", config.llm.model);
    println!("  Tools:     {}", agent.registry().names().join(", "));
    println!(
        "  Budget:    {} steps, {} tool errors",
        config.agent.max_steps, config.agent.max_tool_errors
    );
    println!();
    println!("  Type a task and press Enter. Type 'help' for commands.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "quit" | "exit" | "q" => break,
            "help" => print_help(),
            "reset" => {
                agent.reset();
                println!("  State cleared.");
            }
            "status" => {
                let counters = agent.counters();
                println!(
                    "  Status: {} | steps: {} | tool errors: {} | complete: {}",
                    agent.status(),
                    counters.step_count,
                    counters.tool_error_count,
                    counters.is_complete
                );
            }
            "tools" => {
                for descriptor in agent.registry().descriptors() {
                    println!("  - {}: {}", descriptor.name, descriptor.description);
                }
            }
            task => {
                let (outcome, ()) = tokio::join!(
                    agent.execute(task),
                    print_events(&mut rx, config.agent.stream)
                );
                println!();
                println!("  [{}] {}", outcome.status, outcome.result);
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_help() {
    println!("  Commands:");
    println!("    help     Show this help");
    println!("    status   Show the last run's status and counters");
    println!("    tools    List available tools");
    println!("    reset    Clear the agent state");
    println!("    quit     Exit (also: exit, q)");
    println!("  Anything else is run as a task.");
}
