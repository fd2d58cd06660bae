//! `codicode tools` — List the built-in tools.

use codicode_config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = codicode_tools::default_registry(&config.tools)?;

    println!("🔧 Available tools ({})", registry.len());
    println!();
    for descriptor in registry.descriptors() {
        println!("  {}", descriptor.name);
        println!("    {}", descriptor.description);
        if let Some(props) = descriptor.parameters.get("properties").and_then(|p| p.as_object()) {
            let required: Vec<&str> = descriptor
                .parameters
                .get("required")
                .and_then(|r| r.as_array())
                .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            for (name, schema) in props {
                let kind = schema.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                let marker = if required.contains(&name.as_str()) { " (required)" } else { "" };
                println!("      {name}: {kind}{marker}");
            }
        }
        println!();
    }
    Ok(())
}
