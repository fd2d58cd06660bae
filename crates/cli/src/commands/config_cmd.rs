//! `codicode config` — Configuration management commands.

use codicode_config::AppConfig;

/// Print the effective configuration (file + env + flags).
pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("# {}", AppConfig::config_path().display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Write the default config file.
pub fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if path.exists() && !force {
        println!("   ⚠️  Config already exists at {}", path.display());
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(AppConfig::config_dir())?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("   ✅ Wrote default config to {}", path.display());
    Ok(())
}

/// Print the config file path.
pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}
