use anyhow::{Context, Result};
use hearth_application::Services;

pub fn show(services: &Services) -> Result<()> {
    let rendered =
        toml::to_string_pretty(&services.config).context("Failed to render configuration")?;
    println!("# {}\n{}", services.config_service.path().display(), rendered);
    Ok(())
}

pub fn init(services: &Services) -> Result<()> {
    let path = services.config_service.path().display();
    if services.config_service.init()? {
        println!("✓ Wrote default configuration to {}", path);
    } else {
        println!("Configuration already exists at {}", path);
    }
    Ok(())
}
