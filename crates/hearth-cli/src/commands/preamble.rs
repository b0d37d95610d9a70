use anyhow::Result;
use hearth_application::Services;

pub async fn show(services: &Services) -> Result<()> {
    match services.settings.system_preamble().await? {
        Some(preamble) => println!("{}", preamble),
        None => println!("{}\n(default)", services.config.default_preamble),
    }
    Ok(())
}

pub async fn set(services: &Services, text: Option<&str>) -> Result<()> {
    services.settings.set_system_preamble(text).await?;
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(_) => println!("✓ Preamble saved"),
        None => println!("✓ Preamble reset to the default"),
    }
    Ok(())
}
