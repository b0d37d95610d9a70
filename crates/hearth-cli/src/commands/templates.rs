use anyhow::{Result, bail};
use hearth_application::Services;
use hearth_core::template::PromptTemplate;

pub async fn list(services: &Services) -> Result<()> {
    let templates = services.templates.list_all().await?;
    if templates.is_empty() {
        println!("No prompt templates saved.");
    }
    for template in templates {
        println!(
            "{}  (temperature {}, max {} tokens)\n    {}",
            template.name,
            template.parameters.temperature,
            template.parameters.max_output_tokens,
            template.system_text
        );
    }
    Ok(())
}

pub async fn add(
    services: &Services,
    name: String,
    system_text: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Template name must not be empty");
    }

    let mut parameters = services.config.generation.clone();
    if let Some(temperature) = temperature {
        parameters.temperature = temperature;
    }
    if let Some(max_tokens) = max_tokens {
        parameters.max_output_tokens = max_tokens;
    }

    let template = PromptTemplate::new(name, system_text).with_parameters(parameters);
    services.templates.save(&template).await?;
    println!("✓ Saved template '{}'", template.name);
    Ok(())
}

pub async fn remove(services: &Services, name: &str) -> Result<()> {
    services.templates.delete(name).await?;
    println!("✓ Removed template '{}'", name);
    Ok(())
}
