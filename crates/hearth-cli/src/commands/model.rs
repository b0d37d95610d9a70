use anyhow::{Result, bail};
use hearth_application::Services;
use hearth_core::model::{FileValidation, ModelAcquisition};
use hearth_infrastructure::validate_gguf_file;
use std::path::Path;

pub async fn check(services: &Services) -> Result<()> {
    let default_path = services.acquisition.default_model_path();
    let custom_path = services.settings.custom_model_path().await?;

    match &custom_path {
        Some(path) if path.is_file() => {
            println!("✓ Selected model: {}", path.display());
            return Ok(());
        }
        Some(path) => println!(
            "Selected model is missing, falling back to the default: {}",
            path.display()
        ),
        None => {}
    }

    if default_path.is_file() {
        println!("✓ Default model: {}", default_path.display());
    } else {
        println!("No model file found.");
        println!("Download {}", services.config.model.download_url);
        println!("and save it as {}", default_path.display());
    }
    Ok(())
}

pub fn validate(path: &Path) -> Result<()> {
    report(path, &validate_gguf_file(path))
}

pub async fn select(services: &Services, path: &Path) -> Result<()> {
    let validation = services.acquisition.validate_selected_file(path);
    report(path, &validation)?;
    let path = std::fs::canonicalize(path)?;
    services.settings.set_custom_model_path(Some(&path)).await?;
    println!("✓ Model selected: {}", path.display());
    Ok(())
}

pub async fn reset(services: &Services) -> Result<()> {
    services.settings.set_custom_model_path(None).await?;
    println!("✓ Using the default model");
    Ok(())
}

fn report(path: &Path, validation: &FileValidation) -> Result<()> {
    if !validation.valid {
        bail!(
            "{} is not a usable model: {}",
            path.display(),
            validation.reason.as_deref().unwrap_or("invalid file")
        );
    }
    println!("✓ {} is a GGUF file", path.display());
    if let Some(warning) = &validation.warning {
        println!("⚠ {}", warning);
    }
    Ok(())
}
