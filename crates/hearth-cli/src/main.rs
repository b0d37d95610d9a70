use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_application::Services;
use hearth_infrastructure::logging::init_logging;
use hearth_infrastructure::{HearthPaths, NoFetcher};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Hearth CLI - manage local model chat data", long_about = None)]
struct Cli {
    /// Keep config and data under this directory instead of the platform defaults
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit stored conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Manage saved prompt templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Show or change the global system preamble
    Preamble {
        #[command(subcommand)]
        action: PreambleAction,
    },
    /// Check, validate and select model files
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Show or initialise the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations, most recent first
    List,
    /// Print every turn of a conversation
    Show { id: String },
    /// Start an empty conversation, optionally from a template
    New {
        #[arg(long)]
        template: Option<String>,
    },
    /// Make a conversation current
    Select { id: String },
    /// Set a title; omit it to return to the automatic title
    Rename { id: String, title: Option<String> },
    /// Delete a conversation
    Delete { id: String },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List saved templates
    List,
    /// Save a template, replacing one with the same name
    Add {
        name: String,
        system_text: String,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<usize>,
    },
    /// Delete a template
    Remove { name: String },
}

#[derive(Subcommand)]
enum PreambleAction {
    /// Print the effective global preamble
    Show,
    /// Store a preamble override
    Set { text: String },
    /// Drop the override and use the configured default
    Reset,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Report which model file would be loaded
    Check,
    /// Validate a GGUF file without loading it
    Validate { path: PathBuf },
    /// Validate a GGUF file and remember it as the model to load
    Select { path: PathBuf },
    /// Forget the selected file and use the default model
    Reset,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file if none exists
    Init,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = HearthPaths::new(cli.root).context("Failed to resolve Hearth directories")?;
    let _log_guard = init_logging(&paths.logs_dir(), "warn")
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;
    let services = Services::load(paths, Arc::new(NoFetcher))?;

    match cli.command {
        Commands::Conversations { action } => match action {
            ConversationAction::List => commands::conversations::list(&services).await?,
            ConversationAction::Show { id } => commands::conversations::show(&services, &id).await?,
            ConversationAction::New { template } => {
                commands::conversations::create(&services, template.as_deref()).await?
            }
            ConversationAction::Select { id } => {
                commands::conversations::select(&services, &id).await?
            }
            ConversationAction::Rename { id, title } => {
                commands::conversations::rename(&services, &id, title).await?
            }
            ConversationAction::Delete { id } => {
                commands::conversations::delete(&services, &id).await?
            }
        },
        Commands::Templates { action } => match action {
            TemplateAction::List => commands::templates::list(&services).await?,
            TemplateAction::Add {
                name,
                system_text,
                temperature,
                max_tokens,
            } => {
                commands::templates::add(&services, name, system_text, temperature, max_tokens)
                    .await?
            }
            TemplateAction::Remove { name } => commands::templates::remove(&services, &name).await?,
        },
        Commands::Preamble { action } => match action {
            PreambleAction::Show => commands::preamble::show(&services).await?,
            PreambleAction::Set { text } => commands::preamble::set(&services, Some(&text)).await?,
            PreambleAction::Reset => commands::preamble::set(&services, None).await?,
        },
        Commands::Model { action } => match action {
            ModelAction::Check => commands::model::check(&services).await?,
            ModelAction::Validate { path } => commands::model::validate(&path)?,
            ModelAction::Select { path } => commands::model::select(&services, &path).await?,
            ModelAction::Reset => commands::model::reset(&services).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&services)?,
            ConfigAction::Init => commands::config::init(&services)?,
            ConfigAction::Path => println!("{}", services.config_service.path().display()),
        },
    }

    Ok(())
}
