use anyhow::{Context, Result};
use hearth_application::Services;
use hearth_core::session::Role;

pub async fn list(services: &Services) -> Result<()> {
    let conversations = services.session_store.list_conversations().await?;
    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    let current = services.session_store.current_conversation_id().await?;
    for conversation in conversations {
        let marker = if current.as_deref() == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {:<40}  {} turns  {}",
            marker,
            conversation.id,
            conversation.title,
            conversation.turns.len(),
            conversation.updated_at
        );
    }
    Ok(())
}

pub async fn show(services: &Services, id: &str) -> Result<()> {
    let conversation = services
        .session_store
        .load_conversation(id)
        .await
        .with_context(|| format!("Failed to load conversation {}", id))?;

    println!("# {}", conversation.title);
    if let Some(template) = &conversation.template_name {
        println!("Template: {}", template);
    }
    if let Some(system_text) = &conversation.system_text {
        println!("Preamble: {}", system_text);
    }
    for turn in &conversation.turns {
        let speaker = match turn.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        println!("\n[{}] {}\n{}", turn.timestamp, speaker, turn.text);
    }
    Ok(())
}

pub async fn create(services: &Services, template: Option<&str>) -> Result<()> {
    let template = match template {
        Some(name) => Some(
            services
                .templates
                .find_by_name(name)
                .await?
                .with_context(|| format!("No prompt template named '{}'", name))?,
        ),
        None => None,
    };

    let conversation = services
        .session_store
        .create_conversation(template.as_ref())
        .await?;
    println!("✓ Created conversation {}", conversation.id);
    Ok(())
}

pub async fn select(services: &Services, id: &str) -> Result<()> {
    let conversation = services.session_store.select_conversation(id).await?;
    println!("✓ Current conversation: {}", conversation.title);
    Ok(())
}

pub async fn rename(services: &Services, id: &str, title: Option<String>) -> Result<()> {
    let conversation = services
        .session_store
        .rename_conversation(id, title)
        .await?;
    println!("✓ Title is now \"{}\"", conversation.title);
    Ok(())
}

pub async fn delete(services: &Services, id: &str) -> Result<()> {
    services.session_store.delete_conversation(id).await?;
    println!("✓ Deleted conversation {}", id);
    Ok(())
}
