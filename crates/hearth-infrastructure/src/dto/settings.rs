//! `settings.toml` DTOs

use hearth_core::settings::UserSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

pub const SETTINGS_ENTITY: &str = "settings";

/// Choices the user makes at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SettingsV1_0_0 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_preamble: Option<String>,
}

impl IntoDomain<UserSettings> for SettingsV1_0_0 {
    fn into_domain(self) -> UserSettings {
        UserSettings {
            custom_model_path: self.custom_model_path,
            system_preamble: self.system_preamble,
        }
    }
}

impl FromDomain<UserSettings> for SettingsV1_0_0 {
    fn from_domain(settings: UserSettings) -> Self {
        Self {
            custom_model_path: settings.custom_model_path,
            system_preamble: settings.system_preamble,
        }
    }
}

pub fn create_settings_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();
    let path = Migrator::define(SETTINGS_ENTITY)
        .from::<SettingsV1_0_0>()
        .into_with_save::<UserSettings>();
    migrator.register(path)?;
    Ok(migrator)
}
