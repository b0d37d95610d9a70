//! Versioned TOML records.
//!
//! Files carry a top-level `version` key. Loading hands the raw table to a
//! `version_migrate::Migrator`, which walks the registered migration path up
//! to the latest DTO and converts it into the domain type. Saving goes the
//! other way through the latest DTO, so the version written is always the
//! newest one the build knows.

use super::AtomicTomlFile;
use hearth_core::error::{HearthError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use version_migrate::{MigrationError, Migrator};

/// Builds the migrator for one entity.
pub type MigratorFactory = fn() -> std::result::Result<Migrator, MigrationError>;

/// A TOML file holding one domain value `D` behind a migration path.
pub struct VersionedTomlFile<D> {
    file: AtomicTomlFile<toml::Value>,
    entity: &'static str,
    migrator: MigratorFactory,
    _phantom: PhantomData<D>,
}

impl<D> VersionedTomlFile<D>
where
    D: Serialize + DeserializeOwned,
{
    /// # Arguments
    ///
    /// * `entity` - Name the migration path was registered under
    /// * `migrator` - Factory for the migrator holding that path
    pub fn new(path: impl Into<PathBuf>, entity: &'static str, migrator: MigratorFactory) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
            entity,
            migrator,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the file and migrates it to the domain type.
    ///
    /// Returns `Ok(None)` when the file is absent or blank.
    pub fn load(&self) -> Result<Option<D>> {
        let Some(value) = self.file.load()? else {
            return Ok(None);
        };
        let migrator = (self.migrator)()?;
        let domain = migrator
            .load_flat_from(self.entity, value)
            .map_err(|e| self.with_path(e.into()))?;
        Ok(Some(domain))
    }

    /// Writes `domain` as the latest record version.
    pub fn save(&self, domain: &D) -> Result<()> {
        let migrator = (self.migrator)()?;
        let json = migrator.save_domain_flat(self.entity, domain)?;
        let json_value: serde_json::Value = serde_json::from_str(&json)?;
        self.file.save(&json_to_toml(&json_value)?)?;
        Ok(())
    }

    /// Read-modify-write under the file lock. An absent file starts from
    /// `D::default()`.
    pub fn update<R, F>(&self, f: F) -> Result<R>
    where
        D: Default,
        F: FnOnce(&mut D) -> R,
    {
        let _lock = self.file.lock()?;
        let mut domain = self.load()?.unwrap_or_default();
        let result = f(&mut domain);
        self.save(&domain)?;
        Ok(result)
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        self.file.remove()?;
        Ok(())
    }

    fn with_path(&self, err: HearthError) -> HearthError {
        let path = self.path().display();
        match err {
            HearthError::Serialization { format, message } => HearthError::Serialization {
                format,
                message: format!("{path}: {message}"),
            },
            HearthError::Migration(message) => HearthError::Migration(format!("{path}: {message}")),
            other => other,
        }
    }
}

/// Converts the migrator's JSON output to a TOML value.
///
/// TOML has no null, so null object members are dropped; a null inside an
/// array is rejected.
fn json_to_toml(json: &serde_json::Value) -> Result<toml::Value> {
    let unsupported = |what: String| HearthError::Serialization {
        format: "TOML".to_string(),
        message: what,
    };

    match json {
        serde_json::Value::Null => Err(unsupported("null has no TOML representation".to_string())),
        serde_json::Value::Bool(b) => Ok(toml::Value::Boolean(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float))
            .ok_or_else(|| unsupported(format!("Unsupported JSON number: {n}"))),
        serde_json::Value::String(s) => Ok(toml::Value::String(s.clone())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_to_toml)
            .collect::<Result<Vec<_>>>()
            .map(toml::Value::Array),
        serde_json::Value::Object(members) => {
            let mut table = toml::map::Map::new();
            for (key, value) in members {
                if value.is_null() {
                    continue;
                }
                table.insert(key.clone(), json_to_toml(value)?);
            }
            Ok(toml::Value::Table(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;
    use version_migrate::{FromDomain, IntoDomain, MigratesTo, Versioned};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
        pinned: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
    #[versioned(version = "1.0.0")]
    struct NoteV1_0_0 {
        text: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
    #[versioned(version = "1.1.0")]
    struct NoteV1_1_0 {
        text: String,
        #[serde(default)]
        pinned: bool,
    }

    impl MigratesTo<NoteV1_1_0> for NoteV1_0_0 {
        fn migrate(self) -> NoteV1_1_0 {
            NoteV1_1_0 {
                text: self.text,
                pinned: false,
            }
        }
    }

    impl IntoDomain<Note> for NoteV1_1_0 {
        fn into_domain(self) -> Note {
            Note {
                text: self.text,
                pinned: self.pinned,
            }
        }
    }

    impl FromDomain<Note> for NoteV1_1_0 {
        fn from_domain(note: Note) -> Self {
            NoteV1_1_0 {
                text: note.text,
                pinned: note.pinned,
            }
        }
    }

    fn note_migrator() -> std::result::Result<Migrator, MigrationError> {
        let mut migrator = Migrator::builder().build();
        let path = Migrator::define("note")
            .from::<NoteV1_0_0>()
            .step::<NoteV1_1_0>()
            .into_with_save::<Note>();
        migrator.register(path)?;
        Ok(migrator)
    }

    fn note_file(dir: &TempDir) -> VersionedTomlFile<Note> {
        VersionedTomlFile::new(dir.path().join("note.toml"), "note", note_migrator)
    }

    #[test]
    fn test_older_version_is_migrated_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = note_file(&temp_dir);
        std::fs::write(file.path(), "version = \"1.0.0\"\ntext = \"hello\"\n").unwrap();

        let note = file.load().unwrap().unwrap();

        assert_eq!(note, Note { text: "hello".to_string(), pinned: false });
    }

    #[test]
    fn test_save_writes_latest_version() {
        let temp_dir = TempDir::new().unwrap();
        let file = note_file(&temp_dir);
        let note = Note { text: "hi".to_string(), pinned: true };

        file.save(&note).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("version = \"1.1.0\""));
        assert_eq!(file.load().unwrap(), Some(note));
    }

    #[test]
    fn test_update_starts_from_default_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let file = note_file(&temp_dir);

        let pinned = file
            .update(|note| {
                note.pinned = true;
                note.pinned
            })
            .unwrap();

        assert!(pinned);
        assert!(file.load().unwrap().unwrap().pinned);
        assert!(!temp_dir.path().join("note.lock").exists());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = note_file(&temp_dir);
        std::fs::write(file.path(), "version = \"9.0.0\"\ntext = \"x\"\n").unwrap();

        let err = file.load().unwrap_err();

        assert!(err.is_migration() || err.is_serialization());
    }

    #[test]
    fn test_json_nulls_are_dropped_from_tables() {
        let value = json!({"version": "1.0.0", "title": null, "turn": [{"text": "a"}]});

        let toml_value = json_to_toml(&value).unwrap();

        let table = toml_value.as_table().unwrap();
        assert!(!table.contains_key("title"));
        assert_eq!(table["turn"].as_array().unwrap().len(), 1);
        assert!(json_to_toml(&json!([null])).is_err());
    }
}
