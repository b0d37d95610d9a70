//! Low-level file storage primitives.

pub mod atomic_toml;
pub mod versioned_toml;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile, FileLock};
pub use versioned_toml::{MigratorFactory, VersionedTomlFile};
