// Configuration loading and persisted state

pub mod settings;
pub mod storage;

pub use settings::Settings;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError, STORAGE_KEY};

/// Directory name used under the platform config/data/cache dirs
pub const APP_DIR: &str = "canvas-studio";
