// Storage layer: filesystem stores and SQLite chat transcripts
//
// This crate provides:
// - ProjectStore: project directories with manifests; implements ProjectWriter
// - ModelStore: uploaded model files with sidecar metadata
// - SettingsStore: config.json holding the active model
// - ChatStore: chat sessions and messages via sqlx (SQLite)

pub mod chat_store;
pub mod error;
pub mod model_store;
pub mod models;
pub mod paths;
pub mod projects;
pub mod settings;

pub use chat_store::{ChatStore, DEFAULT_SESSION_TITLE};
pub use error::{blocking, Result, StorageError};
pub use model_store::{ModelComparison, ModelMetadata, ModelStore, SUPPORTED_EXTENSIONS};
pub use models::*;
pub use paths::{validate_name, validate_relative_path};
pub use projects::{
    GrepMatch, ManifestUpdate, ProjectManifest, ProjectStore, ProjectSummary, ProjectTree,
    MAX_HISTORY,
};
pub use settings::{Settings, SettingsStore};
