// Model file store
//
// Uploaded model weights live flat in the models dir, each with a
// `<file>.meta.json` sidecar. Files are opaque: only size and SHA-256 are
// recorded. The active model is kept in the settings file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, StorageError};
use crate::paths::validate_name;
use crate::settings::SettingsStore;
use webforge_core::human_readable_size;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pt", "onnx", "gguf", "safetensors"];
const SIDECAR_SUFFIX: &str = ".meta.json";

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Human readable size, e.g. "1.5 GB"
    pub size: String,
    pub size_bytes: u64,
    /// SHA-256, hex encoded
    pub hash: String,
    /// Extension without the dot
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub active: bool,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub first: ModelMetadata,
    pub second: ModelMetadata,
    pub size_difference: String,
    pub matching_hash: bool,
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    base_dir: PathBuf,
    settings: SettingsStore,
}

impl ModelStore {
    pub fn new(base_dir: impl Into<PathBuf>, settings: SettingsStore) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, settings })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn sidecar_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(format!("{filename}{SIDECAR_SUFFIX}"))
    }

    fn existing_model(&self, filename: &str) -> Result<PathBuf> {
        let path = self.base_dir.join(validate_name(filename)?);
        if !path.is_file() {
            return Err(StorageError::not_found(format!("Model '{filename}' not found.")));
        }
        Ok(path)
    }

    /// Store an uploaded model, record its metadata and activate it if nothing is active
    pub fn save_model(&self, filename: &str, data: &[u8]) -> Result<ModelMetadata> {
        let filename = validate_name(filename)?;
        let kind = supported_extension(filename).ok_or_else(|| {
            StorageError::UnsupportedFormat(format!(
                "'{filename}' must be one of: .{}",
                SUPPORTED_EXTENSIONS.join(", .")
            ))
        })?;

        let path = self.base_dir.join(filename);
        fs::write(&path, data)?;

        let mut metadata = ModelMetadata {
            name: filename.to_string(),
            size: human_readable_size(data.len() as u64),
            size_bytes: data.len() as u64,
            hash: hex::encode(Sha256::digest(data)),
            kind,
            path: path.display().to_string(),
            uploaded_at: Utc::now(),
            active: false,
        };
        fs::write(
            self.sidecar_path(filename),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        let active = self.settings.activate_if_unset(filename)?;
        metadata.active = active.as_deref() == Some(filename);

        info!(model = %filename, size = %metadata.size, "Model stored");
        Ok(metadata)
    }

    /// Metadata for every stored model, sorted by file name
    pub fn list_models(&self) -> Result<Vec<ModelMetadata>> {
        let active = self.settings.active_model()?;
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        entries.sort();

        let mut models = Vec::new();
        for path in entries {
            let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if supported_extension(&filename).is_none() {
                continue;
            }
            let mut metadata = match self.read_sidecar(&filename) {
                Some(metadata) => metadata,
                None => self.describe(&path, &filename)?,
            };
            metadata.active = active.as_deref() == Some(filename.as_str());
            models.push(metadata);
        }
        Ok(models)
    }

    pub fn select_model(&self, filename: &str) -> Result<String> {
        self.existing_model(filename)?;
        self.settings.set_active_model(Some(filename.to_string()))?;
        info!(model = %filename, "Active model selected");
        Ok(filename.to_string())
    }

    pub fn delete_model(&self, filename: &str) -> Result<()> {
        let path = self.existing_model(filename)?;
        fs::remove_file(path)?;
        let sidecar = self.sidecar_path(filename);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        self.settings.clear_if_active(filename)?;
        info!(model = %filename, "Model deleted");
        Ok(())
    }

    pub fn compare_models(&self, first: &str, second: &str) -> Result<ModelComparison> {
        let (first_path, second_path) = self.both_models(first, second, "comparison")?;
        let first = self.describe(&first_path, first)?;
        let second = self.describe(&second_path, second)?;

        Ok(ModelComparison {
            size_difference: human_readable_size(first.size_bytes.abs_diff(second.size_bytes)),
            matching_hash: first.hash == second.hash,
            first,
            second,
        })
    }

    /// Placeholder merge: copies the first model as `merged_<a>_<b>.<ext>`
    pub fn optimize_model(&self, first: &str, second: &str) -> Result<String> {
        let (first_path, second_path) = self.both_models(first, second, "optimisation")?;
        let stem = |path: &Path| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let extension = first_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let merged = format!("merged_{}_{}{}", stem(&first_path), stem(&second_path), extension);
        fs::copy(&first_path, self.base_dir.join(&merged))?;
        info!(model = %merged, "Merged model written");
        Ok(merged)
    }

    fn both_models(&self, first: &str, second: &str, action: &str) -> Result<(PathBuf, PathBuf)> {
        match (self.existing_model(first), self.existing_model(second)) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            (Err(StorageError::InvalidPath(msg)), _) | (_, Err(StorageError::InvalidPath(msg))) => {
                Err(StorageError::InvalidPath(msg))
            }
            _ => Err(StorageError::not_found(format!(
                "Both models must exist to run a {action}."
            ))),
        }
    }

    fn read_sidecar(&self, filename: &str) -> Option<ModelMetadata> {
        let raw = fs::read_to_string(self.sidecar_path(filename)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(model = %filename, error = %e, "Ignoring unreadable model sidecar");
                None
            }
        }
    }

    /// Metadata computed from the file itself
    fn describe(&self, path: &Path, filename: &str) -> Result<ModelMetadata> {
        let size_bytes = fs::metadata(path)?.len();
        Ok(ModelMetadata {
            name: filename.to_string(),
            size: human_readable_size(size_bytes),
            size_bytes,
            hash: hash_file(path)?,
            kind: supported_extension(filename).unwrap_or_default(),
            path: path.display().to_string(),
            uploaded_at: Utc::now(),
            active: false,
        })
    }
}

/// Lowercased extension if it is a supported model format
fn supported_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()?
        .to_string_lossy()
        .to_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
