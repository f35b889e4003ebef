// Filesystem project store
//
// One directory per project under the base dir, each with a manifest.json
// describing it (summary, prompt, stack, timestamps, bounded history).
// All methods are synchronous; async callers go through `blocking` or the
// ProjectWriter impl, which does that for them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{blocking, Result, StorageError};
use crate::paths::{to_slash, validate_name, validate_relative_path};
use webforge_core::ProjectWriter;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MAX_HISTORY: usize = 200;

const PREVIEW_CANDIDATES: [&str; 3] = [
    "index.html",
    "public/index.html",
    "app/templates/index.html",
];

// ============================================
// Manifest types
// ============================================

/// Contents of a project's manifest.json
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectManifest {
    pub name: String,
    pub summary: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stack: String,
    pub history: Vec<Value>,
}

impl Default for ProjectManifest {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            name: String::new(),
            summary: String::new(),
            prompt: String::new(),
            created_at: now,
            updated_at: now,
            stack: "unknown".to_string(),
            history: Vec::new(),
        }
    }
}

impl ProjectManifest {
    pub fn new(name: &str, summary: &str, prompt: &str, stack: &str) -> Self {
        Self {
            name: name.to_string(),
            summary: summary.to_string(),
            prompt: prompt.to_string(),
            stack: if stack.is_empty() {
                "unknown".to_string()
            } else {
                stack.to_string()
            },
            ..Self::default()
        }
    }
}

/// Partial manifest update; `None` leaves a field unchanged
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestUpdate {
    pub summary: Option<String>,
    pub prompt: Option<String>,
    pub stack: Option<String>,
}

/// Listing entry for a project
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub summary: String,
    pub stack: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One matching line from a project-wide search
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepMatch {
    pub path: String,
    pub line_number: usize,
    pub line: String,
}

/// Directory (relative, "." for the root) -> file name -> relative file path
pub type ProjectTree = BTreeMap<String, BTreeMap<String, String>>;

// ============================================
// ProjectStore
// ============================================

#[derive(Debug, Clone)]
pub struct ProjectStore {
    base_dir: PathBuf,
}

impl ProjectStore {
    /// Open (and create if needed) the projects directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn project_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(validate_name(name)?))
    }

    /// Project directory, or NotFound
    fn existing_project(&self, name: &str) -> Result<PathBuf> {
        let dir = self.project_path(name)?;
        if !dir.is_dir() {
            return Err(StorageError::not_found(format!("Project '{name}' not found.")));
        }
        Ok(dir)
    }

    fn manifest_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.project_path(name)?.join(MANIFEST_FILE))
    }

    fn write_manifest(&self, name: &str, manifest: &ProjectManifest) -> Result<()> {
        let path = self.manifest_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(manifest)?)?;
        Ok(())
    }

    /// Manifest of an existing project; `None` when the file is missing or unreadable
    pub fn load_manifest(&self, name: &str) -> Result<Option<ProjectManifest>> {
        let dir = self.existing_project(name)?;
        Ok(read_manifest(&dir.join(MANIFEST_FILE)))
    }

    fn manifest_or_default(&self, name: &str) -> Result<ProjectManifest> {
        Ok(self.load_manifest(name)?.unwrap_or_else(|| ProjectManifest {
            name: name.to_string(),
            ..ProjectManifest::default()
        }))
    }

    /// All projects, sorted by name
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let manifest = read_manifest(&entry.path().join(MANIFEST_FILE));
            projects.push(ProjectSummary {
                name,
                summary: manifest
                    .as_ref()
                    .map(|m| m.summary.clone())
                    .unwrap_or_default(),
                stack: manifest.as_ref().map(|m| m.stack.clone()),
                created_at: manifest.as_ref().map(|m| m.created_at),
                updated_at: manifest.as_ref().map(|m| m.updated_at),
            });
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    /// Create a project populated with files. Conflict if the name is taken.
    pub fn create_project(
        &self,
        name: &str,
        files: &BTreeMap<String, String>,
        summary: &str,
    ) -> Result<PathBuf> {
        // Validate every path before touching the disk
        let validated = files
            .iter()
            .map(|(path, content)| -> Result<(PathBuf, &String)> {
                Ok((validate_relative_path(path)?, content))
            })
            .collect::<Result<Vec<_>>>()?;

        let dir = self.project_path(name)?;
        create_dir_exclusive(&dir, name)?;

        for (relative, content) in validated {
            write_file_at(&dir.join(relative), content)?;
        }
        self.write_manifest(name, &ProjectManifest::new(name, summary, "", "generated"))?;

        info!(project = %name, files = files.len(), "Project created");
        Ok(dir)
    }

    /// Create an empty project with a manifest, ready for streamed writes
    pub fn initialize_project(
        &self,
        name: &str,
        summary: &str,
        prompt: &str,
        stack: &str,
    ) -> Result<ProjectManifest> {
        let dir = self.project_path(name)?;
        create_dir_exclusive(&dir, name)?;
        let manifest = ProjectManifest::new(name, summary, prompt, stack);
        self.write_manifest(name, &manifest)?;
        Ok(manifest)
    }

    /// Initialize under `desired` or the first free `desired-N`. Returns the name used.
    pub fn initialize_unique(
        &self,
        desired: &str,
        summary: &str,
        prompt: &str,
        stack: &str,
    ) -> Result<String> {
        let base = if desired.trim().is_empty() {
            "project"
        } else {
            desired
        };
        let mut candidate = base.to_string();
        let mut counter = 1;
        loop {
            match self.initialize_project(&candidate, summary, prompt, stack) {
                Ok(_) => return Ok(candidate),
                Err(StorageError::Conflict(_)) => {
                    counter += 1;
                    candidate = format!("{base}-{counter}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// First free name among `desired`, `desired-2`, `desired-3`, ...
    pub fn ensure_unique_name(&self, desired: &str) -> Result<String> {
        let base = if desired.trim().is_empty() {
            "project"
        } else {
            desired
        };
        let mut candidate = base.to_string();
        let mut counter = 1;
        while self.project_path(&candidate)?.exists() {
            counter += 1;
            candidate = format!("{base}-{counter}");
        }
        Ok(candidate)
    }

    pub fn delete_project(&self, name: &str) -> Result<()> {
        let dir = self.existing_project(name)?;
        fs::remove_dir_all(dir)?;
        info!(project = %name, "Project deleted");
        Ok(())
    }

    /// Relative paths of every file in the project, sorted
    pub fn list_project_files(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.existing_project(name)?;
        walk_files(&dir)
    }

    /// Every file's content keyed by relative path
    pub fn get_project_files(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let dir = self.existing_project(name)?;
        walk_files(&dir)?
            .into_iter()
            .map(|relative| -> Result<(String, String)> {
                let content = read_lossy(&dir.join(&relative))?;
                Ok((relative, content))
            })
            .collect()
    }

    pub fn read_file(&self, name: &str, relative_path: &str) -> Result<String> {
        let dir = self.existing_project(name)?;
        let path = dir.join(validate_relative_path(relative_path)?);
        if !path.is_file() {
            return Err(StorageError::not_found(format!(
                "File '{relative_path}' not found in project '{name}'."
            )));
        }
        read_lossy(&path)
    }

    /// Write a file inside an existing project and touch the manifest
    pub fn save_file(&self, name: &str, relative_path: &str, content: &str) -> Result<PathBuf> {
        let dir = self.existing_project(name)?;
        let path = dir.join(validate_relative_path(relative_path)?);
        write_file_at(&path, content)?;
        self.update_manifest(name, ManifestUpdate::default())?;
        debug!(project = %name, path = %relative_path, "File saved");
        Ok(path)
    }

    /// Apply a partial update and bump `updated_at`
    pub fn update_manifest(&self, name: &str, update: ManifestUpdate) -> Result<ProjectManifest> {
        let mut manifest = self.manifest_or_default(name)?;
        if let Some(summary) = update.summary {
            manifest.summary = summary;
        }
        if let Some(prompt) = update.prompt {
            manifest.prompt = prompt;
        }
        if let Some(stack) = update.stack {
            manifest.stack = stack;
        }
        manifest.updated_at = Utc::now();
        self.write_manifest(name, &manifest)?;
        Ok(manifest)
    }

    /// Append an entry to the manifest history, keeping the newest MAX_HISTORY
    pub fn append_history(&self, name: &str, mut entry: Value) -> Result<()> {
        let mut manifest = self.manifest_or_default(name)?;
        let now = Utc::now();
        if let Value::Object(fields) = &mut entry {
            fields
                .entry("timestamp")
                .or_insert_with(|| Value::String(now.to_rfc3339()));
        }
        manifest.history.push(entry);
        if manifest.history.len() > MAX_HISTORY {
            let excess = manifest.history.len() - MAX_HISTORY;
            manifest.history.drain(..excess);
        }
        manifest.updated_at = now;
        self.write_manifest(name, &manifest)
    }

    /// Deflated zip of the whole project plus the suggested download name
    pub fn zip_project(&self, name: &str) -> Result<(Vec<u8>, String)> {
        let dir = self.existing_project(name)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        for relative in walk_files(&dir)? {
            zip.start_file(relative.as_str(), options)?;
            zip.write_all(&fs::read(dir.join(&relative))?)?;
        }

        let bytes = zip.finish()?.into_inner();
        Ok((bytes, format!("{name}.zip")))
    }

    /// Directory -> files map for tree views
    pub fn describe_project_tree(&self, name: &str) -> Result<ProjectTree> {
        let dir = self.existing_project(name)?;
        let mut tree = ProjectTree::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry?;
            let relative = entry.path().strip_prefix(&dir).unwrap_or(entry.path());
            if entry.file_type().is_dir() {
                tree.entry(dir_key(relative)).or_default();
            } else if entry.file_type().is_file() {
                let parent = relative.parent().unwrap_or(Path::new(""));
                tree.entry(dir_key(parent)).or_default().insert(
                    entry.file_name().to_string_lossy().into_owned(),
                    to_slash(relative),
                );
            }
        }
        Ok(tree)
    }

    /// HTML of the first previewable page in the project
    pub fn preview_html(&self, name: &str) -> Result<String> {
        let dir = self.existing_project(name)?;
        PREVIEW_CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.is_file())
            .map(|path| read_lossy(&path))
            .unwrap_or_else(|| {
                Err(StorageError::not_found(
                    "No previewable HTML file found in project.",
                ))
            })
    }

    /// Lines matching `pattern` across the project's text files
    pub fn grep_project(&self, name: &str, pattern: &str) -> Result<Vec<GrepMatch>> {
        let regex = Regex::new(pattern)?;
        let dir = self.existing_project(name)?;

        let mut results = Vec::new();
        for relative in walk_files(&dir)? {
            // Binary files are skipped
            let Ok(text) = String::from_utf8(fs::read(dir.join(&relative))?) else {
                continue;
            };
            for (i, line) in text.lines().enumerate() {
                if regex.is_match(line) {
                    results.push(GrepMatch {
                        path: relative.clone(),
                        line_number: i + 1,
                        line: line.to_string(),
                    });
                }
            }
        }
        Ok(results)
    }
}

// ============================================
// ProjectWriter for the build workflow
// ============================================

#[async_trait]
impl ProjectWriter for ProjectStore {
    async fn initialize_project(
        &self,
        desired_name: &str,
        summary: &str,
        prompt: &str,
        stack: &str,
    ) -> webforge_core::Result<String> {
        let store = self.clone();
        let (desired, summary, prompt, stack) = (
            desired_name.to_string(),
            summary.to_string(),
            prompt.to_string(),
            stack.to_string(),
        );
        Ok(blocking(move || store.initialize_unique(&desired, &summary, &prompt, &stack)).await?)
    }

    async fn write_file(&self, project: &str, path: &str, content: &str) -> webforge_core::Result<()> {
        let store = self.clone();
        let (project, path, content) = (project.to_string(), path.to_string(), content.to_string());
        blocking(move || {
            let dir = store.existing_project(&project)?;
            write_file_at(&dir.join(validate_relative_path(&path)?), &content)
        })
        .await?;
        Ok(())
    }

    async fn append_history(&self, project: &str, entry: Value) -> webforge_core::Result<()> {
        let store = self.clone();
        let project = project.to_string();
        Ok(blocking(move || store.append_history(&project, entry)).await?)
    }
}

// ============================================
// Helpers
// ============================================

fn create_dir_exclusive(dir: &Path, name: &str) -> Result<()> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::conflict(format!(
            "Project '{name}' already exists."
        ))),
        Err(e) => Err(e.into()),
    }
}

fn write_file_at(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_manifest(path: &Path) -> Option<ProjectManifest> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable manifest");
            None
        }
    }
}

fn walk_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            files.push(to_slash(relative));
        }
    }
    Ok(files)
}

fn dir_key(relative: &Path) -> String {
    let key = to_slash(relative);
    if key.is_empty() {
        ".".to_string()
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::new(dir.path().join("projects")).unwrap();
        (dir, store)
    }

    fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn test_create_and_read_project() {
        let (_dir, store) = store();
        store
            .create_project(
                "demo",
                &files(&[("index.html", "<h1>hi</h1>"), ("static/app.js", "1;")]),
                "A demo",
            )
            .unwrap();

        assert_eq!(
            store.list_project_files("demo").unwrap(),
            vec!["index.html", "manifest.json", "static/app.js"]
        );
        assert_eq!(store.read_file("demo", "index.html").unwrap(), "<h1>hi</h1>");

        let manifest = store.load_manifest("demo").unwrap().unwrap();
        assert_eq!(manifest.summary, "A demo");
        assert_eq!(manifest.stack, "generated");
    }

    #[test]
    fn test_create_conflict() {
        let (_dir, store) = store();
        store.create_project("demo", &BTreeMap::new(), "").unwrap();
        let err = store.create_project("demo", &BTreeMap::new(), "").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_create_rejects_escaping_paths_before_writing() {
        let (_dir, store) = store();
        let err = store
            .create_project("demo", &files(&[("../evil.txt", "x")]), "")
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_unique_suffixes() {
        let (_dir, store) = store();
        assert_eq!(store.initialize_unique("site", "", "p", "scaffold").unwrap(), "site");
        assert_eq!(store.initialize_unique("site", "", "p", "scaffold").unwrap(), "site-2");
        assert_eq!(store.ensure_unique_name("site").unwrap(), "site-3");

        let manifest = store.load_manifest("site-2").unwrap().unwrap();
        assert_eq!(manifest.prompt, "p");
        assert_eq!(manifest.stack, "scaffold");
    }

    #[test]
    fn test_missing_project_is_not_found() {
        let (_dir, store) = store();
        assert!(store.delete_project("nope").unwrap_err().is_not_found());
        assert!(store.list_project_files("nope").unwrap_err().is_not_found());
        assert!(store.save_file("nope", "a.txt", "x").unwrap_err().is_not_found());
        assert!(store.zip_project("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (_dir, store) = store();
        store.create_project("demo", &BTreeMap::new(), "").unwrap();
        assert!(store.read_file("demo", "nope.txt").unwrap_err().is_not_found());
        assert!(matches!(
            store.read_file("demo", "../../etc/passwd").unwrap_err(),
            StorageError::InvalidPath(_)
        ));
    }

    #[test]
    fn test_save_file_touches_manifest() {
        let (_dir, store) = store();
        store.create_project("demo", &BTreeMap::new(), "").unwrap();
        let before = store.load_manifest("demo").unwrap().unwrap().updated_at;

        store.save_file("demo", "nested/dir/a.txt", "hello").unwrap();

        assert_eq!(store.read_file("demo", "nested/dir/a.txt").unwrap(), "hello");
        let after = store.load_manifest("demo").unwrap().unwrap().updated_at;
        assert!(after >= before);
    }

    #[test]
    fn test_append_history_is_bounded() {
        let (_dir, store) = store();
        store.initialize_project("demo", "", "", "").unwrap();
        for i in 0..(MAX_HISTORY + 5) {
            store.append_history("demo", json!({"type": "build", "n": i})).unwrap();
        }

        let manifest = store.load_manifest("demo").unwrap().unwrap();
        assert_eq!(manifest.history.len(), MAX_HISTORY);
        assert_eq!(manifest.history[0]["n"], 5);
        assert!(manifest.history[0]["timestamp"].is_string());
    }

    #[test]
    fn test_update_manifest_partial() {
        let (_dir, store) = store();
        store.initialize_project("demo", "old", "p", "scaffold").unwrap();
        let manifest = store
            .update_manifest(
                "demo",
                ManifestUpdate {
                    summary: Some("new".to_string()),
                    ..ManifestUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(manifest.summary, "new");
        assert_eq!(manifest.prompt, "p");
    }

    #[test]
    fn test_list_projects_sorted_with_manifest_fields() {
        let (_dir, store) = store();
        store.initialize_project("beta", "B", "", "scaffold").unwrap();
        store.initialize_project("alpha", "A", "", "").unwrap();
        fs::create_dir(store.base_dir().join("bare")).unwrap();

        let projects = store.list_projects().unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bare", "beta"]);
        assert_eq!(projects[0].summary, "A");
        assert_eq!(projects[0].stack.as_deref(), Some("unknown"));
        assert_eq!(projects[1].stack, None);
        assert_eq!(projects[2].stack.as_deref(), Some("scaffold"));
    }

    #[test]
    fn test_zip_project_contains_files() {
        let (_dir, store) = store();
        store
            .create_project("demo", &files(&[("public/index.html", "<p>x</p>")]), "")
            .unwrap();

        let (bytes, filename) = store.zip_project("demo").unwrap();
        assert_eq!(filename, "demo.zip");

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("public/index.html")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<p>x</p>");
        assert!(archive.by_name("manifest.json").is_ok());
    }

    #[test]
    fn test_describe_project_tree() {
        let (_dir, store) = store();
        store
            .create_project(
                "demo",
                &files(&[("README.md", "#"), ("public/static/style.css", "")]),
                "",
            )
            .unwrap();

        let tree = store.describe_project_tree("demo").unwrap();
        assert_eq!(tree["."]["README.md"], "README.md");
        assert_eq!(tree["public/static"]["style.css"], "public/static/style.css");
        assert!(tree["public"].is_empty());
    }

    #[test]
    fn test_preview_html_order() {
        let (_dir, store) = store();
        store
            .create_project(
                "demo",
                &files(&[
                    ("public/index.html", "public"),
                    ("app/templates/index.html", "template"),
                ]),
                "",
            )
            .unwrap();
        assert_eq!(store.preview_html("demo").unwrap(), "public");

        store.create_project("empty", &BTreeMap::new(), "").unwrap();
        assert!(store.preview_html("empty").unwrap_err().is_not_found());
    }

    #[test]
    fn test_grep_project() {
        let (_dir, store) = store();
        store
            .create_project(
                "demo",
                &files(&[("a.txt", "one\ntwo\nthree"), ("b.txt", "nothing")]),
                "",
            )
            .unwrap();

        let matches = store.grep_project("demo", "^t").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].path, "a.txt");
        assert_eq!(matches[0].line_number, 2);

        assert!(matches!(
            store.grep_project("demo", "(").unwrap_err(),
            StorageError::Pattern(_)
        ));
    }

    #[tokio::test]
    async fn test_project_writer_impl() {
        let (_dir, store) = store();
        let writer: &dyn ProjectWriter = &store;

        let name = writer
            .initialize_project("site", "summary", "prompt", "scaffold")
            .await
            .unwrap();
        writer.write_file(&name, "public/index.html", "<h1/>").await.unwrap();
        writer
            .append_history(&name, json!({"type": "build"}))
            .await
            .unwrap();

        assert_eq!(store.read_file("site", "public/index.html").unwrap(), "<h1/>");
        let manifest = store.load_manifest("site").unwrap().unwrap();
        assert_eq!(manifest.history.len(), 1);

        let err = writer.write_file("ghost", "a.txt", "").await.unwrap_err();
        assert!(matches!(err, webforge_core::BuildError::Store(_)));
    }
}
