// In-memory implementations for testing
//
// These keep everything in process memory so workflow and API tests can run
// without touching the filesystem or a remote model.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BuildError, Result};
use crate::traits::{GeneratedProject, ProjectGenerator, ProjectWriter, TextGenerator};

// ============================================================================
// InMemoryProjectWriter
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryProject {
    pub summary: String,
    pub prompt: String,
    pub stack: String,
    /// Files in write order
    pub files: Vec<(String, String)>,
    pub history: Vec<serde_json::Value>,
}

/// Project writer that records everything in a map keyed by project name
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectWriter {
    projects: Arc<Mutex<BTreeMap<String, InMemoryProject>>>,
    fail_on_path: Option<String>,
}

impl InMemoryProjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any write to `path`
    pub fn failing_on(path: impl Into<String>) -> Self {
        Self {
            fail_on_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Pre-create a project name so initialization must pick another
    pub fn reserve(&self, name: &str) {
        self.projects
            .lock()
            .insert(name.to_string(), InMemoryProject::default());
    }

    pub fn project(&self, name: &str) -> Option<InMemoryProject> {
        self.projects.lock().get(name).cloned()
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl ProjectWriter for InMemoryProjectWriter {
    async fn initialize_project(
        &self,
        desired_name: &str,
        summary: &str,
        prompt: &str,
        stack: &str,
    ) -> Result<String> {
        let mut projects = self.projects.lock();
        let mut name = desired_name.to_string();
        let mut counter = 1;
        while projects.contains_key(&name) {
            counter += 1;
            name = format!("{desired_name}-{counter}");
        }
        projects.insert(
            name.clone(),
            InMemoryProject {
                summary: summary.to_string(),
                prompt: prompt.to_string(),
                stack: stack.to_string(),
                ..InMemoryProject::default()
            },
        );
        Ok(name)
    }

    async fn write_file(&self, project: &str, path: &str, content: &str) -> Result<()> {
        if self.fail_on_path.as_deref() == Some(path) {
            return Err(BuildError::store(format!("disk full while writing {path}")));
        }
        let mut projects = self.projects.lock();
        let entry = projects
            .get_mut(project)
            .ok_or_else(|| BuildError::store(format!("Project '{project}' not found")))?;
        entry.files.push((path.to_string(), content.to_string()));
        Ok(())
    }

    async fn append_history(&self, project: &str, entry: serde_json::Value) -> Result<()> {
        let mut projects = self.projects.lock();
        let target = projects
            .get_mut(project)
            .ok_or_else(|| BuildError::store(format!("Project '{project}' not found")))?;
        target.history.push(entry);
        Ok(())
    }
}

// ============================================================================
// StaticProjectGenerator / FailingProjectGenerator
// ============================================================================

/// Returns the same project for every prompt, optionally after a delay
#[derive(Debug, Clone)]
pub struct StaticProjectGenerator {
    project: GeneratedProject,
    delay: Option<Duration>,
}

impl StaticProjectGenerator {
    pub fn new(project: GeneratedProject) -> Self {
        Self {
            project,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ProjectGenerator for StaticProjectGenerator {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _prompt: &str) -> Result<GeneratedProject> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.project.clone())
    }
}

/// Always fails with the given message
#[derive(Debug, Clone)]
pub struct FailingProjectGenerator {
    message: String,
}

impl FailingProjectGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ProjectGenerator for FailingProjectGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<GeneratedProject> {
        Err(BuildError::generation(self.message.clone()))
    }
}

// ============================================================================
// ScriptedTextGenerator
// ============================================================================

/// Text generator with canned replies keyed by exact prompt
#[derive(Debug, Clone, Default)]
pub struct ScriptedTextGenerator {
    replies: HashMap<String, String>,
    default_reply: Option<String>,
}

impl ScriptedTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(prompt.into(), reply.into());
        self
    }

    /// Reply used for any prompt without a scripted answer
    pub fn otherwise(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.replies
            .get(prompt)
            .or(self.default_reply.as_ref())
            .cloned()
            .ok_or_else(|| BuildError::generation(format!("no scripted reply for '{prompt}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_writer_picks_unique_names() {
        let writer = InMemoryProjectWriter::new();
        writer.reserve("site");

        let first = writer.initialize_project("site", "", "", "").await.unwrap();
        let second = writer.initialize_project("site", "", "", "").await.unwrap();
        assert_eq!(first, "site-2");
        assert_eq!(second, "site-3");
    }

    #[tokio::test]
    async fn test_in_memory_writer_rejects_unknown_project() {
        let writer = InMemoryProjectWriter::new();
        let err = writer.write_file("nope", "a.txt", "").await.unwrap_err();
        assert!(matches!(err, BuildError::Store(_)));
    }

    #[tokio::test]
    async fn test_scripted_text_generator() {
        let generator = ScriptedTextGenerator::new().reply("hi", "hello");
        assert_eq!(generator.complete("hi").await.unwrap(), "hello");
        assert!(generator.complete("other").await.is_err());

        let generator = generator.otherwise("fallback");
        assert_eq!(generator.complete("other").await.unwrap(), "fallback");
    }
}
