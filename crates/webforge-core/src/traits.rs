// Core traits for pluggable backends
//
// These traits keep the build workflow independent of where text comes from
// and where files end up:
// - Remote LLM or deterministic scaffold for generation
// - Filesystem project store for production
// - In-memory implementations for testing

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Generated output
// ============================================================================

/// A single file produced by a generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the project root
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Files for one project, in write order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProject {
    pub files: Vec<GeneratedFile>,
    /// Short stack label recorded in the manifest (e.g. "scaffold", "generated")
    pub stack: String,
}

impl GeneratedProject {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            stack: stack.into(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(GeneratedFile::new(path, content));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

// ============================================================================
// ProjectGenerator - Turns a prompt into project files
// ============================================================================

/// Capability interface for project generation backends
///
/// Implementations:
/// - Ask a text model for a JSON file map
/// - Render a deterministic scaffold
/// - Chain a primary with a fallback
#[async_trait]
pub trait ProjectGenerator: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Produce the files for a prompt
    async fn generate(&self, prompt: &str) -> Result<GeneratedProject>;
}

// ============================================================================
// TextGenerator - Turns a prompt into text
// ============================================================================

/// Stream of text chunks
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for text completion backends used by chat and LLM project generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Complete a prompt in one response
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt as a stream of chunks
    ///
    /// Default implementation yields the whole completion as one chunk.
    async fn complete_stream(&self, prompt: &str) -> Result<TextStream> {
        let text = self.complete(prompt).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }
}

// ============================================================================
// ProjectWriter - Where generated files land
// ============================================================================

/// Trait for the project store as seen by the build workflow
#[async_trait]
pub trait ProjectWriter: Send + Sync {
    /// Create an empty project with a manifest.
    ///
    /// `desired_name` is suffixed (`-2`, `-3`, ...) until it is free.
    /// Returns the name actually used.
    async fn initialize_project(
        &self,
        desired_name: &str,
        summary: &str,
        prompt: &str,
        stack: &str,
    ) -> Result<String>;

    /// Write one file into an existing project
    async fn write_file(&self, project: &str, path: &str, content: &str) -> Result<()>;

    /// Append an entry to the project's manifest history
    async fn append_history(&self, project: &str, entry: serde_json::Value) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_chunk() {
        let chunks: Vec<String> = Echo
            .complete_stream("hi")
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["echo: hi".to_string()]);
    }

    #[test]
    fn test_generated_project_builder() {
        let project = GeneratedProject::new("scaffold")
            .with_file("a.txt", "a")
            .with_file("b/c.txt", "c");
        assert_eq!(project.len(), 2);
        assert_eq!(project.paths(), vec!["a.txt", "b/c.txt"]);
        assert!(!project.is_empty());
    }
}
