// Build workflow
//
// Turns one build session's prompt into a project on disk and narrates every
// step onto the session's event channel:
//
//   generating -> file {project, index, total} x N -> complete
//
// Any failure (generator error, empty output, timeout, store error, panic)
// ends the session with exactly one `error` event. The terminal guard in
// BuildStream drops anything published after it.

use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use webforge_core::{
    slugify, truncate_chars, BuildError, BuildEvent, BuildStream, ProjectGenerator, ProjectWriter,
    Result,
};

use crate::runner::RunnerConfig;

const SUMMARY_PROMPT_CHARS: usize = 140;

/// Result of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub project: String,
    pub files: Vec<String>,
    pub summary: String,
}

/// Manifest summary recorded for a prompt
pub fn build_summary(prompt: &str) -> String {
    format!(
        "Generated from prompt: {}",
        truncate_chars(prompt.trim(), SUMMARY_PROMPT_CHARS)
    )
}

/// Generates and writes one project per build session
pub struct BuildWorkflow {
    stream: Arc<BuildStream>,
    generator: Arc<dyn ProjectGenerator>,
    writer: Arc<dyn ProjectWriter>,
    config: RunnerConfig,
}

impl BuildWorkflow {
    pub fn new(
        stream: Arc<BuildStream>,
        generator: Arc<dyn ProjectGenerator>,
        writer: Arc<dyn ProjectWriter>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            stream,
            generator,
            writer,
            config,
        }
    }

    pub fn stream(&self) -> &Arc<BuildStream> {
        &self.stream
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the workflow to its terminal event.
    ///
    /// Never fails: errors and panics are reported on the session instead.
    pub async fn run(&self, session_id: Uuid) -> Option<BuildOutcome> {
        if self.stream.get_session(session_id).is_none() {
            debug!(session_id = %session_id, "Build session gone before start");
            return None;
        }

        let result = AssertUnwindSafe(self.execute(session_id))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(outcome)) => {
                info!(
                    session_id = %session_id,
                    project = %outcome.project,
                    files = outcome.files.len(),
                    "Build completed"
                );
                return Some(outcome);
            }
            Ok(Err(e)) => e,
            Err(payload) => BuildError::Panicked(panic_message(payload.as_ref())),
        };

        warn!(session_id = %session_id, error = %error, "Build failed");
        self.stream
            .publish(session_id, BuildEvent::error(error.to_string()));
        None
    }

    /// Execute the build steps, returning the first error
    pub async fn execute(&self, session_id: Uuid) -> Result<BuildOutcome> {
        let session = self.stream.get_session(session_id).ok_or_else(|| {
            BuildError::Internal(anyhow::anyhow!("Build session {session_id} not found"))
        })?;
        let prompt = session.prompt().to_string();

        self.stream.publish(
            session_id,
            BuildEvent::status("generating", "Generating project files")
                .with_field("generator", self.generator.name()),
        );

        let timeout = self.config.generation_timeout;
        let project = tokio::time::timeout(timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| BuildError::Timeout(timeout))??;
        if project.is_empty() {
            return Err(BuildError::EmptyOutput);
        }

        let summary = build_summary(&prompt);
        let name = self
            .writer
            .initialize_project(&slugify(&prompt), &summary, &prompt, &project.stack)
            .await?;
        session.set_project_name(name.clone());

        let total = project.len();
        info!(session_id = %session_id, project = %name, total, "Writing project files");

        for (index, file) in project.files.iter().enumerate() {
            self.writer
                .write_file(&name, &file.path, &file.content)
                .await?;

            let content = self
                .config
                .file_event_content
                .then(|| file.content.clone());
            self.stream.publish(
                session_id,
                BuildEvent::file(file.path.clone(), content)
                    .with_field("project", name.clone())
                    .with_field("index", index + 1)
                    .with_field("total", total),
            );

            if index + 1 < total && !self.config.write_delay.is_zero() {
                tokio::time::sleep(self.config.write_delay).await;
            }
        }

        let files = project.paths();
        self.writer
            .append_history(
                &name,
                json!({
                    "type": "build",
                    "session_id": session_id.to_string(),
                    "prompt": prompt,
                    "generator": self.generator.name(),
                    "files": files,
                }),
            )
            .await?;

        self.stream.publish(
            session_id,
            BuildEvent::complete(name.clone())
                .with_field("files", files.clone())
                .with_field("summary", summary.clone()),
        );

        Ok(BuildOutcome {
            project: name,
            files,
            summary,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
