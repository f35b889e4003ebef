// Decision: BuildRunner trait abstracts where build workflows execute.
// The in-process runner spawns one tokio task per build session; the API only
// depends on the trait so a queue-backed runner can replace it later.
// Tuning is via WEBFORGE_GENERATION_TIMEOUT_SECS, WEBFORGE_FILE_EVENT_CONTENT
// and WEBFORGE_WRITE_DELAY_MS.

pub mod inprocess;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use webforge_core::{BuildStream, ProjectGenerator, ProjectWriter};

use crate::workflow::BuildWorkflow;

pub use inprocess::InProcessRunner;

const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WRITE_DELAY_MS: u64 = 50;

/// Configuration for build execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Upper bound on a single generator call
    pub generation_timeout: Duration,
    /// Include file contents in `file` events
    pub file_event_content: bool,
    /// Pause between file writes so clients see incremental progress
    pub write_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            file_event_content: true,
            write_delay: Duration::from_millis(DEFAULT_WRITE_DELAY_MS),
        }
    }
}

impl RunnerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let generation_timeout = match std::env::var("WEBFORGE_GENERATION_TIMEOUT_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .trim()
                    .parse()
                    .context("WEBFORGE_GENERATION_TIMEOUT_SECS must be a number of seconds")?,
            ),
            Err(_) => defaults.generation_timeout,
        };

        let file_event_content = match std::env::var("WEBFORGE_FILE_EVENT_CONTENT") {
            Ok(value) => parse_flag(&value)?,
            Err(_) => defaults.file_event_content,
        };

        let write_delay = match std::env::var("WEBFORGE_WRITE_DELAY_MS") {
            Ok(value) => Duration::from_millis(
                value
                    .trim()
                    .parse()
                    .context("WEBFORGE_WRITE_DELAY_MS must be a number of milliseconds")?,
            ),
            Err(_) => defaults.write_delay,
        };

        Ok(Self {
            generation_timeout,
            file_event_content,
            write_delay,
        })
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_file_event_content(mut self, include: bool) -> Self {
        self.file_event_content = include;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid boolean flag: {}. Use 'true' or 'false'", value),
    }
}

/// Trait for build execution backends
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Start the build workflow for an existing session
    async fn start_build(&self, session_id: Uuid) -> Result<()>;

    /// Abort a running build. Returns false when nothing was running.
    async fn cancel_build(&self, session_id: Uuid) -> Result<bool>;

    /// Check if a build is still running
    async fn is_running(&self, session_id: Uuid) -> bool;

    /// Get count of running builds
    async fn active_count(&self) -> usize;

    /// Abort every running build
    async fn shutdown(&self) -> Result<()>;
}

/// Create the build runner
pub fn create_runner(
    config: RunnerConfig,
    stream: Arc<BuildStream>,
    generator: Arc<dyn ProjectGenerator>,
    writer: Arc<dyn ProjectWriter>,
) -> Arc<dyn BuildRunner> {
    tracing::info!(
        generator = %generator.name(),
        generation_timeout_secs = config.generation_timeout.as_secs(),
        write_delay_ms = config.write_delay.as_millis() as u64,
        "Using in-process build runner"
    );
    let workflow = BuildWorkflow::new(stream, generator, writer, config);
    Arc::new(InProcessRunner::new(workflow))
}
