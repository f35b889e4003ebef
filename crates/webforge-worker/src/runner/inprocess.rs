// In-process build runner using Tokio tasks
// This is the only runner: fast, but builds do not survive a process restart.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;
use webforge_core::BuildEvent;

use super::BuildRunner;
use crate::workflow::BuildWorkflow;

/// In-process build runner using Tokio tasks
pub struct InProcessRunner {
    workflow: Arc<BuildWorkflow>,
    /// Active builds (session_id -> task handle)
    active_builds: Arc<RwLock<HashMap<Uuid, JoinHandle<()>>>>,
}

impl InProcessRunner {
    pub fn new(workflow: BuildWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
            active_builds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn workflow(&self) -> &Arc<BuildWorkflow> {
        &self.workflow
    }
}

#[async_trait]
impl BuildRunner for InProcessRunner {
    async fn start_build(&self, session_id: Uuid) -> Result<()> {
        if self.workflow.stream().get_session(session_id).is_none() {
            anyhow::bail!("Build session {} not found", session_id);
        }

        // Held across spawn so the task's own cleanup cannot run before the insert
        let mut active = self.active_builds.write().await;
        if active.contains_key(&session_id) {
            anyhow::bail!("Build {} is already running", session_id);
        }

        info!(session_id = %session_id, "Starting in-process build");

        let workflow = self.workflow.clone();
        let active_builds = self.active_builds.clone();
        let handle = tokio::spawn(async move {
            workflow.run(session_id).await;
            active_builds.write().await.remove(&session_id);
        });
        active.insert(session_id, handle);

        Ok(())
    }

    async fn cancel_build(&self, session_id: Uuid) -> Result<bool> {
        let Some(handle) = self.active_builds.write().await.remove(&session_id) else {
            debug!(session_id = %session_id, "No running build to cancel");
            return Ok(false);
        };

        info!(session_id = %session_id, "Cancelling in-process build");
        handle.abort();
        self.workflow
            .stream()
            .publish(session_id, BuildEvent::error("Build cancelled"));
        Ok(true)
    }

    async fn is_running(&self, session_id: Uuid) -> bool {
        let builds = self.active_builds.read().await;
        builds
            .get(&session_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn active_count(&self) -> usize {
        self.active_builds.read().await.len()
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down in-process build runner");

        let mut builds = self.active_builds.write().await;
        for (session_id, handle) in builds.drain() {
            info!(session_id = %session_id, "Aborting build on shutdown");
            handle.abort();
            self.workflow
                .stream()
                .publish(session_id, BuildEvent::error("Server shutting down"));
        }

        Ok(())
    }
}
