// Build session domain types
//
// BuildSession is one build request's worth of state: the immutable prompt,
// the append-only event history used for replay, and the single-delivery
// live queue. Sessions are owned by the BuildStream registry and handed out
// as Arc<BuildSession>.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::event::BuildEvent;

/// A queued event tagged with its position in history
pub(crate) type Sequenced = (usize, BuildEvent);

/// Public view of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub prompt: String,
    /// Target project, set once the orchestrator picks it
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
}

/// History plus the producer side of the live queue.
/// Append and enqueue happen under one write lock so queue order equals history order.
pub(crate) struct Timeline {
    pub(crate) events: Vec<BuildEvent>,
    pub(crate) sender: Option<mpsc::UnboundedSender<Sequenced>>,
    pub(crate) terminal: bool,
}

/// Container for streaming build events tied to a single request
pub struct BuildSession {
    id: Uuid,
    prompt: String,
    created_at: DateTime<Utc>,
    project_name: RwLock<Option<String>>,
    completed: AtomicBool,
    completed_at: RwLock<Option<DateTime<Utc>>>,
    pub(crate) timeline: RwLock<Timeline>,
    pub(crate) receiver: Arc<Mutex<mpsc::UnboundedReceiver<Sequenced>>>,
}

impl BuildSession {
    pub(crate) fn new(prompt: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            id: Uuid::now_v7(),
            prompt: prompt.into(),
            created_at: Utc::now(),
            project_name: RwLock::new(None),
            completed: AtomicBool::new(false),
            completed_at: RwLock::new(None),
            timeline: RwLock::new(Timeline {
                events: Vec::new(),
                sender: Some(sender),
                terminal: false,
            }),
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn project_name(&self) -> Option<String> {
        self.project_name.read().clone()
    }

    /// Record the project chosen for this build
    pub fn set_project_name(&self, name: impl Into<String>) {
        *self.project_name.write() = Some(name.into());
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        *self.completed_at.read()
    }

    /// Mark completed. Only the first call records the completion time.
    pub(crate) fn mark_completed(&self) {
        if !self.completed.swap(true, Ordering::AcqRel) {
            *self.completed_at.write() = Some(Utc::now());
        }
    }

    /// Copy of every event recorded so far, in publish order
    pub fn history(&self) -> Vec<BuildEvent> {
        self.timeline.read().events.clone()
    }

    pub fn history_len(&self) -> usize {
        self.timeline.read().events.len()
    }

    /// Stop live delivery; consumers drain what is queued and then end
    pub(crate) fn disconnect(&self) {
        self.timeline.write().sender = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            prompt: self.prompt.clone(),
            project: self.project_name(),
            created_at: self.created_at,
            completed: self.is_completed(),
        }
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("id", &self.id)
            .field("prompt", &self.prompt)
            .field("project_name", &self.project_name())
            .field("completed", &self.is_completed())
            .field("history_len", &self.history_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_snapshot() {
        let session = BuildSession::new("build a landing page");
        let snapshot = session.snapshot();

        assert_eq!(snapshot.prompt, "build a landing page");
        assert_eq!(snapshot.project, None);
        assert!(!snapshot.completed);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn test_mark_completed_records_time_once() {
        let session = BuildSession::new("x");
        session.mark_completed();
        let first = session.completed_at();
        assert!(first.is_some());

        session.mark_completed();
        assert_eq!(session.completed_at(), first);
        assert!(session.is_completed());
    }

    #[test]
    fn test_snapshot_serializes_project_as_null() {
        let session = BuildSession::new("x");
        let value = serde_json::to_value(session.snapshot()).unwrap();
        assert!(value["project"].is_null());
        assert_eq!(value["completed"], false);

        session.set_project_name("x-site");
        let value = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(value["project"], "x-site");
    }
}
