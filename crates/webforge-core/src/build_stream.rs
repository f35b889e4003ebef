// Build stream: session registry and per-session event channel
//
// BuildStream owns every live BuildSession. Producers call publish/prime from
// any task; a single consumer per session reads the live queue through
// stream() or subscribe().
//
// Handoff between replay and live delivery is a sequence cursor: each event
// is queued together with its index in history, and both happen under the
// session's timeline lock. subscribe() claims the receiver, snapshots history
// and remembers its length; the live side then skips anything below that
// length. Replay plus live therefore equals history with no overlap.

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BuildStreamError;
use crate::event::BuildEvent;
use crate::session::{BuildSession, Sequenced, SessionSnapshot};

/// Lazy, non-restartable sequence of live events for one session
pub type BuildEventStream = BoxStream<'static, BuildEvent>;

/// Replay snapshot plus the live tail that continues exactly where it ends
pub struct Subscription {
    pub session_id: Uuid,
    /// History as of the moment the live queue was claimed
    pub replay: Vec<BuildEvent>,
    /// Events published after the snapshot, ending after a terminal event
    pub live: BuildEventStream,
    /// True when nothing more can arrive live
    pub finished: bool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("session_id", &self.session_id)
            .field("replay_len", &self.replay.len())
            .field("finished", &self.finished)
            .finish()
    }
}

/// Explicit registry of build sessions, shared as Arc<BuildStream>
#[derive(Default)]
pub struct BuildStream {
    sessions: RwLock<HashMap<Uuid, Arc<BuildSession>>>,
}

impl BuildStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and register a fresh session
    pub fn create_session(&self, prompt: impl Into<String>) -> Arc<BuildSession> {
        let session = Arc::new(BuildSession::new(prompt));
        self.sessions.write().insert(session.id(), session.clone());
        debug!(session_id = %session.id(), "Build session created");
        session
    }

    pub fn get_session(&self, id: Uuid) -> Option<Arc<BuildSession>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Remove a session. Unknown ids are a no-op. Returns whether a session was removed.
    pub fn drop_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&id);
        match removed {
            Some(session) => {
                session.disconnect();
                debug!(session_id = %id, "Build session dropped");
                true
            }
            None => false,
        }
    }

    /// Snapshots of all sessions, oldest first
    pub fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> = self
            .sessions
            .read()
            .values()
            .map(|session| session.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Number of sessions that have not reached a terminal state
    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|session| !session.is_completed())
            .count()
    }

    /// Record an event in history and queue it for live delivery.
    /// Returns false when the session is unknown or already terminal.
    pub fn publish(&self, id: Uuid, event: BuildEvent) -> bool {
        self.record(id, event, true)
    }

    /// Record an event in history only; the live consumer never sees it
    pub fn prime(&self, id: Uuid, event: BuildEvent) -> bool {
        self.record(id, event, false)
    }

    fn record(&self, id: Uuid, event: BuildEvent, enqueue: bool) -> bool {
        let Some(session) = self.get_session(id) else {
            debug!(session_id = %id, kind = %event.kind, "Ignoring event for unknown session");
            return false;
        };

        let terminal = event.is_terminal();
        {
            let mut timeline = session.timeline.write();
            if timeline.terminal {
                debug!(session_id = %id, kind = %event.kind, "Ignoring event after terminal event");
                return false;
            }

            let event = event.stamped();
            let seq = timeline.events.len();
            if enqueue {
                if let Some(sender) = &timeline.sender {
                    // Receiver lives as long as the session; a send error only means it was dropped.
                    let _ = sender.send((seq, event.clone()));
                }
            }
            timeline.events.push(event);

            if terminal {
                timeline.terminal = true;
                // Nothing follows a terminal event; let the consumer end after draining.
                timeline.sender = None;
            }
        }

        if terminal {
            session.mark_completed();
        }
        true
    }

    /// Claim the live queue and deliver everything queued, in order, until a terminal event
    pub fn stream(&self, id: Uuid) -> Result<BuildEventStream, BuildStreamError> {
        let session = self
            .get_session(id)
            .ok_or(BuildStreamError::SessionNotFound(id))?;
        let receiver = claim_receiver(&session)?;
        Ok(live_events(session, receiver, 0))
    }

    /// Claim the live queue, then snapshot history in one step.
    /// The live tail starts right after the last replayed event.
    pub fn subscribe(&self, id: Uuid) -> Result<Subscription, BuildStreamError> {
        let session = self
            .get_session(id)
            .ok_or(BuildStreamError::SessionNotFound(id))?;
        let receiver = claim_receiver(&session)?;

        let (replay, finished) = {
            let timeline = session.timeline.read();
            (
                timeline.events.clone(),
                timeline.terminal || timeline.sender.is_none(),
            )
        };
        if replay.last().is_some_and(BuildEvent::is_terminal) {
            session.mark_completed();
        }

        let cursor = replay.len();
        Ok(Subscription {
            session_id: id,
            replay,
            live: live_events(session, receiver, cursor),
            finished,
        })
    }

    /// Mark a session completed without a terminal event and end live delivery
    pub fn close(&self, id: Uuid) -> bool {
        match self.get_session(id) {
            Some(session) => {
                session.mark_completed();
                session.disconnect();
                debug!(session_id = %id, "Build session closed");
                true
            }
            None => false,
        }
    }

    /// Remove sessions that completed more than `ttl` ago. Returns how many were removed.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let ttl = chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        let now = chrono::Utc::now();

        let expired: Vec<Uuid> = self
            .sessions
            .read()
            .values()
            .filter(|session| {
                session
                    .completed_at()
                    .is_some_and(|completed_at| now.signed_duration_since(completed_at) >= ttl)
            })
            .map(|session| session.id())
            .collect();

        let evicted = expired
            .into_iter()
            .filter(|id| self.drop_session(*id))
            .count();
        if evicted > 0 {
            info!(evicted, remaining = self.len(), "Evicted expired build sessions");
        }
        evicted
    }
}

type Receiver = OwnedMutexGuard<mpsc::UnboundedReceiver<Sequenced>>;

fn claim_receiver(session: &Arc<BuildSession>) -> Result<Receiver, BuildStreamError> {
    session
        .receiver
        .clone()
        .try_lock_owned()
        .map_err(|_| BuildStreamError::StreamBusy(session.id()))
}

struct LiveState {
    session: Arc<BuildSession>,
    receiver: Receiver,
    cursor: usize,
    done: bool,
}

fn live_events(session: Arc<BuildSession>, receiver: Receiver, cursor: usize) -> BuildEventStream {
    let state = LiveState {
        session,
        receiver,
        cursor,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            let (seq, event) = state.receiver.recv().await?;
            if seq < state.cursor {
                continue;
            }
            if event.is_terminal() {
                state.session.mark_completed();
                state.done = true;
            }
            return Some((event, state));
        }
    })
    .boxed()
}
