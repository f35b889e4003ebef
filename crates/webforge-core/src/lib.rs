// WebForge core
//
// DB-agnostic building blocks for streamed project builds.
//
// Key design decisions:
// - BuildStream is an explicit registry object, shared as Arc, never a static
// - Each session keeps an append-only history for replay and a single-consumer live queue
// - Replay/live handoff uses per-event sequence numbers so nothing is lost or duplicated
// - Generation and storage are behind traits (ProjectGenerator, TextGenerator, ProjectWriter)
// - The deterministic scaffold is always available as a fallback backend

pub mod build_stream;
pub mod error;
pub mod event;
pub mod scaffold;
pub mod session;
pub mod traits;
pub mod utils;

// In-memory implementations for testing
pub mod memory;

// Re-exports for convenience
pub use build_stream::{BuildEventStream, BuildStream, Subscription};
pub use error::{BuildError, BuildStreamError, Result};
pub use event::{BuildEvent, EventKind};
pub use scaffold::{OfflineTextGenerator, ScaffoldGenerator};
pub use session::{BuildSession, SessionSnapshot};
pub use traits::{
    GeneratedFile, GeneratedProject, ProjectGenerator, ProjectWriter, TextGenerator, TextStream,
};
pub use utils::{human_readable_size, slugify, truncate_chars, MAX_SLUG_CHARS};
