// WebForge worker
//
// Runs build workflows for build sessions.
//
// Key design decisions:
// - BuildWorkflow narrates generation and file writes onto the session's event channel
// - BuildRunner trait hides where workflows execute; InProcessRunner uses tokio tasks
// - Every failure, timeout or panic becomes exactly one `error` event
// - Generator selection happens once at startup from GeneratorConfig

pub mod generators;
pub mod runner;
pub mod sweeper;
pub mod workflow;

pub use generators::{
    create_project_generator, create_text_generator, parse_file_map, FallbackGenerator,
    GeneratorConfig, GeneratorKind, LlmProjectGenerator,
};
pub use runner::{create_runner, BuildRunner, InProcessRunner, RunnerConfig};
pub use sweeper::spawn_session_sweeper;
pub use workflow::{build_summary, BuildOutcome, BuildWorkflow};
