//! Client side of the remote graph platform.
//!
//! `PlatformClient` speaks the thread/run HTTP API, `RunCoordinator` turns a
//! submission into a final state (stream first, poll on failure), and
//! `MathAgent` wraps both behind the `MathSolver` trait.

pub mod coordinator;
pub mod extract;
pub mod math;
pub mod transport;

pub use coordinator::{normalize_payload, PollPolicy, RunCoordinator, RunOutcome, RunPhase};
pub use extract::{extract_last_assistant_text, messages_from_value, NO_RESULT};
pub use math::MathAgent;
pub use transport::{PlatformClient, RunHandle, RunInput, StreamHandle, Submission, ThreadState};
