use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use tandem_core::config::PollingConfig;
use tandem_core::error::{Result, TandemError};
use tandem_core::types::{value_to_text, ThreadId};

use crate::extract::extract_from_value;
use crate::transport::{PlatformClient, RunInput};

/// Warning attached to outcomes that were observed after the wait ceiling.
pub const TIMEOUT_WARNING: &str = "Timeout waiting for completion";

const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Where a run is in its lifecycle.
///
/// `Submitting → Streaming → StreamComplete`, or on stream failure
/// `StreamFailed → Polling → PollComplete | PollTimeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Submitting,
    Streaming,
    StreamComplete,
    StreamFailed,
    Polling,
    PollComplete,
    PollTimeout,
}

/// Wait bounds for the polling fallback.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.check_interval(),
            max_wait: config.max_wait(),
        }
    }
}

/// Final state of a run and how it was observed.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Last stream frame or final thread state.
    pub payload: Value,
    /// Terminal phase: `StreamComplete`, `PollComplete` or `PollTimeout`.
    pub phase: RunPhase,
    /// Known only on the polling path.
    pub run_id: Option<String>,
    pub warning: Option<String>,
    /// Wait cycles spent polling.
    pub sleeps: u32,
    /// Frames decoded from the stream.
    pub frames: usize,
}

/// Runs an assistant on a thread: stream first, poll on failure.
pub struct RunCoordinator {
    client: Arc<PlatformClient>,
    policy: PollPolicy,
    chunk_size: usize,
}

impl RunCoordinator {
    pub fn new(client: Arc<PlatformClient>, policy: PollPolicy, chunk_size: usize) -> Self {
        Self {
            client,
            policy,
            chunk_size,
        }
    }

    pub fn client(&self) -> &Arc<PlatformClient> {
        &self.client
    }

    /// Run `assistant_id` on `thread_id` and wait for its final state.
    ///
    /// The stream is attempted once. Any stream failure switches to a single
    /// non-streaming submission observed by polling.
    pub async fn run(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
    ) -> Result<RunOutcome> {
        debug!(phase = ?RunPhase::Submitting, %thread_id, assistant_id, "Submitting run");

        match self.run_streaming(thread_id, input, assistant_id).await {
            Ok((payload, frames)) => {
                debug!(phase = ?RunPhase::StreamComplete, %thread_id, frames, "Run complete");
                return Ok(RunOutcome {
                    payload,
                    phase: RunPhase::StreamComplete,
                    run_id: None,
                    warning: None,
                    sleeps: 0,
                    frames,
                });
            }
            Err(e) => {
                info!(
                    phase = ?RunPhase::StreamFailed,
                    %thread_id,
                    error = %e,
                    "Stream failed, falling back to polling"
                );
            }
        }

        self.run_polling(thread_id, input, assistant_id).await
    }

    /// Returns the last frame and the frame count.
    async fn run_streaming(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
    ) -> Result<(Value, usize)> {
        let handle = self.client.stream_run(thread_id, input, assistant_id).await?;
        debug!(phase = ?RunPhase::Streaming, %thread_id, "Reading run stream");

        let mut frames = handle.frames(self.chunk_size).await?;
        let count = frames.len();
        match frames.pop() {
            Some(last) => Ok((last, count)),
            None => Err(TandemError::Stream("No data received from stream".into())),
        }
    }

    async fn run_polling(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
    ) -> Result<RunOutcome> {
        let handle = self.client.create_run(thread_id, input, assistant_id).await?;
        let run_id = handle.run_id.clone().ok_or(TandemError::NoRunId)?;
        debug!(phase = ?RunPhase::Polling, %thread_id, run_id = %run_id, "Polling thread state");

        Ok(self.wait_for_completion(thread_id, run_id, handle.body).await)
    }

    /// Poll thread state until nothing is pending or the ceiling is hit.
    ///
    /// On timeout the latest state is still returned, flagged with
    /// [`TIMEOUT_WARNING`]. If even that fetch fails, `run_body` stands in.
    async fn wait_for_completion(
        &self,
        thread_id: &ThreadId,
        run_id: String,
        run_body: Value,
    ) -> RunOutcome {
        let interval = self.policy.interval.max(MIN_CHECK_INTERVAL);
        let mut waited = Duration::ZERO;
        let mut sleeps = 0u32;

        while waited < self.policy.max_wait {
            match self.client.get_thread_state(thread_id).await {
                Ok(state) if state.is_idle() => {
                    debug!(phase = ?RunPhase::PollComplete, %thread_id, sleeps, "Run complete");
                    return RunOutcome {
                        payload: state.into_value(),
                        phase: RunPhase::PollComplete,
                        run_id: Some(run_id),
                        warning: None,
                        sleeps,
                        frames: 0,
                    };
                }
                Ok(state) => {
                    debug!(%thread_id, next = ?state.pending_steps(), "Thread still processing");
                }
                Err(e) => {
                    warn!(%thread_id, error = %e, "Thread state check failed");
                }
            }

            tokio::time::sleep(interval).await;
            waited += interval;
            sleeps += 1;
        }

        warn!(
            phase = ?RunPhase::PollTimeout,
            %thread_id,
            waited_ms = waited.as_millis() as u64,
            "Timeout waiting for completion"
        );
        let payload = match self.client.get_thread_state(thread_id).await {
            Ok(state) => state.into_value(),
            Err(_) => run_body,
        };

        RunOutcome {
            payload,
            phase: RunPhase::PollTimeout,
            run_id: Some(run_id),
            warning: Some(TIMEOUT_WARNING.to_string()),
            sleeps,
            frames: 0,
        }
    }
}

/// Reduce a completion payload of any known shape to answer text.
///
/// Shapes are tried in order: platform error, full state (`values`), run
/// stream update (`assistant.messages`), list of updates, anything else.
pub fn normalize_payload(payload: &Value) -> String {
    match payload {
        Value::Object(obj) => {
            if obj.contains_key("error") {
                let message = obj
                    .get("message")
                    .map(value_to_text)
                    .unwrap_or_else(|| payload.to_string());
                return format!("Platform error: {}", message);
            }
            if let Some(values) = obj.get("values") {
                return match values.get("messages") {
                    Some(messages) => extract_from_value(messages),
                    None => value_to_text(values),
                };
            }
            if let Some(messages) = obj.get("assistant").and_then(|a| a.get("messages")) {
                return extract_from_value(messages);
            }
            payload.to_string()
        }
        Value::Array(items) if !items.is_empty() => {
            let last = &items[items.len() - 1];
            match last.get("messages") {
                Some(messages) => extract_from_value(messages),
                None => value_to_text(last),
            }
        }
        other => value_to_text(other),
    }
}
