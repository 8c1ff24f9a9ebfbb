use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{info, warn};

use tandem_core::config::AppConfig;
use tandem_core::error::Result;
use tandem_core::traits::MathSolver;
use tandem_core::types::{Solution, ThreadId};

use crate::coordinator::{normalize_payload, PollPolicy, RunCoordinator};
use crate::transport::{PlatformClient, RunInput};

/// The math-solving agent deployed on the graph platform.
pub struct MathAgent {
    coordinator: RunCoordinator,
    assistant_id: String,
}

impl MathAgent {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Arc::new(PlatformClient::new(&config.platform)?);
        let coordinator = RunCoordinator::new(
            client,
            PollPolicy::from(&config.polling),
            config.platform.stream_chunk_size,
        );
        Ok(Self::from_parts(coordinator, config.platform.math_assistant_id.clone()))
    }

    pub fn from_parts(coordinator: RunCoordinator, assistant_id: impl Into<String>) -> Self {
        Self {
            coordinator,
            assistant_id: assistant_id.into(),
        }
    }

    /// Solve `query` on `thread_id`, creating a thread when none is given.
    pub async fn solve_math_problem(
        &self,
        query: &str,
        thread_id: Option<ThreadId>,
    ) -> Result<Solution> {
        let (thread_id, is_new_thread) = match thread_id {
            Some(id) => (id, false),
            None => (self.coordinator.client().create_thread().await?, true),
        };

        info!(%thread_id, is_new_thread, assistant_id = %self.assistant_id, "Running math agent");
        let outcome = self
            .coordinator
            .run(&thread_id, &RunInput::human(query), &self.assistant_id)
            .await?;

        if let Some(warning) = &outcome.warning {
            warn!(%thread_id, warning = %warning, "Math agent result is best effort");
        }

        Ok(Solution {
            answer: normalize_payload(&outcome.payload),
            thread_id,
            is_new_thread,
            run_id: outcome.run_id,
            warning: outcome.warning,
            payload: outcome.payload,
        })
    }
}

impl MathSolver for MathAgent {
    fn solve(&self, query: String, thread_id: Option<ThreadId>) -> BoxFuture<'_, Result<Solution>> {
        Box::pin(async move { self.solve_math_problem(&query, thread_id).await })
    }
}
