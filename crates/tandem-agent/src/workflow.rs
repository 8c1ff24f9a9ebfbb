use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use tandem_core::traits::{MathSolver, QuestionGenerator};
use tandem_core::types::{RoundRecord, WorkflowMetadata, WorkflowResult};

/// Drives the math agent and the question agent through sequential rounds.
///
/// Step 1 solves the user query on a new thread. Each round then asks the
/// question agent for a follow-up on the latest answer and sends that question
/// back to the math agent on the same thread. The first failure ends the run;
/// failures are reported inside the returned [`WorkflowResult`].
pub struct Workflow {
    solver: Arc<dyn MathSolver>,
    questioner: Arc<dyn QuestionGenerator>,
}

impl Workflow {
    pub fn new(solver: Arc<dyn MathSolver>, questioner: Arc<dyn QuestionGenerator>) -> Self {
        Self { solver, questioner }
    }

    pub async fn run(&self, query: &str, rounds: usize) -> WorkflowResult {
        let started_at = Utc::now();
        let mut result = WorkflowResult {
            original_query: query.to_string(),
            workflow_metadata: WorkflowMetadata {
                started_at: Some(started_at),
                ..Default::default()
            },
            ..Default::default()
        };

        info!(rounds, "Step 1: running math agent");
        let first = match self.solver.solve(query.to_string(), None).await {
            Ok(solution) => solution,
            Err(e) => {
                warn!(error = %e, "First math agent failed");
                result.error = Some(format!("First math agent failed: {}", e));
                result.workflow_metadata.finished_at = Some(Utc::now());
                return result;
            }
        };
        info!(thread_id = %first.thread_id, answer = %first.answer, "Step 1 completed");

        let thread_id = first.thread_id.clone();
        let mut current = first.answer.clone();
        result.step1_math_result = Some(first.answer);
        result.workflow_metadata.step1_thread_id = Some(first.thread_id);
        result.workflow_metadata.step1_run_id = first.run_id;

        for round in 1..=rounds {
            info!(round, rounds, "Generating follow-up question");
            let question = match self.questioner.generate(current.clone()).await {
                Ok(question) => question,
                Err(e) => {
                    warn!(round, error = %e, "Question agent failed");
                    result.question_rounds.push(RoundRecord {
                        round,
                        generated_question: None,
                        answer: None,
                        error: Some(e.to_string()),
                    });
                    break;
                }
            };
            info!(round, question = %question, "Answering follow-up question");

            match self
                .solver
                .solve(question.clone(), Some(thread_id.clone()))
                .await
            {
                Ok(solution) => {
                    info!(round, answer = %solution.answer, "Round completed");
                    current = solution.answer.clone();
                    result.question_rounds.push(RoundRecord {
                        round,
                        generated_question: Some(question),
                        answer: Some(solution.answer),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(round, error = %e, "Math agent failed");
                    result.question_rounds.push(RoundRecord {
                        round,
                        generated_question: Some(question),
                        answer: None,
                        error: Some(e.to_string()),
                    });
                    break;
                }
            }
        }

        result.workflow_metadata.total_question_rounds = result.question_rounds.len();
        result.workflow_metadata.finished_at = Some(Utc::now());
        info!(
            completed = result.completed_rounds(),
            requested = rounds,
            "Workflow finished"
        );
        result
    }
}
