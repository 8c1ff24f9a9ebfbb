pub mod question;
pub mod workflow;

pub use question::{QuestionAgent, QuestionState};
pub use workflow::Workflow;
