use std::fmt::Write;

use tandem_core::types::{RoundRecord, WorkflowResult};

const RULE_WIDTH: usize = 60;

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
}

fn subsection(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
}

fn round_part(out: &mut String, value: Option<&str>, record: &RoundRecord) {
    match value {
        Some(text) => {
            let _ = writeln!(out, "{}", text);
        }
        None => {
            let _ = writeln!(
                out,
                "Error: {}",
                record.error.as_deref().unwrap_or("Unknown error")
            );
        }
    }
}

/// Render a finished workflow as the sectioned text report.
pub fn render_result(result: &WorkflowResult, requested_rounds: usize) -> String {
    let mut out = String::new();
    section(&mut out, "TANDEM RESULTS");
    let _ = writeln!(out, "Original query: {}", result.original_query);

    if let Some(answer) = &result.step1_math_result {
        subsection(&mut out, "Math agent result");
        let _ = writeln!(out, "{}", answer);
    }

    for record in &result.question_rounds {
        subsection(&mut out, &format!("Round {} question", record.round));
        round_part(&mut out, record.generated_question.as_deref(), record);
        subsection(&mut out, &format!("Round {} answer", record.round));
        round_part(&mut out, record.answer.as_deref(), record);
    }

    let _ = writeln!(
        out,
        "\nCompleted {}/{} question rounds",
        result.completed_rounds(),
        requested_rounds
    );
    out
}

pub fn print_result(result: &WorkflowResult, requested_rounds: usize) {
    print!("{}", render_result(result, requested_rounds));
}

pub fn print_banner(platform_url: &str) {
    println!("Tandem: math agent + question agent");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("  Math agent:     solves the query on the graph platform");
    println!("  Question agent: asks a follow-up about each answer");
    println!("  Platform:       {}", platform_url);
    println!("{}", "-".repeat(RULE_WIDTH));
}
