mod display;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tandem_agent::{QuestionAgent, Workflow};
use tandem_core::config::AppConfig;
use tandem_core::types::WorkflowResult;
use tandem_platform::MathAgent;

#[derive(Parser)]
#[command(
    name = "tandem",
    version,
    about = "Run a math agent and a question agent in sequential rounds"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "tandem.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a query, then run follow-up question rounds on the answer
    Run {
        /// The math question to process (read from stdin when omitted)
        query: Vec<String>,
        /// Number of question rounds
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        rounds: u32,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tandem=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config");
        AppConfig::load(&cli.config)?
    } else {
        eprintln!(
            "Warning: No config file found. Reading LANGGRAPH_PLATFORM_URL, LANGGRAPH_API_KEY and OPENAI_API_KEY from the environment."
        );
        AppConfig::from_env()
    };

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", config.summary());
            for key in config.missing_credentials() {
                println!("  [!!] {} is not set", key);
            }
        }
        Some(Commands::Run {
            query,
            rounds,
            json,
        }) => {
            let mut text = query.join(" ");
            if text.trim().is_empty() {
                text = io::stdin()
                    .lock()
                    .lines()
                    .map_while(|l| l.ok())
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            if text.trim().is_empty() {
                anyhow::bail!("Please provide a math question");
            }
            let rounds = rounds as usize;
            let result = run_workflow(&config, text.trim(), rounds).await?;
            report(&result, rounds, json)?;
        }
        None => {
            display::print_banner(&config.platform.base_url());
            let query: String = Input::new()
                .with_prompt("Enter your math question")
                .validate_with(|input: &String| -> Result<(), &str> {
                    if input.trim().is_empty() {
                        Err("Please enter a valid question")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;
            let rounds: usize = Input::new()
                .with_prompt("How many question rounds?")
                .default(1)
                .validate_with(|input: &usize| -> Result<(), &str> {
                    if *input < 1 {
                        Err("Number of rounds must be at least 1")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;

            let result = run_workflow(&config, query.trim(), rounds).await?;
            report(&result, rounds, false)?;
        }
    }

    Ok(())
}

async fn run_workflow(config: &AppConfig, query: &str, rounds: usize) -> anyhow::Result<WorkflowResult> {
    config.validate()?;

    let solver = Arc::new(MathAgent::new(config)?);
    let llm = Arc::from(tandem_llm::create_client(&config.question_model));
    let questioner = Arc::new(QuestionAgent::new(llm, config.question_model.clone()));

    info!(query, rounds, "Running tandem workflow");
    Ok(Workflow::new(solver, questioner).run(query, rounds).await)
}

fn report(result: &WorkflowResult, rounds: usize, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.error.is_none() {
        display::print_result(result, rounds);
    }

    if let Some(error) = &result.error {
        warn!(error = %error, "Workflow did not complete");
        anyhow::bail!("{}", error);
    }
    Ok(())
}
