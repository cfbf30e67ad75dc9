//! Command-line front end for the Oráculo answering pipeline.
//!
//! `ask` runs a question through Gemini, the decision gate and the SQLite
//! context store; `score` runs the offline gate over a given answer.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use oraculo::confidence::SignalExtractor;
use oraculo::{
    generate_report, BotReply, BotRequest, DecisionGate, GeminiClient, LlmAnswerGenerator,
    Orchestrator, OraculoConfig, Result, ScoreComposer, SqliteContextStore, ThresholdConfig,
};

/// Oráculo de Concursos Públicos
#[derive(Parser)]
#[command(name = "oraculo")]
#[command(about = "Confidence-gated answers for civil-service exam questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Confidence threshold override, in [0.5, 1.0]
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question through the full pipeline
    Ask {
        question: String,

        #[arg(long, default_value = "cli")]
        user: String,

        #[arg(long, default_value = "cli")]
        channel: String,
    },

    /// Score an existing answer offline and print the report as JSON
    Score {
        answer: String,

        #[arg(long, default_value = "")]
        question: String,

        /// Self-reported confidence of the answer's author
        #[arg(long)]
        llm_confidence: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match OraculoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: OraculoConfig) -> Result<()> {
    let require_api_key = matches!(cli.command, Commands::Ask { .. });
    config.validate(require_api_key)?;

    let threshold = ThresholdConfig::new(config.confidence_threshold);
    if let Some(value) = cli.threshold {
        if !threshold.set(value) {
            warn!(value, kept = threshold.get(), "threshold override rejected");
        }
    }
    let composer =
        ScoreComposer::new(SignalExtractor::new().with_max_chars(config.max_response_chars));
    let gate = Arc::new(
        DecisionGate::new(composer, threshold).with_disclaimer_threshold(config.disclaimer_threshold),
    );

    match cli.command {
        Commands::Ask {
            question,
            user,
            channel,
        } => {
            let client = GeminiClient::new(config.client_config())?;
            let generator = LlmAnswerGenerator::new(Arc::new(client), config.generation_settings());
            let store = SqliteContextStore::open(&config.database_path, config.max_history)?;
            let orchestrator = Orchestrator::new(gate, Arc::new(generator), Arc::new(store));

            let reply = orchestrator
                .handle(BotRequest::new(user, channel, question))
                .await;
            for message in reply.messages() {
                println!("{}", message);
            }
            if let BotReply::Answer { verdict, .. } = &reply {
                eprintln!("[{} | {:.3}]", verdict.state, verdict.final_score);
            }
        }
        Commands::Score {
            answer,
            question,
            llm_confidence,
        } => {
            let report = generate_report(&gate, &question, &answer, llm_confidence)?;
            let verdict = gate.evaluate(&question, &answer, llm_confidence, &[]);
            let output = serde_json::json!({
                "report": report,
                "verdict": verdict,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
