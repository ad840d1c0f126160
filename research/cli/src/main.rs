//! PaperAI CLI - Search-grounded literature analysis from the terminal

use clap::{Parser, Subcommand, ValueEnum};
use paperai_lib::format::{format_json, format_markdown, format_terminal};
use paperai_lib::providers::gemini::GeminiConfig;
use paperai_lib::{AnalysisError, AnalysisResult, Analyzer};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "paperai")]
#[command(about = "Search-grounded literature analysis for research topics", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the literature for a research topic
    Analyze {
        /// The research topic (use "-" to read from stdin)
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// Proposed model to check for novelty [default: general survey]
        #[arg(short, long, value_name = "NAME", default_value = "")]
        model: String,

        /// Gemini model id to query (overrides PAPERAI_MODEL)
        #[arg(long, value_name = "ID")]
        model_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
        format: OutputFormat,

        /// Write the output to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Colored terminal output
    Terminal,
    /// Markdown document
    Markdown,
    /// Pretty-printed JSON
    Json,
}

fn read_topic_from_stdin() -> io::Result<String> {
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Resolve the topic argument, reading stdin for "-". Empty topics are rejected.
fn resolve_topic(topic: String) -> Result<String, String> {
    let topic = if topic == "-" {
        read_topic_from_stdin().map_err(|e| format!("Error reading from stdin: {}", e))?
    } else {
        topic.trim().to_string()
    };

    if topic.is_empty() {
        return Err("Error: No research topic provided".to_string());
    }
    Ok(topic)
}

fn build_analyzer(model_id: Option<String>) -> Result<Analyzer, AnalysisError> {
    let mut config = GeminiConfig::from_env()?;
    if let Some(model_id) = model_id {
        config = config.with_model(model_id);
    }
    Analyzer::new(config)
}

fn render(topic: &str, result: &AnalysisResult, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Terminal => Ok(format_terminal(topic, result)),
        OutputFormat::Markdown => Ok(format_markdown(topic, result)),
        OutputFormat::Json => {
            format_json(result).map_err(|e| format!("Failed to serialize result: {}", e))
        }
    }
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v flags; default is WARN only
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,paperai_lib=info".to_string(),
            2 => "info,paperai_lib=debug".to_string(),
            _ => "debug,paperai_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json_logs);

    tracing::info!("PaperAI CLI starting");

    match cli.command {
        Commands::Analyze {
            topic,
            model,
            model_id,
            format,
            output,
        } => {
            let topic = match resolve_topic(topic) {
                Ok(t) => t,
                Err(message) => {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
            };

            let analyzer = match build_analyzer(model_id) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    std::process::exit(1);
                }
            };

            let result = match analyzer.analyze(&topic, &model).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    std::process::exit(1);
                }
            };

            let rendered = match render(&topic, &result, format) {
                Ok(r) => r,
                Err(message) => {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
            };

            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, rendered) {
                        eprintln!("Failed to write {:?}: {}", path, e);
                        std::process::exit(1);
                    }
                    println!("Output: {:?}", path);
                }
                None => println!("{}", rendered),
            }
        }
    }
}
