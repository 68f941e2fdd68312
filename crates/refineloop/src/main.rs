mod config;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use refineloop_core::{
    parse_criteria, CriticSettings, GeneratorSettings, LoopConfig, LoopError, LoopRunner,
    RetryPolicy,
};
use refineloop_logging::{init_tracing, LogFormat, Logger};
use refineloop_model::{ChatCompletionsClient, ChatConfig, DEFAULT_BASE_URL};

use config::{ProjectConfig, DEFAULT_CRITERIA};

#[derive(Parser, Debug)]
#[command(
    name = "refineloop",
    about = "Generate, critique and refine text with two LLMs until it scores well enough",
    version,
    author
)]
struct Cli {
    /// User request (or reads from prompt.md if not provided)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to prompt file (default: ./prompt.md)
    #[arg(long, default_value = "prompt.md")]
    prompt_file: PathBuf,

    /// Generator system prompt
    #[arg(long, conflicts_with = "system_prompt_file")]
    system_prompt: Option<String>,

    /// Read the generator system prompt from a file
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Comma-separated evaluation criteria
    #[arg(short, long)]
    criteria: Option<String>,

    /// Minimum average score to stop early, in [0.0, 1.0]
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum refinement iterations
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Generator temperature for the first iteration
    #[arg(long)]
    temperature: Option<f64>,

    /// Generator model name
    #[arg(long)]
    generator_model: Option<String>,

    /// Critic model name
    #[arg(long)]
    critic_model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Retries per model call on transient errors
    #[arg(long)]
    max_retries: Option<u32>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append loop events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show the resolved settings without calling any model
    #[arg(long)]
    dry_run: bool,

    /// Enable debug diagnostics
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Working dir .env first, then the process cwd; existing vars win
    dotenvy::from_path(working_dir.join(".env")).ok();
    dotenvy::dotenv().ok();

    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(if cli.verbose { "debug" } else { "warn" }, log_format);

    let prompt = get_prompt(&cli, &working_dir)?;
    let loop_config = build_loop_config(&cli, &project, &working_dir, prompt)?;

    let generator_model = cli
        .generator_model
        .clone()
        .unwrap_or_else(|| project.generator_model().to_string());
    let critic_model = cli
        .critic_model
        .clone()
        .unwrap_or_else(|| project.critic_model().to_string());
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| project.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    if cli.dry_run {
        print_dry_run(&loop_config, &generator_model, &critic_model, &base_url);
        return Ok(());
    }

    // Reject a bad configuration before touching credentials
    if let Err(e) = loop_config.validate().map_err(LoopError::from) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }

    let api_key_env = project.api_key_env();
    let api_key = std::env::var(api_key_env).with_context(|| {
        format!(
            "{} is not set. Export it or add it to a .env file",
            api_key_env
        )
    })?;

    let generator = ChatCompletionsClient::new(
        ChatConfig::new(api_key.clone(), generator_model).with_base_url(base_url.clone()),
    )
    .context("Failed to create generator client")?;
    let critic = ChatCompletionsClient::new(
        ChatConfig::new(api_key, critic_model).with_base_url(base_url),
    )
    .context("Failed to create critic client")?;

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, &resolve(&working_dir, path))
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let runner = LoopRunner::new(&generator, &critic, Arc::new(logger));
    let result = match runner.run(&loop_config).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if cli.json_output {
        let json = serde_json::to_string_pretty(&result)?;
        println!("{}", json);
    } else {
        ui::print_outcome(&result);
    }

    std::process::exit(result.exit_code());
}

/// Layer CLI flags over `refineloop.toml` over built-in defaults
fn build_loop_config(
    cli: &Cli,
    project: &ProjectConfig,
    working_dir: &Path,
    prompt: String,
) -> Result<LoopConfig> {
    let criteria = match (&cli.criteria, &project.criteria) {
        (Some(raw), _) => parse_criteria(raw),
        (None, Some(list)) => list
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        (None, None) => parse_criteria(DEFAULT_CRITERIA),
    };

    let mut config = LoopConfig::new(prompt, criteria);

    if let Some(ref path) = cli.system_prompt_file {
        let path = resolve(working_dir, path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        config = config.with_system_prompt(content.trim());
    } else if let Some(prompt) = cli
        .system_prompt
        .clone()
        .or_else(|| project.system_prompt.clone())
    {
        config = config.with_system_prompt(prompt);
    }

    if let Some(threshold) = cli.threshold.or(project.threshold) {
        config = config.with_threshold(threshold);
    }
    if let Some(max) = cli.max_iterations.or(project.max_iterations) {
        config = config.with_max_iterations(max);
    }
    if let Some(temperature) = cli.temperature.or(project.temperature) {
        config = config.with_initial_temperature(temperature);
    }

    let mut generator = GeneratorSettings::default();
    if let Some(max_tokens) = project.generator.max_tokens {
        generator.max_tokens = max_tokens;
    }
    let mut critic = CriticSettings::default();
    if let Some(max_tokens) = project.critic.max_tokens {
        critic.max_tokens = max_tokens;
    }
    if let Some(temperature) = project.critic.temperature {
        critic.temperature = temperature;
    }
    config = config.with_generator(generator).with_critic(critic);

    if let Some(retries) = cli.max_retries.or(project.max_retries) {
        config = config.with_retry(RetryPolicy::default().with_max_retries(retries));
    }

    Ok(config)
}

fn get_prompt(cli: &Cli, working_dir: &Path) -> Result<String> {
    if let Some(ref prompt) = cli.prompt {
        return Ok(prompt.clone());
    }

    let prompt_path = resolve(working_dir, &cli.prompt_file);
    if prompt_path.exists() {
        let content =
            std::fs::read_to_string(&prompt_path).context("Failed to read prompt file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No prompt provided. Use --prompt or create a {} file",
            cli.prompt_file.display()
        )
    }
}

fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn print_dry_run(config: &LoopConfig, generator_model: &str, critic_model: &str, base_url: &str) {
    let preview: String = config.user_message.chars().take(100).collect();
    let ellipsis = if config.user_message.chars().count() > 100 {
        "..."
    } else {
        ""
    };

    println!("=== Dry Run ===");
    println!("Prompt: {}{}", preview, ellipsis);
    println!("Criteria: {}", config.criteria.join(", "));
    println!("Threshold: {:.2}", config.threshold);
    println!("Max iterations: {}", config.max_iterations);
    println!("Initial temperature: {:.2}", config.initial_temperature);
    println!("Generator: {} (max_tokens {})", generator_model, config.generator.max_tokens);
    println!(
        "Critic: {} (temperature {:.2}, max_tokens {})",
        critic_model, config.critic.temperature, config.critic.max_tokens
    );
    println!("Base URL: {}", base_url);
    println!("Retries per call: {}", config.retry.max_retries);
    if let Err(e) = config.validate() {
        println!("Invalid configuration: {}", e);
    }
}
