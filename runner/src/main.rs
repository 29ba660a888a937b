//! DORSZ: interactive root-cause analysis from the terminal.
//!
//! Runs one agent (`why5`, `ishikawa` or `temperature_check`) against an
//! OpenAI-compatible chat endpoint, asking the user questions on stdin and
//! printing the rendered summary when the agent is done.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use dorsz::agents::AgentKind;
use dorsz::conversation::{ConversationSettings, MaxTurnsExceededError, run_conversation};
use dorsz::exit_codes;
use dorsz::io::config::{DEFAULT_CONFIG_FILE, ProviderKind, RunnerConfig, load_config};
use dorsz::io::events::ConsoleSink;
use dorsz::io::human::ConsoleHuman;
use dorsz::io::llm::OpenAiCompatBackend;
use dorsz::logging;

#[derive(Parser)]
#[command(
    name = "dorsz",
    version,
    about = "DORSZ: interactive root-cause analysis agents (5 Whys, Ishikawa)"
)]
struct Cli {
    /// Agent to run.
    #[arg(value_enum)]
    agent: AgentKind,

    /// Chat-completions provider (overrides the config file).
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,

    /// Model name (overrides MODEL and the config file).
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the selected provider, e.g. `http://localhost:1234/v1`.
    #[arg(long)]
    base_url: Option<String>,

    /// Path to the TOML config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Maximum number of model requests.
    #[arg(long)]
    max_turns: Option<u32>,

    /// Number of recent messages kept in the history window.
    #[arg(long)]
    history: Option<usize>,

    /// Opening message instead of the agent's default.
    #[arg(long)]
    input: Option<String>,
}

impl Cli {
    /// Flags win over environment and file values.
    fn apply_overrides(&self, cfg: &mut RunnerConfig) {
        if let Some(provider) = self.provider {
            cfg.provider = provider;
        }
        if let Some(model) = &self.model {
            cfg.model.clone_from(model);
        }
        if let Some(url) = &self.base_url {
            cfg.active_provider_mut().base_url.clone_from(url);
        }
        if let Some(max_turns) = self.max_turns {
            cfg.max_turns = max_turns;
        }
        if let Some(history) = self.history {
            cfg.history_max_items = history;
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<MaxTurnsExceededError>().is_some() {
        exit_codes::MAX_TURNS
    } else {
        exit_codes::INVALID
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;
    cli.apply_overrides(&mut cfg);
    cfg.validate().context("invalid configuration")?;
    debug!(provider = cfg.provider.as_str(), model = %cfg.model, "resolved configuration");

    let agent = cli.agent.definition()?;
    let input = cli.input.clone().unwrap_or_else(|| agent.default_input.to_string());
    let settings = ConversationSettings::from_config(&cfg, input)?;
    let backend = OpenAiCompatBackend::from_config(&cfg)?;

    println!("DORSZ - root-cause analysis");
    println!("Provider: {}", cfg.provider.as_str());
    println!("Model: {}", cfg.model);
    println!("Agent: {}", cli.agent.as_str());

    let mut human = ConsoleHuman::stdio();
    let mut sink = ConsoleSink::stdout();
    let outcome = run_conversation(&agent, &backend, &mut human, &mut sink, &settings)?;

    println!("\nAgent response:\n{}", cli.agent.render(&outcome.output));
    Ok(())
}
