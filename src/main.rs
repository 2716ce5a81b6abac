use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use mapstyle::artifact::ArtifactStore;
use mapstyle::llm::{LlmError, OpenAiClient, ReasoningClient, Usage};
use mapstyle::prompt::{PromptBuilder, PromptLoader, PromptRenderer};
use mapstyle::render::mapbox::USERNAME_ENV;
use mapstyle::render::{MapboxGateway, RenderError};
use mapstyle::response::Verdict;
use mapstyle::runner::{RefinementConfig, RefinementLoop, RefinementOutcome};
use mapstyle::style::StyleDocument;
use mapstyle::transcript::Transcript;
use mapstyle::StylerError;

mod cli;
mod config;

use cli::Cli;
use config::Config;

fn setup_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if !cli.is_verbose() {
        let log_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mapstyle")
            .join("logs");
        fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
        let log_file = log_dir.join("mapstyle.log");

        let target = Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .context("Failed to open log file")?,
        );
        builder.target(env_logger::Target::Pipe(target));
        builder.init();
        info!("Logging initialized, writing to: {}", log_file.display());
    } else {
        builder.init();
    }
    Ok(())
}

fn llm_setup_error(err: LlmError) -> StylerError {
    match err {
        LlmError::MissingApiKey { .. } => StylerError::Config(err.to_string()),
        other => StylerError::Llm(other),
    }
}

fn gateway_setup_error(err: RenderError) -> StylerError {
    match err {
        RenderError::MissingCredential { .. } => StylerError::Config(err.to_string()),
        other => StylerError::from(other),
    }
}

fn prompt_builder(config: &Config) -> Result<PromptBuilder> {
    let mut renderer = PromptRenderer::with_builtins()?;
    if let Some(dir) = &config.prompts.dir {
        let replaced = renderer.apply_overrides(&PromptLoader::new(dir))?;
        info!("{} prompt templates overridden from {}", replaced, dir.display());
    }
    Ok(PromptBuilder::new(renderer))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<(RefinementOutcome, Usage)> {
    let document = StyleDocument::load(&cli.style).context("Failed to load base style")?;
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| config.output.dir.clone());
    info!("Writing results to {}", output_dir.display());

    let mut client_config = config.reasoner.client_config();
    if let Some(model) = &cli.model {
        client_config.model = model.clone();
    }
    let max_tokens = client_config.max_tokens;
    let llm = match cli.api_key.clone() {
        Some(key) => OpenAiClient::with_api_key(key, client_config),
        None => OpenAiClient::new(client_config),
    }
    .map_err(llm_setup_error)?;
    let llm = Arc::new(llm);

    let username = cli
        .mapbox_username
        .clone()
        .or_else(|| config.render.username.clone())
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| StylerError::Config(format!("no style service username; set {} or --mapbox-username", USERNAME_ENV)))?;
    let gateway_config = config.render.gateway_config(username);
    let gateway = match cli.mapbox_token.clone() {
        Some(token) => MapboxGateway::with_token(token, gateway_config),
        None => MapboxGateway::new(gateway_config),
    }
    .map_err(gateway_setup_error)?;
    let gateway = Arc::new(gateway);

    let transcript = Arc::new(Transcript::open(&output_dir, &config.output.transcript)?);
    let reasoner = ReasoningClient::new(llm.clone(), config.reasoner.retry_policy(), transcript.clone()).with_max_tokens(max_tokens);
    let artifacts = ArtifactStore::new(&output_dir, document.name.clone())?;
    let refinement = RefinementConfig::new(
        cli.max_iterations.or(config.refinement.max_iterations),
        config.render.retry_policy(),
    );

    let runner = RefinementLoop::new(reasoner, gateway, prompt_builder(config)?, artifacts, transcript, refinement);
    let outcome = runner.run(&cli.inspiration, document).await?;
    Ok((outcome, llm.total_usage()))
}

fn print_summary(outcome: &RefinementOutcome, usage: &Usage) {
    for record in &outcome.records {
        let verdict = match record.verdict {
            Verdict::Accept => "Accept".green(),
            Verdict::Revision => "Revision".yellow(),
        };
        println!("  {} {} {}", record.artifact.tag.cyan(), verdict, record.artifact.path.display());
    }
    println!(
        "{} Final style accepted after {} review(s)",
        "✓".green(),
        outcome.reviews
    );
    println!("  style id: {}", outcome.style_id);
    println!("  style file: {}", outcome.final_style_path.display());
    println!(
        "  tokens: {} ({} in, {} out)",
        usage.total(),
        usage.input_tokens,
        usage.output_tokens
    );
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_ref()).context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    if let Err(e) = setup_logging(&cli, &config) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
    info!("Starting with config from: {:?}", cli.config);

    match run_application(&cli, &config).await {
        Ok((outcome, usage)) => print_summary(&outcome, &usage),
        Err(report) => {
            let code = report.downcast_ref::<StylerError>().map(StylerError::exit_code).unwrap_or(1);
            log::error!("{:#}", report);
            eprintln!("{} {:#}", "✗ Run failed:".red().bold(), report);
            std::process::exit(code);
        }
    }
}
