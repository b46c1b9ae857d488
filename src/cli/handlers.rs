//! Subcommand handlers; each returns the process exit code

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use super::commands::{ClassifyArgs, ConfigArgs, DocumentArgs, ScanArgs};
use super::output::OutputFormatter;
use crate::config::{ConfigError, SecdocConfig};
use crate::error::ClassifyError;
use crate::lexicon::Lexicon;
use crate::pipeline::{normalize_content, ClassificationRequest, Classifier};
use crate::stream::StreamEvent;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

pub async fn handle_classify(args: &ClassifyArgs) -> i32 {
    finish(run_classify(args).await)
}

pub async fn handle_stream(args: &DocumentArgs) -> i32 {
    finish(run_stream(args).await)
}

pub async fn handle_scan(args: &ScanArgs) -> i32 {
    finish(run_scan(args).await)
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    finish(run_config(args))
}

fn finish(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

/// Configuration problems exit with 2, everything else with 1
fn exit_code_for(error: &anyhow::Error) -> i32 {
    let is_config = error.chain().any(|cause| {
        cause.downcast_ref::<ConfigError>().is_some()
            || matches!(
                cause.downcast_ref::<ClassifyError>(),
                Some(
                    ClassifyError::ConfigurationMissing { .. }
                        | ClassifyError::Config(_)
                        | ClassifyError::Lexicon(_)
                        | ClassifyError::Prompt(_)
                )
            )
    });
    if is_config {
        EXIT_CONFIG
    } else {
        EXIT_FAILURE
    }
}

/// Reads the document from `--content`, `--file` or stdin, in that order
pub async fn read_document(args: &DocumentArgs) -> Result<ClassificationRequest> {
    let content = match (&args.content, &args.file) {
        (Some(content), _) => content.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document from {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read document from stdin")?;
            buffer
        }
    };

    debug!(chars = content.chars().count(), "Document loaded");
    Ok(ClassificationRequest::new(args.title.clone(), content))
}

fn build_classifier() -> Result<Classifier> {
    let config = SecdocConfig::from_env().context("Failed to load configuration")?;
    debug!(config = ?config, "Configuration loaded");
    Classifier::from_config(&config).context("Failed to initialise classifier")
}

async fn run_classify(args: &ClassifyArgs) -> Result<i32> {
    let classifier = build_classifier()?;
    let request = read_document(&args.document).await?;

    let outcome = classifier
        .classify(request)
        .await
        .context("Classification failed")?;

    let output = OutputFormatter::new(args.format.into()).format(&outcome)?;
    println!("{}", output.trim_end());
    Ok(EXIT_OK)
}

async fn run_stream(args: &DocumentArgs) -> Result<i32> {
    let classifier = build_classifier()?;
    let request = read_document(args).await?;

    let mut events = classifier.stream(request);
    let mut stdout = std::io::stdout();
    let mut code = EXIT_FAILURE;

    while let Some(event) = events.next().await {
        stdout
            .write_all(event.to_sse_frame().as_bytes())
            .and_then(|_| stdout.flush())
            .context("Failed to write event to stdout")?;

        match event {
            StreamEvent::Done { .. } => code = EXIT_OK,
            StreamEvent::Error { message } => {
                info!(error = %message, "Stream ended with error");
                code = EXIT_FAILURE;
            }
            StreamEvent::Token { .. } => {}
        }
    }

    Ok(code)
}

/// Lexicon only; no model settings are needed
async fn run_scan(args: &ScanArgs) -> Result<i32> {
    let path_var = |key: &str| {
        env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    };
    let keywords = path_var("SECDOC_KEYWORDS_FILE");
    let phrases = path_var("SECDOC_PHRASES_FILE");

    let lexicon = Lexicon::load(keywords.as_deref(), phrases.as_deref())
        .map_err(ClassifyError::from)
        .context("Failed to load lexicon")?;

    let request = read_document(&args.document).await?;
    let content = normalize_content(&request.doc_content);
    if content.is_empty() {
        bail!(ClassifyError::InputInvalid(
            "document content is empty".to_string()
        ));
    }

    let hit = lexicon.scan(&content);
    let output = OutputFormatter::new(args.format.into()).format_scan(hit.as_ref())?;
    println!("{}", output.trim_end());
    Ok(EXIT_OK)
}

fn run_config(args: &ConfigArgs) -> Result<i32> {
    let config = SecdocConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let output = OutputFormatter::new(args.format.into()).format_config(&config)?;
    println!("{}", output.trim_end());
    Ok(EXIT_OK)
}
