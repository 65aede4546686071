use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vote_check::config::VoteCheckConfig;
use vote_check::hook::{Hook, HookParams};
use vote_check::mail;
use vote_check::pipeline::VoteCheckPipeline;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("Usage: vote-check <message.eml>...");
        return ExitCode::from(2);
    }

    let config = match VoteCheckConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("🗳️  Vote Check v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Script: {}", config.script_path().display());
    eprintln!("   Staging: {}", config.staging_dir.display());
    eprintln!("   Output: {}", config.output_dir.display());
    eprintln!("   URL strategy: {:?}, render: {:?}\n", config.url_strategy, config.render_strategy);

    let pipeline = match VoteCheckPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    pipeline.on_init().await;

    for file in &files {
        handle_file(&pipeline, file).await;
    }

    pipeline.on_process_complete().await;
    ExitCode::SUCCESS
}

/// Run one message file through the hook lifecycle, writing the params
/// bag as JSON next to the other output.
async fn handle_file(pipeline: &VoteCheckPipeline, file: &Path) {
    let message = match mail::read_message(file).await {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(file = %file.display(), error = %e, "Skipping unreadable message");
            return;
        }
    };

    if !pipeline.on_admission_check(&message) {
        tracing::info!(file = %file.display(), subject = %message.subject, "Not a vote to check");
        return;
    }

    let mut params = HookParams::new();
    params.insert("subject".into(), message.subject.clone().into());
    pipeline.on_before_process(&message, &mut params).await;

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "message".to_string());
    let written = pipeline.output_root().join(format!("{stem}.json"));

    let json = match serde_json::to_string_pretty(&params) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(file = %file.display(), error = %e, "Failed to serialize result");
            return;
        }
    };
    if let Err(e) = write_output(&written, &json).await {
        tracing::error!(path = %written.display(), error = %e, "Failed to write result");
        return;
    }

    println!("{}", written.display());
    pipeline.on_after_process(&message, &params, &written).await;
}

async fn write_output(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}
