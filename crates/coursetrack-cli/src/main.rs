//! coursetrack - view course progress and complete lessons from the terminal.
//!
//! Reads enrollments and courses from a headless content store (or from a
//! local JSON fixture with `--offline`) and prints progress views.

mod args;
mod render;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Args, Command, USAGE};
use coursetrack_core::{Config, ContentStore, ContentStoreClient, CoreError, CourseProgress, MemoryStore};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent progress view builds.
/// Keeps a long list of enrollment ids from flooding the content store.
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_store(args: &Args) -> Result<Arc<dyn ContentStore>> {
    if let Some(ref path) = args.offline {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let store = MemoryStore::from_json(&json)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        info!(path = %path.display(), "Using offline fixture");
        return Ok(Arc::new(store));
    }

    let config = Config::load()?.with_env_overrides(|key| std::env::var(key).ok())?;
    let client = ContentStoreClient::new(&config).context("Failed to create content store client")?;
    Ok(Arc::new(client))
}

fn report_error(subject: &str, err: &CoreError) {
    error!(subject, error = %err, "Request failed");
    eprintln!("{} {}: {}", err.status_code().as_u16(), subject, err);
}

async fn show_progress(progress: &CourseProgress, enrollment_ids: &[String], json: bool) -> Result<bool> {
    // `buffered` keeps output in argument order.
    let results: Vec<_> = stream::iter(enrollment_ids)
        .map(|id| async move { (id, progress.build_progress_view(id).await) })
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

    let mut all_ok = true;
    let mut first = true;
    for (id, result) in results {
        match result {
            Ok(view) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    if !first {
                        println!();
                    }
                    print!("{}", render::render_view(&view));
                }
                first = false;
            }
            Err(e) => {
                report_error(&format!("enrollment {}", id), &e);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

async fn complete(progress: &CourseProgress, enrollment_id: &str, lesson_id: &str) -> bool {
    match progress.complete_lesson(enrollment_id, lesson_id).await {
        Ok(status) => {
            println!("{} {}", status.status_code().as_u16(), status);
            true
        }
        Err(e) => {
            report_error(&format!("lesson {}", lesson_id), &e);
            false
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(true);
    }

    let progress = CourseProgress::new(open_store(&args)?);

    match args.command {
        Command::Progress { ref enrollment_ids } => show_progress(&progress, enrollment_ids, args.json).await,
        Command::Complete {
            ref enrollment_id,
            ref lesson_id,
        } => Ok(complete(&progress, enrollment_id, lesson_id).await),
        Command::Help => Ok(true),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
