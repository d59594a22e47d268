mod adapter;
mod config;
mod runtime;

use clap::Parser;
use config::AppConfig;
use intervox_foundation::{AppState, ShutdownHandle};
use runtime::RuntimeOptions;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser, Debug)]
#[command(name = "intervox", about = "Spoken interview practice from the terminal")]
struct Cli {
    /// Target role the questions are generated for.
    #[arg(long, default_value = "backend engineer")]
    role: String,

    #[arg(long, default_value = "medium")]
    difficulty: String,

    /// Number of top-level questions in the session.
    #[arg(long, default_value_t = 5)]
    questions: usize,

    /// Run fully local: mock backend, transcriber, and recorder.
    #[arg(long)]
    offline: bool,

    /// Use a scripted recorder even against a real backend.
    #[arg(long)]
    mock_media: bool,

    /// Preferred input device name.
    #[arg(long)]
    device: Option<String>,

    /// Résumé file to analyze before the session.
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Job description text to bias résumé analysis and questions.
    #[arg(long)]
    job_description: Option<String>,

    #[arg(long, env = "INTERVOX_BACKEND_URL")]
    backend_url: Option<String>,

    #[arg(long, env = "INTERVOX_API_KEY")]
    api_key: Option<String>,

    #[arg(long)]
    transcriber_url: Option<String>,

    /// Seconds of think-time before capture starts (3-10).
    #[arg(long)]
    think_time: Option<u64>,

    /// Start capture while the prompt is still playing.
    #[arg(long)]
    overlap_capture: bool,

    /// Where the session document and logs live.
    #[arg(long, default_value = ".intervox")]
    data_dir: PathBuf,

    /// Explicit config file (defaults to <data-dir>/intervox.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging(data_dir: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "intervox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

fn merge_config(cli: &Cli) -> Result<AppConfig, config::ConfigError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("intervox.toml"));
    let mut config = AppConfig::load(&path)?;

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(key) = &cli.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(url) = &cli.transcriber_url {
        config.transcriber_url = url.clone();
    }
    if let Some(secs) = cli.think_time {
        config.think_time_secs = secs;
    }
    if cli.overlap_capture {
        config.capture_during_playback = true;
    }
    if let Some(device) = &cli.device {
        config.device = Some(device.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.data_dir)?;
    tracing::info!("Starting Intervox ({} questions for '{}')", cli.questions, cli.role);

    let config = merge_config(&cli)?;
    let options = RuntimeOptions {
        config,
        role: cli.role,
        difficulty: cli.difficulty,
        question_count: cli.questions.max(1),
        offline: cli.offline,
        mock_media: cli.mock_media,
        resume_path: cli.resume,
        job_description: cli.job_description,
        data_dir: cli.data_dir,
    };

    let shutdown = ShutdownHandle::new().install();
    let mut handle = runtime::start(options).await?;
    handle
        .state
        .transition(AppState::InterviewActive)
        .map_err(|e| e.to_string())?;

    let commands = handle.commands.clone();
    let Some(events) = handle.events.take() else {
        return Err("event channel already taken".into());
    };
    adapter::run(commands, events, shutdown).await;

    handle.shutdown().await;
    Ok(())
}
