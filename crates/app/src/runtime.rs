//! Runtime wiring: builds the capture, transcription, playback, backend,
//! and store stack, then hands a running turn controller to the front end.

use crate::config::AppConfig;
use anyhow::{anyhow, Context};
use intervox_client::{BackendConfig, HttpBackend};
use intervox_foundation::{AppState, MediaError, StateManager};
use intervox_media::{
    CaptureConfig, LevelMeter, MicCapture, MicSegmentRecorder, MockRecorder, SegmentRecorder,
};
use intervox_session::{
    ControllerConfig, InterviewBackend, InterviewPlan, MockBackend, PlanRequest, ResultStore,
    SessionCommand, SessionEvent, TurnController,
};
use intervox_stt::{MockTranscriber, RemoteTranscriber, RemoteTranscriberConfig, Transcriber};
use intervox_tts::{
    AudioSink, ClipFetcher, EspeakEngine, NullEngine, NullSink, PlaybackHandle, PlaybackQueue,
    ProcessSink, SpeechEngine, TtsConfig,
};
use intervox_store::JsonSessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const DEFAULT_INTERVIEWERS: &[&str] = &["alex", "priya"];

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub config: AppConfig,
    pub role: String,
    pub difficulty: String,
    pub question_count: usize,
    /// Run fully local: mock backend, transcriber, recorder, and no audio
    /// output.
    pub offline: bool,
    /// Use a scripted recorder even against a real backend.
    pub mock_media: bool,
    /// Résumé file to analyze before the session.
    pub resume_path: Option<PathBuf>,
    pub job_description: Option<String>,
    pub data_dir: PathBuf,
}

/// Handle to the running session pipeline.
pub struct AppHandle {
    pub commands: mpsc::Sender<SessionCommand>,
    /// Taken by the front end; `None` afterwards.
    pub events: Option<mpsc::Receiver<SessionEvent>>,
    pub input_level: Option<watch::Receiver<f32>>,
    pub state: StateManager,
    controller_task: JoinHandle<()>,
    queue_task: JoinHandle<()>,
    level_task: Option<JoinHandle<()>>,
    playback: PlaybackHandle,
    capture: Option<MicCapture>,
}

impl AppHandle {
    /// Gracefully stop the pipeline: quiesce audio first, then the tasks.
    pub async fn shutdown(self) {
        info!("Shutting down Intervox runtime...");
        let _ = self.state.transition(AppState::Finalizing);

        self.playback.shutdown().await;
        if let Some(capture) = self.capture {
            capture.stop();
        }

        self.controller_task.abort();
        if let Some(task) = &self.level_task {
            task.abort();
        }
        let _ = self.controller_task.await;
        let _ = self.queue_task.await;
        if let Some(task) = self.level_task {
            let _ = task.await;
        }

        let _ = self.state.transition(AppState::Stopped);
        info!("Intervox runtime shutdown complete");
    }
}

pub async fn start(options: RuntimeOptions) -> anyhow::Result<AppHandle> {
    let state = StateManager::new();
    let config = options.config.clone();

    // --- 1. Session store ---
    let store = JsonSessionStore::new(options.data_dir.join("session.json"));
    let document = match store.load() {
        Ok(doc) => doc,
        Err(e) => {
            // Corrupt state was cleared by the store; restart the flow.
            warn!("Persisted session state discarded: {}", e);
            Default::default()
        }
    };

    // --- 2. Backend client ---
    let http_backend = if options.offline {
        None
    } else {
        Some(Arc::new(
            HttpBackend::new(BackendConfig {
                base_url: config.backend_url.clone(),
                api_key: config.api_key.clone(),
                timeout: Duration::from_secs(30),
            })
            .map_err(|e| anyhow!("backend client: {}", e))?,
        ))
    };
    let backend: Arc<dyn InterviewBackend> = match &http_backend {
        Some(http) => http.clone(),
        None => Arc::new(MockBackend::new()),
    };
    let fetcher: Option<Arc<dyn ClipFetcher>> =
        http_backend.as_ref().map(|http| http.clone() as Arc<dyn ClipFetcher>);

    // --- 3. Résumé analysis ---
    let resume = match &options.resume_path {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("reading résumé {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resume".to_string());
            match backend
                .parse_resume(&name, data, options.job_description.as_deref())
                .await
            {
                Ok(profile) => {
                    info!("Résumé analyzed: {} skills", profile.skills.len());
                    Some(profile)
                }
                Err(e) => {
                    // Surfaced, not fatal; the session proceeds without it.
                    eprintln!("Résumé analysis failed: {}", e);
                    warn!("Résumé analysis failed: {}", e);
                    None
                }
            }
        }
        None => document.resume.clone(),
    };

    // --- 4. Question plan ---
    let plan = resolve_plan(&options, document.plan, backend.as_ref()).await?;
    store
        .update(|doc| {
            doc.plan = Some(plan.clone());
            doc.resume = resume.clone();
            doc.job_description = options.job_description.clone();
        })
        .context("persisting interview plan")?;
    info!(
        "Plan ready: {} questions for '{}' ({})",
        plan.len(),
        plan.meta.role,
        plan.meta.difficulty
    );

    // --- 5. Microphone ---
    let mut capture = None;
    let mut input_level = None;
    let mut level_task = None;
    let recorder: Box<dyn SegmentRecorder> = if options.offline || options.mock_media {
        info!("Using scripted recorder (no microphone)");
        Box::new(MockRecorder::new(Vec::new()))
    } else {
        match MicCapture::spawn(CaptureConfig {
            device: config.device.clone(),
            start_muted: false,
        }) {
            Ok(mic) => {
                let (task, level_rx) = LevelMeter::spawn(mic.subscribe());
                let recorder = MicSegmentRecorder::new(mic.frame_sender(), mic.sample_rate());
                capture = Some(mic);
                input_level = Some(level_rx);
                level_task = Some(task);
                Box::new(recorder)
            }
            Err(MediaError::PermissionDenied { reason }) => {
                // Recording stays unreachable; the controller surfaces the
                // error persistently and the user keeps a forward path.
                warn!("Microphone unavailable: {}", reason);
                Box::new(MockRecorder::denied())
            }
            Err(e) => return Err(anyhow!("microphone: {}", e)),
        }
    };

    // --- 6. Transcriber ---
    let transcriber: Arc<dyn Transcriber> = if options.offline {
        Arc::new(MockTranscriber::with_transcript(
            "This is a locally scripted practice answer.",
        ))
    } else {
        Arc::new(
            RemoteTranscriber::new(RemoteTranscriberConfig {
                endpoint: config.transcriber_url.clone(),
                api_key: config.api_key.clone(),
                timeout: Duration::from_secs(30),
            })
            .map_err(|e| anyhow!("transcriber client: {}", e))?,
        )
    };

    // --- 7. Prompt synthesis and playback ---
    let espeak = EspeakEngine::new(TtsConfig {
        voice: config.voice.clone(),
        ..Default::default()
    });
    let engine: Arc<dyn SpeechEngine> = if espeak.is_available().await {
        Arc::new(espeak)
    } else {
        warn!("espeak not installed; prompts will not be audible");
        Arc::new(NullEngine)
    };
    let sink: Arc<dyn AudioSink> = if options.offline {
        Arc::new(NullSink::new())
    } else {
        Arc::new(ProcessSink::new())
    };
    let (playback, queue_task) = PlaybackQueue::new(engine, sink, fetcher).spawn();

    // --- 8. Turn controller ---
    let controller_config = ControllerConfig {
        think_time: Duration::from_secs(config.think_time_secs),
        capture_during_playback: config.capture_during_playback,
        ..Default::default()
    };
    let result_store: Arc<dyn ResultStore> = Arc::new(store);
    let (controller, commands, events) = TurnController::new(
        controller_config,
        plan,
        recorder,
        transcriber,
        backend,
        result_store,
        playback.clone(),
    );
    let controller_task = tokio::spawn(controller.run());

    state
        .transition(AppState::Ready)
        .map_err(|e| anyhow!("{}", e))?;

    Ok(AppHandle {
        commands,
        events: Some(events),
        input_level,
        state,
        controller_task,
        queue_task,
        level_task,
        playback,
        capture,
    })
}

/// Reuse the stored plan when it still matches the request, otherwise ask
/// the backend for a fresh one.
async fn resolve_plan(
    options: &RuntimeOptions,
    stored: Option<InterviewPlan>,
    backend: &dyn InterviewBackend,
) -> anyhow::Result<InterviewPlan> {
    if let Some(plan) = stored {
        if plan.meta.role == options.role
            && plan.meta.difficulty == options.difficulty
            && plan.len() == options.question_count
        {
            info!("Reusing stored interview plan");
            return Ok(plan);
        }
    }

    let request = PlanRequest {
        role: options.role.clone(),
        difficulty: options.difficulty.clone(),
        interviewers: DEFAULT_INTERVIEWERS.iter().map(|s| s.to_string()).collect(),
        count: options.question_count,
    };
    backend
        .generate_plan(&request)
        .await
        .map_err(|e| anyhow!("question plan: {}", e))
}
