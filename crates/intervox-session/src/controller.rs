//! The turn controller.
//!
//! Sequences one question's think-time, prompt playback, capture,
//! transcription, optional follow-up probe, and progression across the
//! plan. Runs as a single task driven by `tokio::select!`; UI front ends
//! attach through the command/event channels and only dispatch transitions.

use crate::backend::{FollowUpProbe, InterviewBackend, TurnAdvice};
use crate::ledger::AnswerLedger;
use crate::report::local_report;
use crate::store::ResultStore;
use crate::turn::{FollowUpStage, FollowUpTurn, PendingAction, SessionError, TurnPhase, TurnState};
use crate::types::{AnswerRecord, InterviewPlan, Question, Report, SaveState};
use intervox_foundation::MediaError;
use intervox_media::SegmentRecorder;
use intervox_stt::{normalize_transcript, SttError, Transcriber, Transcript, TRANSCRIPTION_FAILED_TEXT};
use intervox_tts::{ClipSource, PlaybackHandle, PromptClip};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// User intents, dispatched by a thin front-end adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Leave Idle and present the first question.
    Begin,
    /// Finish the current answer and transcribe it.
    StopRecording,
    /// Replay the current prompt (at most twice per question).
    Repeat,
    /// Move to the next question, deferring while capture is in flight.
    Next,
    /// Finish the interview, deferring while capture is in flight.
    End,
    /// Cancel the currently playing prompt segment.
    SkipPrompt,
}

/// Observations for the front end.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged {
        phase: TurnPhase,
        question_index: usize,
    },
    QuestionStarted {
        index: usize,
        question: Question,
    },
    Countdown {
        seconds_left: u32,
    },
    TranscriptMerged {
        question_id: String,
        user_answer: String,
    },
    FollowUpRequested {
        prompt: String,
    },
    /// Capture started for the follow-up sub-turn (the phase stays
    /// `AwaitingFollowUp`, so this is not visible as a phase change).
    FollowUpRecordingStarted,
    SaveState(SaveState),
    PermissionError(String),
    SessionRegistered {
        session_id: String,
    },
    SessionEnded {
        report: Report,
    },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Countdown before capture begins. Clamped to 3-10 seconds.
    pub think_time: Duration,
    /// When false (the default), capture start waits for prompt playback to
    /// finish; when true, they overlap.
    pub capture_during_playback: bool,
    /// How long the save indicator shows Saved/Failed before clearing.
    pub save_indicator_ttl: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            think_time: Duration::from_secs(5),
            capture_during_playback: false,
            save_indicator_ttl: Duration::from_secs(4),
        }
    }
}

impl ControllerConfig {
    pub fn clamped(mut self) -> Self {
        self.think_time = self
            .think_time
            .clamp(Duration::from_secs(3), Duration::from_secs(10));
        self
    }
}

/// What the controller is waiting on while the playback queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueWait {
    ThinkTime,
    Recording,
    FollowUpRecording,
}

struct TranscriptionOutcome {
    question_id: String,
    for_follow_up: bool,
    result: Result<Transcript, SttError>,
}

struct SubmitOutcome {
    question_id: String,
    from_follow_up: bool,
    result: Result<TurnAdvice, crate::backend::BackendError>,
}

pub struct TurnController {
    config: ControllerConfig,
    plan: InterviewPlan,
    index: usize,
    phase: TurnPhase,
    turn: TurnState,
    ledger: AnswerLedger,
    pending_probe: Option<FollowUpProbe>,

    recorder: Box<dyn SegmentRecorder>,
    transcriber: Arc<dyn Transcriber>,
    backend: Arc<dyn InterviewBackend>,
    store: Arc<dyn ResultStore>,
    playback: PlaybackHandle,
    queue_busy: watch::Receiver<bool>,
    awaiting_queue: Option<QueueWait>,

    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    stt_tx: mpsc::Sender<TranscriptionOutcome>,
    stt_rx: mpsc::Receiver<TranscriptionOutcome>,
    advice_tx: mpsc::Sender<SubmitOutcome>,
    advice_rx: mpsc::Receiver<SubmitOutcome>,
    ack_tx: mpsc::Sender<Result<String, crate::backend::BackendError>>,
    ack_rx: mpsc::Receiver<Result<String, crate::backend::BackendError>>,

    think_tick: tokio::time::Interval,
    think_remaining: u32,
    save_clear_at: Option<tokio::time::Instant>,
}

impl TurnController {
    #[allow(clippy::type_complexity)]
    pub fn new(
        config: ControllerConfig,
        plan: InterviewPlan,
        recorder: Box<dyn SegmentRecorder>,
        transcriber: Arc<dyn Transcriber>,
        backend: Arc<dyn InterviewBackend>,
        store: Arc<dyn ResultStore>,
        playback: PlaybackHandle,
    ) -> (
        Self,
        mpsc::Sender<SessionCommand>,
        mpsc::Receiver<SessionEvent>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (stt_tx, stt_rx) = mpsc::channel(8);
        let (advice_tx, advice_rx) = mpsc::channel(8);
        let (ack_tx, ack_rx) = mpsc::channel(1);
        let queue_busy = playback.busy_watch();

        let controller = Self {
            config: config.clamped(),
            plan,
            index: 0,
            phase: TurnPhase::Idle,
            turn: TurnState::default(),
            ledger: AnswerLedger::new(),
            pending_probe: None,
            recorder,
            transcriber,
            backend,
            store,
            playback,
            queue_busy,
            awaiting_queue: None,
            cmd_rx,
            event_tx,
            stt_tx,
            stt_rx,
            advice_tx,
            advice_rx,
            ack_tx,
            ack_rx,
            think_tick: tokio::time::interval(Duration::from_secs(1)),
            think_remaining: 0,
            save_clear_at: None,
        };
        (controller, cmd_tx, event_rx)
    }

    pub async fn run(mut self) {
        info!(
            target: "session",
            "Turn controller started ({} questions, think-time {:?})",
            self.plan.len(),
            self.config.think_time
        );

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if let Err(e) = self.handle_command(cmd).await {
                            self.report_error(e).await;
                        }
                    }
                    None => {
                        debug!(target: "session", "Command channel closed, stopping controller");
                        break;
                    }
                },

                Some(outcome) = self.stt_rx.recv() => {
                    if let Err(e) = self.on_transcription(outcome).await {
                        self.report_error(e).await;
                    }
                }

                Some(outcome) = self.advice_rx.recv() => {
                    if let Err(e) = self.on_submit_outcome(outcome).await {
                        self.report_error(e).await;
                    }
                }

                Some(ack) = self.ack_rx.recv() => {
                    self.on_session_ack(ack).await;
                }

                _ = self.think_tick.tick(),
                    if self.phase == TurnPhase::ThinkTime && self.think_remaining > 0 =>
                {
                    if let Err(e) = self.on_think_tick().await {
                        self.report_error(e).await;
                    }
                }

                res = self.queue_busy.changed(), if self.awaiting_queue.is_some() => {
                    match res {
                        Ok(()) => {
                            let idle = !*self.queue_busy.borrow_and_update();
                            if idle {
                                if let Err(e) = self.on_queue_idle().await {
                                    self.report_error(e).await;
                                }
                            }
                        }
                        Err(_) => {
                            warn!(target: "session", "Playback queue gone while waiting on it");
                            self.awaiting_queue = None;
                        }
                    }
                }

                _ = tokio::time::sleep_until(
                    self.save_clear_at.unwrap_or_else(tokio::time::Instant::now)
                ), if self.save_clear_at.is_some() => {
                    self.save_clear_at = None;
                    self.emit(SessionEvent::SaveState(SaveState::Idle)).await;
                }
            }

            if self.phase == TurnPhase::Ended {
                break;
            }
        }

        info!(target: "session", "Turn controller stopped");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Result<(), SessionError> {
        debug!(target: "session", "Command {:?} in phase {:?}", cmd, self.phase);
        match cmd {
            SessionCommand::Begin => self.on_begin().await,
            SessionCommand::StopRecording => self.on_stop_recording().await,
            SessionCommand::Repeat => self.on_repeat().await,
            SessionCommand::Next => self.on_next().await,
            SessionCommand::End => self.on_end().await,
            SessionCommand::SkipPrompt => {
                self.playback.skip().await;
                Ok(())
            }
        }
    }

    async fn on_begin(&mut self) -> Result<(), SessionError> {
        if self.phase != TurnPhase::Idle {
            debug!(target: "session", "Begin ignored in phase {:?}", self.phase);
            return Ok(());
        }
        if self.plan.is_empty() {
            warn!(target: "session", "Plan has no questions, ending immediately");
            return self.finalize().await;
        }

        // Session registration is asynchronous; answers submitted before the
        // ack degrade to save errors rather than blocking the turn.
        let backend = self.backend.clone();
        let meta = self.plan.meta.clone();
        let ack_tx = self.ack_tx.clone();
        tokio::spawn(async move {
            let result = backend.create_session(&meta).await;
            let _ = ack_tx.send(result).await;
        });

        self.start_question(0).await
    }

    async fn on_stop_recording(&mut self) -> Result<(), SessionError> {
        match self.phase {
            TurnPhase::Recording => self.stop_and_transcribe(false).await,
            TurnPhase::AwaitingFollowUp
                if matches!(
                    self.turn.follow_up,
                    Some(FollowUpTurn {
                        stage: FollowUpStage::Recording,
                        ..
                    })
                ) =>
            {
                self.stop_and_transcribe(true).await
            }
            _ => {
                debug!(target: "session", "Stop ignored in phase {:?}", self.phase);
                Ok(())
            }
        }
    }

    async fn on_repeat(&mut self) -> Result<(), SessionError> {
        if matches!(self.phase, TurnPhase::Idle | TurnPhase::Ended) {
            return Ok(());
        }
        if !self.turn.try_repeat() {
            // Third repeat request for this question: a deliberate no-op.
            debug!(target: "session", "Repeat cap reached for question {}", self.index);
            return Ok(());
        }
        let clips = self.prompt_clips();
        self.playback.enqueue(clips).await;
        Ok(())
    }

    async fn on_next(&mut self) -> Result<(), SessionError> {
        match self.phase {
            TurnPhase::Recording => {
                self.set_pending(PendingAction::Next);
                self.stop_and_transcribe(false).await
            }
            TurnPhase::Transcribing => {
                self.set_pending(PendingAction::Next);
                Ok(())
            }
            TurnPhase::ReadyToAdvance => self.advance().await,
            TurnPhase::AwaitingFollowUp => match self.turn.follow_up.as_ref().map(|f| f.stage) {
                Some(FollowUpStage::Recording) => {
                    self.set_pending(PendingAction::Next);
                    self.stop_and_transcribe(true).await
                }
                Some(FollowUpStage::Transcribing) => {
                    self.set_pending(PendingAction::Next);
                    Ok(())
                }
                _ => {
                    // Follow-up prompt not yet answered; the user moves on.
                    self.turn.follow_up = None;
                    self.transition(TurnPhase::ReadyToAdvance).await?;
                    self.advance().await
                }
            },
            _ => {
                debug!(target: "session", "Next ignored in phase {:?}", self.phase);
                Ok(())
            }
        }
    }

    async fn on_end(&mut self) -> Result<(), SessionError> {
        match self.phase {
            TurnPhase::Recording => {
                // Never finalize with a stale last answer: stop, wait for
                // the transcript, merge, then finish.
                self.set_pending(PendingAction::End);
                self.stop_and_transcribe(false).await
            }
            TurnPhase::Transcribing => {
                self.set_pending(PendingAction::End);
                Ok(())
            }
            TurnPhase::AwaitingFollowUp => match self.turn.follow_up.as_ref().map(|f| f.stage) {
                Some(FollowUpStage::Recording) => {
                    self.set_pending(PendingAction::End);
                    self.stop_and_transcribe(true).await
                }
                Some(FollowUpStage::Transcribing) => {
                    self.set_pending(PendingAction::End);
                    Ok(())
                }
                _ => self.finalize().await,
            },
            TurnPhase::Idle | TurnPhase::ThinkTime | TurnPhase::ReadyToAdvance => {
                self.finalize().await
            }
            TurnPhase::Ended => Ok(()),
        }
    }

    async fn start_question(&mut self, index: usize) -> Result<(), SessionError> {
        let question = match self.plan.questions.get(index) {
            Some(q) => q.clone(),
            None => return Err(SessionError::EmptyPlan),
        };
        self.index = index;
        self.turn.reset();
        self.pending_probe = None;
        self.emit(SessionEvent::QuestionStarted { index, question })
            .await;

        // A countdown must not start while earlier prompt audio (e.g. an
        // interviewer comment) is still playing.
        if self.playback.is_busy() {
            self.awaiting_queue = Some(QueueWait::ThinkTime);
            Ok(())
        } else {
            self.enter_think_time().await
        }
    }

    async fn enter_think_time(&mut self) -> Result<(), SessionError> {
        self.transition(TurnPhase::ThinkTime).await?;
        self.think_remaining = self.config.think_time.as_secs() as u32;
        self.think_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        self.emit(SessionEvent::Countdown {
            seconds_left: self.think_remaining,
        })
        .await;
        Ok(())
    }

    async fn on_think_tick(&mut self) -> Result<(), SessionError> {
        self.think_remaining = self.think_remaining.saturating_sub(1);
        self.emit(SessionEvent::Countdown {
            seconds_left: self.think_remaining,
        })
        .await;
        if self.think_remaining == 0 {
            self.begin_capture_sequence().await?;
        }
        Ok(())
    }

    /// Countdown hit zero: play the prompt and start capture per the
    /// configured overlap policy.
    async fn begin_capture_sequence(&mut self) -> Result<(), SessionError> {
        let clips = self.prompt_clips();
        self.playback.enqueue(clips).await;

        if !self.config.capture_during_playback && self.playback.is_busy() {
            self.awaiting_queue = Some(QueueWait::Recording);
            return Ok(());
        }
        self.try_start_recording().await
    }

    async fn try_start_recording(&mut self) -> Result<(), SessionError> {
        match self.recorder.start().await {
            Ok(()) => self.transition(TurnPhase::Recording).await,
            Err(MediaError::PermissionDenied { reason }) => {
                // Recording stays unreachable; surface persistently.
                warn!(target: "session", "Microphone permission denied: {}", reason);
                self.emit(SessionEvent::PermissionError(reason)).await;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn start_follow_up_recording(&mut self) -> Result<(), SessionError> {
        match self.recorder.start().await {
            Ok(()) => {
                if let Some(follow_up) = self.turn.follow_up.as_mut() {
                    follow_up.stage = FollowUpStage::Recording;
                }
                self.emit(SessionEvent::FollowUpRecordingStarted).await;
                Ok(())
            }
            Err(MediaError::PermissionDenied { reason }) => {
                warn!(target: "session", "Microphone permission denied: {}", reason);
                self.emit(SessionEvent::PermissionError(reason)).await;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stop_and_transcribe(&mut self, for_follow_up: bool) -> Result<(), SessionError> {
        let clip = self.recorder.stop().await?;
        let question_id = match self.current_question() {
            Some(q) => q.id.clone(),
            None => return Err(SessionError::EmptyPlan),
        };

        if for_follow_up {
            if let Some(follow_up) = self.turn.follow_up.as_mut() {
                follow_up.stage = FollowUpStage::Transcribing;
            }
        } else {
            self.transition(TurnPhase::Transcribing).await?;
        }

        let transcriber = self.transcriber.clone();
        let tx = self.stt_tx.clone();
        tokio::spawn(async move {
            let result = transcriber.transcribe(&clip).await;
            let _ = tx
                .send(TranscriptionOutcome {
                    question_id,
                    for_follow_up,
                    result,
                })
                .await;
        });
        Ok(())
    }

    async fn on_transcription(&mut self, outcome: TranscriptionOutcome) -> Result<(), SessionError> {
        let text = match outcome.result {
            Ok(transcript) => normalize_transcript(&transcript.text),
            Err(e) => {
                // A failed transcription is not an empty answer; store the
                // sentinel so the two stay distinguishable downstream.
                warn!(target: "session", "Transcription failed: {}", e);
                TRANSCRIPTION_FAILED_TEXT.to_string()
            }
        };

        if outcome.for_follow_up {
            self.ledger.append_follow_up(&outcome.question_id, &text);
            if let Some(record) = self.ledger.get(&outcome.question_id).cloned() {
                self.emit(SessionEvent::TranscriptMerged {
                    question_id: record.question_id.clone(),
                    user_answer: record.user_answer.clone(),
                })
                .await;
                self.submit_async(record, true).await;
            }
            self.turn.follow_up = None;
            self.transition(TurnPhase::ReadyToAdvance).await?;
        } else {
            let question = match self.current_question() {
                Some(q) => q.clone(),
                None => return Err(SessionError::EmptyPlan),
            };
            let record = AnswerRecord::for_question(&question, text);
            self.ledger.upsert(record.clone());
            self.emit(SessionEvent::TranscriptMerged {
                question_id: record.question_id.clone(),
                user_answer: record.user_answer.clone(),
            })
            .await;
            self.submit_async(record, false).await;

            match self.turn.pending {
                Some(PendingAction::FollowUp) => {
                    self.turn.pending = None;
                    if let Some(probe) = self.pending_probe.take() {
                        return self.enter_follow_up(probe).await;
                    }
                    self.transition(TurnPhase::ReadyToAdvance).await?;
                }
                _ => {
                    self.transition(TurnPhase::ReadyToAdvance).await?;
                }
            }
        }

        // The single pending slot is consumed exactly once, here, after
        // transcription has settled.
        match self.turn.pending.take() {
            Some(PendingAction::Next) => self.advance().await,
            Some(PendingAction::End) => self.finalize().await,
            Some(PendingAction::FollowUp) | None => Ok(()),
        }
    }

    async fn submit_async(&mut self, record: AnswerRecord, from_follow_up: bool) {
        self.emit(SessionEvent::SaveState(SaveState::Saving)).await;
        let backend = self.backend.clone();
        let tx = self.advice_tx.clone();
        let session_id = self.plan.meta.session_id.clone();
        tokio::spawn(async move {
            let result = backend.submit_answer(session_id.as_deref(), &record).await;
            let _ = tx
                .send(SubmitOutcome {
                    question_id: record.question_id,
                    from_follow_up,
                    result,
                })
                .await;
        });
    }

    async fn on_submit_outcome(&mut self, outcome: SubmitOutcome) -> Result<(), SessionError> {
        match outcome.result {
            Ok(advice) => {
                self.emit(SessionEvent::SaveState(SaveState::Saved)).await;
                self.save_clear_at =
                    Some(tokio::time::Instant::now() + self.config.save_indicator_ttl);

                if let Some(comment) = advice.interviewer_comment {
                    self.playback
                        .enqueue(vec![PromptClip::text("interviewer-comment", comment)])
                        .await;
                }
                if let Some(probe) = advice.follow_up {
                    if !outcome.from_follow_up {
                        self.consider_follow_up(&outcome.question_id, probe).await?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                // Best-effort persistence: the local ledger stays
                // authoritative and navigation is never blocked.
                warn!(target: "session", "Answer submission failed: {}", e);
                self.emit(SessionEvent::SaveState(SaveState::Failed)).await;
                self.save_clear_at =
                    Some(tokio::time::Instant::now() + self.config.save_indicator_ttl);
                Ok(())
            }
        }
    }

    async fn consider_follow_up(
        &mut self,
        question_id: &str,
        probe: FollowUpProbe,
    ) -> Result<(), SessionError> {
        let current_id = self.current_question().map(|q| q.id.clone());
        if current_id.as_deref() != Some(question_id) {
            debug!(
                target: "session",
                "Follow-up for {} arrived after advancing, dropped",
                question_id
            );
            return Ok(());
        }

        match self.phase {
            TurnPhase::Transcribing => {
                // Defer: the follow-up starts once the transcript settles,
                // unless the user has already asked to move on.
                if self.turn.pending.is_none() {
                    self.turn.pending = Some(PendingAction::FollowUp);
                    self.pending_probe = Some(probe);
                }
                Ok(())
            }
            TurnPhase::ReadyToAdvance => self.enter_follow_up(probe).await,
            _ => {
                debug!(
                    target: "session",
                    "Follow-up dropped in phase {:?}",
                    self.phase
                );
                Ok(())
            }
        }
    }

    async fn enter_follow_up(&mut self, probe: FollowUpProbe) -> Result<(), SessionError> {
        self.transition(TurnPhase::AwaitingFollowUp).await?;
        self.turn.follow_up = Some(FollowUpTurn {
            prompt: probe.prompt.clone(),
            stage: FollowUpStage::Prompt,
        });
        self.emit(SessionEvent::FollowUpRequested {
            prompt: probe.prompt.clone(),
        })
        .await;

        let clip = match probe.audio_url {
            Some(url) => PromptClip {
                source: ClipSource::Url(url),
                label: "follow-up".to_string(),
            },
            None => PromptClip::text("follow-up", probe.prompt),
        };
        self.playback.enqueue(vec![clip]).await;

        if !self.config.capture_during_playback && self.playback.is_busy() {
            self.awaiting_queue = Some(QueueWait::FollowUpRecording);
            return Ok(());
        }
        self.start_follow_up_recording().await
    }

    async fn on_queue_idle(&mut self) -> Result<(), SessionError> {
        match self.awaiting_queue.take() {
            Some(QueueWait::ThinkTime) => self.enter_think_time().await,
            Some(QueueWait::Recording) => self.try_start_recording().await,
            Some(QueueWait::FollowUpRecording) => self.start_follow_up_recording().await,
            None => Ok(()),
        }
    }

    async fn advance(&mut self) -> Result<(), SessionError> {
        self.awaiting_queue = None;
        if self.index + 1 < self.plan.questions.len() {
            self.start_question(self.index + 1).await
        } else {
            self.finalize().await
        }
    }

    /// Stop media, persist the ledger, fetch (or approximate) the report,
    /// and hand off to the feedback flow.
    async fn finalize(&mut self) -> Result<(), SessionError> {
        self.transition(TurnPhase::Ended).await?;
        self.awaiting_queue = None;
        self.recorder.shutdown().await;
        self.playback.clear().await;
        self.playback.skip().await;

        let records = self.ledger.to_payload();
        if let Err(e) = self.store.save_results(&self.plan.meta, &records) {
            warn!(target: "session", "Failed to persist results: {}", e);
            self.emit(SessionEvent::Error(format!("results not persisted: {}", e)))
                .await;
        }

        let report = match self.plan.meta.session_id.as_deref() {
            Some(session_id) => match self.backend.fetch_report(session_id).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(
                        target: "session",
                        "Report fetch failed, falling back to local report: {}",
                        e
                    );
                    local_report(&self.plan.meta, &records)
                }
            },
            None => local_report(&self.plan.meta, &records),
        };

        self.emit(SessionEvent::SessionEnded { report }).await;
        Ok(())
    }

    async fn on_session_ack(&mut self, ack: Result<String, crate::backend::BackendError>) {
        match ack {
            Ok(session_id) => {
                info!(target: "session", "Session registered: {}", session_id);
                self.plan.meta.session_id = Some(session_id.clone());
                self.emit(SessionEvent::SessionRegistered { session_id }).await;
            }
            Err(e) => {
                warn!(target: "session", "Session registration failed: {}", e);
            }
        }
    }

    fn set_pending(&mut self, action: PendingAction) {
        if let Some(existing) = self.turn.pending {
            if existing != action {
                warn!(
                    target: "session",
                    "Replacing pending action {:?} with {:?}",
                    existing,
                    action
                );
            }
        }
        self.turn.pending = Some(action);
        if action != PendingAction::FollowUp {
            self.pending_probe = None;
        }
    }

    fn current_question(&self) -> Option<&Question> {
        self.plan.questions.get(self.index)
    }

    fn prompt_clips(&self) -> Vec<PromptClip> {
        match self.current_question() {
            Some(question) => match &question.audio_url {
                Some(url) => vec![PromptClip {
                    source: ClipSource::Url(url.clone()),
                    label: question.id.clone(),
                }],
                None => vec![PromptClip::text(question.id.clone(), question.text.clone())],
            },
            None => Vec::new(),
        }
    }

    async fn transition(&mut self, next: TurnPhase) -> Result<(), SessionError> {
        if !self.phase.can_transition(next) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        info!(
            target: "session",
            "Turn transition: {:?} -> {:?} (question {})",
            self.phase,
            next,
            self.index
        );
        self.phase = next;
        self.emit(SessionEvent::PhaseChanged {
            phase: next,
            question_index: self.index,
        })
        .await;
        Ok(())
    }

    async fn report_error(&mut self, error: SessionError) {
        warn!(target: "session", "Controller error: {}", error);
        self.emit(SessionEvent::Error(error.to_string())).await;
    }

    async fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event).await;
    }
}
