//! End-to-end tests of the turn controller against scripted collaborators.
//!
//! Time is virtual (`start_paused`), so think-time countdowns and the save
//! indicator TTL elapse deterministically.

use async_trait::async_trait;
use intervox_media::{AudioClip, MockRecorder};
use intervox_session::{
    ControllerConfig, FollowUpProbe, InterviewPlan, MemoryResultStore, MockBackend, Question,
    SaveState, SessionCommand, SessionEvent, SessionMeta, TurnAdvice, TurnController, TurnPhase,
};
use intervox_stt::{MockTranscriber, ScriptedResult, TRANSCRIPTION_FAILED_TEXT};
use intervox_tts::{AudioSink, NullEngine, NullSink, PlaybackQueue, TtsResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn question(id: &str) -> Question {
    Question {
        id: id.to_string(),
        text: format!("prompt for {}", id),
        topic: "general".to_string(),
        kind: Default::default(),
        interviewer: "alex".to_string(),
        audio_url: None,
        ideal_answer: None,
    }
}

fn plan(count: usize) -> InterviewPlan {
    InterviewPlan {
        meta: SessionMeta {
            role: "backend engineer".to_string(),
            difficulty: "medium".to_string(),
            question_count: count,
            session_id: None,
        },
        questions: (1..=count).map(|i| question(&format!("q{}", i))).collect(),
    }
}

fn clips(count: usize) -> Vec<AudioClip> {
    (0..count)
        .map(|_| AudioClip::new(vec![0; 160], 16_000))
        .collect()
}

struct Harness {
    cmd: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<SessionEvent>,
    backend: Arc<MockBackend>,
    store: Arc<MemoryResultStore>,
}

impl Harness {
    fn spawn(
        config: ControllerConfig,
        plan: InterviewPlan,
        recorder: MockRecorder,
        transcriber: MockTranscriber,
        backend: MockBackend,
    ) -> Self {
        Self::spawn_with_sink(
            config,
            plan,
            recorder,
            transcriber,
            backend,
            Arc::new(NullSink::new()),
        )
    }

    fn spawn_with_sink(
        config: ControllerConfig,
        plan: InterviewPlan,
        recorder: MockRecorder,
        transcriber: MockTranscriber,
        backend: MockBackend,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryResultStore::new());
        let (playback, _queue_task) =
            PlaybackQueue::new(Arc::new(NullEngine), sink, None).spawn();
        let (controller, cmd, events) = TurnController::new(
            config,
            plan,
            Box::new(recorder),
            Arc::new(transcriber),
            backend.clone(),
            store.clone(),
            playback,
        );
        tokio::spawn(controller.run());
        Self {
            cmd,
            events,
            backend,
            store,
        }
    }

    async fn send(&self, cmd: SessionCommand) {
        self.cmd.send(cmd).await.expect("controller gone");
    }

    /// Drain events until the predicate matches, failing loudly if the
    /// controller stalls.
    async fn wait_for(&mut self, what: &str, pred: impl Fn(&SessionEvent) -> bool) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        let deadline = Duration::from_secs(120);
        loop {
            let event = tokio::time::timeout(deadline, self.events.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {}; saw {:?}", what, seen))
                .unwrap_or_else(|| panic!("event channel closed waiting for {}", what));
            let matched = pred(&event);
            seen.push(event);
            if matched {
                return seen;
            }
        }
    }

    async fn wait_for_phase(&mut self, phase: TurnPhase) -> Vec<SessionEvent> {
        self.wait_for(&format!("phase {:?}", phase), |e| {
            matches!(e, SessionEvent::PhaseChanged { phase: p, .. } if *p == phase)
        })
        .await
    }
}

fn fast_config() -> ControllerConfig {
    ControllerConfig {
        think_time: Duration::from_secs(3),
        capture_during_playback: false,
        save_indicator_ttl: Duration::from_secs(4),
    }
}

#[tokio::test(start_paused = true)]
async fn three_question_session_with_end_during_final_recording() {
    let transcriber = MockTranscriber::new(vec![
        ScriptedResult::Text("answer one".into()),
        ScriptedResult::Text("answer two".into()),
        ScriptedResult::Text("the third answer".into()),
    ]);
    let mut h = Harness::spawn(
        fast_config(),
        plan(3),
        MockRecorder::new(clips(3)),
        transcriber,
        MockBackend::new(),
    );

    h.send(SessionCommand::Begin).await;

    // Q1 and Q2: full turns.
    for _ in 0..2 {
        h.wait_for_phase(TurnPhase::Recording).await;
        h.send(SessionCommand::StopRecording).await;
        h.wait_for_phase(TurnPhase::ReadyToAdvance).await;
        h.send(SessionCommand::Next).await;
    }

    // Q3: end while still recording. The in-flight transcript must land.
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::End).await;
    let seen = h
        .wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;

    let records = h.store.last_records().expect("results persisted");
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].question_id, "q3");
    assert_eq!(records[2].user_answer, "the third answer");

    // No duplicate ids in the final payload.
    let mut ids: Vec<_> = records.iter().map(|r| r.question_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    // The report came from the backend, not the local fallback.
    let report = seen
        .iter()
        .find_map(|e| match e {
            SessionEvent::SessionEnded { report } => Some(report.clone()),
            _ => None,
        })
        .expect("report event");
    assert!(!report.approximate);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_never_reaches_recording() {
    let mut h = Harness::spawn(
        fast_config(),
        plan(2),
        MockRecorder::denied(),
        MockTranscriber::with_transcript("unused"),
        MockBackend::new(),
    );

    h.send(SessionCommand::Begin).await;
    let seen = h
        .wait_for("permission error", |e| {
            matches!(e, SessionEvent::PermissionError(_))
        })
        .await;

    for event in &seen {
        if let SessionEvent::PhaseChanged { phase, .. } = event {
            assert_ne!(*phase, TurnPhase::Recording, "entered Recording: {:?}", seen);
        }
    }

    // Still stuck before capture: a second stop is a no-op and no recording
    // phase ever appears.
    h.send(SessionCommand::StopRecording).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    while let Ok(event) = h.events.try_recv() {
        if let SessionEvent::PhaseChanged { phase, .. } = event {
            assert_ne!(phase, TurnPhase::Recording);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn submit_failure_keeps_ledger_and_clears_indicator() {
    let transcriber = MockTranscriber::new(vec![
        ScriptedResult::Text("an answer that should stay local".into()),
        ScriptedResult::Text("second".into()),
    ]);
    let mut h = Harness::spawn(
        fast_config(),
        plan(2),
        MockRecorder::new(clips(2)),
        transcriber,
        MockBackend::new().failing_submits(),
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::StopRecording).await;
    h.wait_for_phase(TurnPhase::ReadyToAdvance).await;

    h.wait_for("save failed", |e| {
        matches!(e, SessionEvent::SaveState(SaveState::Failed))
    })
    .await;

    // Next is not blocked by the failed save.
    h.send(SessionCommand::Next).await;
    h.wait_for("question 2", |e| {
        matches!(e, SessionEvent::QuestionStarted { index: 1, .. })
    })
    .await;

    // The indicator auto-clears.
    h.wait_for("indicator clear", |e| {
        matches!(e, SessionEvent::SaveState(SaveState::Idle))
    })
    .await;

    // End from think-time; the ledger still holds the locally merged answer.
    h.send(SessionCommand::End).await;
    h.wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;
    let records = h.store.last_records().expect("results persisted");
    assert_eq!(records[0].user_answer, "an answer that should stay local");
    assert!(h.backend.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn follow_up_probe_runs_a_sub_turn_on_the_same_question() {
    let advice = TurnAdvice {
        follow_up: Some(FollowUpProbe {
            prompt: "Could you go deeper on the trade-offs?".to_string(),
            audio_url: None,
        }),
        interviewer_comment: None,
    };
    let transcriber = MockTranscriber::new(vec![
        ScriptedResult::Text("the main answer".into()),
        ScriptedResult::Text("the elaboration".into()),
    ]);
    let mut h = Harness::spawn(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(2)),
        transcriber,
        MockBackend::new().with_advice("q1", advice),
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::StopRecording).await;

    h.wait_for("follow-up request", |e| {
        matches!(e, SessionEvent::FollowUpRequested { .. })
    })
    .await;
    h.wait_for("follow-up recording", |e| {
        matches!(e, SessionEvent::FollowUpRecordingStarted)
    })
    .await;
    h.send(SessionCommand::StopRecording).await;
    h.wait_for_phase(TurnPhase::ReadyToAdvance).await;

    h.send(SessionCommand::End).await;
    h.wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;

    let records = h.store.last_records().expect("results persisted");
    assert_eq!(records.len(), 1, "follow-up is not a new top-level question");
    assert_eq!(records[0].user_answer, "the main answer\nthe elaboration");
}

#[tokio::test(start_paused = true)]
async fn transcription_failure_stores_sentinel_not_empty() {
    let transcriber = MockTranscriber::new(vec![ScriptedResult::Fail("stt down".into())]);
    let mut h = Harness::spawn(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(1)),
        transcriber,
        MockBackend::new(),
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::StopRecording).await;
    h.wait_for_phase(TurnPhase::ReadyToAdvance).await;
    h.send(SessionCommand::End).await;
    h.wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;

    let records = h.store.last_records().expect("results persisted");
    assert_eq!(records[0].user_answer, TRANSCRIPTION_FAILED_TEXT);
}

#[tokio::test(start_paused = true)]
async fn filler_only_answer_is_stored_as_empty_string() {
    let transcriber = MockTranscriber::new(vec![ScriptedResult::Text("I don't know why".into())]);
    let mut h = Harness::spawn(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(1)),
        transcriber,
        MockBackend::new(),
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::StopRecording).await;
    h.wait_for_phase(TurnPhase::ReadyToAdvance).await;
    h.send(SessionCommand::End).await;
    h.wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;

    let records = h.store.last_records().expect("results persisted");
    assert_eq!(records[0].user_answer, "");
}

#[tokio::test(start_paused = true)]
async fn unreachable_scoring_backend_yields_labeled_local_report() {
    let transcriber = MockTranscriber::with_transcript("some answer");
    let mut h = Harness::spawn(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(1)),
        transcriber,
        MockBackend::new().failing_report(),
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    h.send(SessionCommand::StopRecording).await;
    h.wait_for_phase(TurnPhase::ReadyToAdvance).await;
    h.send(SessionCommand::End).await;
    let seen = h
        .wait_for("session end", |e| matches!(e, SessionEvent::SessionEnded { .. }))
        .await;

    let report = seen
        .iter()
        .find_map(|e| match e {
            SessionEvent::SessionEnded { report } => Some(report.clone()),
            _ => None,
        })
        .expect("report event");
    assert!(report.approximate, "fallback report must be labeled");
}

/// Counts sink plays so repeat behavior is observable from outside.
struct CountingSink {
    plays: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioSink for CountingSink {
    async fn play(&self, _wav: &[u8]) -> TtsResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn third_repeat_is_a_no_op() {
    let plays = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(CountingSink {
        plays: plays.clone(),
    });
    let mut h = Harness::spawn_with_sink(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(1)),
        MockTranscriber::with_transcript("fine"),
        MockBackend::new(),
        sink,
    );

    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;

    for _ in 0..3 {
        h.send(SessionCommand::Repeat).await;
    }
    // Let the queue drain whatever was legitimately enqueued.
    tokio::time::sleep(Duration::from_secs(2)).await;

    // One initial prompt plus exactly two repeats.
    assert_eq!(plays.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn capture_waits_for_prompt_unless_overlap_enabled() {
    // Gated: with a 5 s prompt, recording starts only after playback.
    let sink = Arc::new(NullSink::with_delay(Duration::from_secs(5)));
    let mut h = Harness::spawn_with_sink(
        fast_config(),
        plan(1),
        MockRecorder::new(clips(1)),
        MockTranscriber::with_transcript("x"),
        MockBackend::new(),
        sink,
    );
    let started = tokio::time::Instant::now();
    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    let gated_elapsed = started.elapsed();
    assert!(
        gated_elapsed >= Duration::from_secs(8),
        "think-time (3s) + prompt (5s) must pass, got {:?}",
        gated_elapsed
    );

    // Overlapping: recording starts as soon as think-time expires.
    let sink = Arc::new(NullSink::with_delay(Duration::from_secs(5)));
    let config = ControllerConfig {
        capture_during_playback: true,
        ..fast_config()
    };
    let mut h = Harness::spawn_with_sink(
        config,
        plan(1),
        MockRecorder::new(clips(1)),
        MockTranscriber::with_transcript("x"),
        MockBackend::new(),
        sink,
    );
    let started = tokio::time::Instant::now();
    h.send(SessionCommand::Begin).await;
    h.wait_for_phase(TurnPhase::Recording).await;
    let overlap_elapsed = started.elapsed();
    assert!(
        overlap_elapsed < Duration::from_secs(8),
        "overlap must not wait for playback, got {:?}",
        overlap_elapsed
    );
}
