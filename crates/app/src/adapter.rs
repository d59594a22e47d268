//! Terminal front end.
//!
//! A thin adapter in both directions: stdin lines become session commands,
//! session events become printed lines. All sequencing lives in the
//! controller; nothing here mutates turn state.

use intervox_foundation::ShutdownHandle;
use intervox_session::{Report, SessionCommand, SessionEvent, TurnPhase};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

pub fn parse_command(line: &str) -> Option<SessionCommand> {
    match line.trim().to_lowercase().as_str() {
        "begin" | "b" => Some(SessionCommand::Begin),
        "stop" | "s" => Some(SessionCommand::StopRecording),
        "repeat" | "r" => Some(SessionCommand::Repeat),
        "next" | "n" => Some(SessionCommand::Next),
        "end" | "e" => Some(SessionCommand::End),
        "skip" | "k" => Some(SessionCommand::SkipPrompt),
        _ => None,
    }
}

fn print_help() {
    println!("Commands: [s]top answer, [n]ext question, [r]epeat prompt, s[k]ip audio, [e]nd interview");
}

/// Render one event. Returns true once the session has ended.
fn render_event(event: &SessionEvent) -> bool {
    match event {
        SessionEvent::QuestionStarted { index, question } => {
            println!();
            println!("Question {}: {}", index + 1, question.text);
            if !question.interviewer.is_empty() {
                println!("  (asked by {})", question.interviewer);
            }
        }
        SessionEvent::Countdown { seconds_left } if *seconds_left > 0 => {
            println!("  think-time: {}s", seconds_left);
        }
        SessionEvent::Countdown { .. } => {}
        SessionEvent::PhaseChanged { phase, .. } => match phase {
            TurnPhase::Recording => println!("  recording... press 's' to stop"),
            TurnPhase::Transcribing => println!("  transcribing..."),
            TurnPhase::ReadyToAdvance => println!("  done. 'n' for next, 'e' to end"),
            _ => debug!("phase: {:?}", phase),
        },
        SessionEvent::TranscriptMerged { user_answer, .. } => {
            if user_answer.is_empty() {
                println!("  (no usable answer captured)");
            } else {
                println!("  you said: {}", user_answer);
            }
        }
        SessionEvent::FollowUpRequested { prompt } => {
            println!("  follow-up: {}", prompt);
        }
        SessionEvent::FollowUpRecordingStarted => {
            println!("  recording follow-up... press 's' to stop");
        }
        SessionEvent::SaveState(state) => debug!("save state: {:?}", state),
        SessionEvent::PermissionError(reason) => {
            println!("  microphone unavailable: {} (press 'e' to end)", reason);
        }
        SessionEvent::SessionRegistered { session_id } => {
            debug!("session registered: {}", session_id);
        }
        SessionEvent::Error(message) => println!("  error: {}", message),
        SessionEvent::SessionEnded { report } => {
            print_report(report);
            return true;
        }
    }
    false
}

fn print_report(report: &Report) {
    println!();
    println!("=== Interview report ===");
    if report.approximate {
        println!("(approximate; scoring service was unreachable)");
    }
    println!("Overall: {:.0}/100", report.overall_score);
    for entry in &report.per_question {
        println!("  [{:>3.0}] {}", entry.score, entry.prompt);
        if let Some(notes) = &entry.notes {
            println!("        {}", notes);
        }
    }
    println!("{}", report.summary);
}

/// Drive the session until it ends or shutdown is requested.
pub async fn run(
    commands: mpsc::Sender<SessionCommand>,
    mut events: mpsc::Receiver<SessionEvent>,
    shutdown: ShutdownHandle,
) {
    print_help();
    let _ = commands.send(SessionCommand::Begin).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ending = false;
    loop {
        tokio::select! {
            _ = shutdown.wait(), if !ending => {
                ending = true;
                // Keep draining events so the final report still renders.
                let _ = commands.send(SessionCommand::End).await;
            }

            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(cmd) => {
                        let _ = commands.send(cmd).await;
                    }
                    None if line.trim().is_empty() => {}
                    None => print_help(),
                },
                Ok(None) | Err(_) => {
                    let _ = commands.send(SessionCommand::End).await;
                }
            },

            event = events.recv() => match event {
                Some(event) => {
                    if render_event(&event) {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}
