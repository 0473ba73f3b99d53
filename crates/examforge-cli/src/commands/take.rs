//! The `examforge take` command: an interactive console session.
//!
//! Student input is read line by line from stdin on a dedicated thread and
//! forwarded to the session as commands, while the countdown runs.

use std::io::BufRead;

use anyhow::Result;
use tokio::sync::mpsc;

use examforge_core::engine::{ActiveSession, SessionCommand, SessionObserver};
use examforge_core::error::SessionError;
use examforge_core::model::{Answer, QuestionKind};
use examforge_core::results::TestResult;
use examforge_core::session::SlotStatus;
use examforge_core::traits::ResultStore;

use crate::commands::result::print_result;
use crate::context::{AppContext, Overrides};

const HELP: &str = "\
Commands:
  <answer>          answer the current question (e.g. `1`, `0,2`, `9.81`)
  a, answer <text>  same as above
  n, next           next question
  p, prev           previous question
  g, goto <number>  jump to question <number>
  c, clear          clear the current answer
  r, review         toggle mark-for-review
  s, submit         submit the test
  q, quit           leave without submitting
  h, help           show this help";

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(SessionCommand),
    Quit,
    Help,
    Empty,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    if line.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.' || c == '+') {
        return Input::Command(SessionCommand::Respond(line.to_string()));
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "n" | "next" => Input::Command(SessionCommand::Next),
        "p" | "prev" | "previous" => Input::Command(SessionCommand::Previous),
        "c" | "clear" => Input::Command(SessionCommand::Clear),
        "r" | "review" => Input::Command(SessionCommand::ToggleReview),
        "s" | "submit" => Input::Command(SessionCommand::Submit),
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "help" | "?" => Input::Help,
        "a" | "answer" => Input::Command(SessionCommand::Respond(rest.to_string())),
        "g" | "goto" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(SessionCommand::Navigate(n - 1)),
            _ => Input::Invalid(format!("not a question number: '{rest}'")),
        },
        other => Input::Invalid(format!("unknown command: '{other}' (h for help)")),
    }
}

/// Forward stdin lines as commands until quit or end of input.
fn spawn_stdin_reader(tx: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_input(&line) {
                Input::Command(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Input::Quit => break,
                Input::Help => println!("{HELP}"),
                Input::Empty => {}
                Input::Invalid(message) => eprintln!("  ! {message}"),
            }
        }
    });
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn status_mark(status: SlotStatus) -> &'static str {
    match status {
        SlotStatus::NotVisited => ".",
        SlotStatus::NotAnswered => "-",
        SlotStatus::Answered => "A",
        SlotStatus::MarkedForReview => "R",
        SlotStatus::AnsweredAndMarked => "A*",
    }
}

/// Renders the session to the console.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_update(&self, active: &ActiveSession) {
        let session = active.session();
        let slot = session.current();
        let question = active.current_question();

        println!();
        println!(
            "Question {}/{}{}  [{}]  time left {}",
            slot.index + 1,
            session.len(),
            slot.section_id
                .as_deref()
                .map(|s| format!(" ({s})"))
                .unwrap_or_default(),
            slot.status,
            format_clock(active.remaining_seconds())
        );
        println!("{}", question.definition.prompt);

        let selected = |i: usize| match &slot.answer {
            Some(Answer::Choice(c)) => *c == i,
            Some(Answer::Choices(set)) => set.contains(&i),
            _ => false,
        };
        for (i, option) in question.definition.options.iter().enumerate() {
            let mark = if selected(i) { "x" } else { " " };
            println!("  [{mark}] {i}) {option}");
        }
        match question.definition.kind() {
            QuestionKind::Numeric => println!(
                "  answer: {}",
                slot.answer
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".into())
            ),
            QuestionKind::Multiple => println!("  (select one or more, e.g. `0,2`)"),
            QuestionKind::Single => {}
        }

        let palette: Vec<String> = active
            .palette()
            .iter()
            .map(|e| {
                let cell = format!("{}:{}", e.index + 1, status_mark(e.status));
                if e.is_current {
                    format!("[{cell}]")
                } else {
                    cell
                }
            })
            .collect();
        let counts = active.status_counts();
        println!("{}", palette.join(" "));
        println!(
            "answered {} | marked {} | not answered {} | not visited {}",
            counts.answered + counts.answered_and_marked,
            counts.marked_for_review + counts.answered_and_marked,
            counts.not_answered,
            counts.not_visited
        );
    }

    fn on_rejected(&self, _command: &SessionCommand, reason: &str) {
        eprintln!("  ! {reason}");
    }

    fn on_time_expired(&self, _active: &ActiveSession) {
        println!("\nTime is up. Submitting your answers...");
    }

    fn on_submit_failed(&self, error: &SessionError) {
        eprintln!("Submission failed: {error}. Your answers are kept; enter `s` to retry.");
    }

    fn on_submitted(&self, result: &TestResult) {
        println!("\nSubmitted ({}).", result.submission);
    }
}

pub async fn execute(overrides: &Overrides, student_id: String, test_id: String) -> Result<()> {
    let ctx = AppContext::load(overrides)?;
    let engine = ctx.engine();

    let active = match engine.start(&student_id, &test_id).await {
        Ok(active) => active,
        Err(e @ SessionError::AlreadyAttempted { .. }) => {
            return show_stored_result(&ctx, &e, &student_id, &test_id).await;
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "{} ({} questions, {} minutes). Enter h for help.",
        active.test().title,
        active.session().len(),
        active.test().duration_minutes
    );

    let (tx, rx) = mpsc::channel(32);
    spawn_stdin_reader(tx);

    match active.run(rx, &ConsoleObserver).await {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(SessionError::Abandoned) => {
            anyhow::bail!("session abandoned before submission; nothing was saved")
        }
        Err(e @ SessionError::AlreadyAttempted { .. }) => {
            show_stored_result(&ctx, &e, &student_id, &test_id).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Redirect to the result already stored for the pair.
async fn show_stored_result(
    ctx: &AppContext,
    error: &SessionError,
    student_id: &str,
    test_id: &str,
) -> Result<()> {
    println!("{error}. Showing the stored result.\n");
    if let Some(result) = ctx.store.find_existing_result(student_id, test_id).await? {
        print_result(&result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_values_are_answers() {
        assert_eq!(
            parse_input(" 2 "),
            Input::Command(SessionCommand::Respond("2".into()))
        );
        assert_eq!(
            parse_input("0,2"),
            Input::Command(SessionCommand::Respond("0,2".into()))
        );
        assert_eq!(
            parse_input("-1.5"),
            Input::Command(SessionCommand::Respond("-1.5".into()))
        );
        assert_eq!(
            parse_input("a 3 1"),
            Input::Command(SessionCommand::Respond("3 1".into()))
        );
    }

    #[test]
    fn navigation_is_one_based() {
        assert_eq!(
            parse_input("g 3"),
            Input::Command(SessionCommand::Navigate(2))
        );
        assert!(matches!(parse_input("goto 0"), Input::Invalid(_)));
        assert!(matches!(parse_input("goto x"), Input::Invalid(_)));
        assert_eq!(parse_input("N"), Input::Command(SessionCommand::Next));
        assert_eq!(parse_input("prev"), Input::Command(SessionCommand::Previous));
    }

    #[test]
    fn control_words() {
        assert_eq!(parse_input("s"), Input::Command(SessionCommand::Submit));
        assert_eq!(parse_input("review"), Input::Command(SessionCommand::ToggleReview));
        assert_eq!(parse_input("clear"), Input::Command(SessionCommand::Clear));
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input("?"), Input::Help);
        assert_eq!(parse_input("   "), Input::Empty);
        assert!(matches!(parse_input("dance"), Input::Invalid(_)));
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(605), "10:05");
    }
}
