//! Answer-to-score resolution.
//!
//! Pure and total: every (question, answer) pair yields an [`Outcome`],
//! including malformed numeric text and answers whose shape does not match
//! the question type. Both count as wrong answers.

use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerKey, BoundQuestion};

/// Correctness and signed marks for one response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub is_correct: bool,
    pub marks_obtained: f64,
}

impl Outcome {
    /// Not answered: never correct, never penalized.
    pub const UNANSWERED: Outcome = Outcome {
        is_correct: false,
        marks_obtained: 0.0,
    };
}

/// Score one captured answer against a bound question.
///
/// Correct answers earn the binding's marks; any other non-null answer loses
/// the binding's penalty. Multi-choice answers must match the key exactly:
/// a subset or superset earns no partial credit.
pub fn score_answer(question: &BoundQuestion, answer: Option<&Answer>) -> Outcome {
    let Some(answer) = answer else {
        return Outcome::UNANSWERED;
    };

    if is_correct(&question.definition.answer, answer) {
        Outcome {
            is_correct: true,
            marks_obtained: question.marks(),
        }
    } else {
        Outcome {
            is_correct: false,
            marks_obtained: -question.penalty(),
        }
    }
}

/// Whether `answer` matches `key`.
pub fn is_correct(key: &AnswerKey, answer: &Answer) -> bool {
    match (key, answer) {
        (AnswerKey::Single(expected), Answer::Choice(given)) => expected == given,
        (AnswerKey::Multiple(expected), Answer::Choices(given)) => expected == given,
        (AnswerKey::Numeric(expected), Answer::Numeric(given)) => numeric_matches(expected, given),
        _ => false,
    }
}

/// Exact numeric comparison after trimming. No tolerance band.
///
/// When the key itself is not numeric, falls back to trimmed text equality.
fn numeric_matches(expected: &str, given: &str) -> bool {
    let expected = expected.trim();
    let given = given.trim();
    match (parse_number(expected), parse_number(given)) {
        (Some(e), Some(g)) => e == g,
        (None, _) => !given.is_empty() && expected == given,
        (Some(_), None) => false,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
