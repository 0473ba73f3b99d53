//! Scored result types produced at submission.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerKey};
use crate::timestamp::Timestamp;

/// The scored snapshot of one slot at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: String,
    /// Slot index within the attempt.
    pub index: usize,
    #[serde(default)]
    pub section_id: Option<String>,
    /// Captured answer; `None` when the slot was not answered.
    pub answer: Option<Answer>,
    /// Canonical answer at submission time.
    pub correct_answer: AnswerKey,
    pub is_correct: bool,
    /// Signed marks: positive when correct, minus the penalty when wrong.
    pub marks_obtained: f64,
    /// Marks the binding offered. Absent on records written before this was kept.
    #[serde(default)]
    pub marks_available: Option<f64>,
}

impl ResponseRecord {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// How a result came to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// The student submitted.
    #[default]
    Manual,
    /// The countdown reached zero.
    TimedOut,
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionKind::Manual => write!(f, "manual"),
            SubmissionKind::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Summary counters of a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTotals {
    pub total_questions: usize,
    pub answered: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub not_answered: usize,
    pub marks_obtained: f64,
    pub marks_possible: f64,
}

impl ResultTotals {
    /// Fold response records into totals.
    ///
    /// `marks_possible` sums the offered marks and is never reduced by
    /// penalties.
    pub fn from_responses(responses: &[ResponseRecord]) -> Self {
        let mut totals = ResultTotals::default();
        for r in responses {
            totals.total_questions += 1;
            if r.is_answered() {
                totals.answered += 1;
                if r.is_correct {
                    totals.correct += 1;
                } else {
                    totals.incorrect += 1;
                }
            } else {
                totals.not_answered += 1;
            }
            totals.marks_obtained += r.marks_obtained;
            totals.marks_possible += r.marks_available.unwrap_or(0.0);
        }
        totals
    }

    /// Marks obtained as a percentage of marks possible (0 when nothing was possible).
    pub fn percentage(&self) -> f64 {
        if self.marks_possible <= 0.0 {
            0.0
        } else {
            self.marks_obtained / self.marks_possible * 100.0
        }
    }
}

/// The immutable outcome of one (student, test) attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub responses: Vec<ResponseRecord>,
    pub totals: ResultTotals,
    /// Wall-clock seconds from session start to submission, capped at the duration.
    pub time_spent_seconds: u64,
    #[serde(default)]
    pub submission: SubmissionKind,
    pub created_at: Timestamp,
}
