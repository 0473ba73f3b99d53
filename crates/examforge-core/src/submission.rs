//! Turns a finished session into a scored [`TestResult`].

use std::time::Duration;

use uuid::Uuid;

use crate::model::BoundQuestion;
use crate::results::{ResponseRecord, ResultTotals, SubmissionKind, TestResult};
use crate::scoring::score_answer;
use crate::session::Session;
use crate::timestamp::Timestamp;

/// Everything the assembler reads. `questions[i]` belongs to slot `i`.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionInput<'a> {
    pub student_id: &'a str,
    pub test_id: &'a str,
    pub questions: &'a [BoundQuestion],
    pub session: &'a Session,
    /// Wall-clock time since the session started.
    pub elapsed: Duration,
    /// Test duration; `elapsed` is capped at this.
    pub duration: Duration,
    pub kind: SubmissionKind,
}

/// Score every slot and build the result record.
pub fn assemble_result(input: SubmissionInput<'_>) -> TestResult {
    debug_assert_eq!(input.questions.len(), input.session.len());

    let responses: Vec<ResponseRecord> = input
        .session
        .slots()
        .iter()
        .zip(input.questions)
        .map(|(slot, question)| {
            let outcome = score_answer(question, slot.answer.as_ref());
            ResponseRecord {
                question_id: slot.question_id.clone(),
                index: slot.index,
                section_id: slot.section_id.clone(),
                answer: slot.answer.clone(),
                correct_answer: question.definition.answer.clone(),
                is_correct: outcome.is_correct,
                marks_obtained: outcome.marks_obtained,
                marks_available: Some(question.marks()),
            }
        })
        .collect();

    let totals = ResultTotals::from_responses(&responses);
    let time_spent_seconds = input.elapsed.min(input.duration).as_secs();

    TestResult {
        id: Uuid::new_v4().to_string(),
        test_id: input.test_id.to_string(),
        student_id: input.student_id.to_string(),
        responses,
        totals,
        time_spent_seconds,
        submission: input.kind,
        created_at: Timestamp::now(),
    }
}
