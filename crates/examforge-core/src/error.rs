//! Session error types.
//!
//! Initialization failures are fatal to session start. Transient store
//! failures during submission are recoverable and leave the session intact for
//! a retry; a store that already holds a result for the pair is not.

use thiserror::Error;

/// Errors raised while starting, driving, or submitting a test session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The test definition could not be resolved.
    #[error("test not found: {0}")]
    TestNotFound(String),

    /// A question referenced by the test could not be resolved.
    #[error("question not found: {0}")]
    QuestionNotFound(String),

    /// The test resolved but binds no questions.
    #[error("test {0} has no questions")]
    NoQuestions(String),

    /// A result already exists for this (student, test) pair.
    #[error("student {student_id} already attempted test {test_id} (result {result_id})")]
    AlreadyAttempted {
        student_id: String,
        test_id: String,
        result_id: String,
    },

    /// A slot index outside `0..len`.
    #[error("slot {index} out of range (test has {len} questions)")]
    SlotOutOfRange { index: usize, len: usize },

    /// A submission for this session is still in flight.
    #[error("submission already in progress")]
    SubmissionPending,

    /// This session has already produced its result.
    #[error("session already submitted")]
    AlreadySubmitted,

    /// The countdown reached zero; answers can no longer change.
    #[error("time is up, answers are locked")]
    TimeExpired,

    /// The command stream closed before the session was submitted.
    #[error("session abandoned before submission")]
    Abandoned,

    /// The external store failed.
    #[error("store error: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl SessionError {
    /// Returns `true` if the session is still intact and the caller may retry.
    ///
    /// A store failure is retryable; a duplicate result surfaces as
    /// [`SessionError::AlreadyAttempted`] instead and is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Store(_) | SessionError::SubmissionPending)
    }

    /// The existing result to redirect to, for an `AlreadyAttempted` error.
    pub fn existing_result_id(&self) -> Option<&str> {
        match self {
            SessionError::AlreadyAttempted { result_id, .. } => Some(result_id),
            _ => None,
        }
    }
}

/// Failure to persist a result.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store already holds a result for this (student, test) pair.
    /// Retrying can never succeed.
    #[error("result already stored for student {student_id}, test {test_id}")]
    Duplicate {
        student_id: String,
        test_id: String,
        existing_id: Option<String>,
    },

    /// Any other failure, assumed transient.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
