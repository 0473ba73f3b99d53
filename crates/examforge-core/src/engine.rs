//! Session engine orchestrator.
//!
//! Guards session start against repeat attempts, resolves the test and its
//! questions, and hands out an [`ActiveSession`] that owns the slot state,
//! the countdown, and the one-shot submission path. Reports for a student are
//! built here too, from stored results and freshly-resolved questions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{PersistError, SessionError};
use crate::model::{Answer, BoundQuestion, QuestionDefinition, TestDefinition};
use crate::results::{SubmissionKind, TestResult};
use crate::session::{PaletteEntry, Session, StatusCounts};
use crate::statistics::{aggregate_results, CombinedReportData};
use crate::submission::{assemble_result, SubmissionInput};
use crate::timer::{Countdown, CountdownTimer};
use crate::traits::{QuestionBank, ResultStore, TestCatalog};

/// Configuration for the session engine.
#[derive(Debug, Clone)]
pub struct SessionEngineConfig {
    /// How often the countdown ticks one second off. One second in production.
    ///
    /// Anything else is a simulation knob: the session runs on test seconds,
    /// so `time_spent_seconds` counts ticks and is no longer wall-clock time.
    pub tick_interval: Duration,
}

impl Default for SessionEngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// A discrete student action, processed one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Navigate(usize),
    Next,
    Previous,
    /// Store an answer on a specific slot.
    Capture(usize, Answer),
    /// Raw input for the current slot, interpreted by its question type.
    Respond(String),
    /// Clear the current slot.
    Clear,
    /// Flip the review flag of the current slot.
    ToggleReview,
    Submit,
}

/// Observer hooks for presentation layers.
pub trait SessionObserver: Send + Sync {
    fn on_update(&self, session: &ActiveSession);
    fn on_rejected(&self, command: &SessionCommand, reason: &str);
    fn on_time_expired(&self, session: &ActiveSession);
    fn on_submit_failed(&self, error: &SessionError);
    fn on_submitted(&self, result: &TestResult);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_update(&self, _: &ActiveSession) {}
    fn on_rejected(&self, _: &SessionCommand, _: &str) {}
    fn on_time_expired(&self, _: &ActiveSession) {}
    fn on_submit_failed(&self, _: &SessionError) {}
    fn on_submitted(&self, _: &TestResult) {}
}

/// The session engine.
pub struct SessionEngine {
    questions: Arc<dyn QuestionBank>,
    tests: Arc<dyn TestCatalog>,
    results: Arc<dyn ResultStore>,
    config: SessionEngineConfig,
}

impl SessionEngine {
    pub fn new(
        questions: Arc<dyn QuestionBank>,
        tests: Arc<dyn TestCatalog>,
        results: Arc<dyn ResultStore>,
        config: SessionEngineConfig,
    ) -> Self {
        Self {
            questions,
            tests,
            results,
            config,
        }
    }

    /// Start a session for (student, test).
    ///
    /// Fails before any slot exists if a result is already stored for the
    /// pair, if the test or one of its questions cannot be resolved, or if the
    /// test binds no questions.
    pub async fn start(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<ActiveSession, SessionError> {
        if let Some(existing) = self
            .results
            .find_existing_result(student_id, test_id)
            .await
            .map_err(SessionError::Store)?
        {
            tracing::info!(
                student_id,
                test_id,
                result_id = %existing.id,
                "test already attempted, refusing new session"
            );
            return Err(SessionError::AlreadyAttempted {
                student_id: student_id.to_string(),
                test_id: test_id.to_string(),
                result_id: existing.id,
            });
        }

        let test = self
            .tests
            .resolve_test(test_id)
            .await
            .map_err(SessionError::Store)?
            .ok_or_else(|| SessionError::TestNotFound(test_id.to_string()))?;

        let bindings: Vec<_> = test.ordered_bindings().into_iter().cloned().collect();
        if bindings.is_empty() {
            return Err(SessionError::NoQuestions(test.id.clone()));
        }

        let definitions = try_join_all(
            bindings
                .iter()
                .map(|b| self.questions.resolve_question(&b.question_id)),
        )
        .await
        .map_err(SessionError::Store)?;

        let questions = bindings
            .into_iter()
            .zip(definitions)
            .map(|(binding, definition)| match definition {
                Some(definition) => Ok(BoundQuestion {
                    binding,
                    definition,
                }),
                None => Err(SessionError::QuestionNotFound(binding.question_id)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let session = Session::new(
            &test.id,
            questions.iter().map(|q| {
                (
                    q.binding.question_id.clone(),
                    q.binding.section_id.clone(),
                )
            }),
        )?;

        let timer = CountdownTimer::start(
            Countdown::from_minutes(test.duration_minutes),
            self.config.tick_interval,
        );

        let id = Uuid::new_v4();
        tracing::info!(
            session_id = %id,
            student_id,
            test_id,
            questions = questions.len(),
            duration_minutes = test.duration_minutes,
            "session started"
        );

        Ok(ActiveSession {
            id,
            student_id: student_id.to_string(),
            test,
            questions,
            session,
            timer,
            tick_interval: self.config.tick_interval,
            started_at: Instant::now(),
            store: Arc::clone(&self.results),
            state: SubmissionState::Open,
        })
    }

    /// Combined statistics over every result a student has submitted.
    pub async fn student_report(&self, student_id: &str) -> anyhow::Result<CombinedReportData> {
        let results = self.results.fetch_results_for_student(student_id).await?;
        let questions = self.resolve_questions_for(&results).await?;
        Ok(aggregate_results(&results, &questions))
    }

    /// Statistics for one stored attempt.
    pub async fn attempt_report(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> anyhow::Result<Option<CombinedReportData>> {
        let Some(result) = self
            .results
            .find_existing_result(student_id, test_id)
            .await?
        else {
            return Ok(None);
        };
        let results = vec![result];
        let questions = self.resolve_questions_for(&results).await?;
        Ok(Some(aggregate_results(&results, &questions)))
    }

    /// Resolve every distinct question referenced by `results`.
    ///
    /// Missing questions are simply absent from the map.
    async fn resolve_questions_for(
        &self,
        results: &[TestResult],
    ) -> anyhow::Result<HashMap<String, QuestionDefinition>> {
        let ids: BTreeSet<&str> = results
            .iter()
            .flat_map(|r| r.responses.iter().map(|resp| resp.question_id.as_str()))
            .collect();

        let resolved = try_join_all(ids.iter().map(|id| self.questions.resolve_question(id))).await?;

        Ok(resolved
            .into_iter()
            .flatten()
            .map(|q| (q.id.clone(), q))
            .collect())
    }
}

/// Submission re-entrancy guard.
#[derive(Debug)]
enum SubmissionState {
    Open,
    Pending,
    /// The countdown forced a submission that did not persist. The snapshot
    /// taken at zero is the only thing a retry may store.
    Expired(Box<TestResult>),
    Submitted,
    /// Another session stored a result for the pair first.
    Superseded { result_id: String },
}

/// A test attempt in progress.
pub struct ActiveSession {
    id: Uuid,
    student_id: String,
    test: TestDefinition,
    questions: Vec<BoundQuestion>,
    session: Session,
    timer: CountdownTimer,
    tick_interval: Duration,
    started_at: Instant,
    store: Arc<dyn ResultStore>,
    state: SubmissionState,
}

impl ActiveSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Question bound to slot `index`.
    pub fn question(&self, index: usize) -> Option<&BoundQuestion> {
        self.questions.get(index)
    }

    pub fn current_question(&self) -> &BoundQuestion {
        &self.questions[self.session.current_index()]
    }

    pub fn palette(&self) -> Vec<PaletteEntry> {
        self.session.palette()
    }

    pub fn status_counts(&self) -> StatusCounts {
        self.session.status_counts()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining()
    }

    /// Observe the countdown as it ticks.
    pub fn remaining_watch(&self) -> watch::Receiver<u64> {
        self.timer.subscribe()
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.state, SubmissionState::Submitted)
    }

    /// True once the countdown has run out, whether or not it was observed.
    pub fn is_expired(&self) -> bool {
        matches!(self.state, SubmissionState::Expired(_))
            || self.elapsed_wall_clock().as_secs() >= self.test.duration_seconds()
    }

    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.session.navigate(index)
    }

    pub fn capture_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.session.capture_answer(index, answer)
    }

    pub fn clear_answer(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        self.session.clear_answer(index)
    }

    pub fn toggle_review(&mut self, index: usize) -> Result<bool, SessionError> {
        self.ensure_editable()?;
        self.session.toggle_review(index)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        match &self.state {
            SubmissionState::Open => Ok(()),
            SubmissionState::Pending => Err(SessionError::SubmissionPending),
            SubmissionState::Expired(_) => Err(SessionError::TimeExpired),
            SubmissionState::Submitted => Err(SessionError::AlreadySubmitted),
            SubmissionState::Superseded { result_id } => Err(SessionError::AlreadyAttempted {
                student_id: self.student_id.clone(),
                test_id: self.test.id.clone(),
                result_id: result_id.clone(),
            }),
        }
    }

    /// Slots may change only while open and before the deadline.
    fn ensure_editable(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.is_expired() {
            return Err(SessionError::TimeExpired);
        }
        Ok(())
    }

    /// Apply one non-submit command. Returns a reason when the command was ignored.
    fn apply(&mut self, command: &SessionCommand) -> Result<(), String> {
        let current = self.session.current_index();
        let outcome = match command {
            SessionCommand::Navigate(index) => self.navigate(*index),
            SessionCommand::Next => {
                self.ensure_editable().map(|_| {
                    self.session.next();
                })
            }
            SessionCommand::Previous => {
                self.ensure_editable().map(|_| {
                    self.session.previous();
                })
            }
            SessionCommand::Capture(index, answer) => self.capture_answer(*index, answer.clone()),
            SessionCommand::Respond(text) => {
                let kind = self.current_question().definition.kind();
                match Answer::parse(kind, text)? {
                    Some(answer) => self.capture_answer(current, answer),
                    None => self.clear_answer(current),
                }
            }
            SessionCommand::Clear => self.clear_answer(current),
            SessionCommand::ToggleReview => self.toggle_review(current).map(|_| ()),
            SessionCommand::Submit => return Err("submit is handled by the event loop".into()),
        };
        outcome.map_err(|e| e.to_string())
    }

    /// Submit the attempt.
    ///
    /// Cancels the countdown first, so at most one submission is ever started
    /// from the timer. On a transient store failure the guard is released and
    /// the caller may submit again: a manual attempt keeps its answers open
    /// until the deadline, while a timed-out attempt keeps the snapshot taken
    /// at zero and every retry stores exactly that snapshot. A duplicate in
    /// the store ends the session with [`SessionError::AlreadyAttempted`].
    pub async fn submit(&mut self, kind: SubmissionKind) -> Result<TestResult, SessionError> {
        let mut result = match &self.state {
            SubmissionState::Expired(snapshot) => (**snapshot).clone(),
            _ => {
                self.ensure_open()?;
                self.timer.cancel();
                // past the deadline only a forced submission is possible
                let kind = if self.is_expired() {
                    SubmissionKind::TimedOut
                } else {
                    kind
                };
                assemble_result(SubmissionInput {
                    student_id: &self.student_id,
                    test_id: &self.test.id,
                    questions: &self.questions,
                    session: &self.session,
                    elapsed: self.elapsed_wall_clock(),
                    duration: Duration::from_secs(self.test.duration_seconds()),
                    kind,
                })
            }
        };
        self.state = SubmissionState::Pending;

        match self.store.persist_result(&result).await {
            Ok(result_id) => {
                result.id = result_id;
                self.state = SubmissionState::Submitted;
                tracing::info!(
                    session_id = %self.id,
                    result_id = %result.id,
                    submission = %result.submission,
                    correct = result.totals.correct,
                    marks = result.totals.marks_obtained,
                    "session submitted"
                );
                Ok(result)
            }
            Err(PersistError::Duplicate { existing_id, .. }) => {
                let result_id = existing_id.unwrap_or_else(|| "unknown".to_string());
                tracing::warn!(
                    session_id = %self.id,
                    result_id = %result_id,
                    "result already stored for this attempt, closing session"
                );
                self.state = SubmissionState::Superseded {
                    result_id: result_id.clone(),
                };
                Err(SessionError::AlreadyAttempted {
                    student_id: self.student_id.clone(),
                    test_id: self.test.id.clone(),
                    result_id,
                })
            }
            Err(PersistError::Failed(e)) => {
                tracing::error!(session_id = %self.id, "failed to persist result: {e:#}");
                self.state = match result.submission {
                    SubmissionKind::TimedOut => SubmissionState::Expired(Box::new(result)),
                    SubmissionKind::Manual => SubmissionState::Open,
                };
                Err(SessionError::Store(e))
            }
        }
    }

    /// Elapsed time in real seconds, scaled when the countdown runs at a
    /// non-standard tick interval.
    fn elapsed_wall_clock(&self) -> Duration {
        let elapsed = self.started_at.elapsed();
        if self.tick_interval == Duration::from_secs(1) || self.tick_interval.is_zero() {
            return elapsed;
        }
        let ticks = elapsed.as_secs_f64() / self.tick_interval.as_secs_f64();
        Duration::from_secs_f64(ticks)
    }

    /// Drive the session from a command stream until it is submitted.
    ///
    /// Commands and the countdown are handled one event at a time. A `Submit`
    /// command submits manually; the countdown reaching zero forces a
    /// submission. Failed submissions are reported to the observer and the
    /// loop keeps running so a later `Submit` can retry. Returns
    /// [`SessionError::Abandoned`] if the stream ends first.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        observer: &dyn SessionObserver,
    ) -> Result<TestResult, SessionError> {
        observer.on_update(&self);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::warn!(session_id = %self.id, "command stream closed before submission");
                        self.timer.cancel();
                        return Err(SessionError::Abandoned);
                    };

                    if command == SessionCommand::Submit {
                        match self.submit(SubmissionKind::Manual).await {
                            Ok(result) => {
                                observer.on_submitted(&result);
                                return Ok(result);
                            }
                            Err(e) if e.is_recoverable() => observer.on_submit_failed(&e),
                            Err(e) => return Err(e),
                        }
                        continue;
                    }

                    match self.apply(&command) {
                        Ok(()) => observer.on_update(&self),
                        Err(reason) => {
                            tracing::warn!(session_id = %self.id, ?command, "command ignored: {reason}");
                            observer.on_rejected(&command, &reason);
                        }
                    }
                }
                _ = self.timer.expired() => {
                    tracing::info!(session_id = %self.id, "time expired, forcing submission");
                    observer.on_time_expired(&self);
                    match self.submit(SubmissionKind::TimedOut).await {
                        Ok(result) => {
                            observer.on_submitted(&result);
                            return Ok(result);
                        }
                        Err(e) if e.is_recoverable() => observer.on_submit_failed(&e),
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("id", &self.id)
            .field("student_id", &self.student_id)
            .field("test_id", &self.test.id)
            .field("current", &self.session.current_index())
            .field("remaining", &self.timer.remaining())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::model::{AnswerKey, TestQuestionBinding};

    /// Catalog + store double with optional persist failures.
    #[derive(Default)]
    struct Fixture {
        questions: HashMap<String, QuestionDefinition>,
        tests: HashMap<String, TestDefinition>,
        results: Mutex<Vec<TestResult>>,
        persist_calls: AtomicU32,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl QuestionBank for Fixture {
        async fn resolve_question(&self, id: &str) -> anyhow::Result<Option<QuestionDefinition>> {
            Ok(self.questions.get(id).cloned())
        }
    }

    #[async_trait]
    impl TestCatalog for Fixture {
        async fn resolve_test(&self, id: &str) -> anyhow::Result<Option<TestDefinition>> {
            Ok(self.tests.get(id).cloned())
        }
    }

    #[async_trait]
    impl ResultStore for Fixture {
        async fn find_existing_result(
            &self,
            student_id: &str,
            test_id: &str,
        ) -> anyhow::Result<Option<TestResult>> {
            Ok(self
                .results
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.student_id == student_id && r.test_id == test_id)
                .cloned())
        }

        async fn persist_result(&self, result: &TestResult) -> Result<String, PersistError> {
            self.persist_calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(anyhow::anyhow!("network unreachable").into());
            }
            let mut results = self.results.lock().unwrap();
            if let Some(existing) = results
                .iter()
                .find(|r| r.student_id == result.student_id && r.test_id == result.test_id)
            {
                return Err(PersistError::Duplicate {
                    student_id: result.student_id.clone(),
                    test_id: result.test_id.clone(),
                    existing_id: Some(existing.id.clone()),
                });
            }
            results.push(result.clone());
            Ok(result.id.clone())
        }

        async fn fetch_results_for_student(
            &self,
            student_id: &str,
        ) -> anyhow::Result<Vec<TestResult>> {
            Ok(self
                .results
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.student_id == student_id)
                .cloned()
                .collect())
        }
    }

    fn fixture(question_ids: &[&str]) -> Arc<Fixture> {
        let mut f = Fixture::default();
        for id in question_ids {
            f.questions.insert(
                id.to_string(),
                QuestionDefinition {
                    id: id.to_string(),
                    prompt: format!("prompt {id}"),
                    options: vec!["a".into(), "b".into(), "c".into()],
                    answer: AnswerKey::Single(1),
                    marks: 4.0,
                    penalty: 1.0,
                    subject: Some("Maths".into()),
                    topic: None,
                    subtopic: None,
                },
            );
        }
        f.tests.insert(
            "t1".into(),
            TestDefinition {
                id: "t1".into(),
                title: "Test one".into(),
                duration_minutes: 1,
                bindings: question_ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| TestQuestionBinding {
                        question_id: id.to_string(),
                        position: i as u32,
                        section_id: None,
                        subsection_id: None,
                        marks: None,
                        negative_marks: None,
                    })
                    .collect(),
                sections: vec![],
            },
        );
        Arc::new(f)
    }

    fn engine(f: &Arc<Fixture>) -> SessionEngine {
        SessionEngine::new(f.clone(), f.clone(), f.clone(), SessionEngineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn start_builds_slots_in_binding_order() {
        let f = fixture(&["q1", "q2"]);
        let active = engine(&f).start("s1", "t1").await.unwrap();
        assert_eq!(active.session().len(), 2);
        assert_eq!(active.current_question().definition.id, "q1");
        assert_eq!(active.remaining_seconds(), 60);
        assert_eq!(active.status_counts().total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_unknown_test_and_question() {
        let f = fixture(&["q1"]);
        let err = engine(&f).start("s1", "nope").await.unwrap_err();
        assert!(matches!(err, SessionError::TestNotFound(_)));

        let mut broken = Fixture::default();
        broken.tests = f.tests.clone();
        let broken = Arc::new(broken);
        let err = engine(&broken).start("s1", "t1").await.unwrap_err();
        assert!(matches!(err, SessionError::QuestionNotFound(ref id) if id == "q1"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_empty_test() {
        let f = fixture(&[]);
        let err = engine(&f).start("s1", "t1").await.unwrap_err();
        assert!(matches!(err, SessionError::NoQuestions(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_attempt_is_rejected() {
        let f = fixture(&["q1"]);
        let e = engine(&f);
        let mut active = e.start("s1", "t1").await.unwrap();
        let first = active.submit(SubmissionKind::Manual).await.unwrap();

        let err = e.start("s1", "t1").await.unwrap_err();
        assert_eq!(err.existing_result_id(), Some(first.id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_twice_is_rejected() {
        let f = fixture(&["q1"]);
        let mut active = engine(&f).start("s1", "t1").await.unwrap();
        active.submit(SubmissionKind::Manual).await.unwrap();
        let err = active.submit(SubmissionKind::Manual).await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadySubmitted));
        assert!(matches!(
            active.capture_answer(0, Answer::Choice(1)),
            Err(SessionError::AlreadySubmitted)
        ));
        assert_eq!(f.persist_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submit_keeps_answers_for_retry() {
        let f = fixture(&["q1", "q2"]);
        f.failures_left.store(1, Ordering::SeqCst);
        let mut active = engine(&f).start("s1", "t1").await.unwrap();
        active.capture_answer(0, Answer::Choice(1)).unwrap();

        let err = active.submit(SubmissionKind::Manual).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(!active.is_submitted());
        assert!(active.session().slots()[0].answer.is_some());

        let result = active.submit(SubmissionKind::Manual).await.unwrap();
        assert_eq!(result.totals.correct, 1);
        assert_eq!(f.persist_calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.results.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn answers_lock_at_deadline_after_failed_submit() {
        let f = fixture(&["q1", "q2"]);
        f.failures_left.store(1, Ordering::SeqCst);
        let mut active = engine(&f).start("s1", "t1").await.unwrap();
        active.capture_answer(0, Answer::Choice(1)).unwrap();
        assert!(active.submit(SubmissionKind::Manual).await.is_err());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(active.is_expired());
        assert!(matches!(
            active.capture_answer(1, Answer::Choice(1)),
            Err(SessionError::TimeExpired)
        ));
        assert!(active.apply(&SessionCommand::Next).is_err());

        let result = active.submit(SubmissionKind::Manual).await.unwrap();
        assert_eq!(result.submission, SubmissionKind::TimedOut);
        assert_eq!(result.totals.correct, 1);
        assert_eq!(result.totals.not_answered, 1);
        assert_eq!(result.time_spent_seconds, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_duplicate_ends_the_session() {
        let f = fixture(&["q1"]);
        let e = engine(&f);
        let mut first = e.start("s1", "t1").await.unwrap();
        let second = e.start("s1", "t1").await.unwrap();
        let stored = first.submit(SubmissionKind::Manual).await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionCommand::Submit).await.unwrap();
        tx.send(SessionCommand::Submit).await.unwrap();

        let err = second.run(rx, &NoopObserver).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(err.existing_result_id(), Some(stored.id.as_str()));
        assert_eq!(f.persist_calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.results.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_forces_single_submission() {
        let f = fixture(&["q1", "q2"]);
        let active = engine(&f).start("s1", "t1").await.unwrap();
        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionCommand::Respond("1".into())).await.unwrap();

        let result = active.run(rx, &NoopObserver).await.unwrap();
        assert_eq!(result.submission, SubmissionKind::TimedOut);
        assert_eq!(result.totals.correct, 1);
        assert_eq!(result.totals.not_answered, 1);
        assert_eq!(result.time_spent_seconds, 60);
        assert_eq!(f.persist_calls.load(Ordering::SeqCst), 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_commands_abandons_session() {
        let f = fixture(&["q1"]);
        let active = engine(&f).start("s1", "t1").await.unwrap();
        let (tx, rx) = mpsc::channel(8);
        drop(tx);
        let err = active.run(rx, &NoopObserver).await.unwrap_err();
        assert!(matches!(err, SessionError::Abandoned));
        assert_eq!(f.persist_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_choice_input_is_ignored() {
        let f = fixture(&["q1"]);
        let mut active = engine(&f).start("s1", "t1").await.unwrap();
        assert!(active.apply(&SessionCommand::Respond("b".into())).is_err());
        assert!(active.session().current().answer.is_none());
        assert!(active.apply(&SessionCommand::Navigate(5)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn student_report_covers_all_attempts() {
        let f = fixture(&["q1", "q2"]);
        let e = engine(&f);
        let mut active = e.start("s1", "t1").await.unwrap();
        active.capture_answer(0, Answer::Choice(1)).unwrap();
        active.capture_answer(1, Answer::Choice(0)).unwrap();
        active.submit(SubmissionKind::Manual).await.unwrap();

        let report = e.student_report("s1").await.unwrap();
        assert_eq!(report.overall.total, 2);
        assert_eq!(report.overall.correct, 1);
        assert_eq!(report.by_subject[0].subject.as_deref(), Some("Maths"));

        let attempt = e.attempt_report("s1", "t1").await.unwrap().unwrap();
        assert_eq!(attempt, report);
        assert!(e.attempt_report("s2", "t1").await.unwrap().is_none());
    }
}
