//! In-memory catalog and result store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use examforge_core::error::PersistError;
use examforge_core::model::{QuestionDefinition, TestDefinition};
use examforge_core::parser::Catalog;
use examforge_core::results::TestResult;
use examforge_core::traits::{QuestionBank, QuestionLookup, ResultStore, TestCatalog};

use crate::error::StoreError;

/// Question bank and test catalog backed by a loaded [`Catalog`].
///
/// Later definitions with a duplicate id replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    questions: HashMap<String, QuestionDefinition>,
    tests: HashMap<String, TestDefinition>,
}

impl MemoryCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            questions: catalog
                .questions
                .into_iter()
                .map(|q| (q.id.clone(), q))
                .collect(),
            tests: catalog.tests.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Test ids in sorted order.
    pub fn test_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tests.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

impl From<Catalog> for MemoryCatalog {
    fn from(catalog: Catalog) -> Self {
        Self::new(catalog)
    }
}

#[async_trait]
impl QuestionBank for MemoryCatalog {
    async fn resolve_question(&self, id: &str) -> anyhow::Result<Option<QuestionDefinition>> {
        Ok(self.questions.get(id).cloned())
    }
}

#[async_trait]
impl TestCatalog for MemoryCatalog {
    async fn resolve_test(&self, id: &str) -> anyhow::Result<Option<TestDefinition>> {
        Ok(self.tests.get(id).cloned())
    }
}

impl QuestionLookup for MemoryCatalog {
    fn lookup(&self, id: &str) -> Option<&QuestionDefinition> {
        self.questions.get(id)
    }
}

/// A result store held in memory, for tests and demos.
///
/// Supports injecting transient persist failures.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<TestResult>>,
    persist_calls: AtomicU32,
    failures_pending: AtomicU32,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` persist calls with [`StoreError::Unavailable`].
    pub fn fail_next_persists(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Number of persist attempts, including failed ones.
    pub fn persist_calls(&self) -> u32 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// Seed a result directly, bypassing the duplicate check.
    pub fn insert(&self, result: TestResult) {
        self.lock().push(result);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TestResult>> {
        // a poisoned lock still holds consistent data: every write is a single push
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn find_existing_result(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> anyhow::Result<Option<TestResult>> {
        Ok(self
            .lock()
            .iter()
            .find(|r| r.student_id == student_id && r.test_id == test_id)
            .cloned())
    }

    async fn persist_result(&self, result: &TestResult) -> Result<String, PersistError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".into()).into());
        }

        let mut results = self.lock();
        if let Some(existing) = results
            .iter()
            .find(|r| r.student_id == result.student_id && r.test_id == result.test_id)
        {
            return Err(StoreError::Duplicate {
                student_id: result.student_id.clone(),
                test_id: result.test_id.clone(),
                existing_id: Some(existing.id.clone()),
            }
            .into());
        }
        results.push(result.clone());
        Ok(result.id.clone())
    }

    async fn fetch_results_for_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<TestResult>> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::model::AnswerKey;
    use examforge_core::results::{ResultTotals, SubmissionKind};
    use examforge_core::timestamp::Timestamp;

    fn result(student: &str, test: &str) -> TestResult {
        TestResult {
            id: format!("{student}-{test}"),
            test_id: test.into(),
            student_id: student.into(),
            responses: vec![],
            totals: ResultTotals::default(),
            time_spent_seconds: 0,
            submission: SubmissionKind::Manual,
            created_at: Timestamp::Millis(0),
        }
    }

    #[tokio::test]
    async fn persist_find_fetch() {
        let store = MemoryResultStore::new();
        assert_eq!(store.persist_result(&result("s1", "t1")).await.unwrap(), "s1-t1");
        store.persist_result(&result("s1", "t2")).await.unwrap();
        store.persist_result(&result("s2", "t1")).await.unwrap();

        assert!(store.find_existing_result("s1", "t1").await.unwrap().is_some());
        assert!(store.find_existing_result("s2", "t2").await.unwrap().is_none());
        assert_eq!(store.fetch_results_for_student("s1").await.unwrap().len(), 2);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_pair_is_rejected() {
        let store = MemoryResultStore::new();
        store.persist_result(&result("s1", "t1")).await.unwrap();
        let err = store.persist_result(&result("s1", "t1")).await.unwrap_err();
        assert!(matches!(
            err,
            PersistError::Duplicate { existing_id: Some(ref id), .. } if id == "s1-t1"
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_transient() {
        let store = MemoryResultStore::new();
        store.fail_next_persists(2);

        for _ in 0..2 {
            let err = store.persist_result(&result("s1", "t1")).await.unwrap_err();
            let PersistError::Failed(err) = err else {
                panic!("injected failure reported as duplicate");
            };
            assert!(err.downcast_ref::<StoreError>().unwrap().is_transient());
        }
        store.persist_result(&result("s1", "t1")).await.unwrap();
        assert_eq!(store.persist_calls(), 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn catalog_resolves_by_id() {
        let catalog = MemoryCatalog::new(Catalog {
            questions: vec![QuestionDefinition {
                id: "q1".into(),
                prompt: "?".into(),
                options: vec![],
                answer: AnswerKey::Numeric("3".into()),
                marks: 1.0,
                penalty: 0.0,
                subject: None,
                topic: None,
                subtopic: None,
            }],
            tests: vec![TestDefinition {
                id: "t1".into(),
                title: "T".into(),
                duration_minutes: 5,
                bindings: vec![],
                sections: vec![],
            }],
        });

        assert!(catalog.resolve_question("q1").await.unwrap().is_some());
        assert!(catalog.resolve_question("q2").await.unwrap().is_none());
        assert!(catalog.resolve_test("t1").await.unwrap().is_some());
        assert_eq!(catalog.test_ids(), vec!["t1"]);
        assert!(catalog.lookup("q1").is_some());
    }
}
