//! Collaborator contracts consumed by the session engine.
//!
//! Question and test records are authored and stored elsewhere; results are
//! persisted elsewhere. The `examforge-store` crate provides in-memory and
//! file-backed implementations.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::PersistError;
use crate::model::{QuestionDefinition, TestDefinition};
use crate::results::TestResult;

// ---------------------------------------------------------------------------
// Question bank
// ---------------------------------------------------------------------------

/// Resolves question identifiers to their definitions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// `Ok(None)` when no such question exists.
    async fn resolve_question(&self, id: &str) -> anyhow::Result<Option<QuestionDefinition>>;
}

// ---------------------------------------------------------------------------
// Test catalog
// ---------------------------------------------------------------------------

/// Resolves test identifiers to their definitions.
#[async_trait]
pub trait TestCatalog: Send + Sync {
    /// `Ok(None)` when no such test exists.
    async fn resolve_test(&self, id: &str) -> anyhow::Result<Option<TestDefinition>>;
}

// ---------------------------------------------------------------------------
// Result store
// ---------------------------------------------------------------------------

/// Persists and retrieves submitted results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// The result for a (student, test) pair, if one was ever persisted.
    async fn find_existing_result(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> anyhow::Result<Option<TestResult>>;

    /// Persist a result and return its identifier.
    ///
    /// There is no partial write. A result already stored for the pair is
    /// reported as [`PersistError::Duplicate`]; every other failure is taken
    /// to be transient.
    async fn persist_result(&self, result: &TestResult) -> Result<String, PersistError>;

    /// Every result a student has submitted.
    async fn fetch_results_for_student(&self, student_id: &str)
        -> anyhow::Result<Vec<TestResult>>;
}

// ---------------------------------------------------------------------------
// Synchronous lookup for aggregation
// ---------------------------------------------------------------------------

/// Already-resolved question definitions, keyed by id.
///
/// The aggregation engine is synchronous and side-effect free, so it reads
/// questions through this trait rather than the async [`QuestionBank`].
pub trait QuestionLookup {
    fn lookup(&self, id: &str) -> Option<&QuestionDefinition>;
}

impl QuestionLookup for HashMap<String, QuestionDefinition> {
    fn lookup(&self, id: &str) -> Option<&QuestionDefinition> {
        self.get(id)
    }
}

impl QuestionLookup for [QuestionDefinition] {
    fn lookup(&self, id: &str) -> Option<&QuestionDefinition> {
        self.iter().find(|q| q.id == id)
    }
}

impl QuestionLookup for Vec<QuestionDefinition> {
    fn lookup(&self, id: &str) -> Option<&QuestionDefinition> {
        self.as_slice().lookup(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerKey;

    fn question(id: &str) -> QuestionDefinition {
        QuestionDefinition {
            id: id.into(),
            prompt: String::new(),
            options: vec![],
            answer: AnswerKey::Numeric("1".into()),
            marks: 1.0,
            penalty: 0.0,
            subject: None,
            topic: None,
            subtopic: None,
        }
    }

    #[test]
    fn lookup_over_map_and_vec() {
        let list = vec![question("a"), question("b")];
        assert!(list.lookup("b").is_some());
        assert!(list.lookup("c").is_none());

        let map: HashMap<String, QuestionDefinition> =
            list.into_iter().map(|q| (q.id.clone(), q)).collect();
        assert_eq!(map.lookup("a").map(|q| q.id.as_str()), Some("a"));
    }
}
