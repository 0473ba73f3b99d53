//! JSON-file result store.
//!
//! Each result lives at `<root>/<student_id>/<test_id>.json`. A result is
//! written to a temporary file first and then hard-linked into place, so a
//! reader never observes a partial record and an existing record is never
//! overwritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use examforge_core::error::PersistError;
use examforge_core::results::TestResult;
use examforge_core::traits::ResultStore;

use crate::error::StoreError;

/// Result store over a directory tree of JSON files.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    root: PathBuf,
}

impl FileResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn student_dir(&self, student_id: &str) -> Result<PathBuf, StoreError> {
        check_id(student_id)?;
        Ok(self.root.join(student_id))
    }

    fn result_path(&self, student_id: &str, test_id: &str) -> Result<PathBuf, StoreError> {
        check_id(test_id)?;
        Ok(self.student_dir(student_id)?.join(format!("{test_id}.json")))
    }

    async fn read_result(path: &Path) -> Result<Option<TestResult>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn write_result(&self, result: &TestResult) -> Result<(), StoreError> {
        let dir = self.student_dir(&result.student_id)?;
        let path = self.result_path(&result.student_id, &result.test_id)?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let json = serde_json::to_vec_pretty(result).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;

        let tmp = dir.join(format!(".{}.{}.tmp", result.test_id, Uuid::new_v4()));
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let existing_id = Self::read_result(&path).await.ok().flatten().map(|r| r.id);
                Err(StoreError::Duplicate {
                    student_id: result.student_id.clone(),
                    test_id: result.test_id.clone(),
                    existing_id,
                })
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

/// Identifiers become path components, so only a conservative character set is allowed.
fn check_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn find_existing_result(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> anyhow::Result<Option<TestResult>> {
        let path = self.result_path(student_id, test_id)?;
        Ok(Self::read_result(&path).await?)
    }

    async fn persist_result(&self, result: &TestResult) -> Result<String, PersistError> {
        self.write_result(result).await?;
        tracing::debug!(
            student_id = %result.student_id,
            test_id = %result.test_id,
            result_id = %result.id,
            "result written"
        );
        Ok(result.id.clone())
    }

    async fn fetch_results_for_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<TestResult>> {
        let dir = self.student_dir(student_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(&dir, e).into()),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }
            match Self::read_result(&path).await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e @ StoreError::Corrupt { .. }) => {
                    tracing::warn!("skipping {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        results.sort_by(|a, b| a.created_at.to_datetime().cmp(&b.created_at.to_datetime()));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::results::{ResultTotals, SubmissionKind};
    use examforge_core::timestamp::Timestamp;

    fn result(student: &str, test: &str, millis: i64) -> TestResult {
        TestResult {
            id: Uuid::new_v4().to_string(),
            test_id: test.into(),
            student_id: student.into(),
            responses: vec![],
            totals: ResultTotals::default(),
            time_spent_seconds: 42,
            submission: SubmissionKind::TimedOut,
            created_at: Timestamp::Millis(millis),
        }
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let r = result("alice", "mock-1", 1_000);

        let id = store.persist_result(&r).await.unwrap();
        assert_eq!(id, r.id);
        assert!(dir.path().join("alice").join("mock-1.json").exists());

        let found = store.find_existing_result("alice", "mock-1").await.unwrap();
        assert_eq!(found, Some(r));
        assert!(store
            .find_existing_result("alice", "mock-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn existing_record_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let first = result("alice", "mock-1", 1);
        store.persist_result(&first).await.unwrap();

        let err = store
            .persist_result(&result("alice", "mock-1", 2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistError::Duplicate { existing_id: Some(ref id), .. } if *id == first.id
        ));

        let kept = store.find_existing_result("alice", "mock-1").await.unwrap().unwrap();
        assert_eq!(kept.id, first.id);
        let leftovers = std::fs::read_dir(dir.path().join("alice")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn fetch_sorts_by_creation_and_skips_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        store.persist_result(&result("bob", "t2", 2_000)).await.unwrap();
        store.persist_result(&result("bob", "t1", 1_000)).await.unwrap();
        std::fs::write(dir.path().join("bob").join("t3.json"), "{ nope").unwrap();

        let results = store.fetch_results_for_student("bob").await.unwrap();
        let tests: Vec<_> = results.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(tests, vec!["t1", "t2"]);

        assert!(store.fetch_results_for_student("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsafe_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());

        for (student, test) in [("../evil", "t"), ("s", "a/b"), ("", "t"), ("s", ".hidden")] {
            let err = store
                .persist_result(&result(student, test, 0))
                .await
                .unwrap_err();
            let PersistError::Failed(err) = err else {
                panic!("invalid id reported as duplicate");
            };
            assert!(matches!(
                err.downcast_ref::<StoreError>(),
                Some(StoreError::InvalidId(_))
            ));
        }
    }
}
