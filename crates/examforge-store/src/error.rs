//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use examforge_core::error::PersistError;

/// Errors that can occur when reading or writing stored results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A result for this (student, test) pair is already stored.
    #[error("result already stored for student {student_id}, test {test_id}")]
    Duplicate {
        student_id: String,
        test_id: String,
        /// Id of the stored result, when it could be read.
        existing_id: Option<String>,
    },

    /// An identifier that cannot be used as a storage key.
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    /// A stored record could not be decoded.
    #[error("corrupt record at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store refused the operation for now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io { .. } | StoreError::Unavailable(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for PersistError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                student_id,
                test_id,
                existing_id,
            } => PersistError::Duplicate {
                student_id,
                test_id,
                existing_id,
            },
            other => PersistError::Failed(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::io("x", std::io::Error::other("disk")).is_transient());
        assert!(!StoreError::InvalidId("../x".into()).is_transient());
        assert!(!StoreError::Duplicate {
            student_id: "s".into(),
            test_id: "t".into(),
            existing_id: None,
        }
        .is_transient());
    }

    #[test]
    fn duplicates_stay_distinct_when_persisting() {
        let dup = PersistError::from(StoreError::Duplicate {
            student_id: "s".into(),
            test_id: "t".into(),
            existing_id: Some("r1".into()),
        });
        assert!(matches!(
            dup,
            PersistError::Duplicate { existing_id: Some(ref id), .. } if id == "r1"
        ));

        let other = PersistError::from(StoreError::Unavailable("down".into()));
        let PersistError::Failed(inner) = other else {
            panic!("expected a transient failure");
        };
        assert!(inner.downcast_ref::<StoreError>().unwrap().is_transient());
    }
}
