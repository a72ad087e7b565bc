use crate::client::{ClientError, FailureKind};

/// Final classification of one single-entity operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Success,
    RateLimited,
    Conflict,
    NotFound,
    Failed,
}

impl From<FailureKind> for OperationStatus {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::RateLimited => Self::RateLimited,
            FailureKind::Conflict => Self::Conflict,
            FailureKind::NotFound => Self::NotFound,
            FailureKind::Other => Self::Failed,
        }
    }
}

/// An entity that ended a batch in the failed set, with the diagnostic of
/// its final attempt.
#[derive(Debug)]
pub struct FailedEntity<T> {
    pub entity: T,
    pub error: ClientError,
}

impl<T> FailedEntity<T> {
    pub fn status(&self) -> OperationStatus {
        self.error.kind.into()
    }
}

/// Aggregate outcome of one batch call.
///
/// Every input entity ends up in exactly one of the two sets exactly once,
/// regardless of how many retry rounds ran internally. The sets carry no
/// ordering guarantee.
#[derive(Debug, Default)]
pub struct BatchResult<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<FailedEntity<T>>,
}

impl<T> BatchResult<T> {
    pub fn empty() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Builds the result for an abandoned batch: every entity fails with
    /// the same classified cause.
    pub fn from_abandonment(entities: impl IntoIterator<Item = T>, cause: &ClientError) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: entities
                .into_iter()
                .map(|entity| FailedEntity {
                    entity,
                    error: cause.clone(),
                })
                .collect(),
        }
    }

    /// Total number of entities accounted for.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty()
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            OperationStatus::from(FailureKind::RateLimited),
            OperationStatus::RateLimited
        );
        assert_eq!(
            OperationStatus::from(FailureKind::Conflict),
            OperationStatus::Conflict
        );
        assert_eq!(
            OperationStatus::from(FailureKind::NotFound),
            OperationStatus::NotFound
        );
        assert_eq!(
            OperationStatus::from(FailureKind::Other),
            OperationStatus::Failed
        );
    }

    #[test]
    fn test_abandonment_marks_every_entity_failed() {
        let cause = ClientError::other("scaling call failed");
        let result = BatchResult::from_abandonment(vec![1, 2, 3], &cause);
        assert!(result.succeeded.is_empty());
        assert_eq!(result.failed.len(), 3);
        assert_eq!(result.len(), 3);
        assert!(!result.is_fully_successful());
        assert!(result.failed.iter().all(|f| f.status() == OperationStatus::Failed));
    }
}
