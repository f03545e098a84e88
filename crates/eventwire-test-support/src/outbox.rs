//! Test repositories — mock `OutboxRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use eventwire_core::error::OutboxError;
use eventwire_core::outbox::{OutboxMessage, OutboxRepository};

/// An outbox repository that records every `append` call and always
/// succeeds.
#[derive(Debug, Default)]
pub struct RecordingOutboxRepository {
    appended: Mutex<Vec<Vec<OutboxMessage>>>,
}

impl RecordingOutboxRepository {
    /// Create an empty recording repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every batch that was appended, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_batches(&self) -> Vec<Vec<OutboxMessage>> {
        self.appended.lock().unwrap().clone()
    }

    /// Returns every appended message, flattened across batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_messages(&self) -> Vec<OutboxMessage> {
        self.appended.lock().unwrap().concat()
    }
}

#[async_trait]
impl OutboxRepository for RecordingOutboxRepository {
    async fn append(&self, messages: &[OutboxMessage]) -> Result<(), OutboxError> {
        self.appended.lock().unwrap().push(messages.to_vec());
        Ok(())
    }
}

/// An outbox repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingOutboxRepository;

#[async_trait]
impl OutboxRepository for FailingOutboxRepository {
    async fn append(&self, _messages: &[OutboxMessage]) -> Result<(), OutboxError> {
        Err(OutboxError::Infrastructure("connection refused".into()))
    }
}
