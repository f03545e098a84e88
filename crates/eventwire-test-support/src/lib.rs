//! Shared test mocks and utilities for the eventwire codec.

mod clock;
mod outbox;
mod rng;
mod tracing;

pub use clock::FixedClock;
pub use outbox::{FailingOutboxRepository, RecordingOutboxRepository};
pub use rng::{random_millis_timestamp, random_text, seeded_rng};
pub use tracing::init_test_tracing;
