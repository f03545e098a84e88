//! Stages User events in the outbox.

use eventwire_core::error::OutboxError;
use eventwire_core::outbox::{OutboxMessage, OutboxRepository};
use uuid::Uuid;

use super::outbox::OutboxMessageFactory;
use crate::domain::events::UserEvent;

/// Builds one outbox message per event and appends them in a single call.
///
/// Messages are built before anything is appended, so an event that fails to
/// encode leaves the outbox untouched. An empty batch appends nothing.
///
/// # Errors
///
/// Returns `OutboxError::Codec` if any event cannot be encoded, or the
/// repository's error if the append fails.
pub async fn stage_user_events(
    events: &[UserEvent],
    correlation_id: Uuid,
    factory: &OutboxMessageFactory,
    repo: &dyn OutboxRepository,
) -> Result<Vec<OutboxMessage>, OutboxError> {
    let messages = events
        .iter()
        .map(|event| factory.create_message(event, correlation_id))
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Ok(messages);
    }

    repo.append(&messages).await?;
    tracing::info!(
        %correlation_id,
        count = messages.len(),
        "user events staged"
    );
    Ok(messages)
}
