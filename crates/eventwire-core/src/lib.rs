//! eventwire Core — shared event and outbox abstractions.
//!
//! This crate defines the types every other eventwire crate agrees on:
//! the event envelope, domain event metadata, error kinds and the outbox
//! port. It contains no encoding logic and no infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod outbox;
