//! eventwire — User bounded context.
//!
//! Defines the payloads of every User aggregate event, the versioned
//! schemas they are encoded with, and the application services that turn
//! events into outbox messages and back.

pub mod application;
pub mod domain;
