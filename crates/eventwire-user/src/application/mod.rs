//! Application layer: outbox staging and inbound decoding.

pub mod config;
pub mod inbound;
pub mod outbox;
pub mod staging;
