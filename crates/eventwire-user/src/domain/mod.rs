//! Domain layer: event payloads and their wire schemas.

pub mod events;
pub mod schemas;
