//! Event decoding and notification building
//!
//! - [`EventDecoder`] turns raw `event-data` bytes into an [`EventRecord`]
//! - [`build_notification`] maps an [`EventRecord`] to a [`NotificationMessage`]
//!
//! [`EventRecord`]: crate::types::EventRecord
//! [`NotificationMessage`]: crate::types::NotificationMessage

mod builder;
mod decoder;

pub use builder::build_notification;
pub use decoder::{DecodeError, EventDecoder, ParseFn};
