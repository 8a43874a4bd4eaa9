//! Core types for Mailrelay

mod event;
mod notification;
mod signature;

pub use event::*;
pub use notification::*;
pub use signature::*;
