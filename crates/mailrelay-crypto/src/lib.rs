//! Cryptography utilities for Mailrelay

pub mod hash;

pub use hash::*;
