//! Vote Check: release vote validation for mailing list announcements.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod hook;
pub mod mail;
pub mod pipeline;
