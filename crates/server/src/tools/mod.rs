//! MCP tool implementations.
//!
//! Each tool drives one worker entry point: fetch, message, notification
//! click, or cache inspection.

pub mod cache;
pub mod fetch;
pub mod message;
pub mod notification;

#[cfg(test)]
pub(crate) mod testing;
