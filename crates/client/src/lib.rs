//! Worker runtime for the TuneVerse offline layer.
//!
//! This crate provides the network client, the fetch strategies with their
//! timeout race, and the worker that dispatches fetch, lifecycle, control
//! message and notification events. It is shared by the host binary.

pub mod fetch;
pub mod lifetime;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchConfig, HttpNetwork, Incoming, Network};
pub use lifetime::Lifetime;
pub use strategy::{Race, Strategies, race};
pub use worker::{
    Broadcast, ClickOutcome, ControlMessage, InstallReport, LifecycleState, NotificationAction, NowPlaying,
    PendingMessage, Platform, Reply, ServiceWorker,
};
