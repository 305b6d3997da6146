//! Core types and shared functionality for the TuneVerse offline layer.
//!
//! This crate provides:
//! - Request/response model and request identity
//! - Cache stores with a SQLite backend and versioned tier names
//! - Request classification and fallback synthesis
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod origin;

pub use cache::{CacheDb, CacheStorage, Generation, Tier};
pub use classify::{RequestClass, Route, Strategy};
pub use config::AppConfig;
pub use error::Error;
pub use fallback::FallbackSynthesizer;
pub use http::{Destination, Headers, Method, Request, RequestMode, Response, ResponseType};
