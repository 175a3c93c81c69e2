//! # Host Bridge Traits
//!
//! Capability traits the calendar core requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and the
//! platform-specific or provider-specific implementations it is wired to:
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with timeouts and bounded retry
//! - [`BlobStore`](storage::BlobStore) - Remote document storage addressed by path or id,
//!   with optional version-conditional writes
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! | Capability | Implementation |
//! |------------|----------------|
//! | `HttpClient` | `bridge-desktop::ReqwestHttpClient` |
//! | `BlobStore`  | `provider-onedrive::OneDriveConnector` |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map transport and status failures onto its variants so the core can
//! classify them (authentication, transient, conflict, storage) without
//! knowing which provider produced them.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! across concurrent async tasks.

pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{BlobHandle, BlobStore};
