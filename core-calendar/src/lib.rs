//! # Calendar Core
//!
//! Event model, document codec, and the remote event store.
//!
//! ## Overview
//!
//! All events of a calendar live in a single JSON document on the user's
//! cloud drive. [`RemoteEventStore`] lists, adds, and removes events in that
//! document, using version-conditional writes (or an id-set comparison where
//! the blob store has no such primitive) so that concurrent edits from other
//! devices are detected instead of overwritten.
//!
//! ## Modules
//!
//! - [`models`]: [`CalendarEvent`] and [`EventInput`]
//! - [`document`]: decoding and encoding of the stored document
//! - [`store`]: the event store itself
//! - [`error`]: [`CalendarError`] and its user-facing classification

pub mod document;
pub mod error;
pub mod models;
pub mod retry;
pub mod store;

pub use document::EventDocument;
pub use error::{CalendarError, ErrorKind, Result};
pub use models::{CalendarEvent, EventDate, EventInput};
pub use store::{DocumentHandle, RemoteEventStore};
