//! # Authentication Module
//!
//! Bearer-token capability consumed by the event store.
//!
//! ## Overview
//!
//! Signing in and refreshing credentials happen outside the core (in the
//! host's identity/session library). The core only needs a way to ask "what
//! token should I present right now?", expressed as the [`TokenSource`]
//! trait and injected at construction time. No ambient session state exists.
//!
//! ## Features
//!
//! - [`StaticTokenSource`] for hosts that already hold a fresh token (CLI, tests)
//! - [`RefreshingTokenSource`] that asks a host-provided [`TokenRefresher`] for
//!   new tokens shortly before expiry, serialising concurrent refreshes
//! - Token types whose `Debug` output never reveals secrets

pub mod error;
pub mod source;
pub mod types;

pub use error::{AuthError, Result};
pub use source::{RefreshingTokenSource, StaticTokenSource, TokenRefresher, TokenSource};
pub use types::{AccessToken, OAuthTokens};
