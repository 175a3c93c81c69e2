//! # OneDrive Provider
//!
//! Implements the `BlobStore` trait for the Microsoft Graph API (OneDrive).
//!
//! ## Overview
//!
//! This module provides:
//! - Document lookup by drive-relative path
//! - Create-if-absent with `conflictBehavior=fail`
//! - Whole-document reads and writes by item id
//! - Optimistic concurrency via `eTag` / `If-Match`
//! - Classification of Graph status codes into `BridgeError` variants

pub mod connector;
pub mod error;
pub mod types;

pub use connector::OneDriveConnector;
pub use error::{OneDriveError, Result};
