//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`). Host applications can depend on
//! `calendar-workspace` and enable `desktop-shims` to get the reqwest-backed
//! HTTP bridge and the OneDrive provider without wiring each crate by hand.

#[cfg(feature = "desktop-shims")]
pub use core_service::{CalendarCommands, CalendarService};
