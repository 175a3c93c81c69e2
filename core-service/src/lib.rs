//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP client, blob
//! store, token source) into the calendar core and exposes the command
//! interface presentation layers call. Desktop hosts typically enable the
//! `desktop-shims` feature, which brings in the reqwest-based HTTP client and
//! the OneDrive blob store.

pub mod error;

pub use error::{CoreError, Result};

use async_trait::async_trait;
use bridge_traits::storage::BlobStore;
use core_auth::TokenSource;
use core_calendar::{CalendarEvent, EventInput, RemoteEventStore};
use core_runtime::config::StoreSettings;
use std::sync::Arc;
use tracing::instrument;

#[cfg(feature = "desktop-shims")]
use core_runtime::config::CoreConfig;

/// Commands available to a presentation layer.
///
/// Errors carry a [`core_calendar::ErrorKind`] so the caller can pick
/// appropriate copy (sign in again, retry later, ...).
#[async_trait]
pub trait CalendarCommands: Send + Sync {
    async fn list_events(&self) -> core_calendar::Result<Vec<CalendarEvent>>;

    async fn create_event(&self, input: EventInput) -> core_calendar::Result<CalendarEvent>;

    async fn delete_event(&self, id: &str) -> core_calendar::Result<()>;
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CalendarService {
    store: Arc<RemoteEventStore>,
}

impl CalendarService {
    pub fn new(store: RemoteEventStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Build a service over an arbitrary blob store.
    pub fn with_blob_store(
        blobs: Arc<dyn BlobStore>,
        tokens: Arc<dyn TokenSource>,
        settings: StoreSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self::new(RemoteEventStore::new(blobs, tokens, settings)))
    }

    /// Access the underlying event store.
    pub fn store(&self) -> Arc<RemoteEventStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl CalendarCommands for CalendarService {
    #[instrument(skip(self))]
    async fn list_events(&self) -> core_calendar::Result<Vec<CalendarEvent>> {
        self.store.list().await
    }

    #[instrument(skip(self, input))]
    async fn create_event(&self, input: EventInput) -> core_calendar::Result<CalendarEvent> {
        self.store.add(input).await
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, id: &str) -> core_calendar::Result<()> {
        self.store.remove(id).await
    }
}

/// Convenience bootstrapper for desktop hosts backed by OneDrive.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use core_auth::StaticTokenSource;
/// use core_runtime::config::CoreConfig;
/// use core_service::{bootstrap_desktop, CalendarCommands};
/// use std::sync::Arc;
///
/// let config = CoreConfig::builder().build()?;
/// let calendar = bootstrap_desktop(config, Arc::new(StaticTokenSource::new("token")))?;
/// let events = calendar.list_events().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    config: CoreConfig,
    tokens: Arc<dyn TokenSource>,
) -> Result<CalendarService> {
    use provider_onedrive::OneDriveConnector;

    let connector = OneDriveConnector::new(Arc::clone(&config.http_client))
        .with_base_url(config.store.api_base_url.clone())
        .with_timeout(config.store.request_timeout);

    CalendarService::with_blob_store(Arc::new(connector), tokens, config.store)
}
