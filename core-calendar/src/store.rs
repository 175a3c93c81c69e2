//! Remote Event Store
//!
//! Keeps the whole calendar in one JSON document on a remote blob store and
//! applies every mutation as a guarded read-modify-write cycle.
//!
//! ## Concurrency
//!
//! Several devices may edit the same document. Each mutation:
//!
//! 1. reads the document version, then the content
//! 2. applies the change locally
//! 3. writes the whole document back, guarded by either
//!    - a version precondition (`If-Match`), when the blob store supports it, or
//!    - an id-set comparison against a fresh read just before the write
//! 4. on a detected conflict, waits a jittered backoff and starts over,
//!    up to `max_write_attempts` times
//!
//! The version is captured before the content so that a write landing in
//! between can only make the version stale, which shows up as a conflict
//! rather than a silently lost update.
//!
//! The id of a new event is fixed before the first attempt. If an earlier
//! attempt actually landed (for example a write that timed out on the client
//! but succeeded on the server), the next attempt finds the id already stored
//! and returns that record instead of appending a duplicate.
//!
//! ## Usage
//!
//! ```ignore
//! use core_calendar::{EventInput, RemoteEventStore};
//!
//! let store = RemoteEventStore::new(blob_store, token_source, settings);
//! let created = store.add(EventInput::new("Standup", date)).await?;
//! store.remove(&created.id).await?;
//! ```

use bridge_traits::error::BridgeError;
use bridge_traits::storage::{BlobHandle, BlobStore};
use bytes::Bytes;
use core_auth::{AccessToken, TokenSource};
use core_runtime::config::{ConcurrencyMode, StoreSettings};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn, Span};

use crate::document::EventDocument;
use crate::error::{CalendarError, Result};
use crate::models::{CalendarEvent, EventInput};
use crate::retry::Backoff;

/// Resolved location and current version of the calendar document.
pub type DocumentHandle = BlobHandle;

/// Document content together with the version it was read at.
#[derive(Debug, Clone)]
struct Snapshot {
    file_id: String,
    version: Option<String>,
    document: EventDocument,
}

/// Result of applying a change to a snapshot.
enum Mutation<T> {
    /// The document changed and must be written back
    Write(T),
    /// Nothing to write
    Unchanged(T),
}

pub struct RemoteEventStore {
    blobs: Arc<dyn BlobStore>,
    tokens: Arc<dyn TokenSource>,
    settings: StoreSettings,
    backoff: Backoff,

    /// Provider id of the document, once resolved. Content and version are
    /// never cached.
    file_id: Mutex<Option<String>>,
}

impl RemoteEventStore {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        tokens: Arc<dyn TokenSource>,
        settings: StoreSettings,
    ) -> Self {
        let backoff = Backoff::new(settings.backoff_base, settings.backoff_max);
        Self {
            blobs,
            tokens,
            settings,
            backoff,
            file_id: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Locate the calendar document, creating it empty if it does not exist.
    #[instrument(skip(self), fields(path = %self.settings.document_path))]
    pub async fn resolve_storage_location(&self) -> Result<DocumentHandle> {
        let token = self.token().await?;
        let mut refreshed = false;

        loop {
            let Some(id) = self.file_id(token.secret(), true).await? else {
                return Err(self.missing_document());
            };

            match self.blobs.metadata(&id, token.secret()).await {
                Ok(handle) => return Ok(handle),
                Err(BridgeError::NotFound(_)) if !refreshed => {
                    self.forget_location(&id).await;
                    refreshed = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Return every stored event.
    ///
    /// A missing document is created empty; malformed content fails with
    /// [`CalendarError::Decode`].
    #[instrument(skip(self), fields(path = %self.settings.document_path))]
    pub async fn list(&self) -> Result<Vec<CalendarEvent>> {
        let token = self.token().await?;
        let events = self
            .snapshot(token.secret(), true)
            .await?
            .map(|s| s.document.events)
            .unwrap_or_default();

        debug!(count = events.len(), "Listed events");
        Ok(events)
    }

    /// Persist a new event and return the stored record.
    #[instrument(skip(self, input), fields(event_id = tracing::field::Empty))]
    pub async fn add(&self, input: EventInput) -> Result<CalendarEvent> {
        input.validate()?;

        let id = input.resolve_id();
        Span::current().record("event_id", id.as_str());
        let event = CalendarEvent::from_input(id, input);

        let stored = self
            .mutate(true, |document| {
                if let Some(existing) = document.find(&event.id) {
                    debug!("Event already stored by an earlier attempt");
                    return Mutation::Unchanged(existing.clone());
                }
                document.events.push(event.clone());
                Mutation::Write(event.clone())
            })
            .await?;

        info!("Added event");
        Ok(stored)
    }

    /// Delete the event with `id`. Removing an unknown id is a no-op.
    ///
    /// Fails with [`CalendarError::Storage`] if the document does not exist.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        let removed = self
            .mutate(false, |document| {
                if document.remove(id) {
                    Mutation::Write(true)
                } else {
                    Mutation::Unchanged(false)
                }
            })
            .await?;

        if removed {
            info!("Removed event");
        } else {
            debug!("No event with this id, nothing to remove");
        }
        Ok(())
    }

    async fn token(&self) -> Result<AccessToken> {
        Ok(self.tokens.current_token().await?)
    }

    /// Run `apply` against fresh snapshots until a guarded write succeeds.
    async fn mutate<T, F>(&self, create: bool, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut EventDocument) -> Mutation<T>,
    {
        let max_attempts = self.settings.max_write_attempts.max(1);

        for attempt in 1..=max_attempts {
            let token = self.token().await?;
            let Some(snapshot) = self.snapshot(token.secret(), create).await? else {
                return Err(self.missing_document());
            };

            let mut document = snapshot.document.clone();
            let value = match apply(&mut document) {
                Mutation::Unchanged(value) => return Ok(value),
                Mutation::Write(value) => value,
            };

            match self.guarded_write(token.secret(), &snapshot, &document).await {
                Ok(handle) => {
                    debug!(attempt, version = ?handle.version, "Write accepted");
                    return Ok(value);
                }
                Err(CalendarError::WriteConflict { .. }) if attempt < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(attempt, ?delay, "Write conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(CalendarError::WriteConflict { .. }) => {
                    warn!(attempts = max_attempts, "Write conflict, giving up");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Err(CalendarError::WriteConflict {
            attempts: max_attempts,
        })
    }

    async fn guarded_write(
        &self,
        token: &str,
        snapshot: &Snapshot,
        document: &EventDocument,
    ) -> Result<BlobHandle> {
        let content = document.encode()?;

        let conditional_version = match self.settings.concurrency_mode {
            ConcurrencyMode::Auto if self.blobs.supports_conditional_writes() => {
                snapshot.version.as_deref()
            }
            _ => None,
        };

        let result = match conditional_version {
            Some(version) => {
                self.blobs
                    .write(&snapshot.file_id, content, Some(version), token)
                    .await
            }
            None => {
                self.check_unchanged(token, snapshot).await?;
                self.blobs
                    .write(&snapshot.file_id, content, None, token)
                    .await
            }
        };

        match result {
            Ok(handle) => Ok(handle),
            Err(BridgeError::PreconditionFailed { .. }) => {
                warn!("Document version changed since it was read");
                Err(CalendarError::WriteConflict { attempts: 1 })
            }
            Err(BridgeError::NotFound(_)) => {
                warn!("Document disappeared before the write");
                self.forget_location(&snapshot.file_id).await;
                Err(CalendarError::WriteConflict { attempts: 1 })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fallback guard without a version primitive: re-read the content and
    /// compare id-sets with the snapshot.
    ///
    /// Edits that keep the id-set intact go undetected.
    async fn check_unchanged(&self, token: &str, snapshot: &Snapshot) -> Result<()> {
        let current = self.blobs.read(&snapshot.file_id, token).await?;
        let current = EventDocument::decode(&current)?;

        if current.ids() != snapshot.document.ids() {
            warn!("Event ids changed since the document was read");
            return Err(CalendarError::WriteConflict { attempts: 1 });
        }
        Ok(())
    }

    /// Read version then content. Re-resolves once if the memoized id is gone.
    async fn snapshot(&self, token: &str, create: bool) -> Result<Option<Snapshot>> {
        let mut refreshed = false;

        loop {
            let Some(file_id) = self.file_id(token, create).await? else {
                return Ok(None);
            };

            match self.read_raw(&file_id, token).await {
                Ok((version, raw)) => {
                    let document = EventDocument::decode(&raw)?;
                    return Ok(Some(Snapshot {
                        file_id,
                        version,
                        document,
                    }));
                }
                Err(BridgeError::NotFound(_)) if !refreshed => {
                    self.forget_location(&file_id).await;
                    refreshed = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn read_raw(
        &self,
        file_id: &str,
        token: &str,
    ) -> bridge_traits::error::Result<(Option<String>, Bytes)> {
        let handle = self.blobs.metadata(file_id, token).await?;
        let raw = self.blobs.read(file_id, token).await?;
        Ok((handle.version, raw))
    }

    /// Memoized document id; looks the path up (and creates it if `create`) on a miss.
    async fn file_id(&self, token: &str, create: bool) -> Result<Option<String>> {
        let mut memo = self.file_id.lock().await;
        if let Some(id) = memo.as_ref() {
            return Ok(Some(id.clone()));
        }

        let located = self.locate(token, create).await?;
        if let Some(id) = &located {
            debug!(file_id = %id, "Resolved calendar document");
            *memo = Some(id.clone());
        }
        Ok(located)
    }

    async fn locate(&self, token: &str, create: bool) -> Result<Option<String>> {
        let path = self.settings.document_path.as_str();

        if let Some(handle) = self.blobs.lookup(path, token).await? {
            return Ok(Some(handle.id));
        }

        if !create {
            return Ok(None);
        }

        let initial = EventDocument::empty(self.settings.document_layout).encode()?;
        match self.blobs.create(path, initial, token).await {
            Ok(handle) => {
                info!(file_id = %handle.id, "Created empty calendar document");
                Ok(Some(handle.id))
            }
            Err(BridgeError::AlreadyExists(_)) => {
                debug!("Document created concurrently, looking it up again");
                match self.blobs.lookup(path, token).await? {
                    Some(handle) => Ok(Some(handle.id)),
                    None => Err(CalendarError::Storage(format!(
                        "'{}' reported as existing but could not be found",
                        path
                    ))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn forget_location(&self, stale_id: &str) {
        let mut memo = self.file_id.lock().await;
        if memo.as_deref() == Some(stale_id) {
            warn!(file_id = %stale_id, "Calendar document id no longer valid");
            *memo = None;
        }
    }

    fn missing_document(&self) -> CalendarError {
        CalendarError::Storage(format!(
            "calendar document '{}' does not exist",
            self.settings.document_path
        ))
    }
}
