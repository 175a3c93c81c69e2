//! In-memory blob store and token sources shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::storage::{BlobHandle, BlobStore};
use bytes::Bytes;
use core_auth::{AccessToken, AuthError, TokenSource};
use core_calendar::RemoteEventStore;
use core_runtime::config::StoreSettings;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

pub const TOKEN: &str = "test-token";
pub const PATH: &str = "Documents/calendar-events.json";

#[derive(Debug, Clone)]
struct Blob {
    path: String,
    content: Bytes,
    version: u64,
}

impl Blob {
    fn handle(&self, id: &str) -> BlobHandle {
        BlobHandle::new(id, Some(format!("\"v{}\"", self.version)))
    }
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Blob>,
    next_id: u64,

    /// Content another device writes right before each of our next writes
    foreign_writes: VecDeque<Bytes>,
    /// Content another device writes right before the content read with this number
    read_triggers: Vec<(u32, Bytes)>,
    /// Errors returned by the next reads (metadata or content)
    read_failures: VecDeque<BridgeError>,
    /// Writes that land but report a timeout to the caller
    lost_write_responses: u32,
    /// Content another device creates right before our next create
    create_race: Option<Bytes>,

    lookups: u32,
    creates: u32,
    reads: u32,
    writes: u32,
    conditional_writes: u32,
}

impl State {
    fn insert(&mut self, path: &str, content: Bytes) -> String {
        self.next_id += 1;
        let id = format!("ITEM{}", self.next_id);
        self.blobs.insert(
            id.clone(),
            Blob {
                path: path.to_string(),
                content,
                version: 1,
            },
        );
        id
    }

    fn by_path(&self, path: &str) -> Option<(String, &Blob)> {
        self.blobs
            .iter()
            .find(|(_, blob)| blob.path == path)
            .map(|(id, blob)| (id.clone(), blob))
    }

    fn overwrite(&mut self, id: &str, content: Bytes) -> Option<BlobHandle> {
        let blob = self.blobs.get_mut(id)?;
        blob.content = content;
        blob.version += 1;
        Some(blob.handle(id))
    }
}

/// Blob store double with version tags, injectable interference, and call counters.
///
/// Every operation yields to the scheduler once so that concurrent callers
/// interleave between reading and writing.
pub struct MemoryBlobStore {
    state: AsyncMutex<State>,
    conditional: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AsyncMutex::new(State::default()),
            conditional: true,
        })
    }

    /// A store without conditional writes; `If-Match` is ignored.
    pub fn without_conditional_writes() -> Arc<Self> {
        Arc::new(Self {
            state: AsyncMutex::new(State::default()),
            conditional: false,
        })
    }

    pub async fn seed(&self, content: &str) -> String {
        let mut state = self.state.lock().await;
        state.insert(PATH, Bytes::from(content.to_string()))
    }

    pub async fn content(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .by_path(PATH)
            .map(|(_, blob)| String::from_utf8_lossy(&blob.content).to_string())
    }

    pub async fn content_json(&self) -> serde_json::Value {
        let content = self.content().await.expect("document exists");
        serde_json::from_str(&content).expect("document is valid JSON")
    }

    pub async fn delete_document(&self) {
        let mut state = self.state.lock().await;
        state.blobs.retain(|_, blob| blob.path != PATH);
    }

    pub async fn push_foreign_write(&self, content: &str) {
        let mut state = self.state.lock().await;
        state.foreign_writes.push_back(Bytes::from(content.to_string()));
    }

    /// Let another device write `content` just before the `nth` content read from now.
    pub async fn push_foreign_write_before_read(&self, nth: u32, content: &str) {
        let mut state = self.state.lock().await;
        let at = state.reads + nth;
        state.read_triggers.push((at, Bytes::from(content.to_string())));
    }

    pub async fn fail_next_read(&self, error: BridgeError) {
        let mut state = self.state.lock().await;
        state.read_failures.push_back(error);
    }

    pub async fn lose_next_write_response(&self) {
        let mut state = self.state.lock().await;
        state.lost_write_responses += 1;
    }

    pub async fn race_next_create(&self, content: &str) {
        let mut state = self.state.lock().await;
        state.create_race = Some(Bytes::from(content.to_string()));
    }

    pub async fn counts(&self) -> Counts {
        let state = self.state.lock().await;
        Counts {
            lookups: state.lookups,
            creates: state.creates,
            reads: state.reads,
            writes: state.writes,
            conditional_writes: state.conditional_writes,
        }
    }

    fn check_token(token: &str) -> Result<()> {
        if token == TOKEN {
            Ok(())
        } else {
            Err(BridgeError::Unauthorized { status: 401 })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub lookups: u32,
    pub creates: u32,
    pub reads: u32,
    pub writes: u32,
    pub conditional_writes: u32,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn lookup(&self, path: &str, token: &str) -> Result<Option<BlobHandle>> {
        tokio::task::yield_now().await;
        Self::check_token(token)?;
        let mut state = self.state.lock().await;
        state.lookups += 1;
        Ok(state.by_path(path).map(|(id, blob)| blob.handle(&id)))
    }

    async fn create(&self, path: &str, initial: Bytes, token: &str) -> Result<BlobHandle> {
        tokio::task::yield_now().await;
        Self::check_token(token)?;
        let mut state = self.state.lock().await;
        state.creates += 1;

        if let Some(content) = state.create_race.take() {
            state.insert(path, content);
        }
        if state.by_path(path).is_some() {
            return Err(BridgeError::AlreadyExists(path.to_string()));
        }

        let id = state.insert(path, initial);
        Ok(state.blobs[&id].handle(&id))
    }

    async fn metadata(&self, id: &str, token: &str) -> Result<BlobHandle> {
        tokio::task::yield_now().await;
        Self::check_token(token)?;
        let mut state = self.state.lock().await;
        if let Some(error) = state.read_failures.pop_front() {
            return Err(error);
        }
        state
            .blobs
            .get(id)
            .map(|blob| blob.handle(id))
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))
    }

    async fn read(&self, id: &str, token: &str) -> Result<Bytes> {
        tokio::task::yield_now().await;
        Self::check_token(token)?;
        let mut state = self.state.lock().await;
        state.reads += 1;

        let current_read = state.reads;
        let due: Vec<Bytes> = state
            .read_triggers
            .iter()
            .filter(|(at, _)| *at == current_read)
            .map(|(_, content)| content.clone())
            .collect();
        state.read_triggers.retain(|(at, _)| *at != current_read);
        for content in due {
            state.overwrite(id, content);
        }

        if let Some(error) = state.read_failures.pop_front() {
            return Err(error);
        }
        state
            .blobs
            .get(id)
            .map(|blob| blob.content.clone())
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))
    }

    async fn write(
        &self,
        id: &str,
        content: Bytes,
        if_match: Option<&str>,
        token: &str,
    ) -> Result<BlobHandle> {
        tokio::task::yield_now().await;
        Self::check_token(token)?;
        let mut state = self.state.lock().await;
        state.writes += 1;

        if let Some(foreign) = state.foreign_writes.pop_front() {
            state.overwrite(id, foreign);
        }

        let current = state
            .blobs
            .get(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?
            .handle(id);

        if let (true, Some(expected)) = (self.conditional, if_match) {
            state.conditional_writes += 1;
            if current.version.as_deref() != Some(expected) {
                return Err(BridgeError::PreconditionFailed {
                    expected: expected.to_string(),
                });
            }
        }

        let handle = state
            .overwrite(id, content)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;

        if state.lost_write_responses > 0 {
            state.lost_write_responses -= 1;
            return Err(BridgeError::Timeout("PUT content".to_string()));
        }
        Ok(handle)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional
    }
}

/// Token source that always fails.
pub struct SignedOut;

#[async_trait]
impl TokenSource for SignedOut {
    async fn current_token(&self) -> core_auth::Result<AccessToken> {
        Err(AuthError::NotAuthenticated)
    }
}

pub fn fast_settings() -> StoreSettings {
    StoreSettings::default()
        .with_document_path(PATH)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
}

pub fn store_with(blobs: Arc<MemoryBlobStore>, settings: StoreSettings) -> RemoteEventStore {
    RemoteEventStore::new(
        blobs,
        Arc::new(core_auth::StaticTokenSource::new(TOKEN)),
        settings,
    )
}

pub fn store(blobs: Arc<MemoryBlobStore>) -> RemoteEventStore {
    store_with(blobs, fast_settings())
}
