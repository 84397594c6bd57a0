//! Short lived customer credentials and their refresh.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::concepts::EphemeralKeyProvider;

/// Seconds before expiry at which a key is already considered stale.
pub const DEFAULT_REFRESH_BUFFER_SECONDS: u64 = 30;

/// Listener error code for provider output that is not a valid key.
pub const INVALID_KEY_ERROR_CODE: u16 = 500;

/// An ephemeral key as issued by the API. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EphemeralKey {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub secret: String,
    pub created: u64,
    pub expires: u64,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub associated_objects: Vec<AssociatedObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssociatedObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl EphemeralKey {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn associated_object_id(&self) -> Option<&str> {
        self.associated_objects.first().map(|o| o.id.as_str())
    }

    pub fn associated_object_type(&self) -> Option<&str> {
        self.associated_objects.first().map(|o| o.kind.as_str())
    }
}

/// Failure reported by an [`EphemeralKeyProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to retrieve ephemeral key ({code}): {message}")]
pub struct EphemeralKeyError {
    pub code: u16,
    pub message: String,
}

impl EphemeralKeyError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        EphemeralKeyError {
            code,
            message: message.into(),
        }
    }
}

/// Receives the result of every retrieval, tagged with its operation id.
pub trait KeyManagerListener {
    fn on_key_update(&self, key: &EphemeralKey, operation_id: &str);

    fn on_key_error(&self, operation_id: &str, code: u16, message: &str);
}

/// Wall clock in unix seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Whether `key` is missing or within `buffer_seconds` of expiring.
pub fn should_refresh_key(key: Option<&EphemeralKey>, buffer_seconds: u64, now: u64) -> bool {
    match key {
        None => true,
        Some(key) => now >= key.expires.saturating_sub(buffer_seconds),
    }
}

#[derive(Debug, Default)]
struct KeyState {
    current_key: Option<EphemeralKey>,
    last_refresh_attempt: Option<u64>,
}

/// Caches the session ephemeral key and refreshes it through a provider.
///
/// Retrievals are serialized; concurrent callers wait for the one in flight.
pub struct EphemeralKeyManager<P, L, C = SystemClock>
where
    P: EphemeralKeyProvider,
    L: KeyManagerListener,
    C: Clock,
{
    provider: P,
    listener: L,
    clock: C,
    api_version: String,
    buffer_seconds: u64,
    next_operation: AtomicU64,
    state: Mutex<KeyState>,
}

impl<P, L> EphemeralKeyManager<P, L, SystemClock>
where
    P: EphemeralKeyProvider,
    L: KeyManagerListener,
{
    pub fn new(provider: P, listener: L, api_version: impl Into<String>) -> Self {
        Self::with_clock(provider, listener, api_version, SystemClock)
    }
}

impl<P, L, C> EphemeralKeyManager<P, L, C>
where
    P: EphemeralKeyProvider,
    L: KeyManagerListener,
    C: Clock,
{
    pub fn with_clock(provider: P, listener: L, api_version: impl Into<String>, clock: C) -> Self {
        EphemeralKeyManager {
            provider,
            listener,
            clock,
            api_version: api_version.into(),
            buffer_seconds: DEFAULT_REFRESH_BUFFER_SECONDS,
            next_operation: AtomicU64::new(0),
            state: Mutex::new(KeyState::default()),
        }
    }

    pub fn with_buffer_seconds(mut self, buffer_seconds: u64) -> Self {
        self.buffer_seconds = buffer_seconds;
        self
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub async fn current_key(&self) -> Option<EphemeralKey> {
        self.state.lock().await.current_key.clone()
    }

    /// Clock time of the latest retrieval attempt, successful or not.
    pub async fn last_refresh_attempt(&self) -> Option<u64> {
        self.state.lock().await.last_refresh_attempt
    }

    /// Generates an id for a retrieval that has none.
    pub fn next_operation_id(&self) -> String {
        let seq = self.next_operation.fetch_add(1, Ordering::Relaxed);
        format!("op_{seq}")
    }

    /// Returns the cached key when it is fresh, otherwise retrieves a new one.
    pub async fn retrieve_key_if_needed(&self, operation_id: &str) -> Option<EphemeralKey> {
        let mut state = self.state.lock().await;
        let fresh = state
            .current_key
            .as_ref()
            .filter(|key| !should_refresh_key(Some(*key), self.buffer_seconds, self.clock.now()))
            .cloned();

        match fresh {
            Some(key) => {
                self.listener.on_key_update(&key, operation_id);
                Some(key)
            }
            None => self.refresh(&mut state, operation_id).await,
        }
    }

    /// Always asks the provider for a new key.
    ///
    /// On failure the cached key is cleared and the listener receives the error.
    pub async fn retrieve_ephemeral_key(&self, operation_id: &str) -> Option<EphemeralKey> {
        let mut state = self.state.lock().await;
        self.refresh(&mut state, operation_id).await
    }

    async fn refresh(&self, state: &mut KeyState, operation_id: &str) -> Option<EphemeralKey> {
        state.last_refresh_attempt = Some(self.clock.now());

        let result = match self.provider.create_ephemeral_key(&self.api_version).await {
            Ok(raw) => EphemeralKey::from_json(&raw).map_err(|err| {
                EphemeralKeyError::new(
                    INVALID_KEY_ERROR_CODE,
                    format!("Received an invalid ephemeral key from the provider: {err}"),
                )
            }),
            Err(err) => Err(err),
        };

        match result {
            Ok(key) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Ephemeral key '{}' refreshed for {operation_id}", key.id);

                state.current_key = Some(key.clone());
                self.listener.on_key_update(&key, operation_id);
                Some(key)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Ephemeral key refresh for {operation_id} failed: {err}");

                state.current_key = None;
                self.listener
                    .on_key_error(operation_id, err.code, &err.message);
                None
            }
        }
    }
}
