//! Local persistence for cross-page saga state.
//!
//! Each checkout stage is independently loadable; the only things tying them
//! together are the remote cart and the four keys stored here: the guest
//! session id, the pending order echo, the pending checkout draft, and the
//! last-chosen audience filter. The store must therefore survive a full page
//! reload at any stage, which is why the default backend is a file, not
//! memory.
//!
//! Every value is wrapped in a versioned envelope (`{"version": 1, "data":
//! ...}`). An envelope with an unknown version, or a value that fails to
//! parse, reads as absent - stale state degrades to "start over", never to a
//! crash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use blisora_core::{Audience, SessionId};

use crate::api::types::{CheckoutRequest, Order};

/// Version written into every envelope. Bump when a stored shape changes.
const SCHEMA_VERSION: u32 = 1;

/// Keys for the persisted saga state.
pub mod keys {
    /// Lazily created guest session id, replayed as a request header.
    pub const GUEST_SESSION: &str = "blisora.guest_session";

    /// Order echo persisted by checkout for the payment page.
    pub const PENDING_ORDER: &str = "blisora.pending_order";

    /// Submitted checkout draft, kept for the confirmation contact lookup.
    pub const CHECKOUT_DRAFT: &str = "blisora.checkout_draft";

    /// Last-chosen catalog audience filter.
    pub const AUDIENCE: &str = "blisora.audience";
}

/// Errors that can occur against the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value failed to serialize.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw string storage underneath the typed store.
pub trait StorageBackend: Send + Sync {
    /// Read the raw value for a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the raw value for a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory backend for tests and ephemeral shells.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// File backend: one JSON document holding all keys, written through on
/// every mutation.
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileBackend {
    /// Open (or start) the state file at `path`.
    ///
    /// A corrupt state file is logged and treated as empty rather than
    /// blocking the storefront.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "State file corrupt, starting fresh");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let document = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, document)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Versioned envelope around every stored value.
#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

/// Typed store over a [`StorageBackend`].
///
/// Cheaply cloneable; clones share the backend.
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn StorageBackend>,
}

impl StateStore {
    /// Store backed by memory only; state dies with the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::default()),
        }
    }

    /// Store backed by a JSON file, surviving restarts and reloads.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing state file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            backend: Arc::new(FileBackend::open(path.as_ref())?),
        })
    }

    /// Read and unwrap a versioned value.
    ///
    /// Unknown versions and malformed payloads read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing medium cannot be read.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };

        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed stored value");
                return Ok(None);
            }
        };

        if envelope.version != SCHEMA_VERSION {
            warn!(key, version = envelope.version, "Discarding stored value with unknown version");
            return Ok(None);
        }

        match serde_json::from_value(envelope.data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding stored value that no longer parses");
                Ok(None)
            }
        }
    }

    /// Wrap and write a value under a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the value fails to serialize or the backing
    /// medium cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let envelope = Envelope {
            version: SCHEMA_VERSION,
            data: serde_json::to_value(value)?,
        };
        self.backend.set(key, serde_json::to_string(&envelope)?)
    }

    /// Remove a key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key)
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    /// The guest session id, minted on first use and stable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn guest_session_id(&self) -> Result<SessionId, StoreError> {
        if let Some(existing) = self.get::<SessionId>(keys::GUEST_SESSION)? {
            return Ok(existing);
        }

        let minted = SessionId::new(uuid::Uuid::new_v4().to_string());
        self.set(keys::GUEST_SESSION, &minted)?;
        Ok(minted)
    }

    /// The order echo persisted by checkout, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn pending_order(&self) -> Result<Option<Order>, StoreError> {
        self.get(keys::PENDING_ORDER)
    }

    /// Persist the order echo for the payment page.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_pending_order(&self, order: &Order) -> Result<(), StoreError> {
        self.set(keys::PENDING_ORDER, order)
    }

    /// Drop the order echo.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_pending_order(&self) -> Result<(), StoreError> {
        self.remove(keys::PENDING_ORDER)
    }

    /// The submitted checkout draft, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn checkout_draft(&self) -> Result<Option<CheckoutRequest>, StoreError> {
        self.get(keys::CHECKOUT_DRAFT)
    }

    /// Persist the submitted checkout draft for the confirmation lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_checkout_draft(&self, draft: &CheckoutRequest) -> Result<(), StoreError> {
        self.set(keys::CHECKOUT_DRAFT, draft)
    }

    /// Drop the checkout draft (one-time use).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_checkout_draft(&self) -> Result<(), StoreError> {
        self.remove(keys::CHECKOUT_DRAFT)
    }

    /// Last-chosen audience filter, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn audience(&self) -> Result<Option<Audience>, StoreError> {
        self.get(keys::AUDIENCE)
    }

    /// Remember the chosen audience filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_audience(&self, audience: Audience) -> Result<(), StoreError> {
        self.set(keys::AUDIENCE, &audience)
    }
}
