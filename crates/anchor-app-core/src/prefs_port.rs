// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session preference persistence: the raw storage port hosts implement and
//! the [`PrefsService`] that reads and writes [`SessionPrefs`] through it.
//!
//! Stored tuning values are checked on the way in and on the way out. A blob
//! with an out-of-range radius or a zero resolve cap loads with those fields
//! reset to their defaults; saving such values is refused.

use thiserror::Error;
use tracing::{debug, warn};

use crate::prefs::{SessionPrefs, SESSION_PREFS_KEY};

/// Raw blob storage keyed by logical name (one blob per key).
pub trait ConfigStore {
    /// Bytes stored under `key`; [`ConfigError::NotFound`] when absent.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace the bytes stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure reading or writing persisted preferences.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("not found")]
    NotFound,
    /// The store cannot map the key to a location.
    #[error("invalid config key: {0:?}")]
    InvalidKey(String),
    /// A preference value is out of range.
    #[error("invalid preference {field}: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored blob is not valid preferences JSON.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store-specific failure.
    #[error("other: {0}")]
    Other(String),
}

/// Loads and saves [`SessionPrefs`] under [`SESSION_PREFS_KEY`].
#[derive(Debug)]
pub struct PrefsService<S> {
    store: S,
}

impl<S> PrefsService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ConfigStore> PrefsService<S> {
    /// Saved preferences, `None` if nothing (or an empty blob) is stored.
    /// Out-of-range tuning values come back reset to their defaults.
    pub fn load(&self) -> Result<Option<SessionPrefs>, ConfigError> {
        let bytes = match self.store.load_raw(SESSION_PREFS_KEY) {
            Ok(bytes) if bytes.is_empty() => return Ok(None),
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        let stored: SessionPrefs = serde_json::from_slice(&bytes)?;
        if let Some((field, reason)) = stored.invalid_field() {
            warn!(field, reason, "stored session pref out of range; using default");
        }
        Ok(Some(stored.repaired()))
    }

    /// Persist `prefs`. Out-of-range values are refused and nothing is written.
    pub fn save(&self, prefs: &SessionPrefs) -> Result<(), ConfigError> {
        if let Some((field, reason)) = prefs.invalid_field() {
            return Err(ConfigError::InvalidValue { field, reason });
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        self.store.save_raw(SESSION_PREFS_KEY, &data)?;
        debug!(consent = prefs.allow_share_images, "session prefs saved");
        Ok(())
    }
}

/// What a host shell needs from preference storage.
pub trait PrefsPort {
    /// Load session preferences (returns None if missing or unreadable).
    fn load_prefs(&self) -> Option<SessionPrefs>;
    /// Persist session preferences. Returns `false` if the write failed.
    fn save_prefs(&self, prefs: &SessionPrefs) -> bool;

    /// Load preferences, falling back to defaults.
    fn prefs_or_default(&self) -> SessionPrefs {
        self.load_prefs().unwrap_or_default()
    }

    /// Record image-sharing consent and return the updated preferences.
    ///
    /// The returned value carries consent even if persisting it failed, so the
    /// current session can proceed; the next launch will ask again.
    fn accept_share_notice(&self) -> SessionPrefs {
        let prefs = self.prefs_or_default().with_consent();
        if !self.save_prefs(&prefs) {
            warn!("could not persist image-sharing consent");
        }
        prefs
    }
}

impl<S: ConfigStore> PrefsPort for PrefsService<S> {
    fn load_prefs(&self) -> Option<SessionPrefs> {
        match self.load() {
            Ok(prefs) => prefs,
            Err(err) => {
                warn!(%err, "unreadable session prefs; using defaults");
                None
            }
        }
    }

    fn save_prefs(&self, prefs: &SessionPrefs) -> bool {
        match self.save(prefs) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to save session prefs");
                false
            }
        }
    }
}
