//! Persisted bearer token and its cross-tab change feed.
//!
//! SYSTEM CONTEXT
//! ==============
//! The token lives in one durable, origin-scoped slot shared by every tab.
//! Each [`TokenStore`] handle is one tab's view of that slot. Writes made
//! through a handle are announced on a [`TokenChannel`] and delivered to every
//! *other* handle's [`TokenWatch`], mirroring browser `storage` events, which
//! never fire in the tab that made the change.
//!
//! TRADE-OFFS
//! ==========
//! The feed is a bounded broadcast. A watcher that falls behind skips the
//! overwritten notices and continues with newer ones; since every notice
//! carries the full new value, the latest one is always sufficient.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::error::SessionError;

const CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Identity of one handle onto the shared slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TabId(u64);

impl TabId {
    /// Origin used for changes observed from outside this process's handles,
    /// e.g. a browser `storage` event.
    pub const EXTERNAL: Self = Self(0);
}

/// New value of the persisted token after a change made elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenChange {
    pub token: Option<String>,
}

impl TokenChange {
    #[must_use]
    pub fn stored(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    #[must_use]
    pub fn removed() -> Self {
        Self { token: None }
    }

    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.token.is_none()
    }
}

#[derive(Clone, Debug)]
struct Notice {
    origin: TabId,
    change: TokenChange,
}

/// Broadcast channel shared by every handle onto one slot.
#[derive(Clone)]
pub struct TokenChannel {
    tx: broadcast::Sender<Notice>,
    next_tab: Arc<AtomicU64>,
}

impl Default for TokenChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenChannel {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, next_tab: Arc::new(AtomicU64::new(1)) }
    }

    /// Allocate an identity for a new handle.
    #[must_use]
    pub fn open_tab(&self) -> TabId {
        TabId(self.next_tab.fetch_add(1, Ordering::Relaxed))
    }

    /// Announce a change made by `origin`. A channel without watchers drops it.
    pub fn publish(&self, origin: TabId, change: TokenChange) {
        let _ = self.tx.send(Notice { origin, change });
    }

    /// Watch changes made by every handle except `tab`.
    #[must_use]
    pub fn subscribe(&self, tab: TabId) -> TokenWatch {
        TokenWatch { rx: self.tx.subscribe(), tab }
    }
}

/// Receiving end of the change feed for one tab.
pub struct TokenWatch {
    rx: broadcast::Receiver<Notice>,
    tab: TabId,
}

impl TokenWatch {
    /// Wait for the next change made by another tab.
    ///
    /// Returns `None` once every handle on the channel is gone.
    pub async fn changed(&mut self) -> Option<TokenChange> {
        loop {
            match self.rx.recv().await {
                Ok(notice) if notice.origin == self.tab => {}
                Ok(notice) => return Some(notice.change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "token watcher lagged; continuing with newer changes");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-delivered change from another tab, without waiting.
    pub fn try_changed(&mut self) -> Option<TokenChange> {
        loop {
            match self.rx.try_recv() {
                Ok(notice) if notice.origin == self.tab => {}
                Ok(notice) => return Some(notice.change),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// One tab's handle onto the persisted token slot.
pub trait TokenStore: Send + Sync {
    /// Storage key of the slot (e.g. `auth_token`).
    fn key(&self) -> &str;

    fn get(&self) -> Option<String>;

    /// Persist `token`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the slot cannot be written.
    fn set(&self, token: &str) -> Result<(), SessionError>;

    /// Clear the slot. Clearing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the slot cannot be cleared.
    fn remove(&self) -> Result<(), SessionError>;

    /// Feed of changes made through other handles.
    fn subscribe(&self) -> TokenWatch;
}

// =============================================================================
// IN-MEMORY SLOT
// =============================================================================

/// Process-local slot. Every handle from [`MemoryTokenStore::open_tab`]
/// behaves like another browser tab of the same origin.
#[derive(Clone)]
pub struct MemoryTokenStore {
    key: String,
    slot: Arc<Mutex<Option<String>>>,
    channel: TokenChannel,
    tab: TabId,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new(key: &str) -> Self {
        let channel = TokenChannel::new();
        let tab = channel.open_tab();
        Self { key: key.to_owned(), slot: Arc::new(Mutex::new(None)), channel, tab }
    }

    /// New slot already holding `token`.
    #[must_use]
    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new(key);
        *store.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        store
    }

    /// Another handle onto the same slot, as seen from a different tab.
    #[must_use]
    pub fn open_tab(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: Arc::clone(&self.slot),
            channel: self.channel.clone(),
            tab: self.channel.open_tab(),
        }
    }

    #[must_use]
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Replace the value as if another tab had written it, announcing the
    /// change to every handle.
    pub fn write_external(&self, token: Option<&str>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_owned);
        self.channel.publish(TabId::EXTERNAL, TokenChange { token: token.map(str::to_owned) });
    }
}

impl TokenStore for MemoryTokenStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn get(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        let previous = self.slot.lock().unwrap_or_else(PoisonError::into_inner).replace(token.to_owned());
        if previous.as_deref() != Some(token) {
            self.channel.publish(self.tab, TokenChange::stored(token));
        }
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        let previous = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            self.channel.publish(self.tab, TokenChange::removed());
        }
        Ok(())
    }

    fn subscribe(&self) -> TokenWatch {
        self.channel.subscribe(self.tab)
    }
}

// =============================================================================
// FILE SLOT
// =============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileTokenStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{SessionError, TabId, TokenChange, TokenChannel, TokenStore, TokenWatch};

    /// Token persisted in a single file, used by native tools.
    ///
    /// Other processes see the new value on their next `get`; change
    /// notifications reach only handles opened in this process.
    #[derive(Clone)]
    pub struct FileTokenStore {
        key: String,
        path: PathBuf,
        channel: TokenChannel,
        tab: TabId,
    }

    impl FileTokenStore {
        #[must_use]
        pub fn new(key: &str, path: impl Into<PathBuf>) -> Self {
            let channel = TokenChannel::new();
            let tab = channel.open_tab();
            Self { key: key.to_owned(), path: path.into(), channel, tab }
        }

        #[must_use]
        pub fn open_tab(&self) -> Self {
            Self {
                key: self.key.clone(),
                path: self.path.clone(),
                channel: self.channel.clone(),
                tab: self.channel.open_tab(),
            }
        }

        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn storage_error(&self, action: &str, error: &std::io::Error) -> SessionError {
            SessionError::Storage(format!("{action} {}: {error}", self.path.display()))
        }
    }

    impl TokenStore for FileTokenStore {
        fn key(&self) -> &str {
            &self.key
        }

        fn get(&self) -> Option<String> {
            match std::fs::read_to_string(&self.path) {
                Ok(raw) => Some(raw.trim().to_owned()).filter(|token| !token.is_empty()),
                Err(error) if error.kind() == ErrorKind::NotFound => None,
                Err(error) => {
                    tracing::warn!(path = %self.path.display(), %error, "token file unreadable");
                    None
                }
            }
        }

        fn set(&self, token: &str) -> Result<(), SessionError> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| self.storage_error("create directory for", &e))?;
            }
            let changed = self.get().as_deref() != Some(token);
            std::fs::write(&self.path, token).map_err(|e| self.storage_error("write", &e))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                    .map_err(|e| self.storage_error("restrict permissions on", &e))?;
            }
            if changed {
                self.channel.publish(self.tab, TokenChange::stored(token));
            }
            Ok(())
        }

        fn remove(&self) -> Result<(), SessionError> {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {
                    self.channel.publish(self.tab, TokenChange::removed());
                    Ok(())
                }
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
                Err(error) => Err(self.storage_error("remove", &error)),
            }
        }

        fn subscribe(&self) -> TokenWatch {
            self.channel.subscribe(self.tab)
        }
    }
}
