use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::nutrition::Macros;

/// An unconfirmed intake staged for later confirmation, plus the image that
/// produced it (kept so the confirmed record can be persisted with its photo).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub macros: Macros,
    pub image: Option<Bytes>,
}

struct Slot {
    token: u64,
    entry: PendingEntry,
    reaper: JoinHandle<()>,
}

/// One pending-entry slot per user, evicted after a fixed TTL unless taken first.
///
/// Every `put` stamps its slot with a fresh token and schedules its own eviction
/// task. Eviction only happens while that token is still current, so a timer
/// outliving its entry (taken or overwritten) is a no-op and can never remove an
/// entry staged later under the same user key. `take` and an overwriting `put`
/// also abort the outstanding task.
#[derive(Clone)]
pub struct PendingCache {
    inner: Arc<Inner>,
}

struct Inner {
    ttl: Duration,
    next_token: AtomicU64,
    slots: RwLock<HashMap<Uuid, Slot>>,
}

impl PendingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                next_token: AtomicU64::new(0),
                slots: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Stages an entry for `user`, replacing any previous pending entry.
    pub async fn put(&self, user: Uuid, entry: PendingEntry) {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.inner.slots.write().await;
        let reaper = tokio::spawn(reap(Arc::clone(&self.inner), user, token));
        if let Some(prev) = slots.insert(user, Slot { token, entry, reaper }) {
            prev.reaper.abort();
        }
    }

    pub async fn get(&self, user: Uuid) -> Option<PendingEntry> {
        let slots = self.inner.slots.read().await;
        slots.get(&user).map(|slot| slot.entry.clone())
    }

    /// Atomically removes and returns the pending entry, cancelling its eviction.
    pub async fn take(&self, user: Uuid) -> Option<PendingEntry> {
        let mut slots = self.inner.slots.write().await;
        slots.remove(&user).map(|slot| {
            slot.reaper.abort();
            slot.entry
        })
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.slots.read().await.len()
    }
}

async fn reap(inner: Arc<Inner>, user: Uuid, token: u64) {
    tokio::time::sleep(inner.ttl).await;
    let mut slots = inner.slots.write().await;
    // The slot may have been taken or restaged while this timer slept.
    if slots.get(&user).is_some_and(|slot| slot.token == token) {
        slots.remove(&user);
        tracing::debug!(user_id = %user, "pending entry expired");
    }
}
