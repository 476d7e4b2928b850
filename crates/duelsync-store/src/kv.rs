//! Short-lived key-value storage with per-entry TTL.
//!
//! Lobbies and quick rooms live here. The trait mirrors what an external
//! TTL-capable store offers (`GET`, `SET EX`, `SET NX`, a single-key
//! compare-and-set, `DEL`) so several service instances can share one
//! backing store instead of each holding its own map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::StoreError;

/// A keyed store whose entries may carry an expiry.
///
/// Expired entries are invisible to every operation, whether or not
/// [`sweep`](KeyValueStore::sweep) has physically removed them yet.
pub trait KeyValueStore<V>: Send + Sync + 'static
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Returns the live value under `key`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<V>, StoreError>> + Send;

    /// Stores `value`, replacing any previous value and expiry.
    fn set(
        &self,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores `value` only if no live entry exists. Returns whether it
    /// was stored.
    fn set_if_absent(
        &self,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Replaces the live entry only if it still equals `expected`.
    /// Returns whether the swap happened.
    fn compare_and_set(
        &self,
        key: &str,
        expected: &V,
        value: V,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes the entry. Returns whether a live entry was removed.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Physically removes expired entries and returns how many.
    fn sweep(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Slot<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process [`KeyValueStore`].
///
/// Cheap to clone; clones share the same map. Suitable for a single
/// instance and for tests; uses Tokio's clock so paused-time tests can
/// advance past a TTL.
#[derive(Debug)]
pub struct MemoryKv<V> {
    slots: Arc<Mutex<HashMap<String, Slot<V>>>>,
}

impl<V> Clone for MemoryKv<V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<V> Default for MemoryKv<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryKv<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of physically stored entries, expired ones included.
    pub async fn stored_len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

impl<V> KeyValueStore<V> for MemoryKv<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        match slots.get(key) {
            Some(slot) if slot.is_live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                slots.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.slots
            .lock()
            .await
            .insert(key.to_owned(), Slot::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        if slots.get(key).is_some_and(|slot| slot.is_live(now)) {
            return Ok(false);
        }
        slots.insert(key.to_owned(), Slot::new(value, ttl));
        Ok(true)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &V,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        match slots.get(key) {
            Some(slot) if slot.is_live(now) && slot.value == *expected => {
                slots.insert(key.to_owned(), Slot::new(value, ttl));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.slots.lock().await.remove(key);
        Ok(removed.is_some_and(|slot| slot.is_live(Instant::now())))
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        let before = slots.len();
        slots.retain(|_, slot| slot.is_live(now));
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_returns_none() {
        let kv = MemoryKv::new();
        kv.set("k", 1u32, Some(Duration::from_secs(10))).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(1));

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(kv.get("k").await.unwrap(), None);
        assert_eq!(kv.stored_len().await, 0, "lazy read removes the entry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_treats_expired_as_absent() {
        let kv = MemoryKv::new();
        assert!(kv.set_if_absent("k", 1u32, Some(Duration::from_secs(1))).await.unwrap());
        assert!(!kv.set_if_absent("k", 2, None).await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(kv.set_if_absent("k", 3, None).await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_compare_and_set_only_swaps_matching_value() {
        let kv = MemoryKv::new();
        kv.set("k", "a".to_string(), None).await.unwrap();

        assert!(!kv
            .compare_and_set("k", &"x".to_string(), "b".into(), None)
            .await
            .unwrap());
        assert!(kv
            .compare_and_set("k", &"a".to_string(), "b".into(), None)
            .await
            .unwrap());
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_compare_and_set_missing_key_fails() {
        let kv: MemoryKv<u8> = MemoryKv::new();
        assert!(!kv.compare_and_set("k", &0, 1, None).await.unwrap());
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let kv = MemoryKv::new();
        kv.set("short", 1u8, Some(Duration::from_secs(1))).await.unwrap();
        kv.set("long", 2u8, Some(Duration::from_secs(100))).await.unwrap();
        kv.set("forever", 3u8, None).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(kv.sweep().await.unwrap(), 1);
        assert_eq!(kv.stored_len().await, 2);
    }

    #[tokio::test]
    async fn test_delete_reports_live_removal() {
        let kv = MemoryKv::new();
        kv.set("k", 1u8, None).await.unwrap();
        assert!(kv.delete("k").await.unwrap());
        assert!(!kv.delete("k").await.unwrap());
    }
}
