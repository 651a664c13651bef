//! Per-key async mutexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Serializes work per key while letting different keys proceed in parallel.
///
/// Idle entries are dropped on the next acquisition, so the map only holds
/// keys that are locked or awaited.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(key.to_string()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("m1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("m1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .unwrap();
        assert_eq!(locks.active_keys(), 2);
    }
}
