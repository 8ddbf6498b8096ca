//! TtlCache - 期限付き・single-flight のキャッシュ
//!
//! # 実装詳細
//! - キーごとに `Arc<tokio::sync::OnceCell>` を持つ
//! - 同じキーの同時ミスは同じ OnceCell の初期化を待つ（外部呼び出しは 1 本）
//! - 失敗はキャッシュしない（次の呼び出しが再取得する）
//! - 期限切れのセルはマップのロック内で新しいセルに差し替える
//!
//! マップのロック（std Mutex）は await をまたいで保持しない。

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;

use crate::ports::Clock;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

type Slot<V> = Arc<OnceCell<Entry<V>>>;

pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value, or the result of `fetch` (shared by every concurrent caller).
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let entry = slot
            .get_or_try_init(|| async {
                let value = fetch().await?;
                Ok::<_, E>(Entry {
                    value,
                    fetched_at: self.clock.now(),
                })
            })
            .await?;
        Ok(entry.value.clone())
    }

    /// Fresh cached value without fetching.
    #[cfg(test)]
    fn peek(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(key)
            .and_then(|slot| slot.get())
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Seed a known value (fixtures, warm start).
    pub fn prime(&self, key: K, value: V) {
        let entry = Entry {
            value,
            fetched_at: self.clock.now(),
        };
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key, Arc::new(OnceCell::from(entry)));
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &Entry<V>, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at >= self.ttl
    }

    /// Current cell for `key`, replacing it if its value expired.
    fn slot(&self, key: K) -> Slot<V> {
        let now = self.clock.now();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()));
        let expired = slot.get().is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            *slot = Arc::new(OnceCell::new());
        }
        slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn hit_does_not_fetch_again() {
        let cache: TtlCache<&str, f64> = TtlCache::new(Duration::hours(1), clock());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let v = cache
                .get_or_try_fetch("m5", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(0.1)
                })
                .await;
            assert_eq!(v, Ok(0.1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let cache: Arc<TtlCache<String, f64>> =
            Arc::new(TtlCache::new(Duration::hours(1), clock()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_fetch("c3".to_string(), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<_, ()>(0.84)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(0.84));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache: TtlCache<&str, f64> = TtlCache::new(Duration::hours(1), clock());

        let first = cache
            .get_or_try_fetch("k", || async { Err::<f64, _>("down") })
            .await;
        assert_eq!(first, Err("down"));
        assert_eq!(cache.peek(&"k"), None);

        let second = cache.get_or_try_fetch("k", || async { Ok::<_, &str>(2.0) }).await;
        assert_eq!(second, Ok(2.0));
    }

    #[tokio::test]
    async fn expired_value_is_refetched() {
        let clock = clock();
        let cache: TtlCache<&str, f64> = TtlCache::new(Duration::minutes(5), clock.clone());
        cache.prime("spot", 0.05);
        assert_eq!(cache.peek(&"spot"), Some(0.05));

        clock.advance(Duration::minutes(5));
        assert_eq!(cache.peek(&"spot"), None);

        let v = cache.get_or_try_fetch("spot", || async { Ok::<_, ()>(0.07) }).await;
        assert_eq!(v, Ok(0.07));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn primed_value_is_served_until_expiry() {
        let cache: TtlCache<&str, f64> = TtlCache::new(Duration::hours(1), clock());
        assert!(cache.is_empty());
        cache.prime("a", 1.0);
        assert_eq!(cache.peek(&"a"), Some(1.0));
        assert_eq!(cache.len(), 1);
    }
}
