use lru::LruCache;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

type Slot<V> = Arc<tokio::sync::OnceCell<Entry<V>>>;

/// An async LRU whose entries are valid for only a certain time period.
///
/// Concurrent lookups of the same key share a single computation.
/// A `valid_for` of zero keeps that request coalescing but never serves a finished value twice.
pub struct AsyncTimedLruCache<K, V> {
    cache: std::sync::Mutex<LruCache<K, Slot<V>>>,
    valid_for: Duration,
}

impl<K, V> AsyncTimedLruCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Make a new [`AsyncTimedLruCache`].
    pub fn new(capacity: NonZeroUsize, valid_for: Duration) -> Self {
        Self {
            cache: std::sync::Mutex::new(LruCache::new(capacity)),
            valid_for,
        }
    }

    /// How long a computed value is served for.
    pub fn valid_for(&self) -> Duration {
        self.valid_for
    }

    /// The number of slots, including in-flight and expired ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop the entry for `key`, forcing the next `get` to recompute it.
    pub fn remove(&self, key: &K) {
        self.lock().pop(key);
    }

    /// Get the value for `key`, calling `func` if it is missing or expired.
    pub async fn get<FN, FUT>(&self, key: K, func: FN) -> V
    where
        FN: FnOnce() -> FUT,
        FUT: Future<Output = V>,
    {
        match self.slot(key) {
            Ok(value) => value,
            Err(slot) => init_slot(&slot, func).await,
        }
    }

    /// Like [`AsyncTimedLruCache::get`], but a computed value is only kept if `keep` accepts it.
    ///
    /// Rejected values are still handed to every caller that was waiting on the computation.
    pub async fn get_if<FN, FUT, P>(&self, key: K, func: FN, keep: P) -> V
    where
        K: Clone,
        FN: FnOnce() -> FUT,
        FUT: Future<Output = V>,
        P: FnOnce(&V) -> bool,
    {
        let slot = match self.slot(key.clone()) {
            Ok(value) => return value,
            Err(slot) => slot,
        };

        let value = init_slot(&slot, func).await;
        if !keep(&value) {
            let mut cache = self.lock();
            // Leave the key alone if someone else already replaced the slot.
            if cache
                .peek(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                cache.pop(&key);
            }
        }

        value
    }

    /// Get a fresh value for `key`, or the slot to compute it in.
    fn slot(&self, key: K) -> Result<V, Slot<V>> {
        let mut cache = self.lock();

        match cache.get_mut(&key) {
            Some(slot) => match slot.get() {
                Some(entry) if entry.created.elapsed() <= self.valid_for => {
                    Ok(entry.value.clone())
                }
                Some(_) => {
                    // Expired, swap in an empty slot.
                    *slot = Slot::default();
                    Err(slot.clone())
                }
                None => Err(slot.clone()),
            },
            None => {
                let slot = Slot::default();
                cache.put(key, slot.clone());
                Err(slot)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, Slot<V>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K, V> std::fmt::Debug for AsyncTimedLruCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self
            .cache
            .lock()
            .map(|cache| cache.len())
            .unwrap_or_else(|e| e.into_inner().len());

        f.debug_struct("AsyncTimedLruCache")
            .field("len", &len)
            .field("valid_for", &self.valid_for)
            .finish()
    }
}

async fn init_slot<V, FN, FUT>(slot: &Slot<V>, func: FN) -> V
where
    V: Clone,
    FN: FnOnce() -> FUT,
    FUT: Future<Output = V>,
{
    slot.get_or_init(|| async move {
        let value = func().await;
        Entry {
            created: Instant::now(),
            value,
        }
    })
    .await
    .value
    .clone()
}

#[derive(Debug)]
struct Entry<V> {
    created: Instant,
    value: V,
}
