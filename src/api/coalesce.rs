/// In-flight request coalescing
///
/// Concurrent calls with the same arguments share one underlying future.
/// Entries are evicted as soon as the future settles, so this de-duplicates
/// concurrent callers and never serves a stale result. The registry only
/// holds weak handles: once every caller has dropped its handle the call is
/// cancelled and its entry is pruned.
use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;

/// Handle to a coalesced call. Cloning it does not re-run the call.
pub type SharedCall<T> = Shared<BoxFuture<'static, Result<T>>>;

type WeakCall<T> = WeakShared<BoxFuture<'static, Result<T>>>;

type Registry<T> = HashMap<&'static str, HashMap<CoalesceKey, WeakCall<T>>>;

/// Hash of the canonical JSON encoding of a call's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoalesceKey(u64);

impl CoalesceKey {
    /// Derive the key from the full argument list.
    ///
    /// Maps are expected to be ordered (`BTreeMap`, `serde_json::Map`) so
    /// that equal arguments always serialize to the same string.
    pub fn from_args<A: Serialize + ?Sized>(args: &A) -> Result<Self> {
        let encoded = serde_json::to_string(args)?;
        Ok(CoalesceKey(fnv1a_64(&encoded)))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

fn fnv1a_64(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Registry of pending calls, partitioned by function name.
///
/// Each API client owns its own instance; clones share the registry.
pub struct Coalescer<T> {
    pending: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Coalescer {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Coalescer {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<T>(pending: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    // The registry holds no invariants a panicking holder could break
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the in-flight call for (`function`, `args`), starting it with
    /// `call` if none is pending.
    ///
    /// `call` is only invoked when no identical call is in flight. The
    /// returned handle resolves to the same value, or the same error, for
    /// every caller sharing it.
    pub fn dispatch<A, F, Fut>(&self, function: &'static str, args: &A, call: F) -> Result<SharedCall<T>>
    where
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = CoalesceKey::from_args(args)?;

        if let Some(existing) = self.live_call(function, key) {
            debug!("Joining in-flight {} call {:016x}", function, key.value());
            return Ok(existing);
        }

        let registry = Arc::clone(&self.pending);
        let work = call();
        let shared = async move {
            let result = work.await;
            evict(&registry, function, key);
            result
        }
        .boxed()
        .shared();

        let mut pending = lock(&self.pending);
        let calls = pending.entry(function).or_default();
        // Another caller may have registered the same call while `call` ran
        if let Some(existing) = calls.get(&key).and_then(WeakShared::upgrade) {
            return Ok(existing);
        }
        if let Some(weak) = shared.downgrade() {
            calls.insert(key, weak);
        }
        debug!("Dispatched {} call {:016x}", function, key.value());
        Ok(shared)
    }

    /// Upgrade the registered call for `key`, pruning entries of `function`
    /// whose callers have all gone away.
    fn live_call(&self, function: &'static str, key: CoalesceKey) -> Option<SharedCall<T>> {
        let mut pending = lock(&self.pending);
        let calls = pending.get_mut(function)?;
        calls.retain(|_, call| call.upgrade().is_some());
        let existing = calls.get(&key).and_then(WeakShared::upgrade);
        if calls.is_empty() {
            pending.remove(function);
        }
        existing
    }

    /// Dispatch and wait for the shared result.
    pub async fn call<A, F, Fut>(&self, function: &'static str, args: &A, call: F) -> Result<T>
    where
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.dispatch(function, args, call)?.await
    }

    /// Number of calls currently in flight across all functions. Calls
    /// abandoned by every caller are not counted.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending)
            .values()
            .flat_map(HashMap::values)
            .filter(|call| call.upgrade().is_some())
            .count()
    }
}

fn evict<T>(pending: &Mutex<Registry<T>>, function: &'static str, key: CoalesceKey) {
    let mut pending = lock(pending);
    if let Some(calls) = pending.get_mut(function) {
        calls.remove(&key);
        if calls.is_empty() {
            pending.remove(function);
        }
    }
}
