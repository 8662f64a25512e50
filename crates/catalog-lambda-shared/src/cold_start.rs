//! Process-scoped cache for the application context.
//!
//! A Lambda execution environment serves many invocations sequentially, so
//! the expensive object graph (routing table, shared clients) is built once
//! on the first invocation and reused until the environment is recycled.
//!
//! # Cold-Start Semantics
//!
//! - The factory runs at most once per successful initialization. Callers
//!   racing on a cold instance block on the same initialization guard, and
//!   all observe the same context.
//! - A failed factory caches nothing; the next call runs the factory again.
//! - The guard is held only while the factory runs, never for the duration
//!   of an invocation.
//!
//! The cache is meant to live in a `static` and be injected into the
//! entrypoint:
//!
//! ```
//! use catalog_lambda_shared::{ColdStartCache, InitError};
//!
//! static CACHE: ColdStartCache<String> = ColdStartCache::new();
//!
//! let value = CACHE.get_or_init(|| Ok::<_, InitError>("ready".to_string())).unwrap();
//! assert_eq!(value.as_str(), "ready");
//! ```

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::error::InitError;

/// Lazily-initialized, process-wide value with retry-on-failure.
pub struct ColdStartCache<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> ColdStartCache<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the cached value, running `factory` if this is a cold start.
    ///
    /// The returned `Arc` points at a fully constructed value: the cell is
    /// only published after `factory` returns `Ok`.
    pub fn get_or_init<F>(&self, factory: F) -> Result<Arc<T>, InitError>
    where
        F: FnOnce() -> Result<T, InitError>,
    {
        self.cell
            .get_or_try_init(|| {
                let start = Instant::now();
                info!("cold start: initializing application context");

                match factory() {
                    Ok(value) => {
                        info!(
                            init_ms = start.elapsed().as_millis() as u64,
                            "application context initialized"
                        );
                        Ok(Arc::new(value))
                    }
                    Err(err) => {
                        error!(
                            init_ms = start.elapsed().as_millis() as u64,
                            error = %err,
                            "application context initialization failed"
                        );
                        Err(err)
                    }
                }
            })
            .map(Arc::clone)
    }

    /// The cached value, if initialization has completed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for ColdStartCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ColdStartCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColdStartCache")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn factory_runs_once_and_value_is_reused() {
        let cache = ColdStartCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .unwrap();
        let second = cache
            .get_or_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap();

        assert_eq!(*first, 42);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_factory_is_retried() {
        let cache: ColdStartCache<u32> = ColdStartCache::new();

        let err = cache
            .get_or_init(|| Err(InitError::context("dependency unavailable")))
            .unwrap_err();
        assert!(err.to_string().contains("dependency unavailable"));
        assert!(!cache.is_initialized());
        assert!(cache.get().is_none());

        let value = cache.get_or_init(|| Ok(5)).unwrap();
        assert_eq!(*value, 5);
        assert!(cache.is_initialized());
    }

    #[test]
    fn concurrent_cold_start_runs_factory_once() {
        const CALLERS: usize = 16;

        let cache: Arc<ColdStartCache<String>> = Arc::new(ColdStartCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_init(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok("context".to_string())
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }
}
