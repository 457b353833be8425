//! Compiled expression cache
//!
//! Compiling is cheap but not free; callers that select with the same few
//! expressions over many documents hit the cache instead. Entries are
//! shared as `Arc<[SelectPath]>` so a hit never copies the paths.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use lru::LruCache;
use tracing::debug;

use super::{compile, PathSyntaxError};
use crate::selector::SelectPath;

/// Entries kept by the process-wide cache
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Thread-safe LRU of compiled expressions keyed by source text
pub struct PathCache {
    entries: Mutex<LruCache<String, Arc<[SelectPath]>>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero is raised to one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PathCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<[SelectPath]>>> {
        // Poisoning is ignored, every LRU operation completes before a panic can occur
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compiled paths for `expr`, compiling and caching on a miss.
    /// Syntax errors are not cached.
    pub fn get_or_compile(&self, expr: &str) -> Result<Arc<[SelectPath]>, PathSyntaxError> {
        let hit = self.lock().get(expr).cloned();
        if let Some(paths) = hit {
            debug!(expr, "path cache hit");
            return Ok(paths);
        }

        debug!(expr, "path cache miss");
        let paths: Arc<[SelectPath]> = compile(expr)?.into();
        self.lock().put(expr.to_string(), Arc::clone(&paths));
        Ok(paths)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide cache
pub fn global() -> &'static PathCache {
    static CACHE: OnceLock<PathCache> = OnceLock::new();
    CACHE.get_or_init(PathCache::new)
}

/// Compile through the process-wide cache
pub fn compile_cached(expr: &str) -> Result<Arc<[SelectPath]>, PathSyntaxError> {
    global().get_or_compile(expr)
}
