//! Load-once cache of voice styles.
//!
//! [`VoiceStyleCache`] is owned by the renderer and shared by every run it
//! executes.  Entries are never evicted.  Each voice name has its own slot
//! guarded by a mutex, so concurrent first requests for the same name parse
//! the resource exactly once while requests for other names proceed
//! independently.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::style::{read_voice, VoiceError, VoiceStyle};

// ---------------------------------------------------------------------------
// StyleSource
// ---------------------------------------------------------------------------

/// Where style vectors come from.
pub trait StyleSource: Send + Sync {
    /// Resolve the vector of voice `name`.
    fn load(&self, name: &str) -> Result<Vec<f32>, VoiceError>;
}

/// Reads `voices.json` from disk on every call; the cache in front of it
/// makes that once per name.
#[derive(Debug, Clone)]
pub struct JsonStyleSource {
    path: PathBuf,
}

impl JsonStyleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StyleSource for JsonStyleSource {
    fn load(&self, name: &str) -> Result<Vec<f32>, VoiceError> {
        read_voice(&self.path, name)
    }
}

// ---------------------------------------------------------------------------
// VoiceStyleCache
// ---------------------------------------------------------------------------

type Slot = Arc<Mutex<Option<Arc<VoiceStyle>>>>;

/// Voice styles keyed by name, loaded on first use.
pub struct VoiceStyleCache {
    source: Box<dyn StyleSource>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl VoiceStyleCache {
    pub fn new(source: impl StyleSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cache backed by the JSON resource at `path`.
    pub fn from_json_file(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonStyleSource::new(path))
    }

    /// Return the style for `name`, loading it on the first request.
    ///
    /// Failed loads are not cached; the next request tries again.
    pub fn get_or_load(&self, name: &str) -> Result<Arc<VoiceStyle>, VoiceError> {
        let slot = self.slot(name);
        // A panic inside a previous load leaves the slot empty, so a poisoned
        // guard is still safe to reuse.
        let mut entry = slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(style) = entry.as_ref() {
            return Ok(Arc::clone(style));
        }

        let vector = self.source.load(name)?;
        log::info!("voice: loaded {name} ({} dims)", vector.len());

        let style = Arc::new(VoiceStyle::new(name, vector));
        *entry = Some(Arc::clone(&style));
        Ok(style)
    }

    /// `true` when `name` has been loaded successfully.
    pub fn is_cached(&self, name: &str) -> bool {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match slots.get(name) {
                Some(slot) => Arc::clone(slot),
                None => return false,
            }
        };
        let entry = slot.lock().unwrap_or_else(|e| e.into_inner());
        entry.is_some()
    }

    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(name.to_owned()).or_default())
    }
}

impl std::fmt::Debug for VoiceStyleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.slots.lock().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("VoiceStyleCache")
            .field("slots", &cached)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts loads and sleeps inside each one to widen the race window.
    struct CountingSource {
        loads: Arc<AtomicUsize>,
    }

    impl StyleSource for CountingSource {
        fn load(&self, name: &str) -> Result<Vec<f32>, VoiceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            if name == "missing" {
                return Err(VoiceError::NotFound(name.into()));
            }
            Ok(vec![name.len() as f32; 4])
        }
    }

    fn counting_cache() -> (VoiceStyleCache, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = VoiceStyleCache::new(CountingSource {
            loads: Arc::clone(&loads),
        });
        (cache, loads)
    }

    #[test]
    fn second_request_hits_cache() {
        let (cache, loads) = counting_cache();

        let a = cache.get_or_load("af_bella").unwrap();
        let b = cache.get_or_load("af_bella").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.is_cached("af_bella"));
    }

    #[test]
    fn different_names_load_separately() {
        let (cache, loads) = counting_cache();

        cache.get_or_load("a").unwrap();
        cache.get_or_load("bb").unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_requests_load_once() {
        let (cache, loads) = counting_cache();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let style = cache.get_or_load("af_bella").unwrap();
                    assert_eq!(style.name(), "af_bella");
                });
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let (cache, loads) = counting_cache();

        assert!(matches!(
            cache.get_or_load("missing"),
            Err(VoiceError::NotFound(_))
        ));
        assert!(cache.get_or_load("missing").is_err());

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(!cache.is_cached("missing"));
    }

    #[test]
    fn json_file_source_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("voices.json");
        std::fs::write(&path, r#"{"af_bella": [[0.25, 0.5], [9.0, 9.0]]}"#).expect("write");

        let cache = VoiceStyleCache::from_json_file(&path);
        let style = cache.get_or_load("af_bella").unwrap();
        assert_eq!(style.as_slice(), &[0.25, 0.5]);

        // Removing the file does not matter once cached.
        std::fs::remove_file(&path).expect("remove");
        assert!(cache.get_or_load("af_bella").is_ok());
    }
}
