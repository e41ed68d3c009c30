use crate::error::{BlastError, Result};
use crate::registry::{DeliveryRegistry, RegistrySummary};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// In-memory registry plus the last content written to disk. Both live under
/// one mutex so compare-and-persist cannot interleave with a mutation.
struct Tracked {
    current: DeliveryRegistry,
    persisted: DeliveryRegistry,
}

struct Shared {
    path: PathBuf,
    tracked: Mutex<Tracked>,
    writes: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Tracked> {
        // Every mutation is a single assignment, so a poisoned guard still
        // holds a consistent registry.
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_if_changed(&self) -> Result<bool> {
        let mut tracked = self.lock();
        if tracked.current == tracked.persisted {
            return Ok(false);
        }
        let data = tracked.current.to_pretty_json()?;
        crate::io::atomic_write(&self.path, &data).map_err(|source| BlastError::Persistence {
            path: self.path.clone(),
            source,
        })?;
        tracked.persisted = tracked.current.clone();
        self.writes.fetch_add(1, Ordering::Relaxed);
        info!(
            path = %self.path.display(),
            entries = tracked.current.len(),
            "persisted delivery state"
        );
        Ok(true)
    }
}

struct Watcher {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

fn watch_loop(shared: Arc<Shared>, interval: Duration, stop: mpsc::Receiver<()>) {
    debug!(path = %shared.path.display(), ?interval, "state watcher started");
    loop {
        if let Err(e) = shared.persist_if_changed() {
            warn!(error = %e, "state persist failed, retrying next cycle");
        }
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(path = %shared.path.display(), "state watcher stopped");
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Delivery registry loaded from a JSON state file and mirrored back to it by
/// a background watcher.
///
/// Callers mutate entries through the store; the watcher only detects and
/// persists differences against the last written snapshot.
pub struct StateStore {
    shared: Arc<Shared>,
    poll_interval: Duration,
    watcher: Mutex<Option<Watcher>>,
}

impl StateStore {
    /// Load the registry from `path`. On the first successful load a one-time
    /// `<path>.bak` copy of the file is made; an existing backup is left alone.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let registry = DeliveryRegistry::load(path)?;

        let backup = crate::io::backup_path(path);
        if crate::io::copy_if_missing(path, &backup)? {
            info!(backup = %backup.display(), "created state backup");
        }

        Ok(Self::from_registry(path, registry))
    }

    /// Wrap an already loaded registry. `path` is where changes get written.
    pub fn from_registry(path: impl Into<PathBuf>, registry: DeliveryRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.into(),
                tracked: Mutex::new(Tracked {
                    persisted: registry.clone(),
                    current: registry,
                }),
                writes: AtomicU64::new(0),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            watcher: Mutex::new(None),
        }
    }

    /// Applies to watchers started after this call.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn backup_path(&self) -> PathBuf {
        crate::io::backup_path(&self.shared.path)
    }

    // -----------------------------------------------------------------------
    // Registry access
    // -----------------------------------------------------------------------

    pub fn get(&self, number: &str) -> Option<bool> {
        self.shared.lock().current.get(number)
    }

    pub fn pending(&self) -> Vec<String> {
        self.shared.lock().current.pending()
    }

    pub fn mark_sent(&self, number: &str) -> bool {
        self.shared.lock().current.mark_sent(number)
    }

    pub fn snapshot(&self) -> DeliveryRegistry {
        self.shared.lock().current.clone()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.shared.lock().current.summary()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// One compare-and-persist cycle. Returns true if the file was rewritten.
    pub fn persist_if_changed(&self) -> Result<bool> {
        self.shared.persist_if_changed()
    }

    /// Number of writes made to the state file by this store.
    pub fn persist_count(&self) -> u64 {
        self.shared.writes.load(Ordering::Relaxed)
    }

    /// Start the background watcher. A no-op while one is already running.
    pub fn start_watching(&self) -> Result<()> {
        let mut slot = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(w) = slot.as_ref() {
            if !w.handle.is_finished() {
                debug!("state watcher already running");
                return Ok(());
            }
        }

        let (stop, rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;
        let handle = std::thread::Builder::new()
            .name("smsblast-state-watcher".into())
            .spawn(move || watch_loop(shared, interval, rx))?;
        *slot = Some(Watcher { stop, handle });
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Stop and join the watcher, then flush anything it has not written yet.
    pub fn stop_watching(&self) -> Result<()> {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(w) = watcher {
            let _ = w.stop.send(());
            if w.handle.join().is_err() {
                warn!("state watcher panicked");
            }
        }
        self.persist_if_changed().map(|_| ())
    }
}

impl Drop for StateStore {
    fn drop(&mut self) {
        if self.is_watching() {
            if let Err(e) = self.stop_watching() {
                warn!(error = %e, "final state flush failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
