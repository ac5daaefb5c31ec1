//! Threaded interface for submitting and controlling searches.
//!
//! This module provides a minimal, thread-per-search runner that owns a shared
//! record set, executes searches on background threads and lets callers cancel
//! them by id. Cancellation is cooperative via an `Arc<AtomicBool>` and is
//! observed by the search driver between levels, so an in-flight level always
//! completes and the results gathered so far are returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, atomic::{AtomicBool, Ordering}};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{Result, SubgroupError};
use crate::record::RecordSet;
use crate::search::{Search, SearchConfig, SearchOutcome};

/// Cancellation token shared with the search thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self { Self(Arc::new(AtomicBool::new(false))) }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Opaque search identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchId(u64);

type Active = Arc<Mutex<HashMap<SearchId, CancelToken>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // the guarded maps stay consistent even if a holder panicked
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to a running or completed search.
pub struct SearchHandle {
    pub id: SearchId,
    cancel: CancelToken,
    started: Instant,
    join: JoinHandle<Result<SearchOutcome>>,
}
impl SearchHandle {
    /// Request cancellation (cooperative). The current level still runs to completion.
    pub fn cancel(&self) { self.cancel.cancel(); }
    /// Wait for the search to finish.
    pub fn join(self) -> Result<SearchOutcome> {
        self.join
            .join()
            .map_err(|_| SubgroupError::Execution("search thread panicked".into()))?
    }
    pub fn is_finished(&self) -> bool { self.join.is_finished() }
    /// Elapsed time since start.
    pub fn elapsed(&self) -> Duration { self.started.elapsed() }
}

/// Registry managing search lifecycles over one record set.
pub struct SearchInterface {
    records: Arc<RecordSet>,
    next_id: Mutex<u64>,
    active: Active,
}

impl SearchInterface {
    pub fn new(records: Arc<RecordSet>) -> Self {
        Self { records, next_id: Mutex::new(0), active: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn records(&self) -> &Arc<RecordSet> {
        &self.records
    }

    fn allocate_id(&self) -> SearchId {
        let mut g = lock(&self.next_id);
        *g += 1; SearchId(*g)
    }

    /// Submit a search for execution on a background thread. Configuration
    /// problems detectable without the catalog are reported here; the rest
    /// surface from [`SearchHandle::join`].
    pub fn start_search(&self, config: SearchConfig) -> Result<SearchHandle> {
        config.validate(&self.records)?;
        let id = self.allocate_id();
        let cancel = CancelToken::new();
        lock(&self.active).insert(id, cancel.clone());

        let records = Arc::clone(&self.records);
        let active = Arc::clone(&self.active);
        let cancel_for_thread = cancel.clone();
        let join = std::thread::spawn(move || {
            let outcome = Search::new(&records, config).and_then(|s| s.run_until(&cancel_for_thread));
            lock(&active).remove(&id);
            match &outcome {
                Ok(o) => info!(id = id.0, ms = o.elapsed_ms, stop = ?o.stop, "background search finished"),
                Err(e) => warn!(id = id.0, error = %e, "background search failed"),
            }
            outcome
        });

        Ok(SearchHandle { id, cancel, started: Instant::now(), join })
    }

    /// Run a search synchronously on the current thread.
    pub fn run_sync(&self, config: SearchConfig) -> Result<SearchOutcome> {
        Search::new(&self.records, config)?.run()
    }

    /// Cancel a search by id.
    pub fn cancel(&self, id: SearchId) -> bool {
        if let Some(tok) = lock(&self.active).get(&id) {
            tok.cancel();
            true
        } else { false }
    }

    /// Number of searches that have not finished yet.
    pub fn active(&self) -> usize {
        lock(&self.active).len()
    }
}
