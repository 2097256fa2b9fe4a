//! Load-once cell for model artifacts.
//!
//! State machine:
//!
//! ```text
//!            get_or_load            load Ok
//! Unloaded ─────────────▶ Loading ─────────▶ Loaded
//!    ▲                       │
//!    │ loader panicked       │ load Err
//!    └───────────────────────┤
//!                            ▼
//!                          Failed ── next new caller ──▶ Loading
//! ```
//!
//! Exactly one caller runs the loader at a time. Callers that arrive while a
//! load is in flight block on a condvar and receive that attempt's outcome,
//! either the shared artifacts or a clone of the same error. The error of
//! the latest failed attempt is kept, so a waiter that wakes only after a
//! newer attempt has started still gets its own attempt's error. A failure is
//! not permanent: the next caller that did not wait on it starts a new
//! attempt. Once loaded, reads are a lock plus an `Arc` clone.

use crate::domain::errors::PredictionError;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Observable state of a [`ModelCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

enum LoadState<T> {
    Unloaded,
    Loading { attempt: u64 },
    Loaded(Arc<T>),
    Failed,
}

struct Inner<T> {
    state: LoadState<T>,
    attempts: u64,
    last_failure: Option<(u64, PredictionError)>,
}

impl<T> Inner<T> {
    fn failure_of(&self, attempt: u64) -> Option<PredictionError> {
        match &self.last_failure {
            Some((failed, error)) if *failed == attempt => Some(error.clone()),
            _ => None,
        }
    }
}

pub struct ModelCell<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

impl<T> Default for ModelCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelCell<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LoadState::Unloaded,
                attempts: 0,
                last_failure: None,
            }),
            ready: Condvar::new(),
        }
    }

    // The loader never runs under this lock, so poisoning cannot leave a
    // half-written state behind.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> LoadStatus {
        match self.lock().state {
            LoadState::Unloaded => LoadStatus::Unloaded,
            LoadState::Loading { .. } => LoadStatus::Loading,
            LoadState::Loaded(_) => LoadStatus::Loaded,
            LoadState::Failed => LoadStatus::Failed,
        }
    }

    /// Number of load attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }

    /// Returns the value if a load has already succeeded.
    pub fn get(&self) -> Option<Arc<T>> {
        match &self.lock().state {
            LoadState::Loaded(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Returns the loaded value, running `load` first if nothing is loaded
    /// and no load is in flight.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>, PredictionError>
    where
        F: FnOnce() -> Result<T, PredictionError>,
    {
        let mut inner = self.lock();
        let mut awaited = None;

        loop {
            if let Some(error) = awaited.and_then(|attempt| inner.failure_of(attempt)) {
                return Err(error);
            }
            match &inner.state {
                LoadState::Loaded(value) => return Ok(Arc::clone(value)),
                LoadState::Loading { attempt } => {
                    awaited = Some(*attempt);
                    inner = self
                        .ready
                        .wait(inner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                LoadState::Unloaded | LoadState::Failed => break,
            }
        }

        inner.attempts += 1;
        let attempt = inner.attempts;
        inner.state = LoadState::Loading { attempt };
        drop(inner);

        let mut guard = LoadingGuard {
            cell: self,
            attempt,
            finished: false,
        };
        let result = load();

        let mut inner = self.lock();
        let outcome = match result {
            Ok(value) => {
                let value = Arc::new(value);
                inner.state = LoadState::Loaded(Arc::clone(&value));
                Ok(value)
            }
            Err(error) => {
                inner.state = LoadState::Failed;
                inner.last_failure = Some((attempt, error.clone()));
                Err(error)
            }
        };
        guard.finished = true;
        drop(inner);
        self.ready.notify_all();

        outcome
    }
}

/// Resets a Loading state left behind by a panicking loader so waiters are
/// released and the next caller can retry.
struct LoadingGuard<'a, T> {
    cell: &'a ModelCell<T>,
    attempt: u64,
    finished: bool,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut inner = self.cell.lock();
        if matches!(inner.state, LoadState::Loading { attempt } if attempt == self.attempt) {
            inner.state = LoadState::Unloaded;
        }
        drop(inner);
        self.cell.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Barrier, mpsc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn load_error() -> PredictionError {
        PredictionError::model_load("classifier", "weights.json", "corrupt")
    }

    #[test]
    fn test_starts_unloaded() {
        let cell: ModelCell<u32> = ModelCell::new();
        assert_eq!(cell.status(), LoadStatus::Unloaded);
        assert!(cell.get().is_none());
        assert_eq!(cell.attempts(), 0);
    }

    #[test]
    fn test_loads_once_then_reuses() {
        let cell = ModelCell::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cell
                .get_or_load(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42u32)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.status(), LoadStatus::Loaded);
    }

    #[test]
    fn test_failure_is_not_permanent() {
        let cell = ModelCell::new();

        let err = cell.get_or_load(|| Err::<u32, _>(load_error())).unwrap_err();
        assert_eq!(err, load_error());
        assert_eq!(cell.status(), LoadStatus::Failed);
        assert!(cell.get().is_none());

        let value = cell.get_or_load(|| Ok(7u32)).unwrap();
        assert_eq!(*value, 7);
        assert_eq!(cell.attempts(), 2);
    }

    #[test]
    fn test_concurrent_first_calls_run_one_load() {
        let cell = Arc::new(ModelCell::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cell.get_or_load(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(100));
                        Ok(String::from("weights"))
                    })
                })
            })
            .collect();

        for handle in handles {
            let value = handle.join().unwrap().unwrap();
            assert_eq!(value.as_str(), "weights");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiters_share_the_same_failure() {
        let cell = Arc::new(ModelCell::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(6));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let cell = cell.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cell.get_or_load(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(150));
                        Err(load_error())
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap_err(), load_error());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_loader_resets_to_unloaded() {
        let cell = Arc::new(ModelCell::<u32>::new());

        let panicking = cell.clone();
        let result = thread::spawn(move || {
            let _ = panicking.get_or_load(|| panic!("loader exploded"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(cell.status(), LoadStatus::Unloaded);
        assert_eq!(*cell.get_or_load(|| Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_waiter_gets_its_attempts_error_after_next_attempt_starts() {
        let cell = Arc::new(ModelCell::<u32>::new());
        {
            let mut inner = cell.lock();
            inner.attempts = 1;
            inner.state = LoadState::Loading { attempt: 1 };
        }

        let (tx, rx) = mpsc::channel();
        let waiter = cell.clone();
        thread::spawn(move || {
            let _ = tx.send(waiter.get_or_load(|| Ok(99)));
        });
        thread::sleep(Duration::from_millis(200));

        // Attempt 1 fails and attempt 2 starts before the waiter reacquires the lock
        {
            let mut inner = cell.lock();
            inner.last_failure = Some((1, load_error()));
            inner.attempts = 2;
            inner.state = LoadState::Loading { attempt: 2 };
        }
        cell.ready.notify_all();

        let result = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("waiter should not block on attempt 2");
        assert_eq!(result.unwrap_err(), load_error());
        assert_eq!(cell.status(), LoadStatus::Loading);
    }
}
