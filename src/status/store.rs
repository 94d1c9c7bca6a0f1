//! Latest-value status store with a sticky dirty flag

use std::sync::{Mutex, MutexGuard};

use super::Status;

/// Smallest odometer change that triggers a broadcast
pub const ODOMETER_THRESHOLD: f64 = 0.1;

/// Smallest longitude/latitude change (degrees) that triggers a broadcast
pub const COORDINATE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Default)]
struct StoreState {
    current: Status,
    dirty: bool,
}

/// Thread-safe holder of the most recent status
///
/// `update` may be called from any thread at any rate. Every operation holds the
/// lock only for a field copy, so producers are never held up by the network.
#[derive(Debug, Default)]
pub struct StatusStore {
    state: Mutex<StoreState>,
}

impl StatusStore {
    /// Create an empty store holding the zero status
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current status
    ///
    /// Marks the store dirty if `status` differs from the current value beyond
    /// the thresholds. The flag stays set until [`consume`](Self::consume).
    pub fn update(&self, status: Status) {
        let mut state = self.lock();
        if !state.dirty && state.current.differs_from(&status) {
            state.dirty = true;
        }
        state.current = status;
    }

    /// Read the current status and dirty flag, clearing the flag
    pub fn consume(&self) -> (Status, bool) {
        let mut state = self.lock();
        let dirty = std::mem::replace(&mut state.dirty, false);
        (state.current, dirty)
    }

    /// Peek at the current status without touching the dirty flag
    pub fn current(&self) -> Status {
        self.lock().current
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // The state is two plain fields, so a panicking holder cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_initial_state() {
        let store = StatusStore::new();
        let (status, dirty) = store.consume();

        assert_eq!(status, Status::default());
        assert!(!dirty);
    }

    #[test]
    fn test_sub_threshold_update_is_not_dirty() {
        let store = StatusStore::new();
        store.update(Status::new(0.05, 0.0, 0.0));

        let (status, dirty) = store.consume();
        assert!(!dirty);
        // Value is still replaced so heartbeats carry it
        assert_eq!(status.odometer, 0.05);
    }

    #[test]
    fn test_threshold_update_is_dirty() {
        let store = StatusStore::new();
        store.update(Status::new(0.2, 0.0, 0.0));

        let (status, dirty) = store.consume();
        assert!(dirty);
        assert_eq!(status.odometer, 0.2);
    }

    #[test]
    fn test_consume_clears_flag_once() {
        let store = StatusStore::new();
        store.update(Status::new(5.0, 0.0, 0.0));

        assert!(store.consume().1);
        assert!(!store.consume().1);
    }

    #[test]
    fn test_dirty_is_sticky_until_consumed() {
        let store = StatusStore::new();
        store.update(Status::new(1.0, 0.0, 0.0));
        // Follow-up updates that are tiny relative to the new value
        store.update(Status::new(1.01, 0.0, 0.0));
        store.update(Status::new(1.02, 0.0, 0.0));

        let (status, dirty) = store.consume();
        assert!(dirty);
        assert_eq!(status.odometer, 1.02);
    }

    #[test]
    fn test_last_write_wins() {
        let store = StatusStore::new();
        store.update(Status::new(1.0, 10.0, 20.0));
        store.update(Status::new(2.0, 11.0, 21.0));
        store.update(Status::new(3.0, 12.0, 22.0));

        assert_eq!(store.current(), Status::new(3.0, 12.0, 22.0));
        assert_eq!(store.consume().0, Status::new(3.0, 12.0, 22.0));
    }

    #[test]
    fn test_comparison_is_against_latest_value() {
        let store = StatusStore::new();
        // Creeping by less than the threshold each step never marks dirty
        for i in 1..=10 {
            store.update(Status::new(i as f64 * 0.05, 0.0, 0.0));
        }

        let (status, dirty) = store.consume();
        assert!(!dirty);
        assert!((status.odometer - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_current_does_not_clear_flag() {
        let store = StatusStore::new();
        store.update(Status::new(0.0, 1.0, 0.0));

        let _ = store.current();
        assert!(store.consume().1);
    }

    #[test]
    fn test_concurrent_producers() {
        let store = Arc::new(StatusStore::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        store.update(Status::new((t * 1000 + i) as f64, 0.0, 0.0));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let (_, dirty) = store.consume();
        assert!(dirty);
    }
}
