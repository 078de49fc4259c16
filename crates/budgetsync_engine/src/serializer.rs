//! One mutating operation at a time per engine.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Serializes mutating operations.
///
/// A caller that arrives while another operation runs blocks until it
/// finishes, then runs its own closure. Every caller therefore gets the
/// result of its own input.
#[derive(Debug, Default)]
pub struct WriteSerializer {
    gate: Mutex<()>,
    in_flight: AtomicBool,
    contended: AtomicU64,
    executed: AtomicU64,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WriteSerializer {
    /// Creates an idle serializer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` once no other operation is in flight.
    pub fn execute<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = match self.gate.try_lock() {
            Some(guard) => guard,
            None => {
                self.contended.fetch_add(1, Ordering::SeqCst);
                self.gate.lock()
            }
        };
        self.in_flight.store(true, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let result = f();
        self.executed.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// Returns true while an operation runs.
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of callers that had to wait for another operation.
    pub fn contended(&self) -> u64 {
        self.contended.load(Ordering::SeqCst)
    }

    /// Number of operations run to completion.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn runs_closure_and_returns_its_result() {
        let s = WriteSerializer::new();
        assert!(!s.in_flight());
        let value = s.execute(|| {
            assert!(s.in_flight());
            41 + 1
        });
        assert_eq!(value, 42);
        assert!(!s.in_flight());
        assert_eq!(s.executed(), 1);
        assert_eq!(s.contended(), 0);
    }

    #[test]
    fn never_overlaps() {
        let s = Arc::new(WriteSerializer::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (s, active, max_seen, barrier) =
                    (s.clone(), active.clone(), max_seen.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    s.execute(|| {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        active.fetch_sub(1, Ordering::SeqCst);
                        i
                    })
                })
            })
            .collect();

        let mut results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(s.executed(), 8);
    }

    #[test]
    fn in_flight_cleared_after_panic() {
        let s = Arc::new(WriteSerializer::new());
        let s2 = s.clone();
        let result = thread::spawn(move || s2.execute(|| panic!("boom"))).join();
        assert!(result.is_err());
        assert!(!s.in_flight());
        // parking_lot mutexes are not poisoned.
        assert_eq!(s.execute(|| 1), 1);
    }
}
