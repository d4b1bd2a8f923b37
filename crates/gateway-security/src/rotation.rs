//! Provider-setting rotation sources.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Picks an index among eligible provider settings.
pub trait RotationSource: Send + Sync + std::fmt::Debug {
    /// Index in `0..len`; `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRotation;

impl RotationSource for RandomRotation {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Uniform choice from a seeded RNG shared behind a lock.
#[derive(Debug)]
pub struct SeededRotation {
    rng: Mutex<StdRng>,
}

impl SeededRotation {
    /// Create from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RotationSource for SeededRotation {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

/// Replays a fixed sequence of picks, wrapping at the end.
#[derive(Debug)]
pub struct SequenceRotation {
    picks: Vec<usize>,
    position: AtomicUsize,
}

impl SequenceRotation {
    /// Create from a sequence; an empty sequence always picks 0.
    #[must_use]
    pub fn new(picks: Vec<usize>) -> Self {
        Self {
            picks,
            position: AtomicUsize::new(0),
        }
    }
}

impl RotationSource for SequenceRotation {
    fn pick(&self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let at = self.position.fetch_add(1, Ordering::Relaxed) % self.picks.len();
        self.picks[at] % len
    }
}
