//! Client-side fault policies.
//!
//! A policy is asked once before every chunk send whether to abandon the
//! attempt. The controller handles a positive answer exactly like a network
//! failure: back off, then retry the same chunk.

use rand::Rng;

/// Decides whether to simulate an interruption before sending a chunk.
pub trait FaultInjector: Send + Sync {
    fn should_interrupt(&self, chunk_index: usize, chunk_count: usize) -> bool;
}

/// Never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn should_interrupt(&self, _chunk_index: usize, _chunk_count: usize) -> bool {
        false
    }
}

/// Independent coin flip with fixed probability per chunk attempt.
///
/// Never fires on the last chunk, so every session gets at least one real
/// shot at completing.
#[derive(Debug, Clone, Copy)]
pub struct RandomInterruptions {
    probability: f64,
}

impl RandomInterruptions {
    /// `probability` is clamped to `[0, 1]`; NaN counts as 0.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl FaultInjector for RandomInterruptions {
    fn should_interrupt(&self, chunk_index: usize, chunk_count: usize) -> bool {
        if chunk_index + 1 >= chunk_count {
            return false;
        }
        rand::thread_rng().gen_bool(self.probability)
    }
}
