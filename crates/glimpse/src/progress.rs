//! Cosmetic progress estimate shown while a fetch is in flight.

use std::time::Duration;

/// Interval between estimate ticks.
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
/// The estimate never passes this until the load actually completes.
pub const PROGRESS_CAP: u8 = 90;
/// Largest increment per tick (exclusive).
const MAX_STEP: f64 = 30.0;

/// Minimal xorshift64; cosmetic jitter does not need a real RNG.
#[derive(Clone, Debug)]
struct Xorshift64(u64);

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    /// `f64` in `[0, 1)`.
    #[expect(clippy::cast_precision_loss, reason = "53-bit mantissa is the intent")]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Timed pseudo-random estimate: `0..=90` while loading, 100 once loaded.
#[derive(Clone, Debug)]
pub struct ProgressEstimator {
    value: f64,
    rng: Xorshift64,
}

impl ProgressEstimator {
    pub fn new(seed: u64) -> Self {
        Self {
            value: 0.0,
            rng: Xorshift64::new(seed),
        }
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// Advance by a random step, capped at [`PROGRESS_CAP`].
    pub fn tick(&mut self) -> u8 {
        self.value = (self.value + self.rng.next_f64() * MAX_STEP).min(f64::from(PROGRESS_CAP));
        self.get()
    }

    pub fn complete(&mut self) {
        self.value = 100.0;
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "clamped to 0..=100")]
    pub fn get(&self) -> u8 {
        self.value.clamp(0.0, 100.0).floor() as u8
    }
}
