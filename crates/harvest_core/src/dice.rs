//! # Dice
//!
//! Every random decision in a run goes through one [`Dice`], which borrows
//! the engine's single randomness source. Seeding that source makes a run
//! fully reproducible; a mock source makes it scriptable in tests.

use rand::{Rng, RngCore};

/// Borrowed view of the run's randomness source.
pub struct Dice<'a> {
    rng: &'a mut dyn RngCore,
}

impl<'a> Dice<'a> {
    /// Wraps a randomness source.
    pub fn new(rng: &'a mut dyn RngCore) -> Self {
        Self { rng }
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Rolls against `chance`.
    ///
    /// Always consumes exactly one draw, so the stream stays aligned no
    /// matter how chances are configured. Chances outside `[0, 1]` are
    /// clamped and NaN counts as 0.
    #[inline]
    pub fn roll(&mut self, chance: f64) -> bool {
        let draw = self.unit();
        draw < clamp_chance(chance)
    }

    /// Counts successes over `trials` independent rolls at `chance`.
    ///
    /// At most [`MAX_ROLLED_TRIALS`] draws are taken. Larger batches roll
    /// that many and scale the hit count up to `trials`.
    pub fn successes(&mut self, trials: u32, chance: f64) -> u32 {
        let rolled = trials.min(MAX_ROLLED_TRIALS);
        let mut hits = 0u32;
        for _ in 0..rolled {
            if self.roll(chance) {
                hits += 1;
            }
        }
        if rolled == trials {
            return hits;
        }
        let scaled = u64::from(hits) * u64::from(trials) / u64::from(rolled);
        u32::try_from(scaled).unwrap_or(trials)
    }
}

/// Draw budget of a single [`Dice::successes`] call.
pub const MAX_ROLLED_TRIALS: u32 = 4096;

/// Clamps a configured probability into `[0, 1]`. NaN becomes 0.
#[inline]
#[must_use]
pub fn clamp_chance(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}
