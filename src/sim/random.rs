use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of the uniform draws behind every mock perturbation (price walk,
/// bot metrics, mock addresses and hashes).
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// Uniform draw in `[-half_width, half_width)`.
    fn symmetric(&self, half_width: f64) -> f64 {
        (self.next_f64() - 0.5) * 2.0 * half_width
    }

    fn chance(&self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Uniform integer in `[0, upper)`.
    fn below(&self, upper: u32) -> u32 {
        ((self.next_f64() * upper as f64) as u32).min(upper.saturating_sub(1))
    }

    fn hex_string(&self, len: usize) -> String {
        (0..len)
            .map(|_| char::from_digit(self.below(16), 16).unwrap_or('0'))
            .collect()
    }
}

#[derive(Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen::<f64>(),
            Err(poisoned) => poisoned.into_inner().gen::<f64>(),
        }
    }
}

/// Replays a fixed sequence of draws, then repeats `fallback`.
pub struct ScriptedRandom {
    values: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            fallback: 0.5,
        }
    }

    /// Every draw returns `value`; `0.5` makes all symmetric perturbations zero.
    pub fn constant(value: f64) -> Self {
        Self {
            values: Mutex::new(VecDeque::new()),
            fallback: value,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        let next = match self.values.lock() {
            Ok(mut values) => values.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or(self.fallback)
    }
}

/// Applies a relative change to a decimal amount, `amount * (1 + fraction)`.
pub fn perturb(amount: Decimal, fraction: f64) -> Decimal {
    amount * (Decimal::ONE + to_decimal(fraction))
}

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}
