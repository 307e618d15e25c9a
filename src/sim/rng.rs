//! Lazy, replayable pseudo-random sequence
//!
//! A linear congruential generator (GCC constants) exposed as a persistent
//! value: drawing from a sequence never changes it, it hands back the value and
//! the sequence for the following draw. Two holders of the same sequence can
//! therefore diverge without affecting each other.

use serde::{Deserialize, Serialize};

const LCG_M: u64 = 0x8000_0000; // 2^31
const LCG_A: u64 = 1_103_515_245;
const LCG_C: u64 = 12_345;

/// One draw from a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    /// Value in [0, 0.5]
    pub value: f64,
    /// Sequence positioned after this draw
    pub next: RngSequence,
}

/// Head of a deterministic sequence of values in [0, 0.5]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RngSequence {
    seed: u32,
}

impl RngSequence {
    pub fn new(seed: u32) -> Self {
        Self {
            seed: (seed as u64 % LCG_M) as u32,
        }
    }

    /// Current internal seed
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Produce the head value and the rest of the sequence
    pub fn draw(self) -> Draw {
        let next_seed = hash(self.seed);
        Draw {
            value: scale(next_seed),
            next: Self { seed: next_seed },
        }
    }

    /// Value of the head without advancing
    pub fn value(self) -> f64 {
        self.draw().value
    }

    /// Sequence after the head
    pub fn next(self) -> Self {
        self.draw().next
    }

    /// Iterate the values of this sequence (does not consume `self`)
    pub fn values(self) -> impl Iterator<Item = f64> {
        std::iter::successors(Some(self.draw()), |d| Some(d.next.draw())).map(|d| d.value)
    }
}

#[inline]
fn hash(seed: u32) -> u32 {
    ((LCG_A * seed as u64 + LCG_C) % LCG_M) as u32
}

#[inline]
fn scale(hash: u32) -> f64 {
    hash as f64 / (2 * LCG_M - 2) as f64
}
