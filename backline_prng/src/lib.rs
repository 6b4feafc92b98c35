// Random sources for accompaniment generation.
//
// Every stochastic decision in `backline_music` (drum swing draws, the
// syncopation gate, kick/crash placement, voicing choice) goes through the
// `RandomSource` trait defined here, so callers decide where randomness comes
// from:
// - `BandRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded via SplitMix64.
//   Same seed, same stream, on every platform.
// - `ScriptedRng`: replays a fixed list of draws. Tests use it to force a
//   specific probability band (e.g. "the syncopation gate fires, the
//   kick/crash draw lands in the kick band").
//
// The trait is object-safe because rules are stored as `Box<dyn Rule>` and
// receive the source as `&mut dyn RandomSource`.

use serde::{Deserialize, Serialize};

/// A source of uniform draws.
pub trait RandomSource {
    /// Uniform `f64` in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    fn range_usize(&mut self, low: usize, high: usize) -> usize;

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` never fires, `p >= 1.0` always fires.
    fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Xoshiro256++ generator used for real runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandRng {
    s: [u64; 4],
}

impl BandRng {
    /// Seed a generator from a single `u64`, expanded to 256 bits with
    /// SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform integer in `[low, high)` using rejection sampling, so small
    /// voicing lists are not biased by the modulo.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }
}

impl RandomSource for BandRng {
    /// Upper 53 bits of the next `u64`, scaled into `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Replays a fixed sequence of draws, cycling when it runs out.
///
/// Each value is one `next_f64` result. `range_usize` consumes one value `f`
/// and returns `low + floor(f * (high - low))`, so a script of `[0.0]` always
/// picks the first index. Values are clamped into `[0, 1)` on construction.
/// An empty script behaves like an endless run of `0.0`.
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = draws
            .into_iter()
            .map(|d| d.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { draws, cursor: 0 }
    }

    /// A source whose every draw is `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// How many draws have been consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        let value = if self.draws.is_empty() {
            0.0
        } else {
            self.draws[self.cursor % self.draws.len()]
        };
        self.cursor += 1;
        value
    }

    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        assert!(low < high, "range_usize: low must be less than high");
        let span = high - low;
        let offset = (self.next_f64() * span as f64) as usize;
        low + offset.min(span - 1)
    }
}
