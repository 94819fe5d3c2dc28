// rng.rs - Random source for the simulations
//
// xorshift32: tiny, fast and good enough for decoration. Seeded runs are
// reproducible; unseeded runs pull their seed from the platform.

#[derive(Clone, Debug)]
pub struct Rng {
    state: u32,
}

impl Rng {
    /// Deterministic generator. Any seed is fine, including zero.
    pub fn seeded(seed: u64) -> Self {
        let folded = (seed ^ (seed >> 32)) as u32;
        // xorshift never leaves zero
        let state = if folded == 0 { 0xDEADBEEF } else { folded };
        Self { state }
    }

    /// Generator seeded from `getrandom` (crypto.getRandomValues on wasm).
    pub fn from_entropy() -> Self {
        let mut buf = [0u8; 8];
        if let Err(err) = getrandom::getrandom(&mut buf) {
            tracing::warn!(%err, "no entropy source, using fixed seed");
        }
        Self::seeded(u64::from_le_bytes(buf))
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform in [0, 1).
    #[inline(always)]
    pub fn next_f32(&mut self) -> f32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        (self.state >> 8) as f32 * (1.0 / 16777216.0)
    }

    /// Uniform in [lo, hi).
    #[inline]
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Uniform in [-half, half).
    #[inline]
    pub fn spread(&mut self, half: f32) -> f32 {
        (self.next_f32() - 0.5) * 2.0 * half
    }

    /// Integer in [lo, hi] inclusive.
    pub fn between(&mut self, lo: u32, hi: u32) -> u32 {
        let span = (hi - lo + 1) as f32;
        lo + ((self.next_f32() * span) as u32).min(hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::seeded(42);
        let mut b = Rng::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn zero_seed_still_moves() {
        let mut rng = Rng::seeded(0);
        let first = rng.next_f32();
        assert!((0..10).any(|_| rng.next_f32() != first));
    }

    #[test]
    fn values_stay_in_range() {
        let mut rng = Rng::seeded(7);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
            let r = rng.range(2.0, 2.4);
            assert!((2.0..=2.4).contains(&r));
            let n = rng.between(2, 3);
            assert!(n == 2 || n == 3);
        }
    }
}
