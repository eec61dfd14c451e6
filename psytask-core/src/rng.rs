//! Deterministic RNG streams segregated by experiment domain.
//!
//! Each stream is seeded from the session seed through an HMAC-SHA256 domain
//! tag, so drawing more from one stream never shifts another.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Bundle of RNG streams owned by a single session.
#[derive(Debug, Clone)]
pub struct RngBundle {
    layout: CountingRng<ChaCha20Rng>,
    selection: CountingRng<ChaCha20Rng>,
    schedule: CountingRng<ChaCha20Rng>,
    placement: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            layout: CountingRng::new(derive_stream_seed(seed, b"layout")),
            selection: CountingRng::new(derive_stream_seed(seed, b"selection")),
            schedule: CountingRng::new(derive_stream_seed(seed, b"schedule")),
            placement: CountingRng::new(derive_stream_seed(seed, b"placement")),
        }
    }

    /// Stream for item positions and rotations.
    pub fn layout(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.layout
    }

    /// Stream for the repeated/novel coin flip.
    pub fn selection(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.selection
    }

    /// Stream for deck outcome schedules.
    pub fn schedule(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.schedule
    }

    /// Stream for on-screen deck placement.
    pub fn placement(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.placement
    }

    /// Draws taken from each stream, by domain tag.
    #[must_use]
    pub const fn draw_counts(&self) -> [(&'static str, u64); 4] {
        [
            ("layout", self.layout.draws()),
            ("selection", self.selection.draws()),
            ("schedule", self.schedule.draws()),
            ("placement", self.placement.draws()),
        ]
    }

}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the fallback is never taken.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
