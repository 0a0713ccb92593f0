//! Seeded start-pose offsets, so benchmark seeds cover more than one
//! trajectory while each seed stays reproducible.

/// Offsets applied to a configured start pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartOffset {
    pub dx: f64,
    pub dy: f64,
    pub dheading: f64,
}

impl StartOffset {
    pub const ZERO: Self = Self {
        dx: 0.0,
        dy: 0.0,
        dheading: 0.0,
    };
}

/// Whole-pixel and whole-degree offsets in `-span..=span` per axis.
///
/// Seed 0 keeps the configured start untouched.
pub fn start_offset(seed: u32, span_px: u32, span_deg: u32) -> StartOffset {
    if seed == 0 {
        return StartOffset::ZERO;
    }
    let mut stream = SplitMix::new(seed);
    StartOffset {
        dx: stream.signed(span_px),
        dy: stream.signed(span_px),
        dheading: stream.signed(span_deg),
    }
}

/// splitmix64 stream keyed by the 32-bit run seed.
struct SplitMix(u64);

impl SplitMix {
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    fn new(seed: u32) -> Self {
        Self(u64::from(seed))
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(Self::GAMMA);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn signed(&mut self, span: u32) -> f64 {
        let choices = 2 * u64::from(span) + 1;
        (self.next_u64() % choices) as f64 - f64::from(span)
    }
}
