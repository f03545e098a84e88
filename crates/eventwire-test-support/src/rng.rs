//! Seeded randomness for property-style tests.
//!
//! Every generator takes an explicit RNG so a failing case can be replayed
//! from its seed.

use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Returns an RNG that yields the same sequence for the same `seed`.
#[must_use]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Random text whose character count falls in `len`, mixing ASCII with
/// multi-byte characters so UTF-8 handling gets exercised.
pub fn random_text(rng: &mut impl Rng, len: Range<usize>) -> String {
    const ALPHABET: &[char] = &[
        'a', 'b', 'c', 'x', 'y', 'z', 'A', 'Q', '0', '7', '-', '_', '.', '@', ' ', 'é', 'ß', '한',
        '글', '💡',
    ];
    let count = rng.random_range(len);
    (0..count)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
        .collect()
}

/// Random instant with whole-millisecond precision between 1970 and 2100.
///
/// # Panics
///
/// Never; the generated range is within chrono's representable range.
pub fn random_millis_timestamp(rng: &mut impl Rng) -> DateTime<Utc> {
    let millis = rng.random_range(0..4_102_444_800_000_i64);
    DateTime::from_timestamp_millis(millis).unwrap()
}
