//! Frame-seeded pseudorandom values.

/// SplitMix64 step.
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform value in `[0, 1)` determined entirely by `(seed, x)`.
pub fn noise01(seed: u64, x: u64) -> f64 {
    let v = mix64(seed ^ x.wrapping_mul(0xD6E8_FEB8_6659_FD93)) >> 11;
    v as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Uniform value in `[-1, 1)`.
pub fn noise_signed(seed: u64, x: u64) -> f64 {
    noise01(seed, x) * 2.0 - 1.0
}
