use bytes::Bytes;
use rand::Rng;

/// length of every generated key: "key=" + 10 digits + "," + 10 digits
pub const KEY_LEN: usize = 25;

#[inline]
fn render(k: u64) -> Bytes {
    // the reduced value is embedded twice so every key has the same length
    Bytes::from(format!("key={k:010},{k:010}"))
}

/// returns the key for `hint` reduced into `0..threshold`
///
/// `threshold` must be non-zero; `BenchmarkConfig::validate` enforces it.
pub fn new_key(hint: u64, threshold: u64) -> Bytes {
    render(hint % threshold)
}

/// returns a uniformly drawn key in `0..threshold`
pub fn random_key<R: Rng + ?Sized>(rng: &mut R, threshold: u64) -> Bytes {
    render(rng.random_range(0..threshold))
}
