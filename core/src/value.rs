use bytes::Bytes;
use rand::RngCore;

/// generates a random payload of exactly `n_kb` KiB.
///
/// the payload is built once per run and shared read-only across workers, so
/// the returned `Bytes` is cheap to clone.
pub fn value_of_size(n_kb: usize) -> Bytes {
    let mut v = vec![0u8; n_kb * 1024];
    rand::rng().fill_bytes(&mut v);
    v.into()
}
