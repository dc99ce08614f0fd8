use crc32fast::Hasher;
use std::io::{self, Write};

/// crc + tstamp + ksz + vsz
pub const HEADER_SZ: u64 = 4 + 4 + 4 + 4;

pub fn calc_crc(tstamp: u32, key_sz: u32, val_sz: u32, k: &[u8], v: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&tstamp.to_be_bytes());
    hasher.update(&key_sz.to_be_bytes());
    hasher.update(&val_sz.to_be_bytes());
    hasher.update(k);
    hasher.update(v);
    hasher.finalize()
}

/// writes one data file entry to `w` and returns its encoded size
#[inline]
pub fn write_entry<W: Write>(w: &mut W, tstamp: u32, k: &[u8], v: &[u8]) -> io::Result<u64> {
    let kl = k.len() as u32;
    let vl = v.len() as u32;
    let crc = calc_crc(tstamp, kl, vl, k, v);

    w.write_all(&crc.to_be_bytes())?;
    w.write_all(&tstamp.to_be_bytes())?;
    w.write_all(&kl.to_be_bytes())?;
    w.write_all(&vl.to_be_bytes())?;
    w.write_all(k)?;
    w.write_all(v)?;

    Ok(HEADER_SZ + k.len() as u64 + v.len() as u64)
}
