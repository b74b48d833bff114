use std::fmt::Write as _;

use crate::error::{ProvisionError, ProvisionResult};

/// `bytes` bytes from the OS random source, hex-encoded.
pub fn generate_hex(bytes: usize) -> ProvisionResult<String> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf)
        .map_err(|e| ProvisionError::Io(std::io::Error::other(e.to_string())))?;

    let mut out = String::with_capacity(bytes * 2);
    for b in &buf {
        let _ = write!(out, "{b:02x}");
    }
    Ok(out)
}

/// Application secret base: 64 random bytes.
pub fn secret_key_base() -> ProvisionResult<String> {
    generate_hex(64)
}

/// Database password: 24 random bytes, URL-safe as hex.
pub fn database_password() -> ProvisionResult<String> {
    generate_hex(24)
}
