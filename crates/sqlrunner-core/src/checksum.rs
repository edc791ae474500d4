use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a script body.
///
/// The digest covers the exact UTF-8 bytes of the content, independent
/// of the file name, and is the sole signal for detecting drift between
/// the filesystem and the last recorded execution.
pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}
