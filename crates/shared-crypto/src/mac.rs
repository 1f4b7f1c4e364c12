//! # HMAC-SHA256 Integrity Tags
//!
//! Detached tags for secure tokens. Verification uses the constant-time
//! comparison built into `hmac`.

use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 tag length in bytes.
pub const TAG_LEN: usize = 32;

/// Compute the HMAC-SHA256 tag of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify a detached tag in constant time.
///
/// # Errors
///
/// Returns `CryptoError::MacMismatch` if the tag does not match.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> Result<(), CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.verify_slice(tag).map_err(|_| CryptoError::MacMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_verifies() {
        let tag = hmac_sha256(b"key", b"payload");
        assert!(verify_hmac_sha256(b"key", b"payload", &tag).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let tag = hmac_sha256(b"key", b"payload");
        assert!(matches!(
            verify_hmac_sha256(b"other", b"payload", &tag),
            Err(CryptoError::MacMismatch)
        ));
    }

    #[test]
    fn test_truncated_tag_rejected() {
        let tag = hmac_sha256(b"key", b"payload");
        assert!(verify_hmac_sha256(b"key", b"payload", &tag[..16]).is_err());
    }
}
