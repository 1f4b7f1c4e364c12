//! # Secure Tokens
//!
//! Format: `hex(json(payload)) "." hex(HMAC-SHA256(key, json(payload)))`.
//!
//! Validation is a pure function of the token, key, expected purpose and
//! the current time. Checks run in order: shape, tag, expiry, purpose.

use crate::domain::{TokenError, TokenPayload};
use shared_crypto::{hmac_sha256, verify_hmac_sha256, SecretKey};
use shared_types::Timestamp;

/// Encode and tag `payload`.
pub fn encode_token(payload: &TokenPayload, key: &SecretKey) -> Result<String, serde_json::Error> {
    let body = serde_json::to_vec(payload)?;
    let tag = hmac_sha256(key.as_bytes(), &body);
    Ok(format!("{}.{}", hex::encode(&body), hex::encode(tag)))
}

/// Validate and decode a token.
pub fn decode_token(
    token: &str,
    key: &SecretKey,
    expected_purpose: &str,
    now: Timestamp,
) -> Result<TokenPayload, TokenError> {
    let (body_hex, tag_hex) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let body = hex::decode(body_hex).map_err(|_| TokenError::Malformed)?;
    let tag = hex::decode(tag_hex).map_err(|_| TokenError::Malformed)?;

    verify_hmac_sha256(key.as_bytes(), &body, &tag).map_err(|_| TokenError::Tampered)?;

    let payload: TokenPayload =
        serde_json::from_slice(&body).map_err(|_| TokenError::Malformed)?;
    if now > payload.expiry {
        return Err(TokenError::Expired {
            expiry: payload.expiry,
        });
    }
    if payload.purpose != expected_purpose {
        return Err(TokenError::PurposeMismatch {
            expected: expected_purpose.to_string(),
            actual: payload.purpose,
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(expiry: u64) -> TokenPayload {
        TokenPayload {
            purpose: "api".into(),
            timestamp: Timestamp::new(100),
            nonce: "00ff".into(),
            expiry: Timestamp::new(expiry),
        }
    }

    fn key() -> SecretKey {
        SecretKey::from_bytes([3; 32])
    }

    #[test]
    fn test_valid_token() {
        let token = encode_token(&payload(200), &key()).unwrap();
        let decoded = decode_token(&token, &key(), "api", Timestamp::new(150)).unwrap();
        assert_eq!(decoded, payload(200));
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let token = encode_token(&payload(200), &key()).unwrap();
        assert!(decode_token(&token, &key(), "api", Timestamp::new(200)).is_ok());
        assert_eq!(
            decode_token(&token, &key(), "api", Timestamp::new(201)),
            Err(TokenError::Expired {
                expiry: Timestamp::new(200)
            })
        );
    }

    #[test]
    fn test_tampered_payload() {
        let token = encode_token(&payload(200), &key()).unwrap();
        let (body, tag) = token.split_once('.').unwrap();
        let mut bytes = hex::decode(body).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x01;
        let forged = format!("{}.{}", hex::encode(bytes), tag);
        assert_eq!(
            decode_token(&forged, &key(), "api", Timestamp::new(150)),
            Err(TokenError::Tampered)
        );
    }

    #[test]
    fn test_wrong_key_is_tampered() {
        let token = encode_token(&payload(200), &key()).unwrap();
        assert_eq!(
            decode_token(&token, &SecretKey::from_bytes([4; 32]), "api", Timestamp::new(150)),
            Err(TokenError::Tampered)
        );
    }

    #[test]
    fn test_purpose_mismatch() {
        let token = encode_token(&payload(200), &key()).unwrap();
        assert!(matches!(
            decode_token(&token, &key(), "admin", Timestamp::new(150)),
            Err(TokenError::PurposeMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "nodot", "zz.00", "00.zz"] {
            assert_eq!(
                decode_token(bad, &key(), "api", Timestamp::new(0)),
                Err(TokenError::Malformed),
                "input {bad:?}"
            );
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_bit_flip_is_rejected(index in any::<prop::sample::Index>(), bit in 0u8..8) {
                let token = encode_token(&payload(200), &key()).unwrap();
                let (body, tag) = token.split_once('.').unwrap();
                let mut bytes = hex::decode(body).unwrap();
                bytes.extend(hex::decode(tag).unwrap());
                let split = bytes.len() - 32;
                let i = index.index(bytes.len());
                bytes[i] ^= 1 << bit;
                let forged = format!(
                    "{}.{}",
                    hex::encode(&bytes[..split]),
                    hex::encode(&bytes[split..])
                );
                prop_assert_eq!(
                    decode_token(&forged, &key(), "api", Timestamp::new(150)),
                    Err(TokenError::Tampered)
                );
            }
        }
    }
}
