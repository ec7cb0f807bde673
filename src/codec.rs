//! C5 — opaque recall-id codec: a symmetric cipher keyed at process start
//! from a `"<key-bytes>:<iv-bytes>"` configuration string, producing
//! URL-safe, reversible ciphertext for click-URL embedding (spec §4.4).
//!
//! AES-128 in CTR mode is used: a stream cipher, so encrypt and decrypt are
//! the same XOR-with-keystream operation and the output length matches the
//! input (no padding to reason about in a click-id context). The fixed key
//! and IV are process-wide configuration, not a tested code pattern — this
//! matches the original's fixed `B64{Key, IV}` pair applied directly to the
//! recall id's decimal string (SPEC_FULL.md §C).

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ctr::Ctr64BE;

type Aes128Ctr = Ctr64BE<Aes128>;

const KEY_LEN: usize = 16;
const IV_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CodecConfigError {
    #[error("codec configuration must be \"<key>:<iv>\"")]
    MissingSeparator,
    #[error("codec key must be {KEY_LEN} bytes, got {0}")]
    BadKeyLength(usize),
    #[error("codec iv must be {IV_LEN} bytes, got {0}")]
    BadIvLength(usize),
}

/// Opaque, reversible encryption for recall ids. Pure and thread-safe (spec §5).
pub struct OpaqueIdCodec {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl OpaqueIdCodec {
    /// Parses the `"<key>:<iv>"` configuration string (spec §4.4, §6).
    pub fn from_config(spec: &str) -> Result<Self, CodecConfigError> {
        let (key, iv) = spec.split_once(':').ok_or(CodecConfigError::MissingSeparator)?;
        let key = key.as_bytes();
        let iv = iv.as_bytes();
        if key.len() != KEY_LEN {
            return Err(CodecConfigError::BadKeyLength(key.len()));
        }
        if iv.len() != IV_LEN {
            return Err(CodecConfigError::BadIvLength(iv.len()));
        }
        let mut key_buf = [0u8; KEY_LEN];
        let mut iv_buf = [0u8; IV_LEN];
        key_buf.copy_from_slice(key);
        iv_buf.copy_from_slice(iv);
        Ok(Self { key: key_buf, iv: iv_buf })
    }

    fn apply_keystream(&self, data: &mut [u8]) {
        let mut cipher = Aes128Ctr::new(&self.key.into(), &self.iv.into());
        cipher.apply_keystream(data);
    }

    /// Encrypts `plaintext` and base64url-encodes the result (no padding),
    /// matching the "output must be URL-safe" requirement (spec §4.4).
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut buf = plaintext.to_vec();
        self.apply_keystream(&mut buf);
        URL_SAFE_NO_PAD.encode(buf)
    }

    /// Inverse of [`Self::encrypt`]; used by the win-notice handler, not by
    /// this core directly, but exercised here for the round-trip invariant
    /// (spec §8 invariant 5).
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
        let mut buf = URL_SAFE_NO_PAD.decode(encoded)?;
        self.apply_keystream(&mut buf);
        Ok(buf)
    }
}
