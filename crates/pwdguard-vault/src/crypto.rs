// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-CBC encrypt/decrypt for stored passwords.
//!
//! Every call to [`encrypt`] draws a fresh random 128-bit IV from the system
//! CSPRNG. The stored blob is `hex(iv) ":" hex(ciphertext)`, the format the
//! desktop app reads.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use pwdguard_core::VaultError;
use ring::rand::{SecureRandom, SystemRandom};

use crate::key::EncryptionKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;

/// Fill an `N`-byte array from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], VaultError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| VaultError::Encrypt("system random source unavailable".to_string()))?;
    Ok(buf)
}

/// A fresh 128-bit record id, hex encoded.
pub fn generate_record_id() -> Result<String, VaultError> {
    Ok(hex::encode(random_bytes::<16>()?))
}

/// Encrypt a plaintext password into the `iv:ciphertext` hex blob.
pub fn encrypt(key: &EncryptionKey, plaintext: &str) -> Result<String, VaultError> {
    let iv = random_bytes::<IV_LEN>()?;
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| VaultError::Encrypt(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
}

/// Decrypt an `iv:ciphertext` hex blob produced by [`encrypt`].
///
/// A wrong key usually surfaces as a padding failure, but CBC has no
/// authentication: garbage that happens to pad correctly is returned as a
/// UTF-8 error or, rarely, as wrong plaintext.
pub fn decrypt(key: &EncryptionKey, blob: &str) -> Result<String, VaultError> {
    let (iv_hex, ct_hex) = blob
        .split_once(':')
        .ok_or_else(|| VaultError::Decrypt("missing iv separator".to_string()))?;

    let iv = hex::decode(iv_hex).map_err(|e| VaultError::Decrypt(format!("iv: {e}")))?;
    if iv.len() != IV_LEN {
        return Err(VaultError::Decrypt(format!(
            "iv is {} bytes, expected {IV_LEN}",
            iv.len()
        )));
    }
    let ciphertext =
        hex::decode(ct_hex).map_err(|e| VaultError::Decrypt(format!("ciphertext: {e}")))?;

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| VaultError::Decrypt(e.to_string()))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| VaultError::Decrypt("bad padding (wrong key or corrupted data)".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| VaultError::Decrypt("plaintext is not valid UTF-8".to_string()))
}
