//! Session record encryption.
//!
//! Record layout: `salt(32) ∥ iv(16) ∥ tag(16) ∥ ciphertext`. The key is
//! derived per record with PBKDF2-HMAC-SHA256 over the configured secret and
//! that record's random salt, so two encryptions of the same plaintext never
//! produce the same bytes. AES-256-GCM authenticates the ciphertext; any
//! tampering fails the open.

use crate::error::SessionError;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Shortest secret accepted for key derivation.
pub const MIN_SECRET_LEN: usize = 32;

/// AES-256-GCM with the 16-byte IV the record format carries.
type RecordCipher = AesGcm<Aes256, U16>;

fn derive_key(secret: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt a serialized session with a fresh random salt and IV.
pub fn encrypt_record(secret: &str, plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(secret, &salt);
    let cipher =
        RecordCipher::new_from_slice(&key).map_err(|_| SessionError::EncryptionFailed)?;

    let sealed = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|_| SessionError::EncryptionFailed)?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut record = Vec::with_capacity(SALT_LEN + IV_LEN + TAG_LEN + ciphertext.len());
    record.extend_from_slice(&salt);
    record.extend_from_slice(&iv);
    record.extend_from_slice(tag);
    record.extend_from_slice(ciphertext);
    Ok(record)
}

/// Decrypt a record produced by [`encrypt_record`].
pub fn decrypt_record(secret: &str, record: &[u8]) -> Result<Vec<u8>, SessionError> {
    const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;
    if record.len() < HEADER_LEN {
        return Err(SessionError::InvalidFormat(format!(
            "record is {} bytes, need at least {HEADER_LEN}",
            record.len()
        )));
    }

    let (salt, rest) = record.split_at(SALT_LEN);
    let (iv, rest) = rest.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let key = derive_key(secret, salt);
    let cipher =
        RecordCipher::new_from_slice(&key).map_err(|_| SessionError::DecryptionFailed)?;

    // The AEAD api expects ciphertext ∥ tag.
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::<U16>::from_slice(iv), sealed.as_slice())
        .map_err(|_| SessionError::DecryptionFailed)
}
