use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const FORMAT_VERSION: u8 = 0x01;

/// Raised when a ciphertext cannot be opened with the given key.
///
/// A wrong key, a flipped bit and a truncated blob all look the same to
/// AES-GCM, so they share this one error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ciphertext authentication failed")]
pub struct AuthenticationError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed key")]
pub struct MalformedKey;

/// Only raised for plaintexts beyond the AES-GCM length limit (~64 GiB).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("plaintext too large to encrypt")]
pub struct EncryptionError;

/// Symmetric key for a single poll. Its text form doubles as the admin credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_LENGTH]);

impl Key {
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

// Keys never end up in logs.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(..)")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE.encode(self.0))
    }
}

impl FromStr for Key {
    type Err = MalformedKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE.decode(s.trim()).map_err(|_| MalformedKey)?;
        let bytes: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| MalformedKey)?;
        Ok(Key(bytes))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub fn generate_key() -> Key {
    let generated = Aes256Gcm::generate_key(OsRng);
    let mut bytes = [0u8; KEY_LENGTH];
    bytes.copy_from_slice(&generated);
    Key(bytes)
}

/// Output layout: `version || nonce || ciphertext+tag`.
pub fn encrypt(plaintext: &[u8], key: &Key) -> Result<Vec<u8>, EncryptionError> {
    let aead = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = aead
        .encrypt(&nonce, plaintext)
        .map_err(|_| EncryptionError)?;

    let mut output = Vec::with_capacity(1 + NONCE_LENGTH + ciphertext.len());
    output.push(FORMAT_VERSION);
    output.extend_from_slice(&nonce);
    output.extend(ciphertext);
    Ok(output)
}

pub fn decrypt(ciphertext: &[u8], key: &Key) -> Result<Vec<u8>, AuthenticationError> {
    if ciphertext.len() < 1 + NONCE_LENGTH + TAG_LENGTH || ciphertext[0] != FORMAT_VERSION {
        return Err(AuthenticationError);
    }
    let (nonce, sealed) = ciphertext[1..].split_at(NONCE_LENGTH);

    let aead = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    aead.decrypt(aes_gcm::Nonce::from_slice(nonce), sealed)
        .map_err(|_| AuthenticationError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let key = generate_key();
        let plaintext = br#"{"options":{"A":0,"B":0}}"#;

        let encrypted = encrypt(plaintext, &key).unwrap();
        assert_ne!(&encrypted[1 + NONCE_LENGTH..], plaintext.as_slice());
        assert_eq!(decrypt(&encrypted, &key).unwrap(), plaintext.to_vec());
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = generate_key();
        assert_ne!(encrypt(b"same", &key).unwrap(), encrypt(b"same", &key).unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = encrypt(b"ABOLISH ICE", &generate_key()).unwrap();
        assert_eq!(decrypt(&encrypted, &generate_key()), Err(AuthenticationError));
    }

    #[test]
    fn test_tampering_is_detected() {
        let key = generate_key();
        let mut encrypted = encrypt(b"tally: 3", &key).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert_eq!(decrypt(&encrypted, &key), Err(AuthenticationError));

        let mut encrypted = encrypt(b"tally: 3", &key).unwrap();
        encrypted[0] = 0x02;
        assert_eq!(decrypt(&encrypted, &key), Err(AuthenticationError));
    }

    #[test]
    fn test_truncation_is_detected() {
        let key = generate_key();
        let encrypted = encrypt(b"tally: 3", &key).unwrap();
        assert!(decrypt(&encrypted[..encrypted.len() - 4], &key).is_err());
        assert!(decrypt(&encrypted[..10], &key).is_err());
        assert!(decrypt(&[], &key).is_err());
    }

    #[test]
    fn test_key_text_form() {
        let key = generate_key();
        let text = key.to_string();
        assert_eq!(text.len(), 44);
        assert_eq!(text.parse::<Key>().unwrap(), key);

        assert_eq!("not a key".parse::<Key>(), Err(MalformedKey));
        assert_eq!(URL_SAFE.encode([7u8; 16]).parse::<Key>(), Err(MalformedKey));
    }
}
