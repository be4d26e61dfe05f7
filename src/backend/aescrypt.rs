//! Legacy codec: the AES Crypt v3 stream format.
//!
//! ```text
//! "AES" | 0x03 | 0x00
//! { u16 len | len bytes }* | 0x0000          extensions
//! u32 iterations
//! iv1[16]
//! CBC(key1, iv1, iv2[16] | key2[32])         48 bytes, unpadded
//! HMAC-SHA256(key1, session | 0x03)          32 bytes
//! CBC(key2, iv2, PKCS#7(plaintext))
//! HMAC-SHA256(key2, ciphertext)              32 bytes
//! ```
//!
//! `key1` is PBKDF2-HMAC-SHA512 over the UTF-8 password, salted with `iv1`.
//! The session HMAC is the wrong-password signal; the trailing HMAC detects
//! tampering with the payload.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::backend::platform::random_bytes;
use crate::config::{
    AESCRYPT_IV_SIZE, AESCRYPT_KEY_SIZE, AESCRYPT_MAC_SIZE, AESCRYPT_MAGIC, AESCRYPT_RESERVED_EXTENSION, AESCRYPT_SESSION_SIZE, AESCRYPT_VERSION, APP_NAME, LEGACY_MAX_KDF_ITERATIONS,
    MAX_PASSWORD_LENGTH,
};

type CbcEncryptor = cbc::Encryptor<Aes256>;
type CbcDecryptor = cbc::Decryptor<Aes256>;

#[derive(Debug, Error)]
pub enum AesCryptError {
    #[error("not an AES Crypt stream")]
    InvalidHeader,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),

    #[error("stream truncated")]
    Truncated,

    #[error("invalid kdf iteration count {0}")]
    InvalidIterations(u32),

    /// The session block HMAC did not verify under the derived key.
    #[error("incorrect password")]
    WrongPassword,

    /// The payload HMAC did not verify.
    #[error("payload tampered")]
    Tampered,

    #[error("invalid padding, stream corrupted")]
    Padding,

    #[error("cipher setup failed")]
    Cipher,

    #[error("rng failed")]
    Rng,
}

/// Stateless AES Crypt v3 codec.
#[derive(Clone, Copy, Debug)]
pub struct AesCrypt {
    iterations: u32,
}

impl AesCrypt {
    /// Creates a codec that writes `iterations` PBKDF2 rounds into new streams.
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// The longest password the codec accepts, in characters.
    pub const fn max_password_len(&self) -> usize {
        MAX_PASSWORD_LENGTH
    }

    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, AesCryptError> {
        let iv1: [u8; AESCRYPT_IV_SIZE] = random_bytes().map_err(|_| AesCryptError::Rng)?;
        let iv2: [u8; AESCRYPT_IV_SIZE] = random_bytes().map_err(|_| AesCryptError::Rng)?;
        let key2: [u8; AESCRYPT_KEY_SIZE] = random_bytes().map_err(|_| AesCryptError::Rng)?;
        let key1 = derive(password, &iv1, self.iterations);

        let mut session = [0u8; AESCRYPT_SESSION_SIZE];
        session[..AESCRYPT_IV_SIZE].copy_from_slice(&iv2);
        session[AESCRYPT_IV_SIZE..].copy_from_slice(&key2);
        let encrypted_session = CbcEncryptor::new_from_slices(&key1, &iv1).map_err(|_| AesCryptError::Cipher)?.encrypt_padded_vec_mut::<NoPadding>(&session);
        let session_mac = authenticate(&key1, &[&encrypted_session, &[AESCRYPT_VERSION]])?;

        let ciphertext = CbcEncryptor::new_from_slices(&key2, &iv2).map_err(|_| AesCryptError::Cipher)?.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let payload_mac = authenticate(&key2, &[&ciphertext])?;

        let mut out = Vec::with_capacity(header_len() + AESCRYPT_SESSION_SIZE + ciphertext.len() + 2 * AESCRYPT_MAC_SIZE + 4 + AESCRYPT_IV_SIZE);
        write_header(&mut out)?;
        out.extend_from_slice(&self.iterations.to_be_bytes());
        out.extend_from_slice(&iv1);
        out.extend_from_slice(&encrypted_session);
        out.extend_from_slice(&session_mac);
        out.extend_from_slice(&ciphertext);
        out.extend_from_slice(&payload_mac);

        Ok(out)
    }

    pub fn decrypt(&self, stream: &[u8], password: &str) -> Result<Vec<u8>, AesCryptError> {
        let mut cursor = Cursor::new(stream);

        if cursor.take(AESCRYPT_MAGIC.len()).map_err(|_| AesCryptError::InvalidHeader)? != AESCRYPT_MAGIC {
            return Err(AesCryptError::InvalidHeader);
        }
        let version = cursor.byte().map_err(|_| AesCryptError::InvalidHeader)?;
        if version != AESCRYPT_VERSION {
            return Err(AesCryptError::UnsupportedVersion(version));
        }
        cursor.byte()?;

        loop {
            let len = u16::from_be_bytes(cursor.array()?);
            if len == 0 {
                break;
            }
            cursor.take(usize::from(len))?;
        }

        let iterations = u32::from_be_bytes(cursor.array()?);
        if iterations == 0 || iterations > LEGACY_MAX_KDF_ITERATIONS {
            return Err(AesCryptError::InvalidIterations(iterations));
        }

        let iv1: [u8; AESCRYPT_IV_SIZE] = cursor.array()?;
        let encrypted_session = cursor.take(AESCRYPT_SESSION_SIZE)?;
        let session_mac = cursor.take(AESCRYPT_MAC_SIZE)?;

        let rest = cursor.rest();
        if rest.len() < AESCRYPT_IV_SIZE + AESCRYPT_MAC_SIZE {
            return Err(AesCryptError::Truncated);
        }
        let (ciphertext, payload_mac) = rest.split_at(rest.len() - AESCRYPT_MAC_SIZE);
        if ciphertext.len() % AESCRYPT_IV_SIZE != 0 {
            return Err(AesCryptError::Truncated);
        }

        let key1 = derive(password, &iv1, iterations);
        if !verify(&key1, session_mac, &[encrypted_session, &[AESCRYPT_VERSION]]) {
            return Err(AesCryptError::WrongPassword);
        }

        let session = CbcDecryptor::new_from_slices(&key1, &iv1)
            .map_err(|_| AesCryptError::Cipher)?
            .decrypt_padded_vec_mut::<NoPadding>(encrypted_session)
            .map_err(|_| AesCryptError::Padding)?;
        let (iv2, key2) = session.split_at(AESCRYPT_IV_SIZE);

        if !verify(key2, payload_mac, &[ciphertext]) {
            return Err(AesCryptError::Tampered);
        }

        CbcDecryptor::new_from_slices(key2, iv2).map_err(|_| AesCryptError::Cipher)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).map_err(|_| AesCryptError::Padding)
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; AESCRYPT_KEY_SIZE] {
    let mut key = [0u8; AESCRYPT_KEY_SIZE];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn authenticate(key: &[u8], parts: &[&[u8]]) -> Result<[u8; AESCRYPT_MAC_SIZE], AesCryptError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| AesCryptError::Cipher)?;
    parts.iter().for_each(|part| mac.update(part));
    Ok(mac.finalize().into_bytes().into())
}

fn verify(key: &[u8], expected: &[u8], parts: &[&[u8]]) -> bool {
    authenticate(key, parts).is_ok_and(|computed| bool::from(computed[..].ct_eq(expected)))
}

fn created_by() -> Vec<u8> {
    let mut extension = b"CREATED_BY\0".to_vec();
    extension.extend_from_slice(APP_NAME.as_bytes());
    extension.push(b' ');
    extension.extend_from_slice(crate::config::APP_VERSION.as_bytes());
    extension
}

fn header_len() -> usize {
    AESCRYPT_MAGIC.len() + 2 + 2 + created_by().len() + 2 + AESCRYPT_RESERVED_EXTENSION + 2
}

fn write_header(out: &mut Vec<u8>) -> Result<(), AesCryptError> {
    out.extend_from_slice(AESCRYPT_MAGIC);
    out.push(AESCRYPT_VERSION);
    out.push(0x00);

    let created_by = created_by();
    out.extend_from_slice(&extension_len(created_by.len())?);
    out.extend_from_slice(&created_by);

    out.extend_from_slice(&extension_len(AESCRYPT_RESERVED_EXTENSION)?);
    out.extend_from_slice(&[0u8; AESCRYPT_RESERVED_EXTENSION]);

    out.extend_from_slice(&0u16.to_be_bytes());
    Ok(())
}

/// Big-endian `u16` length prefix of an extension block.
fn extension_len(len: usize) -> Result<[u8; 2], AesCryptError> {
    u16::try_from(len).map(u16::to_be_bytes).map_err(|_| AesCryptError::Cipher)
}

/// Bounds-checked reader over the input stream.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AesCryptError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len()).ok_or(AesCryptError::Truncated)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AesCryptError> {
        self.take(N)?.try_into().map_err(|_| AesCryptError::Truncated)
    }

    fn byte(&mut self) -> Result<u8, AesCryptError> {
        Ok(self.take(1)?[0])
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
