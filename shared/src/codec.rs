//! Symmetric AES-128-CBC codec for both ingress links.
//!
//! The telemetry link carries base64 text of PKCS7-padded ciphertext, the
//! command link carries raw unpadded blocks. Both are kept as separate
//! [`CipherSpec`] configurations because their framing differs structurally.
//! Every call is a pure transform; the same fixed IV is reused on each call.

use crate::error::{DecodeError, EncodeError};
use crate::BLOCK_SIZE;
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Cbc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Pkcs7,
    None,
}

/// Pre-shared key material plus the cipher configuration for one link
#[derive(Clone, PartialEq, Eq)]
pub struct CipherSpec {
    pub key: [u8; 16],
    pub iv: [u8; 16],
    pub mode: CipherMode,
    pub padding: Padding,
}

impl fmt::Debug for CipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSpec")
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .field("mode", &self.mode)
            .field("padding", &self.padding)
            .finish()
    }
}

impl CipherSpec {
    /// Telemetry link: AES-CBC with PKCS7 padding
    pub const fn telemetry() -> Self {
        Self {
            key: crate::TELEMETRY_KEY,
            iv: crate::TELEMETRY_IV,
            mode: CipherMode::Cbc,
            padding: Padding::Pkcs7,
        }
    }

    /// Command link: AES-CBC without padding, all-zero IV
    pub const fn command() -> Self {
        Self {
            key: crate::COMMAND_KEY,
            iv: crate::COMMAND_IV,
            mode: CipherMode::Cbc,
            padding: Padding::None,
        }
    }

    /// Decrypts raw ciphertext.
    ///
    /// Input must be a non-empty whole number of blocks in either padding
    /// mode. With PKCS7 the padding is verified and stripped; a bad pad is a
    /// [`DecodeError::Padding`]. Without padding the plaintext comes back
    /// exactly as long as the ciphertext.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let len = ciphertext.len();
        if len == 0 || len % BLOCK_SIZE != 0 {
            return Err(DecodeError::BlockLength { len });
        }

        match self.mode {
            CipherMode::Cbc => {
                let decryptor = Aes128CbcDec::new(&self.key.into(), &self.iv.into());
                match self.padding {
                    Padding::Pkcs7 => decryptor
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| DecodeError::Padding),
                    Padding::None => decryptor
                        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                        .map_err(|_| DecodeError::BlockLength { len }),
                }
            }
        }
    }

    /// Encrypts plaintext, the controller-side inverse of [`CipherSpec::decrypt`].
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncodeError> {
        match self.mode {
            CipherMode::Cbc => {
                let encryptor = Aes128CbcEnc::new(&self.key.into(), &self.iv.into());
                match self.padding {
                    Padding::Pkcs7 => Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
                    Padding::None => {
                        let len = plaintext.len();
                        if len == 0 || len % BLOCK_SIZE != 0 {
                            return Err(EncodeError::BlockLength { len });
                        }
                        Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(plaintext))
                    }
                }
            }
        }
    }

    /// Base64 text in, UTF-8 plaintext out
    pub fn decrypt_base64(&self, text: &str) -> Result<String, DecodeError> {
        let ciphertext = BASE64_STANDARD.decode(text)?;
        let plaintext = self.decrypt(&ciphertext)?;
        Ok(String::from_utf8(plaintext)?)
    }

    pub fn encrypt_base64(&self, text: &str) -> Result<String, EncodeError> {
        let ciphertext = self.encrypt(text.as_bytes())?;
        Ok(BASE64_STANDARD.encode(ciphertext))
    }
}

/// Strips the trailing NUL bytes used to fill a fixed-size block.
pub fn trim_nul_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}
