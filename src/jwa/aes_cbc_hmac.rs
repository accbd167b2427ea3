//! AES-CBC with HMAC-SHA-2 composite content encryption (RFC 7518 section 5.2).
//!
//! The content encryption key is the concatenation of a MAC key and an encryption
//! key of equal size.
//! Encryption is MAC-then-encrypt as the RFC lays it out: encrypt with AES-CBC and
//! PKCS#7 padding, then authenticate `aad || iv || ciphertext || al` where `al` is
//! the bit length of the AAD as a 64 bit big-endian integer, and truncate the MAC
//! to half its size.
//! Decryption verifies the truncated tag in constant time before touching the
//! ciphertext.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::ContentEncryptionAlgorithm;
use crate::{Error, Result};

const IV_LEN: usize = 16;

macro_rules! aes_cbc_hmac_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $aes:ty, $digest:ty, $cek_len:literal, $tag_len:literal) => {
		$(#[$meta])*
		pub struct $name;

		impl $name {
			fn split_key(cek: &[u8]) -> Result<(&[u8], &[u8])> {
				if cek.len() != $cek_len {
					return Err(Error::invalid_key(concat!($alg, " needs a ", $cek_len, " byte key")));
				}
				Ok(cek.split_at($cek_len / 2))
			}

			fn authentication_tag(mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
				let mut mac = Hmac::<$digest>::new_from_slice(mac_key)
					.map_err(|_| Error::invalid_key("invalid MAC key"))?;
				mac.update(aad);
				mac.update(iv);
				mac.update(ciphertext);
				mac.update(&((aad.len() as u64) * 8).to_be_bytes());
				let mut tag = mac.finalize().into_bytes().to_vec();
				tag.truncate($tag_len);
				Ok(tag)
			}
		}

		impl ContentEncryptionAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn cek_len(&self) -> usize {
				$cek_len
			}

			fn iv_len(&self) -> usize {
				IV_LEN
			}

			fn encrypt(&self, cek: &[u8], plaintext: &[u8], iv: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
				let (mac_key, enc_key) = Self::split_key(cek)?;
				if iv.len() != IV_LEN {
					return Err(Error::unsupported_parameter("AES-CBC needs a 128 bit initialization vector"));
				}
				let ciphertext = cbc::Encryptor::<$aes>::new_from_slices(enc_key, iv)
					.map_err(|_| Error::invalid_key("invalid AES key"))?
					.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
				let tag = Self::authentication_tag(mac_key, aad, iv, &ciphertext)?;
				Ok((ciphertext, tag))
			}

			fn decrypt(&self, cek: &[u8], ciphertext: &[u8], iv: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
				let (mac_key, enc_key) = Self::split_key(cek)?;
				if iv.len() != IV_LEN {
					return Err(Error::AuthenticationFailed);
				}
				let expected = Self::authentication_tag(mac_key, aad, iv, ciphertext)?;
				if !bool::from(expected.as_slice().ct_eq(tag)) {
					return Err(Error::AuthenticationFailed);
				}
				cbc::Decryptor::<$aes>::new_from_slices(enc_key, iv)
					.map_err(|_| Error::invalid_key("invalid AES key"))?
					.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
					.map_err(|_| Error::AuthenticationFailed)
			}
		}
	};
}

aes_cbc_hmac_algorithm! {
	/// AES-128-CBC with HMAC-SHA-256 and a 128 bit tag.
	A128CbcHs256, "A128CBC-HS256", aes::Aes128, Sha256, 32, 16
}

aes_cbc_hmac_algorithm! {
	/// AES-192-CBC with HMAC-SHA-384 and a 192 bit tag.
	A192CbcHs384, "A192CBC-HS384", aes::Aes192, Sha384, 48, 24
}

aes_cbc_hmac_algorithm! {
	/// AES-256-CBC with HMAC-SHA-512 and a 256 bit tag.
	A256CbcHs512, "A256CBC-HS512", aes::Aes256, Sha512, 64, 32
}
