//! AES-GCM content encryption algorithms (A128GCM, A192GCM and A256GCM).

use aes::cipher::consts::U12;
use aes::Aes192;
use aes_gcm::aead::{AeadInPlace, KeyInit, Nonce, Tag};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use super::ContentEncryptionAlgorithm;
use crate::{Error, Result};

type Aes192Gcm = AesGcm<Aes192, U12>;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn encrypt_detached<C: AeadInPlace + KeyInit>(cek: &[u8], plaintext: &[u8], iv: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
	let cipher = C::new_from_slice(cek).map_err(|_| Error::invalid_key("wrong content encryption key size"))?;
	if iv.len() != IV_LEN {
		return Err(Error::unsupported_parameter("AES-GCM needs a 96 bit initialization vector"));
	}
	let mut ciphertext = plaintext.to_vec();
	let tag = cipher
		.encrypt_in_place_detached(Nonce::<C>::from_slice(iv), aad, &mut ciphertext)
		.map_err(|_| Error::invalid_key("AES-GCM encryption failed"))?;
	Ok((ciphertext, tag.to_vec()))
}

fn decrypt_detached<C: AeadInPlace + KeyInit>(cek: &[u8], ciphertext: &[u8], iv: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
	let cipher = C::new_from_slice(cek).map_err(|_| Error::invalid_key("wrong content encryption key size"))?;
	if iv.len() != IV_LEN || tag.len() != TAG_LEN {
		return Err(Error::AuthenticationFailed);
	}
	let mut plaintext = ciphertext.to_vec();
	cipher
		.decrypt_in_place_detached(Nonce::<C>::from_slice(iv), aad, &mut plaintext, Tag::<C>::from_slice(tag))
		.map_err(|_| Error::AuthenticationFailed)?;
	Ok(plaintext)
}

macro_rules! aes_gcm_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $cipher:ty, $cek_len:literal) => {
		$(#[$meta])*
		pub struct $name;

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
				encrypt_detached::<$cipher>(cek, plaintext, iv, aad)
			}

			fn decrypt(&self, cek: &[u8], ciphertext: &[u8], iv: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
				decrypt_detached::<$cipher>(cek, ciphertext, iv, tag, aad)
			}
		}
	};
}

aes_gcm_algorithm! {
	/// AES-GCM with a 128 bit key.
	A128Gcm, "A128GCM", Aes128Gcm, 16
}

aes_gcm_algorithm! {
	/// AES-GCM with a 192 bit key.
	A192Gcm, "A192GCM", Aes192Gcm, 24
}

aes_gcm_algorithm! {
	/// AES-GCM with a 256 bit key.
	A256Gcm, "A256GCM", Aes256Gcm, 32
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn test_round_trip() {
		for algorithm in &[&A128Gcm as &dyn ContentEncryptionAlgorithm, &A192Gcm, &A256Gcm] {
			let cek = vec![0x13; algorithm.cek_len()];
			let iv = vec![0x24; algorithm.iv_len()];
			let (ciphertext, tag) = algorithm.encrypt(&cek, b"attack at dawn", &iv, b"aad").unwrap();

			assert!(ciphertext.len() == b"attack at dawn".len());
			assert!(tag.len() == 16);
			assert!(algorithm.decrypt(&cek, &ciphertext, &iv, &tag, b"aad").unwrap() == b"attack at dawn");
		}
	}

	#[test]
	fn test_tampering_is_detected() {
		let cek = [0x13; 32];
		let iv = [0x24; 12];
		let (ciphertext, tag) = A256Gcm.encrypt(&cek, b"attack at dawn", &iv, b"aad").unwrap();

		let mut mangled = ciphertext.clone();
		mangled[0] ^= 1;
		assert!(let Err(Error::AuthenticationFailed) = A256Gcm.decrypt(&cek, &mangled, &iv, &tag, b"aad"));

		let mut mangled_tag = tag.clone();
		mangled_tag[15] ^= 1;
		assert!(let Err(Error::AuthenticationFailed) = A256Gcm.decrypt(&cek, &ciphertext, &iv, &mangled_tag, b"aad"));

		assert!(let Err(Error::AuthenticationFailed) = A256Gcm.decrypt(&cek, &ciphertext, &iv, &tag, b"other aad"));
	}

	#[test]
	fn test_wrong_key_sizes_are_rejected() {
		let iv = [0x24; 12];
		assert!(let Err(Error::InvalidKey(_)) = A256Gcm.encrypt(&[0x13; 16], b"x", &iv, b""));
		assert!(let Err(Error::InvalidKey(_)) = A128Gcm.encrypt(&[0x13; 32], b"x", &iv, b""));
	}
}
