//! Direct use of a shared symmetric key (`dir`, RFC 7518 section 4.5).
//!
//! The shared `oct` key *is* the content encryption key.
//! Nothing is wrapped: the encrypted key on the wire is empty.

use super::{KeyEncryptionAlgorithm, KeyManagementMode};
use crate::jwk::{Jwk, KeyType};
use crate::{Error, JsonObject, Result};

/// Direct use of a shared symmetric key as the CEK.
pub struct Dir;

impl Dir {
	fn cek(&self, key: &Jwk, cek_len: usize) -> Result<Vec<u8>> {
		self.check_key_type(key)?;
		let cek = key.get_bytes("k")?;
		if cek.len() != cek_len {
			return Err(Error::invalid_key(format!(
				"the key is {} bytes but the content encryption algorithm needs {}",
				cek.len(),
				cek_len
			)));
		}
		Ok(cek)
	}
}

impl KeyEncryptionAlgorithm for Dir {
	fn name(&self) -> &'static str {
		"dir"
	}

	fn allowed_key_types(&self) -> &'static [KeyType] {
		&[KeyType::Oct]
	}

	fn mode(&self) -> KeyManagementMode {
		KeyManagementMode::Derive
	}

	fn derive_cek(&self, key: &Jwk, cek_len: usize, _header: &mut JsonObject) -> Result<Vec<u8>> {
		self.cek(key, cek_len)
	}

	fn recover_cek(&self, key: &Jwk, cek_len: usize, _header: &JsonObject) -> Result<Vec<u8>> {
		self.cek(key, cek_len)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{b64, json_object};
	use assert2::assert;

	#[test]
	fn test_the_key_is_the_cek() {
		let key = Jwk::new(json_object!{"kty": "oct", "k": b64::encode([0x42; 32])}).unwrap();
		let cek = Dir.derive_cek(&key, 32, &mut JsonObject::new()).unwrap();
		assert!(cek == [0x42; 32]);
		assert!(Dir.recover_cek(&key, 32, &JsonObject::new()).unwrap() == cek);
	}

	#[test]
	fn test_key_length_must_match_the_content_encryption_algorithm() {
		let key = Jwk::new(json_object!{"kty": "oct", "k": b64::encode([0x42; 16])}).unwrap();
		assert!(let Err(Error::InvalidKey(_)) = Dir.derive_cek(&key, 32, &mut JsonObject::new()));
	}

	#[test]
	fn test_wrapping_is_refused() {
		let key = Jwk::new(json_object!{"kty": "oct", "k": b64::encode([0x42; 32])}).unwrap();
		assert!(let Err(Error::UnsupportedParameter(_)) = Dir.wrap_key(&key, &[0; 32], &mut JsonObject::new()));
	}
}
