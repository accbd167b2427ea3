//! AES Key Wrap key management algorithms (A128KW, A192KW and A256KW, RFC 3394).

use std::convert::TryInto;

use aes_kw::{KekAes128, KekAes192, KekAes256};

use super::{KeyEncryptionAlgorithm, KeyManagementMode};
use crate::jwk::{Jwk, KeyType};
use crate::{Error, JsonObject, Result};

macro_rules! aes_kw_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $kek:ident, $key_len:literal) => {
		$(#[$meta])*
		pub struct $name;

		impl $name {
			fn kek(key: &Jwk) -> Result<$kek> {
				let bytes: [u8; $key_len] = key
					.get_bytes("k")?
					.as_slice()
					.try_into()
					.map_err(|_| Error::invalid_key(concat!($alg, " needs a ", $key_len, " byte key")))?;
				Ok($kek::from(bytes))
			}
		}

		impl KeyEncryptionAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn allowed_key_types(&self) -> &'static [KeyType] {
				&[KeyType::Oct]
			}

			fn mode(&self) -> KeyManagementMode {
				KeyManagementMode::Wrap
			}

			fn wrap_key(&self, key: &Jwk, cek: &[u8], _header: &mut JsonObject) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let kek = Self::kek(key)?;
				let mut wrapped = vec![0; cek.len() + 8];
				kek.wrap(cek, &mut wrapped)
					.map_err(|e| Error::invalid_key(format!("key wrap failed: {}", e)))?;
				Ok(wrapped)
			}

			fn unwrap_key(&self, key: &Jwk, encrypted_key: &[u8], _header: &JsonObject, cek_len: usize) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let kek = Self::kek(key)?;
				// The integrity check of RFC 3394 doubles as the authenticity check here:
				// any failure means this candidate key does not match.
				if encrypted_key.len() < 16 || encrypted_key.len() % 8 != 0 {
					return Err(Error::AuthenticationFailed);
				}
				let mut cek = vec![0; encrypted_key.len() - 8];
				kek.unwrap(encrypted_key, &mut cek)
					.map_err(|_| Error::AuthenticationFailed)?;
				if cek.len() != cek_len {
					return Err(Error::AuthenticationFailed);
				}
				Ok(cek)
			}
		}
	};
}

aes_kw_algorithm! {
	/// AES-128 key wrap.
	A128Kw, "A128KW", KekAes128, 16
}

aes_kw_algorithm! {
	/// AES-192 key wrap.
	A192Kw, "A192KW", KekAes192, 24
}

aes_kw_algorithm! {
	/// AES-256 key wrap.
	A256Kw, "A256KW", KekAes256, 32
}
