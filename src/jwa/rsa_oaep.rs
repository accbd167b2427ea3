//! RSAES-OAEP key management algorithms (RSA-OAEP and RSA-OAEP-256).
//!
//! `RSA-OAEP` uses SHA-1 for both the OAEP hash and the mask generation function,
//! `RSA-OAEP-256` uses SHA-256, exactly as RFC 7518 section 4.3 assigns them.

use rsa::Oaep;
use sha1::Sha1;
use sha2::Sha256;

use super::{rsa::private_key, rsa::public_key, KeyEncryptionAlgorithm, KeyManagementMode};
use crate::jwk::{Jwk, KeyType};
use crate::{Error, JsonObject, Result};

macro_rules! rsa_oaep_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $digest:ty) => {
		$(#[$meta])*
		pub struct $name;

		impl KeyEncryptionAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn allowed_key_types(&self) -> &'static [KeyType] {
				&[KeyType::Rsa]
			}

			fn mode(&self) -> KeyManagementMode {
				KeyManagementMode::Wrap
			}

			fn wrap_key(&self, key: &Jwk, cek: &[u8], _header: &mut JsonObject) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let public = public_key(key)?;
				public
					.encrypt(&mut rand::rngs::OsRng, Oaep::new::<$digest>(), cek)
					.map_err(|e| Error::invalid_key(format!("OAEP encryption failed: {}", e)))
			}

			fn unwrap_key(&self, key: &Jwk, encrypted_key: &[u8], _header: &JsonObject, cek_len: usize) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let private = private_key(key)?;
				let cek = private
					.decrypt(Oaep::new::<$digest>(), encrypted_key)
					.map_err(|_| Error::AuthenticationFailed)?;
				if cek.len() != cek_len {
					return Err(Error::AuthenticationFailed);
				}
				Ok(cek)
			}
		}
	};
}

rsa_oaep_algorithm! {
	/// RSAES-OAEP with SHA-1.
	RsaOaep, "RSA-OAEP", Sha1
}

rsa_oaep_algorithm! {
	/// RSAES-OAEP with SHA-256.
	RsaOaep256, "RSA-OAEP-256", Sha256
}
