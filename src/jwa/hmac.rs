//! HMAC signature algorithms (HS256, HS384 and HS512) using RustCrypto.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::SignatureAlgorithm;
use crate::jwk::{Jwk, KeyType};
use crate::{Error, Result};

/// The shared secret of an `oct` key.
fn secret(key: &Jwk) -> Result<Vec<u8>> {
	let secret = key.get_bytes("k")?;
	if secret.is_empty() {
		return Err(Error::invalid_key("the \"k\" parameter must not be empty"));
	}
	Ok(secret)
}

macro_rules! hmac_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $digest:ty) => {
		$(#[$meta])*
		pub struct $name;

		impl SignatureAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn allowed_key_types(&self) -> &'static [KeyType] {
				&[KeyType::Oct]
			}

			fn sign(&self, key: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let mut mac = Hmac::<$digest>::new_from_slice(&secret(key)?)
					.map_err(|_| Error::invalid_key("invalid HMAC key"))?;
				mac.update(message);
				Ok(mac.finalize().into_bytes().to_vec())
			}

			fn verify(&self, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<bool> {
				let expected = self.sign(key, message)?;
				Ok(expected.as_slice().ct_eq(signature).into())
			}
		}
	};
}

hmac_algorithm! {
	/// HMAC with SHA-256.
	Hs256, "HS256", Sha256
}

hmac_algorithm! {
	/// HMAC with SHA-384.
	Hs384, "HS384", Sha384
}

hmac_algorithm! {
	/// HMAC with SHA-512.
	Hs512, "HS512", Sha512
}
