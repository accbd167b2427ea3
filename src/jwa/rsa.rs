//! RSASSA-PKCS1 v1.5 signature algorithms (RS256, RS384 and RS512).

use std::convert::TryFrom;

use rsa::signature::{SignatureEncoding as _, Signer as _, Verifier as _};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use super::SignatureAlgorithm;
use crate::jwk::{Jwk, KeyType};
use crate::{Error, Result};

/// Build an RSA public key from the `n` and `e` parameters of a JWK.
pub(crate) fn public_key(key: &Jwk) -> Result<RsaPublicKey> {
	let n = BigUint::from_bytes_be(&key.get_bytes("n")?);
	let e = BigUint::from_bytes_be(&key.get_bytes("e")?);
	RsaPublicKey::new(n, e).map_err(|e| Error::invalid_key(format!("invalid RSA public key: {}", e)))
}

/// Build an RSA private key from the `n`, `e`, `d` and (if present) `p`, `q` parameters of a JWK.
pub(crate) fn private_key(key: &Jwk) -> Result<RsaPrivateKey> {
	if !key.has("d") {
		return Err(Error::invalid_key("the key has no private part"));
	}
	let n = BigUint::from_bytes_be(&key.get_bytes("n")?);
	let e = BigUint::from_bytes_be(&key.get_bytes("e")?);
	let d = BigUint::from_bytes_be(&key.get_bytes("d")?);
	let primes = if key.has("p") && key.has("q") {
		vec![
			BigUint::from_bytes_be(&key.get_bytes("p")?),
			BigUint::from_bytes_be(&key.get_bytes("q")?),
		]
	} else {
		Vec::new()
	};
	RsaPrivateKey::from_components(n, e, d, primes)
		.map_err(|e| Error::invalid_key(format!("invalid RSA private key: {}", e)))
}

macro_rules! rsa_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $digest:ty) => {
		$(#[$meta])*
		pub struct $name;

		impl SignatureAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn allowed_key_types(&self) -> &'static [KeyType] {
				&[KeyType::Rsa]
			}

			fn sign(&self, key: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				let signing_key = rsa::pkcs1v15::SigningKey::<$digest>::new(private_key(key)?);
				let signature = signing_key
					.try_sign(message)
					.map_err(|e| Error::invalid_key(format!("RSA signing failed: {}", e)))?;
				Ok(signature.to_vec())
			}

			fn verify(&self, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<bool> {
				self.check_key_type(key)?;
				let verifying_key = rsa::pkcs1v15::VerifyingKey::<$digest>::new(public_key(key)?);
				let signature = match rsa::pkcs1v15::Signature::try_from(signature) {
					Ok(signature) => signature,
					Err(_) => return Ok(false),
				};
				Ok(verifying_key.verify(message, &signature).is_ok())
			}
		}
	};
}

rsa_algorithm! {
	/// RSASSA-PKCS1 v1.5 with SHA-256.
	Rs256, "RS256", Sha256
}

rsa_algorithm! {
	/// RSASSA-PKCS1 v1.5 with SHA-384.
	Rs384, "RS384", Sha384
}

rsa_algorithm! {
	/// RSASSA-PKCS1 v1.5 with SHA-512.
	Rs512, "RS512", Sha512
}

#[cfg(test)]
pub(crate) mod test {
	use super::*;
	use crate::{b64, json_object, JsonObject};
	use assert2::assert;
	use rsa::traits::{PrivateKeyParts, PublicKeyParts};

	/// Generate a fresh RSA key and express it as a JWK.
	pub(crate) fn generated_rsa_jwk() -> Jwk {
		let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).unwrap();
		let mut params = JsonObject::new();
		params.insert("kty".to_string(), "RSA".into());
		params.insert("n".to_string(), b64::encode(private.n().to_bytes_be()).into());
		params.insert("e".to_string(), b64::encode(private.e().to_bytes_be()).into());
		params.insert("d".to_string(), b64::encode(private.d().to_bytes_be()).into());
		params.insert("p".to_string(), b64::encode(private.primes()[0].to_bytes_be()).into());
		params.insert("q".to_string(), b64::encode(private.primes()[1].to_bytes_be()).into());
		Jwk::new(params).unwrap()
	}

	#[test]
	fn test_rs256_round_trip() {
		let key = generated_rsa_jwk();
		let signature = Rs256.sign(&key, b"eyJhbGciOiJSUzI1NiJ9.cGF5bG9hZA").unwrap();
		assert!(signature.len() == 256);
		assert!(Rs256.verify(&key, b"eyJhbGciOiJSUzI1NiJ9.cGF5bG9hZA", &signature).unwrap() == true);
		assert!(Rs256.verify(&key.to_public(), b"eyJhbGciOiJSUzI1NiJ9.cGF5bG9hZA", &signature).unwrap() == true);
	}

	#[test]
	fn test_rs256_rejects_tampering() {
		let key = generated_rsa_jwk();
		let signature = Rs256.sign(&key, b"message").unwrap();
		let mut mangled = signature.clone();
		mangled[0] ^= 1;
		assert!(Rs256.verify(&key, b"message", &mangled).unwrap() == false);
		assert!(Rs256.verify(&key, b"other message", &signature).unwrap() == false);
	}

	#[test]
	fn test_public_key_cannot_sign() {
		let key = generated_rsa_jwk().to_public();
		assert!(let Err(Error::InvalidKey(_)) = Rs256.sign(&key, b"message"));
	}

	#[test]
	fn test_wrong_key_type_is_rejected() {
		let key = Jwk::new(json_object!{"kty": "oct", "k": "c2VjcmV0"}).unwrap();
		assert!(let Err(Error::InvalidKey(_)) = Rs256.sign(&key, b"message"));
		assert!(let Err(Error::InvalidKey(_)) = Rs256.verify(&key, b"message", b"signature"));
	}
}
