//! ECDSA signature algorithms (ES256 and ES384).
//!
//! Signatures are the raw `r || s` concatenation the JOSE standards mandate,
//! not the ASN.1 DER form.
//! Like every signature algorithm in this crate, the implementations dispatch on the
//! declared `crv` value and reject anything outside their supported set.

use p256::ecdsa::signature::{Signer as _, Verifier as _};

use super::SignatureAlgorithm;
use crate::jwk::{Jwk, KeyType};
use crate::{Error, Result};

macro_rules! ecdsa_algorithm {
	($(#[$meta:meta])* $name:ident, $alg:literal, $crv:literal, $curve:ident, $field_len:literal) => {
		$(#[$meta])*
		pub struct $name;

		impl $name {
			fn check_curve(key: &Jwk) -> Result<()> {
				match key.get_str("crv")? {
					$crv => Ok(()),
					other => Err(Error::unsupported_curve(other)),
				}
			}

			fn verifying_key(key: &Jwk) -> Result<$curve::ecdsa::VerifyingKey> {
				let x = key.get_bytes("x")?;
				let y = key.get_bytes("y")?;
				if x.len() != $field_len || y.len() != $field_len {
					return Err(Error::invalid_key(concat!(
						"the \"x\" and \"y\" parameters of a ", $crv, " key must decode to ", $field_len, " bytes"
					)));
				}
				let point = $curve::EncodedPoint::from_affine_coordinates(
					$curve::FieldBytes::from_slice(&x),
					$curve::FieldBytes::from_slice(&y),
					false,
				);
				$curve::ecdsa::VerifyingKey::from_encoded_point(&point)
					.map_err(|_| Error::invalid_key("invalid ECDSA public key"))
			}
		}

		impl SignatureAlgorithm for $name {
			fn name(&self) -> &'static str {
				$alg
			}

			fn allowed_key_types(&self) -> &'static [KeyType] {
				&[KeyType::Ec]
			}

			fn sign(&self, key: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
				self.check_key_type(key)?;
				Self::check_curve(key)?;
				if !key.has("d") {
					return Err(Error::invalid_key("the key has no private part"));
				}
				let signing_key = $curve::ecdsa::SigningKey::from_slice(&key.get_bytes("d")?)
					.map_err(|_| Error::invalid_key("invalid ECDSA private key"))?;
				let signature: $curve::ecdsa::Signature = signing_key.sign(message);
				Ok(signature.to_bytes().to_vec())
			}

			fn verify(&self, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<bool> {
				self.check_key_type(key)?;
				Self::check_curve(key)?;
				let verifying_key = Self::verifying_key(key)?;
				let signature = match $curve::ecdsa::Signature::from_slice(signature) {
					Ok(signature) => signature,
					Err(_) => return Ok(false),
				};
				Ok(verifying_key.verify(message, &signature).is_ok())
			}
		}
	};
}

ecdsa_algorithm! {
	/// ECDSA with SHA-256 on the P-256 curve.
	Es256, "ES256", "P-256", p256, 32
}

ecdsa_algorithm! {
	/// ECDSA with SHA-384 on the P-384 curve.
	Es384, "ES384", "P-384", p384, 48
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::json_object;
	use assert2::assert;

	// Key taken from RFC 7515 appendix A.3
	// https://tools.ietf.org/html/rfc7515#appendix-A.3
	fn rfc7515_a3_key() -> Jwk {
		Jwk::new(json_object!{
			"kty": "EC",
			"crv": "P-256",
			"x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
			"y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
			"d": "jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI",
		}).unwrap()
	}

	#[test]
	fn test_es256_round_trip() {
		let key = rfc7515_a3_key();
		let signature = Es256.sign(&key, b"eyJhbGciOiJFUzI1NiJ9.cGF5bG9hZA").unwrap();
		assert!(signature.len() == 64);
		assert!(Es256.verify(&key, b"eyJhbGciOiJFUzI1NiJ9.cGF5bG9hZA", &signature).unwrap() == true);
		assert!(Es256.verify(&key.to_public(), b"eyJhbGciOiJFUzI1NiJ9.cGF5bG9hZA", &signature).unwrap() == true);
	}

	#[test]
	fn test_es256_rejects_tampering() {
		let key = rfc7515_a3_key();
		let signature = Es256.sign(&key, b"message").unwrap();
		let mut mangled = signature.clone();
		mangled[10] ^= 1;
		assert!(Es256.verify(&key, b"message", &mangled).unwrap() == false);
		assert!(Es256.verify(&key, b"other message", &signature).unwrap() == false);
		assert!(Es256.verify(&key, b"message", b"not a signature").unwrap() == false);
	}

	#[test]
	fn test_curve_confinement() {
		// ES384 must refuse a P-256 key even though it is a valid EC key.
		let key = rfc7515_a3_key();
		assert!(let Err(Error::UnsupportedCurve(_)) = Es384.sign(&key, b"message"));
		assert!(let Err(Error::UnsupportedCurve(_)) = Es384.verify(&key, b"message", b"signature"));
	}

	#[test]
	fn test_public_key_cannot_sign() {
		let key = rfc7515_a3_key().to_public();
		assert!(let Err(Error::InvalidKey(_)) = Es256.sign(&key, b"message"));
	}
}
