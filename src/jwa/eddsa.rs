//! The EdDSA signature algorithm (RFC 8037).
//!
//! The signing keypair is derived from the private seed in the `d` parameter.
//! The algorithm dispatches on the declared `crv` value and rejects every curve it
//! does not explicitly support: there is no default or fallback curve.

use std::convert::TryInto;

use ed25519_dalek::{Signer as _, Verifier as _};

use super::SignatureAlgorithm;
use crate::jwk::{Jwk, KeyType};
use crate::{Error, Result};

/// EdDSA over the Ed25519 curve.
pub struct EdDsa;

/// Reject any curve other than the ones this algorithm explicitly supports.
fn check_curve(key: &Jwk) -> Result<()> {
	match key.get_str("crv")? {
		"Ed25519" => Ok(()),
		other => Err(Error::unsupported_curve(other)),
	}
}

fn seed(key: &Jwk) -> Result<[u8; 32]> {
	if !key.has("d") {
		return Err(Error::invalid_key("the key has no private part"));
	}
	key.get_bytes("d")?
		.as_slice()
		.try_into()
		.map_err(|_| Error::invalid_key("the \"d\" parameter of an Ed25519 key must decode to 32 bytes"))
}

impl SignatureAlgorithm for EdDsa {
	fn name(&self) -> &'static str {
		"EdDSA"
	}

	fn allowed_key_types(&self) -> &'static [KeyType] {
		&[KeyType::Okp]
	}

	fn sign(&self, key: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
		self.check_key_type(key)?;
		check_curve(key)?;
		let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed(key)?);
		Ok(signing_key.sign(message).to_bytes().to_vec())
	}

	fn verify(&self, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<bool> {
		self.check_key_type(key)?;
		check_curve(key)?;
		let public: [u8; 32] = key
			.get_bytes("x")?
			.as_slice()
			.try_into()
			.map_err(|_| Error::invalid_key("the \"x\" parameter of an Ed25519 key must decode to 32 bytes"))?;
		let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&public)
			.map_err(|_| Error::invalid_key("invalid Ed25519 public key"))?;
		let signature: ed25519_dalek::Signature = match signature.try_into() {
			Ok(signature) => signature,
			Err(_) => return Ok(false),
		};
		Ok(verifying_key.verify(message, &signature).is_ok())
	}
}
