//! The `none` signature algorithm.
//!
//! The `none` algorithm is defined in [RFC 7518 section 3.6](https://tools.ietf.org/html/rfc7518#section-3.6).
//! It has an empty signature and does not provide any integrity protection.
//! The verifier does check that the signature is indeed empty, as the RFC requires.
//!
//! It doesn't often make sense to use this "algorithm", and it is only honored when
//! the caller explicitly registers it.

use super::SignatureAlgorithm;
use crate::jwk::{Jwk, KeyType};
use crate::Result;

/// The `none` algorithm: an empty signature, no integrity protection.
pub struct NoneAlgorithm;

impl SignatureAlgorithm for NoneAlgorithm {
	fn name(&self) -> &'static str {
		"none"
	}

	fn allowed_key_types(&self) -> &'static [KeyType] {
		&[KeyType::None]
	}

	fn sign(&self, key: &Jwk, _message: &[u8]) -> Result<Vec<u8>> {
		self.check_key_type(key)?;
		Ok(Vec::new())
	}

	fn verify(&self, key: &Jwk, _message: &[u8], signature: &[u8]) -> Result<bool> {
		self.check_key_type(key)?;
		Ok(signature.is_empty())
	}
}
