//! Building signed messages.

use std::sync::Arc;

use super::{signing_input, Jws, Signature};
use crate::header::get_required_header_str;
use crate::jwa::SignatureAlgorithmRegistry;
use crate::jwk::Jwk;
use crate::{b64, Error, JsonObject, Result};

/// Builds a [`Jws`] with one payload and any number of signatures.
///
/// The algorithm for each signature is taken from the `alg` header parameter of that
/// signature and must be present in the registry the builder was created with: the
/// registry is the allow-list.
///
/// The build is atomic.
/// If any signature cannot be computed, no message is produced at all.
pub struct JwsBuilder {
	algorithms: Arc<SignatureAlgorithmRegistry>,
	payload: Vec<u8>,
	signatures: Vec<PendingSignature>,
}

struct PendingSignature {
	key: Jwk,
	algorithm: String,
	protected: Option<JsonObject>,
	unprotected: Option<JsonObject>,
}

impl JwsBuilder {
	pub fn new(algorithms: Arc<SignatureAlgorithmRegistry>) -> Self {
		Self {
			algorithms,
			payload: Vec::new(),
			signatures: Vec::new(),
		}
	}

	/// Set the payload to sign.
	pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
		self.payload = payload.into();
		self
	}

	/// Add one signature to compute.
	///
	/// The `alg` parameter of the headers picks the algorithm.
	/// An algorithm outside the builder's registry is refused here,
	/// before any cryptography runs.
	pub fn add_signature(mut self, key: &Jwk, protected: Option<JsonObject>, unprotected: Option<JsonObject>) -> Result<Self> {
		let algorithm = get_required_header_str(&[protected.as_ref(), unprotected.as_ref()], "alg")?.to_string();
		if !self.algorithms.contains(&algorithm) {
			return Err(Error::unsupported_algorithm(&algorithm));
		}
		if let Some(restriction) = key.algorithm() {
			if restriction != algorithm {
				return Err(Error::invalid_key(format!(
					"the key is restricted to {:?} but the header requests {:?}",
					restriction, algorithm
				)));
			}
		}
		self.signatures.push(PendingSignature {
			key: key.clone(),
			algorithm,
			protected,
			unprotected,
		});
		Ok(self)
	}

	/// Compute all signatures and assemble the message.
	pub fn build(self) -> Result<Jws> {
		if self.signatures.is_empty() {
			return Err(Error::unsupported_parameter("cannot build a JWS without signatures"));
		}
		let mut signatures = Vec::with_capacity(self.signatures.len());
		for pending in self.signatures {
			let algorithm = self
				.algorithms
				.get(&pending.algorithm)
				.ok_or_else(|| Error::unsupported_algorithm(&pending.algorithm))?;
			algorithm.check_key_type(&pending.key)?;

			let encoded_protected = match &pending.protected {
				None => None,
				Some(header) => Some(b64::encode(serde_json::to_string(header)?)),
			};
			let input = signing_input(encoded_protected.as_deref(), &self.payload);
			let signature = algorithm.sign(&pending.key, &input)?;
			signatures.push(Signature::from_encoded_parts(
				pending.protected,
				encoded_protected,
				pending.unprotected,
				signature,
			));
		}
		Ok(Jws::new(self.payload, signatures))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::jwa::{default_signature_algorithms, SignatureAlgorithm};
	use crate::jwa::hmac::Hs256;
	use crate::{json_object, Jwk};
	use assert2::assert;

	fn algorithms() -> Arc<SignatureAlgorithmRegistry> {
		Arc::new(default_signature_algorithms())
	}

	fn oct_key() -> Jwk {
		Jwk::new(json_object!{"kty": "oct", "k": "c2VjcmV0"}).unwrap()
	}

	#[test]
	fn test_build_single_signature() {
		let jws = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&oct_key(), Some(json_object!{"alg": "HS256"}), None)
			.unwrap()
			.build()
			.unwrap();

		assert!(jws.payload() == b"hello");
		assert!(jws.signatures().len() == 1);

		let signature = &jws.signatures()[0];
		assert!(signature.algorithm().unwrap() == "HS256");
		let input = signing_input(signature.encoded_protected(), jws.payload());
		assert!(Hs256.verify(&oct_key(), &input, signature.signature()).unwrap());
	}

	#[test]
	fn test_unknown_algorithm_is_refused_before_signing() {
		let result = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&oct_key(), Some(json_object!{"alg": "HS1024"}), None);
		assert!(let Err(Error::UnsupportedAlgorithm(_)) = result);

		let result = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&oct_key(), Some(json_object!{"typ": "JWT"}), None);
		assert!(let Err(Error::MissingParameter(_)) = result);
	}

	#[test]
	fn test_build_is_atomic() {
		// The second signature uses a key of the wrong type; the whole build must fail.
		let wrong_key = Jwk::new(json_object!{
			"kty": "OKP",
			"crv": "Ed25519",
			"x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
		}).unwrap();

		let result = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&oct_key(), Some(json_object!{"alg": "HS256"}), None)
			.unwrap()
			.add_signature(&wrong_key, Some(json_object!{"alg": "HS256"}), None)
			.unwrap()
			.build();
		assert!(let Err(Error::InvalidKey(_)) = result);
	}

	#[test]
	fn test_key_algorithm_restriction_is_honored() {
		let restricted = Jwk::new(json_object!{"kty": "oct", "k": "c2VjcmV0", "alg": "HS512"}).unwrap();

		let result = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&restricted, Some(json_object!{"alg": "HS256"}), None);
		assert!(let Err(Error::InvalidKey(_)) = result);

		let result = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&restricted, Some(json_object!{"alg": "HS512"}), None);
		assert!(let Ok(_) = result);
	}

	#[test]
	fn test_zero_signatures_is_an_error() {
		assert!(let Err(_) = JwsBuilder::new(algorithms()).payload(&b"hello"[..]).build());
	}

	#[test]
	fn test_multiple_signatures_share_the_payload() {
		let jws = JwsBuilder::new(algorithms())
			.payload(&b"hello"[..])
			.add_signature(&oct_key(), Some(json_object!{"alg": "HS256"}), None)
			.unwrap()
			.add_signature(&oct_key(), Some(json_object!{"alg": "HS512"}), Some(json_object!{"kid": "b"}))
			.unwrap()
			.build()
			.unwrap();

		assert!(jws.signatures().len() == 2);
		assert!(jws.signatures()[0].algorithm().unwrap() == "HS256");
		assert!(jws.signatures()[1].algorithm().unwrap() == "HS512");
		assert!(jws.signatures()[1].unprotected().unwrap() == &json_object!{"kid": "b"});
		assert!(jws.signatures()[0].signature() != jws.signatures()[1].signature());
	}
}
