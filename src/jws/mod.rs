//! JSON Web Signature (RFC 7515): building, verifying and serializing signed messages.
//!
//! A [`Jws`] holds a payload and one or more [`Signature`] entries.
//! Each entry carries its own protected and unprotected headers: multiple entries are
//! multiple independent signatures over the same payload.
//!
//! Signatures are computed and checked over the *signing input*
//! `BASE64URL(protected header) "." BASE64URL(payload)`.
//! A parsed message keeps the exact encoded protected header it arrived with, so that
//! verification never depends on re-serializing JSON.

pub mod builder;
pub mod serializer;
pub mod verifier;

pub use builder::JwsBuilder;
pub use serializer::{CompactJwsSerializer, FlattenedJwsSerializer, GeneralJwsSerializer, JwsSerializer, JwsSerializerManager, JwsSerializerRegistry};
pub use verifier::{JwsVerifier, VerifiedSignature};

use crate::{b64, Error, JsonObject, JsonValue, Result};

/// One signature over the payload of a [`Jws`].
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
	protected: Option<JsonObject>,
	encoded_protected: Option<String>,
	unprotected: Option<JsonObject>,
	signature: Vec<u8>,
}

impl Signature {
	/// Create a signature entry, encoding the protected header canonically.
	pub fn new(protected: Option<JsonObject>, unprotected: Option<JsonObject>, signature: Vec<u8>) -> Result<Self> {
		let encoded_protected = match &protected {
			None => None,
			Some(header) => Some(b64::encode(serde_json::to_string(header)?)),
		};
		Ok(Self { protected, encoded_protected, unprotected, signature })
	}

	/// Create a signature entry from parsed wire data, keeping the encoded protected
	/// header exactly as it appeared on the wire.
	pub fn from_encoded_parts(
		protected: Option<JsonObject>,
		encoded_protected: Option<String>,
		unprotected: Option<JsonObject>,
		signature: Vec<u8>,
	) -> Self {
		Self { protected, encoded_protected, unprotected, signature }
	}

	pub fn protected(&self) -> Option<&JsonObject> {
		self.protected.as_ref()
	}

	/// The protected header exactly as encoded on the wire.
	pub fn encoded_protected(&self) -> Option<&str> {
		self.encoded_protected.as_deref()
	}

	pub fn unprotected(&self) -> Option<&JsonObject> {
		self.unprotected.as_ref()
	}

	pub fn signature(&self) -> &[u8] {
		&self.signature
	}

	/// Look a header parameter up, the protected header winning over the unprotected one.
	pub fn header_param(&self, name: &str) -> Option<&JsonValue> {
		crate::header::get_header_param(self.protected(), self.unprotected(), name)
	}

	/// The `alg` header parameter.
	pub fn algorithm(&self) -> Result<&str> {
		crate::header::get_required_header_str(&[self.protected(), self.unprotected()], "alg")
	}
}

/// A decoded JWS message: a payload with one or more signatures.
#[derive(Clone, Debug, PartialEq)]
pub struct Jws {
	payload: Vec<u8>,
	signatures: Vec<Signature>,
}

impl Jws {
	pub fn new(payload: Vec<u8>, signatures: Vec<Signature>) -> Self {
		Self { payload, signatures }
	}

	pub fn payload(&self) -> &[u8] {
		&self.payload
	}

	pub fn signatures(&self) -> &[Signature] {
		&self.signatures
	}

	/// Get a signature entry by index, reporting a missing one as [`Error::MalformedInput`].
	pub fn signature(&self, index: usize) -> Result<&Signature> {
		self.signatures
			.get(index)
			.ok_or_else(|| Error::malformed_input(format!("no signature at index {}", index)))
	}

	/// Interpret the payload as a JSON claims object.
	pub fn claims(&self) -> Result<JsonObject> {
		serde_json::from_slice(&self.payload)
			.map_err(|_| Error::malformed_input("the payload is not a JSON claims object"))
	}
}

/// The signing input for one signature entry:
/// the encoded protected header, a period, and the encoded payload.
pub(crate) fn signing_input(encoded_protected: Option<&str>, payload: &[u8]) -> Vec<u8> {
	let mut input = encoded_protected.unwrap_or("").as_bytes().to_vec();
	input.push(b'.');
	input.extend_from_slice(b64::encode(payload).as_bytes());
	input
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::json_object;
	use assert2::assert;

	#[test]
	fn test_signature_header_lookup() {
		let signature = Signature::new(
			Some(json_object!{"alg": "HS256"}),
			Some(json_object!{"alg": "none", "kid": "a"}),
			vec![1, 2, 3],
		).unwrap();

		assert!(signature.algorithm().unwrap() == "HS256");
		assert!(signature.header_param("kid").unwrap() == "a");
		assert!(signature.header_param("missing").is_none());
	}

	#[test]
	fn test_signing_input() {
		// {"alg":"HS256"} -> eyJhbGciOiJIUzI1NiJ9
		let input = signing_input(Some("eyJhbGciOiJIUzI1NiJ9"), b"payload");
		assert!(input == b"eyJhbGciOiJIUzI1NiJ9.cGF5bG9hZA");

		// Without a protected header the input starts with the period.
		assert!(signing_input(None, b"payload") == b".cGF5bG9hZA");
	}

	#[test]
	fn test_claims() {
		let jws = Jws::new(br#"{"iss":"joe"}"#.to_vec(), Vec::new());
		assert!(jws.claims().unwrap() == json_object!{"iss": "joe"});

		let jws = Jws::new(b"not json".to_vec(), Vec::new());
		assert!(let Err(Error::MalformedInput(_)) = jws.claims());
	}
}
