//! Verifying signed messages.

use std::sync::Arc;

use super::{signing_input, Jws, Signature};
use crate::jwa::{SignatureAlgorithm, SignatureAlgorithmRegistry};
use crate::jwk::{Jwk, JwkSet};
use crate::{Error, Result};

/// Which signature entry verified, and with which key of the key set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedSignature {
	/// Index of the signature entry in the message.
	pub signature_index: usize,
	/// Index of the key in the key set that verified it.
	pub key_index: usize,
}

/// Verifies the signatures of a [`Jws`] against candidate keys.
///
/// The registry the verifier is created with is the algorithm allow-list:
/// a message naming any other algorithm is rejected with
/// [`Error::UnsupportedAlgorithm`].
///
/// A multi-signature message has no implicit verification policy.
/// The caller states intent per call: one indexed signature
/// ([`verify_signature`](Self::verify_signature)), at least one signature
/// ([`verify_any_signature`](Self::verify_any_signature)) or every signature
/// ([`verify_all_signatures`](Self::verify_all_signatures)).
pub struct JwsVerifier {
	algorithms: Arc<SignatureAlgorithmRegistry>,
}

impl JwsVerifier {
	pub fn new(algorithms: Arc<SignatureAlgorithmRegistry>) -> Self {
		Self { algorithms }
	}

	fn resolve_algorithm(&self, signature: &Signature) -> Result<&Arc<dyn SignatureAlgorithm>> {
		let name = signature.algorithm()?;
		self.algorithms
			.get(name)
			.ok_or_else(|| Error::unsupported_algorithm(name))
	}

	/// Verify one signature entry with one specific key.
	///
	/// Unlike the key set trials, problems with this key are the caller's problem
	/// and propagate as errors.
	pub fn verify_signature_with_key(&self, jws: &Jws, signature_index: usize, key: &Jwk) -> Result<()> {
		let signature = jws.signature(signature_index)?;
		let algorithm = self.resolve_algorithm(signature)?;
		algorithm.check_key_type(key)?;
		let input = signing_input(signature.encoded_protected(), jws.payload());
		if algorithm.verify(key, &input, signature.signature())? {
			Ok(())
		} else {
			Err(Error::InvalidSignature)
		}
	}

	/// Verify one signature entry against every compatible key of a key set.
	///
	/// Keys are tried in set order; the first key that verifies wins and its index
	/// is returned.
	/// Failures of individual candidates are swallowed: only after every candidate
	/// is exhausted does the call fail with [`Error::InvalidSignature`].
	pub fn verify_signature(&self, jws: &Jws, signature_index: usize, keys: &JwkSet) -> Result<usize> {
		let signature = jws.signature(signature_index)?;
		// No candidate algorithm at all is a structural error, not a trial failure.
		let algorithm = self.resolve_algorithm(signature)?;
		let input = signing_input(signature.encoded_protected(), jws.payload());
		for (key_index, key) in keys.iter().enumerate() {
			if algorithm.check_key_type(key).is_err() {
				continue;
			}
			match algorithm.verify(key, &input, signature.signature()) {
				Ok(true) => return Ok(key_index),
				Ok(false) | Err(_) => continue,
			}
		}
		Err(Error::InvalidSignature)
	}

	/// Verify that at least one signature entry verifies against the key set.
	///
	/// Signature entries are tried in order; the first verifying entry wins.
	pub fn verify_any_signature(&self, jws: &Jws, keys: &JwkSet) -> Result<VerifiedSignature> {
		if jws.signatures().is_empty() {
			return Err(Error::malformed_input("the message has no signatures"));
		}
		for signature_index in 0..jws.signatures().len() {
			if let Ok(key_index) = self.verify_signature(jws, signature_index, keys) {
				return Ok(VerifiedSignature { signature_index, key_index });
			}
		}
		Err(Error::InvalidSignature)
	}

	/// Verify that every signature entry verifies against the key set.
	///
	/// Returns one [`VerifiedSignature`] per entry.
	/// The first entry with no verifying key fails the whole call.
	pub fn verify_all_signatures(&self, jws: &Jws, keys: &JwkSet) -> Result<Vec<VerifiedSignature>> {
		if jws.signatures().is_empty() {
			return Err(Error::malformed_input("the message has no signatures"));
		}
		let mut verified = Vec::with_capacity(jws.signatures().len());
		for signature_index in 0..jws.signatures().len() {
			let key_index = self.verify_signature(jws, signature_index, keys)?;
			verified.push(VerifiedSignature { signature_index, key_index });
		}
		Ok(verified)
	}
}
