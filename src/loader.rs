//! High-level token loading.
//!
//! A loader drives the full trial pipeline for incoming tokens:
//! try every configured serializer to parse the input, then try every key of the
//! key set (and, for JWS, every signature entry the chosen policy demands), then run
//! the header checkers, including the mandatory `crit` handling.
//!
//! Claim checking is separate: run a [`crate::checker::ClaimCheckerManager`] over the
//! payload once the loader returns it.

use std::sync::Arc;

use crate::checker::HeaderCheckerManager;
use crate::jwe::{Jwe, JweDecrypter, JweSerializerManager};
use crate::jws::{Jws, JwsSerializerManager, JwsVerifier, VerifiedSignature};
use crate::jwk::{Jwk, JwkSet};
use crate::Result;

/// What "the token verifies" means for a multi-signature JWS.
///
/// There is deliberately no default: the policies differ in security implications,
/// so every load states its intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationPolicy {
	/// Exactly the signature entry at this index must verify.
	Signature(usize),
	/// At least one signature entry must verify.
	Any,
	/// Every signature entry must verify.
	All,
}

/// A successfully loaded and verified JWS.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedJws {
	pub jws: Jws,
	/// The name of the serializer that parsed the input.
	pub serializer: String,
	/// The signature entries that verified, with the keys that verified them.
	pub verified: Vec<VerifiedSignature>,
}

/// Loads, verifies and header-checks serialized JWS tokens.
pub struct JwsLoader {
	serializers: JwsSerializerManager,
	verifier: JwsVerifier,
	header_checker: HeaderCheckerManager,
}

impl JwsLoader {
	pub fn new(serializers: JwsSerializerManager, verifier: JwsVerifier, header_checker: HeaderCheckerManager) -> Self {
		Self {
			serializers,
			verifier,
			header_checker,
		}
	}

	/// Load a token and verify it against a key set under the given policy.
	///
	/// Header checkers run for every signature entry that verified.
	pub fn load_and_verify(&self, input: &str, keys: &JwkSet, policy: VerificationPolicy) -> Result<LoadedJws> {
		let (jws, serializer) = self.serializers.unserialize(input)?;
		let serializer = serializer.to_string();

		let verified = match policy {
			VerificationPolicy::Signature(signature_index) => {
				let key_index = self.verifier.verify_signature(&jws, signature_index, keys)?;
				vec![VerifiedSignature { signature_index, key_index }]
			},
			VerificationPolicy::Any => vec![self.verifier.verify_any_signature(&jws, keys)?],
			VerificationPolicy::All => self.verifier.verify_all_signatures(&jws, keys)?,
		};

		for entry in &verified {
			let signature = jws.signature(entry.signature_index)?;
			self.header_checker
				.check(signature.protected(), &[signature.unprotected()])?;
		}

		Ok(LoadedJws { jws, serializer, verified })
	}

	/// Load a token and verify its only signature with one specific key.
	pub fn load_and_verify_with_key(&self, input: &str, key: &Jwk) -> Result<LoadedJws> {
		self.load_and_verify(
			input,
			&JwkSet::new(vec![key.clone()]),
			VerificationPolicy::Signature(0),
		)
	}
}

/// A successfully loaded and decrypted JWE.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedJwe {
	pub jwe: Jwe,
	/// The name of the serializer that parsed the input.
	pub serializer: String,
	/// The decrypted payload.
	pub payload: Vec<u8>,
	/// The recipient entry that decrypted.
	pub recipient_index: usize,
	/// The key in the key set that decrypted it.
	pub key_index: usize,
}

/// Loads, decrypts and header-checks serialized JWE tokens.
pub struct JweLoader {
	serializers: JweSerializerManager,
	decrypter: JweDecrypter,
	header_checker: HeaderCheckerManager,
}

impl JweLoader {
	pub fn new(serializers: JweSerializerManager, decrypter: JweDecrypter, header_checker: HeaderCheckerManager) -> Self {
		Self {
			serializers,
			decrypter,
			header_checker,
		}
	}

	/// Load a token and decrypt it with a key set.
	///
	/// Header checkers run for the recipient entry that decrypted.
	pub fn load_and_decrypt(&self, input: &str, keys: &JwkSet) -> Result<LoadedJwe> {
		let (jwe, serializer) = self.serializers.unserialize(input)?;
		let serializer = serializer.to_string();

		let decrypted = self.decrypter.decrypt_with_key_set(&jwe, keys)?;

		let recipient = jwe.recipient(decrypted.recipient_index)?;
		self.header_checker
			.check(jwe.protected(), &[jwe.unprotected(), recipient.header()])?;

		Ok(LoadedJwe {
			serializer,
			payload: decrypted.payload,
			recipient_index: decrypted.recipient_index,
			key_index: decrypted.key_index,
			jwe,
		})
	}

	/// Load a token and decrypt it with one specific key.
	pub fn load_and_decrypt_with_key(&self, input: &str, key: &Jwk) -> Result<LoadedJwe> {
		self.load_and_decrypt(input, &JwkSet::new(vec![key.clone()]))
	}
}

/// A [`JwsLoader`] over the default serializers and algorithms.
pub fn default_jws_loader(header_checker: HeaderCheckerManager) -> JwsLoader {
	JwsLoader::new(
		JwsSerializerManager::new(crate::jws::serializer::default_jws_serializers()),
		JwsVerifier::new(Arc::new(crate::jwa::default_signature_algorithms())),
		header_checker,
	)
}

/// A [`JweLoader`] over the default serializers and algorithms.
pub fn default_jwe_loader(header_checker: HeaderCheckerManager) -> JweLoader {
	JweLoader::new(
		JweSerializerManager::new(crate::jwe::serializer::default_jwe_serializers()),
		JweDecrypter::new(
			Arc::new(crate::jwa::default_key_encryption_algorithms()),
			Arc::new(crate::jwa::default_content_encryption_algorithms()),
			Arc::new(crate::jwa::default_compression_algorithms()),
		),
		header_checker,
	)
}
