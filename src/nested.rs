//! Nested tokens: a JWS wrapped inside a JWE.
//!
//! Construction is sign-then-encrypt: build a JWS, serialize it, and use the result
//! as the payload of a JWE whose `cty` header announces the nesting.
//! Loading is the dual, decrypt-then-verify: decrypt the JWE, parse its plaintext as
//! a JWS and verify that.
//!
//! Failures surface as the failing stage's error kind: a caller can tell a broken
//! outer ciphertext ([`Error::DecryptionFailed`]) from a broken inner signature
//! ([`Error::InvalidSignature`]).

use std::sync::Arc;

use crate::jwa::{
	CompressionAlgorithmRegistry, ContentEncryptionAlgorithmRegistry,
	KeyEncryptionAlgorithmRegistry, SignatureAlgorithmRegistry,
};
use crate::jwe::{JweBuilder, JweSerializerManager};
use crate::jwk::{Jwk, JwkSet};
use crate::jws::{JwsBuilder, JwsSerializerManager};
use crate::loader::{JweLoader, JwsLoader, LoadedJwe, LoadedJws, VerificationPolicy};
use crate::{Error, JsonObject, Result};

/// One signature to apply to the inner JWS.
pub struct SignatureRecipe<'a> {
	pub key: &'a Jwk,
	pub protected: Option<JsonObject>,
	pub unprotected: Option<JsonObject>,
}

/// One recipient of the outer JWE.
pub struct RecipientRecipe<'a> {
	pub key: &'a Jwk,
	pub header: Option<JsonObject>,
}

/// Builds nested tokens: sign first, then encrypt the serialized signature.
pub struct NestedTokenBuilder {
	signature_algorithms: Arc<SignatureAlgorithmRegistry>,
	jws_serializers: JwsSerializerManager,
	key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
	content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
	compression: Arc<CompressionAlgorithmRegistry>,
	jwe_serializers: JweSerializerManager,
}

impl NestedTokenBuilder {
	pub fn new(
		signature_algorithms: Arc<SignatureAlgorithmRegistry>,
		jws_serializers: JwsSerializerManager,
		key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
		content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
		compression: Arc<CompressionAlgorithmRegistry>,
		jwe_serializers: JweSerializerManager,
	) -> Self {
		Self {
			signature_algorithms,
			jws_serializers,
			key_encryption,
			content_encryption,
			compression,
			jwe_serializers,
		}
	}

	/// Sign the payload, then encrypt the serialized JWS for the given recipients.
	///
	/// The outer protected header gets `cty: "JWT"` so that receivers know the
	/// plaintext is itself a token (RFC 7519 section 5.2).
	#[allow(clippy::too_many_arguments)]
	pub fn create(
		&self,
		payload: &[u8],
		signatures: &[SignatureRecipe],
		jws_format: &str,
		jwe_protected: Option<JsonObject>,
		recipients: &[RecipientRecipe],
		jwe_format: &str,
	) -> Result<String> {
		let mut jws_builder = JwsBuilder::new(self.signature_algorithms.clone()).payload(payload);
		for recipe in signatures {
			jws_builder = jws_builder.add_signature(recipe.key, recipe.protected.clone(), recipe.unprotected.clone())?;
		}
		let jws = jws_builder.build()?;
		let serialized_jws = self.jws_serializers.serialize(jws_format, &jws, None)?;

		let mut protected = jwe_protected.unwrap_or_default();
		protected.insert("cty".to_string(), "JWT".into());

		let mut jwe_builder = JweBuilder::new(
			self.key_encryption.clone(),
			self.content_encryption.clone(),
			self.compression.clone(),
		)
		.payload(serialized_jws)
		.protected_header(protected);
		for recipe in recipients {
			jwe_builder = jwe_builder.add_recipient(recipe.key, recipe.header.clone());
		}
		let jwe = jwe_builder.build()?;

		self.jwe_serializers.serialize(jwe_format, &jwe, None)
	}
}

/// A successfully loaded nested token.
pub struct NestedToken {
	/// The decrypted outer JWE.
	pub outer: LoadedJwe,
	/// The verified inner JWS.
	pub inner: LoadedJws,
}

/// Loads nested tokens: decrypt the outer JWE, then verify its plaintext as a JWS.
pub struct NestedTokenLoader {
	jwe_loader: JweLoader,
	jws_loader: JwsLoader,
}

impl NestedTokenLoader {
	pub fn new(jwe_loader: JweLoader, jws_loader: JwsLoader) -> Self {
		Self { jwe_loader, jws_loader }
	}

	/// Decrypt with the decryption keys, then verify the plaintext with the
	/// signature keys under the given policy.
	///
	/// A failed decryption never attempts the inner verification.
	pub fn load(
		&self,
		input: &str,
		decryption_keys: &JwkSet,
		signature_keys: &JwkSet,
		policy: VerificationPolicy,
	) -> Result<NestedToken> {
		let outer = self.jwe_loader.load_and_decrypt(input, decryption_keys)?;
		let plaintext = std::str::from_utf8(&outer.payload)
			.map_err(|_| Error::malformed_input("the decrypted payload is not UTF-8"))?;
		let inner = self.jws_loader.load_and_verify(plaintext, signature_keys, policy)?;
		Ok(NestedToken { outer, inner })
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::checker::HeaderCheckerManager;
	use crate::jwa::{
		default_compression_algorithms, default_content_encryption_algorithms,
		default_key_encryption_algorithms, default_signature_algorithms,
	};
	use crate::jwe::serializer::default_jwe_serializers;
	use crate::jws::serializer::default_jws_serializers;
	use crate::loader::{default_jwe_loader, default_jws_loader};
	use crate::{b64, json_object, Jwk};
	use assert2::assert;

	fn builder() -> NestedTokenBuilder {
		NestedTokenBuilder::new(
			Arc::new(default_signature_algorithms()),
			JwsSerializerManager::new(default_jws_serializers()),
			Arc::new(default_key_encryption_algorithms()),
			Arc::new(default_content_encryption_algorithms()),
			Arc::new(default_compression_algorithms()),
			JweSerializerManager::new(default_jwe_serializers()),
		)
	}

	fn loader() -> NestedTokenLoader {
		NestedTokenLoader::new(
			default_jwe_loader(HeaderCheckerManager::empty()),
			default_jws_loader(HeaderCheckerManager::empty()),
		)
	}

	fn signing_key() -> Jwk {
		Jwk::new(json_object!{"kty": "oct", "k": b64::encode(b"inner-signing-key")}).unwrap()
	}

	fn encryption_key() -> Jwk {
		Jwk::new(json_object!{"kty": "oct", "k": b64::encode([3; 32])}).unwrap()
	}

	fn nested_token() -> String {
		builder()
			.create(
				br#"{"iss":"joe"}"#,
				&[SignatureRecipe {
					key: &signing_key(),
					protected: Some(json_object!{"alg": "HS256"}),
					unprotected: None,
				}],
				"jws_compact",
				Some(json_object!{"alg": "dir", "enc": "A256GCM"}),
				&[RecipientRecipe { key: &encryption_key(), header: None }],
				"jwe_compact",
			)
			.unwrap()
	}

	#[test]
	fn test_sign_then_encrypt_then_load() {
		let token = nested_token();

		let nested = loader()
			.load(
				&token,
				&JwkSet::new(vec![encryption_key()]),
				&JwkSet::new(vec![signing_key()]),
				VerificationPolicy::Any,
			)
			.unwrap();

		assert!(nested.inner.jws.payload() == br#"{"iss":"joe"}"#);
		assert!(nested.outer.jwe.protected().unwrap().get("cty").unwrap() == "JWT");
	}

	#[test]
	fn test_corrupted_outer_fails_at_the_decryption_stage() {
		let token = nested_token();

		// Flip a character inside the ciphertext part of the compact JWE.
		let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
		let ciphertext = parts[3].clone();
		let flipped = if ciphertext.starts_with('A') { "B" } else { "A" };
		parts[3] = format!("{}{}", flipped, &ciphertext[1..]);
		let corrupted = parts.join(".");

		let result = loader().load(
			&corrupted,
			&JwkSet::new(vec![encryption_key()]),
			&JwkSet::new(vec![signing_key()]),
			VerificationPolicy::Any,
		);
		// The failure is a decryption failure, not an inner signature failure.
		assert!(let Err(Error::DecryptionFailed) = result);
	}

	#[test]
	fn test_wrong_signature_keys_fail_at_the_verification_stage() {
		let token = nested_token();

		let result = loader().load(
			&token,
			&JwkSet::new(vec![encryption_key()]),
			&JwkSet::new(vec![Jwk::new(json_object!{"kty": "oct", "k": b64::encode(b"not-the-signer")}).unwrap()]),
			VerificationPolicy::Any,
		);
		assert!(let Err(Error::InvalidSignature) = result);
	}
}
