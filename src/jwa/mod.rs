//! Cryptographic algorithm families (RFC 7518).
//!
//! Algorithms come in four capability families, one object-safe trait each:
//!
//! - [`SignatureAlgorithm`]: digital signatures and MACs for JWS.
//! - [`KeyEncryptionAlgorithm`]: key management for JWE, either wrapping a generated
//!   content encryption key or deriving one.
//! - [`ContentEncryptionAlgorithm`]: authenticated encryption of the JWE payload.
//! - [`CompressionAlgorithm`]: payload compression before encryption.
//!
//! Every implementation is a stateless value registered in a [`Registry`] under its
//! exact wire identifier (`"HS256"`, `"RSA-OAEP"`, `"A256GCM"`, ...).
//! All operations are pure functions over their inputs and safe to call concurrently.

pub mod aes_cbc_hmac;
pub mod aes_gcm;
pub mod aes_kw;
pub mod deflate;
pub mod dir;
pub mod ecdh_es;
pub mod ecdsa;
pub mod eddsa;
pub mod hmac;
pub mod none;
pub mod rsa;
pub mod rsa_oaep;

use std::sync::Arc;

use crate::jwk::{Jwk, KeyType};
use crate::registry::Registry;
use crate::{Error, JsonObject, Result};

pub type SignatureAlgorithmRegistry = Registry<dyn SignatureAlgorithm>;
pub type KeyEncryptionAlgorithmRegistry = Registry<dyn KeyEncryptionAlgorithm>;
pub type ContentEncryptionAlgorithmRegistry = Registry<dyn ContentEncryptionAlgorithm>;
pub type CompressionAlgorithmRegistry = Registry<dyn CompressionAlgorithm>;

/// A digital signature or MAC algorithm (RFC 7515).
pub trait SignatureAlgorithm: Send + Sync {
	/// The exact `alg` identifier of this algorithm.
	fn name(&self) -> &'static str;

	/// The key types this algorithm accepts.
	///
	/// A key of any other type must never be used, see [`check_key_type`](Self::check_key_type).
	fn allowed_key_types(&self) -> &'static [KeyType];

	/// Sign a message with the given key.
	///
	/// Fails with [`Error::InvalidKey`] if the key has the wrong type, is missing
	/// required parameters, or has no private part.
	fn sign(&self, key: &Jwk, message: &[u8]) -> Result<Vec<u8>>;

	/// Verify a signature over a message.
	///
	/// Returns `Ok(false)` for a well-formed but non-matching signature.
	/// Errors are reserved for malformed keys and inputs.
	fn verify(&self, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<bool>;

	/// Reject keys whose `kty` is outside [`allowed_key_types`](Self::allowed_key_types).
	fn check_key_type(&self, key: &Jwk) -> Result<()> {
		if self.allowed_key_types().contains(&key.kty()) {
			Ok(())
		} else {
			Err(Error::invalid_key(format!(
				"a {} key cannot be used with {}",
				key.kty(),
				self.name()
			)))
		}
	}
}

/// How a key encryption algorithm determines the content encryption key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyManagementMode {
	/// The builder generates a random CEK and the algorithm wraps it for the recipient.
	Wrap,
	/// The algorithm itself produces the CEK (direct use or key agreement);
	/// the encrypted key on the wire is empty.
	Derive,
}

/// A key management algorithm for JWE (RFC 7516).
///
/// Wrap-mode algorithms implement [`wrap_key`](Self::wrap_key) and
/// [`unwrap_key`](Self::unwrap_key); derive-mode algorithms implement
/// [`derive_cek`](Self::derive_cek) and [`recover_cek`](Self::recover_cek).
/// Calling an operation of the other mode fails with [`Error::UnsupportedParameter`].
pub trait KeyEncryptionAlgorithm: Send + Sync {
	/// The exact `alg` identifier of this algorithm.
	fn name(&self) -> &'static str;

	/// The key types this algorithm accepts.
	fn allowed_key_types(&self) -> &'static [KeyType];

	/// Whether this algorithm wraps a caller-generated CEK or derives one itself.
	fn mode(&self) -> KeyManagementMode;

	/// Encrypt the content encryption key for one recipient.
	///
	/// The header map is the per-recipient header; algorithms that need to publish
	/// extra parameters insert them here.
	fn wrap_key(&self, _key: &Jwk, _cek: &[u8], _header: &mut JsonObject) -> Result<Vec<u8>> {
		Err(Error::unsupported_parameter(format!(
			"{} does not wrap content encryption keys",
			self.name()
		)))
	}

	/// Recover the content encryption key from the encrypted key of one recipient.
	fn unwrap_key(&self, _key: &Jwk, _encrypted_key: &[u8], _header: &JsonObject, _cek_len: usize) -> Result<Vec<u8>> {
		Err(Error::unsupported_parameter(format!(
			"{} does not wrap content encryption keys",
			self.name()
		)))
	}

	/// Produce the content encryption key on the build side.
	///
	/// The header map is the protected header of the message being built; key
	/// agreement algorithms insert the parameters the receiver needs (such as `epk`)
	/// and may read `enc`, `apu` and `apv` from it.
	fn derive_cek(&self, _key: &Jwk, _cek_len: usize, _header: &mut JsonObject) -> Result<Vec<u8>> {
		Err(Error::unsupported_parameter(format!(
			"{} does not derive content encryption keys",
			self.name()
		)))
	}

	/// Reproduce the content encryption key on the decrypt side from the received header.
	fn recover_cek(&self, _key: &Jwk, _cek_len: usize, _header: &JsonObject) -> Result<Vec<u8>> {
		Err(Error::unsupported_parameter(format!(
			"{} does not derive content encryption keys",
			self.name()
		)))
	}

	/// Reject keys whose `kty` is outside [`allowed_key_types`](Self::allowed_key_types).
	fn check_key_type(&self, key: &Jwk) -> Result<()> {
		if self.allowed_key_types().contains(&key.kty()) {
			Ok(())
		} else {
			Err(Error::invalid_key(format!(
				"a {} key cannot be used with {}",
				key.kty(),
				self.name()
			)))
		}
	}
}

/// An authenticated content encryption algorithm for JWE (RFC 7516).
pub trait ContentEncryptionAlgorithm: Send + Sync {
	/// The exact `enc` identifier of this algorithm.
	fn name(&self) -> &'static str;

	/// The size of the content encryption key in bytes.
	fn cek_len(&self) -> usize;

	/// The size of the initialization vector in bytes.
	fn iv_len(&self) -> usize;

	/// Encrypt a plaintext, producing the ciphertext and the authentication tag.
	fn encrypt(&self, cek: &[u8], plaintext: &[u8], iv: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

	/// Decrypt a ciphertext after verifying the authentication tag.
	///
	/// A failed tag check is reported as [`Error::AuthenticationFailed`].
	fn decrypt(&self, cek: &[u8], ciphertext: &[u8], iv: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>>;
}

/// A payload compression algorithm, applied to the plaintext before encryption.
pub trait CompressionAlgorithm: Send + Sync {
	/// The exact `zip` identifier of this algorithm.
	fn name(&self) -> &'static str;

	fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// A registry holding every signature algorithm this crate implements,
/// except `none`.
///
/// The `none` algorithm provides no integrity protection, so it never rides
/// along for free: callers that want it register it themselves.
pub fn default_signature_algorithms() -> SignatureAlgorithmRegistry {
	let algorithms: Vec<Arc<dyn SignatureAlgorithm>> = vec![
		Arc::new(hmac::Hs256),
		Arc::new(hmac::Hs384),
		Arc::new(hmac::Hs512),
		Arc::new(rsa::Rs256),
		Arc::new(rsa::Rs384),
		Arc::new(rsa::Rs512),
		Arc::new(ecdsa::Es256),
		Arc::new(ecdsa::Es384),
		Arc::new(eddsa::EdDsa),
	];
	let mut registry = Registry::new();
	for algorithm in algorithms {
		registry.register(algorithm.name(), algorithm);
	}
	registry
}

/// A registry holding every key encryption algorithm this crate implements.
pub fn default_key_encryption_algorithms() -> KeyEncryptionAlgorithmRegistry {
	let algorithms: Vec<Arc<dyn KeyEncryptionAlgorithm>> = vec![
		Arc::new(dir::Dir),
		Arc::new(aes_kw::A128Kw),
		Arc::new(aes_kw::A192Kw),
		Arc::new(aes_kw::A256Kw),
		Arc::new(rsa_oaep::RsaOaep),
		Arc::new(rsa_oaep::RsaOaep256),
		Arc::new(ecdh_es::EcdhEs),
	];
	let mut registry = Registry::new();
	for algorithm in algorithms {
		registry.register(algorithm.name(), algorithm);
	}
	registry
}

/// A registry holding every content encryption algorithm this crate implements.
pub fn default_content_encryption_algorithms() -> ContentEncryptionAlgorithmRegistry {
	let algorithms: Vec<Arc<dyn ContentEncryptionAlgorithm>> = vec![
		Arc::new(aes_gcm::A128Gcm),
		Arc::new(aes_gcm::A192Gcm),
		Arc::new(aes_gcm::A256Gcm),
		Arc::new(aes_cbc_hmac::A128CbcHs256),
		Arc::new(aes_cbc_hmac::A192CbcHs384),
		Arc::new(aes_cbc_hmac::A256CbcHs512),
	];
	let mut registry = Registry::new();
	for algorithm in algorithms {
		registry.register(algorithm.name(), algorithm);
	}
	registry
}

/// A registry holding every compression algorithm this crate implements.
pub fn default_compression_algorithms() -> CompressionAlgorithmRegistry {
	let mut registry = Registry::new();
	registry.register(deflate::Deflate.name(), Arc::new(deflate::Deflate) as Arc<dyn CompressionAlgorithm>);
	registry
}
