//! Building encrypted messages.

use std::sync::Arc;

use rand::RngCore;
use zeroize::Zeroizing;

use super::{aad_input, Jwe, Recipient};
use crate::header::{get_required_header_str, merge_headers};
use crate::jwa::{
	CompressionAlgorithmRegistry, ContentEncryptionAlgorithmRegistry, KeyEncryptionAlgorithm,
	KeyEncryptionAlgorithmRegistry, KeyManagementMode,
};
use crate::jwk::Jwk;
use crate::{b64, Error, JsonObject, Result};

/// Builds a [`Jwe`] with one payload and any number of recipients.
///
/// The content encryption algorithm is taken from the `enc` header parameter, the key
/// management algorithm per recipient from the `alg` parameter of the headers visible
/// to that recipient.
/// All of them must be present in the registries the builder was created with.
///
/// The payload is encrypted once and shared across recipients; only the encrypted key
/// differs per recipient.
/// Key management algorithms that fix the CEK themselves (`dir`, `ECDH-ES`) are
/// accepted for single-recipient messages only.
///
/// The build is atomic: if anything fails, no message is produced at all.
pub struct JweBuilder {
	key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
	content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
	compression: Arc<CompressionAlgorithmRegistry>,
	payload: Vec<u8>,
	protected: Option<JsonObject>,
	unprotected: Option<JsonObject>,
	aad: Option<Vec<u8>>,
	recipients: Vec<PendingRecipient>,
}

struct PendingRecipient {
	key: Jwk,
	header: Option<JsonObject>,
}

impl JweBuilder {
	pub fn new(
		key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
		content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
		compression: Arc<CompressionAlgorithmRegistry>,
	) -> Self {
		Self {
			key_encryption,
			content_encryption,
			compression,
			payload: Vec::new(),
			protected: None,
			unprotected: None,
			aad: None,
			recipients: Vec::new(),
		}
	}

	/// Set the payload to encrypt.
	pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
		self.payload = payload.into();
		self
	}

	/// Set the shared protected header.
	pub fn protected_header(mut self, header: JsonObject) -> Self {
		self.protected = Some(header);
		self
	}

	/// Set the shared unprotected header.
	pub fn unprotected_header(mut self, header: JsonObject) -> Self {
		self.unprotected = Some(header);
		self
	}

	/// Set additional authenticated data.
	///
	/// The AAD is covered by the authentication tag but not encrypted.
	/// Messages with AAD cannot use the compact serialization.
	pub fn aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
		self.aad = Some(aad.into());
		self
	}

	/// Add one recipient with an optional per-recipient header.
	pub fn add_recipient(mut self, key: &Jwk, header: Option<JsonObject>) -> Self {
		self.recipients.push(PendingRecipient { key: key.clone(), header });
		self
	}

	/// Resolve the key management algorithm for one pending recipient.
	fn recipient_algorithm(&self, pending: &PendingRecipient) -> Result<Arc<dyn KeyEncryptionAlgorithm>> {
		let name = get_required_header_str(
			&[self.protected.as_ref(), self.unprotected.as_ref(), pending.header.as_ref()],
			"alg",
		)?;
		let algorithm = self
			.key_encryption
			.get(name)
			.ok_or_else(|| Error::unsupported_algorithm(name))?;
		algorithm.check_key_type(&pending.key)?;
		if let Some(restriction) = pending.key.algorithm() {
			if restriction != name {
				return Err(Error::invalid_key(format!(
					"the key is restricted to {:?} but the header requests {:?}",
					restriction, name
				)));
			}
		}
		Ok(algorithm.clone())
	}

	/// Encrypt the payload for all recipients and assemble the message.
	pub fn build(self) -> Result<Jwe> {
		if self.recipients.is_empty() {
			return Err(Error::unsupported_parameter("cannot build a JWE without recipients"));
		}

		let enc_name =
			get_required_header_str(&[self.protected.as_ref(), self.unprotected.as_ref()], "enc")?;
		let enc = self
			.content_encryption
			.get(enc_name)
			.ok_or_else(|| Error::unsupported_algorithm(enc_name))?
			.clone();

		let mut algorithms = Vec::with_capacity(self.recipients.len());
		for pending in &self.recipients {
			algorithms.push(self.recipient_algorithm(pending)?);
		}

		let derive_mode = algorithms
			.iter()
			.any(|algorithm| algorithm.mode() == KeyManagementMode::Derive);
		if derive_mode && self.recipients.len() > 1 {
			return Err(Error::unsupported_parameter(
				"key management algorithms that fix the CEK allow only a single recipient",
			));
		}

		let mut protected = self.protected;

		// Determine the content encryption key.
		let cek: Zeroizing<Vec<u8>> = if derive_mode {
			// The algorithm produces the CEK and may publish parameters (like `epk`)
			// that the receiver needs; those go into the protected header.
			let mut working = merge_headers(&[protected.as_ref(), self.unprotected.as_ref()]);
			let known: Vec<String> = working.keys().cloned().collect();
			let cek = algorithms[0].derive_cek(&self.recipients[0].key, enc.cek_len(), &mut working)?;
			let mut header = protected.take().unwrap_or_default();
			for (name, value) in working {
				if !known.contains(&name) {
					header.insert(name, value);
				}
			}
			if !header.is_empty() {
				protected = Some(header);
			}
			Zeroizing::new(cek)
		} else {
			let mut cek = vec![0; enc.cek_len()];
			rand::rngs::OsRng.fill_bytes(&mut cek);
			Zeroizing::new(cek)
		};

		// Compress the payload if the protected header asks for it.
		let mut payload = self.payload;
		if let Some(zip) = protected.as_ref().and_then(|header| header.get("zip")) {
			let zip = zip
				.as_str()
				.ok_or_else(|| Error::malformed_input("the \"zip\" header parameter must be a string"))?;
			let compressor = self
				.compression
				.get(zip)
				.ok_or_else(|| Error::unsupported_algorithm(zip))?;
			payload = compressor.compress(&payload)?;
		}

		let mut iv = vec![0; enc.iv_len()];
		rand::rngs::OsRng.fill_bytes(&mut iv);

		let encoded_protected = match &protected {
			None => None,
			Some(header) => Some(b64::encode(serde_json::to_string(header)?)),
		};
		let aad = aad_input(encoded_protected.as_deref(), self.aad.as_deref());
		let (ciphertext, tag) = enc.encrypt(&cek, &payload, &iv, &aad)?;

		// Wrap the CEK for every recipient.
		let mut recipients = Vec::with_capacity(self.recipients.len());
		for (pending, algorithm) in self.recipients.into_iter().zip(algorithms) {
			match algorithm.mode() {
				KeyManagementMode::Derive => {
					recipients.push(Recipient::new(pending.header, None));
				},
				KeyManagementMode::Wrap => {
					let mut header = pending.header.unwrap_or_default();
					let encrypted_key = algorithm.wrap_key(&pending.key, &cek, &mut header)?;
					let header = if header.is_empty() { None } else { Some(header) };
					recipients.push(Recipient::new(header, Some(encrypted_key)));
				},
			}
		}

		Jwe::from_parts(
			protected,
			encoded_protected,
			self.unprotected,
			recipients,
			iv,
			ciphertext,
			tag,
			self.aad,
		)
	}
}
