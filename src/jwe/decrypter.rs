//! Decrypting encrypted messages.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::{aad_input, Jwe};
use crate::header::get_required_header_str;
use crate::jwa::{
	CompressionAlgorithmRegistry, ContentEncryptionAlgorithmRegistry,
	KeyEncryptionAlgorithmRegistry, KeyManagementMode,
};
use crate::jwk::{Jwk, JwkSet};
use crate::{Error, Result};

/// The result of a successful decryption:
/// the plaintext and which recipient and key produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Decrypted {
	pub payload: Vec<u8>,
	/// Index of the recipient entry that decrypted.
	pub recipient_index: usize,
	/// Index of the key in the key set that decrypted it.
	pub key_index: usize,
}

/// Decrypts a [`Jwe`] by trying candidate keys against its recipients.
///
/// The registries the decrypter is created with are the algorithm allow-lists:
/// a message naming anything outside them fails for that candidate.
///
/// Every (recipient, key) combination is an independent trial.
/// Per-candidate failures, including failed authentication tags, are swallowed;
/// only after every candidate is exhausted does the call fail, with
/// [`Error::DecryptionFailed`].
pub struct JweDecrypter {
	key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
	content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
	compression: Arc<CompressionAlgorithmRegistry>,
}

impl JweDecrypter {
	pub fn new(
		key_encryption: Arc<KeyEncryptionAlgorithmRegistry>,
		content_encryption: Arc<ContentEncryptionAlgorithmRegistry>,
		compression: Arc<CompressionAlgorithmRegistry>,
	) -> Self {
		Self {
			key_encryption,
			content_encryption,
			compression,
		}
	}

	/// Decrypt one recipient entry with one specific key.
	///
	/// Unlike the key set trials, all failures propagate to the caller.
	pub fn decrypt_with_key(&self, jwe: &Jwe, recipient_index: usize, key: &Jwk) -> Result<Vec<u8>> {
		jwe.recipient(recipient_index)?;
		self.try_candidate(jwe, recipient_index, key)
	}

	/// Decrypt by trying every key of a key set against every recipient entry.
	///
	/// Recipients are tried in message order, keys in set order.
	/// The first fully successful path (unwrap or derive, decrypt, decompress) wins.
	pub fn decrypt_with_key_set(&self, jwe: &Jwe, keys: &JwkSet) -> Result<Decrypted> {
		if jwe.recipients().is_empty() {
			return Err(Error::malformed_input("the message has no recipients"));
		}
		for recipient_index in 0..jwe.recipients().len() {
			for (key_index, key) in keys.iter().enumerate() {
				if let Ok(payload) = self.try_candidate(jwe, recipient_index, key) {
					return Ok(Decrypted {
						payload,
						recipient_index,
						key_index,
					});
				}
			}
		}
		Err(Error::DecryptionFailed)
	}

	/// One full decryption attempt for one (recipient, key) candidate.
	fn try_candidate(&self, jwe: &Jwe, recipient_index: usize, key: &Jwk) -> Result<Vec<u8>> {
		let recipient = jwe.recipient(recipient_index)?;
		let header = jwe.merged_header(recipient_index);

		let alg_name = get_required_header_str(&[Some(&header)], "alg")?;
		let algorithm = self
			.key_encryption
			.get(alg_name)
			.ok_or_else(|| Error::unsupported_algorithm(alg_name))?;

		let enc_name = get_required_header_str(&[Some(&header)], "enc")?;
		let enc = self
			.content_encryption
			.get(enc_name)
			.ok_or_else(|| Error::unsupported_algorithm(enc_name))?;

		algorithm.check_key_type(key)?;

		let cek: Zeroizing<Vec<u8>> = match algorithm.mode() {
			KeyManagementMode::Wrap => {
				let encrypted_key = recipient
					.encrypted_key()
					.ok_or_else(|| Error::malformed_input("the recipient has no encrypted key"))?;
				Zeroizing::new(algorithm.unwrap_key(key, encrypted_key, &header, enc.cek_len())?)
			},
			KeyManagementMode::Derive => {
				Zeroizing::new(algorithm.recover_cek(key, enc.cek_len(), &header)?)
			},
		};

		// The authenticated data covers the protected header exactly as received.
		let aad = aad_input(jwe.encoded_protected(), jwe.aad());
		let payload = enc.decrypt(&cek, jwe.ciphertext(), jwe.iv(), jwe.tag(), &aad)?;

		match header.get("zip") {
			None => Ok(payload),
			Some(zip) => {
				let zip = zip
					.as_str()
					.ok_or_else(|| Error::malformed_input("the \"zip\" header parameter must be a string"))?;
				let compressor = self
					.compression
					.get(zip)
					.ok_or_else(|| Error::unsupported_algorithm(zip))?;
				compressor.decompress(&payload)
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::jwa::{
		default_compression_algorithms, default_content_encryption_algorithms,
		default_key_encryption_algorithms,
	};
	use crate::jwe::JweBuilder;
	use crate::{b64, json_object, Jwk};
	use assert2::assert;

	fn builder() -> JweBuilder {
		JweBuilder::new(
			Arc::new(default_key_encryption_algorithms()),
			Arc::new(default_content_encryption_algorithms()),
			Arc::new(default_compression_algorithms()),
		)
	}

	fn decrypter() -> JweDecrypter {
		JweDecrypter::new(
			Arc::new(default_key_encryption_algorithms()),
			Arc::new(default_content_encryption_algorithms()),
			Arc::new(default_compression_algorithms()),
		)
	}

	fn oct_key(bytes: &[u8]) -> Jwk {
		Jwk::new(json_object!{"kty": "oct", "k": b64::encode(bytes)}).unwrap()
	}

	#[test]
	fn test_dir_a256gcm_round_trip() {
		let key = oct_key(&[7; 32]);
		let jwe = builder()
			.payload(&b"Live long and prosper."[..])
			.protected_header(json_object!{"alg": "dir", "enc": "A256GCM"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		assert!(jwe.recipients()[0].encrypted_key().is_none());
		let payload = decrypter().decrypt_with_key(&jwe, 0, &key).unwrap();
		assert!(payload == b"Live long and prosper.");
	}

	#[test]
	fn test_a128kw_a128cbc_hs256_round_trip() {
		let key = oct_key(&[1; 16]);
		let jwe = builder()
			.payload(&b"Live long and prosper."[..])
			.protected_header(json_object!{"alg": "A128KW", "enc": "A128CBC-HS256"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		let decrypted = decrypter()
			.decrypt_with_key_set(&jwe, &crate::JwkSet::new(vec![key]))
			.unwrap();
		assert!(decrypted.payload == b"Live long and prosper.");
		assert!(decrypted.recipient_index == 0);
		assert!(decrypted.key_index == 0);
	}

	#[test]
	fn test_rsa_oaep_round_trip() {
		let key = crate::jwa::rsa::test::generated_rsa_jwk();
		let jwe = builder()
			.payload(&b"Live long and prosper."[..])
			.protected_header(json_object!{"alg": "RSA-OAEP-256", "enc": "A128GCM"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		let payload = decrypter().decrypt_with_key(&jwe, 0, &key).unwrap();
		assert!(payload == b"Live long and prosper.");
	}

	#[test]
	fn test_ecdh_es_round_trip_publishes_epk() {
		let private = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
		let point = {
			use p256::elliptic_curve::sec1::ToEncodedPoint;
			private.verifying_key().to_encoded_point(false)
		};
		let key = Jwk::new(json_object!{
			"kty": "EC",
			"crv": "P-256",
			"x": b64::encode(point.x().unwrap()),
			"y": b64::encode(point.y().unwrap()),
			"d": b64::encode(private.to_bytes()),
		}).unwrap();

		// Encryption only needs the public half.
		let jwe = builder()
			.payload(&b"Live long and prosper."[..])
			.protected_header(json_object!{"alg": "ECDH-ES", "enc": "A256GCM"})
			.add_recipient(&key.to_public(), None)
			.build()
			.unwrap();

		assert!(jwe.protected().unwrap().contains_key("epk"));
		assert!(jwe.recipients()[0].encrypted_key().is_none());

		let payload = decrypter().decrypt_with_key(&jwe, 0, &key).unwrap();
		assert!(payload == b"Live long and prosper.");
	}

	#[test]
	fn test_compressed_round_trip() {
		let key = oct_key(&[7; 32]);
		let long_payload = b"repetitive ".repeat(500);
		let jwe = builder()
			.payload(&long_payload[..])
			.protected_header(json_object!{"alg": "dir", "enc": "A256GCM", "zip": "DEF"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		// The ciphertext covers the compressed payload, so it must be shorter.
		assert!(jwe.ciphertext().len() < long_payload.len());
		assert!(decrypter().decrypt_with_key(&jwe, 0, &key).unwrap() == long_payload);
	}

	#[test]
	fn test_multi_recipient_trial_reports_indices() {
		let key_a = oct_key(&[1; 16]);
		let key_b = oct_key(&[2; 32]);
		let jwe = builder()
			.payload(&b"for both of you"[..])
			.protected_header(json_object!{"enc": "A128CBC-HS256"})
			.add_recipient(&key_a, Some(json_object!{"alg": "A128KW"}))
			.add_recipient(&key_b, Some(json_object!{"alg": "A256KW"}))
			.build()
			.unwrap();

		// A key set where only the second recipient's key is present, in second position.
		let keys = crate::JwkSet::new(vec![oct_key(&[9; 32]), key_b]);
		let decrypted = decrypter().decrypt_with_key_set(&jwe, &keys).unwrap();
		assert!(decrypted.payload == b"for both of you");
		assert!(decrypted.recipient_index == 1);
		assert!(decrypted.key_index == 1);
	}

	#[test]
	fn test_exhausted_candidates_fail_with_decryption_failed() {
		let key = oct_key(&[1; 16]);
		let jwe = builder()
			.payload(&b"secret"[..])
			.protected_header(json_object!{"alg": "A128KW", "enc": "A128CBC-HS256"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		let keys = crate::JwkSet::new(vec![oct_key(&[8; 16]), oct_key(&[9; 16])]);
		assert!(let Err(Error::DecryptionFailed) = decrypter().decrypt_with_key_set(&jwe, &keys));
	}

	#[test]
	fn test_tampered_ciphertext_is_rejected() {
		let key = oct_key(&[7; 32]);
		let jwe = builder()
			.payload(&b"secret"[..])
			.protected_header(json_object!{"alg": "dir", "enc": "A256GCM"})
			.add_recipient(&key, None)
			.build()
			.unwrap();

		let mut ciphertext = jwe.ciphertext().to_vec();
		ciphertext[0] ^= 1;
		let tampered = Jwe::from_parts(
			jwe.protected().cloned(),
			jwe.encoded_protected().map(str::to_string),
			None,
			jwe.recipients().to_vec(),
			jwe.iv().to_vec(),
			ciphertext,
			jwe.tag().to_vec(),
			None,
		).unwrap();

		assert!(let Err(Error::AuthenticationFailed) = decrypter().decrypt_with_key(&tampered, 0, &key));
		let keys = crate::JwkSet::new(vec![key]);
		assert!(let Err(Error::DecryptionFailed) = decrypter().decrypt_with_key_set(&tampered, &keys));
	}

	#[test]
	fn test_aad_is_authenticated() {
		let key = oct_key(&[7; 32]);
		let jwe = builder()
			.payload(&b"secret"[..])
			.protected_header(json_object!{"alg": "dir", "enc": "A256GCM"})
			.aad(&b"transaction 17"[..])
			.add_recipient(&key, None)
			.build()
			.unwrap();

		// Stripping the AAD must break authentication.
		let stripped = Jwe::from_parts(
			jwe.protected().cloned(),
			jwe.encoded_protected().map(str::to_string),
			None,
			jwe.recipients().to_vec(),
			jwe.iv().to_vec(),
			jwe.ciphertext().to_vec(),
			jwe.tag().to_vec(),
			None,
		).unwrap();

		assert!(decrypter().decrypt_with_key(&jwe, 0, &key).unwrap() == b"secret");
		assert!(let Err(Error::AuthenticationFailed) = decrypter().decrypt_with_key(&stripped, 0, &key));
	}
}
