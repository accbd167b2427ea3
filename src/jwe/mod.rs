//! JSON Web Encryption (RFC 7516): building, decrypting and serializing encrypted messages.
//!
//! A [`Jwe`] holds a shared protected header, an optional shared unprotected header,
//! one or more [`Recipient`] entries, the initialization vector, the ciphertext, the
//! authentication tag and optional additional authenticated data.
//!
//! The ciphertext is shared by all recipients; only the wrapped content encryption
//! key differs per recipient.
//! Like the JWS side, a parsed message keeps the exact encoded protected header it
//! arrived with, because it is part of the authenticated data.

pub mod builder;
pub mod decrypter;
pub mod serializer;

pub use builder::JweBuilder;
pub use decrypter::{Decrypted, JweDecrypter};
pub use serializer::{CompactJweSerializer, FlattenedJweSerializer, GeneralJweSerializer, JweSerializer, JweSerializerManager, JweSerializerRegistry};

use crate::{b64, Error, JsonObject, JsonValue, Result};

/// One recipient of a [`Jwe`]: an optional per-recipient header and the encrypted key.
#[derive(Clone, Debug, PartialEq)]
pub struct Recipient {
	header: Option<JsonObject>,
	encrypted_key: Option<Vec<u8>>,
}

impl Recipient {
	pub fn new(header: Option<JsonObject>, encrypted_key: Option<Vec<u8>>) -> Self {
		Self { header, encrypted_key }
	}

	pub fn header(&self) -> Option<&JsonObject> {
		self.header.as_ref()
	}

	pub fn encrypted_key(&self) -> Option<&[u8]> {
		self.encrypted_key.as_deref()
	}
}

/// A decoded JWE message.
#[derive(Clone, Debug, PartialEq)]
pub struct Jwe {
	protected: Option<JsonObject>,
	encoded_protected: Option<String>,
	unprotected: Option<JsonObject>,
	recipients: Vec<Recipient>,
	iv: Vec<u8>,
	ciphertext: Vec<u8>,
	tag: Vec<u8>,
	aad: Option<Vec<u8>>,
}

impl Jwe {
	/// Assemble a message from its parts.
	///
	/// If `encoded_protected` is absent it is computed canonically from `protected`;
	/// parsers always pass the wire encoding through instead.
	#[allow(clippy::too_many_arguments)]
	pub fn from_parts(
		protected: Option<JsonObject>,
		encoded_protected: Option<String>,
		unprotected: Option<JsonObject>,
		recipients: Vec<Recipient>,
		iv: Vec<u8>,
		ciphertext: Vec<u8>,
		tag: Vec<u8>,
		aad: Option<Vec<u8>>,
	) -> Result<Self> {
		let encoded_protected = match (encoded_protected, &protected) {
			(Some(encoded), _) => Some(encoded),
			(None, None) => None,
			(None, Some(header)) => Some(b64::encode(serde_json::to_string(header)?)),
		};
		Ok(Self {
			protected,
			encoded_protected,
			unprotected,
			recipients,
			iv,
			ciphertext,
			tag,
			aad,
		})
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

	pub fn recipients(&self) -> &[Recipient] {
		&self.recipients
	}

	/// Get a recipient entry by index, reporting a missing one as [`Error::MalformedInput`].
	pub fn recipient(&self, index: usize) -> Result<&Recipient> {
		self.recipients
			.get(index)
			.ok_or_else(|| Error::malformed_input(format!("no recipient at index {}", index)))
	}

	pub fn iv(&self) -> &[u8] {
		&self.iv
	}

	pub fn ciphertext(&self) -> &[u8] {
		&self.ciphertext
	}

	pub fn tag(&self) -> &[u8] {
		&self.tag
	}

	pub fn aad(&self) -> Option<&[u8]> {
		self.aad.as_deref()
	}

	/// Look a header parameter up for one recipient.
	///
	/// The protected header wins over the shared unprotected header, which wins over
	/// the per-recipient header.
	pub fn header_param(&self, recipient_index: usize, name: &str) -> Option<&JsonValue> {
		let recipient_header = self
			.recipients
			.get(recipient_index)
			.and_then(Recipient::header);
		crate::header::get_header_param_in(
			&[self.protected(), self.unprotected(), recipient_header],
			name,
		)
	}

	/// The complete header of one recipient, merged with the same precedence as
	/// [`header_param`](Self::header_param).
	pub fn merged_header(&self, recipient_index: usize) -> JsonObject {
		let recipient_header = self
			.recipients
			.get(recipient_index)
			.and_then(Recipient::header);
		crate::header::merge_headers(&[self.protected(), self.unprotected(), recipient_header])
	}
}

/// The Additional Authenticated Data for the content encryption algorithm:
/// the encoded protected header and, if present, a period and the encoded AAD.
pub(crate) fn aad_input(encoded_protected: Option<&str>, aad: Option<&[u8]>) -> Vec<u8> {
	let mut input = encoded_protected.unwrap_or("").as_bytes().to_vec();
	if let Some(aad) = aad {
		input.push(b'.');
		input.extend_from_slice(b64::encode(aad).as_bytes());
	}
	input
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::json_object;
	use assert2::assert;

	#[test]
	fn test_header_precedence() {
		let jwe = Jwe::from_parts(
			Some(json_object!{"enc": "A256GCM"}),
			None,
			Some(json_object!{"shared": true, "enc": "ignored"}),
			vec![
				Recipient::new(Some(json_object!{"alg": "A128KW"}), Some(vec![1])),
				Recipient::new(Some(json_object!{"alg": "A256KW"}), Some(vec![2])),
			],
			vec![0; 12],
			vec![1, 2, 3],
			vec![0; 16],
			None,
		).unwrap();

		assert!(jwe.header_param(0, "enc").unwrap() == "A256GCM");
		assert!(jwe.header_param(0, "alg").unwrap() == "A128KW");
		assert!(jwe.header_param(1, "alg").unwrap() == "A256KW");
		assert!(jwe.header_param(0, "shared").unwrap() == &JsonValue::Bool(true));

		let merged = jwe.merged_header(1);
		assert!(merged.get("enc").unwrap() == "A256GCM");
		assert!(merged.get("alg").unwrap() == "A256KW");
	}

	#[test]
	fn test_aad_input() {
		assert!(aad_input(Some("eyJlbmMiOiJBMjU2R0NNIn0"), None) == b"eyJlbmMiOiJBMjU2R0NNIn0");
		// With AAD present, the encoded AAD is appended after a period.
		assert!(aad_input(Some("eyJlbmMiOiJBMjU2R0NNIn0"), Some(b"hello")) == b"eyJlbmMiOiJBMjU2R0NNIn0.aGVsbG8");
		assert!(aad_input(None, None) == b"");
	}
}
