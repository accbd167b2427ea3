//! Wire formats for JWE messages.
//!
//! Three serializers implement the RFC 7516 serializations:
//!
//! - [`CompactJweSerializer`] (`jwe_compact`): the five part, `.`-joined form.
//!   Exactly one recipient, no unprotected headers, no AAD.
//! - [`FlattenedJweSerializer`] (`jwe_json_flattened`): a JSON object for a single
//!   recipient.
//! - [`GeneralJweSerializer`] (`jwe_json_general`): a JSON object with a `recipients`
//!   array, any number of recipients.
//!
//! Unserialization rejects anything that does not match the grammar as
//! [`Error::MalformedInput`]; cryptographic errors can not occur here.

use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};

use super::{Jwe, Recipient};
use crate::registry::Registry;
use crate::{b64, Error, JsonObject, Result};

pub type JweSerializerRegistry = Registry<dyn JweSerializer>;

/// A bidirectional codec between a [`Jwe`] and one wire representation.
pub trait JweSerializer: Send + Sync {
	/// The registry name of this serializer.
	fn name(&self) -> &'static str;

	/// Render a message.
	///
	/// `recipient_index` selects the recipient for single-recipient formats;
	/// it defaults to the first and is ignored by the general format.
	fn serialize(&self, jwe: &Jwe, recipient_index: Option<usize>) -> Result<String>;

	/// Parse a message.
	fn unserialize(&self, input: &str) -> Result<Jwe>;
}

/// A registry holding every JWE serializer this crate implements.
pub fn default_jwe_serializers() -> JweSerializerRegistry {
	let serializers: Vec<Arc<dyn JweSerializer>> = vec![
		Arc::new(CompactJweSerializer),
		Arc::new(FlattenedJweSerializer),
		Arc::new(GeneralJweSerializer),
	];
	let mut registry = Registry::new();
	for serializer in serializers {
		registry.register(serializer.name(), serializer);
	}
	registry
}

/// Tries every registered serializer in order when parsing.
pub struct JweSerializerManager {
	serializers: JweSerializerRegistry,
}

impl JweSerializerManager {
	pub fn new(serializers: JweSerializerRegistry) -> Self {
		Self { serializers }
	}

	/// Serialize with the named serializer.
	pub fn serialize(&self, format: &str, jwe: &Jwe, recipient_index: Option<usize>) -> Result<String> {
		let serializer = self
			.serializers
			.get(format)
			.ok_or_else(|| Error::unsupported_parameter(format!("unknown serializer {:?}", format)))?;
		serializer.serialize(jwe, recipient_index)
	}

	/// Parse with the first serializer that accepts the input.
	///
	/// Returns the message and the name of the matching serializer.
	pub fn unserialize(&self, input: &str) -> Result<(Jwe, &str)> {
		for (name, serializer) in self.serializers.iter() {
			if let Ok(jwe) = serializer.unserialize(input) {
				return Ok((jwe, name));
			}
		}
		Err(Error::malformed_input("the input does not match any configured serializer"))
	}
}

/// The JWE Compact Serialization.
pub struct CompactJweSerializer;

impl JweSerializer for CompactJweSerializer {
	fn name(&self) -> &'static str {
		"jwe_compact"
	}

	fn serialize(&self, jwe: &Jwe, recipient_index: Option<usize>) -> Result<String> {
		let recipient = jwe.recipient(recipient_index.unwrap_or(0))?;
		if jwe.unprotected().is_some() || recipient.header().is_some() {
			return Err(Error::unsupported_parameter(
				"compact serialization cannot carry unprotected headers",
			));
		}
		if jwe.aad().is_some() {
			return Err(Error::unsupported_parameter(
				"compact serialization cannot carry additional authenticated data",
			));
		}
		let encoded_protected = jwe
			.encoded_protected()
			.ok_or_else(|| Error::unsupported_parameter("compact serialization needs a protected header"))?;
		Ok(format!(
			"{}.{}.{}.{}.{}",
			encoded_protected,
			b64::encode(recipient.encrypted_key().unwrap_or(b"")),
			b64::encode(jwe.iv()),
			b64::encode(jwe.ciphertext()),
			b64::encode(jwe.tag()),
		))
	}

	fn unserialize(&self, input: &str) -> Result<Jwe> {
		let parts: Vec<&str> = input.split('.').collect();
		if parts.len() != 5 {
			return Err(Error::malformed_input(format!(
				"a compact JWE has five dot-separated parts, found {}",
				parts.len()
			)));
		}
		let protected: JsonObject = serde_json::from_slice(&b64::decode(parts[0])?)?;
		let encrypted_key = b64::decode(parts[1])?;
		let encrypted_key = if encrypted_key.is_empty() { None } else { Some(encrypted_key) };
		Jwe::from_parts(
			Some(protected),
			Some(parts[0].to_string()),
			None,
			vec![Recipient::new(None, encrypted_key)],
			b64::decode(parts[2])?,
			b64::decode(parts[3])?,
			b64::decode(parts[4])?,
			None,
		)
	}
}

#[derive(Serialize, Deserialize)]
struct FlattenedJson {
	#[serde(skip_serializing_if = "Option::is_none")]
	protected: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	unprotected: Option<JsonObject>,
	#[serde(skip_serializing_if = "Option::is_none")]
	header: Option<JsonObject>,
	#[serde(skip_serializing_if = "Option::is_none")]
	encrypted_key: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	iv: Option<String>,
	ciphertext: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	tag: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	aad: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct GeneralJson {
	#[serde(skip_serializing_if = "Option::is_none")]
	protected: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	unprotected: Option<JsonObject>,
	recipients: Vec<RecipientJson>,
	#[serde(skip_serializing_if = "Option::is_none")]
	iv: Option<String>,
	ciphertext: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	tag: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	aad: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RecipientJson {
	#[serde(skip_serializing_if = "Option::is_none")]
	header: Option<JsonObject>,
	#[serde(skip_serializing_if = "Option::is_none")]
	encrypted_key: Option<String>,
}

fn decode_protected(encoded: &Option<String>) -> Result<Option<JsonObject>> {
	match encoded {
		None => Ok(None),
		Some(encoded) => Ok(Some(serde_json::from_slice(&b64::decode(encoded)?)?)),
	}
}

fn decode_optional(encoded: &Option<String>) -> Result<Vec<u8>> {
	match encoded {
		None => Ok(Vec::new()),
		Some(encoded) => b64::decode(encoded),
	}
}

/// Check that at least one header is present somewhere in the message.
fn check_has_header(jwe: &Jwe) -> Result<()> {
	let any_header = jwe.protected().is_some()
		|| jwe.unprotected().is_some()
		|| jwe.recipients().iter().any(|recipient| recipient.header().is_some());
	if any_header {
		Ok(())
	} else {
		Err(Error::malformed_input("a JWE needs at least one header"))
	}
}

/// The flattened JWE JSON Serialization: one recipient as a flat object.
pub struct FlattenedJweSerializer;

impl JweSerializer for FlattenedJweSerializer {
	fn name(&self) -> &'static str {
		"jwe_json_flattened"
	}

	fn serialize(&self, jwe: &Jwe, recipient_index: Option<usize>) -> Result<String> {
		let recipient = jwe.recipient(recipient_index.unwrap_or(0))?;
		let json = FlattenedJson {
			protected: jwe.encoded_protected().map(str::to_string),
			unprotected: jwe.unprotected().cloned(),
			header: recipient.header().cloned(),
			encrypted_key: recipient.encrypted_key().map(b64::encode),
			iv: Some(b64::encode(jwe.iv())),
			ciphertext: b64::encode(jwe.ciphertext()),
			tag: Some(b64::encode(jwe.tag())),
			aad: jwe.aad().map(b64::encode),
		};
		Ok(serde_json::to_string(&json)?)
	}

	fn unserialize(&self, input: &str) -> Result<Jwe> {
		let json: FlattenedJson = serde_json::from_str(input)?;
		let protected = decode_protected(&json.protected)?;
		let encrypted_key = match &json.encrypted_key {
			None => None,
			Some(encoded) => Some(b64::decode(encoded)?),
		};
		let aad = match &json.aad {
			None => None,
			Some(encoded) => Some(b64::decode(encoded)?),
		};
		let jwe = Jwe::from_parts(
			protected,
			json.protected,
			json.unprotected,
			vec![Recipient::new(json.header, encrypted_key)],
			decode_optional(&json.iv)?,
			b64::decode(&json.ciphertext)?,
			decode_optional(&json.tag)?,
			aad,
		)?;
		check_has_header(&jwe)?;
		Ok(jwe)
	}
}

/// The general JWE JSON Serialization: any number of recipients.
pub struct GeneralJweSerializer;

impl JweSerializer for GeneralJweSerializer {
	fn name(&self) -> &'static str {
		"jwe_json_general"
	}

	fn serialize(&self, jwe: &Jwe, _recipient_index: Option<usize>) -> Result<String> {
		if jwe.recipients().is_empty() {
			return Err(Error::unsupported_parameter("cannot serialize a JWE without recipients"));
		}
		let json = GeneralJson {
			protected: jwe.encoded_protected().map(str::to_string),
			unprotected: jwe.unprotected().cloned(),
			recipients: jwe
				.recipients()
				.iter()
				.map(|recipient| RecipientJson {
					header: recipient.header().cloned(),
					encrypted_key: recipient.encrypted_key().map(b64::encode),
				})
				.collect(),
			iv: Some(b64::encode(jwe.iv())),
			ciphertext: b64::encode(jwe.ciphertext()),
			tag: Some(b64::encode(jwe.tag())),
			aad: jwe.aad().map(b64::encode),
		};
		Ok(serde_json::to_string(&json)?)
	}

	fn unserialize(&self, input: &str) -> Result<Jwe> {
		let json: GeneralJson = serde_json::from_str(input)?;
		if json.recipients.is_empty() {
			return Err(Error::malformed_input("the \"recipients\" member must not be empty"));
		}
		let protected = decode_protected(&json.protected)?;
		let mut recipients = Vec::with_capacity(json.recipients.len());
		for member in json.recipients {
			let encrypted_key = match &member.encrypted_key {
				None => None,
				Some(encoded) => Some(b64::decode(encoded)?),
			};
			recipients.push(Recipient::new(member.header, encrypted_key));
		}
		let aad = match &json.aad {
			None => None,
			Some(encoded) => Some(b64::decode(encoded)?),
		};
		let jwe = Jwe::from_parts(
			protected,
			json.protected,
			json.unprotected,
			recipients,
			decode_optional(&json.iv)?,
			b64::decode(&json.ciphertext)?,
			decode_optional(&json.tag)?,
			aad,
		)?;
		check_has_header(&jwe)?;
		Ok(jwe)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::jwa::{
		default_compression_algorithms, default_content_encryption_algorithms,
		default_key_encryption_algorithms,
	};
	use crate::jwe::{JweBuilder, JweDecrypter};
	use crate::{json_object, Jwk};
	use assert2::assert;

	// Example taken from RFC 7516 appendix A.3: AES key wrap and AES_128_CBC_HMAC_SHA_256.
	// https://tools.ietf.org/html/rfc7516#appendix-A.3
	const RFC7516_A3_ENCODED: &str = "eyJhbGciOiJBMTI4S1ciLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0.6KB707dM9YTIgHtLvtgWQ8mKwboJW3of9locizkDTHzBC2IlrT1oOQ.AxY8DCtDaGlsbGljb3RoZQ.KDlTtXchhZTGufMYmOYGS4HffxPSUrfmqCHXaI9wOGY.U0m_YmjN04DJvceFICbCVQ";
	const RFC7516_A3_KEY: &str = "GawgguFyGrWKav7AX4VKUg";

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

	fn direct_message() -> (Jwe, Jwk) {
		let key = Jwk::new(json_object!{"kty": "oct", "k": crate::b64::encode([7; 32])}).unwrap();
		let jwe = builder()
			.payload(&b"Live long and prosper."[..])
			.protected_header(json_object!{"alg": "dir", "enc": "A256GCM"})
			.add_recipient(&key, None)
			.build()
			.unwrap();
		(jwe, key)
	}

	#[test]
	fn test_compact_rfc7516_a3() {
		let jwe = CompactJweSerializer.unserialize(RFC7516_A3_ENCODED).unwrap();

		assert!(jwe.protected().unwrap() == &json_object!{"alg": "A128KW", "enc": "A128CBC-HS256"});
		assert!(jwe.recipients().len() == 1);
		assert!(jwe.iv().len() == 16);
		assert!(jwe.tag().len() == 16);

		let key = Jwk::new(json_object!{"kty": "oct", "k": RFC7516_A3_KEY}).unwrap();
		let payload = decrypter().decrypt_with_key(&jwe, 0, &key).unwrap();
		assert!(payload == b"Live long and prosper.");

		// Re-serializing must reproduce the input byte for byte.
		assert!(CompactJweSerializer.serialize(&jwe, None).unwrap() == RFC7516_A3_ENCODED);
	}

	#[test]
	fn test_compact_symmetry() {
		let (jwe, key) = direct_message();
		let serialized = CompactJweSerializer.serialize(&jwe, None).unwrap();
		let reparsed = CompactJweSerializer.unserialize(&serialized).unwrap();

		assert!(reparsed == jwe);
		assert!(decrypter().decrypt_with_key(&reparsed, 0, &key).unwrap() == b"Live long and prosper.");
	}

	#[test]
	fn test_compact_rejects_malformed_input() {
		let serializer = CompactJweSerializer;
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize("a.b.c"));
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize("a.b.c.d.e.f"));
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize("!!!.b.c.d.e"));
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize("bm90LWpzb24.b.c.d.e"));
	}

	#[test]
	fn test_compact_refuses_unprotected_parts() {
		let key = Jwk::new(json_object!{"kty": "oct", "k": crate::b64::encode([1; 16])}).unwrap();
		let jwe = builder()
			.payload(&b"hi"[..])
			.protected_header(json_object!{"enc": "A128CBC-HS256"})
			.add_recipient(&key, Some(json_object!{"alg": "A128KW"}))
			.build()
			.unwrap();
		assert!(let Err(Error::UnsupportedParameter(_)) = CompactJweSerializer.serialize(&jwe, None));

		let (jwe, _key) = direct_message();
		let with_aad = Jwe::from_parts(
			jwe.protected().cloned(),
			jwe.encoded_protected().map(str::to_string),
			None,
			jwe.recipients().to_vec(),
			jwe.iv().to_vec(),
			jwe.ciphertext().to_vec(),
			jwe.tag().to_vec(),
			Some(b"aad".to_vec()),
		).unwrap();
		assert!(let Err(Error::UnsupportedParameter(_)) = CompactJweSerializer.serialize(&with_aad, None));
	}

	#[test]
	fn test_flattened_symmetry() {
		let (jwe, key) = direct_message();
		let serialized = FlattenedJweSerializer.serialize(&jwe, None).unwrap();
		let reparsed = FlattenedJweSerializer.unserialize(&serialized).unwrap();

		assert!(reparsed == jwe);
		assert!(decrypter().decrypt_with_key(&reparsed, 0, &key).unwrap() == b"Live long and prosper.");
	}

	#[test]
	fn test_flattened_rejects_malformed_input() {
		let serializer = FlattenedJweSerializer;
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize("{"));
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize(r#"{"iv":"AAAA","tag":"AAAA"}"#));
		// No header anywhere.
		assert!(let Err(Error::MalformedInput(_)) = serializer.unserialize(r#"{"ciphertext":"AAAA"}"#));
	}

	#[test]
	fn test_general_symmetry_with_multiple_recipients() {
		let key_a = Jwk::new(json_object!{"kty": "oct", "k": crate::b64::encode([1; 16])}).unwrap();
		let key_b = Jwk::new(json_object!{"kty": "oct", "k": crate::b64::encode([2; 32])}).unwrap();
		let jwe = builder()
			.payload(&b"for both of you"[..])
			.protected_header(json_object!{"enc": "A128CBC-HS256"})
			.unprotected_header(json_object!{"shared": "yes"})
			.add_recipient(&key_a, Some(json_object!{"alg": "A128KW"}))
			.add_recipient(&key_b, Some(json_object!{"alg": "A256KW"}))
			.build()
			.unwrap();

		let serialized = GeneralJweSerializer.serialize(&jwe, None).unwrap();
		let reparsed = GeneralJweSerializer.unserialize(&serialized).unwrap();

		assert!(reparsed == jwe);
		let decrypted = decrypter()
			.decrypt_with_key_set(&reparsed, &crate::JwkSet::new(vec![key_b]))
			.unwrap();
		assert!(decrypted.payload == b"for both of you");
		assert!(decrypted.recipient_index == 1);
	}

	#[test]
	fn test_general_rejects_empty_recipient_lists() {
		assert!(let Err(Error::MalformedInput(_)) = GeneralJweSerializer.unserialize(r#"{"ciphertext":"AAAA","recipients":[]}"#));
	}

	#[test]
	fn test_manager_tries_serializers_in_order() {
		let manager = JweSerializerManager::new(default_jwe_serializers());

		let (name_compact, _) = {
			let (jwe, _key) = direct_message();
			let serialized = CompactJweSerializer.serialize(&jwe, None).unwrap();
			let (parsed, name) = manager.unserialize(&serialized).unwrap();
			(name.to_string(), parsed)
		};
		assert!(name_compact == "jwe_compact");

		let (jwe, _key) = direct_message();
		let serialized = FlattenedJweSerializer.serialize(&jwe, None).unwrap();
		let (_parsed, name) = manager.unserialize(&serialized).unwrap();
		assert!(name == "jwe_json_flattened");

		assert!(let Err(Error::MalformedInput(_)) = manager.unserialize("definitely not a token"));
	}
}
