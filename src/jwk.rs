//! JSON Web Key types (RFC 7517).
//!
//! A [`Jwk`] is an immutable mapping from parameter names to JSON values.
//! Construction validates that the parameters mandatory for the declared key type
//! are present; everything beyond that is checked by the algorithm using the key.
//!
//! A [`JwkSet`] is an ordered sequence of keys.
//! The iteration order is the order in which loaders try the keys.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::{b64, Error, JsonObject, JsonValue, Result};

/// Key types from the RFC 7518 registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
	/// Elliptic curve keys (`EC`).
	Ec,
	/// RSA keys (`RSA`).
	Rsa,
	/// Symmetric keys (`oct`).
	Oct,
	/// Octet key pairs such as Ed25519 (`OKP`, RFC 8037).
	Okp,
	/// The unprotected key type used with the `none` algorithm.
	None,
}

impl KeyType {
	/// The exact `kty` parameter value for this key type.
	pub fn name(self) -> &'static str {
		match self {
			KeyType::Ec => "EC",
			KeyType::Rsa => "RSA",
			KeyType::Oct => "oct",
			KeyType::Okp => "OKP",
			KeyType::None => "none",
		}
	}

	/// Look a key type up by its exact `kty` value.
	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"EC" => Some(KeyType::Ec),
			"RSA" => Some(KeyType::Rsa),
			"oct" => Some(KeyType::Oct),
			"OKP" => Some(KeyType::Okp),
			"none" => Some(KeyType::None),
			_ => None,
		}
	}

	/// The parameters that must be present for a key of this type.
	fn required_params(self) -> &'static [&'static str] {
		match self {
			KeyType::Ec => &["crv", "x", "y"],
			KeyType::Rsa => &["n", "e"],
			KeyType::Oct => &["k"],
			KeyType::Okp => &["crv", "x"],
			KeyType::None => &[],
		}
	}
}

impl fmt::Display for KeyType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Parameters that carry private or symmetric key material.
///
/// These are stripped by [`Jwk::to_public`] and redacted by the [`fmt::Debug`] implementation.
const PRIVATE_PARAMS: &[&str] = &["k", "d", "p", "q", "dp", "dq", "qi", "oth"];

/// Parameters stripped by [`Jwk::to_public`].
const TO_PUBLIC_STRIPPED: &[&str] = &["d", "p", "q", "dp", "dq", "qi", "oth"];

/// A JSON Web Key: an immutable, validated parameter map.
#[derive(Clone, PartialEq, Eq)]
pub struct Jwk {
	kty: KeyType,
	params: JsonObject,
}

impl Jwk {
	/// Create a key from its parameters.
	///
	/// The `kty` parameter must be present and name a known key type,
	/// and the parameters mandatory for that key type must be present.
	/// Anything else is rejected with [`Error::InvalidKey`].
	pub fn new(params: JsonObject) -> Result<Self> {
		let kty = params
			.get("kty")
			.ok_or_else(|| Error::missing_parameter("kty"))?;
		let kty = kty
			.as_str()
			.ok_or_else(|| Error::invalid_key("the \"kty\" parameter must be a string"))?;
		let kty = KeyType::from_name(kty)
			.ok_or_else(|| Error::invalid_key(format!("unknown key type {:?}", kty)))?;
		for name in kty.required_params() {
			if !params.contains_key(*name) {
				return Err(Error::invalid_key(format!(
					"a {} key needs the {:?} parameter",
					kty, name
				)));
			}
		}
		Ok(Self { kty, params })
	}

	/// Parse a key from its JSON text representation.
	pub fn from_json(json: &str) -> Result<Self> {
		Self::new(serde_json::from_str(json)?)
	}

	/// The key type declared by the `kty` parameter.
	pub fn kty(&self) -> KeyType {
		self.kty
	}

	/// Whether the key has a parameter with the given name.
	pub fn has(&self, name: &str) -> bool {
		self.params.contains_key(name)
	}

	/// Get a parameter, failing with [`Error::MissingParameter`] if it is absent.
	pub fn get(&self, name: &str) -> Result<&JsonValue> {
		self.params
			.get(name)
			.ok_or_else(|| Error::missing_parameter(name))
	}

	/// Get a parameter if it is present.
	pub fn get_opt(&self, name: &str) -> Option<&JsonValue> {
		self.params.get(name)
	}

	/// Get a parameter that must be a string.
	pub fn get_str(&self, name: &str) -> Result<&str> {
		self.get(name)?
			.as_str()
			.ok_or_else(|| Error::invalid_key(format!("the {:?} parameter must be a string", name)))
	}

	/// Get a parameter holding base64url encoded bytes.
	pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>> {
		let value = self.get_str(name)?;
		b64::decode(value)
			.map_err(|_| Error::invalid_key(format!("the {:?} parameter is not valid base64url", name)))
	}

	/// The key ID from the `kid` parameter, if any.
	pub fn kid(&self) -> Option<&str> {
		self.params.get("kid").and_then(JsonValue::as_str)
	}

	/// The algorithm this key is restricted to by its `alg` parameter, if any.
	pub fn algorithm(&self) -> Option<&str> {
		self.params.get("alg").and_then(JsonValue::as_str)
	}

	/// Whether the key carries private or symmetric secret material.
	pub fn is_private(&self) -> bool {
		PRIVATE_PARAMS.iter().any(|name| self.params.contains_key(*name))
	}

	/// A copy of the key with all private parameters removed.
	///
	/// Symmetric (`oct`) keys keep their `k` parameter: there is no public part to extract.
	pub fn to_public(&self) -> Jwk {
		let params = self
			.params
			.iter()
			.filter(|(name, _)| !TO_PUBLIC_STRIPPED.contains(&name.as_str()))
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();
		Jwk { kty: self.kty, params }
	}

	/// The RFC 7638 thumbprint of the key: the SHA-256 hash of its canonical
	/// required members, base64url encoded.
	pub fn thumbprint(&self) -> Result<String> {
		let members: &[&str] = match self.kty {
			KeyType::Ec => &["crv", "kty", "x", "y"],
			KeyType::Rsa => &["e", "kty", "n"],
			KeyType::Oct => &["k", "kty"],
			KeyType::Okp => &["crv", "kty", "x"],
			KeyType::None => {
				return Err(Error::unsupported_parameter(
					"a key of type \"none\" has no thumbprint",
				))
			},
		};
		// serde_json maps serialize in key order, which is already the
		// lexicographic order RFC 7638 requires for these member names.
		let mut canonical = JsonObject::new();
		for name in members {
			canonical.insert((*name).to_string(), self.get(name)?.clone());
		}
		let json = serde_json::to_string(&canonical)?;
		Ok(b64::encode(Sha256::digest(json.as_bytes())))
	}

	/// All parameters of the key.
	pub fn parameters(&self) -> &JsonObject {
		&self.params
	}
}

impl fmt::Debug for Jwk {
	/// Formats the key with all private material redacted.
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut map = f.debug_map();
		for (name, value) in &self.params {
			if PRIVATE_PARAMS.contains(&name.as_str()) {
				map.entry(name, &"<redacted>");
			} else {
				map.entry(name, value);
			}
		}
		map.finish()
	}
}

impl serde::Serialize for Jwk {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.params.serialize(serializer)
	}
}

impl<'de> serde::Deserialize<'de> for Jwk {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let params = JsonObject::deserialize(deserializer)?;
		Jwk::new(params).map_err(serde::de::Error::custom)
	}
}

/// An ordered set of JSON Web Keys.
#[derive(Clone, Debug, PartialEq, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct JwkSet {
	keys: Vec<Jwk>,
}

impl JwkSet {
	/// Create a key set from a list of keys, keeping their order.
	pub fn new(keys: Vec<Jwk>) -> Self {
		Self { keys }
	}

	/// Parse a key set from its JSON text representation: `{"keys": [...]}`.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Get a key by position.
	pub fn get(&self, index: usize) -> Option<&Jwk> {
		self.keys.get(index)
	}

	/// Get the first key with the given key ID.
	pub fn by_kid(&self, kid: &str) -> Option<&Jwk> {
		self.keys.iter().find(|key| key.kid() == Some(kid))
	}

	/// Iterate over the keys in trial order.
	pub fn iter(&self) -> std::slice::Iter<Jwk> {
		self.keys.iter()
	}
}

impl From<Vec<Jwk>> for JwkSet {
	fn from(keys: Vec<Jwk>) -> Self {
		Self::new(keys)
	}
}

impl<'a> IntoIterator for &'a JwkSet {
	type Item = &'a Jwk;
	type IntoIter = std::slice::Iter<'a, Jwk>;

	fn into_iter(self) -> Self::IntoIter {
		self.keys.iter()
	}
}
