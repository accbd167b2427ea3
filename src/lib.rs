//! This library provides JSON Object Signing and Encryption:
//! JSON Web Signature (RFC 7515), JSON Web Encryption (RFC 7516) and JSON Web Key (RFC 7517).
//!
//! Keys are represented by the [`Jwk`] and [`JwkSet`] types in the [`jwk`] module.
//! The cryptographic algorithms (RFC 7518) live in the [`jwa`] module, split into four
//! capability families: signature, key encryption, content encryption and compression.
//! Each family is an object-safe trait, and the set of algorithms a caller allows is
//! expressed as a name-keyed [`Registry`] of trait objects.
//!
//! Signed messages are built with [`jws::JwsBuilder`] and validated with [`jws::JwsVerifier`].
//! Encrypted messages are built with [`jwe::JweBuilder`] and decrypted with [`jwe::JweDecrypter`].
//! The wire formats (compact and the two JSON serializations) are implemented by the
//! serializers in [`jws::serializer`] and [`jwe::serializer`].
//!
//! The [`loader`] module ties everything together: a loader tries every configured
//! serializer, then every key in a key set, until one combination validates the token.
//! Header parameters and claims are validated by the pluggable checkers in [`checker`],
//! including mandatory handling of the `crit` header parameter.
//! The [`nested`] module composes the two pipelines for JWEs that wrap a JWS.

pub mod b64;
pub mod checker;
pub mod error;
pub mod header;
pub mod jwa;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod loader;
pub mod nested;
pub mod registry;

pub use serde_json::Value as JsonValue;

/// A JSON object: the representation used for headers, claims and key parameters.
pub type JsonObject = serde_json::Map<String, JsonValue>;

pub use crate::error::{Error, Result};
pub use crate::jwk::{Jwk, JwkSet, KeyType};
pub use crate::registry::Registry;

/// Create a [`JsonObject`] from a list of key-value pairs.
///
/// The syntax is that of [`serde_json::json!`], restricted to an object at the top level.
#[macro_export]
macro_rules! json_object {
	{$($tt:tt)*} => {
		{
			match ::serde_json::json!({$($tt)*}) {
				::serde_json::Value::Object(object) => object,
				_ => unreachable!(),
			}
		}
	};
}
