//! Helpers for working with token headers.
//!
//! A token carries its header parameters split over a protected part (covered by the
//! signature or the encryption) and one or more unprotected parts.
//! These helpers look a parameter up across that split with a fixed precedence:
//! the protected header always wins.

use crate::{Error, JsonObject, JsonValue, Result};

/// Get a parameter from either the protected or the unprotected header.
///
/// If a parameter is found in the protected header, the unprotected header is not consulted anymore.
pub fn get_header_param<'a>(protected: Option<&'a JsonObject>, unprotected: Option<&'a JsonObject>, name: &str) -> Option<&'a JsonValue> {
	get_header_param_in(&[protected, unprotected], name)
}

/// Get a parameter from an ordered list of header sources.
///
/// The first source that has the parameter wins.
/// JWE lookups use three sources: protected, shared unprotected and per-recipient.
pub fn get_header_param_in<'a>(sources: &[Option<&'a JsonObject>], name: &str) -> Option<&'a JsonValue> {
	for source in sources {
		if let Some(header) = source {
			if let Some(value) = header.get(name) {
				return Some(value);
			}
		}
	}
	None
}

/// Get a required parameter from an ordered list of header sources.
///
/// This is identical to [`get_header_param_in`], except that an absent parameter is
/// reported as [`Error::MissingParameter`] instead of an empty optional.
pub fn get_required_header_param<'a>(sources: &[Option<&'a JsonObject>], name: &str) -> Result<&'a JsonValue> {
	get_header_param_in(sources, name).ok_or_else(|| Error::missing_parameter(name))
}

/// Get a required parameter that must be a JSON string.
///
/// A present parameter of the wrong type is reported as [`Error::MalformedInput`].
pub fn get_required_header_str<'a>(sources: &[Option<&'a JsonObject>], name: &str) -> Result<&'a str> {
	get_required_header_param(sources, name)?
		.as_str()
		.ok_or_else(|| Error::malformed_input(format!("the {:?} header parameter must be a string", name)))
}

/// Merge header sources into one map, earlier sources winning.
pub fn merge_headers(sources: &[Option<&JsonObject>]) -> JsonObject {
	let mut merged = JsonObject::new();
	for source in sources.iter().rev() {
		if let Some(header) = source {
			for (name, value) in *header {
				merged.insert(name.clone(), value.clone());
			}
		}
	}
	merged
}
