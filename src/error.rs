//! Error types for this crate.
//!
//! All fallible operations report an [`Error`].
//! The variants follow the failure classes of the JOSE standards:
//! structural problems ([`Error::MalformedInput`]), key problems ([`Error::InvalidKey`]),
//! registry misses ([`Error::UnsupportedAlgorithm`]) and cryptographic failures
//! ([`Error::InvalidSignature`], [`Error::AuthenticationFailed`], [`Error::DecryptionFailed`]).
//!
//! During key set trials, per-candidate cryptographic failures are swallowed by the caller
//! and only [`Error::InvalidSignature`] or [`Error::DecryptionFailed`] surfaces once every
//! candidate is exhausted.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// The input does not parse as the grammar of any configured serializer.
	#[error("malformed input: {0}")]
	MalformedInput(String),

	/// A key is missing required parameters, holds malformed material, or has the wrong type for the algorithm.
	#[error("invalid key: {0}")]
	InvalidKey(String),

	/// A required key or header parameter is absent.
	#[error("missing required parameter: {0}")]
	MissingParameter(String),

	/// A header names an algorithm or serializer that is not registered.
	#[error("unsupported algorithm: {0}")]
	UnsupportedAlgorithm(String),

	/// A key declares a curve the algorithm does not support.
	#[error("unsupported curve: {0}")]
	UnsupportedCurve(String),

	/// A parameter value is outside the set an algorithm or serializer supports.
	#[error("unsupported parameter: {0}")]
	UnsupportedParameter(String),

	/// All signature verification candidates were exhausted without a match.
	#[error("invalid signature")]
	InvalidSignature,

	/// An AEAD or MAC check failed for one candidate.
	#[error("authentication failed")]
	AuthenticationFailed,

	/// All decryption candidates were exhausted without success.
	#[error("decryption failed")]
	DecryptionFailed,

	/// The payload could not be compressed.
	#[error("compression failed: {0}")]
	CompressionFailed(String),

	/// The decrypted payload could not be decompressed.
	#[error("decompression failed: {0}")]
	DecompressionFailed(String),

	/// A `crit` entry names a header parameter that no registered checker handles.
	#[error("unsupported critical header parameter: {0}")]
	UnsupportedCriticalHeader(String),

	/// A registered header checker rejected a header parameter value.
	#[error("header check failed: {0}")]
	HeaderCheckFailed(String),

	/// A registered claim checker rejected a claim value.
	#[error("claim check failed: {0}")]
	ClaimCheckFailed(String),
}

impl Error {
	pub fn malformed_input(message: impl Into<String>) -> Self {
		Error::MalformedInput(message.into())
	}

	pub fn invalid_key(message: impl Into<String>) -> Self {
		Error::InvalidKey(message.into())
	}

	pub fn missing_parameter(name: impl Into<String>) -> Self {
		Error::MissingParameter(name.into())
	}

	pub fn unsupported_algorithm(name: impl Into<String>) -> Self {
		Error::UnsupportedAlgorithm(name.into())
	}

	pub fn unsupported_curve(name: impl Into<String>) -> Self {
		Error::UnsupportedCurve(name.into())
	}

	pub fn unsupported_parameter(message: impl Into<String>) -> Self {
		Error::UnsupportedParameter(message.into())
	}

	pub fn compression_failed(message: impl Into<String>) -> Self {
		Error::CompressionFailed(message.into())
	}

	pub fn decompression_failed(message: impl Into<String>) -> Self {
		Error::DecompressionFailed(message.into())
	}

	pub fn unsupported_critical_header(name: impl Into<String>) -> Self {
		Error::UnsupportedCriticalHeader(name.into())
	}

	pub fn header_check_failed(message: impl Into<String>) -> Self {
		Error::HeaderCheckFailed(message.into())
	}

	pub fn claim_check_failed(message: impl Into<String>) -> Self {
		Error::ClaimCheckFailed(message.into())
	}
}

impl From<serde_json::Error> for Error {
	fn from(other: serde_json::Error) -> Self {
		Error::MalformedInput(format!("invalid JSON: {}", other))
	}
}

impl From<base64::DecodeError> for Error {
	fn from(other: base64::DecodeError) -> Self {
		Error::MalformedInput(format!("invalid base64url: {}", other))
	}
}
