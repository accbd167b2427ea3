//! Unpadded base64url encoding, shared by every wire format.
//!
//! All binary fields of the JOSE wire formats use base64url without padding.
//! Decoding rejects padded or otherwise invalid input with [`Error::MalformedInput`],
//! never with a cryptographic error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::{Error, Result};

/// Encode bytes as unpadded base64url.
pub fn encode(data: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url.
pub fn decode(data: impl AsRef<[u8]>) -> Result<Vec<u8>> {
	URL_SAFE_NO_PAD
		.decode(data)
		.map_err(|e| Error::MalformedInput(format!("invalid base64url: {}", e)))
}
