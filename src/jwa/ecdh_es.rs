//! ECDH-ES direct key agreement on the P-256 curve (RFC 7518 section 4.6).
//!
//! The builder side generates an ephemeral key pair, publishes the public half in the
//! `epk` header parameter and derives the content encryption key from the shared
//! secret with the Concat KDF.
//! The decrypt side reproduces the same CEK from its static private key and the
//! received `epk`.
//! Nothing is wrapped: the encrypted key on the wire is empty.

use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, FieldBytes, PublicKey, SecretKey};
use sha2::{Digest, Sha256};

use super::{KeyEncryptionAlgorithm, KeyManagementMode};
use crate::header::get_required_header_str;
use crate::jwk::{Jwk, KeyType};
use crate::{b64, Error, JsonObject, Result};

/// ECDH-ES in direct key agreement mode.
pub struct EcdhEs;

/// The Concat KDF of NIST SP 800-56A as profiled by RFC 7518 section 4.6.2.
///
/// For direct key agreement the AlgorithmID is the `enc` algorithm name and the
/// PartyUInfo/PartyVInfo are the decoded `apu`/`apv` values.
fn concat_kdf(z: &[u8], algorithm: &str, apu: &[u8], apv: &[u8], key_len: usize) -> Vec<u8> {
	let mut output = Vec::with_capacity(((key_len + 31) / 32) * 32);
	for counter in 1..=((key_len + 31) / 32) as u32 {
		let mut hasher = Sha256::new();
		hasher.update(counter.to_be_bytes());
		hasher.update(z);
		hasher.update((algorithm.len() as u32).to_be_bytes());
		hasher.update(algorithm.as_bytes());
		hasher.update((apu.len() as u32).to_be_bytes());
		hasher.update(apu);
		hasher.update((apv.len() as u32).to_be_bytes());
		hasher.update(apv);
		hasher.update(((key_len * 8) as u32).to_be_bytes());
		output.extend_from_slice(&hasher.finalize());
	}
	output.truncate(key_len);
	output
}

fn check_curve(key: &Jwk) -> Result<()> {
	match key.get_str("crv")? {
		"P-256" => Ok(()),
		other => Err(Error::unsupported_curve(other)),
	}
}

/// The static public key of the recipient, from the `x` and `y` parameters.
fn recipient_public_key(key: &Jwk) -> Result<PublicKey> {
	let x = key.get_bytes("x")?;
	let y = key.get_bytes("y")?;
	public_key_from_coordinates(&x, &y)
		.ok_or_else(|| Error::invalid_key("the \"x\" and \"y\" parameters are not a valid P-256 point"))
}

fn public_key_from_coordinates(x: &[u8], y: &[u8]) -> Option<PublicKey> {
	if x.len() != 32 || y.len() != 32 {
		return None;
	}
	let point = EncodedPoint::from_affine_coordinates(
		FieldBytes::from_slice(x),
		FieldBytes::from_slice(y),
		false,
	);
	Option::from(PublicKey::from_encoded_point(&point))
}

/// An optional base64url header parameter, decoded, defaulting to empty.
fn party_info(header: &JsonObject, name: &str) -> Result<Vec<u8>> {
	match header.get(name) {
		None => Ok(Vec::new()),
		Some(value) => {
			let value = value.as_str().ok_or_else(|| {
				Error::malformed_input(format!("the {:?} header parameter must be a string", name))
			})?;
			b64::decode(value)
		},
	}
}

impl KeyEncryptionAlgorithm for EcdhEs {
	fn name(&self) -> &'static str {
		"ECDH-ES"
	}

	fn allowed_key_types(&self) -> &'static [KeyType] {
		&[KeyType::Ec]
	}

	fn mode(&self) -> KeyManagementMode {
		KeyManagementMode::Derive
	}

	fn derive_cek(&self, key: &Jwk, cek_len: usize, header: &mut JsonObject) -> Result<Vec<u8>> {
		self.check_key_type(key)?;
		check_curve(key)?;
		let recipient = recipient_public_key(key)?;

		let enc = get_required_header_str(&[Some(&*header)], "enc")?.to_string();
		let apu = party_info(header, "apu")?;
		let apv = party_info(header, "apv")?;

		let ephemeral = EphemeralSecret::random(&mut rand::rngs::OsRng);
		let epk = ephemeral.public_key().to_encoded_point(false);
		let shared = ephemeral.diffie_hellman(&recipient);
		let cek = concat_kdf(shared.raw_secret_bytes().as_slice(), &enc, &apu, &apv, cek_len);

		let x = epk.x().ok_or_else(|| Error::invalid_key("degenerate ephemeral key"))?;
		let y = epk.y().ok_or_else(|| Error::invalid_key("degenerate ephemeral key"))?;
		header.insert(
			"epk".to_string(),
			serde_json::json!({
				"kty": "EC",
				"crv": "P-256",
				"x": b64::encode(x),
				"y": b64::encode(y),
			}),
		);
		Ok(cek)
	}

	fn recover_cek(&self, key: &Jwk, cek_len: usize, header: &JsonObject) -> Result<Vec<u8>> {
		self.check_key_type(key)?;
		check_curve(key)?;
		if !key.has("d") {
			return Err(Error::invalid_key("the key has no private part"));
		}
		let secret = SecretKey::from_slice(&key.get_bytes("d")?)
			.map_err(|_| Error::invalid_key("invalid P-256 private key"))?;

		let epk = header
			.get("epk")
			.ok_or_else(|| Error::missing_parameter("epk"))?
			.as_object()
			.ok_or_else(|| Error::malformed_input("the \"epk\" header parameter must be a JSON object"))?;
		let epk = Jwk::new(epk.clone())?;
		if epk.kty() != KeyType::Ec {
			return Err(Error::malformed_input("the \"epk\" header parameter must be an EC key"));
		}
		check_curve(&epk)?;
		let ephemeral = recipient_public_key(&epk)
			.map_err(|_| Error::malformed_input("the \"epk\" header parameter is not a valid P-256 point"))?;

		let enc = get_required_header_str(&[Some(header)], "enc")?;
		let apu = party_info(header, "apu")?;
		let apv = party_info(header, "apv")?;

		let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
		Ok(concat_kdf(shared.raw_secret_bytes().as_slice(), enc, &apu, &apv, cek_len))
	}
}
