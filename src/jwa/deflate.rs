//! DEFLATE payload compression (`zip: "DEF"`, RFC 7516 section 4.1.3).
//!
//! The format is raw DEFLATE (RFC 1951), without the zlib wrapper.
//! Decompression is bounded: inflating past [`MAX_DECOMPRESSED_LEN`] is treated as
//! a decompression failure rather than an invitation to exhaust memory.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::CompressionAlgorithm;
use crate::{Error, Result};

/// The maximum size a compressed payload may inflate to.
pub const MAX_DECOMPRESSED_LEN: u64 = 64 * 1024 * 1024;

/// The DEFLATE compression algorithm.
pub struct Deflate;

impl CompressionAlgorithm for Deflate {
	fn name(&self) -> &'static str {
		"DEF"
	}

	fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
		let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
		encoder
			.write_all(data)
			.map_err(|e| Error::compression_failed(e.to_string()))?;
		encoder.finish().map_err(|e| Error::compression_failed(e.to_string()))
	}

	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
		let mut output = Vec::new();
		let mut decoder = DeflateDecoder::new(data).take(MAX_DECOMPRESSED_LEN + 1);
		decoder
			.read_to_end(&mut output)
			.map_err(|e| Error::decompression_failed(e.to_string()))?;
		if output.len() as u64 > MAX_DECOMPRESSED_LEN {
			return Err(Error::decompression_failed("decompressed payload too large"));
		}
		Ok(output)
	}
}
