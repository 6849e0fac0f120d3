//! Gzip encoding of message bodies.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

/// `content-encoding` value for bodies produced by [`compress`].
pub const CONTENT_ENCODING: &str = "gzip";

/// Gzip `data` at the default compression level.
///
/// # Errors
///
/// Returns the encoder's I/O error. Writing into memory does not fail in practice.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate a gzip body produced by [`compress`].
///
/// # Errors
///
/// Returns an error if `data` is not a valid gzip stream.
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
