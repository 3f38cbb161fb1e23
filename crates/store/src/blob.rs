//! Compressed JSON blobs

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::Result;

pub fn compress(json: &str) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes())?;
    Ok(encoder.finish()?)
}

pub fn decompress(blob: &[u8]) -> Result<String> {
    let mut decoder = ZlibDecoder::new(blob);
    let mut json = String::new();
    decoder.read_to_string(&mut json)?;
    Ok(json)
}
