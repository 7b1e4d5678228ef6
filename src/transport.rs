//! Base32hex transport coding of arbitrary files.
//!
//! Five bits per symbol, most significant bit first, no padding symbols.

use std::io::{BufReader, Read, Write};

use crate::binary_stream::{BitReader, BitWriter};
use crate::error::Error;
use crate::Result;

pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";
const BITS_PER_SYMBOL: u8 = 5;

fn symbol_value(symbol: u8) -> Option<u8> {
    match symbol {
        b'0'..=b'9' => Some(symbol - b'0'),
        b'A'..=b'V' => Some(symbol - b'A' + 10),
        _ => None,
    }
}

/// Encodes everything `reader` yields, returns the number of symbols written.
pub fn encode<R: Read, W: Write>(reader: R, writer: &mut W) -> Result<u64> {
    let mut bits = BitReader::new(reader);
    let mut symbols = Vec::new();
    let mut symbols_written = 0;
    loop {
        let group = bits
            .read_bits(BITS_PER_SYMBOL)
            .map_err(Error::FailedToReadImageData)?;
        if group.len == 0 {
            break;
        }
        // the last group is padded with zero bits on the right
        let value = group.value << (BITS_PER_SYMBOL - group.len);
        symbols.push(ALPHABET[value as usize]);
        if symbols.len() == 1024 {
            writer
                .write_all(&symbols)
                .map_err(Error::FailedToWriteImageData)?;
            symbols_written += symbols.len() as u64;
            symbols.clear();
        }
        if group.len < BITS_PER_SYMBOL {
            break;
        }
    }
    writer
        .write_all(&symbols)
        .map_err(Error::FailedToWriteImageData)?;
    writer.flush().map_err(Error::FailedToWriteImageData)?;
    symbols_written += symbols.len() as u64;
    log::debug!(
        "Encoded {} bytes into {} symbols",
        bits.bytes_fetched(),
        symbols_written
    );
    Ok(symbols_written)
}

/// Decodes symbols from `reader`, ASCII whitespace is skipped.
///
/// Bits left over after the last complete byte are dropped. Returns the
/// number of bytes written.
pub fn decode<R: Read, W: Write>(reader: R, writer: &mut W) -> Result<u64> {
    let mut bits = BitWriter::new(writer);
    let mut symbol_bits = 0u64;
    for (offset, byte) in BufReader::new(reader).bytes().enumerate() {
        let symbol = byte.map_err(Error::FailedToReadImageData)?;
        if symbol.is_ascii_whitespace() {
            continue;
        }
        let value = symbol_value(symbol).ok_or(Error::InvalidTransportSymbol {
            symbol,
            offset: offset as u64,
        })?;
        bits.write_bits(&[value << (8 - BITS_PER_SYMBOL)], BITS_PER_SYMBOL as usize)
            .map_err(Error::FailedToWriteImageData)?;
        symbol_bits += BITS_PER_SYMBOL as u64;
    }
    if bits.pending_bits() > 0 {
        log::debug!("Dropping {} trailing bits", bits.pending_bits());
    }
    bits.flush_discarding_partial_byte()
        .map_err(Error::FailedToWriteImageData)?;
    Ok(symbol_bits / 8)
}

pub fn encode_bytes(data: &[u8]) -> Result<String> {
    let mut encoded = Vec::new();
    encode(data, &mut encoded)?;
    // every symbol is ASCII
    Ok(encoded.into_iter().map(char::from).collect())
}

pub fn decode_bytes(encoded: &[u8]) -> Result<Vec<u8>> {
    let mut decoded = Vec::new();
    decode(encoded, &mut decoded)?;
    Ok(decoded)
}
