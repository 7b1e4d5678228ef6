use std::io::{self, ErrorKind, Read, Write};

use crate::binary_stream::{BitReader, BitWriter};
use crate::Result;

pub mod tree;

pub use tree::{BitPath, HuffmanTree, MAX_TREE_DEPTH};
use tree::NodeKind;

/// Decodes bytes from a data segment that starts with a serialized tree.
pub struct HuffmanDecoder<R: Read> {
    bits: BitReader<R>,
    tree: HuffmanTree,
}

impl<R: Read> HuffmanDecoder<R> {
    /// Reads the tree from the front of the stream.
    pub fn new(reader: R) -> Result<Self> {
        let mut bits = BitReader::new(reader);
        let tree = HuffmanTree::read_from(&mut bits)?;
        Ok(Self { bits, tree })
    }

    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }

    /// Walks the tree until a leaf is reached.
    ///
    /// Returns `None` when the bits run out, a code cut off by the end of
    /// the stream is padding.
    pub fn decode_symbol(&mut self) -> Result<Option<u8>> {
        let mut node = self.tree.root();
        loop {
            match node {
                NodeKind::Leaf { symbol } => return Ok(Some(symbol)),
                NodeKind::Inner { left, right } => {
                    let bit = self
                        .bits
                        .read_bit()
                        .map_err(crate::error::Error::FailedToReadImageData)?;
                    node = match bit {
                        Some(true) => self.tree.node(right),
                        Some(false) => self.tree.node(left),
                        None => return Ok(None),
                    };
                }
            }
        }
    }

    /// Bytes pulled from the underlying stream so far.
    pub fn bytes_fetched(&self) -> u64 {
        self.bits.bytes_fetched()
    }
}

/// Writes a serialized tree followed by the codes of the encoded bytes.
pub struct HuffmanEncoder<'a, W: Write> {
    writer: BitWriter<'a, W>,
    codes: Vec<Option<BitPath>>,
}

impl<'a, W: Write> HuffmanEncoder<'a, W> {
    pub fn new(tree: &HuffmanTree, writer: &'a mut W) -> io::Result<Self> {
        let mut writer = BitWriter::new(writer);
        tree.write_to(&mut writer)?;
        let mut codes = vec![None; 256];
        for (path, symbol) in tree.codes() {
            codes[symbol as usize] = Some(path);
        }
        Ok(Self { writer, codes })
    }

    pub fn encode(&mut self, symbol: u8) -> io::Result<()> {
        let code = self.codes[symbol as usize].as_ref().ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidInput,
                format!("byte {:#04X} has no code in the Huffman tree", symbol),
            )
        })?;
        for &bit in code {
            self.writer.write_bit(bit)?;
        }
        Ok(())
    }

    pub fn encode_all(&mut self, data: &[u8]) -> io::Result<()> {
        data.iter().try_for_each(|&b| self.encode(b))
    }

    /// Pads the last byte with zero bits.
    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Builds a tree from `data` and returns the complete encoded segment.
pub fn encode_data(data: &[u8]) -> io::Result<Vec<u8>> {
    let tree = HuffmanTree::from_data(data)
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "nothing to encode"))?;
    let mut segment = Vec::new();
    let mut encoder = HuffmanEncoder::new(&tree, &mut segment)?;
    encoder.encode_all(data)?;
    encoder.finish()?;
    Ok(segment)
}

#[cfg(test)]
mod test {
    use super::{encode_data, HuffmanDecoder, HuffmanEncoder, HuffmanTree};
    use crate::error::ErrorCategory;

    fn decode(segment: &[u8], count: usize) -> Vec<u8> {
        let mut decoder = HuffmanDecoder::new(segment).unwrap();
        (0..count)
            .map(|_| decoder.decode_symbol().unwrap().unwrap())
            .collect()
    }

    #[test]
    fn round_trip_text() {
        let data = b"abracadabra, said the wizard";
        let segment = encode_data(data).unwrap();
        assert_eq!(decode(&segment, data.len()), data.to_vec());
    }

    #[test]
    fn round_trip_single_symbol() {
        let data = [0xAB; 50];
        let segment = encode_data(&data).unwrap();
        assert_eq!(decode(&segment, data.len()), data.to_vec());
    }

    #[test]
    fn padding_bits_end_the_stream() {
        // tree 0 1'A' 1'B' (19 bits), then code of 'A' and 4 padding bits
        let tree = HuffmanTree::from_frequencies(&[(b'A', 1), (b'B', 1)]).unwrap();
        let mut segment = Vec::new();
        let mut encoder = HuffmanEncoder::new(&tree, &mut segment).unwrap();
        encoder.encode(b'A').unwrap();
        encoder.finish().unwrap();
        assert_eq!(segment.len(), 3);

        let mut decoder = HuffmanDecoder::new(&segment[..]).unwrap();
        let first = decoder.decode_symbol().unwrap();
        assert_eq!(first, Some(b'A'));
        // the padding decodes to further symbols, not to an error
        let mut decoded = 1;
        while decoder.decode_symbol().unwrap().is_some() {
            decoded += 1;
        }
        assert_eq!(decoded, 5);
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let tree = HuffmanTree::from_frequencies(&[(1, 1), (2, 1)]).unwrap();
        let mut segment = Vec::new();
        let mut encoder = HuffmanEncoder::new(&tree, &mut segment).unwrap();
        assert!(encoder.encode(3).is_err());
    }

    #[test]
    fn decoder_reports_malformed_tree() {
        let error = HuffmanDecoder::new(&[0b1000_0000u8, 0][..]).err().unwrap();
        assert_eq!(error.category(), ErrorCategory::MalformedHeader);
    }
}
