use std::io::{ErrorKind, Read};

use super::header::ImageHeader;
use super::{Compression, PixelReader};
use crate::color::{Pixel, BYTES_PER_PIXEL};
use crate::error::Error;
use crate::huffman::HuffmanDecoder;
use crate::rle::{RleDecoder, RlePacket};
use crate::Result;

/// Creates the reader matching the compression declared in `header`.
///
/// `reader` must be positioned right after the header.
pub fn for_header<'a, R: Read + 'a>(
    header: &ImageHeader,
    reader: R,
) -> Result<Box<dyn PixelReader + 'a>> {
    let pixel_count = header.pixel_count();
    Ok(match header.compression {
        Compression::Uncompressed => Box::new(UncompressedPixelReader::new(reader, pixel_count)),
        Compression::Rle => Box::new(RlePixelReader::new(reader, pixel_count)),
        Compression::Huffman => Box::new(HuffmanPixelReader::new(reader, pixel_count)?),
    })
}

pub struct UncompressedPixelReader<R: Read> {
    reader: R,
    pixel_count: u64,
    pixels_read: u64,
}

impl<R: Read> UncompressedPixelReader<R> {
    pub fn new(reader: R, pixel_count: u64) -> Self {
        Self {
            reader,
            pixel_count,
            pixels_read: 0,
        }
    }
}

impl<R: Read> PixelReader for UncompressedPixelReader<R> {
    fn read_pixel(&mut self) -> Result<Option<Pixel>> {
        if self.pixels_read == self.pixel_count {
            return Ok(None);
        }
        let mut pixel = [0; BYTES_PER_PIXEL];
        self.reader.read_exact(&mut pixel).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::too_few_bytes(
                self.pixel_count * BYTES_PER_PIXEL as u64,
                self.pixels_read * BYTES_PER_PIXEL as u64,
            ),
            _ => Error::FailedToReadImageData(e),
        })?;
        self.pixels_read += 1;
        Ok(Some(pixel))
    }
}

/// Expands run-length packets while checking them against the pixel count.
pub struct RlePixelReader<R: Read> {
    decoder: RleDecoder<R>,
    pixel_count: u64,
    pixels_decoded: u64,
    current: Option<RlePacket>,
    index_in_packet: usize,
}

impl<R: Read> RlePixelReader<R> {
    pub fn new(reader: R, pixel_count: u64) -> Self {
        Self {
            decoder: RleDecoder::new(reader),
            pixel_count,
            pixels_decoded: 0,
            current: None,
            index_in_packet: 0,
        }
    }

    /// Next packet of the segment, `None` once all pixels are decoded.
    ///
    /// A packet reaching beyond the pixel count is a size mismatch, as is a
    /// segment that ends early.
    pub fn read_packet(&mut self) -> Result<Option<RlePacket>> {
        if self.pixels_decoded == self.pixel_count {
            return Ok(None);
        }
        let expected = self.pixel_count * BYTES_PER_PIXEL as u64;
        let packet = self.decoder.read_packet()?.ok_or_else(|| {
            Error::too_few_bytes(expected, self.pixels_decoded * BYTES_PER_PIXEL as u64)
        })?;
        let decoded = self.pixels_decoded + packet.pixel_count() as u64;
        if decoded > self.pixel_count {
            return Err(Error::too_many_bytes(
                expected,
                decoded * BYTES_PER_PIXEL as u64,
            ));
        }
        self.pixels_decoded = decoded;
        log::trace!(
            "Decoded packet of {} pixels, {} of {} done",
            packet.pixel_count(),
            decoded,
            self.pixel_count
        );
        Ok(Some(packet))
    }

    /// Bytes of the data segment consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.decoder.bytes_read()
    }
}

impl<R: Read> PixelReader for RlePixelReader<R> {
    fn read_pixel(&mut self) -> Result<Option<Pixel>> {
        if let Some(packet) = &self.current {
            if self.index_in_packet < packet.pixel_count() {
                let pixel = packet.pixel(self.index_in_packet);
                self.index_in_packet += 1;
                return Ok(Some(pixel));
            }
        }
        match self.read_packet()? {
            Some(packet) => {
                let pixel = packet.pixel(0);
                self.current = Some(packet);
                self.index_in_packet = 1;
                Ok(Some(pixel))
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    fn trailing_data_offset(&mut self) -> Result<Option<u64>> {
        let consumed = self.decoder.bytes_read();
        Ok(self.decoder.has_more_bytes()?.then_some(consumed))
    }
}

/// Decodes bytes of a Huffman segment three at a time.
pub struct HuffmanPixelReader<R: Read> {
    decoder: HuffmanDecoder<R>,
    pixel_count: u64,
    pixels_read: u64,
}

impl<R: Read> HuffmanPixelReader<R> {
    /// Reconstructs the tree at the start of the segment.
    pub fn new(reader: R, pixel_count: u64) -> Result<Self> {
        let decoder = HuffmanDecoder::new(reader)?;
        log::debug!(
            "Huffman tree with {} leaves, {} bytes fetched",
            decoder.tree().leaf_count(),
            decoder.bytes_fetched()
        );
        Ok(Self {
            decoder,
            pixel_count,
            pixels_read: 0,
        })
    }
}

impl<R: Read> PixelReader for HuffmanPixelReader<R> {
    fn read_pixel(&mut self) -> Result<Option<Pixel>> {
        if self.pixels_read == self.pixel_count {
            return Ok(None);
        }
        let mut pixel = [0; BYTES_PER_PIXEL];
        for (i, byte) in pixel.iter_mut().enumerate() {
            *byte = self.decoder.decode_symbol()?.ok_or_else(|| {
                Error::too_few_bytes(
                    self.pixel_count * BYTES_PER_PIXEL as u64,
                    self.pixels_read * BYTES_PER_PIXEL as u64 + i as u64,
                )
            })?;
        }
        self.pixels_read += 1;
        Ok(Some(pixel))
    }
}
