use std::io::Write;

use super::{Compression, PixelWriter};
use crate::color::Pixel;
use crate::error::Error;
use crate::rle::{RleEncoder, RlePacket};
use crate::Result;

/// Creates the writer for an output data segment.
pub fn for_compression<'a, W: Write + 'a>(
    compression: Compression,
    writer: W,
) -> Box<dyn PixelWriter + 'a> {
    match compression {
        Compression::Rle => Box::new(RlePixelWriter::new(writer)),
        _ => Box::new(UncompressedPixelWriter::new(writer)),
    }
}

pub struct UncompressedPixelWriter<W: Write> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write> UncompressedPixelWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PixelWriter for UncompressedPixelWriter<W> {
    fn write_pixel(&mut self, pixel: Pixel) -> Result<()> {
        self.writer
            .write_all(&pixel)
            .map_err(Error::FailedToWriteImageData)?;
        self.bytes_written += pixel.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64> {
        self.writer.flush().map_err(Error::FailedToWriteImageData)?;
        Ok(self.bytes_written)
    }
}

pub struct RlePixelWriter<W: Write> {
    encoder: RleEncoder<W>,
}

impl<W: Write> RlePixelWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            encoder: RleEncoder::new(writer),
        }
    }

    /// Copies a packet without merging it with its neighbours.
    pub fn write_packet(&mut self, packet: RlePacket) -> Result<()> {
        self.encoder
            .write_packet(packet)
            .map_err(Error::FailedToWriteImageData)
    }

    pub fn into_inner(self) -> W {
        self.encoder.into_inner()
    }
}

impl<W: Write> PixelWriter for RlePixelWriter<W> {
    fn write_pixel(&mut self, pixel: Pixel) -> Result<()> {
        self.encoder
            .push(pixel)
            .map_err(Error::FailedToWriteImageData)
    }

    fn finish(&mut self) -> Result<u64> {
        self.encoder.finish().map_err(Error::FailedToWriteImageData)
    }
}
