use std::io::{self, ErrorKind, Read, Write};

use crate::color::{Pixel, BYTES_PER_PIXEL};
use crate::error::Error;
use crate::logger;
use crate::Result;

pub const MAX_PACKET_PIXELS: usize = 128;
const RUN_FLAG: u8 = 0b1000_0000;
const COUNT_MASK: u8 = 0b0111_1111;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlePacket {
    /// one pixel repeated `count` times
    Run { count: u8, pixel: Pixel },
    /// distinct pixels stored verbatim
    Raw { pixels: Vec<Pixel> },
}

impl RlePacket {
    pub fn run(pixel: Pixel, count: usize) -> Self {
        debug_assert!((1..=MAX_PACKET_PIXELS).contains(&count));
        Self::Run {
            count: count as u8,
            pixel,
        }
    }

    pub fn header_byte(&self) -> u8 {
        match self {
            Self::Run { count, .. } => RUN_FLAG | (count - 1),
            Self::Raw { pixels } => (pixels.len() - 1) as u8,
        }
    }

    pub fn pixel_count(&self) -> usize {
        match self {
            Self::Run { count, .. } => *count as usize,
            Self::Raw { pixels } => pixels.len(),
        }
    }

    /// The pixel at `index` of the expanded packet.
    pub fn pixel(&self, index: usize) -> Pixel {
        match self {
            Self::Run { pixel, .. } => *pixel,
            Self::Raw { pixels } => pixels[index],
        }
    }

    /// Applies `f` to every stored pixel and keeps the packet boundaries.
    pub fn map_pixels<F: Fn(Pixel) -> Pixel>(self, f: F) -> Self {
        match self {
            Self::Run { count, pixel } => Self::Run {
                count,
                pixel: f(pixel),
            },
            Self::Raw { pixels } => Self::Raw {
                pixels: pixels.into_iter().map(f).collect(),
            },
        }
    }

    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Run { .. } => BYTES_PER_PIXEL,
            Self::Raw { pixels } => pixels.len() * BYTES_PER_PIXEL,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(self.header_byte());
        match self {
            Self::Run { pixel, .. } => bytes.extend_from_slice(pixel),
            Self::Raw { pixels } => pixels.iter().for_each(|p| bytes.extend_from_slice(p)),
        }
        logger::log_packet(bytes[0], &bytes[1..]);
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }
}

/// Streaming run-length encoder with one pixel of lookahead.
///
/// Invariant: while a run is open no raw pixels are pending.
pub struct RleEncoder<W: Write> {
    writer: W,
    run: Option<(Pixel, usize)>,
    pending: Vec<Pixel>,
    bytes_written: u64,
}

impl<W: Write> RleEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            run: None,
            pending: Vec::with_capacity(MAX_PACKET_PIXELS),
            bytes_written: 0,
        }
    }

    pub fn push(&mut self, pixel: Pixel) -> io::Result<()> {
        if let Some((run_pixel, count)) = self.run {
            if pixel == run_pixel {
                if count == MAX_PACKET_PIXELS {
                    self.emit(RlePacket::run(run_pixel, count))?;
                    self.run = Some((pixel, 1));
                } else {
                    self.run = Some((run_pixel, count + 1));
                }
            } else if count == 1 {
                self.run = None;
                self.pending.push(run_pixel);
                self.pending.push(pixel);
            } else {
                self.emit(RlePacket::run(run_pixel, count))?;
                self.run = None;
                self.pending.push(pixel);
            }
            return Ok(());
        }
        match self.pending.last() {
            Some(&last) if last == pixel => {
                self.pending.pop();
                self.flush_pending()?;
                self.run = Some((pixel, 2));
            }
            _ => {
                if self.pending.len() == MAX_PACKET_PIXELS {
                    self.flush_pending()?;
                }
                self.pending.push(pixel);
            }
        }
        Ok(())
    }

    pub fn push_all(&mut self, pixels: &[Pixel]) -> io::Result<()> {
        pixels.iter().try_for_each(|&p| self.push(p))
    }

    /// Emits an already formed packet after whatever is still open.
    pub fn write_packet(&mut self, packet: RlePacket) -> io::Result<()> {
        if let Some((pixel, count)) = self.run.take() {
            self.emit(RlePacket::run(pixel, count))?;
        }
        self.flush_pending()?;
        self.emit(packet)
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pixels = std::mem::replace(&mut self.pending, Vec::with_capacity(MAX_PACKET_PIXELS));
        self.emit(RlePacket::Raw { pixels })
    }

    fn emit(&mut self, packet: RlePacket) -> io::Result<()> {
        self.bytes_written += packet.write_to(&mut self.writer)? as u64;
        Ok(())
    }

    /// Emits the open packet and returns the total number of bytes written.
    pub fn finish(&mut self) -> io::Result<u64> {
        if let Some((pixel, count)) = self.run.take() {
            self.emit(RlePacket::run(pixel, count))?;
        }
        self.flush_pending()?;
        self.writer.flush()?;
        Ok(self.bytes_written)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Reads packets from a run-length encoded data segment.
pub struct RleDecoder<R: Read> {
    reader: R,
    bytes_read: u64,
}

impl<R: Read> RleDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes_read: 0,
        }
    }

    /// Bytes of the segment consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// `None` at the end of the stream; a packet cut short is a size mismatch.
    pub fn read_packet(&mut self) -> Result<Option<RlePacket>> {
        let header = match read_byte(&mut self.reader).map_err(Error::FailedToReadImageData)? {
            Some(header) => header,
            None => return Ok(None),
        };
        self.bytes_read += 1;
        let count = (header & COUNT_MASK) as usize + 1;
        let packet = if header & RUN_FLAG != 0 {
            let pixel = self.read_pixel(1)?;
            RlePacket::Run {
                count: count as u8,
                pixel,
            }
        } else {
            let mut pixels = Vec::with_capacity(count);
            for remaining in (1..=count).rev() {
                pixels.push(self.read_pixel(remaining)?);
            }
            RlePacket::Raw { pixels }
        };
        Ok(Some(packet))
    }

    fn read_pixel(&mut self, remaining_in_packet: usize) -> Result<Pixel> {
        let mut pixel = [0; BYTES_PER_PIXEL];
        self.reader.read_exact(&mut pixel).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::too_few_bytes(
                self.bytes_read + (remaining_in_packet * BYTES_PER_PIXEL) as u64,
                self.bytes_read,
            ),
            _ => Error::FailedToReadImageData(e),
        })?;
        self.bytes_read += BYTES_PER_PIXEL as u64;
        Ok(pixel)
    }

    /// True if at least one more byte follows.
    pub fn has_more_bytes(&mut self) -> Result<bool> {
        Ok(read_byte(&mut self.reader)
            .map_err(Error::FailedToReadImageData)?
            .is_some())
    }
}
