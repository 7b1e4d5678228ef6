use std::io;
use std::io::{ErrorKind, Read, Write};

/// State for writing individual bits to a Writer
pub struct BitWriter<'a, T: Write> {
    /// the underlying output stream
    writer: &'a mut T,
    /// buffer of individual bits not yet written
    buffer: u8,
    /// how many bits are waiting to be written
    buffer_space_used: u8,
}

impl<'a, T: Write> BitWriter<'a, T> {
    pub fn new(writer: &'a mut T) -> BitWriter<'a, T> {
        BitWriter {
            writer,
            buffer: 0,
            buffer_space_used: 0,
        }
    }

    /// write a non-byte-aligned number of bits
    ///
    /// buf: a byte array containing a contigous block
    /// count: how many bits of buf to write, starting with the
    ///        most significant bit of buf[0]
    ///
    /// returns the number of byte writes incurred onto
    /// the underlying stream, but does not guarantee that
    /// all bits have been written, use flush to write
    /// any remaining bits.
    pub fn write_bits(&mut self, buf: &[u8], count: usize) -> Result<usize, io::Error> {
        let mut remaining_bits_offset = 0;
        let mut bytes_written = 0;
        if self.buffer_space_used == 0 {
            // this is efficient for large blocks of byte writes
            let quick_byte_count = count / 8;
            self.writer.write_all(&buf[0..quick_byte_count])?;
            bytes_written = quick_byte_count;
            remaining_bits_offset = quick_byte_count * 8;
        }
        for bit_index in remaining_bits_offset..count {
            let byte_index = bit_index / 8;
            let bit_index = bit_index % 8;
            let bit_val: bool = (buf[byte_index] & 0b10000000_u8.rotate_right(bit_index as u32)) > 0;
            self.write_bit(bit_val)?;
            if self.buffer_space_used == 0 {
                bytes_written += 1;
            }
        }
        Ok(bytes_written)
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<(), io::Error> {
        if bit {
            self.buffer |= 0b10000000_u8.rotate_right(self.buffer_space_used as u32);
        } else {
            self.buffer &= 0b01111111_u8.rotate_right(self.buffer_space_used as u32);
        }
        self.buffer_space_used += 1;
        if self.buffer_space_used == 8 {
            self.writer.write_all(&[self.buffer])?;
            self.buffer_space_used = 0;
            self.buffer = 0; // depended upon in flush()
        }
        Ok(())
    }

    /// Number of bits held back because they do not fill a byte yet.
    pub fn pending_bits(&self) -> u8 {
        self.buffer_space_used
    }

    /// Drops bits that do not complete a byte and flushes the underlying writer.
    pub fn flush_discarding_partial_byte(&mut self) -> Result<(), io::Error> {
        self.buffer = 0;
        self.buffer_space_used = 0;
        self.writer.flush()
    }
}

impl<T: Write> Write for BitWriter<'_, T> {
    /// Writing of byte arrays into the bit writer (for performance)
    ///
    /// Warning: Even when the returned number in the result equals
    ///          the length of the input buffer, not all bits of the
    ///          input may have been written (because of possible
    ///          single bits in BitWriters buffer)
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.write_bits(buf, buf.len() * 8)?;
        Ok(buf.len())
    }

    /// Flush all bits and the underlying writer;
    ///
    /// If there are non-byte-aligned bits still
    /// in the buffer, they will be written to the output
    /// with 0 padding to the next byte;
    fn flush(&mut self) -> Result<(), io::Error> {
        if self.buffer_space_used != 0 {
            self.writer.write_all(&[self.buffer])?;
            self.buffer = 0;
            self.buffer_space_used = 0;
        }
        self.writer.flush()
    }
}

const BATCH_SIZE: usize = 512;

/// Up to 32 bits read in one go, right aligned in `value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitGroup {
    pub value: u32,
    pub len: u8,
}

/// Reads individual bits, most significant bit first, from a Reader.
///
/// Bytes are pulled from the underlying stream in batches when the
/// current batch is used up, the stream is never rewound.
pub struct BitReader<R: Read> {
    reader: R,
    batch: Vec<u8>,
    batch_len: usize,
    byte_index: usize,
    bit_index: u8,
    bytes_fetched: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            batch: vec![0; BATCH_SIZE],
            batch_len: 0,
            byte_index: 0,
            bit_index: 0,
            bytes_fetched: 0,
        }
    }

    fn refill(&mut self) -> io::Result<bool> {
        loop {
            match self.reader.read(&mut self.batch) {
                Ok(n) => {
                    self.batch_len = n;
                    self.byte_index = 0;
                    self.bit_index = 0;
                    self.bytes_fetched += n as u64;
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns `None` once the underlying stream is exhausted.
    pub fn read_bit(&mut self) -> io::Result<Option<bool>> {
        if self.byte_index >= self.batch_len && !self.refill()? {
            return Ok(None);
        }
        let bit = self.batch[self.byte_index] & (0b1000_0000 >> self.bit_index) != 0;
        self.bit_index += 1;
        if self.bit_index == 8 {
            self.bit_index = 0;
            self.byte_index += 1;
        }
        Ok(Some(bit))
    }

    /// Reads up to `count` bits; fewer are returned only at the end of the stream.
    pub fn read_bits(&mut self, count: u8) -> io::Result<BitGroup> {
        debug_assert!(count <= 32);
        let mut group = BitGroup { value: 0, len: 0 };
        while group.len < count {
            match self.read_bit()? {
                Some(bit) => {
                    group.value = (group.value << 1) | bit as u32;
                    group.len += 1;
                }
                None => break,
            }
        }
        Ok(group)
    }

    /// Total bytes taken from the underlying stream so far.
    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched
    }
}
