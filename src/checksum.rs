use crate::color::Pixel;

const MODULUS: u32 = 65521;

/// Rolling checksum over the logical pixel bytes of a ProPra data segment.
///
/// `a` sums every byte together with its 1-based position, `b` sums the
/// intermediate values of `a`. Both are kept modulo 65521. Streams of
/// formats without a checksum carry `Option::<Checksum>::None` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checksum {
    a: u32,
    b: u32,
    position: u64,
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksum {
    pub fn new() -> Self {
        Self {
            a: 0,
            b: 1,
            position: 1,
        }
    }

    pub fn update(&mut self, byte: u8) {
        let position = (self.position % MODULUS as u64) as u32;
        self.a = (self.a + position + byte as u32) % MODULUS;
        self.b = (self.b + self.a) % MODULUS;
        self.position += 1;
    }

    pub fn update_all(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.update(byte));
    }

    pub fn update_pixel(&mut self, pixel: &Pixel) {
        self.update_all(pixel);
    }

    /// Number of bytes consumed so far.
    pub fn len(&self) -> u64 {
        self.position - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finalize(&self) -> u32 {
        (self.a << 16) + self.b
    }
}

/// Updates an optional checksum, the disabled state swallows all bytes.
pub(crate) fn update_optional(checksum: &mut Option<Checksum>, pixel: &Pixel) {
    if let Some(checksum) = checksum {
        checksum.update_pixel(pixel);
    }
}
