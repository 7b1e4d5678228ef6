use std::fmt::Display;
use std::path::Path;

use clap::builder::PossibleValue;
use clap::ValueEnum;

use crate::color::{ChannelOrder, Pixel};
use crate::error::Error;
use crate::Result;

pub mod header;
pub mod reader;
pub mod writer;

pub const PROPRA_EXTENSION: &str = "propra";
pub const TGA_EXTENSION: &str = "tga";

/// The two supported containers.
///
/// `ProPra` has a 30 byte header, knows uncompressed, run-length and
/// Huffman encoded data and protects its data segment with a checksum.
/// `Tga` has an 18 byte header and knows uncompressed and run-length data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    ProPra,
    Tga,
}

impl ImageFormat {
    pub fn header_length(&self) -> usize {
        match self {
            Self::ProPra => 30,
            Self::Tga => 18,
        }
    }

    pub fn channel_order(&self) -> ChannelOrder {
        match self {
            Self::ProPra => ChannelOrder::new(0, 2, 1),
            Self::Tga => ChannelOrder::new(2, 1, 0),
        }
    }

    pub fn has_checksum(&self) -> bool {
        matches!(self, Self::ProPra)
    }

    pub fn supports(&self, compression: Compression) -> bool {
        match self {
            Self::ProPra => true,
            Self::Tga => compression != Compression::Huffman,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some(PROPRA_EXTENSION) => Ok(Self::ProPra),
            Some(TGA_EXTENSION) => Ok(Self::Tga),
            _ => Err(Error::UnknownFileFormat(path.display().to_string())),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProPra => write!(f, "propra"),
            Self::Tga => write!(f, "tga"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Uncompressed,
    Rle,
    Huffman,
}

impl ValueEnum for Compression {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Uncompressed, Self::Rle]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Uncompressed => Some(PossibleValue::new("uncompressed")),
            Self::Rle => Some(PossibleValue::new("rle")),
            Self::Huffman => None,
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uncompressed => write!(f, "uncompressed"),
            Self::Rle => write!(f, "rle"),
            Self::Huffman => write!(f, "huffman"),
        }
    }
}

/// Source of stored pixels, already decompressed.
pub trait PixelReader {
    /// `None` marks the end of the data segment.
    fn read_pixel(&mut self) -> Result<Option<Pixel>>;

    /// Bytes of the data segment consumed, if more bytes follow the last pixel.
    fn trailing_data_offset(&mut self) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Sink for stored pixels, compressing them as its format requires.
pub trait PixelWriter {
    fn write_pixel(&mut self, pixel: Pixel) -> Result<()>;

    /// Writes pending data and returns the number of bytes of the data segment.
    fn finish(&mut self) -> Result<u64>;
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::{Compression, ImageFormat};
    use crate::error::ErrorCategory;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ImageFormat::from_path(Path::new("a/b/image.propra")).unwrap(),
            ImageFormat::ProPra
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("IMAGE.TGA")).unwrap(),
            ImageFormat::Tga
        );
        let error = ImageFormat::from_path(Path::new("image.png")).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::UnsupportedConversion);
    }

    #[test]
    fn tga_has_no_huffman() {
        assert!(!ImageFormat::Tga.supports(Compression::Huffman));
        assert!(ImageFormat::ProPra.supports(Compression::Huffman));
        assert!(ImageFormat::Tga.supports(Compression::Rle));
    }
}
