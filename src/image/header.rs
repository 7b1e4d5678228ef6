use std::io::{ErrorKind, Read};

use super::{Compression, ImageFormat};
use crate::color::BYTES_PER_PIXEL;
use crate::error::{Error, SizeMismatch};
use crate::logger;
use crate::Result;

pub const PROPRA_SIGNATURE: &[u8; 12] = b"ProPraWiSe22";
pub const PIXEL_DEPTH: u8 = 24;

const PROPRA_COMPRESSION_UNCOMPRESSED: u8 = 0;
const PROPRA_COMPRESSION_RLE: u8 = 1;
const PROPRA_COMPRESSION_HUFFMAN: u8 = 2;

const TGA_IMAGE_TYPE_UNCOMPRESSED: u8 = 2;
const TGA_IMAGE_TYPE_RLE: u8 = 10;
/// image descriptor with the origin in the top left corner
const TGA_TOP_LEFT_ORIGIN: u8 = 32;

/// Size and checksum of a ProPra data segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentInfo {
    pub data_segment_size: u64,
    pub checksum: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageHeader {
    pub format: ImageFormat,
    pub compression: Compression,
    pub width: u16,
    pub height: u16,
    pub pixel_depth: u8,
    /// only present for ProPra
    pub segment: Option<SegmentInfo>,
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut buffer = [0; 4];
    buffer.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buffer)
}

fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    let mut buffer = [0; 8];
    buffer.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buffer)
}

impl ImageHeader {
    /// Header of an output image, the segment info is filled in by [`Self::with_segment`].
    pub fn new(format: ImageFormat, compression: Compression, width: u16, height: u16) -> Self {
        Self {
            format,
            compression,
            width,
            height,
            pixel_depth: PIXEL_DEPTH,
            segment: None,
        }
    }

    pub fn with_segment(mut self, data_segment_size: u64, checksum: Option<u32>) -> Self {
        if self.format.has_checksum() {
            self.segment = Some(SegmentInfo {
                data_segment_size,
                checksum: checksum.unwrap_or_default(),
            });
        }
        self
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn uncompressed_segment_size(&self) -> u64 {
        self.pixel_count() * BYTES_PER_PIXEL as u64
    }

    pub fn declared_checksum(&self) -> Option<u32> {
        self.segment.map(|s| s.checksum)
    }

    /// Reads exactly one header of the given format from the start of a stream.
    pub fn read_from<R: Read>(format: ImageFormat, reader: &mut R) -> Result<Self> {
        let mut bytes = vec![0; format.header_length()];
        reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::MalformedHeader("file is shorter than its header"),
            _ => Error::FailedToReadImageData(e),
        })?;
        logger::log_header(format, &bytes);
        Self::parse(format, &bytes)
    }

    pub fn parse(format: ImageFormat, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < format.header_length() {
            return Err(Error::MalformedHeader("file is shorter than its header"));
        }
        let header = match format {
            ImageFormat::ProPra => Self::parse_propra(bytes)?,
            ImageFormat::Tga => Self::parse_tga(bytes)?,
        };
        header.check_common_fields()?;
        Ok(header)
    }

    fn parse_propra(bytes: &[u8]) -> Result<Self> {
        if &bytes[0..12] != PROPRA_SIGNATURE {
            return Err(Error::MalformedHeader("signature is not 'ProPraWiSe22'"));
        }
        let compression = match bytes[12] {
            PROPRA_COMPRESSION_UNCOMPRESSED => Compression::Uncompressed,
            PROPRA_COMPRESSION_RLE => Compression::Rle,
            PROPRA_COMPRESSION_HUFFMAN => Compression::Huffman,
            code => return Err(Error::UnsupportedField("compression", code as u64)),
        };
        Ok(Self {
            format: ImageFormat::ProPra,
            compression,
            width: u16_at(bytes, 13),
            height: u16_at(bytes, 15),
            pixel_depth: bytes[17],
            segment: Some(SegmentInfo {
                data_segment_size: u64_at(bytes, 18),
                checksum: u32_at(bytes, 26),
            }),
        })
    }

    fn parse_tga(bytes: &[u8]) -> Result<Self> {
        if bytes[0] != 0 {
            return Err(Error::UnsupportedField("image id length", bytes[0] as u64));
        }
        let compression = match bytes[2] {
            TGA_IMAGE_TYPE_UNCOMPRESSED => Compression::Uncompressed,
            TGA_IMAGE_TYPE_RLE => Compression::Rle,
            code => return Err(Error::UnsupportedField("image type", code as u64)),
        };
        if bytes[17] != TGA_TOP_LEFT_ORIGIN {
            return Err(Error::UnsupportedField("image descriptor", bytes[17] as u64));
        }
        Ok(Self {
            format: ImageFormat::Tga,
            compression,
            width: u16_at(bytes, 12),
            height: u16_at(bytes, 14),
            pixel_depth: bytes[16],
            segment: None,
        })
    }

    fn check_common_fields(&self) -> Result<()> {
        if self.pixel_depth != PIXEL_DEPTH {
            return Err(Error::UnsupportedField(
                "pixel depth",
                self.pixel_depth as u64,
            ));
        }
        if self.width == 0 {
            return Err(Error::UnsupportedField("width", 0));
        }
        if self.height == 0 {
            return Err(Error::UnsupportedField("height", 0));
        }
        Ok(())
    }

    /// Compares the declared data segment against the dimensions and the file length.
    pub fn validate_segment(&self, file_length: u64) -> Result<()> {
        let actual = file_length.saturating_sub(self.format.header_length() as u64);
        let expected = self.uncompressed_segment_size();
        match self.segment {
            Some(segment) => {
                let declared = segment.data_segment_size;
                if self.compression == Compression::Uncompressed {
                    if declared % BYTES_PER_PIXEL as u64 != 0 {
                        return Err(Error::SizeMismatch(SizeMismatch::NotMultipleOfThree(
                            declared,
                        )));
                    }
                    if declared != expected {
                        return Err(Error::SizeMismatch(SizeMismatch::DeclaredSizeDiffers {
                            declared,
                            expected,
                        }));
                    }
                }
                if actual < declared {
                    return Err(Error::too_few_bytes(declared, actual));
                }
                if actual > declared {
                    return Err(Error::too_many_bytes(declared, actual));
                }
            }
            None => {
                // trailing bytes of a TGA file belong to its footer
                if self.compression == Compression::Uncompressed && actual < expected {
                    return Err(Error::too_few_bytes(expected, actual));
                }
            }
        }
        Ok(())
    }

    pub fn compose(&self) -> Vec<u8> {
        let bytes = match self.format {
            ImageFormat::ProPra => self.compose_propra(),
            ImageFormat::Tga => self.compose_tga(),
        };
        logger::log_header(self.format, &bytes);
        bytes
    }

    fn compose_propra(&self) -> Vec<u8> {
        let compression = match self.compression {
            Compression::Uncompressed => PROPRA_COMPRESSION_UNCOMPRESSED,
            Compression::Rle => PROPRA_COMPRESSION_RLE,
            Compression::Huffman => PROPRA_COMPRESSION_HUFFMAN,
        };
        let segment = self.segment.unwrap_or(SegmentInfo {
            data_segment_size: 0,
            checksum: 0,
        });
        let mut bytes = Vec::with_capacity(ImageFormat::ProPra.header_length());
        bytes.extend_from_slice(PROPRA_SIGNATURE);
        bytes.push(compression);
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.push(self.pixel_depth);
        bytes.extend_from_slice(&segment.data_segment_size.to_le_bytes());
        bytes.extend_from_slice(&segment.checksum.to_le_bytes());
        bytes
    }

    fn compose_tga(&self) -> Vec<u8> {
        let image_type = match self.compression {
            Compression::Rle => TGA_IMAGE_TYPE_RLE,
            _ => TGA_IMAGE_TYPE_UNCOMPRESSED,
        };
        let height = self.height.to_le_bytes();
        let width = self.width.to_le_bytes();
        #[rustfmt::skip]
        let bytes = vec![
            0,                    // image id length
            0,                    // color map type
            image_type,           // 2 = uncompressed, 10 = run-length
            0, 0, 0, 0, 0,        // color map specification
            0, 0,                 // x origin
            height[0], height[1], // y origin
            width[0], width[1],   // width
            height[0], height[1], // height
            self.pixel_depth,     // bits per pixel
            TGA_TOP_LEFT_ORIGIN,  // image descriptor
        ];
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::{ImageHeader, SegmentInfo, PROPRA_SIGNATURE};
    use crate::error::{Error, ErrorCategory, SizeMismatch};
    use crate::image::{Compression, ImageFormat};

    fn tga_header_bytes(image_type: u8, width: u16, height: u16) -> Vec<u8> {
        let w = width.to_le_bytes();
        let h = height.to_le_bytes();
        vec![
            0, 0, image_type, 0, 0, 0, 0, 0, 0, 0, h[0], h[1], w[0], w[1], h[0], h[1], 24, 32,
        ]
    }

    fn propra_header_bytes(compression: u8, width: u16, height: u16, size: u64) -> Vec<u8> {
        let mut bytes = PROPRA_SIGNATURE.to_vec();
        bytes.push(compression);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.push(24);
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&0x0102_0304u32.to_le_bytes());
        bytes
    }

    #[test]
    fn parse_tga() {
        let header = ImageHeader::parse(ImageFormat::Tga, &tga_header_bytes(10, 640, 480)).unwrap();
        assert_eq!(header.compression, Compression::Rle);
        assert_eq!(header.width, 640);
        assert_eq!(header.height, 480);
        assert_eq!(header.segment, None);
    }

    #[test]
    fn parse_propra() {
        let bytes = propra_header_bytes(2, 3, 4, 99);
        let header = ImageHeader::parse(ImageFormat::ProPra, &bytes).unwrap();
        assert_eq!(header.compression, Compression::Huffman);
        assert_eq!((header.width, header.height), (3, 4));
        assert_eq!(
            header.segment,
            Some(SegmentInfo {
                data_segment_size: 99,
                checksum: 0x0102_0304
            })
        );
    }

    #[test]
    fn compose_is_inverse_of_parse() {
        let tga = tga_header_bytes(2, 17, 9);
        let header = ImageHeader::parse(ImageFormat::Tga, &tga).unwrap();
        assert_eq!(header.compose(), tga);

        let propra = propra_header_bytes(1, 5, 6, 1234);
        let header = ImageHeader::parse(ImageFormat::ProPra, &propra).unwrap();
        assert_eq!(header.compose(), propra);
    }

    #[test]
    fn short_header_is_malformed() {
        let bytes = propra_header_bytes(0, 1, 1, 3);
        let error = ImageHeader::parse(ImageFormat::ProPra, &bytes[..29]).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::MalformedHeader);
        let error = ImageHeader::read_from(ImageFormat::Tga, &mut &bytes[..10]).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::MalformedHeader);
    }

    #[test]
    fn every_signature_byte_is_checked() {
        for index in 0..12 {
            let mut bytes = propra_header_bytes(0, 1, 1, 3);
            bytes[index] ^= 0x01;
            let error = ImageHeader::parse(ImageFormat::ProPra, &bytes).unwrap_err();
            assert_eq!(error.category(), ErrorCategory::MalformedHeader);
        }
    }

    #[test]
    fn unsupported_fields() {
        let cases: Vec<(ImageFormat, Vec<u8>)> = vec![
            (ImageFormat::ProPra, propra_header_bytes(3, 1, 1, 3)),
            (ImageFormat::ProPra, {
                let mut b = propra_header_bytes(0, 1, 1, 3);
                b[17] = 32;
                b
            }),
            (ImageFormat::ProPra, propra_header_bytes(0, 0, 1, 0)),
            (ImageFormat::Tga, tga_header_bytes(1, 1, 1)),
            (ImageFormat::Tga, {
                let mut b = tga_header_bytes(2, 1, 1);
                b[17] = 0;
                b
            }),
            (ImageFormat::Tga, {
                let mut b = tga_header_bytes(2, 1, 1);
                b[0] = 4;
                b
            }),
            (ImageFormat::Tga, tga_header_bytes(2, 1, 0)),
        ];
        for (format, bytes) in cases {
            match ImageHeader::parse(format, &bytes) {
                Err(Error::UnsupportedField(_, _)) => (),
                other => panic!("unsupported field not detected: {:?}", other),
            }
        }
    }

    #[test]
    fn propra_segment_sizes() {
        let header =
            ImageHeader::parse(ImageFormat::ProPra, &propra_header_bytes(0, 2, 1, 6)).unwrap();
        assert!(header.validate_segment(36).is_ok());
        assert!(matches!(
            header.validate_segment(35),
            Err(Error::SizeMismatch(SizeMismatch::TooFewBytes { .. }))
        ));
        assert!(matches!(
            header.validate_segment(37),
            Err(Error::SizeMismatch(SizeMismatch::TooManyBytes { .. }))
        ));

        let header =
            ImageHeader::parse(ImageFormat::ProPra, &propra_header_bytes(0, 2, 1, 9)).unwrap();
        assert!(matches!(
            header.validate_segment(39),
            Err(Error::SizeMismatch(SizeMismatch::DeclaredSizeDiffers { .. }))
        ));

        let header =
            ImageHeader::parse(ImageFormat::ProPra, &propra_header_bytes(0, 2, 1, 7)).unwrap();
        assert!(matches!(
            header.validate_segment(37),
            Err(Error::SizeMismatch(SizeMismatch::NotMultipleOfThree(7)))
        ));

        // compressed segments only have to match their declaration
        let header =
            ImageHeader::parse(ImageFormat::ProPra, &propra_header_bytes(1, 2, 1, 4)).unwrap();
        assert!(header.validate_segment(34).is_ok());
        assert!(header.validate_segment(33).is_err());
    }

    #[test]
    fn tga_segment_sizes() {
        let header = ImageHeader::parse(ImageFormat::Tga, &tga_header_bytes(2, 2, 2)).unwrap();
        assert!(header.validate_segment(18 + 12).is_ok());
        // footer bytes are tolerated
        assert!(header.validate_segment(18 + 12 + 26).is_ok());
        assert!(matches!(
            header.validate_segment(18 + 11),
            Err(Error::SizeMismatch(SizeMismatch::TooFewBytes { .. }))
        ));
    }

    #[test]
    fn output_header_carries_segment_only_for_propra() {
        let tga = ImageHeader::new(ImageFormat::Tga, Compression::Rle, 1, 1).with_segment(4, None);
        assert_eq!(tga.segment, None);
        let propra = ImageHeader::new(ImageFormat::ProPra, Compression::Rle, 1, 1)
            .with_segment(4, Some(77));
        assert_eq!(propra.compose()[18..26], 4u64.to_le_bytes());
        assert_eq!(propra.compose()[26..30], 77u32.to_le_bytes());
    }
}
