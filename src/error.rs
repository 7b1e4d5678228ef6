use std::fmt::Display;

use crate::image::{Compression, ImageFormat};

/// Coarse classification of every [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MalformedHeader,
    UnsupportedField,
    SizeMismatch,
    ChecksumMismatch,
    UnsupportedConversion,
    MalformedTransportData,
    IoFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMismatch {
    /// fewer bytes available than required
    TooFewBytes { expected: u64, actual: u64 },
    /// more bytes available than declared
    TooManyBytes { expected: u64, actual: u64 },
    /// header declares a segment size that does not fit the dimensions
    DeclaredSizeDiffers { declared: u64, expected: u64 },
    NotMultipleOfThree(u64),
}

#[derive(Debug)]
pub enum Error {
    MalformedHeader(&'static str),
    UnsupportedField(&'static str, u64),
    SizeMismatch(SizeMismatch),
    ChecksumMismatch { declared: u32, computed: u32 },
    UnsupportedConversion(ImageFormat, Compression),
    InvalidTransportSymbol { symbol: u8, offset: u64 },
    UnknownFileFormat(String),
    InputFileNotFound(String),
    NoReadPermissionForInputFile(String),
    UnableToOpenInputFileForReading(String, std::io::Error),
    UnableToOpenOutputFileForWriting(String, std::io::Error),
    UnableToCreateScratchFile(std::io::Error),
    FailedToReadImageData(std::io::Error),
    FailedToWriteImageData(std::io::Error),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedHeader(_) => ErrorCategory::MalformedHeader,
            Self::UnsupportedField(_, _) => ErrorCategory::UnsupportedField,
            Self::SizeMismatch(_) => ErrorCategory::SizeMismatch,
            Self::ChecksumMismatch { .. } => ErrorCategory::ChecksumMismatch,
            Self::UnsupportedConversion(_, _) | Self::UnknownFileFormat(_) => {
                ErrorCategory::UnsupportedConversion
            }
            Self::InvalidTransportSymbol { .. } => ErrorCategory::MalformedTransportData,
            Self::InputFileNotFound(_)
            | Self::NoReadPermissionForInputFile(_)
            | Self::UnableToOpenInputFileForReading(_, _)
            | Self::UnableToOpenOutputFileForWriting(_, _)
            | Self::UnableToCreateScratchFile(_)
            | Self::FailedToReadImageData(_)
            | Self::FailedToWriteImageData(_) => ErrorCategory::IoFailure,
        }
    }

    pub(crate) fn too_few_bytes(expected: u64, actual: u64) -> Self {
        Self::SizeMismatch(SizeMismatch::TooFewBytes { expected, actual })
    }

    pub(crate) fn too_many_bytes(expected: u64, actual: u64) -> Self {
        Self::SizeMismatch(SizeMismatch::TooManyBytes { expected, actual })
    }
}

impl Display for SizeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewBytes { expected, actual } => write!(
                f,
                "Too few bytes in data segment. Expected {} bytes, but got {}.",
                expected, actual
            ),
            Self::TooManyBytes { expected, actual } => write!(
                f,
                "Too many bytes in data segment. Expected {} bytes, but got {}.",
                expected, actual
            ),
            Self::DeclaredSizeDiffers { declared, expected } => write!(
                f,
                "Data segment size in header ({}) does not match the image dimensions ({})",
                declared, expected
            ),
            Self::NotMultipleOfThree(size) => write!(
                f,
                "Data segment size {} is not a multiple of 3 bytes per pixel",
                size
            ),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHeader(reason) => write!(f, "Malformed header: {}", reason),
            Self::UnsupportedField(field, value) => {
                write!(f, "Unsupported value {} for header field '{}'", value, field)
            }
            Self::SizeMismatch(mismatch) => write!(f, "{}", mismatch),
            Self::ChecksumMismatch { declared, computed } => write!(
                f,
                "Checksum mismatch. Header declares {:#010X}, but data yields {:#010X}.",
                declared, computed
            ),
            Self::UnsupportedConversion(format, compression) => write!(
                f,
                "Conversion to {} with compression '{}' is not supported",
                format, compression
            ),
            Self::InvalidTransportSymbol { symbol, offset } => write!(
                f,
                "Byte {:#04X} at offset {} is not part of the base32hex alphabet",
                symbol, offset
            ),
            Self::UnknownFileFormat(path) => {
                write!(f, "Unable to derive an image format from '{}'", path)
            }
            Self::InputFileNotFound(path) => {
                write!(f, "Input file '{}' not found", path)
            }
            Self::NoReadPermissionForInputFile(path) => {
                write!(
                    f,
                    "Unable open file '{}' for reading. Permission denied.",
                    path
                )
            }
            Self::UnableToOpenInputFileForReading(path, error) => {
                write!(
                    f,
                    "Unable to open input file '{}' for reading: {}",
                    path, error
                )
            }
            Self::UnableToOpenOutputFileForWriting(path, error) => {
                write!(
                    f,
                    "Unable to open output file '{}' for writing: {}",
                    path, error
                )
            }
            Self::UnableToCreateScratchFile(error) => {
                write!(f, "Unable to create scratch file: {}", error)
            }
            Self::FailedToReadImageData(error) => write!(f, "Failed to read image data: {}", error),
            Self::FailedToWriteImageData(error) => {
                write!(f, "Failed to write image data: {}", error)
            }
        }
    }
}

impl std::error::Error for Error {}
