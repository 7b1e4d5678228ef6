use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::checksum::{update_optional, Checksum};
use crate::color::{ChannelReorderer, Pixel};
use crate::error::Error;
use crate::image::header::ImageHeader;
use crate::image::reader::{self, RlePixelReader, UncompressedPixelReader};
use crate::image::writer::{self, RlePixelWriter, UncompressedPixelWriter};
use crate::image::{Compression, ImageFormat, PixelReader, PixelWriter};
use crate::transport;
use crate::Result;

pub const BASE_32_EXTENSION: &str = "base-32";

/// A fully resolved image conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub input_format: ImageFormat,
    pub output: PathBuf,
    pub output_format: ImageFormat,
    pub compression: Compression,
}

impl ConversionRequest {
    /// Derives both formats from the file extensions.
    pub fn from_paths(input: &Path, output: &Path, compression: Compression) -> Result<Self> {
        Ok(Self {
            input: input.to_path_buf(),
            input_format: ImageFormat::from_path(input)?,
            output: output.to_path_buf(),
            output_format: ImageFormat::from_path(output)?,
            compression,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    Encode,
    Decode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportRequest {
    pub mode: TransportMode,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TransportRequest {
    /// Encoding appends `.base-32` to the input name, decoding strips it.
    pub fn with_default_output(mode: TransportMode, input: &Path) -> Self {
        let output = match mode {
            TransportMode::Encode => {
                let mut name = input.as_os_str().to_owned();
                name.push(".");
                name.push(BASE_32_EXTENSION);
                PathBuf::from(name)
            }
            TransportMode::Decode => {
                let is_encoded = input
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(BASE_32_EXTENSION));
                if is_encoded {
                    input.with_extension("")
                } else {
                    input.with_extension("decoded")
                }
            }
        };
        Self {
            mode,
            input: input.to_path_buf(),
            output,
        }
    }
}

fn path_name(file_path: &Path) -> String {
    file_path.display().to_string()
}

fn open_input_file(file_path: &Path) -> Result<File> {
    File::open(file_path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::InputFileNotFound(path_name(file_path)),
        ErrorKind::PermissionDenied => Error::NoReadPermissionForInputFile(path_name(file_path)),
        _ => Error::UnableToOpenInputFileForReading(path_name(file_path), e),
    })
}

fn open_output_file(file_path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file_path)
        .map_err(|e| Error::UnableToOpenOutputFileForWriting(path_name(file_path), e))
}

fn remove_existing_output(file_path: &Path) -> Result<()> {
    match fs::remove_file(file_path) {
        Ok(()) => {
            log::info!("Removed existing output file '{}'", file_path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::UnableToOpenOutputFileForWriting(
            path_name(file_path),
            e,
        )),
    }
}

fn discard_output(file_path: &Path) {
    if let Err(e) = fs::remove_file(file_path) {
        if e.kind() != ErrorKind::NotFound {
            log::warn!(
                "Unable to remove incomplete output '{}': {}",
                file_path.display(),
                e
            );
        }
    }
}

/// Refuses an output path that names the input file itself.
fn ensure_distinct_files(input: &Path, output: &Path) -> Result<()> {
    // a path that cannot be resolved does not exist yet, so it is no conflict
    let (Ok(input), Ok(resolved_output)) = (fs::canonicalize(input), fs::canonicalize(output))
    else {
        return Ok(());
    };
    if input == resolved_output {
        return Err(Error::UnableToOpenOutputFileForWriting(
            path_name(output),
            std::io::Error::new(ErrorKind::InvalidInput, "output is the input file"),
        ));
    }
    Ok(())
}

/// Runs `step` against a fresh output file and removes the file if it fails.
///
/// The input is never touched, even when both paths name the same file.
fn with_fresh_output<F>(input: &Path, output: &Path, step: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    ensure_distinct_files(input, output)?;
    remove_existing_output(output)?;
    let result = step();
    if result.is_err() {
        discard_output(output);
    }
    result
}

/// Reorders pixels between the two formats and keeps both checksums.
struct PixelPipeline {
    reorderer: ChannelReorderer,
    input_checksum: Option<Checksum>,
    output_checksum: Option<Checksum>,
}

impl PixelPipeline {
    fn new(input: ImageFormat, output: ImageFormat) -> Self {
        Self {
            reorderer: ChannelReorderer::new(input.channel_order(), output.channel_order()),
            input_checksum: input.has_checksum().then(Checksum::new),
            output_checksum: output.has_checksum().then(Checksum::new),
        }
    }

    fn transform(&mut self, pixel: Pixel) -> Pixel {
        update_optional(&mut self.input_checksum, &pixel);
        let pixel = self.reorderer.apply(pixel);
        update_optional(&mut self.output_checksum, &pixel);
        pixel
    }

    fn pump(&mut self, pixels: &mut dyn PixelReader, sink: &mut dyn PixelWriter) -> Result<()> {
        while let Some(pixel) = pixels.read_pixel()? {
            sink.write_pixel(self.transform(pixel))?;
        }
        Ok(())
    }

    /// Copies run-length packets, only the bytes inside them change.
    fn copy_packets<R: Read, W: Write>(
        &mut self,
        packets: &mut RlePixelReader<R>,
        sink: &mut RlePixelWriter<W>,
    ) -> Result<()> {
        let reorderer = self.reorderer;
        while let Some(packet) = packets.read_packet()? {
            for i in 0..packet.pixel_count() {
                update_optional(&mut self.input_checksum, &packet.pixel(i));
            }
            let packet = packet.map_pixels(|p| reorderer.apply(p));
            for i in 0..packet.pixel_count() {
                update_optional(&mut self.output_checksum, &packet.pixel(i));
            }
            sink.write_packet(packet)?;
        }
        Ok(())
    }
}

fn check_trailing_data(header: &ImageHeader, pixels: &mut dyn PixelReader) -> Result<()> {
    // TGA files may carry a footer after the pixels
    let Some(segment) = header.segment else {
        return Ok(());
    };
    match pixels.trailing_data_offset()? {
        Some(consumed) => Err(Error::too_many_bytes(consumed, segment.data_segment_size)),
        None => Ok(()),
    }
}

fn transform_body<R: Read, W: Write>(
    header: &ImageHeader,
    input: R,
    output: W,
    pipeline: &mut PixelPipeline,
    compression: Compression,
) -> Result<u64> {
    match (header.compression, compression) {
        (Compression::Rle, Compression::Rle) => {
            log::debug!("Copying run-length packets");
            let mut packets = RlePixelReader::new(input, header.pixel_count());
            let mut sink = RlePixelWriter::new(output);
            pipeline.copy_packets(&mut packets, &mut sink)?;
            check_trailing_data(header, &mut packets)?;
            sink.finish()
        }
        (Compression::Huffman, Compression::Rle) => {
            log::debug!("Decoding Huffman data through a scratch file");
            let mut scratch = tempfile::tempfile().map_err(Error::UnableToCreateScratchFile)?;
            {
                let mut pixels = reader::for_header(header, input)?;
                let mut stage = UncompressedPixelWriter::new(BufWriter::new(&mut scratch));
                pipeline.pump(pixels.as_mut(), &mut stage)?;
                stage.finish()?;
            }
            scratch
                .seek(SeekFrom::Start(0))
                .map_err(Error::FailedToReadImageData)?;
            let mut stage =
                UncompressedPixelReader::new(BufReader::new(&mut scratch), header.pixel_count());
            let mut sink = RlePixelWriter::new(output);
            while let Some(pixel) = stage.read_pixel()? {
                sink.write_pixel(pixel)?;
            }
            sink.finish()
        }
        _ => {
            let mut pixels = reader::for_header(header, input)?;
            let mut sink = writer::for_compression(compression, output);
            pipeline.pump(pixels.as_mut(), sink.as_mut())?;
            check_trailing_data(header, pixels.as_mut())?;
            sink.finish()
        }
    }
}

fn verify_input_checksum(
    header: &ImageHeader,
    computed: Option<Checksum>,
    request: &ConversionRequest,
) -> Result<()> {
    let (Some(declared), Some(computed)) = (header.declared_checksum(), computed) else {
        return Ok(());
    };
    if header.format == request.output_format && header.compression == request.compression {
        log::warn!("Input and output share format and compression, checksum not verified");
        return Ok(());
    }
    let computed = computed.finalize();
    if declared != computed {
        return Err(Error::ChecksumMismatch { declared, computed });
    }
    log::debug!("Checksum {:#010X} verified", computed);
    Ok(())
}

fn convert_into_output(request: &ConversionRequest) -> Result<()> {
    let input_file = open_input_file(&request.input)?;
    let file_length = input_file
        .metadata()
        .map_err(Error::FailedToReadImageData)?
        .len();
    let mut input = BufReader::new(input_file);
    let header = ImageHeader::read_from(request.input_format, &mut input)?;
    header.validate_segment(file_length)?;
    log::info!(
        "Converting {} ({}) to {} ({})",
        header.format,
        header.compression,
        request.output_format,
        request.compression
    );

    let mut output = BufWriter::new(open_output_file(&request.output)?);
    let header_length = request.output_format.header_length() as u64;
    output
        .seek(SeekFrom::Start(header_length))
        .map_err(Error::FailedToWriteImageData)?;
    let mut pipeline = PixelPipeline::new(header.format, request.output_format);
    let segment_size = transform_body(
        &header,
        &mut input,
        &mut output,
        &mut pipeline,
        request.compression,
    )?;
    verify_input_checksum(&header, pipeline.input_checksum, request)?;

    let output_header = ImageHeader::new(
        request.output_format,
        request.compression,
        header.width,
        header.height,
    )
    .with_segment(
        segment_size,
        pipeline.output_checksum.map(|c| c.finalize()),
    );
    output
        .seek(SeekFrom::Start(0))
        .map_err(Error::FailedToWriteImageData)?;
    output
        .write_all(&output_header.compose())
        .map_err(Error::FailedToWriteImageData)?;
    output.flush().map_err(Error::FailedToWriteImageData)?;
    log::info!(
        "Wrote {} header and {} bytes of image data",
        request.output_format,
        segment_size
    );
    Ok(())
}

/// Converts one image file into another.
///
/// An existing output file is replaced; nothing is left behind on failure.
pub fn convert(request: &ConversionRequest) -> Result<()> {
    if request.compression == Compression::Huffman
        || !request.output_format.supports(request.compression)
    {
        return Err(Error::UnsupportedConversion(
            request.output_format,
            request.compression,
        ));
    }
    with_fresh_output(&request.input, &request.output, || {
        convert_into_output(request)
    })
}

/// Runs the Base32hex coding over a whole file.
pub fn transcode(request: &TransportRequest) -> Result<()> {
    with_fresh_output(&request.input, &request.output, || {
        let input = BufReader::new(open_input_file(&request.input)?);
        let mut output = BufWriter::new(open_output_file(&request.output)?);
        let count = match request.mode {
            TransportMode::Encode => transport::encode(input, &mut output)?,
            TransportMode::Decode => transport::decode(input, &mut output)?,
        };
        log::info!(
            "{:?} of '{}' produced {} bytes",
            request.mode,
            request.input.display(),
            count
        );
        Ok(())
    })
}
