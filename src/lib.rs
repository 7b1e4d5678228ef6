use std::path::PathBuf;

pub use cli::CLIParser;
pub use converter::{convert, transcode, ConversionRequest, TransportMode, TransportRequest};
pub use error::{Error, ErrorCategory, SizeMismatch};
pub use image::{Compression, ImageFormat};

pub mod binary_stream;
pub mod checksum;
mod cli;
pub mod color;
mod converter;
mod error;
pub mod huffman;
pub mod image;
mod logger;
pub mod rle;
pub mod transport;

pub type Result<T> = std::result::Result<T, error::Error>;

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Arguments {
    Convert {
        input_file: PathBuf,
        output_file: PathBuf,
        compression: Compression,
    },
    Transport {
        mode: TransportMode,
        input_file: PathBuf,
        output_file: Option<PathBuf>,
    },
}

pub fn run(arguments: &Arguments) -> Result<()> {
    match arguments {
        Arguments::Convert {
            input_file,
            output_file,
            compression,
        } => convert(&ConversionRequest::from_paths(
            input_file,
            output_file,
            *compression,
        )?),
        Arguments::Transport {
            mode,
            input_file,
            output_file: Some(output_file),
        } => transcode(&TransportRequest {
            mode: *mode,
            input: input_file.clone(),
            output: output_file.clone(),
        }),
        Arguments::Transport {
            mode,
            input_file,
            output_file: None,
        } => transcode(&TransportRequest::with_default_output(*mode, input_file)),
    }
}
