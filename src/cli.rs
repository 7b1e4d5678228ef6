use crate::converter::TransportMode;
use crate::image::Compression;
use crate::Arguments;
use clap::{
    arg, crate_authors, crate_description, crate_name, crate_version, value_parser, Arg,
    ArgAction, ArgMatches, Command,
};
use std::ffi::OsString;
use std::path::PathBuf;

pub struct CLIParser {
    command: Command,
}

impl CLIParser {
    pub fn new() -> Self {
        let command = Self::create_base_command();
        let command = Self::register_arguments(command);
        CLIParser { command }
    }

    pub fn parse<I, T>(&mut self, itr: I) -> Arguments
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self
            .command
            .try_get_matches_from_mut(itr)
            .unwrap_or_else(|e| e.exit());
        Self::extract_arguments(&matches)
    }

    fn register_arguments(command: Command) -> Command {
        let command = Self::register_input_file_argument(command);
        let command = Self::register_output_file_argument(command);
        let command = Self::register_compression_argument(command);
        Self::register_transport_arguments(command)
    }

    fn register_input_file_argument(command: Command) -> Command {
        command.arg(Self::create_input_file_argument())
    }

    fn register_output_file_argument(command: Command) -> Command {
        command.arg(Self::create_output_file_argument())
    }

    fn register_compression_argument(command: Command) -> Command {
        command.arg(Self::create_compression_argument())
    }

    fn register_transport_arguments(command: Command) -> Command {
        command
            .arg(Self::create_encode_base_32_argument())
            .arg(Self::create_decode_base_32_argument())
    }

    fn create_base_command() -> Command {
        Command::new(crate_name!())
            .version(crate_version!())
            .author(crate_authors!())
            .about(crate_description!())
    }

    fn create_input_file_argument() -> Arg {
        arg!(input_file: --input <PATH> "Path to the .propra or .tga input file")
            .value_parser(value_parser!(PathBuf))
            .required(true)
    }

    fn create_output_file_argument() -> Arg {
        arg!(output_file: --output <PATH> "Path to the output file, its extension selects the format")
            .value_parser(value_parser!(PathBuf))
            .required_unless_present_any(["encode_base_32", "decode_base_32"])
    }

    fn create_compression_argument() -> Arg {
        arg!(compression: --compression <COMPRESSION> "Compression of the output image")
            .default_value("uncompressed")
            .value_parser(value_parser!(Compression))
    }

    fn create_encode_base_32_argument() -> Arg {
        Arg::new("encode_base_32")
            .long("encode-base-32")
            .help("Encode the input file with Base32hex")
            .action(ArgAction::SetTrue)
            .conflicts_with_all(["decode_base_32", "compression"])
    }

    fn create_decode_base_32_argument() -> Arg {
        Arg::new("decode_base_32")
            .long("decode-base-32")
            .help("Decode a Base32hex encoded input file")
            .action(ArgAction::SetTrue)
            .conflicts_with("compression")
    }

    fn extract_arguments(matches: &ArgMatches) -> Arguments {
        let input_file = Self::extract_input_file_argument(matches);
        let output_file = Self::extract_output_file_argument(matches);
        match Self::extract_transport_mode(matches) {
            Some(mode) => Arguments::Transport {
                mode,
                input_file,
                output_file,
            },
            None => Arguments::Convert {
                input_file,
                output_file: output_file
                    .expect("Output file is required when not transport coding"),
                compression: Self::extract_compression_argument(matches),
            },
        }
    }

    fn extract_input_file_argument(matches: &ArgMatches) -> PathBuf {
        matches
            .get_one::<PathBuf>("input_file")
            .expect("Required argument input_file not provided")
            .clone()
    }

    fn extract_output_file_argument(matches: &ArgMatches) -> Option<PathBuf> {
        matches.get_one::<PathBuf>("output_file").cloned()
    }

    fn extract_compression_argument(matches: &ArgMatches) -> Compression {
        matches
            .get_one::<Compression>("compression")
            .expect("Compression must be provided, but was unset.")
            .to_owned()
    }

    fn extract_transport_mode(matches: &ArgMatches) -> Option<TransportMode> {
        if matches.get_flag("encode_base_32") {
            Some(TransportMode::Encode)
        } else if matches.get_flag("decode_base_32") {
            Some(TransportMode::Decode)
        } else {
            None
        }
    }
}

impl Default for CLIParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use clap::{error::ErrorKind, Command};
    use std::path::PathBuf;

    use super::CLIParser;
    use crate::converter::TransportMode;
    use crate::image::Compression;
    use crate::Arguments;

    const PROGRAM_NAME_ARGUMENT: &str = "test_program_name";

    #[test]
    fn parse_input_file_argument() {
        let input_file_name = "testfile.propra";
        let command = Command::new("test");
        let command = CLIParser::register_input_file_argument(command);
        let matches =
            command.get_matches_from(vec![PROGRAM_NAME_ARGUMENT, "--input", input_file_name]);
        let input_file = CLIParser::extract_input_file_argument(&matches);
        assert_eq!(input_file.file_name().unwrap(), input_file_name);
    }

    #[test]
    fn parse_compression_argument() {
        let command = Command::new("test");
        let command = CLIParser::register_compression_argument(command);
        let matches =
            command.get_matches_from(vec![PROGRAM_NAME_ARGUMENT, "--compression", "rle"]);
        let compression = CLIParser::extract_compression_argument(&matches);
        assert_eq!(compression, Compression::Rle);
    }

    #[test]
    fn parse_compression_illegal_argument() {
        let command = Command::new("test");
        let command = CLIParser::register_compression_argument(command);
        let result =
            command.try_get_matches_from(vec![PROGRAM_NAME_ARGUMENT, "--compression", "huffman"]);
        if let Err(error) = result {
            assert_eq!(error.kind(), ErrorKind::InvalidValue);
        } else {
            panic!("Illegal value for compression not detected");
        }
    }

    #[test]
    fn parse_conversion_arguments() {
        let mut cli_parser = CLIParser::default();
        let arguments = cli_parser.parse(vec![
            PROGRAM_NAME_ARGUMENT,
            "--input",
            "/input_directory/image.tga",
            "--output",
            "/output_directory/image.propra",
        ]);
        assert_eq!(
            arguments,
            Arguments::Convert {
                input_file: PathBuf::from("/input_directory/image.tga"),
                output_file: PathBuf::from("/output_directory/image.propra"),
                compression: Compression::Uncompressed,
            }
        );
    }

    #[test]
    fn parse_transport_arguments() {
        let mut cli_parser = CLIParser::default();
        let arguments =
            cli_parser.parse(vec![PROGRAM_NAME_ARGUMENT, "--input", "a.tga", "--encode-base-32"]);
        assert_eq!(
            arguments,
            Arguments::Transport {
                mode: TransportMode::Encode,
                input_file: PathBuf::from("a.tga"),
                output_file: None,
            }
        );
    }

    #[test]
    fn output_required_for_conversion() {
        let command = CLIParser::register_arguments(Command::new("test"));
        let result = command.try_get_matches_from(vec![PROGRAM_NAME_ARGUMENT, "--input", "a.tga"]);
        if let Err(error) = result {
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        } else {
            panic!("Missing output file not detected");
        }
    }

    #[test]
    fn transport_modes_are_exclusive() {
        let command = CLIParser::register_arguments(Command::new("test"));
        let result = command.try_get_matches_from(vec![
            PROGRAM_NAME_ARGUMENT,
            "--input",
            "a.tga",
            "--encode-base-32",
            "--decode-base-32",
        ]);
        if let Err(error) = result {
            assert_eq!(error.kind(), ErrorKind::ArgumentConflict);
        } else {
            panic!("Conflicting transport modes not detected");
        }
    }
}
