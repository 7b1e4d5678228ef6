use crate::image::ImageFormat;

const CONFIG_FILE: &str = "log4rs.yaml";

/// Installs the logger described by `config_file`, stays silent if it is unusable.
fn init_from(config_file: &str) -> bool {
    log4rs::init_file(config_file, Default::default()).is_ok()
}

#[ctor::ctor]
fn init() {
    // without a configuration in the working directory nothing is logged
    init_from(CONFIG_FILE);
}

fn get_byte_array(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|byte| format!("{:02X}", byte)).collect()
}

pub fn log_header(format: ImageFormat, header: &[u8]) {
    log::debug!("{} header {:?}", format, get_byte_array(header));
}

pub fn log_packet(header: u8, pixel_bytes: &[u8]) {
    log::trace!(
        "rle packet {:02X} {:?}",
        header,
        get_byte_array(pixel_bytes)
    );
}

#[cfg(test)]
mod test {
    use super::init_from;

    #[test]
    fn missing_configuration_is_not_fatal() {
        assert!(!init_from("missing-directory/log4rs.yaml"));
    }
}
