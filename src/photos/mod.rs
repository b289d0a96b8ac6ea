pub mod codec;

pub use codec::{parse_data_url, to_data_url, DecodedPhoto, DEFAULT_IMAGE_MIME};
