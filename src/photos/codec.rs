use base64::{engine::general_purpose::STANDARD, Engine};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Raw photo as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPhoto {
    pub data: Vec<u8>,
    pub mime: String,
}

/// Decodes `data:<mime>;base64,<payload>` or a bare base64 payload.
///
/// Returns `None` when the payload is not valid base64 or decodes to nothing;
/// callers store the record without a photo in that case.
pub fn parse_data_url(input: &str) -> Option<DecodedPhoto> {
    lazy_static! {
        static ref DATA_URL_RE: Regex = Regex::new(r"(?s)^data:(.+);base64,(.+)$").unwrap();
    }

    let (mime, payload) = match DATA_URL_RE.captures(input) {
        Some(caps) => (caps[1].to_string(), caps.get(2).map_or("", |m| m.as_str())),
        None => (DEFAULT_IMAGE_MIME.to_string(), input),
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match STANDARD.decode(compact.as_bytes()) {
        Ok(data) if !data.is_empty() => Some(DecodedPhoto { data, mime }),
        Ok(_) => {
            warn!(mime = %mime, "photo payload is empty");
            None
        }
        Err(e) => {
            warn!(error = %e, mime = %mime, "failed to decode base64 photo");
            None
        }
    }
}

/// Encodes stored photo bytes back into a data URL.
pub fn to_data_url(data: &[u8], mime: Option<&str>) -> Option<String> {
    if data.is_empty() {
        return None;
    }
    let mime = mime.filter(|m| !m.is_empty()).unwrap_or(DEFAULT_IMAGE_MIME);
    Some(format!("data:{};base64,{}", mime, STANDARD.encode(data)))
}
