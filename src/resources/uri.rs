//! Classification and decoding of the URIs found in scene packages.

use base64::Engine as _;

use crate::error::{RenderError, Result};

pub(crate) enum UriRef<'a> {
    /// `blob:<origin>:<id>`, resolved against the package bytes.
    Blob(&'a str),
    /// `data:[<mime>][;base64],<payload>`
    Data {
        mime_type: Option<&'a str>,
        payload: &'a str,
        base64: bool,
    },
    /// `http(s)://...` and friends, never fetched.
    Remote(&'a str),
    /// Path relative to the model file, percent-decoded.
    Relative(String),
}

pub(crate) fn classify(uri: &str) -> UriRef<'_> {
    if let Some(rest) = uri.strip_prefix("blob:") {
        return UriRef::Blob(blob_id(rest));
    }
    if let Some(rest) = uri.strip_prefix("data:") {
        let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
        let base64 = header.ends_with(";base64");
        let mime_type = header
            .trim_end_matches(";base64")
            .split(';')
            .next()
            .filter(|m| !m.is_empty());
        return UriRef::Data {
            mime_type,
            payload,
            base64,
        };
    }
    if uri.contains("://") {
        return UriRef::Remote(uri);
    }
    UriRef::Relative(percent_decode(uri))
}

/// The id is the last `:` separated segment, so `blob:nodedata:abc` and
/// `blob:abc` both resolve to `abc`.
fn blob_id(rest: &str) -> &str {
    rest.rsplit(':').next().unwrap_or(rest)
}

/// Id used by the blob store for a `blob:` uri, `None` for every other scheme.
pub(crate) fn blob_id_of(uri: &str) -> Option<&str> {
    uri.strip_prefix("blob:").map(blob_id)
}

pub(crate) fn decode_data(payload: &str, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| RenderError::Parse(format!("malformed base64 in data uri: {}", e)))
    } else {
        Ok(percent_decode(payload).into_bytes())
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
