//! HTTP content negotiation for the JSON-RPC endpoint.
//!
//! Negotiation runs before the request body is touched and is the only
//! place where HTTP status codes are used as an error channel; once it
//! passes, all protocol failures travel inside the JSON-RPC envelope.

use http::request::Parts;
use http::{Method, StatusCode, header};

/// Supported body charsets. Anything else is rejected with 415/406.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Utf16,
    Utf32,
}

/// Failure to decode a body in the charset its headers declared.
///
/// This is a body-level problem, not a negotiation failure: the
/// dispatcher folds it into a JSON-RPC parse error on HTTP 200.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("body length is not a whole number of code units")]
    Truncated,
    #[error("body is not valid text in the negotiated charset")]
    InvalidText,
}

impl Charset {
    /// Canonical label used in Content-Type
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Utf16 => "utf-16",
            Charset::Utf32 => "utf-32",
        }
    }

    /// Value for the response Content-Type header
    pub fn content_type(&self) -> String {
        format!("application/json; charset={}", self.name())
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "utf-16" | "utf16" => Some(Charset::Utf16),
            "utf-32" | "utf32" => Some(Charset::Utf32),
            _ => None,
        }
    }

    /// Decode body bytes to text. BOM-aware for UTF-16/32; little-endian
    /// is assumed when no BOM is present.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(str::to_string)
                    .map_err(|_| DecodeError::InvalidText)
            }
            Charset::Utf16 => {
                let (bytes, big_endian) = match bytes {
                    [0xFF, 0xFE, rest @ ..] => (rest, false),
                    [0xFE, 0xFF, rest @ ..] => (rest, true),
                    _ => (bytes, false),
                };
                if bytes.len() % 2 != 0 {
                    return Err(DecodeError::Truncated);
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| {
                        let pair = [pair[0], pair[1]];
                        if big_endian {
                            u16::from_be_bytes(pair)
                        } else {
                            u16::from_le_bytes(pair)
                        }
                    })
                    .collect();
                String::from_utf16(&units).map_err(|_| DecodeError::InvalidText)
            }
            Charset::Utf32 => {
                let (bytes, big_endian) = match bytes {
                    [0xFF, 0xFE, 0x00, 0x00, rest @ ..] => (rest, false),
                    [0x00, 0x00, 0xFE, 0xFF, rest @ ..] => (rest, true),
                    _ => (bytes, false),
                };
                if bytes.len() % 4 != 0 {
                    return Err(DecodeError::Truncated);
                }
                bytes
                    .chunks_exact(4)
                    .map(|quad| {
                        let quad = [quad[0], quad[1], quad[2], quad[3]];
                        let unit = if big_endian {
                            u32::from_be_bytes(quad)
                        } else {
                            u32::from_le_bytes(quad)
                        };
                        char::from_u32(unit).ok_or(DecodeError::InvalidText)
                    })
                    .collect()
            }
        }
    }

    /// Encode text into body bytes. UTF-16/32 are emitted little-endian
    /// without a BOM.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16 => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            Charset::Utf32 => text
                .chars()
                .flat_map(|ch| (ch as u32).to_le_bytes())
                .collect(),
        }
    }
}

/// Outcome of successful negotiation: the charsets to read and write with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    pub request_charset: Charset,
    pub response_charset: Charset,
}

/// Negotiation failures, fatal to the HTTP exchange. No JSON-RPC body is
/// ever produced for these.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NegotiateError {
    #[error("only POST is accepted")]
    MethodNotAllowed,
    #[error("compressed request bodies are not supported")]
    ContentEncodingPresent,
    #[error("Content-Type must be application/json with a supported charset")]
    UnsupportedMediaType,
    #[error("Accept must allow application/json with a supported charset")]
    NotAcceptable,
}

impl NegotiateError {
    pub fn status(&self) -> StatusCode {
        match self {
            NegotiateError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            NegotiateError::ContentEncodingPresent => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            NegotiateError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            NegotiateError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
        }
    }
}

enum MediaTypeError {
    NotJson,
    UnsupportedCharset,
}

/// Parse one `application/json[; charset=...]` media type entry. Media
/// type parameters other than charset are ignored; a missing charset
/// defaults to UTF-8.
fn json_charset(entry: &str) -> Result<Charset, MediaTypeError> {
    let mut parts = entry.split(';');
    let essence = parts.next().unwrap_or("").trim().to_ascii_lowercase();
    if essence != "application/json" {
        return Err(MediaTypeError::NotJson);
    }

    for param in parts {
        let mut pair = param.splitn(2, '=');
        let key = pair.next().unwrap_or("").trim().to_ascii_lowercase();
        if key == "charset" {
            return Charset::from_label(pair.next().unwrap_or(""))
                .ok_or(MediaTypeError::UnsupportedCharset);
        }
    }

    Ok(Charset::default())
}

/// Run content negotiation over the request head.
///
/// Check order: HTTP method, Content-Encoding, Content-Type, Accept. The
/// Accept header is split on commas and the first `application/json`
/// entry with a supported charset wins.
pub fn negotiate(parts: &Parts) -> Result<Negotiation, NegotiateError> {
    if parts.method != Method::POST {
        return Err(NegotiateError::MethodNotAllowed);
    }

    if parts.headers.contains_key(header::CONTENT_ENCODING) {
        return Err(NegotiateError::ContentEncodingPresent);
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(NegotiateError::UnsupportedMediaType)?;
    let request_charset =
        json_charset(content_type).map_err(|_| NegotiateError::UnsupportedMediaType)?;

    let accept = parts
        .headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .ok_or(NegotiateError::NotAcceptable)?;
    let response_charset = accept
        .split(',')
        .find_map(|entry| json_charset(entry).ok())
        .ok_or(NegotiateError::NotAcceptable)?;

    Ok(Negotiation {
        request_charset,
        response_charset,
    })
}
