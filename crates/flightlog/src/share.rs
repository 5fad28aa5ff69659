//! Share links.
//!
//! A share link is the configured base URL with a single `data` query
//! parameter holding the base64 of a JSON [`SharePayload`]. Decoding is
//! strict about shape (a `flights` array must be present) and never partial:
//! callers either get the whole list or an error.

use std::sync::LazyLock;

use base64::{engine::general_purpose, Engine as _};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::flight::Flight;

/// Query parameter carrying the encoded payload.
pub const SHARE_PARAM: &str = "data";

static SHARE_PARAM_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]data=([^&#]*)").expect("static regex is valid"));

/// What a share link carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    /// The shared flights, in list order.
    pub flights: Vec<Flight>,
    /// When the link was created, ISO-8601 UTC.
    #[serde(default)]
    pub timestamp: String,
}

impl SharePayload {
    /// Payload for `flights`, stamped with the current time.
    #[must_use]
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// JSON, then standard base64.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    /// Inverse of [`SharePayload::encode`].
    ///
    /// Accepts the value raw or percent-escaped, as it appears in a URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShareDecode`] if the value is not base64, not JSON,
    /// lacks a `flights` array, or holds malformed flights.
    pub fn decode(encoded: &str) -> Result<Self> {
        let unescaped = percent_decode(encoded.trim());
        let bytes = general_purpose::STANDARD
            .decode(unescaped.as_bytes())
            .map_err(|e| Error::share_decode(format!("not base64: {e}")))?;

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::share_decode(format!("not JSON: {e}")))?;

        match value.get("flights") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(Error::share_decode("'flights' is not an array")),
            None => return Err(Error::share_decode("missing 'flights'")),
        }

        serde_json::from_value(value)
            .map_err(|e| Error::share_decode(format!("malformed flight data: {e}")))
    }
}

/// Build the share URL for `flights` on top of `base_url`.
///
/// Any existing `data` parameter on the base URL is replaced.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn share_url(base_url: &str, flights: &[Flight]) -> Result<String> {
    let encoded = SharePayload::new(flights.to_vec()).encode()?;
    let stripped = strip_share_param(base_url);
    let (base, fragment) = split_fragment(&stripped);
    let separator = if base.contains('?') { '&' } else { '?' };

    let mut url = format!(
        "{base}{separator}{SHARE_PARAM}={}",
        percent_encode_base64(&encoded)
    );
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    Ok(url)
}

/// The raw `data` parameter value in `url`, if any.
#[must_use]
pub fn share_param(url: &str) -> Option<&str> {
    SHARE_PARAM_VALUE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|v| !v.is_empty())
}

/// Decode the share payload in `url`.
///
/// Returns `Ok(None)` when the URL carries no share parameter.
///
/// # Errors
///
/// Returns [`Error::ShareDecode`] if a parameter is present but invalid.
pub fn decode_share_url(url: &str) -> Result<Option<SharePayload>> {
    share_param(url).map(SharePayload::decode).transpose()
}

/// `url` without its `data` parameter, keeping other parameters and the
/// fragment.
#[must_use]
pub fn strip_share_param(url: &str) -> String {
    let (before_fragment, fragment) = split_fragment(url);
    let (path, query) = match before_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (before_fragment, None),
    };

    let mut out = path.to_string();
    if let Some(query) = query {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| {
                !pair.is_empty() && pair.split('=').next() != Some(SHARE_PARAM)
            })
            .collect();
        if !kept.is_empty() {
            out.push('?');
            out.push_str(&kept.join("&"));
        }
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn split_fragment(url: &str) -> (&str, Option<&str>) {
    match url.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (url, None),
    }
}

/// Escape the three base64 characters that are not query-safe.
fn percent_encode_base64(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len());
    for c in encoded.chars() {
        match c {
            '+' => out.push_str("%2B"),
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            c => out.push(c),
        }
    }
    out
}

/// Undo `%XX` escapes. A space stands for a `+` that a form decoder ate.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b' ' => {
                out.push(b'+');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
